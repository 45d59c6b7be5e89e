//! Wavelength to display-color mapping.
//!
//! Pure functions mapping visible-spectrum wavelengths to sRGB through the
//! HCL (hue-chroma-luminance) color space, which is perceptually uniform and
//! keeps the gradient backdrop visually continuous across band boundaries.
//! Not physically exact; a rendering aid only.

/// Convert HCL to sRGB.
///
/// `h` is hue in degrees, `c` chroma, `l` luminance in [0, 100]. Goes
/// through CIELAB and XYZ with the D65 reference white, then applies the
/// sRGB gamma encoding. Channels are clamped to [0, 1].
pub fn hcl_to_rgb(h: f64, c: f64, l: f64) -> [f64; 3] {
    // HCL to Lab
    let h_rad = h.to_radians();
    let a = c * h_rad.cos();
    let b = c * h_rad.sin();

    // Lab to XYZ, D65 illuminant reference values
    const XN: f64 = 95.047;
    const YN: f64 = 100.0;
    const ZN: f64 = 108.883;

    let fy = (l + 16.0) / 116.0;
    let fx = a / 500.0 + fy;
    let fz = fy - b / 200.0;

    const DELTA: f64 = 6.0 / 29.0;
    let f_inv = |t: f64| {
        if t > DELTA {
            t * t * t
        } else {
            3.0 * DELTA * DELTA * (t - 4.0 / 29.0)
        }
    };

    let x = XN * f_inv(fx) / 100.0;
    let y = YN * f_inv(fy) / 100.0;
    let z = ZN * f_inv(fz) / 100.0;

    // XYZ to linear sRGB (D65)
    let r = 3.240_454_2 * x - 1.537_138_5 * y - 0.498_531_4 * z;
    let g = -0.969_266_0 * x + 1.876_010_8 * y + 0.041_556_0 * z;
    let b = 0.055_643_4 * x - 0.204_025_9 * y + 1.057_225_2 * z;

    let gamma = |ch: f64| {
        if ch <= 0.003_130_8 {
            12.92 * ch
        } else {
            1.055 * ch.powf(1.0 / 2.4) - 0.055
        }
    };

    [
        gamma(r).clamp(0.0, 1.0),
        gamma(g).clamp(0.0, 1.0),
        gamma(b).clamp(0.0, 1.0),
    ]
}

/// Convert a wavelength in nm to an sRGB color.
///
/// Input is clamped to the visible range [380, 780]. Six piecewise-linear
/// HCL bands cover violet through red, with an intensity falloff below
/// 420 nm and above 700 nm so the spectrum edges fade instead of
/// oversaturating. Deterministic: identical input yields identical output.
pub fn wavelength_to_rgb(wavelength: f64) -> [f64; 3] {
    let wl = wavelength.clamp(380.0, 780.0);

    let (hue, mut chroma, mut luminance) = if wl < 440.0 {
        // Violet to blue
        let t = (wl - 380.0) / (440.0 - 380.0);
        (285.0 - t * 25.0, 60.0 + t * 40.0, 30.0 + t * 25.0)
    } else if wl < 490.0 {
        // Blue to cyan
        let t = (wl - 440.0) / (490.0 - 440.0);
        (260.0 - t * 50.0, 100.0, 55.0 + t * 15.0)
    } else if wl < 510.0 {
        // Cyan to green
        let t = (wl - 490.0) / (510.0 - 490.0);
        (210.0 - t * 50.0, 100.0 - t * 10.0, 70.0 + t * 10.0)
    } else if wl < 580.0 {
        // Green to yellow
        let t = (wl - 510.0) / (580.0 - 510.0);
        (160.0 - t * 75.0, 90.0 + t * 10.0, 80.0 + t * 15.0)
    } else if wl < 645.0 {
        // Yellow to orange
        let t = (wl - 580.0) / (645.0 - 580.0);
        (85.0 - t * 45.0, 100.0, 95.0 - t * 20.0)
    } else {
        // Orange to red, chroma and luminance taper toward the far red
        let t = (wl - 645.0) / (780.0 - 645.0);
        (40.0 - t * 25.0, 100.0 - t * 30.0, 75.0 - t * 35.0)
    };

    // Intensity falloff at the edges of the visible spectrum
    if wl < 420.0 {
        let intensity = 0.3 + 0.7 * (wl - 380.0) / (420.0 - 380.0);
        chroma *= intensity;
        luminance *= intensity;
    } else if wl > 700.0 {
        let intensity = 0.3 + 0.7 * (780.0 - wl) / (780.0 - 700.0);
        chroma *= intensity;
        luminance *= intensity;
    }

    hcl_to_rgb(hue, chroma, luminance)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_in_unit_range_across_visible_spectrum() {
        for nm in 380..=780 {
            let rgb = wavelength_to_rgb(f64::from(nm));
            for ch in rgb {
                assert!(ch.is_finite(), "{nm} nm produced non-finite channel");
                assert!((0.0..=1.0).contains(&ch), "{nm} nm out of range: {ch}");
            }
        }
    }

    #[test]
    fn deterministic() {
        for nm in [380.0, 457.3, 550.0, 632.8, 780.0] {
            assert_eq!(wavelength_to_rgb(nm), wavelength_to_rgb(nm));
        }
    }

    #[test]
    fn out_of_range_clamps() {
        assert_eq!(wavelength_to_rgb(100.0), wavelength_to_rgb(380.0));
        assert_eq!(wavelength_to_rgb(1200.0), wavelength_to_rgb(780.0));
    }

    #[test]
    fn green_dominates_mid_spectrum() {
        let [r, g, b] = wavelength_to_rgb(550.0);
        assert!(g > r);
        assert!(g > b);
    }

    #[test]
    fn blue_dominates_short_wavelengths() {
        let [r, g, b] = wavelength_to_rgb(450.0);
        assert!(b > r);
        assert!(b > g);
    }

    #[test]
    fn red_dominates_long_wavelengths() {
        let [r, g, b] = wavelength_to_rgb(680.0);
        assert!(r > g);
        assert!(r > b);
    }

    #[test]
    fn edges_fade_relative_to_interior() {
        let edge: f64 = wavelength_to_rgb(780.0).into_iter().sum();
        let interior: f64 = wavelength_to_rgb(650.0).into_iter().sum();
        assert!(edge < interior);
    }

    #[test]
    fn hcl_white_point_round_trip() {
        // L=100, C=0 is the reference white
        let [r, g, b] = hcl_to_rgb(0.0, 0.0, 100.0);
        assert!((r - 1.0).abs() < 1e-3);
        assert!((g - 1.0).abs() < 1e-3);
        assert!((b - 1.0).abs() < 1e-3);
    }
}
