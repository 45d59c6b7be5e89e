//! Live spectrum rendering pipeline.
//!
//! [`SpectrumRenderer`] keeps the plot in sync with the latest measurement
//! without rebuilding the whole scene on every update. Two explicit paths,
//! selected by a cache-validity check rather than by catching a draw error:
//!
//! - **Full** — recompute axis limits, resample the visible-spectrum
//!   gradient backdrop at integer-nm steps across the current view, and
//!   snapshot it into the cache.
//! - **Cached** — reuse the cached backdrop and redraw only the data line
//!   and overlays.
//!
//! Zoom, reset, autoscale changes, overlay changes, and gradient-visibility
//! toggles invalidate the cache. Under autoscale, fresh data whose extrema
//! fall outside the cached Y-limits also forces a full pass. The GUI layer
//! reports incremental-draw failures (for example a dropped texture) via
//! [`SpectrumRenderer::notify_draw_failure`], which falls back to a full
//! rebuild on the next update.
//!
//! Peak wavelength/value are recomputed from the freshly supplied data on
//! every update, never cached.

pub mod color;

use egui::Color32;
use log::trace;
use std::collections::BTreeMap;

/// Fractional Y margin applied above and below the data under autoscale.
const Y_MARGIN_FRACTION: f64 = 0.1;
/// Backdrop transparency.
const GRADIENT_ALPHA: f32 = 0.3;

/// Current plot view rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisLimits {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Which render path an update took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderPass {
    /// Backdrop rebuilt and re-snapshotted.
    Full,
    /// Cached backdrop reused; only lines redrawn.
    Cached,
}

/// A named reference spectrum drawn on top of the backdrop.
#[derive(Debug, Clone)]
pub struct Overlay {
    pub wavelengths: Vec<f64>,
    pub data: Vec<f64>,
    pub color: Color32,
}

/// Snapshot of the rendered background and the limits it was computed for.
struct RenderCache {
    limits: AxisLimits,
    /// Gradient samples: (wavelength nm, premixed color).
    gradient: Vec<(f64, Color32)>,
}

/// Maintains the cached-backdrop / incremental-redraw protocol.
pub struct SpectrumRenderer {
    default_range: (f64, f64),
    wavelengths: Vec<f64>,
    data: Vec<f64>,
    overlays: BTreeMap<String, Overlay>,
    autoscale_y: bool,
    show_gradient: bool,
    show_grid: bool,
    limits: AxisLimits,
    cache: Option<RenderCache>,
    dirty: bool,
    peak: Option<(f64, f64)>,
}

impl SpectrumRenderer {
    /// Create a renderer with the device's wavelength range as the default
    /// view.
    pub fn new(default_range: (f64, f64)) -> Self {
        Self {
            default_range,
            wavelengths: Vec::new(),
            data: Vec::new(),
            overlays: BTreeMap::new(),
            autoscale_y: true,
            show_gradient: true,
            show_grid: true,
            limits: AxisLimits {
                x_min: default_range.0,
                x_max: default_range.1,
                y_min: 0.0,
                y_max: 1.0,
            },
            cache: None,
            dirty: true,
            peak: None,
        }
    }

    /// Feed fresh measurement data; returns which path the redraw takes.
    pub fn update(&mut self, wavelengths: &[f64], data: &[f64]) -> RenderPass {
        self.wavelengths = wavelengths.to_vec();
        self.data = data.to_vec();
        self.peak = wavelengths
            .iter()
            .zip(data)
            .fold(None, |best: Option<(f64, f64)>, (&w, &v)| match best {
                Some((_, bv)) if v <= bv => best,
                _ => Some((w, v)),
            });

        if self.autoscale_y {
            if let (Some((lo, hi)), Some(cache)) = (self.data_extrema(), self.cache.as_ref()) {
                if lo < cache.limits.y_min || hi > cache.limits.y_max {
                    trace!("data extrema outside cached Y-limits, forcing full pass");
                    self.dirty = true;
                }
            }
        }

        if self.dirty || self.cache.is_none() {
            self.rebuild();
            RenderPass::Full
        } else {
            RenderPass::Cached
        }
    }

    /// Discard the cached backdrop; the next update runs a full pass.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    /// GUI-side incremental draw failed; rebuild instead of propagating.
    pub fn notify_draw_failure(&mut self) {
        trace!("incremental draw failed, invalidating backdrop");
        self.invalidate();
    }

    /// Shrink the X view to 70% about its center.
    pub fn zoom_in(&mut self) {
        self.scale_view(0.7);
    }

    /// Grow the X view to 140% about its center.
    pub fn zoom_out(&mut self) {
        self.scale_view(1.4);
    }

    fn scale_view(&mut self, factor: f64) {
        let center = (self.limits.x_min + self.limits.x_max) / 2.0;
        let half = (self.limits.x_max - self.limits.x_min) / 2.0 * factor;
        self.limits.x_min = center - half;
        self.limits.x_max = center + half;
        self.invalidate();
    }

    /// Restore the default view.
    pub fn reset_zoom(&mut self) {
        self.limits.x_min = self.default_range.0;
        self.limits.x_max = self.default_range.1;
        self.invalidate();
    }

    pub fn autoscale_y(&self) -> bool {
        self.autoscale_y
    }

    pub fn set_autoscale_y(&mut self, on: bool) {
        if self.autoscale_y != on {
            self.autoscale_y = on;
            self.invalidate();
        }
    }

    pub fn show_gradient(&self) -> bool {
        self.show_gradient
    }

    pub fn set_show_gradient(&mut self, on: bool) {
        if self.show_gradient != on {
            self.show_gradient = on;
            self.invalidate();
        }
    }

    /// Grid lines are drawn live by the plot widget; toggling them does not
    /// touch the backdrop cache.
    pub fn show_grid(&self) -> bool {
        self.show_grid
    }

    pub fn set_show_grid(&mut self, on: bool) {
        self.show_grid = on;
    }

    /// Add or replace a named reference spectrum.
    pub fn add_overlay(&mut self, name: impl Into<String>, overlay: Overlay) {
        self.overlays.insert(name.into(), overlay);
        self.invalidate();
    }

    /// Remove a named reference spectrum, if present.
    pub fn remove_overlay(&mut self, name: &str) -> bool {
        let removed = self.overlays.remove(name).is_some();
        if removed {
            self.invalidate();
        }
        removed
    }

    /// Remove all reference spectra.
    pub fn clear_overlays(&mut self) {
        if !self.overlays.is_empty() {
            self.overlays.clear();
            self.invalidate();
        }
    }

    pub fn overlays(&self) -> &BTreeMap<String, Overlay> {
        &self.overlays
    }

    /// Current view limits.
    pub fn limits(&self) -> AxisLimits {
        self.limits
    }

    /// Peak (wavelength, value) of the latest data, recomputed each update.
    pub fn peak(&self) -> Option<(f64, f64)> {
        self.peak
    }

    /// Latest data line, as (wavelength, value) pairs.
    pub fn line_points(&self) -> impl Iterator<Item = [f64; 2]> + '_ {
        self.wavelengths
            .iter()
            .zip(&self.data)
            .map(|(&w, &v)| [w, v])
    }

    /// Cached gradient backdrop samples, empty when hidden.
    pub fn gradient_samples(&self) -> &[(f64, Color32)] {
        self.cache
            .as_ref()
            .map_or(&[], |cache| cache.gradient.as_slice())
    }

    /// Min/max over the current data and all overlays.
    fn data_extrema(&self) -> Option<(f64, f64)> {
        let mut extrema = None;
        let all = self
            .data
            .iter()
            .chain(self.overlays.values().flat_map(|o| o.data.iter()));
        for &v in all {
            extrema = Some(match extrema {
                None => (v, v),
                Some((lo, hi)) => (f64::min(lo, v), f64::max(hi, v)),
            });
        }
        extrema
    }

    fn rebuild(&mut self) {
        if self.autoscale_y {
            if let Some((lo, hi)) = self.data_extrema() {
                let margin = if hi > lo {
                    (hi - lo) * Y_MARGIN_FRACTION
                } else {
                    // Flat data still gets a visible band
                    0.1
                };
                self.limits.y_min = lo - margin;
                self.limits.y_max = hi + margin;
            }
        }

        let gradient = if self.show_gradient {
            let start = self.limits.x_min.ceil().max(380.0) as i64;
            let end = self.limits.x_max.floor().min(780.0) as i64;
            (start..=end)
                .map(|nm| {
                    let [r, g, b] = color::wavelength_to_rgb(nm as f64);
                    let color = Color32::from_rgba_unmultiplied(
                        (r * 255.0) as u8,
                        (g * 255.0) as u8,
                        (b * 255.0) as u8,
                        (GRADIENT_ALPHA * 255.0) as u8,
                    );
                    (nm as f64, color)
                })
                .collect()
        } else {
            Vec::new()
        };

        self.cache = Some(RenderCache {
            limits: self.limits,
            gradient,
        });
        self.dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn renderer() -> SpectrumRenderer {
        SpectrumRenderer::new((380.0, 780.0))
    }

    fn ramp(n: usize, peak: f64) -> (Vec<f64>, Vec<f64>) {
        let wavelengths: Vec<f64> = (0..n).map(|i| 380.0 + i as f64).collect();
        let data: Vec<f64> = (0..n)
            .map(|i| peak * (i as f64 / (n - 1) as f64))
            .collect();
        (wavelengths, data)
    }

    #[test]
    fn first_update_is_full_then_cached() {
        let mut r = renderer();
        let (w, d) = ramp(11, 1.0);
        assert_eq!(r.update(&w, &d), RenderPass::Full);
        assert_eq!(r.update(&w, &d), RenderPass::Cached);
        assert_eq!(r.update(&w, &d), RenderPass::Cached);
    }

    #[test]
    fn autoscale_overflow_rebuilds() {
        let mut r = renderer();
        let (w, d) = ramp(11, 1.0);
        r.update(&w, &d);

        // Within the cached limits: cache reused.
        let (w2, d2) = ramp(11, 0.9);
        assert_eq!(r.update(&w2, &d2), RenderPass::Cached);

        // Exceeds the cached Y-limits: full rebuild.
        let (w3, d3) = ramp(11, 2.0);
        assert_eq!(r.update(&w3, &d3), RenderPass::Full);
        assert!(r.limits().y_max > 2.0);
    }

    #[test]
    fn autoscale_off_never_rebuilds_for_data() {
        let mut r = renderer();
        r.set_autoscale_y(false);
        let (w, d) = ramp(11, 1.0);
        r.update(&w, &d);
        let (w2, d2) = ramp(11, 100.0);
        assert_eq!(r.update(&w2, &d2), RenderPass::Cached);
    }

    #[test]
    fn overlay_changes_invalidate() {
        let mut r = renderer();
        let (w, d) = ramp(11, 1.0);
        r.update(&w, &d);

        r.add_overlay(
            "reference",
            Overlay {
                wavelengths: w.clone(),
                data: d.clone(),
                color: Color32::GRAY,
            },
        );
        assert_eq!(r.update(&w, &d), RenderPass::Full);
        assert_eq!(r.update(&w, &d), RenderPass::Cached);

        assert!(r.remove_overlay("reference"));
        assert_eq!(r.update(&w, &d), RenderPass::Full);
        assert!(!r.remove_overlay("reference"));
    }

    #[test]
    fn zoom_and_gradient_toggle_invalidate() {
        let mut r = renderer();
        let (w, d) = ramp(11, 1.0);
        r.update(&w, &d);

        r.zoom_in();
        assert_eq!(r.update(&w, &d), RenderPass::Full);

        r.set_show_gradient(false);
        assert_eq!(r.update(&w, &d), RenderPass::Full);
        assert!(r.gradient_samples().is_empty());

        r.reset_zoom();
        assert_eq!(r.update(&w, &d), RenderPass::Full);
        assert_eq!(r.limits().x_min, 380.0);
        assert_eq!(r.limits().x_max, 780.0);
    }

    #[test]
    fn zoom_scales_about_center() {
        let mut r = renderer();
        r.zoom_in();
        let l = r.limits();
        assert!((l.x_min - 440.0).abs() < 1e-9);
        assert!((l.x_max - 720.0).abs() < 1e-9);
        r.zoom_out();
        let l = r.limits();
        assert!((l.x_min - 384.0).abs() < 1e-9);
        assert!((l.x_max - 776.0).abs() < 1e-9);
    }

    #[test]
    fn gradient_sampled_at_integer_nm_within_view() {
        let mut r = renderer();
        let (w, d) = ramp(401, 1.0);
        r.update(&w, &d);
        let samples = r.gradient_samples();
        assert_eq!(samples.len(), 401);
        assert_eq!(samples[0].0, 380.0);
        assert_eq!(samples[400].0, 780.0);

        // Zoomed view only samples the visible portion.
        r.zoom_in();
        r.update(&w, &d);
        let samples = r.gradient_samples();
        assert_eq!(samples.first().map(|s| s.0), Some(440.0));
        assert_eq!(samples.last().map(|s| s.0), Some(720.0));
    }

    #[test]
    fn peak_recomputed_every_update() {
        let mut r = renderer();
        let w = vec![500.0, 501.0, 502.0];
        r.update(&w, &[0.1, 0.9, 0.2]);
        assert_eq!(r.peak(), Some((501.0, 0.9)));
        r.update(&w, &[0.8, 0.1, 0.2]);
        assert_eq!(r.peak(), Some((500.0, 0.8)));
    }

    #[test]
    fn draw_failure_triggers_full_rebuild() {
        let mut r = renderer();
        let (w, d) = ramp(11, 1.0);
        r.update(&w, &d);
        r.notify_draw_failure();
        assert_eq!(r.update(&w, &d), RenderPass::Full);
    }

    #[test]
    fn flat_data_gets_fixed_margin() {
        let mut r = renderer();
        let w = vec![500.0, 501.0];
        r.update(&w, &[0.5, 0.5]);
        let l = r.limits();
        assert!((l.y_min - 0.4).abs() < 1e-9);
        assert!((l.y_max - 0.6).abs() < 1e-9);
    }
}
