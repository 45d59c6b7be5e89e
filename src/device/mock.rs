//! Mock spectrometer driver.
//!
//! Simulated device for running the application without hardware. Produces a
//! realistic-looking three-peak visible spectrum with noise and a randomized
//! acquisition delay. Also used as the fallback device when connecting to
//! real hardware fails.

use crate::device::capabilities::{
    DeviceCapabilities, MeasurementType, SettingDefinition, SettingKind, SettingValue, SettingsMap,
};
use crate::device::SpectralDevice;
use crate::error::{AppResult, SpectralError};
use crate::measurement::{MeasurementResult, MeasurementUnit};
use rand::Rng;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

const PIXEL_COUNT: usize = 401;
const WAVELENGTH_MIN: f64 = 380.0;

/// Simulated spectrometer with 401 pixels over 380-780 nm at 1 nm steps.
pub struct MockSpectrometer {
    connected: AtomicBool,
    integration_time_ms: AtomicU32,
    num_scans: AtomicU32,
    /// Base acquisition delay; a random component up to the same amount is
    /// added per measurement. Zero in tests.
    base_delay: Duration,
}

impl MockSpectrometer {
    pub fn new() -> Self {
        Self {
            connected: AtomicBool::new(false),
            integration_time_ms: AtomicU32::new(100),
            num_scans: AtomicU32::new(10),
            base_delay: Duration::from_millis(500),
        }
    }

    /// Mock with a custom acquisition delay, for tests.
    pub fn with_delay(base_delay: Duration) -> Self {
        Self {
            base_delay,
            ..Self::new()
        }
    }

    fn simulated_spectrum(rng: &mut impl Rng) -> (Vec<f64>, Vec<f64>) {
        let wavelengths: Vec<f64> = (0..PIXEL_COUNT).map(|i| WAVELENGTH_MIN + i as f64).collect();
        let data = wavelengths
            .iter()
            .map(|&wl| {
                // Main peak around 550 nm (green)
                let mut val = 0.8 * (-0.5 * ((wl - 550.0) / 30.0).powi(2)).exp();
                // Secondary peak around 480 nm (blue)
                val += 0.4 * (-0.5 * ((wl - 480.0) / 20.0).powi(2)).exp();
                // Third peak around 620 nm (red)
                val += 0.6 * (-0.5 * ((wl - 620.0) / 25.0).powi(2)).exp();
                val += gauss(rng, 0.02);
                val.max(0.0)
            })
            .collect();
        (wavelengths, data)
    }
}

/// Box-Muller sample from N(0, sigma).
fn gauss(rng: &mut impl Rng, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    sigma * (-2.0 * u1.ln()).sqrt() * (std::f64::consts::TAU * u2).cos()
}

impl Default for MockSpectrometer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpectralDevice for MockSpectrometer {
    fn connect(&self) -> AppResult<()> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn capabilities(&self) -> DeviceCapabilities {
        DeviceCapabilities {
            device_name: "Mock Spectrometer".into(),
            device_type: "Mock".into(),
            manufacturer: "Test".into(),
            model: "MOCK-1000".into(),
            serial_number: "MOCK001".into(),
            measurement_types: vec![MeasurementType::Radiance, MeasurementType::Irradiance],
            wavelength_range: (380.0, 780.0),
            pixel_count: PIXEL_COUNT,
            settings: vec![
                SettingDefinition {
                    name: "integration_time".into(),
                    display_name: "Integration Time".into(),
                    kind: SettingKind::Int,
                    default_value: SettingValue::Int(100),
                    min_value: Some(1.0),
                    max_value: Some(10_000.0),
                    choices: vec![],
                    unit: "ms".into(),
                    tooltip: "Time to collect light".into(),
                },
                SettingDefinition {
                    name: "num_scans".into(),
                    display_name: "Number of Scans".into(),
                    kind: SettingKind::Int,
                    default_value: SettingValue::Int(10),
                    min_value: Some(1.0),
                    max_value: Some(100.0),
                    choices: vec![],
                    unit: String::new(),
                    tooltip: "Number of spectra to average".into(),
                },
            ],
            supports_auto_integration: true,
            supports_dark_correction: false,
            supports_continuous_mode: false,
            supports_triggering: false,
            requires_calibration: false,
            calibration_types: vec![],
        }
    }

    fn configure(&self, settings: &SettingsMap) -> AppResult<()> {
        if let Some(v) = settings.get("integration_time") {
            let ms = v.as_i64().ok_or_else(|| {
                SpectralError::Configuration("integration_time must be numeric".into())
            })?;
            if !(1..=10_000).contains(&ms) {
                return Err(SpectralError::Configuration(format!(
                    "integration_time {ms} out of range 1-10000 ms"
                )));
            }
            self.integration_time_ms.store(ms as u32, Ordering::SeqCst);
        }
        if let Some(v) = settings.get("num_scans") {
            let n = v
                .as_i64()
                .ok_or_else(|| SpectralError::Configuration("num_scans must be numeric".into()))?;
            if !(1..=100).contains(&n) {
                return Err(SpectralError::Configuration(format!(
                    "num_scans {n} out of range 1-100"
                )));
            }
            self.num_scans.store(n as u32, Ordering::SeqCst);
        }
        Ok(())
    }

    fn measure(&self, measurement_type: MeasurementType) -> AppResult<MeasurementResult> {
        if !self.is_connected() {
            return Err(SpectralError::Connection("mock device not connected".into()));
        }

        let mut rng = rand::thread_rng();

        if !self.base_delay.is_zero() {
            let jitter = rng.gen_range(0..=self.base_delay.as_millis() as u64 * 2);
            std::thread::sleep(self.base_delay + Duration::from_millis(jitter));
        }

        let (wavelengths, data) = Self::simulated_spectrum(&mut rng);
        let brightness = data.iter().sum::<f64>() * 10.0 + gauss(&mut rng, 5.0);

        let (luminance, illuminance, unit) = match measurement_type {
            MeasurementType::Radiance => (brightness, 0.0, MeasurementUnit::WattsPerSrSqmNm),
            MeasurementType::Irradiance => (0.0, brightness, MeasurementUnit::WattsPerSqmNm),
            _ => (0.0, 0.0, MeasurementUnit::Arbitrary),
        };

        Ok(
            MeasurementResult::new(measurement_type, wavelengths, data)?
                .with_photometrics(luminance, illuminance)
                .with_acquisition(
                    self.integration_time_ms.load(Ordering::SeqCst),
                    self.num_scans.load(Ordering::SeqCst),
                )
                .with_quality(rng.gen_range(0.0..0.1), 0.0)
                .with_unit(unit)
                .with_device("Mock Spectrometer", "MOCK001"),
        )
    }

    fn current_settings(&self) -> SettingsMap {
        let mut map = SettingsMap::new();
        map.insert(
            "integration_time".into(),
            SettingValue::Int(i64::from(self.integration_time_ms.load(Ordering::SeqCst))),
        );
        map.insert(
            "num_scans".into(),
            SettingValue::Int(i64::from(self.num_scans.load(Ordering::SeqCst))),
        );
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock() -> MockSpectrometer {
        let m = MockSpectrometer::with_delay(Duration::ZERO);
        m.connect().unwrap();
        m
    }

    #[test]
    fn produces_401_points_at_one_nm_steps() {
        let r = mock().measure(MeasurementType::Irradiance).unwrap();
        assert_eq!(r.pixel_count(), 401);
        assert_eq!(r.wavelength_range(), (380.0, 780.0));
        for w in r.wavelengths.windows(2) {
            assert!((w[1] - w[0] - 1.0).abs() < 1e-12);
        }
        assert!(r.spectral_data.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn photometrics_follow_measurement_type() {
        let m = mock();
        let radiance = m.measure(MeasurementType::Radiance).unwrap();
        assert_ne!(radiance.luminance, 0.0);
        assert_eq!(radiance.illuminance, 0.0);

        let irradiance = m.measure(MeasurementType::Irradiance).unwrap();
        assert_eq!(irradiance.luminance, 0.0);
        assert_ne!(irradiance.illuminance, 0.0);
    }

    #[test]
    fn measure_requires_connection() {
        let m = MockSpectrometer::with_delay(Duration::ZERO);
        assert!(m.measure(MeasurementType::Radiance).is_err());
    }

    #[test]
    fn configure_round_trips_settings() {
        let m = mock();
        let mut settings = SettingsMap::new();
        settings.insert("integration_time".into(), SettingValue::Int(250));
        settings.insert("num_scans".into(), SettingValue::Int(5));
        m.configure(&settings).unwrap();

        let current = m.current_settings();
        assert_eq!(current["integration_time"], SettingValue::Int(250));
        assert_eq!(current["num_scans"], SettingValue::Int(5));

        let r = m.measure(MeasurementType::Radiance).unwrap();
        assert_eq!(r.integration_time_ms, 250);
        assert_eq!(r.num_scans, 5);
    }

    #[test]
    fn configure_rejects_out_of_range() {
        let m = mock();
        let mut settings = SettingsMap::new();
        settings.insert("integration_time".into(), SettingValue::Int(0));
        assert!(m.configure(&settings).is_err());
    }

    #[test]
    fn capabilities_validate() {
        assert!(mock().capabilities().validate().is_ok());
    }
}
