//! Standard data format for all spectral measurements.
//!
//! Every driver returns data as a [`MeasurementResult`]. The invariants are
//! checked once at construction and the value is immutable afterwards; the
//! current-result slot, the history list, and the renderer all hold the same
//! constructed instance (behind `Arc` where shared).

pub mod history;

use crate::device::capabilities::MeasurementType;
use crate::error::{AppResult, SpectralError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Standard units for spectral measurements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MeasurementUnit {
    /// W/(m²·nm), spectral irradiance
    WattsPerSqmNm,
    /// W/(sr·m²·nm), spectral radiance
    WattsPerSrSqmNm,
    /// lux
    Lux,
    /// cd/m²
    CdPerSqm,
    /// lumens
    Lumens,
    /// percent
    Percent,
    /// absorbance units
    Absorbance,
    /// raw detector counts
    Counts,
    /// arbitrary units
    Arbitrary,
}

impl MeasurementUnit {
    /// Unit symbol for display and CSV output.
    pub fn symbol(&self) -> &'static str {
        match self {
            MeasurementUnit::WattsPerSqmNm => "W/(m²·nm)",
            MeasurementUnit::WattsPerSrSqmNm => "W/(sr·m²·nm)",
            MeasurementUnit::Lux => "lux",
            MeasurementUnit::CdPerSqm => "cd/m²",
            MeasurementUnit::Lumens => "lm",
            MeasurementUnit::Percent => "%",
            MeasurementUnit::Absorbance => "AU",
            MeasurementUnit::Counts => "counts",
            MeasurementUnit::Arbitrary => "a.u.",
        }
    }
}

/// A single completed spectral measurement.
///
/// Constructed exactly once by a driver (or as an invalid sentinel on
/// failure) and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementResult {
    // Spectral data
    pub wavelengths: Vec<f64>,
    pub spectral_data: Vec<f64>,

    // Measurement info
    pub measurement_type: MeasurementType,
    pub timestamp: DateTime<Utc>,

    // Photometric values
    pub luminance: f64,
    pub illuminance: f64,

    // Acquisition parameters
    pub integration_time_ms: u32,
    pub num_scans: u32,

    // Quality indicators
    pub saturation_level: f64,
    pub signal_to_noise: f64,
    pub is_valid: bool,

    // Units
    pub spectral_unit: MeasurementUnit,

    // Raw data (before calibration)
    pub raw_counts: Option<Vec<f64>>,
    pub dark_reference: Option<Vec<f64>>,

    // Device provenance
    pub device_name: String,
    pub device_serial: String,

    // Extra device-specific data
    pub extra_data: BTreeMap<String, serde_json::Value>,

    // Error info, set only on invalid sentinels
    pub error_message: String,
}

impl MeasurementResult {
    /// Construct a valid result, checking the data-model invariants.
    ///
    /// Rejects mismatched array lengths and wavelength arrays that are not
    /// strictly increasing.
    pub fn new(
        measurement_type: MeasurementType,
        wavelengths: Vec<f64>,
        spectral_data: Vec<f64>,
    ) -> AppResult<Self> {
        if wavelengths.len() != spectral_data.len() {
            return Err(SpectralError::InvalidData(format!(
                "{} wavelengths but {} spectral values",
                wavelengths.len(),
                spectral_data.len()
            )));
        }
        if wavelengths.windows(2).any(|w| w[1] <= w[0]) {
            return Err(SpectralError::InvalidData(
                "wavelengths are not strictly increasing".into(),
            ));
        }
        Ok(Self {
            wavelengths,
            spectral_data,
            measurement_type,
            timestamp: Utc::now(),
            luminance: 0.0,
            illuminance: 0.0,
            integration_time_ms: 0,
            num_scans: 1,
            saturation_level: 0.0,
            signal_to_noise: 0.0,
            is_valid: true,
            spectral_unit: MeasurementUnit::Arbitrary,
            raw_counts: None,
            dark_reference: None,
            device_name: String::new(),
            device_serial: String::new(),
            extra_data: BTreeMap::new(),
            error_message: String::new(),
        })
    }

    /// Construct an invalid sentinel carrying an error message.
    pub fn invalid(measurement_type: MeasurementType, message: impl Into<String>) -> Self {
        Self {
            wavelengths: Vec::new(),
            spectral_data: Vec::new(),
            measurement_type,
            timestamp: Utc::now(),
            luminance: 0.0,
            illuminance: 0.0,
            integration_time_ms: 0,
            num_scans: 1,
            saturation_level: 0.0,
            signal_to_noise: 0.0,
            is_valid: false,
            spectral_unit: MeasurementUnit::Arbitrary,
            raw_counts: None,
            dark_reference: None,
            device_name: String::new(),
            device_serial: String::new(),
            extra_data: BTreeMap::new(),
            error_message: message.into(),
        }
    }

    /// Set photometric values (luminance for radiance, illuminance for
    /// irradiance).
    pub fn with_photometrics(mut self, luminance: f64, illuminance: f64) -> Self {
        self.luminance = luminance;
        self.illuminance = illuminance;
        self
    }

    /// Set acquisition parameters.
    pub fn with_acquisition(mut self, integration_time_ms: u32, num_scans: u32) -> Self {
        self.integration_time_ms = integration_time_ms;
        self.num_scans = num_scans;
        self
    }

    /// Set quality indicators.
    pub fn with_quality(mut self, saturation_level: f64, signal_to_noise: f64) -> Self {
        self.saturation_level = saturation_level;
        self.signal_to_noise = signal_to_noise;
        self
    }

    /// Set the spectral unit tag.
    pub fn with_unit(mut self, unit: MeasurementUnit) -> Self {
        self.spectral_unit = unit;
        self
    }

    /// Set device provenance.
    pub fn with_device(mut self, name: impl Into<String>, serial: impl Into<String>) -> Self {
        self.device_name = name.into();
        self.device_serial = serial.into();
        self
    }

    /// Number of spectral pixels.
    pub fn pixel_count(&self) -> usize {
        self.wavelengths.len()
    }

    /// (min_wavelength, max_wavelength) in nm, or (0, 0) when empty.
    pub fn wavelength_range(&self) -> (f64, f64) {
        match (self.wavelengths.first(), self.wavelengths.last()) {
            (Some(first), Some(last)) => (*first, *last),
            _ => (0.0, 0.0),
        }
    }

    /// Wavelength at maximum intensity, or 0.0 when empty.
    pub fn peak_wavelength(&self) -> f64 {
        let mut best = None::<(f64, f64)>;
        for (w, v) in self.wavelengths.iter().zip(&self.spectral_data) {
            match best {
                Some((_, bv)) if *v <= bv => {}
                _ => best = Some((*w, *v)),
            }
        }
        best.map_or(0.0, |(w, _)| w)
    }

    /// Maximum spectral value, or 0.0 when empty.
    pub fn peak_value(&self) -> f64 {
        self.spectral_data.iter().copied().fold(0.0, f64::max)
    }

    /// Integrated (total) spectral power, left-rectangle sum over the
    /// wavelength grid.
    pub fn integrated_value(&self) -> f64 {
        if self.spectral_data.len() < 2 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in 0..self.spectral_data.len() - 1 {
            let dw = self.wavelengths[i + 1] - self.wavelengths[i];
            total += self.spectral_data[i] * dw;
        }
        total
    }

    /// Primary display value based on measurement type.
    pub fn display_value(&self) -> f64 {
        match self.measurement_type {
            MeasurementType::Radiance => self.luminance,
            MeasurementType::Irradiance => self.illuminance,
            _ => self.integrated_value(),
        }
    }

    /// Unit string for the primary display value.
    pub fn display_unit(&self) -> &'static str {
        match self.measurement_type {
            MeasurementType::Radiance => "cd/m²",
            MeasurementType::Irradiance => "lux",
            _ => self.spectral_unit.symbol(),
        }
    }

    /// CSV header record for this result's wavelength grid.
    pub fn csv_header(&self) -> Vec<String> {
        let mut header = vec![
            "timestamp".to_string(),
            "type".to_string(),
            "display_value".to_string(),
            "int_time_ms".to_string(),
            "num_scans".to_string(),
            "saturation".to_string(),
        ];
        header.extend(self.wavelengths.iter().map(|w| format!("{w:.2}")));
        header
    }

    /// CSV data record: metadata columns followed by the spectral values.
    pub fn csv_record(&self) -> Vec<String> {
        let mut record = vec![
            self.timestamp.to_rfc3339(),
            self.measurement_type.as_str().to_string(),
            format!("{:.6e}", self.display_value()),
            self.integration_time_ms.to_string(),
            self.num_scans.to_string(),
            format!("{:.4}", self.saturation_level),
        ];
        record.extend(self.spectral_data.iter().map(|v| format!("{v:.6e}")));
        record
    }

    /// Human-readable multi-line summary for the info panel.
    pub fn summary(&self) -> String {
        format!(
            "Type: {}\nValue: {:.4} {}\nIntegration: {} ms\nScans: {}\nSaturation: {:.1}%\nTime: {}",
            self.measurement_type.label(),
            self.display_value(),
            self.display_unit(),
            self.integration_time_ms,
            self.num_scans,
            self.saturation_level * 100.0,
            self.timestamp.format("%H:%M:%S")
        )
    }
}
