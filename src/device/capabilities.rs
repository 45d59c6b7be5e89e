//! Device capability descriptors.
//!
//! A driver produces one [`DeviceCapabilities`] value per session. The
//! application consumes it to populate the measurement-type selector, the
//! settings form, and the renderer's default axis range. Capabilities are
//! immutable once handed out; a driver that changes behavior mid-session must
//! be reconnected.

use crate::error::{AppResult, SpectralError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Standard measurement types supported by spectral devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementType {
    Radiance,
    Irradiance,
    Transmittance,
    Reflectance,
    Absorbance,
    Raw,
}

impl MeasurementType {
    /// All known measurement types, in display order.
    pub const ALL: [MeasurementType; 6] = [
        MeasurementType::Radiance,
        MeasurementType::Irradiance,
        MeasurementType::Transmittance,
        MeasurementType::Reflectance,
        MeasurementType::Absorbance,
        MeasurementType::Raw,
    ];

    /// Lowercase wire/CSV tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementType::Radiance => "radiance",
            MeasurementType::Irradiance => "irradiance",
            MeasurementType::Transmittance => "transmittance",
            MeasurementType::Reflectance => "reflectance",
            MeasurementType::Absorbance => "absorbance",
            MeasurementType::Raw => "raw",
        }
    }

    /// Human-readable label for selectors and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            MeasurementType::Radiance => "Radiance",
            MeasurementType::Irradiance => "Irradiance",
            MeasurementType::Transmittance => "Transmittance",
            MeasurementType::Reflectance => "Reflectance",
            MeasurementType::Absorbance => "Absorbance",
            MeasurementType::Raw => "Raw",
        }
    }

    /// Y-axis label for the spectrum plot.
    pub fn axis_label(&self) -> &'static str {
        match self {
            MeasurementType::Radiance => "Spectral Radiance [W/(sr·m²·nm)]",
            MeasurementType::Irradiance => "Spectral Irradiance [W/(m²·nm)]",
            MeasurementType::Transmittance => "Transmittance [%]",
            MeasurementType::Reflectance => "Reflectance [%]",
            MeasurementType::Absorbance => "Absorbance [AU]",
            MeasurementType::Raw => "Raw Counts",
        }
    }
}

impl fmt::Display for MeasurementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value kinds a device setting can take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SettingKind {
    Int,
    Float,
    Bool,
    Choice,
}

/// A typed setting value, as exchanged with a driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Choice(String),
}

impl SettingValue {
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            SettingValue::Int(v) => Some(*v),
            SettingValue::Float(v) => Some(*v as i64),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Int(v) => Some(*v as f64),
            SettingValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_choice(&self) -> Option<&str> {
        match self {
            SettingValue::Choice(v) => Some(v),
            _ => None,
        }
    }
}

impl fmt::Display for SettingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SettingValue::Int(v) => write!(f, "{v}"),
            SettingValue::Float(v) => write!(f, "{v}"),
            SettingValue::Bool(v) => write!(f, "{v}"),
            SettingValue::Choice(v) => f.write_str(v),
        }
    }
}

/// Mapping of setting name to value, as passed to `configure`.
pub type SettingsMap = BTreeMap<String, SettingValue>;

/// Definition of a single configurable device setting.
///
/// Numeric bounds and choice lists are display/validation hints for the
/// settings form; the session core does not enforce them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingDefinition {
    pub name: String,
    pub display_name: String,
    pub kind: SettingKind,
    pub default_value: SettingValue,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Enumerated choices, required for `SettingKind::Choice`.
    #[serde(default)]
    pub choices: Vec<String>,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub tooltip: String,
}

/// Describes what a device can do.
///
/// The control surface is built dynamically from this descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    // Device identification
    pub device_name: String,
    pub device_type: String,
    #[serde(default)]
    pub manufacturer: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub serial_number: String,

    // Measurement capabilities
    pub measurement_types: Vec<MeasurementType>,
    /// (min_nm, max_nm)
    pub wavelength_range: (f64, f64),
    pub pixel_count: usize,

    // Configurable settings, in form order
    #[serde(default)]
    pub settings: Vec<SettingDefinition>,

    // Features
    #[serde(default)]
    pub supports_auto_integration: bool,
    #[serde(default)]
    pub supports_dark_correction: bool,
    #[serde(default)]
    pub supports_continuous_mode: bool,
    #[serde(default)]
    pub supports_triggering: bool,

    // Calibration
    #[serde(default)]
    pub requires_calibration: bool,
    #[serde(default)]
    pub calibration_types: Vec<String>,
}

impl DeviceCapabilities {
    /// Validate internal consistency of the descriptor.
    pub fn validate(&self) -> AppResult<()> {
        if self.wavelength_range.0 >= self.wavelength_range.1 {
            return Err(SpectralError::Configuration(format!(
                "wavelength_range ({}, {}) is not increasing",
                self.wavelength_range.0, self.wavelength_range.1
            )));
        }
        if self.pixel_count == 0 {
            return Err(SpectralError::Configuration(
                "pixel_count must be non-zero".into(),
            ));
        }
        if self.measurement_types.is_empty() {
            return Err(SpectralError::Configuration(
                "device supports no measurement types".into(),
            ));
        }
        for setting in &self.settings {
            if setting.kind == SettingKind::Choice && setting.choices.is_empty() {
                return Err(SpectralError::Configuration(format!(
                    "choice setting '{}' has no choices",
                    setting.name
                )));
            }
        }
        Ok(())
    }

    /// One-line device identity for the status bar.
    pub fn summary(&self) -> String {
        let mut parts = vec![self.device_name.clone()];
        if !self.model.is_empty() {
            parts.push(self.model.clone());
        }
        if !self.serial_number.is_empty() {
            parts.push(format!("S/N {}", self.serial_number));
        }
        parts.push(format!(
            "{:.0}-{:.0} nm, {} px",
            self.wavelength_range.0, self.wavelength_range.1, self.pixel_count
        ));
        parts.join(" | ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> DeviceCapabilities {
        DeviceCapabilities {
            device_name: "Test Spectrometer".into(),
            device_type: "spectrometer".into(),
            manufacturer: String::new(),
            model: "T-100".into(),
            serial_number: "0001".into(),
            measurement_types: vec![MeasurementType::Radiance],
            wavelength_range: (380.0, 780.0),
            pixel_count: 401,
            settings: vec![],
            supports_auto_integration: false,
            supports_dark_correction: false,
            supports_continuous_mode: false,
            supports_triggering: false,
            requires_calibration: false,
            calibration_types: vec![],
        }
    }

    #[test]
    fn valid_capabilities_pass() {
        assert!(caps().validate().is_ok());
    }

    #[test]
    fn choice_setting_requires_choices() {
        let mut c = caps();
        c.settings.push(SettingDefinition {
            name: "mode".into(),
            display_name: "Mode".into(),
            kind: SettingKind::Choice,
            default_value: SettingValue::Choice("fast".into()),
            min_value: None,
            max_value: None,
            choices: vec![],
            unit: String::new(),
            tooltip: String::new(),
        });
        assert!(c.validate().is_err());
    }

    #[test]
    fn inverted_wavelength_range_rejected() {
        let mut c = caps();
        c.wavelength_range = (780.0, 380.0);
        assert!(c.validate().is_err());
    }

    #[test]
    fn measurement_type_tags_are_lowercase() {
        assert_eq!(MeasurementType::Radiance.as_str(), "radiance");
        assert_eq!(MeasurementType::Raw.to_string(), "raw");
    }

    #[test]
    fn setting_value_accessors() {
        assert_eq!(SettingValue::Int(5).as_f64(), Some(5.0));
        assert_eq!(SettingValue::Float(2.5).as_i64(), Some(2));
        assert_eq!(SettingValue::Bool(true).as_bool(), Some(true));
        assert_eq!(SettingValue::Int(1).as_bool(), None);
        assert_eq!(SettingValue::Choice("a".into()).as_choice(), Some("a"));
    }

    #[test]
    fn summary_mentions_range_and_pixels() {
        let s = caps().summary();
        assert!(s.contains("380-780 nm"));
        assert!(s.contains("401 px"));
    }
}
