//! Application configuration via Figment.
//!
//! Configuration is loaded from:
//! 1. a TOML file (default `config/spectral_bench.toml`)
//! 2. environment variables prefixed with `SPECTRAL_BENCH_`
//!
//! Every field has a default, so a missing file yields a runnable
//! configuration.

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    /// Application settings
    #[serde(default)]
    pub application: ApplicationConfig,
    /// Measurement loop settings
    #[serde(default)]
    pub measurement: MeasurementConfig,
    /// Export settings
    #[serde(default)]
    pub export: ExportConfig,
}

/// Application-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Window/application name
    #[serde(default = "default_app_name")]
    pub name: String,
    /// Logging level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Measurement loop configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeasurementConfig {
    /// Default device driver to connect at startup
    #[serde(default = "default_device")]
    pub default_device: String,
    /// Control-surface polling tick in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Default auto-repeat cycle interval in seconds
    #[serde(default = "default_auto_repeat_interval")]
    pub auto_repeat_interval_secs: u64,
}

/// Export configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory proposed for CSV exports
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

fn default_app_name() -> String {
    "Spectral Bench".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_device() -> String {
    "mock".to_string()
}

fn default_poll_interval() -> u64 {
    100
}

fn default_auto_repeat_interval() -> u64 {
    5
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("data")
}

impl Default for ApplicationConfig {
    fn default() -> Self {
        Self {
            name: default_app_name(),
            log_level: default_log_level(),
        }
    }
}

impl Default for MeasurementConfig {
    fn default() -> Self {
        Self {
            default_device: default_device(),
            poll_interval_ms: default_poll_interval(),
            auto_repeat_interval_secs: default_auto_repeat_interval(),
        }
    }
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

impl Settings {
    /// Load from the default file location and environment.
    ///
    /// Environment variables override file values with the prefix
    /// `SPECTRAL_BENCH_`, e.g. `SPECTRAL_BENCH_APPLICATION_LOG_LEVEL=debug`.
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from("config/spectral_bench.toml")
    }

    /// Load from a specific file path plus environment overrides.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, figment::Error> {
        Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("SPECTRAL_BENCH_").split("_"))
            .extract()
    }

    /// Validate configuration after loading.
    pub fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.application.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.application.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.measurement.poll_interval_ms < 10 {
            return Err(format!(
                "poll_interval_ms {} is too small (minimum 10)",
                self.measurement.poll_interval_ms
            ));
        }

        if self.measurement.auto_repeat_interval_secs < 1 {
            return Err("auto_repeat_interval_secs must be at least 1".to_string());
        }

        Ok(())
    }
}
