//! Device abstraction layer.
//!
//! Any spectral measurement instrument plugs into the application by
//! implementing the [`SpectralDevice`] capability contract. The contract is
//! deliberately small: required operations cover connect/measure/configure,
//! and optional operations (abort, calibration, self-test) default to
//! documented no-ops so simple drivers stay simple.

pub mod capabilities;
pub mod mock;
pub mod session;

use crate::error::AppResult;
use crate::measurement::MeasurementResult;
use capabilities::{DeviceCapabilities, MeasurementType, SettingsMap};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Standard device status values.
///
/// Exactly one status field lives on [`session::DeviceSession`]; session
/// transitions are the only writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceStatus {
    Disconnected,
    Connecting,
    Connected,
    Measuring,
    Error,
    Busy,
}

impl fmt::Display for DeviceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeviceStatus::Disconnected => "Disconnected",
            DeviceStatus::Connecting => "Connecting...",
            DeviceStatus::Connected => "Ready",
            DeviceStatus::Measuring => "Measuring...",
            DeviceStatus::Error => "Error",
            DeviceStatus::Busy => "Busy",
        };
        f.write_str(s)
    }
}

/// Result of a calibration-status query.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationStatus {
    pub calibrated: bool,
    pub message: String,
    /// Per-calibration-type details, driver specific.
    #[serde(default)]
    pub details: BTreeMap<String, String>,
}

impl CalibrationStatus {
    /// Status returned by devices without calibration support.
    pub fn unsupported() -> Self {
        Self {
            calibrated: false,
            message: "Calibration not supported".into(),
            details: BTreeMap::new(),
        }
    }
}

/// Capability contract implemented by every spectral device driver.
///
/// # Contract
/// - `measure` may block for several seconds depending on integration time.
///   It is always invoked from a worker context, never from the control
///   surface (see [`crate::scheduler::MeasurementScheduler`]).
/// - The scheduler guarantees at most one `measure` call is in flight at a
///   time, but `abort_measurement` may be called concurrently with it.
///
/// # Thread Safety
/// - All methods require `&self` (immutable reference)
/// - Interior mutability (Mutex/RwLock) should be used for state
pub trait SpectralDevice: Send + Sync {
    /// Establish connection to the device.
    fn connect(&self) -> AppResult<()>;

    /// Clean disconnect, releasing all resources.
    fn disconnect(&self);

    /// Check if the device is currently connected and ready.
    fn is_connected(&self) -> bool;

    /// Return the device capability descriptor.
    fn capabilities(&self) -> DeviceCapabilities;

    /// Apply settings to the device.
    fn configure(&self, settings: &SettingsMap) -> AppResult<()>;

    /// Perform a measurement. May block.
    fn measure(&self, measurement_type: MeasurementType) -> AppResult<MeasurementResult>;

    /// Get current device settings.
    fn current_settings(&self) -> SettingsMap;

    /// Abort an in-progress measurement, best effort.
    ///
    /// Returns whether the device accepted the abort. Lack of support is not
    /// an error.
    fn abort_measurement(&self) -> bool {
        false
    }

    /// Perform a device calibration of the named type.
    ///
    /// Returns whether the calibration succeeded. Default: unsupported.
    fn perform_calibration(&self, _calibration_type: &str) -> bool {
        false
    }

    /// Get calibration status.
    fn calibration_status(&self) -> CalibrationStatus {
        CalibrationStatus::unsupported()
    }

    /// Perform a device self-test.
    fn self_test(&self) -> (bool, String) {
        (true, "Self-test not implemented".into())
    }
}
