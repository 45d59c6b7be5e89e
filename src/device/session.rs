//! Device session state machine.
//!
//! [`DeviceSession`] wraps a [`SpectralDevice`] and owns the authoritative
//! status and last-error state, translating device outcomes into status
//! transitions and notifying registered listeners.
//!
//! ## State machine (initial = Disconnected)
//!
//! | From                | Event                         | To           |
//! |---------------------|-------------------------------|--------------|
//! | Disconnected        | `connect()` succeeds          | Connected    |
//! | Disconnected        | `connect()` fails             | Error        |
//! | Connected           | measurement starts            | Measuring    |
//! | Measuring           | measurement completes         | Connected    |
//! | any                 | `set_error()`                 | Error        |
//! | Error               | `clear_error()`               | Connected if connected, else Disconnected |
//! | Connected/Measuring | `disconnect()`                | Disconnected |
//!
//! Transitions not in the table are rejected. All session mutation happens on
//! the control surface thread; the worker context never touches the session,
//! it only reports outcomes through the scheduler channel.
//!
//! ## Listeners
//!
//! Three typed event channels: `status_changed`, `measurement_complete` and
//! `error`. A listener that panics is logged and isolated; it never prevents
//! the remaining listeners from running, and never propagates to the caller
//! of the state change.

use crate::device::{DeviceStatus, SpectralDevice};
use crate::error::{AppResult, SpectralError};
use crate::measurement::MeasurementResult;
use log::{debug, warn};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

type StatusListener = Box<dyn FnMut(DeviceStatus)>;
type ResultListener = Box<dyn FnMut(&MeasurementResult)>;
type ErrorListener = Box<dyn FnMut(&str)>;

/// Owns device status, last error, and the event-listener registry.
pub struct DeviceSession {
    device: Arc<dyn SpectralDevice>,
    status: DeviceStatus,
    last_error: Option<String>,
    status_listeners: Vec<StatusListener>,
    result_listeners: Vec<ResultListener>,
    error_listeners: Vec<ErrorListener>,
}

impl DeviceSession {
    /// Create a session around a device. Initial status is Disconnected.
    pub fn new(device: Arc<dyn SpectralDevice>) -> Self {
        Self {
            device,
            status: DeviceStatus::Disconnected,
            last_error: None,
            status_listeners: Vec::new(),
            result_listeners: Vec::new(),
            error_listeners: Vec::new(),
        }
    }

    /// The wrapped device.
    pub fn device(&self) -> &Arc<dyn SpectralDevice> {
        &self.device
    }

    /// Current session status.
    pub fn status(&self) -> DeviceStatus {
        self.status
    }

    /// Last error message, if any.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Human-readable status line, including the error message when in Error.
    pub fn status_string(&self) -> String {
        match self.status {
            DeviceStatus::Error => format!(
                "Error: {}",
                self.last_error.as_deref().unwrap_or("unknown")
            ),
            other => other.to_string(),
        }
    }

    /// Register a listener for status changes.
    pub fn on_status_changed(&mut self, listener: impl FnMut(DeviceStatus) + 'static) {
        self.status_listeners.push(Box::new(listener));
    }

    /// Register a listener for completed measurements.
    pub fn on_measurement_complete(&mut self, listener: impl FnMut(&MeasurementResult) + 'static) {
        self.result_listeners.push(Box::new(listener));
    }

    /// Register a listener for errors.
    pub fn on_error(&mut self, listener: impl FnMut(&str) + 'static) {
        self.error_listeners.push(Box::new(listener));
    }

    /// Connect to the device.
    ///
    /// Transitions to Connecting before delegating, then to Connected or
    /// Error depending on the outcome.
    pub fn connect(&mut self) -> AppResult<()> {
        if matches!(self.status, DeviceStatus::Measuring) {
            return Err(SpectralError::Busy);
        }
        self.set_status(DeviceStatus::Connecting);
        match self.device.connect() {
            Ok(()) => {
                self.last_error = None;
                self.set_status(DeviceStatus::Connected);
                debug!("device connected");
                Ok(())
            }
            Err(e) => {
                let message = e.to_string();
                self.set_error(&message);
                Err(e)
            }
        }
    }

    /// Disconnect from the device.
    pub fn disconnect(&mut self) {
        self.device.disconnect();
        self.last_error = None;
        self.set_status(DeviceStatus::Disconnected);
    }

    /// Whether the underlying device reports a live connection.
    pub fn is_connected(&self) -> bool {
        self.device.is_connected()
    }

    /// Forward settings to the device. Does not change status.
    pub fn configure(
        &mut self,
        settings: &crate::device::capabilities::SettingsMap,
    ) -> AppResult<()> {
        self.device.configure(settings)
    }

    /// Mark the start of a measurement: Connected -> Measuring.
    ///
    /// Any other starting status is rejected; in particular a session that is
    /// Disconnected can never jump straight to Measuring.
    pub fn begin_measurement(&mut self) -> AppResult<()> {
        match self.status {
            DeviceStatus::Connected => {
                self.set_status(DeviceStatus::Measuring);
                Ok(())
            }
            DeviceStatus::Measuring | DeviceStatus::Busy => Err(SpectralError::Busy),
            other => Err(SpectralError::Connection(format!(
                "cannot start measurement while {other:?}"
            ))),
        }
    }

    /// Apply a successful measurement: Measuring -> Connected, then fire
    /// `measurement_complete`.
    pub fn complete_measurement(&mut self, result: &MeasurementResult) {
        self.set_status(DeviceStatus::Connected);
        let listeners = &mut self.result_listeners;
        for listener in listeners.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| listener(result))).is_err() {
                warn!("measurement_complete listener panicked; continuing");
            }
        }
    }

    /// Apply a failed measurement: transition to Error and fire `error`.
    pub fn fail_measurement(&mut self, message: &str) {
        self.set_error(message);
    }

    /// Apply an aborted measurement: Measuring -> Connected, no result event.
    pub fn abort_completed(&mut self) {
        self.set_status(DeviceStatus::Connected);
    }

    /// Best-effort abort, delegated to the device.
    pub fn abort_measurement(&mut self) -> bool {
        self.device.abort_measurement()
    }

    /// Force the Error status and fire the `error` event.
    pub fn set_error(&mut self, message: &str) {
        self.last_error = Some(message.to_string());
        self.set_status(DeviceStatus::Error);
        let listeners = &mut self.error_listeners;
        for listener in listeners.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| listener(message))).is_err() {
                warn!("error listener panicked; continuing");
            }
        }
    }

    /// Leave the Error status, restoring Connected or Disconnected depending
    /// on device connectivity.
    pub fn clear_error(&mut self) {
        self.last_error = None;
        if self.status == DeviceStatus::Error {
            let restored = if self.device.is_connected() {
                DeviceStatus::Connected
            } else {
                DeviceStatus::Disconnected
            };
            self.set_status(restored);
        }
    }

    fn set_status(&mut self, new: DeviceStatus) {
        if self.status == new {
            return;
        }
        self.status = new;
        let listeners = &mut self.status_listeners;
        for listener in listeners.iter_mut() {
            if catch_unwind(AssertUnwindSafe(|| listener(new))).is_err() {
                warn!("status_changed listener panicked; continuing");
            }
        }
    }
}
