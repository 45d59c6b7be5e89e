//! Measurement scheduling across the concurrency boundary.
//!
//! The control surface runs single threaded; the only operation allowed to
//! block is the device's `measure` call. [`MeasurementScheduler`] enforces
//! the single-outstanding-measurement invariant and moves results back to
//! the control surface safely:
//!
//! - `request` dispatches one short-lived worker per measurement onto the
//!   Tokio blocking pool. At most one worker is ever live.
//! - The worker posts exactly one [`MeasurementOutcome`] onto an unbounded
//!   channel and never touches session or UI state.
//! - The control surface calls [`MeasurementScheduler::drain`] on its polling
//!   tick (default 100 ms); draining is non-blocking, empties the whole
//!   channel, and preserves FIFO order. The outstanding flag is released only
//!   here, after the outcome has been dequeued, so a second request can never
//!   race ahead of a still-unprocessed result.
//! - Cancellation is cooperative: the abort flag is checked after `configure`
//!   and before the blocking `measure` call. Once the hardware call is
//!   underway only the device's own abort support can cut it short.
//!
//! No timeout is imposed on `measure`. A stalled device blocks further
//! requests but cannot corrupt control-surface state.

use crate::device::capabilities::{MeasurementType, SettingsMap};
use crate::device::SpectralDevice;
use crate::error::{AppResult, SpectralError};
use crate::measurement::MeasurementResult;
use log::{debug, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

/// Terminal outcome of one measurement request.
#[derive(Debug)]
pub enum MeasurementOutcome {
    Success(MeasurementResult),
    Error(String),
    Aborted,
}

/// One drained channel entry: which request it answers, and how it ended.
#[derive(Debug)]
pub struct CompletedMeasurement {
    pub measurement_type: MeasurementType,
    pub outcome: MeasurementOutcome,
}

/// Enforces at most one in-flight measurement and marshals outcomes back to
/// the control surface.
pub struct MeasurementScheduler {
    device: Arc<dyn SpectralDevice>,
    runtime: tokio::runtime::Handle,
    outcome_tx: mpsc::UnboundedSender<CompletedMeasurement>,
    outcome_rx: mpsc::UnboundedReceiver<CompletedMeasurement>,
    outstanding: Option<MeasurementType>,
    abort_flag: Arc<AtomicBool>,
}

impl MeasurementScheduler {
    /// Create a scheduler for one device.
    ///
    /// `runtime` is the handle workers are spawned on; the GUI passes the
    /// application runtime, tests pass `Handle::current()`.
    pub fn new(device: Arc<dyn SpectralDevice>, runtime: tokio::runtime::Handle) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            device,
            runtime,
            outcome_tx,
            outcome_rx,
            outstanding: None,
            abort_flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a request is outstanding (requested but not yet drained).
    pub fn is_busy(&self) -> bool {
        self.outstanding.is_some()
    }

    /// Measurement type of the outstanding request, if any.
    pub fn outstanding_type(&self) -> Option<MeasurementType> {
        self.outstanding
    }

    /// Request one measurement.
    ///
    /// Rejected immediately with [`SpectralError::Busy`], with no state
    /// change, while a previous request is outstanding.
    pub fn request(&mut self, measurement_type: MeasurementType, settings: SettingsMap) -> AppResult<()> {
        if self.outstanding.is_some() {
            return Err(SpectralError::Busy);
        }
        self.outstanding = Some(measurement_type);
        self.abort_flag.store(false, Ordering::SeqCst);

        let device = Arc::clone(&self.device);
        let abort = Arc::clone(&self.abort_flag);
        let tx = self.outcome_tx.clone();

        debug!("dispatching {measurement_type} measurement");
        self.runtime.spawn_blocking(move || {
            let outcome = if let Err(e) = device.configure(&settings) {
                MeasurementOutcome::Error(e.to_string())
            } else if abort.load(Ordering::SeqCst) {
                MeasurementOutcome::Aborted
            } else {
                match device.measure(measurement_type) {
                    Ok(result) => MeasurementOutcome::Success(result),
                    Err(SpectralError::Aborted) => MeasurementOutcome::Aborted,
                    Err(e) => MeasurementOutcome::Error(e.to_string()),
                }
            };
            if tx
                .send(CompletedMeasurement {
                    measurement_type,
                    outcome,
                })
                .is_err()
            {
                warn!("scheduler dropped before measurement outcome was delivered");
            }
        });
        Ok(())
    }

    /// Drain all queued outcomes, FIFO, without blocking.
    ///
    /// Releases the outstanding flag for each dequeued outcome. Called on the
    /// control surface's polling tick.
    pub fn drain(&mut self) -> Vec<CompletedMeasurement> {
        let mut completed = Vec::new();
        while let Ok(entry) = self.outcome_rx.try_recv() {
            self.outstanding = None;
            completed.push(entry);
        }
        completed
    }

    /// Cooperatively abort the outstanding measurement, best effort.
    ///
    /// Sets the abort flag (honored if the device call has not started yet)
    /// and forwards to the device's own `abort_measurement`. Returns the
    /// device's answer; `false` means the in-flight hardware call, if any,
    /// runs to completion.
    pub fn request_abort(&mut self) -> bool {
        if self.outstanding.is_none() {
            return false;
        }
        self.abort_flag.store(true, Ordering::SeqCst);
        let accepted = self.device.abort_measurement();
        debug!("abort requested, device accepted: {accepted}");
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::capabilities::DeviceCapabilities;
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Device whose `configure` can be gated on a channel, to control
    /// exactly when the worker proceeds.
    struct GatedDevice {
        gate: Mutex<Option<std_mpsc::Receiver<()>>>,
        fail_measure: bool,
    }

    impl GatedDevice {
        fn immediate() -> Self {
            Self {
                gate: Mutex::new(None),
                fail_measure: false,
            }
        }

        fn gated() -> (Self, std_mpsc::Sender<()>) {
            let (tx, rx) = std_mpsc::channel();
            (
                Self {
                    gate: Mutex::new(Some(rx)),
                    fail_measure: false,
                },
                tx,
            )
        }

        fn failing() -> Self {
            Self {
                gate: Mutex::new(None),
                fail_measure: true,
            }
        }
    }

    impl SpectralDevice for GatedDevice {
        fn connect(&self) -> AppResult<()> {
            Ok(())
        }

        fn disconnect(&self) {}

        fn is_connected(&self) -> bool {
            true
        }

        fn capabilities(&self) -> DeviceCapabilities {
            DeviceCapabilities {
                device_name: "gated".into(),
                device_type: "test".into(),
                manufacturer: String::new(),
                model: String::new(),
                serial_number: String::new(),
                measurement_types: vec![MeasurementType::Raw],
                wavelength_range: (380.0, 780.0),
                pixel_count: 3,
                settings: vec![],
                supports_auto_integration: false,
                supports_dark_correction: false,
                supports_continuous_mode: false,
                supports_triggering: false,
                requires_calibration: false,
                calibration_types: vec![],
            }
        }

        fn configure(&self, _settings: &SettingsMap) -> AppResult<()> {
            if let Ok(guard) = self.gate.lock() {
                if let Some(rx) = guard.as_ref() {
                    let _ = rx.recv();
                }
            }
            Ok(())
        }

        fn measure(&self, kind: MeasurementType) -> AppResult<MeasurementResult> {
            if self.fail_measure {
                return Err(SpectralError::Measurement("detector timeout".into()));
            }
            MeasurementResult::new(kind, vec![380.0, 381.0, 382.0], vec![1.0, 2.0, 3.0])
        }

        fn current_settings(&self) -> SettingsMap {
            SettingsMap::new()
        }
    }

    async fn drain_one(sched: &mut MeasurementScheduler) -> CompletedMeasurement {
        for _ in 0..500 {
            let mut drained = sched.drain();
            if let Some(entry) = drained.pop() {
                assert!(drained.is_empty());
                return entry;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("no outcome delivered within timeout");
    }

    #[tokio::test]
    async fn single_outstanding_invariant() {
        let (device, gate) = GatedDevice::gated();
        let mut sched =
            MeasurementScheduler::new(Arc::new(device), tokio::runtime::Handle::current());

        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();
        assert!(sched.is_busy());
        assert_eq!(sched.outstanding_type(), Some(MeasurementType::Raw));

        // Second request rejected with no state change.
        let rejected = sched.request(MeasurementType::Raw, SettingsMap::new());
        assert!(matches!(rejected, Err(SpectralError::Busy)));
        assert_eq!(sched.outstanding_type(), Some(MeasurementType::Raw));

        gate.send(()).unwrap();
        let entry = drain_one(&mut sched).await;
        assert!(matches!(entry.outcome, MeasurementOutcome::Success(_)));
        assert!(!sched.is_busy());

        // Released flag allows the next request.
        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();
    }

    #[tokio::test]
    async fn busy_flag_released_only_on_drain() {
        let mut sched = MeasurementScheduler::new(
            Arc::new(GatedDevice::immediate()),
            tokio::runtime::Handle::current(),
        );
        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();

        // Give the worker time to finish; the flag must still be held until
        // the outcome is dequeued.
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(sched.is_busy());
        assert!(matches!(
            sched.request(MeasurementType::Raw, SettingsMap::new()),
            Err(SpectralError::Busy)
        ));

        let entry = drain_one(&mut sched).await;
        assert!(matches!(entry.outcome, MeasurementOutcome::Success(_)));
        assert!(!sched.is_busy());
    }

    #[tokio::test]
    async fn abort_before_device_call_yields_aborted() {
        let (device, gate) = GatedDevice::gated();
        let mut sched =
            MeasurementScheduler::new(Arc::new(device), tokio::runtime::Handle::current());

        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();
        // Worker is parked inside configure; the flag is observed before the
        // measure call starts.
        sched.request_abort();
        gate.send(()).unwrap();

        let entry = drain_one(&mut sched).await;
        assert!(matches!(entry.outcome, MeasurementOutcome::Aborted));
    }

    #[tokio::test]
    async fn abort_after_completion_preserves_original_outcome() {
        let mut sched = MeasurementScheduler::new(
            Arc::new(GatedDevice::immediate()),
            tokio::runtime::Handle::current(),
        );
        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();

        // Let the worker post its result before aborting.
        tokio::time::sleep(Duration::from_millis(100)).await;
        sched.request_abort();

        let entry = drain_one(&mut sched).await;
        assert!(matches!(entry.outcome, MeasurementOutcome::Success(_)));
    }

    #[tokio::test]
    async fn abort_without_outstanding_request_is_refused() {
        let mut sched = MeasurementScheduler::new(
            Arc::new(GatedDevice::immediate()),
            tokio::runtime::Handle::current(),
        );
        assert!(!sched.request_abort());
    }

    #[tokio::test]
    async fn measurement_failure_delivered_as_error() {
        let mut sched = MeasurementScheduler::new(
            Arc::new(GatedDevice::failing()),
            tokio::runtime::Handle::current(),
        );
        sched.request(MeasurementType::Raw, SettingsMap::new()).unwrap();
        let entry = drain_one(&mut sched).await;
        match entry.outcome {
            MeasurementOutcome::Error(msg) => assert!(msg.contains("detector timeout")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }
}
