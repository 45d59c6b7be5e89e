//! Periodic unattended measurement cycles.
//!
//! [`AutoRepeatController`] is polled from the control surface tick. Each due
//! cycle issues one scheduler request per selected measurement type, then
//! reschedules itself `interval` later, independent of whether those
//! requests have completed. A type whose request is still outstanding (or
//! whose request is rejected as busy) is skipped silently for that cycle;
//! skipping is the overlap policy, not a fault.
//!
//! Results of auto-repeat cycles are saved to history by the caller when the
//! corresponding measurement actually completes, never on a timer.

use crate::device::capabilities::{MeasurementType, SettingsMap};
use crate::error::{AppResult, SpectralError};
use crate::scheduler::MeasurementScheduler;
use log::{debug, info};
use std::collections::BTreeSet;
use std::time::{Duration, Instant};

/// Minimum supported cycle interval.
pub const MIN_INTERVAL: Duration = Duration::from_secs(1);

/// Drives periodic measurement cycles through the scheduler.
pub struct AutoRepeatController {
    interval: Duration,
    selected: BTreeSet<MeasurementType>,
    next_cycle: Option<Instant>,
}

impl AutoRepeatController {
    pub fn new() -> Self {
        Self {
            interval: Duration::from_secs(5),
            selected: BTreeSet::new(),
            next_cycle: None,
        }
    }

    /// Configured cycle interval.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Set the cycle interval. Rejects intervals below one second.
    pub fn set_interval(&mut self, interval: Duration) -> AppResult<()> {
        if interval < MIN_INTERVAL {
            return Err(SpectralError::Configuration(format!(
                "auto-repeat interval {interval:?} is below the 1 s minimum"
            )));
        }
        self.interval = interval;
        Ok(())
    }

    /// Selected measurement types, cycled in a stable order.
    pub fn selected(&self) -> &BTreeSet<MeasurementType> {
        &self.selected
    }

    /// Toggle a measurement type in the selection.
    pub fn set_selected(&mut self, measurement_type: MeasurementType, on: bool) {
        if on {
            self.selected.insert(measurement_type);
        } else {
            self.selected.remove(&measurement_type);
        }
    }

    /// Whether auto-repeat is currently running.
    pub fn is_active(&self) -> bool {
        self.next_cycle.is_some()
    }

    /// Start cycling. The first cycle fires on the next poll.
    ///
    /// Rejected when no measurement types are selected.
    pub fn start(&mut self, now: Instant) -> AppResult<()> {
        if self.selected.is_empty() {
            return Err(SpectralError::Configuration(
                "auto-repeat needs at least one selected measurement type".into(),
            ));
        }
        self.next_cycle = Some(now);
        info!(
            "auto-repeat started: every {:?}, {} type(s)",
            self.interval,
            self.selected.len()
        );
        Ok(())
    }

    /// Stop cycling. In-flight measurements are not aborted.
    pub fn stop(&mut self) {
        if self.next_cycle.take().is_some() {
            info!("auto-repeat stopped");
        }
    }

    /// Run a cycle if one is due.
    ///
    /// Returns the measurement types actually requested this poll. The next
    /// cycle is scheduled immediately, whether or not any request went
    /// through.
    pub fn poll(
        &mut self,
        now: Instant,
        scheduler: &mut MeasurementScheduler,
        settings: &SettingsMap,
    ) -> Vec<MeasurementType> {
        let Some(due) = self.next_cycle else {
            return Vec::new();
        };
        if now < due {
            return Vec::new();
        }
        self.next_cycle = Some(now + self.interval);

        let mut issued = Vec::new();
        for &measurement_type in &self.selected {
            if scheduler.outstanding_type() == Some(measurement_type) {
                debug!("auto-repeat: {measurement_type} still outstanding, skipping");
                continue;
            }
            match scheduler.request(measurement_type, settings.clone()) {
                Ok(()) => issued.push(measurement_type),
                Err(SpectralError::Busy) => {
                    debug!("auto-repeat: scheduler busy, skipping {measurement_type}");
                }
                Err(e) => {
                    debug!("auto-repeat: request for {measurement_type} failed: {e}");
                }
            }
        }
        issued
    }
}

impl Default for AutoRepeatController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::mock::MockSpectrometer;
    use crate::device::SpectralDevice;
    use std::sync::Arc;

    fn scheduler() -> MeasurementScheduler {
        let device = MockSpectrometer::with_delay(Duration::ZERO);
        device.connect().unwrap();
        MeasurementScheduler::new(Arc::new(device), tokio::runtime::Handle::current())
    }

    #[test]
    fn start_with_empty_selection_rejected() {
        let mut ctl = AutoRepeatController::new();
        assert!(ctl.start(Instant::now()).is_err());
        assert!(!ctl.is_active());
    }

    #[test]
    fn interval_below_minimum_rejected() {
        let mut ctl = AutoRepeatController::new();
        assert!(ctl.set_interval(Duration::from_millis(500)).is_err());
        assert!(ctl.set_interval(Duration::from_secs(1)).is_ok());
    }

    #[tokio::test]
    async fn due_cycle_issues_request_and_reschedules() {
        let mut sched = scheduler();
        let mut ctl = AutoRepeatController::new();
        ctl.set_interval(Duration::from_secs(5)).unwrap();
        ctl.set_selected(MeasurementType::Radiance, true);

        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        let issued = ctl.poll(t0, &mut sched, &SettingsMap::new());
        assert_eq!(issued, [MeasurementType::Radiance]);
        assert!(sched.is_busy());

        // Not due again until the interval elapses.
        let issued = ctl.poll(t0 + Duration::from_secs(1), &mut sched, &SettingsMap::new());
        assert!(issued.is_empty());
    }

    #[tokio::test]
    async fn overlapping_cycle_skips_outstanding_type() {
        let mut sched = scheduler();
        let mut ctl = AutoRepeatController::new();
        ctl.set_interval(Duration::from_secs(5)).unwrap();
        ctl.set_selected(MeasurementType::Radiance, true);

        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        assert_eq!(
            ctl.poll(t0, &mut sched, &SettingsMap::new()),
            [MeasurementType::Radiance]
        );

        // Second cycle fires while the first request is still outstanding:
        // zero new requests for that type.
        let t1 = t0 + Duration::from_secs(5);
        assert!(ctl.poll(t1, &mut sched, &SettingsMap::new()).is_empty());

        // The cycle was consumed and rescheduled regardless.
        assert!(ctl
            .poll(t1 + Duration::from_secs(1), &mut sched, &SettingsMap::new())
            .is_empty());
    }

    #[tokio::test]
    async fn stop_cancels_pending_cycle() {
        let mut sched = scheduler();
        let mut ctl = AutoRepeatController::new();
        ctl.set_selected(MeasurementType::Irradiance, true);

        let t0 = Instant::now();
        ctl.start(t0).unwrap();
        ctl.stop();
        assert!(!ctl.is_active());
        assert!(ctl.poll(t0, &mut sched, &SettingsMap::new()).is_empty());
        assert!(!sched.is_busy());
    }
}
