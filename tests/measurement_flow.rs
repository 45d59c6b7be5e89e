//! End-to-end measurement flow against the mock spectrometer.

use spectral_bench::auto_repeat::AutoRepeatController;
use spectral_bench::device::capabilities::{MeasurementType, SettingsMap, SettingValue};
use spectral_bench::device::mock::MockSpectrometer;
use spectral_bench::device::session::DeviceSession;
use spectral_bench::device::{DeviceStatus, SpectralDevice};
use spectral_bench::measurement::history::MeasurementHistory;
use spectral_bench::scheduler::{MeasurementOutcome, MeasurementScheduler};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

async fn drain_one(
    scheduler: &mut MeasurementScheduler,
) -> spectral_bench::scheduler::CompletedMeasurement {
    for _ in 0..200 {
        let mut completed = scheduler.drain();
        if let Some(c) = completed.pop() {
            return c;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("no measurement outcome arrived");
}

#[tokio::test(flavor = "multi_thread")]
async fn measure_save_and_export_round_trip() {
    init();
    let device: Arc<dyn SpectralDevice> = Arc::new(MockSpectrometer::with_delay(Duration::ZERO));
    let mut session = DeviceSession::new(Arc::clone(&device));
    session.connect().unwrap();
    assert_eq!(session.status(), DeviceStatus::Connected);

    let mut scheduler = MeasurementScheduler::new(device, tokio::runtime::Handle::current());
    let mut settings = SettingsMap::new();
    settings.insert("integration_time".into(), SettingValue::Int(50));
    settings.insert("num_scans".into(), SettingValue::Int(3));

    scheduler.request(MeasurementType::Radiance, settings).unwrap();
    session.begin_measurement().unwrap();
    assert_eq!(session.status(), DeviceStatus::Measuring);
    assert!(scheduler.is_busy());

    let completed = drain_one(&mut scheduler).await;
    assert!(!scheduler.is_busy());
    let MeasurementOutcome::Success(result) = completed.outcome else {
        panic!("expected a successful measurement");
    };
    let result = Arc::new(result);
    session.complete_measurement(&result);
    assert_eq!(session.status(), DeviceStatus::Connected);

    assert_eq!(result.pixel_count(), 401);
    assert_eq!(result.wavelength_range(), (380.0, 780.0));
    assert_eq!(result.integration_time_ms, 50);
    assert_eq!(result.num_scans, 3);
    assert!(result.luminance > 0.0);

    let mut history = MeasurementHistory::new();
    let label = history.save(None, Arc::clone(&result));
    assert!(label.starts_with("radiance_"));

    #[cfg(feature = "storage_csv")]
    {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        assert_eq!(history.export_csv(&path).unwrap(), 1);
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents.lines().count(), 2);
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn auto_repeat_cycle_completes_through_scheduler() {
    init();
    let device: Arc<dyn SpectralDevice> = Arc::new(MockSpectrometer::with_delay(Duration::ZERO));
    let mut session = DeviceSession::new(Arc::clone(&device));
    session.connect().unwrap();

    let mut scheduler = MeasurementScheduler::new(device, tokio::runtime::Handle::current());
    let mut auto_repeat = AutoRepeatController::new();
    auto_repeat.set_interval(Duration::from_secs(1)).unwrap();
    auto_repeat.set_selected(MeasurementType::Irradiance, true);

    let t0 = Instant::now();
    auto_repeat.start(t0).unwrap();
    let issued = auto_repeat.poll(t0, &mut scheduler, &SettingsMap::new());
    assert_eq!(issued, [MeasurementType::Irradiance]);
    session.begin_measurement().unwrap();

    let completed = drain_one(&mut scheduler).await;
    assert_eq!(completed.measurement_type, MeasurementType::Irradiance);
    let MeasurementOutcome::Success(result) = completed.outcome else {
        panic!("expected a successful measurement");
    };
    session.complete_measurement(&Arc::new(result));
    assert_eq!(session.status(), DeviceStatus::Connected);

    // The next cycle is free to request the same type again.
    let t1 = t0 + Duration::from_secs(1);
    let issued = auto_repeat.poll(t1, &mut scheduler, &SettingsMap::new());
    assert_eq!(issued, [MeasurementType::Irradiance]);
}

#[tokio::test(flavor = "multi_thread")]
async fn failed_measurement_reports_error_status() {
    init();
    let device: Arc<dyn SpectralDevice> = Arc::new(MockSpectrometer::with_delay(Duration::ZERO));
    let mut session = DeviceSession::new(Arc::clone(&device));
    session.connect().unwrap();

    let mut scheduler =
        MeasurementScheduler::new(Arc::clone(&device), tokio::runtime::Handle::current());
    // Out-of-range integration time makes configure fail in the worker.
    let mut settings = SettingsMap::new();
    settings.insert("integration_time".into(), SettingValue::Int(0));

    scheduler.request(MeasurementType::Radiance, settings).unwrap();
    session.begin_measurement().unwrap();

    let completed = drain_one(&mut scheduler).await;
    let MeasurementOutcome::Error(message) = completed.outcome else {
        panic!("expected a configuration error");
    };
    session.fail_measurement(&message);
    assert_eq!(session.status(), DeviceStatus::Error);
    assert!(session.last_error().is_some());

    // Device is still connected, so clearing the error restores readiness.
    session.clear_error();
    assert_eq!(session.status(), DeviceStatus::Connected);
}
