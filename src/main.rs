//! Entry point for spectral-bench.
//!
//! Loads configuration, initializes the combined terminal/GUI logger,
//! starts the worker runtime, builds the requested device driver and hands
//! everything to the eframe event loop.
//!
//! # Usage
//!
//! ```bash
//! spectral-bench                      # default device from config (mock)
//! spectral-bench --device mock
//! spectral-bench --calibration cal.dat --config my_config.toml
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn, LevelFilter};
use spectral_bench::config::Settings;
use spectral_bench::device::mock::MockSpectrometer;
use spectral_bench::device::SpectralDevice;
use spectral_bench::gui::SpectralApp;
use spectral_bench::log_capture::{LogBuffer, LogCollector};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "spectral-bench")]
#[command(about = "Control surface for spectral measurement devices", long_about = None)]
struct Cli {
    /// Device driver to use (available: mock)
    #[arg(short, long)]
    device: Option<String>,

    /// Calibration file passed to the device driver
    #[arg(short, long)]
    calibration: Option<PathBuf>,

    /// Configuration file (default: config/spectral_bench.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = match &cli.config {
        Some(path) => Settings::load_from(path),
        None => Settings::load(),
    }
    .context("failed to load configuration")?;
    settings.validate().map_err(anyhow::Error::msg)?;

    let log_buffer = LogBuffer::new();
    init_logging(&settings.application.log_level, log_buffer.clone())?;
    info!("spectral-bench starting");

    // Worker runtime for blocking device calls. Kept alive for the whole
    // GUI lifetime; eframe owns the main thread.
    let runtime = tokio::runtime::Runtime::new().context("failed to start worker runtime")?;
    let handle = runtime.handle().clone();

    let device_name = cli
        .device
        .clone()
        .unwrap_or_else(|| settings.measurement.default_device.clone());
    let mut device = build_device(&device_name, cli.calibration.as_deref())?;
    if device.connect().is_err() && device_name != "mock" {
        warn!("could not connect '{device_name}', falling back to the mock device");
        device = Arc::new(MockSpectrometer::new());
    }

    let app_name = settings.application.name.clone();
    let native_options = eframe::NativeOptions {
        viewport: eframe::egui::ViewportBuilder::default().with_inner_size([1280.0, 800.0]),
        ..Default::default()
    };
    eframe::run_native(
        &app_name,
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(SpectralApp::new(
                cc, device, &settings, handle, log_buffer,
            )))
        }),
    )
    .map_err(|e| anyhow::anyhow!("GUI error: {e}"))?;

    Ok(())
}

/// Initialize the combined logger: env_logger for the terminal plus a
/// collector feeding the GUI log panel.
fn init_logging(level: &str, buffer: LogBuffer) -> Result<()> {
    let terminal_level = level.parse().unwrap_or(LevelFilter::Info);
    let terminal = env_logger::Builder::new()
        .filter_level(terminal_level)
        .parse_default_env()
        .build();
    multi_log::MultiLogger::init(
        vec![Box::new(terminal), Box::new(LogCollector::new(buffer))],
        log::Level::Trace,
    )
    .context("failed to initialize logging")
}

fn build_device(name: &str, calibration: Option<&Path>) -> Result<Arc<dyn SpectralDevice>> {
    if let Some(path) = calibration {
        info!("calibration file: {}", path.display());
    }
    match name {
        "mock" => Ok(Arc::new(MockSpectrometer::new())),
        other => anyhow::bail!("unknown device '{other}' (available: mock)"),
    }
}
