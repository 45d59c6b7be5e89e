//! The eframe/egui implementation for the GUI.
//!
//! The control surface is single threaded: all session, scheduler,
//! auto-repeat and renderer state is owned by [`SpectralApp`] and mutated
//! only inside `update`. Worker outcomes cross into this thread exclusively
//! through the scheduler channel, drained on a fixed polling tick.

mod control_panel;
mod log_panel;
mod plot_panel;

use crate::auto_repeat::AutoRepeatController;
use crate::config::Settings;
use crate::device::capabilities::{DeviceCapabilities, MeasurementType, SettingsMap};
use crate::device::session::DeviceSession;
use crate::device::SpectralDevice;
use crate::log_capture::LogBuffer;
use crate::measurement::history::MeasurementHistory;
use crate::measurement::MeasurementResult;
use crate::render::{RenderPass, SpectrumRenderer};
use crate::scheduler::{MeasurementOutcome, MeasurementScheduler};
use eframe::egui;
use log::{info, warn};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use self::log_panel::LogPanel;

/// The main application state.
pub struct SpectralApp {
    session: DeviceSession,
    scheduler: MeasurementScheduler,
    auto_repeat: AutoRepeatController,
    renderer: SpectrumRenderer,
    history: MeasurementHistory,
    capabilities: DeviceCapabilities,
    log_buffer: LogBuffer,

    current_result: Option<Arc<MeasurementResult>>,
    selected_type: MeasurementType,
    setting_values: SettingsMap,
    /// Types issued by auto-repeat whose results are saved on completion.
    pending_auto_saves: BTreeSet<MeasurementType>,

    poll_interval: Duration,
    last_poll: Instant,
    /// One-shot modal notification (connection/measurement failures).
    notification: Option<String>,

    // Panel state
    auto_interval_secs: u64,
    save_label: String,
    export_dir: String,
    log_panel: LogPanel,
    gradient_texture: Option<egui::TextureHandle>,
}

impl SpectralApp {
    /// Build the application around an already-connected (or connectable)
    /// device.
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        device: Arc<dyn SpectralDevice>,
        settings: &Settings,
        runtime: tokio::runtime::Handle,
        log_buffer: LogBuffer,
    ) -> Self {
        let capabilities = device.capabilities();
        let mut session = DeviceSession::new(Arc::clone(&device));
        session.on_status_changed(|status| info!("device status: {status}"));
        session.on_error(|message| warn!("device error: {message}"));
        session.on_measurement_complete(|result| {
            info!(
                "measurement complete: {} ({} points)",
                result.measurement_type,
                result.pixel_count()
            );
        });

        let scheduler = MeasurementScheduler::new(Arc::clone(&device), runtime);
        let mut auto_repeat = AutoRepeatController::new();
        let _ = auto_repeat.set_interval(Duration::from_secs(
            settings.measurement.auto_repeat_interval_secs,
        ));

        let selected_type = capabilities
            .measurement_types
            .first()
            .copied()
            .unwrap_or(MeasurementType::Raw);
        let setting_values: SettingsMap = capabilities
            .settings
            .iter()
            .map(|def| (def.name.clone(), def.default_value.clone()))
            .collect();

        let mut app = Self {
            session,
            scheduler,
            renderer: SpectrumRenderer::new(capabilities.wavelength_range),
            history: MeasurementHistory::new(),
            log_buffer,
            current_result: None,
            selected_type,
            setting_values,
            pending_auto_saves: BTreeSet::new(),
            poll_interval: Duration::from_millis(settings.measurement.poll_interval_ms),
            last_poll: Instant::now(),
            notification: None,
            auto_interval_secs: settings.measurement.auto_repeat_interval_secs,
            save_label: String::new(),
            export_dir: settings.export.output_dir.display().to_string(),
            log_panel: LogPanel::default(),
            gradient_texture: None,
            auto_repeat,
            capabilities,
        };
        // Prime the backdrop so the gradient shows before any measurement
        app.renderer.update(&[], &[]);
        if let Err(e) = app.session.connect() {
            app.notification = Some(format!("Connection failed: {e}"));
        }
        app
    }

    /// Drain worker outcomes and run due auto-repeat cycles. The only place
    /// cross-thread data enters single-threaded state.
    fn poll_tick(&mut self) {
        let now = Instant::now();
        if now.duration_since(self.last_poll) < self.poll_interval {
            return;
        }
        self.last_poll = now;

        for completed in self.scheduler.drain() {
            match completed.outcome {
                MeasurementOutcome::Success(result) => {
                    let result = Arc::new(result);
                    self.session.complete_measurement(&result);
                    if self.renderer.update(&result.wavelengths, &result.spectral_data)
                        == RenderPass::Full
                    {
                        self.gradient_texture = None;
                    }
                    if self.pending_auto_saves.remove(&completed.measurement_type) {
                        let label = self.history.save(None, Arc::clone(&result));
                        info!("auto-repeat result saved as '{label}'");
                    }
                    self.current_result = Some(result);
                }
                MeasurementOutcome::Error(message) => {
                    self.session.fail_measurement(&message);
                    self.pending_auto_saves.remove(&completed.measurement_type);
                    self.notification = Some(format!("Measurement failed: {message}"));
                }
                MeasurementOutcome::Aborted => {
                    self.session.abort_completed();
                    self.pending_auto_saves.remove(&completed.measurement_type);
                    info!("measurement aborted");
                }
            }
        }

        if self.session.status() == crate::device::DeviceStatus::Connected {
            let issued =
                self.auto_repeat
                    .poll(now, &mut self.scheduler, &self.setting_values);
            for measurement_type in issued {
                if self.session.begin_measurement().is_ok() {
                    self.pending_auto_saves.insert(measurement_type);
                }
            }
        }
    }

    fn show_notification(&mut self, ctx: &egui::Context) {
        let mut dismissed = false;
        if let Some(message) = &self.notification {
            egui::Window::new("Notice")
                .collapsible(false)
                .resizable(false)
                .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
                .show(ctx, |ui| {
                    ui.label(message);
                    if ui.button("OK").clicked() {
                        dismissed = true;
                    }
                });
        }
        if dismissed {
            self.notification = None;
        }
    }
}

impl eframe::App for SpectralApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_tick();

        egui::TopBottomPanel::top("status_bar").show(ctx, |ui| {
            self.status_bar(ui);
        });

        egui::SidePanel::left("control_panel")
            .resizable(true)
            .default_width(280.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.control_panel(ui);
                });
            });

        egui::TopBottomPanel::bottom("log_panel")
            .resizable(true)
            .min_height(120.0)
            .show(ctx, |ui| {
                let buffer = self.log_buffer.clone();
                self.log_panel.ui(ui, &buffer);
            });

        egui::CentralPanel::default().show(ctx, |ui| {
            self.plot_panel(ui);
        });

        self.show_notification(ctx);

        // Keep the polling tick alive even without input events
        ctx.request_repaint_after(self.poll_interval);
    }
}
