//! Status bar and left-hand control panel.

use super::SpectralApp;
use crate::device::capabilities::{MeasurementType, SettingKind, SettingValue};
use crate::device::DeviceStatus;
use crate::render::Overlay;
use eframe::egui::{self, Color32, Ui};
use log::{debug, info};
use std::time::Duration;

fn status_color(status: DeviceStatus) -> Color32 {
    match status {
        DeviceStatus::Disconnected => Color32::from_gray(140),
        DeviceStatus::Connecting => Color32::from_rgb(255, 255, 100),
        DeviceStatus::Connected => Color32::from_rgb(100, 220, 100),
        DeviceStatus::Measuring => Color32::from_rgb(100, 200, 255),
        DeviceStatus::Error => Color32::from_rgb(255, 100, 100),
        DeviceStatus::Busy => Color32::from_rgb(255, 180, 80),
    }
}

impl SpectralApp {
    pub(super) fn status_bar(&mut self, ui: &mut Ui) {
        ui.horizontal(|ui| {
            ui.heading("Spectral Bench");
            ui.separator();
            let status = self.session.status();
            ui.colored_label(status_color(status), self.session.status_string());
            ui.separator();
            ui.label(self.capabilities.summary());

            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if status == DeviceStatus::Error && ui.button("Clear Error").clicked() {
                    self.session.clear_error();
                }
                if ui.button("Reconnect").clicked() {
                    self.reconnect();
                }
            });
        });
    }

    pub(super) fn control_panel(&mut self, ui: &mut Ui) {
        self.measurement_section(ui);
        ui.separator();
        self.settings_section(ui);
        ui.separator();
        self.auto_repeat_section(ui);
        ui.separator();
        self.overlay_section(ui);
        ui.separator();
        self.history_section(ui);
        ui.separator();
        self.result_section(ui);
    }

    fn measurement_section(&mut self, ui: &mut Ui) {
        ui.heading("Measurement");
        egui::ComboBox::from_label("Type")
            .selected_text(self.selected_type.label())
            .show_ui(ui, |ui| {
                for &t in &self.capabilities.measurement_types {
                    ui.selectable_value(&mut self.selected_type, t, t.label());
                }
            });

        let status = self.session.status();
        ui.horizontal(|ui| {
            let can_measure = status == DeviceStatus::Connected;
            if ui
                .add_enabled(can_measure, egui::Button::new("Measure"))
                .clicked()
            {
                self.request_measurement(self.selected_type);
            }
            let measuring = status == DeviceStatus::Measuring;
            if ui
                .add_enabled(measuring, egui::Button::new("Abort"))
                .clicked()
            {
                // Abort is advisory; reflect it optimistically.
                let accepted = self.scheduler.request_abort();
                info!("abort requested (device accepted: {accepted})");
            }
        });
    }

    pub(super) fn request_measurement(&mut self, measurement_type: MeasurementType) {
        if self.session.status() != DeviceStatus::Connected {
            self.notification = Some("Device is not ready for a measurement".into());
            return;
        }
        match self
            .scheduler
            .request(measurement_type, self.setting_values.clone())
        {
            Ok(()) => {
                if let Err(e) = self.session.begin_measurement() {
                    debug!("session rejected measurement start: {e}");
                }
            }
            Err(e) => {
                self.notification = Some(e.to_string());
            }
        }
    }

    fn settings_section(&mut self, ui: &mut Ui) {
        ui.heading("Device Settings");
        let definitions = self.capabilities.settings.clone();
        for def in &definitions {
            let Some(value) = self.setting_values.get_mut(&def.name) else {
                continue;
            };
            ui.horizontal(|ui| {
                let label = if def.unit.is_empty() {
                    def.display_name.clone()
                } else {
                    format!("{} [{}]", def.display_name, def.unit)
                };
                ui.label(label).on_hover_text(&def.tooltip);
                match (def.kind, value) {
                    (SettingKind::Int, SettingValue::Int(v)) => {
                        let mut drag = egui::DragValue::new(v);
                        if let (Some(lo), Some(hi)) = (def.min_value, def.max_value) {
                            drag = drag.range(lo as i64..=hi as i64);
                        }
                        ui.add(drag);
                    }
                    (SettingKind::Float, SettingValue::Float(v)) => {
                        let mut drag = egui::DragValue::new(v).speed(0.1);
                        if let (Some(lo), Some(hi)) = (def.min_value, def.max_value) {
                            drag = drag.range(lo..=hi);
                        }
                        ui.add(drag);
                    }
                    (SettingKind::Bool, SettingValue::Bool(v)) => {
                        ui.checkbox(v, "");
                    }
                    (SettingKind::Choice, SettingValue::Choice(v)) => {
                        egui::ComboBox::from_id_salt(&def.name)
                            .selected_text(v.clone())
                            .show_ui(ui, |ui| {
                                for choice in &def.choices {
                                    ui.selectable_value(v, choice.clone(), choice);
                                }
                            });
                    }
                    _ => {
                        // Definition/value kind mismatch; nothing to edit
                    }
                }
            });
        }
        if ui.button("Apply Settings").clicked() {
            match self.session.configure(&self.setting_values) {
                Ok(()) => info!("device settings applied"),
                Err(e) => self.notification = Some(format!("Configure failed: {e}")),
            }
        }
    }

    fn auto_repeat_section(&mut self, ui: &mut Ui) {
        ui.heading("Auto Repeat");
        ui.horizontal(|ui| {
            ui.label("Interval [s]");
            ui.add(egui::DragValue::new(&mut self.auto_interval_secs).range(1..=3600));
        });
        for &t in &self.capabilities.measurement_types.clone() {
            let mut on = self.auto_repeat.selected().contains(&t);
            if ui.checkbox(&mut on, t.label()).changed() {
                self.auto_repeat.set_selected(t, on);
            }
        }
        ui.horizontal(|ui| {
            if self.auto_repeat.is_active() {
                if ui.button("Stop").clicked() {
                    self.auto_repeat.stop();
                }
                ui.label(format!("running every {:?}", self.auto_repeat.interval()));
            } else if ui.button("Start").clicked() {
                let outcome = self
                    .auto_repeat
                    .set_interval(Duration::from_secs(self.auto_interval_secs))
                    .and_then(|()| self.auto_repeat.start(std::time::Instant::now()));
                if let Err(e) = outcome {
                    self.notification = Some(e.to_string());
                }
            }
        });
    }

    fn overlay_section(&mut self, ui: &mut Ui) {
        ui.heading("Overlays");
        ui.horizontal(|ui| {
            let has_result = self.current_result.is_some();
            if ui
                .add_enabled(has_result, egui::Button::new("Keep as Reference"))
                .clicked()
            {
                if let Some(result) = &self.current_result {
                    let name = format!(
                        "{} {}",
                        result.measurement_type.label(),
                        result.timestamp.format("%H:%M:%S")
                    );
                    self.renderer.add_overlay(
                        name,
                        Overlay {
                            wavelengths: result.wavelengths.clone(),
                            data: result.spectral_data.clone(),
                            color: Color32::from_gray(160),
                        },
                    );
                }
            }
            if ui.button("Clear").clicked() {
                self.renderer.clear_overlays();
            }
        });
        for name in self.renderer.overlays().keys() {
            ui.label(name);
        }
    }

    fn history_section(&mut self, ui: &mut Ui) {
        ui.heading("History");
        ui.horizontal(|ui| {
            ui.label("Label");
            ui.text_edit_singleline(&mut self.save_label);
            let has_result = self.current_result.is_some();
            if ui
                .add_enabled(has_result, egui::Button::new("Save"))
                .clicked()
            {
                if let Some(result) = &self.current_result {
                    let label = if self.save_label.trim().is_empty() {
                        None
                    } else {
                        Some(self.save_label.clone())
                    };
                    let used = self.history.save(label, result.clone());
                    info!("measurement saved as '{used}'");
                    self.save_label.clear();
                }
            }
        });

        let mut delete_index = None;
        for (i, entry) in self.history.iter().enumerate() {
            ui.horizontal(|ui| {
                ui.label(&entry.label);
                if ui.small_button("x").clicked() {
                    delete_index = Some(i);
                }
            });
        }
        if let Some(i) = delete_index {
            self.history.remove(i);
        }

        ui.horizontal(|ui| {
            ui.label("Export dir");
            ui.text_edit_singleline(&mut self.export_dir);
        });
        #[cfg(feature = "storage_csv")]
        ui.horizontal(|ui| {
            if ui
                .add_enabled(!self.history.is_empty(), egui::Button::new("Export History"))
                .clicked()
            {
                self.export_history();
            }
            if ui
                .add_enabled(
                    self.current_result.is_some(),
                    egui::Button::new("Export Spectrum"),
                )
                .clicked()
            {
                self.export_current_spectrum();
            }
        });
        if !self.history.is_empty() && ui.button("Clear History").clicked() {
            self.history.clear();
        }
    }

    #[cfg(feature = "storage_csv")]
    fn export_history(&mut self) {
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = std::path::Path::new(&self.export_dir).join(format!("history_{stamp}.csv"));
        match self.history.export_csv(&path) {
            Ok(rows) => info!("exported {rows} measurement(s) to {}", path.display()),
            Err(e) => self.notification = Some(format!("Export failed: {e}")),
        }
    }

    #[cfg(feature = "storage_csv")]
    fn export_current_spectrum(&mut self) {
        let Some(result) = self.current_result.clone() else {
            return;
        };
        let stamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let path = std::path::Path::new(&self.export_dir).join(format!("spectrum_{stamp}.csv"));
        match crate::measurement::history::export_spectrum_csv(&result, &path) {
            Ok(()) => info!("exported spectrum to {}", path.display()),
            Err(e) => self.notification = Some(format!("Export failed: {e}")),
        }
    }

    fn result_section(&mut self, ui: &mut Ui) {
        ui.heading("Last Result");
        match &self.current_result {
            Some(result) => {
                ui.monospace(result.summary());
                if let Some((w, v)) = self.renderer.peak() {
                    ui.monospace(format!("Peak: {w:.1} nm ({v:.4})"));
                }
            }
            None => {
                ui.label("No measurement yet");
            }
        }
    }

    fn reconnect(&mut self) {
        self.session.disconnect();
        if let Err(e) = self.session.connect() {
            self.notification = Some(format!("Reconnect failed: {e}"));
        }
    }
}
