//! Bottom panel showing captured log records.

use crate::log_capture::LogBuffer;
use eframe::egui::{self, Ui};
use log::LevelFilter;

/// Filter and display state for the log panel.
pub struct LogPanel {
    level_filter: LevelFilter,
    filter_text: String,
    stick_to_bottom: bool,
}

impl Default for LogPanel {
    fn default() -> Self {
        Self {
            level_filter: LevelFilter::Info,
            filter_text: String::new(),
            stick_to_bottom: true,
        }
    }
}

impl LogPanel {
    pub fn ui(&mut self, ui: &mut Ui, buffer: &LogBuffer) {
        ui.horizontal(|ui| {
            ui.label("Log");
            egui::ComboBox::from_id_salt("log_level_filter")
                .selected_text(self.level_filter.as_str())
                .show_ui(ui, |ui| {
                    for level in [
                        LevelFilter::Error,
                        LevelFilter::Warn,
                        LevelFilter::Info,
                        LevelFilter::Debug,
                        LevelFilter::Trace,
                    ] {
                        ui.selectable_value(&mut self.level_filter, level, level.as_str());
                    }
                });
            ui.label("Filter:");
            ui.text_edit_singleline(&mut self.filter_text);
            ui.checkbox(&mut self.stick_to_bottom, "Follow");
            if ui.button("Clear").clicked() {
                buffer.clear();
            }
        });
        ui.separator();

        let filter = self.filter_text.to_lowercase();
        let entries = buffer.read();
        let visible: Vec<_> = entries
            .iter()
            .filter(|e| e.level <= self.level_filter)
            .filter(|e| {
                filter.is_empty()
                    || e.message.to_lowercase().contains(&filter)
                    || e.target.to_lowercase().contains(&filter)
            })
            .collect();

        egui::ScrollArea::vertical()
            .stick_to_bottom(self.stick_to_bottom)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for entry in visible {
                    ui.horizontal(|ui| {
                        ui.monospace(entry.timestamp.format("%H:%M:%S%.3f").to_string());
                        ui.colored_label(entry.color(), format!("{:5}", entry.level));
                        ui.monospace(format!("{}: {}", entry.target, entry.message));
                    });
                }
            });
    }
}
