//! Log capture for the GUI event-log panel.
//!
//! [`LogCollector`] implements `log::Log` and copies every record into a
//! fixed-capacity [`LogBuffer`] shared with the log panel. It is combined
//! with the terminal logger through `multi_log` at startup, so records reach
//! both sinks.

use chrono::{DateTime, Local};
use egui::Color32;
use log::{Level, Log, Metadata, Record};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};

const MAX_LOG_ENTRIES: usize = 1000;

/// A single captured log record.
#[derive(Clone)]
pub struct LogEntry {
    pub timestamp: DateTime<Local>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl LogEntry {
    /// Level color for GUI display.
    pub fn color(&self) -> Color32 {
        match self.level {
            Level::Error => Color32::from_rgb(255, 100, 100),
            Level::Warn => Color32::from_rgb(255, 255, 100),
            Level::Info => Color32::from_rgb(100, 200, 255),
            Level::Debug => Color32::from_rgb(150, 150, 150),
            Level::Trace => Color32::from_rgb(200, 150, 255),
        }
    }
}

/// Thread-safe, fixed-capacity log buffer.
#[derive(Clone, Default)]
pub struct LogBuffer(Arc<Mutex<VecDeque<LogEntry>>>);

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the buffer for reading. A poisoned lock still yields the
    /// entries; log display must not take the panel down.
    pub fn read(&self) -> MutexGuard<'_, VecDeque<LogEntry>> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn clear(&self) {
        self.read().clear();
    }

    fn push(&self, entry: LogEntry) {
        let mut buffer = self.read();
        if buffer.len() >= MAX_LOG_ENTRIES {
            buffer.pop_front();
        }
        buffer.push_back(entry);
    }
}

/// `log::Log` implementation feeding a [`LogBuffer`].
pub struct LogCollector {
    buffer: LogBuffer,
}

impl LogCollector {
    pub fn new(buffer: LogBuffer) -> Self {
        Self { buffer }
    }
}

impl Log for LogCollector {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        // Capture all levels; filtering happens in the GUI
        true
    }

    fn log(&self, record: &Record) {
        self.buffer.push(LogEntry {
            timestamp: Local::now(),
            level: record.level(),
            target: record.target().to_string(),
            message: record.args().to_string(),
        });
    }

    fn flush(&self) {}
}
