//! In-memory measurement history.
//!
//! Session-scoped: nothing is persisted automatically. Saved results can be
//! exported explicitly to CSV, either the whole history as one wide table
//! (metadata columns followed by per-pixel spectral values) or a single
//! spectrum as a two-column wavelength/intensity file.

use crate::measurement::MeasurementResult;
use std::sync::Arc;

#[cfg(feature = "storage_csv")]
use crate::error::AppResult;
#[cfg(feature = "storage_csv")]
use std::path::Path;

/// One saved history entry.
#[derive(Clone)]
pub struct SavedMeasurement {
    pub label: String,
    pub result: Arc<MeasurementResult>,
}

/// Ordered list of saved measurements.
#[derive(Default)]
pub struct MeasurementHistory {
    entries: Vec<SavedMeasurement>,
}

impl MeasurementHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save a result under the given label, or a generated
    /// `<type>_<timestamp>` label when none is supplied. Returns the label
    /// used.
    pub fn save(&mut self, label: Option<String>, result: Arc<MeasurementResult>) -> String {
        let label = match label {
            Some(l) if !l.trim().is_empty() => l,
            _ => format!(
                "{}_{}",
                result.measurement_type,
                result.timestamp.format("%Y%m%d_%H%M%S")
            ),
        };
        self.entries.push(SavedMeasurement {
            label: label.clone(),
            result,
        });
        label
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SavedMeasurement> {
        self.entries.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &SavedMeasurement> {
        self.entries.iter()
    }

    /// Remove one entry. Out-of-range indices are ignored.
    pub fn remove(&mut self, index: usize) -> Option<SavedMeasurement> {
        if index < self.entries.len() {
            Some(self.entries.remove(index))
        } else {
            None
        }
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Export the whole history as one CSV table.
    ///
    /// The header row carries the wavelength grid of the first entry; every
    /// entry contributes one data row. Returns the number of rows written.
    #[cfg(feature = "storage_csv")]
    pub fn export_csv(&self, path: &Path) -> AppResult<usize> {
        let mut writer = csv::Writer::from_path(path)?;
        if let Some(first) = self.entries.first() {
            writer.write_record(first.result.csv_header())?;
        }
        for entry in &self.entries {
            writer.write_record(entry.result.csv_record())?;
        }
        writer.flush()?;
        Ok(self.entries.len())
    }
}

/// Export one spectrum as a two-column `Wavelength (nm),Intensity` CSV.
#[cfg(feature = "storage_csv")]
pub fn export_spectrum_csv(result: &MeasurementResult, path: &Path) -> AppResult<()> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(["Wavelength (nm)", "Intensity"])?;
    for (w, v) in result.wavelengths.iter().zip(&result.spectral_data) {
        writer.write_record([format!("{w:.2}"), format!("{v:.6e}")])?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::capabilities::MeasurementType;

    fn result() -> Arc<MeasurementResult> {
        Arc::new(
            MeasurementResult::new(
                MeasurementType::Radiance,
                vec![380.0, 381.0, 382.0],
                vec![0.1, 0.2, 0.3],
            )
            .unwrap()
            .with_photometrics(50.0, 0.0),
        )
    }

    #[test]
    fn generated_label_includes_type() {
        let mut h = MeasurementHistory::new();
        let label = h.save(None, result());
        assert!(label.starts_with("radiance_"));
        assert_eq!(h.len(), 1);
    }

    #[test]
    fn explicit_label_preserved_blank_replaced() {
        let mut h = MeasurementHistory::new();
        assert_eq!(h.save(Some("baseline".into()), result()), "baseline");
        assert!(h.save(Some("   ".into()), result()).starts_with("radiance_"));
    }

    #[test]
    fn remove_and_clear() {
        let mut h = MeasurementHistory::new();
        h.save(Some("a".into()), result());
        h.save(Some("b".into()), result());
        assert!(h.remove(5).is_none());
        let removed = h.remove(0).unwrap();
        assert_eq!(removed.label, "a");
        assert_eq!(h.len(), 1);
        h.clear();
        assert!(h.is_empty());
    }

    #[cfg(feature = "storage_csv")]
    #[test]
    fn export_history_writes_header_and_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.csv");
        let mut h = MeasurementHistory::new();
        h.save(Some("a".into()), result());
        h.save(Some("b".into()), result());
        assert_eq!(h.export_csv(&path).unwrap(), 2);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("timestamp,type,display_value"));
        assert!(lines[0].ends_with("380.00,381.00,382.00"));
        assert!(lines[1].contains("radiance"));
    }

    #[cfg(feature = "storage_csv")]
    #[test]
    fn export_single_spectrum_two_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spectrum.csv");
        export_spectrum_csv(&result(), &path).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines[0], "Wavelength (nm),Intensity");
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("380.00,"));
    }
}
