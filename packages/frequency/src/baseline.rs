//! The per-basin base frequency recorded by the baseline period.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tc_hazard_basin::BasinCode;

use crate::FrequencyError;

/// Base frequency per basin, computed once and read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrequencyBaseline {
    base_frequencies: BTreeMap<BasinCode, f64>,
}

impl FrequencyBaseline {
    /// Builds a baseline from `(basin, base_freq)` pairs.
    ///
    /// # Errors
    ///
    /// Returns [`FrequencyError::NonFinite`] for a NaN, infinite, or
    /// negative value.
    pub fn from_entries(
        entries: impl IntoIterator<Item = (BasinCode, f64)>,
    ) -> Result<Self, FrequencyError> {
        let mut base_frequencies = BTreeMap::new();
        for (basin, value) in entries {
            if !(value.is_finite() && value >= 0.0) {
                return Err(FrequencyError::NonFinite { basin, value });
            }
            base_frequencies.insert(basin, value);
        }
        Ok(Self { base_frequencies })
    }

    /// Base frequency recorded for `basin`.
    #[must_use]
    pub fn get(&self, basin: &BasinCode) -> Option<f64> {
        self.base_frequencies.get(basin).copied()
    }

    /// Recorded `(basin, base_freq)` pairs in code order.
    pub fn iter(&self) -> impl Iterator<Item = (&BasinCode, f64)> {
        self.base_frequencies.iter().map(|(code, v)| (code, *v))
    }

    /// Number of recorded basins.
    #[must_use]
    pub fn len(&self) -> usize {
        self.base_frequencies.len()
    }

    /// Whether no basin is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.base_frequencies.is_empty()
    }

    /// Writes the baseline as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), FrequencyError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        log::info!("Wrote frequency baseline to {}", path.display());
        Ok(())
    }

    /// Reads a baseline written by [`FrequencyBaseline::save`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// holds an invalid frequency.
    pub fn load(path: &Path) -> Result<Self, FrequencyError> {
        let text = std::fs::read_to_string(path)?;
        let raw: Self = serde_json::from_str(&text)?;
        let baseline = Self::from_entries(raw.base_frequencies)?;
        log::info!(
            "Loaded frequency baseline for {} basins from {}",
            baseline.len(),
            path.display()
        );
        Ok(baseline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_finite_entries() {
        let err = FrequencyBaseline::from_entries([(BasinCode::new("EP"), f64::INFINITY)])
            .unwrap_err();
        assert!(matches!(err, FrequencyError::NonFinite { .. }));
    }

    #[test]
    fn persists_through_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("baseline.json");
        let baseline = FrequencyBaseline::from_entries([
            (BasinCode::new("NA"), 0.25),
            (BasinCode::new("EP"), 0.5),
        ])
        .unwrap();

        baseline.save(&path).unwrap();
        let loaded = FrequencyBaseline::load(&path).unwrap();

        assert_eq!(loaded, baseline);
        let codes: Vec<&str> = loaded.iter().map(|(c, _)| c.as_str()).collect();
        assert_eq!(codes, vec!["EP", "NA"]);
    }

    #[test]
    fn load_rejects_negative_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("baseline.json");
        std::fs::write(&path, r#"{"base_frequencies":{"EP":-1.0}}"#).unwrap();
        assert!(matches!(
            FrequencyBaseline::load(&path),
            Err(FrequencyError::NonFinite { .. })
        ));
    }
}
