//! Detects missing global products in an output directory.
//!
//! A full run writes one global file per model, period, scenario, genesis
//! category, metric family, and output kind. Shards run independently, so
//! a partially finished run shows up here as missing names.

use std::collections::BTreeSet;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tc_hazard_catalog::naming::{CLIMATE_MODELS, HazardFileName, Period, Region};
use tc_hazard_grid::MetricFamily;

use crate::ReportError;

/// The product matrix of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputSpec {
    /// Climate models of the run.
    pub models: Vec<String>,
    /// Periods, baseline first.
    pub periods: Vec<Period>,
    /// Emission scenarios.
    pub scenarios: Vec<String>,
    /// Genesis-index categories.
    pub categories: Vec<String>,
    /// Metric families mapped per configuration.
    pub families: Vec<MetricFamily>,
    /// Suffixes after the family name (e.g. `".csv"`, `"_raster.json"`).
    pub extensions: Vec<String>,
    /// Ensemble members per model.
    pub ensembles: u32,
    /// Wind model tag.
    pub wind_model: String,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(ToString::to_string).collect()
}

impl Default for OutputSpec {
    fn default() -> Self {
        Self {
            models: strings(CLIMATE_MODELS),
            periods: Period::all().to_vec(),
            scenarios: strings(&["ssp245", "ssp370", "ssp585"]),
            categories: strings(&["CRH", "SD"]),
            families: vec![MetricFamily::ExceedanceIntensity, MetricFamily::ReturnPeriods],
            extensions: strings(&[".csv", ".json", "_raster.json"]),
            ensembles: 80,
            wind_model: "H08".to_string(),
        }
    }
}

impl OutputSpec {
    /// Same matrix restricted to one extension.
    #[must_use]
    pub fn with_extension(&self, extension: &str) -> Self {
        Self {
            extensions: vec![extension.to_string()],
            ..self.clone()
        }
    }
}

/// Every global file name the run should produce.
#[must_use]
pub fn expected_outputs(spec: &OutputSpec) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    for model in &spec.models {
        for &period in &spec.periods {
            for scenario in &spec.scenarios {
                for category in &spec.categories {
                    let name = HazardFileName {
                        region: Region::Global,
                        model: model.clone(),
                        period,
                        scenario: scenario.clone(),
                        ensembles: spec.ensembles,
                        category: category.clone(),
                        wind_model: spec.wind_model.clone(),
                    };
                    for family in &spec.families {
                        for extension in &spec.extensions {
                            names.insert(name.file(&format!("_{family}{extension}")));
                        }
                    }
                }
            }
        }
    }
    names
}

/// Names in `expected` that are not files in `dir`, sorted. A missing
/// directory means everything is missing.
///
/// # Errors
///
/// Returns an error if `dir` exists but cannot be listed.
pub fn missing_outputs(
    dir: &Path,
    expected: &BTreeSet<String>,
) -> Result<Vec<String>, ReportError> {
    if !dir.is_dir() {
        log::warn!("Output directory {} does not exist", dir.display());
        return Ok(expected.iter().cloned().collect());
    }

    let mut present = BTreeSet::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if let Some(name) = entry.file_name().to_str() {
            present.insert(name.to_string());
        }
    }

    Ok(expected.difference(&present).cloned().collect())
}

/// Result of checking one extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompletenessReport {
    /// Extension checked.
    pub extension: String,
    /// Number of names expected.
    pub expected: usize,
    /// Number of expected names present.
    pub found: usize,
    /// Expected names not present, sorted.
    pub missing: Vec<String>,
}

impl CompletenessReport {
    /// Whether nothing is missing.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Checks `dir` against `spec`, one report per extension.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn check_outputs(dir: &Path, spec: &OutputSpec) -> Result<Vec<CompletenessReport>, ReportError> {
    spec.extensions
        .iter()
        .map(|extension| {
            let expected = expected_outputs(&spec.with_extension(extension));
            let missing = missing_outputs(dir, &expected)?;
            let report = CompletenessReport {
                extension: extension.clone(),
                expected: expected.len(),
                found: expected.len() - missing.len(),
                missing,
            };
            log::info!(
                "{}: {} expected, {} found, {} missing",
                report.extension,
                report.expected,
                report.found,
                report.missing.len()
            );
            Ok(report)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> OutputSpec {
        OutputSpec {
            models: strings(&["CESM2"]),
            periods: vec![Period::Base, Period::Fut1],
            scenarios: strings(&["ssp370"]),
            categories: strings(&["CRH"]),
            families: vec![MetricFamily::ReturnPeriods],
            extensions: strings(&[".csv", "_raster.json"]),
            ..OutputSpec::default()
        }
    }

    #[test]
    fn default_matrix_size() {
        let spec = OutputSpec::default();
        assert_eq!(expected_outputs(&spec).len(), 6 * 3 * 3 * 2 * 2 * 3);
        assert_eq!(expected_outputs(&spec.with_extension(".csv")).len(), 216);
    }

    #[test]
    fn names_follow_the_global_stem() {
        let names = expected_outputs(&small());
        assert_eq!(names.len(), 4);
        assert!(names.contains(
            "TC_global_0300as_CHAZ_CESM2_fut1_ssp370_80ens_CRH_H08_return_periods_raster.json"
        ));
    }

    #[test]
    fn lists_only_missing_names() {
        let dir = tempfile::tempdir().unwrap();
        let expected = expected_outputs(&small());
        let first = expected.iter().next().unwrap().clone();
        std::fs::write(dir.path().join(&first), "").unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "").unwrap();

        let missing = missing_outputs(dir.path(), &expected).unwrap();
        assert_eq!(missing.len(), 3);
        assert!(!missing.contains(&first));
        assert!(missing.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn reports_per_extension() {
        let dir = tempfile::tempdir().unwrap();
        for name in expected_outputs(&small().with_extension(".csv")) {
            std::fs::write(dir.path().join(name), "").unwrap();
        }

        let reports = check_outputs(dir.path(), &small()).unwrap();
        assert_eq!(reports.len(), 2);
        assert!(reports[0].is_complete());
        assert_eq!(reports[0].found, 2);
        assert_eq!(reports[1].extension, "_raster.json");
        assert_eq!(reports[1].missing.len(), 2);
    }

    #[test]
    fn missing_directory_misses_everything() {
        let dir = tempfile::tempdir().unwrap();
        let missing = missing_outputs(&dir.path().join("nope"), &expected_outputs(&small())).unwrap();
        assert_eq!(missing.len(), 4);
    }
}
