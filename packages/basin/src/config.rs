//! Loading and validation of [`PipelineConfig`].
//!
//! The default basin layout is embedded at compile time from
//! `config/default.toml`; a file passed on the command line replaces it
//! wholesale.

use std::collections::BTreeSet;
use std::path::Path;

use tc_hazard_basin_models::PipelineConfig;

use crate::BasinError;
use crate::geometry::BasinShape;

/// Embedded default configuration.
const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Returns the embedded default configuration.
///
/// # Panics
///
/// Panics if the embedded TOML fails to parse or validate. Since it is a
/// compile-time constant, a failure indicates a development error and is
/// caught by the tests below.
#[must_use]
pub fn default_config() -> PipelineConfig {
    parse_config(DEFAULT_CONFIG_TOML)
        .unwrap_or_else(|e| panic!("Failed to load embedded default config: {e}"))
}

/// Parses and validates a configuration from TOML text.
///
/// # Errors
///
/// Returns an error if the text is not valid TOML for [`PipelineConfig`]
/// or fails [`validate`].
pub fn parse_config(toml_str: &str) -> Result<PipelineConfig, BasinError> {
    let config: PipelineConfig = toml::de::from_str(toml_str)?;
    validate(&config)?;
    Ok(config)
}

/// Reads, parses, and validates a configuration file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or its contents are invalid.
pub fn load_config(path: &Path) -> Result<PipelineConfig, BasinError> {
    let text = std::fs::read_to_string(path)?;
    let config = parse_config(&text)?;
    log::info!(
        "Loaded config with {} basins from {}",
        config.basins.len(),
        path.display()
    );
    Ok(config)
}

/// Loads `path` if given, otherwise the embedded default.
///
/// # Errors
///
/// Returns an error if `path` is given and cannot be loaded.
pub fn load_or_default(path: Option<&Path>) -> Result<PipelineConfig, BasinError> {
    path.map_or_else(|| Ok(default_config()), load_config)
}

/// Checks the configuration for internal consistency.
///
/// # Errors
///
/// Returns [`BasinError::InvalidConfig`] for duplicate codes or region
/// ids, ordering offsets closer than `offset_stride`, non-positive
/// ensemble constants or grid resolution, or a negative/non-finite
/// observed frequency; and [`BasinError::InvalidRegion`] for a region
/// that cannot be compiled.
pub fn validate(config: &PipelineConfig) -> Result<(), BasinError> {
    let invalid = |message: String| Err(BasinError::InvalidConfig { message });

    if config.ensemble_count == 0 || config.years_per_ensemble == 0 {
        return invalid("ensemble_count and years_per_ensemble must be positive".to_string());
    }
    if !(config.grid_resolution.is_finite() && config.grid_resolution > 0.0) {
        return invalid(format!(
            "grid_resolution must be positive, got {}",
            config.grid_resolution
        ));
    }
    if config.basins.is_empty() {
        return invalid("at least one basin is required".to_string());
    }

    let mut codes = BTreeSet::new();
    let mut region_ids = BTreeSet::new();
    for basin in &config.basins {
        if !codes.insert(&basin.code) {
            return invalid(format!("duplicate basin code {}", basin.code));
        }
        if !region_ids.insert(basin.region_id) {
            return invalid(format!("duplicate region id {}", basin.region_id));
        }
        if !(basin.observed_frequency.is_finite() && basin.observed_frequency >= 0.0) {
            return invalid(format!(
                "observed_frequency for {} must be a non-negative number",
                basin.code
            ));
        }
        BasinShape::compile(&basin.code, &basin.region)?;
    }

    let mut offsets: Vec<u64> = config.basins.iter().map(|b| b.ordering_offset).collect();
    offsets.sort_unstable();
    if let Some(pair) = offsets
        .windows(2)
        .find(|w| w[1] - w[0] < config.offset_stride)
    {
        return invalid(format!(
            "ordering offsets {} and {} are closer than offset_stride {}",
            pair[0], pair[1], config.offset_stride
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_hazard_basin_models::{BasinCode, BasinRegion};

    #[test]
    fn embedded_default_loads() {
        let config = default_config();
        assert_eq!(config.basins.len(), 6);
        assert!((config.total_years() - 1600.0).abs() < f64::EPSILON);
        let codes: Vec<String> = config.codes().iter().map(ToString::to_string).collect();
        assert_eq!(codes, vec!["EP", "NA", "NI", "SI", "SP", "WP"]);
    }

    #[test]
    fn default_offsets_are_spaced_by_stride() {
        let config = default_config();
        for (i, basin) in config.basins.iter().enumerate() {
            assert_eq!(basin.ordering_offset, i as u64 * 100_000);
        }
    }

    #[test]
    fn default_south_pacific_wraps() {
        let config = default_config();
        let sp = config.basin(&BasinCode::new("SP")).unwrap();
        match sp.region {
            BasinRegion::BoundingBox {
                lon_min, lon_max, ..
            } => assert!(lon_max < lon_min),
            BasinRegion::Polygon { .. } => panic!("SP should be a box"),
        }
    }

    #[test]
    fn rejects_duplicate_codes() {
        let mut config = default_config();
        config.basins[1].code = BasinCode::new("EP");
        assert!(matches!(
            validate(&config),
            Err(BasinError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn rejects_overlapping_offset_ranges() {
        let mut config = default_config();
        config.basins[1].ordering_offset = 50;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rejects_degenerate_polygon() {
        let mut config = default_config();
        config.basins[0].region = BasinRegion::Polygon {
            ring: vec![[0.0, 0.0], [1.0, 1.0]],
        };
        assert!(matches!(
            validate(&config),
            Err(BasinError::InvalidRegion { .. })
        ));
    }

    #[test]
    fn parses_minimal_box_config() {
        let config = parse_config(
            r#"
            ensemble_count = 10
            years_per_ensemble = 5
            offset_stride = 1000
            grid_resolution = 0.5

            [[basins]]
            code = "XX"
            name = "Test"
            region_id = 1
            observed_frequency = 3.0
            ordering_offset = 0

            [basins.region]
            type = "box"
            lon_min = 0.0
            lon_max = 10.0
            lat_min = 0.0
            lat_max = 10.0
            "#,
        )
        .unwrap();
        assert!((config.total_years() - 50.0).abs() < f64::EPSILON);
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = load_config(Path::new("/nonexistent/basins.toml")).unwrap_err();
        assert!(matches!(err, BasinError::Io(_)));
    }
}
