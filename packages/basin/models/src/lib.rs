#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Basin definitions and pipeline configuration types.
//!
//! Defines the TOML schema for the immutable [`PipelineConfig`] that is
//! built once at start-up and handed by reference to every stage: basin
//! geometries, literature storm frequencies, ordering offsets, and the
//! ensemble constants used by the frequency correction.

use serde::{Deserialize, Serialize};

pub use tc_hazard_catalog_models::BasinCode;

/// Spatial extent of a basin.
///
/// Box bounds are exclusive. A box with `lon_max < lon_min` wraps across
/// the antimeridian.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BasinRegion {
    /// Closed polygon ring of `[lon, lat]` vertices. The closing vertex may
    /// be omitted.
    Polygon {
        /// Ring vertices in order.
        ring: Vec<[f64; 2]>,
    },
    /// Lon/lat box.
    #[serde(rename = "box")]
    BoundingBox {
        /// Western bound.
        lon_min: f64,
        /// Eastern bound; less than `lon_min` for wrapping boxes.
        lon_max: f64,
        /// Southern bound.
        lat_min: f64,
        /// Northern bound.
        lat_max: f64,
    },
}

/// One ocean basin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasinDefinition {
    /// Unique basin code (e.g. `"EP"`).
    pub code: BasinCode,
    /// Human-readable name (e.g. "Eastern Pacific").
    pub name: String,
    /// Numeric region id stamped on classified points.
    pub region_id: u32,
    /// Observed annual storm count from the best-track literature.
    pub observed_frequency: f64,
    /// Offset added to the per-basin event sequence to form ordering keys.
    pub ordering_offset: u64,
    /// Geometry.
    pub region: BasinRegion,
}

/// Immutable configuration shared by every pipeline stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Ensemble members per model run.
    pub ensemble_count: u32,
    /// Simulated years per ensemble member.
    pub years_per_ensemble: u32,
    /// Minimum spacing between basin ordering offsets.
    pub offset_stride: u64,
    /// Default lattice step for gridded products, in degrees.
    pub grid_resolution: f64,
    /// Basins in priority order: when regions overlap, the first listed
    /// basin claims the point.
    pub basins: Vec<BasinDefinition>,
}

impl PipelineConfig {
    /// Total simulated years across all ensemble members.
    #[must_use]
    pub fn total_years(&self) -> f64 {
        f64::from(self.ensemble_count) * f64::from(self.years_per_ensemble)
    }

    /// Looks up a basin by code.
    #[must_use]
    pub fn basin(&self, code: &BasinCode) -> Option<&BasinDefinition> {
        self.basins.iter().find(|b| &b.code == code)
    }

    /// Basin codes in priority order.
    #[must_use]
    pub fn codes(&self) -> Vec<BasinCode> {
        self.basins.iter().map(|b| b.code.clone()).collect()
    }
}
