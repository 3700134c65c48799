#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Basin classification of hazard grid points.
//!
//! Loads the pipeline configuration (embedded default or a TOML file),
//! compiles each basin's region into a [`geometry::BasinShape`], labels
//! grid points by first-match-wins in configuration order, and cuts a
//! catalog into per-basin subsets that keep only the events with non-zero
//! intensity inside the basin.

pub mod classify;
pub mod config;
pub mod geometry;

pub use classify::{BasinAssignment, BasinClassifier, BasinSubset, select_basin, split_basins};
pub use tc_hazard_basin_models::{BasinCode, BasinDefinition, BasinRegion, PipelineConfig};

/// Errors that can occur while loading basin configuration or classifying.
#[derive(Debug, thiserror::Error)]
pub enum BasinError {
    /// A basin code was requested that the configuration does not define.
    #[error("Unknown basin code: {code}")]
    UnknownBasin {
        /// The requested code.
        code: BasinCode,
    },

    /// Configuration file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file is not valid TOML for [`PipelineConfig`].
    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// A basin region is geometrically invalid.
    #[error("Invalid region for basin {code}: {message}")]
    InvalidRegion {
        /// Basin whose region is invalid.
        code: BasinCode,
        /// Description of what went wrong.
        message: String,
    },

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {message}")]
    InvalidConfig {
        /// Description of what went wrong.
        message: String,
    },
}
