#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Hazard map products from per-point statistics.
//!
//! Tiles of scattered per-point metrics (one CSV per spatial tile, written
//! after the statistics engine ran on a catalog extent) are merged into
//! one global table, deduplicated by exact coordinates, and interpolated
//! onto a regular lon/lat lattice. Both the merged points and the raster
//! are written with per-variable descriptions and units.

pub mod combine;
pub mod interpolate;
pub mod lattice;
pub mod metadata;
pub mod stats;
pub mod tiles;
pub mod write;

pub use combine::{CombineOptions, CombineOutputs, combine_tiles};
pub use interpolate::{InterpolationMethod, ScatterInterpolator, interpolate_column, interpolate_table};
pub use lattice::lattice_for;
pub use metadata::{MetricFamily, metric_column_name};
pub use stats::{Extrapolation, StatisticsEngine, StatisticsRequest, compute_tile};
pub use tc_hazard_grid_models::{
    Bounds, MetricTable, Raster, RasterVariable, RegularGrid, ScatteredMetricPoint,
    TableShapeError, VariableMetadata,
};
pub use tiles::{discover_tiles, merge_tiles, read_tile, read_tiles};

use tc_hazard_catalog::CollaboratorError;

/// Errors that can occur while reading, merging, gridding, or writing
/// metric tables.
#[derive(Debug, thiserror::Error)]
pub enum GridError {
    /// A metric column was requested that the table does not have.
    #[error("Unknown metric column: {name}")]
    UnknownColumn {
        /// The requested column.
        name: String,
    },

    /// A tile file lacks a `lon` or `lat` column.
    #[error("Tile {path} has no lon/lat columns")]
    MissingCoordinates {
        /// Offending file.
        path: String,
    },

    /// A tile cell is not a number.
    #[error("Invalid value {value:?} in column {column} of {path}, line {line}")]
    InvalidValue {
        /// Offending file.
        path: String,
        /// Line in the file.
        line: u64,
        /// Column header.
        column: String,
        /// Raw cell text.
        value: String,
    },

    /// No points to grid.
    #[error("Metric table has no points with finite coordinates")]
    EmptyTable,

    /// The points cannot be triangulated.
    #[error("Triangulation failed: {message}")]
    Triangulation {
        /// Description of what went wrong.
        message: String,
    },

    /// Lattice resolution is not a positive finite number.
    #[error("Invalid grid resolution: {value}")]
    InvalidResolution {
        /// The rejected resolution.
        value: f64,
    },

    /// A row does not match the table's columns.
    #[error(transparent)]
    Table(#[from] TableShapeError),

    /// The statistics engine failed.
    #[error("Statistics engine error: {0}")]
    Engine(CollaboratorError),

    /// The statistics engine returned output of the wrong shape.
    #[error("Statistics engine returned {message}")]
    EngineShape {
        /// Description of the mismatch.
        message: String,
    },

    /// CSV error.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
