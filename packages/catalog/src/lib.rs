#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Operations on tropical-cyclone hazard catalogs.
//!
//! Provides point and extent selection, multi-catalog concatenation, the
//! repair pass for corrupted intensity matrices, and the persistence and
//! simulation collaborators the rest of the pipeline is written against.
//! The catalog types themselves live in [`tc_hazard_catalog_models`].

pub mod concat;
pub mod naming;
pub mod progress;
pub mod repair;
pub mod select;
pub mod simulate;
pub mod store;

pub use tc_hazard_catalog_models::{
    BasinCode, CatalogShapeError, EventOrder, EventRecord, GridPoint, HazardCatalog,
    IntensityMatrix, MatrixLayoutError, RepairReport,
};

/// Boxed error returned by external collaborators (simulation, statistics).
pub type CollaboratorError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while manipulating or persisting catalogs.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// I/O error (missing input file, unwritable output).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Catalog could not be encoded.
    #[error("MessagePack encode error: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Catalog could not be decoded.
    #[error("MessagePack decode error: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Events, points, and intensity matrix disagree on dimensions.
    #[error(transparent)]
    Shape(#[from] CatalogShapeError),

    /// Intensity matrices could not be combined.
    #[error(transparent)]
    Layout(#[from] MatrixLayoutError),

    /// A spatial extent with `min >= max` on either axis.
    #[error("Invalid extent: {message}")]
    InvalidExtent {
        /// Description of what went wrong.
        message: String,
    },

    /// An external collaborator failed.
    #[error("Collaborator error: {0}")]
    Collaborator(CollaboratorError),
}
