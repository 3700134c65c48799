//! Wind-field simulation collaborator.
//!
//! Turning storm tracks into a hazard catalog is done by an external
//! physical wind model. The pipeline fans that work out over ensemble
//! shards: each shard reads its own tracks, simulates, and writes its own
//! catalog file, with no state shared between shards.

use std::path::Path;

use tc_hazard_catalog_models::{GridPoint, HazardCatalog};

use crate::store::HazardStore;
use crate::{CatalogError, CollaboratorError};

/// Computes wind fields for a track ensemble on a set of grid points.
pub trait WindFieldSimulator {
    /// Track ensemble representation accepted by the simulator.
    type Tracks;

    /// Simulates `tracks` on `points` with the named wind model
    /// (e.g. `"H08"`).
    ///
    /// # Errors
    ///
    /// Returns any error raised by the simulator.
    fn simulate(
        &self,
        tracks: &Self::Tracks,
        points: &[GridPoint],
        wind_model: &str,
    ) -> Result<HazardCatalog, CollaboratorError>;
}

/// Simulates one ensemble shard and saves it to `output`.
///
/// This is the integration point for an external wind-field model; the
/// shards it writes are the raw regional catalogs `correct` reads. No
/// simulator ships with this crate.
///
/// Returns the number of events written. A failing shard aborts on its
/// own; detecting incomplete shard sets is left to the caller (see
/// `tc_hazard_report::completeness`).
///
/// # Errors
///
/// Returns [`CatalogError::Collaborator`] if the simulation fails, or a
/// store error if the catalog cannot be written.
pub fn simulate_shard<S: WindFieldSimulator>(
    simulator: &S,
    store: &dyn HazardStore,
    tracks: &S::Tracks,
    points: &[GridPoint],
    wind_model: &str,
    output: &Path,
) -> Result<usize, CatalogError> {
    log::info!(
        "Simulating {wind_model} wind fields on {} points -> {}",
        points.len(),
        output.display()
    );

    let catalog = simulator
        .simulate(tracks, points, wind_model)
        .map_err(CatalogError::Collaborator)?;
    store.save(&catalog, output)?;

    Ok(catalog.len())
}
