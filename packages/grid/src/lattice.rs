//! Lattice construction around a scattered table.

use tc_hazard_grid_models::{MetricTable, RegularGrid};

use crate::GridError;

/// Lattice from `floor(min)` to `ceil(max)` of the table's coordinates on
/// both axes, stepped by `resolution`.
///
/// # Errors
///
/// Returns [`GridError::InvalidResolution`] for a non-positive or
/// non-finite resolution and [`GridError::EmptyTable`] if the table has no
/// point with finite coordinates.
pub fn lattice_for(table: &MetricTable, resolution: f64) -> Result<RegularGrid, GridError> {
    if !(resolution.is_finite() && resolution > 0.0) {
        return Err(GridError::InvalidResolution { value: resolution });
    }
    let bounds = table.bounds().ok_or(GridError::EmptyTable)?;

    let grid = RegularGrid::spanning(
        bounds.lon_min.floor(),
        bounds.lon_max.ceil(),
        bounds.lat_min.floor(),
        bounds.lat_max.ceil(),
        resolution,
    )
    .ok_or(GridError::InvalidResolution { value: resolution })?;

    log::debug!(
        "Lattice {}x{} at {resolution} deg from ({}, {})",
        grid.nx,
        grid.ny,
        grid.lon_min,
        grid.lat_min
    );
    Ok(grid)
}
