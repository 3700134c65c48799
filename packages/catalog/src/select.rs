//! Point, event, and extent selection on catalogs.

use serde::{Deserialize, Serialize};
use tc_hazard_catalog_models::HazardCatalog;

use crate::CatalogError;

/// Axis-aligned lon/lat rectangle with inclusive bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    /// Western bound in degrees.
    pub lon_min: f64,
    /// Eastern bound in degrees.
    pub lon_max: f64,
    /// Southern bound in degrees.
    pub lat_min: f64,
    /// Northern bound in degrees.
    pub lat_max: f64,
}

impl Extent {
    /// Creates an extent.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidExtent`] unless `lon_min < lon_max`
    /// and `lat_min < lat_max`.
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self, CatalogError> {
        if !(lon_min < lon_max && lat_min < lat_max) {
            return Err(CatalogError::InvalidExtent {
                message: format!(
                    "lon [{lon_min}, {lon_max}] / lat [{lat_min}, {lat_max}] must have min < max"
                ),
            });
        }

        Ok(Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        })
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.lon_min..=self.lon_max).contains(&lon) && (self.lat_min..=self.lat_max).contains(&lat)
    }
}

/// Restricts `catalog` to the given point columns, keeping every event.
///
/// Points keep their original `index` and basin label.
///
/// # Panics
///
/// Panics if a column is out of range.
#[must_use]
pub fn select_points(catalog: &HazardCatalog, columns: &[usize]) -> HazardCatalog {
    let points = columns
        .iter()
        .map(|&c| catalog.points()[c].clone())
        .collect();
    let intensity = catalog.intensity().select_columns(columns);

    HazardCatalog::new(catalog.events().to_vec(), points, intensity)
        .unwrap_or_else(|_| unreachable!("column selection preserves the catalog shape"))
}

/// Drops events whose intensity row has no non-zero value.
#[must_use]
pub fn drop_quiet_events(catalog: HazardCatalog) -> HazardCatalog {
    let active: Vec<usize> = (0..catalog.len())
        .filter(|&row| catalog.intensity().row_has_nonzero(row))
        .collect();
    if active.len() == catalog.len() {
        return catalog;
    }

    let (events, points, intensity) = catalog.into_parts();
    let intensity = intensity.select_rows(&active);
    let events = active.iter().map(|&row| events[row].clone()).collect();

    HazardCatalog::new(events, points, intensity)
        .unwrap_or_else(|_| unreachable!("row selection preserves the catalog shape"))
}

/// Restricts `catalog` to points inside `extent`, keeping every event.
#[must_use]
pub fn select_extent(catalog: &HazardCatalog, extent: &Extent) -> HazardCatalog {
    let columns: Vec<usize> = catalog
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| extent.contains(p.lon, p.lat))
        .map(|(i, _)| i)
        .collect();

    log::debug!(
        "Extent {extent:?} keeps {} of {} points",
        columns.len(),
        catalog.points().len()
    );

    select_points(catalog, &columns)
}
