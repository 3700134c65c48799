#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tabular and gridded hazard map types.
//!
//! A [`MetricTable`] holds per-point statistics (exceedance intensity or
//! return periods) at scattered locations, as produced per tile by the
//! statistics engine. A [`Raster`] holds the same metrics interpolated onto
//! a [`RegularGrid`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// One scattered location with a value per table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScatteredMetricPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
    /// Values aligned with [`MetricTable::columns`]; `NaN` marks a missing
    /// value.
    pub values: Vec<f64>,
}

/// Error returned when a point's value count does not match the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableShapeError {
    /// Number of table columns.
    pub columns: usize,
    /// Number of values supplied.
    pub values: usize,
}

impl fmt::Display for TableShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "row has {} values but the table has {} metric columns",
            self.values, self.columns
        )
    }
}

impl std::error::Error for TableShapeError {}

/// Lon/lat extent of a set of points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Smallest longitude.
    pub lon_min: f64,
    /// Largest longitude.
    pub lon_max: f64,
    /// Smallest latitude.
    pub lat_min: f64,
    /// Largest latitude.
    pub lat_max: f64,
}

/// Scattered points sharing one list of metric columns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    columns: Vec<String>,
    points: Vec<ScatteredMetricPoint>,
}

impl MetricTable {
    /// An empty table with the given metric columns.
    #[must_use]
    pub const fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            points: Vec::new(),
        }
    }

    /// Appends a point.
    ///
    /// # Errors
    ///
    /// Returns [`TableShapeError`] if the point does not carry exactly one
    /// value per column.
    pub fn push(&mut self, point: ScatteredMetricPoint) -> Result<(), TableShapeError> {
        if point.values.len() != self.columns.len() {
            return Err(TableShapeError {
                columns: self.columns.len(),
                values: point.values.len(),
            });
        }
        self.points.push(point);
        Ok(())
    }

    /// Metric column names, without `lon` and `lat`.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Points in insertion order.
    #[must_use]
    pub fn points(&self) -> &[ScatteredMetricPoint] {
        &self.points
    }

    /// Position of `name` among the metric columns.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of column `index`, in point order.
    pub fn column(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(move |p| p.values[index])
    }

    /// Value of `name` at point `row`.
    #[must_use]
    pub fn value(&self, row: usize, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.points.get(row).map(|p| p.values[col])
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the table has no points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extent of the points with finite coordinates, or `None` if there
    /// are none.
    #[must_use]
    pub fn bounds(&self) -> Option<Bounds> {
        self.points
            .iter()
            .filter(|p| p.lon.is_finite() && p.lat.is_finite())
            .fold(None, |acc: Option<Bounds>, p| {
                Some(acc.map_or(
                    Bounds {
                        lon_min: p.lon,
                        lon_max: p.lon,
                        lat_min: p.lat,
                        lat_max: p.lat,
                    },
                    |b| Bounds {
                        lon_min: b.lon_min.min(p.lon),
                        lon_max: b.lon_max.max(p.lon),
                        lat_min: b.lat_min.min(p.lat),
                        lat_max: b.lat_max.max(p.lat),
                    },
                ))
            })
    }

    /// Splits the table into its columns and points.
    #[must_use]
    pub fn into_parts(self) -> (Vec<String>, Vec<ScatteredMetricPoint>) {
        (self.columns, self.points)
    }
}

/// Number of lattice steps covering `[min, max]`, endpoints included.
///
/// The small tolerance keeps an exact multiple of `step` from gaining an
/// extra cell through rounding.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn axis_len(min: f64, max: f64, step: f64) -> usize {
    ((max - min) / step - 1e-9).ceil().max(0.0) as usize + 1
}

/// Regular lon/lat lattice with equal spacing on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegularGrid {
    /// Longitude of the first column.
    pub lon_min: f64,
    /// Latitude of the first row.
    pub lat_min: f64,
    /// Spacing in degrees.
    pub resolution: f64,
    /// Number of longitudes.
    pub nx: usize,
    /// Number of latitudes.
    pub ny: usize,
}

impl RegularGrid {
    /// Lattice starting at `(lon_min, lat_min)` that reaches at least
    /// `(lon_max, lat_max)`.
    ///
    /// Returns `None` if `resolution` is not a positive finite number or a
    /// bound is not finite.
    #[must_use]
    pub fn spanning(
        lon_min: f64,
        lon_max: f64,
        lat_min: f64,
        lat_max: f64,
        resolution: f64,
    ) -> Option<Self> {
        if !(resolution.is_finite() && resolution > 0.0) {
            return None;
        }
        if ![lon_min, lon_max, lat_min, lat_max]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        Some(Self {
            lon_min,
            lat_min,
            resolution,
            nx: axis_len(lon_min, lon_max, resolution),
            ny: axis_len(lat_min, lat_max, resolution),
        })
    }

    /// Longitude of column `i`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lon(&self, i: usize) -> f64 {
        (i as f64).mul_add(self.resolution, self.lon_min)
    }

    /// Latitude of row `j`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn lat(&self, j: usize) -> f64 {
        (j as f64).mul_add(self.resolution, self.lat_min)
    }

    /// All longitudes, west to east.
    #[must_use]
    pub fn lons(&self) -> Vec<f64> {
        (0..self.nx).map(|i| self.lon(i)).collect()
    }

    /// All latitudes, south to north.
    #[must_use]
    pub fn lats(&self) -> Vec<f64> {
        (0..self.ny).map(|j| self.lat(j)).collect()
    }

    /// Number of cells.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Whether the lattice has no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Flat lat-major index of cell `(i, j)`.
    #[must_use]
    pub const fn cell(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }
}

/// Descriptive attributes of an output variable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMetadata {
    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub long_name: Option<String>,
    /// Physical unit.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

/// One gridded metric.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterVariable {
    /// Variable name (the source column name).
    pub name: String,
    /// Attributes looked up for the source column.
    pub metadata: VariableMetadata,
    /// Lat-major cell values; `None` outside the data's convex hull.
    pub values: Vec<Option<f64>>,
}

/// Metrics interpolated onto one lattice.
#[derive(Debug, Clone, PartialEq)]
pub struct Raster {
    /// The lattice.
    pub grid: RegularGrid,
    /// One entry per interpolated column, in table column order.
    pub variables: Vec<RasterVariable>,
}

impl Raster {
    /// Looks up a variable by name.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<&RasterVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    /// Value of `name` at column `i`, row `j`; `None` if the variable does
    /// not exist, the cell is out of range, or the cell is missing.
    #[must_use]
    pub fn value(&self, name: &str, i: usize, j: usize) -> Option<f64> {
        if i >= self.grid.nx || j >= self.grid.ny {
            return None;
        }
        self.variable(name)?.values[self.grid.cell(i, j)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(lat: f64, lon: f64, values: &[f64]) -> ScatteredMetricPoint {
        ScatteredMetricPoint {
            lat,
            lon,
            values: values.to_vec(),
        }
    }

    #[test]
    fn push_checks_value_count() {
        let mut table = MetricTable::new(vec!["rp_10".into(), "rp_100".into()]);
        assert!(table.push(point(1.0, 2.0, &[3.0, 4.0])).is_ok());
        let err = table.push(point(1.0, 2.0, &[3.0])).unwrap_err();
        assert_eq!(err.columns, 2);
        assert_eq!(table.len(), 1);
        assert_eq!(table.value(0, "rp_100"), Some(4.0));
        assert_eq!(table.value(0, "rp_5"), None);
    }

    #[test]
    fn bounds_skip_non_finite_coordinates() {
        let mut table = MetricTable::new(vec!["v".into()]);
        table.push(point(-3.5, 10.2, &[1.0])).unwrap();
        table.push(point(f64::NAN, 50.0, &[1.0])).unwrap();
        table.push(point(4.0, -7.9, &[1.0])).unwrap();
        let b = table.bounds().unwrap();
        assert_eq!((b.lon_min, b.lon_max), (-7.9, 10.2));
        assert_eq!((b.lat_min, b.lat_max), (-3.5, 4.0));
        assert!(MetricTable::new(vec![]).bounds().is_none());
    }

    #[test]
    fn lattice_includes_both_endpoints() {
        let grid = RegularGrid::spanning(-8.0, 11.0, -4.0, 4.0, 0.5).unwrap();
        assert_eq!(grid.nx, 39);
        assert_eq!(grid.ny, 17);
        assert_eq!(grid.lons().first(), Some(&-8.0));
        assert_eq!(grid.lons().last(), Some(&11.0));
        assert_eq!(grid.lats().last(), Some(&4.0));
    }

    #[test]
    fn lattice_rejects_bad_resolution() {
        assert!(RegularGrid::spanning(0.0, 1.0, 0.0, 1.0, 0.0).is_none());
        assert!(RegularGrid::spanning(0.0, 1.0, 0.0, 1.0, f64::NAN).is_none());
    }

    #[test]
    fn raster_value_is_lat_major() {
        let grid = RegularGrid::spanning(0.0, 1.0, 0.0, 2.0, 1.0).unwrap();
        let raster = Raster {
            grid,
            variables: vec![RasterVariable {
                name: "v".into(),
                metadata: VariableMetadata::default(),
                values: vec![Some(0.0), Some(1.0), Some(2.0), Some(3.0), None, Some(5.0)],
            }],
        };
        assert_eq!(raster.value("v", 1, 1), Some(3.0));
        assert_eq!(raster.value("v", 0, 2), None);
        assert_eq!(raster.value("v", 2, 0), None);
        assert_eq!(raster.value("w", 0, 0), None);
    }
}
