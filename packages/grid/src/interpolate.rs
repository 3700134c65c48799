//! Interpolation of scattered metrics onto a regular lattice.
//!
//! The scattered points are triangulated once (Delaunay, via `spade`);
//! every lattice cell then gets a set of vertex weights that is applied to
//! each metric column in turn. Cells outside the convex hull of the points
//! are missing for every method.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use spade::handles::FixedVertexHandle;
use spade::{
    DelaunayTriangulation, FloatTriangulation, HasPosition, Point2, PositionInTriangulation,
    Triangulation,
};
use strum_macros::{Display, EnumString};
use tc_hazard_catalog::progress::ProgressCallback;
use tc_hazard_grid_models::{MetricTable, Raster, RasterVariable, RegularGrid, VariableMetadata};

use crate::GridError;

/// How lattice values are derived from the scattered points.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum InterpolationMethod {
    /// Barycentric weights of the enclosing Delaunay triangle.
    #[default]
    Linear,
    /// Sibson natural-neighbour weights.
    Natural,
    /// Value of the nearest scattered point.
    Nearest,
}

impl InterpolationMethod {
    /// Whether the method weights the vertices of a triangle, and so needs
    /// at least one non-degenerate face.
    #[must_use]
    pub const fn needs_faces(self) -> bool {
        matches!(self, Self::Linear | Self::Natural)
    }
}

/// Triangulation vertex: a table row at its position.
#[derive(Debug, Clone, Copy)]
struct Sample {
    position: Point2<f64>,
    row: usize,
}

impl HasPosition for Sample {
    type Scalar = f64;

    fn position(&self) -> Point2<f64> {
        self.position
    }
}

/// Triangulated scatter of one table, ready to be sampled.
pub struct ScatterInterpolator {
    triangulation: DelaunayTriangulation<Sample>,
    method: InterpolationMethod,
}

impl ScatterInterpolator {
    /// Triangulates the points of `table` with finite coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`GridError::EmptyTable`] if there are no such points and
    /// [`GridError::Triangulation`] if the triangulation rejects them. The
    /// face-weighting methods also fail on fewer than three or collinear
    /// points; [`InterpolationMethod::Nearest`] accepts them and only
    /// fills cells on their degenerate hull.
    pub fn new(table: &MetricTable, method: InterpolationMethod) -> Result<Self, GridError> {
        let samples: Vec<Sample> = table
            .points()
            .iter()
            .enumerate()
            .filter(|(_, p)| p.lon.is_finite() && p.lat.is_finite())
            .map(|(row, p)| Sample {
                position: Point2::new(p.lon, p.lat),
                row,
            })
            .collect();
        if samples.is_empty() {
            return Err(GridError::EmptyTable);
        }
        if method.needs_faces() && samples.len() < 3 {
            return Err(GridError::Triangulation {
                message: format!("{} points cannot span a triangle", samples.len()),
            });
        }

        let triangulation =
            DelaunayTriangulation::<Sample>::bulk_load(samples).map_err(|e| {
                GridError::Triangulation {
                    message: format!("{e:?}"),
                }
            })?;
        if method.needs_faces() && triangulation.num_inner_faces() == 0 {
            return Err(GridError::Triangulation {
                message: "all points are collinear".to_string(),
            });
        }

        log::debug!(
            "Triangulated {} points into {} faces",
            triangulation.num_vertices(),
            triangulation.num_inner_faces()
        );
        Ok(Self {
            triangulation,
            method,
        })
    }

    /// Fills `weights` with `(table row, weight)` pairs for `(lon, lat)`.
    /// Leaves it empty outside the convex hull.
    fn weights_at(
        &self,
        lon: f64,
        lat: f64,
        handles: &mut Vec<(FixedVertexHandle, f64)>,
        weights: &mut Vec<(usize, f64)>,
    ) {
        handles.clear();
        weights.clear();
        let position = Point2::new(lon, lat);

        if matches!(
            self.triangulation.locate(position),
            PositionInTriangulation::OutsideOfConvexHull(_) | PositionInTriangulation::NoTriangulation
        ) {
            return;
        }

        match self.method {
            InterpolationMethod::Linear => {
                self.triangulation
                    .barycentric()
                    .get_weights(position, handles);
            }
            InterpolationMethod::Natural => {
                self.triangulation
                    .natural_neighbor()
                    .get_weights(position, handles);
            }
            InterpolationMethod::Nearest => {
                if let Some(vertex) = self.triangulation.nearest_neighbor(position) {
                    handles.push((vertex.fix(), 1.0));
                }
            }
        }

        weights.extend(
            handles
                .iter()
                .map(|&(handle, w)| (self.triangulation.vertex(handle).data().row, w)),
        );
    }

    /// Interpolated value of column `column` at `(lon, lat)`; `None`
    /// outside the convex hull or where a contributing point is missing.
    #[must_use]
    pub fn value_at(&self, table: &MetricTable, column: usize, lon: f64, lat: f64) -> Option<f64> {
        let mut handles = Vec::new();
        let mut weights = Vec::new();
        self.weights_at(lon, lat, &mut handles, &mut weights);
        blend(table, column, &weights)
    }
}

fn blend(table: &MetricTable, column: usize, weights: &[(usize, f64)]) -> Option<f64> {
    if weights.is_empty() {
        return None;
    }
    let value: f64 = weights
        .iter()
        .map(|&(row, w)| w * table.points()[row].values[column])
        .sum();
    value.is_finite().then_some(value)
}

/// Interpolates every metric column of `table` onto `grid`.
///
/// Variables are named after their source columns and take their metadata
/// from `metadata`; columns without an entry get empty metadata.
///
/// # Errors
///
/// Returns an error if the table cannot be triangulated.
pub fn interpolate_table(
    table: &MetricTable,
    grid: &RegularGrid,
    method: InterpolationMethod,
    metadata: &BTreeMap<String, VariableMetadata>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Raster, GridError> {
    let interpolator = ScatterInterpolator::new(table, method)?;
    let columns = table.columns().len();
    let mut grids: Vec<Vec<Option<f64>>> =
        (0..columns).map(|_| Vec::with_capacity(grid.len())).collect();

    let mut handles = Vec::new();
    let mut weights = Vec::new();
    progress.set_total(grid.ny as u64);
    progress.set_message(format!("Interpolating {columns} variables ({method})"));
    for j in 0..grid.ny {
        let lat = grid.lat(j);
        for i in 0..grid.nx {
            interpolator.weights_at(grid.lon(i), lat, &mut handles, &mut weights);
            for (col, values) in grids.iter_mut().enumerate() {
                values.push(blend(table, col, &weights));
            }
        }
        progress.inc(1);
    }
    progress.finish(format!("Interpolated {} cells", grid.len()));

    let variables = table
        .columns()
        .iter()
        .zip(grids)
        .map(|(name, values)| RasterVariable {
            name: name.clone(),
            metadata: metadata.get(name).cloned().unwrap_or_default(),
            values,
        })
        .collect();

    Ok(Raster {
        grid: *grid,
        variables,
    })
}

/// Interpolates the single column `name` onto `grid`.
///
/// # Errors
///
/// Returns [`GridError::UnknownColumn`] if the table has no such column,
/// or an error if the table cannot be triangulated.
pub fn interpolate_column(
    table: &MetricTable,
    name: &str,
    grid: &RegularGrid,
    method: InterpolationMethod,
) -> Result<RasterVariable, GridError> {
    let column = table
        .column_index(name)
        .ok_or_else(|| GridError::UnknownColumn {
            name: name.to_string(),
        })?;
    let interpolator = ScatterInterpolator::new(table, method)?;

    let mut values = Vec::with_capacity(grid.len());
    for j in 0..grid.ny {
        for i in 0..grid.nx {
            values.push(interpolator.value_at(table, column, grid.lon(i), grid.lat(j)));
        }
    }

    Ok(RasterVariable {
        name: name.to_string(),
        metadata: VariableMetadata::default(),
        values,
    })
}
