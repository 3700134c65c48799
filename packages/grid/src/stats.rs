//! Shaping the inputs and outputs of the external statistics engine.
//!
//! The engine turns a catalog into per-point exceedance intensities or
//! return periods. This module cuts the catalog to a tile extent, hands it
//! over, and names the returned values as a [`MetricTable`].

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tc_hazard_catalog::select::{Extent, select_extent};
use tc_hazard_catalog::{CollaboratorError, HazardCatalog};
use tc_hazard_grid_models::{MetricTable, ScatteredMetricPoint};

use crate::GridError;
use crate::metadata::{MetricFamily, metric_column_name};

/// Return periods of the standard exceedance-intensity maps, in years.
pub const DEFAULT_RETURN_PERIODS: [f64; 6] = [10.0, 25.0, 50.0, 100.0, 250.0, 1000.0];

/// Wind speed thresholds of the standard return-period maps, in m/s.
pub const DEFAULT_THRESHOLDS: [f64; 2] = [33.0, 50.0];

/// How the engine treats values beyond the simulated range. Passed through
/// untouched.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Extrapolation {
    /// Interpolate inside the range, missing outside.
    Interpolate,
    /// Extrapolate the fitted curve.
    Extrapolate,
    /// Hold the edge value constant beyond the range.
    #[default]
    ExtrapolateConstant,
    /// Piecewise-constant curve.
    #[strum(serialize = "stepfunction")]
    #[serde(rename = "stepfunction")]
    StepFunction,
}

/// What to ask the engine for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsRequest {
    /// Statistic to compute.
    pub family: MetricFamily,
    /// Return periods (years) or thresholds (m/s).
    pub values: Vec<f64>,
    /// Extrapolation method.
    pub method: Extrapolation,
}

impl StatisticsRequest {
    /// Exceedance intensity at the standard return periods.
    #[must_use]
    pub fn exceedance_intensity() -> Self {
        Self {
            family: MetricFamily::ExceedanceIntensity,
            values: DEFAULT_RETURN_PERIODS.to_vec(),
            method: Extrapolation::default(),
        }
    }

    /// Return periods at the standard thresholds.
    #[must_use]
    pub fn return_periods() -> Self {
        Self {
            family: MetricFamily::ReturnPeriods,
            values: DEFAULT_THRESHOLDS.to_vec(),
            method: Extrapolation::default(),
        }
    }

    /// Output column names, one per requested value.
    #[must_use]
    pub fn column_names(&self) -> Vec<String> {
        self.values
            .iter()
            .map(|&v| metric_column_name(self.family.prefix(), v))
            .collect()
    }
}

/// External engine computing local hazard statistics.
///
/// Both methods return one row per catalog point, in point order, with one
/// value per requested return period or threshold.
pub trait StatisticsEngine {
    /// Wind speed exceeded once per each return period.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation fails.
    fn exceedance_intensity(
        &self,
        catalog: &HazardCatalog,
        return_periods: &[f64],
        method: Extrapolation,
    ) -> Result<Vec<Vec<f64>>, CollaboratorError>;

    /// Return period of each threshold intensity.
    ///
    /// # Errors
    ///
    /// Returns an error if the computation fails.
    fn return_periods(
        &self,
        catalog: &HazardCatalog,
        thresholds: &[f64],
        method: Extrapolation,
    ) -> Result<Vec<Vec<f64>>, CollaboratorError>;
}

/// Runs `engine` on the points of `catalog` inside `extent` (or on all
/// points) and returns the result as a named metric table.
///
/// This is the integration point for an external statistics engine: the
/// pipeline writes the returned table as one tile, which `combine-tiles`
/// later merges. No engine ships with this crate.
///
/// # Errors
///
/// Returns [`GridError::Engine`] if the engine fails and
/// [`GridError::EngineShape`] if it returns the wrong number of rows or
/// values.
pub fn compute_tile<E: StatisticsEngine + ?Sized>(
    engine: &E,
    catalog: &HazardCatalog,
    extent: Option<&Extent>,
    request: &StatisticsRequest,
) -> Result<MetricTable, GridError> {
    let tile = extent.map_or(Cow::Borrowed(catalog), |e| {
        Cow::Owned(select_extent(catalog, e))
    });

    let rows = match request.family {
        MetricFamily::ExceedanceIntensity => {
            engine.exceedance_intensity(&tile, &request.values, request.method)
        }
        MetricFamily::ReturnPeriods => engine.return_periods(&tile, &request.values, request.method),
    }
    .map_err(GridError::Engine)?;

    if rows.len() != tile.points().len() {
        return Err(GridError::EngineShape {
            message: format!("{} rows for {} points", rows.len(), tile.points().len()),
        });
    }

    let mut table = MetricTable::new(request.column_names());
    for (point, values) in tile.points().iter().zip(rows) {
        if values.len() != request.values.len() {
            return Err(GridError::EngineShape {
                message: format!(
                    "{} values for {} requested {}",
                    values.len(),
                    request.values.len(),
                    request.family
                ),
            });
        }
        table.push(ScatteredMetricPoint {
            lat: point.lat,
            lon: point.lon,
            values,
        })?;
    }

    log::info!(
        "Computed {} for {} points ({} columns)",
        request.family,
        table.len(),
        table.columns().len()
    );
    Ok(table)
}
