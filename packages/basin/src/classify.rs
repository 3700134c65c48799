//! Basin labeling of grid points and per-basin catalog subsets.
//!
//! Classification is a pure function of the points and the configuration:
//! it returns a [`BasinAssignment`] instead of writing labels into the
//! catalog, so running it for several basins cannot leave stale labels
//! behind. Overlapping regions are resolved by configuration order: the
//! first basin whose region contains a point claims it.

use std::collections::BTreeMap;
use std::sync::Arc;

use tc_hazard_basin_models::{BasinCode, PipelineConfig};
use tc_hazard_catalog::progress::ProgressCallback;
use tc_hazard_catalog::select::{drop_quiet_events, select_points};
use tc_hazard_catalog::{GridPoint, HazardCatalog};

use crate::BasinError;
use crate::geometry::BasinShape;

/// Compiled basin shapes in priority order.
#[derive(Debug, Clone)]
pub struct BasinClassifier {
    basins: Vec<(BasinCode, BasinShape)>,
}

impl BasinClassifier {
    /// Compiles every basin region of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`BasinError::InvalidRegion`] if a region cannot be compiled.
    pub fn new(config: &PipelineConfig) -> Result<Self, BasinError> {
        let basins = config
            .basins
            .iter()
            .map(|b| Ok((b.code.clone(), BasinShape::compile(&b.code, &b.region)?)))
            .collect::<Result<Vec<_>, BasinError>>()?;
        Ok(Self { basins })
    }

    /// Codes in priority order.
    pub fn codes(&self) -> impl Iterator<Item = &BasinCode> {
        self.basins.iter().map(|(code, _)| code)
    }

    /// The first basin containing `(lon, lat)`, if any.
    #[must_use]
    pub fn label(&self, lon: f64, lat: f64) -> Option<&BasinCode> {
        self.basins
            .iter()
            .find(|(_, shape)| shape.contains(lon, lat))
            .map(|(code, _)| code)
    }

    /// Labels every point.
    #[must_use]
    pub fn classify(&self, points: &[GridPoint]) -> BasinAssignment {
        let labels = points
            .iter()
            .map(|p| self.label(p.lon, p.lat).cloned())
            .collect();
        BasinAssignment {
            codes: self.codes().cloned().collect(),
            labels,
        }
    }
}

/// Basin label per catalog column, produced by [`BasinClassifier::classify`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasinAssignment {
    codes: Vec<BasinCode>,
    labels: Vec<Option<BasinCode>>,
}

impl BasinAssignment {
    /// Label of column `col`.
    #[must_use]
    pub fn label(&self, col: usize) -> Option<&BasinCode> {
        self.labels.get(col).and_then(Option::as_ref)
    }

    /// Columns labeled `code`, in ascending order.
    ///
    /// # Errors
    ///
    /// Returns [`BasinError::UnknownBasin`] if `code` was not part of the
    /// configuration this assignment was produced from.
    pub fn columns(&self, code: &BasinCode) -> Result<Vec<usize>, BasinError> {
        if !self.codes.contains(code) {
            return Err(BasinError::UnknownBasin { code: code.clone() });
        }
        Ok(self
            .labels
            .iter()
            .enumerate()
            .filter(|(_, label)| label.as_ref() == Some(code))
            .map(|(col, _)| col)
            .collect())
    }

    /// Number of points per basin, plus unlabeled points under `None`.
    #[must_use]
    pub fn counts(&self) -> BTreeMap<Option<BasinCode>, usize> {
        let mut counts = BTreeMap::new();
        for label in &self.labels {
            *counts.entry(label.clone()).or_insert(0) += 1;
        }
        counts
    }

    /// Copy of `points` with their basin labels set from this assignment.
    #[must_use]
    pub fn labeled_points(&self, points: &[GridPoint]) -> Vec<GridPoint> {
        points
            .iter()
            .enumerate()
            .map(|(col, p)| GridPoint {
                basin: self.label(col).cloned(),
                ..p.clone()
            })
            .collect()
    }
}

/// One basin's slice of a catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct BasinSubset {
    /// Basin the subset belongs to.
    pub code: BasinCode,
    /// Points labeled with `code` and the events active on them.
    pub catalog: HazardCatalog,
}

/// Restricts `catalog` to the points labeled `code` and the events with
/// any non-zero intensity on those points.
///
/// The returned points carry `code` as their basin label.
///
/// # Errors
///
/// Returns [`BasinError::UnknownBasin`] if `code` is not configured.
pub fn select_basin(
    catalog: &HazardCatalog,
    assignment: &BasinAssignment,
    code: &BasinCode,
) -> Result<HazardCatalog, BasinError> {
    let columns = assignment.columns(code)?;
    let mut subset = drop_quiet_events(select_points(catalog, &columns));
    for point in subset.points_mut() {
        point.basin = Some(code.clone());
    }

    log::info!(
        "Basin {code}: {} points, {} active events",
        subset.points().len(),
        subset.len()
    );
    Ok(subset)
}

/// Classifies `catalog` once and cuts it into one subset per configured
/// basin, in configuration order.
///
/// # Errors
///
/// Returns an error if the classifier cannot be built from `config`.
pub fn split_basins(
    catalog: &HazardCatalog,
    config: &PipelineConfig,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<BasinSubset>, BasinError> {
    let classifier = BasinClassifier::new(config)?;
    let assignment = classifier.classify(catalog.points());

    let unlabeled = assignment.counts().get(&None).copied().unwrap_or(0);
    if unlabeled > 0 {
        log::debug!("{unlabeled} points fall outside every basin");
    }

    progress.set_total(config.basins.len() as u64);
    let mut subsets = Vec::with_capacity(config.basins.len());
    for code in classifier.codes() {
        progress.set_message(format!("Splitting basin {code}"));
        subsets.push(BasinSubset {
            code: code.clone(),
            catalog: select_basin(catalog, &assignment, code)?,
        });
        progress.inc(1);
    }
    progress.finish(format!("Split {} basins", subsets.len()));

    Ok(subsets)
}
