//! Concatenation of catalogs from independent runs.
//!
//! Used both to stitch simulation shards (which cover different point
//! subsets) and to stack the catalogs of several climate models into one
//! combined catalog over the same grid.

use std::collections::{HashMap, HashSet};

use tc_hazard_catalog_models::{EventOrder, GridPoint, HazardCatalog, IntensityMatrix};

use crate::CatalogError;

/// Exact coordinate key. `+ 0.0` folds `-0.0` into `0.0`.
fn coord_key(point: &GridPoint) -> (u64, u64) {
    ((point.lat + 0.0).to_bits(), (point.lon + 0.0).to_bits())
}

/// Merges catalogs, stacking their events in input order.
///
/// The point set of the result is the union of the inputs' point sets,
/// matched by exact coordinates and kept in first-seen order. Points that
/// repeat within one input collapse into one column holding the larger
/// intensity. Events are kept as they are, including their ordering and
/// frequency.
///
/// # Errors
///
/// Returns an error if a remapped intensity matrix cannot be stacked,
/// which only happens if an input catalog is internally inconsistent.
pub fn merge(catalogs: &[HazardCatalog]) -> Result<HazardCatalog, CatalogError> {
    let mut points: Vec<GridPoint> = Vec::new();
    let mut lookup: HashMap<(u64, u64), usize> = HashMap::new();
    let mut remaps: Vec<Vec<usize>> = Vec::with_capacity(catalogs.len());

    for catalog in catalogs {
        let remap = catalog
            .points()
            .iter()
            .map(|p| {
                *lookup.entry(coord_key(p)).or_insert_with(|| {
                    let index = points.len();
                    points.push(GridPoint {
                        index,
                        ..p.clone()
                    });
                    index
                })
            })
            .collect::<Vec<usize>>();
        let distinct: HashSet<usize> = remap.iter().copied().collect();
        if distinct.len() < remap.len() {
            log::warn!(
                "{} duplicate points in one input; their intensities are merged by maximum",
                remap.len() - distinct.len()
            );
        }
        remaps.push(remap);
    }

    let cols = points.len();
    let mut blocks = Vec::with_capacity(catalogs.len());
    for (catalog, remap) in catalogs.iter().zip(&remaps) {
        let rows: Vec<Vec<(usize, f64)>> = (0..catalog.len())
            .map(|row| {
                catalog
                    .intensity()
                    .valid_row(row)
                    .map(|(col, value)| (remap[col], value))
                    .collect()
            })
            .collect();
        blocks.push(IntensityMatrix::from_rows(cols, &rows));
    }

    let refs: Vec<&IntensityMatrix> = blocks.iter().collect();
    let intensity = if refs.is_empty() {
        IntensityMatrix::zeros(0, cols)
    } else {
        IntensityMatrix::vstack(&refs)?
    };

    let events = catalogs
        .iter()
        .flat_map(|c| c.events().iter().cloned())
        .collect();

    log::info!(
        "Merged {} catalogs into {} events over {cols} points",
        catalogs.len(),
        intensity.rows()
    );

    Ok(HazardCatalog::new(events, points, intensity)?)
}

/// Concatenates catalogs of independent runs, as [`merge`] does, and
/// renumbers the raw event ordering `0..n` across the whole result.
///
/// Event identifiers and frequencies are kept.
///
/// # Errors
///
/// Returns an error if the catalogs cannot be merged.
pub fn concat(catalogs: &[HazardCatalog]) -> Result<HazardCatalog, CatalogError> {
    let mut merged = merge(catalogs)?;
    for (i, event) in merged.events_mut().iter_mut().enumerate() {
        event.order = EventOrder::raw(i as u64);
    }
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_hazard_catalog_models::EventRecord;

    fn catalog(prefix: &str, coords: &[(f64, f64)], rows: &[Vec<(usize, f64)>]) -> HazardCatalog {
        let points = coords
            .iter()
            .enumerate()
            .map(|(i, (lat, lon))| GridPoint::new(*lat, *lon, i))
            .collect();
        let events = (0..rows.len())
            .map(|i| EventRecord::raw(format!("{prefix}{i}"), i as u64, 0.1))
            .collect();
        HazardCatalog::new(events, points, IntensityMatrix::from_rows(coords.len(), rows)).unwrap()
    }

    #[test]
    fn stacks_models_over_the_same_grid() {
        let grid = [(10.0, 100.0), (11.0, 100.0)];
        let a = catalog("a", &grid, &[vec![(0, 30.0)]]);
        let b = catalog("b", &grid, &[vec![(1, 40.0)], vec![(0, 20.0)]]);

        let merged = concat(&[a, b]).unwrap();
        assert_eq!(merged.points().len(), 2);
        assert_eq!(merged.len(), 3);
        assert!((merged.intensity().get(1, 1) - 40.0).abs() < f64::EPSILON);
        let order: Vec<u64> = merged.events().iter().map(|e| e.order.ordering_key()).collect();
        assert_eq!(order, vec![0, 1, 2]);
    }

    #[test]
    fn unions_disjoint_shard_grids() {
        let a = catalog("a", &[(10.0, 100.0)], &[vec![(0, 30.0)]]);
        let b = catalog("b", &[(-0.0, 5.0), (10.0, 100.0)], &[vec![(0, 12.0), (1, 33.0)]]);

        let merged = concat(&[a, b]).unwrap();
        assert_eq!(merged.points().len(), 2);
        assert_eq!(merged.points()[1].index, 1);
        assert!((merged.intensity().get(1, 0) - 33.0).abs() < f64::EPSILON);
        assert!((merged.intensity().get(1, 1) - 12.0).abs() < f64::EPSILON);
    }

    #[test]
    fn merge_keeps_basin_ordering() {
        let mut a = catalog("a", &[(10.0, 100.0)], &[vec![(0, 30.0)]]);
        a.events_mut()[0].order = EventOrder::in_basin("WP".into(), 500_000, 0);
        let b = catalog("b", &[(10.0, -120.0)], &[vec![(0, 25.0)]]);

        let merged = merge(&[a, b]).unwrap();
        let keys: Vec<u64> = merged.events().iter().map(|e| e.order.ordering_key()).collect();
        assert_eq!(keys, vec![500_000, 0]);
        assert!((merged.intensity().get(0, 0) - 30.0).abs() < f64::EPSILON);
        assert!(merged.intensity().get(0, 1).abs() < f64::EPSILON);
        assert!((merged.intensity().get(1, 1) - 25.0).abs() < f64::EPSILON);
    }

    #[test]
    fn repeated_points_in_one_input_share_a_column() {
        let a = catalog(
            "a",
            &[(10.0, 100.0), (10.0, 100.0), (11.0, 100.0)],
            &[vec![(0, 30.0), (1, 45.0), (2, 10.0)]],
        );

        let merged = concat(&[a]).unwrap();
        assert_eq!(merged.points().len(), 2);
        assert_eq!(merged.intensity().nnz(), 2);
        assert!((merged.intensity().get(0, 0) - 45.0).abs() < f64::EPSILON);
        assert!((merged.intensity().get(0, 1) - 10.0).abs() < f64::EPSILON);
    }

    #[test]
    fn concat_of_nothing_is_empty() {
        let merged = concat(&[]).unwrap();
        assert!(merged.is_empty());
        assert!(merged.points().is_empty());
    }
}
