#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Consolidation of corrected basin subsets into one global catalog.
//!
//! Every event is renamed `{model}_{category}_ev{i}_{basin}` and ordered
//! by `(basin, i)`, where `i` counts the events of the basin subset
//! contiguously from zero. The subsets are then merged in configuration
//! order; frequencies are concatenated as they are, without
//! renormalization.

use tc_hazard_basin::{BasinCode, BasinSubset, PipelineConfig};
use tc_hazard_catalog::concat::merge;
use tc_hazard_catalog::{CatalogError, EventOrder, HazardCatalog};

/// Errors that can occur while consolidating basin subsets.
#[derive(Debug, thiserror::Error)]
pub enum ConsolidateError {
    /// A subset's basin has no configured ordering offset.
    #[error("Unknown basin code: {code}")]
    UnknownBasin {
        /// The unknown code.
        code: BasinCode,
    },

    /// A subset has more events than fit between two ordering offsets.
    #[error("Basin {basin} has {events} events, more than the offset stride {stride}")]
    SequenceOverflow {
        /// Basin whose subset is too large.
        basin: BasinCode,
        /// Number of events in the subset.
        events: usize,
        /// Configured offset stride.
        stride: u64,
    },

    /// Merging the subsets failed.
    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Identifier of the `local_index`-th event of a basin subset.
#[must_use]
pub fn event_id(model: &str, category: &str, local_index: usize, basin: &BasinCode) -> String {
    format!("{model}_{category}_ev{local_index}_{basin}")
}

/// Renames and orders the events of one subset in place.
///
/// # Errors
///
/// Returns [`ConsolidateError::UnknownBasin`] if the subset's basin is not
/// configured and [`ConsolidateError::SequenceOverflow`] if its events
/// would spill into the next basin's ordering range.
pub fn label_events(
    subset: &mut BasinSubset,
    model: &str,
    category: &str,
    config: &PipelineConfig,
) -> Result<(), ConsolidateError> {
    let offset = config
        .basin(&subset.code)
        .ok_or_else(|| ConsolidateError::UnknownBasin {
            code: subset.code.clone(),
        })?
        .ordering_offset;

    let events = subset.catalog.len();
    if events as u64 > config.offset_stride {
        return Err(ConsolidateError::SequenceOverflow {
            basin: subset.code.clone(),
            events,
            stride: config.offset_stride,
        });
    }

    for (i, event) in subset.catalog.events_mut().iter_mut().enumerate() {
        let id = event_id(model, category, i, &subset.code);
        event.name.clone_from(&id);
        event.event_id = id;
        event.order = EventOrder::in_basin(subset.code.clone(), offset, i as u64);
    }
    Ok(())
}

/// Labels every subset and merges them into one global catalog, in the
/// order given.
///
/// The subsets are consumed; each one is released as soon as the merged
/// catalog exists.
///
/// # Errors
///
/// Returns an error if a subset cannot be labeled or the merge fails.
pub fn consolidate(
    model: &str,
    category: &str,
    subsets: Vec<BasinSubset>,
    config: &PipelineConfig,
) -> Result<HazardCatalog, ConsolidateError> {
    let mut catalogs = Vec::with_capacity(subsets.len());
    for mut subset in subsets {
        label_events(&mut subset, model, category, config)?;
        log::debug!("Basin {}: {} events labeled", subset.code, subset.catalog.len());
        catalogs.push(subset.catalog);
    }

    let merged = merge(&catalogs)?;
    drop(catalogs);

    log::info!(
        "Consolidated {model} {category}: {} events over {} points",
        merged.len(),
        merged.points().len()
    );
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::*;
    use approx::assert_relative_eq;
    use tc_hazard_basin::config::default_config;
    use tc_hazard_basin::split_basins;
    use tc_hazard_catalog::progress::null_progress;
    use tc_hazard_catalog::{EventRecord, GridPoint, IntensityMatrix};
    use tc_hazard_frequency::correct_baseline;

    fn subset(code: &str, lat: f64, lon: f64, events: usize, frequency: f64) -> BasinSubset {
        let rows: Vec<Vec<(usize, f64)>> = (0..events).map(|_| vec![(0, 30.0)]).collect();
        let events = (0..events)
            .map(|i| EventRecord::raw(format!("raw{i}"), i as u64, frequency))
            .collect();
        BasinSubset {
            code: BasinCode::new(code),
            catalog: HazardCatalog::new(
                events,
                vec![GridPoint::new(lat, lon, 0)],
                IntensityMatrix::from_rows(1, &rows),
            )
            .unwrap(),
        }
    }

    #[test]
    fn event_ids_follow_the_naming_scheme() {
        assert_eq!(
            event_id("GFDL", "CRH", 7, &BasinCode::new("NA")),
            "GFDL_CRH_ev7_NA"
        );
    }

    #[test]
    fn merged_subsets_get_disjoint_ordering_ranges() {
        let subsets = vec![
            subset("EP", 15.0, -120.0, 10, 0.1),
            subset("NA", 25.0, -60.0, 8, 0.2),
            subset("NI", 15.0, 88.0, 2, 0.3),
        ];

        let merged = consolidate("MIROC6", "SD", subsets, &default_config()).unwrap();

        assert_eq!(merged.len(), 20);
        assert_eq!(merged.points().len(), 3);
        let keys: Vec<u64> = merged.events().iter().map(|e| e.order.ordering_key()).collect();
        assert!(keys[..10].iter().copied().eq(0..10));
        assert!(keys[10..18].iter().copied().eq(100_000..100_008));
        assert!(keys[18..].iter().copied().eq(200_000..200_002));

        let ids: BTreeSet<&str> = merged.events().iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids.len(), 20);
        assert_eq!(merged.events()[10].event_id, "MIROC6_SD_ev0_NA");
        assert_eq!(merged.events()[19].name, "MIROC6_SD_ev1_NI");
    }

    #[test]
    fn frequencies_are_concatenated_unchanged() {
        let subsets = vec![
            subset("EP", 15.0, -120.0, 2, 0.5),
            subset("WP", 20.0, 140.0, 3, 0.25),
        ];
        let merged = consolidate("CESM2", "CRH", subsets, &default_config()).unwrap();
        assert_eq!(merged.frequencies(), vec![0.5, 0.5, 0.25, 0.25, 0.25]);
        assert_relative_eq!(merged.frequencies().iter().sum::<f64>(), 1.75);
    }

    #[test]
    fn intensity_rows_stay_on_their_basin_points() {
        let subsets = vec![
            subset("EP", 15.0, -120.0, 1, 0.5),
            subset("NA", 25.0, -60.0, 1, 0.5),
        ];
        let merged = consolidate("M", "C", subsets, &default_config()).unwrap();
        assert_relative_eq!(merged.intensity().get(0, 0), 30.0);
        assert_relative_eq!(merged.intensity().get(0, 1), 0.0);
        assert_relative_eq!(merged.intensity().get(1, 1), 30.0);
    }

    #[test]
    fn unknown_basin_is_rejected() {
        let err = consolidate(
            "M",
            "C",
            vec![subset("XX", 0.0, 0.0, 1, 0.1)],
            &default_config(),
        )
        .unwrap_err();
        assert!(matches!(err, ConsolidateError::UnknownBasin { .. }));
    }

    #[test]
    fn oversized_subset_is_rejected() {
        let mut config = default_config();
        config.offset_stride = 4;
        let err = consolidate("M", "C", vec![subset("EP", 15.0, -120.0, 5, 0.1)], &config)
            .unwrap_err();
        assert!(matches!(
            err,
            ConsolidateError::SequenceOverflow { events: 5, .. }
        ));
    }

    #[test]
    fn classify_correct_and_consolidate_a_raw_catalog() {
        let mut config = default_config();
        config.basins.truncate(3);

        // Points in EP, NA, NI, and one outside every basin.
        let points = vec![
            GridPoint::new(15.0, -120.0, 0),
            GridPoint::new(25.0, -60.0, 1),
            GridPoint::new(15.0, 88.0, 2),
            GridPoint::new(-20.0, -30.0, 3),
        ];
        let mut rows: Vec<Vec<(usize, f64)>> = Vec::new();
        rows.extend((0..29).map(|_| vec![(0, 35.0)]));
        rows.extend((0..12).map(|_| vec![(1, 28.0), (3, 19.0)]));
        rows.extend((0..4).map(|_| vec![(2, 40.0)]));
        rows.push(vec![(3, 50.0)]);
        let events = (0..rows.len())
            .map(|i| EventRecord::raw(format!("raw{i}"), i as u64, 0.0))
            .collect();
        let raw = HazardCatalog::new(events, points, IntensityMatrix::from_rows(4, &rows))
            .unwrap();

        let mut subsets = split_basins(&raw, &config, &null_progress()).unwrap();
        drop(raw);
        let baseline = correct_baseline(&mut subsets, &config).unwrap();
        assert_relative_eq!(baseline.get(&BasinCode::new("EP")).unwrap(), 0.5);
        assert_relative_eq!(baseline.get(&BasinCode::new("NA")).unwrap(), 0.9, epsilon = 1e-12);
        assert_relative_eq!(baseline.get(&BasinCode::new("NI")).unwrap(), 0.5);

        let global = consolidate("IPSL", "CRH", subsets, &config).unwrap();

        assert_eq!(global.len(), 45);
        assert_eq!(global.points().len(), 3);
        assert_eq!(global.events()[0].event_id, "IPSL_CRH_ev0_EP");
        assert_eq!(global.events()[29].event_id, "IPSL_CRH_ev0_NA");
        assert_eq!(global.events()[29].order.ordering_key(), 100_000);
        assert_eq!(global.events()[44].order.ordering_key(), 200_003);
        assert_relative_eq!(
            global.frequencies().iter().sum::<f64>(),
            14.5 + 10.8 + 2.0,
            epsilon = 1e-9
        );
    }
}
