//! Base frequency computation and assignment.

use tc_hazard_basin::{BasinCode, BasinSubset, PipelineConfig};
use tc_hazard_catalog::HazardCatalog;
use tc_hazard_catalog::naming::Period;

use crate::{FrequencyBaseline, FrequencyError};

/// Number of events with at least one non-zero intensity value.
#[must_use]
pub fn count_tracks(catalog: &HazardCatalog) -> usize {
    (0..catalog.len())
        .filter(|&row| catalog.intensity().row_has_nonzero(row))
        .count()
}

/// Per-event annual rate for a basin with `num_tracks` simulated tracks
/// over `total_years`, given an observed annual storm count.
///
/// The simulated rate is `num_tracks / total_years` and the base frequency
/// is `(observed / simulated) / total_years`. `total_years` cancels, so the
/// result is `observed / num_tracks`, which is what is returned.
///
/// # Errors
///
/// Returns [`FrequencyError::NoTracks`] when `num_tracks` is zero and
/// [`FrequencyError::NonFinite`] if the result is not a finite,
/// non-negative number.
pub fn base_frequency(
    basin: &BasinCode,
    observed_frequency: f64,
    num_tracks: usize,
    total_years: f64,
) -> Result<f64, FrequencyError> {
    if num_tracks == 0 {
        return Err(FrequencyError::NoTracks {
            basin: basin.clone(),
        });
    }

    #[allow(clippy::cast_precision_loss)]
    let tracks = num_tracks as f64;
    let value = observed_frequency / tracks;
    if !(value.is_finite() && value >= 0.0) {
        return Err(FrequencyError::NonFinite {
            basin: basin.clone(),
            value,
        });
    }

    let simulated = tracks / total_years;
    log::debug!(
        "Basin {basin}: {num_tracks} tracks over {total_years} years, simulated {simulated:.4}/yr, observed {observed_frequency}/yr"
    );
    Ok(value)
}

/// Sets every event's frequency in `catalog` to `frequency`.
///
/// # Errors
///
/// Returns [`FrequencyError::NonFinite`] for a NaN, infinite, or negative
/// value; the catalog is left untouched in that case.
pub fn assign_frequency(
    basin: &BasinCode,
    catalog: &mut HazardCatalog,
    frequency: f64,
) -> Result<(), FrequencyError> {
    if !(frequency.is_finite() && frequency >= 0.0) {
        return Err(FrequencyError::NonFinite {
            basin: basin.clone(),
            value: frequency,
        });
    }
    for event in catalog.events_mut() {
        event.frequency = frequency;
    }
    Ok(())
}

/// Computes the base frequency of every subset, assigns it, and records
/// it in a new [`FrequencyBaseline`].
///
/// # Errors
///
/// Returns [`FrequencyError::UnknownBasin`] for a subset whose basin is not
/// configured and [`FrequencyError::NoTracks`] for a subset without tracks.
pub fn correct_baseline(
    subsets: &mut [BasinSubset],
    config: &PipelineConfig,
) -> Result<FrequencyBaseline, FrequencyError> {
    let total_years = config.total_years();
    let mut entries = Vec::with_capacity(subsets.len());

    for subset in subsets.iter_mut() {
        let definition = config
            .basin(&subset.code)
            .ok_or_else(|| FrequencyError::UnknownBasin {
                code: subset.code.clone(),
            })?;
        let num_tracks = count_tracks(&subset.catalog);
        let value = base_frequency(
            &subset.code,
            definition.observed_frequency,
            num_tracks,
            total_years,
        )?;
        assign_frequency(&subset.code, &mut subset.catalog, value)?;
        log::info!(
            "Basin {}: {num_tracks} tracks, base frequency {value:.6}",
            subset.code
        );
        entries.push((subset.code.clone(), value));
    }

    FrequencyBaseline::from_entries(entries)
}

/// Assigns the recorded base frequency to every subset without
/// recomputing it.
///
/// # Errors
///
/// Returns [`FrequencyError::UnknownBasin`] for a subset whose basin has no
/// recorded value.
pub fn correct_with_baseline(
    subsets: &mut [BasinSubset],
    baseline: &FrequencyBaseline,
) -> Result<(), FrequencyError> {
    for subset in subsets.iter_mut() {
        let value = baseline
            .get(&subset.code)
            .ok_or_else(|| FrequencyError::UnknownBasin {
                code: subset.code.clone(),
            })?;
        assign_frequency(&subset.code, &mut subset.catalog, value)?;
        log::info!(
            "Basin {}: {} events, reused base frequency {value:.6}",
            subset.code,
            subset.catalog.len()
        );
    }
    Ok(())
}

/// Corrects the subsets of one period.
///
/// The baseline period computes and returns a fresh baseline; any other
/// period requires `baseline` and returns it unchanged.
///
/// # Errors
///
/// Returns [`FrequencyError::MissingBaseline`] for a non-baseline period
/// without a baseline, plus any error of [`correct_baseline`] or
/// [`correct_with_baseline`].
pub fn correct_period(
    period: Period,
    subsets: &mut [BasinSubset],
    config: &PipelineConfig,
    baseline: Option<&FrequencyBaseline>,
) -> Result<FrequencyBaseline, FrequencyError> {
    if period.is_baseline() {
        if baseline.is_some() {
            log::warn!("Ignoring supplied baseline: period {period} computes its own");
        }
        return correct_baseline(subsets, config);
    }

    let baseline = baseline.ok_or(FrequencyError::MissingBaseline { period })?;
    correct_with_baseline(subsets, baseline)?;
    Ok(baseline.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use tc_hazard_basin::config::default_config;
    use tc_hazard_catalog::{EventRecord, GridPoint, IntensityMatrix};

    /// A subset with `active` events hitting point 0 and `quiet` events
    /// with an all-zero row.
    fn subset(code: &str, active: usize, quiet: usize) -> BasinSubset {
        let mut rows: Vec<Vec<(usize, f64)>> = (0..active).map(|_| vec![(0, 33.0)]).collect();
        rows.extend((0..quiet).map(|_| Vec::new()));
        let events = (0..rows.len())
            .map(|i| EventRecord::raw(format!("ev{i}"), i as u64, 0.0))
            .collect();
        let points = vec![GridPoint::new(15.0, -120.0, 0)];
        BasinSubset {
            code: BasinCode::new(code),
            catalog: HazardCatalog::new(events, points, IntensityMatrix::from_rows(1, &rows))
                .unwrap(),
        }
    }

    #[test]
    fn counts_only_events_with_intensity() {
        assert_eq!(count_tracks(&subset("EP", 4, 3).catalog), 4);
    }

    #[test]
    fn base_frequency_is_independent_of_total_years() {
        let ep = BasinCode::new("EP");
        for total_years in [1.0, 20.0, 1600.0, 123_456.0] {
            let value = base_frequency(&ep, 14.5, 29, total_years).unwrap();
            assert_relative_eq!(value, 0.5);
            let long_form = (14.5 / (29.0 / total_years)) / total_years;
            assert_relative_eq!(value, long_form, max_relative = 1e-12);
            assert_relative_eq!(value * 29.0, 14.5);
        }
    }

    #[test]
    fn zero_tracks_is_an_error() {
        let err = base_frequency(&BasinCode::new("NI"), 2.0, 0, 1600.0).unwrap_err();
        assert!(matches!(err, FrequencyError::NoTracks { .. }));
    }

    #[test]
    fn baseline_assigns_one_rate_to_every_event() {
        let config = default_config();
        let mut subsets = vec![subset("EP", 29, 0)];
        let baseline = correct_baseline(&mut subsets, &config).unwrap();

        assert_relative_eq!(baseline.get(&BasinCode::new("EP")).unwrap(), 0.5);
        assert_eq!(subsets[0].catalog.len(), 29);
        assert!(subsets[0].catalog.frequencies().iter().all(|&f| f == 0.5));
    }

    #[test]
    fn baseline_fails_for_an_empty_basin_without_writing_nan() {
        let config = default_config();
        let mut subsets = vec![subset("EP", 29, 0), subset("NI", 0, 2)];
        let err = correct_baseline(&mut subsets, &config).unwrap_err();
        assert!(matches!(err, FrequencyError::NoTracks { ref basin } if basin.as_str() == "NI"));
        assert!(subsets[1].catalog.frequencies().iter().all(|f| f.is_finite()));
    }

    #[test]
    fn future_periods_reuse_the_baseline_rate() {
        let config = default_config();
        let mut base = vec![subset("EP", 29, 0), subset("NA", 12, 1)];
        let baseline = correct_period(Period::Base, &mut base, &config, None).unwrap();

        let mut future = vec![subset("EP", 40, 0), subset("NA", 3, 0)];
        let reused = correct_period(Period::Fut1, &mut future, &config, Some(&baseline)).unwrap();

        assert_eq!(reused, baseline);
        assert!(future[0].catalog.frequencies().iter().all(|&f| f == 0.5));
        assert_relative_eq!(future[1].catalog.frequencies()[0], 10.8 / 12.0);
    }

    #[test]
    fn future_period_without_baseline_is_rejected() {
        let config = default_config();
        let mut subsets = vec![subset("EP", 1, 0)];
        let err = correct_period(Period::Fut2, &mut subsets, &config, None).unwrap_err();
        assert!(matches!(
            err,
            FrequencyError::MissingBaseline {
                period: Period::Fut2
            }
        ));
    }

    #[test]
    fn basin_missing_from_baseline_is_rejected() {
        let baseline = FrequencyBaseline::from_entries([(BasinCode::new("EP"), 0.5)]).unwrap();
        let mut subsets = vec![subset("WP", 3, 0)];
        let err = correct_with_baseline(&mut subsets, &baseline).unwrap_err();
        assert!(matches!(err, FrequencyError::UnknownBasin { .. }));
    }

    #[test]
    fn unconfigured_basin_is_rejected() {
        let mut subsets = vec![subset("XX", 3, 0)];
        let err = correct_baseline(&mut subsets, &default_config()).unwrap_err();
        assert!(matches!(err, FrequencyError::UnknownBasin { .. }));
    }
}
