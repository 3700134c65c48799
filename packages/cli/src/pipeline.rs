//! Catalog stages: frequency correction of a whole model run, stacking the
//! corrected catalogs of several models, and repair of stored catalogs.
//!
//! For every period the raw regional catalogs are loaded, repaired, and
//! stitched into one global catalog, which is then split into basins,
//! frequency-corrected, written per basin, and consolidated into a global
//! catalog. The baseline period fixes the per-basin frequencies that the
//! future periods reuse.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use tc_hazard_basin::{BasinCode, PipelineConfig, split_basins};
use tc_hazard_catalog::HazardCatalog;
use tc_hazard_catalog::concat::concat;
use tc_hazard_catalog::naming::{HazardFileName, Period, Region};
use tc_hazard_catalog::progress::ProgressCallback;
use tc_hazard_catalog::repair::repair;
use tc_hazard_catalog::select::{Extent, select_extent};
use tc_hazard_catalog::store::{HazardStore, MessagePackStore};
use tc_hazard_cli_utils::{IndicatifProgress, MultiProgress, Stage};
use tc_hazard_consolidate::consolidate;
use tc_hazard_frequency::{FrequencyBaseline, correct_period};

/// Catalog file extension.
const CATALOG_SUFFIX: &str = ".msgpack";

/// Periods of a present-climate (reanalysis-driven) run: the baseline only,
/// with no future scaling.
pub const PRESENT_CLIMATE: &[Period] = &[Period::Base];

/// One `correct` invocation.
pub struct CorrectJob<'a> {
    /// Run name; region and period are replaced per file.
    pub name: HazardFileName,
    /// Directory holding the raw regional catalogs.
    pub input_dir: &'a Path,
    /// Directory for per-basin, global, and baseline outputs.
    pub output_dir: &'a Path,
    /// Simulation regions making up the raw global catalog.
    pub input_regions: &'a [String],
    /// Periods in processing order.
    pub periods: &'a [Period],
}

impl CorrectJob<'_> {
    fn input_path(&self, period: Period, region: &str) -> PathBuf {
        let name = self
            .name
            .with_period(period)
            .with_region(Region::Basin(BasinCode::new(region)));
        self.input_dir.join(name.file(CATALOG_SUFFIX))
    }

    fn output_path(&self, period: Period, region: Region) -> PathBuf {
        let name = self.name.with_period(period).with_region(region);
        self.output_dir.join(name.file(CATALOG_SUFFIX))
    }

    fn baseline_path(&self) -> PathBuf {
        let name = self
            .name
            .with_period(Period::Base)
            .with_region(Region::Global);
        self.output_dir
            .join(name.file("_frequency_baseline.json"))
    }
}

/// Loads, repairs, and stitches the raw regional catalogs of one period.
fn load_raw(
    job: &CorrectJob<'_>,
    period: Period,
    store: &impl HazardStore,
) -> Result<HazardCatalog, Box<dyn std::error::Error>> {
    let mut regional = Vec::with_capacity(job.input_regions.len());
    for region in job.input_regions {
        let path = job.input_path(period, region);
        let mut catalog = store.load(&path)?;
        repair(&mut catalog, &path.display().to_string());
        regional.push(catalog);
    }
    let raw = concat(&regional)?;
    drop(regional);
    Ok(raw)
}

/// Runs every period of `job` and returns the baseline used.
///
/// `baseline` is required when the job has no base period.
///
/// # Errors
///
/// Returns an error if a catalog cannot be loaded or saved, or any stage
/// fails.
pub fn correct_run(
    job: &CorrectJob<'_>,
    config: &PipelineConfig,
    mut baseline: Option<FrequencyBaseline>,
    store: &impl HazardStore,
    period_progress: &Arc<dyn ProgressCallback>,
    basin_progress: &Arc<dyn ProgressCallback>,
) -> Result<FrequencyBaseline, Box<dyn std::error::Error>> {
    period_progress.set_total(job.periods.len() as u64);

    for &period in job.periods {
        period_progress.set_message(format!("Correcting {period}"));
        let start = Instant::now();

        let raw = load_raw(job, period, store)?;
        let mut subsets = split_basins(&raw, config, basin_progress)?;
        drop(raw);

        let used = correct_period(period, &mut subsets, config, baseline.as_ref())?;
        if period.is_baseline() {
            used.save(&job.baseline_path())?;
        }
        baseline = Some(used);

        for subset in &subsets {
            store.save(
                &subset.catalog,
                &job.output_path(period, Region::Basin(subset.code.clone())),
            )?;
        }

        let global = consolidate(&job.name.model, &job.name.category, subsets, config)?;
        store.save(&global, &job.output_path(period, Region::Global))?;
        drop(global);

        log::info!(
            "Period {period} done in {:.1}s",
            start.elapsed().as_secs_f64()
        );
        period_progress.inc(1);
    }

    period_progress.finish(format!("Corrected {} periods", job.periods.len()));
    baseline.ok_or_else(|| "no period was processed".into())
}

/// Runs `job` with progress bars on `multi`.
///
/// # Errors
///
/// See [`correct_run`].
pub fn run_correct(
    job: &CorrectJob<'_>,
    config: &PipelineConfig,
    baseline: Option<FrequencyBaseline>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let periods = IndicatifProgress::for_stage(
        multi,
        Stage::Periods,
        Some(job.periods.len() as u64),
        &job.name.model,
    );
    let basins = IndicatifProgress::for_stage(multi, Stage::Basins, None, "Splitting");
    let baseline = correct_run(job, config, baseline, &MessagePackStore, &periods, &basins)?;

    for (code, frequency) in baseline.iter() {
        log::info!("Baseline frequency {code}: {frequency:.6e}");
    }
    Ok(())
}

/// One `combine-models` invocation.
pub struct CombineModelsJob<'a> {
    /// Run name of one model; the model is replaced per input.
    pub name: HazardFileName,
    /// Models whose global catalogs are stacked, in order.
    pub models: &'a [String],
    /// Directory holding the corrected global catalogs.
    pub input_dir: &'a Path,
    /// Directory for the combined catalog.
    pub output_dir: &'a Path,
}

impl CombineModelsJob<'_> {
    fn input_path(&self, model: &str) -> PathBuf {
        let name = HazardFileName {
            model: model.to_string(),
            ..self.name.with_region(Region::Global)
        };
        self.input_dir.join(name.file(CATALOG_SUFFIX))
    }

    fn output_path(&self) -> Result<PathBuf, Box<dyn std::error::Error>> {
        let name = self
            .name
            .with_region(Region::Global)
            .combined(u32::try_from(self.models.len())?);
        Ok(self.output_dir.join(name.file(CATALOG_SUFFIX)))
    }
}

/// Stacks the global catalogs of every model in `job` into one catalog
/// saved under the combined name, and returns its path.
///
/// Event frequencies are kept per model. Event ids must stay unique across
/// the models, which holds for consolidated catalogs since their ids carry
/// the model name.
///
/// # Errors
///
/// Returns an error if no models are given, a catalog cannot be loaded or
/// saved, or two models share an event id.
pub fn combine_models_run(
    job: &CombineModelsJob<'_>,
    store: &impl HazardStore,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<PathBuf, Box<dyn std::error::Error>> {
    if job.models.is_empty() {
        return Err("no models to combine".into());
    }
    progress.set_total(job.models.len() as u64);

    let mut catalogs = Vec::with_capacity(job.models.len());
    for model in job.models {
        progress.set_message(format!("Loading {model}"));
        catalogs.push(store.load(&job.input_path(model))?);
        progress.inc(1);
    }
    let combined = concat(&catalogs)?;
    drop(catalogs);

    let mut seen = HashSet::with_capacity(combined.len());
    if let Some(duplicate) = combined
        .events()
        .iter()
        .find(|event| !seen.insert(event.event_id.as_str()))
    {
        return Err(format!("event id {} occurs in more than one model", duplicate.event_id).into());
    }

    let out = job.output_path()?;
    store.save(&combined, &out)?;
    progress.finish(format!(
        "Combined {} models into {} events",
        job.models.len(),
        combined.len()
    ));
    Ok(out)
}

/// Runs `job` with a progress bar on `multi`.
///
/// # Errors
///
/// See [`combine_models_run`].
pub fn run_combine_models(
    job: &CombineModelsJob<'_>,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    let progress = IndicatifProgress::for_stage(
        multi,
        Stage::Models,
        Some(job.models.len() as u64),
        &job.name.period.to_string(),
    );
    let out = combine_models_run(job, &MessagePackStore, &progress)?;
    log::info!("Combined catalog written to {}", out.display());
    Ok(())
}

/// Repairs the catalog at `input` and writes it to `output`, optionally
/// restricted to `bbox` (`lon_min, lon_max, lat_min, lat_max`).
///
/// # Errors
///
/// Returns an error if the catalog cannot be read or written, or the
/// bounding box is malformed.
pub fn run_repair(
    input: &Path,
    output: &Path,
    bbox: Option<&[f64]>,
) -> Result<(), Box<dyn std::error::Error>> {
    let extent = match bbox {
        None => None,
        Some(&[lon_min, lon_max, lat_min, lat_max]) => {
            Some(Extent::new(lon_min, lon_max, lat_min, lat_max)?)
        }
        Some(values) => {
            return Err(format!("bbox needs 4 values, got {}", values.len()).into());
        }
    };

    let store = MessagePackStore;
    let mut catalog = store.load(input)?;
    let report = repair(&mut catalog, &input.display().to_string());
    if let Some(extent) = &extent {
        catalog = select_extent(&catalog, extent);
    }
    store.save(&catalog, output)?;

    println!(
        "Removed {} invalid entries from {} events; wrote {} events x {} points",
        report.removed,
        report.rows_affected,
        catalog.len(),
        catalog.points().len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_hazard_basin::config::default_config;
    use tc_hazard_catalog::progress::null_progress;
    use tc_hazard_catalog::{EventRecord, GridPoint, IntensityMatrix};

    fn name() -> HazardFileName {
        HazardFileName {
            region: Region::Global,
            model: "CESM2".to_string(),
            period: Period::Base,
            scenario: "ssp370".to_string(),
            ensembles: 80,
            category: "CRH".to_string(),
            wind_model: "H08".to_string(),
        }
    }

    /// Eastern Pacific and North Atlantic only.
    fn config() -> PipelineConfig {
        let mut config = default_config();
        config
            .basins
            .retain(|b| b.code.as_str() == "EP" || b.code.as_str() == "NA");
        config
    }

    /// One point in EP, one in NA; `events` events hitting both.
    fn raw(events: usize) -> HazardCatalog {
        let points = vec![
            GridPoint::new(15.0, -110.0, 0),
            GridPoint::new(25.0, -60.0, 1),
        ];
        let rows: Vec<Vec<(usize, f64)>> =
            (0..events).map(|_| vec![(0, 40.0), (1, 35.0)]).collect();
        let records = (0..events)
            .map(|i| EventRecord::raw(&format!("raw{i}"), i as u64, 1.0))
            .collect();
        HazardCatalog::new(records, points, IntensityMatrix::from_rows(2, &rows)).unwrap()
    }

    fn write_raw(job: &CorrectJob<'_>, period: Period, events: usize) {
        for region in job.input_regions {
            MessagePackStore
                .save(&raw(events), &job.input_path(period, region))
                .unwrap();
        }
    }

    #[test]
    fn corrects_every_period_with_the_base_frequencies() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let regions = vec!["AP".to_string()];
        let job = CorrectJob {
            name: name(),
            input_dir: input.path(),
            output_dir: output.path(),
            input_regions: &regions,
            periods: &[Period::Base, Period::Fut1],
        };
        write_raw(&job, Period::Base, 4);
        write_raw(&job, Period::Fut1, 8);

        let baseline = correct_run(
            &job,
            &config(),
            None,
            &MessagePackStore,
            &null_progress(),
            &null_progress(),
        )
        .unwrap();
        assert_eq!(baseline.len(), 2);
        assert!(job.baseline_path().exists());

        let fut = MessagePackStore
            .load(&job.output_path(Period::Fut1, Region::Global))
            .unwrap();
        assert_eq!(fut.len(), 16);
        let base = MessagePackStore
            .load(&job.output_path(Period::Base, Region::Global))
            .unwrap();
        assert_eq!(base.len(), 8);
        assert_eq!(fut.frequencies()[0], base.frequencies()[0]);

        let na = job.output_path(Period::Base, Region::Basin(BasinCode::new("NA")));
        assert_eq!(MessagePackStore.load(&na).unwrap().points().len(), 1);
    }

    #[test]
    fn future_only_run_needs_a_baseline() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let regions = vec!["AP".to_string()];
        let job = CorrectJob {
            name: name(),
            input_dir: input.path(),
            output_dir: output.path(),
            input_regions: &regions,
            periods: &[Period::Fut2],
        };
        write_raw(&job, Period::Fut2, 3);

        assert!(
            correct_run(
                &job,
                &config(),
                None,
                &MessagePackStore,
                &null_progress(),
                &null_progress(),
            )
            .is_err()
        );
    }

    #[test]
    fn present_climate_run_writes_only_the_baseline_period() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let regions = vec!["AP".to_string(), "WP".to_string()];
        let job = CorrectJob {
            name: HazardFileName {
                model: "ERA5".to_string(),
                ..name()
            },
            input_dir: input.path(),
            output_dir: output.path(),
            input_regions: &regions,
            periods: PRESENT_CLIMATE,
        };
        write_raw(&job, Period::Base, 3);

        let baseline = correct_run(
            &job,
            &config(),
            None,
            &MessagePackStore,
            &null_progress(),
            &null_progress(),
        )
        .unwrap();
        assert_eq!(baseline.len(), 2);

        let global = MessagePackStore
            .load(&job.output_path(Period::Base, Region::Global))
            .unwrap();
        assert_eq!(global.len(), 12);
        assert!(global.events()[0].event_id.starts_with("ERA5_CRH_ev0_"));
        assert!(!job.output_path(Period::Fut1, Region::Global).exists());
    }

    fn correct_model(model: &str, input: &Path, output: &Path, events: usize) {
        let regions = vec!["AP".to_string()];
        let job = CorrectJob {
            name: HazardFileName {
                model: model.to_string(),
                ..name()
            },
            input_dir: input,
            output_dir: output,
            input_regions: &regions,
            periods: PRESENT_CLIMATE,
        };
        write_raw(&job, Period::Base, events);
        correct_run(
            &job,
            &config(),
            None,
            &MessagePackStore,
            &null_progress(),
            &null_progress(),
        )
        .unwrap();
    }

    #[test]
    fn combines_models_under_the_all_models_name() {
        let input = tempfile::tempdir().unwrap();
        let corrected = tempfile::tempdir().unwrap();
        let combined = tempfile::tempdir().unwrap();
        correct_model("CESM2", input.path(), corrected.path(), 3);
        correct_model("MIROC6", input.path(), corrected.path(), 2);

        let models = vec!["CESM2".to_string(), "MIROC6".to_string()];
        let job = CombineModelsJob {
            name: name(),
            models: &models,
            input_dir: corrected.path(),
            output_dir: combined.path(),
        };
        let out = combine_models_run(&job, &MessagePackStore, &null_progress()).unwrap();
        assert!(
            out.ends_with("TC_global_0300as_CHAZ_ALL-MODELS_base_ssp370_160ens_CRH_H08.msgpack")
        );

        let catalog = MessagePackStore.load(&out).unwrap();
        assert_eq!(catalog.len(), 2 * 3 + 2 * 2);
        let ids: HashSet<&str> = catalog.events().iter().map(|e| e.event_id.as_str()).collect();
        assert_eq!(ids.len(), catalog.len());
        let order: Vec<u64> = catalog.events().iter().map(|e| e.order.ordering_key()).collect();
        assert_eq!(order, (0..10).collect::<Vec<u64>>());
    }

    #[test]
    fn combining_a_model_twice_is_rejected() {
        let input = tempfile::tempdir().unwrap();
        let corrected = tempfile::tempdir().unwrap();
        correct_model("CESM2", input.path(), corrected.path(), 2);

        let models = vec!["CESM2".to_string(), "CESM2".to_string()];
        let job = CombineModelsJob {
            name: name(),
            models: &models,
            input_dir: corrected.path(),
            output_dir: corrected.path(),
        };
        assert!(combine_models_run(&job, &MessagePackStore, &null_progress()).is_err());
        let none = CombineModelsJob { models: &[], ..job };
        assert!(combine_models_run(&none, &MessagePackStore, &null_progress()).is_err());
    }

    #[test]
    fn repair_restricts_to_the_bounding_box() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("raw.msgpack");
        let output = dir.path().join("tile.msgpack");
        MessagePackStore.save(&raw(2), &input).unwrap();

        run_repair(&input, &output, Some(&[-120.0, -100.0, 0.0, 30.0])).unwrap();
        let tile = MessagePackStore.load(&output).unwrap();
        assert_eq!(tile.points().len(), 1);
        assert_eq!(tile.len(), 2);

        assert!(run_repair(&input, &output, Some(&[0.0, 1.0])).is_err());
    }
}
