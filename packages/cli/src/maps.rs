//! Map stages: merging statistics tiles, checking for missing products,
//! and the cross-model site report.

use std::path::{Path, PathBuf};

use tc_hazard_catalog::naming::{HazardFileName, Period, Region};
use tc_hazard_catalog::progress::ProgressCallback as _;
use tc_hazard_cli_utils::{IndicatifProgress, MultiProgress, Stage};
use tc_hazard_grid::{CombineOptions, MetricFamily, StatisticsRequest, combine_tiles};
use tc_hazard_report::{
    OutputSpec, ScenarioInput, check_outputs, default_sites, summarize_files, write_summary_csv,
};

/// Combines the tiles of each family in `families`.
///
/// # Errors
///
/// Returns an error if a family fails to combine.
pub fn run_combine(
    input_dir: &Path,
    output_dir: &Path,
    base_name: &str,
    families: &[MetricFamily],
    options: CombineOptions,
    multi: &MultiProgress,
) -> Result<(), Box<dyn std::error::Error>> {
    for &family in families {
        let progress =
            IndicatifProgress::for_stage(multi, Stage::Tiles, None, &format!("Combining {family}"));
        match combine_tiles(input_dir, output_dir, base_name, family, options, &progress)? {
            Some(outputs) => progress.finish(format!(
                "{family}: {} tiles, {} points -> {}",
                outputs.tiles,
                outputs.points,
                outputs.raster_json.display()
            )),
            None => progress.finish(format!("{family}: no tiles")),
        }
    }
    Ok(())
}

/// Prints the completeness of `dir` per extension.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn run_check(dir: &Path, spec: &OutputSpec) -> Result<(), Box<dyn std::error::Error>> {
    for report in check_outputs(dir, spec)? {
        println!();
        println!("=== {} ===", report.extension);
        println!("Expected: {}", report.expected);
        println!("Found:    {}", report.found);
        println!("Missing:  {}", report.missing.len());
        for name in &report.missing {
            println!("  {name}");
        }
    }
    Ok(())
}

fn global_file(
    maps_dir: &Path,
    spec: &OutputSpec,
    model: &str,
    period: Period,
    scenario: &str,
    category: &str,
    family: MetricFamily,
) -> PathBuf {
    let name = HazardFileName {
        region: Region::Global,
        model: model.to_string(),
        period,
        scenario: scenario.to_string(),
        ensembles: spec.ensembles,
        category: category.to_string(),
        wind_model: spec.wind_model.clone(),
    };
    maps_dir.join(name.file(&format!("_{family}.csv")))
}

/// Summarises every period and scenario of `category` across the default
/// models and writes `{family}_gcm_minmaxmed_{category}.csv` to `out_dir`.
///
/// Sites are matched to points of the first model's base period under the
/// first scenario.
///
/// # Errors
///
/// Returns an error if a map cannot be read or the summary cannot be
/// written.
pub fn run_report(
    maps_dir: &Path,
    category: &str,
    family: MetricFamily,
    out_dir: &Path,
    neighbours: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let spec = OutputSpec::default();
    let (Some(reference_model), Some(reference_scenario)) =
        (spec.models.first(), spec.scenarios.first())
    else {
        return Err("no models or scenarios configured".into());
    };
    let reference = global_file(
        maps_dir,
        &spec,
        reference_model,
        Period::Base,
        reference_scenario,
        category,
        family,
    );

    let metrics = match family {
        MetricFamily::ExceedanceIntensity => StatisticsRequest::exceedance_intensity(),
        MetricFamily::ReturnPeriods => StatisticsRequest::return_periods(),
    }
    .column_names();

    let mut scenarios = Vec::new();
    for &period in &spec.periods {
        for scenario in &spec.scenarios {
            scenarios.push(ScenarioInput {
                label: format!("{period}_{scenario}_{category}"),
                model_files: spec
                    .models
                    .iter()
                    .map(|model| {
                        let path =
                            global_file(maps_dir, &spec, model, period, scenario, category, family);
                        (model.clone(), path)
                    })
                    .collect(),
            });
        }
    }

    let rows = summarize_files(&reference, &default_sites(), neighbours, &metrics, &scenarios)?;
    let out = out_dir.join(format!("{family}_gcm_minmaxmed_{category}.csv"));
    write_summary_csv(&rows, &out)?;
    println!("Wrote site summary to {}", out.display());
    Ok(())
}
