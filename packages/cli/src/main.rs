#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the tropical-cyclone hazard pipeline.
//!
//! Runs basin classification, frequency correction, and consolidation over
//! all periods of a model run, stacks the corrected catalogs of several
//! models, repairs stored catalogs, merges statistics tiles into global
//! maps, and reports on finished outputs.
//!
//! Uses `indicatif-log-bridge` (via [`tc_hazard_cli_utils::init_logger`])
//! to route `log` output through `indicatif::MultiProgress` so that log
//! lines and progress bars never fight for the terminal.

mod maps;
mod pipeline;

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use tc_hazard_catalog::naming::{CLIMATE_MODELS, HazardFileName, Period, Region};
use tc_hazard_grid::{InterpolationMethod, MetricFamily};

#[derive(Parser)]
#[command(name = "tc_hazard_cli", about = "Tropical-cyclone hazard pipeline")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Identifies one model run.
#[derive(Args, Clone)]
struct RunArgs {
    /// Climate model, e.g. `CESM2`
    #[arg(long)]
    model: String,
    /// Emission scenario, e.g. `ssp370`
    #[arg(long)]
    scenario: String,
    /// Genesis-index category (TCGI), e.g. `CRH`
    #[arg(long)]
    category: String,
    /// Wind model, e.g. `H08`
    #[arg(long, default_value = "H08")]
    wind_model: String,
    /// Ensemble members in the run
    #[arg(long, default_value_t = 80)]
    ensembles: u32,
}

impl RunArgs {
    fn file_name(&self, period: Period) -> HazardFileName {
        HazardFileName {
            region: Region::Global,
            model: self.model.clone(),
            period,
            scenario: self.scenario.clone(),
            ensembles: self.ensembles,
            category: self.category.clone(),
            wind_model: self.wind_model.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Classify, frequency-correct, and consolidate every period of a run
    Correct {
        #[command(flatten)]
        run: RunArgs,
        /// Directory holding the raw regional catalogs
        #[arg(long)]
        input_dir: PathBuf,
        /// Directory for per-basin and global catalogs
        #[arg(long)]
        output_dir: PathBuf,
        /// Pipeline configuration (TOML); the embedded default if omitted
        #[arg(long)]
        config: Option<PathBuf>,
        /// Periods to process, baseline first
        #[arg(long, value_delimiter = ',')]
        periods: Option<Vec<Period>>,
        /// Reanalysis-driven run: the baseline period only, no future
        /// scaling
        #[arg(long, conflicts_with_all = ["periods", "baseline"])]
        present_climate: bool,
        /// Baseline frequencies (JSON) from an earlier base-period run
        #[arg(long)]
        baseline: Option<PathBuf>,
        /// Simulation regions whose catalogs make up the raw global catalog
        #[arg(long, value_delimiter = ',', default_value = "AP,IO,SH,WP")]
        input_regions: Vec<String>,
    },
    /// Stack the corrected global catalogs of several models into one
    CombineModels {
        /// Emission scenario, e.g. `ssp370`
        #[arg(long)]
        scenario: String,
        /// Genesis-index category (TCGI), e.g. `CRH`
        #[arg(long)]
        category: String,
        /// Period to combine
        #[arg(long)]
        period: Period,
        /// Wind model, e.g. `H08`
        #[arg(long, default_value = "H08")]
        wind_model: String,
        /// Ensemble members per model
        #[arg(long, default_value_t = 80)]
        ensembles: u32,
        /// Models to stack; every climate model if omitted
        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,
        /// Directory holding the corrected global catalogs
        #[arg(long)]
        input_dir: PathBuf,
        /// Directory for the combined catalog
        #[arg(long)]
        output_dir: PathBuf,
    },
    /// Drop invalid intensity entries from a stored catalog
    Repair {
        /// Catalog to repair
        #[arg(long)]
        input: PathBuf,
        /// Where to write the result; overwrites the input if omitted
        #[arg(long)]
        output: Option<PathBuf>,
        /// Keep only points inside `lon_min,lon_max,lat_min,lat_max`
        #[arg(long, value_delimiter = ',', allow_negative_numbers = true)]
        bbox: Option<Vec<f64>>,
    },
    /// Merge statistics tiles into global point tables and rasters
    CombineTiles {
        /// Shared run name of the tiles, e.g.
        /// `0300as_CHAZ_CESM2_base_ssp370_80ens_CRH_H08`
        #[arg(long)]
        base_name: String,
        /// Metric family; both if omitted
        #[arg(long)]
        family: Option<MetricFamily>,
        /// Directory holding the tiles
        #[arg(long)]
        input_dir: PathBuf,
        /// Directory for the global products
        #[arg(long)]
        output_dir: PathBuf,
        /// Lattice step in degrees; the configured resolution if omitted
        #[arg(long)]
        resolution: Option<f64>,
        /// Interpolation method
        #[arg(long, default_value = "linear")]
        method: InterpolationMethod,
        /// Pipeline configuration (TOML); the embedded default if omitted
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the global products missing from a map directory
    CheckFiles {
        /// Directory holding the global products
        #[arg(long)]
        dir: PathBuf,
        /// Models to expect
        #[arg(long, value_delimiter = ',')]
        models: Option<Vec<String>>,
    },
    /// Summarise the cross-model spread of map values at named sites
    Report {
        /// Directory holding the global point tables
        #[arg(long)]
        maps_dir: PathBuf,
        /// Genesis-index category (TCGI), e.g. `CRH`
        #[arg(long)]
        category: String,
        /// Metric family to summarise
        #[arg(long, default_value = "return_periods")]
        family: MetricFamily,
        /// Directory for the summary CSV
        #[arg(long, default_value = "outputs")]
        out_dir: PathBuf,
        /// Reference points averaged per site
        #[arg(long, default_value_t = tc_hazard_report::sites::DEFAULT_NEIGHBOURS)]
        neighbours: usize,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi = tc_hazard_cli_utils::init_logger();
    let cli = Cli::parse();

    match cli.command {
        Commands::Correct {
            run,
            input_dir,
            output_dir,
            config,
            periods,
            present_climate,
            baseline,
            input_regions,
        } => {
            let config = tc_hazard_basin::config::load_or_default(config.as_deref())?;
            let baseline = baseline
                .as_deref()
                .map(tc_hazard_frequency::FrequencyBaseline::load)
                .transpose()?;
            let job = pipeline::CorrectJob {
                name: run.file_name(Period::Base),
                input_dir: &input_dir,
                output_dir: &output_dir,
                input_regions: &input_regions,
                periods: if present_climate {
                    pipeline::PRESENT_CLIMATE
                } else {
                    periods.as_deref().unwrap_or(Period::all())
                },
            };
            pipeline::run_correct(&job, &config, baseline, &multi)?;
        }
        Commands::CombineModels {
            scenario,
            category,
            period,
            wind_model,
            ensembles,
            models,
            input_dir,
            output_dir,
        } => {
            let models = models.unwrap_or_else(|| {
                CLIMATE_MODELS.iter().map(ToString::to_string).collect()
            });
            let job = pipeline::CombineModelsJob {
                name: HazardFileName {
                    region: Region::Global,
                    model: String::new(),
                    period,
                    scenario,
                    ensembles,
                    category,
                    wind_model,
                },
                models: &models,
                input_dir: &input_dir,
                output_dir: &output_dir,
            };
            pipeline::run_combine_models(&job, &multi)?;
        }
        Commands::Repair {
            input,
            output,
            bbox,
        } => {
            let output = output.unwrap_or_else(|| input.clone());
            pipeline::run_repair(&input, &output, bbox.as_deref())?;
        }
        Commands::CombineTiles {
            base_name,
            family,
            input_dir,
            output_dir,
            resolution,
            method,
            config,
        } => {
            let resolution = match resolution {
                Some(r) => r,
                None => tc_hazard_basin::config::load_or_default(config.as_deref())?.grid_resolution,
            };
            let families = family.map_or_else(
                || vec![MetricFamily::ExceedanceIntensity, MetricFamily::ReturnPeriods],
                |f| vec![f],
            );
            maps::run_combine(
                &input_dir,
                &output_dir,
                &base_name,
                &families,
                tc_hazard_grid::CombineOptions { resolution, method },
                &multi,
            )?;
        }
        Commands::CheckFiles { dir, models } => {
            let mut spec = tc_hazard_report::OutputSpec::default();
            if let Some(models) = models {
                spec.models = models;
            }
            maps::run_check(&dir, &spec)?;
        }
        Commands::Report {
            maps_dir,
            category,
            family,
            out_dir,
            neighbours,
        } => {
            maps::run_report(&maps_dir, &category, family, &out_dir, neighbours)?;
        }
    }

    Ok(())
}
