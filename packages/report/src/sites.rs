//! Cross-model spread of map values at named sites.
//!
//! Each site is represented by the `k` scattered points nearest to it on a
//! reference table. For every model the metric is averaged over those
//! points, and the min / median / max of the per-model averages is
//! reported per scenario.

use std::collections::HashMap;
use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use rstar::RTree;
use rstar::primitives::GeomWithData;
use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumString};
use tc_hazard_grid::{GridError, MetricTable, read_tile};

use crate::ReportError;

/// Number of neighbouring points averaged per site.
pub const DEFAULT_NEIGHBOURS: usize = 5;

/// A named location.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Site {
    /// Display name.
    pub name: String,
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
}

impl Site {
    /// Creates a site at `(lon, lat)`.
    #[must_use]
    pub fn new(name: &str, lon: f64, lat: f64) -> Self {
        Self {
            name: name.to_string(),
            lon,
            lat,
        }
    }
}

/// Coastal cities used for technical validation of the maps.
#[must_use]
pub fn default_sites() -> Vec<Site> {
    vec![
        Site::new("Noumea", 166.45, -22.28),
        Site::new("Miami", -80.2, 25.8),
        Site::new("Acapulco", -99.9, 16.8),
        Site::new("Toamasina", 49.37, -18.15),
        Site::new("Mumbai", 72.8, 18.9),
        Site::new("Manila", 121.0, 14.6),
    ]
}

/// The reference points chosen for one site, as `(lon, lat)`.
#[derive(Debug, Clone, PartialEq)]
pub struct SiteNeighbours {
    /// The site.
    pub site: Site,
    /// Coordinates of the nearest reference points, closest first.
    pub coordinates: Vec<(f64, f64)>,
}

type IndexedPoint = GeomWithData<[f64; 2], usize>;

/// Finds the `k` points of `reference` closest to each site.
///
/// Points with non-finite coordinates are ignored. Distances are planar
/// in degrees.
#[must_use]
pub fn nearest_sites(reference: &MetricTable, sites: &[Site], k: usize) -> Vec<SiteNeighbours> {
    let entries: Vec<IndexedPoint> = reference
        .points()
        .iter()
        .enumerate()
        .filter(|(_, p)| p.lon.is_finite() && p.lat.is_finite())
        .map(|(i, p)| GeomWithData::new([p.lon, p.lat], i))
        .collect();
    let tree = RTree::bulk_load(entries);
    log::debug!("Indexed {} reference points", tree.size());

    sites
        .iter()
        .map(|site| {
            let coordinates = tree
                .nearest_neighbor_iter(&[site.lon, site.lat])
                .take(k)
                .map(|entry| {
                    let [lon, lat] = *entry.geom();
                    (lon, lat)
                })
                .collect();
            SiteNeighbours {
                site: site.clone(),
                coordinates,
            }
        })
        .collect()
}

fn coordinate_key(lon: f64, lat: f64) -> (u64, u64) {
    ((lon + 0.0).to_bits(), (lat + 0.0).to_bits())
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Mean of the non-NaN values, or NaN if there are none.
fn nan_mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values
        .filter(|v| !v.is_nan())
        .fold((0.0, 0_u32), |(sum, n), v| (sum + v, n + 1));
    if n == 0 { f64::NAN } else { sum / f64::from(n) }
}

/// Sorted non-NaN values.
fn finite_sorted(values: &[f64]) -> Vec<f64> {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(f64::total_cmp);
    sorted
}

/// Summary statistic across models.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Statistic {
    /// Smallest model value.
    Min,
    /// Median model value; the mean of the middle two for an even count.
    Median,
    /// Largest model value.
    Max,
}

impl Statistic {
    /// All statistics in report order.
    #[must_use]
    pub const fn all() -> [Self; 3] {
        [Self::Min, Self::Median, Self::Max]
    }

    /// Applies the statistic to `values`, ignoring NaN. NaN if nothing is
    /// left.
    #[must_use]
    pub fn apply(self, values: &[f64]) -> f64 {
        let sorted = finite_sorted(values);
        let (Some(&first), Some(&last)) = (sorted.first(), sorted.last()) else {
            return f64::NAN;
        };
        match self {
            Self::Min => first,
            Self::Max => last,
            Self::Median => {
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    f64::midpoint(sorted[mid - 1], sorted[mid])
                } else {
                    sorted[mid]
                }
            }
        }
    }
}

/// One cell of the summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryRow {
    /// Site name.
    pub site: String,
    /// Scenario label.
    pub scenario: String,
    /// Metric column, e.g. `rp_100`.
    pub metric: String,
    /// Statistic across models.
    pub statistic: Statistic,
    /// Statistic of the per-model site means; NaN if no model had data.
    pub value: f64,
}

/// Per-site mean of `metric` in one model table, rounded to 2 decimals.
fn site_means(
    table: &MetricTable,
    neighbours: &[SiteNeighbours],
    metric: &str,
) -> Result<Vec<f64>, GridError> {
    let column = table
        .column_index(metric)
        .ok_or_else(|| GridError::UnknownColumn {
            name: metric.to_string(),
        })?;
    let rows: HashMap<(u64, u64), usize> = table
        .points()
        .iter()
        .enumerate()
        .map(|(i, p)| (coordinate_key(p.lon, p.lat), i))
        .collect();

    Ok(neighbours
        .iter()
        .map(|n| {
            let values = n
                .coordinates
                .iter()
                .filter_map(|&(lon, lat)| rows.get(&coordinate_key(lon, lat)))
                .map(|&row| table.points()[row].values[column]);
            round2(nan_mean(values))
        })
        .collect())
}

/// Summarises one scenario: for each site and metric, the min / median /
/// max over `tables` (one per model) of the site mean.
///
/// Neighbour coordinates missing from a model table are skipped.
///
/// # Errors
///
/// Returns [`ReportError::EmptyModels`] if `tables` is empty and
/// [`ReportError::Grid`] if a table lacks one of `metrics`.
pub fn summarize_scenario(
    label: &str,
    neighbours: &[SiteNeighbours],
    metrics: &[String],
    tables: &[MetricTable],
) -> Result<Vec<SummaryRow>, ReportError> {
    if tables.is_empty() {
        return Err(ReportError::EmptyModels {
            scenario: label.to_string(),
        });
    }

    let mut rows = Vec::with_capacity(neighbours.len() * metrics.len() * 3);
    for metric in metrics {
        // per_model[m][s]: mean of model m at site s
        let per_model = tables
            .iter()
            .map(|t| site_means(t, neighbours, metric))
            .collect::<Result<Vec<_>, _>>()?;

        for (s, n) in neighbours.iter().enumerate() {
            let values: Vec<f64> = per_model.iter().map(|m| m[s]).collect();
            for statistic in Statistic::all() {
                rows.push(SummaryRow {
                    site: n.site.name.clone(),
                    scenario: label.to_string(),
                    metric: metric.clone(),
                    statistic,
                    value: statistic.apply(&values),
                });
            }
        }
    }
    Ok(rows)
}

/// One scenario to summarise from files.
#[derive(Debug, Clone)]
pub struct ScenarioInput {
    /// Scenario label, e.g. `"fut1_ssp370_CRH"`.
    pub label: String,
    /// `(model, path)` of each model's global point CSV.
    pub model_files: Vec<(String, PathBuf)>,
}

/// Reads the reference table, picks site neighbours, and summarises each
/// scenario from its model files. Only the tables of one scenario are held
/// in memory at a time.
///
/// # Errors
///
/// Returns an error if a file cannot be read or lacks a metric.
pub fn summarize_files(
    reference: &Path,
    sites: &[Site],
    k: usize,
    metrics: &[String],
    scenarios: &[ScenarioInput],
) -> Result<Vec<SummaryRow>, ReportError> {
    let neighbours = {
        let table = read_tile(reference)?;
        nearest_sites(&table, sites, k)
    };

    let mut rows = Vec::new();
    for scenario in scenarios {
        let tables = scenario
            .model_files
            .iter()
            .map(|(model, path)| {
                log::debug!("Reading {model} for {}", scenario.label);
                read_tile(path)
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.extend(summarize_scenario(
            &scenario.label,
            &neighbours,
            metrics,
            &tables,
        )?);
        drop(tables);
        log::info!("Summarised scenario {}", scenario.label);
    }
    Ok(rows)
}

/// Writes the summary as CSV (`site, scenario, metric, statistic, value`),
/// sorted by site, scenario, metric, and statistic.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_summary_csv(rows: &[SummaryRow], path: &Path) -> Result<(), ReportError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut sorted: Vec<&SummaryRow> = rows.iter().collect();
    sorted.sort_by(|a, b| {
        (&a.site, &a.scenario, &a.metric, a.statistic).cmp(&(
            &b.site,
            &b.scenario,
            &b.metric,
            b.statistic,
        ))
    });

    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));
    for row in sorted {
        writer.serialize(row)?;
    }
    writer.flush()?;
    log::info!("Wrote {} summary rows to {}", rows.len(), path.display());
    Ok(())
}
