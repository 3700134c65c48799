//! Reading, discovering, and merging scattered metric tiles.
//!
//! A tile is a CSV file with `lon` and `lat` columns followed by one
//! column per metric. Empty cells and `NaN` read as missing values.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tc_hazard_catalog::progress::ProgressCallback;
use tc_hazard_grid_models::{MetricTable, ScatteredMetricPoint};

use crate::GridError;
use crate::metadata::MetricFamily;

fn parse_cell(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    raw.parse().ok()
}

/// Reads one tile.
///
/// Rows whose `lon` or `lat` is missing are dropped with a warning.
///
/// # Errors
///
/// Returns an error if the file cannot be read, has no `lon`/`lat`
/// columns, or holds a cell that is not a number.
pub fn read_tile(path: &Path) -> Result<MetricTable, GridError> {
    let mut reader = csv::Reader::from_path(path)?;
    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_owned())
        .collect();

    let position = |name: &str| headers.iter().position(|h| h == name);
    let (Some(lon_col), Some(lat_col)) = (position("lon"), position("lat")) else {
        return Err(GridError::MissingCoordinates {
            path: path.display().to_string(),
        });
    };
    let metric_cols: Vec<usize> = (0..headers.len())
        .filter(|&i| i != lon_col && i != lat_col)
        .collect();

    let mut table = MetricTable::new(metric_cols.iter().map(|&i| headers[i].clone()).collect());
    let mut dropped = 0usize;

    for result in reader.records() {
        let record = result?;
        let line = record.position().map_or(0, csv::Position::line);
        let cell = |i: usize| {
            let raw = record.get(i).unwrap_or("");
            parse_cell(raw).ok_or_else(|| GridError::InvalidValue {
                path: path.display().to_string(),
                line,
                column: headers[i].clone(),
                value: raw.to_owned(),
            })
        };

        let lon = cell(lon_col)?;
        let lat = cell(lat_col)?;
        if !(lon.is_finite() && lat.is_finite()) {
            dropped += 1;
            continue;
        }
        let values = metric_cols
            .iter()
            .map(|&i| cell(i))
            .collect::<Result<Vec<_>, _>>()?;
        table.push(ScatteredMetricPoint { lat, lon, values })?;
    }

    if dropped > 0 {
        log::warn!(
            "Dropped {dropped} rows without coordinates from {}",
            path.display()
        );
    }
    log::debug!("Read {} points from {}", table.len(), path.display());
    Ok(table)
}

/// Whether `name` is `TC_<a>_<b>_<c>_<d>_{suffix}`, with four non-empty
/// extent fields.
fn is_tile_name(name: &str, suffix: &str) -> bool {
    name.strip_prefix("TC_")
        .and_then(|rest| rest.strip_suffix(suffix))
        .and_then(|middle| middle.strip_suffix('_'))
        .is_some_and(|extent| {
            let fields: Vec<&str> = extent.split('_').collect();
            fields.len() == 4 && fields.iter().all(|f| !f.is_empty())
        })
}

/// Lists the tiles of one run and family in `dir`, sorted by file name.
///
/// Matches `TC_*_*_*_*_{base_name}_{family}.csv`. The sort order is the
/// tile order [`merge_tiles`] deduplicates in.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
pub fn discover_tiles(
    dir: &Path,
    base_name: &str,
    family: MetricFamily,
) -> Result<Vec<PathBuf>, GridError> {
    let suffix = format!("{base_name}_{family}.csv");
    let mut tiles = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| is_tile_name(n, &suffix))
        {
            tiles.push(path);
        }
    }
    tiles.sort();
    log::info!(
        "Found {} {family} tiles for {base_name} in {}",
        tiles.len(),
        dir.display()
    );
    Ok(tiles)
}

/// Reads every tile in order.
///
/// # Errors
///
/// Returns the first read error.
pub fn read_tiles(
    paths: &[PathBuf],
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Vec<MetricTable>, GridError> {
    progress.set_total(paths.len() as u64);
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        progress.set_message(format!("Reading {}", path.display()));
        tables.push(read_tile(path)?);
        progress.inc(1);
    }
    progress.finish(format!("Read {} tiles", tables.len()));
    Ok(tables)
}

/// Exact coordinate key. `+ 0.0` folds `-0.0` into `0.0`.
fn coord_key(point: &ScatteredMetricPoint) -> (u64, u64) {
    ((point.lat + 0.0).to_bits(), (point.lon + 0.0).to_bits())
}

/// Concatenates tiles into one table, keeping the first occurrence of
/// every exact `(lat, lon)`.
///
/// Columns are the union of the tiles' columns in first-seen order; a
/// point from a tile without some column gets `NaN` there. When tiles
/// overlap, the value from the earlier tile wins and the later one is
/// discarded.
#[must_use]
pub fn merge_tiles(tiles: Vec<MetricTable>) -> MetricTable {
    let mut columns: Vec<String> = Vec::new();
    for tile in &tiles {
        for col in tile.columns() {
            if !columns.contains(col) {
                columns.push(col.clone());
            }
        }
    }

    let mut merged = MetricTable::new(columns.clone());
    let mut seen: HashSet<(u64, u64)> = HashSet::new();
    let mut total = 0usize;

    for tile in tiles {
        let (tile_columns, points) = tile.into_parts();
        let layout: Vec<Option<usize>> = columns
            .iter()
            .map(|c| tile_columns.iter().position(|t| t == c))
            .collect();

        for point in points {
            total += 1;
            if !seen.insert(coord_key(&point)) {
                continue;
            }
            let values = layout
                .iter()
                .map(|slot| slot.map_or(f64::NAN, |i| point.values[i]))
                .collect();
            merged
                .push(ScatteredMetricPoint {
                    lat: point.lat,
                    lon: point.lon,
                    values,
                })
                .unwrap_or_else(|_| unreachable!("values are laid out on the merged columns"));
        }
    }

    let duplicates = total - merged.len();
    if duplicates > 0 {
        log::debug!("Discarded {duplicates} duplicate points from overlapping tiles");
    }
    log::info!("Merged {total} tile points into {} unique points", merged.len());
    merged
}
