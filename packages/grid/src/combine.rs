//! End-to-end tile combination for one run and metric family.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tc_hazard_catalog::progress::ProgressCallback;

use crate::GridError;
use crate::interpolate::{InterpolationMethod, interpolate_table};
use crate::lattice::lattice_for;
use crate::metadata::MetricFamily;
use crate::tiles::{discover_tiles, merge_tiles, read_tiles};
use crate::write::{write_points_csv, write_points_json, write_raster_json};

/// Lattice settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombineOptions {
    /// Lattice step in degrees.
    pub resolution: f64,
    /// Interpolation method.
    pub method: InterpolationMethod,
}

impl Default for CombineOptions {
    fn default() -> Self {
        Self {
            resolution: 0.05,
            method: InterpolationMethod::default(),
        }
    }
}

/// Files written by [`combine_tiles`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombineOutputs {
    /// Number of tiles merged.
    pub tiles: usize,
    /// Number of unique points after deduplication.
    pub points: usize,
    /// Merged points as CSV.
    pub points_csv: PathBuf,
    /// Merged points as a JSON document.
    pub points_json: PathBuf,
    /// Gridded raster as JSON.
    pub raster_json: PathBuf,
}

/// Merges every tile of `base_name`/`family` in `input_dir` and writes the
/// global point table and raster to `output_dir` as
/// `TC_global_{base_name}_{family}.{csv,json}` and
/// `TC_global_{base_name}_{family}_raster.json`.
///
/// Returns `Ok(None)` if no tile matches.
///
/// # Errors
///
/// Returns an error if a tile cannot be read, the merged points cannot be
/// gridded, or an output cannot be written.
pub fn combine_tiles(
    input_dir: &Path,
    output_dir: &Path,
    base_name: &str,
    family: MetricFamily,
    options: CombineOptions,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Option<CombineOutputs>, GridError> {
    let paths = discover_tiles(input_dir, base_name, family)?;
    if paths.is_empty() {
        log::warn!(
            "No {family} tiles for {base_name} in {}",
            input_dir.display()
        );
        return Ok(None);
    }

    let merged = merge_tiles(read_tiles(&paths, progress)?);
    let metadata = family.metadata_for(merged.columns());

    let stem = format!("TC_global_{base_name}_{family}");
    let points_csv = output_dir.join(format!("{stem}.csv"));
    let points_json = output_dir.join(format!("{stem}.json"));
    let raster_json = output_dir.join(format!("{stem}_raster.json"));

    write_points_csv(&merged, &points_csv)?;
    write_points_json(&merged, &metadata, &points_json)?;

    let grid = lattice_for(&merged, options.resolution)?;
    let raster = interpolate_table(&merged, &grid, options.method, &metadata, progress)?;
    write_raster_json(&raster, &raster_json)?;

    log::info!("Finished combining tiles for {stem}");
    Ok(Some(CombineOutputs {
        tiles: paths.len(),
        points: merged.len(),
        points_csv,
        points_json,
        raster_json,
    }))
}
