//! Writers for merged point tables and rasters.
//!
//! Points go to CSV (`lon, lat, <metric...>`, missing values as empty
//! cells) and to a JSON document carrying per-variable metadata. Rasters
//! go to JSON with `lon`/`lat` coordinate vectors and one lat-major 2-D
//! array per variable, missing cells as `null`.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::Path;

use serde::Serialize;
use tc_hazard_grid_models::{MetricTable, Raster, VariableMetadata};

use crate::GridError;

fn create(path: &Path) -> Result<BufWriter<File>, GridError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

fn present(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Writes `table` as CSV with `lon` and `lat` first.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_points_csv(table: &MetricTable, path: &Path) -> Result<(), GridError> {
    let mut writer = csv::Writer::from_writer(create(path)?);

    let mut header = vec!["lon", "lat"];
    header.extend(table.columns().iter().map(String::as_str));
    writer.write_record(&header)?;

    for point in table.points() {
        let mut record = vec![point.lon.to_string(), point.lat.to_string()];
        record.extend(
            point
                .values
                .iter()
                .map(|&v| present(v).map_or_else(String::new, |v| v.to_string())),
        );
        writer.write_record(&record)?;
    }

    writer.flush()?;
    log::info!("Wrote {} points to {}", table.len(), path.display());
    Ok(())
}

#[derive(Serialize)]
struct PointVariable<'a> {
    name: &'a str,
    #[serde(flatten)]
    metadata: &'a VariableMetadata,
    values: Vec<Option<f64>>,
}

#[derive(Serialize)]
struct PointDocument<'a> {
    lon: Vec<f64>,
    lat: Vec<f64>,
    variables: Vec<PointVariable<'a>>,
}

/// Writes `table` as a JSON point document with the metadata of each
/// column.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_points_json(
    table: &MetricTable,
    metadata: &BTreeMap<String, VariableMetadata>,
    path: &Path,
) -> Result<(), GridError> {
    let empty = VariableMetadata::default();
    let document = PointDocument {
        lon: table.points().iter().map(|p| p.lon).collect(),
        lat: table.points().iter().map(|p| p.lat).collect(),
        variables: table
            .columns()
            .iter()
            .enumerate()
            .map(|(i, name)| PointVariable {
                name,
                metadata: metadata.get(name).unwrap_or(&empty),
                values: table.column(i).map(present).collect(),
            })
            .collect(),
    };

    let mut writer = create(path)?;
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;
    log::info!("Wrote point document to {}", path.display());
    Ok(())
}

#[derive(Serialize)]
struct RasterVariableDocument<'a> {
    name: &'a str,
    #[serde(flatten)]
    metadata: &'a VariableMetadata,
    values: Vec<&'a [Option<f64>]>,
}

#[derive(Serialize)]
struct RasterDocument<'a> {
    lon: Vec<f64>,
    lat: Vec<f64>,
    resolution: f64,
    variables: Vec<RasterVariableDocument<'a>>,
}

/// Writes `raster` as JSON.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_raster_json(raster: &Raster, path: &Path) -> Result<(), GridError> {
    let nx = raster.grid.nx.max(1);
    let document = RasterDocument {
        lon: raster.grid.lons(),
        lat: raster.grid.lats(),
        resolution: raster.grid.resolution,
        variables: raster
            .variables
            .iter()
            .map(|v| RasterVariableDocument {
                name: &v.name,
                metadata: &v.metadata,
                values: v.values.chunks(nx).collect(),
            })
            .collect(),
    };

    let mut writer = create(path)?;
    serde_json::to_writer(&mut writer, &document)?;
    writer.flush()?;
    log::info!(
        "Wrote {}x{} raster with {} variables to {}",
        raster.grid.nx,
        raster.grid.ny,
        raster.variables.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;
    use tc_hazard_grid_models::{RasterVariable, RegularGrid, ScatteredMetricPoint};

    fn table() -> MetricTable {
        let mut t = MetricTable::new(vec!["rp_10".to_string(), "extra".to_string()]);
        t.push(ScatteredMetricPoint {
            lat: -3.0,
            lon: 10.5,
            values: vec![30.25, f64::NAN],
        })
        .unwrap();
        t
    }

    fn metadata() -> BTreeMap<String, VariableMetadata> {
        let mut m = BTreeMap::new();
        m.insert(
            "rp_10".to_string(),
            VariableMetadata {
                long_name: Some("Exceedance intensity for RP=10 years".to_string()),
                units: Some("m/s".to_string()),
            },
        );
        m
    }

    #[test]
    fn csv_puts_coordinates_first_and_leaves_missing_cells_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("points.csv");
        write_points_csv(&table(), &path).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text, "lon,lat,rp_10,extra\n10.5,-3,30.25,\n");
    }

    #[test]
    fn csv_output_reads_back_as_a_tile() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.csv");
        write_points_csv(&table(), &path).unwrap();
        let back = crate::tiles::read_tile(&path).unwrap();
        assert_eq!(back.columns(), table().columns());
        assert_eq!(back.value(0, "rp_10"), Some(30.25));
        assert!(back.value(0, "extra").unwrap().is_nan());
    }

    #[test]
    fn point_json_carries_metadata_only_where_known() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("points.json");
        write_points_json(&table(), &metadata(), &path).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["lon"][0], 10.5);
        assert_eq!(doc["variables"][0]["name"], "rp_10");
        assert_eq!(doc["variables"][0]["units"], "m/s");
        assert_eq!(doc["variables"][0]["values"][0], 30.25);
        assert!(doc["variables"][1].get("long_name").is_none());
        assert!(doc["variables"][1]["values"][0].is_null());
    }

    #[test]
    fn raster_json_is_lat_major_with_nulls() {
        let grid = RegularGrid::spanning(0.0, 1.0, 0.0, 2.0, 1.0).unwrap();
        let raster = Raster {
            grid,
            variables: vec![RasterVariable {
                name: "rp_10".to_string(),
                metadata: metadata()["rp_10"].clone(),
                values: vec![Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), None],
            }],
        };
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("raster.json");
        write_raster_json(&raster, &path).unwrap();

        let doc: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(doc["lon"], serde_json::json!([0.0, 1.0]));
        assert_eq!(doc["lat"], serde_json::json!([0.0, 1.0, 2.0]));
        let values = &doc["variables"][0]["values"];
        assert_eq!(values.as_array().unwrap().len(), 3);
        assert_eq!(values[1], serde_json::json!([null, 4.0]));
        assert_eq!(
            doc["variables"][0]["long_name"],
            "Exceedance intensity for RP=10 years"
        );
    }
}
