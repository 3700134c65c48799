//! Catalog persistence.
//!
//! The pipeline only needs `load(path)` and `save(catalog, path)`; the
//! container format is an implementation detail of the store. The bundled
//! [`MessagePackStore`] writes catalogs with `rmp-serde`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write as _};
use std::path::Path;

use tc_hazard_catalog_models::HazardCatalog;

use crate::CatalogError;

/// Loads and saves hazard catalogs.
pub trait HazardStore {
    /// Reads a catalog from `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded, or if the
    /// decoded catalog violates the shape invariant.
    fn load(&self, path: &Path) -> Result<HazardCatalog, CatalogError>;

    /// Writes `catalog` to `path`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    fn save(&self, catalog: &HazardCatalog, path: &Path) -> Result<(), CatalogError>;
}

/// [`HazardStore`] backed by MessagePack files.
#[derive(Debug, Clone, Copy, Default)]
pub struct MessagePackStore;

impl HazardStore for MessagePackStore {
    fn load(&self, path: &Path) -> Result<HazardCatalog, CatalogError> {
        let reader = BufReader::new(File::open(path)?);
        let decoded: HazardCatalog = rmp_serde::from_read(reader)?;

        // Decoding bypasses the constructor, so re-check the invariant.
        let (events, points, intensity) = decoded.into_parts();
        let catalog = HazardCatalog::new(events, points, intensity)?;

        log::info!(
            "Loaded {} events x {} points from {}",
            catalog.len(),
            catalog.points().len(),
            path.display()
        );
        Ok(catalog)
    }

    fn save(&self, catalog: &HazardCatalog, path: &Path) -> Result<(), CatalogError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let mut writer = BufWriter::new(File::create(path)?);
        rmp_serde::encode::write_named(&mut writer, catalog)?;
        writer.flush()?;

        log::info!("Saved {} events to {}", catalog.len(), path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tc_hazard_catalog_models::{EventRecord, GridPoint, IntensityMatrix};

    #[test]
    fn save_then_load_preserves_catalog() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/TC_EP.msgpack");
        let catalog = HazardCatalog::new(
            vec![EventRecord::raw("ev0", 0, 0.5)],
            vec![GridPoint::new(15.0, -110.0, 0)],
            IntensityMatrix::from_rows(1, &[vec![(0, 42.0)]]),
        )
        .unwrap();

        MessagePackStore.save(&catalog, &path).unwrap();
        let loaded = MessagePackStore.load(&path).unwrap();
        assert_eq!(loaded, catalog);
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = MessagePackStore
            .load(&dir.path().join("absent.msgpack"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Io(_)));
    }

    #[derive(serde::Serialize)]
    struct StoredMatrix {
        rows: usize,
        cols: usize,
        indptr: Vec<usize>,
        indices: Vec<i64>,
        data: Vec<f64>,
    }

    #[derive(serde::Serialize)]
    struct StoredCatalog {
        events: Vec<EventRecord>,
        points: Vec<GridPoint>,
        intensity: StoredMatrix,
    }

    #[test]
    fn row_pointers_past_the_entries_fail_to_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrupt.msgpack");
        let stored = StoredCatalog {
            events: vec![EventRecord::raw("ev0", 0, 0.5)],
            points: vec![GridPoint::new(15.0, -110.0, 0)],
            intensity: StoredMatrix {
                rows: 1,
                cols: 1,
                indptr: vec![0, 5],
                indices: vec![0],
                data: vec![1.0],
            },
        };
        let mut writer = BufWriter::new(File::create(&path).unwrap());
        rmp_serde::encode::write_named(&mut writer, &stored).unwrap();
        writer.flush().unwrap();
        drop(writer);

        let err = MessagePackStore.load(&path).unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));
        assert!(err.to_string().contains("indptr"));
    }
}
