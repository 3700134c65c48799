#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Tropical-cyclone hazard catalog types.
//!
//! A [`HazardCatalog`] is an ordered list of simulated storm events, an
//! ordered list of grid points, and a sparse event-by-point wind intensity
//! matrix tying the two together. Every other stage of the pipeline reads
//! or produces catalogs built from these types.

pub mod intensity;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use intensity::{IntensityMatrix, MatrixLayoutError, RepairReport};

/// Short code identifying an ocean basin (e.g. `"EP"`, `"NA"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BasinCode(String);

impl BasinCode {
    /// Wraps a basin code.
    #[must_use]
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BasinCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for BasinCode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// A fixed sample location at which wind intensity is evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridPoint {
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees, `[-180, 180]`.
    pub lon: f64,
    /// Position of this point in the catalog it was loaded from.
    pub index: usize,
    /// Basin this point was assigned to, if classified.
    pub basin: Option<BasinCode>,
}

impl GridPoint {
    /// Creates an unlabeled grid point.
    #[must_use]
    pub const fn new(lat: f64, lon: f64, index: usize) -> Self {
        Self {
            lat,
            lon,
            index,
            basin: None,
        }
    }
}

/// Position of an event in the catalog ordering.
///
/// Raw simulation output carries only a sequence number. After
/// consolidation the event is tagged with its basin and the basin's
/// ordering offset, so the merged ordering key encodes both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventOrder {
    /// Basin the event was consolidated under.
    pub basin: Option<BasinCode>,
    /// Fixed per-basin offset added to `sequence`.
    pub offset: u64,
    /// Contiguous index within the basin subset (or the raw catalog).
    pub sequence: u64,
}

impl EventOrder {
    /// Order of an event that has not been consolidated yet.
    #[must_use]
    pub const fn raw(sequence: u64) -> Self {
        Self {
            basin: None,
            offset: 0,
            sequence,
        }
    }

    /// Order of an event inside a consolidated basin subset.
    #[must_use]
    pub const fn in_basin(basin: BasinCode, offset: u64, sequence: u64) -> Self {
        Self {
            basin: Some(basin),
            offset,
            sequence,
        }
    }

    /// Basin-tagged sequence number: `offset + sequence`.
    #[must_use]
    pub const fn ordering_key(&self) -> u64 {
        self.offset + self.sequence
    }
}

/// One simulated storm event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Identifier, unique within a catalog.
    pub event_id: String,
    /// Human-readable name.
    pub name: String,
    /// Ordering information.
    pub order: EventOrder,
    /// Annual occurrence rate.
    pub frequency: f64,
}

impl EventRecord {
    /// Creates a raw event with the given sequence number and frequency.
    #[must_use]
    pub fn raw(event_id: impl Into<String>, sequence: u64, frequency: f64) -> Self {
        let event_id = event_id.into();
        Self {
            name: event_id.clone(),
            event_id,
            order: EventOrder::raw(sequence),
            frequency,
        }
    }
}

/// Error returned when a catalog's parts disagree on their dimensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogShapeError {
    /// Number of events supplied.
    pub events: usize,
    /// Number of grid points supplied.
    pub points: usize,
    /// Intensity matrix rows.
    pub rows: usize,
    /// Intensity matrix columns.
    pub cols: usize,
}

impl fmt::Display for CatalogShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "catalog shape mismatch: {} events / {} points vs intensity {}x{}",
            self.events, self.points, self.rows, self.cols
        )
    }
}

impl std::error::Error for CatalogShapeError {}

/// Events, grid points, and the intensity matrix linking them.
///
/// Invariant: `events.len() == intensity.rows()` and
/// `points.len() == intensity.cols()`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HazardCatalog {
    events: Vec<EventRecord>,
    points: Vec<GridPoint>,
    intensity: IntensityMatrix,
}

impl HazardCatalog {
    /// Assembles a catalog, checking the shape invariant.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogShapeError`] if the event count does not match the
    /// matrix rows or the point count does not match the matrix columns.
    pub fn new(
        events: Vec<EventRecord>,
        points: Vec<GridPoint>,
        intensity: IntensityMatrix,
    ) -> Result<Self, CatalogShapeError> {
        if events.len() != intensity.rows() || points.len() != intensity.cols() {
            return Err(CatalogShapeError {
                events: events.len(),
                points: points.len(),
                rows: intensity.rows(),
                cols: intensity.cols(),
            });
        }

        Ok(Self {
            events,
            points,
            intensity,
        })
    }

    /// An empty catalog over no points.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            events: Vec::new(),
            points: Vec::new(),
            intensity: IntensityMatrix::zeros(0, 0),
        }
    }

    /// Events in catalog order.
    #[must_use]
    pub fn events(&self) -> &[EventRecord] {
        &self.events
    }

    /// Mutable access to the events. The event count cannot change
    /// through this slice, so the shape invariant is preserved.
    pub fn events_mut(&mut self) -> &mut [EventRecord] {
        &mut self.events
    }

    /// Grid points in column order.
    #[must_use]
    pub fn points(&self) -> &[GridPoint] {
        &self.points
    }

    /// Mutable access to the points, for stamping basin labels.
    pub fn points_mut(&mut self) -> &mut [GridPoint] {
        &mut self.points
    }

    /// The intensity matrix.
    #[must_use]
    pub const fn intensity(&self) -> &IntensityMatrix {
        &self.intensity
    }

    /// Mutable access to the intensity matrix for in-place repair.
    pub fn intensity_mut(&mut self) -> &mut IntensityMatrix {
        &mut self.intensity
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the catalog holds no events.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Per-event annual frequencies in catalog order.
    #[must_use]
    pub fn frequencies(&self) -> Vec<f64> {
        self.events.iter().map(|e| e.frequency).collect()
    }

    /// Splits the catalog back into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Vec<EventRecord>, Vec<GridPoint>, IntensityMatrix) {
        (self.events, self.points, self.intensity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(n: usize) -> Vec<GridPoint> {
        (0..n)
            .map(|i| GridPoint::new(10.0, -120.0 + i as f64, i))
            .collect()
    }

    #[test]
    fn rejects_shape_mismatch() {
        let events = vec![EventRecord::raw("a", 0, 1.0)];
        let err = HazardCatalog::new(events, points(2), IntensityMatrix::zeros(1, 3)).unwrap_err();
        assert_eq!(err.points, 2);
        assert_eq!(err.cols, 3);
    }

    #[test]
    fn accepts_matching_shape() {
        let events = vec![EventRecord::raw("a", 0, 1.0), EventRecord::raw("b", 1, 2.0)];
        let catalog =
            HazardCatalog::new(events, points(3), IntensityMatrix::zeros(2, 3)).unwrap();
        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.frequencies(), vec![1.0, 2.0]);
    }

    #[test]
    fn ordering_key_adds_offset() {
        let order = EventOrder::in_basin(BasinCode::new("NA"), 100_000, 7);
        assert_eq!(order.ordering_key(), 100_007);
        assert_eq!(EventOrder::raw(3).ordering_key(), 3);
    }

    #[test]
    fn basin_code_displays_raw_code() {
        assert_eq!(BasinCode::from("WP").to_string(), "WP");
        assert_eq!(BasinCode::new("SP").as_str(), "SP");
    }
}
