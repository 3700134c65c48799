//! Compiled basin geometry with a single containment test.

use geo::{Contains, LineString, Point, Polygon};
use tc_hazard_basin_models::{BasinCode, BasinRegion};

use crate::BasinError;

/// A basin region ready for point tests.
///
/// Callers only use [`BasinShape::contains`]; the polygon/box distinction
/// stays inside this type.
#[derive(Debug, Clone)]
pub enum BasinShape {
    /// Polygon; boundary points are outside.
    Polygon(Polygon<f64>),
    /// Box with exclusive bounds, possibly wrapping the antimeridian.
    BoundingBox {
        /// Western bound.
        lon_min: f64,
        /// Eastern bound.
        lon_max: f64,
        /// Southern bound.
        lat_min: f64,
        /// Northern bound.
        lat_max: f64,
    },
}

impl BasinShape {
    /// Compiles a configured region.
    ///
    /// # Errors
    ///
    /// Returns [`BasinError::InvalidRegion`] for a polygon with fewer than
    /// three vertices or non-finite coordinates, or a box whose bounds are
    /// non-finite, whose `lat_min >= lat_max`, or whose `lon_min == lon_max`.
    pub fn compile(code: &BasinCode, region: &BasinRegion) -> Result<Self, BasinError> {
        let invalid = |message: &str| BasinError::InvalidRegion {
            code: code.clone(),
            message: message.to_string(),
        };

        match region {
            BasinRegion::Polygon { ring } => {
                if ring.len() < 3 {
                    return Err(invalid("polygon needs at least three vertices"));
                }
                if ring.iter().flatten().any(|c| !c.is_finite()) {
                    return Err(invalid("polygon has non-finite coordinates"));
                }
                let exterior: LineString<f64> =
                    ring.iter().map(|[lon, lat]| (*lon, *lat)).collect::<Vec<_>>().into();
                Ok(Self::Polygon(Polygon::new(exterior, vec![])))
            }
            &BasinRegion::BoundingBox {
                lon_min,
                lon_max,
                lat_min,
                lat_max,
            } => {
                if ![lon_min, lon_max, lat_min, lat_max]
                    .iter()
                    .all(|v| v.is_finite())
                {
                    return Err(invalid("box has non-finite bounds"));
                }
                if lat_min >= lat_max {
                    return Err(invalid("box needs lat_min < lat_max"));
                }
                if lon_min == lon_max {
                    return Err(invalid("box has zero longitude width"));
                }
                Ok(Self::BoundingBox {
                    lon_min,
                    lon_max,
                    lat_min,
                    lat_max,
                })
            }
        }
    }

    /// Whether `(lon, lat)` lies strictly inside the region.
    ///
    /// For a non-wrapping box this is `lon_min < lon < lon_max` and
    /// `lat_min < lat < lat_max`. For a wrapping box (`lon_max < lon_min`)
    /// the longitude test becomes `lon > lon_min || lon < lon_max`.
    #[must_use]
    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        match *self {
            Self::Polygon(ref polygon) => polygon.contains(&Point::new(lon, lat)),
            Self::BoundingBox {
                lon_min,
                lon_max,
                lat_min,
                lat_max,
            } => {
                let lat_ok = lat > lat_min && lat < lat_max;
                let lon_ok = if lon_max < lon_min {
                    lon > lon_min || lon < lon_max
                } else {
                    lon > lon_min && lon < lon_max
                };
                lat_ok && lon_ok
            }
        }
    }

    /// Whether this box crosses the antimeridian.
    #[must_use]
    pub fn wraps_antimeridian(&self) -> bool {
        matches!(*self, Self::BoundingBox { lon_min, lon_max, .. } if lon_max < lon_min)
    }
}
