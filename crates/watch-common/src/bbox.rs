//! Geographic bounding box used for catalog intersection queries.

use serde::{Deserialize, Serialize};

/// Kilometers per degree of latitude on the spherical approximation used for
/// bbox sizing. Longitude degrees shrink by the cosine of latitude.
pub const KM_PER_DEGREE: f64 = 111.132;

/// A geographic bounding box in degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    /// Create a bounding box from edge coordinates in degrees.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Build a square box centered on a point, spanning `half_km` kilometers
    /// from the center to each edge. The longitude delta is widened by the
    /// cosine of the center latitude so both extents cover the same ground
    /// distance.
    pub fn square_around(lat: f64, lon: f64, half_km: f64) -> Self {
        let lat_delta = half_km / KM_PER_DEGREE;
        let lon_delta = half_km / (KM_PER_DEGREE * lat.to_radians().cos());

        Self::new(
            lon - lon_delta,
            lat - lat_delta,
            lon + lon_delta,
            lat + lat_delta,
        )
    }

    /// Width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Center point as (latitude, longitude).
    pub fn center(&self) -> (f64, f64) {
        (
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    /// Opposing corner points in longitude/latitude order, lower-left then
    /// upper-right. This is the shape catalog intersection queries expect.
    pub fn corner_points(&self) -> [[f64; 2]; 2] {
        [[self.west, self.south], [self.east, self.north]]
    }

    /// True when all edges are finite, in range, and properly ordered.
    pub fn is_valid(&self) -> bool {
        self.west.is_finite()
            && self.south.is_finite()
            && self.east.is_finite()
            && self.north.is_finite()
            && self.west >= -180.0
            && self.east <= 180.0
            && self.south >= -90.0
            && self.north <= 90.0
            && self.west < self.east
            && self.south < self.north
    }
}
