use std::fmt;

use serde::Serialize;

/// Mean Earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// Geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Pos {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl Pos {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    /// True when both coordinates are finite and within the valid
    /// latitude/longitude ranges.
    pub fn is_valid(&self) -> bool {
        self.lat_deg.is_finite()
            && self.lon_deg.is_finite()
            && (-90.0..=90.0).contains(&self.lat_deg)
            && (-180.0..=180.0).contains(&self.lon_deg)
    }

    /// Great-circle distance to another position in nautical miles
    /// (haversine formula).
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.lat_deg.to_radians();
        let lat2 = other.lat_deg.to_radians();
        let dlat = (other.lat_deg - self.lat_deg).to_radians();
        let dlon = (other.lon_deg - self.lon_deg).to_radians();

        let a = (dlat / 2.0).sin().powi(2)
            + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_NM * a.sqrt().min(1.0).asin()
    }

    /// Cartesian coordinates on a sphere of [`EARTH_RADIUS_NM`], used for the
    /// KD-tree so nearest-neighbour queries follow the great circle.
    pub(crate) fn to_cartesian(&self) -> [f64; 3] {
        let lat = self.lat_deg.to_radians();
        let lon = self.lon_deg.to_radians();
        [
            EARTH_RADIUS_NM * lat.cos() * lon.cos(),
            EARTH_RADIUS_NM * lat.cos() * lon.sin(),
            EARTH_RADIUS_NM * lat.sin(),
        ]
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4},{:.4}", self.lat_deg, self.lon_deg)
    }
}

/// Straight-line chord length corresponding to a great-circle arc of
/// `arc_nm`, in the same unit. Chord distances are what squared-Euclidean
/// KD-tree queries measure on the Cartesian sphere.
pub(crate) fn chord_for_arc_nm(arc_nm: f64) -> f64 {
    2.0 * EARTH_RADIUS_NM * (arc_nm / (2.0 * EARTH_RADIUS_NM)).sin()
}

/// Latitude/longitude bounding box used to scope database queries and graph
/// population. Inflation past the ±180° meridian widens the box to the full
/// longitude band instead of wrapping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub south: f64,
    pub north: f64,
    pub west: f64,
    pub east: f64,
}

impl Rect {
    /// Smallest rect containing both positions, inflated by `margin_nm`.
    pub fn around(a: &Pos, b: &Pos, margin_nm: f64) -> Self {
        let south = a.lat_deg.min(b.lat_deg);
        let north = a.lat_deg.max(b.lat_deg);
        let west = a.lon_deg.min(b.lon_deg);
        let east = a.lon_deg.max(b.lon_deg);
        Self {
            south,
            north,
            west,
            east,
        }
        .inflated(margin_nm)
    }

    /// Rect centered on a position with a half-width of `radius_nm`.
    pub fn centered(pos: &Pos, radius_nm: f64) -> Self {
        Self {
            south: pos.lat_deg,
            north: pos.lat_deg,
            west: pos.lon_deg,
            east: pos.lon_deg,
        }
        .inflated(radius_nm)
    }

    /// Grow the rect by a nautical-mile margin on every side.
    pub fn inflated(&self, margin_nm: f64) -> Self {
        let dlat = margin_nm / 60.0;
        // One degree of longitude shrinks with latitude; use the widest
        // latitude of the box and keep the divisor away from zero near the
        // poles.
        let widest_lat = self.south.abs().max(self.north.abs()).to_radians();
        let dlon = margin_nm / (60.0 * widest_lat.cos().max(0.01));

        let mut rect = Self {
            south: (self.south - dlat).max(-90.0),
            north: (self.north + dlat).min(90.0),
            west: self.west - dlon,
            east: self.east + dlon,
        };
        if rect.west < -180.0 || rect.east > 180.0 {
            rect.west = -180.0;
            rect.east = 180.0;
        }
        rect
    }

    pub fn contains(&self, pos: &Pos) -> bool {
        pos.lat_deg >= self.south
            && pos.lat_deg <= self.north
            && pos.lon_deg >= self.west
            && pos.lon_deg <= self.east
    }

    pub fn contains_rect(&self, other: &Rect) -> bool {
        self.south <= other.south
            && self.north >= other.north
            && self.west <= other.west
            && self.east >= other.east
    }
}
