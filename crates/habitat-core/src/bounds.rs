//! Geographic bounding boxes and cell addressing.
//! All coordinate math uses f64 for precision.

use serde::{Deserialize, Serialize};

use crate::error::{HabitatError, Result};

/// Kilometres per degree of latitude (and of longitude at the equator).
pub const KM_PER_DEGREE: f64 = 111.32;

/// A point in geographic coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    /// Latitude in degrees, -90 to +90.
    pub lat: f64,
    /// Longitude in degrees, -180 to +180.
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Analysis region `(west, south, east, north)` in decimal degrees.
///
/// Construct through [`Bounds::new`]; invalid ranges are rejected, never swapped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl Bounds {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self> {
        let b = Self { west, south, east, north };
        b.validate()?;
        Ok(b)
    }

    /// Re-check the invariants, e.g. after deserializing.
    pub fn validate(&self) -> Result<()> {
        let fail = |reason| {
            Err(HabitatError::InvalidBounds {
                west: self.west,
                south: self.south,
                east: self.east,
                north: self.north,
                reason,
            })
        };
        if ![self.west, self.south, self.east, self.north].iter().all(|v| v.is_finite()) {
            return fail("coordinates must be finite");
        }
        if self.west >= self.east {
            return fail("west must be less than east");
        }
        if self.south >= self.north {
            return fail("south must be less than north");
        }
        if self.south < -90.0 || self.north > 90.0 {
            return fail("latitude outside [-90, 90]");
        }
        if self.west < -180.0 || self.east > 180.0 {
            return fail("longitude outside [-180, 180]");
        }
        Ok(())
    }

    pub fn width_deg(&self) -> f64 {
        self.east - self.west
    }

    pub fn height_deg(&self) -> f64 {
        self.north - self.south
    }

    pub fn mid_lat(&self) -> f64 {
        (self.south + self.north) / 2.0
    }

    /// Centre of cell `(row, col)` in a `rows × cols` grid. Row 0 is the northern edge.
    pub fn cell_center(&self, row: usize, col: usize, rows: usize, cols: usize) -> LatLon {
        let lat = self.north - (row as f64 + 0.5) * self.height_deg() / rows as f64;
        let lon = self.west + (col as f64 + 0.5) * self.width_deg() / cols as f64;
        LatLon::new(lat, lon)
    }

    /// Inverse of [`Bounds::cell_center`]: the cell containing `ll`, or `None`
    /// if the point lies outside the box.
    pub fn cell_of(&self, ll: LatLon, rows: usize, cols: usize) -> Option<(usize, usize)> {
        if rows == 0 || cols == 0 {
            return None;
        }
        if ll.lat < self.south || ll.lat > self.north || ll.lon < self.west || ll.lon > self.east {
            return None;
        }
        let fr = (self.north - ll.lat) / self.height_deg() * rows as f64;
        let fc = (ll.lon - self.west) / self.width_deg() * cols as f64;
        let row = (fr.floor() as usize).min(rows - 1);
        let col = (fc.floor() as usize).min(cols - 1);
        Some((row, col))
    }

    /// Approximate `(dy_km, dx_km)` of one cell, using the box's mid latitude
    /// for the longitudinal spacing.
    pub fn cell_size_km(&self, rows: usize, cols: usize) -> (f64, f64) {
        let dy = self.height_deg() / rows.max(1) as f64 * KM_PER_DEGREE;
        let dx = self.width_deg() / cols.max(1) as f64 * KM_PER_DEGREE * self.mid_lat().to_radians().cos();
        (dy, dx)
    }
}
