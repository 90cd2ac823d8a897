//! Geographic rectangles and accumulated coverage.
//!
//! Coordinates are decimal degrees (WGS84). All boxes are axis-aligned in
//! latitude/longitude; frames whose footprints are quadrilaterals are
//! represented by their minimum bounding rectangle.

use serde::{Deserialize, Serialize};

/// A latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    /// Latitude in decimal degrees.
    pub lat: f64,
    /// Longitude in decimal degrees.
    pub lon: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A geographic bounding box.
///
/// Coordinates are in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude (southern boundary).
    pub min_lat: f64,
    /// Minimum longitude (western boundary).
    pub min_lon: f64,
    /// Maximum latitude (northern boundary).
    pub max_lat: f64,
    /// Maximum longitude (eastern boundary).
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create a new bounding box.
    ///
    /// # Arguments
    ///
    /// * `min_lat` - Southern boundary latitude
    /// * `min_lon` - Western boundary longitude
    /// * `max_lat` - Northern boundary latitude
    /// * `max_lon` - Eastern boundary longitude
    pub fn new(min_lat: f64, min_lon: f64, max_lat: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            min_lon,
            max_lat,
            max_lon,
        }
    }

    /// The 1°×1° cell whose southwest corner is `(lat, lon)`.
    pub fn tile(lat: i32, lon: i32) -> Self {
        Self::new(lat as f64, lon as f64, (lat + 1) as f64, (lon + 1) as f64)
    }

    /// Returns `true` if every coordinate is finite and min ≤ max on both axes.
    pub fn is_valid(&self) -> bool {
        [self.min_lat, self.min_lon, self.max_lat, self.max_lon]
            .iter()
            .all(|v| v.is_finite())
            && self.min_lat <= self.max_lat
            && self.min_lon <= self.max_lon
    }

    /// Returns `true` if the box encloses no area.
    pub fn is_degenerate(&self) -> bool {
        !(self.min_lat < self.max_lat && self.min_lon < self.max_lon)
    }

    /// Check whether the two boxes share any point, edges included.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.max_lat
            && self.max_lat >= other.min_lat
            && self.min_lon <= other.max_lon
            && self.max_lon >= other.min_lon
    }

    /// Check whether `other` lies entirely inside this box.
    pub fn contains(&self, other: &BoundingBox) -> bool {
        self.min_lat <= other.min_lat
            && self.max_lat >= other.max_lat
            && self.min_lon <= other.min_lon
            && self.max_lon >= other.max_lon
    }

    /// Check whether a point lies inside this box, edges included.
    pub fn contains_point(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lon..=self.max_lon).contains(&point.lon)
    }

    /// The overlapping region of both boxes, if any.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }
        Some(BoundingBox::new(
            self.min_lat.max(other.min_lat),
            self.min_lon.max(other.min_lon),
            self.max_lat.min(other.max_lat),
            self.max_lon.min(other.max_lon),
        ))
    }

    /// Smallest box covering both boxes.
    pub fn union(&self, other: &BoundingBox) -> BoundingBox {
        BoundingBox::new(
            self.min_lat.min(other.min_lat),
            self.min_lon.min(other.min_lon),
            self.max_lat.max(other.max_lat),
            self.max_lon.max(other.max_lon),
        )
    }

    /// Check if this bounding box overlaps with a 1°×1° tile.
    ///
    /// A tile at `(tile_lat, tile_lon)` covers the area
    /// `[tile_lat, tile_lat+1) × [tile_lon, tile_lon+1)`.
    pub fn overlaps_tile(&self, tile_lat: i32, tile_lon: i32) -> bool {
        let tile_max_lat = tile_lat + 1;
        let tile_max_lon = tile_lon + 1;

        self.min_lat < tile_max_lat as f64
            && self.max_lat > tile_lat as f64
            && self.min_lon < tile_max_lon as f64
            && self.max_lon > tile_lon as f64
    }

    /// Parts of `self` not covered by `other`, as up to four disjoint boxes.
    fn subtract(&self, other: &BoundingBox) -> Vec<BoundingBox> {
        let overlaps = self.min_lat < other.max_lat
            && self.max_lat > other.min_lat
            && self.min_lon < other.max_lon
            && self.max_lon > other.min_lon;
        if !overlaps {
            return vec![*self];
        }

        let mut pieces = Vec::with_capacity(4);

        // West and east strips span the full latitude range
        if other.min_lon > self.min_lon {
            pieces.push(BoundingBox::new(
                self.min_lat,
                self.min_lon,
                self.max_lat,
                other.min_lon,
            ));
        }
        if other.max_lon < self.max_lon {
            pieces.push(BoundingBox::new(
                self.min_lat,
                other.max_lon,
                self.max_lat,
                self.max_lon,
            ));
        }

        let mid_min_lon = self.min_lon.max(other.min_lon);
        let mid_max_lon = self.max_lon.min(other.max_lon);
        if other.min_lat > self.min_lat {
            pieces.push(BoundingBox::new(
                self.min_lat,
                mid_min_lon,
                other.min_lat,
                mid_max_lon,
            ));
        }
        if other.max_lat < self.max_lat {
            pieces.push(BoundingBox::new(
                other.max_lat,
                mid_min_lon,
                self.max_lat,
                mid_max_lon,
            ));
        }

        pieces.retain(|p| !p.is_degenerate());
        pieces
    }
}

/// Union of rectangles accumulated during an occlusion pass.
///
/// Containment is exact for axis-aligned boxes: a box is covered when
/// subtracting every accumulated rectangle from it leaves nothing.
#[derive(Debug, Clone, Default)]
pub struct Coverage {
    parts: Vec<BoundingBox>,
}

impl Coverage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rectangle to the covered area. Degenerate boxes add nothing.
    pub fn add(&mut self, bounds: BoundingBox) {
        if !bounds.is_degenerate() {
            self.parts.push(bounds);
        }
    }

    /// Returns `true` if `bounds` lies entirely within the covered area.
    pub fn contains(&self, bounds: &BoundingBox) -> bool {
        if self.parts.is_empty() {
            return false;
        }
        if bounds.is_degenerate() {
            return self.parts.iter().any(|p| p.contains(bounds));
        }

        let mut remaining = vec![*bounds];
        for part in &self.parts {
            remaining = remaining.iter().flat_map(|r| r.subtract(part)).collect();
            if remaining.is_empty() {
                return true;
            }
        }
        false
    }

    /// Bounding rectangle of everything covered, if anything is.
    pub fn extent(&self) -> Option<BoundingBox> {
        self.parts.iter().copied().reduce(|a, b| a.union(&b))
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    pub fn clear(&mut self) {
        self.parts.clear();
    }
}
