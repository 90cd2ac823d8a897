//! Elevation sources composed from chunks.
//!
//! An [`ElevationSource`] is a named, immutable collection of
//! [`ElevationChunk`]s. Sources plug into an [`ElevationManager`], the same
//! generic registry that selects tile readers, so several sources can be
//! stacked by priority.
//!
//! ```
//! use mosaic::elevation::ElevationSourceBuilder;
//!
//! let source = ElevationSourceBuilder::new()
//!     .name("abc123")
//!     .chunks(Vec::new())
//!     .build()
//!     .unwrap();
//! assert_eq!(source.name(), "abc123");
//! assert!(source.bounds().is_none());
//! ```

pub mod hgt;

use std::sync::Arc;

use crate::error::{MosaicError, Result};
use crate::geometry::{BoundingBox, GeoPoint};
use crate::spi::{Provider, ServiceRegistry};

pub use hgt::{CacheStats, HgtChunk, HgtTileLoader, LazyHgtChunk};

/// A piece of elevation coverage with a single resolution.
pub trait ElevationChunk: Send + Sync {
    /// Identifier of the backing data, for diagnostics.
    fn uri(&self) -> &str;

    fn bounds(&self) -> BoundingBox;

    /// Nominal ground sample distance in metres.
    fn resolution(&self) -> f64;

    /// Elevation in metres at a point, or `None` outside the chunk or on
    /// void data.
    fn sample(&self, lat: f64, lon: f64) -> Option<f64>;
}

/// Shared handle to a chunk.
pub type ChunkRef = Arc<dyn ElevationChunk>;

/// Registry of elevation sources, highest priority consulted first.
pub type ElevationManager = ServiceRegistry<GeoPoint, f64>;

/// Filter for [`ElevationSource::query`]. Bounds are inclusive.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ElevationQuery {
    pub region: Option<BoundingBox>,
    pub min_resolution: Option<f64>,
    pub max_resolution: Option<f64>,
}

impl ElevationQuery {
    pub fn region(region: BoundingBox) -> Self {
        Self {
            region: Some(region),
            ..Default::default()
        }
    }

    pub fn with_resolution(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_resolution = min;
        self.max_resolution = max;
        self
    }

    fn matches(&self, chunk: &dyn ElevationChunk) -> bool {
        let resolution = chunk.resolution();
        self.min_resolution.map_or(true, |min| resolution >= min)
            && self.max_resolution.map_or(true, |max| resolution <= max)
            && self
                .region
                .map_or(true, |region| region.intersects(&chunk.bounds()))
    }
}

/// Named, immutable set of elevation chunks.
pub struct ElevationSource {
    name: String,
    /// Sorted finest first; ties keep the builder's order.
    chunks: Arc<[ChunkRef]>,
    bounds: Option<BoundingBox>,
}

impl ElevationSource {
    pub fn builder() -> ElevationSourceBuilder {
        ElevationSourceBuilder::new()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Union of the chunk bounds, `None` when there are no chunks.
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.bounds
    }

    /// All chunks, finest first.
    pub fn chunks(&self) -> &[ChunkRef] {
        &self.chunks
    }

    /// Chunks matching `query`, finest first.
    pub fn query(&self, query: &ElevationQuery) -> Vec<ChunkRef> {
        self.chunks
            .iter()
            .filter(|c| query.matches(c.as_ref()))
            .cloned()
            .collect()
    }

    /// Elevation at a point from the finest chunk with data there.
    pub fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        let point = GeoPoint::new(lat, lon);
        self.chunks
            .iter()
            .filter(|c| c.bounds().contains_point(point))
            .find_map(|c| c.sample(lat, lon))
    }
}

impl Provider<GeoPoint> for ElevationSource {
    type Output = f64;

    fn name(&self) -> &str {
        &self.name
    }

    fn is_supported(&self, point: &GeoPoint) -> bool {
        self.bounds.is_some_and(|b| b.contains_point(*point))
    }

    fn create(&self, point: &GeoPoint) -> Option<f64> {
        self.sample(point.lat, point.lon)
    }
}

/// Builder for [`ElevationSource`].
///
/// Both a name and a chunk collection must be supplied; the collection may
/// be empty.
#[derive(Default)]
pub struct ElevationSourceBuilder {
    name: Option<String>,
    chunks: Option<Vec<ChunkRef>>,
}

impl ElevationSourceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the chunk collection, replacing any added before.
    pub fn chunks(mut self, chunks: impl IntoIterator<Item = ChunkRef>) -> Self {
        self.chunks = Some(chunks.into_iter().collect());
        self
    }

    /// Append one chunk.
    pub fn chunk(mut self, chunk: ChunkRef) -> Self {
        self.chunks.get_or_insert_with(Vec::new).push(chunk);
        self
    }

    /// # Errors
    ///
    /// [`MosaicError::Validation`] if no name or no chunk collection was
    /// supplied.
    pub fn build(self) -> Result<ElevationSource> {
        let name = self.name.ok_or(MosaicError::Validation { field: "name" })?;
        let mut chunks = self.chunks.ok_or(MosaicError::Validation { field: "chunks" })?;

        chunks.sort_by(|a, b| a.resolution().total_cmp(&b.resolution()));
        let bounds = chunks.iter().map(|c| c.bounds()).reduce(|a, b| a.union(&b));

        Ok(ElevationSource {
            name,
            chunks: chunks.into(),
            bounds,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Chunk with a constant elevation, or void everywhere.
    struct Flat {
        bounds: BoundingBox,
        resolution: f64,
        value: Option<f64>,
    }

    impl ElevationChunk for Flat {
        fn uri(&self) -> &str {
            "flat"
        }

        fn bounds(&self) -> BoundingBox {
            self.bounds
        }

        fn resolution(&self) -> f64 {
            self.resolution
        }

        fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
            if self.bounds.contains_point(GeoPoint::new(lat, lon)) {
                self.value
            } else {
                None
            }
        }
    }

    fn flat(bounds: BoundingBox, resolution: f64, value: Option<f64>) -> ChunkRef {
        Arc::new(Flat {
            bounds,
            resolution,
            value,
        })
    }

    #[test]
    fn test_builder_requires_name() {
        let result = ElevationSourceBuilder::new().chunks(Vec::new()).build();
        assert!(matches!(
            result,
            Err(MosaicError::Validation { field: "name" })
        ));
    }

    #[test]
    fn test_builder_keeps_empty_name() {
        let source = ElevationSourceBuilder::new()
            .name("")
            .chunks(Vec::new())
            .build()
            .unwrap();
        assert_eq!(source.name(), "");
    }

    #[test]
    fn test_builder_requires_chunks() {
        let result = ElevationSourceBuilder::new().name("abc123").build();
        assert!(matches!(
            result,
            Err(MosaicError::Validation { field: "chunks" })
        ));
    }

    #[test]
    fn test_builder_accepts_empty_chunks() {
        let source = ElevationSource::builder()
            .name("abc123")
            .chunks(Vec::new())
            .build()
            .unwrap();

        assert_eq!(source.name(), "abc123");
        assert!(source.chunks().is_empty());
        assert_eq!(source.sample(0.0, 0.0), None);
    }

    #[test]
    fn test_query_orders_finest_first() {
        let source = ElevationSource::builder()
            .name("terrain")
            .chunk(flat(BoundingBox::tile(0, 0), 90.0, Some(1.0)))
            .chunk(flat(BoundingBox::tile(0, 0), 30.0, Some(2.0)))
            .chunk(flat(BoundingBox::tile(5, 5), 10.0, Some(3.0)))
            .build()
            .unwrap();

        let chunks = source.query(&ElevationQuery::region(BoundingBox::new(0.2, 0.2, 0.8, 0.8)));
        let resolutions: Vec<f64> = chunks.iter().map(|c| c.resolution()).collect();
        assert_eq!(resolutions, vec![30.0, 90.0]);

        let coarse = source.query(&ElevationQuery::default().with_resolution(Some(90.0), None));
        assert_eq!(coarse.len(), 1);

        assert_eq!(source.bounds(), Some(BoundingBox::new(0.0, 0.0, 6.0, 6.0)));
    }

    #[test]
    fn test_sample_falls_back_past_voids() {
        let source = ElevationSource::builder()
            .name("terrain")
            .chunk(flat(BoundingBox::tile(0, 0), 30.0, None))
            .chunk(flat(BoundingBox::tile(0, 0), 90.0, Some(42.0)))
            .build()
            .unwrap();

        assert_eq!(source.sample(0.5, 0.5), Some(42.0));
        assert_eq!(source.sample(2.0, 2.0), None);
    }

    #[test]
    fn test_manager_consults_sources_by_priority() {
        let coarse = ElevationSource::builder()
            .name("coarse")
            .chunk(flat(BoundingBox::new(-10.0, -10.0, 10.0, 10.0), 900.0, Some(1.0)))
            .build()
            .unwrap();
        let fine = ElevationSource::builder()
            .name("fine")
            .chunk(flat(BoundingBox::tile(0, 0), 30.0, Some(2.0)))
            .build()
            .unwrap();

        let manager = ElevationManager::new();
        manager.register(Arc::new(coarse), 0);
        manager.register(Arc::new(fine), 10);

        assert_eq!(manager.create(&GeoPoint::new(0.5, 0.5)), Some(2.0));
        assert_eq!(manager.create(&GeoPoint::new(5.0, 5.0)), Some(1.0));
        assert_eq!(manager.create(&GeoPoint::new(50.0, 5.0)), None);
        assert_eq!(
            manager.create_with_hint(&GeoPoint::new(0.5, 0.5), Some("coarse")),
            Some(1.0)
        );
    }
}
