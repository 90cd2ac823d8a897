//! Frame catalogs and queries.
//!
//! A [`MosaicDatabase`] catalogs the raster frames available on disk and
//! answers spatial/attribute queries with a lazy [`FrameCursor`]. Catalogs
//! are composable: the wrappers in [`decorator`] transform the results of an
//! inner catalog without re-running its query.
//!
//! # Example
//!
//! ```
//! use mosaic::geometry::BoundingBox;
//! use mosaic::mosaic::{collect_frames, Frame, MosaicDatabase, MosaicDatabaseBuilder, QueryOrder, QueryParameters};
//!
//! let mut builder = MosaicDatabaseBuilder::new();
//! builder
//!     .insert_frame(Frame::new("N35E138.hgt", "hgt", BoundingBox::tile(35, 138), 90.0, 1201, 1201))
//!     .unwrap();
//! let db = builder.build();
//!
//! let params = QueryParameters::builder()
//!     .region(BoundingBox::new(35.2, 138.2, 35.8, 138.8))
//!     .order(QueryOrder::ResolutionAsc)
//!     .build();
//! let frames = collect_frames(db.query(&params).unwrap()).unwrap();
//! assert_eq!(frames.len(), 1);
//! ```

pub mod cursor;
pub mod decorator;
pub mod index;
pub mod memory;

use std::cmp::Ordering;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::BoundingBox;

pub use cursor::{FilterCursor, FramePredicate, MultiplexingCursor, VecCursor};
pub use decorator::{FilteringDatabase, PathResolvingDatabase};
pub use index::{index_directory, index_directory_with, IndexOptions};
pub use memory::{MemoryMosaicDatabase, MosaicDatabaseBuilder};

/// One raster frame known to a catalog. Identity is the path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Path or URI of the frame, possibly relative to the catalog.
    pub path: String,
    /// Name of the format (tile reader) that serves the frame.
    pub source: String,
    /// Geographic footprint.
    pub bounds: BoundingBox,
    /// Nominal ground sample distance in metres per pixel.
    pub resolution: f64,
    pub width: usize,
    pub height: usize,
}

impl Frame {
    pub fn new(
        path: impl Into<String>,
        source: impl Into<String>,
        bounds: BoundingBox,
        resolution: f64,
        width: usize,
        height: usize,
    ) -> Self {
        Self {
            path: path.into(),
            source: source.into(),
            bounds,
            resolution,
            width,
            height,
        }
    }
}

/// Result ordering requested from a catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryOrder {
    /// Catalog order: sources by name, frames in insertion order.
    #[default]
    Natural,
    /// Finest resolution first.
    ResolutionAsc,
    /// Coarsest resolution first.
    ResolutionDesc,
}

impl QueryOrder {
    /// Compare two frames under this ordering. `Natural` treats every pair
    /// as equal so stable sorts keep catalog order.
    pub fn compare(&self, a: &Frame, b: &Frame) -> Ordering {
        match self {
            QueryOrder::Natural => Ordering::Equal,
            QueryOrder::ResolutionAsc => a
                .resolution
                .total_cmp(&b.resolution)
                .then_with(|| a.source.cmp(&b.source)),
            QueryOrder::ResolutionDesc => b
                .resolution
                .total_cmp(&a.resolution)
                .then_with(|| a.source.cmp(&b.source)),
        }
    }
}

/// Immutable query description. Build with [`QueryParameters::builder`].
///
/// Every filter is optional; an empty parameter set matches every frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParameters {
    region: Option<BoundingBox>,
    min_resolution: Option<f64>,
    max_resolution: Option<f64>,
    sources: Option<Vec<String>>,
    path: Option<String>,
    order: QueryOrder,
}

impl QueryParameters {
    pub fn builder() -> QueryParametersBuilder {
        QueryParametersBuilder::default()
    }

    pub fn region(&self) -> Option<&BoundingBox> {
        self.region.as_ref()
    }

    pub fn min_resolution(&self) -> Option<f64> {
        self.min_resolution
    }

    pub fn max_resolution(&self) -> Option<f64> {
        self.max_resolution
    }

    pub fn sources(&self) -> Option<&[String]> {
        self.sources.as_deref()
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn order(&self) -> QueryOrder {
        self.order
    }

    /// Returns `true` if `source` passes the source filter.
    pub fn accepts_source(&self, source: &str) -> bool {
        self.sources
            .as_ref()
            .map_or(true, |s| s.iter().any(|name| name == source))
    }

    /// Returns `true` if `frame` passes every filter.
    ///
    /// Regions match frames that touch them, edges included. Resolution
    /// bounds are inclusive.
    pub fn matches(&self, frame: &Frame) -> bool {
        if !self.accepts_source(&frame.source) {
            return false;
        }
        if let Some(path) = &self.path {
            if &frame.path != path {
                return false;
            }
        }
        if let Some(min) = self.min_resolution {
            if frame.resolution < min {
                return false;
            }
        }
        if let Some(max) = self.max_resolution {
            if frame.resolution > max {
                return false;
            }
        }
        self.region
            .as_ref()
            .map_or(true, |region| region.intersects(&frame.bounds))
    }
}

/// Builder for [`QueryParameters`].
#[derive(Debug, Clone, Default)]
pub struct QueryParametersBuilder {
    params: QueryParameters,
}

impl QueryParametersBuilder {
    /// Only frames intersecting `region`.
    pub fn region(mut self, region: BoundingBox) -> Self {
        self.params.region = Some(region);
        self
    }

    /// Only frames with a resolution of at least `metres`.
    pub fn min_resolution(mut self, metres: f64) -> Self {
        self.params.min_resolution = Some(metres);
        self
    }

    /// Only frames with a resolution of at most `metres`.
    pub fn max_resolution(mut self, metres: f64) -> Self {
        self.params.max_resolution = Some(metres);
        self
    }

    /// Restrict results to `source`. May be called repeatedly.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.params
            .sources
            .get_or_insert_with(Vec::new)
            .push(source.into());
        self
    }

    /// Only the frame with exactly this path.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.params.path = Some(path.into());
        self
    }

    pub fn order(mut self, order: QueryOrder) -> Self {
        self.params.order = order;
        self
    }

    pub fn build(self) -> QueryParameters {
        self.params
    }
}

/// Aggregate extent of a set of frames.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceCoverage {
    /// Union of the frames' bounds.
    pub bounds: BoundingBox,
    /// Finest resolution in metres.
    pub min_resolution: f64,
    /// Coarsest resolution in metres.
    pub max_resolution: f64,
    pub frame_count: usize,
}

impl SourceCoverage {
    pub fn of(frame: &Frame) -> Self {
        Self {
            bounds: frame.bounds,
            min_resolution: frame.resolution,
            max_resolution: frame.resolution,
            frame_count: 1,
        }
    }

    pub fn merge(&self, other: &SourceCoverage) -> SourceCoverage {
        SourceCoverage {
            bounds: self.bounds.union(&other.bounds),
            min_resolution: self.min_resolution.min(other.min_resolution),
            max_resolution: self.max_resolution.max(other.max_resolution),
            frame_count: self.frame_count + other.frame_count,
        }
    }
}

/// Single-pass, closeable iterator over query results.
///
/// A fresh cursor is positioned before the first frame: call
/// [`advance`](Self::advance) before reading [`frame`](Self::frame).
/// Cursors release their resources on [`close`](Self::close) or on drop.
pub trait FrameCursor: Send {
    /// Move to the next frame. Returns `false` once exhausted.
    ///
    /// Fails with [`MosaicError::CursorClosed`](crate::MosaicError::CursorClosed)
    /// after [`close`](Self::close).
    fn advance(&mut self) -> Result<bool>;

    /// The current frame, or `None` before the first advance, after
    /// exhaustion, or once closed.
    fn frame(&self) -> Option<&Frame>;

    /// Release the cursor. Idempotent.
    fn close(&mut self);

    fn is_closed(&self) -> bool;
}

/// Drain a cursor into a vector and close it.
pub fn collect_frames(mut cursor: Box<dyn FrameCursor>) -> Result<Vec<Frame>> {
    let mut frames = Vec::new();
    while cursor.advance()? {
        if let Some(frame) = cursor.frame() {
            frames.push(frame.clone());
        }
    }
    cursor.close();
    Ok(frames)
}

/// A queryable catalog of frames.
pub trait MosaicDatabase: Send {
    /// Short name of the catalog implementation.
    fn type_name(&self) -> &str;

    /// Load the catalog stored at `path`.
    fn open(&mut self, path: &Path) -> Result<()>;

    /// Release the catalog. Idempotent.
    fn close(&mut self);

    fn is_open(&self) -> bool;

    /// Names of the sources present, sorted.
    fn sources(&self) -> Result<Vec<String>>;

    /// Aggregate coverage of every frame, `None` for an empty catalog.
    fn coverage(&self) -> Result<Option<SourceCoverage>>;

    /// Coverage of one source, `None` if the source is absent.
    fn coverage_for(&self, source: &str) -> Result<Option<SourceCoverage>>;

    /// Run a query. An empty result is an exhausted cursor, not an error.
    fn query(&self, params: &QueryParameters) -> Result<Box<dyn FrameCursor>>;
}
