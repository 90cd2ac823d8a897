//! # Mosaic - raster map data catalog and preload engine
//!
//! Catalogs raster map frames (SRTM `.hgt` tiles out of the box), answers
//! spatial queries over them and keeps the frames a renderer needs loaded
//! while the view moves.
//!
//! ## Features
//!
//! - **Pluggable readers**: formats register in a priority-ordered
//!   [`TileReaderRegistry`] and are selected by probing
//! - **Composable catalogs**: [`mosaic::MosaicDatabase`] queries return lazy
//!   cursors, and decorators filter or rewrite them
//! - **Occlusion-aware preloading**: [`preload::PreloadCache`] only loads the
//!   frames that are actually visible in the region of interest
//! - **Elevation**: named [`elevation::ElevationSource`]s stacked by priority
//!
//! ## Quick Start
//!
//! ```ignore
//! use mosaic::mosaic::{index_directory, QueryParameters, MosaicDatabase};
//! use mosaic::{NullCallback, TileReaderRegistry};
//!
//! let registry = TileReaderRegistry::with_defaults();
//! let db = index_directory("/data/srtm".as_ref(), &registry, &mut NullCallback)?.build();
//! let cursor = db.query(&QueryParameters::default())?;
//! ```
//!
//! ## SRTM Data Format
//!
//! - **SRTM1**: 3601×3601 samples, 1 arc-second (~30m) resolution
//! - **SRTM3**: 1201×1201 samples, 3 arc-second (~90m) resolution
//!
//! Each sample is a 16-bit big-endian signed integer representing elevation in meters.
//! The special value -32768 indicates void (no data).

pub mod callback;
pub mod config;
pub mod elevation;
pub mod error;
pub mod geometry;
pub mod mosaic;
pub mod preload;
pub mod rpf;
pub mod spi;
pub mod tilereader;
pub mod uri;

// Re-export main types at crate root for convenience
pub use callback::{LoggingCallback, NullCallback, RequestCallback};
pub use config::{MosaicConfig, MosaicConfigBuilder};
pub use error::{MosaicError, Result};
pub use geometry::{BoundingBox, Coverage, GeoPoint};
pub use spi::{Provider, ServiceRegistry};
pub use tilereader::{TileReader, TileReaderRegistry, TileReaderSpi};
pub use uri::MapDataRef;
