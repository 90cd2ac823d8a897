//! Tile readers and format selection.
//!
//! A [`TileReader`] is the single codec boundary for one on-disk format: it
//! reports the raster's geometry and decodes its samples on demand. Each
//! format is plugged in through a [`TileReaderSpi`], and a
//! [`TileReaderRegistry`] picks the SPI for a URI.
//!
//! Selection is two-phase: [`TileReaderSpi::is_supported`] is a cheap sniff
//! (extension or header), and only SPIs that pass it get their potentially
//! expensive [`TileReaderSpi::create`] called.
//!
//! ```ignore
//! use mosaic::tilereader::{ReaderOptions, TileReaderRegistry};
//!
//! let registry = TileReaderRegistry::with_defaults();
//! if let Some(reader) = registry.open("/data/N35E138.hgt", &ReaderOptions::default()) {
//!     println!("{} {}x{}", reader.format(), reader.width(), reader.height());
//! }
//! ```

pub mod hgt;

use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::geometry::BoundingBox;
use crate::spi::{Provider, ProviderRef, ServiceRegistry};

pub use hgt::{HgtRaster, HgtReader, HgtSpi, HgtZipSpi, SrtmResolution, VOID_VALUE};

/// Decoded sample data.
#[derive(Debug, Clone, PartialEq)]
pub enum Pixels {
    /// Elevation samples in metres, row-major from the north-west corner.
    Elevation(Vec<i16>),
    /// Opaque bytes handed to the renderer untouched.
    Bytes(Vec<u8>),
}

/// Output of [`TileReader::decode`].
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedTile {
    pub width: usize,
    pub height: usize,
    pub pixels: Pixels,
}

/// Hints passed to [`TileReaderSpi::create`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReaderOptions {
    /// Decode at most this many samples per side, decimating if needed.
    pub preferred_tile_size: Option<usize>,
}

/// Reader for one raster.
pub trait TileReader: Send + Sync {
    /// URI the reader was opened from.
    fn uri(&self) -> &str;

    /// Name of the SPI that produced this reader.
    fn format(&self) -> &str;

    /// Full-resolution width in samples.
    fn width(&self) -> usize;

    /// Full-resolution height in samples.
    fn height(&self) -> usize;

    /// Geographic footprint.
    fn bounds(&self) -> BoundingBox;

    /// Nominal ground sample distance in metres.
    fn resolution(&self) -> f64;

    /// Decode the raster's samples.
    fn decode(&self) -> Result<DecodedTile>;
}

/// Format plug-in for a [`TileReaderRegistry`].
pub trait TileReaderSpi: Send + Sync {
    /// Unique lowercase short name, e.g. `"hgt"`.
    fn name(&self) -> &str;

    /// Registration priority; higher is tried first.
    fn priority(&self) -> i32 {
        0
    }

    /// Cheap check whether `uri` looks like this format.
    fn is_supported(&self, uri: &str) -> bool;

    /// Open `uri`. Returns `None` on any failure.
    fn create(&self, uri: &str, options: &ReaderOptions) -> Option<Box<dyn TileReader>>;
}

/// Request routed through the registry.
#[derive(Debug, Clone)]
pub struct OpenRequest {
    pub uri: String,
    pub options: ReaderOptions,
}

impl<S: TileReaderSpi> Provider<OpenRequest> for S {
    type Output = Box<dyn TileReader>;

    fn name(&self) -> &str {
        TileReaderSpi::name(self)
    }

    fn is_supported(&self, request: &OpenRequest) -> bool {
        TileReaderSpi::is_supported(self, &request.uri)
    }

    fn create(&self, request: &OpenRequest) -> Option<Box<dyn TileReader>> {
        TileReaderSpi::create(self, &request.uri, &request.options)
    }
}

/// SPI that serves another SPI's readers under a different name.
///
/// The delegate is held directly rather than looked up in a registry, so an
/// alias can never resolve back to itself.
pub struct AliasSpi {
    name: String,
    priority: i32,
    delegate: Arc<dyn TileReaderSpi>,
}

impl AliasSpi {
    pub fn new(name: impl Into<String>, delegate: Arc<dyn TileReaderSpi>) -> Self {
        Self {
            name: name.into(),
            priority: delegate.priority(),
            delegate,
        }
    }

    /// Override the priority inherited from the delegate.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl TileReaderSpi for AliasSpi {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    fn is_supported(&self, uri: &str) -> bool {
        self.delegate.is_supported(uri)
    }

    fn create(&self, uri: &str, options: &ReaderOptions) -> Option<Box<dyn TileReader>> {
        self.delegate.create(uri, options)
    }
}

/// Registry of tile reader formats.
#[derive(Default)]
pub struct TileReaderRegistry {
    registry: ServiceRegistry<OpenRequest, Box<dyn TileReader>>,
}

impl TileReaderRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in formats: `hgt`, `hgtzip` and the `srtm`
    /// alias of `hgt` (reachable only through [`open_as`](Self::open_as)).
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        let hgt = Arc::new(HgtSpi);
        registry.register(Arc::clone(&hgt));
        registry.register(Arc::new(HgtZipSpi));
        registry.register(Arc::new(AliasSpi::new("srtm", hgt).with_priority(-1)));
        registry
    }

    /// Register a format at its own [`TileReaderSpi::priority`].
    pub fn register<S: TileReaderSpi + 'static>(&self, spi: Arc<S>) -> bool {
        let priority = spi.priority();
        self.registry.register(spi, priority)
    }

    /// Remove a previously registered format.
    pub fn unregister<S: TileReaderSpi + 'static>(&self, spi: &Arc<S>) -> bool {
        let provider: ProviderRef<OpenRequest, Box<dyn TileReader>> = spi.clone();
        self.registry.unregister(&provider)
    }

    /// Open `uri` with the highest-priority format that accepts it.
    pub fn open(&self, uri: &str, options: &ReaderOptions) -> Option<Box<dyn TileReader>> {
        self.open_with_hint(uri, None, options)
    }

    /// Open `uri` with the named format only.
    pub fn open_as(
        &self,
        uri: &str,
        format: &str,
        options: &ReaderOptions,
    ) -> Option<Box<dyn TileReader>> {
        self.open_with_hint(uri, Some(format), options)
    }

    fn open_with_hint(
        &self,
        uri: &str,
        hint: Option<&str>,
        options: &ReaderOptions,
    ) -> Option<Box<dyn TileReader>> {
        let request = OpenRequest {
            uri: uri.to_string(),
            options: options.clone(),
        };
        let reader = self.registry.create_with_hint(&request, hint);
        if reader.is_none() {
            debug!(uri, format = ?hint, "No tile reader accepted URI");
        }
        reader
    }

    /// Returns `true` if any registered format sniffs `uri` as its own.
    pub fn is_supported(&self, uri: &str) -> bool {
        !self.formats_for(uri).is_empty()
    }

    /// Names of the formats whose sniff accepts `uri`, in selection order.
    pub fn formats_for(&self, uri: &str) -> Vec<String> {
        self.registry.supporting(&OpenRequest {
            uri: uri.to_string(),
            options: ReaderOptions::default(),
        })
    }

    /// Names of the registered formats in selection order.
    pub fn formats(&self) -> Vec<String> {
        self.registry
            .providers()
            .iter()
            .map(|(p, _)| p.name().to_string())
            .collect()
    }
}
