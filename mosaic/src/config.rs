//! Runtime configuration shared by the library entry points and the CLI.

use std::path::{Path, PathBuf};

use crate::error::{MosaicError, Result};
use crate::mosaic::IndexOptions;
use crate::tilereader::ReaderOptions;

/// File name of the catalog written inside the data directory by default.
pub const DEFAULT_INDEX_NAME: &str = "mosaic.json";

/// Default number of elevation tiles kept in memory.
pub const DEFAULT_CACHE_SIZE: u64 = 100;

/// Resolved configuration.
///
/// Create one with [`MosaicConfigBuilder`] or [`MosaicConfig::from_env`].
#[derive(Debug, Clone, PartialEq)]
pub struct MosaicConfig {
    data_dir: PathBuf,
    cache_size: u64,
    index_path: PathBuf,
    relative_paths: bool,
}

impl MosaicConfig {
    /// Read configuration from `MOSAIC_*` environment variables.
    ///
    /// - `MOSAIC_DATA_DIR` (required): directory holding the tiles
    /// - `MOSAIC_CACHE_SIZE` (optional, default 100): elevation tiles to cache
    /// - `MOSAIC_INDEX` (optional, default `<data_dir>/mosaic.json`)
    /// - `MOSAIC_RELATIVE_PATHS` (optional, default `true`): store catalog
    ///   paths relative to the data directory
    ///
    /// # Errors
    ///
    /// Returns an error if `MOSAIC_DATA_DIR` is not set.
    pub fn from_env() -> Result<Self> {
        Ok(MosaicConfigBuilder::from_env()?.build())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn cache_size(&self) -> u64 {
        self.cache_size
    }

    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    pub fn relative_paths(&self) -> bool {
        self.relative_paths
    }

    pub fn index_options(&self) -> IndexOptions {
        IndexOptions {
            relative_paths: self.relative_paths,
            reader_options: ReaderOptions::default(),
        }
    }
}

/// Builder for [`MosaicConfig`].
///
/// # Example
///
/// ```
/// use mosaic::config::MosaicConfigBuilder;
///
/// let config = MosaicConfigBuilder::new("/data/srtm")
///     .cache_size(50)
///     .build();
/// assert_eq!(config.index_path(), std::path::Path::new("/data/srtm/mosaic.json"));
/// ```
#[derive(Debug, Clone)]
pub struct MosaicConfigBuilder {
    data_dir: PathBuf,
    cache_size: u64,
    index_path: Option<PathBuf>,
    relative_paths: bool,
}

impl MosaicConfigBuilder {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            cache_size: DEFAULT_CACHE_SIZE,
            index_path: None,
            relative_paths: true,
        }
    }

    /// Start from the `MOSAIC_*` environment variables.
    ///
    /// Unparseable optional values fall back to their defaults.
    pub fn from_env() -> Result<Self> {
        let data_dir = std::env::var("MOSAIC_DATA_DIR").map_err(|_| {
            MosaicError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "MOSAIC_DATA_DIR environment variable not set",
            ))
        })?;

        let cache_size: u64 = std::env::var("MOSAIC_CACHE_SIZE")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SIZE);

        let relative_paths = std::env::var("MOSAIC_RELATIVE_PATHS")
            .ok()
            .and_then(|s| parse_flag(&s))
            .unwrap_or(true);

        let mut builder = Self::new(data_dir)
            .cache_size(cache_size)
            .relative_paths(relative_paths);
        if let Ok(index) = std::env::var("MOSAIC_INDEX") {
            builder = builder.index_path(index);
        }
        Ok(builder)
    }

    pub fn cache_size(mut self, size: u64) -> Self {
        self.cache_size = size;
        self
    }

    pub fn index_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.index_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn relative_paths(mut self, relative: bool) -> Self {
        self.relative_paths = relative;
        self
    }

    pub fn build(self) -> MosaicConfig {
        let index_path = self
            .index_path
            .unwrap_or_else(|| self.data_dir.join(DEFAULT_INDEX_NAME));
        MosaicConfig {
            data_dir: self.data_dir,
            cache_size: self.cache_size,
            index_path,
            relative_paths: self.relative_paths,
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}
