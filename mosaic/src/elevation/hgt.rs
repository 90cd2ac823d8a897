//! Elevation chunks backed by SRTM `.hgt` tiles, with LRU caching.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use moka::sync::Cache;
use tracing::{debug, warn};

use super::{ChunkRef, ElevationChunk};
use crate::error::{MosaicError, Result};
use crate::geometry::BoundingBox;
use crate::tilereader::hgt::{parse_tile_name, read_zip_entry, tile_name_for};
use crate::tilereader::{HgtRaster, SrtmResolution, VOID_VALUE};

/// Chunk over an already loaded raster.
pub struct HgtChunk {
    uri: String,
    raster: Arc<HgtRaster>,
    interpolate: bool,
}

impl HgtChunk {
    pub fn new(uri: impl Into<String>, raster: Arc<HgtRaster>) -> Self {
        Self {
            uri: uri.into(),
            raster,
            interpolate: false,
        }
    }

    /// Memory-map a `.hgt` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raster = HgtRaster::from_file(&path)?;
        Ok(Self::new(
            path.as_ref().display().to_string(),
            Arc::new(raster),
        ))
    }

    /// Use bilinear interpolation instead of nearest-neighbour sampling.
    pub fn interpolated(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }
}

fn sample_raster(raster: &HgtRaster, lat: f64, lon: f64, interpolate: bool) -> Option<f64> {
    if interpolate {
        raster.sample_interpolated(lat, lon)
    } else {
        raster
            .sample_nearest(lat, lon)
            .filter(|&v| v != VOID_VALUE)
            .map(f64::from)
    }
}

impl ElevationChunk for HgtChunk {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn bounds(&self) -> BoundingBox {
        self.raster.bounds()
    }

    fn resolution(&self) -> f64 {
        self.raster.resolution().meters()
    }

    fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        sample_raster(&self.raster, lat, lon, self.interpolate)
    }
}

/// Statistics about cache usage.
#[derive(Debug, Clone, Default)]
pub struct CacheStats {
    /// Number of tiles currently in the cache.
    pub entry_count: u64,
    /// Number of cache hits (requests served from cache).
    pub hit_count: u64,
    /// Number of cache misses (tiles loaded from disk).
    pub miss_count: u64,
}

impl CacheStats {
    /// Calculate the cache hit rate (0.0 to 1.0).
    ///
    /// Returns 0.0 if no requests have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hit_count + self.miss_count;
        if total == 0 {
            0.0
        } else {
            self.hit_count as f64 / total as f64
        }
    }
}

/// Loads `.hgt` and `.hgt.zip` tiles from a directory on demand and keeps
/// the most recently used ones in memory.
///
/// Zipped tiles are inflated into memory; the data directory is never
/// written to.
pub struct HgtTileLoader {
    data_dir: PathBuf,
    tile_cache: Cache<(i32, i32), Arc<HgtRaster>>,
    hit_count: AtomicU64,
    miss_count: AtomicU64,
}

impl HgtTileLoader {
    /// Create a loader caching up to `cache_size` tiles.
    ///
    /// An SRTM3 tile is ~2.8MB, an SRTM1 tile ~26MB.
    pub fn new<P: AsRef<Path>>(data_dir: P, cache_size: u64) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
            tile_cache: Cache::builder().max_capacity(cache_size).build(),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
        }
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// The tile whose south-west corner is (`lat`, `lon`), or `None` if the
    /// directory holds neither `.hgt` nor `.hgt.zip` for it.
    pub fn load(&self, lat: i32, lon: i32) -> Result<Option<Arc<HgtRaster>>> {
        let key = (lat, lon);
        if let Some(tile) = self.tile_cache.get(&key) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            return Ok(Some(tile));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);

        let filename = tile_name_for(lat, lon);
        let path = self.data_dir.join(&filename);
        let zip_path = self.data_dir.join(format!("{}.zip", filename));

        let raster = if path.exists() {
            HgtRaster::from_file_with_coords(&path, lat, lon)?
        } else if zip_path.exists() {
            debug!(path = %zip_path.display(), "Inflating zipped tile");
            HgtRaster::from_bytes(read_zip_entry(&zip_path)?, lat, lon)?
        } else {
            return Ok(None);
        };

        let tile = Arc::new(raster);
        self.tile_cache.insert(key, Arc::clone(&tile));
        Ok(Some(tile))
    }

    /// Elevation at a point, `None` for void data or a missing tile.
    pub fn sample(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        self.sample_with(lat, lon, false)
    }

    /// Like [`sample`](Self::sample) with bilinear interpolation.
    pub fn sample_interpolated(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        self.sample_with(lat, lon, true)
    }

    fn sample_with(&self, lat: f64, lon: f64, interpolate: bool) -> Result<Option<f64>> {
        let Some(tile) = self.load(lat.floor() as i32, lon.floor() as i32)? else {
            return Ok(None);
        };
        Ok(sample_raster(&tile, lat, lon, interpolate))
    }

    /// Scan the data directory for `.hgt` and `.hgt.zip` files.
    ///
    /// Returns a sorted, deduplicated list of tile filenames (e.g., `["N35E138.hgt"]`).
    pub fn scan_tile_files(&self) -> Vec<String> {
        let mut filenames = HashSet::new();

        let entries = match std::fs::read_dir(&self.data_dir) {
            Ok(entries) => entries,
            Err(_) => return Vec::new(),
        };

        for entry in entries.flatten() {
            let name = entry.file_name();
            let name = name.to_string_lossy();

            if let Some(hgt_name) = name.strip_suffix(".zip") {
                if hgt_name.ends_with(".hgt") {
                    filenames.insert(hgt_name.to_string());
                }
            } else if name.ends_with(".hgt") {
                filenames.insert(name.to_string());
            }
        }

        let mut result: Vec<String> = filenames.into_iter().collect();
        result.sort();
        result
    }

    /// One lazily loaded chunk per tile in the data directory.
    ///
    /// Tiles whose name or size is unusable are skipped with a warning.
    pub fn lazy_chunks(self: &Arc<Self>) -> Vec<LazyHgtChunk> {
        self.scan_tile_files()
            .into_iter()
            .filter_map(|name| match self.probe(&name) {
                Ok(chunk) => Some(chunk),
                Err(e) => {
                    warn!(tile = %name, error = %e, "Skipping tile");
                    None
                }
            })
            .collect()
    }

    /// [`lazy_chunks`](Self::lazy_chunks) as shared handles.
    pub fn chunks(self: &Arc<Self>) -> Vec<ChunkRef> {
        self.lazy_chunks()
            .into_iter()
            .map(|chunk| Arc::new(chunk) as ChunkRef)
            .collect()
    }

    fn probe(self: &Arc<Self>, name: &str) -> Result<LazyHgtChunk> {
        let (lat, lon) = parse_tile_name(name)?;
        let path = self.data_dir.join(name);
        let size = if path.exists() {
            std::fs::metadata(&path)?.len() as usize
        } else {
            zipped_entry_size(&self.data_dir.join(format!("{}.zip", name)))?
        };

        Ok(LazyHgtChunk {
            uri: path.display().to_string(),
            lat,
            lon,
            resolution: SrtmResolution::from_size(size)?,
            loader: Arc::clone(self),
            interpolate: false,
        })
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            entry_count: self.tile_cache.entry_count(),
            hit_count: self.hit_count.load(Ordering::Relaxed),
            miss_count: self.miss_count.load(Ordering::Relaxed),
        }
    }

    /// Get the maximum cache size.
    pub fn cache_capacity(&self) -> u64 {
        self.tile_cache.policy().max_capacity().unwrap_or(0)
    }

    /// Remove a tile from the cache by filename (e.g. `"N35E138.hgt"`).
    pub fn invalidate_tile(&self, filename: &str) {
        if let Ok(key) = parse_tile_name(filename) {
            self.tile_cache.invalidate(&key);
        }
    }

    pub fn clear_cache(&self) {
        self.tile_cache.invalidate_all();
    }
}

fn zipped_entry_size(zip_path: &Path) -> Result<usize> {
    let mut archive = zip::ZipArchive::new(File::open(zip_path)?)?;
    for i in 0..archive.len() {
        let entry = archive.by_index(i)?;
        if entry.name().to_ascii_lowercase().ends_with(".hgt") {
            return Ok(entry.size() as usize);
        }
    }
    Err(MosaicError::CorruptTile {
        uri: zip_path.display().to_string(),
        reason: "no .hgt entry in archive".to_string(),
    })
}

/// Chunk whose raster is loaded through an [`HgtTileLoader`] on first use.
pub struct LazyHgtChunk {
    uri: String,
    lat: i32,
    lon: i32,
    resolution: SrtmResolution,
    loader: Arc<HgtTileLoader>,
    interpolate: bool,
}

impl LazyHgtChunk {
    pub fn interpolated(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }
}

impl ElevationChunk for LazyHgtChunk {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn bounds(&self) -> BoundingBox {
        BoundingBox::tile(self.lat, self.lon)
    }

    fn resolution(&self) -> f64 {
        self.resolution.meters()
    }

    fn sample(&self, lat: f64, lon: f64) -> Option<f64> {
        match self.loader.load(self.lat, self.lon) {
            Ok(Some(raster)) => sample_raster(&raster, lat, lon, self.interpolate),
            Ok(None) => None,
            Err(e) => {
                warn!(uri = %self.uri, error = %e, "Failed to load tile");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elevation::ElevationSourceBuilder;
    use std::fs;
    use std::io::Write;
    use tempfile::TempDir;

    /// File size for SRTM3 (1201 × 1201 × 2 bytes)
    const SRTM3_SIZE: usize = 1201 * 1201 * 2;
    const SRTM3_SAMPLES: usize = 1201;

    /// SRTM3 payload with `center_elevation` at row 600, col 600
    fn tile_data(center_elevation: i16) -> Vec<u8> {
        let mut data = vec![0u8; SRTM3_SIZE];
        let center_offset = (600 * SRTM3_SAMPLES + 600) * 2;
        data[center_offset..center_offset + 2].copy_from_slice(&center_elevation.to_be_bytes());
        data
    }

    fn create_test_tile(dir: &Path, filename: &str, center_elevation: i16) {
        fs::write(dir.join(filename), tile_data(center_elevation)).unwrap();
    }

    fn create_zipped_tile(dir: &Path, filename: &str, center_elevation: i16) {
        let zip_path = dir.join(format!("{}.zip", filename));
        let mut zip_writer = zip::ZipWriter::new(File::create(zip_path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip_writer.start_file(filename, options).unwrap();
        zip_writer.write_all(&tile_data(center_elevation)).unwrap();
        zip_writer.finish().unwrap();
    }

    #[test]
    fn test_loader_basic() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", 500);

        let loader = HgtTileLoader::new(temp_dir.path(), 10);
        assert_eq!(loader.sample(35.5, 138.5).unwrap(), Some(500.0));
    }

    #[test]
    fn test_cache_hit() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", 500);

        let loader = HgtTileLoader::new(temp_dir.path(), 10);

        loader.sample(35.5, 138.5).unwrap();
        let stats = loader.cache_stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 0);

        loader.sample(35.6, 138.6).unwrap();
        let stats = loader.cache_stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_missing_tile_is_none() {
        let temp_dir = TempDir::new().unwrap();
        let loader = HgtTileLoader::new(temp_dir.path(), 10);

        assert_eq!(loader.sample(35.5, 138.5).unwrap(), None);
        assert_eq!(loader.sample_interpolated(35.5, 138.5).unwrap(), None);
    }

    #[test]
    fn test_void_data_is_none() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", VOID_VALUE);

        let loader = HgtTileLoader::new(temp_dir.path(), 10);
        assert_eq!(loader.sample(35.5, 138.5).unwrap(), None);
    }

    #[test]
    fn test_corrupt_tile_is_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("N35E138.hgt"), vec![0u8; 100]).unwrap();

        let loader = HgtTileLoader::new(temp_dir.path(), 10);
        assert!(matches!(
            loader.sample(35.5, 138.5),
            Err(MosaicError::InvalidFileSize { size: 100 })
        ));
    }

    #[test]
    fn test_zipped_tile_is_inflated_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        create_zipped_tile(temp_dir.path(), "N40E010.hgt", 750);

        let loader = HgtTileLoader::new(temp_dir.path(), 10);
        assert_eq!(loader.sample(40.5, 10.5).unwrap(), Some(750.0));
        assert!(!temp_dir.path().join("N40E010.hgt").exists());
    }

    #[test]
    fn test_invalidate_and_clear() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", 500);
        let loader = HgtTileLoader::new(temp_dir.path(), 10);

        loader.sample(35.5, 138.5).unwrap();
        loader.invalidate_tile("N35E138.hgt");
        loader.sample(35.5, 138.5).unwrap();
        assert_eq!(loader.cache_stats().miss_count, 2);

        loader.clear_cache();
        loader.sample(35.5, 138.5).unwrap();
        assert_eq!(loader.cache_stats().miss_count, 3);
        assert_eq!(loader.cache_capacity(), 10);
    }

    #[test]
    fn test_scan_and_lazy_chunks() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", 500);
        create_zipped_tile(temp_dir.path(), "N36E138.hgt", 1000);
        create_test_tile(temp_dir.path(), "N37E138.hgt", 10);
        fs::write(temp_dir.path().join("N38E138.hgt"), vec![0u8; 10]).unwrap();
        fs::write(temp_dir.path().join("readme.txt"), b"x").unwrap();

        let loader = Arc::new(HgtTileLoader::new(temp_dir.path(), 10));
        assert_eq!(
            loader.scan_tile_files(),
            vec!["N35E138.hgt", "N36E138.hgt", "N37E138.hgt", "N38E138.hgt"]
        );

        let chunks = loader.chunks();
        assert_eq!(chunks.len(), 3);
        assert_eq!(loader.cache_stats().miss_count, 0);

        let source = ElevationSourceBuilder::new()
            .name("srtm")
            .chunks(chunks)
            .build()
            .unwrap();
        assert_eq!(source.sample(36.5, 138.5), Some(1000.0));
        assert_eq!(source.bounds(), Some(BoundingBox::new(35.0, 138.0, 38.0, 139.0)));
    }

    #[test]
    fn test_hgt_chunk_from_file() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N35E138.hgt", 500);

        let chunk = HgtChunk::from_file(temp_dir.path().join("N35E138.hgt")).unwrap();
        assert_eq!(chunk.resolution(), 90.0);
        assert_eq!(chunk.bounds(), BoundingBox::tile(35, 138));
        assert_eq!(chunk.sample(35.5, 138.5), Some(500.0));
        assert_eq!(chunk.sample(40.0, 138.5), None);

        let interpolated = chunk.interpolated(true);
        assert_eq!(interpolated.sample(35.5, 138.5), Some(500.0));
    }
}
