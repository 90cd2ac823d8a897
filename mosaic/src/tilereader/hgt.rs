//! SRTM `.hgt` rasters.
//!
//! An `.hgt` file is a square grid of big-endian `i16` elevation samples,
//! row-major from the north-west corner. The grid size is implied by the file
//! size, and the tile's south-west corner by its name.
//!
//! # Filename Format
//!
//! `{N|S}{lat}{E|W}{lon}.hgt`, e.g. `N35E138.hgt` or `S13W078.hgt`:
//!
//! - Latitude: 2 digits with N/S prefix
//! - Longitude: 3 digits with E/W prefix
//!
//! The name is the **south-west corner** of the 1° × 1° tile. Zipped tiles
//! keep the same name with a trailing `.zip`.

use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use memmap2::Mmap;
use tracing::{debug, warn};

use super::{DecodedTile, Pixels, ReaderOptions, TileReader, TileReaderSpi};
use crate::error::{MosaicError, Result};
use crate::geometry::BoundingBox;
use crate::uri::MapDataRef;

/// File size for SRTM1 (1 arc-second, ~30m resolution): 3601 × 3601 × 2 bytes
const SRTM1_SIZE: usize = 3601 * 3601 * 2;

/// File size for SRTM3 (3 arc-second, ~90m resolution): 1201 × 1201 × 2 bytes
const SRTM3_SIZE: usize = 1201 * 1201 * 2;

const SRTM1_SAMPLES: usize = 3601;
const SRTM3_SAMPLES: usize = 1201;

/// Value indicating no data (void) in SRTM files
pub const VOID_VALUE: i16 = -32768;

/// Resolution type of an SRTM tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SrtmResolution {
    /// SRTM1: 1 arc-second (~30m) resolution
    Srtm1,
    /// SRTM3: 3 arc-second (~90m) resolution
    Srtm3,
}

impl SrtmResolution {
    /// Detect the resolution from a payload size in bytes.
    pub fn from_size(size: usize) -> Result<Self> {
        match size {
            SRTM1_SIZE => Ok(SrtmResolution::Srtm1),
            SRTM3_SIZE => Ok(SrtmResolution::Srtm3),
            size => Err(MosaicError::InvalidFileSize { size }),
        }
    }

    /// Returns the number of samples per row/column for this resolution.
    pub fn samples(&self) -> usize {
        match self {
            SrtmResolution::Srtm1 => SRTM1_SAMPLES,
            SrtmResolution::Srtm3 => SRTM3_SAMPLES,
        }
    }

    /// Returns the approximate resolution in meters.
    pub fn meters(&self) -> f64 {
        match self {
            SrtmResolution::Srtm1 => 30.0,
            SrtmResolution::Srtm3 => 90.0,
        }
    }
}

/// Convert a point to the name of the `.hgt` tile containing it.
///
/// ```
/// use mosaic::tilereader::hgt::tile_name;
///
/// assert_eq!(tile_name(35.5, 138.7), "N35E138.hgt");
/// assert_eq!(tile_name(-12.3, -77.1), "S13W078.hgt");
/// ```
pub fn tile_name(lat: f64, lon: f64) -> String {
    tile_name_for(lat.floor() as i32, lon.floor() as i32)
}

/// Name of the tile whose south-west corner is (`lat`, `lon`).
pub fn tile_name_for(lat: i32, lon: i32) -> String {
    let lat_prefix = if lat >= 0 { 'N' } else { 'S' };
    let lon_prefix = if lon >= 0 { 'E' } else { 'W' };
    format!(
        "{}{:02}{}{:03}.hgt",
        lat_prefix,
        lat.abs(),
        lon_prefix,
        lon.abs()
    )
}

/// Parse a tile name (with or without path, `.hgt` or `.hgt.zip`) into the
/// south-west corner coordinates.
///
/// ```
/// use mosaic::tilereader::hgt::parse_tile_name;
///
/// assert_eq!(parse_tile_name("/data/N35E138.hgt").unwrap(), (35, 138));
/// assert_eq!(parse_tile_name("S12W077.hgt.zip").unwrap(), (-12, -77));
/// assert!(parse_tile_name("invalid").is_err());
/// ```
pub fn parse_tile_name(filename: &str) -> Result<(i32, i32)> {
    let invalid = || MosaicError::InvalidTileName {
        name: filename.to_string(),
    };

    let name = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let name = name.strip_suffix(".zip").unwrap_or(name);
    let name = name.strip_suffix(".hgt").unwrap_or(name);

    // Must be exactly 7 characters: N00E000
    if name.len() != 7 || !name.is_ascii() {
        return Err(invalid());
    }

    let bytes = name.as_bytes();
    let lat_sign = match bytes[0] {
        b'N' | b'n' => 1,
        b'S' | b's' => -1,
        _ => return Err(invalid()),
    };
    let lon_sign = match bytes[3] {
        b'E' | b'e' => 1,
        b'W' | b'w' => -1,
        _ => return Err(invalid()),
    };
    let lat: i32 = name[1..3].parse().map_err(|_| invalid())?;
    let lon: i32 = name[4..7].parse().map_err(|_| invalid())?;

    Ok((lat * lat_sign, lon * lon_sign))
}

enum Storage {
    Mapped(Mmap),
    Owned(Vec<u8>),
}

impl Storage {
    fn bytes(&self) -> &[u8] {
        match self {
            Storage::Mapped(mmap) => mmap,
            Storage::Owned(data) => data,
        }
    }
}

/// An SRTM elevation grid, memory-mapped from disk or held in memory.
pub struct HgtRaster {
    data: Storage,
    resolution: SrtmResolution,
    /// Southwest corner latitude
    base_lat: i32,
    /// Southwest corner longitude
    base_lon: i32,
}

impl HgtRaster {
    /// Memory-map a `.hgt` file, taking its position from the file name.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let name = path.as_ref().to_string_lossy();
        let (lat, lon) = parse_tile_name(&name)?;
        Self::from_file_with_coords(path, lat, lon)
    }

    /// Memory-map a `.hgt` file with explicit south-west corner coordinates.
    pub fn from_file_with_coords<P: AsRef<Path>>(
        path: P,
        base_lat: i32,
        base_lon: i32,
    ) -> Result<Self> {
        let file = File::open(&path)?;

        // SAFETY: the file is opened read-only and the mapping never escapes
        // this raster. Concurrent external truncation is not guarded against.
        let mmap = unsafe { Mmap::map(&file)? };
        let resolution = SrtmResolution::from_size(mmap.len())?;

        Ok(Self {
            data: Storage::Mapped(mmap),
            resolution,
            base_lat,
            base_lon,
        })
    }

    /// Wrap an in-memory payload, e.g. one inflated from a zip archive.
    pub fn from_bytes(data: Vec<u8>, base_lat: i32, base_lon: i32) -> Result<Self> {
        let resolution = SrtmResolution::from_size(data.len())?;
        Ok(Self {
            data: Storage::Owned(data),
            resolution,
            base_lat,
            base_lon,
        })
    }

    pub fn resolution(&self) -> SrtmResolution {
        self.resolution
    }

    /// Number of samples per row/column.
    pub fn samples(&self) -> usize {
        self.resolution.samples()
    }

    pub fn base_lat(&self) -> i32 {
        self.base_lat
    }

    pub fn base_lon(&self) -> i32 {
        self.base_lon
    }

    /// The 1° × 1° footprint of the tile.
    pub fn bounds(&self) -> BoundingBox {
        BoundingBox::tile(self.base_lat, self.base_lon)
    }

    /// Raw sample at `row` (0 = north edge), `col` (0 = west edge).
    /// Indices past the edge are clamped.
    pub fn sample_at(&self, row: usize, col: usize) -> i16 {
        let last = self.samples() - 1;
        let offset = (row.min(last) * self.samples() + col.min(last)) * 2;
        let data = self.data.bytes();
        i16::from_be_bytes([data[offset], data[offset + 1]])
    }

    /// Fractional grid position of a point, or `None` outside the tile.
    fn grid_position(&self, lat: f64, lon: f64) -> Option<(f64, f64)> {
        let lat_frac = lat - self.base_lat as f64;
        let lon_frac = lon - self.base_lon as f64;
        if !(0.0..=1.0).contains(&lat_frac) || !(0.0..=1.0).contains(&lon_frac) {
            return None;
        }

        // Rows run north to south
        let last = (self.samples() - 1) as f64;
        Some(((1.0 - lat_frac) * last, lon_frac * last))
    }

    /// Nearest-neighbour sample. Returns [`VOID_VALUE`] for voids and `None`
    /// when the point is outside the tile.
    pub fn sample_nearest(&self, lat: f64, lon: f64) -> Option<i16> {
        let (row, col) = self.grid_position(lat, lon)?;
        Some(self.sample_at(row.round() as usize, col.round() as usize))
    }

    /// Bilinear interpolation between the four surrounding samples.
    ///
    /// Returns `None` outside the tile or if any neighbour is void.
    pub fn sample_interpolated(&self, lat: f64, lon: f64) -> Option<f64> {
        let (row, col) = self.grid_position(lat, lon)?;

        let row0 = row.floor() as usize;
        let col0 = col.floor() as usize;
        let dr = row - row0 as f64;
        let dc = col - col0 as f64;

        let corners = [
            self.sample_at(row0, col0),
            self.sample_at(row0, col0 + 1),
            self.sample_at(row0 + 1, col0),
            self.sample_at(row0 + 1, col0 + 1),
        ];
        if corners.contains(&VOID_VALUE) {
            return None;
        }

        let [nw, ne, sw, se] = corners.map(f64::from);
        let north = nw + (ne - nw) * dc;
        let south = sw + (se - sw) * dc;
        Some(north + (south - north) * dr)
    }

    /// Samples decimated to at most `size` per side.
    pub fn decimate(&self, size: usize) -> (usize, Vec<i16>) {
        let samples = self.samples();
        let size = size.clamp(2, samples);
        let mut out = Vec::with_capacity(size * size);
        for r in 0..size {
            let row = r * (samples - 1) / (size - 1);
            for c in 0..size {
                let col = c * (samples - 1) / (size - 1);
                out.push(self.sample_at(row, col));
            }
        }
        (size, out)
    }
}

/// Read the first `.hgt` entry of a zip archive into memory.
pub fn read_zip_entry<P: AsRef<Path>>(zip_path: P) -> Result<Vec<u8>> {
    let file = File::open(&zip_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        if entry.name().to_ascii_lowercase().ends_with(".hgt") {
            let mut data = Vec::with_capacity(entry.size() as usize);
            entry.read_to_end(&mut data)?;
            return Ok(data);
        }
    }

    Err(MosaicError::CorruptTile {
        uri: zip_path.as_ref().display().to_string(),
        reason: "no .hgt entry in archive".to_string(),
    })
}

/// [`TileReader`] over an [`HgtRaster`].
pub struct HgtReader {
    uri: String,
    format: &'static str,
    raster: Arc<HgtRaster>,
    options: ReaderOptions,
}

impl HgtReader {
    /// Open a plain `.hgt` file.
    pub fn open<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let raster = HgtRaster::from_file(&path)?;
        Ok(Self::with_raster(
            path.as_ref().display().to_string(),
            "hgt",
            Arc::new(raster),
            options,
        ))
    }

    /// Open a `.hgt.zip` archive, inflating it into memory.
    pub fn open_zip<P: AsRef<Path>>(path: P, options: &ReaderOptions) -> Result<Self> {
        let (lat, lon) = parse_tile_name(&path.as_ref().to_string_lossy())?;
        let raster = HgtRaster::from_bytes(read_zip_entry(&path)?, lat, lon)?;
        Ok(Self::with_raster(
            path.as_ref().display().to_string(),
            "hgtzip",
            Arc::new(raster),
            options,
        ))
    }

    fn with_raster(
        uri: String,
        format: &'static str,
        raster: Arc<HgtRaster>,
        options: &ReaderOptions,
    ) -> Self {
        Self {
            uri,
            format,
            raster,
            options: options.clone(),
        }
    }

    /// The underlying raster, shareable with elevation chunks.
    pub fn raster(&self) -> &Arc<HgtRaster> {
        &self.raster
    }
}

impl TileReader for HgtReader {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn format(&self) -> &str {
        self.format
    }

    fn width(&self) -> usize {
        self.raster.samples()
    }

    fn height(&self) -> usize {
        self.raster.samples()
    }

    fn bounds(&self) -> BoundingBox {
        self.raster.bounds()
    }

    fn resolution(&self) -> f64 {
        self.raster.resolution().meters()
    }

    fn decode(&self) -> Result<DecodedTile> {
        let full = self.raster.samples();
        let size = self.options.preferred_tile_size.unwrap_or(full);
        let (size, samples) = self.raster.decimate(size);
        Ok(DecodedTile {
            width: size,
            height: size,
            pixels: Pixels::Elevation(samples),
        })
    }
}

fn local_path(uri: &str) -> Option<std::path::PathBuf> {
    match MapDataRef::parse(uri) {
        MapDataRef::File(path) => Some(path),
        _ => None,
    }
}

fn has_suffix(uri: &str, suffix: &str) -> bool {
    uri.to_ascii_lowercase().ends_with(suffix)
}

/// Format SPI for plain `.hgt` files.
#[derive(Debug, Default, Clone, Copy)]
pub struct HgtSpi;

impl TileReaderSpi for HgtSpi {
    fn name(&self) -> &str {
        "hgt"
    }

    fn is_supported(&self, uri: &str) -> bool {
        has_suffix(uri, ".hgt") && local_path(uri).is_some()
    }

    fn create(&self, uri: &str, options: &ReaderOptions) -> Option<Box<dyn TileReader>> {
        let path = local_path(uri)?;
        match HgtReader::open(&path, options) {
            Ok(reader) => Some(Box::new(reader)),
            Err(e) => {
                debug!(uri, error = %e, "hgt reader declined");
                None
            }
        }
    }
}

/// Format SPI for zipped `.hgt.zip` tiles.
#[derive(Debug, Default, Clone, Copy)]
pub struct HgtZipSpi;

impl TileReaderSpi for HgtZipSpi {
    fn name(&self) -> &str {
        "hgtzip"
    }

    fn is_supported(&self, uri: &str) -> bool {
        has_suffix(uri, ".hgt.zip") && local_path(uri).is_some()
    }

    fn create(&self, uri: &str, options: &ReaderOptions) -> Option<Box<dyn TileReader>> {
        let path = local_path(uri)?;
        match HgtReader::open_zip(&path, options) {
            Ok(reader) => Some(Box::new(reader)),
            Err(e) => {
                warn!(uri, error = %e, "Failed to inflate zipped tile");
                None
            }
        }
    }
}
