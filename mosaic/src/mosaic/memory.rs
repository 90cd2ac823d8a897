//! In-memory catalog persisted as a JSON index.
//!
//! # Index Format
//!
//! ```json
//! {
//!   "version": 1,
//!   "frames": [
//!     {
//!       "path": "N35E138.hgt",
//!       "source": "hgt",
//!       "bounds": { "min_lat": 35.0, "min_lon": 138.0, "max_lat": 36.0, "max_lon": 139.0 },
//!       "resolution": 90.0,
//!       "width": 1201,
//!       "height": 1201
//!     }
//!   ]
//! }
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    Frame, FrameCursor, MosaicDatabase, MultiplexingCursor, QueryParameters, SourceCoverage,
    VecCursor,
};
use crate::error::{MosaicError, Result};

const INDEX_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct IndexFile {
    version: u32,
    frames: Vec<Frame>,
}

struct SourceTable {
    frames: Arc<[Frame]>,
    coverage: SourceCoverage,
}

/// Catalog holding every frame in memory, grouped by source.
///
/// Queries run one sorted cursor per source and merge them with a
/// [`MultiplexingCursor`].
#[derive(Default)]
pub struct MemoryMosaicDatabase {
    sources: BTreeMap<String, SourceTable>,
    path: Option<PathBuf>,
    open: bool,
}

impl MemoryMosaicDatabase {
    /// A closed, empty catalog. Call [`open`](MosaicDatabase::open) to load
    /// an index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the JSON index at `path`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut db = Self::new();
        db.open(path.as_ref())?;
        Ok(db)
    }

    fn from_frames(frames: Vec<Frame>) -> Self {
        let mut grouped: BTreeMap<String, Vec<Frame>> = BTreeMap::new();
        for frame in frames {
            grouped.entry(frame.source.clone()).or_default().push(frame);
        }

        let sources = grouped
            .into_iter()
            .filter_map(|(source, frames)| {
                let coverage = frames
                    .iter()
                    .map(SourceCoverage::of)
                    .reduce(|a, b| a.merge(&b))?;
                Some((
                    source,
                    SourceTable {
                        frames: frames.into(),
                        coverage,
                    },
                ))
            })
            .collect();

        Self {
            sources,
            path: None,
            open: true,
        }
    }

    /// Location of the index this catalog was opened from.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Total number of frames.
    pub fn frame_count(&self) -> usize {
        self.sources.values().map(|t| t.frames.len()).sum()
    }

    fn ensure_open(&self) -> Result<()> {
        if self.open {
            Ok(())
        } else {
            Err(MosaicError::DatabaseClosed)
        }
    }
}

impl MosaicDatabase for MemoryMosaicDatabase {
    fn type_name(&self) -> &str {
        "json"
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(MosaicError::IndexNotFound {
                path: path.to_path_buf(),
            });
        }

        let reader = BufReader::new(File::open(path)?);
        let index: IndexFile = serde_json::from_reader(reader)?;
        if index.version != INDEX_VERSION {
            return Err(MosaicError::Validation { field: "version" });
        }

        // Same validation and same-path replacement as a freshly built catalog
        let mut builder = MosaicDatabaseBuilder::new();
        for frame in index.frames {
            builder.insert_frame(frame)?;
        }
        let frame_count = builder.len();
        *self = builder.build();
        self.path = Some(path.to_path_buf());

        info!(
            path = %path.display(),
            frames = frame_count,
            sources = self.sources.len(),
            "Opened mosaic index"
        );
        Ok(())
    }

    fn close(&mut self) {
        if self.open {
            self.open = false;
            self.sources.clear();
            debug!("Closed mosaic database");
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn sources(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.sources.keys().cloned().collect())
    }

    fn coverage(&self) -> Result<Option<SourceCoverage>> {
        self.ensure_open()?;
        Ok(self
            .sources
            .values()
            .map(|t| t.coverage)
            .reduce(|a, b| a.merge(&b)))
    }

    fn coverage_for(&self, source: &str) -> Result<Option<SourceCoverage>> {
        self.ensure_open()?;
        Ok(self.sources.get(source).map(|t| t.coverage))
    }

    fn query(&self, params: &QueryParameters) -> Result<Box<dyn FrameCursor>> {
        self.ensure_open()?;

        let order = params.order();
        let mut cursors: Vec<Box<dyn FrameCursor>> = Vec::new();
        for (source, table) in &self.sources {
            if !params.accepts_source(source) {
                continue;
            }

            let frames = &table.frames;
            let mut indices: Vec<usize> = (0..frames.len())
                .filter(|&i| params.matches(&frames[i]))
                .collect();
            if indices.is_empty() {
                continue;
            }
            indices.sort_by(|&a, &b| order.compare(&frames[a], &frames[b]));

            cursors.push(Box::new(VecCursor::new(Arc::clone(frames), indices)));
        }

        debug!(cursors = cursors.len(), ?order, "Query planned");
        Ok(Box::new(MultiplexingCursor::new(cursors, order)))
    }
}

/// Accumulates frames for a [`MemoryMosaicDatabase`].
///
/// Frames are keyed by path: inserting a path twice replaces the earlier
/// frame in place.
#[derive(Debug, Default, Clone)]
pub struct MosaicDatabaseBuilder {
    frames: Vec<Frame>,
    positions: HashMap<String, usize>,
}

impl MosaicDatabaseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a frame after validating it.
    ///
    /// # Errors
    ///
    /// - [`MosaicError::Validation`] for an empty path or a non-positive
    ///   resolution
    /// - [`MosaicError::MalformedBounds`] for NaN or inverted bounds
    pub fn insert_frame(&mut self, frame: Frame) -> Result<()> {
        if frame.path.is_empty() {
            return Err(MosaicError::Validation { field: "path" });
        }
        if !(frame.resolution.is_finite() && frame.resolution > 0.0) {
            return Err(MosaicError::Validation { field: "resolution" });
        }
        if !frame.bounds.is_valid() {
            return Err(MosaicError::MalformedBounds { path: frame.path });
        }

        match self.positions.get(&frame.path) {
            Some(&index) => self.frames[index] = frame,
            None => {
                self.positions.insert(frame.path.clone(), self.frames.len());
                self.frames.push(frame);
            }
        }
        Ok(())
    }

    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Write the frames as a JSON index.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let writer = BufWriter::new(File::create(path.as_ref())?);
        let index = IndexFile {
            version: INDEX_VERSION,
            frames: self.frames.clone(),
        };
        serde_json::to_writer_pretty(writer, &index)?;

        info!(
            path = %path.as_ref().display(),
            frames = self.frames.len(),
            "Saved mosaic index"
        );
        Ok(())
    }

    /// Build an open catalog from the accumulated frames.
    pub fn build(self) -> MemoryMosaicDatabase {
        MemoryMosaicDatabase::from_frames(self.frames)
    }
}
