//! Building a catalog from a directory of tiles.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use super::{Frame, MosaicDatabaseBuilder};
use crate::callback::RequestCallback;
use crate::error::{MosaicError, Result};
use crate::tilereader::{ReaderOptions, TileReaderRegistry};

/// Options for [`index_directory_with`].
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Store frame paths relative to the indexed directory.
    pub relative_paths: bool,
    /// Options passed to every reader opened during the scan.
    pub reader_options: ReaderOptions,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            relative_paths: true,
            reader_options: ReaderOptions::default(),
        }
    }
}

/// Scan `dir` recursively and catalog every file a registered reader opens.
///
/// Frame paths are relative to `dir`. See [`index_directory_with`].
pub fn index_directory(
    dir: &Path,
    registry: &TileReaderRegistry,
    callback: &mut dyn RequestCallback,
) -> Result<MosaicDatabaseBuilder> {
    index_directory_with(dir, registry, &IndexOptions::default(), callback)
}

/// Scan `dir` recursively and catalog every file a registered reader opens.
///
/// Files no reader claims are skipped silently. Files a reader claims but
/// cannot open are reported through
/// [`RequestCallback::on_request_error`]; the scan stops early, keeping the
/// frames found so far, if the callback returns `false`.
///
/// # Errors
///
/// Fails only if `dir` itself cannot be read.
pub fn index_directory_with(
    dir: &Path,
    registry: &TileReaderRegistry,
    options: &IndexOptions,
    callback: &mut dyn RequestCallback,
) -> Result<MosaicDatabaseBuilder> {
    let mut files = Vec::new();
    collect_files(dir, &mut files)?;
    files.sort();

    let candidates: Vec<PathBuf> = files
        .into_iter()
        .filter(|p| registry.is_supported(&p.to_string_lossy()))
        .collect();

    let total = candidates.len();
    let mut builder = MosaicDatabaseBuilder::new();
    callback.on_request_started();

    for (i, path) in candidates.iter().enumerate() {
        if let Err(e) = index_file(dir, path, registry, options, &mut builder) {
            let message = format!("Failed to index {}", path.display());
            warn!(path = %path.display(), error = %e, "Skipping file");
            if !callback.on_request_error(&e, &message, e.is_fatal()) {
                callback.on_request_canceled();
                return Ok(builder);
            }
        }
        callback.on_request_progress(i, total, 1, 1, (i + 1) as u64, total as u64);
    }

    info!(
        dir = %dir.display(),
        files = total,
        frames = builder.len(),
        "Indexed directory"
    );
    callback.on_request_complete();
    Ok(builder)
}

fn index_file(
    root: &Path,
    path: &Path,
    registry: &TileReaderRegistry,
    options: &IndexOptions,
    builder: &mut MosaicDatabaseBuilder,
) -> Result<()> {
    let uri = path.to_string_lossy();
    let reader = registry
        .open(&uri, &options.reader_options)
        .ok_or_else(|| MosaicError::CorruptTile {
            uri: uri.to_string(),
            reason: "no registered reader could open the file".to_string(),
        })?;

    let stored = if options.relative_paths {
        path.strip_prefix(root).unwrap_or(path)
    } else {
        path
    };

    debug!(path = %stored.display(), format = reader.format(), "Indexed frame");
    builder.insert_frame(Frame::new(
        stored.to_string_lossy(),
        reader.format(),
        reader.bounds(),
        reader.resolution(),
        reader.width(),
        reader.height(),
    ))
}

fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            collect_files(&path, files)?;
        } else {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NullCallback;
    use crate::geometry::BoundingBox;
    use std::fs;
    use tempfile::TempDir;

    const SRTM3_SIZE: usize = 1201 * 1201 * 2;

    #[derive(Default)]
    struct Recording {
        started: bool,
        completed: bool,
        canceled: bool,
        errors: Vec<bool>,
        progress: Vec<(usize, usize)>,
        keep_going: bool,
    }

    impl RequestCallback for Recording {
        fn on_request_started(&mut self) {
            self.started = true;
        }

        fn on_request_progress(
            &mut self,
            task_index: usize,
            task_count: usize,
            _task_progress: u64,
            _task_max: u64,
            _total_progress: u64,
            _total_max: u64,
        ) {
            self.progress.push((task_index, task_count));
        }

        fn on_request_complete(&mut self) {
            self.completed = true;
        }

        fn on_request_error(&mut self, _cause: &MosaicError, _message: &str, fatal: bool) -> bool {
            self.errors.push(fatal);
            self.keep_going
        }

        fn on_request_canceled(&mut self) {
            self.canceled = true;
        }
    }

    fn populate(dir: &Path) {
        fs::create_dir(dir.join("srtm")).unwrap();
        fs::write(dir.join("srtm/N35E138.hgt"), vec![0u8; SRTM3_SIZE]).unwrap();
        fs::write(dir.join("N36E138.hgt"), vec![0u8; SRTM3_SIZE]).unwrap();
        fs::write(dir.join("N37E138.hgt"), vec![0u8; 10]).unwrap();
        fs::write(dir.join("notes.txt"), b"ignored").unwrap();
    }

    #[test]
    fn test_index_directory() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let registry = TileReaderRegistry::with_defaults();
        let mut callback = Recording {
            keep_going: true,
            ..Default::default()
        };

        let builder = index_directory(dir.path(), &registry, &mut callback).unwrap();

        let mut paths: Vec<&str> = builder.frames().iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        let nested = format!("srtm{}N35E138.hgt", std::path::MAIN_SEPARATOR);
        assert_eq!(paths, vec!["N36E138.hgt", nested.as_str()]);

        let frame = builder.frames().iter().find(|f| f.path == "N36E138.hgt").unwrap();
        assert_eq!(frame.source, "hgt");
        assert_eq!(frame.bounds, BoundingBox::tile(36, 138));
        assert_eq!(frame.resolution, 90.0);

        assert!(callback.started && callback.completed && !callback.canceled);
        assert_eq!(callback.errors, vec![true]);
        assert_eq!(callback.progress.len(), 3);
        assert_eq!(callback.progress[2], (2, 3));
    }

    #[test]
    fn test_index_cancel_keeps_partial_result() {
        let dir = TempDir::new().unwrap();
        populate(dir.path());
        let registry = TileReaderRegistry::with_defaults();
        let mut callback = Recording::default();

        let builder = index_directory(dir.path(), &registry, &mut callback).unwrap();

        // N36E138 sorts first, then the broken N37E138 cancels the scan
        assert_eq!(builder.len(), 1);
        assert!(callback.canceled);
        assert!(!callback.completed);
    }

    #[test]
    fn test_index_absolute_paths() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("N35E138.hgt"), vec![0u8; SRTM3_SIZE]).unwrap();
        let registry = TileReaderRegistry::with_defaults();
        let options = IndexOptions {
            relative_paths: false,
            ..Default::default()
        };

        let builder =
            index_directory_with(dir.path(), &registry, &options, &mut NullCallback).unwrap();
        assert_eq!(
            builder.frames()[0].path,
            dir.path().join("N35E138.hgt").to_string_lossy()
        );
    }

    #[test]
    fn test_index_missing_directory() {
        let dir = TempDir::new().unwrap();
        let registry = TileReaderRegistry::with_defaults();
        assert!(index_directory(&dir.path().join("missing"), &registry, &mut NullCallback).is_err());
    }
}
