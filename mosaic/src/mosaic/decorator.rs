//! Catalog wrappers.
//!
//! Each wrapper owns an inner catalog and transforms the cursors it returns;
//! the inner query runs exactly once. Wrappers nest by ownership:
//!
//! ```ignore
//! let db = PathResolvingDatabase::new(
//!     Box::new(FilteringDatabase::from_fn(Box::new(base), |f| f.resolution <= 30.0)),
//!     "/data/terrain",
//! );
//! ```

use std::path::{Path, MAIN_SEPARATOR};
use std::sync::Arc;

use super::{FilterCursor, Frame, FrameCursor, FramePredicate, MosaicDatabase, QueryParameters, SourceCoverage};
use crate::error::{MosaicError, Result};

/// Applies a predicate to every query of the inner catalog.
///
/// Catalog-level metadata (sources, coverage) is passed through unfiltered.
pub struct FilteringDatabase {
    inner: Box<dyn MosaicDatabase>,
    predicate: FramePredicate,
}

impl FilteringDatabase {
    pub fn new(inner: Box<dyn MosaicDatabase>, predicate: FramePredicate) -> Self {
        Self { inner, predicate }
    }

    pub fn from_fn<F>(inner: Box<dyn MosaicDatabase>, predicate: F) -> Self
    where
        F: Fn(&Frame) -> bool + Send + Sync + 'static,
    {
        Self::new(inner, Arc::new(predicate))
    }
}

impl MosaicDatabase for FilteringDatabase {
    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn open(&mut self, path: &Path) -> Result<()> {
        self.inner.open(path)
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn sources(&self) -> Result<Vec<String>> {
        self.inner.sources()
    }

    fn coverage(&self) -> Result<Option<SourceCoverage>> {
        self.inner.coverage()
    }

    fn coverage_for(&self, source: &str) -> Result<Option<SourceCoverage>> {
        self.inner.coverage_for(source)
    }

    fn query(&self, params: &QueryParameters) -> Result<Box<dyn FrameCursor>> {
        let inner = self.inner.query(params)?;
        Ok(Box::new(FilterCursor::new(inner, Arc::clone(&self.predicate))))
    }
}

/// Rewrites every frame path to `base + MAIN_SEPARATOR + path`.
///
/// The wrapper is bound to its base location, so [`open`](MosaicDatabase::open)
/// is rejected; open the inner catalog before wrapping it.
pub struct PathResolvingDatabase {
    inner: Box<dyn MosaicDatabase>,
    base: Arc<str>,
}

impl PathResolvingDatabase {
    /// Wrap `inner`. A `file://` prefix and a trailing separator on `base`
    /// are dropped.
    pub fn new(inner: Box<dyn MosaicDatabase>, base: &str) -> Self {
        Self {
            inner,
            base: Arc::from(normalize_base(base)),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }
}

fn normalize_base(base: &str) -> &str {
    let base = match base.strip_prefix("file://") {
        // file:///abs keeps its leading slash
        Some(rest) => rest,
        None => base,
    };
    if base.len() > 1 {
        base.strip_suffix(MAIN_SEPARATOR)
            .or_else(|| base.strip_suffix('/'))
            .unwrap_or(base)
    } else {
        base
    }
}

impl MosaicDatabase for PathResolvingDatabase {
    fn type_name(&self) -> &str {
        self.inner.type_name()
    }

    fn open(&mut self, _path: &Path) -> Result<()> {
        Err(MosaicError::UnsupportedOperation(
            "path-resolving catalog cannot be reopened",
        ))
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_open(&self) -> bool {
        self.inner.is_open()
    }

    fn sources(&self) -> Result<Vec<String>> {
        self.inner.sources()
    }

    fn coverage(&self) -> Result<Option<SourceCoverage>> {
        self.inner.coverage()
    }

    fn coverage_for(&self, source: &str) -> Result<Option<SourceCoverage>> {
        self.inner.coverage_for(source)
    }

    fn query(&self, params: &QueryParameters) -> Result<Box<dyn FrameCursor>> {
        let inner = self.inner.query(params)?;
        Ok(Box::new(PathResolvingCursor {
            inner,
            base: Arc::clone(&self.base),
            current: None,
        }))
    }
}

struct PathResolvingCursor {
    inner: Box<dyn FrameCursor>,
    base: Arc<str>,
    current: Option<Frame>,
}

impl FrameCursor for PathResolvingCursor {
    fn advance(&mut self) -> Result<bool> {
        self.current = None;
        if !self.inner.advance()? {
            return Ok(false);
        }
        self.current = self.inner.frame().map(|f| {
            let mut frame = f.clone();
            frame.path = format!("{}{}{}", self.base, MAIN_SEPARATOR, f.path);
            frame
        });
        Ok(true)
    }

    fn frame(&self) -> Option<&Frame> {
        self.current.as_ref()
    }

    fn close(&mut self) {
        self.current = None;
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}
