//! Cursor implementations.

use std::sync::Arc;

use super::{Frame, FrameCursor, QueryOrder};
use crate::error::{MosaicError, Result};

/// Cursor over a shared frame snapshot.
///
/// The snapshot is shared with the catalog that produced it, so creating a
/// cursor copies only the indices of the matching frames.
pub struct VecCursor {
    frames: Arc<[Frame]>,
    indices: Vec<usize>,
    /// Position in `indices`; `None` before the first advance.
    position: Option<usize>,
    closed: bool,
}

impl VecCursor {
    pub fn new(frames: Arc<[Frame]>, indices: Vec<usize>) -> Self {
        Self {
            frames,
            indices,
            position: None,
            closed: false,
        }
    }

    /// Cursor over every frame of `frames`, in order.
    pub fn from_frames(frames: Vec<Frame>) -> Self {
        let indices = (0..frames.len()).collect();
        Self::new(frames.into(), indices)
    }

    /// An immediately exhausted cursor.
    pub fn empty() -> Self {
        Self::from_frames(Vec::new())
    }
}

impl FrameCursor for VecCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(MosaicError::CursorClosed);
        }
        let next = self.position.map_or(0, |p| p + 1).min(self.indices.len());
        self.position = Some(next);
        Ok(next < self.indices.len())
    }

    fn frame(&self) -> Option<&Frame> {
        if self.closed {
            return None;
        }
        let index = *self.indices.get(self.position?)?;
        self.frames.get(index)
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.indices = Vec::new();
            self.frames = Arc::from(Vec::new());
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

/// Predicate applied by a [`FilterCursor`].
pub type FramePredicate = Arc<dyn Fn(&Frame) -> bool + Send + Sync>;

/// Cursor yielding only the frames of an inner cursor that satisfy a
/// predicate.
pub struct FilterCursor {
    inner: Box<dyn FrameCursor>,
    predicate: FramePredicate,
}

impl FilterCursor {
    pub fn new(inner: Box<dyn FrameCursor>, predicate: FramePredicate) -> Self {
        Self { inner, predicate }
    }

    pub fn from_fn<F>(inner: Box<dyn FrameCursor>, predicate: F) -> Self
    where
        F: Fn(&Frame) -> bool + Send + Sync + 'static,
    {
        Self::new(inner, Arc::new(predicate))
    }
}

impl FrameCursor for FilterCursor {
    fn advance(&mut self) -> Result<bool> {
        while self.inner.advance()? {
            if self.inner.frame().is_some_and(|f| (self.predicate)(f)) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn frame(&self) -> Option<&Frame> {
        self.inner.frame()
    }

    fn close(&mut self) {
        self.inner.close();
    }

    fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }
}

/// Merges several cursors, each already sorted by `order`, into one stream
/// sorted by `order`.
///
/// Ties go to the earlier cursor, so with [`QueryOrder::Natural`] the
/// result is the cursors' concatenation.
pub struct MultiplexingCursor {
    cursors: Vec<Box<dyn FrameCursor>>,
    /// Whether each cursor currently holds an unconsumed frame.
    live: Vec<bool>,
    order: QueryOrder,
    current: Option<usize>,
    primed: bool,
    closed: bool,
}

impl MultiplexingCursor {
    pub fn new(cursors: Vec<Box<dyn FrameCursor>>, order: QueryOrder) -> Self {
        let live = vec![false; cursors.len()];
        Self {
            cursors,
            live,
            order,
            current: None,
            primed: false,
            closed: false,
        }
    }

    fn pick(&self) -> Option<usize> {
        let mut best: Option<(usize, &Frame)> = None;
        for (i, cursor) in self.cursors.iter().enumerate() {
            if !self.live[i] {
                continue;
            }
            let Some(frame) = cursor.frame() else {
                continue;
            };
            best = match best {
                Some((_, b)) if self.order.compare(frame, b).is_lt() => Some((i, frame)),
                None => Some((i, frame)),
                keep => keep,
            };
        }
        best.map(|(i, _)| i)
    }
}

impl FrameCursor for MultiplexingCursor {
    fn advance(&mut self) -> Result<bool> {
        if self.closed {
            return Err(MosaicError::CursorClosed);
        }

        if !self.primed {
            self.primed = true;
            for (i, cursor) in self.cursors.iter_mut().enumerate() {
                self.live[i] = cursor.advance()?;
            }
        } else if let Some(i) = self.current {
            self.live[i] = self.cursors[i].advance()?;
        }

        self.current = self.pick();
        Ok(self.current.is_some())
    }

    fn frame(&self) -> Option<&Frame> {
        if self.closed {
            return None;
        }
        self.cursors[self.current?].frame()
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.current = None;
            for cursor in &mut self.cursors {
                cursor.close();
            }
        }
    }

    fn is_closed(&self) -> bool {
        self.closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::BoundingBox;
    use crate::mosaic::collect_frames;

    fn frame(path: &str, source: &str, resolution: f64) -> Frame {
        Frame::new(path, source, BoundingBox::tile(0, 0), resolution, 10, 10)
    }

    fn paths(frames: &[Frame]) -> Vec<&str> {
        frames.iter().map(|f| f.path.as_str()).collect()
    }

    #[test]
    fn test_vec_cursor_iterates_in_order() {
        let mut cursor = VecCursor::from_frames(vec![frame("a", "x", 1.0), frame("b", "x", 2.0)]);

        assert!(cursor.frame().is_none());
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.frame().unwrap().path, "a");
        assert!(cursor.advance().unwrap());
        assert_eq!(cursor.frame().unwrap().path, "b");
        assert!(!cursor.advance().unwrap());
        assert!(cursor.frame().is_none());
        assert!(!cursor.advance().unwrap());
    }

    #[test]
    fn test_empty_cursor_is_exhausted() {
        let mut cursor = VecCursor::empty();
        assert!(!cursor.advance().unwrap());
        assert!(!cursor.is_closed());
    }

    #[test]
    fn test_closed_cursor() {
        let mut cursor = VecCursor::from_frames(vec![frame("a", "x", 1.0)]);
        cursor.close();

        assert!(cursor.is_closed());
        assert!(matches!(cursor.advance(), Err(MosaicError::CursorClosed)));
        cursor.close();
        assert!(cursor.is_closed());
    }

    #[test]
    fn test_filter_cursor() {
        let inner = VecCursor::from_frames(vec![
            frame("a", "x", 1.0),
            frame("b", "y", 2.0),
            frame("c", "x", 3.0),
        ]);
        let cursor = FilterCursor::from_fn(Box::new(inner), |f| f.source == "x");

        let frames = collect_frames(Box::new(cursor)).unwrap();
        assert_eq!(paths(&frames), vec!["a", "c"]);
    }

    #[test]
    fn test_filter_cursor_close_propagates() {
        let inner = VecCursor::from_frames(vec![frame("a", "x", 1.0)]);
        let mut cursor = FilterCursor::from_fn(Box::new(inner), |_| true);
        cursor.close();

        assert!(cursor.is_closed());
        assert!(matches!(cursor.advance(), Err(MosaicError::CursorClosed)));
    }

    #[test]
    fn test_multiplexing_merges_sorted_streams() {
        let a = VecCursor::from_frames(vec![frame("a1", "a", 10.0), frame("a2", "a", 30.0)]);
        let b = VecCursor::from_frames(vec![frame("b1", "b", 5.0), frame("b2", "b", 30.0)]);
        let cursor = MultiplexingCursor::new(
            vec![Box::new(a), Box::new(b)],
            QueryOrder::ResolutionAsc,
        );

        let frames = collect_frames(Box::new(cursor)).unwrap();
        assert_eq!(paths(&frames), vec!["b1", "a1", "a2", "b2"]);
    }

    #[test]
    fn test_multiplexing_natural_concatenates() {
        let a = VecCursor::from_frames(vec![frame("a1", "a", 10.0)]);
        let empty = VecCursor::empty();
        let b = VecCursor::from_frames(vec![frame("b1", "b", 5.0)]);
        let cursor = MultiplexingCursor::new(
            vec![Box::new(a), Box::new(empty), Box::new(b)],
            QueryOrder::Natural,
        );

        let frames = collect_frames(Box::new(cursor)).unwrap();
        assert_eq!(paths(&frames), vec!["a1", "b1"]);
    }

    #[test]
    fn test_multiplexing_close_closes_children() {
        let mut cursor = MultiplexingCursor::new(vec![Box::new(VecCursor::empty())], QueryOrder::Natural);
        assert!(!cursor.advance().unwrap());
        cursor.close();
        cursor.close();

        assert!(cursor.is_closed());
        assert!(matches!(cursor.advance(), Err(MosaicError::CursorClosed)));
    }
}
