//! Occlusion-aware preload cache for the render loop.
//!
//! Each render cycle runs a query for the region of interest and hands the
//! cursor to [`PreloadCache::update`], which proceeds in two phases:
//!
//! 1. **prepare**: drain the cursor, run the occlusion pass front to back
//!    and instantiate (without decoding) a renderable for every visible frame
//!    that is not loaded yet.
//! 2. **commit**: initialise the pending renderables, promote them to the
//!    loaded set and evict loaded frames that are no longer candidates.
//!
//! A frame moves candidate → pending → loaded → evicted. The loaded set and
//! the pending map never share a URI.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::callback::RequestCallback;
use crate::error::{MosaicError, Result};
use crate::geometry::{BoundingBox, Coverage};
use crate::mosaic::{Frame, FrameCursor};
use crate::tilereader::{DecodedTile, ReaderOptions, TileReader, TileReaderRegistry};

/// Something the renderer can draw once initialised.
pub trait Renderable {
    /// Perform the expensive work (decode, upload). Called once.
    fn initialize(&mut self) -> Result<()>;

    fn is_initialized(&self) -> bool;

    /// Free the resources held. Called exactly once per renderable.
    fn release(&mut self);
}

/// Creates renderables for frames.
pub trait RenderableFactory {
    type Renderable: Renderable;

    /// Create an uninitialised renderable. Must be cheap.
    fn instantiate(&mut self, frame: &Frame) -> Result<Self::Renderable>;
}

/// Counters for one cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleStats {
    /// Frames returned by the query.
    pub candidates: usize,
    /// Frames hidden by frames in front of them or outside the region.
    pub occluded: usize,
    /// Renderables created this cycle.
    pub instantiated: usize,
    /// Visible frames already loaded.
    pub reused: usize,
    /// Loaded frames released because they left the candidate set.
    pub evicted: usize,
    /// Frames skipped on error.
    pub failed: usize,
}

/// State carried from `prepare` to `commit`.
pub struct PendingRenderState<R> {
    candidates: Vec<Frame>,
    /// URIs of visible frames, front-most first.
    visible: Vec<String>,
    preload: HashMap<String, R>,
    coverage: Coverage,
    /// The pass stopped before the cursor was drained.
    canceled: bool,
}

impl<R> Default for PendingRenderState<R> {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            visible: Vec::new(),
            preload: HashMap::new(),
            coverage: Coverage::new(),
            canceled: false,
        }
    }
}

impl<R> PendingRenderState<R> {
    pub fn candidates(&self) -> &[Frame] {
        &self.candidates
    }

    pub fn visible(&self) -> &[String] {
        &self.visible
    }

    pub fn coverage(&self) -> &Coverage {
        &self.coverage
    }

    pub fn pending_uris(&self) -> impl Iterator<Item = &str> {
        self.preload.keys().map(String::as_str)
    }

    /// Whether the pass was canceled before the cursor was drained. The
    /// candidate list is then incomplete.
    pub fn is_canceled(&self) -> bool {
        self.canceled
    }
}

/// Render-loop cache of loaded renderables.
pub struct PreloadCache<F: RenderableFactory> {
    factory: F,
    loaded: HashMap<String, F::Renderable>,
    pending: PendingRenderState<F::Renderable>,
    /// Loaded URIs in draw order (front-most first) as of the last commit.
    draw_order: Vec<String>,
    stats: CycleStats,
}

impl<F: RenderableFactory> PreloadCache<F> {
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            loaded: HashMap::new(),
            pending: PendingRenderState::default(),
            draw_order: Vec::new(),
            stats: CycleStats::default(),
        }
    }

    /// Drain `cursor` and stage renderables for visible, unloaded frames.
    ///
    /// Frames with malformed bounds or that the factory rejects are reported
    /// through `callback` and skipped; the pass stops early if the callback
    /// returns `false`. A `prepare` without a following `commit` is
    /// discarded by the next `prepare`.
    ///
    /// # Errors
    ///
    /// Propagates cursor failures.
    pub fn prepare(
        &mut self,
        mut cursor: Box<dyn FrameCursor>,
        roi: &BoundingBox,
        callback: &mut dyn RequestCallback,
    ) -> Result<CycleStats> {
        self.discard_pending();
        self.stats = CycleStats::default();
        callback.on_request_started();

        let mut staged: HashSet<String> = HashSet::new();
        while cursor.advance()? {
            let Some(frame) = cursor.frame() else {
                continue;
            };
            let frame = frame.clone();
            self.stats.candidates += 1;

            if !frame.bounds.is_valid() {
                self.stats.failed += 1;
                let err = MosaicError::MalformedBounds {
                    path: frame.path.clone(),
                };
                warn!(path = %frame.path, "Skipping frame with malformed bounds");
                self.pending.candidates.push(frame);
                if !callback.on_request_error(&err, "malformed frame bounds", false) {
                    return Ok(self.cancel(cursor, callback));
                }
                continue;
            }

            let visible = frame.bounds.intersection(roi);
            let occluded = match visible {
                Some(footprint) if !footprint.is_degenerate() => {
                    if self.pending.coverage.contains(&footprint) {
                        true
                    } else {
                        self.pending.coverage.add(footprint);
                        false
                    }
                }
                _ => true,
            };
            if occluded {
                self.stats.occluded += 1;
                self.pending.candidates.push(frame);
                continue;
            }

            if !staged.insert(frame.path.clone()) {
                self.pending.candidates.push(frame);
                continue;
            }
            self.pending.visible.push(frame.path.clone());

            if self.loaded.contains_key(&frame.path) {
                self.stats.reused += 1;
            } else {
                match self.factory.instantiate(&frame) {
                    Ok(renderable) => {
                        self.stats.instantiated += 1;
                        self.pending.preload.insert(frame.path.clone(), renderable);
                    }
                    Err(e) => {
                        self.stats.failed += 1;
                        warn!(path = %frame.path, error = %e, "Failed to instantiate renderable");
                        let message = format!("Cannot render {}", frame.path);
                        if !callback.on_request_error(&e, &message, e.is_fatal()) {
                            self.pending.candidates.push(frame);
                            return Ok(self.cancel(cursor, callback));
                        }
                    }
                }
            }
            self.pending.candidates.push(frame);
        }
        cursor.close();

        debug!(
            candidates = self.stats.candidates,
            occluded = self.stats.occluded,
            pending = self.pending.preload.len(),
            "Prepared render cycle"
        );
        callback.on_request_complete();
        Ok(self.stats)
    }

    fn cancel(
        &mut self,
        mut cursor: Box<dyn FrameCursor>,
        callback: &mut dyn RequestCallback,
    ) -> CycleStats {
        cursor.close();
        self.pending.canceled = true;
        callback.on_request_canceled();
        self.stats
    }

    /// Initialise the staged renderables, promote them to loaded and evict
    /// loaded frames that are no longer candidates.
    pub fn commit(&mut self) -> CycleStats {
        let pending = std::mem::take(&mut self.pending);

        for (uri, mut renderable) in pending.preload {
            match renderable.initialize() {
                Ok(()) => {
                    self.loaded.insert(uri, renderable);
                }
                Err(e) => {
                    self.stats.failed += 1;
                    warn!(path = %uri, error = %e, "Failed to initialize renderable");
                    renderable.release();
                }
            }
        }

        // A canceled pass saw only part of the result, so nothing is evicted
        if !pending.canceled {
            let keep: HashSet<&str> =
                pending.candidates.iter().map(|f| f.path.as_str()).collect();
            let evicted: Vec<String> = self
                .loaded
                .keys()
                .filter(|uri| !keep.contains(uri.as_str()))
                .cloned()
                .collect();
            for uri in evicted {
                if let Some(mut renderable) = self.loaded.remove(&uri) {
                    renderable.release();
                    self.stats.evicted += 1;
                }
            }
        }

        let mut draw_order: Vec<String> = pending
            .visible
            .into_iter()
            .filter(|uri| self.loaded.contains_key(uri))
            .collect();
        if pending.canceled {
            let previous = std::mem::take(&mut self.draw_order);
            for uri in previous {
                if self.loaded.contains_key(&uri) && !draw_order.contains(&uri) {
                    draw_order.push(uri);
                }
            }
        }
        self.draw_order = draw_order;

        debug!(
            loaded = self.loaded.len(),
            evicted = self.stats.evicted,
            failed = self.stats.failed,
            "Committed render cycle"
        );
        self.stats
    }

    /// One full cycle: [`prepare`](Self::prepare) then [`commit`](Self::commit).
    pub fn update(
        &mut self,
        cursor: Box<dyn FrameCursor>,
        roi: &BoundingBox,
        callback: &mut dyn RequestCallback,
    ) -> Result<CycleStats> {
        self.prepare(cursor, roi, callback)?;
        Ok(self.commit())
    }

    /// Fails with [`MosaicError::InvariantViolation`] if a URI is both loaded
    /// and pending.
    pub fn check_invariants(&self) -> Result<()> {
        if let Some(uri) = self
            .pending
            .preload
            .keys()
            .find(|uri| self.loaded.contains_key(*uri))
        {
            return Err(MosaicError::InvariantViolation(format!(
                "{} is both loaded and pending",
                uri
            )));
        }
        Ok(())
    }

    /// Loaded renderables to draw, front-most first.
    pub fn renderables(&self) -> impl Iterator<Item = (&str, &F::Renderable)> {
        self.draw_order
            .iter()
            .filter_map(|uri| self.loaded.get(uri).map(|r| (uri.as_str(), r)))
    }

    pub fn is_loaded(&self, uri: &str) -> bool {
        self.loaded.contains_key(uri)
    }

    pub fn loaded_uris(&self) -> impl Iterator<Item = &str> {
        self.loaded.keys().map(String::as_str)
    }

    pub fn loaded_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn pending(&self) -> &PendingRenderState<F::Renderable> {
        &self.pending
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Release every loaded and pending renderable.
    pub fn clear(&mut self) {
        self.discard_pending();
        for (_, mut renderable) in self.loaded.drain() {
            renderable.release();
        }
        self.draw_order.clear();
    }

    fn discard_pending(&mut self) {
        let pending = std::mem::take(&mut self.pending);
        for (_, mut renderable) in pending.preload {
            renderable.release();
        }
    }
}

impl<F: RenderableFactory> Drop for PreloadCache<F> {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Renderable that decodes its frame through a [`TileReader`].
pub struct TileRenderable {
    reader: Option<Box<dyn TileReader>>,
    tile: Option<DecodedTile>,
}

impl TileRenderable {
    /// Decoded samples, once initialised.
    pub fn tile(&self) -> Option<&DecodedTile> {
        self.tile.as_ref()
    }
}

impl Renderable for TileRenderable {
    fn initialize(&mut self) -> Result<()> {
        let reader = self.reader.as_ref().ok_or_else(|| {
            MosaicError::InvariantViolation("renderable initialized after release".to_string())
        })?;
        self.tile = Some(reader.decode()?);
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        self.tile.is_some()
    }

    fn release(&mut self) {
        self.tile = None;
        self.reader = None;
    }
}

/// Factory opening frames through a [`TileReaderRegistry`].
pub struct ReaderRenderableFactory {
    registry: Arc<TileReaderRegistry>,
    options: ReaderOptions,
}

impl ReaderRenderableFactory {
    pub fn new(registry: Arc<TileReaderRegistry>, options: ReaderOptions) -> Self {
        Self { registry, options }
    }
}

impl RenderableFactory for ReaderRenderableFactory {
    type Renderable = TileRenderable;

    fn instantiate(&mut self, frame: &Frame) -> Result<TileRenderable> {
        let reader = self
            .registry
            .open(&frame.path, &self.options)
            .ok_or_else(|| MosaicError::UnsupportedFormat {
                uri: frame.path.clone(),
            })?;
        Ok(TileRenderable {
            reader: Some(reader),
            tile: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::callback::NullCallback;
    use crate::mosaic::VecCursor;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Renderable tracking how many instances are alive.
    struct Counted {
        live: Arc<AtomicUsize>,
        fail_init: bool,
        initialized: bool,
        released: bool,
    }

    impl Renderable for Counted {
        fn initialize(&mut self) -> Result<()> {
            if self.fail_init {
                return Err(MosaicError::CorruptTile {
                    uri: "test".into(),
                    reason: "init".into(),
                });
            }
            self.initialized = true;
            Ok(())
        }

        fn is_initialized(&self) -> bool {
            self.initialized
        }

        fn release(&mut self) {
            assert!(!self.released, "released twice");
            self.released = true;
            self.live.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[derive(Default)]
    struct CountingFactory {
        live: Arc<AtomicUsize>,
        created: usize,
    }

    impl RenderableFactory for CountingFactory {
        type Renderable = Counted;

        fn instantiate(&mut self, frame: &Frame) -> Result<Counted> {
            if frame.source == "reject" {
                return Err(MosaicError::UnsupportedFormat {
                    uri: frame.path.clone(),
                });
            }
            self.created += 1;
            self.live.fetch_add(1, Ordering::SeqCst);
            Ok(Counted {
                live: Arc::clone(&self.live),
                fail_init: frame.source == "broken",
                initialized: false,
                released: false,
            })
        }
    }

    fn frame(path: &str, bounds: BoundingBox) -> Frame {
        Frame::new(path, "test", bounds, 30.0, 10, 10)
    }

    fn cursor(frames: Vec<Frame>) -> Box<dyn FrameCursor> {
        Box::new(VecCursor::from_frames(frames))
    }

    fn roi() -> BoundingBox {
        BoundingBox::new(0.0, 0.0, 2.0, 2.0)
    }

    #[test]
    fn test_visible_frames_are_loaded() {
        let mut cache = PreloadCache::new(CountingFactory::default());
        let frames = vec![
            frame("left", BoundingBox::new(0.0, 0.0, 2.0, 1.0)),
            frame("right", BoundingBox::new(0.0, 1.0, 2.0, 2.0)),
        ];

        let stats = cache.update(cursor(frames), &roi(), &mut NullCallback).unwrap();

        assert_eq!(stats.candidates, 2);
        assert_eq!(stats.instantiated, 2);
        assert_eq!(stats.occluded, 0);
        assert!(cache.is_loaded("left") && cache.is_loaded("right"));
        assert!(cache.renderables().all(|(_, r)| r.is_initialized()));
    }

    #[test]
    fn test_fully_covered_frame_is_occluded() {
        let mut cache = PreloadCache::new(CountingFactory::default());
        let frames = vec![
            frame("top-left", BoundingBox::new(0.0, 0.0, 2.0, 1.0)),
            frame("top-right", BoundingBox::new(0.0, 1.0, 2.0, 2.0)),
            frame("below", BoundingBox::new(0.0, 0.0, 2.0, 2.0)),
        ];

        let stats = cache.update(cursor(frames), &roi(), &mut NullCallback).unwrap();

        assert_eq!(stats.occluded, 1);
        assert!(!cache.is_loaded("below"));
        let order: Vec<&str> = cache.renderables().map(|(uri, _)| uri).collect();
        assert_eq!(order, vec!["top-left", "top-right"]);
    }

    #[test]
    fn test_frame_outside_roi_is_occluded() {
        let mut cache = PreloadCache::new(CountingFactory::default());
        let frames = vec![
            frame("outside", BoundingBox::new(5.0, 5.0, 6.0, 6.0)),
            frame("touching", BoundingBox::new(2.0, 0.0, 3.0, 2.0)),
        ];

        let stats = cache.update(cursor(frames), &roi(), &mut NullCallback).unwrap();
        assert_eq!(stats.occluded, 2);
        assert_eq!(cache.loaded_count(), 0);
    }

    #[test]
    fn test_loaded_frames_are_reused_then_evicted() {
        let mut cache = PreloadCache::new(CountingFactory::default());
        let a = frame("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let b = frame("b", BoundingBox::new(1.0, 1.0, 2.0, 2.0));

        cache
            .update(cursor(vec![a.clone(), b]), &roi(), &mut NullCallback)
            .unwrap();
        let stats = cache.update(cursor(vec![a]), &roi(), &mut NullCallback).unwrap();

        assert_eq!(stats.reused, 1);
        assert_eq!(stats.instantiated, 0);
        assert_eq!(stats.evicted, 1);
        assert!(cache.is_loaded("a"));
        assert!(!cache.is_loaded("b"));
        assert_eq!(cache.factory().created, 2);
    }

    #[test]
    fn test_prepare_keeps_sets_disjoint() {
        let mut cache = PreloadCache::new(CountingFactory::default());
        let a = frame("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let b = frame("b", BoundingBox::new(1.0, 1.0, 2.0, 2.0));

        cache.update(cursor(vec![a.clone()]), &roi(), &mut NullCallback).unwrap();
        cache.prepare(cursor(vec![a, b]), &roi(), &mut NullCallback).unwrap();

        let pending: Vec<&str> = cache.pending().pending_uris().collect();
        assert_eq!(pending, vec!["b"]);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_malformed_bounds_are_reported_and_skipped() {
        #[derive(Default)]
        struct Errors(Vec<bool>);

        impl RequestCallback for Errors {
            fn on_request_error(&mut self, _: &MosaicError, _: &str, fatal: bool) -> bool {
                self.0.push(fatal);
                true
            }
        }

        let mut cache = PreloadCache::new(CountingFactory::default());
        let frames = vec![
            frame("nan", BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0)),
            frame("inverted", BoundingBox::new(1.0, 0.0, 0.0, 1.0)),
            frame("good", BoundingBox::new(0.0, 0.0, 1.0, 1.0)),
        ];
        let mut errors = Errors::default();

        let stats = cache.update(cursor(frames), &roi(), &mut errors).unwrap();

        assert_eq!(errors.0, vec![false, false]);
        assert_eq!(stats.failed, 2);
        assert!(cache.is_loaded("good"));
    }

    #[test]
    fn test_callback_can_cancel_pass() {
        struct Stop;

        impl RequestCallback for Stop {
            fn on_request_error(&mut self, _: &MosaicError, _: &str, _: bool) -> bool {
                false
            }
        }

        let mut cache = PreloadCache::new(CountingFactory::default());
        let mut rejected = frame("rejected", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        rejected.source = "reject".into();
        let frames = vec![rejected, frame("later", BoundingBox::new(1.0, 1.0, 2.0, 2.0))];

        let stats = cache.update(cursor(frames), &roi(), &mut Stop).unwrap();
        assert_eq!(stats.candidates, 1);
        assert_eq!(cache.loaded_count(), 0);
    }

    #[test]
    fn test_canceled_pass_keeps_loaded_frames() {
        struct Stop;

        impl RequestCallback for Stop {
            fn on_request_error(&mut self, _: &MosaicError, _: &str, _: bool) -> bool {
                false
            }
        }

        let mut cache = PreloadCache::new(CountingFactory::default());
        let a = frame("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        let b = frame("b", BoundingBox::new(1.0, 1.0, 2.0, 2.0));
        cache
            .update(cursor(vec![a.clone(), b.clone()]), &roi(), &mut NullCallback)
            .unwrap();
        assert_eq!(cache.loaded_count(), 2);

        let mut rejected = frame("rejected", BoundingBox::new(0.0, 0.0, 0.5, 0.5));
        rejected.source = "reject".into();
        let stats = cache
            .update(cursor(vec![rejected, a, b]), &roi(), &mut Stop)
            .unwrap();

        assert_eq!(stats.evicted, 0);
        assert_eq!(cache.loaded_count(), 2);
        assert!(cache.is_loaded("a") && cache.is_loaded("b"));
        assert_eq!(cache.renderables().count(), 2);
        cache.check_invariants().unwrap();
    }

    #[test]
    fn test_failed_initialization_is_released() {
        let factory = CountingFactory::default();
        let live = Arc::clone(&factory.live);
        let mut cache = PreloadCache::new(factory);
        let mut broken = frame("broken", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
        broken.source = "broken".into();

        let stats = cache.update(cursor(vec![broken]), &roi(), &mut NullCallback).unwrap();

        assert_eq!(stats.failed, 1);
        assert_eq!(cache.loaded_count(), 0);
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_drop_releases_everything() {
        let factory = CountingFactory::default();
        let live = Arc::clone(&factory.live);
        {
            let mut cache = PreloadCache::new(factory);
            let a = frame("a", BoundingBox::new(0.0, 0.0, 1.0, 1.0));
            let b = frame("b", BoundingBox::new(1.0, 1.0, 2.0, 2.0));
            cache.update(cursor(vec![a]), &roi(), &mut NullCallback).unwrap();
            cache.prepare(cursor(vec![b]), &roi(), &mut NullCallback).unwrap();
            assert_eq!(live.load(Ordering::SeqCst), 2);
        }
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_reader_factory_decodes_on_commit() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("N35E138.hgt");
        std::fs::write(&path, vec![0u8; 1201 * 1201 * 2]).unwrap();

        let registry = Arc::new(TileReaderRegistry::with_defaults());
        let options = ReaderOptions {
            preferred_tile_size: Some(16),
        };
        let mut cache = PreloadCache::new(ReaderRenderableFactory::new(registry, options));
        let tile = Frame::new(
            path.to_string_lossy(),
            "hgt",
            BoundingBox::tile(35, 138),
            90.0,
            1201,
            1201,
        );
        let missing = Frame::new(
            dir.path().join("N36E138.hgt").to_string_lossy(),
            "hgt",
            BoundingBox::tile(36, 138),
            90.0,
            1201,
            1201,
        );

        let stats = cache
            .update(
                cursor(vec![tile, missing]),
                &BoundingBox::new(35.0, 138.0, 37.0, 139.0),
                &mut NullCallback,
            )
            .unwrap();

        assert_eq!(stats.failed, 1);
        let (_, renderable) = cache.renderables().next().unwrap();
        assert_eq!(renderable.tile().unwrap().width, 16);
    }

    fn arb_frame() -> impl Strategy<Value = Frame> {
        (0usize..8, 0u8..4, 0u8..4, 1u8..3, 1u8..3, 0u8..10).prop_map(
            |(id, lat, lon, h, w, kind)| {
                let mut f = frame(
                    &format!("f{}", id),
                    BoundingBox::new(
                        lat as f64 * 0.5,
                        lon as f64 * 0.5,
                        (lat + h) as f64 * 0.5,
                        (lon + w) as f64 * 0.5,
                    ),
                );
                f.source = match kind {
                    0 => "reject".into(),
                    1 => "broken".into(),
                    _ => "test".into(),
                };
                if kind == 2 {
                    f.bounds.max_lat = f64::NAN;
                }
                f
            },
        )
    }

    proptest! {
        #[test]
        fn prop_loaded_and_pending_stay_disjoint(
            cycles in prop::collection::vec(prop::collection::vec(arb_frame(), 0..12), 1..6)
        ) {
            let factory = CountingFactory::default();
            let live = Arc::clone(&factory.live);
            let mut cache = PreloadCache::new(factory);

            for frames in cycles {
                let uris: HashSet<String> = frames.iter().map(|f| f.path.clone()).collect();

                cache.prepare(cursor(frames), &roi(), &mut NullCallback).unwrap();
                prop_assert!(cache.check_invariants().is_ok());

                cache.commit();
                prop_assert!(cache.check_invariants().is_ok());
                prop_assert!(cache.loaded_uris().all(|uri| uris.contains(uri)));
                prop_assert_eq!(live.load(Ordering::SeqCst), cache.loaded_count());
            }

            drop(cache);
            prop_assert_eq!(live.load(Ordering::SeqCst), 0);
        }
    }
}
