//! One viewer's wiring of cache, workers, loader and presentation model.
//!
//! A session owns a single process-wide tile cache. Opening another slide
//! clears it, since cached tiles are keyed by image id and ids are only
//! unique within a slide.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;

use crate::cache::{BufferedImage, CacheStats, LruTileCache, TileCache, DEFAULT_MAX_ENTRIES, DEFAULT_TILE_CACHE_CAPACITY};
use crate::error::SessionError;
use crate::loader::{
    AsyncVisibleImageLoader, DifferentResolutionsTileGenerator, DistanceToCenterPrioritizer,
    NeighbourPrefetchingStrategy, NoPrefetching, PrefetchingStrategy, TaskExecutor,
    TileLoadingPrioritizer, VisibleAreaPrioritizer, WorkerPool, DEFAULT_MAX_THUMBNAIL_BYTES,
};
use crate::slide::{VirtualSlide, VirtualSlideImage};
use crate::view::{Camera, ImagePresentationModel, DEFAULT_TRANSITION_THRESHOLD, DEFAULT_ZOOM_INCREMENT};

/// Default prefetch radius around the visible region, in pixels.
pub const DEFAULT_PREFETCH_RADIUS: u32 = 512;

/// Order in which visible tiles are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrioritizerKind {
    #[default]
    DistanceToCenter,
    VisibleArea,
}

/// Library-level settings of a [`ViewerSession`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerSettings {
    /// Tile cache capacity in bytes
    pub cache_capacity: usize,

    /// Maximum number of cached tiles
    pub cache_entries: usize,

    /// Worker threads; 0 uses the available parallelism
    pub worker_threads: usize,

    /// Prefetch radius in pixels; 0 disables prefetching
    pub prefetch_radius: u32,

    pub zoom_increment: f64,
    pub transition_threshold: f64,
    pub prioritizer: PrioritizerKind,

    /// Byte cap of the level used as last-resort placeholder source
    pub max_thumbnail_bytes: u64,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_TILE_CACHE_CAPACITY,
            cache_entries: DEFAULT_MAX_ENTRIES,
            worker_threads: 0,
            prefetch_radius: DEFAULT_PREFETCH_RADIUS,
            zoom_increment: DEFAULT_ZOOM_INCREMENT,
            transition_threshold: DEFAULT_TRANSITION_THRESHOLD,
            prioritizer: PrioritizerKind::default(),
            max_thumbnail_bytes: DEFAULT_MAX_THUMBNAIL_BYTES,
        }
    }
}

pub struct ViewerSession {
    cache: Arc<LruTileCache>,
    loader: Arc<AsyncVisibleImageLoader>,
    presentation: ImagePresentationModel,
    slide: Option<VirtualSlide>,
    current_image: Option<usize>,
}

impl ViewerSession {
    /// Build a session running fetches on a dedicated [`WorkerPool`].
    pub fn new(settings: &ViewerSettings) -> Result<Self, SessionError> {
        let pool = if settings.worker_threads == 0 {
            WorkerPool::with_available_parallelism()?
        } else {
            WorkerPool::new(settings.worker_threads)?
        };
        info!(threads = pool.threads(), "Created tile worker pool");

        Self::with_executor(settings, Arc::new(pool))
    }

    /// Build a session on top of an existing executor.
    pub fn with_executor(settings: &ViewerSettings, executor: Arc<dyn TaskExecutor>) -> Result<Self, SessionError> {
        let cache = Arc::new(LruTileCache::with_capacity_and_entries(
            settings.cache_capacity,
            settings.cache_entries,
        ));

        let prefetching: Arc<dyn PrefetchingStrategy> = if settings.prefetch_radius == 0 {
            Arc::new(NoPrefetching)
        } else {
            Arc::new(NeighbourPrefetchingStrategy::new(settings.prefetch_radius))
        };
        let prioritizer: Arc<dyn TileLoadingPrioritizer> = match settings.prioritizer {
            PrioritizerKind::DistanceToCenter => Arc::new(DistanceToCenterPrioritizer::new()),
            PrioritizerKind::VisibleArea => Arc::new(VisibleAreaPrioritizer::new()),
        };
        let placeholders = Arc::new(DifferentResolutionsTileGenerator::with_max_thumbnail_bytes(
            settings.max_thumbnail_bytes,
        ));

        let loader = Arc::new(AsyncVisibleImageLoader::new(executor, placeholders, prefetching, prioritizer));

        let mut presentation = ImagePresentationModel::new(Camera::new(), loader.clone());
        presentation.set_zoom_increment(settings.zoom_increment)?;
        presentation.set_resolution_transition_threshold(settings.transition_threshold)?;

        Ok(Self {
            cache,
            loader,
            presentation,
            slide: None,
            current_image: None,
        })
    }

    /// Replace the open slide. The tile cache is cleared and nothing is shown
    /// until [`show_image`](Self::show_image) is called.
    pub fn open_slide(&mut self, slide: VirtualSlide) {
        self.close_slide();

        info!(format = slide.format(), images = slide.len(), "Opened slide");
        self.slide = Some(slide);
    }

    pub fn close_slide(&mut self) {
        self.presentation.clear_image();
        self.cache.clear();
        self.slide = None;
        self.current_image = None;
    }

    /// Present image `index` of the open slide through the shared cache.
    pub fn show_image(&mut self, index: usize) -> Result<(), SessionError> {
        let slide = self.slide.as_ref().ok_or(SessionError::NoSlide)?;
        let image = slide.image(index).ok_or(SessionError::ImageNotFound {
            index,
            count: slide.len(),
        })?;

        let cache: Arc<dyn TileCache> = self.cache.clone();
        let buffered = BufferedImage::new(Arc::clone(image), cache);
        info!(
            image = buffered.id(),
            name = buffered.name(),
            levels = buffered.resolution_count(),
            "Showing image"
        );

        self.presentation.set_image(buffered)?;
        self.current_image = Some(index);
        Ok(())
    }

    pub fn slide(&self) -> Option<&VirtualSlide> {
        self.slide.as_ref()
    }

    pub fn current_image(&self) -> Option<usize> {
        self.current_image
    }

    pub fn presentation(&self) -> &ImagePresentationModel {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut ImagePresentationModel {
        &mut self.presentation
    }

    pub fn cache(&self) -> &Arc<LruTileCache> {
        &self.cache
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Fetch tasks of the latest load that are still queued or running.
    pub fn pending_fetches(&self) -> usize {
        self.loader.pending_count()
    }
}
