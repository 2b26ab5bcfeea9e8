//! Non-blocking assembly of the visible part of an image.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::cache::{BufferPool, BufferedImage, TileCache};
use crate::error::ImageError;
use crate::geometry::{buffer_len, copy_intersecting_region, Rect};
use crate::slide::{tiles_in_area, ImageIndex, Tile, VirtualSlideImage};

use super::executor::{TaskExecutor, TaskHandle};
use super::placeholder::PlaceholderGenerator;
use super::prefetch::PrefetchingStrategy;
use super::prioritizer::TileLoadingPrioritizer;

/// Invoked from a worker thread whenever a fetched tile lands in the cache.
pub type UpdateCallback = Arc<dyn Fn() + Send + Sync>;

/// Fills a buffer with the visible part of an image without waiting for I/O.
pub trait VisibleImageLoader: Send + Sync {
    /// Write the pixels of `visible` (at `index`) into `dst`, packed at
    /// `visible.width * visible.height * channels` bytes.
    ///
    /// Tiles that are not cached are written as placeholders and fetched in
    /// the background; `on_update` fires once per fetched tile, after which a
    /// repeated call returns more real data. Work started by a previous call
    /// is abandoned.
    fn load_visible(
        &self,
        image: &BufferedImage,
        dst: &mut [u8],
        visible: Rect,
        index: &ImageIndex,
        on_update: UpdateCallback,
    ) -> Result<(), ImageError>;

    /// Abandon every fetch started by previous calls.
    fn cancel_pending(&self);
}

/// [`VisibleImageLoader`] that fetches missing tiles on a [`TaskExecutor`].
///
/// Each call starts a new generation. Handles of the previous generation are
/// cancelled, and tasks that were already dequeued compare their generation
/// against the current one before doing any work. A task superseded by a
/// newer load still caches its tile; one abandoned by
/// [`cancel_pending`](VisibleImageLoader::cancel_pending) discards it.
pub struct AsyncVisibleImageLoader {
    executor: Arc<dyn TaskExecutor>,
    placeholders: Arc<dyn PlaceholderGenerator>,
    prefetching: Arc<dyn PrefetchingStrategy>,
    prioritizer: Arc<dyn TileLoadingPrioritizer>,
    generation: Arc<AtomicU64>,
    /// Tasks of generations below this were cancelled outright.
    retired: Arc<AtomicU64>,
    pending: Mutex<Vec<Box<dyn TaskHandle>>>,
    buffers: BufferPool,
}

impl AsyncVisibleImageLoader {
    pub fn new(
        executor: Arc<dyn TaskExecutor>,
        placeholders: Arc<dyn PlaceholderGenerator>,
        prefetching: Arc<dyn PrefetchingStrategy>,
        prioritizer: Arc<dyn TileLoadingPrioritizer>,
    ) -> Self {
        Self {
            executor,
            placeholders,
            prefetching,
            prioritizer,
            generation: Arc::new(AtomicU64::new(0)),
            retired: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(Vec::new()),
            buffers: BufferPool::new(),
        }
    }

    /// Number of submitted tasks that have not finished yet.
    pub fn pending_count(&self) -> usize {
        self.pending
            .lock()
            .iter()
            .filter(|handle| !handle.is_finished())
            .count()
    }

    /// Start a new generation and cancel everything submitted before it.
    fn next_generation(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        // Cancel outside the lock: an executor may run callbacks inline
        let previous = std::mem::take(&mut *self.pending.lock());
        for handle in &previous {
            handle.cancel();
        }

        generation
    }

    fn submit_fetch(
        &self,
        image: &BufferedImage,
        tile: Tile,
        generation: u64,
        on_update: Option<UpdateCallback>,
    ) -> Box<dyn TaskHandle> {
        let image = image.clone();
        let current = Arc::clone(&self.generation);
        let retired = Arc::clone(&self.retired);

        self.executor.submit(Box::new(move || {
            if current.load(Ordering::SeqCst) != generation {
                debug!(%tile, "Skipping fetch of a superseded request");
                return;
            }

            match image.cache_tile_if(&tile, || retired.load(Ordering::SeqCst) <= generation) {
                Ok(false) => {
                    debug!(%tile, "Discarding tile fetched for a cancelled request");
                }
                Ok(true) => {
                    // The cached tile stays useful; only the stale callback is dropped
                    if current.load(Ordering::SeqCst) != generation {
                        return;
                    }
                    if let Some(on_update) = on_update {
                        on_update();
                    }
                }
                Err(e) if e.is_interrupted() => {
                    debug!(%tile, "Tile fetch interrupted");
                }
                Err(e) => {
                    warn!(image = image.id(), %tile, error = %e, "Failed to fetch tile");
                }
            }
        }))
    }

    fn validate(
        image: &BufferedImage,
        dst: &[u8],
        visible: Rect,
        index: &ImageIndex,
    ) -> Result<(), ImageError> {
        image.check_index(index)?;

        let level = image.level(index.resolution)?;
        if !level.bounds().contains_rect(&visible) {
            return Err(ImageError::RegionOutOfBounds {
                region: visible,
                image_size: level.image_size(),
            });
        }

        let required = buffer_len(visible.size(), image.channels_per_pixel());
        if dst.len() < required {
            return Err(ImageError::BufferTooSmall {
                required,
                actual: dst.len(),
            });
        }

        Ok(())
    }
}

impl VisibleImageLoader for AsyncVisibleImageLoader {
    fn load_visible(
        &self,
        image: &BufferedImage,
        dst: &mut [u8],
        visible: Rect,
        index: &ImageIndex,
        on_update: UpdateCallback,
    ) -> Result<(), ImageError> {
        Self::validate(image, dst, visible, index)?;

        let generation = self.next_generation();
        let level = image.level(index.resolution)?;
        let channels = image.channels_per_pixel();

        let mut tiles = tiles_in_area(visible, level.tile_size(), *index);
        self.prioritizer.sort_by_priority(&mut tiles, image, visible);

        let mut scratch = self.buffers.borrow(buffer_len(level.tile_size(), channels));
        let mut submitted = Vec::new();
        let mut cached = 0usize;

        for tile in &tiles {
            let bounds = tile.bounds(level.image_size(), level.tile_size());
            let tile_data = &mut scratch[..buffer_len(bounds.size(), channels)];

            match image.cache().get(image.id(), tile) {
                Ok(data) => {
                    let n = data.len().min(tile_data.len());
                    tile_data[..n].copy_from_slice(&data[..n]);
                    tile_data[n..].fill(0);
                    cached += 1;
                }
                Err(_) => {
                    if let Err(e) = self.placeholders.placeholder(tile_data, image, tile) {
                        warn!(%tile, error = %e, "Placeholder generation failed");
                        tile_data.fill(0);
                    }
                    submitted.push(self.submit_fetch(image, *tile, generation, Some(Arc::clone(&on_update))));
                }
            }

            copy_intersecting_region(tile_data, bounds, dst, visible, channels)?;
        }
        drop(scratch);

        let fetching = submitted.len();
        for tile in self.prefetching.tiles_to_prefetch(image, visible, index) {
            if !image.is_valid_tile(&tile) {
                debug!(%tile, "Ignoring prefetch of a tile outside the image");
                continue;
            }
            if !image.cache().has(image.id(), &tile) {
                submitted.push(self.submit_fetch(image, tile, generation, None));
            }
        }

        debug!(
            image = image.id(),
            region = %visible,
            resolution = index.resolution,
            tiles = tiles.len(),
            cached,
            fetching,
            prefetching = submitted.len() - fetching,
            "Loaded visible region"
        );

        self.pending.lock().extend(submitted);
        Ok(())
    }

    fn cancel_pending(&self) {
        let generation = self.next_generation();
        self.retired.fetch_max(generation, Ordering::SeqCst);
    }
}

impl Drop for AsyncVisibleImageLoader {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}

impl fmt::Debug for AsyncVisibleImageLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncVisibleImageLoader")
            .field("generation", &self.generation.load(Ordering::SeqCst))
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
