//! Tile cache for decoded pixel data.
//!
//! This module defines the [`TileCache`] contract used by the engine and an
//! LRU implementation with size-based eviction.
//!
//! # Cache Key
//!
//! Tiles are cached by a composite key of:
//! - Image identifier
//! - Tile address (column, row, resolution, channel, z-plane, time point)
//!
//! Two images sharing an identifier must produce identical bytes for the same
//! tile; the cache never inspects the payload.
//!
//! # Size-Based Eviction
//!
//! [`LruTileCache`] tracks the total size of cached tiles in bytes and evicts
//! least-recently-used entries when the capacity is exceeded.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::error::CacheError;
use crate::slide::Tile;

/// Default cache capacity: 256MB
pub const DEFAULT_TILE_CACHE_CAPACITY: usize = 256 * 1024 * 1024;

/// Default maximum number of entries (to bound LRU overhead)
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

// =============================================================================
// Cache Contract
// =============================================================================

/// Key -> bytes store for decoded tiles, shared by every worker thread.
///
/// Writes for one key are idempotent, so implementations need no cross-key
/// coordination. A tile is either fully present or absent.
pub trait TileCache: Send + Sync {
    /// Store the decoded bytes of `tile`. The cache takes ownership of `data`.
    fn put(&self, image_id: &str, tile: &Tile, data: Bytes);

    /// Whether `tile` is resident.
    fn has(&self, image_id: &str, tile: &Tile) -> bool;

    /// Cached bytes of `tile`, or [`CacheError::NotFound`].
    fn get(&self, image_id: &str, tile: &Tile) -> Result<Bytes, CacheError>;

    /// Drop every entry.
    fn clear(&self);
}

// =============================================================================
// Cache Key
// =============================================================================

/// Cache key for decoded tiles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileCacheKey {
    /// Image identifier
    pub image_id: Arc<str>,

    /// Tile address within the image
    pub tile: Tile,
}

impl TileCacheKey {
    pub fn new(image_id: impl Into<Arc<str>>, tile: Tile) -> Self {
        Self {
            image_id: image_id.into(),
            tile,
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub size_bytes: usize,
    pub capacity_bytes: usize,
    pub hits: u64,
    pub misses: u64,
}

// =============================================================================
// LRU Tile Cache
// =============================================================================

struct CacheState {
    entries: LruCache<TileCacheKey, Bytes>,
    current_size: usize,
}

/// LRU cache for decoded tiles with size-based capacity.
///
/// # Thread Safety
///
/// All operations take a short mutex; the cache can be shared across worker
/// threads via `Arc`.
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use slide_viewer_core::cache::{LruTileCache, TileCache};
/// use slide_viewer_core::slide::{ImageIndex, Tile};
///
/// let cache = LruTileCache::new();
/// let tile = Tile::new(1, 2, ImageIndex::at_resolution(0));
///
/// cache.put("image-1", &tile, Bytes::from(vec![1, 2, 3]));
///
/// assert!(cache.has("image-1", &tile));
/// assert_eq!(cache.get("image-1", &tile).unwrap(), Bytes::from(vec![1, 2, 3]));
/// ```
pub struct LruTileCache {
    state: Mutex<CacheState>,

    /// Maximum total size in bytes
    max_size: usize,

    hits: AtomicU64,
    misses: AtomicU64,
}

impl LruTileCache {
    /// Create a new tile cache with default capacity (256MB).
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_TILE_CACHE_CAPACITY)
    }

    /// Create a new tile cache with the specified capacity in bytes.
    pub fn with_capacity(max_size: usize) -> Self {
        Self::with_capacity_and_entries(max_size, DEFAULT_MAX_ENTRIES)
    }

    /// Create a new tile cache with specified capacity and maximum entries.
    ///
    /// A `max_entries` of zero is treated as one.
    pub fn with_capacity_and_entries(max_size: usize, max_entries: usize) -> Self {
        let max_entries = NonZeroUsize::new(max_entries).unwrap_or(NonZeroUsize::MIN);

        Self {
            state: Mutex::new(CacheState {
                entries: LruCache::new(max_entries),
                current_size: 0,
            }),
            max_size,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Remove a tile from the cache, returning its data if it was resident.
    pub fn remove(&self, image_id: &str, tile: &Tile) -> Option<Bytes> {
        let mut state = self.state.lock();
        let data = state.entries.pop(&TileCacheKey::new(image_id, *tile))?;
        state.current_size = state.current_size.saturating_sub(data.len());
        Some(data)
    }

    /// Get the current number of cached tiles.
    pub fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.state.lock().entries.is_empty()
    }

    /// Get the current total size of cached tiles in bytes.
    pub fn size(&self) -> usize {
        self.state.lock().current_size
    }

    /// Get the maximum capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.state.lock();
        CacheStats {
            entries: state.entries.len(),
            size_bytes: state.current_size,
            capacity_bytes: self.max_size,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

impl TileCache for LruTileCache {
    /// If the cache is over capacity after insertion, least-recently-used
    /// entries are evicted until it is back within capacity.
    fn put(&self, image_id: &str, tile: &Tile, data: Bytes) {
        let data_size = data.len();
        let key = TileCacheKey::new(image_id, *tile);
        let mut state = self.state.lock();

        // `push` reports both a replaced value for this key and an entry
        // evicted by the entry-count bound
        if let Some((_, old)) = state.entries.push(key, data) {
            state.current_size = state.current_size.saturating_sub(old.len());
        }
        state.current_size += data_size;

        while state.current_size > self.max_size {
            match state.entries.pop_lru() {
                Some((_, evicted)) => {
                    state.current_size = state.current_size.saturating_sub(evicted.len());
                }
                None => break,
            }
        }
    }

    fn has(&self, image_id: &str, tile: &Tile) -> bool {
        self.state
            .lock()
            .entries
            .contains(&TileCacheKey::new(image_id, *tile))
    }

    fn get(&self, image_id: &str, tile: &Tile) -> Result<Bytes, CacheError> {
        let key = TileCacheKey::new(image_id, *tile);
        let found = self.state.lock().entries.get(&key).cloned();

        match found {
            Some(data) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Ok(data)
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                Err(CacheError::NotFound {
                    image_id: image_id.to_string(),
                    tile: *tile,
                })
            }
        }
    }

    fn clear(&self) {
        let mut state = self.state.lock();
        let dropped = state.entries.len();
        state.entries.clear();
        state.current_size = 0;
        debug!(dropped, "Tile cache cleared");
    }
}

impl Default for LruTileCache {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
