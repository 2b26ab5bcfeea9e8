//! Tile caching layer.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       Loader / Placeholder policies     │
//! └────────────────────┬────────────────────┘
//!                      │ ensure_tile_cached / is_region_cached
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │              BufferedImage              │
//! │  ┌──────────────┐  ┌─────────────────┐  │
//! │  │  TileCache   │  │ source image    │  │
//! │  │  (decoded    │  │ (read_tile on   │  │
//! │  │   tiles)     │  │  cache miss)    │  │
//! │  └──────────────┘  └─────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Components
//!
//! - [`TileCache`]: contract for the process-wide decoded tile store
//! - [`LruTileCache`]: LRU implementation with size-based eviction
//! - [`BufferedImage`]: decorator serving an image's tiles through the cache
//! - [`BufferPool`]: thread-safe free list of scratch buffers

mod buffer_pool;
mod buffered;
mod tile_cache;

pub use buffer_pool::{BufferPool, PooledBuffer};
pub use buffered::BufferedImage;
pub use tile_cache::{
    CacheStats, LruTileCache, TileCache, TileCacheKey, DEFAULT_MAX_ENTRIES,
    DEFAULT_TILE_CACHE_CAPACITY,
};
