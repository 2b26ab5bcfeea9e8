//! Asynchronous loading of visible image regions.
//!
//! # Architecture
//!
//! ```text
//!  load_visible(image, dst, visible, index, on_update)
//!                      │
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │         AsyncVisibleImageLoader         │
//! │  1. cancel previous generation          │
//! │  2. tiles_in_area + prioritizer         │
//! │  3. cached? copy : placeholder + fetch  │
//! │  4. prefetching strategy                │
//! └──────────┬──────────────────┬───────────┘
//!            │ submit           │ placeholder
//!            ▼                  ▼
//! ┌───────────────────┐  ┌─────────────────────────┐
//! │   TaskExecutor    │  │  PlaceholderGenerator   │
//! │   (WorkerPool)    │  │  (other cached levels)  │
//! └─────────┬─────────┘  └─────────────────────────┘
//!           │ ensure_tile_cached, then on_update()
//!           ▼
//!      BufferedImage / TileCache
//! ```
//!
//! The caller never waits for I/O. Whatever is not cached yet is painted from
//! a placeholder, and `on_update` tells the caller when asking again would
//! return more real pixels.

mod executor;
mod placeholder;
mod prefetch;
mod prioritizer;
mod visible;

pub use executor::{Task, TaskExecutor, TaskHandle, WorkerPool};
pub use placeholder::{
    DifferentResolutionsTileGenerator, PlaceholderGenerator, SolidColorPlaceholder,
    DEFAULT_MAX_THUMBNAIL_BYTES,
};
pub use prefetch::{NeighbourPrefetchingStrategy, NoPrefetching, PrefetchingStrategy};
pub use prioritizer::{DistanceToCenterPrioritizer, TileLoadingPrioritizer, VisibleAreaPrioritizer};
pub use visible::{AsyncVisibleImageLoader, UpdateCallback, VisibleImageLoader};
