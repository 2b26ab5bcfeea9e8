//! # Slide Viewer Core
//!
//! Tiled viewing engine for multi-resolution virtual slide images.
//!
//! A virtual slide can be orders of magnitude larger than memory. This crate
//! keeps a viewer responsive over such images: the visible region is always
//! filled immediately, from cached tiles where possible and from rescaled
//! lower-resolution placeholders otherwise, while missing tiles are decoded on
//! background workers and announced once they land in the cache.
//!
//! ## Architecture
//!
//! - [`geometry`] - Size/point/rectangle types, fit math and pixel-buffer helpers
//! - [`slide`] - Image indices, tiles, the `VirtualSlideImage` trait and a procedural image
//! - [`cache`] - LRU tile cache, scratch buffer pool and the caching image decorator
//! - [`loader`] - Worker pool, prioritizers, prefetching, placeholders and the async loader
//! - [`view`] - Camera and the presentation model a rendering surface drives
//! - [`session`] - Wiring of all of the above behind one settings struct
//! - [`render`] - Frame capture and JPEG snapshots
//! - [`config`] - CLI configuration of the `slide-viewer` binary
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use slide_viewer_core::geometry::Size;
//! use slide_viewer_core::render::FrameBuffer;
//! use slide_viewer_core::session::{ViewerSession, ViewerSettings};
//! use slide_viewer_core::slide::{SyntheticSlide, VirtualSlide};
//!
//! let mut slide = VirtualSlide::new("synthetic");
//! slide.push_image(Arc::new(SyntheticSlide::pyramid(
//!     "demo",
//!     Size::new(20_000, 15_000),
//!     Size::new(256, 256),
//!     true,
//! )));
//!
//! let mut session = ViewerSession::new(&ViewerSettings::default()).unwrap();
//! session.open_slide(slide);
//! session.show_image(0).unwrap();
//! session.presentation_mut().set_viewport_size(Size::new(1024, 768));
//!
//! // Placeholders now, real pixels after the next content update.
//! let frame = FrameBuffer::capture(session.presentation()).unwrap();
//! assert_eq!(frame.channels(), 3);
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod geometry;
pub mod loader;
pub mod render;
pub mod session;
pub mod slide;
pub mod view;

// Re-export commonly used types
pub use cache::{BufferedImage, CacheStats, LruTileCache, TileCache};
pub use config::Config;
pub use error::{
    CacheError, ExecutorError, ImageError, ReadError, RenderError, SessionError, ViewError,
};
pub use events::{EventListeners, SubscriptionId};
pub use geometry::{Point, Rect, RectF, Size};
pub use loader::{
    AsyncVisibleImageLoader, DifferentResolutionsTileGenerator, DistanceToCenterPrioritizer,
    NeighbourPrefetchingStrategy, PlaceholderGenerator, PrefetchingStrategy, TaskExecutor,
    TileLoadingPrioritizer, VisibleAreaPrioritizer, VisibleImageLoader, WorkerPool,
};
pub use render::{encode_jpeg, FrameBuffer};
pub use session::{PrioritizerKind, ViewerSession, ViewerSettings};
pub use slide::{ImageIndex, SyntheticSlide, Tile, VirtualSlide, VirtualSlideImage};
pub use view::{Camera, CameraEvent, ImagePresentationModel, PresentationEvent};
