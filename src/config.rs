//! Configuration for the `slide-viewer` binary.
//!
//! Every option can be given on the command line or through an environment
//! variable with the `SLIDE_VIEWER_` prefix:
//!
//! - `SLIDE_VIEWER_CACHE_CAPACITY` - Tile cache capacity in bytes (default: 256 MiB)
//! - `SLIDE_VIEWER_CACHE_ENTRIES` - Max cached tiles (default: 10000)
//! - `SLIDE_VIEWER_WORKER_THREADS` - Fetch workers, 0 = one per core (default: 0)
//! - `SLIDE_VIEWER_PREFETCH_RADIUS` - Prefetch ring in pixels (default: 512)
//! - `SLIDE_VIEWER_ZOOM_INCREMENT` - Zoom step factor (default: 1.1)
//! - `SLIDE_VIEWER_TRANSITION_THRESHOLD` - Level switch threshold (default: 0.5)
//! - `SLIDE_VIEWER_PRIORITIZER` - `distance` or `visible-area` (default: distance)
//!
//! The remaining options describe the procedural demo slide and the scripted
//! viewing session the binary runs. Library users build a
//! [`ViewerSettings`] directly and never touch clap.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::cache::{DEFAULT_MAX_ENTRIES, DEFAULT_TILE_CACHE_CAPACITY};
use crate::geometry::Size;
use crate::loader::DEFAULT_MAX_THUMBNAIL_BYTES;
use crate::render::DEFAULT_JPEG_QUALITY;
use crate::session::{PrioritizerKind, ViewerSettings, DEFAULT_PREFETCH_RADIUS};
use crate::view::{DEFAULT_TRANSITION_THRESHOLD, DEFAULT_ZOOM_INCREMENT};

// =============================================================================
// Default Values
// =============================================================================

/// Default worker thread count (0 = available parallelism).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Default full-resolution width of the demo slide.
pub const DEFAULT_SLIDE_WIDTH: u32 = 40_000;

/// Default full-resolution height of the demo slide.
pub const DEFAULT_SLIDE_HEIGHT: u32 = 30_000;

/// Default tile edge length of the demo slide.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Default number of pyramid levels of the demo slide.
pub const DEFAULT_LEVELS: u32 = 7;

/// Default simulated decode latency per tile, in milliseconds.
pub const DEFAULT_READ_DELAY_MS: u64 = 2;

pub const DEFAULT_VIEWPORT_WIDTH: u32 = 1280;

pub const DEFAULT_VIEWPORT_HEIGHT: u32 = 800;

/// Default number of scripted interaction steps.
pub const DEFAULT_STEPS: usize = 24;

/// Maximum number of pyramid levels accepted for the demo slide.
pub const MAX_LEVELS: u32 = 16;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Tile loading order, as accepted on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PrioritizerArg {
    /// Tiles closest to the viewport centre first
    #[default]
    Distance,
    /// Tiles covering the most visible area first
    VisibleArea,
}

impl From<PrioritizerArg> for PrioritizerKind {
    fn from(arg: PrioritizerArg) -> Self {
        match arg {
            PrioritizerArg::Distance => PrioritizerKind::DistanceToCenter,
            PrioritizerArg::VisibleArea => PrioritizerKind::VisibleArea,
        }
    }
}

/// Slide Viewer - drives a tiled viewing session over a procedural slide.
///
/// Builds a multi-resolution demo image, zooms and pans across it the way a
/// user would, and reports how the tile cache and loader behaved.
#[derive(Parser, Debug, Clone)]
#[command(name = "slide-viewer")]
#[command(author, version, about, long_about = None)]
pub struct Config {
    // =========================================================================
    // Cache Configuration
    // =========================================================================
    /// Tile cache capacity in bytes.
    #[arg(long, default_value_t = DEFAULT_TILE_CACHE_CAPACITY, env = "SLIDE_VIEWER_CACHE_CAPACITY")]
    pub cache_capacity: usize,

    /// Maximum number of tiles kept in the cache.
    #[arg(long, default_value_t = DEFAULT_MAX_ENTRIES, env = "SLIDE_VIEWER_CACHE_ENTRIES")]
    pub cache_entries: usize,

    // =========================================================================
    // Loader Configuration
    // =========================================================================
    /// Number of tile fetch workers (0 = one per CPU core).
    #[arg(long, default_value_t = DEFAULT_WORKER_THREADS, env = "SLIDE_VIEWER_WORKER_THREADS")]
    pub worker_threads: usize,

    /// Pixels around the visible region to prefetch (0 disables prefetching).
    #[arg(long, default_value_t = DEFAULT_PREFETCH_RADIUS, env = "SLIDE_VIEWER_PREFETCH_RADIUS")]
    pub prefetch_radius: u32,

    /// Order in which visible tiles are fetched.
    #[arg(long, value_enum, default_value_t = PrioritizerArg::Distance, env = "SLIDE_VIEWER_PRIORITIZER")]
    pub prioritizer: PrioritizerArg,

    /// Byte cap of the level used as the last-resort placeholder source.
    #[arg(long, default_value_t = DEFAULT_MAX_THUMBNAIL_BYTES, env = "SLIDE_VIEWER_MAX_THUMBNAIL_BYTES")]
    pub max_thumbnail_bytes: u64,

    // =========================================================================
    // View Configuration
    // =========================================================================
    /// Zoom factor applied per zoom step (must be greater than 1).
    #[arg(long, default_value_t = DEFAULT_ZOOM_INCREMENT, env = "SLIDE_VIEWER_ZOOM_INCREMENT")]
    pub zoom_increment: f64,

    /// Switch to a finer level once it is at least this fraction of the
    /// on-screen width (0 to 1).
    #[arg(long, default_value_t = DEFAULT_TRANSITION_THRESHOLD, env = "SLIDE_VIEWER_TRANSITION_THRESHOLD")]
    pub transition_threshold: f64,

    /// Viewport width in pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_WIDTH, env = "SLIDE_VIEWER_VIEWPORT_WIDTH")]
    pub viewport_width: u32,

    /// Viewport height in pixels.
    #[arg(long, default_value_t = DEFAULT_VIEWPORT_HEIGHT, env = "SLIDE_VIEWER_VIEWPORT_HEIGHT")]
    pub viewport_height: u32,

    // =========================================================================
    // Demo Slide
    // =========================================================================
    /// Full-resolution width of the demo slide.
    #[arg(long, default_value_t = DEFAULT_SLIDE_WIDTH, env = "SLIDE_VIEWER_WIDTH")]
    pub width: u32,

    /// Full-resolution height of the demo slide.
    #[arg(long, default_value_t = DEFAULT_SLIDE_HEIGHT, env = "SLIDE_VIEWER_HEIGHT")]
    pub height: u32,

    /// Tile edge length.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE, env = "SLIDE_VIEWER_TILE_SIZE")]
    pub tile_size: u32,

    /// Number of pyramid levels, each half the size of the next.
    #[arg(long, default_value_t = DEFAULT_LEVELS, env = "SLIDE_VIEWER_LEVELS")]
    pub levels: u32,

    /// Generate RGB instead of gray pixels.
    #[arg(long, default_value_t = false, env = "SLIDE_VIEWER_RGB")]
    pub rgb: bool,

    /// Simulated decode latency per tile, in milliseconds.
    #[arg(long, default_value_t = DEFAULT_READ_DELAY_MS, env = "SLIDE_VIEWER_READ_DELAY_MS")]
    pub read_delay_ms: u64,

    /// Number of scripted zoom/pan steps.
    #[arg(long, default_value_t = DEFAULT_STEPS, env = "SLIDE_VIEWER_STEPS")]
    pub steps: usize,

    // =========================================================================
    // Output
    // =========================================================================
    /// Write the final frame to this path as JPEG.
    #[arg(long, env = "SLIDE_VIEWER_SNAPSHOT")]
    pub snapshot: Option<PathBuf>,

    /// JPEG quality for the snapshot (1-100).
    #[arg(long, default_value_t = DEFAULT_JPEG_QUALITY, env = "SLIDE_VIEWER_JPEG_QUALITY")]
    pub jpeg_quality: u8,

    /// Print a JSON report on stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

impl Config {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.cache_capacity == 0 {
            return Err("cache_capacity must be greater than 0".to_string());
        }
        if self.cache_entries == 0 {
            return Err("cache_entries must be greater than 0".to_string());
        }

        if !self.zoom_increment.is_finite() || self.zoom_increment <= 1.0 {
            return Err("zoom_increment must be a finite number greater than 1".to_string());
        }
        if !(0.0..=1.0).contains(&self.transition_threshold) {
            return Err("transition_threshold must be between 0 and 1".to_string());
        }

        if self.viewport_width == 0 || self.viewport_height == 0 {
            return Err("viewport size must be non-zero".to_string());
        }
        if self.width == 0 || self.height == 0 {
            return Err("slide size must be non-zero".to_string());
        }
        if self.tile_size == 0 {
            return Err("tile_size must be greater than 0".to_string());
        }
        if self.levels == 0 || self.levels > MAX_LEVELS {
            return Err(format!("levels must be between 1 and {}", MAX_LEVELS));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err("jpeg_quality must be between 1 and 100".to_string());
        }

        Ok(())
    }

    /// Library settings for a [`ViewerSession`](crate::session::ViewerSession).
    pub fn settings(&self) -> ViewerSettings {
        ViewerSettings {
            cache_capacity: self.cache_capacity,
            cache_entries: self.cache_entries,
            worker_threads: self.worker_threads,
            prefetch_radius: self.prefetch_radius,
            zoom_increment: self.zoom_increment,
            transition_threshold: self.transition_threshold,
            prioritizer: self.prioritizer.into(),
            max_thumbnail_bytes: self.max_thumbnail_bytes,
        }
    }

    pub fn viewport_size(&self) -> Size {
        Size::new(self.viewport_width, self.viewport_height)
    }

    /// Pixel sizes of the demo slide's levels, smallest first.
    pub fn level_sizes(&self) -> Vec<Size> {
        let mut sizes = Vec::with_capacity(self.levels as usize);
        let mut current = Size::new(self.width, self.height);
        for _ in 0..self.levels {
            sizes.push(current);
            current = Size::new(current.width.div_ceil(2), current.height.div_ceil(2));
        }
        sizes.reverse();
        sizes
    }
}

// =============================================================================
// Tests
// =============================================================================
