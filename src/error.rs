use thiserror::Error;

use crate::geometry::{Rect, Size};
use crate::slide::{ImageIndex, Tile};

/// Argument errors raised synchronously by geometry, image and loader calls.
///
/// These are never worth retrying: the caller asked for something that does
/// not exist in the image or handed over a buffer that cannot hold the result.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ImageError {
    /// Resolution, channel, z-plane or time point outside the image extents
    #[error("Invalid image index: {index}")]
    InvalidImageIndex { index: ImageIndex },

    /// Tile column or row outside the tile grid of its resolution
    #[error("Invalid tile: {tile}")]
    InvalidTile { tile: Tile },

    /// Resolution level does not exist
    #[error("Invalid resolution {resolution}: image has {count} level(s)")]
    InvalidResolution { resolution: usize, count: usize },

    /// Requested region is not fully inside the image
    #[error("Region {region} lies outside the image bounds {image_size}")]
    RegionOutOfBounds { region: Rect, image_size: Size },

    /// Destination (or source) buffer cannot hold the pixel data
    #[error("Buffer too small: need {required} bytes, got {actual}")]
    BufferTooSmall { required: usize, actual: usize },

    /// Any other rejected argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Errors returned by tile cache lookups.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CacheError {
    /// The tile is not resident; check `has` first or go through the ensure-cached path
    #[error("Tile {tile} of image '{image_id}' is not cached")]
    NotFound { image_id: String, tile: Tile },
}

/// Errors that can occur while reading pixel data from an image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReadError {
    /// The read was cancelled before it produced a result
    #[error("Tile read was interrupted")]
    Interrupted,

    /// The format decoder failed to produce pixels for the tile
    #[error("Failed to decode tile: {message}")]
    Decode { message: String },

    /// The request itself was invalid
    #[error(transparent)]
    Image(#[from] ImageError),

    /// Cache lookup failed
    #[error(transparent)]
    Cache(#[from] CacheError),
}

impl ReadError {
    /// Whether this error only signals cancellation and can be dropped silently.
    pub fn is_interrupted(&self) -> bool {
        matches!(self, ReadError::Interrupted)
    }
}

/// Errors raised by the camera and the presentation model.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ViewError {
    #[error("Zoom must be positive, got {0}")]
    InvalidZoom(f64),

    #[error("Zoom anchor must not be negative, got ({x}, {y})")]
    InvalidAnchor { x: i32, y: i32 },

    #[error("Zoom increment must be greater than 1.0, got {0}")]
    InvalidZoomIncrement(f64),

    #[error("Resolution transition threshold must be within [0, 1], got {0}")]
    InvalidTransitionThreshold(f64),

    #[error("No image is being presented")]
    NoImage,

    /// Channel, z-plane or time point outside the image extents
    #[error("{plane} {value} is out of range (image has {count})")]
    PlaneOutOfRange {
        plane: &'static str,
        value: u32,
        count: u32,
    },

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error(transparent)]
    Read(#[from] ReadError),
}

/// Errors raised while building a worker pool.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("Worker pool needs at least one thread")]
    NoThreads,

    #[error("Failed to start worker runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Errors raised while wiring or driving a viewer session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("No slide is open")]
    NoSlide,

    #[error("Slide has no image {index} ({count} image(s) available)")]
    ImageNotFound { index: usize, count: usize },

    #[error(transparent)]
    Executor(#[from] ExecutorError),

    #[error(transparent)]
    View(#[from] ViewError),
}

/// Errors raised while encoding a frame snapshot.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    #[error("Cannot encode an empty frame")]
    EmptyFrame,

    #[error("Unsupported channel count: {0}")]
    UnsupportedChannels(usize),

    #[error("Frame holds {actual} bytes, expected {expected}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Failed to encode frame: {message}")]
    Encode { message: String },
}
