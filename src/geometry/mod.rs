//! Coordinate types and pixel-space algebra.
//!
//! Everything here is pure: no state, no I/O. The tile grid enumeration lives
//! next to [`crate::slide::Tile`] since it produces tiles.
//!
//! # Components
//!
//! - [`Size`], [`Point`], [`Rect`]: absolute pixel-space value types
//! - [`RectF`]: relative rectangles used by the camera
//! - [`copy_intersecting_region`]: paste the overlap of two same-space buffers
//! - [`scale_nearest`]: nearest-neighbour resampling for placeholders
//! - [`scale_to_fit`], [`relative_to_absolute`], [`scale_bounds_between`]: space conversions

mod fit;
mod rect;
mod region;

pub use fit::{clamp_to_image, relative_to_absolute, scale_bounds_between, scale_to_fit};
pub use rect::{Point, Rect, RectF, Size};
pub use region::{buffer_len, copy_intersecting_region, scale_nearest};
