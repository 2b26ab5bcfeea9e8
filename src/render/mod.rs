//! Frame capture for rendering surfaces and snapshots.
//!
//! A [`FrameBuffer`] holds exactly what the presentation model produced for
//! the current view; [`encode_jpeg`] turns it into a JPEG file body.

mod encoder;
mod frame;

pub use encoder::{clamp_quality, encode_jpeg, DEFAULT_JPEG_QUALITY, MAX_JPEG_QUALITY, MIN_JPEG_QUALITY};
pub use frame::FrameBuffer;
