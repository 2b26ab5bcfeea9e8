//! Slide and image abstraction layer.
//!
//! This module defines how the engine addresses and reads pyramidal images,
//! regardless of the format they were loaded from.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │              VirtualSlide               │
//! │   (ordered images of one slide file)    │
//! └────────────────────┬────────────────────┘
//!                      │ 1..n
//!                      ▼
//! ┌─────────────────────────────────────────┐
//! │        VirtualSlideImage Trait          │
//! │  (pyramid geometry + read_tile)         │
//! └────────────────────┬────────────────────┘
//!                      │
//!          ┌───────────┴───────────┐
//!          ▼                       ▼
//! ┌─────────────────┐    ┌─────────────────────┐
//! │  format loaders │    │   SyntheticSlide    │
//! │   (external)    │    │   (procedural)      │
//! └─────────────────┘    └─────────────────────┘
//! ```
//!
//! Pixels are addressed by [`Tile`] = (column, row, [`ImageIndex`]), where the
//! index selects resolution, channel, z-plane and time point.

mod collection;
mod image;
mod synthetic;
mod tile;

pub use collection::{SlideEvent, VirtualSlide};
pub use image::{LevelInfo, VirtualSlideImage};
pub use synthetic::{SyntheticSlide, SyntheticSlideBuilder};
pub use tile::{tile_grid_size, tiles_in_area, ImageIndex, Tile};
