//! Tile addressing.
//!
//! An [`ImageIndex`] selects one plane of one resolution level; a [`Tile`]
//! selects one grid cell of that plane. Both are plain keys: they carry no
//! pixel data and are cheap to copy, hash and compare.

use std::fmt;

use crate::geometry::{Rect, Size};

// =============================================================================
// Image Index
// =============================================================================

/// Address of a single 2D plane inside a pyramidal image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ImageIndex {
    /// Resolution level (0..resolution_count)
    pub resolution: usize,

    /// Channel index
    pub channel: u32,

    /// Z-plane index
    pub z_plane: u32,

    /// Time point index
    pub time_point: u32,
}

impl ImageIndex {
    pub const fn new(resolution: usize, channel: u32, z_plane: u32, time_point: u32) -> Self {
        Self {
            resolution,
            channel,
            z_plane,
            time_point,
        }
    }

    /// First plane of the given resolution.
    pub const fn at_resolution(resolution: usize) -> Self {
        Self::new(resolution, 0, 0, 0)
    }

    /// Same plane at a different resolution level.
    pub const fn with_resolution(self, resolution: usize) -> Self {
        Self { resolution, ..self }
    }
}

impl fmt::Display for ImageIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[res {}, c {}, z {}, t {}]",
            self.resolution, self.channel, self.z_plane, self.time_point
        )
    }
}

// =============================================================================
// Tile
// =============================================================================

/// One cell of the tile grid of an image plane.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Tile {
    pub column: u32,
    pub row: u32,
    pub index: ImageIndex,
}

impl Tile {
    pub const fn new(column: u32, row: u32, index: ImageIndex) -> Self {
        Self { column, row, index }
    }

    pub const fn resolution(&self) -> usize {
        self.index.resolution
    }

    /// Pixel bounds of this tile in an image of `image_size` tiled by `tile_size`.
    ///
    /// Edge tiles are clipped to the image, so their width/height is
    /// `image_size - origin` rather than the nominal tile size. A tile that
    /// starts outside the image yields an empty rectangle.
    pub fn bounds(&self, image_size: Size, tile_size: Size) -> Rect {
        let x = self.column.saturating_mul(tile_size.width);
        let y = self.row.saturating_mul(tile_size.height);

        Rect::new(
            x,
            y,
            tile_size.width.min(image_size.width.saturating_sub(x)),
            tile_size.height.min(image_size.height.saturating_sub(y)),
        )
    }
}

impl fmt::Display for Tile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}) {}", self.column, self.row, self.index)
    }
}

// =============================================================================
// Grid Enumeration
// =============================================================================

/// Number of tiles along each axis needed to cover `image_size`.
pub fn tile_grid_size(image_size: Size, tile_size: Size) -> Size {
    Size::new(
        image_size.width.div_ceil(tile_size.width.max(1)),
        image_size.height.div_ceil(tile_size.height.max(1)),
    )
}

/// Every tile whose bounds intersect `area`, in row-major order.
///
/// Columns run from `floor(area.x / tile_width)` up to (excluding)
/// `ceil(area.right / tile_width)`, rows likewise.
pub fn tiles_in_area(area: Rect, tile_size: Size, index: ImageIndex) -> Vec<Tile> {
    let tile_width = tile_size.width.max(1) as u64;
    let tile_height = tile_size.height.max(1) as u64;

    let first_column = area.x as u64 / tile_width;
    let first_row = area.y as u64 / tile_height;
    let last_column = area.right().div_ceil(tile_width);
    let last_row = area.bottom().div_ceil(tile_height);

    let mut tiles = Vec::with_capacity(
        (last_column.saturating_sub(first_column) * last_row.saturating_sub(first_row)) as usize,
    );

    for row in first_row..last_row {
        for column in first_column..last_column {
            tiles.push(Tile::new(column as u32, row as u32, index));
        }
    }

    tiles
}

// =============================================================================
// Tests
// =============================================================================
