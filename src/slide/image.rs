//! The `VirtualSlideImage` trait for format-agnostic pyramid access.
//!
//! Format loaders implement this trait once per image series. The engine only
//! ever needs pyramid geometry and "decode this tile into that buffer"; every
//! other pixel operation is derived from those.

use crate::error::{ImageError, ReadError};
use crate::geometry::{buffer_len, copy_intersecting_region, Rect, Size};

use super::tile::{tile_grid_size, tiles_in_area, ImageIndex, Tile};

// =============================================================================
// Level Information
// =============================================================================

/// Snapshot of the geometry of one resolution level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelInfo {
    /// Width of this level in pixels
    pub width: u32,

    /// Height of this level in pixels
    pub height: u32,

    /// Width of each tile in pixels
    pub tile_width: u32,

    /// Height of each tile in pixels
    pub tile_height: u32,

    /// Number of tiles in X direction
    pub tiles_x: u32,

    /// Number of tiles in Y direction
    pub tiles_y: u32,
}

impl LevelInfo {
    pub fn new(image_size: Size, tile_size: Size) -> Self {
        let grid = tile_grid_size(image_size, tile_size);

        Self {
            width: image_size.width,
            height: image_size.height,
            tile_width: tile_size.width,
            tile_height: tile_size.height,
            tiles_x: grid.width,
            tiles_y: grid.height,
        }
    }

    pub fn image_size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    pub fn tile_size(&self) -> Size {
        Size::new(self.tile_width, self.tile_height)
    }

    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.image_size())
    }
}

// =============================================================================
// VirtualSlideImage Trait
// =============================================================================

/// A multi-resolution, multi-plane image that can be read tile by tile.
///
/// Resolution levels are indexed `0..resolution_count()` with non-decreasing
/// pixel dimensions, so the last level is the full-resolution image.
///
/// # Thread Safety
///
/// [`read_tile`](Self::read_tile) is called concurrently from worker threads,
/// for different tiles of the same instance. Implementations backed by a
/// single-threaded decoder must serialize or pool decoder access themselves.
pub trait VirtualSlideImage: Send + Sync {
    /// Stable identifier, used as the tile cache namespace.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    /// Number of resolution levels.
    fn resolution_count(&self) -> usize;

    /// Pixel size of a resolution level, or `None` if out of range.
    fn image_size(&self, resolution: usize) -> Option<Size>;

    /// Nominal tile size of a resolution level, or `None` if out of range.
    ///
    /// Edge tiles may be smaller than this size.
    fn tile_size(&self, resolution: usize) -> Option<Size>;

    fn channel_count(&self) -> u32;

    fn z_plane_count(&self) -> u32;

    fn time_point_count(&self) -> u32;

    /// Whether pixels are 3-byte interleaved RGB rather than 1-byte gray.
    fn is_rgb(&self) -> bool;

    /// Decode `tile` into `dst`.
    ///
    /// `dst` holds at least `tile_byte_size(tile)` bytes; the tile is written
    /// packed at its clipped size starting at offset 0.
    fn read_tile(&self, dst: &mut [u8], tile: &Tile) -> Result<(), ReadError>;

    /// Bytes per pixel.
    fn channels_per_pixel(&self) -> usize {
        if self.is_rgb() {
            3
        } else {
            1
        }
    }

    /// Complete geometry of a level.
    fn level_info(&self, resolution: usize) -> Option<LevelInfo> {
        let image_size = self.image_size(resolution)?;
        let tile_size = self.tile_size(resolution)?;

        Some(LevelInfo::new(image_size, tile_size))
    }

    /// Level geometry or an [`ImageError::InvalidResolution`].
    fn level(&self, resolution: usize) -> Result<LevelInfo, ImageError> {
        self.level_info(resolution)
            .ok_or(ImageError::InvalidResolution {
                resolution,
                count: self.resolution_count(),
            })
    }

    /// Pixel size of the full-resolution level.
    fn full_size(&self) -> Option<Size> {
        self.image_size(self.resolution_count().checked_sub(1)?)
    }

    /// Widths of every level, in level order.
    fn resolution_widths(&self) -> Vec<u32> {
        (0..self.resolution_count())
            .filter_map(|r| self.image_size(r).map(|s| s.width))
            .collect()
    }

    /// Whether every component of `index` lies within this image's extents.
    fn is_valid_index(&self, index: &ImageIndex) -> bool {
        index.resolution < self.resolution_count()
            && index.channel < self.channel_count()
            && index.z_plane < self.z_plane_count()
            && index.time_point < self.time_point_count()
    }

    fn check_index(&self, index: &ImageIndex) -> Result<(), ImageError> {
        if self.is_valid_index(index) {
            Ok(())
        } else {
            Err(ImageError::InvalidImageIndex { index: *index })
        }
    }

    /// Whether `tile` has a valid index and lies inside its level's tile grid.
    fn is_valid_tile(&self, tile: &Tile) -> bool {
        if !self.is_valid_index(&tile.index) {
            return false;
        }
        match self.level_info(tile.resolution()) {
            Some(level) => tile.column < level.tiles_x && tile.row < level.tiles_y,
            None => false,
        }
    }

    /// Clipped pixel bounds of `tile` at its resolution.
    fn tile_bounds(&self, tile: &Tile) -> Result<Rect, ImageError> {
        if !self.is_valid_tile(tile) {
            return Err(ImageError::InvalidTile { tile: *tile });
        }
        let level = self.level(tile.resolution())?;

        Ok(tile.bounds(level.image_size(), level.tile_size()))
    }

    /// Number of bytes `tile` occupies when packed at its clipped size.
    fn tile_byte_size(&self, tile: &Tile) -> Result<usize, ImageError> {
        let bounds = self.tile_bounds(tile)?;
        Ok(buffer_len(bounds.size(), self.channels_per_pixel()))
    }

    /// Read a tile into a freshly allocated buffer.
    fn read_tile_data(&self, tile: &Tile) -> Result<Vec<u8>, ReadError> {
        let mut data = vec![0u8; self.tile_byte_size(tile)?];
        self.read_tile(&mut data, tile)?;
        Ok(data)
    }

    /// Read an arbitrary region of one plane into `dst`, tile by tile.
    ///
    /// `bounds` must lie inside the image at `index.resolution`; `dst` receives
    /// the region packed at `bounds.width * bounds.height * channels` bytes.
    fn read_region(&self, dst: &mut [u8], bounds: Rect, index: &ImageIndex) -> Result<(), ReadError> {
        self.check_index(index)?;
        let level = self.level(index.resolution)?;
        if !level.bounds().contains_rect(&bounds) {
            return Err(ImageError::RegionOutOfBounds {
                region: bounds,
                image_size: level.image_size(),
            }
            .into());
        }

        let channels = self.channels_per_pixel();
        let mut scratch = vec![0u8; buffer_len(level.tile_size(), channels)];

        for tile in tiles_in_area(bounds, level.tile_size(), *index) {
            let tile_bounds = tile.bounds(level.image_size(), level.tile_size());
            let len = buffer_len(tile_bounds.size(), channels);

            self.read_tile(&mut scratch[..len], &tile)?;
            copy_intersecting_region(&scratch[..len], tile_bounds, dst, bounds, channels)?;
        }

        Ok(())
    }

    /// Resolution suitable as an always-resident thumbnail.
    ///
    /// The level just below the first one whose single-plane byte size
    /// exceeds `max_bytes`; level 0 when no level exceeds the cap.
    fn thumbnail_resolution(&self, max_bytes: u64) -> usize {
        let channels = self.channels_per_pixel() as u64;

        (1..self.resolution_count())
            .find(|&r| {
                self.image_size(r)
                    .is_some_and(|s| s.area() * channels > max_bytes)
            })
            .map_or(0, |r| r - 1)
    }
}

// =============================================================================
// Tests
// =============================================================================
