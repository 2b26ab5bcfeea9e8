//! Stand-in pixels for tiles that are still being fetched.

use crate::cache::BufferedImage;
use crate::error::{ImageError, ReadError};
use crate::geometry::{buffer_len, scale_bounds_between, scale_nearest, Rect, Size};
use crate::slide::{ImageIndex, Tile, VirtualSlideImage};

/// Default byte cap of the level used as the last-resort placeholder source.
pub const DEFAULT_MAX_THUMBNAIL_BYTES: u64 = 3 * 1024 * 1024;

/// Produces placeholder pixels for a tile that is not cached yet.
pub trait PlaceholderGenerator: Send + Sync {
    /// Write a tile-sized placeholder for `tile` into `dst`, packed at the
    /// tile's clipped size.
    fn placeholder(&self, dst: &mut [u8], image: &BufferedImage, tile: &Tile) -> Result<(), ReadError>;
}

fn check_dst(dst: &[u8], image: &dyn VirtualSlideImage, bounds: Rect) -> Result<(), ImageError> {
    let required = buffer_len(bounds.size(), image.channels_per_pixel());
    if dst.len() < required {
        return Err(ImageError::BufferTooSmall {
            required,
            actual: dst.len(),
        });
    }
    Ok(())
}

// =============================================================================
// DifferentResolutionsTileGenerator
// =============================================================================

/// Upscales or downscales the same region from a level that is already cached.
///
/// Candidate levels are scanned from one level finer than the tile's own down
/// to the thumbnail level, skipping the tile's level. The first candidate
/// whose covering region is fully cached is resampled with nearest neighbour.
/// When none is, the thumbnail level is read, fetching it if necessary.
#[derive(Debug, Clone, Copy)]
pub struct DifferentResolutionsTileGenerator {
    max_thumbnail_bytes: u64,
}

impl DifferentResolutionsTileGenerator {
    pub fn new() -> Self {
        Self::with_max_thumbnail_bytes(DEFAULT_MAX_THUMBNAIL_BYTES)
    }

    /// Cap the byte size of the level used as the thumbnail.
    pub fn with_max_thumbnail_bytes(max_thumbnail_bytes: u64) -> Self {
        Self { max_thumbnail_bytes }
    }

    pub fn max_thumbnail_bytes(&self) -> u64 {
        self.max_thumbnail_bytes
    }

    fn resample(
        &self,
        dst: &mut [u8],
        image: &BufferedImage,
        source_bounds: Rect,
        source_index: &ImageIndex,
        tile_size: Size,
    ) -> Result<(), ReadError> {
        let channels = image.channels_per_pixel();
        let mut source = vec![0u8; buffer_len(source_bounds.size(), channels)];

        image.read_region(&mut source, source_bounds, source_index)?;
        scale_nearest(&source, source_bounds.size(), dst, tile_size, channels)?;
        Ok(())
    }
}

impl Default for DifferentResolutionsTileGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaceholderGenerator for DifferentResolutionsTileGenerator {
    fn placeholder(&self, dst: &mut [u8], image: &BufferedImage, tile: &Tile) -> Result<(), ReadError> {
        let tile_bounds = image.tile_bounds(tile)?;
        check_dst(dst, image, tile_bounds)?;

        let target = tile.resolution();
        let target_size = image.level(target)?.image_size();
        let thumbnail = image.thumbnail_resolution(self.max_thumbnail_bytes);
        let highest = (target + 1).min(image.resolution_count().saturating_sub(1));

        for resolution in (thumbnail..=highest).rev().filter(|&r| r != target) {
            let index = tile.index.with_resolution(resolution);
            let source_size = image.level(resolution)?.image_size();
            let source_bounds = scale_bounds_between(tile_bounds, target_size, source_size);

            if image.is_region_cached(source_bounds, &index) {
                return self.resample(dst, image, source_bounds, &index, tile_bounds.size());
            }
        }

        let index = tile.index.with_resolution(thumbnail);
        let thumbnail_size = image.level(thumbnail)?.image_size();
        let source_bounds = scale_bounds_between(tile_bounds, target_size, thumbnail_size);

        self.resample(dst, image, source_bounds, &index, tile_bounds.size())
    }
}

// =============================================================================
// SolidColorPlaceholder
// =============================================================================

/// Fills every placeholder with one byte value.
#[derive(Debug, Clone, Copy, Default)]
pub struct SolidColorPlaceholder {
    value: u8,
}

impl SolidColorPlaceholder {
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

impl PlaceholderGenerator for SolidColorPlaceholder {
    fn placeholder(&self, dst: &mut [u8], image: &BufferedImage, tile: &Tile) -> Result<(), ReadError> {
        let bounds = image.tile_bounds(tile)?;
        check_dst(dst, image, bounds)?;

        let len = buffer_len(bounds.size(), image.channels_per_pixel());
        dst[..len].fill(self.value);
        Ok(())
    }
}
