//! Cache-backed image decorator.
//!
//! [`BufferedImage`] composes a source image with a [`TileCache`]. Geometry
//! queries are forwarded unchanged; pixel reads go through the cache, decoding
//! from the source only on a miss.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

use crate::error::{ImageError, ReadError};
use crate::geometry::{copy_intersecting_region, Rect, Size};
use crate::slide::{tiles_in_area, ImageIndex, Tile, VirtualSlideImage};

use super::tile_cache::TileCache;

/// A [`VirtualSlideImage`] whose tiles are served from a shared tile cache.
#[derive(Clone)]
pub struct BufferedImage {
    inner: Arc<dyn VirtualSlideImage>,
    cache: Arc<dyn TileCache>,
}

impl BufferedImage {
    pub fn new(inner: Arc<dyn VirtualSlideImage>, cache: Arc<dyn TileCache>) -> Self {
        Self { inner, cache }
    }

    /// The undecorated source image.
    pub fn inner(&self) -> &Arc<dyn VirtualSlideImage> {
        &self.inner
    }

    pub fn cache(&self) -> &Arc<dyn TileCache> {
        &self.cache
    }

    /// Make sure `tile` is resident, decoding it from the source if needed.
    ///
    /// No lock is held between the check and the insert: two threads may both
    /// decode the same tile, and the second write simply replaces identical
    /// bytes. A failed decode leaves the tile absent.
    pub fn ensure_tile_cached(&self, tile: &Tile) -> Result<(), ReadError> {
        if self.cache.has(self.id(), tile) {
            return Ok(());
        }

        self.fetch(tile).map(|_| ())
    }

    /// Decode `tile` unless resident, inserting it only if `keep` still
    /// returns true once the read is done.
    ///
    /// Returns whether the tile is resident afterwards.
    pub fn cache_tile_if(&self, tile: &Tile, keep: impl FnOnce() -> bool) -> Result<bool, ReadError> {
        if self.cache.has(self.id(), tile) {
            return Ok(true);
        }

        let data = self.inner.read_tile_data(tile)?;
        if !keep() {
            return Ok(false);
        }

        self.cache.put(self.id(), tile, Bytes::from(data));
        Ok(true)
    }

    /// Whether every tile overlapping `bounds` in plane `index` is resident.
    pub fn is_region_cached(&self, bounds: Rect, index: &ImageIndex) -> bool {
        let Some(tile_size) = self.inner.tile_size(index.resolution) else {
            return false;
        };

        tiles_in_area(bounds, tile_size, *index)
            .iter()
            .all(|tile| self.cache.has(self.id(), tile))
    }

    /// Cached bytes of `tile`, decoding and inserting it on a miss.
    ///
    /// The decoded bytes are returned even when the cache evicts them straight
    /// away, so this never fails with [`CacheError::NotFound`].
    ///
    /// [`CacheError::NotFound`]: crate::error::CacheError::NotFound
    pub fn cached_tile(&self, tile: &Tile) -> Result<Bytes, ReadError> {
        match self.cache.get(self.id(), tile) {
            Ok(data) => Ok(data),
            Err(_) => self.fetch(tile),
        }
    }

    fn fetch(&self, tile: &Tile) -> Result<Bytes, ReadError> {
        let data = Bytes::from(self.inner.read_tile_data(tile)?);
        self.cache.put(self.id(), tile, data.clone());
        Ok(data)
    }
}

impl VirtualSlideImage for BufferedImage {
    fn id(&self) -> &str {
        self.inner.id()
    }

    fn name(&self) -> &str {
        self.inner.name()
    }

    fn resolution_count(&self) -> usize {
        self.inner.resolution_count()
    }

    fn image_size(&self, resolution: usize) -> Option<Size> {
        self.inner.image_size(resolution)
    }

    fn tile_size(&self, resolution: usize) -> Option<Size> {
        self.inner.tile_size(resolution)
    }

    fn channel_count(&self) -> u32 {
        self.inner.channel_count()
    }

    fn z_plane_count(&self) -> u32 {
        self.inner.z_plane_count()
    }

    fn time_point_count(&self) -> u32 {
        self.inner.time_point_count()
    }

    fn is_rgb(&self) -> bool {
        self.inner.is_rgb()
    }

    /// Copy the cached tile into `dst`, zero-filling any bytes past the
    /// cached payload.
    fn read_tile(&self, dst: &mut [u8], tile: &Tile) -> Result<(), ReadError> {
        let data = self.cached_tile(tile)?;
        if dst.len() < data.len() {
            return Err(ImageError::BufferTooSmall {
                required: data.len(),
                actual: dst.len(),
            }
            .into());
        }

        let (head, tail) = dst.split_at_mut(data.len());
        head.copy_from_slice(&data);
        tail.fill(0);
        Ok(())
    }

    /// Assemble a region straight from cached tiles, without scratch copies.
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
        for tile in tiles_in_area(bounds, level.tile_size(), *index) {
            let data = self.cached_tile(&tile)?;
            let tile_bounds = tile.bounds(level.image_size(), level.tile_size());
            copy_intersecting_region(&data, tile_bounds, dst, bounds, channels)?;
        }

        Ok(())
    }
}

impl fmt::Debug for BufferedImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferedImage")
            .field("id", &self.inner.id())
            .finish()
    }
}

// =============================================================================
// Tests
// =============================================================================
