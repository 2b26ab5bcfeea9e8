//! Choice of off-screen tiles to warm the cache with.

use crate::geometry::Rect;
use crate::slide::{tile_grid_size, ImageIndex, Tile, VirtualSlideImage};

/// Decides which tiles to fetch ahead of need after a load request.
pub trait PrefetchingStrategy: Send + Sync {
    /// Tiles worth prefetching around `loaded`, a region in pixels at
    /// `index.resolution`. Tiles overlapping `loaded` are never returned.
    fn tiles_to_prefetch(&self, image: &dyn VirtualSlideImage, loaded: Rect, index: &ImageIndex) -> Vec<Tile>;
}

/// Prefetches a ring of tiles within a pixel radius around the loaded region.
#[derive(Debug, Clone, Copy)]
pub struct NeighbourPrefetchingStrategy {
    radius: u32,
}

impl NeighbourPrefetchingStrategy {
    /// `radius` is in pixels of the loaded resolution; it is converted into a
    /// whole number of tiles per axis, rounding up.
    pub fn new(radius: u32) -> Self {
        Self { radius }
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }
}

impl PrefetchingStrategy for NeighbourPrefetchingStrategy {
    fn tiles_to_prefetch(&self, image: &dyn VirtualSlideImage, loaded: Rect, index: &ImageIndex) -> Vec<Tile> {
        let Some(level) = image.level_info(index.resolution) else {
            return Vec::new();
        };
        let tile_w = level.tile_width as u64;
        let tile_h = level.tile_height as u64;
        if tile_w == 0 || tile_h == 0 {
            return Vec::new();
        }

        // Tile coordinates covered by the loaded region, as a half-open range
        let loaded_x0 = loaded.x as u64 / tile_w;
        let loaded_y0 = loaded.y as u64 / tile_h;
        let loaded_x1 = loaded.right().div_ceil(tile_w);
        let loaded_y1 = loaded.bottom().div_ceil(tile_h);

        let radius_x = (self.radius as u64).div_ceil(tile_w);
        let radius_y = (self.radius as u64).div_ceil(tile_h);

        let grid = tile_grid_size(level.image_size(), level.tile_size());
        let x0 = loaded_x0.saturating_sub(radius_x);
        let y0 = loaded_y0.saturating_sub(radius_y);
        let x1 = (loaded_x1 + radius_x).min(grid.width as u64);
        let y1 = (loaded_y1 + radius_y).min(grid.height as u64);

        let mut tiles = Vec::new();
        for row in y0..y1 {
            for column in x0..x1 {
                let inside_loaded =
                    (loaded_x0..loaded_x1).contains(&column) && (loaded_y0..loaded_y1).contains(&row);
                if !inside_loaded {
                    tiles.push(Tile::new(column as u32, row as u32, *index));
                }
            }
        }

        tiles
    }
}

/// Never prefetches anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPrefetching;

impl PrefetchingStrategy for NoPrefetching {
    fn tiles_to_prefetch(&self, _image: &dyn VirtualSlideImage, _loaded: Rect, _index: &ImageIndex) -> Vec<Tile> {
        Vec::new()
    }
}
