//! Ordering of visible tiles before they are loaded.

use crate::geometry::Rect;
use crate::slide::{Tile, VirtualSlideImage};

/// Reorders the tiles of one load request, most important first.
pub trait TileLoadingPrioritizer: Send + Sync {
    /// Sort `tiles` in place. `visible` is the requested region at the tiles'
    /// resolution. Tiles the image does not know about sort last.
    fn sort_by_priority(&self, tiles: &mut [Tile], image: &dyn VirtualSlideImage, visible: Rect);
}

/// Tiles nearest to the centre of the visible region come first.
///
/// Centres are integer pixel centres (`x + width / 2`) compared by squared
/// distance. The sort is stable, so equidistant tiles keep their input order.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceToCenterPrioritizer;

impl DistanceToCenterPrioritizer {
    pub fn new() -> Self {
        Self
    }
}

fn center(bounds: Rect) -> (i64, i64) {
    (
        bounds.x as i64 + bounds.width as i64 / 2,
        bounds.y as i64 + bounds.height as i64 / 2,
    )
}

impl TileLoadingPrioritizer for DistanceToCenterPrioritizer {
    fn sort_by_priority(&self, tiles: &mut [Tile], image: &dyn VirtualSlideImage, visible: Rect) {
        let (cx, cy) = center(visible);

        tiles.sort_by_cached_key(|tile| match image.tile_bounds(tile) {
            Ok(bounds) => {
                let (tx, ty) = center(bounds);
                (tx - cx).pow(2) + (ty - cy).pow(2)
            }
            Err(_) => i64::MAX,
        });
    }
}

/// Tiles covering more of the visible region come first.
#[derive(Debug, Clone, Copy, Default)]
pub struct VisibleAreaPrioritizer;

impl VisibleAreaPrioritizer {
    pub fn new() -> Self {
        Self
    }
}

impl TileLoadingPrioritizer for VisibleAreaPrioritizer {
    fn sort_by_priority(&self, tiles: &mut [Tile], image: &dyn VirtualSlideImage, visible: Rect) {
        tiles.sort_by_cached_key(|tile| {
            let area = image
                .tile_bounds(tile)
                .ok()
                .and_then(|bounds| bounds.intersection(&visible))
                .map_or(0, |overlap| overlap.area());
            std::cmp::Reverse(area)
        });
    }
}
