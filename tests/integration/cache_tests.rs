//! Cache effectiveness integration tests.
//!
//! Tests verify:
//! - Cached tiles are never decoded twice
//! - Images sharing one cache stay apart by id
//! - Eviction under a byte budget and re-decoding of evicted tiles
//! - Concurrent fetches of the same tiles keep the cache consistent

use std::sync::Arc;
use std::thread;

use slide_viewer_core::cache::{BufferedImage, LruTileCache, TileCache};
use slide_viewer_core::geometry::{Rect, Size};
use slide_viewer_core::slide::{ImageIndex, Tile, VirtualSlideImage};

use super::test_utils::{two_level_image, TrackingMockImage};

// =============================================================================
// Tile Cache Effectiveness
// =============================================================================

#[test]
fn test_region_reads_hit_cache() {
    let image = two_level_image("slide");
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let index = ImageIndex::at_resolution(1);

    let mut first = vec![0u8; 120 * 80];
    buffered.read_region(&mut first, Rect::new(30, 10, 120, 80), &index).unwrap();
    let reads = image.read_count();
    assert_eq!(reads, 6);

    let mut second = vec![0u8; 120 * 80];
    buffered.read_region(&mut second, Rect::new(30, 10, 120, 80), &index).unwrap();

    assert_eq!(image.read_count(), reads);
    assert_eq!(first, second);

    let stats = cache.stats();
    assert_eq!(stats.entries, 6);
    assert!(stats.hits >= 6);
}

#[test]
fn test_images_share_cache_by_id() {
    let left = two_level_image("left");
    let right = two_level_image("right");
    let cache: Arc<LruTileCache> = Arc::new(LruTileCache::new());

    let left_buffered = BufferedImage::new(Arc::new(left.clone()), cache.clone());
    let right_buffered = BufferedImage::new(Arc::new(right.clone()), cache.clone());
    let tile = Tile::new(1, 1, ImageIndex::at_resolution(0));

    left_buffered.ensure_tile_cached(&tile).unwrap();
    assert!(cache.has("left", &tile));
    assert!(!cache.has("right", &tile));

    right_buffered.ensure_tile_cached(&tile).unwrap();
    assert_eq!(left.read_count(), 1);
    assert_eq!(right.read_count(), 1);
    assert_eq!(cache.len(), 2);
}

#[test]
fn test_evicted_tiles_are_decoded_again() {
    let image = two_level_image("slide");

    // Room for exactly two 50x50 gray tiles
    let cache = Arc::new(LruTileCache::with_capacity(2 * 50 * 50));
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let index = ImageIndex::at_resolution(1);

    let a = Tile::new(0, 0, index);
    let b = Tile::new(1, 0, index);
    let c = Tile::new(2, 0, index);

    buffered.ensure_tile_cached(&a).unwrap();
    buffered.ensure_tile_cached(&b).unwrap();
    buffered.ensure_tile_cached(&c).unwrap();

    assert_eq!(cache.len(), 2);
    assert!(!cache.has("slide", &a));
    assert!(cache.size() <= cache.capacity());

    let data = buffered.cached_tile(&a).unwrap();
    assert!(data.iter().all(|&v| v == TrackingMockImage::tile_value(&a)));
    assert_eq!(image.read_count(), 4);
}

#[test]
fn test_region_read_through_cache_smaller_than_a_tile() {
    let image = two_level_image("big");

    // Every 2500-byte tile is evicted as soon as it is inserted
    let cache = Arc::new(LruTileCache::with_capacity_and_entries(10, 100));
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let index = ImageIndex::at_resolution(1);

    let mut region = vec![0u8; 100 * 50];
    buffered.read_region(&mut region, Rect::new(0, 0, 100, 50), &index).unwrap();

    assert_eq!(region[0], TrackingMockImage::tile_value(&Tile::new(0, 0, index)));
    assert_eq!(region[99], TrackingMockImage::tile_value(&Tile::new(1, 0, index)));
    assert!(cache.is_empty());
    assert_eq!(image.read_count(), 2);
}

#[test]
fn test_edge_tiles_are_cached_at_clipped_size() {
    let image = TrackingMockImage::new("edge", &[(Size::new(120, 70), Size::new(50, 50))]);
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());

    let corner = Tile::new(2, 1, ImageIndex::at_resolution(0));
    let data = buffered.cached_tile(&corner).unwrap();

    assert_eq!(data.len(), 20 * 20);
    assert_eq!(cache.size(), 20 * 20);
}

// =============================================================================
// Concurrency
// =============================================================================

#[test]
fn test_concurrent_fetches_keep_cache_consistent() {
    let image = two_level_image("slide");
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let index = ImageIndex::at_resolution(1);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let buffered = buffered.clone();
            thread::spawn(move || {
                for row in 0..8 {
                    for column in 0..8 {
                        buffered.ensure_tile_cached(&Tile::new(column, row, index)).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.len(), 64);
    assert!(image.read_count() >= 64);

    let tile = Tile::new(5, 6, index);
    let data = cache.get("slide", &tile).unwrap();
    assert!(data.iter().all(|&v| v == TrackingMockImage::tile_value(&tile)));
}
