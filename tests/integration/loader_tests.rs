//! Visible-region loading integration tests.
//!
//! Tests verify:
//! - Placeholders fill the frame immediately and real tiles replace them
//! - Superseded requests never fetch or notify
//! - Prefetching warms the ring around the visible region
//! - The real worker pool delivers every tile

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use slide_viewer_core::cache::{BufferedImage, LruTileCache, TileCache};
use slide_viewer_core::error::ImageError;
use slide_viewer_core::geometry::{Rect, Size};
use slide_viewer_core::loader::{
    AsyncVisibleImageLoader, DifferentResolutionsTileGenerator, DistanceToCenterPrioritizer,
    NeighbourPrefetchingStrategy, NoPrefetching, SolidColorPlaceholder, TaskExecutor,
    UpdateCallback, VisibleImageLoader, WorkerPool,
};
use slide_viewer_core::slide::{ImageIndex, SyntheticSlide, Tile, VirtualSlideImage};

use super::test_utils::{two_level_image, DeferredExecutor, InlineExecutor, TrackingMockImage};

fn loader(executor: Arc<dyn TaskExecutor>) -> AsyncVisibleImageLoader {
    AsyncVisibleImageLoader::new(
        executor,
        Arc::new(SolidColorPlaceholder::new(0)),
        Arc::new(NoPrefetching),
        Arc::new(DistanceToCenterPrioritizer::new()),
    )
}

fn buffered(image: &TrackingMockImage) -> BufferedImage {
    BufferedImage::new(Arc::new(image.clone()), Arc::new(LruTileCache::new()))
}

fn counting_callback() -> (UpdateCallback, Arc<AtomicUsize>) {
    let count = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&count);
    (
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }),
        count,
    )
}

fn value_at(dst: &[u8], region: Rect, x: u32, y: u32) -> u8 {
    dst[((y - region.y) * region.width + (x - region.x)) as usize]
}

// =============================================================================
// Placeholders and Fetching
// =============================================================================

#[test]
fn test_second_load_returns_fetched_tiles() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = InlineExecutor::new();
    let loader = loader(executor.clone());

    let region = Rect::new(25, 25, 100, 100);
    let index = ImageIndex::at_resolution(1);
    let mut dst = vec![0xAAu8; 100 * 100];

    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();

    // 3x3 tiles overlap the region; all of them were placeholders
    assert_eq!(executor.submitted(), 9);
    assert_eq!(updates.load(Ordering::SeqCst), 9);
    assert_eq!(image.read_count(), 9);
    assert!(dst.iter().all(|&b| b == 0));

    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();

    assert_eq!(executor.submitted(), 9);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert_eq!(image.read_count(), 9);

    let first = Tile::new(0, 0, index);
    let middle = Tile::new(1, 1, index);
    let last = Tile::new(2, 2, index);
    assert_eq!(value_at(&dst, region, 25, 25), TrackingMockImage::tile_value(&first));
    assert_eq!(value_at(&dst, region, 75, 75), TrackingMockImage::tile_value(&middle));
    assert_eq!(value_at(&dst, region, 124, 124), TrackingMockImage::tile_value(&last));
}

#[test]
fn test_coarse_level_placeholder_until_fetched() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();

    // Cap admits only the 100x100 level as thumbnail
    let loader = AsyncVisibleImageLoader::new(
        executor.clone(),
        Arc::new(DifferentResolutionsTileGenerator::with_max_thumbnail_bytes(100 * 100)),
        Arc::new(NoPrefetching),
        Arc::new(DistanceToCenterPrioritizer::new()),
    );

    let region = Rect::new(150, 150, 100, 100);
    let index = ImageIndex::at_resolution(1);
    let mut dst = vec![0u8; 100 * 100];

    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update.clone())
        .unwrap();

    assert_eq!(executor.queued(), 4);
    assert!(image.reads().iter().all(|tile| tile.resolution() == 0));

    let coarse_top_left = Tile::new(0, 0, ImageIndex::at_resolution(0));
    let coarse_bottom_right = Tile::new(1, 1, ImageIndex::at_resolution(0));
    assert_eq!(
        value_at(&dst, region, 150, 150),
        TrackingMockImage::tile_value(&coarse_top_left)
    );
    assert_eq!(
        value_at(&dst, region, 249, 249),
        TrackingMockImage::tile_value(&coarse_bottom_right)
    );

    assert_eq!(executor.run_all(), 4);
    assert_eq!(updates.load(Ordering::SeqCst), 4);

    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();
    assert_eq!(executor.queued(), 0);
    assert_eq!(
        value_at(&dst, region, 150, 150),
        TrackingMockImage::tile_value(&Tile::new(3, 3, index))
    );
    assert_eq!(
        value_at(&dst, region, 249, 249),
        TrackingMockImage::tile_value(&Tile::new(4, 4, index))
    );
}

#[test]
fn test_small_pyramid_placeholders_come_from_coarsest_level() {
    let image = TrackingMockImage::new(
        "small",
        &[
            (Size::new(100, 100), Size::new(100, 100)),
            (Size::new(200, 200), Size::new(100, 100)),
            (Size::new(400, 400), Size::new(100, 100)),
        ],
    );
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();

    // Every level fits under the default cap
    let loader = AsyncVisibleImageLoader::new(
        executor.clone(),
        Arc::new(DifferentResolutionsTileGenerator::new()),
        Arc::new(NoPrefetching),
        Arc::new(DistanceToCenterPrioritizer::new()),
    );

    let region = Rect::new(0, 0, 400, 400);
    let index = ImageIndex::at_resolution(2);
    let mut dst = vec![0u8; 400 * 400];

    let (on_update, _) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();

    assert_eq!(executor.queued(), 16);
    assert_eq!(image.reads(), vec![Tile::new(0, 0, ImageIndex::at_resolution(0))]);

    let coarse = TrackingMockImage::tile_value(&Tile::new(0, 0, ImageIndex::at_resolution(0)));
    assert!(dst.iter().all(|&b| b == coarse));
}

#[test]
fn test_resident_thumbnail_means_no_synchronous_reads() {
    let image = TrackingMockImage::new(
        "small",
        &[
            (Size::new(100, 100), Size::new(100, 100)),
            (Size::new(200, 200), Size::new(100, 100)),
            (Size::new(400, 400), Size::new(100, 100)),
        ],
    );
    let buffered = buffered(&image);
    buffered
        .ensure_tile_cached(&Tile::new(0, 0, ImageIndex::at_resolution(0)))
        .unwrap();
    let warmed = image.read_count();

    let executor = DeferredExecutor::new();
    let loader = AsyncVisibleImageLoader::new(
        executor.clone(),
        Arc::new(DifferentResolutionsTileGenerator::new()),
        Arc::new(NoPrefetching),
        Arc::new(DistanceToCenterPrioritizer::new()),
    );

    let mut dst = vec![0u8; 400 * 400];
    let (on_update, _) = counting_callback();
    loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(0, 0, 400, 400),
            &ImageIndex::at_resolution(2),
            on_update,
        )
        .unwrap();

    assert_eq!(image.read_count(), warmed);
    assert_eq!(executor.queued(), 16);
}

#[test]
fn test_rgb_region_assembly() {
    let image = two_level_image("rgb").rgb();
    let buffered = buffered(&image);
    let loader = loader(InlineExecutor::new());

    let region = Rect::new(40, 0, 20, 10);
    let index = ImageIndex::at_resolution(0);
    let mut dst = vec![0u8; 20 * 10 * 3];
    let (on_update, _) = counting_callback();

    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update.clone())
        .unwrap();
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();

    let left = TrackingMockImage::tile_value(&Tile::new(0, 0, index));
    let right = TrackingMockImage::tile_value(&Tile::new(1, 0, index));
    assert_eq!(&dst[..3], &[left, left, left]);
    assert_eq!(&dst[10 * 3..10 * 3 + 3], &[right, right, right]);
}

// =============================================================================
// Cancellation
// =============================================================================

#[test]
fn test_superseded_request_is_never_fetched() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();
    let loader = loader(executor.clone());
    let index = ImageIndex::at_resolution(1);

    let mut dst = vec![0u8; 50 * 50];
    let (first_update, first_count) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, Rect::new(0, 0, 50, 50), &index, first_update)
        .unwrap();

    let (second_update, second_count) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, Rect::new(350, 350, 50, 50), &index, second_update)
        .unwrap();

    assert_eq!(executor.queued(), 2);
    assert_eq!(executor.run_all(), 1);

    assert_eq!(first_count.load(Ordering::SeqCst), 0);
    assert_eq!(second_count.load(Ordering::SeqCst), 1);
    assert_eq!(image.reads(), vec![Tile::new(7, 7, index)]);
}

#[test]
fn test_cancel_pending_drops_queued_fetches() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();
    let loader = loader(executor.clone());

    let mut dst = vec![0u8; 100 * 100];
    let (on_update, updates) = counting_callback();
    loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(0, 0, 100, 100),
            &ImageIndex::at_resolution(1),
            on_update,
        )
        .unwrap();
    assert_eq!(loader.pending_count(), 4);

    loader.cancel_pending();

    assert_eq!(loader.pending_count(), 0);
    assert_eq!(executor.run_all(), 0);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert_eq!(image.read_count(), 0);
}

#[test]
fn test_fetch_cancelled_mid_read_is_not_cached() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();
    let loader = Arc::new(loader(executor.clone()));

    let index = ImageIndex::at_resolution(1);
    let mut dst = vec![0u8; 50 * 50];
    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, Rect::new(0, 0, 50, 50), &index, on_update)
        .unwrap();

    // The image is closed while its tile is being decoded
    let weak = Arc::downgrade(&loader);
    image.set_on_read(move || {
        if let Some(loader) = weak.upgrade() {
            loader.cancel_pending();
        }
    });

    assert_eq!(executor.run_all(), 1);
    assert_eq!(image.read_count(), 1);
    assert!(!buffered.cache().has("slide", &Tile::new(0, 0, index)));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
}

#[test]
fn test_fetch_superseded_mid_read_is_still_cached() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = DeferredExecutor::new();
    let loader = Arc::new(loader(executor.clone()));

    let index = ImageIndex::at_resolution(1);
    let mut dst = vec![0u8; 50 * 50];
    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, Rect::new(0, 0, 50, 50), &index, on_update.clone())
        .unwrap();

    // A pan issues a new load while the first tile is being decoded
    let weak = Arc::downgrade(&loader);
    let panned = buffered.clone();
    image.set_on_read(move || {
        if let Some(loader) = weak.upgrade() {
            let mut dst = vec![0u8; 50 * 50];
            loader
                .load_visible(&panned, &mut dst, Rect::new(200, 200, 50, 50), &index, on_update.clone())
                .unwrap();
        }
    });

    assert_eq!(executor.run_all(), 1);
    assert!(buffered.cache().has("slide", &Tile::new(0, 0, index)));
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert_eq!(executor.queued(), 1);
}

// =============================================================================
// Prefetching
// =============================================================================

#[test]
fn test_prefetch_ring_is_cached_without_notifications() {
    let image = two_level_image("slide");
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let executor = InlineExecutor::new();
    let loader = AsyncVisibleImageLoader::new(
        executor.clone(),
        Arc::new(SolidColorPlaceholder::new(0)),
        Arc::new(NeighbourPrefetchingStrategy::new(50)),
        Arc::new(DistanceToCenterPrioritizer::new()),
    );

    let index = ImageIndex::at_resolution(1);
    let mut dst = vec![0u8; 100 * 100];
    let (on_update, updates) = counting_callback();
    loader
        .load_visible(&buffered, &mut dst, Rect::new(100, 100, 100, 100), &index, on_update)
        .unwrap();

    // 2x2 visible tiles plus a one-tile ring around them
    assert_eq!(updates.load(Ordering::SeqCst), 4);
    assert_eq!(executor.submitted(), 16);
    assert_eq!(cache.len(), 16);
    assert!(cache.has("slide", &Tile::new(1, 1, index)));
    assert!(cache.has("slide", &Tile::new(4, 4, index)));
    assert!(!cache.has("slide", &Tile::new(5, 5, index)));
}

#[test]
fn test_prefetch_clipped_at_image_edge() {
    let image = two_level_image("slide");
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let loader = AsyncVisibleImageLoader::new(
        InlineExecutor::new(),
        Arc::new(SolidColorPlaceholder::new(0)),
        Arc::new(NeighbourPrefetchingStrategy::new(50)),
        Arc::new(DistanceToCenterPrioritizer::new()),
    );

    let mut dst = vec![0u8; 50 * 50];
    let (on_update, _) = counting_callback();
    loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(0, 0, 50, 50),
            &ImageIndex::at_resolution(1),
            on_update,
        )
        .unwrap();

    // Corner tile plus its three in-image neighbours
    assert_eq!(cache.len(), 4);
    assert!(image
        .reads()
        .iter()
        .all(|tile| tile.column <= 1 && tile.row <= 1));
}

// =============================================================================
// Failures
// =============================================================================

#[test]
fn test_failed_fetch_leaves_tile_uncached() {
    let image = two_level_image("broken").failing();
    let cache = Arc::new(LruTileCache::new());
    let buffered = BufferedImage::new(Arc::new(image.clone()), cache.clone());
    let loader = loader(InlineExecutor::new());

    let mut dst = vec![0u8; 50 * 50];
    let (on_update, updates) = counting_callback();
    loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(0, 0, 50, 50),
            &ImageIndex::at_resolution(0),
            on_update,
        )
        .unwrap();

    assert_eq!(image.read_count(), 1);
    assert_eq!(updates.load(Ordering::SeqCst), 0);
    assert!(cache.is_empty());
}

#[test]
fn test_invalid_requests_are_rejected() {
    let image = two_level_image("slide");
    let buffered = buffered(&image);
    let executor = InlineExecutor::new();
    let loader = loader(executor.clone());
    let (on_update, _) = counting_callback();

    let mut small = vec![0u8; 10];
    let err = loader
        .load_visible(
            &buffered,
            &mut small,
            Rect::new(0, 0, 50, 50),
            &ImageIndex::at_resolution(0),
            on_update.clone(),
        )
        .unwrap_err();
    assert!(matches!(err, ImageError::BufferTooSmall { required: 2500, actual: 10 }));

    let mut dst = vec![0u8; 50 * 50];
    let err = loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(80, 80, 50, 50),
            &ImageIndex::at_resolution(0),
            on_update.clone(),
        )
        .unwrap_err();
    assert!(matches!(err, ImageError::RegionOutOfBounds { .. }));

    let err = loader
        .load_visible(
            &buffered,
            &mut dst,
            Rect::new(0, 0, 50, 50),
            &ImageIndex::at_resolution(2),
            on_update,
        )
        .unwrap_err();
    assert!(matches!(err, ImageError::InvalidImageIndex { .. }));

    assert_eq!(executor.submitted(), 0);
}

// =============================================================================
// Worker Pool
// =============================================================================

#[test]
fn test_worker_pool_delivers_every_tile() {
    let slide = Arc::new(
        SyntheticSlide::builder("pooled")
            .level(Size::new(300, 200), Size::new(64, 64))
            .read_delay(Duration::from_millis(2))
            .build(),
    );
    let buffered = BufferedImage::new(slide.clone(), Arc::new(LruTileCache::new()));
    let loader = loader(Arc::new(WorkerPool::new(3).unwrap()));

    let region = Rect::new(10, 20, 250, 150);
    let index = ImageIndex::at_resolution(0);
    let mut dst = vec![0u8; 250 * 150];

    let (tx, rx) = mpsc::channel();
    let on_update: UpdateCallback = Arc::new(move || {
        let _ = tx.send(());
    });
    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update.clone())
        .unwrap();

    // Columns 0..=4, rows 0..=2
    for _ in 0..15 {
        rx.recv_timeout(Duration::from_secs(5)).unwrap();
    }
    assert_eq!(slide.read_count(), 15);

    loader
        .load_visible(&buffered, &mut dst, region, &index, on_update)
        .unwrap();

    let mut expected = vec![0u8; 250 * 150];
    slide.read_region(&mut expected, region, &index).unwrap();
    assert_eq!(dst, expected);
    assert_eq!(loader.pending_count(), 0);
}
