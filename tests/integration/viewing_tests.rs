//! End-to-end viewing session tests.
//!
//! Tests verify:
//! - A session shows coarse placeholders first and real tiles after fetching
//! - Navigation and image changes surface as presentation events
//! - Zoom limits, preview marker and thumbnail access
//! - Frame capture feeds the JPEG snapshot encoder

use std::sync::Arc;

use parking_lot::Mutex;

use slide_viewer_core::geometry::{Point, Rect, Size};
use slide_viewer_core::loader::TaskExecutor;
use slide_viewer_core::render::{encode_jpeg, FrameBuffer};
use slide_viewer_core::session::{ViewerSession, ViewerSettings};
use slide_viewer_core::slide::{ImageIndex, SyntheticSlide, Tile, VirtualSlide};
use slide_viewer_core::view::{PresentationEvent, MAX_ZOOM};

use super::test_utils::{two_level_image, DeferredExecutor, InlineExecutor, TrackingMockImage};

fn settings() -> ViewerSettings {
    ViewerSettings {
        prefetch_radius: 0,
        max_thumbnail_bytes: 100 * 100,
        ..ViewerSettings::default()
    }
}

fn session_with(executor: Arc<dyn TaskExecutor>, image: &TrackingMockImage) -> ViewerSession {
    let mut slide = VirtualSlide::new("mock");
    slide.push_image(Arc::new(image.clone()));

    let mut session = ViewerSession::with_executor(&settings(), executor).unwrap();
    session.open_slide(slide);
    session.show_image(0).unwrap();
    session
}

fn record_events(session: &ViewerSession) -> Arc<Mutex<Vec<PresentationEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    session.presentation().subscribe(move |event| sink.lock().push(*event));
    events
}

fn pixel(frame: &FrameBuffer, x: u32, y: u32) -> u8 {
    frame.data()[(y * frame.size().width + x) as usize]
}

// =============================================================================
// Loading Through the Session
// =============================================================================

#[test]
fn test_placeholders_then_fetched_tiles() {
    let image = two_level_image("mock");
    let executor = DeferredExecutor::new();
    let mut session = session_with(executor.clone(), &image);

    let model = session.presentation_mut();
    model.set_viewport_size(Size::new(100, 100));
    assert_eq!(model.zoom(), 0.25);

    // Native size shows the top-left 100x100 of the 400x400 level
    model.set_zoom(1.0).unwrap();
    let events = record_events(&session);

    let mut frame = FrameBuffer::capture(session.presentation()).unwrap();
    assert_eq!(frame.size(), Size::new(100, 100));
    assert_eq!(executor.queued(), 4);

    let coarse = TrackingMockImage::tile_value(&Tile::new(0, 0, ImageIndex::at_resolution(0)));
    assert_eq!(pixel(&frame, 0, 0), coarse);
    assert_eq!(session.pending_fetches(), 4);

    assert_eq!(executor.run_all(), 4);
    assert_eq!(
        *events.lock(),
        vec![PresentationEvent::VisibleContentUpdated; 4]
    );

    frame.refresh(session.presentation()).unwrap();
    let fine = ImageIndex::at_resolution(1);
    assert_eq!(pixel(&frame, 0, 0), TrackingMockImage::tile_value(&Tile::new(0, 0, fine)));
    assert_eq!(pixel(&frame, 99, 0), TrackingMockImage::tile_value(&Tile::new(1, 0, fine)));
    assert_eq!(pixel(&frame, 99, 99), TrackingMockImage::tile_value(&Tile::new(1, 1, fine)));
    assert_eq!(executor.queued(), 0);
    assert_eq!(session.pending_fetches(), 0);
}

#[test]
fn test_switching_slides_cancels_fetches_and_clears_cache() {
    let image = two_level_image("first");
    let executor = DeferredExecutor::new();
    let mut session = session_with(executor.clone(), &image);

    session.presentation_mut().set_viewport_size(Size::new(100, 100));
    session.presentation_mut().set_zoom(1.0).unwrap();
    FrameBuffer::capture(session.presentation()).unwrap();
    assert!(!session.cache().is_empty());

    let other = two_level_image("second");
    let mut slide = VirtualSlide::new("mock");
    slide.push_image(Arc::new(other.clone()));
    session.open_slide(slide);

    assert!(session.cache().is_empty());
    assert!(!session.presentation().is_image_loaded());
    assert_eq!(executor.run_all(), 0);
    assert!(image.reads().iter().all(|tile| tile.resolution() == 0));
    assert_eq!(other.read_count(), 0);
}

// =============================================================================
// Events and Navigation
// =============================================================================

#[test]
fn test_navigation_events() {
    let image = two_level_image("mock");
    let mut session = session_with(InlineExecutor::new(), &image);
    let events = record_events(&session);

    session.presentation_mut().set_viewport_size(Size::new(100, 100));
    events.lock().clear();

    session.presentation_mut().pan(10, 0);
    assert_eq!(*events.lock(), vec![PresentationEvent::VisibleContentUpdated]);

    events.lock().clear();
    session.show_image(0).unwrap();
    assert!(events.lock().contains(&PresentationEvent::ImageChanged));
}

#[test]
fn test_zoom_is_clamped() {
    let image = two_level_image("mock");
    let mut session = session_with(InlineExecutor::new(), &image);
    let model = session.presentation_mut();
    model.set_viewport_size(Size::new(100, 100));

    model.zoom_at(100, Point::new(50, 50)).unwrap();
    assert_eq!(model.zoom(), MAX_ZOOM);

    // Half the viewport fits the 400px image at 1/8
    model.zoom_at(-100, Point::new(50, 50)).unwrap();
    assert_eq!(model.zoom(), 0.125);
    assert_eq!(model.min_zoom().unwrap(), 0.125);
}

#[test]
fn test_preview_click_moves_marker() {
    let image = two_level_image("mock");
    let mut session = session_with(InlineExecutor::new(), &image);
    let model = session.presentation_mut();
    model.set_viewport_size(Size::new(100, 100));
    model.set_zoom(1.0).unwrap();

    model.handle_preview_click(Point::new(75, 25), Size::new(100, 100));

    assert_eq!(
        model.visible_region_marker_bounds(Rect::new(10, 20, 100, 100)),
        Rect::new(72, 32, 25, 25)
    );
}

#[test]
fn test_thumbnail_is_coarsest_level_when_every_level_fits() {
    let image = two_level_image("mock");
    let session = session_with(InlineExecutor::new(), &image);
    let model = session.presentation();

    // Both levels are far below the thumbnail cap
    let size = model.thumbnail_size().unwrap();
    assert_eq!(size, Size::new(100, 100));

    let mut thumbnail = vec![0u8; 100 * 100];
    model.load_thumbnail_into(&mut thumbnail).unwrap();

    let coarse = ImageIndex::at_resolution(0);
    assert_eq!(thumbnail[0], TrackingMockImage::tile_value(&Tile::new(0, 0, coarse)));
    assert_eq!(
        thumbnail[100 * 100 - 1],
        TrackingMockImage::tile_value(&Tile::new(1, 1, coarse))
    );
    assert_eq!(image.read_count(), 4);

    let mut small = vec![0u8; 10];
    assert!(model.load_thumbnail_into(&mut small).is_err());
}

// =============================================================================
// Snapshots
// =============================================================================

#[test]
fn test_snapshot_of_settled_frame() {
    let mut slide = VirtualSlide::new("synthetic");
    slide.push_image(Arc::new(SyntheticSlide::pyramid(
        "synthetic",
        Size::new(2048, 1536),
        Size::new(256, 256),
        true,
    )));

    let mut session = ViewerSession::with_executor(&settings(), InlineExecutor::new()).unwrap();
    session.open_slide(slide);
    session.show_image(0).unwrap();
    session.presentation_mut().set_viewport_size(Size::new(320, 240));

    let mut frame = FrameBuffer::capture(session.presentation()).unwrap();
    frame.refresh(session.presentation()).unwrap();

    assert_eq!(frame.channels(), 3);
    assert_eq!(frame.size(), session.presentation().image_data_size().unwrap());

    let jpeg = encode_jpeg(&frame, 85).unwrap();
    assert_eq!(&jpeg[..2], &[0xFF, 0xD8]);
}
