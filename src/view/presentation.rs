//! The entry point a rendering surface drives every frame.
//!
//! [`ImagePresentationModel`] ties a [`Camera`] to an image and a
//! [`VisibleImageLoader`]: it picks the pyramid level for the current zoom,
//! converts the camera's relative view into pixel bounds at that level and
//! asks the loader for the pixels.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::cache::BufferedImage;
use crate::error::{ImageError, ViewError};
use crate::events::{EventListeners, SubscriptionId};
use crate::geometry::{buffer_len, clamp_to_image, relative_to_absolute, scale_to_fit, Point, Rect, Size};
use crate::loader::{UpdateCallback, VisibleImageLoader};
use crate::slide::{ImageIndex, VirtualSlideImage};

use super::camera::Camera;

/// Upper bound of the zoom factor reachable through [`ImagePresentationModel::zoom_at`].
pub const MAX_ZOOM: f64 = 4.0;

/// Byte cap of the level served as the navigation thumbnail.
pub const MAX_THUMBNAIL_BYTES: u64 = 3 * 1024 * 1024;

pub const DEFAULT_ZOOM_INCREMENT: f64 = 1.1;

pub const DEFAULT_TRANSITION_THRESHOLD: f64 = 0.5;

/// Notifications for the rendering surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PresentationEvent {
    /// The visible pixels changed; request them again.
    VisibleContentUpdated,
    /// The image or the displayed plane changed.
    ImageChanged,
}

pub struct ImagePresentationModel {
    camera: Camera,
    loader: Arc<dyn VisibleImageLoader>,
    image: Option<BufferedImage>,
    has_image: Arc<AtomicBool>,
    listeners: Arc<EventListeners<PresentationEvent>>,
    zoom_increment: f64,
    transition_threshold: f64,
    channel: u32,
    z_plane: u32,
    time_point: u32,
}

impl ImagePresentationModel {
    pub fn new(camera: Camera, loader: Arc<dyn VisibleImageLoader>) -> Self {
        let listeners = Arc::new(EventListeners::new());
        let has_image = Arc::new(AtomicBool::new(false));

        {
            let listeners = Arc::clone(&listeners);
            let has_image = Arc::clone(&has_image);
            camera.subscribe(move |_| {
                if has_image.load(Ordering::SeqCst) {
                    listeners.emit(&PresentationEvent::VisibleContentUpdated);
                }
            });
        }

        Self {
            camera,
            loader,
            image: None,
            has_image,
            listeners,
            zoom_increment: DEFAULT_ZOOM_INCREMENT,
            transition_threshold: DEFAULT_TRANSITION_THRESHOLD,
            channel: 0,
            z_plane: 0,
            time_point: 0,
        }
    }

    /// Register a listener. Content updates may arrive from worker threads.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&PresentationEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    // =========================================================================
    // Image lifecycle
    // =========================================================================

    /// Present `image`, resetting the displayed plane to the first one.
    ///
    /// The camera is zoomed to fit as soon as a viewport size is known.
    pub fn set_image(&mut self, image: BufferedImage) -> Result<(), ViewError> {
        let full_size = image.full_size().ok_or(ImageError::InvalidResolution {
            resolution: 0,
            count: 0,
        })?;

        self.loader.cancel_pending();
        self.camera.set_image_size(full_size);
        if !self.camera.viewport_size().is_empty() {
            self.camera.zoom_to_fit();
        }

        self.image = Some(image);
        self.has_image.store(true, Ordering::SeqCst);
        self.channel = 0;
        self.z_plane = 0;
        self.time_point = 0;

        self.listeners.emit(&PresentationEvent::ImageChanged);
        Ok(())
    }

    pub fn clear_image(&mut self) {
        self.loader.cancel_pending();
        self.has_image.store(false, Ordering::SeqCst);
        self.image = None;

        self.listeners.emit(&PresentationEvent::ImageChanged);
    }

    pub fn is_image_loaded(&self) -> bool {
        self.image.is_some()
    }

    pub fn image(&self) -> Option<&BufferedImage> {
        self.image.as_ref()
    }

    fn current_image(&self) -> Result<&BufferedImage, ViewError> {
        self.image.as_ref().ok_or(ViewError::NoImage)
    }

    pub fn is_image_rgb(&self) -> Result<bool, ViewError> {
        Ok(self.current_image()?.is_rgb())
    }

    // =========================================================================
    // Navigation
    // =========================================================================

    pub fn pan(&mut self, dx: i32, dy: i32) {
        self.camera.pan(Point::new(dx, dy));
    }

    /// Zoom in (`increment > 0`) or out (`increment < 0`) by whole zoom steps,
    /// keeping the pixel under `point` in place.
    ///
    /// The resulting zoom is clamped to `[min_zoom, MAX_ZOOM]`.
    pub fn zoom_at(&mut self, increment: i32, point: Point) -> Result<(), ViewError> {
        let min_zoom = self.min_zoom()?;
        let step = self.zoom_increment * increment as f64;
        let zoom = self.camera.zoom();

        let target = if step >= 0.0 { zoom * step } else { zoom / -step };
        self.camera.set_zoom_at(target.max(min_zoom).min(MAX_ZOOM), point)
    }

    /// Smallest zoom at which the image still covers half the viewport,
    /// capped at native size.
    pub fn min_zoom(&self) -> Result<f64, ViewError> {
        let image = self.current_image()?;
        let full_size = image.full_size().ok_or(ViewError::NoImage)?;
        let viewport = self.camera.viewport_size();
        let half = Size::new(viewport.width / 2, viewport.height / 2);

        Ok(scale_to_fit(full_size, half).min(1.0))
    }

    pub fn max_zoom(&self) -> f64 {
        MAX_ZOOM
    }

    pub fn zoom(&self) -> f64 {
        self.camera.zoom()
    }

    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), ViewError> {
        self.camera.set_zoom(zoom)
    }

    /// Resize the viewport; the first non-trivial size also zooms to fit.
    pub fn set_viewport_size(&mut self, size: Size) {
        let first = self.camera.viewport_size() == Size::new(0, 0);

        self.camera.set_viewport_size(size);
        if first {
            self.camera.zoom_to_fit();
        }
    }

    /// Centre the view on a point clicked in a preview of size `preview_size`.
    pub fn handle_preview_click(&mut self, point: Point, preview_size: Size) {
        self.camera.set_position(
            point.x as f64 / preview_size.width as f64,
            point.y as f64 / preview_size.height as f64,
        );
    }

    /// Visible region drawn over a preview occupying `preview_bounds`.
    pub fn visible_region_marker_bounds(&self, preview_bounds: Rect) -> Rect {
        let visible = self.camera.visible_region_bounds();
        let width = preview_bounds.width as f64;
        let height = preview_bounds.height as f64;

        Rect::new(
            (visible.x * width) as u32 + preview_bounds.x,
            (visible.y * height) as u32 + preview_bounds.y,
            (visible.width * width) as u32,
            (visible.height * height) as u32,
        )
    }

    pub fn zoom_increment(&self) -> f64 {
        self.zoom_increment
    }

    pub fn set_zoom_increment(&mut self, zoom_increment: f64) -> Result<(), ViewError> {
        if !(zoom_increment > 1.0) {
            return Err(ViewError::InvalidZoomIncrement(zoom_increment));
        }
        self.zoom_increment = zoom_increment;
        Ok(())
    }

    pub fn resolution_transition_threshold(&self) -> f64 {
        self.transition_threshold
    }

    pub fn set_resolution_transition_threshold(&mut self, threshold: f64) -> Result<(), ViewError> {
        if !(0.0..=1.0).contains(&threshold) {
            return Err(ViewError::InvalidTransitionThreshold(threshold));
        }
        self.transition_threshold = threshold;
        Ok(())
    }

    // =========================================================================
    // Pixel data
    // =========================================================================

    /// Size of the visible region on screen, at the current zoom.
    pub fn visible_image_region_size(&self) -> Size {
        self.camera.absolute_visible_region_bounds().size()
    }

    fn loading_resolution(&self, image: &BufferedImage) -> usize {
        self.camera
            .best_resolution_for_zoom(&image.resolution_widths(), self.transition_threshold)
    }

    fn visible_bounds_at(&self, image: &BufferedImage, resolution: usize) -> Result<Rect, ViewError> {
        let level_size = image.level(resolution)?.image_size();
        let bounds = relative_to_absolute(self.camera.visible_region_bounds(), level_size);

        Ok(clamp_to_image(bounds, level_size))
    }

    /// Pixel size of the buffer [`load_image_data_into`](Self::load_image_data_into) fills.
    pub fn image_data_size(&self) -> Result<Size, ViewError> {
        let image = self.current_image()?;
        let resolution = self.loading_resolution(image);

        Ok(self.visible_bounds_at(image, resolution)?.size())
    }

    /// Fill `dst` with the visible region at the best level for the current
    /// zoom. Missing tiles arrive later and are announced with
    /// [`PresentationEvent::VisibleContentUpdated`].
    pub fn load_image_data_into(&self, dst: &mut [u8]) -> Result<(), ViewError> {
        let image = self.current_image()?;
        let resolution = self.loading_resolution(image);
        let bounds = self.visible_bounds_at(image, resolution)?;

        let listeners = Arc::clone(&self.listeners);
        let on_update: UpdateCallback = Arc::new(move || {
            listeners.emit(&PresentationEvent::VisibleContentUpdated);
        });

        self.loader
            .load_visible(image, dst, bounds, &self.current_index(resolution), on_update)?;
        Ok(())
    }

    fn thumbnail_resolution(&self, image: &BufferedImage) -> usize {
        image.thumbnail_resolution(MAX_THUMBNAIL_BYTES)
    }

    pub fn thumbnail_size(&self) -> Result<Size, ViewError> {
        let image = self.current_image()?;

        Ok(image.level(self.thumbnail_resolution(image))?.image_size())
    }

    /// Read the whole thumbnail level of the current plane into `dst`.
    ///
    /// This blocks until every thumbnail tile is cached.
    pub fn load_thumbnail_into(&self, dst: &mut [u8]) -> Result<(), ViewError> {
        let image = self.current_image()?;
        let resolution = self.thumbnail_resolution(image);
        let size = image.level(resolution)?.image_size();

        let required = buffer_len(size, image.channels_per_pixel());
        if dst.len() < required {
            return Err(ImageError::BufferTooSmall {
                required,
                actual: dst.len(),
            }
            .into());
        }

        image.read_region(dst, Rect::from_size(size), &self.current_index(resolution))?;
        Ok(())
    }

    // =========================================================================
    // Planes
    // =========================================================================

    fn current_index(&self, resolution: usize) -> ImageIndex {
        ImageIndex::new(resolution, self.channel, self.z_plane, self.time_point)
    }

    pub fn current_channel(&self) -> u32 {
        self.channel
    }

    pub fn channel_count(&self) -> Result<u32, ViewError> {
        Ok(self.current_image()?.channel_count())
    }

    pub fn set_current_channel(&mut self, channel: u32) -> Result<(), ViewError> {
        let count = self.channel_count()?;
        check_plane("channel", channel, count)?;

        self.channel = channel;
        self.listeners.emit(&PresentationEvent::ImageChanged);
        Ok(())
    }

    pub fn current_z_plane(&self) -> u32 {
        self.z_plane
    }

    pub fn z_plane_count(&self) -> Result<u32, ViewError> {
        Ok(self.current_image()?.z_plane_count())
    }

    pub fn set_current_z_plane(&mut self, z_plane: u32) -> Result<(), ViewError> {
        let count = self.z_plane_count()?;
        check_plane("z-plane", z_plane, count)?;

        self.z_plane = z_plane;
        self.listeners.emit(&PresentationEvent::ImageChanged);
        Ok(())
    }

    pub fn current_time_point(&self) -> u32 {
        self.time_point
    }

    pub fn time_point_count(&self) -> Result<u32, ViewError> {
        Ok(self.current_image()?.time_point_count())
    }

    pub fn set_current_time_point(&mut self, time_point: u32) -> Result<(), ViewError> {
        let count = self.time_point_count()?;
        check_plane("time point", time_point, count)?;

        self.time_point = time_point;
        self.listeners.emit(&PresentationEvent::ImageChanged);
        Ok(())
    }
}

fn check_plane(plane: &'static str, value: u32, count: u32) -> Result<(), ViewError> {
    if value < count {
        Ok(())
    } else {
        Err(ViewError::PlaneOutOfRange { plane, value, count })
    }
}

// =============================================================================
// Tests
// =============================================================================
