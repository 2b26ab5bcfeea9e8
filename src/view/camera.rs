//! Viewport state over an image: position, zoom and the visible region.
//!
//! Positions are relative: `(0.0, 0.0)` is the top-left corner of the image
//! and `(1.0, 1.0)` the bottom-right. The stored position may lie anywhere;
//! every query clamps it so the visible region stays inside the image.

use crate::error::ViewError;
use crate::events::{EventListeners, SubscriptionId};
use crate::geometry::{relative_to_absolute, scale_to_fit, Point, Rect, RectF, Size};

/// Notification emitted after any change that can move the visible region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CameraEvent {
    VisibleRegionChanged,
}

/// Tracks which part of an image is visible and at what zoom.
#[derive(Debug)]
pub struct Camera {
    position: (f64, f64),
    viewport_size: Size,
    image_size: Size,
    zoom: f64,
    listeners: EventListeners<CameraEvent>,
}

impl Camera {
    pub fn new() -> Self {
        Self {
            position: (0.0, 0.0),
            viewport_size: Size::new(0, 0),
            image_size: Size::new(0, 0),
            zoom: 1.0,
            listeners: EventListeners::new(),
        }
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&CameraEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    fn notify(&self) {
        self.listeners.emit(&CameraEvent::VisibleRegionChanged);
    }

    // =========================================================================
    // Setters
    // =========================================================================

    pub fn set_image_size(&mut self, image_size: Size) {
        self.image_size = image_size;
        self.notify();
    }

    /// Set the centre of the visible region, in relative coordinates.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = (x, y);
        self.notify();
    }

    pub fn set_viewport_size(&mut self, viewport_size: Size) {
        self.viewport_size = viewport_size;
        self.notify();
    }

    /// Move the view by `delta` pixels of the image at the current zoom.
    ///
    /// Panning starts from the clamped centre, so a position that was set
    /// outside the image snaps back to its edge first.
    pub fn pan(&mut self, delta: Point) {
        let visible = self.visible_region_bounds();
        let image = self.image_size_at_zoom(self.zoom);

        self.position = (
            visible.center_x() + delta.x as f64 / image.width as f64,
            visible.center_y() + delta.y as f64 / image.height as f64,
        );
        self.notify();
    }

    /// Set the zoom factor, keeping the stored position. `1.0` is native size.
    pub fn set_zoom(&mut self, zoom: f64) -> Result<(), ViewError> {
        Self::check_zoom(zoom)?;

        self.zoom = zoom;
        self.notify();
        Ok(())
    }

    /// Set the zoom factor so the image pixel under `anchor` stays put.
    ///
    /// `anchor` is in viewport pixels from the top-left corner of the visible
    /// region. Listeners are notified once, after both zoom and position have
    /// changed.
    pub fn set_zoom_at(&mut self, zoom: f64, anchor: Point) -> Result<(), ViewError> {
        Self::check_zoom(zoom)?;
        if anchor.x < 0 || anchor.y < 0 {
            return Err(ViewError::InvalidAnchor {
                x: anchor.x,
                y: anchor.y,
            });
        }

        let old_bounds = self.visible_region_bounds();
        let old_image = self.image_size_at_zoom(self.zoom);

        let point_x = old_bounds.x + anchor.x as f64 / old_image.width as f64;
        let point_y = old_bounds.y + anchor.y as f64 / old_image.height as f64;
        let diff_x = old_bounds.center_x() - point_x;
        let diff_y = old_bounds.center_y() - point_y;
        let scale = zoom / self.zoom;

        self.zoom = zoom;
        self.position = (point_x + diff_x / scale, point_y + diff_y / scale);
        self.notify();
        Ok(())
    }

    /// Zoom so the whole image fits the viewport, never above native size.
    pub fn zoom_to_fit(&mut self) {
        self.zoom = scale_to_fit(self.image_size, self.viewport_size).min(1.0);
        self.notify();
    }

    fn check_zoom(zoom: f64) -> Result<(), ViewError> {
        if zoom > 0.0 {
            Ok(())
        } else {
            Err(ViewError::InvalidZoom(zoom))
        }
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport_size
    }

    pub fn image_size(&self) -> Size {
        self.image_size
    }

    /// Image size scaled by `zoom`, truncated to whole pixels.
    pub fn image_size_at_zoom(&self, zoom: f64) -> Size {
        Size::new(
            (self.image_size.width as f64 * zoom) as u32,
            (self.image_size.height as f64 * zoom) as u32,
        )
    }

    /// Visible region in relative coordinates, clamped inside the image.
    ///
    /// The extent is the viewport's share of the zoomed image, capped at the
    /// whole image.
    pub fn visible_region_bounds(&self) -> RectF {
        let image = self.image_size_at_zoom(self.zoom);
        let width = (self.viewport_size.width as f64 / image.width as f64).min(1.0);
        let height = (self.viewport_size.height as f64 / image.height as f64).min(1.0);

        let center_x = self.position.0.max(width * 0.5).min(1.0 - width * 0.5);
        let center_y = self.position.1.max(height * 0.5).min(1.0 - height * 0.5);

        RectF::new(center_x - width * 0.5, center_y - height * 0.5, width, height)
    }

    /// Visible region in pixels of the image at the current zoom.
    pub fn absolute_visible_region_bounds(&self) -> Rect {
        relative_to_absolute(self.visible_region_bounds(), self.image_size_at_zoom(self.zoom))
    }

    /// Index of the level to render from at the current zoom.
    ///
    /// `widths` are the level widths in ascending order. Between two levels
    /// the finer one is chosen once the zoomed width has covered at least
    /// `threshold` of the gap between them.
    pub fn best_resolution_for_zoom(&self, widths: &[u32], threshold: f64) -> usize {
        let Some(&lowest) = widths.first() else {
            return 0;
        };

        let width = self.image_size_at_zoom(self.zoom).width;
        if width <= lowest {
            return 0;
        }

        for i in 1..widths.len() {
            if width < widths[i] {
                let low = widths[i - 1] as f64;
                let high = widths[i] as f64;
                let transition = (width as f64 - low) / (high - low);

                return if transition < threshold { i - 1 } else { i };
            }
        }

        widths.len() - 1
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::new()
    }
}
