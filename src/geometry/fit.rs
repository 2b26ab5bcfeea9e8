//! Scaling relations between image sizes and coordinate spaces.

use super::rect::{Rect, RectF, Size};

/// Largest uniform scale at which `original` still fits inside `destination`.
pub fn scale_to_fit(original: Size, destination: Size) -> f64 {
    let x_scale = destination.width as f64 / original.width as f64;
    let y_scale = destination.height as f64 / original.height as f64;

    x_scale.min(y_scale)
}

/// Convert relative bounds into absolute pixel bounds inside `area`.
///
/// The origin is rounded to the nearest pixel; the extent is truncated but
/// never smaller than one pixel.
pub fn relative_to_absolute(relative: RectF, area: Size) -> Rect {
    let width = area.width as f64;
    let height = area.height as f64;

    Rect::new(
        (relative.x * width).round().max(0.0) as u32,
        (relative.y * height).round().max(0.0) as u32,
        (relative.width * width).max(1.0) as u32,
        (relative.height * height).max(1.0) as u32,
    )
}

/// Shrink `bounds` so it lies inside an image of size `image`, keeping at
/// least one pixel on each axis.
pub fn clamp_to_image(bounds: Rect, image: Size) -> Rect {
    let x = bounds.x.min(image.width.saturating_sub(1));
    let y = bounds.y.min(image.height.saturating_sub(1));
    let width = bounds.width.min(image.width - x).max(1);
    let height = bounds.height.min(image.height - y).max(1);

    Rect::new(x, y, width, height)
}

/// Map `bounds` from an image of size `from` onto the same region of an image
/// of size `to`.
///
/// Origins are floored and extents are ceiled per axis, so the result always
/// covers the geometric counterpart of `bounds`. The result is clamped to `to`.
pub fn scale_bounds_between(bounds: Rect, from: Size, to: Size) -> Rect {
    let scale_x = to.width as f64 / from.width as f64;
    let scale_y = to.height as f64 / from.height as f64;

    let scaled = Rect::new(
        (bounds.x as f64 * scale_x).floor() as u32,
        (bounds.y as f64 * scale_y).floor() as u32,
        (bounds.width as f64 * scale_x).ceil() as u32,
        (bounds.height as f64 * scale_y).ceil() as u32,
    );

    clamp_to_image(scaled, to)
}

// =============================================================================
// Tests
// =============================================================================
