//! Pixel buffer operations over regions of the same image space.
//!
//! Buffers are tightly packed, row-major and channel-interleaved: the byte for
//! channel `c` of pixel `(x, y)` inside a buffer covering `bounds` lives at
//! `((y - bounds.y) * bounds.width + (x - bounds.x)) * channels + c`.

use crate::error::ImageError;

use super::rect::{Rect, Size};

/// Number of bytes a packed buffer covering `size` with `channels` needs.
pub fn buffer_len(size: Size, channels: usize) -> usize {
    size.width as usize * size.height as usize * channels
}

fn check_len(buffer: &[u8], required: usize) -> Result<(), ImageError> {
    if buffer.len() < required {
        return Err(ImageError::BufferTooSmall {
            required,
            actual: buffer.len(),
        });
    }
    Ok(())
}

/// Copy the overlap of two buffers living in the same image space.
///
/// `src` covers `src_bounds` and `dst` covers `dst_bounds`; only the pixels in
/// their intersection are written, row by row. Disjoint bounds are a no-op.
pub fn copy_intersecting_region(
    src: &[u8],
    src_bounds: Rect,
    dst: &mut [u8],
    dst_bounds: Rect,
    channels: usize,
) -> Result<(), ImageError> {
    check_len(src, buffer_len(src_bounds.size(), channels))?;
    check_len(dst, buffer_len(dst_bounds.size(), channels))?;

    let Some(overlap) = src_bounds.intersection(&dst_bounds) else {
        return Ok(());
    };

    let row_len = overlap.width as usize * channels;
    let src_stride = src_bounds.width as usize * channels;
    let dst_stride = dst_bounds.width as usize * channels;
    let src_col = (overlap.x - src_bounds.x) as usize * channels;
    let dst_col = (overlap.x - dst_bounds.x) as usize * channels;

    for y in overlap.y..overlap.y + overlap.height {
        let src_start = (y - src_bounds.y) as usize * src_stride + src_col;
        let dst_start = (y - dst_bounds.y) as usize * dst_stride + dst_col;
        dst[dst_start..dst_start + row_len].copy_from_slice(&src[src_start..src_start + row_len]);
    }

    Ok(())
}

/// Nearest-neighbour resample of `src` (sized `src_size`) into `dst` (sized `dst_size`).
///
/// Destination pixel `d` samples source pixel `floor((d + 0.5) * src / dst)`
/// on each axis, so upscaling replicates pixels and downscaling picks the
/// pixel nearest to each destination pixel centre.
pub fn scale_nearest(
    src: &[u8],
    src_size: Size,
    dst: &mut [u8],
    dst_size: Size,
    channels: usize,
) -> Result<(), ImageError> {
    if src_size.is_empty() {
        return Err(ImageError::InvalidArgument(format!(
            "cannot scale from an empty source of size {}",
            src_size
        )));
    }
    check_len(src, buffer_len(src_size, channels))?;
    check_len(dst, buffer_len(dst_size, channels))?;

    let columns: Vec<usize> = (0..dst_size.width)
        .map(|x| nearest_source(x, src_size.width, dst_size.width))
        .collect();

    let src_stride = src_size.width as usize * channels;
    let dst_stride = dst_size.width as usize * channels;

    for y in 0..dst_size.height {
        let src_row = nearest_source(y, src_size.height, dst_size.height) * src_stride;
        let dst_row = y as usize * dst_stride;

        for (x, &src_x) in columns.iter().enumerate() {
            let s = src_row + src_x * channels;
            let d = dst_row + x * channels;
            dst[d..d + channels].copy_from_slice(&src[s..s + channels]);
        }
    }

    Ok(())
}

fn nearest_source(dst_coord: u32, src_len: u32, dst_len: u32) -> usize {
    let pos = ((dst_coord as f64 + 0.5) * src_len as f64 / dst_len as f64).floor() as usize;
    pos.min(src_len as usize - 1)
}

// =============================================================================
// Tests
// =============================================================================
