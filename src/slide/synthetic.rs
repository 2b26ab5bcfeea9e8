//! Procedurally generated pyramid image.
//!
//! `SyntheticSlide` produces deterministic pixels from their coordinates, so it
//! needs no backing file. The binary uses it to drive a viewing session and the
//! tests use it wherever exact pixel values must be predicted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::error::{ImageError, ReadError};
use crate::geometry::Size;

use super::image::VirtualSlideImage;
use super::tile::{ImageIndex, Tile};

/// In-memory image whose pixel values are a function of their address.
#[derive(Debug)]
pub struct SyntheticSlide {
    id: String,
    name: String,
    levels: Vec<(Size, Size)>,
    channels: u32,
    z_planes: u32,
    time_points: u32,
    rgb: bool,
    read_delay: Duration,
    reads: AtomicUsize,
}

impl SyntheticSlide {
    pub fn builder(id: impl Into<String>) -> SyntheticSlideBuilder {
        let id = id.into();
        SyntheticSlideBuilder {
            name: id.clone(),
            id,
            levels: Vec::new(),
            channels: 1,
            z_planes: 1,
            time_points: 1,
            rgb: false,
            read_delay: Duration::ZERO,
        }
    }

    /// A pyramid whose levels halve from `full_size` down to at most `tile_size`.
    pub fn pyramid(id: impl Into<String>, full_size: Size, tile_size: Size, rgb: bool) -> Self {
        let mut sizes = vec![full_size];
        let mut current = full_size;
        while current.width > tile_size.width || current.height > tile_size.height {
            current = Size::new(current.width.div_ceil(2), current.height.div_ceil(2));
            sizes.push(current);
        }

        let mut builder = Self::builder(id).rgb(rgb);
        for size in sizes.into_iter().rev() {
            builder = builder.level(size, tile_size);
        }
        builder.build()
    }

    /// Value of one pixel component.
    pub fn pixel(&self, index: &ImageIndex, x: u32, y: u32, component: usize) -> u8 {
        let value = (x as u64)
            .wrapping_mul(7)
            .wrapping_add((y as u64).wrapping_mul(13))
            .wrapping_add(index.resolution as u64 * 31)
            .wrapping_add(index.channel as u64 * 17)
            .wrapping_add(index.z_plane as u64 * 5)
            .wrapping_add(index.time_point as u64 * 3)
            .wrapping_add(component as u64 * 11);

        (value % 251) as u8
    }

    /// Number of `read_tile` calls served so far.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

impl VirtualSlideImage for SyntheticSlide {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn resolution_count(&self) -> usize {
        self.levels.len()
    }

    fn image_size(&self, resolution: usize) -> Option<Size> {
        self.levels.get(resolution).map(|(image, _)| *image)
    }

    fn tile_size(&self, resolution: usize) -> Option<Size> {
        self.levels.get(resolution).map(|(_, tile)| *tile)
    }

    fn channel_count(&self) -> u32 {
        self.channels
    }

    fn z_plane_count(&self) -> u32 {
        self.z_planes
    }

    fn time_point_count(&self) -> u32 {
        self.time_points
    }

    fn is_rgb(&self) -> bool {
        self.rgb
    }

    fn read_tile(&self, dst: &mut [u8], tile: &Tile) -> Result<(), ReadError> {
        let bounds = self.tile_bounds(tile)?;
        let channels = self.channels_per_pixel();
        let required = bounds.area() as usize * channels;
        if dst.len() < required {
            return Err(ImageError::BufferTooSmall {
                required,
                actual: dst.len(),
            }
            .into());
        }

        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.read_delay.is_zero() {
            std::thread::sleep(self.read_delay);
        }

        let mut offset = 0;
        for y in bounds.y..bounds.y + bounds.height {
            for x in bounds.x..bounds.x + bounds.width {
                for component in 0..channels {
                    dst[offset] = self.pixel(&tile.index, x, y, component);
                    offset += 1;
                }
            }
        }

        Ok(())
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for [`SyntheticSlide`]. Levels are added smallest first.
#[derive(Debug, Clone)]
pub struct SyntheticSlideBuilder {
    id: String,
    name: String,
    levels: Vec<(Size, Size)>,
    channels: u32,
    z_planes: u32,
    time_points: u32,
    rgb: bool,
    read_delay: Duration,
}

impl SyntheticSlideBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn level(mut self, image_size: Size, tile_size: Size) -> Self {
        self.levels.push((image_size, tile_size));
        self
    }

    pub fn planes(mut self, channels: u32, z_planes: u32, time_points: u32) -> Self {
        self.channels = channels;
        self.z_planes = z_planes;
        self.time_points = time_points;
        self
    }

    pub fn rgb(mut self, rgb: bool) -> Self {
        self.rgb = rgb;
        self
    }

    /// Simulated decode latency per tile.
    pub fn read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = delay;
        self
    }

    pub fn build(self) -> SyntheticSlide {
        SyntheticSlide {
            id: self.id,
            name: self.name,
            levels: self.levels,
            channels: self.channels,
            z_planes: self.z_planes,
            time_points: self.time_points,
            rgb: self.rgb,
            read_delay: self.read_delay,
            reads: AtomicUsize::new(0),
        }
    }
}
