use crate::error::ViewError;
use crate::geometry::{buffer_len, Size};
use crate::slide::VirtualSlideImage;
use crate::view::ImagePresentationModel;

/// Pixels of one rendered view, interleaved, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    size: Size,
    channels: usize,
    data: Vec<u8>,
}

impl FrameBuffer {
    /// Zero-filled frame of the given geometry.
    pub fn new(size: Size, channels: usize) -> Self {
        Self {
            size,
            channels,
            data: vec![0; buffer_len(size, channels)],
        }
    }

    /// Capture the current view of `model`.
    ///
    /// Tiles that are not cached yet show up as placeholders; call
    /// [`refresh`](Self::refresh) after the next content update.
    pub fn capture(model: &ImagePresentationModel) -> Result<Self, ViewError> {
        let mut frame = Self::new(Size::new(0, 0), 1);
        frame.refresh(model)?;
        Ok(frame)
    }

    /// Reload the current view of `model`, resizing if the view changed.
    pub fn refresh(&mut self, model: &ImagePresentationModel) -> Result<(), ViewError> {
        let size = model.image_data_size()?;
        let channels = model.image().ok_or(ViewError::NoImage)?.channels_per_pixel();

        if size != self.size || channels != self.channels {
            *self = Self::new(size, channels);
        }

        model.load_image_data_into(&mut self.data)
    }

    pub fn size(&self) -> Size {
        self.size
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
