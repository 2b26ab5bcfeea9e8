//! A virtual slide: the ordered set of images loaded from one slide file.

use std::fmt;
use std::sync::Arc;

use crate::error::ImageError;
use crate::events::{EventListeners, SubscriptionId};

use super::image::VirtualSlideImage;

/// Change notification emitted by [`VirtualSlide`].
#[derive(Clone)]
pub enum SlideEvent {
    ImageAdded(Arc<dyn VirtualSlideImage>),
    ImageRemoved(Arc<dyn VirtualSlideImage>),
}

impl fmt::Debug for SlideEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlideEvent::ImageAdded(image) => f.debug_tuple("ImageAdded").field(&image.id()).finish(),
            SlideEvent::ImageRemoved(image) => {
                f.debug_tuple("ImageRemoved").field(&image.id()).finish()
            }
        }
    }
}

/// Ordered collection of the images making up one slide.
pub struct VirtualSlide {
    format: String,
    images: Vec<Arc<dyn VirtualSlideImage>>,
    listeners: EventListeners<SlideEvent>,
}

impl VirtualSlide {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
            images: Vec::new(),
            listeners: EventListeners::new(),
        }
    }

    /// Name of the format the slide was loaded from.
    pub fn format(&self) -> &str {
        &self.format
    }

    pub fn images(&self) -> &[Arc<dyn VirtualSlideImage>] {
        &self.images
    }

    pub fn image(&self, index: usize) -> Option<&Arc<dyn VirtualSlideImage>> {
        self.images.get(index)
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Insert `image` at `index`, shifting later images back.
    pub fn add_image(
        &mut self,
        index: usize,
        image: Arc<dyn VirtualSlideImage>,
    ) -> Result<(), ImageError> {
        if index > self.images.len() {
            return Err(ImageError::InvalidArgument(format!(
                "image position {} is past the end of a slide with {} image(s)",
                index,
                self.images.len()
            )));
        }

        self.images.insert(index, Arc::clone(&image));
        self.listeners.emit(&SlideEvent::ImageAdded(image));
        Ok(())
    }

    /// Append `image` after the last one.
    pub fn push_image(&mut self, image: Arc<dyn VirtualSlideImage>) {
        self.images.push(Arc::clone(&image));
        self.listeners.emit(&SlideEvent::ImageAdded(image));
    }

    pub fn remove_image(&mut self, index: usize) -> Result<Arc<dyn VirtualSlideImage>, ImageError> {
        if index >= self.images.len() {
            return Err(ImageError::InvalidArgument(format!(
                "no image at position {} (slide has {})",
                index,
                self.images.len()
            )));
        }

        let removed = self.images.remove(index);
        self.listeners.emit(&SlideEvent::ImageRemoved(Arc::clone(&removed)));
        Ok(removed)
    }

    pub fn subscribe<F>(&self, listener: F) -> SubscriptionId
    where
        F: Fn(&SlideEvent) + Send + Sync + 'static,
    {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }
}

impl fmt::Debug for VirtualSlide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VirtualSlide")
            .field("format", &self.format)
            .field(
                "images",
                &self.images.iter().map(|i| i.id().to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
