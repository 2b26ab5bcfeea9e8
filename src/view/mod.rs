//! Viewport model: what part of the image is shown, and at which level.
//!
//! # Architecture
//!
//! ```text
//!  rendering surface
//!        │ pan / zoom_at / set_viewport_size / load_image_data_into
//!        ▼
//! ┌─────────────────────────────────────────┐
//! │         ImagePresentationModel          │
//! │  (level choice, planes, zoom limits)    │
//! └──────────┬──────────────────┬───────────┘
//!            │                  │
//!            ▼                  ▼
//! ┌───────────────────┐  ┌──────────────────────┐
//! │      Camera       │  │  VisibleImageLoader  │
//! │ (relative view)   │  │  (crate::loader)     │
//! └───────────────────┘  └──────────────────────┘
//! ```
//!
//! Camera changes and finished tile fetches both surface as
//! [`PresentationEvent::VisibleContentUpdated`].

mod camera;
mod presentation;

pub use camera::{Camera, CameraEvent};
pub use presentation::{
    ImagePresentationModel, PresentationEvent, DEFAULT_TRANSITION_THRESHOLD,
    DEFAULT_ZOOM_INCREMENT, MAX_THUMBNAIL_BYTES, MAX_ZOOM,
};
