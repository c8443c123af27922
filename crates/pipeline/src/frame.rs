//! Captured frames.

use std::sync::Arc;

use chrono::Utc;
use evewatch_core::types::Timestamp;
use image::RgbaImage;

/// One captured image plus its capture time.
///
/// Cloning is cheap: the pixel buffer is shared behind an `Arc` and only
/// ever exposed by shared reference, so every per-target unit sees the same
/// immutable pixels. Anything that needs to modify pixels crops or copies
/// first.
#[derive(Debug, Clone)]
pub struct Frame {
    image: Arc<RgbaImage>,
    captured_at: Timestamp,
}

impl Frame {
    /// Wrap `image`, stamped with the current time.
    pub fn new(image: RgbaImage) -> Self {
        Self::with_timestamp(image, Utc::now())
    }

    pub fn with_timestamp(image: RgbaImage, captured_at: Timestamp) -> Self {
        Self {
            image: Arc::new(image),
            captured_at,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Shared handle to the pixel buffer, for work moved off the runtime.
    pub fn shared_image(&self) -> Arc<RgbaImage> {
        Arc::clone(&self.image)
    }

    pub fn timestamp(&self) -> Timestamp {
        self.captured_at
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}
