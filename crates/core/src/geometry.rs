//! Pixel rectangles used by target profiles.
//!
//! A target's capture rectangle is relative to the full frame; its
//! location-name and contact-table rectangles are relative to the capture
//! rectangle. [`Rect::offset_by`] resolves a sub-rectangle to frame
//! coordinates.

use serde::{Deserialize, Serialize};

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// A rectangle with zero width or height covers no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Translate a rectangle expressed relative to `parent` into the
    /// coordinate space `parent` itself lives in.
    ///
    /// Returns `None` on coordinate overflow.
    pub fn offset_by(&self, parent: &Rect) -> Option<Rect> {
        Some(Rect {
            x: parent.x.checked_add(self.x)?,
            y: parent.y.checked_add(self.y)?,
            width: self.width,
            height: self.height,
        })
    }

    /// Whether the rectangle lies entirely inside a `width` x `height` image.
    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        let right = self.x.checked_add(self.width);
        let bottom = self.y.checked_add(self.height);
        matches!((right, bottom), (Some(r), Some(b)) if r <= width && b <= height)
    }
}
