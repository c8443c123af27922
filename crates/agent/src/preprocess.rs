//! Grayscale + threshold preprocessing.
//!
//! Game UI text is light on a dark background; Tesseract reads dark text on
//! a light background best, so the default preprocessor also inverts.

use evewatch_pipeline::Preprocessor;
use image::{imageops, Rgba, RgbaImage};

/// Default luma cut-off between text and background.
pub const DEFAULT_THRESHOLD: u8 = 128;

#[derive(Debug, Clone, Copy)]
pub struct ThresholdPreprocessor {
    pub threshold: u8,
    pub invert: bool,
}

impl Default for ThresholdPreprocessor {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            invert: true,
        }
    }
}

impl Preprocessor for ThresholdPreprocessor {
    fn preprocess(&self, image: &RgbaImage) -> RgbaImage {
        let gray = imageops::grayscale(image);
        RgbaImage::from_fn(gray.width(), gray.height(), |x, y| {
            let bright = gray.get_pixel(x, y)[0] >= self.threshold;
            let white = bright != self.invert;
            let v = if white { 255 } else { 0 };
            Rgba([v, v, v, 255])
        })
    }
}
