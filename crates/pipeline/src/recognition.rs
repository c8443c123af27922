//! Recognition adapter over an external OCR engine.
//!
//! The engine is consumed through two narrow seams: [`Preprocessor`] for
//! pixel clean-up and [`TextRecognizer`] for the actual text extraction.
//! [`RecognitionAdapter`] turns raw text into a location name and a list of
//! [`ContactRecord`]s.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use evewatch_core::analysis::UNKNOWN_LOCATION;
use evewatch_core::contact_parser::{clean_location, parse_contact_table};
use evewatch_core::ship::ContactRecord;
use image::RgbaImage;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum RecognitionError {
    /// The engine ran but reported a failure.
    #[error("Recognition engine failed: {0}")]
    Engine(String),

    /// The engine did not answer in time.
    #[error("Recognition timed out after {0:?}")]
    Timeout(Duration),

    #[error("Recognition I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Seams
// ---------------------------------------------------------------------------

/// Extracts text from an image region.
#[async_trait]
pub trait TextRecognizer: Send + Sync {
    async fn recognize_text(&self, image: &RgbaImage) -> Result<String, RecognitionError>;
}

/// Pixel clean-up applied before recognition.
pub trait Preprocessor: Send + Sync {
    fn preprocess(&self, image: &RgbaImage) -> RgbaImage;
}

/// Passes images through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityPreprocessor;

impl Preprocessor for IdentityPreprocessor {
    fn preprocess(&self, image: &RgbaImage) -> RgbaImage {
        image.clone()
    }
}

// ---------------------------------------------------------------------------
// RecognitionAdapter
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct RecognitionAdapter {
    recognizer: Arc<dyn TextRecognizer>,
    preprocessor: Arc<dyn Preprocessor>,
}

impl RecognitionAdapter {
    pub fn new(recognizer: Arc<dyn TextRecognizer>, preprocessor: Arc<dyn Preprocessor>) -> Self {
        Self {
            recognizer,
            preprocessor,
        }
    }

    /// Read the location name. Never fails: an engine error or empty text
    /// yields [`UNKNOWN_LOCATION`].
    pub async fn recognize_location(&self, region: &RgbaImage) -> String {
        let prepared = self.preprocessor.preprocess(region);
        match self.recognizer.recognize_text(&prepared).await {
            Ok(text) => {
                let location = clean_location(&text);
                if location.is_empty() {
                    UNKNOWN_LOCATION.to_string()
                } else {
                    location
                }
            }
            Err(e) => {
                tracing::debug!(error = %e, "Location recognition failed");
                UNKNOWN_LOCATION.to_string()
            }
        }
    }

    /// Read every contact line of the overview region, in display order.
    pub async fn recognize_contacts(
        &self,
        region: &RgbaImage,
    ) -> Result<Vec<ContactRecord>, RecognitionError> {
        let prepared = self.preprocessor.preprocess(region);
        let text = self.recognizer.recognize_text(&prepared).await?;
        Ok(parse_contact_table(&text))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
