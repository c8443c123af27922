//! Screenshot persistence.
//!
//! Saving is best-effort: a failed write is logged and reported as `false`,
//! never as a pass failure.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use evewatch_core::config_store::ConfigStore;
use evewatch_core::types::{TargetId, Timestamp};
use image::ImageFormat;

use crate::frame::Frame;

/// Persists analysed frames.
#[async_trait]
pub trait ScreenshotSink: Send + Sync {
    async fn save(&self, frame: &Frame, target_id: TargetId, location: &str) -> bool;
}

/// Sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

#[async_trait]
impl ScreenshotSink for NullSink {
    async fn save(&self, _frame: &Frame, _target_id: TargetId, _location: &str) -> bool {
        false
    }
}

/// Writes PNG files into the directory named by the current configuration
/// snapshot, creating it on demand.
#[derive(Debug, Clone)]
pub struct PngDirectorySink {
    config: ConfigStore,
}

impl PngDirectorySink {
    pub fn new(config: ConfigStore) -> Self {
        Self { config }
    }
}

/// `{YYYYmmdd_HHMMSS}_{target}_{location}.png`, with path-hostile characters
/// in the location replaced by `_`.
pub fn screenshot_file_name(captured_at: Timestamp, target_id: TargetId, location: &str) -> String {
    let location: String = location
        .trim()
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c == '-' || c == '.' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let location = if location.is_empty() { "unknown".to_string() } else { location };
    format!(
        "{}_{}_{}.png",
        captured_at.format("%Y%m%d_%H%M%S"),
        target_id,
        location
    )
}

fn write_png(directory: &Path, file_name: &str, image: &image::RgbaImage) -> Result<PathBuf, String> {
    std::fs::create_dir_all(directory).map_err(|e| e.to_string())?;
    let path = directory.join(file_name);
    image
        .save_with_format(&path, ImageFormat::Png)
        .map_err(|e| e.to_string())?;
    Ok(path)
}

#[async_trait]
impl ScreenshotSink for PngDirectorySink {
    async fn save(&self, frame: &Frame, target_id: TargetId, location: &str) -> bool {
        let directory = self.config.current().screenshots.directory.clone();
        let file_name = screenshot_file_name(frame.timestamp(), target_id, location);
        let image = frame.shared_image();

        let written =
            tokio::task::spawn_blocking(move || write_png(&directory, &file_name, &image)).await;

        match written {
            Ok(Ok(path)) => {
                tracing::debug!(target_id, path = %path.display(), "Screenshot saved");
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(target_id, error = %e, "Failed to save screenshot");
                false
            }
            Err(e) => {
                tracing::warn!(target_id, error = %e, "Screenshot writer task failed");
                false
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
