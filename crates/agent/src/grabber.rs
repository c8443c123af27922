//! Directory-backed frame grabber.
//!
//! An external capture tool drops screenshots into a folder; each grab
//! decodes the most recently modified image there. The same file is never
//! reported twice.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::SystemTime;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use evewatch_pipeline::{CaptureError, Frame, FrameGrabber};

/// File extensions treated as frames.
const FRAME_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

pub struct DirectoryGrabber {
    directory: PathBuf,
    last_seen: Mutex<Option<(PathBuf, SystemTime)>>,
}

impl DirectoryGrabber {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            last_seen: Mutex::new(None),
        }
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// The most recently modified frame file in `directory`.
fn newest_frame(directory: &Path) -> Result<Option<(PathBuf, SystemTime)>, CaptureError> {
    let mut newest: Option<(PathBuf, SystemTime)> = None;
    for entry in std::fs::read_dir(directory)? {
        let entry = entry?;
        let path = entry.path();
        if !is_frame_file(&path) {
            continue;
        }
        let metadata = entry.metadata()?;
        if !metadata.is_file() {
            continue;
        }
        let modified = metadata.modified()?;
        if newest.as_ref().map_or(true, |(_, t)| modified > *t) {
            newest = Some((path, modified));
        }
    }
    Ok(newest)
}

fn decode(path: &Path, modified: SystemTime) -> Result<Frame, CaptureError> {
    let image = image::open(path)
        .map_err(|e| CaptureError::Decode(format!("{}: {e}", path.display())))?
        .to_rgba8();
    Ok(Frame::with_timestamp(image, DateTime::<Utc>::from(modified)))
}

#[async_trait]
impl FrameGrabber for DirectoryGrabber {
    async fn prepare(&self) -> Result<(), CaptureError> {
        let metadata = tokio::fs::metadata(&self.directory).await.map_err(|e| {
            CaptureError::Unavailable(format!("{}: {e}", self.directory.display()))
        })?;
        if !metadata.is_dir() {
            return Err(CaptureError::Unavailable(format!(
                "{} is not a directory",
                self.directory.display()
            )));
        }
        Ok(())
    }

    async fn grab(&self) -> Result<Option<Frame>, CaptureError> {
        let directory = self.directory.clone();
        let newest = tokio::task::spawn_blocking(move || newest_frame(&directory))
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))??;

        let Some((path, modified)) = newest else {
            return Ok(None);
        };
        {
            let mut last = self.last_seen.lock().unwrap_or_else(|e| e.into_inner());
            if last.as_ref() == Some(&(path.clone(), modified)) {
                return Ok(None);
            }
            *last = Some((path.clone(), modified));
        }

        tracing::debug!(path = %path.display(), "Decoding frame");
        let frame = tokio::task::spawn_blocking(move || decode(&path, modified))
            .await
            .map_err(|e| CaptureError::Unavailable(e.to_string()))??;
        Ok(Some(frame))
    }
}
