//! Tesseract command-line recogniser.
//!
//! Each call pipes one PNG-encoded region into
//! `tesseract stdin stdout -l <lang> --psm 6` and reads the recognised text
//! from stdout. A per-call timeout kills runaway processes.

use std::io::Cursor;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use evewatch_pipeline::{RecognitionError, TextRecognizer};
use image::{ImageFormat, RgbaImage};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Page segmentation mode 6: a single uniform block of text.
const PAGE_SEGMENTATION_MODE: &str = "6";

pub struct TesseractRecognizer {
    program: PathBuf,
    lang: String,
    timeout: Duration,
}

impl TesseractRecognizer {
    pub fn new(program: impl Into<PathBuf>, lang: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            lang: lang.into(),
            timeout,
        }
    }

    /// Command-line arguments for one invocation.
    pub fn args(&self) -> Vec<String> {
        vec![
            "stdin".to_string(),
            "stdout".to_string(),
            "-l".to_string(),
            self.lang.clone(),
            "--psm".to_string(),
            PAGE_SEGMENTATION_MODE.to_string(),
        ]
    }

    async fn run(&self, png: Vec<u8>) -> Result<String, RecognitionError> {
        let mut child = Command::new(&self.program)
            .args(self.args())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(&png).await?;
            // Dropping stdin closes the pipe so tesseract sees EOF.
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RecognitionError::Engine(format!(
                "tesseract exited with {}: {}",
                output.status.code().unwrap_or(-1),
                stderr.trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, RecognitionError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageFormat::Png)
        .map_err(|e| RecognitionError::Engine(format!("failed to encode region: {e}")))?;
    Ok(buffer.into_inner())
}

#[async_trait]
impl TextRecognizer for TesseractRecognizer {
    async fn recognize_text(&self, image: &RgbaImage) -> Result<String, RecognitionError> {
        let png = encode_png(image)?;
        match tokio::time::timeout(self.timeout, self.run(png)).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(
                    timeout_secs = self.timeout.as_secs(),
                    "Tesseract timed out"
                );
                Err(RecognitionError::Timeout(self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_stdin_stdout_invocation() {
        let ocr = TesseractRecognizer::new("tesseract", "chi_sim+eng", Duration::from_secs(5));
        assert_eq!(
            ocr.args(),
            ["stdin", "stdout", "-l", "chi_sim+eng", "--psm", "6"]
        );
    }

    #[test]
    fn encodes_png_signature() {
        let png = encode_png(&RgbaImage::new(3, 3)).unwrap();
        assert_eq!(&png[..4], b"\x89PNG");
    }
}
