//! Agent runtime settings read from the environment.

use std::path::PathBuf;
use std::time::Duration;

/// Default path of the monitor configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "evewatch.json";

/// Default directory polled for captured frames.
pub const DEFAULT_FRAME_DIR: &str = "frames";

/// Default Tesseract executable, resolved through `PATH`.
pub const DEFAULT_TESSERACT: &str = "tesseract";

/// Default Tesseract language pack.
pub const DEFAULT_OCR_LANG: &str = "eng";

/// Default per-region OCR timeout.
pub const DEFAULT_OCR_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentSettings {
    pub config_path: PathBuf,
    pub frame_dir: PathBuf,
    pub tesseract: PathBuf,
    pub ocr_lang: String,
    pub ocr_timeout: Duration,
}

impl AgentSettings {
    /// Read settings from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or blank values fall back to
    /// their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let ocr_timeout_secs = get("EVEWATCH_OCR_TIMEOUT_SECS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_OCR_TIMEOUT_SECS);

        Self {
            config_path: get("EVEWATCH_CONFIG")
                .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string())
                .into(),
            frame_dir: get("EVEWATCH_FRAME_DIR")
                .unwrap_or_else(|| DEFAULT_FRAME_DIR.to_string())
                .into(),
            tesseract: get("EVEWATCH_TESSERACT")
                .unwrap_or_else(|| DEFAULT_TESSERACT.to_string())
                .into(),
            ocr_lang: get("EVEWATCH_OCR_LANG").unwrap_or_else(|| DEFAULT_OCR_LANG.to_string()),
            ocr_timeout: Duration::from_secs(ocr_timeout_secs),
        }
    }
}
