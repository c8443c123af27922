//! Monitor configuration snapshot.
//!
//! A [`MonitorConfig`] is an immutable value: the host loads one from JSON,
//! validates it and publishes it through
//! [`ConfigStore`](crate::config_store::ConfigStore). Changing anything means
//! publishing a whole new snapshot.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::classify::{RuleSets, MAX_DANGER_LEVEL};
use crate::error::CoreError;
use crate::geometry::Rect;
use crate::types::TargetId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default time between captured frames.
pub const DEFAULT_CAPTURE_INTERVAL_MS: u64 = 1000;

/// Captures faster than this are rejected; OCR cannot keep up anyway.
pub const MIN_CAPTURE_INTERVAL_MS: u64 = 50;

/// Default number of frames buffered between capture and analysis.
pub const DEFAULT_QUEUE_CAPACITY: usize = 8;

/// Default minimum aggregate danger level that triggers a ship alert.
pub const DEFAULT_DANGER_THRESHOLD: u8 = 3;

/// Default per-pass processing budget before a performance alert fires.
pub const DEFAULT_PERFORMANCE_THRESHOLD_MS: u64 = 500;

/// Default minimum gap between two delivered alerts.
pub const DEFAULT_ALERT_MIN_INTERVAL_SECS: u64 = 10;

/// Default HTTP timeout for a single webhook call.
pub const DEFAULT_ALERT_TIMEOUT_SECS: u64 = 10;

/// Default directory for saved screenshots.
pub const DEFAULT_SCREENSHOT_DIR: &str = "screenshots";

/// Maximum length of a target display name.
const MAX_TARGET_NAME_LEN: usize = 64;

fn default_max_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

// ---------------------------------------------------------------------------
// Target profiles
// ---------------------------------------------------------------------------

/// One monitored game instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetProfile {
    pub id: TargetId,
    pub name: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Window area of this instance, in frame coordinates.
    pub capture: Rect,
    /// Location-name area, relative to `capture`.
    pub location_region: Rect,
    /// Overview-table area, relative to `capture`.
    pub contacts_region: Rect,
}

fn enabled_by_default() -> bool {
    true
}

impl TargetProfile {
    /// Check that the profile can be used for a pass.
    ///
    /// Rules:
    /// - Name must not be empty or exceed `MAX_TARGET_NAME_LEN` characters.
    /// - All three rectangles must be non-empty.
    /// - Both sub-regions must lie inside the capture rectangle.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::Validation(format!(
                "Target #{} must have a name",
                self.id
            )));
        }
        if self.name.chars().count() > MAX_TARGET_NAME_LEN {
            return Err(CoreError::Validation(format!(
                "Target #{} name must not exceed {MAX_TARGET_NAME_LEN} characters",
                self.id
            )));
        }
        for (label, rect) in [
            ("capture", &self.capture),
            ("location_region", &self.location_region),
            ("contacts_region", &self.contacts_region),
        ] {
            if rect.is_empty() {
                return Err(CoreError::Validation(format!(
                    "Target #{} {label} must have a non-zero size",
                    self.id
                )));
            }
        }
        for (label, rect) in [
            ("location_region", &self.location_region),
            ("contacts_region", &self.contacts_region),
        ] {
            if !rect.fits_within(self.capture.width, self.capture.height) {
                return Err(CoreError::Validation(format!(
                    "Target #{} {label} lies outside its capture area",
                    self.id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// What the performance threshold is measured against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PerformanceScope {
    /// Wall time of one target's unit of work.
    #[default]
    PerTarget,
    /// Wall time of the whole fan-out for one frame.
    PerFrame,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub alert_threshold_ms: u64,
    pub scope: PerformanceScope,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            alert_threshold_ms: DEFAULT_PERFORMANCE_THRESHOLD_MS,
            scope: PerformanceScope::default(),
        }
    }
}

impl PerformanceConfig {
    pub fn threshold(&self) -> Duration {
        Duration::from_millis(self.alert_threshold_ms)
    }
}

/// Webhook alert destination and pacing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertConfig {
    pub enabled: bool,
    pub webhook_url: Option<String>,
    /// Signing secret. When set, every request carries `timestamp` and
    /// `sign` query parameters.
    pub secret: Option<String>,
    pub min_interval_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            webhook_url: None,
            secret: None,
            min_interval_secs: DEFAULT_ALERT_MIN_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_ALERT_TIMEOUT_SECS,
        }
    }
}

impl AlertConfig {
    /// The destination URL, if one is configured and non-blank.
    pub fn endpoint(&self) -> Option<&str> {
        self.webhook_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
    }

    /// The signing secret, if one is configured and non-empty.
    pub fn signing_secret(&self) -> Option<&str> {
        self.secret.as_deref().filter(|s| !s.is_empty())
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_secs(self.min_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// When analysed frames are written to disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScreenshotPolicy {
    #[default]
    Never,
    Always,
    DangerousOnly,
}

impl ScreenshotPolicy {
    pub fn should_save(self, contains_dangerous: bool) -> bool {
        match self {
            ScreenshotPolicy::Never => false,
            ScreenshotPolicy::Always => true,
            ScreenshotPolicy::DangerousOnly => contains_dangerous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScreenshotConfig {
    pub policy: ScreenshotPolicy,
    pub directory: PathBuf,
}

impl Default for ScreenshotConfig {
    fn default() -> Self {
        Self {
            policy: ScreenshotPolicy::default(),
            directory: PathBuf::from(DEFAULT_SCREENSHOT_DIR),
        }
    }
}

// ---------------------------------------------------------------------------
// MonitorConfig
// ---------------------------------------------------------------------------

/// Full configuration snapshot consumed by the pipeline and the dispatcher.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub capture_interval_ms: u64,
    pub queue_capacity: usize,
    /// Upper bound on concurrently analysed targets.
    pub max_concurrency: usize,
    /// Minimum danger level (0-10) that raises a ship alert.
    pub danger_threshold: u8,
    pub performance: PerformanceConfig,
    pub alerts: AlertConfig,
    pub screenshots: ScreenshotConfig,
    pub rules: RuleSets,
    pub targets: Vec<TargetProfile>,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            capture_interval_ms: DEFAULT_CAPTURE_INTERVAL_MS,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            max_concurrency: default_max_concurrency(),
            danger_threshold: DEFAULT_DANGER_THRESHOLD,
            performance: PerformanceConfig::default(),
            alerts: AlertConfig::default(),
            screenshots: ScreenshotConfig::default(),
            rules: RuleSets::default(),
            targets: Vec::new(),
        }
    }
}

impl MonitorConfig {
    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        let raw = std::fs::read_to_string(path).map_err(|source| CoreError::ConfigIo {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn capture_interval(&self) -> Duration {
        Duration::from_millis(self.capture_interval_ms)
    }

    /// Enabled targets in configuration order.
    pub fn enabled_targets(&self) -> impl Iterator<Item = &TargetProfile> {
        self.targets.iter().filter(|t| t.enabled)
    }

    /// Validate snapshot-wide settings.
    ///
    /// Individual target profiles are checked separately at use time so
    /// that one broken profile only disables that target.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.capture_interval_ms < MIN_CAPTURE_INTERVAL_MS {
            return Err(CoreError::Validation(format!(
                "capture_interval_ms must be at least {MIN_CAPTURE_INTERVAL_MS}, got {}",
                self.capture_interval_ms
            )));
        }
        if self.queue_capacity == 0 {
            return Err(CoreError::Validation(
                "queue_capacity must be at least 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(CoreError::Validation(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.danger_threshold > MAX_DANGER_LEVEL {
            return Err(CoreError::Validation(format!(
                "danger_threshold must be between 0 and {MAX_DANGER_LEVEL}, got {}",
                self.danger_threshold
            )));
        }
        if let Some(url) = self.alerts.endpoint() {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(CoreError::Validation(format!(
                    "alerts.webhook_url must be an http(s) URL, got {url}"
                )));
            }
        }
        let mut seen = HashSet::new();
        for target in &self.targets {
            if !seen.insert(target.id) {
                return Err(CoreError::Validation(format!(
                    "Duplicate target id {}",
                    target.id
                )));
            }
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
