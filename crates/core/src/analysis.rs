//! Per-target, per-frame analysis output.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;

use crate::classify::danger_level;
use crate::ship::ShipRecord;
use crate::types::{TargetId, Timestamp};

/// Location name used when the location region could not be read.
pub const UNKNOWN_LOCATION: &str = "unknown";

/// Outcome of analysing one frame for one target.
///
/// Built once at the end of a pass via [`AnalysisResult::success`] or
/// [`AnalysisResult::failure`]; the derived fields (`contains_dangerous`,
/// `danger_level`) are computed at construction.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub target_id: TargetId,
    pub target_name: String,
    pub location: String,
    pub ships: Vec<ShipRecord>,
    pub contains_dangerous: bool,
    pub danger_level: u8,
    #[serde(serialize_with = "serialize_millis")]
    pub processing_time: Duration,
    pub success: bool,
    pub error: Option<String>,
    /// When the analysed frame was captured.
    pub captured_at: Timestamp,
    pub completed_at: Timestamp,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

impl AnalysisResult {
    pub fn success(
        target_id: TargetId,
        target_name: impl Into<String>,
        location: impl Into<String>,
        ships: Vec<ShipRecord>,
        processing_time: Duration,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            target_id,
            target_name: target_name.into(),
            location: location.into(),
            contains_dangerous: ships.iter().any(|s| s.is_dangerous),
            danger_level: danger_level(&ships),
            ships,
            processing_time,
            success: true,
            error: None,
            captured_at,
            completed_at: Utc::now(),
        }
    }

    pub fn failure(
        target_id: TargetId,
        target_name: impl Into<String>,
        error: impl Into<String>,
        processing_time: Duration,
        captured_at: Timestamp,
    ) -> Self {
        Self {
            target_id,
            target_name: target_name.into(),
            location: UNKNOWN_LOCATION.to_string(),
            ships: Vec::new(),
            contains_dangerous: false,
            danger_level: 0,
            processing_time,
            success: false,
            error: Some(error.into()),
            captured_at,
            completed_at: Utc::now(),
        }
    }

    /// One-line description used in logs.
    pub fn summary(&self) -> String {
        if !self.success {
            return format!(
                "target #{} analysis failed: {}",
                self.target_id,
                self.error.as_deref().unwrap_or("unknown error")
            );
        }
        let danger = if self.contains_dangerous {
            format!("danger level {}", self.danger_level)
        } else {
            "safe".to_string()
        };
        format!(
            "target #{} at {}: {} ship(s), {}, {:.2}ms",
            self.target_id,
            self.location,
            self.ships.len(),
            danger,
            self.processing_time.as_secs_f64() * 1000.0
        )
    }
}
