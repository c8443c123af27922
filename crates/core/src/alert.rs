//! Outbound alert messages and their markdown rendering.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use crate::classify::danger_level;
use crate::ship::ShipRecord;
use crate::types::{TargetId, Timestamp};

/// Maximum number of ship lines listed in a rendered alert.
pub const MAX_LISTED_SHIPS: usize = 5;

/// What an alert is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    ShipDanger,
    Performance,
    Informational,
}

impl AlertKind {
    fn marker(self) -> &'static str {
        match self {
            AlertKind::ShipDanger => "🔴",
            AlertKind::Performance => "⚙️",
            AlertKind::Informational => "ℹ️",
        }
    }
}

/// An immutable notification ready for dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct AlertMessage {
    pub id: Uuid,
    pub kind: AlertKind,
    pub title: String,
    pub body: String,
    pub target_id: Option<TargetId>,
    pub location: Option<String>,
    /// Aggregate danger level (0-10) for ship alerts.
    pub danger_level: Option<u8>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ships: Vec<ShipRecord>,
    pub created_at: Timestamp,
}

impl AlertMessage {
    fn base(kind: AlertKind, title: String, body: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            title,
            body,
            target_id: None,
            location: None,
            danger_level: None,
            ships: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Ship-danger alert for one target. Only the dangerous ships of `ships`
    /// are attached.
    pub fn ship_danger(
        target_id: TargetId,
        target_name: &str,
        location: &str,
        ships: &[ShipRecord],
    ) -> Self {
        let dangerous: Vec<ShipRecord> = ships.iter().filter(|s| s.is_dangerous).cloned().collect();
        let level = danger_level(&dangerous);
        let title = format!("Dangerous ships - {target_name}");
        let body = format!(
            "{} dangerous ship(s) detected in {location}",
            dangerous.len()
        );
        Self {
            target_id: Some(target_id),
            location: Some(location.to_string()),
            danger_level: Some(level),
            ships: dangerous,
            ..Self::base(AlertKind::ShipDanger, title, body)
        }
    }

    /// Alert raised when analysis took longer than the configured budget.
    pub fn performance(target_id: Option<TargetId>, elapsed: Duration, threshold: Duration) -> Self {
        let scope = match target_id {
            Some(id) => format!("target #{id}"),
            None => "frame".to_string(),
        };
        let body = format!(
            "Processing of {scope} took {:.2}ms, over the {}ms budget",
            elapsed.as_secs_f64() * 1000.0,
            threshold.as_millis()
        );
        Self {
            target_id,
            ..Self::base(AlertKind::Performance, "Performance warning".to_string(), body)
        }
    }

    pub fn informational(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self::base(AlertKind::Informational, title.into(), body.into())
    }

    /// Render the markdown text sent to the webhook.
    pub fn render_markdown(&self) -> String {
        let mut text = format!("{} **{}**\n\n{}\n\n", self.kind.marker(), self.title, self.body);

        if let Some(location) = &self.location {
            text.push_str(&format!("- Location: {location}\n"));
        }
        if let Some(id) = self.target_id {
            text.push_str(&format!("- Target: #{id}\n"));
        }
        if let Some(level) = self.danger_level.filter(|l| *l > 0) {
            text.push_str(&format!("- Danger level: {level}/10\n"));
        }
        if !self.ships.is_empty() {
            text.push_str(&format!("- Ships detected: {}\n", self.ships.len()));
            for ship in self.ships.iter().take(MAX_LISTED_SHIPS) {
                text.push_str(&format!("  - {ship}\n"));
            }
            if self.ships.len() > MAX_LISTED_SHIPS {
                text.push_str(&format!(
                    "  - ... and {} more\n",
                    self.ships.len() - MAX_LISTED_SHIPS
                ));
            }
        }

        text.push_str(&format!(
            "\n*Time: {}*",
            self.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ship::{ContactRecord, ShipStatus};

    fn ship(name: &str, status: ShipStatus) -> ShipRecord {
        ShipRecord::new(ContactRecord::new(name, "Battleship", "GOON", Some(20.0)), status)
    }

    #[test]
    fn ship_danger_keeps_only_dangerous_ships() {
        let ships = vec![
            ship("a", ShipStatus::Hostile),
            ship("b", ShipStatus::Normal),
            ship("c", ShipStatus::Neutral),
        ];
        let alert = AlertMessage::ship_danger(2, "Alt 2", "Jita", &ships);
        assert_eq!(alert.kind, AlertKind::ShipDanger);
        assert_eq!(alert.ships.len(), 2);
        assert_eq!(alert.danger_level, Some(8));
        assert_eq!(alert.target_id, Some(2));
        assert_eq!(alert.location.as_deref(), Some("Jita"));
        assert_eq!(alert.body, "2 dangerous ship(s) detected in Jita");
    }

    #[test]
    fn ship_danger_level_is_capped() {
        let ships: Vec<_> = (0..4).map(|i| ship(&i.to_string(), ShipStatus::Hostile)).collect();
        let alert = AlertMessage::ship_danger(0, "Main", "Amamake", &ships);
        assert_eq!(alert.danger_level, Some(10));
    }

    #[test]
    fn performance_body_mentions_budget() {
        let alert = AlertMessage::performance(
            Some(3),
            Duration::from_millis(750),
            Duration::from_millis(500),
        );
        assert_eq!(alert.kind, AlertKind::Performance);
        assert!(alert.body.contains("target #3"));
        assert!(alert.body.contains("750.00ms"));
        assert!(alert.body.contains("500ms budget"));
    }

    #[test]
    fn markdown_lists_at_most_five_ships() {
        let ships: Vec<_> = (0..7).map(|i| ship(&format!("pilot{i}"), ShipStatus::Hostile)).collect();
        let text = AlertMessage::ship_danger(0, "Main", "Tama", &ships).render_markdown();
        assert!(text.starts_with("🔴 **Dangerous ships - Main**"));
        assert!(text.contains("- Location: Tama\n"));
        assert!(text.contains("- Danger level: 10/10\n"));
        assert!(text.contains("- Ships detected: 7\n"));
        assert!(text.contains("pilot4"));
        assert!(!text.contains("pilot5"));
        assert!(text.contains("  - ... and 2 more\n"));
        assert!(text.contains("*Time: "));
    }

    #[test]
    fn informational_markdown_has_no_details() {
        let text = AlertMessage::informational("Test", "Webhook connectivity check").render_markdown();
        assert!(text.starts_with("ℹ️ **Test**\n\nWebhook connectivity check\n\n"));
        assert!(!text.contains("- Location"));
        assert!(!text.contains("Danger level"));
    }
}
