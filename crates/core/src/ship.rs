//! Raw and classified ship contacts.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A contact as read from the overview table, before classification.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContactRecord {
    pub name: String,
    /// Hull class label, e.g. `"Battleship"`.
    pub ship_type: String,
    /// Corporation / alliance tag, e.g. `"GOON"`. Empty when not shown.
    pub faction: String,
    /// Distance in kilometres, when the table row carried one.
    pub distance_km: Option<f64>,
}

impl ContactRecord {
    pub fn new(
        name: impl Into<String>,
        ship_type: impl Into<String>,
        faction: impl Into<String>,
        distance_km: Option<f64>,
    ) -> Self {
        Self {
            name: name.into(),
            ship_type: ship_type.into(),
            faction: faction.into(),
            distance_km,
        }
    }
}

/// Stance of a classified contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipStatus {
    Normal,
    Hostile,
    Neutral,
    Friendly,
}

impl ShipStatus {
    /// Threat contributed by a contact with this status.
    pub const fn threat_level(self) -> u8 {
        match self {
            ShipStatus::Hostile => 5,
            ShipStatus::Neutral => 3,
            ShipStatus::Normal => 1,
            ShipStatus::Friendly => 0,
        }
    }

    /// Hostile factions and dangerous hull types count towards the danger
    /// level; friendly and unremarkable contacts never do.
    pub const fn is_dangerous(self) -> bool {
        matches!(self, ShipStatus::Hostile | ShipStatus::Neutral)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            ShipStatus::Normal => "Normal",
            ShipStatus::Hostile => "Hostile",
            ShipStatus::Neutral => "Neutral",
            ShipStatus::Friendly => "Friendly",
        }
    }
}

impl fmt::Display for ShipStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A contact after classification against the configured rule sets.
///
/// Build through [`ShipRecord::new`] so that `is_dangerous` and
/// `threat_level` always agree with `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShipRecord {
    #[serde(flatten)]
    pub contact: ContactRecord,
    pub is_dangerous: bool,
    pub threat_level: u8,
    pub status: ShipStatus,
}

impl ShipRecord {
    pub fn new(contact: ContactRecord, status: ShipStatus) -> Self {
        Self {
            contact,
            is_dangerous: status.is_dangerous(),
            threat_level: status.threat_level(),
            status,
        }
    }
}

impl fmt::Display for ShipRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.contact.name)?;
        if !self.contact.faction.is_empty() {
            write!(f, " [{}]", self.contact.faction)?;
        }
        write!(f, " - {}", self.contact.ship_type)?;
        match self.contact.distance_km {
            Some(km) if km > 0.0 => write!(f, " - {km:.1}km")?,
            _ => write!(f, " - unknown")?,
        }
        write!(f, " - {}", self.status)
    }
}
