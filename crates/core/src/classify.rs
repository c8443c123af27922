//! Threat classification of recognised contacts.
//!
//! [`classify`] is a pure function of the contact and the active
//! [`RuleSets`]; the rule sets themselves live inside the configuration
//! snapshot and are replaced wholesale when configuration changes.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::ship::{ContactRecord, ShipRecord, ShipStatus};

/// Upper bound of the aggregate danger level of one analysis pass.
pub const MAX_DANGER_LEVEL: u8 = 10;

// ---------------------------------------------------------------------------
// RuleSets
// ---------------------------------------------------------------------------

/// Case-insensitive lookup sets used by the classifier.
///
/// Entries are stored lowercased; blank entries are discarded so that a
/// contact with no faction tag never matches by accident.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RuleLists", into = "RuleLists")]
pub struct RuleSets {
    dangerous_ship_types: HashSet<String>,
    dangerous_factions: HashSet<String>,
    friendly_factions: HashSet<String>,
}

/// On-disk shape of [`RuleSets`]: three plain string lists.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleLists {
    pub dangerous_ship_types: Vec<String>,
    pub dangerous_factions: Vec<String>,
    pub friendly_factions: Vec<String>,
}

fn normalise<I, S>(items: I) -> HashSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    items
        .into_iter()
        .map(|s| s.as_ref().to_lowercase())
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn sorted(set: &HashSet<String>) -> Vec<String> {
    let mut items: Vec<String> = set.iter().cloned().collect();
    items.sort();
    items
}

impl RuleSets {
    pub fn new<I, S>(dangerous_ship_types: I, dangerous_factions: I, friendly_factions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            dangerous_ship_types: normalise(dangerous_ship_types),
            dangerous_factions: normalise(dangerous_factions),
            friendly_factions: normalise(friendly_factions),
        }
    }

    pub fn is_dangerous_type(&self, ship_type: &str) -> bool {
        self.dangerous_ship_types
            .contains(&ship_type.to_lowercase())
    }

    pub fn is_dangerous_faction(&self, faction: &str) -> bool {
        self.dangerous_factions.contains(&faction.to_lowercase())
    }

    pub fn is_friendly_faction(&self, faction: &str) -> bool {
        self.friendly_factions.contains(&faction.to_lowercase())
    }
}

impl From<RuleLists> for RuleSets {
    fn from(lists: RuleLists) -> Self {
        RuleSets::new(
            lists.dangerous_ship_types,
            lists.dangerous_factions,
            lists.friendly_factions,
        )
    }
}

impl From<RuleSets> for RuleLists {
    fn from(rules: RuleSets) -> Self {
        RuleLists {
            dangerous_ship_types: sorted(&rules.dangerous_ship_types),
            dangerous_factions: sorted(&rules.dangerous_factions),
            friendly_factions: sorted(&rules.friendly_factions),
        }
    }
}

// ---------------------------------------------------------------------------
// Classification
// ---------------------------------------------------------------------------

/// Classify one contact. First matching rule wins:
///
/// 1. friendly faction -> [`ShipStatus::Friendly`]
/// 2. dangerous faction -> [`ShipStatus::Hostile`]
/// 3. dangerous hull type -> [`ShipStatus::Neutral`]
/// 4. anything else -> [`ShipStatus::Normal`]
pub fn classify(contact: &ContactRecord, rules: &RuleSets) -> ShipRecord {
    let status = if rules.is_friendly_faction(&contact.faction) {
        ShipStatus::Friendly
    } else if rules.is_dangerous_faction(&contact.faction) {
        ShipStatus::Hostile
    } else if rules.is_dangerous_type(&contact.ship_type) {
        ShipStatus::Neutral
    } else {
        ShipStatus::Normal
    };
    ShipRecord::new(contact.clone(), status)
}

/// Aggregate danger of a set of classified ships, capped at
/// [`MAX_DANGER_LEVEL`].
pub fn danger_level(ships: &[ShipRecord]) -> u8 {
    let total: u32 = ships
        .iter()
        .filter(|s| s.is_dangerous)
        .map(|s| u32::from(s.threat_level))
        .sum();
    total.min(u32::from(MAX_DANGER_LEVEL)) as u8
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> RuleSets {
        RuleSets::new(
            vec!["Battleship", "Dreadnought"],
            vec!["GOON", "Pandemic Legion"],
            vec!["BRAVE", "GOON-ALT"],
        )
    }

    fn contact(ship_type: &str, faction: &str) -> ContactRecord {
        ContactRecord::new("pilot", ship_type, faction, Some(10.0))
    }

    #[test]
    fn friendly_faction_overrides_dangerous_type() {
        let ship = classify(&contact("Battleship", "brave"), &rules());
        assert_eq!(ship.status, ShipStatus::Friendly);
        assert!(!ship.is_dangerous);
        assert_eq!(ship.threat_level, 0);
    }

    #[test]
    fn friendly_wins_when_faction_in_both_sets() {
        let both = RuleSets::new(vec!["Titan"], vec!["TEST"], vec!["test"]);
        let ship = classify(&contact("Titan", "Test"), &both);
        assert_eq!(ship.status, ShipStatus::Friendly);
        assert!(!ship.is_dangerous);
    }

    #[test]
    fn dangerous_faction_is_hostile() {
        let ship = classify(&contact("Frigate", "goon"), &rules());
        assert_eq!(ship.status, ShipStatus::Hostile);
        assert!(ship.is_dangerous);
        assert_eq!(ship.threat_level, 5);
    }

    #[test]
    fn dangerous_type_is_neutral() {
        let ship = classify(&contact("DREADNOUGHT", "Random Corp"), &rules());
        assert_eq!(ship.status, ShipStatus::Neutral);
        assert!(ship.is_dangerous);
        assert_eq!(ship.threat_level, 3);
    }

    #[test]
    fn unmatched_contact_is_normal() {
        let ship = classify(&contact("Shuttle", ""), &rules());
        assert_eq!(ship.status, ShipStatus::Normal);
        assert!(!ship.is_dangerous);
        assert_eq!(ship.threat_level, 1);
    }

    #[test]
    fn matching_is_exact_not_substring() {
        let ship = classify(&contact("Battleships", "GOONS"), &rules());
        assert_eq!(ship.status, ShipStatus::Normal);
    }

    #[test]
    fn blank_rule_entries_never_match_missing_faction() {
        let with_blank = RuleSets::new(vec![""], vec!["", "  "], vec![""]);
        let ship = classify(&contact("", ""), &with_blank);
        assert_eq!(ship.status, ShipStatus::Normal);
    }

    #[test]
    fn threat_level_is_one_of_allowed_values() {
        let rules = rules();
        let inputs = [
            ("Battleship", "BRAVE"),
            ("Battleship", "GOON"),
            ("Battleship", ""),
            ("Frigate", ""),
            ("Frigate", "Pandemic Legion"),
        ];
        for (ty, faction) in inputs {
            let ship = classify(&contact(ty, faction), &rules);
            assert!([0u8, 1, 3, 5].contains(&ship.threat_level));
            assert_eq!(ship.threat_level, ship.status.threat_level());
            if ship.status == ShipStatus::Friendly {
                assert!(!ship.is_dangerous);
            }
        }
    }

    #[test]
    fn classification_is_pure() {
        let rules = rules();
        let c = contact("Dreadnought", "Some Corp");
        let first = classify(&c, &rules);
        // Interleave unrelated calls; the result for `c` must not change.
        let _ = classify(&contact("Frigate", "GOON"), &rules);
        let _ = classify(&contact("Titan", "BRAVE"), &rules);
        let second = classify(&c, &rules);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    #[test]
    fn danger_level_caps_at_ten() {
        let rules = rules();
        let ships: Vec<_> = (0..3)
            .map(|_| classify(&contact("Frigate", "GOON"), &rules))
            .collect();
        assert_eq!(danger_level(&ships), 10);
    }

    #[test]
    fn danger_level_single_neutral() {
        let ship = classify(&contact("Battleship", ""), &rules());
        assert_eq!(danger_level(&[ship]), 3);
    }

    #[test]
    fn danger_level_ignores_non_dangerous_ships() {
        let rules = rules();
        let ships = vec![
            classify(&contact("Frigate", ""), &rules),
            classify(&contact("Battleship", "BRAVE"), &rules),
        ];
        assert_eq!(danger_level(&ships), 0);
        assert_eq!(danger_level(&[]), 0);
    }

    #[test]
    fn rule_lists_round_trip_through_serde() {
        let json = serde_json::json!({
            "dangerous_ship_types": ["Titan"],
            "friendly_factions": ["Brave"]
        });
        let rules: RuleSets = serde_json::from_value(json).unwrap();
        assert!(rules.is_dangerous_type("TITAN"));
        assert!(rules.is_friendly_faction("brave"));
        assert!(!rules.is_dangerous_faction("brave"));

        let back = serde_json::to_value(&rules).unwrap();
        assert_eq!(back["dangerous_ship_types"], serde_json::json!(["titan"]));
        assert_eq!(back["dangerous_factions"], serde_json::json!([]));
    }
}
