//! Turning raw OCR text into structured contacts.
//!
//! The overview table renders one contact per line as
//! `Name [Faction] - Type - 12.5 km`. OCR output is noisy, so parsing is
//! lenient: a missing faction, type or distance simply leaves that field
//! empty.

use std::sync::LazyLock;

use regex::Regex;

use crate::ship::ContactRecord;

/// Full-width punctuation that OCR engines commonly emit for CJK fonts,
/// mapped to its ASCII equivalent.
const TEXT_CORRECTIONS: [(char, char); 4] = [('％', '%'), ('：', ':'), ('，', ','), ('。', '.')];

static FACTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("valid faction regex"));

static DISTANCE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+(?:\.\d+)?)\s*km").expect("valid distance regex"));

/// Replace full-width punctuation with ASCII.
pub fn correct_text(text: &str) -> String {
    text.chars()
        .map(|c| {
            TEXT_CORRECTIONS
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

/// Normalise recognised location text: corrected, trimmed, first line only.
pub fn clean_location(text: &str) -> String {
    correct_text(text)
        .lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or_default()
        .to_string()
}

/// Parse a single overview line. Returns `None` for blank lines.
pub fn parse_contact_line(line: &str) -> Option<ContactRecord> {
    let line = correct_text(line);
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let (faction, rest) = match FACTION_RE.captures(line) {
        Some(caps) => {
            let whole = caps.get(0).map(|m| m.as_str()).unwrap_or_default();
            let faction = caps.get(1).map(|m| m.as_str().trim()).unwrap_or_default();
            (faction.to_string(), line.replacen(whole, "", 1))
        }
        None => (String::new(), line.to_string()),
    };

    let parts: Vec<&str> = rest
        .split('-')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

    let name = parts.first().copied().unwrap_or(line).to_string();
    let ship_type = parts.get(1).copied().unwrap_or_default().to_string();
    let distance_km = parts
        .get(2)
        .and_then(|p| DISTANCE_RE.captures(p))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    Some(ContactRecord {
        name,
        ship_type,
        faction,
        distance_km,
    })
}

/// Parse every non-blank line of an overview table.
pub fn parse_contact_table(text: &str) -> Vec<ContactRecord> {
    text.lines().filter_map(parse_contact_line).collect()
}
