//! Strict delivery-phrase matching (`📜 delivery jun 5 morning`).
//!
//! A phrase qualifies only for today's date in the Pacific reference zone and
//! only for the slot implied by the current Pacific hour.

use chrono::{DateTime, Datelike, Timelike, Utc};
use chrono_tz::Tz;
use regex::Regex;

use crate::scan_config::MarkerSpec;

pub const REFERENCE_TIME_ZONE: Tz = chrono_tz::America::Los_Angeles;

const MORNING_HOURS: std::ops::Range<u32> = 4..9;
const EVENING_HOURS: std::ops::Range<u32> = 16..22;

const MONTH_TOKENS: [(&str, &str); 12] = [
    ("jan", "january"),
    ("feb", "february"),
    ("mar", "march"),
    ("apr", "april"),
    ("may", "may"),
    ("jun", "june"),
    ("jul", "july"),
    ("aug", "august"),
    ("sep", "september"),
    ("oct", "october"),
    ("nov", "november"),
    ("dec", "december"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliverySlot {
    Morning,
    Evening,
}

impl DeliverySlot {
    fn parse(token: &str) -> Option<Self> {
        match token.to_ascii_lowercase().as_str() {
            "morning" => Some(Self::Morning),
            "evening" => Some(Self::Evening),
            _ => None,
        }
    }
}

/// Slot a run at `hour` (Pacific) expects; `None` accepts either slot.
///
/// Outside the morning and evening run windows every slot is accepted. That
/// fallback is permissive and a candidate for tightening.
pub fn expected_slot(hour: u32) -> Option<DeliverySlot> {
    if MORNING_HOURS.contains(&hour) {
        Some(DeliverySlot::Morning)
    } else if EVENING_HOURS.contains(&hour) {
        Some(DeliverySlot::Evening)
    } else {
        None
    }
}

/// Month number for a three-letter abbreviation or full month name.
pub fn parse_month_token(token: &str) -> Option<u32> {
    let lowered = token.to_ascii_lowercase();
    let token = if lowered == "sept" { "sep" } else { lowered.as_str() };
    MONTH_TOKENS
        .iter()
        .position(|(short, full)| token == *short || token == *full)
        .and_then(|index| u32::try_from(index + 1).ok())
}

#[derive(Debug, Clone)]
pub struct DeliveryPhraseMatcher {
    pattern: Regex,
}

impl DeliveryPhraseMatcher {
    /// Builds the phrase pattern around the configured marker.
    pub fn for_marker(marker: &MarkerSpec) -> Option<Self> {
        let mut alternatives = Vec::new();
        if let Some(literal) = marker.literal() {
            alternatives.push(regex::escape(literal));
        }
        if let Some(id) = marker.custom_emoji_id() {
            alternatives.push(format!(r"<a?:[A-Za-z0-9_~]+:{id}>"));
        }
        if alternatives.is_empty() {
            return None;
        }
        let pattern = format!(
            r"(?i)(?:{})\s*delivery\s+([a-z]+)\s+(\d{{1,2}})\s+(morning|evening)\b",
            alternatives.join("|")
        );
        Regex::new(&pattern).ok().map(|pattern| Self { pattern })
    }

    /// True when any phrase in `text` names today's date and the current slot.
    pub fn matches_at(&self, text: &str, now: DateTime<Utc>) -> bool {
        let local = now.with_timezone(&REFERENCE_TIME_ZONE);
        let slot = expected_slot(local.hour());
        self.pattern.captures_iter(text).any(|captures| {
            let Some(month) = captures.get(1).and_then(|m| parse_month_token(m.as_str())) else {
                return false;
            };
            let Some(day) = captures.get(2).and_then(|m| m.as_str().parse::<u32>().ok()) else {
                return false;
            };
            let Some(phrase_slot) = captures.get(3).and_then(|m| DeliverySlot::parse(m.as_str()))
            else {
                return false;
            };
            month == local.month()
                && day == local.day()
                && slot.map_or(true, |expected| expected == phrase_slot)
        })
    }
}
