//! Token matching for flag-like cells: EMS arrival, hospitalization,
//! day/night and card type.

use chrono::Timelike;
use edflow_ingest::{fold_diacritics, fold_lower};
use edflow_model::{CardType, NightWindow};

use super::datetime::ParsedTimestamp;

/// Case-insensitive match of `value` against a token that may contain `*`.
///
/// - `*` alone matches any non-empty value.
/// - A pattern with stars matches when its star-separated fragments occur
///   in the value in order.
/// - Anything else must match exactly.
pub fn matches_wildcard(value: &str, pattern: &str) -> bool {
    let value = value.trim().to_lowercase();
    let pattern = pattern.trim().to_lowercase();
    if !pattern.contains('*') {
        return value == pattern;
    }
    if value.is_empty() {
        return false;
    }
    let mut rest = value.as_str();
    for fragment in pattern.split('*').filter(|fragment| !fragment.is_empty()) {
        match rest.find(fragment) {
            Some(pos) => rest = &rest[pos + fragment.len()..],
            None => return false,
        }
    }
    true
}

/// True when `value` matches at least one token.
pub fn matches_any(value: &str, tokens: &[String]) -> bool {
    tokens.iter().any(|token| matches_wildcard(value, token))
}

/// Night flag for a visit.
///
/// The configured window is used when the arrival carries a time of day;
/// otherwise the day/night cell is matched against the keyword lists.
pub fn detect_night(
    arrival: Option<&ParsedTimestamp>,
    day_night_cell: &str,
    window: Option<NightWindow>,
    night_keywords: &[String],
    day_keywords: &[String],
) -> bool {
    if let (Some(window), Some(arrival)) = (window, arrival.filter(|a| a.has_time)) {
        let minute = arrival.value.hour() * 60 + arrival.value.minute();
        return window.contains(minute);
    }
    let cell = fold_lower(day_night_cell.trim());
    if cell.is_empty() {
        return false;
    }
    let folded = |keywords: &[String]| -> Vec<String> {
        keywords
            .iter()
            .map(|keyword| fold_lower(keyword.trim()))
            .filter(|keyword| !keyword.is_empty())
            .collect()
    };
    let night = folded(night_keywords);
    if night.contains(&cell) {
        return true;
    }
    if folded(day_keywords).contains(&cell) {
        return false;
    }
    night
        .iter()
        .any(|keyword| keyword.chars().count() > 1 && cell.contains(keyword.as_str()))
}

const CARD_SUFFIXES: [(&str, CardType); 3] = [
    ("TR", CardType::Tr),
    ("CH", CardType::Ch),
    ("T", CardType::T),
];

/// Card type from the letter suffix of a free-text card number.
pub fn detect_card_type(raw: &str) -> CardType {
    let upper = fold_diacritics(raw).to_uppercase();
    let letters: String = upper.chars().filter(char::is_ascii_alphabetic).collect();
    if letters.is_empty() {
        return CardType::Other;
    }
    let tokens: Vec<&str> = upper
        .split(|c: char| !c.is_ascii_alphabetic())
        .filter(|token| !token.is_empty())
        .collect();
    CARD_SUFFIXES
        .iter()
        .find(|(suffix, _)| {
            letters.ends_with(suffix) || tokens.iter().any(|token| token.ends_with(suffix))
        })
        .map_or(CardType::Other, |(_, card_type)| *card_type)
}
