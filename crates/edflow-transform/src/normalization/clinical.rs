//! Demographic and clinical cell normalization.

use std::sync::LazyLock;

use edflow_ingest::fold_lower;
use edflow_model::{Referral, Sex, UNSPECIFIED};
use regex::Regex;

use super::tokens::matches_any;

static DIAGNOSIS_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Z]\d{2}(?:\.\d{1,2})?").expect("Invalid diagnosis code regex")
});

static AGE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{1,3}").expect("Invalid age regex"));

static NUMBER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"-?\d+(?:[.,]\d+)?").expect("Invalid number regex"));

/// Group label for codes whose leading letter is outside the fixed set.
pub const OTHER_GROUP: &str = "Kita";

const MAX_AGE: u32 = 120;

/// ICD-10 codes found in a cell, uppercased and de-duplicated in first-seen
/// order.
pub fn extract_diagnosis_codes(raw: &str) -> Vec<String> {
    let upper = raw.to_uppercase();
    let mut codes: Vec<String> = Vec::new();
    for found in DIAGNOSIS_REGEX.find_iter(&upper) {
        let code = found.as_str();
        if !codes.iter().any(|seen| seen == code) {
            codes.push(code.to_string());
        }
    }
    codes
}

/// Clinical group for a code's leading letter.
pub fn diagnosis_group(code: &str) -> &'static str {
    match code.chars().next().map(|c| c.to_ascii_uppercase()) {
        Some('A' | 'B') => "A-B",
        Some('C' | 'D') => "C-D",
        Some('E') => "E",
        Some('F') => "F",
        Some('G') => "G",
        Some('H') => "H",
        Some('I') => "I",
        Some('J') => "J",
        Some('K') => "K",
        Some('L') => "L",
        Some('M') => "M",
        Some('N') => "N",
        Some('O') => "O",
        Some('P') => "P",
        Some('Q') => "Q",
        Some('R') => "R",
        Some('S' | 'T') => "S-T",
        Some('V' | 'W' | 'X' | 'Y') => "V-Y",
        Some('Z') => "Z",
        Some(_) => OTHER_GROUP,
        None => UNSPECIFIED,
    }
}

/// Group of the first extracted code, or `Nenurodyta` when there is none.
pub fn primary_diagnosis_group(codes: &[String]) -> String {
    codes
        .first()
        .map_or(UNSPECIFIED, |code| diagnosis_group(code))
        .to_string()
}

/// First 1-3 digit number in the cell, if it is a plausible age.
pub fn parse_age(raw: &str) -> Option<u32> {
    let age: u32 = AGE_REGEX.find(raw)?.as_str().parse().ok()?;
    (age <= MAX_AGE).then_some(age)
}

pub fn parse_sex(raw: &str) -> Sex {
    let value = fold_lower(raw.trim());
    match value.as_str() {
        "m" | "f" | "female" | "moteris" => Sex::Moteris,
        v if v.starts_with("mot") => Sex::Moteris,
        "v" | "male" => Sex::Vyras,
        v if v.starts_with("vyr") => Sex::Vyras,
        _ => Sex::Other,
    }
}

pub fn parse_referral(raw: &str, true_values: &[String]) -> Referral {
    let value = fold_lower(raw.trim());
    if value.is_empty() {
        return Referral::Unknown;
    }
    if matches_any(&value, true_values) || value.contains("su siunt") {
        return Referral::WithReferral;
    }
    if matches!(value.as_str(), "ne" | "false" | "0") || value.contains("be siunt") {
        return Referral::WithoutReferral;
    }
    Referral::Unknown
}

/// Whitespace-collapsed, title-cased city name.
pub fn normalize_city(raw: &str) -> String {
    let words: Vec<String> = raw
        .split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect();
    if words.is_empty() {
        UNSPECIFIED.to_string()
    } else {
        words.join(" ")
    }
}

/// First number in the cell; decimal commas are accepted.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let found = NUMBER_REGEX.find(raw)?;
    let value: f64 = found.as_str().replace(',', ".").parse().ok()?;
    value.is_finite().then_some(value)
}
