//! KPI filter specification.
//!
//! Filters arrive as loosely-typed values. Anything unrecognized falls back
//! to the caller-supplied defaults instead of failing the request.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::DEFAULT_WINDOW_DAYS;
use crate::record::CardType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShiftFilter {
    #[default]
    All,
    Day,
    Night,
}

impl ShiftFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "day" | "diena" => Some(Self::Day),
            "night" | "naktis" => Some(Self::Night),
            _ => None,
        }
    }

    pub fn matches(self, night: bool) -> bool {
        match self {
            Self::All => true,
            Self::Day => !night,
            Self::Night => night,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArrivalFilter {
    #[default]
    All,
    Ems,
    #[serde(rename = "self")]
    SelfArrival,
}

impl ArrivalFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "ems" | "gmp" => Some(Self::Ems),
            "self" => Some(Self::SelfArrival),
            _ => None,
        }
    }

    pub fn matches(self, ems: bool) -> bool {
        match self {
            Self::All => true,
            Self::Ems => ems,
            Self::SelfArrival => !ems,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DispositionFilter {
    #[default]
    All,
    Hospitalized,
    Discharged,
}

impl DispositionFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "hospitalized" => Some(Self::Hospitalized),
            "discharged" => Some(Self::Discharged),
            _ => None,
        }
    }

    pub fn matches(self, hospitalized: bool) -> bool {
        match self {
            Self::All => true,
            Self::Hospitalized => hospitalized,
            Self::Discharged => !hospitalized,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardTypeFilter {
    #[default]
    All,
    T,
    Tr,
    Ch,
}

impl CardTypeFilter {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "all" => Some(Self::All),
            "t" => Some(Self::T),
            "tr" => Some(Self::Tr),
            "ch" => Some(Self::Ch),
            _ => None,
        }
    }

    pub fn matches(self, card_type: CardType) -> bool {
        match self {
            Self::All => true,
            Self::T => card_type == CardType::T,
            Self::Tr => card_type == CardType::Tr,
            Self::Ch => card_type == CardType::Ch,
        }
    }
}

/// Effective KPI filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiFilterSpec {
    /// Trailing window in shift days; `0` disables windowing.
    pub window: u32,
    pub shift: ShiftFilter,
    pub arrival: ArrivalFilter,
    pub disposition: DispositionFilter,
    pub card_type: CardTypeFilter,
}

impl Default for KpiFilterSpec {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW_DAYS,
            shift: ShiftFilter::All,
            arrival: ArrivalFilter::All,
            disposition: DispositionFilter::All,
            card_type: CardTypeFilter::All,
        }
    }
}

/// A loosely-typed filter value as sent by the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    Number(f64),
    Text(String),
    Other(IgnoredAny),
}

impl FilterValue {
    fn text(&self) -> Option<&str> {
        match self {
            Self::Text(raw) => Some(raw),
            _ => None,
        }
    }

    fn window(&self) -> Option<u32> {
        let days = match self {
            Self::Number(n) => *n,
            Self::Text(raw) => raw.trim().parse().ok()?,
            Self::Other(_) => return None,
        };
        (days.is_finite() && days >= 0.0).then(|| days.floor().min(f64::from(u32::MAX)) as u32)
    }

    /// A day count where anything at or below zero clamps to `0`.
    /// Fractions are truncated.
    pub fn day_count(&self) -> Option<u32> {
        let days = match self {
            Self::Number(n) => *n,
            Self::Text(raw) => raw.trim().parse().ok()?,
            Self::Other(_) => return None,
        };
        days.is_finite().then(|| days.trunc().clamp(0.0, f64::from(u32::MAX)) as u32)
    }
}

/// Decodes an optional day count leniently: numbers of any sign or form and
/// numeric strings are accepted, anything else reads as absent.
pub fn deserialize_day_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<FilterValue>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(FilterValue::day_count))
}

/// Filters as received on the wire.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct KpiFilterInput {
    pub window: Option<FilterValue>,
    pub shift: Option<FilterValue>,
    pub arrival: Option<FilterValue>,
    pub disposition: Option<FilterValue>,
    pub card_type: Option<FilterValue>,
}

impl KpiFilterSpec {
    /// Resolves wire filters, taking each unrecognized field from `defaults`.
    pub fn resolve(input: &KpiFilterInput, defaults: &KpiFilterSpec) -> Self {
        fn parse_with<T>(value: Option<&FilterValue>, parse: fn(&str) -> Option<T>) -> Option<T> {
            value.and_then(FilterValue::text).and_then(parse)
        }
        Self {
            window: input
                .window
                .as_ref()
                .and_then(FilterValue::window)
                .unwrap_or(defaults.window),
            shift: parse_with(input.shift.as_ref(), ShiftFilter::parse).unwrap_or(defaults.shift),
            arrival: parse_with(input.arrival.as_ref(), ArrivalFilter::parse)
                .unwrap_or(defaults.arrival),
            disposition: parse_with(input.disposition.as_ref(), DispositionFilter::parse)
                .unwrap_or(defaults.disposition),
            card_type: parse_with(input.card_type.as_ref(), CardTypeFilter::parse)
                .unwrap_or(defaults.card_type),
        }
    }

    /// True when no record-level predicate is active.
    pub fn is_unfiltered(&self) -> bool {
        self.shift == ShiftFilter::All
            && self.arrival == ArrivalFilter::All
            && self.disposition == DispositionFilter::All
            && self.card_type == CardTypeFilter::All
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(json: &str) -> KpiFilterInput {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn recognized_values_are_parsed() {
        let spec = KpiFilterSpec::resolve(
            &input(r#"{"window":7,"shift":"night","arrival":"self","disposition":"hospitalized","cardType":"TR"}"#),
            &KpiFilterSpec::default(),
        );
        assert_eq!(spec.window, 7);
        assert_eq!(spec.shift, ShiftFilter::Night);
        assert_eq!(spec.arrival, ArrivalFilter::SelfArrival);
        assert_eq!(spec.disposition, DispositionFilter::Hospitalized);
        assert_eq!(spec.card_type, CardTypeFilter::Tr);
    }

    #[test]
    fn unrecognized_values_fall_back_to_defaults() {
        let defaults = KpiFilterSpec {
            window: 14,
            shift: ShiftFilter::Day,
            ..KpiFilterSpec::default()
        };
        let spec = KpiFilterSpec::resolve(
            &input(r#"{"window":-3,"shift":"evening","arrival":42,"cardType":{"x":1}}"#),
            &defaults,
        );
        assert_eq!(spec, defaults);
    }

    #[test]
    fn window_accepts_numeric_strings() {
        let spec = KpiFilterSpec::resolve(&input(r#"{"window":"0"}"#), &KpiFilterSpec::default());
        assert_eq!(spec.window, 0);
        assert!(spec.is_unfiltered());
    }

    #[test]
    fn spec_serializes_wire_names() {
        let value = serde_json::to_value(KpiFilterSpec::default()).unwrap();
        assert_eq!(value["arrival"], "all");
        assert_eq!(value["cardType"], "all");
        let self_arrival = serde_json::to_value(ArrivalFilter::SelfArrival).unwrap();
        assert_eq!(self_arrival, "self");
    }
}
