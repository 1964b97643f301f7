//! Normalized visit record produced by the record mapper.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Placeholder used for unknown categorical values.
pub const UNSPECIFIED: &str = "Nenurodyta";

/// Card type derived from the suffix of a free-text card/visit number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    /// Trauma card (`T` suffix).
    T,
    /// Trauma/resuscitation card (`TR` suffix).
    Tr,
    /// Surgical card (`CH` suffix).
    Ch,
    #[default]
    Other,
}

impl CardType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::T => "t",
            Self::Tr => "tr",
            Self::Ch => "ch",
            Self::Other => "other",
        }
    }
}

/// Age band used by demographic breakdowns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AgeBand {
    #[serde(rename = "0-17")]
    Child,
    #[serde(rename = "18-34")]
    YoungAdult,
    #[serde(rename = "35-49")]
    Adult,
    #[serde(rename = "50-64")]
    MiddleAged,
    #[serde(rename = "65-79")]
    Senior,
    #[serde(rename = "80+")]
    Elderly,
    #[default]
    #[serde(rename = "Nenurodyta")]
    Unknown,
}

impl AgeBand {
    /// Band for an age in whole years; `None` maps to [`AgeBand::Unknown`].
    pub fn from_age(age: Option<u32>) -> Self {
        match age {
            None => Self::Unknown,
            Some(0..=17) => Self::Child,
            Some(18..=34) => Self::YoungAdult,
            Some(35..=49) => Self::Adult,
            Some(50..=64) => Self::MiddleAged,
            Some(65..=79) => Self::Senior,
            Some(_) => Self::Elderly,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Child => "0-17",
            Self::YoungAdult => "18-34",
            Self::Adult => "35-49",
            Self::MiddleAged => "50-64",
            Self::Senior => "65-79",
            Self::Elderly => "80+",
            Self::Unknown => UNSPECIFIED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Sex {
    Moteris,
    Vyras,
    #[default]
    #[serde(rename = "Kita/Nenurodyta")]
    Other,
}

/// Whether the patient arrived with a referral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Referral {
    #[serde(rename = "su siuntimu")]
    WithReferral,
    #[serde(rename = "be siuntimo")]
    WithoutReferral,
    #[default]
    #[serde(rename = "Nenurodyta")]
    Unknown,
}

/// One emergency-department visit after normalization.
///
/// Every field has a defined default, so a row with unparsable cells still
/// yields a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedRecord {
    pub arrival: Option<NaiveDateTime>,
    pub discharge: Option<NaiveDateTime>,
    #[serde(default)]
    pub arrival_has_time: bool,
    #[serde(default)]
    pub discharge_has_time: bool,
    #[serde(default)]
    pub night: bool,
    #[serde(default)]
    pub ems: bool,
    #[serde(default)]
    pub hospitalized: bool,
    #[serde(default)]
    pub department: String,
    #[serde(default)]
    pub card_type: CardType,
    #[serde(default)]
    pub age_years: Option<u32>,
    #[serde(default)]
    pub age_band: AgeBand,
    #[serde(default)]
    pub sex: Sex,
    #[serde(default = "unspecified")]
    pub city_norm: String,
    #[serde(default)]
    pub diagnosis_codes: Vec<String>,
    #[serde(default = "unspecified")]
    pub diagnosis_group: String,
    #[serde(default)]
    pub referral: Referral,
}

fn unspecified() -> String {
    UNSPECIFIED.to_string()
}

impl Default for NormalizedRecord {
    fn default() -> Self {
        Self {
            arrival: None,
            discharge: None,
            arrival_has_time: false,
            discharge_has_time: false,
            night: false,
            ems: false,
            hospitalized: false,
            department: String::new(),
            card_type: CardType::Other,
            age_years: None,
            age_band: AgeBand::Unknown,
            sex: Sex::Other,
            city_norm: unspecified(),
            diagnosis_codes: Vec::new(),
            diagnosis_group: unspecified(),
            referral: Referral::Unknown,
        }
    }
}

impl NormalizedRecord {
    /// Length of stay in hours, when both endpoints are known.
    ///
    /// May be negative for data-entry errors; callers decide what range is
    /// acceptable.
    pub fn duration_hours(&self) -> Option<f64> {
        let (arrival, discharge) = (self.arrival?, self.discharge?);
        let seconds = (discharge - arrival).num_seconds();
        Some(seconds as f64 / 3600.0)
    }

    /// Timestamp used for shift-day bucketing: arrival, else discharge.
    pub fn reference_time(&self) -> Option<NaiveDateTime> {
        self.arrival.or(self.discharge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 5)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn age_band_boundaries() {
        assert_eq!(AgeBand::from_age(Some(17)), AgeBand::Child);
        assert_eq!(AgeBand::from_age(Some(18)), AgeBand::YoungAdult);
        assert_eq!(AgeBand::from_age(Some(64)), AgeBand::MiddleAged);
        assert_eq!(AgeBand::from_age(Some(80)), AgeBand::Elderly);
        assert_eq!(AgeBand::from_age(None).label(), "Nenurodyta");
    }

    #[test]
    fn duration_requires_both_endpoints() {
        let mut record = NormalizedRecord {
            arrival: Some(at(8, 10)),
            ..NormalizedRecord::default()
        };
        assert_eq!(record.duration_hours(), None);
        record.discharge = Some(at(10, 40));
        assert_eq!(record.duration_hours(), Some(2.5));
    }

    #[test]
    fn enums_use_wire_labels() {
        assert_eq!(serde_json::to_string(&CardType::Tr).unwrap(), "\"tr\"");
        assert_eq!(
            serde_json::to_string(&Sex::Other).unwrap(),
            "\"Kita/Nenurodyta\""
        );
        assert_eq!(
            serde_json::to_string(&Referral::WithoutReferral).unwrap(),
            "\"be siuntimo\""
        );
    }

    #[test]
    fn sparse_record_deserializes_with_defaults() {
        let record: NormalizedRecord =
            serde_json::from_str(r#"{"arrival":"2024-01-05T08:10:00","discharge":null}"#)
                .unwrap();
        assert_eq!(record.arrival, Some(at(8, 10)));
        assert_eq!(record.city_norm, UNSPECIFIED);
        assert_eq!(record.card_type, CardType::Other);
    }
}
