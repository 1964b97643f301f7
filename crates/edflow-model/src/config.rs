//! Parsing and calculation configuration.
//!
//! Wire-level options (`CsvOptions`, `CalculationOptions`) carry every field
//! as optional. They are normalized exactly once, at request entry, into
//! `CsvConfig` and `CalculationConfig`, which hold concrete values only.
//!
//! # Resolution order
//!
//! - CSV header candidates and token lists: request settings, then the
//!   caller's defaults object, then the hard defaults below.
//! - Shift start: `shiftStartHour`, then `nightEndHour`, then the same two
//!   keys from the defaults object, then 07:00.

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

use crate::column::FieldSpec;
use crate::filter::deserialize_day_count;

pub const DEFAULT_SHIFT_START_HOUR: u32 = 7;
pub const DEFAULT_NIGHT_START_HOUR: u32 = 20;
pub const DEFAULT_NIGHT_END_HOUR: u32 = 7;
pub const DEFAULT_WINDOW_DAYS: u32 = 30;

const MINUTES_PER_DAY: i64 = 1440;

const DEFAULT_ARRIVAL: &[&str] = &[
    "Atvykimo data",
    "Atvykimo laikas",
    "Atvyko",
    "Arrival",
    "Arrival time",
];
const DEFAULT_DISCHARGE: &[&str] = &[
    "Išrašymo data",
    "Išvykimo data",
    "Išvyko",
    "Discharge",
    "Discharge time",
];
const DEFAULT_DAY_NIGHT: &[&str] = &["Diena/naktis", "Paros metas", "Day/Night", "Shift"];
const DEFAULT_GMP: &[&str] = &["GMP", "Atvežė GMP", "Greitoji", "EMS", "Ambulance"];
const DEFAULT_DEPARTMENT: &[&str] = &["Nukreiptas į padalinį", "Skyrius", "Padalinys", "Department"];
const DEFAULT_NUMBER: &[&str] = &["Numeris", "Kortelės numeris", "Kortelės Nr.", "Card number"];
const DEFAULT_AGE: &[&str] = &["Amžius", "Age"];
const DEFAULT_SEX: &[&str] = &["Lytis", "Sex", "Gender"];
const DEFAULT_CITY: &[&str] = &["Miestas", "Gyvenamoji vieta", "Savivaldybė", "City"];
const DEFAULT_DIAGNOSIS: &[&str] = &["Diagnozė", "Diagnozės", "TLK-10", "Diagnosis", "ICD-10"];
const DEFAULT_REFERRAL: &[&str] = &["Siuntimas", "Nukreipimas", "Siuntimo tipas", "Referral"];

const DEFAULT_TRUE_VALUES: &[&str] = &["taip", "yes", "true", "1", "gmp", "+"];
const DEFAULT_HOSPITALIZED_VALUES: &[&str] = &["*"];
const DEFAULT_NIGHT_KEYWORDS: &[&str] = &["naktis", "naktinė", "night", "n"];
const DEFAULT_DAY_KEYWORDS: &[&str] = &["diena", "dieninė", "day", "d"];

/// Splits a multi-value setting on newline, comma, semicolon or pipe.
///
/// Entries are trimmed and blank entries dropped.
pub fn split_multi_value(raw: &str) -> Vec<String> {
    raw.split(['\n', '\r', ',', ';', '|'])
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_string)
        .collect()
}

/// A list of strings supplied either as a JSON array or a single
/// multi-value string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CandidateList {
    Text(String),
    List(Vec<String>),
}

impl CandidateList {
    pub fn values(&self) -> Vec<String> {
        match self {
            Self::Text(raw) => split_multi_value(raw),
            Self::List(items) => items.iter().flat_map(|item| split_multi_value(item)).collect(),
        }
    }
}

impl From<&[&str]> for CandidateList {
    fn from(items: &[&str]) -> Self {
        Self::List(items.iter().map(|item| (*item).to_string()).collect())
    }
}

fn pick(
    setting: Option<&CandidateList>,
    fallback: Option<&CandidateList>,
    hard_default: &[&str],
) -> Vec<String> {
    [setting, fallback]
        .into_iter()
        .flatten()
        .map(CandidateList::values)
        .find(|values| !values.is_empty())
        .unwrap_or_else(|| hard_default.iter().map(|item| (*item).to_string()).collect())
}

/// CSV settings as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    pub arrival: Option<CandidateList>,
    pub discharge: Option<CandidateList>,
    pub day_night: Option<CandidateList>,
    pub gmp: Option<CandidateList>,
    pub department: Option<CandidateList>,
    pub number: Option<CandidateList>,
    pub age: Option<CandidateList>,
    pub sex: Option<CandidateList>,
    pub city: Option<CandidateList>,
    pub diagnosis: Option<CandidateList>,
    pub referral: Option<CandidateList>,
    pub true_values: Option<CandidateList>,
    pub hospitalized_values: Option<CandidateList>,
    pub night_keywords: Option<CandidateList>,
    pub day_keywords: Option<CandidateList>,
}

/// Header synonyms per logical visit field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderCandidates {
    pub arrival: Vec<String>,
    pub discharge: Vec<String>,
    pub day_night: Vec<String>,
    pub gmp: Vec<String>,
    pub department: Vec<String>,
    pub number: Vec<String>,
    pub age: Vec<String>,
    pub sex: Vec<String>,
    pub city: Vec<String>,
    pub diagnosis: Vec<String>,
    pub referral: Vec<String>,
}

/// Normalized CSV parsing configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvConfig {
    pub headers: HeaderCandidates,
    pub true_values: Vec<String>,
    /// Department tokens marking a hospitalization; `*` wildcards allowed.
    pub hospitalized_values: Vec<String>,
    pub night_keywords: Vec<String>,
    pub day_keywords: Vec<String>,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self::normalize(&CsvOptions::default(), &CsvOptions::default())
    }
}

impl CsvConfig {
    pub fn normalize(settings: &CsvOptions, defaults: &CsvOptions) -> Self {
        let headers = HeaderCandidates {
            arrival: pick(settings.arrival.as_ref(), defaults.arrival.as_ref(), DEFAULT_ARRIVAL),
            discharge: pick(
                settings.discharge.as_ref(),
                defaults.discharge.as_ref(),
                DEFAULT_DISCHARGE,
            ),
            day_night: pick(
                settings.day_night.as_ref(),
                defaults.day_night.as_ref(),
                DEFAULT_DAY_NIGHT,
            ),
            gmp: pick(settings.gmp.as_ref(), defaults.gmp.as_ref(), DEFAULT_GMP),
            department: pick(
                settings.department.as_ref(),
                defaults.department.as_ref(),
                DEFAULT_DEPARTMENT,
            ),
            number: pick(settings.number.as_ref(), defaults.number.as_ref(), DEFAULT_NUMBER),
            age: pick(settings.age.as_ref(), defaults.age.as_ref(), DEFAULT_AGE),
            sex: pick(settings.sex.as_ref(), defaults.sex.as_ref(), DEFAULT_SEX),
            city: pick(settings.city.as_ref(), defaults.city.as_ref(), DEFAULT_CITY),
            diagnosis: pick(
                settings.diagnosis.as_ref(),
                defaults.diagnosis.as_ref(),
                DEFAULT_DIAGNOSIS,
            ),
            referral: pick(
                settings.referral.as_ref(),
                defaults.referral.as_ref(),
                DEFAULT_REFERRAL,
            ),
        };
        Self {
            headers,
            true_values: pick(
                settings.true_values.as_ref(),
                defaults.true_values.as_ref(),
                DEFAULT_TRUE_VALUES,
            ),
            hospitalized_values: pick(
                settings.hospitalized_values.as_ref(),
                defaults.hospitalized_values.as_ref(),
                DEFAULT_HOSPITALIZED_VALUES,
            ),
            night_keywords: pick(
                settings.night_keywords.as_ref(),
                defaults.night_keywords.as_ref(),
                DEFAULT_NIGHT_KEYWORDS,
            ),
            day_keywords: pick(
                settings.day_keywords.as_ref(),
                defaults.day_keywords.as_ref(),
                DEFAULT_DAY_KEYWORDS,
            ),
        }
    }

    /// Field specs for the visit dataset; arrival and discharge are required.
    pub fn field_specs(&self) -> Vec<FieldSpec> {
        let h = &self.headers;
        vec![
            FieldSpec::required("arrival", h.arrival.clone()),
            FieldSpec::required("discharge", h.discharge.clone()),
            FieldSpec::optional("dayNight", h.day_night.clone()),
            FieldSpec::optional("gmp", h.gmp.clone()),
            FieldSpec::optional("department", h.department.clone()),
            FieldSpec::optional("number", h.number.clone()),
            FieldSpec::optional("age", h.age.clone()),
            FieldSpec::optional("sex", h.sex.clone()),
            FieldSpec::optional("city", h.city.clone()),
            FieldSpec::optional("diagnosis", h.diagnosis.clone()),
            FieldSpec::optional("referral", h.referral.clone()),
        ]
    }
}

/// A time-of-day setting: a number of hours (fractions allowed) or an
/// `HH:MM` string.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ClockValue {
    Hours(f64),
    Text(String),
}

impl ClockValue {
    /// Minutes after midnight in `[0, 1440)`, or `None` if the value is not
    /// a usable time.
    pub fn to_minutes(&self) -> Option<u32> {
        let minutes = match self {
            Self::Hours(hours) => hours_to_minutes(*hours)?,
            Self::Text(raw) => {
                let trimmed = raw.trim();
                if let Some((h, m)) = trimmed.split_once(':') {
                    let hours: i64 = h.trim().parse().ok()?;
                    let minutes: i64 = m.trim().parse().ok()?;
                    if !(0..60).contains(&minutes) {
                        return None;
                    }
                    hours.checked_mul(60)?.checked_add(minutes)?
                } else {
                    hours_to_minutes(trimmed.replace(',', ".").parse().ok()?)?
                }
            }
        };
        Some(minutes.rem_euclid(MINUTES_PER_DAY) as u32)
    }
}

/// A clock setting that may hold a value of the wrong type.
#[derive(Deserialize)]
#[serde(untagged)]
enum LenientClock {
    Value(ClockValue),
    Other(IgnoredAny),
}

/// Decodes an optional clock setting, treating values of the wrong type as
/// absent.
fn deserialize_clock<'de, D>(deserializer: D) -> Result<Option<ClockValue>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<LenientClock>::deserialize(deserializer)? {
        Some(LenientClock::Value(value)) => Some(value),
        Some(LenientClock::Other(_)) | None => None,
    })
}

fn hours_to_minutes(hours: f64) -> Option<i64> {
    hours.is_finite().then(|| (hours * 60.0).round() as i64)
}

/// Start of the operational shift day, in minutes after midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ShiftStart(u32);

impl ShiftStart {
    /// Normalizes any minute offset into `[0, 1440)`.
    pub fn from_minutes(minutes: i64) -> Self {
        Self(minutes.rem_euclid(MINUTES_PER_DAY) as u32)
    }

    pub fn from_hour(hour: u32) -> Self {
        Self::from_minutes(i64::from(hour) * 60)
    }

    pub fn minutes(self) -> u32 {
        self.0
    }
}

impl Default for ShiftStart {
    fn default() -> Self {
        Self::from_hour(DEFAULT_SHIFT_START_HOUR)
    }
}

/// Night window in minutes of day; `start` inclusive, `end` exclusive, wraps
/// around midnight when `start > end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NightWindow {
    pub start: u32,
    pub end: u32,
}

impl NightWindow {
    /// `None` when start and end coincide (an empty window).
    pub fn new(start: u32, end: u32) -> Option<Self> {
        (start != end).then_some(Self { start, end })
    }

    pub fn contains(self, minute_of_day: u32) -> bool {
        if self.start < self.end {
            minute_of_day >= self.start && minute_of_day < self.end
        } else {
            minute_of_day >= self.start || minute_of_day < self.end
        }
    }
}

/// Calculation settings as received on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CalculationOptions {
    #[serde(deserialize_with = "deserialize_clock")]
    pub shift_start_hour: Option<ClockValue>,
    #[serde(deserialize_with = "deserialize_clock")]
    pub night_start_hour: Option<ClockValue>,
    #[serde(deserialize_with = "deserialize_clock")]
    pub night_end_hour: Option<ClockValue>,
    /// Trailing window in shift days; `0` or less disables windowing.
    #[serde(deserialize_with = "deserialize_day_count")]
    pub window_days: Option<u32>,
}

/// Normalized calculation configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculationConfig {
    pub shift_start: ShiftStart,
    pub night_window: Option<NightWindow>,
    pub window_days: u32,
}

impl Default for CalculationConfig {
    fn default() -> Self {
        Self::normalize(&CalculationOptions::default(), &CalculationOptions::default())
    }
}

fn first_minutes(values: &[Option<&ClockValue>]) -> Option<u32> {
    values.iter().flatten().find_map(|value| value.to_minutes())
}

impl CalculationConfig {
    pub fn normalize(calculations: &CalculationOptions, defaults: &CalculationOptions) -> Self {
        let shift_start = first_minutes(&[
            calculations.shift_start_hour.as_ref(),
            calculations.night_end_hour.as_ref(),
            defaults.shift_start_hour.as_ref(),
            defaults.night_end_hour.as_ref(),
        ])
        .map_or_else(ShiftStart::default, |minutes| {
            ShiftStart::from_minutes(i64::from(minutes))
        });
        let night_start = first_minutes(&[
            calculations.night_start_hour.as_ref(),
            defaults.night_start_hour.as_ref(),
        ])
        .unwrap_or(DEFAULT_NIGHT_START_HOUR * 60);
        let night_end = first_minutes(&[
            calculations.night_end_hour.as_ref(),
            defaults.night_end_hour.as_ref(),
        ])
        .unwrap_or(DEFAULT_NIGHT_END_HOUR * 60);
        Self {
            shift_start,
            night_window: NightWindow::new(night_start, night_end),
            window_days: calculations
                .window_days
                .or(defaults.window_days)
                .unwrap_or(DEFAULT_WINDOW_DAYS),
        }
    }
}

/// The `options` object of a transform request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransformOptions {
    pub csv_settings: CsvOptions,
    pub csv_defaults: CsvOptions,
    pub calculations: CalculationOptions,
    pub calculation_defaults: CalculationOptions,
}

impl TransformOptions {
    pub fn csv_config(&self) -> CsvConfig {
        CsvConfig::normalize(&self.csv_settings, &self.csv_defaults)
    }

    pub fn calculation_config(&self) -> CalculationConfig {
        CalculationConfig::normalize(&self.calculations, &self.calculation_defaults)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_value_strings_split_on_all_separators() {
        assert_eq!(
            split_multi_value("Atvykimo data\nArrival; Arrived |Atvyko, "),
            vec!["Atvykimo data", "Arrival", "Arrived", "Atvyko"]
        );
    }

    #[test]
    fn settings_override_defaults_object_and_hard_defaults() {
        let settings = CsvOptions {
            arrival: Some(CandidateList::Text("Atėjo".to_string())),
            ..CsvOptions::default()
        };
        let defaults = CsvOptions {
            arrival: Some(CandidateList::Text("Ignored".to_string())),
            gmp: Some(CandidateList::List(vec!["Greitoji pagalba".to_string()])),
            ..CsvOptions::default()
        };
        let config = CsvConfig::normalize(&settings, &defaults);
        assert_eq!(config.headers.arrival, vec!["Atėjo"]);
        assert_eq!(config.headers.gmp, vec!["Greitoji pagalba"]);
        assert_eq!(config.headers.age, vec!["Amžius", "Age"]);
        assert_eq!(config.hospitalized_values, vec!["*"]);
    }

    #[test]
    fn blank_setting_falls_through() {
        let settings = CsvOptions {
            true_values: Some(CandidateList::Text(" ; ".to_string())),
            ..CsvOptions::default()
        };
        let config = CsvConfig::normalize(&settings, &CsvOptions::default());
        assert!(config.true_values.contains(&"taip".to_string()));
    }

    #[test]
    fn clock_values_normalize_to_minutes() {
        assert_eq!(ClockValue::Hours(7.0).to_minutes(), Some(420));
        assert_eq!(ClockValue::Hours(7.5).to_minutes(), Some(450));
        assert_eq!(ClockValue::Hours(-1.0).to_minutes(), Some(1380));
        assert_eq!(ClockValue::Text("08:30".to_string()).to_minutes(), Some(510));
        assert_eq!(ClockValue::Text("24:00".to_string()).to_minutes(), Some(0));
        assert_eq!(ClockValue::Text("6,5".to_string()).to_minutes(), Some(390));
        assert_eq!(ClockValue::Text("ryte".to_string()).to_minutes(), None);
        assert_eq!(ClockValue::Hours(f64::NAN).to_minutes(), None);
    }

    #[test]
    fn shift_start_resolution_order() {
        let empty = CalculationOptions::default();
        assert_eq!(
            CalculationConfig::normalize(&empty, &empty).shift_start.minutes(),
            420
        );

        let night_end_only = CalculationOptions {
            night_end_hour: Some(ClockValue::Hours(8.0)),
            ..CalculationOptions::default()
        };
        assert_eq!(
            CalculationConfig::normalize(&night_end_only, &empty)
                .shift_start
                .minutes(),
            480
        );

        let defaults = CalculationOptions {
            shift_start_hour: Some(ClockValue::Hours(6.0)),
            ..CalculationOptions::default()
        };
        assert_eq!(
            CalculationConfig::normalize(&empty, &defaults)
                .shift_start
                .minutes(),
            360
        );
        // Request-level night end beats the defaults object's shift start.
        assert_eq!(
            CalculationConfig::normalize(&night_end_only, &defaults)
                .shift_start
                .minutes(),
            480
        );
    }

    #[test]
    fn night_window_wraps_midnight() {
        let window = NightWindow::new(20 * 60, 7 * 60).unwrap();
        assert!(window.contains(22 * 60));
        assert!(window.contains(3 * 60));
        assert!(!window.contains(7 * 60));
        assert!(!window.contains(12 * 60));
        assert!(window.contains(20 * 60));

        let daytime = NightWindow::new(60, 300).unwrap();
        assert!(daytime.contains(60));
        assert!(!daytime.contains(300));
        assert!(NightWindow::new(420, 420).is_none());
    }

    #[test]
    fn oversized_clock_text_falls_back_to_default() {
        let huge = ClockValue::Text("999999999999999999:00".to_string());
        assert_eq!(huge.to_minutes(), None);
        let calculations = CalculationOptions {
            shift_start_hour: Some(huge),
            ..CalculationOptions::default()
        };
        let config = CalculationConfig::normalize(&calculations, &CalculationOptions::default());
        assert_eq!(config.shift_start, ShiftStart::default());
    }

    #[test]
    fn calculation_options_decode_leniently() {
        let options: CalculationOptions = serde_json::from_str(
            r#"{"shiftStartHour": true, "nightStartHour": {"h": 1}, "nightEndHour": 6, "windowDays": -5}"#,
        )
        .unwrap();
        assert_eq!(options.shift_start_hour, None);
        assert_eq!(options.night_start_hour, None);
        assert_eq!(options.night_end_hour, Some(ClockValue::Hours(6.0)));
        assert_eq!(options.window_days, Some(0));

        let config = CalculationConfig::normalize(&options, &CalculationOptions::default());
        assert_eq!(config.shift_start.minutes(), 360);
        assert_eq!(config.window_days, 0);

        let fractional: CalculationOptions = serde_json::from_str(r#"{"windowDays": 7.9}"#).unwrap();
        assert_eq!(fractional.window_days, Some(7));
        let garbage: CalculationOptions = serde_json::from_str(r#"{"windowDays": "daug"}"#).unwrap();
        assert_eq!(
            CalculationConfig::normalize(&garbage, &CalculationOptions::default()).window_days,
            DEFAULT_WINDOW_DAYS
        );
    }

    #[test]
    fn transform_options_accept_camel_case_json() {
        let json = r#"{
            "csvSettings": {"arrival": "Atvyko|Arrival", "trueValues": ["Taip", "T"]},
            "calculations": {"shiftStartHour": "06:00", "windowDays": 14}
        }"#;
        let options: TransformOptions = serde_json::from_str(json).unwrap();
        let csv = options.csv_config();
        assert_eq!(csv.headers.arrival, vec!["Atvyko", "Arrival"]);
        assert_eq!(csv.true_values, vec!["Taip", "T"]);
        let calc = options.calculation_config();
        assert_eq!(calc.shift_start.minutes(), 360);
        assert_eq!(calc.window_days, 14);
    }
}
