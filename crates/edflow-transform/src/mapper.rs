//! Raw row to [`NormalizedRecord`] mapping.

use edflow_model::{AgeBand, CalculationConfig, ColumnMap, CsvConfig, NormalizedRecord};

use crate::normalization::{
    detect_card_type, detect_night, extract_diagnosis_codes, matches_any, normalize_city,
    parse_age, parse_referral, parse_sex, parse_timestamp, primary_diagnosis_group,
};

/// Maps rows of one dataset using a column map resolved once up front.
#[derive(Debug, Clone, Copy)]
pub struct RecordMapper<'a> {
    columns: &'a ColumnMap,
    csv: &'a CsvConfig,
    calculations: &'a CalculationConfig,
}

impl<'a> RecordMapper<'a> {
    pub fn new(
        columns: &'a ColumnMap,
        csv: &'a CsvConfig,
        calculations: &'a CalculationConfig,
    ) -> Self {
        Self {
            columns,
            csv,
            calculations,
        }
    }

    /// Normalizes one row. Never fails; unparsable cells fall back to
    /// defaults.
    pub fn map_row(&self, row: &[String]) -> NormalizedRecord {
        let cell = |field: &str| self.columns.cell(row, field);

        let arrival = parse_timestamp(cell("arrival"));
        let discharge = parse_timestamp(cell("discharge"));
        let night = detect_night(
            arrival.as_ref(),
            cell("dayNight"),
            self.calculations.night_window,
            &self.csv.night_keywords,
            &self.csv.day_keywords,
        );
        let department = cell("department").trim().to_string();
        let age_years = parse_age(cell("age"));
        let diagnosis_codes = extract_diagnosis_codes(cell("diagnosis"));

        NormalizedRecord {
            arrival: arrival.map(|ts| ts.value),
            discharge: discharge.map(|ts| ts.value),
            arrival_has_time: arrival.is_some_and(|ts| ts.has_time),
            discharge_has_time: discharge.is_some_and(|ts| ts.has_time),
            night,
            ems: matches_any(cell("gmp"), &self.csv.true_values),
            hospitalized: matches_any(&department, &self.csv.hospitalized_values),
            department,
            card_type: detect_card_type(cell("number")),
            age_years,
            age_band: AgeBand::from_age(age_years),
            sex: parse_sex(cell("sex")),
            city_norm: normalize_city(cell("city")),
            diagnosis_group: primary_diagnosis_group(&diagnosis_codes),
            diagnosis_codes,
            referral: parse_referral(cell("referral"), &self.csv.true_values),
        }
    }
}
