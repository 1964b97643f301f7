//! ED dataset summarization.
//!
//! ED exports resolve two independent column groups. Legacy columns describe
//! individual visits (arrival, disposition, lab turnaround); snapshot columns
//! carry periodic gauge readings (current patients, occupied beds, staffing
//! ratios, triage categories). Which groups resolve decides the dataset
//! shape and therefore which summary is produced.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;

use edflow_ingest::fold_lower;
use edflow_model::{
    CalculationConfig, CategoryShare, ColumnMap, CsvConfig, DailyLabPoint, DatasetShape,
    Disposition, DispositionShare, EdDailyPoint, EdMeta, EdRecord, EdSummary, FieldSpec,
    LegacySummary, SnapshotSummary,
};
use regex::Regex;
use serde::Serialize;

use crate::normalization::{parse_decimal, parse_timestamp};
use crate::shift::shift_day_key;

// === Column Groups ===

pub const SNAPSHOT_METRIC_FIELDS: [&str; 9] = [
    "currentPatients",
    "occupiedBeds",
    "nurseRatio",
    "doctorRatio",
    "category1",
    "category2",
    "category3",
    "category4",
    "category5",
];
const CATEGORY_FIELDS: [&str; 5] = [
    "category1",
    "category2",
    "category3",
    "category4",
    "category5",
];

fn owned(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// Field specs for ED exports. All fields are optional; the shape check
/// decides whether enough of them resolved.
pub fn ed_field_specs(csv: &CsvConfig) -> Vec<FieldSpec> {
    let mut fields = vec![
        FieldSpec::optional("arrival", csv.headers.arrival.clone()),
        FieldSpec::optional("discharge", csv.headers.discharge.clone()),
        FieldSpec::optional(
            "disposition",
            owned(&["Būsena", "Išvykimo būdas", "Baigtis", "Disposition", "Outcome"]),
        ),
        FieldSpec::optional(
            "labMinutes",
            owned(&["Laboratorinių tyrimų trukmė", "Lab TAT", "Lab turnaround"]),
        ),
        FieldSpec::optional("timestamp", owned(&["Laikas", "Data ir laikas", "Timestamp"])),
        FieldSpec::optional(
            "currentPatients",
            owned(&["Pacientų skaičius", "Esami pacientai", "Current patients"]),
        ),
        FieldSpec::optional("occupiedBeds", owned(&["Užimtos lovos", "Occupied beds"])),
        FieldSpec::optional(
            "nurseRatio",
            owned(&["Pacientų/slaugytojų santykis", "Nurse ratio"]),
        ),
        FieldSpec::optional(
            "doctorRatio",
            owned(&["Pacientų/gydytojų santykis", "Doctor ratio"]),
        ),
    ];
    for (idx, field) in CATEGORY_FIELDS.iter().enumerate() {
        let n = idx + 1;
        fields.push(FieldSpec::optional(
            *field,
            vec![format!("{n} kategorija"), format!("Category {n}")],
        ));
    }
    fields
}

/// Which column groups resolved.
pub fn detect_shape(columns: &ColumnMap) -> EdMeta {
    let has_snapshot = SNAPSHOT_METRIC_FIELDS
        .iter()
        .any(|field| columns.is_resolved(field));
    let has_legacy = columns.is_resolved("arrival") || columns.is_resolved("disposition");
    EdMeta {
        shape: DatasetShape::detect(has_legacy, has_snapshot),
        has_legacy,
        has_snapshot,
    }
}

// === Disposition Taxonomy ===

static DISPOSITION_RULES: LazyLock<Vec<(Disposition, Regex)>> = LazyLock::new(|| {
    [
        (
            Disposition::Hospitalized,
            r"hospitaliz|stacionar|paguldyt|guldom|admit|admission|\bskyri",
        ),
        (
            Disposition::Discharged,
            r"israsyt|isleist|namo|namai|discharg|\bhome\b|ambulatori",
        ),
        (
            Disposition::Transfer,
            r"perkelt|pervezt|nukreipt|transfer|kita ligonin",
        ),
        (
            Disposition::Left,
            r"savavalisk|pasisalin|isejo|atsisak|\bleft\b|\blwbs\b|\bama\b",
        ),
    ]
    .into_iter()
    .map(|(category, pattern)| {
        (
            category,
            Regex::new(pattern).expect("Invalid disposition regex"),
        )
    })
    .collect()
});

/// Classifies free-text disposition, first matching category wins.
pub fn classify_disposition(raw: &str) -> Disposition {
    let text = fold_lower(raw.trim());
    if text.is_empty() {
        return Disposition::Unknown;
    }
    DISPOSITION_RULES
        .iter()
        .find(|(_, regex)| regex.is_match(&text))
        .map_or(Disposition::Other, |(category, _)| *category)
}

// === Row Mapping ===

/// Maps one ED row.
pub fn map_ed_row(row: &[String], columns: &ColumnMap, calc: &CalculationConfig) -> EdRecord {
    let cell = |field: &str| columns.cell(row, field);
    let number = |field: &str| parse_decimal(cell(field));

    let arrival = parse_timestamp(cell("arrival")).map(|ts| ts.value);
    let discharge = parse_timestamp(cell("discharge")).map(|ts| ts.value);
    let timestamp = parse_timestamp(cell("timestamp")).map(|ts| ts.value);
    let disposition_text = cell("disposition").trim().to_string();
    let shift_day = arrival
        .or(discharge)
        .or(timestamp)
        .map(|reference| shift_day_key(reference, calc.shift_start));

    EdRecord {
        arrival,
        discharge,
        shift_day,
        disposition: classify_disposition(&disposition_text),
        disposition_text,
        lab_minutes: number("labMinutes"),
        timestamp,
        current_patients: number("currentPatients"),
        occupied_beds: number("occupiedBeds"),
        nurse_ratio: number("nurseRatio"),
        doctor_ratio: number("doctorRatio"),
        categories: CATEGORY_FIELDS.map(number),
    }
}

fn is_visit(record: &EdRecord) -> bool {
    record.arrival.is_some() || !record.disposition_text.is_empty()
}

fn is_reading(record: &EdRecord) -> bool {
    record.timestamp.is_some() && record.has_gauge()
}

fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0u64), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

// === Summaries ===

pub fn summarize_legacy(records: &[EdRecord]) -> LegacySummary {
    let visits: Vec<&EdRecord> = records.iter().filter(|r| is_visit(r)).collect();
    let total = visits.len() as u64;
    let unique_days = visits
        .iter()
        .filter_map(|r| r.shift_day.as_deref())
        .collect::<BTreeSet<_>>()
        .len() as u64;

    let latest_month = visits
        .iter()
        .filter(|r| r.lab_minutes.is_some())
        .filter_map(|r| r.shift_day.as_deref().and_then(|day| day.get(..7)))
        .max()
        .map(str::to_string);
    let latest_month_avg_lab_minutes = latest_month.as_deref().and_then(|month| {
        mean(
            visits
                .iter()
                .filter(|r| r.shift_day.as_deref().is_some_and(|d| d.starts_with(month)))
                .filter_map(|r| r.lab_minutes),
        )
    });

    LegacySummary {
        total_patients: total,
        unique_days,
        avg_per_day: (unique_days > 0).then(|| total as f64 / unique_days as f64),
        latest_month,
        latest_month_avg_lab_minutes,
        dispositions: disposition_shares(&visits),
    }
}

fn disposition_shares(visits: &[&EdRecord]) -> Vec<DispositionShare> {
    let total = visits.len() as u64;
    Disposition::ALL
        .iter()
        .map(|category| {
            let count = visits
                .iter()
                .filter(|r| r.disposition == *category)
                .count() as u64;
            DispositionShare {
                category: *category,
                count,
                share: if total > 0 {
                    count as f64 / total as f64
                } else {
                    0.0
                },
            }
        })
        .collect()
}

fn has_finite_metric(record: &EdRecord) -> bool {
    [
        record.current_patients,
        record.occupied_beds,
        record.nurse_ratio,
        record.doctor_ratio,
    ]
    .into_iter()
    .chain(record.categories)
    .flatten()
    .any(f64::is_finite)
}

pub fn summarize_snapshot(records: &[EdRecord]) -> SnapshotSummary {
    let readings = records.iter().filter(|r| is_reading(r)).count() as u64;

    // Later rows win ties on the timestamp.
    let latest = records
        .iter()
        .filter(|r| r.timestamp.is_some() && has_finite_metric(r))
        .fold(None::<&EdRecord>, |best, r| match best {
            Some(b) if b.timestamp > r.timestamp => Some(b),
            _ => Some(r),
        });

    let mut lab_by_day: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for record in records {
        if let (Some(day), Some(lab)) = (record.shift_day.as_deref(), record.lab_minutes) {
            lab_by_day.entry(day).or_default().push(lab);
        }
    }
    let lab_by_day = lab_by_day
        .into_iter()
        .filter_map(|(day, values)| {
            mean(values).map(|avg| DailyLabPoint {
                date: day.to_string(),
                avg_lab_minutes: avg,
            })
        })
        .collect();

    let Some(latest) = latest else {
        return SnapshotSummary {
            readings,
            lab_by_day,
            ..SnapshotSummary::default()
        };
    };
    let category_total: f64 = latest.categories.iter().flatten().sum();
    let categories = latest
        .categories
        .iter()
        .enumerate()
        .map(|(idx, &count)| CategoryShare {
            category: idx as u8 + 1,
            count,
            share: count.filter(|_| category_total > 0.0).map(|c| c / category_total),
        })
        .collect();

    SnapshotSummary {
        latest_timestamp: latest.timestamp,
        current_patients: latest.current_patients,
        occupied_beds: latest.occupied_beds,
        nurse_ratio: latest.nurse_ratio,
        doctor_ratio: latest.doctor_ratio,
        categories,
        readings,
        lab_by_day,
    }
}

/// Summary for the detected shape. Hybrid data degrades to legacy when the
/// latest snapshot has no finite headline gauge.
pub fn summarize(records: &[EdRecord], detected: DatasetShape) -> EdSummary {
    match detected {
        DatasetShape::Legacy => EdSummary::Legacy(summarize_legacy(records)),
        DatasetShape::Snapshot => EdSummary::Snapshot(summarize_snapshot(records)),
        DatasetShape::Hybrid => {
            let legacy = summarize_legacy(records);
            let snapshot = summarize_snapshot(records);
            if snapshot.has_finite_gauge() {
                EdSummary::Hybrid { legacy, snapshot }
            } else {
                EdSummary::Legacy(legacy)
            }
        }
    }
}

/// Per-shift-day series of visits, readings and averages.
pub fn daily_series(records: &[EdRecord]) -> Vec<EdDailyPoint> {
    #[derive(Default)]
    struct Acc {
        visits: u64,
        readings: u64,
        lab: Vec<f64>,
        patients: Vec<f64>,
    }

    let mut days: BTreeMap<&str, Acc> = BTreeMap::new();
    for record in records {
        let Some(day) = record.shift_day.as_deref() else {
            continue;
        };
        let acc = days.entry(day).or_default();
        if is_visit(record) {
            acc.visits += 1;
        }
        if is_reading(record) {
            acc.readings += 1;
            if let Some(patients) = record.current_patients {
                acc.patients.push(patients);
            }
        }
        if let Some(lab) = record.lab_minutes {
            acc.lab.push(lab);
        }
    }
    days.into_iter()
        .map(|(day, acc)| EdDailyPoint {
            date: day.to_string(),
            visits: acc.visits,
            readings: acc.readings,
            avg_lab_minutes: mean(acc.lab),
            avg_current_patients: mean(acc.patients),
        })
        .collect()
}

/// Result of an ED transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EdTransformResult {
    pub records: Vec<EdRecord>,
    pub summary: EdSummary,
    pub dispositions: Vec<DispositionShare>,
    pub daily: Vec<EdDailyPoint>,
    pub meta: EdMeta,
}

/// Builds the full ED result from mapped records.
pub fn build_ed_result(records: Vec<EdRecord>, detected: EdMeta) -> EdTransformResult {
    let summary = summarize(&records, detected.shape);
    let dispositions = match &summary {
        EdSummary::Legacy(legacy) | EdSummary::Hybrid { legacy, .. } => legacy.dispositions.clone(),
        EdSummary::Snapshot(_) => Vec::new(),
    };
    let daily = daily_series(&records);
    let meta = EdMeta {
        shape: summary.shape(),
        ..detected
    };
    EdTransformResult {
        records,
        summary,
        dispositions,
        daily,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};

    fn at(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn reading(d: u32, h: u32, patients: Option<f64>) -> EdRecord {
        EdRecord {
            timestamp: Some(at(d, h)),
            shift_day: Some(format!("2024-03-{d:02}")),
            current_patients: patients,
            ..EdRecord::default()
        }
    }

    #[test]
    fn disposition_taxonomy_priority() {
        assert_eq!(
            classify_disposition("Hospitalizuotas į skyrių"),
            Disposition::Hospitalized
        );
        assert_eq!(classify_disposition("Išrašytas namo"), Disposition::Discharged);
        assert_eq!(
            classify_disposition("Perkeltas į kitą ligoninę"),
            Disposition::Transfer
        );
        assert_eq!(classify_disposition("Savavališkai išėjo"), Disposition::Left);
        assert_eq!(classify_disposition("Mirė"), Disposition::Other);
        assert_eq!(classify_disposition("  "), Disposition::Unknown);
    }

    #[test]
    fn legacy_summary_counts_days_and_lab_month() {
        let visit = |day: &str, lab: Option<f64>, text: &str| EdRecord {
            arrival: Some(at(1, 10)),
            shift_day: Some(day.to_string()),
            disposition_text: text.to_string(),
            disposition: classify_disposition(text),
            lab_minutes: lab,
            ..EdRecord::default()
        };
        let records = vec![
            visit("2024-02-28", Some(90.0), "Išrašytas"),
            visit("2024-03-01", Some(60.0), "Hospitalizuotas"),
            visit("2024-03-01", Some(30.0), "Išrašytas"),
            visit("2024-03-02", None, ""),
        ];
        let summary = summarize_legacy(&records);
        assert_eq!(summary.total_patients, 4);
        assert_eq!(summary.unique_days, 3);
        assert_eq!(summary.latest_month.as_deref(), Some("2024-03"));
        assert_eq!(summary.latest_month_avg_lab_minutes, Some(45.0));
        let discharged = summary
            .dispositions
            .iter()
            .find(|share| share.category == Disposition::Discharged)
            .unwrap();
        assert_eq!(discharged.count, 2);
        assert_eq!(discharged.share, 0.5);
        assert_eq!(summary.dispositions.len(), Disposition::ALL.len());
    }

    #[test]
    fn latest_reading_needs_a_finite_metric_and_ties_keep_later_row() {
        let mut first = reading(2, 9, Some(10.0));
        first.categories = [Some(1.0), Some(3.0), None, None, None];
        let mut tied = reading(2, 9, Some(12.0));
        tied.categories = [Some(2.0), Some(2.0), None, None, None];
        let newer_but_empty = reading(3, 9, None);
        let records = vec![first, tied, newer_but_empty];

        let summary = summarize_snapshot(&records);
        assert_eq!(summary.current_patients, Some(12.0));
        assert_eq!(summary.latest_timestamp, Some(at(2, 9)));
        assert_eq!(summary.readings, 2);
        assert_eq!(summary.categories[0].share, Some(0.5));
        assert_eq!(summary.categories[2].count, None);
    }

    #[test]
    fn hybrid_without_finite_gauge_degrades_to_legacy() {
        let mut record = reading(2, 9, None);
        record.arrival = Some(at(2, 8));
        record.categories[0] = Some(4.0);
        let summary = summarize(&[record], DatasetShape::Hybrid);
        assert_eq!(summary.shape(), DatasetShape::Legacy);

        let with_gauge = reading(2, 9, Some(7.0));
        let summary = summarize(&[with_gauge], DatasetShape::Hybrid);
        assert_eq!(summary.shape(), DatasetShape::Hybrid);
    }

    #[test]
    fn daily_series_averages_per_day() {
        let mut visit = reading(2, 8, None);
        visit.timestamp = None;
        visit.arrival = Some(at(2, 8));
        visit.lab_minutes = Some(40.0);
        let records = vec![
            reading(2, 9, Some(10.0)),
            reading(2, 12, Some(20.0)),
            visit,
            reading(3, 9, Some(5.0)),
        ];
        let daily = daily_series(&records);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].visits, 1);
        assert_eq!(daily[0].readings, 2);
        assert_eq!(daily[0].avg_current_patients, Some(15.0));
        assert_eq!(daily[0].avg_lab_minutes, Some(40.0));
        assert_eq!(daily[1].avg_lab_minutes, None);
    }
}
