//! ED dataset records and summaries.
//!
//! ED exports come in two shapes: per-visit throughput rows ("legacy") and
//! point-in-time gauge readings ("snapshot"). Some exports carry both.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Visit outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Disposition {
    Hospitalized,
    Discharged,
    Transfer,
    Left,
    Other,
    #[default]
    Unknown,
}

impl Disposition {
    pub const ALL: [Disposition; 6] = [
        Self::Hospitalized,
        Self::Discharged,
        Self::Transfer,
        Self::Left,
        Self::Other,
        Self::Unknown,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Hospitalized => "hospitalized",
            Self::Discharged => "discharged",
            Self::Transfer => "transfer",
            Self::Left => "left",
            Self::Other => "other",
            Self::Unknown => "unknown",
        }
    }
}

/// Which column groups an ED export exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetShape {
    Legacy,
    Snapshot,
    Hybrid,
}

impl DatasetShape {
    pub fn detect(has_legacy: bool, has_snapshot: bool) -> Self {
        match (has_legacy, has_snapshot) {
            (true, true) => Self::Hybrid,
            (false, true) => Self::Snapshot,
            _ => Self::Legacy,
        }
    }
}

/// One normalized ED row. Legacy and snapshot fields are both optional; a
/// row fills whichever group its export provides.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdRecord {
    pub arrival: Option<NaiveDateTime>,
    pub discharge: Option<NaiveDateTime>,
    /// Shift day of the row's reference time (arrival, discharge or
    /// snapshot timestamp).
    pub shift_day: Option<String>,
    pub disposition: Disposition,
    pub disposition_text: String,
    pub lab_minutes: Option<f64>,
    pub timestamp: Option<NaiveDateTime>,
    pub current_patients: Option<f64>,
    pub occupied_beds: Option<f64>,
    pub nurse_ratio: Option<f64>,
    pub doctor_ratio: Option<f64>,
    /// Patients per triage category 1 to 5.
    pub categories: [Option<f64>; 5],
}

impl EdRecord {
    /// True when the row carries at least one snapshot gauge value.
    pub fn has_gauge(&self) -> bool {
        self.current_patients.is_some()
            || self.occupied_beds.is_some()
            || self.nurse_ratio.is_some()
            || self.doctor_ratio.is_some()
            || self.categories.iter().any(Option::is_some)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DispositionShare {
    pub category: Disposition,
    pub count: u64,
    /// Fraction of all rows, `0.0` when there are none.
    pub share: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacySummary {
    pub total_patients: u64,
    pub unique_days: u64,
    pub avg_per_day: Option<f64>,
    /// Latest month (`YYYY-MM`) with lab turnaround data.
    pub latest_month: Option<String>,
    pub latest_month_avg_lab_minutes: Option<f64>,
    pub dispositions: Vec<DispositionShare>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryShare {
    /// Triage category, 1 to 5.
    pub category: u8,
    pub count: Option<f64>,
    pub share: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyLabPoint {
    pub date: String,
    pub avg_lab_minutes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotSummary {
    pub latest_timestamp: Option<NaiveDateTime>,
    pub current_patients: Option<f64>,
    pub occupied_beds: Option<f64>,
    pub nurse_ratio: Option<f64>,
    pub doctor_ratio: Option<f64>,
    pub categories: Vec<CategoryShare>,
    pub readings: u64,
    pub lab_by_day: Vec<DailyLabPoint>,
}

impl SnapshotSummary {
    /// Whether any of the headline gauges carries a finite value.
    pub fn has_finite_gauge(&self) -> bool {
        [
            self.current_patients,
            self.occupied_beds,
            self.nurse_ratio,
            self.doctor_ratio,
        ]
        .into_iter()
        .flatten()
        .any(f64::is_finite)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum EdSummary {
    Legacy(LegacySummary),
    Snapshot(SnapshotSummary),
    Hybrid {
        legacy: LegacySummary,
        snapshot: SnapshotSummary,
    },
}

impl EdSummary {
    pub fn shape(&self) -> DatasetShape {
        match self {
            Self::Legacy(_) => DatasetShape::Legacy,
            Self::Snapshot(_) => DatasetShape::Snapshot,
            Self::Hybrid { .. } => DatasetShape::Hybrid,
        }
    }
}

/// One point of the per-shift-day ED series.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdDailyPoint {
    pub date: String,
    pub visits: u64,
    pub readings: u64,
    pub avg_lab_minutes: Option<f64>,
    pub avg_current_patients: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdMeta {
    #[serde(rename = "type")]
    pub shape: DatasetShape,
    pub has_legacy: bool,
    pub has_snapshot: bool,
}
