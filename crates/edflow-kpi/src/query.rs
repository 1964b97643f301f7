//! KPI query inputs and result shapes.

use chrono::NaiveDate;
use edflow_model::{DailyStatsBucket, KpiFilterSpec, NormalizedRecord};
use serde::{Deserialize, Serialize};

/// Which parts of a filtered dataset a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultMode {
    /// Filtered records and recomputed daily stats.
    #[default]
    Full,
    /// Daily stats, available days and the hourly breakdown of one day.
    SummaryHourly,
    /// Available shift days only.
    DateKeys,
    /// Records of one shift day.
    RecordsForDate,
    /// Hourly breakdown of one shift day.
    HourlyOnly,
}

impl ResultMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "full" => Some(Self::Full),
            "summaryHourly" => Some(Self::SummaryHourly),
            "dateKeys" => Some(Self::DateKeys),
            "recordsForDate" => Some(Self::RecordsForDate),
            "hourlyOnly" => Some(Self::HourlyOnly),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::SummaryHourly => "summaryHourly",
            Self::DateKeys => "dateKeys",
            Self::RecordsForDate => "recordsForDate",
            Self::HourlyOnly => "hourlyOnly",
        }
    }
}

/// A fully resolved KPI query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KpiQuery {
    pub filters: KpiFilterSpec,
    pub mode: ResultMode,
    /// Day for the hourly and per-date modes; defaults to the latest
    /// filtered shift day.
    pub selected_date: Option<NaiveDate>,
}

/// Arrivals in one clock hour of the selected shift day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct HourlyBucket {
    pub hour: u32,
    pub count: u64,
    pub ems: u64,
    pub hospitalized: u64,
    pub discharged: u64,
}

impl HourlyBucket {
    /// 24 empty buckets, one per clock hour.
    pub fn empty_day() -> Vec<Self> {
        (0..24)
            .map(|hour| Self {
                hour,
                ..Self::default()
            })
            .collect()
    }
}

/// Bookkeeping returned with every KPI result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiMeta {
    /// Records in the dataset. Without records, the summed bucket counts.
    pub total_records: u64,
    /// Records left after windowing and predicates.
    pub filtered_records: u64,
    pub window_days: u32,
    /// Latest shift day in the dataset, before predicates.
    pub latest_date: Option<String>,
    pub records_available: bool,
    pub filters: KpiFilterSpec,
}

/// Result of a KPI query; only the parts requested by the mode are set.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiResult {
    pub mode: ResultMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<NormalizedRecord>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub daily_stats: Option<Vec<DailyStatsBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_keys: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly: Option<Vec<HourlyBucket>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_date: Option<String>,
    pub meta: KpiMeta,
}
