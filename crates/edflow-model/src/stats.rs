//! Pre-aggregated statistics: per-shift-day buckets and hospital-stay
//! histograms.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};

/// Counters and duration accumulators for one shift day.
///
/// Averages are derived from the sums on read and are never stored.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DailyStatsBucket {
    /// Shift-day key (`YYYY-MM-DD`).
    pub date: String,
    pub count: u64,
    pub night: u64,
    pub ems: u64,
    pub hospitalized: u64,
    pub discharged: u64,
    /// Sum of eligible visit durations, in hours.
    pub total_time: f64,
    /// Number of durations contributing to `total_time`.
    pub durations: u64,
    pub hospitalized_time: f64,
    pub hospitalized_durations: u64,
}

impl DailyStatsBucket {
    pub fn new(date: impl Into<String>) -> Self {
        Self {
            date: date.into(),
            ..Self::default()
        }
    }

    /// Average visit duration in hours.
    pub fn avg_time(&self) -> Option<f64> {
        average(self.total_time, self.durations)
    }

    /// Average duration of hospitalized visits in hours.
    pub fn avg_hospitalized_time(&self) -> Option<f64> {
        average(self.hospitalized_time, self.hospitalized_durations)
    }
}

fn average(sum: f64, count: u64) -> Option<f64> {
    (count > 0).then(|| sum / count as f64)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyStatsWire<'a> {
    date: &'a str,
    count: u64,
    night: u64,
    ems: u64,
    hospitalized: u64,
    discharged: u64,
    total_time: f64,
    durations: u64,
    hospitalized_time: f64,
    hospitalized_durations: u64,
    avg_time: Option<f64>,
    avg_hospitalized_time: Option<f64>,
}

impl Serialize for DailyStatsBucket {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        DailyStatsWire {
            date: &self.date,
            count: self.count,
            night: self.night,
            ems: self.ems,
            hospitalized: self.hospitalized,
            discharged: self.discharged,
            total_time: self.total_time,
            durations: self.durations,
            hospitalized_time: self.hospitalized_time,
            hospitalized_durations: self.hospitalized_durations,
            avg_time: self.avg_time(),
            avg_hospitalized_time: self.avg_hospitalized_time(),
        }
        .serialize(serializer)
    }
}

/// Stay-length class for a hospitalized visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StayBucket {
    /// `[0, 4)` hours.
    Lt4,
    /// `[4, 8)` hours.
    From4To8,
    /// `[8, 16)` hours.
    From8To16,
    /// `[16, 24]` hours.
    Gt16,
    /// Missing endpoint or duration outside `[0, 24]` hours.
    Unclassified,
}

impl StayBucket {
    pub fn classify(hours: Option<f64>) -> Self {
        match hours {
            Some(h) if !(0.0..=24.0).contains(&h) => Self::Unclassified,
            Some(h) if h < 4.0 => Self::Lt4,
            Some(h) if h < 8.0 => Self::From4To8,
            Some(h) if h < 16.0 => Self::From8To16,
            Some(_) => Self::Gt16,
            None => Self::Unclassified,
        }
    }
}

/// Stay-length histogram for one (year, department) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StayCounts {
    #[serde(rename = "count_lt4")]
    pub lt4: u64,
    #[serde(rename = "count_4to8")]
    pub from4_to8: u64,
    #[serde(rename = "count_8to16")]
    pub from8_to16: u64,
    #[serde(rename = "count_gt16")]
    pub gt16: u64,
    #[serde(rename = "count_unclassified")]
    pub unclassified: u64,
    pub total: u64,
}

impl StayCounts {
    pub fn add(&mut self, bucket: StayBucket) {
        match bucket {
            StayBucket::Lt4 => self.lt4 += 1,
            StayBucket::From4To8 => self.from4_to8 += 1,
            StayBucket::From8To16 => self.from8_to16 += 1,
            StayBucket::Gt16 => self.gt16 += 1,
            StayBucket::Unclassified => self.unclassified += 1,
        }
        self.total += 1;
    }
}

/// `year → department → stay histogram`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HospitalStayAggregate {
    pub by_year: BTreeMap<i32, BTreeMap<String, StayCounts>>,
}

impl HospitalStayAggregate {
    pub fn record(&mut self, year: i32, department: &str, bucket: StayBucket) {
        self.by_year
            .entry(year)
            .or_default()
            .entry(department.to_string())
            .or_default()
            .add(bucket);
    }

    pub fn get(&self, year: i32, department: &str) -> Option<&StayCounts> {
        self.by_year.get(&year)?.get(department)
    }

    pub fn is_empty(&self) -> bool {
        self.by_year.is_empty()
    }
}
