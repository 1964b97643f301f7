//! Daily and hospital-stay aggregation over normalized records.

use std::collections::BTreeMap;

use chrono::Datelike;
use edflow_model::{
    DailyStatsBucket, HospitalStayAggregate, NormalizedRecord, ShiftStart, StayBucket, UNSPECIFIED,
};

use crate::shift::{day_key, record_shift_day};

/// Longest visit, in hours, that still counts toward duration averages.
pub const MAX_DURATION_HOURS: f64 = 24.0;

/// Duration in hours when both endpoints exist and it lies within
/// `[0, 24]`.
pub fn eligible_duration(record: &NormalizedRecord) -> Option<f64> {
    record
        .duration_hours()
        .filter(|hours| (0.0..=MAX_DURATION_HOURS).contains(hours))
}

/// Streaming fold of records into per-shift-day buckets.
#[derive(Debug, Clone)]
pub struct DailyAggregator {
    shift_start: ShiftStart,
    buckets: BTreeMap<String, DailyStatsBucket>,
    skipped: usize,
}

impl DailyAggregator {
    pub fn new(shift_start: ShiftStart) -> Self {
        Self {
            shift_start,
            buckets: BTreeMap::new(),
            skipped: 0,
        }
    }

    /// Adds one record. Records with neither arrival nor discharge are
    /// skipped.
    pub fn push(&mut self, record: &NormalizedRecord) {
        let Some(day) = record_shift_day(record, self.shift_start) else {
            self.skipped += 1;
            return;
        };
        let key = day_key(day);
        let bucket = self
            .buckets
            .entry(key)
            .or_insert_with_key(|key| DailyStatsBucket::new(key.clone()));

        bucket.count += 1;
        if record.night {
            bucket.night += 1;
        }
        if record.ems {
            bucket.ems += 1;
        }
        if record.hospitalized {
            bucket.hospitalized += 1;
        } else {
            bucket.discharged += 1;
        }
        if let Some(hours) = eligible_duration(record) {
            bucket.total_time += hours;
            bucket.durations += 1;
            if record.hospitalized {
                bucket.hospitalized_time += hours;
                bucket.hospitalized_durations += 1;
            }
        }
    }

    /// Number of records skipped for lack of any timestamp.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Buckets sorted by date.
    pub fn finish(self) -> Vec<DailyStatsBucket> {
        self.buckets.into_values().collect()
    }
}

/// Folds records into daily buckets in one call.
pub fn compute_daily_stats<'a, I>(records: I, shift_start: ShiftStart) -> Vec<DailyStatsBucket>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut aggregator = DailyAggregator::new(shift_start);
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}

/// Adds a hospitalized record to the stay histogram. Other records and
/// records without a timestamp are ignored.
pub fn record_hospital_stay(
    aggregate: &mut HospitalStayAggregate,
    record: &NormalizedRecord,
    shift_start: ShiftStart,
) {
    if !record.hospitalized {
        return;
    }
    let Some(day) = record_shift_day(record, shift_start) else {
        return;
    };
    let year = day.year();
    let department = match record.department.trim() {
        "" => UNSPECIFIED,
        name => name,
    };
    aggregate.record(year, department, StayBucket::classify(record.duration_hours()));
}

pub fn compute_hospital_stays<'a, I>(records: I, shift_start: ShiftStart) -> HospitalStayAggregate
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut aggregate = HospitalStayAggregate::default();
    for record in records {
        record_hospital_stay(&mut aggregate, record, shift_start);
    }
    aggregate
}
