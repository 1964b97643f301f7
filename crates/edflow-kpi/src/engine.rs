//! KPI filter engine.
//!
//! Filtering runs in a fixed order: the trailing shift-day window first,
//! then the record predicates, then the daily stats are rebuilt from what
//! is left. Datasets stored without records take a degraded path that can
//! only re-window the pre-aggregated buckets.

use std::collections::BTreeSet;
use std::ops::RangeInclusive;

use chrono::{Days, NaiveDate, Timelike};
use edflow_model::{CalculationConfig, DailyStatsBucket, KpiFilterSpec, NormalizedRecord};
use edflow_transform::{compute_daily_stats, day_key, parse_day_key, record_shift_day};
use tracing::{debug, info};

use crate::query::{HourlyBucket, KpiMeta, KpiQuery, KpiResult, ResultMode};

/// Borrowed dataset the engine filters.
#[derive(Debug, Clone, Copy)]
pub struct DatasetSource<'a> {
    pub records: Option<&'a [NormalizedRecord]>,
    pub daily_stats: &'a [DailyStatsBucket],
    pub calculations: CalculationConfig,
}

/// Shift days `latest - (days - 1) ..= latest`; `None` when windowing is
/// off or there is no latest day.
pub fn window_range(latest: Option<NaiveDate>, days: u32) -> Option<RangeInclusive<NaiveDate>> {
    if days == 0 {
        return None;
    }
    let latest = latest?;
    let start = latest
        .checked_sub_days(Days::new(u64::from(days - 1)))
        .unwrap_or(NaiveDate::MIN);
    Some(start..=latest)
}

fn in_window(window: Option<&RangeInclusive<NaiveDate>>, day: Option<NaiveDate>) -> bool {
    match window {
        None => true,
        Some(range) => day.is_some_and(|day| range.contains(&day)),
    }
}

/// Whether a record passes the shift, arrival, disposition and card-type
/// predicates.
pub fn matches_filters(filters: &KpiFilterSpec, record: &NormalizedRecord) -> bool {
    filters.shift.matches(record.night)
        && filters.arrival.matches(record.ems)
        && filters.disposition.matches(record.hospitalized)
        && filters.card_type.matches(record.card_type)
}

/// Arrivals per clock hour. Records without an arrival time are left out.
pub fn hourly_breakdown<'a, I>(records: I) -> Vec<HourlyBucket>
where
    I: IntoIterator<Item = &'a NormalizedRecord>,
{
    let mut buckets = HourlyBucket::empty_day();
    for record in records {
        let Some(arrival) = record.arrival.filter(|_| record.arrival_has_time) else {
            continue;
        };
        let bucket = &mut buckets[arrival.hour() as usize];
        bucket.count += 1;
        if record.ems {
            bucket.ems += 1;
        }
        if record.hospitalized {
            bucket.hospitalized += 1;
        } else {
            bucket.discharged += 1;
        }
    }
    buckets
}

/// Runs a KPI query against a dataset.
pub fn apply_filters(source: &DatasetSource<'_>, query: &KpiQuery) -> KpiResult {
    let result = match source.records {
        Some(records) => filter_records(records, source.calculations, query),
        None => filter_daily_stats(source.daily_stats, query),
    };
    info!(
        mode = query.mode.as_str(),
        total = result.meta.total_records,
        filtered = result.meta.filtered_records,
        records_available = result.meta.records_available,
        "KPI filters applied"
    );
    result
}

fn filter_records(
    records: &[NormalizedRecord],
    calculations: CalculationConfig,
    query: &KpiQuery,
) -> KpiResult {
    let shift_start = calculations.shift_start;
    let keyed: Vec<(Option<NaiveDate>, &NormalizedRecord)> = records
        .iter()
        .map(|record| (record_shift_day(record, shift_start), record))
        .collect();
    let latest = keyed.iter().filter_map(|(day, _)| *day).max();
    let window = window_range(latest, query.filters.window);

    let filtered: Vec<(Option<NaiveDate>, &NormalizedRecord)> = keyed
        .into_iter()
        .filter(|(day, record)| {
            in_window(window.as_ref(), *day) && matches_filters(&query.filters, record)
        })
        .collect();

    let days: BTreeSet<NaiveDate> = filtered.iter().filter_map(|(day, _)| *day).collect();
    let selected = query.selected_date.or_else(|| days.last().copied());
    let on_selected: Vec<&NormalizedRecord> = filtered
        .iter()
        .filter(|(day, _)| selected.is_some() && *day == selected)
        .map(|(_, record)| *record)
        .collect();
    let date_keys = || days.iter().copied().map(day_key).collect::<Vec<_>>();
    let daily_stats =
        || compute_daily_stats(filtered.iter().map(|(_, record)| *record), shift_start);

    let mut result = empty_result(
        query,
        KpiMeta {
            total_records: records.len() as u64,
            filtered_records: filtered.len() as u64,
            window_days: query.filters.window,
            latest_date: latest.map(day_key),
            records_available: true,
            filters: query.filters,
        },
    );
    match query.mode {
        ResultMode::Full => {
            result.records = Some(filtered.iter().map(|(_, record)| (*record).clone()).collect());
            result.daily_stats = Some(daily_stats());
        }
        ResultMode::SummaryHourly => {
            result.daily_stats = Some(daily_stats());
            result.date_keys = Some(date_keys());
            result.hourly = Some(hourly_breakdown(on_selected.iter().copied()));
            result.selected_date = selected.map(day_key);
        }
        ResultMode::DateKeys => result.date_keys = Some(date_keys()),
        ResultMode::RecordsForDate => {
            result.records = Some(on_selected.iter().copied().cloned().collect());
            result.selected_date = selected.map(day_key);
        }
        ResultMode::HourlyOnly => {
            result.hourly = Some(hourly_breakdown(on_selected.iter().copied()));
            result.selected_date = selected.map(day_key);
        }
    }
    result
}

fn filter_daily_stats(daily_stats: &[DailyStatsBucket], query: &KpiQuery) -> KpiResult {
    if !query.filters.is_unfiltered() {
        debug!("records unavailable, record predicates skipped");
    }
    let latest = daily_stats
        .iter()
        .filter_map(|bucket| parse_day_key(&bucket.date))
        .max();
    let window = window_range(latest, query.filters.window);
    let mut windowed: Vec<DailyStatsBucket> = daily_stats
        .iter()
        .filter(|bucket| in_window(window.as_ref(), parse_day_key(&bucket.date)))
        .cloned()
        .collect();
    windowed.sort_by(|a, b| a.date.cmp(&b.date));

    let selected = query
        .selected_date
        .or_else(|| windowed.iter().rev().find_map(|bucket| parse_day_key(&bucket.date)));

    let mut result = empty_result(
        query,
        KpiMeta {
            total_records: daily_stats.iter().map(|bucket| bucket.count).sum(),
            filtered_records: windowed.iter().map(|bucket| bucket.count).sum(),
            window_days: query.filters.window,
            latest_date: latest.map(day_key),
            records_available: false,
            filters: query.filters,
        },
    );
    let date_keys = windowed.iter().map(|bucket| bucket.date.clone()).collect();
    match query.mode {
        ResultMode::Full => {
            result.records = Some(Vec::new());
            result.daily_stats = Some(windowed);
        }
        ResultMode::SummaryHourly => {
            result.daily_stats = Some(windowed);
            result.date_keys = Some(date_keys);
            result.hourly = Some(HourlyBucket::empty_day());
            result.selected_date = selected.map(day_key);
        }
        ResultMode::DateKeys => result.date_keys = Some(date_keys),
        ResultMode::RecordsForDate => {
            result.records = Some(Vec::new());
            result.selected_date = selected.map(day_key);
        }
        ResultMode::HourlyOnly => {
            result.hourly = Some(HourlyBucket::empty_day());
            result.selected_date = selected.map(day_key);
        }
    }
    result
}

fn empty_result(query: &KpiQuery, meta: KpiMeta) -> KpiResult {
    KpiResult {
        mode: query.mode,
        records: None,
        daily_stats: None,
        date_keys: None,
        hourly: None,
        selected_date: None,
        meta,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use edflow_model::{ArrivalFilter, CardType, ShiftFilter};
    use proptest::prelude::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, day)
            .unwrap()
            .and_hms_opt(hour, 15, 0)
            .unwrap()
    }

    fn visit(day: u32, hour: u32) -> NormalizedRecord {
        NormalizedRecord {
            arrival: Some(at(day, hour)),
            discharge: Some(at(day, hour) + chrono::Duration::hours(2)),
            arrival_has_time: true,
            discharge_has_time: true,
            ..NormalizedRecord::default()
        }
    }

    fn source(records: &[NormalizedRecord]) -> DatasetSource<'_> {
        DatasetSource {
            records: Some(records),
            daily_stats: &[],
            calculations: CalculationConfig::default(),
        }
    }

    fn query(window: u32, mode: ResultMode) -> KpiQuery {
        KpiQuery {
            filters: KpiFilterSpec {
                window,
                ..KpiFilterSpec::default()
            },
            mode,
            selected_date: None,
        }
    }

    #[test]
    fn window_ends_at_latest_day() {
        let latest = NaiveDate::from_ymd_opt(2024, 1, 10);
        let range = window_range(latest, 3).unwrap();
        assert_eq!(range.start().to_string(), "2024-01-08");
        assert_eq!(range.end().to_string(), "2024-01-10");
        assert!(window_range(latest, 0).is_none());
        assert!(window_range(None, 7).is_none());
    }

    #[test]
    fn window_keeps_trailing_shift_days() {
        let records: Vec<_> = (1..=10).map(|day| visit(day, 12)).collect();
        let result = apply_filters(&source(&records), &query(3, ResultMode::Full));
        let dates: Vec<_> = result
            .daily_stats
            .unwrap()
            .into_iter()
            .map(|bucket| bucket.date)
            .collect();
        assert_eq!(dates, vec!["2024-01-08", "2024-01-09", "2024-01-10"]);
        assert_eq!(result.meta.filtered_records, 3);
        assert_eq!(result.meta.total_records, 10);
        assert_eq!(result.meta.latest_date.as_deref(), Some("2024-01-10"));
    }

    #[test]
    fn zero_window_keeps_undated_records() {
        let records = vec![visit(1, 12), NormalizedRecord::default()];
        let unwindowed = apply_filters(&source(&records), &query(0, ResultMode::Full));
        assert_eq!(unwindowed.meta.filtered_records, 2);
        let windowed = apply_filters(&source(&records), &query(5, ResultMode::Full));
        assert_eq!(windowed.meta.filtered_records, 1);
    }

    #[test]
    fn predicates_apply_after_window() {
        let mut records: Vec<_> = (1..=4).map(|day| visit(day, 12)).collect();
        records[1].night = true;
        records[3].night = true;
        records[3].ems = true;
        records[3].card_type = CardType::Tr;

        let mut night = query(2, ResultMode::Full);
        night.filters.shift = ShiftFilter::Night;
        let result = apply_filters(&source(&records), &night);
        // Day 2 is outside the two-day window.
        assert_eq!(result.meta.filtered_records, 1);
        assert_eq!(result.records.unwrap()[0].arrival, Some(at(4, 12)));

        let mut self_arrivals = query(0, ResultMode::Full);
        self_arrivals.filters.arrival = ArrivalFilter::SelfArrival;
        let result = apply_filters(&source(&records), &self_arrivals);
        assert_eq!(result.meta.filtered_records, 3);
    }

    #[test]
    fn summary_hourly_defaults_to_latest_day() {
        let records = vec![visit(1, 9), visit(2, 9), visit(2, 9), visit(2, 18)];
        let result = apply_filters(&source(&records), &query(0, ResultMode::SummaryHourly));
        assert!(result.records.is_none());
        assert_eq!(result.selected_date.as_deref(), Some("2024-01-02"));
        assert_eq!(
            result.date_keys.unwrap(),
            vec!["2024-01-01".to_string(), "2024-01-02".to_string()]
        );
        let hourly = result.hourly.unwrap();
        assert_eq!(hourly.len(), 24);
        assert_eq!(hourly[9].count, 2);
        assert_eq!(hourly[18].discharged, 1);
        assert_eq!(result.daily_stats.unwrap().len(), 2);
    }

    #[test]
    fn hourly_follows_shift_day_not_calendar_day() {
        // 03:15 on the 3rd belongs to shift day the 2nd.
        let records = vec![visit(2, 22), visit(3, 3)];
        let mut hourly = query(0, ResultMode::HourlyOnly);
        hourly.selected_date = NaiveDate::from_ymd_opt(2024, 1, 2);
        let result = apply_filters(&source(&records), &hourly);
        let buckets = result.hourly.unwrap();
        assert_eq!(buckets[22].count, 1);
        assert_eq!(buckets[3].count, 1);
    }

    #[test]
    fn records_for_date_selects_one_day() {
        let records = vec![visit(1, 9), visit(2, 9), visit(2, 10)];
        let mut per_date = query(0, ResultMode::RecordsForDate);
        per_date.selected_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        let result = apply_filters(&source(&records), &per_date);
        assert_eq!(result.records.unwrap().len(), 1);
        assert_eq!(result.selected_date.as_deref(), Some("2024-01-01"));
    }

    #[test]
    fn date_only_arrivals_stay_out_of_hourly() {
        let mut record = visit(1, 0);
        record.arrival_has_time = false;
        let buckets = hourly_breakdown([&record]);
        assert!(buckets.iter().all(|bucket| bucket.count == 0));
    }

    #[test]
    fn degraded_path_rewindows_daily_stats() {
        let stats: Vec<_> = (1..=5)
            .map(|day| DailyStatsBucket {
                count: 2,
                ..DailyStatsBucket::new(format!("2024-01-0{day}"))
            })
            .collect();
        let source = DatasetSource {
            records: None,
            daily_stats: &stats,
            calculations: CalculationConfig::default(),
        };
        let mut night = query(2, ResultMode::SummaryHourly);
        night.filters.shift = ShiftFilter::Night;
        let result = apply_filters(&source, &night);

        assert!(!result.meta.records_available);
        assert_eq!(result.meta.total_records, 10);
        assert_eq!(result.meta.filtered_records, 4);
        assert_eq!(result.meta.filters.shift, ShiftFilter::Night);
        assert_eq!(result.daily_stats.unwrap().len(), 2);
        assert_eq!(result.selected_date.as_deref(), Some("2024-01-05"));
        assert!(result.hourly.unwrap().iter().all(|bucket| bucket.count == 0));
    }

    #[test]
    fn meta_wire_format() {
        let records = vec![visit(1, 9)];
        let result = apply_filters(&source(&records), &query(7, ResultMode::DateKeys));
        insta::assert_json_snapshot!(result, @r###"
        {
          "mode": "dateKeys",
          "dateKeys": [
            "2024-01-01"
          ],
          "meta": {
            "totalRecords": 1,
            "filteredRecords": 1,
            "windowDays": 7,
            "latestDate": "2024-01-01",
            "recordsAvailable": true,
            "filters": {
              "window": 7,
              "shift": "all",
              "arrival": "all",
              "disposition": "all",
              "cardType": "all"
            }
          }
        }
        "###);
    }

    proptest! {
        #[test]
        fn filtering_is_deterministic_and_consistent(
            days in prop::collection::vec((1u32..28, 0u32..24, any::<bool>(), any::<bool>()), 0..40),
            window in 0u32..10,
        ) {
            let records: Vec<_> = days
                .iter()
                .map(|&(day, hour, night, ems)| NormalizedRecord {
                    night,
                    ems,
                    ..visit(day, hour)
                })
                .collect();
            let mut q = query(window, ResultMode::Full);
            q.filters.shift = ShiftFilter::Day;
            let first = apply_filters(&source(&records), &q);
            let second = apply_filters(&source(&records), &q);
            prop_assert_eq!(&first, &second);

            let stats = first.daily_stats.unwrap();
            let counted: u64 = stats.iter().map(|bucket| bucket.count).sum();
            prop_assert_eq!(counted, first.meta.filtered_records);
            prop_assert!(stats.iter().all(|bucket| bucket.night == 0));
            prop_assert!(stats.len() <= window.max(1) as usize || window == 0);
        }
    }
}
