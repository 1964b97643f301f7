//! End-to-end CSV transforms: tokenize, resolve, map, aggregate.

use edflow_ingest::{align_row, parse_csv, resolve_columns};
use edflow_model::{
    DailyStatsBucket, EngineError, HospitalStayAggregate, NormalizedRecord, Result,
    TransformOptions,
};
use serde::Serialize;
use tracing::{info, warn};

use crate::aggregate::{DailyAggregator, record_hospital_stay};
use crate::ed::{EdTransformResult, build_ed_result, detect_shape, ed_field_specs, map_ed_row};
use crate::mapper::RecordMapper;
use crate::progress::{ProgressReporter, ProgressSink, ProgressThrottle};

/// Result of a visit-level transform.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitTransformResult {
    pub records: Vec<NormalizedRecord>,
    pub daily_stats: Vec<DailyStatsBucket>,
    pub hospital_by_dept_stay_agg: HospitalStayAggregate,
}

/// Transforms a visit export into normalized records and aggregates.
///
/// # Errors
///
/// Fails when the text is empty, has no data rows, or a required column
/// (arrival, discharge) cannot be resolved.
pub fn transform_visits(
    text: &str,
    options: &TransformOptions,
    progress_step: Option<usize>,
    sink: &mut dyn ProgressSink,
) -> Result<VisitTransformResult> {
    let parsed = parse_csv(text)?;
    if parsed.rows.is_empty() {
        return Err(EngineError::NoDataRows);
    }
    let csv = options.csv_config();
    let calculations = options.calculation_config();

    let columns = resolve_columns(&parsed.headers, &csv.field_specs());
    let missing = columns.missing_required();
    if !missing.is_empty() {
        return Err(EngineError::MissingColumns {
            missing: missing.into_iter().map(str::to_string).collect(),
        });
    }

    let mapper = RecordMapper::new(&columns, &csv, &calculations);
    let width = parsed.headers.len();
    let total = parsed.rows.len();
    let mut reporter = ProgressReporter::new(sink, ProgressThrottle::new(progress_step), total);
    let mut daily = DailyAggregator::new(calculations.shift_start);
    let mut hospital = HospitalStayAggregate::default();
    let mut records = Vec::with_capacity(total);

    for (idx, row) in parsed.rows.into_iter().enumerate() {
        let row = align_row(row, width, parsed.delimiter);
        let record = mapper.map_row(&row);
        daily.push(&record);
        record_hospital_stay(&mut hospital, &record, calculations.shift_start);
        records.push(record);
        reporter.row_done(idx + 1);
    }
    reporter.finish();

    if daily.skipped() > 0 {
        warn!(
            skipped = daily.skipped(),
            "rows without arrival or discharge left out of daily stats"
        );
    }
    let daily_stats = daily.finish();
    info!(
        records = records.len(),
        days = daily_stats.len(),
        "visit transform complete"
    );
    Ok(VisitTransformResult {
        records,
        daily_stats,
        hospital_by_dept_stay_agg: hospital,
    })
}

/// Transforms an ED export into records and a shape-aware summary.
///
/// # Errors
///
/// Fails when the text is empty, has no data rows, or neither the visit nor
/// the snapshot column group resolves.
pub fn transform_ed(text: &str, options: &TransformOptions) -> Result<EdTransformResult> {
    let parsed = parse_csv(text)?;
    if parsed.rows.is_empty() {
        return Err(EngineError::NoDataRows);
    }
    let csv = options.csv_config();
    let calculations = options.calculation_config();

    let columns = resolve_columns(&parsed.headers, &ed_field_specs(&csv));
    let detected = detect_shape(&columns);
    if !detected.has_legacy && !detected.has_snapshot {
        return Err(EngineError::MissingColumns {
            missing: vec![
                "arrival".to_string(),
                "disposition".to_string(),
                "currentPatients".to_string(),
            ],
        });
    }

    let width = parsed.headers.len();
    let records = parsed
        .rows
        .into_iter()
        .map(|row| map_ed_row(&align_row(row, width, parsed.delimiter), &columns, &calculations))
        .collect::<Vec<_>>();
    let result = build_ed_result(records, detected);
    info!(
        records = result.records.len(),
        shape = ?result.meta.shape,
        "ED transform complete"
    );
    Ok(result)
}
