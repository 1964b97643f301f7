//! Wire messages exchanged with the worker.
//!
//! Requests are JSON objects `{id, type, ...fields}` with camelCase field
//! names; responses are `{id, status, payload?, error?}`.

use edflow_kpi::{KpiQuery, ResultMode};
use edflow_model::{
    CalculationConfig, CalculationOptions, DailyStatsBucket, KpiFilterInput, KpiFilterSpec,
    NormalizedRecord, TransformOptions,
};
use edflow_transform::{RowProgress, parse_day_key};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One request message.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    pub id: String,
    #[serde(flatten)]
    pub body: RequestBody,
}

/// Request payloads, tagged by `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RequestBody {
    TransformCsv(TransformCsvRequest),
    TransformEdCsv(TransformEdCsvRequest),
    ApplyKpiFilters(ApplyKpiFiltersRequest),
    StoreDataset(StoreDatasetRequest),
    ReleaseDataset(HandleRequest),
    ApplyFiltersByHandle(HandleQueryRequest),
    GetDateKeysByHandle(HandleQueryRequest),
    GetRecordsForDateByHandle(RecordsForDateRequest),
    ComputeLastShiftHourlyByHandle(HandleQueryRequest),
}

impl RequestBody {
    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::TransformCsv(_) => "transformCsv",
            Self::TransformEdCsv(_) => "transformEdCsv",
            Self::ApplyKpiFilters(_) => "applyKpiFilters",
            Self::StoreDataset(_) => "storeDataset",
            Self::ReleaseDataset(_) => "releaseDataset",
            Self::ApplyFiltersByHandle(_) => "applyFiltersByHandle",
            Self::GetDateKeysByHandle(_) => "getDateKeysByHandle",
            Self::GetRecordsForDateByHandle(_) => "getRecordsForDateByHandle",
            Self::ComputeLastShiftHourlyByHandle(_) => "computeLastShiftHourlyByHandle",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformCsvRequest {
    pub csv_text: String,
    #[serde(default)]
    pub options: TransformOptions,
    #[serde(default)]
    pub progress_step: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformEdCsvRequest {
    pub csv_text: String,
    #[serde(default)]
    pub options: TransformOptions,
}

/// Filter fields shared by every KPI request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryParams {
    pub filters: KpiFilterInput,
    pub default_filters: KpiFilterInput,
    #[serde(deserialize_with = "edflow_model::deserialize_day_count")]
    pub window_days: Option<u32>,
    pub mode: Option<String>,
    pub selected_date: Option<String>,
}

impl QueryParams {
    /// Resolves wire filters into a query.
    ///
    /// `filters` fall back field by field to `defaultFilters`, whose window
    /// falls back to `windowDays` and then to the dataset's configured
    /// window. Unknown modes run as `full`.
    pub fn resolve(&self, calculations: &CalculationConfig) -> KpiQuery {
        let base = KpiFilterSpec {
            window: self.window_days.unwrap_or(calculations.window_days),
            ..KpiFilterSpec::default()
        };
        let defaults = KpiFilterSpec::resolve(&self.default_filters, &base);
        KpiQuery {
            filters: KpiFilterSpec::resolve(&self.filters, &defaults),
            mode: self
                .mode
                .as_deref()
                .and_then(ResultMode::parse)
                .unwrap_or_default(),
            selected_date: self.selected_date.as_deref().and_then(parse_day_key),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyKpiFiltersRequest {
    #[serde(default)]
    pub records: Option<Vec<NormalizedRecord>>,
    #[serde(default)]
    pub daily_stats: Vec<DailyStatsBucket>,
    #[serde(default)]
    pub calculations: CalculationOptions,
    #[serde(default)]
    pub calculation_defaults: CalculationOptions,
    #[serde(flatten)]
    pub query: QueryParams,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreDatasetRequest {
    #[serde(default)]
    pub records: Option<Vec<NormalizedRecord>>,
    #[serde(default)]
    pub daily_stats: Vec<DailyStatsBucket>,
    #[serde(default)]
    pub calculations: CalculationOptions,
    #[serde(default)]
    pub calculation_defaults: CalculationOptions,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandleRequest {
    pub handle: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HandleQueryRequest {
    pub handle: String,
    #[serde(flatten)]
    pub query: QueryParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordsForDateRequest {
    pub handle: String,
    pub date: String,
    #[serde(flatten)]
    pub query: QueryParams,
}

/// Response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
    Progress,
}

/// Error payload of a failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub message: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stack: Option<String>,
}

impl ErrorPayload {
    /// Builds a payload from an error, rendering its source chain as the
    /// stack.
    pub fn from_error(err: &dyn std::error::Error, name: &str) -> Self {
        let mut causes = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            causes.push(format!("caused by: {cause}"));
            source = cause.source();
        }
        Self {
            message: err.to_string(),
            name: name.to_string(),
            stack: (!causes.is_empty()).then(|| causes.join("\n")),
        }
    }
}

/// One response message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub id: String,
    pub status: Status,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorPayload>,
}

impl Response {
    pub fn success(id: impl Into<String>, payload: Value) -> Self {
        Self {
            id: id.into(),
            status: Status::Success,
            payload: Some(payload),
            error: None,
        }
    }

    pub fn error(id: impl Into<String>, error: ErrorPayload) -> Self {
        Self {
            id: id.into(),
            status: Status::Error,
            payload: None,
            error: Some(error),
        }
    }

    pub fn progress(id: impl Into<String>, progress: RowProgress) -> Self {
        Self {
            id: id.into(),
            status: Status::Progress,
            payload: serde_json::to_value(progress).ok(),
            error: None,
        }
    }
}

/// Best-effort `id` of a message that failed to decode.
pub fn recover_id(line: &str) -> String {
    let Ok(value) = serde_json::from_str::<Value>(line) else {
        return String::new();
    };
    match value.get("id") {
        Some(Value::String(id)) => id.clone(),
        Some(Value::Number(id)) => id.to_string(),
        _ => String::new(),
    }
}
