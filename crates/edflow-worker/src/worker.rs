//! Request dispatch.

use std::io;

use edflow_kpi::{DatasetRegistry, DatasetSource, KpiQuery, ResultMode, apply_filters};
use edflow_model::{CalculationConfig, EngineError};
use edflow_transform::{RowProgress, parse_day_key, transform_ed, transform_visits};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{info_span, trace, warn};

use crate::error::WorkerError;
use crate::protocol::{
    ApplyKpiFiltersRequest, HandleQueryRequest, RecordsForDateRequest, Request, RequestBody,
    Response, StoreDatasetRequest, TransformCsvRequest,
};

type WorkerResult<T> = std::result::Result<T, WorkerError>;

/// Answers requests one at a time.
///
/// The dataset registry is injected at construction; a worker built without
/// one rejects handle requests with a `ReferenceError`.
#[derive(Debug)]
pub struct Worker {
    registry: Option<DatasetRegistry>,
}

impl Default for Worker {
    fn default() -> Self {
        Self::new(DatasetRegistry::new())
    }
}

impl Worker {
    pub fn new(registry: DatasetRegistry) -> Self {
        Self {
            registry: Some(registry),
        }
    }

    /// A worker that can transform but not store datasets.
    pub fn without_registry() -> Self {
        Self { registry: None }
    }

    pub fn registry(&self) -> Option<&DatasetRegistry> {
        self.registry.as_ref()
    }

    /// Handles one request. Progress messages go to `emit` before the final
    /// response is returned.
    pub fn handle(
        &mut self,
        request: Request,
        emit: &mut dyn FnMut(&Response) -> io::Result<()>,
    ) -> Response {
        let span = info_span!("request", id = %request.id, r#type = request.body.kind());
        let _guard = span.enter();
        trace!("dispatching request");

        let id = request.id;
        match self.dispatch(&id, request.body, emit) {
            Ok(payload) => Response::success(id, payload),
            Err(err) => {
                warn!(error = %err, name = err.name(), "request failed");
                Response::error(id, err.to_payload())
            }
        }
    }

    fn dispatch(
        &mut self,
        id: &str,
        body: RequestBody,
        emit: &mut dyn FnMut(&Response) -> io::Result<()>,
    ) -> WorkerResult<Value> {
        match body {
            RequestBody::TransformCsv(request) => self.transform_csv(id, &request, emit),
            RequestBody::TransformEdCsv(request) => {
                encode(&transform_ed(&request.csv_text, &request.options)?)
            }
            RequestBody::ApplyKpiFilters(request) => apply_kpi_filters(&request),
            RequestBody::StoreDataset(request) => self.store_dataset(request),
            RequestBody::ReleaseDataset(request) => {
                let released = self.wired_registry_mut()?.release(&request.handle);
                Ok(json!({ "released": released }))
            }
            RequestBody::ApplyFiltersByHandle(request) => self.query_handle(&request, None),
            RequestBody::GetDateKeysByHandle(request) => {
                self.query_handle(&request, Some(ResultMode::DateKeys))
            }
            RequestBody::GetRecordsForDateByHandle(request) => self.records_for_date(&request),
            RequestBody::ComputeLastShiftHourlyByHandle(request) => {
                self.query_handle(&request, Some(ResultMode::HourlyOnly))
            }
        }
    }

    fn transform_csv(
        &self,
        id: &str,
        request: &TransformCsvRequest,
        emit: &mut dyn FnMut(&Response) -> io::Result<()>,
    ) -> WorkerResult<Value> {
        let mut sink = |progress: RowProgress| emit(&Response::progress(id, progress));
        let result = transform_visits(
            &request.csv_text,
            &request.options,
            request.progress_step,
            &mut sink,
        )?;
        encode(&result)
    }

    fn store_dataset(&mut self, request: StoreDatasetRequest) -> WorkerResult<Value> {
        let calculations =
            CalculationConfig::normalize(&request.calculations, &request.calculation_defaults);
        let handle = self
            .wired_registry_mut()?
            .store(request.records, request.daily_stats, calculations);
        Ok(json!({ "handle": handle }))
    }

    fn query_handle(
        &self,
        request: &HandleQueryRequest,
        mode: Option<ResultMode>,
    ) -> WorkerResult<Value> {
        let entry = self.wired_registry()?.get(&request.handle)?;
        let mut query = request.query.resolve(&entry.calculations);
        if let Some(mode) = mode {
            query.mode = mode;
        }
        encode(&apply_filters(&entry.source(), &query))
    }

    fn records_for_date(&self, request: &RecordsForDateRequest) -> WorkerResult<Value> {
        let entry = self.wired_registry()?.get(&request.handle)?;
        let query = KpiQuery {
            mode: ResultMode::RecordsForDate,
            selected_date: parse_day_key(&request.date),
            ..request.query.resolve(&entry.calculations)
        };
        encode(&apply_filters(&entry.source(), &query))
    }

    fn wired_registry(&self) -> WorkerResult<&DatasetRegistry> {
        self.registry.as_ref().ok_or_else(not_wired)
    }

    fn wired_registry_mut(&mut self) -> WorkerResult<&mut DatasetRegistry> {
        self.registry.as_mut().ok_or_else(not_wired)
    }
}

fn apply_kpi_filters(request: &ApplyKpiFiltersRequest) -> WorkerResult<Value> {
    let calculations =
        CalculationConfig::normalize(&request.calculations, &request.calculation_defaults);
    let source = DatasetSource {
        records: request.records.as_deref(),
        daily_stats: &request.daily_stats,
        calculations,
    };
    encode(&apply_filters(&source, &request.query.resolve(&calculations)))
}

fn not_wired() -> WorkerError {
    EngineError::NotWired {
        component: "dataset registry",
    }
    .into()
}

fn encode<T: Serialize>(value: &T) -> WorkerResult<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Status;

    fn request(json: Value) -> Request {
        serde_json::from_value(json).unwrap()
    }

    fn run(worker: &mut Worker, json: Value) -> (Response, Vec<Response>) {
        let mut emitted = Vec::new();
        let response = worker.handle(request(json), &mut |progress: &Response| {
            emitted.push(progress.clone());
            Ok(())
        });
        (response, emitted)
    }

    const VISITS: &str = "Atvykimo data;Išrašymo data;GMP\n\
                          2024-01-05 08:10;2024-01-05 10:40;Taip\n\
                          2024-01-05 11:00;2024-01-05 12:00;\n";

    #[test]
    fn transform_reports_progress_before_result() {
        let mut worker = Worker::default();
        let (response, progress) = run(
            &mut worker,
            json!({"id": "t1", "type": "transformCsv", "csvText": VISITS, "progressStep": 1}),
        );
        assert_eq!(response.status, Status::Success);
        let payload = response.payload.unwrap();
        assert_eq!(payload["dailyStats"][0]["count"], 2);
        let last = progress.last().unwrap();
        assert_eq!(last.id, "t1");
        assert_eq!(last.status, Status::Progress);
        assert_eq!(last.payload.as_ref().unwrap()["current"], 2);
    }

    #[test]
    fn failing_progress_channel_does_not_fail_transform() {
        let mut worker = Worker::default();
        let response = worker.handle(
            request(json!({"id": "t2", "type": "transformCsv", "csvText": VISITS})),
            &mut |_: &Response| Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")),
        );
        assert_eq!(response.status, Status::Success);
    }

    #[test]
    fn store_query_release_cycle() {
        let mut worker = Worker::default();
        let (transformed, _) = run(
            &mut worker,
            json!({"id": "1", "type": "transformCsv", "csvText": VISITS}),
        );
        let payload = transformed.payload.unwrap();
        let (stored, _) = run(
            &mut worker,
            json!({
                "id": "2",
                "type": "storeDataset",
                "records": payload["records"],
                "dailyStats": payload["dailyStats"],
            }),
        );
        let handle = stored.payload.unwrap()["handle"].as_str().unwrap().to_string();
        assert!(handle.starts_with("ds-"));

        let (keys, _) = run(
            &mut worker,
            json!({"id": "3", "type": "getDateKeysByHandle", "handle": handle}),
        );
        assert_eq!(keys.payload.unwrap()["dateKeys"], json!(["2024-01-05"]));

        let (ems, _) = run(
            &mut worker,
            json!({
                "id": "4",
                "type": "getRecordsForDateByHandle",
                "handle": handle,
                "date": "2024-01-05",
                "filters": {"arrival": "ems"},
            }),
        );
        assert_eq!(ems.payload.unwrap()["records"].as_array().unwrap().len(), 1);

        let (released, _) = run(
            &mut worker,
            json!({"id": "5", "type": "releaseDataset", "handle": handle}),
        );
        assert_eq!(released.payload.unwrap()["released"], true);

        let (gone, _) = run(
            &mut worker,
            json!({"id": "6", "type": "applyFiltersByHandle", "handle": handle}),
        );
        assert_eq!(gone.status, Status::Error);
        assert_eq!(gone.error.unwrap().name, "HandleError");
    }

    #[test]
    fn inline_filters_without_records_degrade() {
        let mut worker = Worker::without_registry();
        let (response, _) = run(
            &mut worker,
            json!({
                "id": "k",
                "type": "applyKpiFilters",
                "dailyStats": [{"date": "2024-01-04", "count": 3}, {"date": "2024-01-05", "count": 2}],
                "filters": {"window": 1},
            }),
        );
        let payload = response.payload.unwrap();
        assert_eq!(payload["meta"]["recordsAvailable"], false);
        assert_eq!(payload["meta"]["filteredRecords"], 2);
        assert_eq!(payload["dailyStats"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn negative_stored_window_disables_windowing() {
        let mut worker = Worker::default();
        let (stored, _) = run(
            &mut worker,
            json!({
                "id": "1",
                "type": "storeDataset",
                "dailyStats": [{"date": "2023-11-01", "count": 1}, {"date": "2024-01-05", "count": 2}],
                "calculations": {"windowDays": -5},
            }),
        );
        assert_eq!(stored.status, Status::Success);
        let handle = stored.payload.unwrap()["handle"].as_str().unwrap().to_string();

        let (keys, _) = run(
            &mut worker,
            json!({"id": "2", "type": "getDateKeysByHandle", "handle": handle}),
        );
        assert_eq!(keys.status, Status::Success);
        assert_eq!(keys.payload.unwrap()["dateKeys"], json!(["2023-11-01", "2024-01-05"]));
    }

    #[test]
    fn missing_registry_is_a_reference_error() {
        let mut worker = Worker::without_registry();
        let (response, _) = run(
            &mut worker,
            json!({"id": "1", "type": "storeDataset", "dailyStats": []}),
        );
        insta::assert_json_snapshot!(response, @r###"
        {
          "id": "1",
          "status": "error",
          "error": {
            "message": "dataset registry is not available in this worker",
            "name": "ReferenceError"
          }
        }
        "###);
    }
}
