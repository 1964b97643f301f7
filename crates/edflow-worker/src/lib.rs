//! Message-driven worker for ED flow transforms and KPI queries.
//!
//! Requests arrive as JSON objects tagged by `type` and are answered one at a
//! time. Long transforms stream `progress` responses ahead of the final
//! `success` or `error` response carrying the same `id`.
//!
//! # Example
//!
//! ```
//! use edflow_worker::{Worker, serve};
//!
//! let input = r#"{"id":"1","type":"releaseDataset","handle":"ds-unknown"}"#;
//! let mut output = Vec::new();
//! serve(&mut Worker::default(), input.as_bytes(), &mut output).unwrap();
//!
//! let response: serde_json::Value = serde_json::from_slice(&output).unwrap();
//! assert_eq!(response["payload"]["released"], false);
//! ```

pub mod error;
pub mod protocol;
pub mod serve;
pub mod worker;

pub use error::{GENERIC_ERROR_NAME, WorkerError};
pub use protocol::{ErrorPayload, QueryParams, Request, RequestBody, Response, Status, recover_id};
pub use serve::{ServeStats, decode_line, serve};
pub use worker::Worker;
