//! KPI filtering and the in-memory dataset registry.
//!
//! Datasets produced by a visit transform can be stored once and then
//! queried repeatedly by handle, each query re-windowing and re-filtering
//! the records and rebuilding the daily stats from what remains.
//!
//! # Example
//!
//! ```
//! use edflow_kpi::{DatasetRegistry, KpiQuery, ResultMode, apply_filters};
//! use edflow_model::{CalculationConfig, DailyStatsBucket};
//!
//! let mut registry = DatasetRegistry::new();
//! let stats = vec![DailyStatsBucket::new("2024-01-05")];
//! let handle = registry.store(None, stats, CalculationConfig::default());
//!
//! let query = KpiQuery { mode: ResultMode::DateKeys, ..KpiQuery::default() };
//! let result = apply_filters(&registry.get(&handle).unwrap().source(), &query);
//! assert_eq!(result.date_keys.unwrap(), vec!["2024-01-05".to_string()]);
//! assert!(!result.meta.records_available);
//! ```

pub mod engine;
pub mod query;
pub mod registry;

// === Engine ===
pub use engine::{DatasetSource, apply_filters, hourly_breakdown, matches_filters, window_range};

// === Queries ===
pub use query::{HourlyBucket, KpiMeta, KpiQuery, KpiResult, ResultMode};

// === Registry ===
pub use registry::{DatasetEntry, DatasetRegistry, HANDLE_PREFIX};
