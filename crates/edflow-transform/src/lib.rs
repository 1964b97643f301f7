//! Record mapping, shift-day bucketing and aggregation.
//!
//! This crate turns tokenized ED exports into typed records and the
//! pre-aggregated statistics downstream views filter on.
//!
//! # Features
//!
//! - **Record mapping**: dates, flags, card type, diagnosis group and
//!   demographics from free-text cells, never failing on bad input
//! - **Shift days**: day boundaries at a configurable shift start instead of
//!   midnight
//! - **Aggregation**: per-shift-day counts and durations plus a hospital-stay
//!   histogram by year and department
//! - **ED summaries**: legacy, snapshot and hybrid dataset shapes
//!
//! # Example
//!
//! ```
//! use edflow_model::TransformOptions;
//! use edflow_transform::{NoProgress, transform_visits};
//!
//! let csv = "Atvykimo data;Išrašymo data;GMP\n2024-01-05 08:10;2024-01-05 10:40;Taip\n";
//! let result = transform_visits(csv, &TransformOptions::default(), None, &mut NoProgress).unwrap();
//! assert_eq!(result.daily_stats[0].date, "2024-01-05");
//! assert!(result.records[0].ems);
//! ```

pub mod aggregate;
pub mod ed;
pub mod mapper;
pub mod normalization;
pub mod pipeline;
pub mod progress;
pub mod shift;

// === Pipelines ===
pub use pipeline::{VisitTransformResult, transform_ed, transform_visits};

// === Building Blocks ===
pub use aggregate::{DailyAggregator, compute_daily_stats, compute_hospital_stays};
pub use ed::{EdTransformResult, classify_disposition};
pub use mapper::RecordMapper;
pub use shift::{day_key, parse_day_key, record_shift_day, shift_day, shift_day_key};

// === Progress ===
pub use progress::{
    DEFAULT_PROGRESS_STEP, NoProgress, ProgressReporter, ProgressSink, ProgressThrottle,
    RowProgress,
};
