//! Core data model for the ED flow engine.
//!
//! Every other crate in the workspace speaks in these types: normalized visit
//! records, daily and hospital-stay aggregates, ED summaries, KPI filter
//! specifications and the configuration structs that drive parsing.

pub mod column;
pub mod config;
pub mod ed;
pub mod error;
pub mod filter;
pub mod record;
pub mod stats;

pub use column::{ColumnMap, FieldSpec};
pub use config::{
    CalculationConfig, CalculationOptions, CandidateList, ClockValue, CsvConfig, CsvOptions,
    HeaderCandidates, NightWindow, ShiftStart, TransformOptions, split_multi_value,
};
pub use ed::{
    CategoryShare, DailyLabPoint, DatasetShape, Disposition, DispositionShare, EdDailyPoint,
    EdMeta, EdRecord, EdSummary, LegacySummary, SnapshotSummary,
};
pub use error::{EngineError, ErrorKind, Result};
pub use filter::{
    ArrivalFilter, CardTypeFilter, DispositionFilter, FilterValue, KpiFilterInput, KpiFilterSpec,
    ShiftFilter, deserialize_day_count,
};
pub use record::{AgeBand, CardType, NormalizedRecord, Referral, Sex, UNSPECIFIED};
pub use stats::{DailyStatsBucket, HospitalStayAggregate, StayBucket, StayCounts};
