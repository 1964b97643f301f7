//! In-memory registry of stored datasets, addressed by opaque handles.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use edflow_model::{CalculationConfig, DailyStatsBucket, EngineError, NormalizedRecord, Result};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::engine::DatasetSource;

/// Prefix of every dataset handle.
pub const HANDLE_PREFIX: &str = "ds-";

/// A dataset kept alive between requests.
#[derive(Debug, Clone)]
pub struct DatasetEntry {
    /// Visit records; `None` when only pre-aggregated stats were stored.
    pub records: Option<Vec<NormalizedRecord>>,
    pub daily_stats: Vec<DailyStatsBucket>,
    pub calculations: CalculationConfig,
    pub created_at: DateTime<Utc>,
}

impl DatasetEntry {
    /// Borrowed view for the filter engine.
    pub fn source(&self) -> DatasetSource<'_> {
        DatasetSource {
            records: self.records.as_deref(),
            daily_stats: &self.daily_stats,
            calculations: self.calculations,
        }
    }
}

/// Owner of all stored datasets.
///
/// Only [`store`](Self::store) and [`release`](Self::release) mutate it; a
/// store never touches existing handles.
#[derive(Debug, Default)]
pub struct DatasetRegistry {
    entries: HashMap<String, DatasetEntry>,
    next_seq: u64,
}

impl DatasetRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a dataset and returns its new handle.
    pub fn store(
        &mut self,
        records: Option<Vec<NormalizedRecord>>,
        daily_stats: Vec<DailyStatsBucket>,
        calculations: CalculationConfig,
    ) -> String {
        let created_at = Utc::now();
        let record_count = records.as_ref().map_or(0, Vec::len);
        let handle = dataset_handle(self.next_seq, created_at, record_count);
        self.next_seq += 1;

        debug!(%handle, records = record_count, days = daily_stats.len(), "dataset stored");
        self.entries.insert(
            handle.clone(),
            DatasetEntry {
                records,
                daily_stats,
                calculations,
                created_at,
            },
        );
        handle
    }

    /// Looks up a stored dataset.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownHandle`] for unknown or released handles.
    pub fn get(&self, handle: &str) -> Result<&DatasetEntry> {
        self.entries
            .get(handle)
            .ok_or_else(|| EngineError::unknown_handle(handle))
    }

    /// Drops a dataset. Returns whether the handle was known.
    pub fn release(&mut self, handle: &str) -> bool {
        let released = self.entries.remove(handle).is_some();
        debug!(%handle, released, "dataset release");
        released
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// `ds-` followed by the hex SHA-256 of sequence, creation time and size.
fn dataset_handle(seq: u64, created_at: DateTime<Utc>, record_count: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(seq.to_le_bytes());
    hasher.update(created_at.to_rfc3339().as_bytes());
    hasher.update((record_count as u64).to_le_bytes());
    format!("{HANDLE_PREFIX}{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_empty(registry: &mut DatasetRegistry) -> String {
        registry.store(Some(Vec::new()), Vec::new(), CalculationConfig::default())
    }

    #[test]
    fn handles_are_prefixed_hex_digests() {
        let mut registry = DatasetRegistry::new();
        let handle = store_empty(&mut registry);
        let digest = handle.strip_prefix(HANDLE_PREFIX).unwrap();
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn store_does_not_disturb_other_handles() {
        let mut registry = DatasetRegistry::new();
        let first = store_empty(&mut registry);
        let second = store_empty(&mut registry);
        assert_ne!(first, second);
        assert_eq!(registry.len(), 2);
        assert!(registry.get(&first).is_ok());
    }

    #[test]
    fn release_only_affects_its_handle() {
        let mut registry = DatasetRegistry::new();
        let keep = store_empty(&mut registry);
        let drop = store_empty(&mut registry);

        assert!(registry.release(&drop));
        assert!(!registry.release(&drop));
        assert!(registry.get(&keep).is_ok());
        let err = registry.get(&drop).unwrap_err();
        assert!(matches!(err, EngineError::UnknownHandle { .. }));
    }

    #[test]
    fn stats_only_entries_have_no_records() {
        let mut registry = DatasetRegistry::new();
        let handle = registry.store(
            None,
            vec![DailyStatsBucket::new("2024-01-05")],
            CalculationConfig::default(),
        );
        let source = registry.get(&handle).unwrap().source();
        assert!(source.records.is_none());
        assert_eq!(source.daily_stats.len(), 1);
    }
}
