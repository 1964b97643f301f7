//! Logical-field to column-index mapping.

use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// A logical field the resolver should locate in the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// Logical field name (e.g. `arrival`).
    pub name: &'static str,
    /// Header synonyms, tried in order.
    pub candidates: Vec<String>,
    /// Whether an unresolved field is a configuration error.
    pub required: bool,
}

impl FieldSpec {
    pub fn required(name: &'static str, candidates: Vec<String>) -> Self {
        Self {
            name,
            candidates,
            required: true,
        }
    }

    pub fn optional(name: &'static str, candidates: Vec<String>) -> Self {
        Self {
            name,
            candidates,
            required: false,
        }
    }
}

/// Resolved column indices for one dataset.
///
/// Serializes as `{field: index}` with `-1` for unresolved fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    indices: BTreeMap<&'static str, Option<usize>>,
    required: Vec<&'static str>,
}

impl ColumnMap {
    pub fn insert(&mut self, field: &'static str, index: Option<usize>, required: bool) {
        self.indices.insert(field, index);
        if required && !self.required.contains(&field) {
            self.required.push(field);
        }
    }

    /// Column index of a logical field, if it was resolved.
    pub fn index(&self, field: &str) -> Option<usize> {
        self.indices.get(field).copied().flatten()
    }

    pub fn is_resolved(&self, field: &str) -> bool {
        self.index(field).is_some()
    }

    /// Cell for a logical field, or `""` when the field is unresolved or the
    /// row is too short.
    pub fn cell<'a>(&self, row: &'a [String], field: &str) -> &'a str {
        self.index(field)
            .and_then(|idx| row.get(idx))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Required fields that could not be resolved, in declaration order.
    pub fn missing_required(&self) -> Vec<&'static str> {
        self.required
            .iter()
            .copied()
            .filter(|field| !self.is_resolved(field))
            .collect()
    }

    /// Optional fields that could not be resolved.
    pub fn missing_optional(&self) -> Vec<&'static str> {
        self.indices
            .iter()
            .filter(|(field, index)| index.is_none() && !self.required.contains(*field))
            .map(|(field, _)| *field)
            .collect()
    }
}

impl Serialize for ColumnMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.indices.len()))?;
        for (field, index) in &self.indices {
            let value = index.map_or(-1, |idx| idx as i64);
            map.serialize_entry(field, &value)?;
        }
        map.end()
    }
}
