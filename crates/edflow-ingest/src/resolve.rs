//! Header resolution.
//!
//! Each logical field carries an ordered list of header synonyms. Matching
//! runs through [`MATCH_TIERS`] from strictest to loosest; a tier is tried
//! against every candidate before the next tier is considered, so an exact
//! match on a late synonym beats a substring match on an early one.

use edflow_model::{ColumnMap, FieldSpec};
use tracing::{debug, warn};

use crate::fold::fold_lower;
use crate::tokenizer::normalize_header;

/// How a header was matched to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchStrategy {
    /// Header equals the candidate as written.
    ExactRaw,
    /// Equal after lowercasing.
    ExactNormalized,
    /// Equal after lowercasing and diacritic folding.
    ExactFolded,
    /// Lowercased header contains the lowercased candidate.
    ContainsNormalized,
    /// Folded header contains the folded candidate.
    ContainsFolded,
}

/// Matching tiers in evaluation order.
pub const MATCH_TIERS: [MatchStrategy; 5] = [
    MatchStrategy::ExactRaw,
    MatchStrategy::ExactNormalized,
    MatchStrategy::ExactFolded,
    MatchStrategy::ContainsNormalized,
    MatchStrategy::ContainsFolded,
];

impl MatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ExactRaw => "exact",
            Self::ExactNormalized => "exact-lowercase",
            Self::ExactFolded => "exact-folded",
            Self::ContainsNormalized => "contains-lowercase",
            Self::ContainsFolded => "contains-folded",
        }
    }

    fn matches(self, header: &HeaderKeys, candidate: &CandidateKeys) -> bool {
        match self {
            Self::ExactRaw => header.raw == candidate.raw,
            Self::ExactNormalized => header.lower == candidate.lower,
            Self::ExactFolded => header.folded == candidate.folded,
            Self::ContainsNormalized => {
                !candidate.lower.is_empty() && header.lower.contains(&candidate.lower)
            }
            Self::ContainsFolded => {
                !candidate.folded.is_empty() && header.folded.contains(&candidate.folded)
            }
        }
    }
}

#[derive(Debug, Clone)]
struct HeaderKeys {
    raw: String,
    lower: String,
    folded: String,
}

#[derive(Debug, Clone)]
struct CandidateKeys {
    raw: String,
    lower: String,
    folded: String,
}

impl CandidateKeys {
    fn new(candidate: &str) -> Self {
        let raw = normalize_header(candidate);
        let lower = raw.to_lowercase();
        let folded = fold_lower(&raw);
        Self { raw, lower, folded }
    }
}

/// Precomputed match keys for one header row.
#[derive(Debug, Clone)]
pub struct HeaderIndex {
    headers: Vec<HeaderKeys>,
}

/// A resolved column and how it was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMatch {
    pub index: usize,
    pub strategy: MatchStrategy,
    /// The candidate synonym that matched.
    pub candidate: String,
}

impl HeaderIndex {
    pub fn new(headers: &[String]) -> Self {
        let headers = headers
            .iter()
            .map(|header| {
                let raw = normalize_header(header);
                let lower = raw.to_lowercase();
                let folded = fold_lower(&raw);
                HeaderKeys { raw, lower, folded }
            })
            .collect();
        Self { headers }
    }

    pub fn len(&self) -> usize {
        self.headers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Finds the column for the first candidate that matches, tier by tier.
    pub fn find(&self, candidates: &[String]) -> Option<ColumnMatch> {
        let keys: Vec<CandidateKeys> = candidates
            .iter()
            .map(|candidate| CandidateKeys::new(candidate))
            .filter(|keys| !keys.raw.is_empty())
            .collect();
        for strategy in MATCH_TIERS {
            for candidate in &keys {
                let hit = self
                    .headers
                    .iter()
                    .position(|header| strategy.matches(header, candidate));
                if let Some(index) = hit {
                    return Some(ColumnMatch {
                        index,
                        strategy,
                        candidate: candidate.raw.clone(),
                    });
                }
            }
        }
        None
    }
}

/// Resolves one logical field to a column index.
pub fn resolve_column(index: &HeaderIndex, candidates: &[String]) -> Option<ColumnMatch> {
    index.find(candidates)
}

/// Resolves every field against a header row.
///
/// Unresolved required fields are left for the caller to report; unresolved
/// optional fields are logged and otherwise ignored.
pub fn resolve_columns(headers: &[String], fields: &[FieldSpec]) -> ColumnMap {
    let index = HeaderIndex::new(headers);
    let mut map = ColumnMap::default();
    for field in fields {
        let found = resolve_column(&index, &field.candidates);
        match &found {
            Some(hit) => debug!(
                field = field.name,
                column = hit.index,
                header = %headers.get(hit.index).map(String::as_str).unwrap_or_default(),
                strategy = hit.strategy.as_str(),
                candidate = %hit.candidate,
                "resolved column"
            ),
            None if field.required => debug!(field = field.name, "required column not found"),
            None => warn!(field = field.name, "optional column not found"),
        }
        map.insert(field.name, found.map(|hit| hit.index), field.required);
    }
    map
}
