//! ED flow data ingestion.
//!
//! Turns raw, human-exported CSV text into rows of string cells and resolves
//! logical fields (arrival, department, ...) to column indices.
//!
//! # Features
//!
//! - **Delimiter detection**: `,`, `;`, tab or `|`, counted outside quotes
//! - **Tolerant rows**: short rows are padded, long rows merged into the last column
//! - **Header resolution**: five matching tiers from exact to diacritic-folded substring
//!
//! # Example
//!
//! ```
//! use edflow_ingest::{parse_csv, resolve_columns};
//! use edflow_model::FieldSpec;
//!
//! let parsed = parse_csv("Atvykimo Data;GMP\n2024-01-05 08:10;Taip\n").unwrap();
//! let fields = vec![FieldSpec::required("arrival", vec!["atvykimo data".to_string()])];
//! let columns = resolve_columns(&parsed.headers, &fields);
//! assert_eq!(columns.index("arrival"), Some(0));
//! ```

mod fold;
mod resolve;
mod tokenizer;

// === Tokenizer ===
pub use tokenizer::{
    ParsedCsv, align_row, detect_delimiter, normalize_header, parse_csv, tokenize,
};

// === Text Folding ===
pub use fold::{fold_diacritics, fold_lower};

// === Header Resolution ===
pub use resolve::{
    ColumnMatch, HeaderIndex, MATCH_TIERS, MatchStrategy, resolve_column, resolve_columns,
};
