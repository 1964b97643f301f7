//! CSV tokenization with delimiter detection.

use csv::ReaderBuilder;
use edflow_model::{EngineError, Result};
use tracing::debug;

/// Delimiters considered during detection, in tie-break order.
const DELIMITER_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Tokenized CSV: the header row and the data rows that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCsv {
    pub delimiter: u8,
    /// Normalized header cells.
    pub headers: Vec<String>,
    /// Data rows. Lengths may differ from `headers`.
    pub rows: Vec<Vec<String>>,
}

impl ParsedCsv {
    pub fn delimiter_char(&self) -> char {
        char::from(self.delimiter)
    }
}

/// Normalizes a header cell: BOM removed, trimmed, internal whitespace
/// collapsed to single spaces.
pub fn normalize_header(raw: &str) -> String {
    raw.trim_matches('\u{feff}')
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn normalize_cell(raw: &str) -> String {
    raw.trim().trim_matches('\u{feff}').to_string()
}

/// Counts occurrences of `delimiter` outside quoted spans.
///
/// Like the CSV reader, only a quote at the start of a field opens a quoted
/// span; quotes elsewhere are literal. A doubled quote inside a quoted span
/// is an escaped literal quote.
fn score_delimiter(line: &str, delimiter: u8) -> usize {
    let bytes = line.as_bytes();
    let mut in_quotes = false;
    let mut field_start = true;
    let mut score = 0;
    let mut idx = 0;
    while idx < bytes.len() {
        let byte = bytes[idx];
        if in_quotes {
            if byte == b'"' {
                if bytes.get(idx + 1) == Some(&b'"') {
                    idx += 2;
                    continue;
                }
                in_quotes = false;
            }
        } else if byte == b'"' && field_start {
            in_quotes = true;
        } else if byte == delimiter {
            score += 1;
            field_start = true;
            idx += 1;
            continue;
        }
        field_start = false;
        idx += 1;
    }
    score
}

/// Detects the delimiter from the first non-blank line.
///
/// Falls back to `,` when no candidate occurs outside quotes.
pub fn detect_delimiter(text: &str) -> u8 {
    let Some(line) = text.lines().find(|line| !line.trim().is_empty()) else {
        return b',';
    };
    let mut best = (b',', 0usize);
    for candidate in DELIMITER_CANDIDATES {
        let score = score_delimiter(line, candidate);
        if score > best.1 {
            best = (candidate, score);
        }
    }
    best.0
}

/// Splits text into rows of trimmed cells, dropping fully blank rows.
///
/// Returns the detected delimiter alongside the rows.
pub fn tokenize(text: &str) -> Result<(u8, Vec<Vec<String>>)> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let delimiter = detect_delimiter(text);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| EngineError::Csv {
            message: e.to_string(),
        })?;
        let row: Vec<String> = record.iter().map(normalize_cell).collect();
        if row.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        rows.push(row);
    }
    Ok((delimiter, rows))
}

/// Tokenizes CSV text and splits off the header row.
///
/// Fails with [`EngineError::EmptyInput`] when the text holds no non-blank
/// row. A header without data rows is returned as-is; callers decide whether
/// that is an error.
pub fn parse_csv(text: &str) -> Result<ParsedCsv> {
    if text.trim().trim_matches('\u{feff}').is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let (delimiter, mut rows) = tokenize(text)?;
    if rows.is_empty() {
        return Err(EngineError::EmptyInput);
    }
    let headers = rows
        .remove(0)
        .iter()
        .map(|cell| normalize_header(cell))
        .collect::<Vec<_>>();
    debug!(
        delimiter = %char::from(delimiter).escape_default(),
        columns = headers.len(),
        rows = rows.len(),
        "tokenized CSV"
    );
    Ok(ParsedCsv {
        delimiter,
        headers,
        rows,
    })
}

/// Fits a row to `width` cells.
///
/// Short rows are padded with empty cells; overflow cells are merged into
/// the last column, re-joined with the delimiter.
pub fn align_row(mut row: Vec<String>, width: usize, delimiter: u8) -> Vec<String> {
    if width == 0 {
        return row;
    }
    if row.len() > width {
        let overflow = row.split_off(width - 1);
        row.push(overflow.join(&char::from(delimiter).to_string()));
    } else {
        row.resize(width, String::new());
    }
    row
}
