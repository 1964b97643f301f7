//! Integration tests for tokenization and header resolution.

use edflow_ingest::{align_row, detect_delimiter, parse_csv, resolve_columns};
use edflow_model::{CsvConfig, FieldSpec};
use proptest::prelude::*;

#[test]
fn semicolon_export_with_quoted_commas() {
    let text = "Atvykimo data;Komentaras;GMP\n\
                2024-01-05 08:10;\"Skausmas, karščiavimas\";Taip\n\
                2024-01-05 09:00;\"a, b\";\n";
    assert_eq!(detect_delimiter(text), b';');

    let parsed = parse_csv(text).expect("parse csv");
    assert_eq!(parsed.headers, vec!["Atvykimo data", "Komentaras", "GMP"]);
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0][1], "Skausmas, karščiavimas");
    assert_eq!(parsed.rows[1][2], "");
}

#[test]
fn doubled_quotes_round_trip_into_cells() {
    let parsed = parse_csv("name,comment\nJonas,\"Labas, \"\"pasauli\"\"\"").expect("parse csv");
    assert_eq!(parsed.headers, vec!["name", "comment"]);
    assert_eq!(
        parsed.rows,
        vec![vec!["Jonas".to_string(), "Labas, \"pasauli\"".to_string()]]
    );
}

#[test]
fn default_visit_fields_resolve_against_lithuanian_export() {
    let parsed = parse_csv(
        "Atvykimo Data;Išrašymo data;GMP;Nukreiptas į padalinį;Numeris\n\
         2024-01-05 08:10;2024-01-05 10:40;Taip;;T-1\n",
    )
    .expect("parse csv");
    let config = CsvConfig::default();
    let columns = resolve_columns(&parsed.headers, &config.field_specs());

    assert_eq!(columns.index("arrival"), Some(0));
    assert_eq!(columns.index("discharge"), Some(1));
    assert_eq!(columns.index("gmp"), Some(2));
    assert_eq!(columns.index("department"), Some(3));
    assert_eq!(columns.index("number"), Some(4));
    assert!(columns.missing_required().is_empty());
    assert_eq!(columns.index("age"), None);
}

#[test]
fn resolution_is_deterministic_for_overlapping_headers() {
    let headers: Vec<String> = ["Data", "Atvykimo data", "Išrašymo data"]
        .iter()
        .map(|h| (*h).to_string())
        .collect();
    let fields = vec![
        FieldSpec::required("arrival", vec!["Atvykimo data".to_string()]),
        FieldSpec::optional("date", vec!["data".to_string()]),
    ];
    let first = resolve_columns(&headers, &fields);
    let second = resolve_columns(&headers, &fields);
    assert_eq!(first, second);
    assert_eq!(first.index("arrival"), Some(1));
    assert_eq!(first.index("date"), Some(0));
}

#[test]
fn ragged_rows_align_to_header_width() {
    let parsed = parse_csv("a|b|c\n1\n1|2|3|4|5\n").expect("parse csv");
    let width = parsed.headers.len();
    let rows: Vec<Vec<String>> = parsed
        .rows
        .into_iter()
        .map(|row| align_row(row, width, parsed.delimiter))
        .collect();
    assert_eq!(rows[0], vec!["1", "", ""]);
    assert_eq!(rows[1], vec!["1", "2", "3|4|5"]);
}

proptest! {
    #[test]
    fn aligned_rows_always_have_header_width(
        cells in proptest::collection::vec("[a-z0-9]{0,4}", 0..12),
        width in 1usize..8,
    ) {
        let aligned = align_row(cells.clone(), width, b';');
        prop_assert_eq!(aligned.len(), width);
        if cells.len() >= width {
            prop_assert_eq!(&aligned[..width - 1], &cells[..width - 1]);
        }
    }

    #[test]
    fn quoted_delimiters_never_win_detection(
        quoted in "[a-z ]{0,6}(,[a-z ]{0,6}){1,4}",
        plain in proptest::collection::vec("[a-z]{1,5}", 2..5),
    ) {
        let line = format!("\"{quoted}\";{}", plain.join(";"));
        prop_assert_eq!(detect_delimiter(&line), b';');
    }
}
