use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL_CONDENSED;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};

use edflow_model::{DailyStatsBucket, DispositionShare, EdSummary, LegacySummary, SnapshotSummary};
use edflow_transform::{EdTransformResult, VisitTransformResult};

pub fn print_visit_summary(result: &VisitTransformResult, days: usize) {
    println!(
        "Records: {}  Shift days: {}",
        result.records.len(),
        result.daily_stats.len()
    );
    if result.daily_stats.is_empty() {
        return;
    }
    println!("{}", daily_table(&result.daily_stats, days));
}

fn daily_table(buckets: &[DailyStatsBucket], days: usize) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Shift day"),
        header_cell("Visits"),
        header_cell("Night"),
        header_cell("EMS"),
        header_cell("Hospitalized"),
        header_cell("Discharged"),
        header_cell("Avg stay (h)"),
        header_cell("Avg hosp. stay (h)"),
    ]);
    apply_table_style(&mut table);
    for index in 1..=7 {
        align_column(&mut table, index, CellAlignment::Right);
    }
    let start = buckets.len().saturating_sub(days.max(1));
    for bucket in &buckets[start..] {
        table.add_row(vec![
            Cell::new(&bucket.date),
            Cell::new(bucket.count),
            Cell::new(bucket.night),
            Cell::new(bucket.ems),
            Cell::new(bucket.hospitalized),
            Cell::new(bucket.discharged),
            hours_cell(bucket.avg_time()),
            hours_cell(bucket.avg_hospitalized_time()),
        ]);
    }
    table
}

pub fn print_ed_summary(result: &EdTransformResult) {
    println!(
        "Rows: {}  Shape: {:?}",
        result.records.len(),
        result.meta.shape
    );
    match &result.summary {
        EdSummary::Legacy(legacy) => print_legacy(legacy),
        EdSummary::Snapshot(snapshot) => print_snapshot(snapshot),
        EdSummary::Hybrid { legacy, snapshot } => {
            print_legacy(legacy);
            print_snapshot(snapshot);
        }
    }
}

fn print_legacy(summary: &LegacySummary) {
    let mut table = key_value_table();
    table.add_row(vec![Cell::new("Total patients"), Cell::new(summary.total_patients)]);
    table.add_row(vec![Cell::new("Shift days"), Cell::new(summary.unique_days)]);
    table.add_row(vec![Cell::new("Patients per day"), number_cell(summary.avg_per_day)]);
    table.add_row(vec![
        Cell::new("Latest month"),
        summary
            .latest_month
            .as_deref()
            .map_or_else(|| dim_cell("-"), Cell::new),
    ]);
    table.add_row(vec![
        Cell::new("Lab turnaround (min)"),
        number_cell(summary.latest_month_avg_lab_minutes),
    ]);
    println!("{table}");
    if !summary.dispositions.is_empty() {
        println!("{}", disposition_table(&summary.dispositions));
    }
}

fn disposition_table(shares: &[DispositionShare]) -> Table {
    let mut table = Table::new();
    table.set_header(vec![
        header_cell("Disposition"),
        header_cell("Patients"),
        header_cell("Share"),
    ]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    align_column(&mut table, 2, CellAlignment::Right);
    for share in shares {
        table.add_row(vec![
            Cell::new(share.category.as_str()),
            Cell::new(share.count),
            Cell::new(format!("{:.1}%", share.share * 100.0)),
        ]);
    }
    table
}

fn print_snapshot(summary: &SnapshotSummary) {
    let mut table = key_value_table();
    table.add_row(vec![
        Cell::new("Latest reading"),
        summary
            .latest_timestamp
            .map_or_else(|| dim_cell("-"), |ts| Cell::new(ts.format("%Y-%m-%d %H:%M"))),
    ]);
    table.add_row(vec![Cell::new("Current patients"), number_cell(summary.current_patients)]);
    table.add_row(vec![Cell::new("Occupied beds"), number_cell(summary.occupied_beds)]);
    table.add_row(vec![Cell::new("Patients per nurse"), number_cell(summary.nurse_ratio)]);
    table.add_row(vec![Cell::new("Patients per doctor"), number_cell(summary.doctor_ratio)]);
    for category in &summary.categories {
        let share = category
            .share
            .map(|share| format!(" ({:.0}%)", share * 100.0))
            .unwrap_or_default();
        let value = category
            .count
            .map_or_else(|| dim_cell("-"), |count| Cell::new(format!("{count}{share}")));
        table.add_row(vec![Cell::new(format!("Category {}", category.category)), value]);
    }
    table.add_row(vec![Cell::new("Readings"), Cell::new(summary.readings)]);
    println!("{table}");
}

fn key_value_table() -> Table {
    let mut table = Table::new();
    table.set_header(vec![header_cell("Metric"), header_cell("Value")]);
    apply_table_style(&mut table);
    align_column(&mut table, 1, CellAlignment::Right);
    table
}

fn apply_table_style(table: &mut Table) {
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
}

fn align_column(table: &mut Table, index: usize, alignment: CellAlignment) {
    if let Some(column) = table.column_mut(index) {
        column.set_cell_alignment(alignment);
    }
}

fn header_cell(label: &str) -> Cell {
    Cell::new(label)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

fn hours_cell(hours: Option<f64>) -> Cell {
    hours.map_or_else(|| dim_cell("-"), |hours| Cell::new(format!("{hours:.2}")))
}

fn number_cell(value: Option<f64>) -> Cell {
    match value {
        Some(value) if value.is_finite() => Cell::new(format_number(value)),
        _ => dim_cell("-"),
    }
}

/// Whole numbers without decimals, everything else with one.
fn format_number(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.0}")
    } else {
        format!("{value:.1}")
    }
}

fn dim_cell<T: ToString>(value: T) -> Cell {
    Cell::new(value.to_string()).add_attribute(Attribute::Dim)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_drop_trailing_zero_decimals() {
        assert_eq!(format_number(24.0), "24");
        assert_eq!(format_number(3.26), "3.3");
    }

    #[test]
    fn daily_table_keeps_latest_days() {
        let buckets: Vec<_> = ["2024-01-03", "2024-01-04", "2024-01-05"]
            .into_iter()
            .map(DailyStatsBucket::new)
            .collect();
        let rendered = daily_table(&buckets, 2).to_string();
        assert!(!rendered.contains("2024-01-03"));
        assert!(rendered.contains("2024-01-04"));
        assert!(rendered.contains("2024-01-05"));
    }
}
