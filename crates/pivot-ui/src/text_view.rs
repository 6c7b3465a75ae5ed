//! Plain-text pivot rendering for line-oriented output.

use unicode_width::UnicodeWidthStr;

use pivot_core::formatting::format_count;
use pivot_core::models::PivotTable;

use crate::table_view::{column_widths, TOTAL_LABEL};

const COLUMN_GAP: &str = "  ";

/// Render `table` as aligned text: header, rule, data rows, rule, totals.
///
/// Key columns are left-aligned and counts right-aligned, measured in
/// terminal cells so full-width labels line up.
pub fn render_plain(table: &PivotTable) -> String {
    let widths = column_widths(table);
    let key_width = table.layout.columns().len();
    let rule = "-".repeat(widths.iter().sum::<usize>() + COLUMN_GAP.len() * widths.len().saturating_sub(1));

    let mut lines = Vec::with_capacity(table.rows.len() + 4);
    lines.push(format_line(&table.columns(), &widths, key_width));
    lines.push(rule.clone());
    for row in &table.rows {
        let cells: Vec<String> = row
            .key
            .values(table.layout)
            .into_iter()
            .map(str::to_string)
            .chain(row.counts.iter().map(|c| format_count(*c)))
            .collect();
        lines.push(format_line(&cells, &widths, key_width));
    }
    lines.push(rule);

    let mut totals = vec![TOTAL_LABEL.to_string()];
    totals.extend((1..key_width).map(|_| String::new()));
    totals.extend(table.month_totals().into_iter().map(format_count));
    lines.push(format_line(&totals, &widths, key_width));

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn format_line(cells: &[String], widths: &[usize], key_width: usize) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths)
        .enumerate()
        .map(|(i, (cell, width))| {
            let pad = " ".repeat(width.saturating_sub(cell.width()));
            if i < key_width {
                format!("{cell}{pad}")
            } else {
                format!("{pad}{cell}")
            }
        })
        .collect();
    padded.join(COLUMN_GAP).trim_end().to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
