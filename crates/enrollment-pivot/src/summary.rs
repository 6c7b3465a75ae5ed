//! End-of-run text for batch mode.

use std::fmt::Write;

use pivot_core::formatting::{format_count, format_kilobytes};
use pivot_runtime::batch::BatchReport;

/// Output path, table shape, file size, per-month totals and grand total.
pub fn format_summary(report: &BatchReport) -> String {
    let table = &report.pivot;
    let mut out = String::new();

    let _ = writeln!(out, "Output: {}", report.output_file.display());
    let _ = writeln!(out, "Rows: {}", format_count(table.rows.len() as u64));
    let _ = writeln!(out, "Columns: {}", table.columns().len());
    let _ = writeln!(out, "Size: {}", format_kilobytes(report.output_bytes));
    let _ = writeln!(out);
    let _ = writeln!(out, "Annual Summary:");
    for (month, total) in table.months.iter().zip(table.month_totals()) {
        let _ = writeln!(out, "  {month}: {}", format_count(total));
    }
    let _ = writeln!(out, "  Total: {}", format_count(table.grand_total()));
    out
}
