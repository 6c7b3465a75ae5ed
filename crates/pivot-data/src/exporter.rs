//! Pivot → `.xlsx` serialization.

use std::path::Path;

use pivot_core::error::{PivotError, Result};
use pivot_core::models::PivotTable;
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use tracing::info;

/// Name of the single worksheet in exported workbooks ("monthly enrollment").
pub const SHEET_NAME: &str = "月次受講人数";

fn export_err(e: XlsxError) -> PivotError {
    PivotError::Export(e.to_string())
}

/// Serialize `table` as a one-sheet workbook: header row, then one row per key.
pub fn to_xlsx_bytes(table: &PivotTable) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME).map_err(export_err)?;

    for (col, name) in table.columns().iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, name, &header_format)
            .map_err(export_err)?;
    }

    let key_width = table.layout.columns().len();
    for (i, row) in table.rows.iter().enumerate() {
        let r = (i + 1) as u32;
        for (col, value) in row.key.values(table.layout).into_iter().enumerate() {
            sheet.write_string(r, col as u16, value).map_err(export_err)?;
        }
        for (j, count) in row.counts.iter().enumerate() {
            sheet
                .write_number(r, (key_width + j) as u16, *count as f64)
                .map_err(export_err)?;
        }
    }

    workbook.save_to_buffer().map_err(export_err)
}

/// Write `table` to `path`, returning the file size in bytes.
pub fn write_xlsx(table: &PivotTable, path: &Path) -> Result<u64> {
    let bytes = to_xlsx_bytes(table)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| PivotError::FileWrite {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    std::fs::write(path, &bytes).map_err(|source| PivotError::FileWrite {
        path: path.to_path_buf(),
        source,
    })?;
    info!(
        path = %path.display(),
        rows = table.rows.len(),
        months = table.months.len(),
        "pivot exported"
    );
    Ok(bytes.len() as u64)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
