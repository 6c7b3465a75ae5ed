//! Workbook discovery and loading.
//!
//! Finds dated enrollment exports in an input directory and decodes the first
//! worksheet of a workbook blob into a [`Sheet`]. The spreadsheet format is
//! handled entirely by `calamine`; nothing past this module sees it.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::{open_workbook_auto_from_rs, Data, Reader};
use pivot_core::error::{PivotError, Result};
use tracing::{debug, warn};

use crate::sheet::{Cell, Sheet};

/// Extensions picked up by batch discovery.
const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx"];

// ── Public API ────────────────────────────────────────────────────────────────

/// Find the workbooks directly inside `dir`, sorted by path.
///
/// Sub-directories are not descended into and lock files left behind by
/// spreadsheet editors (`~$name.xlsx`) are ignored.
pub fn find_workbooks(dir: &Path) -> Vec<PathBuf> {
    if !dir.exists() {
        warn!("Input path does not exist: {}", dir.display());
        return Vec::new();
    }

    let mut files: Vec<PathBuf> = walkdir::WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry.file_type().is_file()
                && !entry.file_name().to_string_lossy().starts_with("~$")
                && entry
                    .path()
                    .extension()
                    .map(|ext| WORKBOOK_EXTENSIONS.iter().any(|w| ext == *w))
                    .unwrap_or(false)
        })
        .map(|entry| entry.into_path())
        .collect();

    files.sort();
    files
}

/// Decode the first worksheet of `bytes`, treating row `header_row`
/// (zero-based) as the header.
pub fn read_sheet(bytes: &[u8], header_row: usize) -> Result<Sheet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| PivotError::Workbook(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| PivotError::Workbook("workbook has no worksheets".to_string()))?
        .map_err(|e| PivotError::Workbook(e.to_string()))?;

    // The used range may start below / right of A1; pad so indices stay
    // absolute.
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let mut grid: Vec<Vec<Cell>> = vec![Vec::new(); start_row as usize];
    for row in range.rows() {
        let mut cells = vec![Cell::Empty; start_col as usize];
        cells.extend(row.iter().map(cell_from_data));
        grid.push(cells);
    }

    let sheet = Sheet::from_grid(grid, header_row);
    debug!(
        rows = sheet.rows.len(),
        columns = sheet.width(),
        header_row,
        "worksheet decoded"
    );
    Ok(sheet)
}

/// Read `path` from disk and decode it with [`read_sheet`].
pub fn read_sheet_file(path: &Path, header_row: usize) -> Result<Sheet> {
    let bytes = std::fs::read(path).map_err(|source| PivotError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    read_sheet(&bytes, header_row)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn cell_from_data(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::String(s) if s.trim().is_empty() => Cell::Empty,
        Data::String(s) => Cell::Text(s.clone()),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::Float(f) => Cell::Number(*f),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(naive) => Cell::Date(naive.date()),
            None => Cell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => {
            let text = Cell::Text(s.clone());
            match text.date() {
                Some(d) => Cell::Date(d),
                None => text,
            }
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
