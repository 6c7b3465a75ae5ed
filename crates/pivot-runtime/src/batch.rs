//! One-shot batch run over an input directory.
//!
//! Every dated workbook in the directory is aggregated for the month named
//! in its filename and stored; the stored months are then merged into the
//! fiscal-year pivot and exported. The first hard error aborts the run
//! before anything is exported.

use std::fmt;
use std::path::{Path, PathBuf};

use pivot_core::error::{PivotError, Result};
use pivot_core::models::{KeyLayout, PivotTable};
use pivot_core::period::{parse_target_month, TargetMonth};
use pivot_core::schema::InputSchema;
use pivot_data::aggregator::{Aggregation, EnrollmentAggregator};
use pivot_data::classifier::EmptyReason;
use pivot_data::decoder::decode;
use pivot_data::exporter::write_xlsx;
use pivot_data::pivot::build_pivot;
use pivot_data::reader::{find_workbooks, read_sheet_file};
use pivot_data::store::{FsSnapshotStore, SnapshotStore};

// ── Public types ──────────────────────────────────────────────────────────────

/// Everything a batch run needs.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    pub input_dir: PathBuf,
    /// Where monthly snapshots are stored; cleared at the start of a run.
    pub results_dir: PathBuf,
    pub output_file: PathBuf,
    pub schema: &'static InputSchema,
    pub layout: KeyLayout,
}

/// What happened to one input file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileStatus {
    /// Aggregated and stored.
    Stored { month: TargetMonth, rows: usize },
    /// Nothing to count for this month; nothing stored.
    NoData {
        month: TargetMonth,
        reason: EmptyReason,
    },
    /// The filename carries no `_YYMM.` suffix.
    Skipped { file: String },
}

impl FileStatus {
    pub fn is_stored(&self) -> bool {
        matches!(self, FileStatus::Stored { .. })
    }
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileStatus::Stored { month, rows } => write!(f, "  {month}: {rows} rows"),
            FileStatus::NoData { month, .. } => write!(f, "  {month}: no data"),
            FileStatus::Skipped { file } => write!(f, "  Skipped: {file} (invalid filename)"),
        }
    }
}

/// Summary of a completed run.
#[derive(Debug, Clone)]
pub struct BatchReport {
    pub files: Vec<FileStatus>,
    pub pivot: PivotTable,
    pub output_file: PathBuf,
    /// Size of the exported workbook.
    pub output_bytes: u64,
}

impl BatchReport {
    pub fn processed(&self) -> usize {
        self.files.iter().filter(|s| s.is_stored()).count()
    }
}

#[derive(Debug, Clone)]
pub enum BatchOutcome {
    /// The input directory exists but holds no workbooks. Not a failure.
    NoInputFiles(PathBuf),
    Completed(BatchReport),
}

// ── Runner ────────────────────────────────────────────────────────────────────

/// Run the whole batch, reporting each file's status through `on_status`
/// as soon as it is known.
pub fn run_batch(config: &BatchConfig, mut on_status: impl FnMut(&FileStatus)) -> Result<BatchOutcome> {
    if !config.input_dir.is_dir() {
        return Err(PivotError::InputDirNotFound(config.input_dir.clone()));
    }

    let files = find_workbooks(&config.input_dir);
    if files.is_empty() {
        tracing::warn!(dir = %config.input_dir.display(), "no input workbooks found");
        return Ok(BatchOutcome::NoInputFiles(config.input_dir.clone()));
    }

    let mut store = FsSnapshotStore::new(&config.results_dir);
    let removed = store.clear()?;
    tracing::debug!(removed, "previous results cleared");

    let mut statuses = Vec::with_capacity(files.len());
    for path in &files {
        let status = process_file(config, &mut store, path)?;
        on_status(&status);
        statuses.push(status);
    }

    if !statuses.iter().any(FileStatus::is_stored) {
        return Err(PivotError::NothingProcessed);
    }

    let pivot = build_pivot(&store, config.layout)?;
    if pivot.is_empty() {
        return Err(PivotError::EmptyPivot);
    }
    let output_bytes = write_xlsx(&pivot, &config.output_file)?;

    Ok(BatchOutcome::Completed(BatchReport {
        files: statuses,
        pivot,
        output_file: config.output_file.clone(),
        output_bytes,
    }))
}

/// Process exit status for a batch result.
pub fn exit_code(result: &Result<BatchOutcome>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn process_file(
    config: &BatchConfig,
    store: &mut FsSnapshotStore,
    path: &Path,
) -> Result<FileStatus> {
    let file = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();

    let Some(month) = parse_target_month(&file) else {
        tracing::warn!(%file, "skipping file without a _YYMM suffix");
        return Ok(FileStatus::Skipped { file });
    };

    let status = aggregate_file(config, store, path, month).map_err(|source| PivotError::Batch {
        file: file.clone(),
        month: month.id(),
        source: Box::new(source),
    })?;
    tracing::info!(%file, %month, "{}", status.to_string().trim());
    Ok(status)
}

fn aggregate_file(
    config: &BatchConfig,
    store: &mut FsSnapshotStore,
    path: &Path,
    month: TargetMonth,
) -> Result<FileStatus> {
    let sheet = read_sheet_file(path, config.schema.header_row)?;
    let records = decode(&sheet, config.schema)?;
    match EnrollmentAggregator::aggregate(&records, Some(month), config.layout) {
        Aggregation::Empty(reason) => Ok(FileStatus::NoData { month, reason }),
        Aggregation::Month(snapshot) => {
            store.save(&snapshot)?;
            Ok(FileStatus::Stored {
                month,
                rows: snapshot.len(),
            })
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
