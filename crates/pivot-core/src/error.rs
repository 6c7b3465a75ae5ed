use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the enrollment pivot crates.
///
/// Soft-empty outcomes (no add-dates, no active rows, nothing stored yet) are
/// never errors; they travel as empty aggregations or empty pivot tables.
#[derive(Error, Debug)]
pub enum PivotError {
    /// A file could not be opened or read from disk.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file could not be written to disk.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The spreadsheet blob could not be opened or has no worksheet.
    #[error("Failed to read workbook: {0}")]
    Workbook(String),

    /// The sheet does not carry the columns the input schema requires.
    #[error("Schema mismatch: {0}")]
    Schema(String),

    /// A stored snapshot could not be encoded or decoded.
    #[error("Snapshot CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// The pivot could not be serialized to a workbook.
    #[error("Failed to export workbook: {0}")]
    Export(String),

    /// A JSON document could not be parsed.
    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// A download was requested before any aggregation ran.
    #[error("集計データなし")]
    NoData,

    /// The batch input directory does not exist.
    #[error("Input directory not found: {0}")]
    InputDirNotFound(PathBuf),

    /// Every input file in a batch run was skipped or empty.
    #[error("No data processed")]
    NothingProcessed,

    /// The pivot built at the end of a batch run has no rows.
    #[error("Failed to generate pivot")]
    EmptyPivot,

    /// Processing one batch input file failed; the run was aborted.
    #[error("Error ({month}) in {file}: {source}")]
    Batch {
        file: String,
        month: String,
        #[source]
        source: Box<PivotError>,
    },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Catch-all for errors from third-party crates via `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Convenience alias used throughout the pivot crates.
pub type Result<T> = std::result::Result<T, PivotError>;
