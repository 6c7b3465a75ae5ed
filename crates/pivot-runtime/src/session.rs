//! Interactive upload session.
//!
//! Holds the snapshot store and the most recently computed table behind one
//! lock, so an upload's store write, pivot rebuild and result update happen
//! as a unit. Downloads serve that last result.

use std::sync::{Mutex, MutexGuard, PoisonError};

use pivot_core::error::{PivotError, Result};
use pivot_core::models::{EnrollmentRecord, KeyLayout, PivotTable};
use pivot_core::period::{parse_target_month, TargetMonth};
use pivot_core::schema::InputSchema;
use pivot_data::aggregator::{Aggregation, EnrollmentAggregator};
use pivot_data::decoder::decode;
use pivot_data::exporter::to_xlsx_bytes;
use pivot_data::pivot::build_pivot;
use pivot_data::reader::read_sheet;
use pivot_data::store::SnapshotStore;

// ── Public types ──────────────────────────────────────────────────────────────

/// What one upload did.
#[derive(Debug, Clone)]
pub struct UploadOutcome {
    /// Month parsed from the filename, or the defaulted month when the name
    /// carried none and the data had add-dates.
    pub target: Option<TargetMonth>,
    pub aggregation: Aggregation,
    /// Whether the month was written to the store.
    pub persisted: bool,
    /// `true` when `result` is the merged pivot, `false` when it is the
    /// single-month fallback.
    pub merged: bool,
    /// The table now served by [`UploadSession::download`].
    pub result: PivotTable,
}

struct SessionState<S> {
    store: S,
    last_result: Option<PivotTable>,
}

// ── UploadSession ─────────────────────────────────────────────────────────────

pub struct UploadSession<S: SnapshotStore> {
    schema: &'static InputSchema,
    layout: KeyLayout,
    state: Mutex<SessionState<S>>,
}

impl<S: SnapshotStore> UploadSession<S> {
    pub fn new(store: S, schema: &'static InputSchema, layout: KeyLayout) -> Self {
        Self {
            schema,
            layout,
            state: Mutex::new(SessionState {
                store,
                last_result: None,
            }),
        }
    }

    /// Decode an uploaded workbook and run it through [`Self::upload_records`].
    pub fn upload(&self, filename: &str, bytes: &[u8]) -> Result<UploadOutcome> {
        let sheet = read_sheet(bytes, self.schema.header_row)?;
        let records = decode(&sheet, self.schema)?;
        self.upload_records(filename, &records)
    }

    /// Aggregate `records` for the month in `filename` and refresh the result.
    ///
    /// The month is stored only when the filename named it and something was
    /// counted. The result is the merged pivot, or this upload's single month
    /// when nothing is stored yet.
    pub fn upload_records(&self, filename: &str, records: &[EnrollmentRecord]) -> Result<UploadOutcome> {
        let parsed = parse_target_month(filename);
        if parsed.is_none() {
            tracing::warn!(%filename, "no _YYMM suffix; month defaults from the data and is not stored");
        }
        let aggregation = EnrollmentAggregator::aggregate(records, parsed, self.layout);
        let target = aggregation.snapshot().map(|s| s.month).or(parsed);

        let mut state = self.lock();
        let mut persisted = false;
        if let (Some(_), Some(snapshot)) = (parsed, aggregation.snapshot()) {
            state.store.save(snapshot)?;
            persisted = true;
        }

        let pivot = build_pivot(&state.store, self.layout)?;
        let (result, merged) = match aggregation.snapshot() {
            Some(snapshot) if pivot.is_empty() => (PivotTable::from_snapshot(snapshot), false),
            _ => (pivot, true),
        };
        state.last_result = Some(result.clone());

        tracing::info!(
            %filename,
            persisted,
            merged,
            rows = result.rows.len(),
            months = result.months.len(),
            "upload processed"
        );
        Ok(UploadOutcome {
            target,
            aggregation,
            persisted,
            merged,
            result,
        })
    }

    /// The table from the most recent upload, if any.
    pub fn last_result(&self) -> Option<PivotTable> {
        self.lock().last_result.clone()
    }

    /// Rebuild the pivot from whatever is stored, without uploading.
    pub fn current_pivot(&self) -> Result<PivotTable> {
        build_pivot(&self.lock().store, self.layout)
    }

    /// The last result as an `.xlsx` workbook.
    ///
    /// Fails with [`PivotError::NoData`] only before the first upload; an
    /// empty last result exports as a header-only sheet.
    pub fn download(&self) -> Result<Vec<u8>> {
        let state = self.lock();
        let table = state.last_result.as_ref().ok_or(PivotError::NoData)?;
        to_xlsx_bytes(table)
    }

    fn lock(&self) -> MutexGuard<'_, SessionState<S>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::ledger_workbook;
    use chrono::NaiveDate;
    use pivot_core::period::MonthLabel;
    use pivot_core::schema::LEDGER_V1;
    use pivot_data::store::{FsSnapshotStore, MemorySnapshotStore};
    use tempfile::TempDir;

    fn session() -> UploadSession<MemorySnapshotStore> {
        UploadSession::new(MemorySnapshotStore::new(), &LEDGER_V1, KeyLayout::Standard)
    }

    fn record(add: &str, grade: i64, teacher: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            add_date: NaiveDate::parse_from_str(add, "%Y-%m-%d").ok(),
            course: "英語".to_string(),
            class_type: "【コア】".to_string(),
            classroom: "本校".to_string(),
            grade_code: Some(grade),
            teacher: teacher.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_download_before_upload_is_no_data() {
        let s = session();
        let err = s.download().unwrap_err();
        assert!(matches!(err, PivotError::NoData));
        assert_eq!(err.to_string(), "集計データなし");
        assert!(s.last_result().is_none());
    }

    #[test]
    fn test_upload_stores_and_merges() {
        let s = session();
        let april = s
            .upload_records("名簿_2504.xlsx", &[record("2025-03-02", 31, "田中")])
            .expect("upload");
        assert!(april.persisted);
        assert!(april.merged);
        assert_eq!(april.target, TargetMonth::new(2025, 4));

        let may = s
            .upload_records(
                "名簿_2505.xlsx",
                &[record("2025-03-02", 31, "田中"), record("2025-04-20", 32, "鈴木")],
            )
            .expect("upload");
        assert_eq!(
            may.result.months,
            vec![MonthLabel::new(4).unwrap(), MonthLabel::new(5).unwrap()]
        );
        assert_eq!(may.result.month_totals(), vec![1, 2]);
        assert_eq!(s.last_result(), Some(may.result));
        assert!(!s.download().expect("download").is_empty());
    }

    #[test]
    fn test_unparseable_name_falls_back_to_single_month() {
        let s = session();
        let outcome = s
            .upload_records("roster.xlsx", &[record("2025-04-20", 31, "田中")])
            .expect("upload");

        assert!(!outcome.persisted);
        assert!(!outcome.merged);
        assert_eq!(outcome.target, TargetMonth::new(2025, 5));
        assert_eq!(outcome.result.months, vec![MonthLabel::new(5).unwrap()]);
        assert!(s.current_pivot().expect("pivot").is_empty());
    }

    #[test]
    fn test_unparseable_name_shows_stored_pivot_when_present() {
        let s = session();
        s.upload_records("名簿_2504.xlsx", &[record("2025-03-02", 31, "田中")])
            .expect("upload");
        let outcome = s
            .upload_records("roster.xlsx", &[record("2025-04-20", 32, "鈴木")])
            .expect("upload");

        assert!(outcome.merged);
        assert_eq!(outcome.result.months, vec![MonthLabel::new(4).unwrap()]);
    }

    #[test]
    fn test_empty_upload_downloads_header_only_sheet() {
        let s = session();
        let outcome = s
            .upload_records("名簿_2505.xlsx", &[record("2025-04-01", 31, "0")])
            .expect("upload");
        assert!(outcome.aggregation.is_empty());
        assert!(!outcome.persisted);
        assert!(outcome.result.is_empty());
        assert!(s.last_result().is_some());

        let exported = s.download().expect("empty result still downloads");
        let sheet = read_sheet(&exported, 0).expect("read");
        assert_eq!(sheet.header_names(), vec!["学年", "教室", "講座名", "M/C", "担当"]);
        assert!(sheet.rows.is_empty());
    }

    #[test]
    fn test_reupload_same_month_replaces() {
        let s = session();
        s.upload_records("名簿_2505.xlsx", &[record("2025-04-01", 31, "田中")])
            .expect("upload");
        let second = s
            .upload_records("名簿_2505_再.xlsx", &[record("2025-04-01", 33, "佐藤")])
            .expect("upload");
        // "_再" breaks the suffix pattern, so this one is a fallback.
        assert!(!second.persisted);

        let third = s
            .upload_records("名簿_2505.xlsx", &[record("2025-04-01", 33, "佐藤")])
            .expect("upload");
        assert_eq!(third.result.rows.len(), 1);
        assert_eq!(third.result.rows[0].key.grade, "高3");
    }

    #[test]
    fn test_upload_workbook_to_fs_store_and_download() {
        let tmp = TempDir::new().expect("tempdir");
        let s = UploadSession::new(FsSnapshotStore::new(tmp.path()), &LEDGER_V1, KeyLayout::Standard);
        let bytes = ledger_workbook(&[
            ("2025-04-01", "", 31, "田中", "英語"),
            ("2025-04-02", "2025-04-15", 31, "田中", "英語"),
        ]);

        let outcome = s.upload("名簿_2505.xlsx", &bytes).expect("upload");
        assert!(outcome.persisted);
        assert_eq!(outcome.result.grand_total(), 1);
        assert!(tmp.path().join("2025-05.csv").exists());

        let exported = s.download().expect("download");
        let sheet = read_sheet(&exported, 0).expect("read");
        assert_eq!(sheet.header_names().last().map(String::as_str), Some("5月"));
    }

    #[test]
    fn test_upload_garbage_is_hard_error() {
        let s = session();
        assert!(matches!(
            s.upload("名簿_2505.xlsx", b"not a workbook"),
            Err(PivotError::Workbook(_))
        ));
    }
}
