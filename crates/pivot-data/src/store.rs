//! Monthly snapshot persistence.
//!
//! [`SnapshotStore`] is a replace-on-write key-value contract keyed by the
//! month identifier (`YYYY-MM`). [`FsSnapshotStore`] keeps one UTF-8 CSV (with
//! BOM, so spreadsheet tools open it correctly) per month; [`MemorySnapshotStore`]
//! backs tests and throwaway sessions.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use pivot_core::error::{PivotError, Result};
use pivot_core::models::{GroupKey, KeyLayout, MonthlySnapshot, StoredSnapshot};
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
const SNAPSHOT_EXTENSION: &str = "csv";

/// Handle to one stored month.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnapshotRef {
    pub id: String,
}

/// Storage for monthly snapshots. Single writer; no internal locking.
pub trait SnapshotStore {
    /// Store `snapshot` under its month id, replacing any previous one.
    fn save(&mut self, snapshot: &MonthlySnapshot) -> Result<()>;

    /// All stored months, sorted by id.
    fn list(&self) -> Result<Vec<SnapshotRef>>;

    /// Read one stored month back.
    fn load(&self, snapshot: &SnapshotRef) -> Result<StoredSnapshot>;

    /// Remove every stored month, returning how many were removed.
    fn clear(&mut self) -> Result<usize>;
}

// ── FsSnapshotStore ───────────────────────────────────────────────────────────

/// One `YYYY-MM.csv` per month inside `dir`.
#[derive(Debug, Clone)]
pub struct FsSnapshotStore {
    dir: PathBuf,
}

impl FsSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.{SNAPSHOT_EXTENSION}"))
    }

    fn write_csv(path: &Path, snapshot: &MonthlySnapshot) -> Result<()> {
        let mut file = File::create(path).map_err(|source| PivotError::FileWrite {
            path: path.to_path_buf(),
            source,
        })?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(snapshot.columns())?;
        for (key, count) in &snapshot.counts {
            let mut record: Vec<String> = key
                .values(snapshot.layout)
                .into_iter()
                .map(str::to_string)
                .collect();
            record.push(count.to_string());
            writer.write_record(&record)?;
        }
        writer.flush()?;
        Ok(())
    }
}

impl SnapshotStore for FsSnapshotStore {
    fn save(&mut self, snapshot: &MonthlySnapshot) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| PivotError::FileWrite {
            path: self.dir.clone(),
            source,
        })?;

        let id = snapshot.month.id();
        let path = self.path_for(&id);
        let tmp = path.with_extension("csv.tmp");

        if let Err(e) = Self::write_csv(&tmp, snapshot) {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
        std::fs::rename(&tmp, &path).map_err(|source| PivotError::FileWrite {
            path: path.clone(),
            source,
        })?;

        debug!(%id, rows = snapshot.len(), path = %path.display(), "snapshot saved");
        Ok(())
    }

    fn list(&self) -> Result<Vec<SnapshotRef>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(&self.dir).map_err(|source| PivotError::FileRead {
            path: self.dir.clone(),
            source,
        })?;

        let mut refs: Vec<SnapshotRef> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.is_file()
                    && path
                        .extension()
                        .map(|ext| ext == SNAPSHOT_EXTENSION)
                        .unwrap_or(false)
            })
            .filter_map(|path| {
                path.file_stem()
                    .map(|stem| stem.to_string_lossy().to_string())
            })
            .map(|id| SnapshotRef { id })
            .collect();
        refs.sort();
        Ok(refs)
    }

    fn load(&self, snapshot: &SnapshotRef) -> Result<StoredSnapshot> {
        let path = self.path_for(&snapshot.id);
        let file = File::open(&path).map_err(|source| PivotError::FileRead {
            path: path.clone(),
            source,
        })?;
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_reader(file);

        let headers: Vec<String> = reader
            .headers()?
            .iter()
            .enumerate()
            .map(|(i, h)| {
                let h = if i == 0 { h.trim_start_matches('\u{feff}') } else { h };
                h.trim().to_string()
            })
            .collect();

        let month_col = headers.iter().position(|h| !KeyLayout::is_key_column(h));

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            let mut key = GroupKey::default();
            for (i, name) in headers.iter().enumerate() {
                if Some(i) != month_col {
                    key.set_column(name, record.get(i).unwrap_or("").to_string());
                }
            }
            let count = month_col
                .and_then(|i| record.get(i))
                .map(parse_count)
                .unwrap_or(0);
            rows.push((key, count));
        }

        debug!(id = %snapshot.id, rows = rows.len(), "snapshot loaded");
        Ok(StoredSnapshot {
            id: snapshot.id.clone(),
            month_column: month_col.map(|i| headers[i].clone()),
            rows,
        })
    }

    fn clear(&mut self) -> Result<usize> {
        let refs = self.list()?;
        for r in &refs {
            let path = self.path_for(&r.id);
            std::fs::remove_file(&path).map_err(|source| PivotError::FileWrite {
                path: path.clone(),
                source,
            })?;
        }
        debug!(removed = refs.len(), dir = %self.dir.display(), "snapshot store cleared");
        Ok(refs.len())
    }
}

/// Stored counts are read leniently: blanks, garbage and negatives become 0,
/// and `"5.0"` reads as 5.
fn parse_count(raw: &str) -> u64 {
    let raw = raw.trim();
    raw.parse::<u64>().ok().unwrap_or_else(|| {
        raw.parse::<f64>()
            .ok()
            .filter(|f| f.is_finite() && *f > 0.0)
            .map(|f| f.trunc() as u64)
            .unwrap_or(0)
    })
}

// ── MemorySnapshotStore ───────────────────────────────────────────────────────

/// In-memory store; artifacts live as long as the value.
#[derive(Debug, Clone, Default)]
pub struct MemorySnapshotStore {
    snapshots: BTreeMap<String, StoredSnapshot>,
}

impl MemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put an already-shaped artifact in place, bypassing [`SnapshotStore::save`].
    pub fn insert(&mut self, snapshot: StoredSnapshot) {
        self.snapshots.insert(snapshot.id.clone(), snapshot);
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn save(&mut self, snapshot: &MonthlySnapshot) -> Result<()> {
        self.insert(StoredSnapshot::from(snapshot));
        Ok(())
    }

    fn list(&self) -> Result<Vec<SnapshotRef>> {
        Ok(self
            .snapshots
            .keys()
            .map(|id| SnapshotRef { id: id.clone() })
            .collect())
    }

    fn load(&self, snapshot: &SnapshotRef) -> Result<StoredSnapshot> {
        self.snapshots
            .get(&snapshot.id)
            .cloned()
            .ok_or_else(|| PivotError::FileRead {
                path: PathBuf::from(format!("{}.{SNAPSHOT_EXTENSION}", snapshot.id)),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no stored snapshot"),
            })
    }

    fn clear(&mut self) -> Result<usize> {
        let n = self.snapshots.len();
        self.snapshots.clear();
        Ok(n)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pivot_core::period::TargetMonth;
    use tempfile::TempDir;

    fn key(grade: &str, teacher: &str) -> GroupKey {
        GroupKey {
            grade: grade.to_string(),
            classroom: "本校".to_string(),
            course: "英語, 長文".to_string(),
            class_type: "【コア】".to_string(),
            teacher: teacher.to_string(),
            ..Default::default()
        }
    }

    fn snapshot(year: i32, month: u32, counts: &[(GroupKey, u64)]) -> MonthlySnapshot {
        MonthlySnapshot {
            month: TargetMonth::new(year, month).unwrap(),
            layout: KeyLayout::Standard,
            counts: counts.iter().cloned().collect(),
        }
    }

    #[test]
    fn test_fs_save_writes_bom_and_header() {
        let tmp = TempDir::new().expect("tempdir");
        let mut store = FsSnapshotStore::new(tmp.path().join("results"));
        store
            .save(&snapshot(2025, 5, &[(key("高1", "田中"), 3)]))
            .expect("save");

        let bytes = std::fs::read(tmp.path().join("results").join("2025-05.csv")).unwrap();
        assert!(bytes.starts_with(UTF8_BOM));
        let text = String::from_utf8(bytes[UTF8_BOM.len()..].to_vec()).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("学年,教室,講座名,M/C,担当,5月"));
        assert_eq!(lines.next(), Some("高1,本校,\"英語, 長文\",【コア】,田中,3"));
    }

    #[test]
    fn test_fs_round_trip_and_list() {
        let tmp = TempDir::new().expect("tempdir");
        let mut store = FsSnapshotStore::new(tmp.path());
        store
            .save(&snapshot(2025, 5, &[(key("高1", "田中"), 3), (key("高2", "鈴木"), 1)]))
            .expect("save");
        store
            .save(&snapshot(2025, 4, &[(key("高1", "田中"), 2)]))
            .expect("save");

        let refs = store.list().expect("list");
        let ids: Vec<&str> = refs.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["2025-04", "2025-05"]);

        let loaded = store.load(&refs[1]).expect("load");
        assert_eq!(loaded.month_column.as_deref(), Some("5月"));
        assert_eq!(loaded.rows, vec![(key("高1", "田中"), 3), (key("高2", "鈴木"), 1)]);
    }

    #[test]
    fn test_fs_save_replaces_same_month() {
        let tmp = TempDir::new().expect("tempdir");
        let mut store = FsSnapshotStore::new(tmp.path());
        store
            .save(&snapshot(2025, 5, &[(key("高1", "田中"), 3)]))
            .expect("save");
        store
            .save(&snapshot(2025, 5, &[(key("高3", "佐藤"), 7)]))
            .expect("save");

        let refs = store.list().expect("list");
        assert_eq!(refs.len(), 1);
        let loaded = store.load(&refs[0]).expect("load");
        assert_eq!(loaded.rows, vec![(key("高3", "佐藤"), 7)]);
        assert!(!tmp.path().join("2025-05.csv.tmp").exists());
    }

    #[test]
    fn test_fs_load_treats_bad_counts_as_zero() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(
            tmp.path().join("2025-06.csv"),
            "\u{feff}学年,教室,講座名,M/C,担当,6月\n\
             高1,本校,英語,,田中,\n\
             高2,本校,英語,,鈴木,abc\n\
             高3,本校,英語,,佐藤,4.0\n\
             高3,駅前,英語,,佐藤,-2\n",
        )
        .unwrap();

        let store = FsSnapshotStore::new(tmp.path());
        let loaded = store
            .load(&SnapshotRef {
                id: "2025-06".to_string(),
            })
            .expect("load");
        let counts: Vec<u64> = loaded.rows.iter().map(|(_, c)| *c).collect();
        assert_eq!(counts, vec![0, 0, 4, 0]);
        assert_eq!(loaded.month_column.as_deref(), Some("6月"));
        assert_eq!(loaded.rows[0].0.grade, "高1");
    }

    #[test]
    fn test_fs_load_without_month_column() {
        let tmp = TempDir::new().expect("tempdir");
        std::fs::write(tmp.path().join("2025-07.csv"), "学年,教室,講座名,M/C,担当\n高1,本校,英語,,田中\n").unwrap();
        let store = FsSnapshotStore::new(tmp.path());
        let loaded = store
            .load(&SnapshotRef {
                id: "2025-07".to_string(),
            })
            .expect("load");
        assert_eq!(loaded.month_column, None);
    }

    #[test]
    fn test_fs_list_missing_dir_and_clear() {
        let tmp = TempDir::new().expect("tempdir");
        let mut store = FsSnapshotStore::new(tmp.path().join("never-created"));
        assert!(store.list().expect("list").is_empty());

        store
            .save(&snapshot(2025, 4, &[(key("高1", "田中"), 1)]))
            .expect("save");
        store
            .save(&snapshot(2025, 5, &[(key("高1", "田中"), 1)]))
            .expect("save");
        std::fs::write(store.dir().join("README.txt"), "keep me").unwrap();

        assert_eq!(store.clear().expect("clear"), 2);
        assert!(store.list().expect("list").is_empty());
        assert!(store.dir().join("README.txt").exists());
    }

    #[test]
    fn test_memory_store_contract() {
        let mut store = MemorySnapshotStore::new();
        store
            .save(&snapshot(2025, 5, &[(key("高1", "田中"), 3)]))
            .expect("save");
        store
            .save(&snapshot(2025, 5, &[(key("高2", "鈴木"), 1)]))
            .expect("save");

        let refs = store.list().expect("list");
        assert_eq!(refs.len(), 1);
        let loaded = store.load(&refs[0]).expect("load");
        assert_eq!(loaded.rows, vec![(key("高2", "鈴木"), 1)]);

        assert_eq!(store.clear().expect("clear"), 1);
    }

    #[test]
    fn test_missing_id_is_not_found_in_both_stores() {
        let tmp = TempDir::new().expect("tempdir");
        let missing = SnapshotRef {
            id: "2030-01".to_string(),
        };
        let stores: [Box<dyn SnapshotStore>; 2] = [
            Box::new(MemorySnapshotStore::new()),
            Box::new(FsSnapshotStore::new(tmp.path())),
        ];
        for store in &stores {
            match store.load(&missing) {
                Err(PivotError::FileRead { path, source }) => {
                    assert!(path.ends_with("2030-01.csv"));
                    assert_eq!(source.kind(), std::io::ErrorKind::NotFound);
                }
                other => panic!("expected FileRead, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("12"), 12);
        assert_eq!(parse_count(" 7 "), 7);
        assert_eq!(parse_count("3.0"), 3);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(parse_count("-1"), 0);
    }
}
