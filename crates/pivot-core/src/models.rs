use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::period::{MonthLabel, TargetMonth};

/// Canonical group-key column names, in output order.
pub const KEY_COLS: [&str; 5] = ["学年", "教室", "講座名", "M/C", "担当"];

/// Key columns appended by the extended (demographic) layout.
pub const DEMOGRAPHIC_COLS: [&str; 3] = ["在籍校", "学科", "性別"];

/// One enrollment row decoded from an input sheet.
///
/// Malformed cells are coerced at decode time: unparseable dates and
/// non-numeric grade codes become `None`, text fields are trimmed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentRecord {
    /// Date the enrollment was added.
    pub add_date: Option<NaiveDate>,
    /// Date the enrollment was cancelled, if it was.
    pub cancel_date: Option<NaiveDate>,
    /// Raw course name.
    pub course: String,
    /// Track marker such as `【マスター】` or `【コア】`.
    pub class_type: String,
    /// Classroom the student attends.
    pub classroom: String,
    /// Numeric grade code (31–33 for senior high).
    pub grade_code: Option<i64>,
    /// Assigned teacher; placeholders like `0` or `-` are kept as-is here.
    pub teacher: String,
    pub gender: Option<String>,
    pub school: Option<String>,
    pub department: Option<String>,
}

/// Which columns make up a [`GroupKey`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyLayout {
    /// `学年, 教室, 講座名, M/C, 担当`.
    #[default]
    Standard,
    /// Standard columns followed by `在籍校, 学科, 性別`.
    Extended,
}

impl KeyLayout {
    /// Column names in output order.
    pub fn columns(&self) -> Vec<&'static str> {
        match self {
            KeyLayout::Standard => KEY_COLS.to_vec(),
            KeyLayout::Extended => KEY_COLS.iter().chain(DEMOGRAPHIC_COLS.iter()).copied().collect(),
        }
    }

    /// `true` when `name` is a key column of *any* layout.
    pub fn is_key_column(name: &str) -> bool {
        KEY_COLS.contains(&name) || DEMOGRAPHIC_COLS.contains(&name)
    }
}

/// One aggregation bucket. Field order is the sort order of pivot rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupKey {
    /// Grade label, e.g. `高1`.
    pub grade: String,
    pub classroom: String,
    /// Course name after track disambiguation.
    pub course: String,
    pub class_type: String,
    pub teacher: String,
    pub school: Option<String>,
    pub department: Option<String>,
    pub gender: Option<String>,
}

impl GroupKey {
    /// Cell values in the order of `layout.columns()`.
    pub fn values(&self, layout: KeyLayout) -> Vec<&str> {
        let mut out = vec![
            self.grade.as_str(),
            self.classroom.as_str(),
            self.course.as_str(),
            self.class_type.as_str(),
            self.teacher.as_str(),
        ];
        if layout == KeyLayout::Extended {
            for field in [&self.school, &self.department, &self.gender] {
                out.push(field.as_deref().unwrap_or(""));
            }
        }
        out
    }

    /// Set the field stored under column `name`. Unknown names are ignored.
    pub fn set_column(&mut self, name: &str, value: String) {
        match name {
            "学年" => self.grade = value,
            "教室" => self.classroom = value,
            "講座名" => self.course = value,
            "M/C" => self.class_type = value,
            "担当" => self.teacher = value,
            "在籍校" => self.school = Some(value),
            "学科" => self.department = Some(value),
            "性別" => self.gender = Some(value),
            _ => {}
        }
    }

    /// Normalise the key to `layout` so keys from differently-shaped
    /// snapshots compare equal when their visible columns match.
    pub fn project(self, layout: KeyLayout) -> Self {
        match layout {
            KeyLayout::Standard => Self {
                school: None,
                department: None,
                gender: None,
                ..self
            },
            KeyLayout::Extended => Self {
                school: Some(self.school.unwrap_or_default()),
                department: Some(self.department.unwrap_or_default()),
                gender: Some(self.gender.unwrap_or_default()),
                ..self
            },
        }
    }
}

/// Active-enrollment counts per key for one target month.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthlySnapshot {
    pub month: TargetMonth,
    pub layout: KeyLayout,
    pub counts: BTreeMap<GroupKey, u64>,
}

impl MonthlySnapshot {
    /// Month-column name, e.g. `5月`.
    pub fn label(&self) -> MonthLabel {
        self.month.label()
    }

    /// Header row: key columns followed by the month column.
    pub fn columns(&self) -> Vec<String> {
        let mut cols: Vec<String> = self.layout.columns().iter().map(|c| c.to_string()).collect();
        cols.push(self.label().to_string());
        cols
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// A snapshot as read back from a store, before the merger interprets it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StoredSnapshot {
    /// Store identifier, normally `YYYY-MM`.
    pub id: String,
    /// The first non-key column name, if the artifact has one.
    pub month_column: Option<String>,
    pub rows: Vec<(GroupKey, u64)>,
}

impl From<&MonthlySnapshot> for StoredSnapshot {
    fn from(snapshot: &MonthlySnapshot) -> Self {
        Self {
            id: snapshot.month.id(),
            month_column: Some(snapshot.label().to_string()),
            rows: snapshot
                .counts
                .iter()
                .map(|(key, count)| (key.clone(), *count))
                .collect(),
        }
    }
}

/// One row of the merged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotRow {
    pub key: GroupKey,
    /// One count per entry of [`PivotTable::months`].
    pub counts: Vec<u64>,
}

/// Wide table: key columns plus one count column per month, fiscal order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PivotTable {
    pub layout: KeyLayout,
    pub months: Vec<MonthLabel>,
    pub rows: Vec<PivotRow>,
}

impl PivotTable {
    /// Zero rows and zero month columns: "nothing stored yet".
    pub fn empty(layout: KeyLayout) -> Self {
        Self {
            layout,
            months: Vec::new(),
            rows: Vec::new(),
        }
    }

    /// View a single month's result as a one-column table.
    pub fn from_snapshot(snapshot: &MonthlySnapshot) -> Self {
        Self {
            layout: snapshot.layout,
            months: vec![snapshot.label()],
            rows: snapshot
                .counts
                .iter()
                .map(|(key, count)| PivotRow {
                    key: key.clone(),
                    counts: vec![*count],
                })
                .collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row: key columns then month labels.
    pub fn columns(&self) -> Vec<String> {
        self.layout
            .columns()
            .iter()
            .map(|c| c.to_string())
            .chain(self.months.iter().map(|m| m.to_string()))
            .collect()
    }

    /// Count for `key` in `month`, `None` if either is absent.
    pub fn count(&self, key: &GroupKey, month: MonthLabel) -> Option<u64> {
        let col = self.months.iter().position(|m| *m == month)?;
        self.rows
            .iter()
            .find(|row| &row.key == key)
            .and_then(|row| row.counts.get(col).copied())
    }

    /// Column sums, aligned with `months`.
    pub fn month_totals(&self) -> Vec<u64> {
        (0..self.months.len())
            .map(|i| self.rows.iter().map(|row| row.counts[i]).sum())
            .collect()
    }

    pub fn grand_total(&self) -> u64 {
        self.month_totals().iter().sum()
    }
}
