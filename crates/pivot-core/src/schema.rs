//! Versioned input schemas.
//!
//! Each export variant is described once here: how many leading rows sit
//! above the header and where each field lives. Ledger exports are addressed
//! by zero-based column position; event-log exports by header name. A column
//! reshuffle upstream is a one-line change to the matching table.

use serde::{Deserialize, Serialize};

/// Per-field column locations. `T` is `usize` for positional layouts and
/// `&'static str` for header-name layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns<T> {
    pub add_date: T,
    pub cancel_date: T,
    pub course: T,
    pub class_type: T,
    pub classroom: T,
    pub grade: T,
    pub teacher: T,
    pub gender: Option<T>,
    pub school: Option<T>,
    pub department: Option<T>,
}

impl<T: Copy> Columns<T> {
    /// The seven fields every layout must provide.
    pub fn required(&self) -> [T; 7] {
        [
            self.add_date,
            self.cancel_date,
            self.course,
            self.class_type,
            self.classroom,
            self.grade,
            self.teacher,
        ]
    }
}

/// How a schema addresses its columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnLayout {
    Positional(Columns<usize>),
    Named(Columns<&'static str>),
}

/// One versioned input schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputSchema {
    pub name: &'static str,
    pub version: u32,
    /// Number of rows above the header row.
    pub header_row: usize,
    pub layout: ColumnLayout,
}

/// Enrollment ledger export: three banner rows, header on row 4, columns by
/// position.
pub const LEDGER_V1: InputSchema = InputSchema {
    name: "ledger",
    version: 1,
    header_row: 3,
    layout: ColumnLayout::Positional(Columns {
        add_date: 2,     // C  受講追加日付
        cancel_date: 6,  // G  受講取消日付
        course: 9,       // J  講座名
        class_type: 10,  // K  【マスター】/【コア】
        classroom: 11,   // L  受講教室
        grade: 15,       // P  学年コード
        teacher: 26,     // AA 担当
        gender: Some(17),
        school: Some(18),
        department: Some(28),
    }),
};

/// Event-log export: header on row 1, columns by name.
pub const EVENT_LOG_V1: InputSchema = InputSchema {
    name: "event-log",
    version: 1,
    header_row: 0,
    layout: ColumnLayout::Named(Columns {
        add_date: "受講追加日付",
        cancel_date: "受講取消日付",
        course: "講座名",
        class_type: "M/C",
        classroom: "受講教室",
        grade: "学年コード",
        teacher: "担当",
        gender: Some("性別"),
        school: Some("在籍校"),
        department: Some("学科"),
    }),
};

/// Selects one of the known input schemas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SchemaKind {
    #[default]
    Ledger,
    EventLog,
}

impl SchemaKind {
    pub fn schema(&self) -> &'static InputSchema {
        match self {
            SchemaKind::Ledger => &LEDGER_V1,
            SchemaKind::EventLog => &EVENT_LOG_V1,
        }
    }
}
