//! Active-set filtering and group-key resolution.
//!
//! A record counts toward a target month when it was added on or before the
//! cutoff (last day of the previous month) and was not cancelled by then,
//! its grade code is a senior-high grade, and it has a real teacher.

use std::fmt;

use chrono::NaiveDate;
use pivot_core::models::{EnrollmentRecord, GroupKey, KeyLayout};
use pivot_core::period::TargetMonth;
use tracing::debug;

/// Grade codes that are aggregated, with their display labels.
pub const GRADE_LABELS: [(i64, &str); 3] = [(31, "高1"), (32, "高2"), (33, "高3")];

/// Course-name fragments ("advanced", "high-level") that share names across
/// tracks and therefore get the class type appended.
pub const COURSE_MARKERS: [&str; 2] = ["ｱﾄﾞﾊﾞﾝｽ", "ﾊｲﾚﾍﾞﾙ"];

/// Teacher values meaning "unassigned".
pub const PLACEHOLDER_TEACHERS: [&str; 3] = ["", "0", "-"];

/// Why a classification produced no rows. None of these are errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyReason {
    /// No row carried a parseable add-date.
    NoAddDates,
    /// No row was active as of the cutoff.
    NoActiveRows,
    /// No active row had a target grade code.
    NoTargetGrades,
    /// Every remaining row had a placeholder teacher.
    NoRealTeachers,
}

impl fmt::Display for EmptyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            EmptyReason::NoAddDates => "no add-dates",
            EmptyReason::NoActiveRows => "no active rows",
            EmptyReason::NoTargetGrades => "no rows in target grades",
            EmptyReason::NoRealTeachers => "no rows with a teacher",
        };
        f.write_str(text)
    }
}

/// Keys of the rows that survived every filter.
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    /// The month aggregated (explicit or defaulted).
    pub target: TargetMonth,
    pub cutoff: NaiveDate,
    /// One key per surviving record.
    pub keys: Vec<GroupKey>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Classification {
    Empty(EmptyReason),
    Rows(Classified),
}

/// Display label for a grade code, `None` when outside the target set.
pub fn grade_label(code: i64) -> Option<&'static str> {
    GRADE_LABELS
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, label)| *label)
}

/// `add ≤ cutoff` and not cancelled by the cutoff. A cancellation dated
/// exactly on the cutoff still counts as active.
pub fn is_active(record: &EnrollmentRecord, cutoff: NaiveDate) -> bool {
    let added = record.add_date.is_some_and(|d| d <= cutoff);
    let cancelled = record.cancel_date.is_some_and(|d| d < cutoff);
    added && !cancelled
}

pub fn is_real_teacher(teacher: &str) -> bool {
    !PLACEHOLDER_TEACHERS.contains(&teacher.trim())
}

/// Course name used in the key: marker courses get the class type appended
/// so identically named courses on different tracks stay apart.
pub fn resolve_course(course: &str, class_type: &str) -> String {
    let course = course.trim();
    let class_type = class_type.trim();
    if !class_type.is_empty() && COURSE_MARKERS.iter().any(|m| course.contains(m)) {
        format!("{course}{class_type}")
    } else {
        course.to_string()
    }
}

/// Filter `records` down to the rows counted for `target`.
///
/// When `target` is `None` the month after the newest add-date is used.
pub fn classify(
    records: &[EnrollmentRecord],
    target: Option<TargetMonth>,
    layout: KeyLayout,
) -> Classification {
    let Some(latest) = records.iter().filter_map(|r| r.add_date).max() else {
        return empty(EmptyReason::NoAddDates);
    };
    let target = target.unwrap_or_else(|| TargetMonth::from_date(latest).next());
    let cutoff = target.cutoff();

    let active: Vec<&EnrollmentRecord> = records.iter().filter(|r| is_active(r, cutoff)).collect();
    if active.is_empty() {
        return empty(EmptyReason::NoActiveRows);
    }

    let graded: Vec<(&EnrollmentRecord, &'static str)> = active
        .into_iter()
        .filter_map(|r| r.grade_code.and_then(grade_label).map(|label| (r, label)))
        .collect();
    if graded.is_empty() {
        return empty(EmptyReason::NoTargetGrades);
    }

    let keys: Vec<GroupKey> = graded
        .into_iter()
        .filter(|(r, _)| is_real_teacher(&r.teacher))
        .map(|(r, label)| group_key(r, label, layout))
        .collect();
    if keys.is_empty() {
        return empty(EmptyReason::NoRealTeachers);
    }

    debug!(%target, %cutoff, rows = keys.len(), "classified active enrollments");
    Classification::Rows(Classified {
        target,
        cutoff,
        keys,
    })
}

fn empty(reason: EmptyReason) -> Classification {
    debug!(%reason, "classification produced no rows");
    Classification::Empty(reason)
}

fn group_key(record: &EnrollmentRecord, grade: &str, layout: KeyLayout) -> GroupKey {
    let demographic = |v: &Option<String>| v.as_deref().map(|s| s.trim().to_string());
    GroupKey {
        grade: grade.to_string(),
        classroom: record.classroom.trim().to_string(),
        course: resolve_course(&record.course, &record.class_type),
        class_type: record.class_type.trim().to_string(),
        teacher: record.teacher.trim().to_string(),
        school: demographic(&record.school),
        department: demographic(&record.department),
        gender: demographic(&record.gender),
    }
    .project(layout)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
