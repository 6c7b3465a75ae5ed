//! Single-month enrollment aggregation.
//!
//! Counts classified rows per [`GroupKey`], producing one month column.

use std::collections::BTreeMap;

use pivot_core::models::{EnrollmentRecord, GroupKey, KeyLayout, MonthlySnapshot};
use pivot_core::period::TargetMonth;

use crate::classifier::{classify, Classification, EmptyReason};

// ── Aggregation ───────────────────────────────────────────────────────────────

/// Result of aggregating one upload.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Nothing to count; not an error.
    Empty(EmptyReason),
    Month(MonthlySnapshot),
}

impl Aggregation {
    pub fn snapshot(&self) -> Option<&MonthlySnapshot> {
        match self {
            Aggregation::Month(s) => Some(s),
            Aggregation::Empty(_) => None,
        }
    }

    pub fn into_snapshot(self) -> Option<MonthlySnapshot> {
        match self {
            Aggregation::Month(s) => Some(s),
            Aggregation::Empty(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot().map_or(true, MonthlySnapshot::is_empty)
    }
}

// ── EnrollmentAggregator ──────────────────────────────────────────────────────

/// Stateless helper that turns decoded records into a [`MonthlySnapshot`].
pub struct EnrollmentAggregator;

impl EnrollmentAggregator {
    /// Count active enrollments per key for `target`.
    ///
    /// When `target` is `None` the month after the newest add-date is used.
    pub fn aggregate(
        records: &[EnrollmentRecord],
        target: Option<TargetMonth>,
        layout: KeyLayout,
    ) -> Aggregation {
        match classify(records, target, layout) {
            Classification::Empty(reason) => Aggregation::Empty(reason),
            Classification::Rows(classified) => Aggregation::Month(MonthlySnapshot {
                month: classified.target,
                layout,
                counts: Self::count_keys(classified.keys),
            }),
        }
    }

    /// One entry per distinct key, valued by its number of occurrences.
    fn count_keys(keys: Vec<GroupKey>) -> BTreeMap<GroupKey, u64> {
        let mut counts: BTreeMap<GroupKey, u64> = BTreeMap::new();
        for key in keys {
            *counts.entry(key).or_insert(0) += 1;
        }
        counts
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
