//! Fiscal-year pivot: merges every stored month into one wide table.

use std::collections::{BTreeMap, BTreeSet};

use pivot_core::error::Result;
use pivot_core::models::{GroupKey, KeyLayout, PivotRow, PivotTable};
use pivot_core::period::MonthLabel;
use tracing::{debug, warn};

use crate::store::SnapshotStore;

/// Outer-merge every snapshot in `store` on the key columns of `layout`.
///
/// Missing (key, month) cells are zero. Two stored snapshots with the same
/// month label (e.g. April of two fiscal years) are summed into one column.
/// Snapshots without a recognisable month column are skipped. An empty table
/// means nothing usable was stored.
pub fn build_pivot(store: &dyn SnapshotStore, layout: KeyLayout) -> Result<PivotTable> {
    let mut by_month: BTreeMap<MonthLabel, BTreeMap<GroupKey, u64>> = BTreeMap::new();
    let mut keys: BTreeSet<GroupKey> = BTreeSet::new();

    for snapshot_ref in store.list()? {
        let stored = store.load(&snapshot_ref)?;
        let label = match stored.month_column.as_deref().map(str::parse::<MonthLabel>) {
            Some(Ok(label)) => label,
            Some(Err(e)) => {
                warn!(id = %stored.id, "skipping snapshot: {e}");
                continue;
            }
            None => {
                warn!(id = %stored.id, "skipping snapshot without a month column");
                continue;
            }
        };

        let column = by_month.entry(label).or_default();
        for (key, count) in stored.rows {
            let key = key.project(layout);
            keys.insert(key.clone());
            *column.entry(key).or_insert(0) += count;
        }
    }

    if by_month.is_empty() {
        debug!("no stored snapshots to merge");
        return Ok(PivotTable::empty(layout));
    }

    let months: Vec<MonthLabel> = by_month.keys().copied().collect();
    let rows: Vec<PivotRow> = keys
        .into_iter()
        .map(|key| {
            let counts = by_month
                .values()
                .map(|column| column.get(&key).copied().unwrap_or(0))
                .collect();
            PivotRow { key, counts }
        })
        .collect();

    debug!(months = months.len(), rows = rows.len(), "pivot built");
    Ok(PivotTable {
        layout,
        months,
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
