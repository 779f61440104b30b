//! Binomial count tables.
//!
//! Trials are grouped by an explicit composite key into a `BTreeMap`, so the
//! emitted order is fixed by the key ordering alone:
//!
//! - participant id (natural order, individual level only)
//! - condition (natural order)
//! - stimulus level `x` (ascending)
//!
//! Keys compare exactly: two x values that differ in the last bit form two cells.

use std::collections::BTreeMap;

use crate::domain::{GroupCell, GroupKey, Level, TrialRecord};

/// All cells of one fitting unit, in ascending x order.
#[derive(Debug, Clone, PartialEq)]
pub struct CellGroup {
    pub key: GroupKey,
    pub cells: Vec<GroupCell>,
}

impl CellGroup {
    pub fn n_trials(&self) -> u64 {
        self.cells.iter().map(GroupCell::n).sum()
    }
}

/// Per-(id, condition, x) counts.
pub fn aggregate_individual(trials: &[TrialRecord]) -> Vec<GroupCell> {
    aggregate_by(trials, |t| GroupKey::individual(t.id.clone(), t.condition.clone()))
}

/// Per-(condition, x) counts, pooled across participants.
pub fn aggregate_group(trials: &[TrialRecord]) -> Vec<GroupCell> {
    aggregate_by(trials, |t| GroupKey::group(t.condition.clone()))
}

fn aggregate_by<F>(trials: &[TrialRecord], key_of: F) -> Vec<GroupCell>
where
    F: Fn(&TrialRecord) -> GroupKey,
{
    let mut counts: BTreeMap<(GroupKey, Level), (u64, u64)> = BTreeMap::new();
    for t in trials {
        let entry = counts.entry((key_of(t), t.x)).or_insert((0, 0));
        if t.y {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    counts
        .into_iter()
        .map(|((key, x), (ones, zeros))| GroupCell { key, x, ones, zeros })
        .collect()
}

/// Partition cells into fitting units.
///
/// Output order follows `GroupKey` ordering; cells inside a group are sorted by x.
pub fn group_cells(cells: &[GroupCell]) -> Vec<CellGroup> {
    let mut groups: BTreeMap<GroupKey, Vec<GroupCell>> = BTreeMap::new();
    for c in cells {
        groups.entry(c.key.clone()).or_default().push(c.clone());
    }

    groups
        .into_iter()
        .map(|(key, mut cells)| {
            cells.sort_by(|a, b| a.x.cmp(&b.x));
            CellGroup { key, cells }
        })
        .collect()
}
