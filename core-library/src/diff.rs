//! Row diff between two scoped result sets.
//!
//! Rows are matched by local key. Rows present in both sets keep their
//! relative order along a longest increasing subsequence of new positions;
//! every other common row is reported as a move.

use crate::observer::StoreChange;
use std::collections::HashMap;

/// Compute the change batch turning `old` into `new`.
///
/// Returns an empty vector when nothing changed, otherwise a batch framed by
/// `WillChange` and `DidChange`.
pub fn diff<E, K, F>(old: &[E], new: &[E], key: F) -> Vec<StoreChange<E>>
where
    E: Clone + PartialEq,
    K: Eq + std::hash::Hash,
    F: Fn(&E) -> K,
{
    let new_index: HashMap<K, usize> = new.iter().enumerate().map(|(i, e)| (key(e), i)).collect();
    let old_index: HashMap<K, usize> = old.iter().enumerate().map(|(i, e)| (key(e), i)).collect();

    let mut changes = Vec::new();

    for (i, row) in old.iter().enumerate().rev() {
        if !new_index.contains_key(&key(row)) {
            changes.push(StoreChange::Delete { index: i });
        }
    }

    for (i, row) in new.iter().enumerate() {
        if !old_index.contains_key(&key(row)) {
            changes.push(StoreChange::Insert {
                index: i,
                value: row.clone(),
            });
        }
    }

    // (old index, new index) of surviving rows, in old order
    let common: Vec<(usize, usize)> = old
        .iter()
        .enumerate()
        .filter_map(|(i, row)| new_index.get(&key(row)).map(|&j| (i, j)))
        .collect();
    let targets: Vec<usize> = common.iter().map(|&(_, j)| j).collect();
    let stable = longest_increasing(&targets);

    let mut updates = Vec::new();
    for (position, &(from, to)) in common.iter().enumerate() {
        if stable[position] {
            if old[from] != new[to] {
                updates.push(StoreChange::Update {
                    index: from,
                    value: new[to].clone(),
                });
            }
        } else {
            changes.push(StoreChange::Move {
                from,
                to,
                value: new[to].clone(),
            });
        }
    }
    changes.extend(updates);

    if changes.is_empty() {
        return changes;
    }
    changes.insert(0, StoreChange::WillChange);
    changes.push(StoreChange::DidChange);
    changes
}

/// Mark the members of one longest strictly increasing subsequence.
fn longest_increasing(values: &[usize]) -> Vec<bool> {
    // tails[k]: index into `values` of the smallest tail of a run of length k+1
    let mut tails: Vec<usize> = Vec::new();
    let mut previous: Vec<Option<usize>> = vec![None; values.len()];

    for (i, &value) in values.iter().enumerate() {
        let slot = tails.partition_point(|&t| values[t] < value);
        previous[i] = if slot > 0 { Some(tails[slot - 1]) } else { None };
        if slot == tails.len() {
            tails.push(i);
        } else {
            tails[slot] = i;
        }
    }

    let mut member = vec![false; values.len()];
    let mut cursor = tails.last().copied();
    while let Some(i) = cursor {
        member[i] = true;
        cursor = previous[i];
    }
    member
}
