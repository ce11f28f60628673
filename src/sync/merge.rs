//! Operation Merge
//!
//! Pure functions over operation lists. Merging is idempotent: applying the
//! same or overlapping pages again never changes the resulting id set.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use crate::types::Operation;

/// Newest first: date, then block height, then id (all descending)
pub fn compare_operations(a: &Operation, b: &Operation) -> Ordering {
    b.date
        .cmp(&a.date)
        .then_with(|| b.block_height.cmp(&a.block_height))
        .then_with(|| b.id.cmp(&a.id))
}

/// Union of known and fetched operations, unique by id.
///
/// A fetched operation replaces a known one with the same id since it
/// carries the latest confirmation state.
pub fn merge_operations(existing: &[Operation], fetched: Vec<Operation>) -> Vec<Operation> {
    let mut by_id: HashMap<String, Operation> = HashMap::with_capacity(existing.len() + fetched.len());
    for op in existing {
        by_id.insert(op.id.clone(), op.clone());
    }
    for op in fetched {
        by_id.insert(op.id.clone(), op);
    }

    let mut merged: Vec<Operation> = by_id.into_values().collect();
    merged.sort_by(compare_operations);
    merged
}

/// Pending operations still awaiting confirmation.
///
/// Drops those whose id now appears among confirmed operations, and those
/// whose sequence number the chain has already consumed.
pub fn reconcile_pending(pending: &[Operation], confirmed: &[Operation], confirmed_nonce: u64) -> Vec<Operation> {
    let confirmed_ids: HashSet<&str> = confirmed.iter().map(|op| op.id.as_str()).collect();
    pending
        .iter()
        .filter(|op| !confirmed_ids.contains(op.id.as_str()))
        .filter(|op| match op.transaction_sequence_number {
            Some(seq) => seq >= confirmed_nonce,
            None => true,
        })
        .cloned()
        .collect()
}

/// Next usable sequence number:
/// `max(confirmed_nonce, 1 + max(pending sequence numbers))`
pub fn next_nonce(confirmed_nonce: u64, pending: &[Operation]) -> u64 {
    let after_pending = pending
        .iter()
        .filter_map(|op| op.transaction_sequence_number)
        .max()
        .map_or(0, |seq| seq + 1);
    confirmed_nonce.max(after_pending)
}

/// Highest block height among confirmed operations
pub fn highest_block_height(operations: &[Operation]) -> Option<u64> {
    operations.iter().filter_map(|op| op.block_height).max()
}
