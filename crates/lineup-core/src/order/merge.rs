//! Merge a previously saved ordering with the authoritative current key set.
//!
//! Saved keys keep their relative order; keys that disappeared are dropped;
//! keys never seen before are appended in lexicographic order. The result is
//! always a permutation of the current set.

use std::collections::{BTreeSet, HashSet};

use super::OrderList;

/// Counts describing what a merge changed, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// Saved keys still present and kept in place.
    pub retained: usize,
    /// Saved keys no longer present (or repeated) and dropped.
    pub dropped: usize,
    /// Current keys absent from the saved list and appended.
    pub appended: usize,
}

/// Default order for a key set: lexicographic.
#[must_use]
pub fn default_order(current: &BTreeSet<String>) -> OrderList {
    current.iter().cloned().collect()
}

/// Merge `saved` with `current`. See the module docs for the rules.
///
/// # Examples
///
/// ```
/// use lineup_core::order::merge_order;
/// use std::collections::BTreeSet;
///
/// let saved = vec!["A".to_string(), "C".to_string()];
/// let current: BTreeSet<String> = ["A", "B", "C"].iter().map(|s| s.to_string()).collect();
/// assert_eq!(merge_order(&saved, &current), vec!["A", "C", "B"]);
/// ```
#[must_use]
pub fn merge_order(saved: &[String], current: &BTreeSet<String>) -> OrderList {
    merge_order_with_stats(saved, current).0
}

/// [`merge_order`] plus the [`MergeStats`] describing the change.
#[must_use]
pub fn merge_order_with_stats(saved: &[String], current: &BTreeSet<String>) -> (OrderList, MergeStats) {
    let mut stats = MergeStats::default();
    let mut seen: HashSet<&str> = HashSet::with_capacity(saved.len());
    let mut merged: OrderList = Vec::with_capacity(current.len());

    for key in saved {
        if current.contains(key) && seen.insert(key.as_str()) {
            merged.push(key.clone());
            stats.retained += 1;
        } else {
            stats.dropped += 1;
        }
    }

    // BTreeSet iteration is already lexicographic.
    for key in current {
        if !seen.contains(key.as_str()) {
            merged.push(key.clone());
            stats.appended += 1;
        }
    }

    (merged, stats)
}
