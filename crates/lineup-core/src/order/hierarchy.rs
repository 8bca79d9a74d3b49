//! The full three-tier ordering as a flat table keyed by [`ScopeKey`].

#![allow(clippy::module_name_repetitions)]

use std::collections::{BTreeMap, HashMap};

use super::merge::{default_order, merge_order_with_stats};
use super::{OrderList, ScopeKey};
use crate::model::{Item, Membership};

/// Level1 order, Level2 orders per Level1 key, and Level3 orders per
/// `(Level1, Level2)` pair, stored side by side in one map.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HierarchicalOrder {
    lists: BTreeMap<ScopeKey, OrderList>,
}

impl HierarchicalOrder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Alphabetical order for every scope present in `membership`.
    #[must_use]
    pub fn default_for(membership: &Membership) -> Self {
        let mut order = Self::new();
        for (scope, keys) in scopes_of(membership) {
            order.insert(scope, default_order(keys));
        }
        order
    }

    /// Merge this (saved) order against the current membership.
    ///
    /// Every scope in `membership` gets a list; scopes that no longer exist
    /// are dropped. Each scope is merged independently, so growth in one
    /// branch never perturbs its siblings.
    #[must_use]
    pub fn merged_with(&self, membership: &Membership) -> Self {
        let mut order = Self::new();
        for (scope, keys) in scopes_of(membership) {
            let saved = self.lists.get(&scope).map_or(&[][..], Vec::as_slice);
            let (merged, stats) = merge_order_with_stats(saved, keys);
            if stats.dropped > 0 || (stats.appended > 0 && !saved.is_empty()) {
                tracing::debug!(
                    %scope,
                    retained = stats.retained,
                    dropped = stats.dropped,
                    appended = stats.appended,
                    "merged saved order with dataset"
                );
            }
            order.insert(scope, merged);
        }
        order
    }

    #[must_use]
    pub fn get(&self, scope: &ScopeKey) -> Option<&OrderList> {
        self.lists.get(scope)
    }

    pub(crate) fn get_mut(&mut self, scope: &ScopeKey) -> Option<&mut OrderList> {
        self.lists.get_mut(scope)
    }

    pub fn insert(&mut self, scope: ScopeKey, list: OrderList) -> Option<OrderList> {
        self.lists.insert(scope, list)
    }

    pub fn remove(&mut self, scope: &ScopeKey) -> Option<OrderList> {
        self.lists.remove(scope)
    }

    #[must_use]
    pub fn contains_scope(&self, scope: &ScopeKey) -> bool {
        self.lists.contains_key(scope)
    }

    #[must_use]
    pub fn level1(&self) -> Option<&OrderList> {
        self.lists.get(&ScopeKey::Level1)
    }

    #[must_use]
    pub fn level2(&self, level1: &str) -> Option<&OrderList> {
        self.lists.get(&ScopeKey::level2(level1))
    }

    #[must_use]
    pub fn level3(&self, level1: &str, level2: &str) -> Option<&OrderList> {
        self.lists.get(&ScopeKey::level3(level1, level2))
    }

    /// Iterate scopes in tier order (Level1, then Level2, then Level3).
    pub fn iter(&self) -> impl Iterator<Item = (&ScopeKey, &OrderList)> {
        self.lists.iter()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lists.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lists.len()
    }

    /// Precompute positions for fast comparisons.
    #[must_use]
    pub fn positions(&self) -> PositionIndex {
        let mut index = PositionIndex::default();
        for (scope, list) in &self.lists {
            for (pos, key) in list.iter().enumerate() {
                match scope {
                    ScopeKey::Level1 => {
                        index.level1.insert(key.clone(), pos);
                    }
                    ScopeKey::Level2 { level1 } => {
                        index.level2.insert((level1.clone(), key.clone()), pos);
                    }
                    ScopeKey::Level3 { level1, level2 } => {
                        index
                            .level3
                            .insert((level1.clone(), level2.clone(), key.clone()), pos);
                    }
                }
            }
        }
        index
    }
}

/// Enumerate every scope present in `membership` with its key set.
pub(crate) fn scopes_of(
    membership: &Membership,
) -> impl Iterator<Item = (ScopeKey, &std::collections::BTreeSet<String>)> {
    let level1 = std::iter::once((ScopeKey::Level1, &membership.level1));
    let level2 = membership
        .level2
        .iter()
        .map(|(l1, keys)| (ScopeKey::level2(l1.clone()), keys));
    let level3 = membership
        .level3
        .iter()
        .map(|((l1, l2), keys)| (ScopeKey::level3(l1.clone(), l2.clone()), keys));
    level1.chain(level2).chain(level3)
}

/// Positions of every key within its scope.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PositionIndex {
    level1: HashMap<String, usize>,
    level2: HashMap<(String, String), usize>,
    level3: HashMap<(String, String, String), usize>,
}

impl PositionIndex {
    /// Composite sort key for an item. Keys absent from the order map to
    /// `usize::MAX` so they sort last.
    #[must_use]
    pub fn rank(&self, item: &Item) -> (usize, usize, usize) {
        let l1 = self.level1.get(&item.level1).copied().unwrap_or(usize::MAX);
        let l2 = self
            .level2
            .get(&(item.level1.clone(), item.level2.clone()))
            .copied()
            .unwrap_or(usize::MAX);
        let l3 = self
            .level3
            .get(&(item.level1.clone(), item.level2.clone(), item.level3.clone()))
            .copied()
            .unwrap_or(usize::MAX);
        (l1, l2, l3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Dataset;

    fn dataset() -> Dataset {
        Dataset::new(vec![
            Item::new("1", "DM", "Id", "USUBJID", "Subject"),
            Item::new("2", "DM", "Id", "STUDYID", "Study"),
            Item::new("3", "DM", "Demo", "SEX", "Sex"),
            Item::new("4", "AE", "Id", "USUBJID", "Subject"),
        ])
    }

    #[test]
    fn default_covers_every_scope_alphabetically() {
        let order = HierarchicalOrder::default_for(&dataset().membership());
        assert_eq!(order.level1(), Some(&vec!["AE".to_string(), "DM".to_string()]));
        assert_eq!(
            order.level2("DM"),
            Some(&vec!["Demo".to_string(), "Id".to_string()])
        );
        assert_eq!(
            order.level3("DM", "Id"),
            Some(&vec!["STUDYID".to_string(), "USUBJID".to_string()])
        );
        // 1 level1 + 2 level2 + 3 level3 scopes
        assert_eq!(order.len(), 6);
    }

    #[test]
    fn merge_is_scoped_per_parent() {
        let mut saved = HierarchicalOrder::new();
        saved.insert(
            ScopeKey::level3("DM", "Id"),
            vec!["USUBJID".to_string(), "STUDYID".to_string()],
        );
        saved.insert(ScopeKey::level3("GONE", "X"), vec!["A".to_string()]);

        let merged = saved.merged_with(&dataset().membership());
        assert_eq!(
            merged.level3("DM", "Id"),
            Some(&vec!["USUBJID".to_string(), "STUDYID".to_string()])
        );
        assert!(!merged.contains_scope(&ScopeKey::level3("GONE", "X")));
        assert_eq!(merged.level3("AE", "Id"), Some(&vec!["USUBJID".to_string()]));
    }

    #[test]
    fn positions_rank_items_and_missing_keys_sort_last() {
        let data = dataset();
        let index = HierarchicalOrder::default_for(&data.membership()).positions();
        let ae = &data.items()[3];
        assert_eq!(index.rank(ae), (0, 0, 0));
        let stranger = Item::new("9", "ZZ", "Id", "X", "X");
        assert_eq!(index.rank(&stranger).0, usize::MAX);
    }
}
