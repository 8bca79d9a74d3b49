//! Working and saved copies of every order list.
//!
//! Moves only touch the working copy. A scope's saved copy changes only when
//! that scope is committed, so one editing session can reorder freely and
//! discard its edits with [`HierarchicalOrderStore::reset`].
//!
//! Scopes that have never been committed have no saved copy; for them the
//! working list is authoritative in [`HierarchicalOrderStore::export_order`].

use tracing::{debug, warn};

use super::codec::{CodecError, decode_order};
use super::hierarchy::{HierarchicalOrder, scopes_of};
use super::merge::{default_order, merge_order};
use super::{OrderError, OrderList, ScopeKey, move_within, slot_to_index};
use crate::model::{Dataset, Membership};

#[derive(Debug, Clone)]
pub struct HierarchicalOrderStore {
    membership: Membership,
    working: HierarchicalOrder,
    saved: HierarchicalOrder,
}

impl HierarchicalOrderStore {
    /// Start from the default alphabetical order with nothing saved.
    #[must_use]
    pub fn new(dataset: &Dataset) -> Self {
        let membership = dataset.membership();
        Self {
            working: HierarchicalOrder::default_for(&membership),
            saved: HierarchicalOrder::new(),
            membership,
        }
    }

    /// Start from a previously saved order, merged against the dataset.
    #[must_use]
    pub fn with_saved(dataset: &Dataset, saved: &HierarchicalOrder) -> Self {
        let membership = dataset.membership();
        let working = saved.merged_with(&membership);
        let saved = retain_saved_scopes(saved, &working);
        Self {
            membership,
            working,
            saved,
        }
    }

    /// Start from a persisted blob.
    ///
    /// A missing blob yields the default order. A blob that cannot be decoded
    /// at all falls back to the default order; a blob with some bad lists
    /// keeps its good lists. Every problem is logged and returned so the
    /// caller can surface it, but none of them is fatal.
    #[must_use]
    pub fn from_blob(dataset: &Dataset, blob: Option<&str>) -> (Self, Vec<CodecError>) {
        let Some(raw) = blob else {
            return (Self::new(dataset), Vec::new());
        };
        match decode_order(raw) {
            Ok(decoded) => {
                for err in &decoded.rejected {
                    warn!(error = %err, code = %err.code(), "dropping malformed order list");
                }
                (Self::with_saved(dataset, &decoded.order), decoded.rejected)
            }
            Err(err) => {
                warn!(error = %err, code = %err.code(), "persisted order unusable; using default order");
                (Self::new(dataset), vec![err])
            }
        }
    }

    /// Replace the dataset snapshot, re-merging both copies.
    ///
    /// Known keys keep their relative order; new keys are appended per scope.
    pub fn set_dataset(&mut self, dataset: &Dataset) {
        self.membership = dataset.membership();
        self.working = self.working.merged_with(&self.membership);
        let merged_saved = self.saved.merged_with(&self.membership);
        self.saved = retain_saved_scopes(&self.saved, &merged_saved);
    }

    /// The working list for a scope.
    #[must_use]
    pub fn working(&self, scope: &ScopeKey) -> Option<&OrderList> {
        self.working.get(scope)
    }

    /// The last committed list for a scope, if it was ever committed.
    #[must_use]
    pub fn saved(&self, scope: &ScopeKey) -> Option<&OrderList> {
        self.saved.get(scope)
    }

    /// Every committed list, in persistable form.
    #[must_use]
    pub const fn saved_order(&self) -> &HierarchicalOrder {
        &self.saved
    }

    /// Move `item_key` from `from` so it ends up at index `to`.
    ///
    /// `to` is the final position (see [`move_within`]). `item_key` must be
    /// the key currently at `from`; a mismatch means the caller's view is
    /// stale and nothing is changed.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownScope`], [`OrderError::IndexOutOfRange`],
    /// or [`OrderError::UnknownKey`].
    pub fn move_item(
        &mut self,
        scope: &ScopeKey,
        item_key: &str,
        from: usize,
        to: usize,
    ) -> Result<(), OrderError> {
        let list = self
            .working
            .get_mut(scope)
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))?;
        let len = list.len();
        for index in [from, to] {
            if index >= len {
                return Err(OrderError::IndexOutOfRange {
                    scope: scope.clone(),
                    index,
                    len,
                });
            }
        }
        if list[from] != item_key {
            return Err(OrderError::UnknownKey {
                scope: scope.clone(),
                key: item_key.to_string(),
            });
        }
        move_within(list, from, to);
        debug!(%scope, key = item_key, from, to, "moved key");
        Ok(())
    }

    /// Move `item_key` from `from` into drop slot `slot` (`0..=len`).
    ///
    /// # Errors
    ///
    /// Same as [`Self::move_item`]; `slot` may equal the list length.
    pub fn drop_item(
        &mut self,
        scope: &ScopeKey,
        item_key: &str,
        from: usize,
        slot: usize,
    ) -> Result<(), OrderError> {
        let len = self
            .working
            .get(scope)
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))?
            .len();
        if slot > len {
            return Err(OrderError::IndexOutOfRange {
                scope: scope.clone(),
                index: slot,
                len,
            });
        }
        self.move_item(scope, item_key, from, slot_to_index(from, slot))
    }

    /// Move a key to final position `to` without knowing its current index.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownKey`] if the key is not in the scope.
    pub fn move_key(&mut self, scope: &ScopeKey, key: &str, to: usize) -> Result<(), OrderError> {
        let from = self
            .working
            .get(scope)
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))?
            .iter()
            .position(|k| k == key)
            .ok_or_else(|| OrderError::UnknownKey {
                scope: scope.clone(),
                key: key.to_string(),
            })?;
        self.move_item(scope, key, from, to)
    }

    /// Copy the working list of one scope into its saved copy.
    ///
    /// Committing the Level1 list also re-checks the sub-scopes of every
    /// Level1 key: their saved sub-orders are kept, only their membership is
    /// brought in line with the dataset.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownScope`] if the scope does not exist.
    pub fn commit(&mut self, scope: &ScopeKey) -> Result<(), OrderError> {
        let list = self
            .working
            .get(scope)
            .cloned()
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))?;
        if *scope == ScopeKey::Level1 {
            for key in &list {
                self.refresh_children(key);
            }
        }
        self.saved.insert(scope.clone(), list);
        debug!(%scope, "committed order");
        Ok(())
    }

    /// Commit every scope whose working list differs from its baseline.
    ///
    /// Returns the committed scopes in tier order.
    pub fn commit_all(&mut self) -> Vec<ScopeKey> {
        let dirty = self.dirty_scopes();
        for scope in &dirty {
            // Scopes come from `working`, so commit cannot miss.
            let _ = self.commit(scope);
        }
        dirty
    }

    /// Discard uncommitted edits for one scope.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownScope`] if the scope does not exist.
    pub fn reset(&mut self, scope: &ScopeKey) -> Result<(), OrderError> {
        let baseline = self.baseline(scope)?;
        self.working.insert(scope.clone(), baseline);
        Ok(())
    }

    /// Replace the working list of one scope with the alphabetical default.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownScope`] if the scope does not exist.
    pub fn reset_to_default(&mut self, scope: &ScopeKey) -> Result<(), OrderError> {
        let default = self
            .default_list(scope)
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))?;
        self.working.insert(scope.clone(), default);
        Ok(())
    }

    /// Whether the working list differs from its saved copy (or from the
    /// default order when nothing was ever saved).
    #[must_use]
    pub fn is_dirty(&self, scope: &ScopeKey) -> bool {
        match (self.working.get(scope), self.baseline(scope)) {
            (Some(working), Ok(baseline)) => *working != baseline,
            _ => false,
        }
    }

    #[must_use]
    pub fn dirty_scopes(&self) -> Vec<ScopeKey> {
        self.working
            .iter()
            .map(|(scope, _)| scope)
            .filter(|scope| self.is_dirty(scope))
            .cloned()
            .collect()
    }

    /// The full order for presentation or persistence: saved lists where a
    /// scope was committed, working lists elsewhere.
    #[must_use]
    pub fn export_order(&self) -> HierarchicalOrder {
        let mut order = HierarchicalOrder::new();
        for (scope, working) in self.working.iter() {
            let list = self.saved.get(scope).unwrap_or(working);
            order.insert(scope.clone(), list.clone());
        }
        order
    }

    fn baseline(&self, scope: &ScopeKey) -> Result<OrderList, OrderError> {
        if let Some(saved) = self.saved.get(scope) {
            return Ok(saved.clone());
        }
        self.default_list(scope)
            .ok_or_else(|| OrderError::UnknownScope(scope.clone()))
    }

    fn default_list(&self, scope: &ScopeKey) -> Option<OrderList> {
        scopes_of(&self.membership)
            .find(|(candidate, _)| candidate == scope)
            .map(|(_, keys)| default_order(keys))
    }

    /// Bring every scope under `level1` in line with current membership
    /// without touching the relative order of known keys.
    fn refresh_children(&mut self, level1: &str) {
        let mut children = HierarchicalOrder::new();
        for (scope, keys) in scopes_of(&self.membership).filter(|(s, _)| s.is_under(level1)) {
            if let Some(saved) = self.saved.get(&scope) {
                children.insert(scope.clone(), merge_order(saved, keys));
            }
            let working = self.working.get(&scope).map_or(&[][..], Vec::as_slice);
            let refreshed = merge_order(working, keys);
            self.working.insert(scope, refreshed);
        }
        for (scope, list) in children.iter() {
            self.saved.insert(scope.clone(), list.clone());
        }
    }
}

/// Keep only scopes that were saved before, taking their merged lists.
fn retain_saved_scopes(saved: &HierarchicalOrder, merged: &HierarchicalOrder) -> HierarchicalOrder {
    let mut kept = HierarchicalOrder::new();
    for (scope, list) in merged.iter() {
        if saved.contains_scope(scope) {
            kept.insert(scope.clone(), list.clone());
        }
    }
    kept
}
