//! One editing session over a dataset snapshot.
//!
//! [`Session`] ties the pure components to a [`PreferenceStore`] and an
//! [`EdgeStore`]: it reads the persisted order and selection blobs for its
//! scope, hands out the order store, comparator and selection controller,
//! and writes blobs back only when asked to.

use std::collections::BTreeSet;
use tracing::{debug, warn};

use crate::config::ProjectConfig;
use crate::edges::EdgeStore;
use crate::error::ErrorCode;
use crate::model::{Dataset, Item};
use crate::order::codec::{CodecError, encode_order};
use crate::order::{HierarchicalOrder, HierarchicalOrderStore, OrderError, ScopeKey};
use crate::prefs::{PreferenceStore, PrefsError, order_key, selection_key};
use crate::reconcile::{BulkPlan, ReconcileError, ReconcilePlan, plan_bulk, plan_single};
use crate::selection::{SelectionBlob, SelectionController, SelectionError, SelectionMode};
use crate::sort::{Comparator, SortError, SortRule, sort_items, validate_rules};

/// The target(s) a selection is reconciled against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSet {
    Single(String),
    Bulk(BTreeSet<String>),
}

impl TargetSet {
    /// One target is single mode; more than one is bulk.
    ///
    /// # Errors
    ///
    /// Returns [`ReconcileError::NoTargets`] for an empty list.
    pub fn new<I, S>(targets: I) -> Result<Self, ReconcileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut targets: BTreeSet<String> = targets.into_iter().map(Into::into).collect();
        if targets.len() > 1 {
            return Ok(Self::Bulk(targets));
        }
        targets
            .pop_first()
            .map(Self::Single)
            .ok_or(ReconcileError::NoTargets)
    }

    /// Preference key suffix for this target set.
    #[must_use]
    pub fn key(&self) -> String {
        match self {
            Self::Single(target) => target.clone(),
            Self::Bulk(targets) => {
                format!("bulk:{}", targets.iter().cloned().collect::<Vec<_>>().join(","))
            }
        }
    }
}

/// Result of [`Session::plan_reconciliation`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanOutcome {
    Single(ReconcilePlan),
    Bulk(BulkPlan),
}

/// Errors surfaced by session operations.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error(transparent)]
    Selection(#[from] SelectionError),

    #[error("failed to encode selection: {0}")]
    SelectionBlob(#[from] serde_json::Error),

    #[error(transparent)]
    Sort(#[from] SortError),

    #[error(transparent)]
    Reconcile(#[from] ReconcileError),

    #[error(transparent)]
    Prefs(#[from] PrefsError),
}

impl SessionError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Order(err) => err.code(),
            Self::Codec(err) => err.code(),
            Self::Selection(err) => err.code(),
            Self::SelectionBlob(_) => ErrorCode::InternalUnexpected,
            Self::Sort(err) => err.code(),
            Self::Reconcile(err) => err.code(),
            Self::Prefs(err) => err.code(),
        }
    }
}

/// Editing session for one scope (a dataset and its saved preferences).
#[derive(Debug)]
pub struct Session<P: PreferenceStore> {
    scope: String,
    dataset: Dataset,
    config: ProjectConfig,
    prefs: P,
}

impl<P: PreferenceStore> Session<P> {
    pub fn new(scope: impl Into<String>, dataset: Dataset, config: ProjectConfig, prefs: P) -> Self {
        Self {
            scope: scope.into(),
            dataset,
            config,
            prefs,
        }
    }

    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Ordering
    // -----------------------------------------------------------------------

    /// Build the order store from the persisted blob.
    ///
    /// Decode problems are returned alongside the store; they are never fatal.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Prefs`] if the preference store cannot be read.
    pub fn order_store(&self) -> Result<(HierarchicalOrderStore, Vec<CodecError>), SessionError> {
        let blob = self.prefs.get(&order_key(&self.scope))?;
        Ok(HierarchicalOrderStore::from_blob(&self.dataset, blob.as_deref()))
    }

    /// The hierarchical order currently in effect for this scope.
    ///
    /// # Errors
    ///
    /// See [`Session::order_store`].
    pub fn compute_order(&self) -> Result<HierarchicalOrder, SessionError> {
        let (store, _) = self.order_store()?;
        Ok(store.export_order())
    }

    /// Commit one scope of `store` and persist every committed list.
    ///
    /// # Errors
    ///
    /// Unknown scope, encoding, or preference store failures.
    pub fn commit_order(
        &mut self,
        store: &mut HierarchicalOrderStore,
        scope: &ScopeKey,
    ) -> Result<(), SessionError> {
        store.commit(scope)?;
        self.persist_order(store)
    }

    /// Write the saved lists of `store` to the preference store.
    ///
    /// # Errors
    ///
    /// Encoding or preference store failures.
    pub fn persist_order(&mut self, store: &HierarchicalOrderStore) -> Result<(), SessionError> {
        let blob = encode_order(store.saved_order())?;
        self.prefs.set(&order_key(&self.scope), &blob)?;
        debug!(scope = %self.scope, lists = store.saved_order().len(), "persisted order");
        Ok(())
    }

    /// Forget the persisted order; the default order applies again.
    ///
    /// # Errors
    ///
    /// Preference store failures.
    pub fn clear_order(&mut self) -> Result<(), SessionError> {
        self.prefs.remove(&order_key(&self.scope))?;
        Ok(())
    }

    /// Comparator for presentation.
    ///
    /// With `hierarchy` the saved hierarchical order is used. Otherwise
    /// `rules` apply, or the configured default rules when `rules` is `None`.
    ///
    /// # Errors
    ///
    /// Invalid rules, or preference store failures.
    pub fn compare_fn(
        &self,
        hierarchy: bool,
        rules: Option<&[SortRule]>,
    ) -> Result<Comparator, SessionError> {
        if hierarchy {
            let order = self.compute_order()?;
            return Ok(Comparator::new(Some(&order), &[]));
        }
        let rules = rules.unwrap_or(&self.config.sort.rules);
        validate_rules(rules, false)?;
        Ok(Comparator::new(None, rules))
    }

    /// The dataset items sorted by `comparator`.
    #[must_use]
    pub fn sorted_items(&self, comparator: &Comparator) -> Vec<Item> {
        let mut items = self.dataset.items().to_vec();
        sort_items(&mut items, comparator);
        items
    }

    // -----------------------------------------------------------------------
    // Selection
    // -----------------------------------------------------------------------

    /// Build the selection controller for `targets`.
    ///
    /// A single target starts from the ids that already have an edge to it;
    /// a bulk set starts empty. A persisted mode is restored on top, and the
    /// persisted manual toggles are laid over the starting snapshot, so items
    /// the user never toggled keep following the live edges. A persisted blob
    /// that cannot be read is ignored with a warning.
    ///
    /// # Errors
    ///
    /// Preference store or edge listing failures.
    pub fn selection_controller<E: EdgeStore>(
        &self,
        targets: &TargetSet,
        edges: &mut E,
    ) -> Result<SelectionController, SessionError> {
        let existing: BTreeSet<String> = match targets {
            TargetSet::Single(target) => edges
                .list_edges(target)
                .map_err(|err| ReconcileError::Listing {
                    target: target.clone(),
                    message: err.to_string(),
                })?
                .into_iter()
                .map(|edge| edge.source)
                .collect(),
            TargetSet::Bulk(_) => BTreeSet::new(),
        };

        let mut controller =
            SelectionController::new(self.dataset.clone(), self.config.selection.keyword_exit);

        let key = selection_key(&self.scope, &targets.key());
        let blob = match self.prefs.get(&key)? {
            Some(raw) => match SelectionBlob::decode(&raw) {
                Ok(blob) => Some(blob),
                Err(err) => {
                    warn!(%key, error = %err, "ignoring unreadable selection blob");
                    None
                }
            },
            None => None,
        };

        let mode = blob.as_ref().map_or(SelectionMode::Manual, SelectionBlob::mode);
        controller.retarget(&existing, mode);
        if let Some(blob) = &blob {
            controller.apply_manual_changes(blob.changes());
        }
        Ok(controller)
    }

    /// The desired selection for `targets` under the persisted mode.
    ///
    /// # Errors
    ///
    /// See [`Session::selection_controller`].
    pub fn compute_selection<E: EdgeStore>(
        &self,
        targets: &TargetSet,
        edges: &mut E,
    ) -> Result<BTreeSet<String>, SessionError> {
        Ok(self
            .selection_controller(targets, edges)?
            .current_selection())
    }

    /// Persist the mode and manual toggles of `controller` for `targets`.
    ///
    /// # Errors
    ///
    /// Encoding or preference store failures.
    pub fn persist_selection(
        &mut self,
        targets: &TargetSet,
        controller: &SelectionController,
    ) -> Result<(), SessionError> {
        let blob = SelectionBlob::capture(controller).encode()?;
        self.prefs
            .set(&selection_key(&self.scope, &targets.key()), &blob)?;
        Ok(())
    }

    /// Forget the persisted selection for `targets`.
    ///
    /// # Errors
    ///
    /// Preference store failures.
    pub fn clear_selection(&mut self, targets: &TargetSet) -> Result<(), SessionError> {
        self.prefs
            .remove(&selection_key(&self.scope, &targets.key()))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reconciliation
    // -----------------------------------------------------------------------

    /// Plan the writes that make `targets` match `desired`.
    ///
    /// # Errors
    ///
    /// Bulk validation failures (duplicates, empty selection) and listing
    /// failures.
    pub fn plan_reconciliation<E: EdgeStore>(
        &self,
        targets: &TargetSet,
        desired: &BTreeSet<String>,
        edges: &mut E,
    ) -> Result<PlanOutcome, SessionError> {
        Ok(match targets {
            TargetSet::Single(target) => PlanOutcome::Single(plan_single(edges, target, desired)?),
            TargetSet::Bulk(set) => PlanOutcome::Bulk(plan_bulk(edges, desired, set)?),
        })
    }
}
