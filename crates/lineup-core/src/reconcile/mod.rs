//! Diff a desired selection against the relationship store.
//!
//! # Single target
//!
//! [`reconcile`] computes `to_create = desired - existing` and
//! `to_delete = existing - desired`. The two sets are disjoint by
//! construction.
//!
//! # Bulk (many targets)
//!
//! Bulk mode only grants: every selected item gets an edge to every target.
//! Before any write, [`validate_bulk`] checks every `(item, target)` pair;
//! if any edge already exists the whole operation is rejected with the full
//! list of duplicates. A [`BulkPlan`] can only be obtained from a successful
//! validation, so an unvalidated batch cannot be applied. Dropping a plan
//! before applying it cancels the operation without side effects.
//!
//! Execution lives in [`apply`].

pub mod apply;

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info};

use crate::edges::{EdgeStore, RelationshipEdge};
use crate::error::ErrorCode;

pub use apply::{ApplyReport, EdgeFailure, EdgeOp, apply_bulk, apply_plan};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Creates and deletes needed to make one target's edges match a selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan {
    pub target: String,
    pub to_create: BTreeSet<String>,
    pub to_delete: BTreeSet<String>,
}

impl ReconcilePlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Edges to create, in source order.
    #[must_use]
    pub fn creates(&self) -> Vec<RelationshipEdge> {
        self.to_create
            .iter()
            .map(|source| RelationshipEdge::new(source.clone(), self.target.clone()))
            .collect()
    }

    /// Edges to delete, in source order.
    #[must_use]
    pub fn deletes(&self) -> Vec<RelationshipEdge> {
        self.to_delete
            .iter()
            .map(|source| RelationshipEdge::new(source.clone(), self.target.clone()))
            .collect()
    }
}

/// A validated bulk grant: every item to every target, no pair pre-existing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkPlan {
    items: BTreeSet<String>,
    targets: BTreeSet<String>,
}

impl BulkPlan {
    #[must_use]
    pub const fn items(&self) -> &BTreeSet<String> {
        &self.items
    }

    #[must_use]
    pub const fn targets(&self) -> &BTreeSet<String> {
        &self.targets
    }

    /// Every edge the plan creates, grouped by target.
    #[must_use]
    pub fn creates(&self) -> Vec<RelationshipEdge> {
        self.targets
            .iter()
            .flat_map(|target| {
                self.items
                    .iter()
                    .map(move |item| RelationshipEdge::new(item.clone(), target.clone()))
            })
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len() * self.targets.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Errors that stop a reconciliation before any write is issued.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError {
    /// A bulk grant was requested with nothing selected.
    #[error("no items selected")]
    EmptySelection,

    /// A bulk grant was requested with no targets.
    #[error("no targets given")]
    NoTargets,

    /// Some `(item, target)` pairs already have an edge.
    #[error("{} relationship(s) already exist: {}", duplicates.len(), format_edges(duplicates))]
    DuplicateRelationship { duplicates: Vec<RelationshipEdge> },

    /// Reading the existing edges of a target failed.
    #[error("failed to list edges for target '{target}': {message}")]
    Listing { target: String, message: String },
}

impl ReconcileError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::EmptySelection | Self::NoTargets => ErrorCode::EmptySelection,
            Self::DuplicateRelationship { .. } => ErrorCode::DuplicateRelationship,
            Self::Listing { .. } => ErrorCode::TransportFailure,
        }
    }

    /// The duplicate pairs, if this is a duplicate rejection.
    #[must_use]
    pub fn duplicates(&self) -> &[RelationshipEdge] {
        match self {
            Self::DuplicateRelationship { duplicates } => duplicates,
            _ => &[],
        }
    }
}

fn format_edges(edges: &[RelationshipEdge]) -> String {
    const SHOWN: usize = 5;
    let mut parts: Vec<String> = edges.iter().take(SHOWN).map(ToString::to_string).collect();
    if edges.len() > SHOWN {
        parts.push(format!("and {} more", edges.len() - SHOWN));
    }
    parts.join(", ")
}

// ---------------------------------------------------------------------------
// Planning
// ---------------------------------------------------------------------------

/// Plan the creates and deletes for one target.
///
/// Edges in `existing` that point at a different target are ignored.
#[must_use]
pub fn reconcile(
    target: &str,
    desired: &BTreeSet<String>,
    existing: &BTreeSet<RelationshipEdge>,
) -> ReconcilePlan {
    let existing_ids: BTreeSet<String> = existing
        .iter()
        .filter(|edge| edge.target == target)
        .map(|edge| edge.source.clone())
        .collect();
    let foreign = existing.len() - existing_ids.len();
    if foreign > 0 {
        debug!(target, foreign, "ignoring edges for other targets");
    }

    ReconcilePlan {
        target: target.to_string(),
        to_create: desired.difference(&existing_ids).cloned().collect(),
        to_delete: existing_ids.difference(desired).cloned().collect(),
    }
}

/// Check every `(item, target)` pair against `existing`.
///
/// # Errors
///
/// - [`ReconcileError::EmptySelection`] if `desired` is empty.
/// - [`ReconcileError::NoTargets`] if `targets` is empty.
/// - [`ReconcileError::DuplicateRelationship`] with every pre-existing pair,
///   sorted, if any exist.
pub fn validate_bulk(
    desired: &BTreeSet<String>,
    targets: &BTreeSet<String>,
    existing: &BTreeSet<RelationshipEdge>,
) -> Result<BulkPlan, ReconcileError> {
    if desired.is_empty() {
        return Err(ReconcileError::EmptySelection);
    }
    if targets.is_empty() {
        return Err(ReconcileError::NoTargets);
    }

    let duplicates: Vec<RelationshipEdge> = targets
        .iter()
        .flat_map(|target| {
            desired
                .iter()
                .map(move |item| RelationshipEdge::new(item.clone(), target.clone()))
        })
        .filter(|pair| existing.contains(pair))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    if !duplicates.is_empty() {
        return Err(ReconcileError::DuplicateRelationship { duplicates });
    }

    Ok(BulkPlan {
        items: desired.clone(),
        targets: targets.clone(),
    })
}

/// Read one target's edges from the store and plan against them.
///
/// # Errors
///
/// Returns [`ReconcileError::Listing`] if the store cannot be read.
pub fn plan_single<S: EdgeStore>(
    store: &mut S,
    target: &str,
    desired: &BTreeSet<String>,
) -> Result<ReconcilePlan, ReconcileError> {
    let existing = list_target(store, target)?;
    let plan = reconcile(target, desired, &existing);
    info!(
        target,
        creates = plan.to_create.len(),
        deletes = plan.to_delete.len(),
        "planned reconciliation"
    );
    Ok(plan)
}

/// Read every target's edges, one target at a time, and validate a bulk grant.
///
/// An empty selection is rejected before the store is touched.
///
/// # Errors
///
/// See [`validate_bulk`]; also [`ReconcileError::Listing`].
pub fn plan_bulk<S: EdgeStore>(
    store: &mut S,
    desired: &BTreeSet<String>,
    targets: &BTreeSet<String>,
) -> Result<BulkPlan, ReconcileError> {
    if desired.is_empty() {
        return Err(ReconcileError::EmptySelection);
    }
    let mut existing = BTreeSet::new();
    for target in targets {
        existing.extend(list_target(store, target)?);
    }
    let plan = validate_bulk(desired, targets, &existing)?;
    info!(
        items = plan.items.len(),
        targets = plan.targets.len(),
        "validated bulk grant"
    );
    Ok(plan)
}

fn list_target<S: EdgeStore>(
    store: &mut S,
    target: &str,
) -> Result<BTreeSet<RelationshipEdge>, ReconcileError> {
    store
        .list_edges(target)
        .map_err(|err| ReconcileError::Listing {
            target: target.to_string(),
            message: err.to_string(),
        })
}
