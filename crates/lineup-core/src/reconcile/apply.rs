//! Execute reconciliation plans against an [`EdgeStore`].
//!
//! Writes are issued one at a time: every delete, then every create. Each
//! create first checks that the edge is still absent, so an edge added by a
//! concurrent writer between planning and execution is skipped rather than
//! duplicated. A failed write is recorded and the run continues; nothing is
//! rolled back.

use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

use super::{BulkPlan, ReconcilePlan};
use crate::edges::{EdgeStore, RelationshipEdge};

/// Kind of write that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOp {
    Create,
    Delete,
}

impl fmt::Display for EdgeOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Create => f.write_str("create"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// One write that the store refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EdgeFailure {
    pub edge: RelationshipEdge,
    pub op: EdgeOp,
    pub message: String,
}

/// Outcome of executing a plan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyReport {
    pub created: Vec<RelationshipEdge>,
    pub deleted: Vec<RelationshipEdge>,
    /// Creates skipped because the edge already existed at execution time.
    pub skipped: Vec<RelationshipEdge>,
    pub failed: Vec<EdgeFailure>,
}

impl ApplyReport {
    /// True when every planned write succeeded.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Number of writes issued, successful or not.
    #[must_use]
    pub fn attempted(&self) -> usize {
        self.created.len() + self.deleted.len() + self.failed.len()
    }

    fn record_failure(&mut self, edge: RelationshipEdge, op: EdgeOp, message: String) {
        warn!(%edge, %op, error = %message, "edge write failed");
        self.failed.push(EdgeFailure { edge, op, message });
    }
}

/// Run a single-target plan.
pub fn apply_plan<S: EdgeStore>(plan: &ReconcilePlan, store: &mut S) -> ApplyReport {
    let mut report = ApplyReport::default();

    for edge in plan.deletes() {
        match store.delete_edge(&edge.source, &edge.target) {
            Ok(()) => {
                debug!(%edge, "deleted edge");
                report.deleted.push(edge);
            }
            Err(err) => report.record_failure(edge, EdgeOp::Delete, err.to_string()),
        }
    }

    for edge in plan.creates() {
        guarded_create(store, edge, &mut report);
    }

    summarize(&report, &plan.target);
    report
}

/// Run a validated bulk grant.
pub fn apply_bulk<S: EdgeStore>(plan: &BulkPlan, store: &mut S) -> ApplyReport {
    let mut report = ApplyReport::default();
    for edge in plan.creates() {
        guarded_create(store, edge, &mut report);
    }
    summarize(&report, "bulk");
    report
}

fn guarded_create<S: EdgeStore>(store: &mut S, edge: RelationshipEdge, report: &mut ApplyReport) {
    match store.edge_exists(&edge.source, &edge.target) {
        Ok(true) => {
            warn!(%edge, "edge appeared after planning, skipping create");
            report.skipped.push(edge);
        }
        Ok(false) => match store.create_edge(&edge.source, &edge.target) {
            Ok(()) => {
                debug!(%edge, "created edge");
                report.created.push(edge);
            }
            Err(err) => report.record_failure(edge, EdgeOp::Create, err.to_string()),
        },
        Err(err) => report.record_failure(edge, EdgeOp::Create, err.to_string()),
    }
}

fn summarize(report: &ApplyReport, target: &str) {
    info!(
        target,
        created = report.created.len(),
        deleted = report.deleted.len(),
        skipped = report.skipped.len(),
        failed = report.failed.len(),
        "applied reconciliation"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::edges::{EdgeWrite, MemoryEdgeStore};
    use crate::reconcile::{reconcile, validate_bulk};
    use std::collections::BTreeSet;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn deletes_run_before_creates() {
        let mut store = MemoryEdgeStore::with_edges([
            RelationshipEdge::new("V1", "L1"),
            RelationshipEdge::new("V2", "L1"),
        ]);
        let existing = store.edges().clone();
        let plan = reconcile("L1", &ids(&["V2", "V3"]), &existing);
        let report = apply_plan(&plan, &mut store);

        assert!(report.is_clean());
        assert_eq!(
            store.writes(),
            &[
                EdgeWrite::Delete(RelationshipEdge::new("V1", "L1")),
                EdgeWrite::Create(RelationshipEdge::new("V3", "L1")),
            ]
        );
        assert_eq!(
            store.edges(),
            &[RelationshipEdge::new("V2", "L1"), RelationshipEdge::new("V3", "L1")]
                .into_iter()
                .collect()
        );
    }

    #[test]
    fn concurrent_create_is_skipped() {
        let mut store = MemoryEdgeStore::new();
        let plan = reconcile("L1", &ids(&["V1", "V2"]), &BTreeSet::new());
        store.insert_external(RelationshipEdge::new("V1", "L1"));

        let report = apply_plan(&plan, &mut store);
        assert!(report.is_clean());
        assert_eq!(report.skipped, vec![RelationshipEdge::new("V1", "L1")]);
        assert_eq!(report.created, vec![RelationshipEdge::new("V2", "L1")]);
    }

    #[test]
    fn failed_write_does_not_stop_the_run() {
        let mut store = MemoryEdgeStore::new();
        store.fail_on(RelationshipEdge::new("V1", "L1"));
        let plan = reconcile("L1", &ids(&["V1", "V2"]), &BTreeSet::new());

        let report = apply_plan(&plan, &mut store);
        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].op, EdgeOp::Create);
        assert_eq!(report.created, vec![RelationshipEdge::new("V2", "L1")]);
        assert_eq!(report.attempted(), 2);
    }

    #[test]
    fn failed_delete_is_reported_and_creates_still_run() {
        let mut store = MemoryEdgeStore::with_edges([RelationshipEdge::new("V1", "L1")]);
        store.fail_on(RelationshipEdge::new("V1", "L1"));
        let existing = store.edges().clone();
        let plan = reconcile("L1", &ids(&["V2"]), &existing);

        let report = apply_plan(&plan, &mut store);
        assert!(!report.is_clean());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].op, EdgeOp::Delete);
        assert_eq!(report.failed[0].edge, RelationshipEdge::new("V1", "L1"));
        assert!(report.deleted.is_empty());
        assert_eq!(report.created, vec![RelationshipEdge::new("V2", "L1")]);
        assert_eq!(store.writes(), &[EdgeWrite::Create(RelationshipEdge::new("V2", "L1"))]);
        assert!(store.edges().contains(&RelationshipEdge::new("V1", "L1")));
    }

    #[test]
    fn bulk_creates_every_pair() {
        let mut store = MemoryEdgeStore::new();
        let plan =
            validate_bulk(&ids(&["V1", "V2"]), &ids(&["L1", "L2"]), &BTreeSet::new()).expect("ok");
        let report = apply_bulk(&plan, &mut store);
        assert!(report.is_clean());
        assert_eq!(report.created.len(), 4);
        assert_eq!(store.edges().len(), 4);
    }

    #[test]
    fn report_serializes_ops_lowercase() {
        let failure = EdgeFailure {
            edge: RelationshipEdge::new("V1", "L1"),
            op: EdgeOp::Delete,
            message: "boom".into(),
        };
        let json = serde_json::to_value(&failure).expect("serialize");
        assert_eq!(json["op"], "delete");
        assert_eq!(json["edge"]["source"], "V1");
    }
}
