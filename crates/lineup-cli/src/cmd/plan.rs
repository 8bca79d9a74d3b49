//! `lineup plan`: show the edge writes the current selection implies.

use crate::cmd::{Context, DataArgs, TargetArgs, open_session};
use crate::edges_file::FileEdgeStore;
use crate::output::{fail, pretty_kv, pretty_section, render};
use clap::Args;
use lineup_core::edges::RelationshipEdge;
use lineup_core::session::PlanOutcome;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct PlanArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub targets: TargetArgs,
}

/// Serializable form of a [`PlanOutcome`].
#[derive(Debug, Serialize)]
pub struct PlanView {
    pub mode: &'static str,
    pub targets: Vec<String>,
    pub to_create: Vec<RelationshipEdge>,
    pub to_delete: Vec<RelationshipEdge>,
}

impl From<&PlanOutcome> for PlanView {
    fn from(outcome: &PlanOutcome) -> Self {
        match outcome {
            PlanOutcome::Single(plan) => Self {
                mode: "single",
                targets: vec![plan.target.clone()],
                to_create: plan.creates(),
                to_delete: plan.deletes(),
            },
            PlanOutcome::Bulk(plan) => Self {
                mode: "bulk",
                targets: plan.targets().iter().cloned().collect(),
                to_create: plan.creates(),
                to_delete: Vec::new(),
            },
        }
    }
}

impl PlanView {
    pub fn is_empty(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    pub fn write_human(&self, pretty: bool, w: &mut dyn Write) -> io::Result<()> {
        if pretty {
            pretty_section(w, &format!("Plan for {}", self.targets.join(", ")))?;
            pretty_kv(w, "mode", self.mode)?;
            pretty_kv(w, "create", self.to_create.len().to_string())?;
            pretty_kv(w, "delete", self.to_delete.len().to_string())?;
        }
        if self.is_empty() {
            return writeln!(w, "nothing to do");
        }
        for edge in &self.to_delete {
            writeln!(w, "- {edge}")?;
        }
        for edge in &self.to_create {
            writeln!(w, "+ {edge}")?;
        }
        Ok(())
    }
}

/// Compute the desired selection and plan it against the edge file.
///
/// Validation failures are rendered before returning.
pub fn build_plan(
    data: &DataArgs,
    targets: &TargetArgs,
    ctx: &Context,
) -> anyhow::Result<(PlanOutcome, FileEdgeStore)> {
    let target_set = targets.target_set()?;
    let mut edges = targets.open_edges()?;
    let session = open_session(ctx, data)?;

    let desired = session
        .compute_selection(&target_set, &mut edges)
        .map_err(|e| fail(ctx.output, e))?;
    let outcome = session
        .plan_reconciliation(&target_set, &desired, &mut edges)
        .map_err(|e| fail(ctx.output, e))?;
    Ok((outcome, edges))
}

pub fn run_plan(args: &PlanArgs, ctx: &Context) -> anyhow::Result<()> {
    let (outcome, _) = build_plan(&args.data, &args.targets, ctx)?;
    let view = PlanView::from(&outcome);
    render(ctx.output, &view, |view, w| {
        view.write_human(ctx.output.is_pretty(), w)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::edges::MemoryEdgeStore;
    use lineup_core::reconcile::{plan_bulk, reconcile};
    use std::collections::BTreeSet;

    fn ids(list: &[&str]) -> BTreeSet<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn single_view_lists_deletes_before_creates() {
        let existing: BTreeSet<RelationshipEdge> =
            [RelationshipEdge::new("V1", "L1")].into_iter().collect();
        let outcome = PlanOutcome::Single(reconcile("L1", &ids(&["V2"]), &existing));
        let view = PlanView::from(&outcome);
        assert_eq!(view.mode, "single");

        let mut buf = Vec::new();
        view.write_human(false, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "- (V1, L1)\n+ (V2, L1)\n");
    }

    #[test]
    fn bulk_view_has_no_deletes() {
        let mut store = MemoryEdgeStore::new();
        let plan = plan_bulk(&mut store, &ids(&["V1"]), &ids(&["L1", "L2"])).unwrap();
        let view = PlanView::from(&PlanOutcome::Bulk(plan));
        assert_eq!(view.mode, "bulk");
        assert_eq!(view.targets, vec!["L1".to_string(), "L2".to_string()]);
        assert_eq!(view.to_create.len(), 2);
        assert!(view.to_delete.is_empty());
    }

    #[test]
    fn empty_plan_says_so() {
        let outcome = PlanOutcome::Single(reconcile("L1", &BTreeSet::new(), &BTreeSet::new()));
        let mut buf = Vec::new();
        PlanView::from(&outcome).write_human(false, &mut buf).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "nothing to do\n");
    }
}
