//! `lineup apply`: execute the plan against the edge file.

use crate::cmd::plan::{PlanView, build_plan};
use crate::cmd::{Context, DataArgs, TargetArgs};
use crate::output::{CliError, render, render_error};
use clap::Args;
use lineup_core::ErrorCode;
use lineup_core::reconcile::{ApplyReport, apply_bulk, apply_plan};
use lineup_core::session::PlanOutcome;
use serde::Serialize;
use std::io::{self, Write};

#[derive(Args, Debug)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub targets: TargetArgs,

    /// Print the plan without writing anything.
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
struct ApplyView {
    plan: PlanView,
    #[serde(skip_serializing_if = "Option::is_none")]
    report: Option<ApplyReport>,
}

fn write_report(report: &ApplyReport, w: &mut dyn Write) -> io::Result<()> {
    for edge in &report.deleted {
        writeln!(w, "✓ deleted {edge}")?;
    }
    for edge in &report.created {
        writeln!(w, "✓ created {edge}")?;
    }
    for edge in &report.skipped {
        writeln!(w, "· skipped {edge} (already exists)")?;
    }
    for failure in &report.failed {
        writeln!(w, "✗ {} {}: {}", failure.op, failure.edge, failure.message)?;
    }
    Ok(())
}

pub fn run_apply(args: &ApplyArgs, ctx: &Context) -> anyhow::Result<()> {
    let (outcome, mut edges) = build_plan(&args.data, &args.targets, ctx)?;
    let plan = PlanView::from(&outcome);

    let report = (!args.dry_run).then(|| match &outcome {
        PlanOutcome::Single(plan) => apply_plan(plan, &mut edges),
        PlanOutcome::Bulk(plan) => apply_bulk(plan, &mut edges),
    });
    let failed = report.as_ref().map_or(0, |r| r.failed.len());

    let view = ApplyView { plan, report };
    render(ctx.output, &view, |view, w| match &view.report {
        Some(report) => write_report(report, w),
        None => view.plan.write_human(ctx.output.is_pretty(), w),
    })?;

    if failed > 0 {
        let message = format!("{failed} edge write(s) failed");
        render_error(
            ctx.output,
            &CliError::with_code(&message, ErrorCode::TransportFailure),
        )?;
        anyhow::bail!("{message}");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lineup_core::edges::RelationshipEdge;
    use lineup_core::reconcile::{EdgeFailure, EdgeOp};

    #[test]
    fn report_lines_mark_each_outcome() {
        let report = ApplyReport {
            created: vec![RelationshipEdge::new("V3", "L1")],
            deleted: vec![RelationshipEdge::new("V1", "L1")],
            skipped: vec![RelationshipEdge::new("V4", "L1")],
            failed: vec![EdgeFailure {
                edge: RelationshipEdge::new("V5", "L1"),
                op: EdgeOp::Create,
                message: "timeout".into(),
            }],
        };
        let mut buf = Vec::new();
        write_report(&report, &mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(
            text,
            "✓ deleted (V1, L1)\n✓ created (V3, L1)\n· skipped (V4, L1) (already exists)\n✗ create (V5, L1): timeout\n"
        );
    }

    #[test]
    fn dry_run_flag_parses() {
        use clap::Parser;

        #[derive(Parser)]
        struct Wrapper {
            #[command(flatten)]
            args: ApplyArgs,
        }

        let w = Wrapper::parse_from([
            "test", "--data", "d", "--edges", "e", "--target", "L1", "--target", "L2", "--dry-run",
        ]);
        assert!(w.args.dry_run);
        assert_eq!(w.args.targets.targets, vec!["L1".to_string(), "L2".to_string()]);
    }
}
