//! `lineup select`: change and persist the selection for a target.

use crate::cmd::{Context, DataArgs, TargetArgs, open_session};
use crate::output::{fail, pretty_kv, pretty_section, render};
use clap::Args;
use lineup_core::selection::{SelectionController, SelectionMode};
use lineup_core::session::SessionError;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct SelectArgs {
    #[command(flatten)]
    pub data: DataArgs,

    #[command(flatten)]
    pub targets: TargetArgs,

    /// Select every item, now and as the dataset changes.
    #[arg(long, conflicts_with_all = ["keyword", "manual"])]
    pub all: bool,

    /// Select the items whose name contains every token of PATTERN.
    #[arg(long, value_name = "PATTERN", conflicts_with = "manual")]
    pub keyword: Option<String>,

    /// Switch back to the hand-picked selection.
    #[arg(long)]
    pub manual: bool,

    /// Flip one item in the hand-picked selection. Repeatable.
    #[arg(long, value_name = "ID")]
    pub toggle: Vec<String>,

    /// Hand-pick every item.
    #[arg(long, conflicts_with = "uncheck_all")]
    pub check_all: bool,

    /// Clear the hand-picked selection.
    #[arg(long)]
    pub uncheck_all: bool,

    /// Forget the persisted selection and start from the existing edges.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Serialize)]
pub struct SelectionView {
    pub target: String,
    pub mode: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    pub count: usize,
    pub selected: Vec<String>,
}

impl SelectionView {
    pub fn of(target: String, controller: &SelectionController) -> Self {
        let selected: Vec<String> = controller.current_selection().into_iter().collect();
        let pattern = match controller.mode() {
            SelectionMode::Keyword(pattern) => Some(pattern.to_string()),
            SelectionMode::Manual | SelectionMode::MatchAll => None,
        };
        Self {
            target,
            mode: controller.mode().name(),
            pattern,
            count: selected.len(),
            selected,
        }
    }
}

/// Apply the mode switches and toggles in command-line order of precedence:
/// mode first, then bulk checks, then individual toggles.
fn apply_changes(args: &SelectArgs, controller: &mut SelectionController) -> Result<(), SessionError> {
    if args.all {
        controller.enter_match_all();
    } else if let Some(pattern) = &args.keyword {
        controller.enter_keyword(pattern);
    } else if args.manual {
        controller.enter_manual();
    }

    if args.check_all {
        controller.select_all_manual(true);
    } else if args.uncheck_all {
        controller.select_all_manual(false);
    }

    for id in &args.toggle {
        controller.toggle_item(id)?;
    }
    Ok(())
}

pub fn run_select(args: &SelectArgs, ctx: &Context) -> anyhow::Result<()> {
    let targets = args.targets.target_set()?;
    let mut edges = args.targets.open_edges()?;
    let mut session = open_session(ctx, &args.data)?;

    if args.reset {
        session
            .clear_selection(&targets)
            .map_err(|e| fail(ctx.output, e))?;
    }

    let mut controller = session
        .selection_controller(&targets, &mut edges)
        .map_err(|e| fail(ctx.output, e))?;
    apply_changes(args, &mut controller).map_err(|e| fail(ctx.output, e))?;
    session
        .persist_selection(&targets, &controller)
        .map_err(|e| fail(ctx.output, e))?;

    let view = SelectionView::of(targets.key(), &controller);
    render(ctx.output, &view, |view, w| {
        if ctx.output.is_pretty() {
            pretty_section(w, &format!("Selection for {}", view.target))?;
            pretty_kv(w, "mode", view.mode)?;
            if let Some(pattern) = &view.pattern {
                pretty_kv(w, "keyword", pattern)?;
            }
            pretty_kv(w, "selected", view.count.to_string())?;
        } else {
            writeln!(w, "{} {} {}", view.target, view.mode, view.count)?;
        }
        for id in &view.selected {
            writeln!(w, "{id}")?;
        }
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use lineup_core::model::{Dataset, Item};
    use lineup_core::selection::KeywordExitPolicy;

    #[derive(Parser)]
    struct Wrapper {
        #[command(flatten)]
        args: SelectArgs,
    }

    fn parse(extra: &[&str]) -> SelectArgs {
        let mut argv = vec!["test", "--data", "items.json", "--edges", "edges.json", "--target", "L1"];
        argv.extend_from_slice(extra);
        Wrapper::parse_from(argv).args
    }

    fn controller() -> SelectionController {
        SelectionController::new(
            Dataset::new(vec![
                Item::new("V1", "DM", "Id", "A", "Employment Type"),
                Item::new("V2", "DM", "Id", "B", "Birth Date"),
            ]),
            KeywordExitPolicy::RestoreManual,
        )
    }

    #[test]
    fn all_conflicts_with_keyword() {
        let parsed = Wrapper::try_parse_from([
            "test", "--data", "d", "--edges", "e", "--target", "L1", "--all", "--keyword", "x",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn target_is_required() {
        let parsed = Wrapper::try_parse_from(["test", "--data", "d", "--edges", "e"]);
        assert!(parsed.is_err());
    }

    #[test]
    fn keyword_then_toggle_adopts_matches() {
        let args = parse(&["--keyword", "emp", "--toggle", "V2"]);
        let mut controller = controller();
        apply_changes(&args, &mut controller).unwrap();
        assert!(controller.mode().is_manual());
        let view = SelectionView::of("L1".into(), &controller);
        assert_eq!(view.selected, vec!["V1".to_string(), "V2".to_string()]);
    }

    #[test]
    fn unknown_toggle_is_an_error() {
        let args = parse(&["--toggle", "V9"]);
        let mut controller = controller();
        let err = apply_changes(&args, &mut controller).unwrap_err();
        assert_eq!(err.code(), lineup_core::ErrorCode::UnknownKey);
    }

    #[test]
    fn view_reports_keyword_pattern() {
        let args = parse(&["--keyword", "birth"]);
        let mut controller = controller();
        apply_changes(&args, &mut controller).unwrap();
        let view = SelectionView::of("L1".into(), &controller);
        assert_eq!(view.mode, "keyword");
        assert_eq!(view.pattern.as_deref(), Some("birth"));
        assert_eq!(view.count, 1);
    }
}
