//! `lineup order`: print the dataset in presentation order.

use crate::cmd::{Context, DataArgs, open_session};
use crate::output::{fail, pretty_section, render};
use clap::Args;
use lineup_core::model::Item;
use lineup_core::sort::SortRule;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct OrderArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Sort by column rules instead of the hierarchical order.
    #[arg(long)]
    pub no_hierarchy: bool,

    /// Column rule `column[:asc|desc]`; repeat to add tie-breakers. Implies
    /// --no-hierarchy.
    #[arg(long = "sort", value_name = "RULE")]
    pub sort: Vec<SortRule>,

    /// Print the per-scope order lists instead of the sorted items.
    #[arg(long)]
    pub lists: bool,

    /// Forget the saved order for this scope before printing.
    #[arg(long)]
    pub reset: bool,
}

#[derive(Debug, Serialize)]
struct OrderedItems {
    mode: &'static str,
    items: Vec<Item>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    warnings: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ScopeList {
    scope: String,
    order: Vec<String>,
    saved: bool,
}

pub fn run_order(args: &OrderArgs, ctx: &Context) -> anyhow::Result<()> {
    let mut session = open_session(ctx, &args.data)?;
    if args.reset {
        session.clear_order().map_err(|e| fail(ctx.output, e))?;
    }

    let (store, problems) = session.order_store().map_err(|e| fail(ctx.output, e))?;
    let warnings: Vec<String> = problems.iter().map(ToString::to_string).collect();
    if !ctx.output.is_json() {
        for warning in &warnings {
            eprintln!("warning: {warning}");
        }
    }

    if args.lists {
        let lists: Vec<ScopeList> = store
            .export_order()
            .iter()
            .map(|(scope, order)| ScopeList {
                scope: scope.to_string(),
                order: order.clone(),
                saved: store.saved(scope).is_some(),
            })
            .collect();
        return render(ctx.output, &lists, |lists, w| {
            if ctx.output.is_pretty() {
                pretty_section(w, "Order lists")?;
            }
            for list in lists {
                let marker = if list.saved { "" } else { " (default)" };
                writeln!(w, "{}{}: {}", list.scope, marker, list.order.join(", "))?;
            }
            Ok(())
        });
    }

    let hierarchy = ctx.config.order.hierarchy && !args.no_hierarchy && args.sort.is_empty();
    let rules = (!args.sort.is_empty()).then_some(args.sort.as_slice());
    let comparator = session
        .compare_fn(hierarchy, rules)
        .map_err(|e| fail(ctx.output, e))?;

    let view = OrderedItems {
        mode: if comparator.is_hierarchical() {
            "hierarchy"
        } else {
            "rules"
        },
        items: session.sorted_items(&comparator),
        warnings,
    };

    render(ctx.output, &view, |view, w| {
        if ctx.output.is_pretty() {
            pretty_section(w, &format!("{} items ({})", view.items.len(), view.mode))?;
        }
        for item in &view.items {
            writeln!(
                w,
                "{}  {}/{}/{}  {}",
                item.id, item.level1, item.level2, item.level3, item.name
            )?;
        }
        Ok(())
    })
}
