//! `lineup move`: reorder one key within a scope of the hierarchy.

use crate::cmd::{Context, DataArgs, open_session};
use crate::output::{CliError, OutputMode, fail, render, render_error};
use clap::Args;
use lineup_core::order::ScopeKey;
use lineup_core::session::SessionError;
use serde_json::json;

#[derive(Args, Debug)]
pub struct MoveArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Hierarchy tier of the list to reorder.
    #[arg(long, value_parser = clap::value_parser!(u8).range(1..=3))]
    pub tier: u8,

    /// Parent level1 key (tiers 2 and 3).
    #[arg(long)]
    pub level1: Option<String>,

    /// Parent level2 key (tier 3).
    #[arg(long)]
    pub level2: Option<String>,

    /// Current position of the key to move.
    #[arg(long, required_unless_present = "key", conflicts_with = "key")]
    pub from: Option<usize>,

    /// Key to move, looked up in the list.
    #[arg(long)]
    pub key: Option<String>,

    /// Final position of the key.
    #[arg(long)]
    pub to: usize,

    /// Treat --to as a drop slot between rows (0 through the list length).
    #[arg(long, requires = "from")]
    pub slot: bool,

    /// Save the result so later sessions see it.
    #[arg(long)]
    pub commit: bool,
}

/// Build the scope a `--tier` selects, or explain which parent is missing.
fn scope_for(args: &MoveArgs) -> Result<ScopeKey, String> {
    match (args.tier, args.level1.as_deref(), args.level2.as_deref()) {
        (1, _, _) => Ok(ScopeKey::Level1),
        (2, Some(level1), _) => Ok(ScopeKey::level2(level1)),
        (3, Some(level1), Some(level2)) => Ok(ScopeKey::level3(level1, level2)),
        (2, None, _) => Err("--tier 2 needs --level1".to_string()),
        (_, _, _) => Err("--tier 3 needs --level1 and --level2".to_string()),
    }
}

pub fn run_move(args: &MoveArgs, ctx: &Context) -> anyhow::Result<()> {
    let output: OutputMode = ctx.output;
    let scope = match scope_for(args) {
        Ok(scope) => scope,
        Err(message) => {
            render_error(output, &CliError::new(&message))?;
            anyhow::bail!("{message}");
        }
    };

    let mut session = open_session(ctx, &args.data)?;
    let (mut store, _) = session.order_store().map_err(|e| fail(output, e))?;

    let moved = match (args.from, args.key.as_deref()) {
        (Some(from), _) => {
            // An out-of-range `from` is reported by the store itself.
            let key = store
                .working(&scope)
                .and_then(|list| list.get(from))
                .cloned()
                .unwrap_or_default();
            if args.slot {
                store.drop_item(&scope, &key, from, args.to)
            } else {
                store.move_item(&scope, &key, from, args.to)
            }
        }
        (None, key) => store.move_key(&scope, key.unwrap_or_default(), args.to),
    };
    moved.map_err(|e| fail(output, SessionError::from(e)))?;

    if args.commit {
        session
            .commit_order(&mut store, &scope)
            .map_err(|e| fail(output, e))?;
    }

    let val = json!({
        "scope": scope.to_string(),
        "order": store.working(&scope),
        "committed": args.commit,
        "dirty": store.is_dirty(&scope),
    });

    render(output, &val, |v, w| {
        let order: Vec<&str> = v["order"]
            .as_array()
            .map(|keys| keys.iter().filter_map(|k| k.as_str()).collect())
            .unwrap_or_default();
        let state = if args.commit { "saved" } else { "not saved" };
        writeln!(w, "✓ {}: {} ({state})", scope, order.join(", "))
    })
}
