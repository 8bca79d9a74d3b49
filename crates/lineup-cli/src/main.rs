#![forbid(unsafe_code)]

mod cmd;
mod edges_file;
mod output;

use clap::{Parser, Subcommand};
use lineup_core::config;
use output::OutputMode;
use std::env;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "lineup: hierarchical ordering, selection and relationship reconciliation",
    long_about = None
)]
struct Cli {
    /// Emit JSON output instead of human-readable text.
    #[arg(long, global = true)]
    json: bool,

    /// Project root holding `.lineup/` (defaults to the current directory).
    #[arg(long, global = true, value_name = "DIR")]
    project: Option<PathBuf>,

    /// Preference scope; orders and selections are saved per scope.
    #[arg(long, global = true, default_value = "default")]
    scope: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    #[command(
        next_help_heading = "Ordering",
        about = "Print items in presentation order",
        long_about = "Print the dataset sorted by the saved hierarchical order, or by column rules.",
        after_help = "EXAMPLES:\n    # Hierarchical order\n    lineup order --data items.json\n\n    # Column rules\n    lineup order --data items.json --sort level1 --sort name:desc\n\n    # Show the per-scope lists\n    lineup order --data items.json --lists"
    )]
    Order(cmd::order::OrderArgs),

    #[command(
        next_help_heading = "Ordering",
        about = "Move a key within one scope",
        long_about = "Reorder one key inside a level1, level2 or level3 list and optionally save it.",
        after_help = "EXAMPLES:\n    # Move the first domain to the third position and save\n    lineup move --data items.json --tier 1 --from 0 --to 2 --commit\n\n    # Move a variable by key within DM/Id\n    lineup move --data items.json --tier 3 --level1 DM --level2 Id --key USUBJID --to 0"
    )]
    Move(cmd::move_cmd::MoveArgs),

    #[command(
        next_help_heading = "Selection",
        about = "Change the selection for a target",
        long_about = "Switch selection mode, toggle items, and persist the result for the target set.",
        after_help = "EXAMPLES:\n    # Select by keyword\n    lineup select --data items.json --edges edges.json --target L1 --keyword \"emp type\"\n\n    # Hand-pick items\n    lineup select --data items.json --edges edges.json --target L1 --manual --toggle V3"
    )]
    Select(cmd::select::SelectArgs),

    #[command(
        next_help_heading = "Reconciliation",
        about = "Show the edge writes the selection implies",
        after_help = "EXAMPLES:\n    # Single target\n    lineup plan --data items.json --edges edges.json --target L1\n\n    # Bulk grant\n    lineup plan --data items.json --edges edges.json --target L1 --target L2"
    )]
    Plan(cmd::plan::PlanArgs),

    #[command(
        next_help_heading = "Reconciliation",
        about = "Write the planned edges",
        after_help = "EXAMPLES:\n    # Apply the plan\n    lineup apply --data items.json --edges edges.json --target L1\n\n    # Show what would be written\n    lineup apply --data items.json --edges edges.json --target L1 --dry-run"
    )]
    Apply(cmd::apply::ApplyArgs),
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("LINEUP_LOG").unwrap_or_else(|_| {
        EnvFilter::new(if env::var("DEBUG").is_ok() {
            "lineup=debug,info"
        } else {
            "lineup=info,warn"
        })
    });

    let format = env::var("LINEUP_LOG_FORMAT").unwrap_or_else(|_| "compact".to_string());

    let registry = tracing_subscriber::registry().with(filter);

    match format.as_str() {
        "json" => {
            registry
                .with(fmt::layer().json().with_ansi(false).with_writer(std::io::stderr))
                .init();
        }
        _ => {
            registry
                .with(fmt::layer().compact().with_writer(std::io::stderr))
                .init();
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let project_root = match cli.project {
        Some(ref root) => root.clone(),
        None => env::current_dir()?,
    };

    let effective = config::resolve_config(&project_root, cli.json)?;
    let ctx = cmd::Context {
        project_root,
        scope: cli.scope.clone(),
        output: OutputMode::from_resolved(&effective.resolved_output),
        config: effective.project,
    };
    debug!(root = %ctx.project_root.display(), scope = %ctx.scope, "resolved context");

    match cli.command {
        Commands::Order(ref args) => cmd::order::run_order(args, &ctx),
        Commands::Move(ref args) => cmd::move_cmd::run_move(args, &ctx),
        Commands::Select(ref args) => cmd::select::run_select(args, &ctx),
        Commands::Plan(ref args) => cmd::plan::run_plan(args, &ctx),
        Commands::Apply(ref args) => cmd::apply::run_apply(args, &ctx),
    }
}
