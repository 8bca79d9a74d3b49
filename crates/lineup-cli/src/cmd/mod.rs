pub mod apply;
pub mod move_cmd;
pub mod order;
pub mod plan;
pub mod select;

use anyhow::Context as _;
use clap::Args;
use lineup_core::config::ProjectConfig;
use lineup_core::model::{Dataset, Item};
use lineup_core::prefs::PreferenceStore;
use lineup_core::session::{Session, TargetSet};
use std::path::{Path, PathBuf};

use crate::edges_file::FileEdgeStore;
use crate::output::OutputMode;

/// Everything a command needs besides its own arguments.
#[derive(Debug)]
pub struct Context {
    pub project_root: PathBuf,
    pub scope: String,
    pub output: OutputMode,
    pub config: ProjectConfig,
}

pub type CliSession = Session<Box<dyn PreferenceStore>>;

#[derive(Args, Debug, Clone)]
pub struct DataArgs {
    /// Dataset snapshot: a JSON array of items.
    #[arg(long, value_name = "FILE")]
    pub data: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Relationship edges: a JSON array of `{source, target}` pairs.
    #[arg(long, value_name = "FILE")]
    pub edges: PathBuf,

    /// Target id. Repeat for a bulk grant across several targets.
    #[arg(long = "target", value_name = "ID", required = true)]
    pub targets: Vec<String>,
}

impl TargetArgs {
    pub fn target_set(&self) -> anyhow::Result<TargetSet> {
        Ok(TargetSet::new(self.targets.iter().cloned())?)
    }

    pub fn open_edges(&self) -> anyhow::Result<FileEdgeStore> {
        FileEdgeStore::open(&self.edges)
    }
}

/// Read a dataset snapshot.
pub fn load_dataset(path: &Path) -> anyhow::Result<Dataset> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let items: Vec<Item> = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(Dataset::new(items))
}

/// Open a session over `data` with the configured preference backend.
pub fn open_session(ctx: &Context, data: &DataArgs) -> anyhow::Result<CliSession> {
    let dataset = load_dataset(&data.data)?;
    let prefs = ctx.config.prefs.open(&ctx.project_root)?;
    Ok(Session::new(
        ctx.scope.clone(),
        dataset,
        ctx.config.clone(),
        prefs,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn dataset_file_parses_extra_columns() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(
            &path,
            r#"[{"id":"V1","level1":"DM","level2":"Id","level3":"USUBJID","name":"Subject","columns":{"label":"x"}}]"#,
        )
        .unwrap();
        let dataset = load_dataset(&path).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get("V1").and_then(|i| i.column("label")), Some("x"));
    }

    #[test]
    fn missing_dataset_names_the_file() {
        let err = load_dataset(Path::new("/nonexistent/items.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/items.json"));
    }
}
