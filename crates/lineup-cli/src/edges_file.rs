//! Relationship store backed by a JSON file of `{source, target}` pairs.
//!
//! Every write is flushed to disk before it is applied in memory, so an
//! interrupted `lineup apply` leaves the file matching the writes that
//! completed, and a write whose flush failed is not picked up by a later one.

use anyhow::{Context, bail};
use lineup_core::edges::{EdgeStore, RelationshipEdge};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub struct FileEdgeStore {
    path: PathBuf,
    edges: BTreeSet<RelationshipEdge>,
}

impl FileEdgeStore {
    /// Load `path`; a missing file is an empty store.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let edges = if path.exists() {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let list: Vec<RelationshipEdge> = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            list.into_iter().collect()
        } else {
            BTreeSet::new()
        };
        Ok(Self {
            path: path.to_path_buf(),
            edges,
        })
    }

    /// Write `next` to disk and adopt it only once the write succeeded.
    fn commit(&mut self, next: BTreeSet<RelationshipEdge>) -> anyhow::Result<()> {
        let list: Vec<&RelationshipEdge> = next.iter().collect();
        let body = serde_json::to_string_pretty(&list)?;
        fs::write(&self.path, body)
            .with_context(|| format!("Failed to write {}", self.path.display()))?;
        self.edges = next;
        Ok(())
    }
}

impl EdgeStore for FileEdgeStore {
    type Error = anyhow::Error;

    fn list_edges(&mut self, target: &str) -> anyhow::Result<BTreeSet<RelationshipEdge>> {
        Ok(self
            .edges
            .iter()
            .filter(|edge| edge.target == target)
            .cloned()
            .collect())
    }

    fn create_edge(&mut self, source: &str, target: &str) -> anyhow::Result<()> {
        let edge = RelationshipEdge::new(source, target);
        if self.edges.contains(&edge) {
            bail!("edge {edge} already exists");
        }
        let mut next = self.edges.clone();
        next.insert(edge);
        self.commit(next)
    }

    fn delete_edge(&mut self, source: &str, target: &str) -> anyhow::Result<()> {
        let edge = RelationshipEdge::new(source, target);
        let mut next = self.edges.clone();
        if !next.remove(&edge) {
            bail!("edge {edge} does not exist");
        }
        self.commit(next)
    }

    fn edge_exists(&mut self, source: &str, target: &str) -> anyhow::Result<bool> {
        Ok(self.edges.contains(&RelationshipEdge::new(source, target)))
    }
}
