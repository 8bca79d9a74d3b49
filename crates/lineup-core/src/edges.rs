//! Relationship edges and the store that holds them.
//!
//! The store is whatever remote system owns the many-to-many relationship
//! between items and targets. Any type implementing [`EdgeStore`] can be used:
//! an HTTP client, a database table, or [`MemoryEdgeStore`] in tests.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// A `(source, target)` pair. At most one edge exists per pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RelationshipEdge {
    /// The item id.
    pub source: String,
    /// The target (list) id.
    pub target: String,
}

impl RelationshipEdge {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for RelationshipEdge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.source, self.target)
    }
}

// ---------------------------------------------------------------------------
// Store trait
// ---------------------------------------------------------------------------

/// Query and mutation interface of the remote relationship store.
///
/// Calls are issued one at a time by the reconciler; implementations need not
/// be thread-safe.
pub trait EdgeStore {
    /// Error type for store operations.
    type Error: fmt::Debug + fmt::Display;

    /// Every edge pointing at `target`.
    fn list_edges(&mut self, target: &str) -> Result<BTreeSet<RelationshipEdge>, Self::Error>;

    /// Create the edge `(source, target)`.
    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error>;

    /// Delete the edge `(source, target)`.
    fn delete_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error>;

    /// Whether the edge `(source, target)` exists right now.
    ///
    /// The default lists the target's edges; stores with a point lookup
    /// should override it.
    fn edge_exists(&mut self, source: &str, target: &str) -> Result<bool, Self::Error> {
        Ok(self
            .list_edges(target)?
            .iter()
            .any(|edge| edge.source == source))
    }
}

// ---------------------------------------------------------------------------
// In-memory store
// ---------------------------------------------------------------------------

/// A write issued against a [`MemoryEdgeStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EdgeWrite {
    Create(RelationshipEdge),
    Delete(RelationshipEdge),
}

/// Errors produced by [`MemoryEdgeStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MemoryEdgeError {
    #[error("edge {0} already exists")]
    AlreadyExists(RelationshipEdge),
    #[error("edge {0} does not exist")]
    Missing(RelationshipEdge),
    #[error("injected failure for edge {0}")]
    Injected(RelationshipEdge),
    #[error("injected failure listing target '{0}'")]
    ListFailed(String),
}

/// Edge store backed by a `BTreeSet`, with failure injection for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryEdgeStore {
    edges: BTreeSet<RelationshipEdge>,
    failing_edges: BTreeSet<RelationshipEdge>,
    failing_targets: BTreeSet<String>,
    writes: Vec<EdgeWrite>,
}

impl MemoryEdgeStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the store with existing edges.
    #[must_use]
    pub fn with_edges(edges: impl IntoIterator<Item = RelationshipEdge>) -> Self {
        Self {
            edges: edges.into_iter().collect(),
            ..Self::default()
        }
    }

    /// Make every write touching `edge` fail.
    pub fn fail_on(&mut self, edge: RelationshipEdge) {
        self.failing_edges.insert(edge);
    }

    /// Make listing `target` fail.
    pub fn fail_listing(&mut self, target: impl Into<String>) {
        self.failing_targets.insert(target.into());
    }

    /// Insert an edge behind the reconciler's back, as a concurrent writer would.
    pub fn insert_external(&mut self, edge: RelationshipEdge) {
        self.edges.insert(edge);
    }

    #[must_use]
    pub const fn edges(&self) -> &BTreeSet<RelationshipEdge> {
        &self.edges
    }

    /// Successful writes in the order they were issued.
    #[must_use]
    pub fn writes(&self) -> &[EdgeWrite] {
        &self.writes
    }
}

impl EdgeStore for MemoryEdgeStore {
    type Error = MemoryEdgeError;

    fn list_edges(&mut self, target: &str) -> Result<BTreeSet<RelationshipEdge>, Self::Error> {
        if self.failing_targets.contains(target) {
            return Err(MemoryEdgeError::ListFailed(target.to_string()));
        }
        Ok(self
            .edges
            .iter()
            .filter(|edge| edge.target == target)
            .cloned()
            .collect())
    }

    fn create_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error> {
        let edge = RelationshipEdge::new(source, target);
        if self.failing_edges.contains(&edge) {
            return Err(MemoryEdgeError::Injected(edge));
        }
        if !self.edges.insert(edge.clone()) {
            return Err(MemoryEdgeError::AlreadyExists(edge));
        }
        self.writes.push(EdgeWrite::Create(edge));
        Ok(())
    }

    fn delete_edge(&mut self, source: &str, target: &str) -> Result<(), Self::Error> {
        let edge = RelationshipEdge::new(source, target);
        if self.failing_edges.contains(&edge) {
            return Err(MemoryEdgeError::Injected(edge));
        }
        if !self.edges.remove(&edge) {
            return Err(MemoryEdgeError::Missing(edge));
        }
        self.writes.push(EdgeWrite::Delete(edge));
        Ok(())
    }

    fn edge_exists(&mut self, source: &str, target: &str) -> Result<bool, Self::Error> {
        Ok(self.edges.contains(&RelationshipEdge::new(source, target)))
    }
}
