use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Column names that address the built-in fields of an [`Item`].
pub const COLUMN_ID: &str = "id";
pub const COLUMN_NAME: &str = "name";
pub const COLUMN_LEVEL1: &str = "level1";
pub const COLUMN_LEVEL2: &str = "level2";
pub const COLUMN_LEVEL3: &str = "level3";

/// One leaf row of a dataset snapshot.
///
/// `level1` is globally unique, `level2` only within its `level1`, and
/// `level3` only within its `(level1, level2)` pair. `id` is the identifier
/// used by the relationship store and is unique across the snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    pub level1: String,
    pub level2: String,
    pub level3: String,
    /// Primary display name, matched by keyword selection.
    pub name: String,
    /// Additional columns that sort rules may reference.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub columns: BTreeMap<String, String>,
}

impl Item {
    /// Build an item with no extra columns.
    pub fn new(
        id: impl Into<String>,
        level1: impl Into<String>,
        level2: impl Into<String>,
        level3: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            level1: level1.into(),
            level2: level2.into(),
            level3: level3.into(),
            name: name.into(),
            columns: BTreeMap::new(),
        }
    }

    /// Attach an extra column value.
    #[must_use]
    pub fn with_column(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.columns.insert(key.into(), value.into());
        self
    }

    /// Resolve a column by name. Built-in fields shadow extra columns.
    #[must_use]
    pub fn column(&self, key: &str) -> Option<&str> {
        match key {
            COLUMN_ID => Some(&self.id),
            COLUMN_NAME => Some(&self.name),
            COLUMN_LEVEL1 => Some(&self.level1),
            COLUMN_LEVEL2 => Some(&self.level2),
            COLUMN_LEVEL3 => Some(&self.level3),
            other => self.columns.get(other).map(String::as_str),
        }
    }
}
