//! Presentation ordering: hierarchical order or custom column rules.
//!
//! A [`Comparator`] is built in exactly one of two modes. With a
//! [`HierarchicalOrder`] it ranks items by their `(level1, level2, level3)`
//! positions. Without one it applies [`SortRule`]s in list order, each
//! comparing the named column as lowercase text. The two are never combined
//! in one pass.
//!
//! While the hierarchy is active the level columns are not eligible as rule
//! columns; [`validate_rules`] enforces that.

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::ErrorCode;
use crate::model::Item;
use crate::model::item::{COLUMN_LEVEL1, COLUMN_LEVEL2, COLUMN_LEVEL3};
use crate::order::hierarchy::PositionIndex;
use crate::order::{HierarchicalOrder, move_within};

/// Columns that make up the hierarchical order.
pub const HIERARCHY_COLUMNS: [&str; 3] = [COLUMN_LEVEL1, COLUMN_LEVEL2, COLUMN_LEVEL3];

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// Direction of a single sort rule.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    #[default]
    #[serde(rename = "asc")]
    Ascending,
    #[serde(rename = "desc")]
    Descending,
}

impl SortDirection {
    #[must_use]
    pub const fn reversed(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    const fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ascending => f.write_str("asc"),
            Self::Descending => f.write_str("desc"),
        }
    }
}

impl FromStr for SortDirection {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "asc" | "ascending" | "up" => Ok(Self::Ascending),
            "desc" | "descending" | "down" => Ok(Self::Descending),
            other => bail!("unknown sort direction '{other}': expected asc or desc"),
        }
    }
}

/// One column of a lexicographic comparator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortRule {
    pub column: String,
    #[serde(default)]
    pub order: SortDirection,
}

impl SortRule {
    pub fn new(column: impl Into<String>, order: SortDirection) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    fn compare(&self, a: &Item, b: &Item) -> Ordering {
        let left = a.column(&self.column).unwrap_or_default().to_lowercase();
        let right = b.column(&self.column).unwrap_or_default().to_lowercase();
        self.order.apply(left.cmp(&right))
    }
}

impl fmt::Display for SortRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.column, self.order)
    }
}

/// Parses `column` or `column:asc|desc`.
impl FromStr for SortRule {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let (column, order) = match s.rsplit_once(':') {
            Some((column, order)) => (column.trim(), order.parse()?),
            None => (s.trim(), SortDirection::Ascending),
        };
        if column.is_empty() {
            bail!("sort rule '{s}' has no column");
        }
        Ok(Self::new(column, order))
    }
}

/// Errors raised when a rule list is not usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SortError {
    #[error("column '{0}' cannot be a sort rule while the hierarchical order is active")]
    IneligibleColumn(String),

    #[error("column '{0}' appears in more than one sort rule")]
    RepeatedColumn(String),

    #[error("sort rule index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

impl SortError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::IneligibleColumn(_) | Self::RepeatedColumn(_) => ErrorCode::IneligibleSortColumn,
            Self::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
        }
    }
}

/// Whether `column` may appear in a rule.
#[must_use]
pub fn is_eligible(column: &str, hierarchy_active: bool) -> bool {
    !(hierarchy_active && HIERARCHY_COLUMNS.contains(&column))
}

/// Check a rule list for ineligible or repeated columns.
///
/// # Errors
///
/// Returns the first offending column.
pub fn validate_rules(rules: &[SortRule], hierarchy_active: bool) -> Result<(), SortError> {
    let mut seen = std::collections::HashSet::new();
    for rule in rules {
        if !is_eligible(&rule.column, hierarchy_active) {
            return Err(SortError::IneligibleColumn(rule.column.clone()));
        }
        if !seen.insert(rule.column.as_str()) {
            return Err(SortError::RepeatedColumn(rule.column.clone()));
        }
    }
    Ok(())
}

/// Editable, validated list of sort rules.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SortRules {
    rules: Vec<SortRule>,
}

impl SortRules {
    #[must_use]
    pub const fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Build from an existing list.
    ///
    /// # Errors
    ///
    /// See [`validate_rules`].
    pub fn from_rules(rules: Vec<SortRule>, hierarchy_active: bool) -> Result<Self, SortError> {
        validate_rules(&rules, hierarchy_active)?;
        Ok(Self { rules })
    }

    #[must_use]
    pub fn as_slice(&self) -> &[SortRule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Append a rule as the lowest-priority tie-breaker.
    ///
    /// # Errors
    ///
    /// Rejects ineligible columns and columns already present.
    pub fn add_rule(&mut self, rule: SortRule, hierarchy_active: bool) -> Result<(), SortError> {
        if !is_eligible(&rule.column, hierarchy_active) {
            return Err(SortError::IneligibleColumn(rule.column));
        }
        if self.rules.iter().any(|r| r.column == rule.column) {
            return Err(SortError::RepeatedColumn(rule.column));
        }
        self.rules.push(rule);
        Ok(())
    }

    /// Remove and return the rule at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::IndexOutOfRange`].
    pub fn remove_rule(&mut self, index: usize) -> Result<SortRule, SortError> {
        self.check(index)?;
        Ok(self.rules.remove(index))
    }

    /// Flip the direction of the rule at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::IndexOutOfRange`].
    pub fn toggle_direction(&mut self, index: usize) -> Result<SortDirection, SortError> {
        self.check(index)?;
        let rule = &mut self.rules[index];
        rule.order = rule.order.reversed();
        Ok(rule.order)
    }

    /// Change a rule's priority. `to` is the rule's final index.
    ///
    /// # Errors
    ///
    /// Returns [`SortError::IndexOutOfRange`].
    pub fn move_rule(&mut self, from: usize, to: usize) -> Result<(), SortError> {
        self.check(from)?;
        self.check(to)?;
        move_within(&mut self.rules, from, to);
        Ok(())
    }

    fn check(&self, index: usize) -> Result<(), SortError> {
        if index < self.rules.len() {
            Ok(())
        } else {
            Err(SortError::IndexOutOfRange {
                index,
                len: self.rules.len(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Comparator
// ---------------------------------------------------------------------------

/// A single ordering function over items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparator {
    /// Rank by position in each tier of a hierarchical order.
    Hierarchical(PositionIndex),
    /// Apply column rules in priority order.
    Rules(Vec<SortRule>),
}

impl Comparator {
    /// Hierarchical when `order` is given, otherwise rule-based.
    #[must_use]
    pub fn new(order: Option<&HierarchicalOrder>, rules: &[SortRule]) -> Self {
        order.map_or_else(
            || Self::Rules(rules.to_vec()),
            |order| Self::Hierarchical(order.positions()),
        )
    }

    /// Compare two items. Items with equal keys compare `Equal`.
    #[must_use]
    pub fn compare(&self, a: &Item, b: &Item) -> Ordering {
        match self {
            Self::Hierarchical(index) => index.rank(a).cmp(&index.rank(b)),
            Self::Rules(rules) => rules
                .iter()
                .map(|rule| rule.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal),
        }
    }

    #[must_use]
    pub const fn is_hierarchical(&self) -> bool {
        matches!(self, Self::Hierarchical(_))
    }
}

/// Sort `items` in place. Ties keep their input order.
pub fn sort_items(items: &mut [Item], comparator: &Comparator) {
    items.sort_by(|a, b| comparator.compare(a, b));
}
