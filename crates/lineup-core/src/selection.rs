//! Selection modes for choosing which items should be related to a target.
//!
//! # Modes
//!
//! - **Manual**: the user's per-item toggles ([`SelectionState`]).
//! - **MatchAll**: every item in the current dataset. Recomputed from the
//!   dataset on every read, never frozen.
//! - **Keyword**: items whose name contains every whitespace-separated token
//!   of the pattern, case-insensitively. Also recomputed on every read.
//!
//! The manual snapshot survives mode switches. Toggling an item while a
//! derived mode is active first adopts the derived set as the new manual
//! snapshot, then flips the item.
//!
//! # Leaving keyword mode
//!
//! What Manual shows after leaving Keyword without a toggle is governed by
//! [`KeywordExitPolicy`]: either the pre-keyword snapshot comes back
//! (`RestoreManual`, the default) or the keyword matches become the new
//! snapshot (`AdoptMatches`).

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::debug;

use crate::error::ErrorCode;
use crate::model::{Dataset, Item};

// ---------------------------------------------------------------------------
// Keyword patterns
// ---------------------------------------------------------------------------

/// A keyword pattern with at least one token.
///
/// Construction goes through [`KeywordPattern::parse`], so Keyword mode can
/// never hold an empty pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeywordPattern {
    raw: String,
    tokens: Vec<String>,
}

impl KeywordPattern {
    /// Split on whitespace and lower-case. Returns `None` if no token remains.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let tokens: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();
        if tokens.is_empty() {
            return None;
        }
        Some(Self {
            raw: raw.to_string(),
            tokens,
        })
    }

    /// The pattern as the user typed it.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// AND semantics: every token must be a substring of the lower-cased name.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.tokens.iter().all(|token| name.contains(token.as_str()))
    }
}

impl fmt::Display for KeywordPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Ids of every item whose name matches `pattern`.
#[must_use]
pub fn keyword_matches(items: &[Item], pattern: &KeywordPattern) -> BTreeSet<String> {
    items
        .iter()
        .filter(|item| pattern.matches(&item.name))
        .map(|item| item.id.clone())
        .collect()
}

// ---------------------------------------------------------------------------
// Mode and state
// ---------------------------------------------------------------------------

/// The active selection mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionMode {
    Manual,
    MatchAll,
    Keyword(KeywordPattern),
}

impl SelectionMode {
    #[must_use]
    pub const fn is_manual(&self) -> bool {
        matches!(self, Self::Manual)
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::MatchAll => "match_all",
            Self::Keyword(_) => "keyword",
        }
    }
}

/// What Manual mode shows after leaving Keyword mode without a toggle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeywordExitPolicy {
    /// Bring back the manual snapshot from before the keyword was entered.
    #[default]
    RestoreManual,
    /// Make the keyword matches the new manual snapshot.
    AdoptMatches,
}

/// The manual-mode snapshot: item id to selected flag.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionState {
    flags: BTreeMap<String, bool>,
}

impl SelectionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot with exactly `ids` selected.
    pub fn from_selected<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            flags: ids.into_iter().map(|id| (id.into(), true)).collect(),
        }
    }

    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        self.flags.get(id).copied().unwrap_or(false)
    }

    pub fn set(&mut self, id: impl Into<String>, selected: bool) {
        self.flags.insert(id.into(), selected);
    }

    /// Flip one item and return its new value.
    pub fn toggle(&mut self, id: &str) -> bool {
        let flag = self.flags.entry(id.to_string()).or_insert(false);
        *flag = !*flag;
        *flag
    }

    /// Ids currently flagged as selected.
    #[must_use]
    pub fn selected(&self) -> BTreeSet<String> {
        self.flags
            .iter()
            .filter(|(_, selected)| **selected)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Forget ids the predicate rejects.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.flags.retain(|id, _| keep(id));
    }

    /// The ids whose flag differs from `baseline`, with their flag here.
    #[must_use]
    pub fn changes_from(&self, baseline: &BTreeSet<String>) -> BTreeMap<String, bool> {
        baseline
            .iter()
            .chain(self.flags.keys())
            .filter(|id| self.is_selected(id) != baseline.contains(*id))
            .map(|id| (id.clone(), self.is_selected(id)))
            .collect()
    }
}

/// Errors raised by selection transitions.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("item '{0}' is not in the dataset")]
    UnknownItem(String),
}

impl SelectionError {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownItem(_) => ErrorCode::UnknownKey,
        }
    }
}

// ---------------------------------------------------------------------------
// Controller
// ---------------------------------------------------------------------------

/// State machine over [`SelectionMode`] for one target scope.
#[derive(Debug, Clone)]
pub struct SelectionController {
    dataset: Dataset,
    mode: SelectionMode,
    manual: SelectionState,
    /// Ids related to the target when it was last retargeted.
    baseline: BTreeSet<String>,
    policy: KeywordExitPolicy,
}

impl SelectionController {
    /// Manual mode with an empty snapshot.
    #[must_use]
    pub fn new(dataset: Dataset, policy: KeywordExitPolicy) -> Self {
        Self {
            dataset,
            mode: SelectionMode::Manual,
            manual: SelectionState::new(),
            baseline: BTreeSet::new(),
            policy,
        }
    }

    #[must_use]
    pub const fn mode(&self) -> &SelectionMode {
        &self.mode
    }

    #[must_use]
    pub const fn manual_state(&self) -> &SelectionState {
        &self.manual
    }

    #[must_use]
    pub const fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Switch to Manual, keeping the last manual snapshot.
    ///
    /// When leaving Keyword mode the [`KeywordExitPolicy`] applies.
    pub fn enter_manual(&mut self) {
        if let SelectionMode::Keyword(pattern) = &self.mode {
            if self.policy == KeywordExitPolicy::AdoptMatches {
                let matches = keyword_matches(self.dataset.items(), pattern);
                self.manual = SelectionState::from_selected(matches);
            }
        }
        self.set_mode(SelectionMode::Manual);
    }

    /// Switch to MatchAll. The selection follows the dataset from now on.
    pub fn enter_match_all(&mut self) {
        self.set_mode(SelectionMode::MatchAll);
    }

    /// Switch to Keyword with `raw`. An empty or blank pattern goes back to
    /// Manual instead.
    pub fn enter_keyword(&mut self, raw: &str) {
        match KeywordPattern::parse(raw) {
            Some(pattern) => self.set_mode(SelectionMode::Keyword(pattern)),
            None => self.enter_manual(),
        }
    }

    /// Clear the keyword pattern, which returns to Manual.
    pub fn clear_keyword(&mut self) {
        self.enter_keyword("");
    }

    /// Restore a mode read back from persistence without applying the
    /// keyword exit policy.
    pub fn restore_mode(&mut self, mode: SelectionMode) {
        self.mode = mode;
    }

    /// Flip one item. In a derived mode the derived set becomes the manual
    /// snapshot first, then the flip applies in Manual mode.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::UnknownItem`] if the id is not in the dataset.
    pub fn toggle_item(&mut self, id: &str) -> Result<bool, SelectionError> {
        if !self.dataset.contains(id) {
            return Err(SelectionError::UnknownItem(id.to_string()));
        }
        if !self.mode.is_manual() {
            let adopted = self.current_selection();
            self.manual = SelectionState::from_selected(adopted);
            self.set_mode(SelectionMode::Manual);
        }
        Ok(self.manual.toggle(id))
    }

    /// Select or clear every item in Manual mode.
    pub fn select_all_manual(&mut self, selected: bool) {
        self.manual = SelectionState::new();
        for item in self.dataset.items() {
            self.manual.set(item.id.clone(), selected);
        }
        self.set_mode(SelectionMode::Manual);
    }

    /// Replace the dataset snapshot. Derived modes follow automatically;
    /// the manual snapshot forgets ids that are gone.
    pub fn set_dataset(&mut self, dataset: Dataset) {
        self.dataset = dataset;
        let dataset = &self.dataset;
        self.manual.retain(|id| dataset.contains(id));
    }

    /// Rebuild for a new target: the manual snapshot becomes the ids that
    /// already have an edge to the target, and `mode` becomes active.
    pub fn retarget(&mut self, existing: &BTreeSet<String>, mode: SelectionMode) {
        let dataset = &self.dataset;
        self.baseline = existing
            .iter()
            .filter(|id| dataset.contains(id))
            .cloned()
            .collect();
        self.manual = SelectionState::from_selected(self.baseline.iter().cloned());
        self.mode = mode;
    }

    /// Manual flags that differ from the edges seen at the last retarget.
    #[must_use]
    pub fn manual_changes(&self) -> BTreeMap<String, bool> {
        self.manual.changes_from(&self.baseline)
    }

    /// Lay previously recorded toggles over the current manual snapshot.
    /// Ids no longer in the dataset are skipped.
    pub fn apply_manual_changes(&mut self, changes: &BTreeMap<String, bool>) {
        for (id, selected) in changes {
            if self.dataset.contains(id) {
                self.manual.set(id.clone(), *selected);
            }
        }
    }

    /// The selected ids for the active mode, derived on every call.
    #[must_use]
    pub fn current_selection(&self) -> BTreeSet<String> {
        match &self.mode {
            SelectionMode::Manual => self
                .manual
                .selected()
                .into_iter()
                .filter(|id| self.dataset.contains(id))
                .collect(),
            SelectionMode::MatchAll => self.dataset.ids(),
            SelectionMode::Keyword(pattern) => keyword_matches(self.dataset.items(), pattern),
        }
    }

    /// Whether one item is selected under the active mode.
    #[must_use]
    pub fn is_selected(&self, id: &str) -> bool {
        let Some(item) = self.dataset.get(id) else {
            return false;
        };
        match &self.mode {
            SelectionMode::Manual => self.manual.is_selected(id),
            SelectionMode::MatchAll => true,
            SelectionMode::Keyword(pattern) => pattern.matches(&item.name),
        }
    }

    fn set_mode(&mut self, mode: SelectionMode) {
        if self.mode != mode {
            debug!(from = self.mode.name(), to = mode.name(), "selection mode changed");
        }
        self.mode = mode;
    }
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ModeTag {
    Manual,
    MatchAll,
    Keyword,
}

/// Persisted form of a target's selection mode and manual toggles.
///
/// `{"mode":"keyword","pattern":"emp type","changes":{"V3":true}}`. Only
/// toggles that differ from the edges at capture time are kept, so items the
/// user never touched follow the live edges when the blob is read back. A
/// keyword blob with a blank pattern reads back as Manual.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionBlob {
    mode: ModeTag,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pattern: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    changes: BTreeMap<String, bool>,
}

impl SelectionBlob {
    /// Capture a controller's mode and its manual toggles.
    #[must_use]
    pub fn capture(controller: &SelectionController) -> Self {
        let (mode, pattern) = match controller.mode() {
            SelectionMode::Manual => (ModeTag::Manual, None),
            SelectionMode::MatchAll => (ModeTag::MatchAll, None),
            SelectionMode::Keyword(pattern) => (ModeTag::Keyword, Some(pattern.as_str().to_string())),
        };
        Self {
            mode,
            pattern,
            changes: controller.manual_changes(),
        }
    }

    #[must_use]
    pub fn mode(&self) -> SelectionMode {
        match self.mode {
            ModeTag::Manual => SelectionMode::Manual,
            ModeTag::MatchAll => SelectionMode::MatchAll,
            ModeTag::Keyword => self
                .pattern
                .as_deref()
                .and_then(KeywordPattern::parse)
                .map_or(SelectionMode::Manual, SelectionMode::Keyword),
        }
    }

    #[must_use]
    pub const fn changes(&self) -> &BTreeMap<String, bool> {
        &self.changes
    }

    /// # Errors
    ///
    /// Returns a JSON error if serialization fails.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// # Errors
    ///
    /// Returns a JSON error if the blob is not a valid selection blob.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
