//! Three-tier ordering model.
//!
//! Keys are scoped: a Level1 key is global, a Level2 key is meaningful only
//! under its Level1 parent, and a Level3 key only under its `(Level1, Level2)`
//! pair. Every scope owns one [`OrderList`] that must stay a permutation of
//! the keys currently present in that scope.
//!
//! - [`merge`] reconciles a persisted list with the current key set.
//! - [`hierarchy`] holds the flat scope-keyed table of lists.
//! - [`store`] tracks working and saved copies and applies moves.
//! - [`codec`] reads and writes the persisted blob.

pub mod codec;
pub mod hierarchy;
pub mod merge;
pub mod store;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ErrorCode;

pub use hierarchy::HierarchicalOrder;
pub use merge::{default_order, merge_order};
pub use store::HierarchicalOrderStore;

/// An ordered list of keys at one scope.
pub type OrderList = Vec<String>;

/// One of the three hierarchy levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Level1,
    Level2,
    Level3,
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level1 => f.write_str("level1"),
            Self::Level2 => f.write_str("level2"),
            Self::Level3 => f.write_str("level3"),
        }
    }
}

/// Identifies a single order list: the tier plus the parent keys that scope it.
///
/// The variants make a Level3 list without both parents unrepresentable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScopeKey {
    Level1,
    Level2 { level1: String },
    Level3 { level1: String, level2: String },
}

impl ScopeKey {
    pub fn level2(level1: impl Into<String>) -> Self {
        Self::Level2 {
            level1: level1.into(),
        }
    }

    pub fn level3(level1: impl Into<String>, level2: impl Into<String>) -> Self {
        Self::Level3 {
            level1: level1.into(),
            level2: level2.into(),
        }
    }

    #[must_use]
    pub const fn tier(&self) -> Tier {
        match self {
            Self::Level1 => Tier::Level1,
            Self::Level2 { .. } => Tier::Level2,
            Self::Level3 { .. } => Tier::Level3,
        }
    }

    /// Returns true if this scope sits underneath the given Level1 key.
    #[must_use]
    pub fn is_under(&self, key: &str) -> bool {
        match self {
            Self::Level1 => false,
            Self::Level2 { level1 } | Self::Level3 { level1, .. } => level1 == key,
        }
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Level1 => f.write_str("level1"),
            Self::Level2 { level1 } => write!(f, "level2[{level1}]"),
            Self::Level3 { level1, level2 } => write!(f, "level3[{level1}/{level2}]"),
        }
    }
}

/// Errors raised by order mutations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    /// The scope does not exist in the current dataset.
    #[error("unknown scope {0}")]
    UnknownScope(ScopeKey),

    /// The key is not at the claimed position, or not in the scope at all.
    #[error("key '{key}' not found in {scope}")]
    UnknownKey { scope: ScopeKey, key: String },

    /// A position lies outside the list.
    #[error("position {index} out of range for {scope} (len {len})")]
    IndexOutOfRange {
        scope: ScopeKey,
        index: usize,
        len: usize,
    },
}

impl OrderError {
    /// Machine-readable code associated with this error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::UnknownScope(_) | Self::UnknownKey { .. } => ErrorCode::UnknownKey,
            Self::IndexOutOfRange { .. } => ErrorCode::IndexOutOfRange,
        }
    }
}

/// Move the element at `from` so that it ends up at index `to`.
///
/// `to` is expressed in the coordinates of the resulting list, so
/// `move_within(["A","B","C","D"], 0, 2)` yields `["B","C","A","D"]` and
/// `move_within(list, j, i)` undoes `move_within(list, i, j)`.
///
/// Returns `false` (leaving the list untouched) if either index is outside
/// `0..len`.
pub fn move_within<T>(list: &mut Vec<T>, from: usize, to: usize) -> bool {
    let len = list.len();
    if from >= len || to >= len {
        return false;
    }
    if from != to {
        let element = list.remove(from);
        list.insert(to, element);
    }
    true
}

/// Translate a drop slot into the final index expected by [`move_within`].
///
/// A drop slot is a gap between rows counted in the list *before* removal:
/// slot `0` is above the first row and slot `len` is below the last. When the
/// dragged row sits above the slot, removing it shifts every intervening row
/// up by one, so the effective insertion index is `slot - 1`.
#[must_use]
pub const fn slot_to_index(from: usize, slot: usize) -> usize {
    if from < slot { slot - 1 } else { slot }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn letters(s: &str) -> Vec<String> {
        s.chars().map(|c| c.to_string()).collect()
    }

    #[test]
    fn forward_move_lands_at_target() {
        let mut list = letters("ABCD");
        assert!(move_within(&mut list, 0, 2));
        assert_eq!(list, letters("BCAD"));
    }

    #[test]
    fn backward_move_lands_at_target() {
        let mut list = letters("ABCD");
        assert!(move_within(&mut list, 3, 1));
        assert_eq!(list, letters("ADBC"));
    }

    #[test]
    fn boundary_moves() {
        let mut list = letters("ABCD");
        assert!(move_within(&mut list, 0, 3));
        assert_eq!(list, letters("BCDA"));
        assert!(move_within(&mut list, 3, 0));
        assert_eq!(list, letters("ABCD"));
    }

    #[test]
    fn same_index_is_noop() {
        let mut list = letters("ABC");
        assert!(move_within(&mut list, 1, 1));
        assert_eq!(list, letters("ABC"));
    }

    #[test]
    fn out_of_range_leaves_list_untouched() {
        let mut list = letters("ABC");
        assert!(!move_within(&mut list, 3, 0));
        assert!(!move_within(&mut list, 0, 3));
        assert_eq!(list, letters("ABC"));
    }

    #[test]
    fn slot_normalization_accounts_for_removal() {
        // Dragging A below C: slot 3 sits between C and D.
        let mut list = letters("ABCD");
        let to = slot_to_index(0, 3);
        assert_eq!(to, 2);
        assert!(move_within(&mut list, 0, to));
        assert_eq!(list, letters("BCAD"));

        // Dropping into the last slot moves to the end.
        let mut list = letters("ABCD");
        assert!(move_within(&mut list, 1, slot_to_index(1, 4)));
        assert_eq!(list, letters("ACDB"));

        // Backward drags need no adjustment.
        assert_eq!(slot_to_index(3, 0), 0);
    }

    #[test]
    fn scope_key_display_and_tier() {
        assert_eq!(ScopeKey::Level1.to_string(), "level1");
        assert_eq!(ScopeKey::level2("DM").to_string(), "level2[DM]");
        let l3 = ScopeKey::level3("DM", "Id");
        assert_eq!(l3.to_string(), "level3[DM/Id]");
        assert_eq!(l3.tier(), Tier::Level3);
        assert!(l3.is_under("DM"));
        assert!(!ScopeKey::Level1.is_under("DM"));
    }
}
