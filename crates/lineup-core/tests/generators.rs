use lineup_core::edges::RelationshipEdge;
use lineup_core::model::{Dataset, Item};
use proptest::prelude::*;
use std::collections::BTreeSet;

pub fn arb_key() -> impl Strategy<Value = String> + Clone {
    "[a-f][a-z]{0,2}"
}

pub fn arb_key_set() -> impl Strategy<Value = BTreeSet<String>> + Clone {
    prop::collection::btree_set(arb_key(), 0..24)
}

/// A saved list as it might come back from storage: possibly stale, possibly
/// with repeats.
pub fn arb_saved() -> impl Strategy<Value = Vec<String>> + Clone {
    prop::collection::vec(arb_key(), 0..24)
}

/// A list of distinct keys together with two valid indices into it.
pub fn arb_list_and_move() -> impl Strategy<Value = (Vec<String>, usize, usize)> {
    prop::collection::btree_set(arb_key(), 1..16).prop_flat_map(|keys| {
        let len = keys.len();
        let list: Vec<String> = keys.into_iter().collect();
        (Just(list), 0..len, 0..len)
    })
}

fn arb_word() -> impl Strategy<Value = String> + Clone {
    prop_oneof![
        Just("Employment".to_string()),
        Just("Type".to_string()),
        Just("Code".to_string()),
        Just("subject".to_string()),
        Just("STUDY".to_string()),
        Just("Date".to_string()),
        "[a-z]{1,6}",
    ]
}

pub fn arb_name() -> impl Strategy<Value = String> + Clone {
    prop::collection::vec(arb_word(), 1..4).prop_map(|words| words.join(" "))
}

pub fn arb_keyword() -> impl Strategy<Value = String> + Clone {
    prop::collection::vec(
        prop_oneof![Just("emp".to_string()), Just("type".to_string()), "[a-z]{1,3}"],
        0..3,
    )
    .prop_map(|tokens| tokens.join(" "))
}

/// Items with unique ids and a small key space so scopes overlap.
pub fn arb_dataset() -> impl Strategy<Value = Dataset> {
    prop::collection::vec(
        (
            prop_oneof![Just("DM"), Just("AE"), Just("LB")],
            prop_oneof![Just("Id"), Just("Demo"), Just("Event")],
            "[A-Z]{2,6}",
            arb_name(),
        ),
        0..30,
    )
    .prop_map(|rows| {
        Dataset::new(
            rows.into_iter()
                .enumerate()
                .map(|(i, (l1, l2, l3, name))| Item::new(format!("V{i}"), l1, l2, l3, name))
                .collect(),
        )
    })
}

pub fn arb_ids() -> impl Strategy<Value = BTreeSet<String>> + Clone {
    prop::collection::btree_set((0u8..12).prop_map(|i| format!("V{i}")), 0..12)
}

pub fn arb_targets() -> impl Strategy<Value = BTreeSet<String>> + Clone {
    prop::collection::btree_set((0u8..4).prop_map(|i| format!("L{i}")), 1..4)
}

pub fn arb_edges() -> impl Strategy<Value = BTreeSet<RelationshipEdge>> + Clone {
    prop::collection::btree_set(
        ((0u8..12), (0u8..4)).prop_map(|(s, t)| RelationshipEdge::new(format!("V{s}"), format!("L{t}"))),
        0..20,
    )
}
