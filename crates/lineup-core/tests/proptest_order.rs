use lineup_core::edges::{EdgeStore, MemoryEdgeStore};
use lineup_core::order::codec::encode_order;
use lineup_core::order::hierarchy::HierarchicalOrder;
use lineup_core::order::{HierarchicalOrderStore, ScopeKey, merge_order, move_within};
use lineup_core::reconcile::{apply_plan, plan_bulk, reconcile, validate_bulk};
use lineup_core::selection::{KeywordExitPolicy, KeywordPattern, SelectionController};
use proptest::prelude::*;
use std::collections::{BTreeSet, HashMap};

#[path = "generators.rs"]
mod generators;
use generators::*;

fn first_positions(list: &[String]) -> HashMap<&str, usize> {
    let mut positions = HashMap::new();
    for (i, key) in list.iter().enumerate() {
        positions.entry(key.as_str()).or_insert(i);
    }
    positions
}

proptest! {
    #![proptest_config(proptest::test_runner::Config::with_cases(512))]

    // Merge

    #[test]
    fn merge_is_permutation_of_current(saved in arb_saved(), current in arb_key_set()) {
        let merged = merge_order(&saved, &current);
        prop_assert_eq!(merged.len(), current.len());
        let as_set: BTreeSet<String> = merged.iter().cloned().collect();
        prop_assert_eq!(as_set, current);
    }

    #[test]
    fn merge_keeps_saved_relative_order(saved in arb_saved(), current in arb_key_set()) {
        let merged = merge_order(&saved, &current);
        let before = first_positions(&saved);
        let after = first_positions(&merged);
        let kept: Vec<&str> = before.keys().copied().filter(|k| current.contains(*k)).collect();
        for a in &kept {
            for b in &kept {
                if before[a] < before[b] {
                    prop_assert!(after[a] < after[b], "{} should precede {}", a, b);
                }
            }
        }
    }

    #[test]
    fn merge_appends_new_keys_sorted(saved in arb_saved(), current in arb_key_set()) {
        let merged = merge_order(&saved, &current);
        let known: BTreeSet<&str> = saved.iter().map(String::as_str).collect();
        let tail: Vec<&String> = merged.iter().skip_while(|k| known.contains(k.as_str())).collect();
        prop_assert!(tail.iter().all(|k| !known.contains(k.as_str())));
        prop_assert!(tail.windows(2).all(|w| w[0] < w[1]));
    }

    // Move

    #[test]
    fn move_is_permutation_and_invertible((list, from, to) in arb_list_and_move()) {
        let mut moved = list.clone();
        prop_assert!(move_within(&mut moved, from, to));
        let mut sorted_moved = moved.clone();
        sorted_moved.sort();
        let mut sorted_list = list.clone();
        sorted_list.sort();
        prop_assert_eq!(sorted_moved, sorted_list);
        prop_assert_eq!(&moved[to], &list[from]);

        prop_assert!(move_within(&mut moved, to, from));
        prop_assert_eq!(moved, list);
    }

    #[test]
    fn store_lists_stay_permutations(dataset in arb_dataset(), moves in prop::collection::vec((0usize..4, 0usize..4), 0..8)) {
        let mut store = HierarchicalOrderStore::new(&dataset);
        for (from, to) in moves {
            if let Some(list) = store.working(&ScopeKey::Level1).cloned() {
                if from < list.len() && to < list.len() {
                    store.move_item(&ScopeKey::Level1, &list[from], from, to).map_err(|e| TestCaseError::fail(e.to_string()))?;
                }
            }
        }
        store.commit_all();
        let membership = dataset.membership();
        let order = store.export_order();
        let level1: BTreeSet<String> = order.level1().cloned().unwrap_or_default().into_iter().collect();
        prop_assert_eq!(level1, membership.level1);
    }

    #[test]
    fn persisted_order_reloads_against_grown_dataset(dataset in arb_dataset(), grown in arb_dataset()) {
        let mut store = HierarchicalOrderStore::new(&dataset);
        store.commit_all();
        for scope in store.export_order().iter().map(|(s, _)| s.clone()).collect::<Vec<_>>() {
            store.commit(&scope).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        let blob = encode_order(store.saved_order()).map_err(|e| TestCaseError::fail(e.to_string()))?;

        let (reloaded, problems) = HierarchicalOrderStore::from_blob(&grown, Some(&blob));
        prop_assert!(problems.is_empty());
        let expected = HierarchicalOrder::default_for(&grown.membership());
        for (scope, list) in expected.iter() {
            let mut working = reloaded.working(scope).cloned().unwrap_or_default();
            working.sort();
            let mut want = list.clone();
            want.sort();
            prop_assert_eq!(working, want);
        }
    }

    // Reconcile

    #[test]
    fn reconcile_sets_are_disjoint_subsets(desired in arb_ids(), existing in arb_edges()) {
        let plan = reconcile("L0", &desired, &existing);
        prop_assert!(plan.to_create.is_disjoint(&plan.to_delete));
        prop_assert!(plan.to_create.is_subset(&desired));
        let existing_ids: BTreeSet<String> = existing
            .iter()
            .filter(|e| e.target == "L0")
            .map(|e| e.source.clone())
            .collect();
        prop_assert!(plan.to_delete.is_subset(&existing_ids));
    }

    #[test]
    fn applying_plan_reaches_desired(desired in arb_ids(), existing in arb_edges()) {
        let mut store = MemoryEdgeStore::with_edges(existing);
        let listed = store.list_edges("L0").map_err(|e| TestCaseError::fail(e.to_string()))?;
        let plan = reconcile("L0", &desired, &listed);
        let report = apply_plan(&plan, &mut store);
        prop_assert!(report.is_clean());

        let after: BTreeSet<String> = store
            .list_edges("L0")
            .map_err(|e| TestCaseError::fail(e.to_string()))?
            .into_iter()
            .map(|e| e.source)
            .collect();
        prop_assert_eq!(after, desired);
    }

    #[test]
    fn bulk_never_writes_with_duplicates(desired in arb_ids(), targets in arb_targets(), existing in arb_edges()) {
        let mut store = MemoryEdgeStore::with_edges(existing.clone());
        let expected: Vec<_> = existing
            .iter()
            .filter(|e| desired.contains(&e.source) && targets.contains(&e.target))
            .cloned()
            .collect();

        match plan_bulk(&mut store, &desired, &targets) {
            Ok(plan) => {
                prop_assert!(expected.is_empty());
                prop_assert_eq!(plan.len(), desired.len() * targets.len());
            }
            Err(err) => {
                prop_assert!(err.duplicates() == expected.as_slice() || desired.is_empty());
            }
        }
        prop_assert!(store.writes().is_empty());
        prop_assert_eq!(
            validate_bulk(&desired, &targets, &existing).is_ok(),
            expected.is_empty() && !desired.is_empty()
        );
    }

    // Selection

    #[test]
    fn keyword_selection_is_pure(dataset in arb_dataset(), keyword in arb_keyword()) {
        let mut controller = SelectionController::new(dataset.clone(), KeywordExitPolicy::RestoreManual);
        controller.enter_keyword(&keyword);
        let first = controller.current_selection();
        controller.enter_keyword(&keyword);
        prop_assert_eq!(&controller.current_selection(), &first);

        if let Some(pattern) = KeywordPattern::parse(&keyword) {
            for item in dataset.items() {
                prop_assert_eq!(first.contains(&item.id), pattern.matches(&item.name));
            }
        } else {
            prop_assert!(controller.mode().is_manual());
        }
    }

    #[test]
    fn manual_snapshot_survives_mode_round_trip(dataset in arb_dataset(), keyword in arb_keyword()) {
        let mut controller = SelectionController::new(dataset.clone(), KeywordExitPolicy::RestoreManual);
        for item in dataset.items().iter().step_by(2) {
            controller.toggle_item(&item.id).map_err(|e| TestCaseError::fail(e.to_string()))?;
        }
        let manual = controller.current_selection();
        controller.enter_match_all();
        controller.enter_keyword(&keyword);
        controller.enter_manual();
        prop_assert_eq!(controller.current_selection(), manual);
    }
}
