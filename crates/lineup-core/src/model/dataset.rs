//! Read-only dataset snapshot and its derived key membership.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::item::Item;

/// An ordered snapshot of leaf items supplied by the caller.
///
/// Serializes as the bare item array. Lookups by id go through an index
/// built once per snapshot; with duplicate ids the first item wins.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Item>", into = "Vec<Item>")]
pub struct Dataset {
    items: Vec<Item>,
    index: HashMap<String, usize>,
}

impl Dataset {
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        let mut index = HashMap::with_capacity(items.len());
        for (pos, item) in items.iter().enumerate() {
            index.entry(item.id.clone()).or_insert(pos);
        }
        Self { items, index }
    }

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Item> {
        self.index.get(id).and_then(|&pos| self.items.get(pos))
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// All item ids in the snapshot.
    #[must_use]
    pub fn ids(&self) -> BTreeSet<String> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Compute which keys are present at every tier and scope.
    #[must_use]
    pub fn membership(&self) -> Membership {
        Membership::from_items(&self.items)
    }
}

impl From<Vec<Item>> for Dataset {
    fn from(items: Vec<Item>) -> Self {
        Self::new(items)
    }
}

impl From<Dataset> for Vec<Item> {
    fn from(dataset: Dataset) -> Self {
        dataset.items
    }
}

/// Key membership per scope, keyed by flat composite tuples.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    pub level1: BTreeSet<String>,
    pub level2: BTreeMap<String, BTreeSet<String>>,
    pub level3: BTreeMap<(String, String), BTreeSet<String>>,
}

impl Membership {
    fn from_items(items: &[Item]) -> Self {
        let mut membership = Self::default();
        for item in items {
            membership.level1.insert(item.level1.clone());
            membership
                .level2
                .entry(item.level1.clone())
                .or_default()
                .insert(item.level2.clone());
            membership
                .level3
                .entry((item.level1.clone(), item.level2.clone()))
                .or_default()
                .insert(item.level3.clone());
        }
        membership
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(vec![
            Item::new("1", "DM", "Id", "USUBJID", "Subject"),
            Item::new("2", "DM", "Id", "STUDYID", "Study"),
            Item::new("3", "DM", "Demo", "SEX", "Sex"),
            Item::new("4", "AE", "Id", "USUBJID", "Subject"),
        ])
    }

    #[test]
    fn membership_is_scoped_per_parent() {
        let m = sample().membership();
        assert_eq!(m.level1.len(), 2);
        assert_eq!(m.level2["DM"].len(), 2);
        assert_eq!(m.level2["AE"].len(), 1);
        let dm_id = &m.level3[&("DM".to_string(), "Id".to_string())];
        assert!(dm_id.contains("USUBJID") && dm_id.contains("STUDYID"));
        let ae_id = &m.level3[&("AE".to_string(), "Id".to_string())];
        assert_eq!(ae_id.len(), 1);
    }

    #[test]
    fn lookup_by_id() {
        let dataset = sample();
        assert_eq!(dataset.get("3").map(|i| i.level3.as_str()), Some("SEX"));
        assert!(!dataset.contains("9"));
        assert_eq!(dataset.ids().len(), 4);
    }

    #[test]
    fn dataset_parses_from_json_array() {
        let json = r#"[{"id":"1","level1":"DM","level2":"Id","level3":"SEX","name":"Sex"}]"#;
        let dataset: Dataset = serde_json::from_str(json).expect("parse dataset");
        assert_eq!(dataset.len(), 1);
        assert!(dataset.contains("1"));
        assert_eq!(dataset.get("1").map(|i| i.name.as_str()), Some("Sex"));
        let back = serde_json::to_string(&dataset).expect("encode dataset");
        assert!(back.starts_with('['));
    }

    #[test]
    fn duplicate_ids_resolve_to_first_item() {
        let dataset = Dataset::new(vec![
            Item::new("1", "DM", "Id", "SEX", "First"),
            Item::new("1", "AE", "Id", "SEX", "Second"),
        ]);
        assert_eq!(dataset.get("1").map(|i| i.name.as_str()), Some("First"));
        assert_eq!(dataset.ids().len(), 1);
    }

    #[test]
    fn lookups_cover_every_item_of_a_large_snapshot() {
        let items: Vec<Item> = (0..5000)
            .map(|n| Item::new(format!("V{n}"), "DM", "Id", format!("K{n}"), "Name"))
            .collect();
        let dataset = Dataset::new(items);
        assert!((0..5000).all(|n| dataset.contains(&format!("V{n}"))));
        assert_eq!(dataset.get("V4999").map(|i| i.level3.as_str()), Some("K4999"));
        assert!(dataset.get("V5000").is_none());
    }
}
