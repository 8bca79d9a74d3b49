//! JSON blob format for persisted hierarchical orders.
//!
//! ```json
//! {
//!   "version": 1,
//!   "level1": ["DM", "AE"],
//!   "level2": [{"level1": "DM", "order": ["Id", "Demo"]}],
//!   "level3": [{"level1": "DM", "level2": "Id", "order": ["USUBJID", "STUDYID"]}]
//! }
//! ```
//!
//! A blob that does not parse, or carries an unknown version, is rejected as a
//! whole. A blob that parses but has a bad list (repeated keys, or the same
//! scope listed twice) keeps its good lists; the bad ones are reported and
//! left out so the caller falls back to the default order for them.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::{HierarchicalOrder, OrderList, ScopeKey};
use crate::error::ErrorCode;

/// Current blob format version.
pub const ORDER_BLOB_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct OrderBlob {
    version: u32,
    #[serde(default)]
    level1: Option<OrderList>,
    #[serde(default)]
    level2: Vec<Level2Entry>,
    #[serde(default)]
    level3: Vec<Level3Entry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Level2Entry {
    level1: String,
    order: OrderList,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Level3Entry {
    level1: String,
    level2: String,
    order: OrderList,
}

/// Problems found while decoding a persisted order.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("order blob is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported order blob version {0}: maximum supported is {ORDER_BLOB_VERSION}")]
    UnsupportedVersion(u32),

    #[error("{scope} lists '{key}' more than once")]
    DuplicateKey { scope: ScopeKey, key: String },

    #[error("{0} appears more than once in the order blob")]
    DuplicateScope(ScopeKey),
}

impl CodecError {
    /// Every decode problem is a malformed order.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        ErrorCode::MalformedOrder
    }
}

/// Result of decoding a blob that parsed successfully.
#[derive(Debug, Default)]
pub struct DecodedOrder {
    /// Lists that passed validation.
    pub order: HierarchicalOrder,
    /// Lists that were dropped, one error per dropped list.
    pub rejected: Vec<CodecError>,
}

/// Serialize an order to its blob form.
///
/// # Errors
///
/// Returns [`CodecError::Json`] if serialization fails.
pub fn encode_order(order: &HierarchicalOrder) -> Result<String, CodecError> {
    let mut blob = OrderBlob {
        version: ORDER_BLOB_VERSION,
        level1: None,
        level2: Vec::new(),
        level3: Vec::new(),
    };
    for (scope, list) in order.iter() {
        match scope {
            ScopeKey::Level1 => blob.level1 = Some(list.clone()),
            ScopeKey::Level2 { level1 } => blob.level2.push(Level2Entry {
                level1: level1.clone(),
                order: list.clone(),
            }),
            ScopeKey::Level3 { level1, level2 } => blob.level3.push(Level3Entry {
                level1: level1.clone(),
                level2: level2.clone(),
                order: list.clone(),
            }),
        }
    }
    Ok(serde_json::to_string(&blob)?)
}

/// Decode a blob, validating each list independently.
///
/// # Errors
///
/// Returns [`CodecError::Json`] or [`CodecError::UnsupportedVersion`] when the
/// blob cannot be used at all.
pub fn decode_order(raw: &str) -> Result<DecodedOrder, CodecError> {
    let blob: OrderBlob = serde_json::from_str(raw)?;
    if blob.version == 0 || blob.version > ORDER_BLOB_VERSION {
        return Err(CodecError::UnsupportedVersion(blob.version));
    }

    let mut decoded = DecodedOrder::default();
    let level1 = blob.level1.map(|list| (ScopeKey::Level1, list));
    let level2 = blob
        .level2
        .into_iter()
        .map(|entry| (ScopeKey::level2(entry.level1), entry.order));
    let level3 = blob
        .level3
        .into_iter()
        .map(|entry| (ScopeKey::level3(entry.level1, entry.level2), entry.order));

    let mut rejected_scopes: HashSet<ScopeKey> = HashSet::new();
    for (scope, list) in level1.into_iter().chain(level2).chain(level3) {
        if rejected_scopes.contains(&scope) {
            continue;
        }
        if decoded.order.contains_scope(&scope) {
            decoded.order.remove(&scope);
            rejected_scopes.insert(scope.clone());
            decoded.rejected.push(CodecError::DuplicateScope(scope));
            continue;
        }
        if let Some(key) = first_repeat(&list) {
            rejected_scopes.insert(scope.clone());
            decoded.rejected.push(CodecError::DuplicateKey { scope, key });
            continue;
        }
        decoded.order.insert(scope, list);
    }
    Ok(decoded)
}

fn first_repeat(list: &[String]) -> Option<String> {
    let mut seen = HashSet::with_capacity(list.len());
    list.iter().find(|key| !seen.insert(key.as_str())).cloned()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(keys: &[&str]) -> OrderList {
        keys.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample() -> HierarchicalOrder {
        let mut order = HierarchicalOrder::new();
        order.insert(ScopeKey::Level1, list(&["DM", "AE"]));
        order.insert(ScopeKey::level2("DM"), list(&["Id", "Demo"]));
        order.insert(ScopeKey::level3("DM", "Id"), list(&["USUBJID", "STUDYID"]));
        order
    }

    #[test]
    fn encoded_blob_decodes_to_same_order() {
        let raw = encode_order(&sample()).expect("encode");
        let decoded = decode_order(&raw).expect("decode");
        assert!(decoded.rejected.is_empty());
        assert_eq!(decoded.order, sample());
    }

    #[test]
    fn blob_shape_is_stable() {
        let raw = encode_order(&sample()).expect("encode");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("json");
        assert_eq!(value["version"], 1);
        assert_eq!(value["level1"][0], "DM");
        assert_eq!(value["level2"][0]["level1"], "DM");
        assert_eq!(value["level3"][0]["level2"], "Id");
    }

    #[test]
    fn garbage_is_rejected_whole() {
        let err = decode_order("not json").expect_err("must fail");
        assert!(matches!(err, CodecError::Json(_)));
        assert_eq!(err.code(), ErrorCode::MalformedOrder);
    }

    #[test]
    fn future_version_is_rejected() {
        let err = decode_order(r#"{"version":7}"#).expect_err("must fail");
        assert!(matches!(err, CodecError::UnsupportedVersion(7)));
    }

    #[test]
    fn repeated_key_drops_only_that_list() {
        let raw = r#"{
            "version": 1,
            "level1": ["DM", "AE", "DM"],
            "level2": [{"level1": "DM", "order": ["Id", "Demo"]}]
        }"#;
        let decoded = decode_order(raw).expect("decode");
        assert!(decoded.order.level1().is_none());
        assert_eq!(decoded.order.level2("DM"), Some(&list(&["Id", "Demo"])));
        assert_eq!(decoded.rejected.len(), 1);
        assert!(matches!(
            &decoded.rejected[0],
            CodecError::DuplicateKey { key, .. } if key == "DM"
        ));
    }

    #[test]
    fn repeated_scope_drops_every_copy() {
        let raw = r#"{
            "version": 1,
            "level2": [
                {"level1": "DM", "order": ["Id"]},
                {"level1": "DM", "order": ["Demo"]},
                {"level1": "DM", "order": ["Other"]}
            ]
        }"#;
        let decoded = decode_order(raw).expect("decode");
        assert!(decoded.order.level2("DM").is_none());
        assert_eq!(decoded.rejected.len(), 1);
    }

    #[test]
    fn missing_tiers_default_to_empty() {
        let decoded = decode_order(r#"{"version":1}"#).expect("decode");
        assert!(decoded.order.is_empty());
    }
}
