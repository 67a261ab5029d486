//! Patch requests sent to the host.
//!
//! The overlay never applies patches itself; it only describes the mutation
//! and lets the host apply it to the document store.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::node::ResolvedNode;

const KEY_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const KEY_LEN: usize = 3;

/// A single patch operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Patch {
    /// `{set: {path: value}}`
    Set(BTreeMap<String, Value>),
    /// `{insert: {before|after: path, items: [...]}}`
    Insert(InsertPatch),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InsertPatch {
    #[serde(flatten)]
    pub at: InsertAt,
    pub items: Vec<Value>,
}

/// Where an insert lands relative to an existing array item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertAt {
    Before(String),
    After(String),
}

/// Which side of an item an insert zone sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertSide {
    Before,
    After,
}

/// Payload of `visual-editing/patch`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchRequest {
    pub id: SmolStr,
    #[serde(rename = "type")]
    pub type_name: SmolStr,
    pub patch: Patch,
}

impl Patch {
    pub fn set(path: impl Into<String>, value: Value) -> Self {
        Patch::Set(BTreeMap::from([(path.into(), value)]))
    }

    pub fn insert(at: InsertAt, items: Vec<Value>) -> Self {
        Patch::Insert(InsertPatch { at, items })
    }
}

/// Generate a short random array key.
pub fn random_key<R: Rng + ?Sized>(rng: &mut R) -> SmolStr {
    (0..KEY_LEN)
        .map(|_| KEY_ALPHABET[rng.random_range(0..KEY_ALPHABET.len())] as char)
        .collect()
}

/// Build a request to set a value on the annotated field.
pub fn set_request(node: &ResolvedNode, value: Value) -> Option<PatchRequest> {
    Some(PatchRequest {
        id: node.id.clone(),
        type_name: node.type_name.clone()?,
        patch: Patch::set(node.path.to_string(), value),
    })
}

/// Build a request that inserts a new union member next to the annotated item.
///
/// Returns `None` for annotations without a document type.
pub fn insert_member_request<R: Rng + ?Sized>(
    node: &ResolvedNode,
    side: InsertSide,
    member_type: &str,
    rng: &mut R,
) -> Option<PatchRequest> {
    let type_name = node.type_name.clone()?;
    let path = node.path.to_string();
    let at = match side {
        InsertSide::Before => InsertAt::Before(path),
        InsertSide::After => InsertAt::After(path),
    };
    let item = serde_json::json!({
        "_type": member_type,
        "_key": random_key(rng).as_str(),
    });
    Some(PatchRequest {
        id: node.id.clone(),
        type_name,
        patch: Patch::insert(at, vec![item]),
    })
}
