use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

/// Concrete member types of keyed array items.
///
/// Maps document id to (raw keyed path prefix → type name). Entries are only
/// ever added: once a path has a type it keeps it for the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResolvedTypeTable {
    documents: BTreeMap<SmolStr, BTreeMap<SmolStr, SmolStr>>,
}

impl ResolvedTypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, document_id: &str, path: &str) -> Option<&SmolStr> {
        self.documents.get(document_id)?.get(path)
    }

    pub fn document(&self, document_id: &str) -> Option<&BTreeMap<SmolStr, SmolStr>> {
        self.documents.get(document_id)
    }

    pub fn contains(&self, document_id: &str, path: &str) -> bool {
        self.get(document_id, path).is_some()
    }

    /// Record a resolved type. Returns true if the table changed.
    ///
    /// An existing entry is kept as is.
    pub fn insert(
        &mut self,
        document_id: impl Into<SmolStr>,
        path: impl Into<SmolStr>,
        type_name: impl Into<SmolStr>,
    ) -> bool {
        let paths = self.documents.entry(document_id.into()).or_default();
        let path = path.into();
        if paths.contains_key(&path) {
            return false;
        }
        paths.insert(path, type_name.into());
        true
    }

    /// Add every entry of `other` that is not already present.
    pub fn merge(&mut self, other: &ResolvedTypeTable) -> bool {
        let mut changed = false;
        for (document_id, paths) in &other.documents {
            for (path, type_name) in paths {
                changed |= self.insert(document_id.clone(), path.clone(), type_name.clone());
            }
        }
        changed
    }

    pub fn is_empty(&self) -> bool {
        self.documents.values().all(BTreeMap::is_empty)
    }

    pub fn len(&self) -> usize {
        self.documents.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_never_overwrites() {
        let mut table = ResolvedTypeTable::new();
        assert!(table.insert("home", r#"items[_key=="x"]"#, "featureHighlight"));
        assert!(!table.insert("home", r#"items[_key=="x"]"#, "hero"));
        assert_eq!(
            table.get("home", r#"items[_key=="x"]"#).map(SmolStr::as_str),
            Some("featureHighlight")
        );
    }

    #[test]
    fn test_merge_reports_change() {
        let mut table = ResolvedTypeTable::new();
        table.insert("home", "a", "one");

        let mut incoming = ResolvedTypeTable::new();
        incoming.insert("home", "a", "other");
        incoming.insert("about", "b", "two");

        assert!(table.merge(&incoming));
        assert_eq!(table.len(), 2);
        assert_eq!(table.get("home", "a").map(SmolStr::as_str), Some("one"));
        assert!(!table.merge(&incoming));
    }

    #[test]
    fn test_serializes_as_nested_map() {
        let mut table = ResolvedTypeTable::new();
        table.insert("home", "a", "one");
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json, serde_json::json!({"home": {"a": "one"}}));

        let back: ResolvedTypeTable = serde_json::from_value(json).unwrap();
        assert_eq!(back, table);
    }
}
