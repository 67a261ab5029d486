//! Resolution of keyed array member types.
//!
//! A keyed segment like `sections[_key=="a1"]` says which array item a path
//! goes through, but not what type that item is. The host asks the content
//! store with one projection query per document and collects the answers in
//! a [`ResolvedTypeTable`].
//!
//! Fetching is split from bookkeeping so callers holding the resolver in a
//! `RefCell` can drop the borrow while queries are in flight:
//!
//! ```ignore
//! let queries = resolver.borrow_mut().take_pending();
//! let results = fetch_all(&client, queries, perspective).await;
//! let changed = resolver.borrow_mut().apply_results(results);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use serde_json::Value;
use smol_str::SmolStr;

use crate::error::VisualEditingError;
use crate::messages::{Perspective, UnresolvedPath};
use crate::path::{ContentPath, is_keyed_segment};
use crate::resolved::ResolvedTypeTable;

/// One projection query covering every pending path of a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectionQuery {
    pub document_id: SmolStr,
    /// Paths in response-key order: the type of `paths[i]` comes back under `"i"`.
    pub paths: Vec<SmolStr>,
    pub query: String,
}

impl ProjectionQuery {
    pub fn new(document_id: impl Into<SmolStr>, paths: Vec<SmolStr>) -> Self {
        let projection = paths
            .iter()
            .enumerate()
            .map(|(idx, path)| format!("\"{idx}\": {path}[0]._type"))
            .collect::<Vec<_>>()
            .join(",");
        Self {
            document_id: document_id.into(),
            query: format!("*[_id == $id][0]{{{projection}}}"),
            paths,
        }
    }

    /// Pair each path with the type name found in a query result.
    ///
    /// Missing and non-string entries are skipped.
    pub fn read_result<'a>(&'a self, result: &'a Value) -> impl Iterator<Item = (&'a SmolStr, &'a str)> {
        self.paths.iter().enumerate().filter_map(move |(idx, path)| {
            result
                .get(idx.to_string())
                .and_then(Value::as_str)
                .map(|type_name| (path, type_name))
        })
    }
}

/// Runs projection queries against the content store.
pub trait ProjectionFetcher {
    /// Fetch the `result` of `query` with `$id` bound to its document id.
    fn fetch(
        &self,
        query: &ProjectionQuery,
        perspective: Perspective,
    ) -> impl Future<Output = Result<Value, VisualEditingError>>;
}

pub type QueryResult = (ProjectionQuery, Result<Value, VisualEditingError>);

/// Issue every query concurrently and wait for all of them.
pub async fn fetch_all<F: ProjectionFetcher>(
    fetcher: &F,
    queries: Vec<ProjectionQuery>,
    perspective: Perspective,
) -> Vec<QueryResult> {
    let results = n0_future::join_all(queries.iter().map(|q| fetcher.fetch(q, perspective))).await;
    queries.into_iter().zip(results).collect()
}

/// Tracks which keyed paths have been asked about and what came back.
#[derive(Debug, Default)]
pub struct TypeResolver {
    paths: BTreeSet<UnresolvedPath>,
    requested: BTreeSet<(SmolStr, SmolStr)>,
    pending: Vec<ProjectionQuery>,
    table: ResolvedTypeTable,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self) -> &ResolvedTypeTable {
        &self.table
    }

    /// The current set of reported paths.
    pub fn paths(&self) -> &BTreeSet<UnresolvedPath> {
        &self.paths
    }

    /// Replace the set of paths the page reports.
    ///
    /// Every keyed prefix of each path needs a type, so
    /// `a[_key=="x"].b[_key=="y"]` asks about both keyed segments. Pairs that
    /// were requested before are not asked again. Returns the new queries,
    /// which are also queued for [`take_pending`](Self::take_pending).
    pub fn set_paths(&mut self, paths: impl IntoIterator<Item = UnresolvedPath>) -> Vec<ProjectionQuery> {
        self.paths = paths.into_iter().collect();

        let mut fresh: BTreeMap<SmolStr, Vec<SmolStr>> = BTreeMap::new();
        for unresolved in &self.paths {
            let path = ContentPath::parse(&unresolved.path);
            for (idx, segment) in path.segments().iter().enumerate() {
                if !is_keyed_segment(segment) {
                    continue;
                }
                let prefix = SmolStr::new(path.prefix(idx + 1));
                if self.table.contains(&unresolved.id, &prefix) {
                    continue;
                }
                if self.requested.insert((unresolved.id.clone(), prefix.clone())) {
                    fresh.entry(unresolved.id.clone()).or_default().push(prefix);
                }
            }
        }

        let queries: Vec<_> = fresh
            .into_iter()
            .map(|(document_id, paths)| ProjectionQuery::new(document_id, paths))
            .collect();
        if !queries.is_empty() {
            tracing::debug!(count = queries.len(), "queued type queries");
        }
        self.pending.extend(queries.iter().cloned());
        queries
    }

    /// Ask again about every pair that has no type yet.
    ///
    /// Called when the perspective changes: a document missing under one
    /// perspective may exist under another. Resolved entries are kept.
    pub fn requery_unresolved(&mut self) -> Vec<ProjectionQuery> {
        let table = &self.table;
        self.requested.retain(|(id, path)| table.contains(id, path));
        self.pending.clear();
        let paths = std::mem::take(&mut self.paths);
        self.set_paths(paths)
    }

    /// Take the queued queries, leaving the queue empty.
    pub fn take_pending(&mut self) -> Vec<ProjectionQuery> {
        std::mem::take(&mut self.pending)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Merge query results into the table. Returns true if it changed.
    ///
    /// Failed queries are logged and dropped; their paths stay unresolved.
    pub fn apply_results(&mut self, results: impl IntoIterator<Item = QueryResult>) -> bool {
        let mut changed = false;
        for (query, result) in results {
            match result {
                Ok(value) => {
                    if value.is_null() {
                        tracing::debug!(document = %query.document_id, "document not found");
                        continue;
                    }
                    for (path, type_name) in query.read_result(&value) {
                        changed |= self
                            .table
                            .insert(query.document_id.clone(), path.clone(), type_name);
                    }
                }
                Err(e) => {
                    tracing::warn!(document = %query.document_id, error = %e, "type query failed");
                }
            }
        }
        changed
    }

    /// Fetch and apply everything queued.
    pub async fn resolve_pending<F: ProjectionFetcher>(
        &mut self,
        fetcher: &F,
        perspective: Perspective,
    ) -> bool {
        let queries = self.take_pending();
        if queries.is_empty() {
            return false;
        }
        let results = fetch_all(fetcher, queries, perspective).await;
        self.apply_results(results)
    }
}
