//! Page reports sent to the host as the element registry changes.
//!
//! Two reports exist: the keyed paths whose member types the host should
//! resolve, and the documents shown on the page. Both are only resent when
//! their inputs actually change.

use std::collections::BTreeSet;

use smol_str::SmolStr;

use crate::messages::{DocumentRef, DocumentsPayload, Perspective, UnresolvedPath, VisualEditingMsg};
use crate::path::ContentPath;
use crate::reducer::ElementState;

/// Keyed paths on the page, trimmed to their last keyed segment.
pub fn unresolved_paths(elements: &[ElementState]) -> Vec<UnresolvedPath> {
    let mut paths: Vec<UnresolvedPath> = Vec::new();
    for node in elements.iter().filter_map(|e| e.sanity.as_resolved()) {
        let path = ContentPath::parse(&node.path);
        if !path.has_key_marker() {
            continue;
        }
        let unresolved = UnresolvedPath {
            id: node.id.clone(),
            path: SmolStr::new(path.pop_unkeyed_segments().to_string()),
        };
        if !paths.contains(&unresolved) {
            paths.push(unresolved);
        }
    }
    paths
}

/// Documents referenced by resolvable annotations, in first-seen order.
///
/// Draft annotations report the draft id. Stega-only annotations carry no
/// document data and are skipped.
pub fn documents_on_page(elements: &[ElementState]) -> Vec<DocumentRef> {
    let mut documents: Vec<DocumentRef> = Vec::new();
    for node in elements.iter().filter_map(|e| e.sanity.as_resolved()) {
        let id = node.store_id();
        if documents.iter().any(|doc| doc.id == id) {
            continue;
        }
        let (project_id, dataset) = match (&node.project_id, &node.dataset) {
            (Some(project), Some(dataset)) => (Some(project.clone()), Some(dataset.clone())),
            _ => (None, None),
        };
        documents.push(DocumentRef {
            id,
            type_name: node.type_name.clone(),
            project_id,
            dataset,
        });
    }
    documents
}

/// Remembers what was last reported.
#[derive(Debug, Default)]
pub struct Reporter {
    element_ids: Option<Vec<SmolStr>>,
    documents: Option<(BTreeSet<SmolStr>, Perspective)>,
}

impl Reporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports due for the current registry and perspective.
    pub fn report(&mut self, elements: &[ElementState], perspective: Perspective) -> Vec<VisualEditingMsg> {
        let mut out = Vec::new();

        let ids: Vec<SmolStr> = elements.iter().map(|e| e.id.clone()).collect();
        if self.element_ids.as_ref() != Some(&ids) {
            self.element_ids = Some(ids);
            out.push(VisualEditingMsg::SchemaPaths(unresolved_paths(elements)));
        }

        let documents = documents_on_page(elements);
        let id_set: BTreeSet<SmolStr> = documents.iter().map(|doc| doc.id.clone()).collect();
        let changed = match &self.documents {
            Some((last, last_perspective)) => *last != id_set || *last_perspective != perspective,
            None => true,
        };
        if changed {
            self.documents = Some((id_set, perspective));
            out.push(VisualEditingMsg::Documents(DocumentsPayload {
                documents,
                perspective,
            }));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::OverlayRect;
    use crate::node::{ResolvedNode, SanityNode, StegaNode};
    use crate::reducer::ElementFocus;

    fn element(id: &str, doc: &str, path: &str, is_draft: Option<bool>) -> ElementState {
        ElementState {
            id: id.into(),
            sanity: SanityNode::Resolved(ResolvedNode {
                id: doc.into(),
                type_name: Some("page".into()),
                path: path.into(),
                project_id: Some("p".into()),
                dataset: Some("production".into()),
                base_url: "/".into(),
                tool: None,
                workspace: None,
                is_draft,
            }),
            rect: OverlayRect::default(),
            hovered: false,
            focused: ElementFocus::False,
            activated: false,
        }
    }

    #[test]
    fn test_unresolved_paths_trim_and_dedupe() {
        let elements = vec![
            element("ve-1", "home", r#"sections[_key=="a"].title"#, None),
            element("ve-2", "home", r#"sections[_key=="a"].body"#, None),
            element("ve-3", "home", "title", None),
            element("ve-4", "about", r#"sections[_key=="a"]"#, None),
        ];
        let paths = unresolved_paths(&elements);
        assert_eq!(
            paths,
            vec![
                UnresolvedPath {
                    id: "home".into(),
                    path: r#"sections[_key=="a"]"#.into()
                },
                UnresolvedPath {
                    id: "about".into(),
                    path: r#"sections[_key=="a"]"#.into()
                },
            ]
        );
    }

    #[test]
    fn test_documents_use_draft_ids_and_skip_stega() {
        let mut elements = vec![
            element("ve-1", "home", "title", Some(true)),
            element("ve-2", "home", "body", Some(true)),
            element("ve-3", "about", "title", None),
        ];
        elements.push(ElementState {
            sanity: SanityNode::Stega(StegaNode {
                href: "/studio".into(),
                data: None,
            }),
            ..element("ve-4", "x", "y", None)
        });
        let ids: Vec<_> = documents_on_page(&elements)
            .into_iter()
            .map(|doc| doc.id)
            .collect();
        assert_eq!(ids, vec![SmolStr::new("drafts.home"), SmolStr::new("about")]);
    }

    #[test]
    fn test_reporter_only_sends_changes() {
        let mut reporter = Reporter::new();
        let mut elements = vec![element("ve-1", "home", "title", None)];

        let first = reporter.report(&elements, Perspective::Published);
        assert_eq!(first.len(), 2);
        assert!(reporter.report(&elements, Perspective::Published).is_empty());

        // Perspective change resends documents only.
        let kinds: Vec<_> = reporter
            .report(&elements, Perspective::PreviewDrafts)
            .iter()
            .map(|m| matches!(m, VisualEditingMsg::Documents(_)))
            .collect();
        assert_eq!(kinds, vec![true]);

        // New element on the same document: paths again, documents unchanged.
        elements.push(element("ve-2", "home", "body", None));
        let msgs = reporter.report(&elements, Perspective::PreviewDrafts);
        assert!(matches!(msgs.as_slice(), [VisualEditingMsg::SchemaPaths(paths)] if paths.is_empty()));
    }
}
