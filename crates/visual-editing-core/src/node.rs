//! Content-source annotations carried by DOM elements.
//!
//! An element is linked to a document field either by a `data-sanity`
//! attribute holding `key=value` pairs separated by `;`, or by a
//! `data-sanity-edit-info` attribute holding JSON. Both decode to a
//! [`SanityNode`]; [`create_data_attribute`] produces the former.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;

use crate::error::DecodeError;
use crate::path::ContentPath;

/// Attribute holding `key=value;...` annotation pairs.
pub const DATA_ATTRIBUTE: &str = "data-sanity";
/// Attribute holding a JSON annotation.
pub const EDIT_INFO_ATTRIBUTE: &str = "data-sanity-edit-info";
/// Marks elements drawn by the overlay itself.
pub const OVERLAY_ELEMENT_ATTRIBUTE: &str = "data-sanity-overlay-element";

const DRAFTS_PREFIX: &str = "drafts.";

/// A resolvable annotation: which field of which document an element shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedNode {
    pub id: SmolStr,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<SmolStr>,
    pub path: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<SmolStr>,
    pub base_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<SmolStr>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_draft: Option<bool>,
}

impl ResolvedNode {
    pub fn content_path(&self) -> ContentPath {
        ContentPath::parse(&self.path)
    }

    /// Document id as the content store knows it, with the drafts prefix
    /// when the annotation points at a draft.
    pub fn store_id(&self) -> SmolStr {
        if self.is_draft.unwrap_or(false) && !self.id.starts_with(DRAFTS_PREFIX) {
            smol_str::format_smolstr!("{DRAFTS_PREFIX}{}", self.id)
        } else {
            self.id.clone()
        }
    }
}

/// A degraded annotation that only carries an edit link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StegaNode {
    pub href: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

/// The decoded annotation of one element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SanityNode {
    Resolved(ResolvedNode),
    Stega(StegaNode),
}

impl SanityNode {
    pub fn as_resolved(&self) -> Option<&ResolvedNode> {
        match self {
            SanityNode::Resolved(node) => Some(node),
            SanityNode::Stega(_) => None,
        }
    }

    pub fn id(&self) -> Option<&str> {
        self.as_resolved().map(|n| n.id.as_str())
    }

    /// Decode a `data-sanity` attribute value.
    pub fn from_data_attribute(raw: &str) -> Result<Self, DecodeError> {
        let mut id = None;
        let mut type_name = None;
        let mut path = None;
        let mut base_url = None;
        let mut tool = None;
        let mut workspace = None;
        let mut project_id = None;
        let mut dataset = None;
        let mut is_draft = None;

        for pair in raw.split(';') {
            let Some((key, value)) = pair.split_once('=') else {
                continue;
            };
            let value = urlencoding::decode(value.trim())
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| value.trim().to_string());
            match key.trim() {
                "id" => id = Some(SmolStr::new(value)),
                "type" => type_name = Some(SmolStr::new(value)),
                "path" => path = Some(SmolStr::new(value)),
                "base" => base_url = Some(value),
                "tool" => tool = Some(SmolStr::new(value)),
                "workspace" => workspace = Some(SmolStr::new(value)),
                "projectId" => project_id = Some(SmolStr::new(value)),
                "dataset" => dataset = Some(SmolStr::new(value)),
                "isDraft" => is_draft = Some(value.is_empty() || value == "true"),
                other => tracing::trace!(key = other, "ignoring unknown annotation key"),
            }
        }

        Ok(SanityNode::Resolved(ResolvedNode {
            id: id.ok_or(DecodeError::Annotation("id"))?,
            type_name,
            path: path.ok_or(DecodeError::Annotation("path"))?,
            project_id,
            dataset,
            base_url: base_url.ok_or(DecodeError::Annotation("base"))?,
            tool,
            workspace,
            is_draft,
        }))
    }

    /// Decode a `data-sanity-edit-info` JSON attribute value.
    pub fn from_edit_info(raw: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(raw)?)
    }
}

/// Encode an annotation into a `data-sanity` attribute value.
pub fn create_data_attribute(node: &ResolvedNode) -> String {
    let mut pairs: Vec<(&str, String)> = vec![
        ("id", node.id.to_string()),
        ("path", node.path.to_string()),
    ];
    if let Some(type_name) = &node.type_name {
        pairs.insert(1, ("type", type_name.to_string()));
    }
    pairs.push(("base", node.base_url.clone()));
    if let Some(tool) = &node.tool {
        pairs.push(("tool", tool.to_string()));
    }
    if let Some(workspace) = &node.workspace {
        pairs.push(("workspace", workspace.to_string()));
    }
    if let Some(project_id) = &node.project_id {
        pairs.push(("projectId", project_id.to_string()));
    }
    if let Some(dataset) = &node.dataset {
        pairs.push(("dataset", dataset.to_string()));
    }
    if node.is_draft == Some(true) {
        pairs.push(("isDraft", String::new()));
    }

    pairs
        .into_iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(&value)))
        .collect::<Vec<_>>()
        .join(";")
}
