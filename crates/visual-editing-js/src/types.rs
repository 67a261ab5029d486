//! Types exposed to JavaScript via wasm-bindgen.

use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tsify_next::Tsify;
use wasm_bindgen::prelude::*;

use visual_editing_core::{HistoryUpdate, HistoryUpdateKind, OverlayConfig, ResolvedNode};

/// Options accepted by `enableVisualEditing`.
///
/// Every key is optional; missing keys take the overlay defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase", default)]
pub struct JsOverlayOptions {
    #[tsify(optional)]
    pub z_index: Option<i32>,
    #[tsify(optional)]
    pub rect_epsilon: Option<f64>,
    #[tsify(optional)]
    pub flash_duration_ms: Option<u32>,
    #[tsify(optional)]
    pub studio_url: Option<String>,
    #[tsify(optional)]
    pub api_version: Option<String>,
    #[tsify(optional)]
    pub api_host: Option<String>,
    #[tsify(optional)]
    pub project_id: Option<String>,
    #[tsify(optional)]
    pub dataset: Option<String>,
    /// Force the in-frame decision instead of detecting it.
    #[tsify(optional)]
    pub in_frame: Option<bool>,
    /// Channel id shared with the presentation host.
    #[tsify(optional)]
    pub channel_id: Option<String>,
    /// Start with overlays switched off. Defaults to `true`.
    #[tsify(optional)]
    pub enabled: Option<bool>,
}

impl JsOverlayOptions {
    pub fn to_config(&self) -> OverlayConfig {
        let defaults = OverlayConfig::default();
        OverlayConfig {
            z_index: self.z_index.unwrap_or(defaults.z_index),
            rect_epsilon: self.rect_epsilon.unwrap_or(defaults.rect_epsilon),
            flash_duration_ms: self.flash_duration_ms.unwrap_or(defaults.flash_duration_ms),
            studio_url: self.studio_url.clone(),
            api_version: self
                .api_version
                .as_deref()
                .map(SmolStr::new)
                .unwrap_or(defaults.api_version),
            api_host: self.api_host.clone(),
            project_id: self.project_id.as_deref().map(SmolStr::new),
            dataset: self.dataset.as_deref().map(SmolStr::new),
            in_frame: self.in_frame,
        }
    }
}

/// Props for `createDataAttribute`.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub struct JsDataAttributeProps {
    pub id: String,
    #[serde(rename = "type", default)]
    #[tsify(optional)]
    pub type_name: Option<String>,
    pub path: String,
    pub base_url: String,
    #[serde(default)]
    #[tsify(optional)]
    pub project_id: Option<String>,
    #[serde(default)]
    #[tsify(optional)]
    pub dataset: Option<String>,
    #[serde(default)]
    #[tsify(optional)]
    pub tool: Option<String>,
    #[serde(default)]
    #[tsify(optional)]
    pub workspace: Option<String>,
}

impl From<JsDataAttributeProps> for ResolvedNode {
    fn from(props: JsDataAttributeProps) -> Self {
        ResolvedNode {
            id: props.id.into(),
            type_name: props.type_name.map(Into::into),
            path: props.path.into(),
            project_id: props.project_id.map(Into::into),
            dataset: props.dataset.map(Into::into),
            base_url: props.base_url,
            tool: props.tool.map(Into::into),
            workspace: props.workspace.map(Into::into),
            is_draft: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
#[serde(rename_all = "camelCase")]
pub enum JsHistoryUpdateType {
    Push,
    Pop,
    Replace,
}

/// A navigation, in the shape routers see it.
#[derive(Debug, Clone, Serialize, Deserialize, Tsify)]
#[tsify(into_wasm_abi, from_wasm_abi)]
pub struct JsHistoryUpdate {
    #[serde(rename = "type")]
    pub kind: JsHistoryUpdateType,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[tsify(optional)]
    pub title: Option<String>,
}

impl From<JsHistoryUpdate> for HistoryUpdate {
    fn from(update: JsHistoryUpdate) -> Self {
        let kind = match update.kind {
            JsHistoryUpdateType::Push => HistoryUpdateKind::Push,
            JsHistoryUpdateType::Pop => HistoryUpdateKind::Pop,
            JsHistoryUpdateType::Replace => HistoryUpdateKind::Replace,
        };
        HistoryUpdate {
            kind,
            url: update.url,
            title: update.title,
        }
    }
}

impl From<&HistoryUpdate> for JsHistoryUpdate {
    fn from(update: &HistoryUpdate) -> Self {
        let kind = match update.kind {
            HistoryUpdateKind::Push => JsHistoryUpdateType::Push,
            HistoryUpdateKind::Pop => JsHistoryUpdateType::Pop,
            HistoryUpdateKind::Replace => JsHistoryUpdateType::Replace,
        };
        JsHistoryUpdate {
            kind,
            url: update.url.clone(),
            title: update.title.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_fall_back_to_defaults() {
        let options = JsOverlayOptions {
            z_index: Some(10),
            dataset: Some("production".into()),
            ..Default::default()
        };
        let config = options.to_config();
        assert_eq!(config.z_index, 10);
        assert_eq!(config.dataset.as_deref(), Some("production"));
        assert_eq!(config.api_version, OverlayConfig::default().api_version);
        assert_eq!(config.flash_duration_ms, OverlayConfig::default().flash_duration_ms);
    }

    #[test]
    fn data_attribute_props_become_node() {
        let props = JsDataAttributeProps {
            id: "home".into(),
            type_name: Some("page".into()),
            path: "title".into(),
            base_url: "/studio".into(),
            project_id: None,
            dataset: None,
            tool: None,
            workspace: None,
        };
        let node = ResolvedNode::from(props);
        assert_eq!(node.id, "home");
        assert_eq!(node.type_name.as_deref(), Some("page"));
        assert_eq!(node.base_url, "/studio");
    }

    #[test]
    fn history_update_kinds_map_both_ways() {
        let update = HistoryUpdate::from(JsHistoryUpdate {
            kind: JsHistoryUpdateType::Replace,
            url: "/about".into(),
            title: None,
        });
        assert_eq!(update.kind, HistoryUpdateKind::Replace);
        let back = JsHistoryUpdate::from(&update);
        assert_eq!(back.kind, JsHistoryUpdateType::Replace);
        assert_eq!(back.url, "/about");
    }
}
