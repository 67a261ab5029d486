//! Render models for element overlays.
//!
//! Everything a renderer needs to draw one overlay box, computed from the
//! reducer state and the schema. No styling decisions live here.

use smol_str::SmolStr;

use crate::geometry::OverlayRect;
use crate::node::{ResolvedNode, SanityNode};
use crate::reducer::{ElementFocus, ElementState, OverlayState};
use crate::resolve::{FieldRef, get_field, get_schema_type};
use crate::resolved::ResolvedTypeTable;
use crate::schema::{SchemaNode, UnionMember};

/// Which icon to draw next to a field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeIcon {
    /// Icon supplied by the schema as SVG markup.
    Svg(String),
    String,
    Number,
    Boolean,
    Array,
    Cube,
}

/// Pick an icon for a resolved field.
pub fn node_icon(field: Option<FieldRef<'_>>) -> NodeIcon {
    let Some(field) = field else {
        return NodeIcon::Cube;
    };
    if let Some(svg) = field.icon().filter(|svg| !svg.is_empty()) {
        return NodeIcon::Svg(svg.to_string());
    }
    value_icon(field.value())
}

/// Icon for a union member, including primitive literals.
pub fn member_icon(member: &UnionMember) -> NodeIcon {
    match member {
        UnionMember::String(_) => NodeIcon::String,
        UnionMember::Number(_) => NodeIcon::Number,
        UnionMember::UnionOption(option) => node_icon(Some(FieldRef::UnionOption(option))),
    }
}

fn value_icon(value: &SchemaNode) -> NodeIcon {
    match value {
        SchemaNode::String(_) => NodeIcon::String,
        SchemaNode::Boolean(_) => NodeIcon::Boolean,
        SchemaNode::Number(_) => NodeIcon::Number,
        SchemaNode::Array(_) => NodeIcon::Array,
        _ => NodeIcon::Cube,
    }
}

/// Build the studio intent link for an annotation.
///
/// `fallback_base` is used when the annotation carries an empty base URL.
pub fn intent_href(node: &ResolvedNode, fallback_base: Option<&str>) -> Option<String> {
    let type_name = node.type_name.as_deref()?;
    let base = match (node.base_url.as_str(), fallback_base) {
        ("", Some(fallback)) => fallback,
        (base, _) => base,
    };

    let mut segments: Vec<String> = vec![base.trim_end_matches('/').to_string()];
    if let Some(workspace) = &node.workspace {
        segments.push(workspace.to_string());
    }
    segments.push("intent".into());
    segments.push("edit".into());

    let mut params = vec![
        format!("id={}", urlencoding::encode(&node.id)),
        format!("type={}", urlencoding::encode(type_name)),
        format!(
            "path={}",
            urlencoding::encode(&node.content_path().to_studio_path())
        ),
    ];
    if let Some(tool) = &node.tool {
        params.push(format!("tool={}", urlencoding::encode(tool)));
    }
    segments.push(params.join(";"));
    Some(segments.join("/"))
}

/// A named member that can be inserted next to an array item.
#[derive(Debug, Clone, PartialEq)]
pub struct InsertOption {
    pub name: SmolStr,
    pub title: SmolStr,
    pub icon: NodeIcon,
}

/// One overlay box.
#[derive(Debug, Clone, PartialEq)]
pub struct ElementView {
    pub id: SmolStr,
    pub rect: OverlayRect,
    pub focused: ElementFocus,
    pub hovered: bool,
    pub sanity: SanityNode,
    /// Title of the document type, shown in the label tab.
    pub document_title: Option<SmolStr>,
    pub icon: NodeIcon,
    /// Edit link for "Open in Studio".
    pub href: Option<String>,
    /// Union members that can be inserted before or after this item. Empty
    /// unless the element is an item of a union array.
    pub insert_options: Vec<InsertOption>,
    pub scroll_into_view: bool,
    /// Outside a frame there is no host to focus, so offer a link instead.
    pub show_actions: bool,
}

/// Inputs shared by every view built for one render pass.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    pub state: &'a OverlayState,
    pub resolved: &'a ResolvedTypeTable,
    pub in_frame: bool,
    pub studio_url: Option<&'a str>,
}

impl ElementView {
    pub fn build(element: &ElementState, cx: ViewContext<'_>) -> Self {
        let schema = cx.state.schema.as_deref();
        let document = schema.and_then(|schema| get_schema_type(&element.sanity, schema));
        let lookup = match (schema, document) {
            (Some(schema), Some(document)) => {
                get_field(&element.sanity, document, schema, cx.resolved)
            }
            _ => Default::default(),
        };

        let insert_options = lookup
            .parent
            .and_then(|parent| parent.as_union())
            .map(|union| {
                union
                    .options()
                    .map(|option| InsertOption {
                        name: option.name.clone(),
                        title: option.title.clone().unwrap_or_else(|| option.name.clone()),
                        icon: node_icon(Some(FieldRef::UnionOption(option))),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let href = match &element.sanity {
            SanityNode::Resolved(node) => intent_href(node, cx.studio_url),
            SanityNode::Stega(stega) => Some(stega.href.clone()),
        };

        let icon = match document.and_then(|doc| doc.icon.clone()) {
            Some(svg) if !svg.is_empty() => NodeIcon::Svg(svg),
            _ => NodeIcon::Cube,
        };

        Self {
            id: element.id.clone(),
            rect: element.rect,
            focused: element.focused,
            hovered: element.hovered,
            sanity: element.sanity.clone(),
            document_title: document.and_then(|doc| doc.title.clone()),
            icon,
            href,
            insert_options,
            scroll_into_view: element.focused == ElementFocus::True
                && !cx.state.was_maybe_collapsed,
            show_actions: !cx.in_frame,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{FocusPayload, OverlayMsg, PresentationMsg};
    use crate::reducer::{OverlayAction, reduce};
    use crate::schema::Schema;

    fn node(path: &str) -> ResolvedNode {
        ResolvedNode {
            id: "home".into(),
            type_name: Some("page".into()),
            path: path.into(),
            project_id: None,
            dataset: None,
            base_url: "https://example.com/studio/".into(),
            tool: None,
            workspace: None,
            is_draft: None,
        }
    }

    fn schema() -> Schema {
        serde_json::from_str(
            r#"[{"type": "document", "name": "page", "title": "Page", "icon": "<svg/>", "fields": {
                "sections": {"type": "objectField", "name": "sections", "value": {
                    "type": "array", "of": {"type": "union", "of": [
                        {"type": "unionOption", "name": "hero", "title": "Hero", "value": {"type": "object", "fields": {}}},
                        {"type": "unionOption", "name": "cta", "icon": "<svg id=\"cta\"/>", "value": {"type": "object", "fields": {}}}
                    ]}
                }},
                "count": {"type": "objectField", "name": "count", "value": {"type": "number"}}
            }}]"#,
        )
        .unwrap()
    }

    fn state_with(path: &str) -> OverlayState {
        let actions: Vec<OverlayAction> = vec![
            PresentationMsg::Schema(schema()).into(),
            OverlayMsg::ElementRegister {
                id: "ve-1".into(),
                sanity: SanityNode::Resolved(node(path)),
                rect: OverlayRect::new(0.0, 0.0, 10.0, 10.0),
            }
            .into(),
        ];
        actions.iter().fold(OverlayState::default(), |s, a| reduce(s, a))
    }

    #[test]
    fn test_intent_href() {
        assert_eq!(
            intent_href(&node("title"), None).as_deref(),
            Some("https://example.com/studio/intent/edit/id=home;type=page;path=title")
        );

        let keyed = ResolvedNode {
            workspace: Some("staging".into()),
            tool: Some("presentation".into()),
            base_url: String::new(),
            ..node(r#"items[_key=="a"].title"#)
        };
        assert_eq!(
            intent_href(&keyed, Some("/studio")).as_deref(),
            Some(
                "/studio/staging/intent/edit/id=home;type=page;path=items%5B_key%3D%3D%22a%22%5D.title;tool=presentation"
            )
        );
    }

    #[test]
    fn test_union_item_gets_insert_options() {
        let mut resolved = ResolvedTypeTable::new();
        resolved.insert("home", r#"sections[_key=="s1"]"#, "hero");
        let state = state_with(r#"sections[_key=="s1"]"#);
        let cx = ViewContext {
            state: &state,
            resolved: &resolved,
            in_frame: true,
            studio_url: None,
        };
        let view = ElementView::build(&state.elements[0], cx);

        assert_eq!(view.document_title.as_deref(), Some("Page"));
        assert_eq!(view.icon, NodeIcon::Svg("<svg/>".into()));
        let names: Vec<_> = view.insert_options.iter().map(|o| o.name.as_str()).collect();
        assert_eq!(names, ["hero", "cta"]);
        assert_eq!(view.insert_options[0].title, "Hero");
        assert_eq!(view.insert_options[1].icon, NodeIcon::Svg(r#"<svg id="cta"/>"#.into()));
        assert!(!view.show_actions);
    }

    #[test]
    fn test_plain_field_has_no_insert_options() {
        let state = state_with("count");
        let resolved = ResolvedTypeTable::new();
        let cx = ViewContext {
            state: &state,
            resolved: &resolved,
            in_frame: false,
            studio_url: None,
        };
        let view = ElementView::build(&state.elements[0], cx);
        assert!(view.insert_options.is_empty());
        assert!(view.show_actions);
        assert!(view.href.is_some());
    }

    #[test]
    fn test_scroll_into_view_suppressed_when_collapsed() {
        let mut state = state_with("count");
        state = reduce(
            state,
            &PresentationMsg::Focus(FocusPayload {
                id: "home".into(),
                path: "count".into(),
            })
            .into(),
        );
        let resolved = ResolvedTypeTable::new();
        let cx = ViewContext {
            state: &state,
            resolved: &resolved,
            in_frame: true,
            studio_url: None,
        };
        assert!(ElementView::build(&state.elements[0], cx).scroll_into_view);

        state.was_maybe_collapsed = true;
        let cx = ViewContext {
            state: &state,
            resolved: &resolved,
            in_frame: true,
            studio_url: None,
        };
        assert!(!ElementView::build(&state.elements[0], cx).scroll_into_view);
    }

    #[test]
    fn test_icons() {
        assert_eq!(node_icon(None), NodeIcon::Cube);
        let schema = schema();
        let doc = schema.document("page").unwrap();
        let count = FieldRef::ObjectField(&doc.fields["count"]);
        assert_eq!(node_icon(Some(count)), NodeIcon::Number);
        let sections = FieldRef::ObjectField(&doc.fields["sections"]);
        assert_eq!(node_icon(Some(sections)), NodeIcon::Array);
    }
}
