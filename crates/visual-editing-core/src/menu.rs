//! Context menu model.

use smol_str::SmolStr;

use crate::geometry::Point;
use crate::node::SanityNode;
use crate::patch::InsertSide;
use crate::reducer::OverlayState;
use crate::resolve::{FieldLookup, ParentRef, get_field, get_schema_type};
use crate::resolved::ResolvedTypeTable;
use crate::schema::UnionMember;
use crate::view::{NodeIcon, member_icon, node_icon};

const UNKNOWN_TYPE: &str = "Unknown type";

/// What selecting a menu action does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuCommand {
    OpenInStudio,
    Insert { side: InsertSide, member: SmolStr },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContextMenuNode {
    Action {
        label: SmolStr,
        icon: Option<NodeIcon>,
        hotkeys: Vec<SmolStr>,
        command: MenuCommand,
    },
    Divider,
    Group {
        label: SmolStr,
        icon: Option<NodeIcon>,
        items: Vec<ContextMenuNode>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuView {
    pub title: SmolStr,
    pub icon: NodeIcon,
    pub position: Point,
    pub node: SanityNode,
    pub items: Vec<ContextMenuNode>,
}

impl ContextMenuView {
    /// Build the open context menu, if any.
    ///
    /// Nothing is shown until the host has sent a schema.
    pub fn build(state: &OverlayState, resolved: &ResolvedTypeTable) -> Option<Self> {
        let menu = state.context_menu.as_ref()?;
        let schema = state.schema.as_deref()?;
        let lookup = get_schema_type(&menu.node, schema)
            .map(|document| get_field(&menu.node, document, schema, resolved))
            .unwrap_or_default();

        let title = lookup
            .field
            .map(|field| SmolStr::new(field.label()))
            .unwrap_or_else(|| SmolStr::new_static(UNKNOWN_TYPE));

        Some(Self {
            title,
            icon: node_icon(lookup.field),
            position: menu.position,
            node: menu.node.clone(),
            items: menu_items(&lookup),
        })
    }
}

fn menu_items(lookup: &FieldLookup<'_>) -> Vec<ContextMenuNode> {
    let mut items = vec![open_in_studio()];
    let parent_items = parent_items(lookup.parent);
    if !parent_items.is_empty() {
        items.push(ContextMenuNode::Divider);
        items.extend(parent_items);
    }
    items
}

fn open_in_studio() -> ContextMenuNode {
    ContextMenuNode::Action {
        label: SmolStr::new_static("Open in Studio"),
        icon: None,
        hotkeys: Vec::new(),
        command: MenuCommand::OpenInStudio,
    }
}

fn parent_items(parent: Option<ParentRef<'_>>) -> Vec<ContextMenuNode> {
    let Some(union) = parent.and_then(|p| p.as_union()) else {
        return Vec::new();
    };
    [
        (InsertSide::Before, "Insert before"),
        (InsertSide::After, "Insert after"),
    ]
    .into_iter()
    .map(|(side, label)| ContextMenuNode::Group {
        label: SmolStr::new_static(label),
        icon: None,
        items: union
            .of
            .iter()
            .filter_map(|member| match member {
                UnionMember::UnionOption(option) => Some(ContextMenuNode::Action {
                    label: option.title.clone().unwrap_or_else(|| option.name.clone()),
                    icon: Some(member_icon(member)),
                    hotkeys: Vec::new(),
                    command: MenuCommand::Insert {
                        side,
                        member: option.name.clone(),
                    },
                }),
                _ => None,
            })
            .collect(),
    })
    .collect()
}
