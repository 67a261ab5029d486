//! Overlay state reducer.
//!
//! All overlay state transitions go through [`reduce`], a pure function of
//! the previous state and one action. Controller events and embed-bound
//! presentation messages share the same action type so the full history of
//! a session can be replayed deterministically.

use std::rc::Rc;

use smol_str::SmolStr;

use crate::channel::ChannelStatus;
use crate::geometry::{OverlayRect, Point};
use crate::messages::{OverlayMsg, Perspective, PresentationMsg};
use crate::node::SanityNode;
use crate::path::{ContentPath, is_keyed_segment};
use crate::schema::Schema;

/// Focus state of one element.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ElementFocus {
    #[default]
    False,
    /// Focused from the host.
    True,
    /// Focused by a click on this element.
    Clicked,
    /// Shows the same field as the clicked element.
    Duplicate,
}

impl ElementFocus {
    pub fn is_focused(&self) -> bool {
        !matches!(self, ElementFocus::False)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementState {
    pub id: SmolStr,
    pub sanity: SanityNode,
    pub rect: OverlayRect,
    pub hovered: bool,
    pub focused: ElementFocus,
    pub activated: bool,
}

impl ElementState {
    fn matches(&self, id: &str, path: &str) -> bool {
        self.sanity
            .as_resolved()
            .is_some_and(|node| node.id == id && node.path == path)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ContextMenuState {
    /// Element the menu was opened on.
    pub element_id: SmolStr,
    pub node: SanityNode,
    pub position: Point,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayState {
    pub context_menu: Option<ContextMenuState>,
    pub focus_path: SmolStr,
    pub elements: Vec<ElementState>,
    pub perspective: Perspective,
    pub schema: Option<Rc<Schema>>,
    /// Set by a focus change that most likely expanded the previously
    /// focused container. Cleared by every other transition.
    pub was_maybe_collapsed: bool,
}

impl OverlayState {
    pub fn element(&self, id: &str) -> Option<&ElementState> {
        self.elements.iter().find(|e| e.id == id)
    }

    pub fn hovered(&self) -> Option<&ElementState> {
        self.elements.iter().find(|e| e.hovered)
    }
}

/// Everything the reducer reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayAction {
    Overlay(OverlayMsg),
    Presentation(PresentationMsg),
}

impl From<OverlayMsg> for OverlayAction {
    fn from(msg: OverlayMsg) -> Self {
        OverlayAction::Overlay(msg)
    }
}

impl From<PresentationMsg> for OverlayAction {
    fn from(msg: PresentationMsg) -> Self {
        OverlayAction::Presentation(msg)
    }
}

/// Apply one action.
pub fn reduce(mut state: OverlayState, action: &OverlayAction) -> OverlayState {
    state.was_maybe_collapsed = false;

    match action {
        OverlayAction::Overlay(msg) => reduce_overlay(&mut state, msg),
        OverlayAction::Presentation(msg) => reduce_presentation(&mut state, msg),
    }
    state
}

fn reduce_overlay(state: &mut OverlayState, msg: &OverlayMsg) {
    match msg {
        OverlayMsg::Activate | OverlayMsg::Deactivate => {}
        OverlayMsg::Blur => {
            for element in state.elements.iter_mut() {
                element.focused = ElementFocus::False;
            }
            state.context_menu = None;
        }
        OverlayMsg::ElementRegister { id, sanity, rect } => {
            if state.element(id).is_some() {
                return;
            }
            state.elements.push(ElementState {
                id: id.clone(),
                sanity: sanity.clone(),
                rect: *rect,
                hovered: false,
                focused: ElementFocus::False,
                activated: false,
            });
        }
        OverlayMsg::ElementUnregister { id } => {
            state.elements.retain(|e| e.id != *id);
            if state.context_menu.as_ref().is_some_and(|m| m.element_id == *id) {
                state.context_menu = None;
            }
        }
        OverlayMsg::ElementUpdateRect { id, rect } => {
            if let Some(element) = element_mut(state, id) {
                element.rect = *rect;
            }
        }
        OverlayMsg::ElementMouseEnter { id, rect } => {
            for element in state.elements.iter_mut() {
                element.hovered = element.id == *id;
                if element.hovered {
                    element.rect = *rect;
                }
            }
        }
        OverlayMsg::ElementMouseLeave { id } => {
            if let Some(element) = element_mut(state, id) {
                element.hovered = false;
            }
        }
        OverlayMsg::ElementActivate { id } => {
            if let Some(element) = element_mut(state, id) {
                element.activated = true;
            }
        }
        OverlayMsg::ElementDeactivate { id } => {
            if let Some(element) = element_mut(state, id) {
                element.activated = false;
                element.hovered = false;
            }
        }
        OverlayMsg::ElementClick { id, .. } => {
            for element in state.elements.iter_mut() {
                element.focused = if element.id == *id {
                    ElementFocus::Clicked
                } else {
                    ElementFocus::False
                };
            }
            state.context_menu = None;
        }
        OverlayMsg::ElementContextMenu {
            id,
            sanity,
            position,
        } => {
            state.context_menu = match sanity {
                Some(node) if !id.is_empty() => Some(ContextMenuState {
                    element_id: id.clone(),
                    node: node.clone(),
                    position: *position,
                }),
                _ => None,
            };
        }
    }
}

fn reduce_presentation(state: &mut OverlayState, msg: &PresentationMsg) {
    match msg {
        PresentationMsg::Focus(focus) => {
            state.context_menu = None;
            if focus.path.is_empty() {
                return;
            }
            let previous = std::mem::replace(&mut state.focus_path, focus.path.clone());
            if previous != focus.path {
                state.was_maybe_collapsed = expands_keyed_item(&previous, &focus.path);
            }
            focus_elements(&mut state.elements, &focus.id, &focus.path);
        }
        PresentationMsg::Blur => {
            state.focus_path = SmolStr::default();
            for element in state.elements.iter_mut() {
                element.focused = ElementFocus::False;
            }
            state.context_menu = None;
        }
        PresentationMsg::Perspective(perspective) => state.perspective = *perspective,
        PresentationMsg::Schema(schema) => state.schema = Some(Rc::new(schema.clone())),
        PresentationMsg::Navigate(_)
        | PresentationMsg::ToggleOverlay
        | PresentationMsg::SchemaTypes(_) => {}
    }
}

fn focus_elements(elements: &mut [ElementState], id: &str, path: &str) {
    let clicked_matches = elements
        .iter()
        .any(|e| e.focused == ElementFocus::Clicked && e.matches(id, path));

    for element in elements.iter_mut() {
        element.focused = if !element.matches(id, path) {
            ElementFocus::False
        } else if element.focused == ElementFocus::Clicked {
            ElementFocus::Clicked
        } else if clicked_matches {
            ElementFocus::Duplicate
        } else {
            ElementFocus::True
        };
    }
}

/// True if `next` extends `previous` and the first added segment is a keyed
/// array item.
fn expands_keyed_item(previous: &str, next: &str) -> bool {
    let previous = ContentPath::parse(previous);
    if previous.is_empty() {
        return false;
    }
    let next = ContentPath::parse(next);
    previous.is_proper_prefix_of(&next)
        && next
            .segments()
            .get(previous.len())
            .is_some_and(|segment| is_keyed_segment(segment))
}

fn element_mut<'a>(state: &'a mut OverlayState, id: &str) -> Option<&'a mut ElementState> {
    state.elements.iter_mut().find(|e| e.id == id)
}

/// Elements that should have an overlay drawn.
///
/// Inside a frame nothing is drawn until the host is connected.
pub fn elements_to_render(
    state: &OverlayState,
    in_frame: bool,
    status: ChannelStatus,
) -> Vec<&ElementState> {
    if in_frame && status != ChannelStatus::Connected {
        return Vec::new();
    }
    state
        .elements
        .iter()
        .filter(|e| e.activated || e.hovered || e.focused.is_focused())
        .collect()
}
