//! DOM helpers: annotation reading, geometry and element handles.

use std::cell::Cell;

use js_sys::{Object, WeakMap};
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, EventTarget, Node, Window};

use visual_editing_core::node::{DATA_ATTRIBUTE, EDIT_INFO_ATTRIBUTE, OVERLAY_ELEMENT_ATTRIBUTE};
use visual_editing_core::{OverlayRect, PointerTarget, SanityNode};

/// Selector matching every annotated element.
pub const ANNOTATION_SELECTOR: &str = "[data-sanity],[data-sanity-edit-info]";

/// Stable numeric handles for DOM elements.
///
/// Backed by a `WeakMap`, so handing out a key never keeps an element alive.
pub struct ElementKeys {
    map: WeakMap,
    next: Cell<u32>,
}

impl ElementKeys {
    pub fn new() -> Self {
        Self {
            map: WeakMap::new(),
            next: Cell::new(1),
        }
    }

    /// Key for `element`, assigning one on first sight.
    pub fn key_for(&self, element: &Element) -> u32 {
        if let Some(key) = self.get(element) {
            return key;
        }
        let key = self.next.get();
        self.next.set(key + 1);
        let object: &Object = element.as_ref();
        self.map.set(object, &JsValue::from(key));
        key
    }

    pub fn get(&self, element: &Element) -> Option<u32> {
        let object: &Object = element.as_ref();
        self.map.get(object).as_f64().map(|key| key as u32)
    }
}

impl Default for ElementKeys {
    fn default() -> Self {
        Self::new()
    }
}

/// Read the annotation on an element, if it carries one.
///
/// `data-sanity` wins over `data-sanity-edit-info`. Malformed attributes are
/// logged and skipped.
pub fn read_annotation(element: &Element) -> Option<SanityNode> {
    if let Some(raw) = element.get_attribute(DATA_ATTRIBUTE) {
        return match SanityNode::from_data_attribute(&raw) {
            Ok(node) => Some(node),
            Err(e) => {
                tracing::warn!(error = %e, "unreadable {DATA_ATTRIBUTE}");
                None
            }
        };
    }
    let raw = element.get_attribute(EDIT_INFO_ATTRIBUTE)?;
    match SanityNode::from_edit_info(&raw) {
        Ok(node) => Some(node),
        Err(e) => {
            tracing::warn!(error = %e, "unreadable {EDIT_INFO_ATTRIBUTE}");
            None
        }
    }
}

/// Annotated elements in a subtree, the root included.
pub fn annotated_elements(root: &Element) -> Vec<Element> {
    let mut found = Vec::new();
    if root.matches(ANNOTATION_SELECTOR).unwrap_or(false) {
        found.push(root.clone());
    }
    let Ok(list) = root.query_selector_all(ANNOTATION_SELECTOR) else {
        return found;
    };
    for i in 0..list.length() {
        if let Some(element) = list.item(i).and_then(|n| n.dyn_into::<Element>().ok()) {
            found.push(element);
        }
    }
    found
}

/// Annotated elements under a node from a mutation record.
pub fn annotated_in_node(node: &Node) -> Vec<Element> {
    match node.dyn_ref::<Element>() {
        Some(element) if !is_overlay_element(element) => annotated_elements(element),
        _ => Vec::new(),
    }
}

pub fn element_rect(element: &Element) -> OverlayRect {
    let rect = element.get_bounding_client_rect();
    OverlayRect::new(rect.x(), rect.y(), rect.width(), rect.height())
}

pub fn viewport_rect(window: &Window) -> OverlayRect {
    let width = window.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    let height = window.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
    OverlayRect::new(0.0, 0.0, width, height)
}

/// Whether an element belongs to the overlay UI.
pub fn is_overlay_element(element: &Element) -> bool {
    element
        .closest(&format!("[{OVERLAY_ELEMENT_ATTRIBUTE}]"))
        .ok()
        .flatten()
        .is_some()
}

/// Where a pointer event landed, resolved against known handles.
pub enum Hit {
    Page(Vec<u32>),
    Overlay,
}

impl Hit {
    pub fn as_target(&self) -> PointerTarget<'_, u32> {
        match self {
            Hit::Page(chain) => PointerTarget::Page(chain),
            Hit::Overlay => PointerTarget::OverlayElement,
        }
    }
}

/// Walk from the event target to the root, collecting element handles
/// innermost first.
pub fn hit_test(target: Option<EventTarget>, keys: &ElementKeys) -> Hit {
    let Some(element) = target.and_then(|t| t.dyn_into::<Element>().ok()) else {
        return Hit::Page(Vec::new());
    };
    if is_overlay_element(&element) {
        return Hit::Overlay;
    }
    let mut chain = Vec::new();
    let mut current = Some(element);
    while let Some(element) = current {
        if let Some(key) = keys.get(&element) {
            chain.push(key);
        }
        current = element.parent_element();
    }
    Hit::Page(chain)
}

/// Whether the event target sits inside a link.
pub fn targets_link(target: Option<&EventTarget>) -> bool {
    target
        .and_then(|t| t.dyn_ref::<Element>())
        .and_then(|element| element.closest("a[href]").ok().flatten())
        .is_some()
}
