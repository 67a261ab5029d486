//! Thin DOM rendering of overlay views.
//!
//! One fixed container holds an absolutely positioned box per
//! [`ElementView`], keyed by element id so boxes persist across renders and
//! CSS transitions (the enable flash) can run. The context menu is rebuilt on
//! every render; it is small.

use std::collections::HashMap;
use std::rc::Rc;

use gloo_events::EventListener;
use smol_str::SmolStr;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Document, HtmlElement};

use visual_editing_core::node::OVERLAY_ELEMENT_ATTRIBUTE;
use visual_editing_core::{
    ContextMenuNode, ContextMenuView, ElementFocus, ElementView, FlashPhase, InsertSide, MenuCommand, NodeIcon,
};

const ACCENT: &str = "#2276fc";

/// Everything drawn in one pass.
pub struct RenderFrame {
    pub views: Vec<ElementView>,
    pub menu: Option<ContextMenuView>,
    pub flash: FlashPhase,
    pub flash_duration_ms: u32,
}

/// What the overlay UI can ask for.
#[derive(Clone)]
pub struct RenderActions {
    pub command: Rc<dyn Fn(MenuCommand)>,
    pub insert: Rc<dyn Fn(SmolStr, InsertSide, SmolStr)>,
}

pub struct OverlayRenderer {
    document: Document,
    container: HtmlElement,
    boxes: HashMap<SmolStr, HtmlElement>,
    menu: Option<HtmlElement>,
    listeners: Vec<EventListener>,
}

impl OverlayRenderer {
    /// Create the overlay container and append it to `body`.
    pub fn mount(document: &Document, z_index: i32) -> Result<Self, JsValue> {
        let container = create(document, "div")?;
        container.set_attribute(OVERLAY_ELEMENT_ATTRIBUTE, "container")?;
        container.set_attribute(
            "style",
            &format!("position:fixed;inset:0;pointer-events:none;z-index:{z_index};"),
        )?;
        let body = document.body().ok_or_else(|| JsValue::from_str("document has no body"))?;
        body.append_child(&container)?;
        Ok(Self {
            document: document.clone(),
            container,
            boxes: HashMap::new(),
            menu: None,
            listeners: Vec::new(),
        })
    }

    pub fn container(&self) -> &HtmlElement {
        &self.container
    }

    pub fn render(&mut self, frame: &RenderFrame, actions: &RenderActions) -> Result<(), JsValue> {
        self.listeners.clear();
        self.container.set_attribute("data-flash", flash_attr(frame.flash))?;

        let mut stale: HashMap<SmolStr, HtmlElement> = std::mem::take(&mut self.boxes);
        for view in &frame.views {
            let element = match stale.remove(&view.id) {
                Some(element) => element,
                None => {
                    let element = create(&self.document, "div")?;
                    element.set_attribute(OVERLAY_ELEMENT_ATTRIBUTE, "element")?;
                    element.set_attribute("data-id", &view.id)?;
                    self.container.append_child(&element)?;
                    element
                }
            };
            self.update_box(&element, view, frame, actions)?;
            self.boxes.insert(view.id.clone(), element);
        }
        for (_, element) in stale {
            element.remove();
        }

        if let Some(menu) = self.menu.take() {
            menu.remove();
        }
        if let Some(view) = &frame.menu {
            let menu = self.context_menu(view, actions)?;
            self.container.append_child(&menu)?;
            self.menu = Some(menu);
        }
        Ok(())
    }

    fn update_box(
        &mut self,
        element: &HtmlElement,
        view: &ElementView,
        frame: &RenderFrame,
        actions: &RenderActions,
    ) -> Result<(), JsValue> {
        let focused = view.focused.is_focused();
        element.set_attribute("data-focused", focus_attr(view.focused))?;
        element.set_attribute("data-hovered", if view.hovered { "true" } else { "false" })?;

        let outline = if focused {
            format!("outline:2px solid {ACCENT};")
        } else if view.hovered || frame.flash == FlashPhase::Flashing {
            format!("outline:1px solid {ACCENT};")
        } else if frame.flash == FlashPhase::FadingOut {
            format!(
                "outline:1px solid transparent;transition:outline-color {}ms ease-out;",
                frame.flash_duration_ms
            )
        } else {
            String::new()
        };
        let rect = view.rect;
        element.set_attribute(
            "style",
            &format!(
                "position:absolute;left:0;top:0;box-sizing:border-box;pointer-events:none;\
                 transform:translate({}px,{}px);width:{}px;height:{}px;{outline}",
                rect.x, rect.y, rect.w, rect.h
            ),
        )?;

        element.set_inner_html("");
        if !(view.hovered || focused) {
            return Ok(());
        }

        let tab = create(&self.document, "div")?;
        tab.set_attribute(
            "style",
            &format!(
                "position:absolute;left:0;bottom:100%;display:flex;gap:4px;align-items:center;\
                 padding:2px 6px;font:12px/1.4 system-ui,sans-serif;color:#fff;background:{ACCENT};\
                 pointer-events:auto;white-space:nowrap;"
            ),
        )?;
        tab.append_child(&icon(&self.document, &view.icon)?.into())?;
        if let Some(title) = &view.document_title {
            let label = create(&self.document, "span")?;
            label.set_text_content(Some(title.as_str()));
            tab.append_child(&label)?;
        }
        if view.show_actions {
            if let Some(href) = &view.href {
                let link = create(&self.document, "a")?;
                link.set_attribute("href", href)?;
                link.set_attribute("style", "color:inherit;")?;
                link.set_text_content(Some("Open in Studio"));
                tab.append_child(&link)?;
            }
        }
        element.append_child(&tab)?;

        if view.hovered && !view.insert_options.is_empty() {
            for side in [InsertSide::Before, InsertSide::After] {
                let zone = self.insert_zone(view, side, actions)?;
                element.append_child(&zone)?;
            }
        }
        Ok(())
    }

    fn insert_zone(&mut self, view: &ElementView, side: InsertSide, actions: &RenderActions) -> Result<HtmlElement, JsValue> {
        let zone = create(&self.document, "div")?;
        let edge = match side {
            InsertSide::Before => "top:-10px;",
            InsertSide::After => "bottom:-10px;",
        };
        zone.set_attribute(
            "style",
            &format!("position:absolute;right:0;{edge}display:flex;gap:2px;pointer-events:auto;"),
        )?;
        zone.set_attribute("data-insert", side_attr(side))?;
        for option in &view.insert_options {
            let button = create(&self.document, "button")?;
            button.set_attribute("type", "button")?;
            button.set_attribute("title", &format!("Insert {} {}", option.title, side_attr(side)))?;
            button.append_child(&icon(&self.document, &option.icon)?.into())?;
            let insert = Rc::clone(&actions.insert);
            let id = view.id.clone();
            let member = option.name.clone();
            self.listeners.push(EventListener::new(&button, "click", move |_| {
                insert(id.clone(), side, member.clone());
            }));
            zone.append_child(&button)?;
        }
        Ok(zone)
    }

    fn context_menu(&mut self, view: &ContextMenuView, actions: &RenderActions) -> Result<HtmlElement, JsValue> {
        let menu = create(&self.document, "div")?;
        menu.set_attribute(OVERLAY_ELEMENT_ATTRIBUTE, "menu")?;
        menu.set_attribute("role", "menu")?;
        menu.set_attribute(
            "style",
            &format!(
                "position:absolute;left:{}px;top:{}px;min-width:180px;padding:4px 0;pointer-events:auto;\
                 font:13px/1.4 system-ui,sans-serif;background:#fff;color:#111;border-radius:4px;\
                 box-shadow:0 2px 8px rgba(0,0,0,.2);",
                view.position.x, view.position.y
            ),
        )?;

        let header = create(&self.document, "div")?;
        header.set_attribute("style", "display:flex;gap:6px;padding:4px 10px;font-weight:600;")?;
        header.append_child(&icon(&self.document, &view.icon)?.into())?;
        let title = create(&self.document, "span")?;
        title.set_text_content(Some(view.title.as_str()));
        header.append_child(&title)?;
        menu.append_child(&header)?;

        for item in &view.items {
            let node = self.menu_node(item, actions)?;
            menu.append_child(&node)?;
        }
        Ok(menu)
    }

    fn menu_node(&mut self, item: &ContextMenuNode, actions: &RenderActions) -> Result<HtmlElement, JsValue> {
        match item {
            ContextMenuNode::Divider => {
                let rule = create(&self.document, "hr")?;
                rule.set_attribute("style", "margin:4px 0;border:0;border-top:1px solid #ddd;")?;
                Ok(rule)
            }
            ContextMenuNode::Action {
                label,
                icon: item_icon,
                hotkeys,
                command,
            } => {
                let button = create(&self.document, "button")?;
                button.set_attribute("type", "button")?;
                button.set_attribute("role", "menuitem")?;
                button.set_attribute(
                    "style",
                    "display:flex;gap:6px;width:100%;padding:4px 10px;border:0;background:none;\
                     font:inherit;text-align:left;cursor:pointer;",
                )?;
                if let Some(item_icon) = item_icon {
                    button.append_child(&icon(&self.document, item_icon)?.into())?;
                }
                let text = create(&self.document, "span")?;
                text.set_text_content(Some(label.as_str()));
                button.append_child(&text)?;
                if !hotkeys.is_empty() {
                    let keys = create(&self.document, "kbd")?;
                    keys.set_text_content(Some(hotkeys.join("+").as_str()));
                    keys.set_attribute("style", "margin-left:auto;opacity:.6;")?;
                    button.append_child(&keys)?;
                }
                let run = Rc::clone(&actions.command);
                let command = command.clone();
                self.listeners.push(EventListener::new(&button, "click", move |_| {
                    run(command.clone());
                }));
                Ok(button)
            }
            ContextMenuNode::Group {
                label,
                icon: group_icon,
                items,
            } => {
                let group = create(&self.document, "div")?;
                group.set_attribute("role", "group")?;
                let heading = create(&self.document, "div")?;
                heading.set_attribute("style", "display:flex;gap:6px;padding:4px 10px;opacity:.7;")?;
                if let Some(group_icon) = group_icon {
                    heading.append_child(&icon(&self.document, group_icon)?.into())?;
                }
                let text = create(&self.document, "span")?;
                text.set_text_content(Some(label.as_str()));
                heading.append_child(&text)?;
                group.append_child(&heading)?;
                for item in items {
                    let node = self.menu_node(item, actions)?;
                    group.append_child(&node)?;
                }
                Ok(group)
            }
        }
    }
}

impl Drop for OverlayRenderer {
    fn drop(&mut self) {
        self.container.remove();
    }
}

fn create(document: &Document, tag: &str) -> Result<HtmlElement, JsValue> {
    document.create_element(tag)?.dyn_into::<HtmlElement>().map_err(JsValue::from)
}

fn icon(document: &Document, icon: &NodeIcon) -> Result<HtmlElement, JsValue> {
    let span = create(document, "span")?;
    span.set_attribute("aria-hidden", "true")?;
    let glyph = match icon {
        NodeIcon::Svg(markup) => {
            span.set_inner_html(markup);
            return Ok(span);
        }
        NodeIcon::String => "Aa",
        NodeIcon::Number => "#",
        NodeIcon::Boolean => "◐",
        NodeIcon::Array => "[]",
        NodeIcon::Cube => "□",
    };
    span.set_text_content(Some(glyph));
    Ok(span)
}

fn focus_attr(focus: ElementFocus) -> &'static str {
    match focus {
        ElementFocus::False => "false",
        ElementFocus::True => "true",
        ElementFocus::Clicked => "clicked",
        ElementFocus::Duplicate => "duplicate",
    }
}

fn flash_attr(phase: FlashPhase) -> &'static str {
    match phase {
        FlashPhase::Idle => "idle",
        FlashPhase::Flashing => "flashing",
        FlashPhase::FadingOut => "fading",
    }
}

fn side_attr(side: InsertSide) -> &'static str {
    match side {
        InsertSide::Before => "before",
        InsertSide::After => "after",
    }
}
