//! `enableVisualEditing` and the handle it returns.

use std::rc::{Rc, Weak};

use js_sys::{Function, Reflect};
use wasm_bindgen::prelude::*;

use visual_editing_browser::history::document_title;
use visual_editing_browser::{
    DomController, HistoryAdapter, HistoryUpdate, VisualEditing, VisualEditingOptions, create_data_attribute,
    enable_visual_editing,
};

use crate::types::{JsDataAttributeProps, JsHistoryUpdate, JsOverlayOptions};

#[wasm_bindgen(typescript_custom_section)]
const HISTORY_ADAPTER: &'static str = r#"
export interface HistoryAdapter {
    subscribe(navigate: (update: JsHistoryUpdate) => void): () => void;
    update(update: JsHistoryUpdate): void;
}
"#;

/// Router integration backed by a JS `HistoryAdapter` object.
struct JsHistory {
    update: Function,
}

impl HistoryAdapter for JsHistory {
    fn update(&self, update: &HistoryUpdate) {
        let value = match serde_wasm_bindgen::to_value(&JsHistoryUpdate::from(update)) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(error = %e, "failed to convert history update");
                return;
            }
        };
        if let Err(e) = self.update.call1(&JsValue::NULL, &value) {
            tracing::warn!(error = ?e, "history adapter update threw");
        }
    }
}

fn method(object: &JsValue, name: &str) -> Result<Function, JsError> {
    Reflect::get(object, &JsValue::from_str(name))
        .ok()
        .and_then(|value| value.dyn_into::<Function>().ok())
        .ok_or_else(|| JsError::new(&format!("history adapter is missing `{name}()`")))
}

/// Mounted overlays, returned by `enableVisualEditing`.
#[wasm_bindgen]
pub struct JsVisualEditing {
    inner: Option<VisualEditing>,
    navigate: Option<Closure<dyn Fn(JsValue)>>,
    unsubscribe: Option<Function>,
}

#[wasm_bindgen]
impl JsVisualEditing {
    /// Unmount overlays and detach from the router. Safe to call twice.
    pub fn disable(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            if let Err(e) = unsubscribe.call0(&JsValue::NULL) {
                tracing::warn!(error = ?e, "history unsubscribe threw");
            }
        }
        self.navigate = None;
        self.inner = None;
    }

    #[wasm_bindgen(js_name = isEnabled)]
    pub fn is_enabled(&self) -> bool {
        self.inner
            .as_ref()
            .is_some_and(|inner| inner.controller().is_enabled())
    }

    /// Switch overlays on or off without unmounting.
    #[wasm_bindgen(js_name = setEnabled)]
    pub fn set_enabled(&self, enabled: bool) {
        if let Some(inner) = &self.inner {
            inner.set_enabled(enabled);
        }
    }

    /// Ask the host to set the field `element` is annotated with.
    ///
    /// Returns false when the element is not tracked or the host is not
    /// connected.
    #[wasm_bindgen(js_name = setValue)]
    pub fn set_value(&self, element: web_sys::Element, value: JsValue) -> Result<bool, JsError> {
        let value: serde_json::Value =
            serde_wasm_bindgen::from_value(value).map_err(|e| JsError::new(&format!("Invalid value: {}", e)))?;
        Ok(self
            .inner
            .as_ref()
            .is_some_and(|inner| inner.controller().set_value(&element, value)))
    }

    /// Report a navigation performed by the page's router.
    pub fn navigated(&self, update: JsHistoryUpdate) {
        if let Some(inner) = &self.inner {
            inner.page_navigated(update.into());
        }
    }
}

fn parse_options(value: JsValue) -> Result<JsOverlayOptions, JsError> {
    if value.is_undefined() || value.is_null() {
        return Ok(JsOverlayOptions::default());
    }
    serde_wasm_bindgen::from_value(value).map_err(|e| JsError::new(&format!("Invalid options: {}", e)))
}

/// Forward router navigations to the overlay.
fn navigate_closure(controller: Weak<DomController>) -> Closure<dyn Fn(JsValue)> {
    Closure::new(move |value: JsValue| {
        let Some(controller) = controller.upgrade() else {
            return;
        };
        let update: JsHistoryUpdate = match serde_wasm_bindgen::from_value(value) {
            Ok(update) => update,
            Err(e) => {
                tracing::warn!(error = %e, "ignoring malformed navigation");
                return;
            }
        };
        let title = web_sys::window().map(|w| document_title(&w)).unwrap_or_default();
        controller.page_navigated(update.into(), &title);
    })
}

/// Mount overlays on the current page.
///
/// `history` is an optional `HistoryAdapter`; without one the overlay drives
/// `window.history` directly.
#[wasm_bindgen(js_name = enableVisualEditing)]
pub fn enable(options: JsValue, history: JsValue) -> Result<JsVisualEditing, JsError> {
    let options = parse_options(options)?;
    let mut mount = VisualEditingOptions::new(options.to_config());
    if let Some(channel_id) = &options.channel_id {
        mount.channel_id = channel_id.as_str().into();
    }
    mount.enabled = options.enabled.unwrap_or(true);

    let subscribe = if history.is_undefined() || history.is_null() {
        None
    } else {
        let update = method(&history, "update")?;
        mount = mount.with_history(JsHistory { update });
        Some(method(&history, "subscribe")?)
    };

    let inner = enable_visual_editing(mount)
        .map_err(|e| JsError::new(&e.as_string().unwrap_or_else(|| "failed to mount overlays".into())))?;

    let mut handle = JsVisualEditing {
        inner: None,
        navigate: None,
        unsubscribe: None,
    };
    if let Some(subscribe) = subscribe {
        let navigate = navigate_closure(Rc::downgrade(inner.controller()));
        let unsubscribe = subscribe
            .call1(&history, navigate.as_ref())
            .map_err(|_| JsError::new("history adapter subscribe threw"))?;
        handle.unsubscribe = unsubscribe.dyn_into::<Function>().ok();
        handle.navigate = Some(navigate);
    }
    handle.inner = Some(inner);
    Ok(handle)
}

/// Build a `data-sanity` attribute value.
#[wasm_bindgen(js_name = createDataAttribute)]
pub fn create_data_attribute_js(props: JsDataAttributeProps) -> String {
    create_data_attribute(&props.into())
}
