//! History adapter over `window.history`.

use gloo_events::EventListener;
use wasm_bindgen::JsValue;
use web_sys::Window;

use visual_editing_core::{HistoryAdapter, HistoryUpdate, HistoryUpdateKind};

/// Drives the page's own history directly.
///
/// Pages with a client-side router should supply an adapter that goes through
/// the router instead; `pushState` alone does not re-render most apps.
pub struct BrowserHistory {
    window: Window,
}

impl BrowserHistory {
    pub fn new(window: Window) -> Self {
        Self { window }
    }
}

impl HistoryAdapter for BrowserHistory {
    fn update(&self, update: &HistoryUpdate) {
        let Ok(history) = self.window.history() else {
            tracing::warn!("history unavailable");
            return;
        };
        let result = match update.kind {
            HistoryUpdateKind::Push => history.push_state_with_url(&JsValue::NULL, "", Some(&update.url)),
            HistoryUpdateKind::Replace => history.replace_state_with_url(&JsValue::NULL, "", Some(&update.url)),
            HistoryUpdateKind::Pop => history.back(),
        };
        if let Err(e) = result {
            tracing::warn!(url = %update.url, error = ?e, "history update failed");
        }
    }
}

/// The current location as a `pop` update, for reporting back-navigation.
pub fn current_location(window: &Window) -> Option<HistoryUpdate> {
    let url = window.location().href().ok()?;
    Some(HistoryUpdate {
        kind: HistoryUpdateKind::Pop,
        url,
        title: None,
    })
}

pub fn document_title(window: &Window) -> String {
    window.document().map(|d| d.title()).unwrap_or_default()
}

/// Call `on_pop` whenever the user navigates back or forward.
pub fn on_popstate(window: &Window, on_pop: impl Fn(HistoryUpdate, String) + 'static) -> EventListener {
    let target = window.clone();
    EventListener::new(window, "popstate", move |_| {
        if let Some(update) = current_location(&target) {
            on_pop(update, document_title(&target));
        }
    })
}
