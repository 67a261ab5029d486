//! Mounting overlays on the current page.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo_timers::callback::Interval;
use smol_str::SmolStr;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{Element, KeyboardEvent, MouseEvent};

use visual_editing_core::{HistoryAdapter, HistoryUpdate, OverlayConfig, OverlaySession};

use crate::dom_controller::DomController;
use crate::history::{BrowserHistory, document_title, on_popstate};
use crate::platform::{in_frame, platform};
use crate::post_message::{PostMessageTransport, listen};
use crate::render::OverlayRenderer;

pub const DEFAULT_CHANNEL_ID: &str = "visual-editing";
/// How often the handshake is re-sent until the host answers.
pub const HANDSHAKE_RETRY_MS: u32 = 500;

pub struct VisualEditingOptions {
    pub config: OverlayConfig,
    /// Router integration. Defaults to driving `window.history` directly.
    pub history: Option<Box<dyn HistoryAdapter>>,
    pub channel_id: SmolStr,
    /// Switch overlays on right after mounting.
    pub enabled: bool,
}

impl VisualEditingOptions {
    pub fn new(config: OverlayConfig) -> Self {
        Self {
            config,
            history: None,
            channel_id: SmolStr::new_static(DEFAULT_CHANNEL_ID),
            enabled: true,
        }
    }

    pub fn with_history(mut self, history: impl HistoryAdapter + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }
}

impl Default for VisualEditingOptions {
    fn default() -> Self {
        Self::new(OverlayConfig::default())
    }
}

/// A mounted overlay. Dropping it removes the overlay and every listener
/// from the page and disconnects from the host.
pub struct VisualEditing {
    controller: Rc<DomController>,
    handshake_retry: Rc<RefCell<Option<Interval>>>,
    _listeners: Vec<EventListener>,
}

impl VisualEditing {
    pub fn controller(&self) -> &Rc<DomController> {
        &self.controller
    }

    /// Report a navigation the page's router performed.
    pub fn page_navigated(&self, update: HistoryUpdate) {
        let title = web_sys::window().map(|w| document_title(&w)).unwrap_or_default();
        self.controller.page_navigated(update, &title);
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.controller.set_enabled(enabled);
    }

    /// Whether the handshake is still being re-sent.
    pub fn is_retrying_handshake(&self) -> bool {
        self.handshake_retry.borrow().is_some()
    }

    pub fn disable(self) {}
}

impl Drop for VisualEditing {
    fn drop(&mut self) {
        self.handshake_retry.borrow_mut().take();
        self.controller.teardown();
        tracing::debug!("visual editing unmounted");
    }
}

/// Mount overlays on the document body and connect to the host frame.
pub fn enable_visual_editing(options: VisualEditingOptions) -> Result<VisualEditing, JsValue> {
    let VisualEditingOptions {
        config,
        history,
        channel_id,
        enabled,
    } = options;
    config.validate().map_err(|e| JsValue::from_str(&e.to_string()))?;

    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window.document().ok_or_else(|| JsValue::from_str("no document"))?;
    let root: Element = document
        .body()
        .ok_or_else(|| JsValue::from_str("document has no body"))?
        .into();

    let framed = config.in_frame.unwrap_or_else(in_frame);
    let transport = PostMessageTransport::to_parent(&window)?;
    let host_window = framed.then(|| transport.target().clone());
    let renderer = OverlayRenderer::mount(&document, config.z_index)?;
    let history: Box<dyn HistoryAdapter> = match history {
        Some(history) => history,
        None => Box::new(BrowserHistory::new(window.clone())),
    };
    let session = OverlaySession::new(config, transport, channel_id, framed).with_history(history);
    let controller = DomController::new(window.clone(), root, session, renderer, platform().mac);

    let mut listeners = Vec::with_capacity(5);

    let weak = Rc::downgrade(&controller);
    listeners.push(listen(&window, host_window, move |envelope| {
        if let Some(controller) = weak.upgrade() {
            controller.receive(envelope);
        }
    }));

    let weak = Rc::downgrade(&controller);
    listeners.push(EventListener::new(&window, "keydown", move |event| {
        let (Some(controller), Some(event)) = (weak.upgrade(), event.dyn_ref::<KeyboardEvent>()) else {
            return;
        };
        controller.key_down(event);
    }));

    let weak = Rc::downgrade(&controller);
    listeners.push(EventListener::new(&window, "keyup", move |event| {
        let (Some(controller), Some(event)) = (weak.upgrade(), event.dyn_ref::<KeyboardEvent>()) else {
            return;
        };
        controller.key_up(event);
    }));

    let weak = Rc::downgrade(&controller);
    let capture = EventListenerOptions {
        phase: EventListenerPhase::Capture,
        passive: false,
    };
    listeners.push(EventListener::new_with_options(&window, "click", capture, move |event| {
        let (Some(controller), Some(event)) = (weak.upgrade(), event.dyn_ref::<MouseEvent>()) else {
            return;
        };
        controller.click(event);
    }));

    let weak = Rc::downgrade(&controller);
    listeners.push(on_popstate(&window, move |update, title| {
        if let Some(controller) = weak.upgrade() {
            controller.page_navigated(update, &title);
        }
    }));

    controller.connect();
    let handshake_retry = Rc::new(RefCell::new(None));
    if framed {
        *handshake_retry.borrow_mut() = Some(retry_handshake(&controller, handshake_retry.clone()));
    }
    let title = document.title();
    controller.with_session(|session| session.report_meta(title));
    if enabled {
        controller.set_enabled(true);
    }
    tracing::debug!(in_frame = framed, "visual editing mounted");

    Ok(VisualEditing {
        controller,
        handshake_retry,
        _listeners: listeners,
    })
}

/// Re-announce to the host until it answers; the host page may not be
/// listening yet when the frame loads.
fn retry_handshake(controller: &Rc<DomController>, slot: Rc<RefCell<Option<Interval>>>) -> Interval {
    let weak = Rc::downgrade(controller);
    Interval::new(HANDSHAKE_RETRY_MS, move || {
        let retrying = weak
            .upgrade()
            .is_some_and(|controller| controller.retry_handshake());
        if retrying {
            return;
        }
        // An interval cannot be dropped from inside its own callback.
        let slot = slot.clone();
        wasm_bindgen_futures::spawn_local(async move {
            slot.borrow_mut().take();
        });
    })
}
