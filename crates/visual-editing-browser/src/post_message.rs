//! `window.postMessage` transport for the overlay channel.

use gloo_events::EventListener;
use gloo_utils::format::JsValueSerdeExt;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{MessageEvent, Window};

use visual_editing_core::{Envelope, Transport, VisualEditingError};

/// Posts envelopes to another window with target origin `*`.
#[derive(Clone)]
pub struct PostMessageTransport {
    target: Window,
}

impl PostMessageTransport {
    pub fn new(target: Window) -> Self {
        Self { target }
    }

    /// Transport to the parent frame. Outside a frame the parent is the
    /// window itself.
    pub fn to_parent(window: &Window) -> Result<Self, JsValue> {
        let parent = window
            .parent()?
            .ok_or_else(|| JsValue::from_str("window has no parent"))?;
        Ok(Self::new(parent))
    }

    pub fn target(&self) -> &Window {
        &self.target
    }
}

impl Transport for PostMessageTransport {
    fn post(&self, envelope: &Envelope) -> Result<(), VisualEditingError> {
        let value = JsValue::from_serde(envelope)
            .map_err(|e| VisualEditingError::Channel(e.to_string()))?;
        self.target
            .post_message(&value, "*")
            .map_err(|e| VisualEditingError::Channel(format!("{e:?}")))
    }
}

/// Listen for channel envelopes posted to `window`.
///
/// When `source` is given, messages from any other window are ignored.
/// Non-channel messages are dropped silently.
pub fn listen(
    window: &Window,
    source: Option<Window>,
    on_envelope: impl Fn(Envelope) + 'static,
) -> EventListener {
    EventListener::new(window, "message", move |event| {
        let Some(event) = event.dyn_ref::<MessageEvent>() else {
            return;
        };
        if let Some(expected) = &source {
            let expected: &JsValue = expected.as_ref();
            let from = event.source().map(JsValue::from);
            if from.as_ref() != Some(expected) {
                return;
            }
        }
        let Ok(value) = event.data().into_serde::<serde_json::Value>() else {
            return;
        };
        if let Some(envelope) = Envelope::from_value(value) {
            on_envelope(envelope);
        }
    })
}
