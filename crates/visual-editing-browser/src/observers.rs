//! Page observation while overlays are active.
//!
//! Everything here lives in one [`ActiveObservers`] value. Dropping it
//! disconnects the observers and removes every listener, so nothing fires
//! after overlays are switched off.

use std::rc::Weak;

use gloo_events::{EventListener, EventListenerOptions, EventListenerPhase};
use js_sys::Array;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{Element, MouseEvent, MutationObserver, MutationObserverInit, MutationRecord, ResizeObserver, Window};

use visual_editing_core::node::{DATA_ATTRIBUTE, EDIT_INFO_ATTRIBUTE};

/// Receives what the observers see.
pub trait ObserverHandler {
    fn mutations(&self, records: Vec<MutationRecord>);
    /// Something moved: an element resized, the page scrolled or the window
    /// changed size.
    fn geometry_changed(&self);
    fn pointer_move(&self, event: &MouseEvent);
    fn pointer_leave(&self);
    fn context_menu(&self, event: &MouseEvent);
}

pub struct ActiveObservers {
    mutation_observer: MutationObserver,
    resize_observer: ResizeObserver,
    _on_mutation: Closure<dyn FnMut(Array, MutationObserver)>,
    _on_resize: Closure<dyn FnMut(Array)>,
    _listeners: Vec<EventListener>,
}

impl ActiveObservers {
    pub fn new<H: ObserverHandler + 'static>(window: &Window, root: &Element, handler: Weak<H>) -> Result<Self, JsValue> {
        let h = handler.clone();
        let on_mutation = Closure::<dyn FnMut(Array, MutationObserver)>::new(move |records: Array, _| {
            let Some(handler) = h.upgrade() else {
                return;
            };
            let records = records
                .iter()
                .filter_map(|record| record.dyn_into::<MutationRecord>().ok())
                .collect();
            handler.mutations(records);
        });
        let mutation_observer = MutationObserver::new(on_mutation.as_ref().unchecked_ref())?;
        let init = MutationObserverInit::new();
        init.set_child_list(true);
        init.set_subtree(true);
        init.set_attributes(true);
        let filter = Array::of2(&JsValue::from_str(DATA_ATTRIBUTE), &JsValue::from_str(EDIT_INFO_ATTRIBUTE));
        init.set_attribute_filter(&filter);
        mutation_observer.observe_with_options(root, &init)?;

        let h = handler.clone();
        let on_resize = Closure::<dyn FnMut(Array)>::new(move |_: Array| {
            if let Some(handler) = h.upgrade() {
                handler.geometry_changed();
            }
        });
        let resize_observer = match ResizeObserver::new(on_resize.as_ref().unchecked_ref()) {
            Ok(observer) => observer,
            Err(e) => {
                mutation_observer.disconnect();
                return Err(e);
            }
        };

        let mut listeners = Vec::with_capacity(5);

        let h = handler.clone();
        listeners.push(EventListener::new_with_options(
            window,
            "scroll",
            EventListenerOptions::run_in_capture_phase(),
            move |_| {
                if let Some(handler) = h.upgrade() {
                    handler.geometry_changed();
                }
            },
        ));

        let h = handler.clone();
        listeners.push(EventListener::new(window, "resize", move |_| {
            if let Some(handler) = h.upgrade() {
                handler.geometry_changed();
            }
        }));

        let h = handler.clone();
        listeners.push(EventListener::new(window, "pointermove", move |event| {
            let (Some(handler), Some(event)) = (h.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            handler.pointer_move(event);
        }));

        if let Some(document_element) = window.document().and_then(|d| d.document_element()) {
            let h = handler.clone();
            listeners.push(EventListener::new(&document_element, "pointerleave", move |_| {
                if let Some(handler) = h.upgrade() {
                    handler.pointer_leave();
                }
            }));
        }

        let h = handler;
        let options = EventListenerOptions {
            phase: EventListenerPhase::Capture,
            passive: false,
        };
        listeners.push(EventListener::new_with_options(window, "contextmenu", options, move |event| {
            let (Some(handler), Some(event)) = (h.upgrade(), event.dyn_ref::<MouseEvent>()) else {
                return;
            };
            handler.context_menu(event);
        }));

        Ok(Self {
            mutation_observer,
            resize_observer,
            _on_mutation: on_mutation,
            _on_resize: on_resize,
            _listeners: listeners,
        })
    }

    /// Track size changes of an annotated element.
    pub fn observe(&self, element: &Element) {
        self.resize_observer.observe(element);
    }

    pub fn unobserve(&self, element: &Element) {
        self.resize_observer.unobserve(element);
    }
}

impl Drop for ActiveObservers {
    fn drop(&mut self) {
        self.mutation_observer.disconnect();
        self.resize_observer.disconnect();
    }
}
