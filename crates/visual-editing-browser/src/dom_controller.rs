//! DOM driver for an overlay session.
//!
//! [`DomController`] owns the session for one mounted root and feeds it
//! everything the page does: annotated elements appearing and disappearing,
//! geometry changes, pointer and keyboard input, and envelopes from the host.
//! It carries out the [`SessionEffect`]s the session hands back and keeps the
//! rendered overlay in step with the session revision.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;
use smol_str::SmolStr;
use wasm_bindgen::JsCast;
use web_sys::{
    Element, KeyboardEvent, MouseEvent, MutationRecord, ScrollBehavior, ScrollIntoViewOptions,
    ScrollLogicalPosition, Window,
};

use visual_editing_core::{
    ClickOutcome, Envelope, FlashTicket, HistoryUpdate, InsertSide, MenuCommand, OverlaySession, SessionEffect,
};

use crate::dom::{
    ElementKeys, Hit, annotated_elements, annotated_in_node, element_rect, hit_test, is_overlay_element,
    read_annotation, targets_link, viewport_rect,
};
use crate::events::{click_modifiers, client_point, key_input, redispatch_without_alt};
use crate::observers::{ActiveObservers, ObserverHandler};
use crate::post_message::PostMessageTransport;
use crate::raf::RafSlot;
use crate::render::{OverlayRenderer, RenderActions, RenderFrame};

pub type DomSession = OverlaySession<PostMessageTransport, u32>;

pub struct DomController {
    this: Weak<DomController>,
    window: Window,
    root: Element,
    is_mac: bool,
    session: RefCell<DomSession>,
    keys: ElementKeys,
    elements: RefCell<HashMap<u32, Element>>,
    observers: RefCell<Option<ActiveObservers>>,
    renderer: RefCell<Option<OverlayRenderer>>,
    actions: RenderActions,
    rendered: Cell<Option<u64>>,
    scrolled_to: RefCell<Option<SmolStr>>,
    measure: RafSlot,
    flash_begin: RafSlot,
    flash_fade: RafSlot,
    flash_finish: RefCell<Option<Timeout>>,
}

impl DomController {
    pub fn new(window: Window, root: Element, session: DomSession, renderer: OverlayRenderer, is_mac: bool) -> Rc<Self> {
        Rc::new_cyclic(|this: &Weak<DomController>| {
            let on_command = this.clone();
            let on_insert = this.clone();
            let actions = RenderActions {
                command: Rc::new(move |command: MenuCommand| {
                    if let Some(controller) = on_command.upgrade() {
                        controller.menu_command(command);
                    }
                }),
                insert: Rc::new(move |id: SmolStr, side: InsertSide, member: SmolStr| {
                    if let Some(controller) = on_insert.upgrade() {
                        controller.insert(&id, side, &member);
                    }
                }),
            };
            Self {
                this: this.clone(),
                window,
                root,
                is_mac,
                session: RefCell::new(session),
                keys: ElementKeys::new(),
                elements: RefCell::new(HashMap::new()),
                observers: RefCell::new(None),
                renderer: RefCell::new(Some(renderer)),
                actions,
                rendered: Cell::new(None),
                scrolled_to: RefCell::new(None),
                measure: RafSlot::default(),
                flash_begin: RafSlot::default(),
                flash_fade: RafSlot::default(),
                flash_finish: RefCell::new(None),
            }
        })
    }

    /// Run `f` against the session. The borrow ends before effects run.
    pub fn with_session<R>(&self, f: impl FnOnce(&mut DomSession) -> R) -> R {
        f(&mut self.session.borrow_mut())
    }

    pub fn is_enabled(&self) -> bool {
        self.session.borrow().is_enabled()
    }

    pub fn is_observing(&self) -> bool {
        self.observers.borrow().is_some()
    }

    /// Number of annotated elements currently tracked.
    pub fn tracked(&self) -> usize {
        self.elements.borrow().len()
    }

    // === Session entry points ===

    pub fn connect(&self) {
        self.with_session(|session| session.connect());
        self.render();
    }

    /// Re-send the handshake if the host has not answered yet.
    pub fn retry_handshake(&self) -> bool {
        self.session.borrow().retry_handshake()
    }

    pub fn receive(&self, envelope: Envelope) {
        let effects = self.with_session(|session| session.receive(envelope));
        self.apply(effects);
        self.render();
    }

    pub fn set_enabled(&self, enabled: bool) {
        let effects = self.with_session(|session| session.set_enabled(enabled));
        self.apply(effects);
        self.render();
    }

    pub fn key_down(&self, event: &KeyboardEvent) {
        let input = key_input(event);
        let effects = self.with_session(|session| session.key_down(&input, self.is_mac));
        self.apply(effects);
        self.render();
    }

    pub fn key_up(&self, event: &KeyboardEvent) {
        let input = key_input(event);
        let effects = self.with_session(|session| session.key_up(&input));
        self.apply(effects);
        self.render();
    }

    pub fn click(&self, event: &MouseEvent) {
        let target = event.target();
        let on_link = targets_link(target.as_ref());
        let hit = hit_test(target, &self.keys);
        let outcome = self.with_session(|session| {
            if matches!(hit, Hit::Page(_)) && session.state().context_menu.is_some() {
                session.close_context_menu();
            }
            session.click(hit.as_target(), click_modifiers(event), on_link)
        });
        match outcome {
            ClickOutcome::PassThrough => {}
            ClickOutcome::Handled => {
                event.prevent_default();
                event.stop_propagation();
            }
            ClickOutcome::RedispatchWithoutAlt => {
                event.prevent_default();
                event.stop_propagation();
                // Dispatch once this listener has returned; listeners cannot
                // be re-entered.
                let event = event.clone();
                wasm_bindgen_futures::spawn_local(async move {
                    if let Err(e) = redispatch_without_alt(&event) {
                        tracing::warn!(error = ?e, "failed to re-dispatch click");
                    }
                });
            }
        }
        self.render();
    }

    pub fn page_navigated(&self, update: HistoryUpdate, title: &str) {
        self.with_session(|session| session.page_navigated(update, title));
    }

    pub fn menu_command(&self, command: MenuCommand) {
        let effects = self.with_session(|session| session.menu_command(&command));
        self.apply(effects);
        self.render();
    }

    pub fn insert(&self, element_id: &str, side: InsertSide, member: &str) {
        self.with_session(|session| session.insert(element_id, side, member));
        self.render();
    }

    /// Ask the host to set the field an annotated element shows. Returns
    /// false when the element is not tracked or the patch could not be sent.
    pub fn set_value(&self, element: &Element, value: serde_json::Value) -> bool {
        let Some(key) = self.keys.get(element) else {
            return false;
        };
        self.with_session(|session| {
            let Some(id) = session.controller().id_of(&key).cloned() else {
                return false;
            };
            session.set_value(&id, value)
        })
    }

    /// Stop everything and remove the overlay from the page.
    pub fn teardown(&self) {
        self.stop_observing();
        self.with_session(|session| session.disconnect());
        self.renderer.borrow_mut().take();
    }

    // === Effects ===

    fn apply(&self, effects: Vec<SessionEffect>) {
        for effect in effects {
            match effect {
                SessionEffect::Activated(ticket) => {
                    if self.start_observing() {
                        self.start_flash(ticket);
                    }
                }
                SessionEffect::Deactivated => self.stop_observing(),
                SessionEffect::Open(url) => {
                    if let Err(e) = self.window.open_with_url_and_target(&url, "_blank") {
                        tracing::warn!(%url, error = ?e, "failed to open studio link");
                    }
                }
            }
        }
    }

    /// Returns false when the page cannot be observed; overlays are switched
    /// back off in that case.
    fn start_observing(&self) -> bool {
        if self.is_observing() {
            return true;
        }
        let observers = match ActiveObservers::new(&self.window, &self.root, self.this.clone()) {
            Ok(observers) => observers,
            Err(e) => {
                tracing::error!(error = ?e, "failed to observe the page, overlays disabled");
                self.with_session(|session| session.set_enabled(false));
                return false;
            }
        };

        let found = annotated_elements(&self.root);
        let keys: Vec<u32> = found.iter().map(|element| self.keys.key_for(element)).collect();
        self.with_session(|session| session.retain(|key| keys.contains(key)));
        // Fresh observers know nothing yet; track everything again.
        self.elements.borrow_mut().clear();
        for element in &found {
            self.track(element, &observers);
        }
        tracing::debug!(elements = found.len(), "observing page");
        *self.observers.borrow_mut() = Some(observers);
        self.schedule_measure();
        true
    }

    fn stop_observing(&self) {
        self.observers.borrow_mut().take();
        self.measure.cancel();
        self.flash_begin.cancel();
        self.flash_fade.cancel();
        self.flash_finish.borrow_mut().take();
    }

    fn start_flash(&self, ticket: FlashTicket) {
        let this = self.this.clone();
        self.flash_begin.schedule(move || {
            let Some(controller) = this.upgrade() else {
                return;
            };
            if !controller.with_session(|session| session.flash_begin(ticket)) {
                return;
            }
            controller.render();
            let this = Rc::downgrade(&controller);
            controller.flash_fade.schedule(move || {
                let Some(controller) = this.upgrade() else {
                    return;
                };
                let Some(duration) = controller.with_session(|session| session.flash_fade(ticket)) else {
                    return;
                };
                controller.render();
                let this = Rc::downgrade(&controller);
                let finish = Timeout::new(duration, move || {
                    let Some(controller) = this.upgrade() else {
                        return;
                    };
                    if controller.with_session(|session| session.flash_finish(ticket)) {
                        controller.render();
                    }
                });
                *controller.flash_finish.borrow_mut() = Some(finish);
            });
        });
    }

    // === Registry ===

    fn track(&self, element: &Element, observers: &ActiveObservers) {
        let Some(sanity) = read_annotation(element) else {
            self.untrack(element, observers);
            return;
        };
        let key = self.keys.key_for(element);
        let rect = element_rect(element);
        if self.elements.borrow_mut().insert(key, element.clone()).is_none() {
            observers.observe(element);
        }
        self.with_session(|session| session.register(key, sanity, rect));
    }

    fn untrack(&self, element: &Element, observers: &ActiveObservers) {
        let Some(key) = self.keys.get(element) else {
            return;
        };
        if self.elements.borrow_mut().remove(&key).is_some() {
            observers.unobserve(element);
            self.with_session(|session| session.unregister(&key));
        }
    }

    /// Unregister elements that left the document.
    fn prune(&self, observers: &ActiveObservers) {
        let mut gone = Vec::new();
        self.elements.borrow_mut().retain(|key, element| {
            let connected = element.is_connected();
            if !connected {
                observers.unobserve(element);
                gone.push(*key);
            }
            connected
        });
        if gone.is_empty() {
            return;
        }
        self.with_session(|session| {
            for key in &gone {
                session.unregister(key);
            }
        });
    }

    // === Geometry ===

    /// Measure after layout has settled: two frames from now.
    pub fn schedule_measure(&self) {
        let this = self.this.clone();
        self.measure.schedule(move || {
            if let Some(controller) = this.upgrade() {
                controller.measure_all();
            }
        });
    }

    pub fn measure_all(&self) {
        let viewport = viewport_rect(&self.window);
        let rects: Vec<_> = self
            .elements
            .borrow()
            .iter()
            .map(|(key, element)| (*key, element_rect(element)))
            .collect();
        self.with_session(|session| {
            for (key, rect) in &rects {
                session.measure(key, *rect, viewport);
            }
        });
        self.render();
    }

    // === Rendering ===

    pub fn render(&self) {
        let (frame, scroll_target) = {
            let session = self.session.borrow();
            let revision = session.revision();
            if self.rendered.get() == Some(revision) {
                return;
            }
            self.rendered.set(Some(revision));
            let views = session.element_views();
            let scroll_target = views.iter().find(|view| view.scroll_into_view).map(|view| {
                let element = session.controller().key_of(&view.id).copied();
                (view.id.clone(), element)
            });
            let frame = RenderFrame {
                views,
                menu: session.context_menu_view(),
                flash: session.flash().phase(),
                flash_duration_ms: session.flash().duration_ms(),
            };
            (frame, scroll_target)
        };

        self.scroll_to(scroll_target);
        if let Some(renderer) = self.renderer.borrow_mut().as_mut() {
            if let Err(e) = renderer.render(&frame, &self.actions) {
                tracing::error!(error = ?e, "overlay render failed");
            }
        }
    }

    /// Scroll a newly focused element into view, once per focus.
    fn scroll_to(&self, target: Option<(SmolStr, Option<u32>)>) {
        let mut scrolled_to = self.scrolled_to.borrow_mut();
        let Some((id, key)) = target else {
            *scrolled_to = None;
            return;
        };
        if scrolled_to.as_ref() == Some(&id) {
            return;
        }
        let elements = self.elements.borrow();
        if let Some(element) = key.and_then(|key| elements.get(&key)) {
            let options = ScrollIntoViewOptions::new();
            options.set_block(ScrollLogicalPosition::Nearest);
            options.set_behavior(ScrollBehavior::Smooth);
            element.scroll_into_view_with_scroll_into_view_options(&options);
        }
        *scrolled_to = Some(id);
    }
}

impl ObserverHandler for DomController {
    fn mutations(&self, records: Vec<MutationRecord>) {
        let guard = self.observers.borrow();
        let Some(observers) = guard.as_ref() else {
            return;
        };
        let mut relevant = false;
        for record in records {
            let Some(target) = record.target() else {
                continue;
            };
            if let Some(element) = target.dyn_ref::<Element>() {
                if is_overlay_element(element) {
                    continue;
                }
            }
            match record.type_().as_str() {
                "childList" => {
                    let added = record.added_nodes();
                    for i in 0..added.length() {
                        if let Some(node) = added.item(i) {
                            for element in annotated_in_node(&node) {
                                self.track(&element, observers);
                                relevant = true;
                            }
                        }
                    }
                    relevant |= record.removed_nodes().length() > 0;
                }
                "attributes" => {
                    if let Some(element) = target.dyn_ref::<Element>() {
                        self.track(element, observers);
                        relevant = true;
                    }
                }
                _ => {}
            }
        }
        if !relevant {
            return;
        }
        self.prune(observers);
        drop(guard);
        self.schedule_measure();
        self.render();
    }

    fn geometry_changed(&self) {
        self.measure_all();
    }

    fn pointer_move(&self, event: &MouseEvent) {
        let hit = hit_test(event.target(), &self.keys);
        self.with_session(|session| session.pointer_move(hit.as_target()));
        self.render();
    }

    fn pointer_leave(&self) {
        self.with_session(|session| session.pointer_leave());
        self.render();
    }

    fn context_menu(&self, event: &MouseEvent) {
        let hit = hit_test(event.target(), &self.keys);
        let suppress = self.with_session(|session| session.context_menu(hit.as_target(), client_point(event)));
        if suppress {
            event.prevent_default();
        }
        self.render();
    }
}
