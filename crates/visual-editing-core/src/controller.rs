//! Overlay controller state machine.
//!
//! Tracks annotated elements by a platform handle `K` and turns platform
//! observations (registration, geometry, pointer input) into [`OverlayMsg`]
//! events. The controller owns no DOM; the browser layer feeds it and
//! forwards what it returns.
//!
//! Registry events (`element/register`, `element/unregister`,
//! `element/updateRect`) are emitted whenever the platform reports a change.
//! Interaction events (hover, click, context menu, viewport activation) are
//! only emitted while the controller is active.

use std::collections::HashMap;
use std::hash::Hash;

use smol_str::{SmolStr, format_smolstr};

use crate::geometry::{OverlayRect, Point};
use crate::messages::OverlayMsg;
use crate::node::SanityNode;

/// Modifier keys held during a click.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClickModifiers {
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

/// What the platform should do with the native event after a click.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// Leave the event alone.
    PassThrough,
    /// Prevent default navigation and stop propagation.
    Handled,
    /// Cancel the event and dispatch a copy without the alt key, so alt-clicks
    /// on links navigate instead of downloading.
    RedispatchWithoutAlt,
}

/// Where a pointer event landed.
#[derive(Debug, Clone, Copy)]
pub enum PointerTarget<'a, K> {
    /// Page content. Handles of the target and its ancestors, innermost first.
    Page(&'a [K]),
    /// UI drawn by the overlay itself.
    OverlayElement,
}

#[derive(Debug, Clone)]
struct TrackedElement {
    id: SmolStr,
    seq: u64,
    sanity: SanityNode,
    rect: OverlayRect,
    activated: bool,
}

/// Element registry and interaction state for one overlay root.
#[derive(Debug)]
pub struct OverlayController<K> {
    active: bool,
    in_frame: bool,
    rect_epsilon: f64,
    next_seq: u64,
    elements: HashMap<K, TrackedElement>,
    hovered: Option<K>,
}

impl<K: Eq + Hash + Clone> OverlayController<K> {
    pub fn new(in_frame: bool, rect_epsilon: f64) -> Self {
        Self {
            active: false,
            in_frame,
            rect_epsilon,
            next_seq: 0,
            elements: HashMap::new(),
            hovered: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.elements.contains_key(key)
    }

    /// Id assigned to a registered element.
    pub fn id_of(&self, key: &K) -> Option<&SmolStr> {
        self.elements.get(key).map(|e| &e.id)
    }

    /// Handle of the element registered under `id`.
    pub fn key_of(&self, id: &str) -> Option<&K> {
        self.elements
            .iter()
            .find_map(|(key, e)| (e.id == id).then_some(key))
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.elements.keys()
    }

    pub fn activate(&mut self) -> Vec<OverlayMsg> {
        if self.active {
            return Vec::new();
        }
        self.active = true;
        tracing::debug!(elements = self.elements.len(), "overlay activated");
        vec![OverlayMsg::Activate]
    }

    pub fn deactivate(&mut self) -> Vec<OverlayMsg> {
        if !self.active {
            return Vec::new();
        }
        self.active = false;
        self.hovered = None;

        let mut activated: Vec<&mut TrackedElement> =
            self.elements.values_mut().filter(|e| e.activated).collect();
        activated.sort_by_key(|e| e.seq);

        let mut events = Vec::with_capacity(activated.len() + 1);
        for element in activated {
            element.activated = false;
            events.push(OverlayMsg::ElementDeactivate {
                id: element.id.clone(),
            });
        }
        events.push(OverlayMsg::Deactivate);
        tracing::debug!("overlay deactivated");
        events
    }

    /// Track an annotated element.
    ///
    /// Re-registering with the same annotation does nothing; a changed
    /// annotation replaces the element under a fresh id.
    pub fn register(&mut self, key: K, sanity: SanityNode, rect: OverlayRect) -> Vec<OverlayMsg> {
        let mut events = Vec::new();
        if let Some(existing) = self.elements.get(&key) {
            if existing.sanity == sanity {
                return events;
            }
            events.extend(self.unregister(&key));
        }

        self.next_seq += 1;
        let id = format_smolstr!("ve-{}", self.next_seq);
        tracing::trace!(%id, "register element");
        self.elements.insert(
            key,
            TrackedElement {
                id: id.clone(),
                seq: self.next_seq,
                sanity: sanity.clone(),
                rect,
                activated: false,
            },
        );
        events.push(OverlayMsg::ElementRegister { id, sanity, rect });
        events
    }

    pub fn unregister(&mut self, key: &K) -> Vec<OverlayMsg> {
        let Some(element) = self.elements.remove(key) else {
            return Vec::new();
        };
        if self.hovered.as_ref() == Some(key) {
            self.hovered = None;
        }
        tracing::trace!(id = %element.id, "unregister element");
        vec![OverlayMsg::ElementUnregister { id: element.id }]
    }

    /// Unregister every element for which `keep` returns false.
    pub fn retain(&mut self, mut keep: impl FnMut(&K) -> bool) -> Vec<OverlayMsg> {
        let mut gone: Vec<(u64, K)> = self
            .elements
            .iter()
            .filter(|(key, _)| !keep(key))
            .map(|(key, e)| (e.seq, key.clone()))
            .collect();
        gone.sort_by_key(|(seq, _)| *seq);
        gone.into_iter()
            .flat_map(|(_, key)| self.unregister(&key))
            .collect()
    }

    /// Record a new measurement of an element.
    ///
    /// Emits `element/updateRect` when the box moved by at least the
    /// configured epsilon. While active, entering or leaving `viewport`
    /// toggles the element's activation.
    pub fn measure(&mut self, key: &K, rect: OverlayRect, viewport: OverlayRect) -> Vec<OverlayMsg> {
        let epsilon = self.rect_epsilon;
        let active = self.active;
        let Some(element) = self.elements.get_mut(key) else {
            return Vec::new();
        };

        let mut events = Vec::new();
        if !element.rect.approx_eq(&rect, epsilon) {
            element.rect = rect;
            tracing::trace!(id = %element.id, ?rect, "rect changed");
            events.push(OverlayMsg::ElementUpdateRect {
                id: element.id.clone(),
                rect,
            });
        }

        if active {
            let visible = !rect.is_empty() && rect.intersects(&viewport);
            if visible && !element.activated {
                element.activated = true;
                events.push(OverlayMsg::ElementActivate {
                    id: element.id.clone(),
                });
            } else if !visible && element.activated {
                element.activated = false;
                events.push(OverlayMsg::ElementDeactivate {
                    id: element.id.clone(),
                });
            }
        }
        events
    }

    /// Pointer moved over `target`. The innermost registered element wins.
    pub fn pointer_move(&mut self, target: PointerTarget<'_, K>) -> Vec<OverlayMsg> {
        if !self.active {
            return Vec::new();
        }
        let chain = match target {
            PointerTarget::Page(chain) => chain,
            PointerTarget::OverlayElement => return Vec::new(),
        };
        let next = self.innermost(chain).cloned();
        if next == self.hovered {
            return Vec::new();
        }

        let mut events = Vec::new();
        if let Some(prev) = self.hovered.take() {
            if let Some(element) = self.elements.get(&prev) {
                events.push(OverlayMsg::ElementMouseLeave {
                    id: element.id.clone(),
                });
            }
        }
        if let Some(key) = next {
            if let Some(element) = self.elements.get(&key) {
                events.push(OverlayMsg::ElementMouseEnter {
                    id: element.id.clone(),
                    rect: element.rect,
                });
            }
            self.hovered = Some(key);
        }
        events
    }

    /// Pointer left the window.
    pub fn pointer_leave(&mut self) -> Vec<OverlayMsg> {
        self.pointer_move(PointerTarget::Page(&[]))
    }

    /// A click landed on `target`.
    pub fn click(
        &mut self,
        target: PointerTarget<'_, K>,
        modifiers: ClickModifiers,
        targets_link: bool,
    ) -> (ClickOutcome, Vec<OverlayMsg>) {
        if modifiers.alt && targets_link {
            return (ClickOutcome::RedispatchWithoutAlt, Vec::new());
        }
        if !self.active {
            return (ClickOutcome::PassThrough, Vec::new());
        }
        let chain = match target {
            PointerTarget::Page(chain) => chain,
            PointerTarget::OverlayElement => return (ClickOutcome::PassThrough, Vec::new()),
        };
        // Ctrl-click without meta raises a native context menu on macOS; the
        // contextmenu handler takes it from there.
        if modifiers.ctrl && !modifiers.meta {
            return (ClickOutcome::PassThrough, Vec::new());
        }

        match self.innermost(chain).and_then(|key| self.elements.get(key)) {
            Some(element) => (
                ClickOutcome::Handled,
                vec![OverlayMsg::ElementClick {
                    id: element.id.clone(),
                    sanity: element.sanity.clone(),
                }],
            ),
            None => (ClickOutcome::PassThrough, vec![OverlayMsg::Blur]),
        }
    }

    /// A context menu was requested on `target`.
    ///
    /// Returns whether the native menu should be suppressed.
    pub fn context_menu(&mut self, target: PointerTarget<'_, K>, position: Point) -> (bool, Vec<OverlayMsg>) {
        if !self.active {
            return (false, Vec::new());
        }
        let PointerTarget::Page(chain) = target else {
            return (false, Vec::new());
        };
        match self.innermost(chain).and_then(|key| self.elements.get(key)) {
            Some(element) => (
                true,
                vec![OverlayMsg::ElementContextMenu {
                    id: element.id.clone(),
                    sanity: Some(element.sanity.clone()),
                    position,
                }],
            ),
            None => (false, Vec::new()),
        }
    }

    fn innermost<'c>(&self, chain: &'c [K]) -> Option<&'c K> {
        chain.iter().find(|key| self.elements.contains_key(*key))
    }
}
