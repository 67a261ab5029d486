//! Overlay session.
//!
//! One session per mounted overlay root. It owns the controller, the reducer
//! state, the channel to the host and everything derived from them, and is
//! driven entirely by the platform layer: DOM observations, pointer and
//! keyboard input, inbound envelopes and timer callbacks all come in through
//! methods here. Work the platform has to do in response (start observing,
//! schedule the flash, open a link) comes back as [`SessionEffect`]s.

use std::hash::Hash;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde_json::Value;

use crate::channel::{AuthoritativeState, Channel, ChannelEvent, ChannelRole, ChannelStatus, Transport};
use crate::config::OverlayConfig;
use crate::controller::{ClickModifiers, ClickOutcome, OverlayController, PointerTarget};
use crate::flash::{FlashState, FlashTicket};
use crate::geometry::{OverlayRect, Point};
use crate::history::{HistoryAdapter, with_title};
use crate::hotkeys::{HotkeyAction, KeyInput, on_key_down, on_key_up};
use crate::menu::{ContextMenuView, MenuCommand};
use crate::messages::{Envelope, HistoryUpdate, OverlayMsg, PresentationMsg, VisualEditingMsg};
use crate::node::SanityNode;
use crate::patch::{InsertSide, PatchRequest, insert_member_request, set_request};
use crate::reducer::{OverlayAction, OverlayState, elements_to_render, reduce};
use crate::reporting::Reporter;
use crate::resolved::ResolvedTypeTable;
use crate::view::{ElementView, ViewContext, intent_href};

pub type OverlayChannel<T> = Channel<T, PresentationMsg, VisualEditingMsg>;

/// Work the platform must carry out after a session call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEffect {
    /// Overlays were switched on. Scan and observe the page, then run the
    /// flash sequence for this ticket.
    Activated(FlashTicket),
    /// Overlays were switched off. Drop observers and pending flash timers.
    Deactivated,
    /// Navigate the top-level window to a studio link.
    Open(String),
}

pub struct OverlaySession<T, K> {
    config: OverlayConfig,
    channel: OverlayChannel<T>,
    controller: OverlayController<K>,
    state: OverlayState,
    resolved: ResolvedTypeTable,
    enabled: bool,
    flash: FlashState,
    history: Option<Box<dyn HistoryAdapter>>,
    reporter: Reporter,
    authoritative: AuthoritativeState<VisualEditingMsg>,
    rng: StdRng,
    revision: u64,
}

impl<T, K> OverlaySession<T, K>
where
    T: Transport,
    K: Eq + Hash + Clone,
{
    /// `detected_in_frame` is the platform's answer; `config.in_frame`
    /// overrides it.
    pub fn new(config: OverlayConfig, transport: T, channel_id: impl Into<smol_str::SmolStr>, detected_in_frame: bool) -> Self {
        let in_frame = config.in_frame.unwrap_or(detected_in_frame);
        Self {
            channel: Channel::new(transport, ChannelRole::Embed, channel_id, in_frame),
            controller: OverlayController::new(in_frame, config.rect_epsilon),
            flash: FlashState::new(config.flash_duration_ms),
            config,
            state: OverlayState::default(),
            resolved: ResolvedTypeTable::new(),
            enabled: false,
            history: None,
            reporter: Reporter::new(),
            authoritative: AuthoritativeState::new(),
            rng: StdRng::from_os_rng(),
            revision: 0,
        }
    }

    pub fn with_history(mut self, history: impl HistoryAdapter + 'static) -> Self {
        self.history = Some(Box::new(history));
        self
    }

    /// Use a fixed seed for generated array keys.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    // === Accessors ===

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn state(&self) -> &OverlayState {
        &self.state
    }

    pub fn controller(&self) -> &OverlayController<K> {
        &self.controller
    }

    pub fn channel(&self) -> &OverlayChannel<T> {
        &self.channel
    }

    pub fn status(&self) -> ChannelStatus {
        self.channel.status()
    }

    pub fn in_frame(&self) -> bool {
        self.controller.in_frame()
    }

    pub fn resolved_types(&self) -> &ResolvedTypeTable {
        &self.resolved
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn flash(&self) -> &FlashState {
        &self.flash
    }

    /// Bumped on every change that can affect rendering.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // === Channel ===

    /// Open the channel to the host.
    pub fn connect(&mut self) {
        let events = self.channel.connect();
        self.handle_channel_events(events);
    }

    /// Re-send the handshake while the host has not answered. Returns false
    /// once retrying is pointless.
    pub fn retry_handshake(&self) -> bool {
        self.channel.retry_handshake()
    }

    pub fn disconnect(&mut self) {
        let events = self.channel.disconnect();
        self.handle_channel_events(events);
    }

    /// Feed an envelope received from the host.
    pub fn receive(&mut self, envelope: Envelope) -> Vec<SessionEffect> {
        let events = self.channel.receive(envelope);
        self.handle_channel_events(events)
    }

    fn handle_channel_events(&mut self, events: Vec<ChannelEvent<PresentationMsg>>) -> Vec<SessionEffect> {
        let mut effects = Vec::new();
        for event in events {
            match event {
                ChannelEvent::Status(status) => {
                    self.revision += 1;
                    for msg in self.authoritative.on_status(status) {
                        self.channel.send(&msg);
                    }
                }
                ChannelEvent::Message(msg) => effects.extend(self.handle_presentation(msg)),
            }
        }
        effects
    }

    fn handle_presentation(&mut self, msg: PresentationMsg) -> Vec<SessionEffect> {
        match msg {
            PresentationMsg::Navigate(update) => {
                match &self.history {
                    Some(history) => history.update(&update),
                    None => tracing::debug!(url = %update.url, "navigate without history adapter"),
                }
                Vec::new()
            }
            PresentationMsg::ToggleOverlay => self.toggle(),
            PresentationMsg::SchemaTypes(types) => {
                // Entries are only ever added; a partial table keeps what is known.
                let changed = self.resolved.merge(&types);
                self.bump_if(changed);
                Vec::new()
            }
            PresentationMsg::Perspective(_) => {
                self.apply(msg.into());
                self.report();
                Vec::new()
            }
            msg @ (PresentationMsg::Focus(_) | PresentationMsg::Blur | PresentationMsg::Schema(_)) => {
                self.apply(msg.into());
                Vec::new()
            }
        }
    }

    // === Overlay enable/disable ===

    pub fn set_enabled(&mut self, enabled: bool) -> Vec<SessionEffect> {
        if self.enabled == enabled {
            return Vec::new();
        }
        self.enabled = enabled;
        tracing::debug!(enabled, "overlays");
        let (events, effect) = if enabled {
            (self.controller.activate(), SessionEffect::Activated(self.flash.start()))
        } else {
            self.flash.cancel();
            (self.controller.deactivate(), SessionEffect::Deactivated)
        };
        self.dispatch(events);
        vec![effect]
    }

    pub fn toggle(&mut self) -> Vec<SessionEffect> {
        self.set_enabled(!self.enabled)
    }

    pub fn flash_begin(&mut self, ticket: FlashTicket) -> bool {
        let changed = self.flash.begin(ticket);
        self.bump_if(changed);
        changed
    }

    /// Returns the fade duration to wait before [`flash_finish`](Self::flash_finish).
    pub fn flash_fade(&mut self, ticket: FlashTicket) -> Option<u32> {
        let duration = self.flash.fade(ticket);
        self.bump_if(duration.is_some());
        duration
    }

    pub fn flash_finish(&mut self, ticket: FlashTicket) -> bool {
        let changed = self.flash.finish(ticket);
        self.bump_if(changed);
        changed
    }

    // === Element registry ===

    pub fn register(&mut self, key: K, sanity: SanityNode, rect: OverlayRect) {
        let events = self.controller.register(key, sanity, rect);
        self.dispatch(events);
    }

    pub fn unregister(&mut self, key: &K) {
        let events = self.controller.unregister(key);
        self.dispatch(events);
    }

    /// Unregister every element for which `keep` returns false.
    pub fn retain(&mut self, keep: impl FnMut(&K) -> bool) {
        let events = self.controller.retain(keep);
        self.dispatch(events);
    }

    pub fn measure(&mut self, key: &K, rect: OverlayRect, viewport: OverlayRect) {
        let events = self.controller.measure(key, rect, viewport);
        self.dispatch(events);
    }

    // === Input ===

    pub fn pointer_move(&mut self, target: PointerTarget<'_, K>) {
        let events = self.controller.pointer_move(target);
        self.dispatch(events);
    }

    pub fn pointer_leave(&mut self) {
        let events = self.controller.pointer_leave();
        self.dispatch(events);
    }

    pub fn click(&mut self, target: PointerTarget<'_, K>, modifiers: ClickModifiers, targets_link: bool) -> ClickOutcome {
        let (outcome, events) = self.controller.click(target, modifiers, targets_link);
        self.dispatch(events);
        outcome
    }

    /// Returns whether the native context menu should be suppressed.
    pub fn context_menu(&mut self, target: PointerTarget<'_, K>, position: Point) -> bool {
        let (suppress, events) = self.controller.context_menu(target, position);
        self.dispatch(events);
        suppress
    }

    pub fn close_context_menu(&mut self) {
        self.apply(OverlayMsg::close_context_menu().into());
    }

    pub fn key_down(&mut self, input: &KeyInput, is_mac: bool) -> Vec<SessionEffect> {
        let action = on_key_down(input, is_mac, self.state.context_menu.is_some());
        self.hotkey(action)
    }

    pub fn key_up(&mut self, input: &KeyInput) -> Vec<SessionEffect> {
        let action = on_key_up(input);
        self.hotkey(action)
    }

    fn hotkey(&mut self, action: Option<HotkeyAction>) -> Vec<SessionEffect> {
        match action {
            Some(HotkeyAction::ToggleOverlay) => self.toggle(),
            Some(HotkeyAction::CloseContextMenu) => {
                self.close_context_menu();
                Vec::new()
            }
            None => Vec::new(),
        }
    }

    // === Edits and navigation ===

    /// Run a context menu action. The menu closes afterwards.
    pub fn menu_command(&mut self, command: &MenuCommand) -> Vec<SessionEffect> {
        let Some(menu) = self.state.context_menu.clone() else {
            return Vec::new();
        };
        let mut effects = Vec::new();
        match command {
            MenuCommand::OpenInStudio => effects.extend(self.open_in_studio(&menu.node)),
            MenuCommand::Insert { side, member } => {
                if let Some(node) = menu.node.as_resolved() {
                    let request = insert_member_request(node, *side, member, &mut self.rng);
                    self.send_patch(request);
                }
            }
        }
        self.close_context_menu();
        effects
    }

    /// Insert a new union member next to an element's array item.
    pub fn insert(&mut self, element_id: &str, side: InsertSide, member: &str) -> bool {
        let Some(node) = self.resolved_node(element_id) else {
            return false;
        };
        let request = insert_member_request(&node, side, member, &mut self.rng);
        self.send_patch(request)
    }

    /// Set the value of the field an element shows.
    pub fn set_value(&mut self, element_id: &str, value: Value) -> bool {
        let Some(node) = self.resolved_node(element_id) else {
            return false;
        };
        self.send_patch(set_request(&node, value))
    }

    /// Inside a frame the host focuses the field; outside, follow the link.
    pub fn open_in_studio(&mut self, node: &SanityNode) -> Option<SessionEffect> {
        if self.in_frame() {
            self.channel.send(&VisualEditingMsg::OverlayFocus(node.clone()));
            return None;
        }
        let href = match node {
            SanityNode::Resolved(node) => intent_href(node, self.config.studio_url.as_deref()),
            SanityNode::Stega(stega) => Some(stega.href.clone()),
        };
        href.map(SessionEffect::Open)
    }

    /// The page navigated on its own.
    pub fn page_navigated(&mut self, update: HistoryUpdate, document_title: &str) {
        self.channel
            .send(&VisualEditingMsg::OverlayNavigate(with_title(update, document_title)));
    }

    /// Report the page title to the host.
    pub fn report_meta(&mut self, title: impl Into<String>) {
        self.publish(VisualEditingMsg::Meta {
            title: title.into(),
        });
    }

    // === Render model ===

    pub fn element_views(&self) -> Vec<ElementView> {
        let cx = ViewContext {
            state: &self.state,
            resolved: &self.resolved,
            in_frame: self.in_frame(),
            studio_url: self.config.studio_url.as_deref(),
        };
        elements_to_render(&self.state, self.in_frame(), self.status())
            .into_iter()
            .map(|element| ElementView::build(element, cx))
            .collect()
    }

    pub fn context_menu_view(&self) -> Option<ContextMenuView> {
        ContextMenuView::build(&self.state, &self.resolved)
    }

    // === Internals ===

    /// Controller events: tell the host, then reduce.
    fn dispatch(&mut self, events: Vec<OverlayMsg>) {
        if events.is_empty() {
            return;
        }
        let mut registry_changed = false;
        for msg in events {
            match &msg {
                OverlayMsg::ElementClick { sanity, .. } => {
                    self.channel.send(&VisualEditingMsg::OverlayFocus(sanity.clone()));
                }
                OverlayMsg::Activate => {
                    self.channel.send(&VisualEditingMsg::OverlayToggle { enabled: true });
                }
                OverlayMsg::Deactivate => {
                    self.channel.send(&VisualEditingMsg::OverlayToggle { enabled: false });
                }
                OverlayMsg::ElementRegister { .. } | OverlayMsg::ElementUnregister { .. } => {
                    registry_changed = true;
                }
                OverlayMsg::ElementUpdateRect { id, .. } => {
                    tracing::trace!(%id, "rect");
                }
                _ => {}
            }
            self.apply(msg.into());
        }
        if registry_changed {
            self.report();
        }
    }

    fn apply(&mut self, action: OverlayAction) {
        let state = std::mem::take(&mut self.state);
        self.state = reduce(state, &action);
        self.revision += 1;
    }

    fn report(&mut self) {
        let reports = self.reporter.report(&self.state.elements, self.state.perspective);
        for msg in reports {
            self.publish(msg);
        }
    }

    /// Send a message that must survive reconnects.
    fn publish(&mut self, msg: VisualEditingMsg) {
        self.channel.send(&msg);
        self.authoritative.record(msg);
    }

    fn send_patch(&mut self, request: Option<PatchRequest>) -> bool {
        match request {
            Some(request) => self.channel.send(&VisualEditingMsg::Patch(request)),
            None => {
                tracing::debug!("annotation has no document type, patch skipped");
                false
            }
        }
    }

    fn resolved_node(&self, element_id: &str) -> Option<crate::node::ResolvedNode> {
        self.state.element(element_id)?.sanity.as_resolved().cloned()
    }

    fn bump_if(&mut self, changed: bool) {
        if changed {
            self.revision += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::tests::RecordingTransport;
    use crate::channel::{OVERLAYS, PRESENTATION};
    use crate::messages::{CHANNEL_DOMAIN, ChannelMessage, FocusPayload, HistoryUpdateKind};
    use crate::node::ResolvedNode;
    use crate::reducer::ElementFocus;
    use smol_str::SmolStr;
    use std::cell::RefCell;
    use std::rc::Rc;

    type TestSession = OverlaySession<Rc<RecordingTransport>, u32>;

    fn node(path: &str) -> SanityNode {
        SanityNode::Resolved(ResolvedNode {
            id: "home".into(),
            type_name: Some("page".into()),
            path: path.into(),
            project_id: None,
            dataset: None,
            base_url: "/studio".into(),
            tool: None,
            workspace: None,
            is_draft: None,
        })
    }

    fn host_envelope(kind: &str, data: Value) -> Envelope {
        Envelope {
            domain: CHANNEL_DOMAIN.into(),
            channel_id: "c1".into(),
            from: PRESENTATION.into(),
            to: OVERLAYS.into(),
            kind: kind.into(),
            data,
        }
    }

    fn host_message(msg: &PresentationMsg) -> Envelope {
        host_envelope(msg.kind(), msg.encode_data().unwrap())
    }

    fn connected() -> (TestSession, Rc<RecordingTransport>) {
        let tx = Rc::new(RecordingTransport::default());
        let mut session = TestSession::new(OverlayConfig::default(), tx.clone(), "c1", true).with_seed(7);
        session.connect();
        session.receive(host_envelope("handshake/syn-ack", Value::Null));
        assert_eq!(session.status(), ChannelStatus::Connected);
        tx.posted.borrow_mut().clear();
        (session, tx)
    }

    fn viewport() -> OverlayRect {
        OverlayRect::new(0.0, 0.0, 1000.0, 1000.0)
    }

    #[test]
    fn test_enable_sends_toggle_and_starts_flash() {
        let (mut session, tx) = connected();
        let effects = session.set_enabled(true);
        assert!(matches!(effects.as_slice(), [SessionEffect::Activated(_)]));
        assert_eq!(tx.kinds(), vec!["overlay/toggle"]);
        assert!(session.set_enabled(true).is_empty());

        assert_eq!(session.set_enabled(false), vec![SessionEffect::Deactivated]);
        let last = tx.posted.borrow().last().cloned().unwrap();
        assert_eq!(last.data, serde_json::json!({"enabled": false}));
    }

    #[test]
    fn test_register_reports_paths_and_documents() {
        let (mut session, tx) = connected();
        session.set_enabled(true);
        tx.posted.borrow_mut().clear();

        session.register(1, node(r#"items[_key=="x"].title"#), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(
            tx.kinds(),
            vec!["visual-editing/schemaPaths", "visual-editing/documents"]
        );
        assert_eq!(
            tx.posted.borrow()[0].data,
            serde_json::json!({"paths": [{"id": "home", "path": "items[_key==\"x\"]"}]})
        );

        // A rect update does not resend anything.
        tx.posted.borrow_mut().clear();
        session.measure(&1, OverlayRect::new(0.0, 5.0, 10.0, 10.0), viewport());
        assert!(tx.kinds().is_empty());
    }

    #[test]
    fn test_click_sends_focus_and_marks_clicked() {
        let (mut session, tx) = connected();
        session.set_enabled(true);
        session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        tx.posted.borrow_mut().clear();

        let outcome = session.click(PointerTarget::Page(&[1]), ClickModifiers::default(), false);
        assert_eq!(outcome, ClickOutcome::Handled);
        assert_eq!(tx.kinds(), vec!["overlay/focus"]);
        assert_eq!(session.state().elements[0].focused, ElementFocus::Clicked);
    }

    #[test]
    fn test_inbound_routing() {
        let (mut session, _) = connected();
        session.set_enabled(true);
        session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 10.0, 10.0));

        session.receive(host_message(&PresentationMsg::Focus(FocusPayload {
            id: "home".into(),
            path: "title".into(),
        })));
        assert_eq!(session.state().focus_path, "title");
        assert_eq!(session.state().elements[0].focused, ElementFocus::True);

        let effects = session.receive(host_message(&PresentationMsg::ToggleOverlay));
        assert_eq!(effects, vec![SessionEffect::Deactivated]);
        assert!(!session.is_enabled());

        let mut types = ResolvedTypeTable::new();
        types.insert("home", r#"items[_key=="x"]"#, "hero");
        session.receive(host_message(&PresentationMsg::SchemaTypes(types.clone())));
        assert_eq!(session.resolved_types(), &types);
    }

    #[test]
    fn test_navigate_goes_to_history() {
        #[derive(Default)]
        struct Recorder(RefCell<Vec<String>>);
        impl HistoryAdapter for Recorder {
            fn update(&self, update: &HistoryUpdate) {
                self.0.borrow_mut().push(update.url.clone());
            }
        }

        let history = Rc::new(Recorder::default());
        let tx = Rc::new(RecordingTransport::default());
        let mut session = TestSession::new(OverlayConfig::default(), tx.clone(), "c1", true)
            .with_history(history.clone());
        session.connect();
        session.receive(host_envelope("handshake/syn-ack", Value::Null));

        session.receive(host_message(&PresentationMsg::Navigate(HistoryUpdate {
            kind: HistoryUpdateKind::Push,
            url: "/about".into(),
            title: None,
        })));
        assert_eq!(*history.0.borrow(), vec!["/about".to_string()]);

        session.page_navigated(
            HistoryUpdate {
                kind: HistoryUpdateKind::Replace,
                url: "/team".into(),
                title: None,
            },
            "Team",
        );
        let last = tx.posted.borrow().last().cloned().unwrap();
        assert_eq!(last.kind, "overlay/navigate");
        assert_eq!(last.data["title"], "Team");
    }

    #[test]
    fn test_reports_resent_after_reconnect() {
        let (mut session, tx) = connected();
        session.register(1, node("title"), OverlayRect::default());
        session.report_meta("Home");

        session.receive(host_envelope("channel/disconnect", Value::Null));
        assert_eq!(session.status(), ChannelStatus::Disconnected);
        tx.posted.borrow_mut().clear();

        session.connect();
        session.receive(host_envelope("handshake/syn-ack", Value::Null));
        let kinds = tx.kinds();
        assert_eq!(
            kinds,
            vec![
                "handshake/syn",
                "handshake/ack",
                "visual-editing/schemaPaths",
                "visual-editing/documents",
                "visual-editing/meta",
            ]
        );
    }

    #[test]
    fn test_menu_insert_sends_patch_and_closes() {
        let (mut session, tx) = connected();
        session.set_enabled(true);
        session.register(1, node(r#"sections[_key=="a"]"#), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        assert!(session.context_menu(PointerTarget::Page(&[1]), Point { x: 1.0, y: 2.0 }));
        assert!(session.state().context_menu.is_some());
        tx.posted.borrow_mut().clear();

        let effects = session.menu_command(&MenuCommand::Insert {
            side: InsertSide::After,
            member: SmolStr::new("hero"),
        });
        assert!(effects.is_empty());
        assert!(session.state().context_menu.is_none());

        let posted = tx.posted.borrow();
        assert_eq!(posted[0].kind, "visual-editing/patch");
        let insert = &posted[0].data["patch"]["insert"];
        assert_eq!(insert["after"], r#"sections[_key=="a"]"#);
        assert_eq!(insert["items"][0]["_type"], "hero");
        assert_eq!(insert["items"][0]["_key"].as_str().map(str::len), Some(3));
    }

    #[test]
    fn test_set_value_sends_set_patch() {
        let (mut session, tx) = connected();
        session.set_enabled(true);
        session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        tx.posted.borrow_mut().clear();

        assert!(session.set_value("ve-1", Value::from("Hello")));
        let posted = tx.posted.borrow();
        assert_eq!(posted.len(), 1);
        assert_eq!(posted[0].kind, "visual-editing/patch");
        assert_eq!(posted[0].data["id"], "home");
        assert_eq!(posted[0].data["type"], "page");
        assert_eq!(posted[0].data["patch"]["set"]["title"], "Hello");
        drop(posted);

        assert!(!session.set_value("ve-404", Value::Null));
    }

    #[test]
    fn test_schema_types_only_add_entries() {
        let (mut session, _) = connected();
        let mut types = ResolvedTypeTable::new();
        types.insert("home", r#"items[_key=="x"]"#, "hero");
        session.receive(host_message(&PresentationMsg::SchemaTypes(types)));
        let revision = session.revision();

        // A restarted host starts over with a partial table.
        session.receive(host_message(&PresentationMsg::SchemaTypes(ResolvedTypeTable::new())));
        assert_eq!(
            session.resolved_types().get("home", r#"items[_key=="x"]"#).map(|t| t.as_str()),
            Some("hero")
        );
        assert_eq!(session.revision(), revision);

        let mut more = ResolvedTypeTable::new();
        more.insert("home", r#"items[_key=="x"]"#, "gallery");
        more.insert("home", r#"items[_key=="y"]"#, "gallery");
        session.receive(host_message(&PresentationMsg::SchemaTypes(more)));
        assert_eq!(session.resolved_types().len(), 2);
        assert_eq!(
            session.resolved_types().get("home", r#"items[_key=="x"]"#).map(|t| t.as_str()),
            Some("hero")
        );
        assert!(session.revision() > revision);
    }

    #[test]
    fn test_escape_closes_menu() {
        let (mut session, _) = connected();
        session.set_enabled(true);
        session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        session.context_menu(PointerTarget::Page(&[1]), Point { x: 1.0, y: 2.0 });

        session.key_down(&KeyInput::new("Escape"), false);
        assert!(session.state().context_menu.is_none());
    }

    #[test]
    fn test_open_in_studio_outside_frame() {
        let tx = Rc::new(RecordingTransport::default());
        let mut session = TestSession::new(OverlayConfig::default(), tx, "c1", false);
        let effect = session.open_in_studio(&node("title"));
        assert_eq!(
            effect,
            Some(SessionEffect::Open(
                "/studio/intent/edit/id=home;type=page;path=title".into()
            ))
        );
    }

    #[test]
    fn test_nothing_rendered_in_frame_until_connected() {
        let tx = Rc::new(RecordingTransport::default());
        let mut session = TestSession::new(OverlayConfig::default(), tx, "c1", true);
        session.set_enabled(true);
        session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 10.0, 10.0));
        session.measure(&1, OverlayRect::new(0.0, 0.0, 10.0, 10.0), viewport());
        assert!(session.element_views().is_empty());

        session.connect();
        session.receive(host_envelope("handshake/syn-ack", Value::Null));
        assert_eq!(session.element_views().len(), 1);
    }
}
