//! End-to-end scenarios: an overlay session and a presentation host talking
//! over an in-memory link.

use std::cell::RefCell;
use std::rc::Rc;

use serde_json::{Value, json};
use visual_editing_core::geometry::Point;
use visual_editing_core::messages::FocusPayload;
use visual_editing_core::{
    ChannelStatus, ContextMenuView, ElementFocus, Envelope, HostEvent, OverlayAction, OverlayConfig, OverlayMsg,
    OverlayRect, OverlaySession, OverlayState, Perspective, PointerTarget, PresentationHost,
    PresentationMsg, ProjectionFetcher, ProjectionQuery, ResolvedNode, SanityNode, Schema, Transport,
    VisualEditingError, get_field, get_schema_type, reduce,
};

#[derive(Default, Clone)]
struct Outbox(Rc<RefCell<Vec<Envelope>>>);

impl Outbox {
    fn drain(&self) -> Vec<Envelope> {
        self.0.borrow_mut().drain(..).collect()
    }

    fn kinds(&self) -> Vec<String> {
        self.0.borrow().iter().map(|e| e.kind.to_string()).collect()
    }
}

impl Transport for Outbox {
    fn post(&self, envelope: &Envelope) -> Result<(), VisualEditingError> {
        self.0.borrow_mut().push(envelope.clone());
        Ok(())
    }
}

struct Link {
    session: OverlaySession<Outbox, u32>,
    to_host: Outbox,
    host: PresentationHost<Outbox>,
    to_overlay: Outbox,
    host_events: Vec<HostEvent>,
}

impl Link {
    fn new() -> Self {
        let to_host = Outbox::default();
        let to_overlay = Outbox::default();
        Self {
            session: OverlaySession::new(OverlayConfig::default(), to_host.clone(), "preview", true).with_seed(1),
            host: PresentationHost::new(to_overlay.clone()),
            to_host,
            to_overlay,
            host_events: Vec::new(),
        }
    }

    /// Deliver everything in flight until both sides are quiet.
    fn pump(&mut self) {
        loop {
            let up = self.to_host.drain();
            let down = self.to_overlay.drain();
            if up.is_empty() && down.is_empty() {
                break;
            }
            for envelope in up {
                let events = self.host.receive(envelope);
                self.host_events.extend(events);
            }
            for envelope in down {
                self.session.receive(envelope);
            }
        }
    }
}

struct CannedFetcher(Value);

impl ProjectionFetcher for CannedFetcher {
    async fn fetch(&self, _: &ProjectionQuery, _: Perspective) -> Result<Value, VisualEditingError> {
        Ok(self.0.clone())
    }
}

fn schema() -> Schema {
    serde_json::from_value(json!([
        {"type": "document", "name": "page", "title": "Page", "fields": {
            "items": {"type": "objectField", "name": "items", "value": {
                "type": "array",
                "of": {"type": "union", "of": [
                    {"type": "unionOption", "name": "featureHighlight", "title": "Feature", "value": {
                        "type": "object", "fields": {
                            "title": {"type": "objectField", "name": "title", "title": "Title", "value": {"type": "string"}}
                        }
                    }},
                    {"type": "unionOption", "name": "quote", "value": {"type": "object", "fields": {}}}
                ]}
            }}
        }}
    ]))
    .unwrap()
}

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

#[test]
fn handshake_then_authoritative_state_once() {
    let mut link = Link::new();
    link.host.set_schema(schema());
    link.host.set_perspective(Perspective::PreviewDrafts);
    assert!(link.to_overlay.kinds().is_empty());

    link.session.connect();
    link.pump();
    assert_eq!(link.session.status(), ChannelStatus::Connected);
    assert_eq!(link.host.status(), ChannelStatus::Connected);
    assert!(link.session.state().schema.is_some());
    assert_eq!(link.session.state().perspective, Perspective::PreviewDrafts);

    let connected = link
        .host_events
        .iter()
        .filter(|e| matches!(e, HostEvent::Status(ChannelStatus::Connected)))
        .count();
    assert_eq!(connected, 1);

    // Connected again without a status change: nothing is resent.
    link.pump();
    assert!(link.to_overlay.kinds().is_empty());
}

#[tokio::test]
async fn keyed_item_resolves_after_types_arrive() {
    let mut link = Link::new();
    link.host.set_schema(schema());
    link.session.connect();
    link.pump();

    link.session.set_enabled(true);
    link.session.register(1, node(r#"items[_key=="x"].title"#), OverlayRect::new(0.0, 0.0, 100.0, 20.0));
    link.pump();
    assert!(link.host_events.contains(&HostEvent::TypesPending));

    let lookup_name = |session: &OverlaySession<Outbox, u32>| {
        let state = session.state();
        let schema = state.schema.as_deref().unwrap();
        let element = &state.elements[0];
        let document = get_schema_type(&element.sanity, schema).unwrap();
        get_field(&element.sanity, document, schema, session.resolved_types())
            .field
            .map(|f| f.name().to_string())
    };
    assert_eq!(lookup_name(&link.session), None);

    let fetcher = CannedFetcher(json!({"0": "featureHighlight"}));
    assert!(link.host.resolve_types(&fetcher).await);
    link.pump();

    assert_eq!(lookup_name(&link.session).as_deref(), Some("title"));
}

#[test]
fn click_focuses_in_host_and_host_focus_marks_duplicates() {
    let mut link = Link::new();
    link.session.connect();
    link.pump();
    link.session.set_enabled(true);
    link.session.register(1, node("title"), OverlayRect::new(0.0, 0.0, 100.0, 20.0));
    link.session.register(2, node("title"), OverlayRect::new(0.0, 40.0, 100.0, 20.0));
    link.pump();

    link.session.click(PointerTarget::Page(&[1]), Default::default(), false);
    link.pump();
    assert!(link.host_events.iter().any(|e| matches!(e, HostEvent::Focus(n) if n.id() == Some("home"))));

    link.host.focus("home", "title");
    link.pump();
    let focus: Vec<_> = link.session.state().elements.iter().map(|e| e.focused).collect();
    assert_eq!(focus, vec![ElementFocus::Clicked, ElementFocus::Duplicate]);
}

#[test]
fn focus_into_keyed_child_may_have_collapsed() {
    let state = OverlayState::default();
    let focus = |path: &str| -> OverlayAction {
        PresentationMsg::Focus(FocusPayload {
            id: "home".into(),
            path: path.into(),
        })
        .into()
    };
    let state = reduce(state, &focus("sections[_key=='a']"));
    assert!(!state.was_maybe_collapsed);
    let state = reduce(state, &focus("sections[_key=='a'].items[_key=='b']"));
    assert!(state.was_maybe_collapsed);
    let state = reduce(state, &PresentationMsg::Blur.into());
    assert!(!state.was_maybe_collapsed);
}

#[test]
fn unregister_closes_context_menu_on_that_element() {
    let mut link = Link::new();
    link.host.set_schema(schema());
    link.session.connect();
    link.pump();
    link.session.set_enabled(true);
    link.session.register(1, node("items"), OverlayRect::new(0.0, 0.0, 100.0, 20.0));
    link.session.register(2, node("title"), OverlayRect::new(0.0, 40.0, 100.0, 20.0));

    assert!(link.session.context_menu(PointerTarget::Page(&[1]), Point { x: 5.0, y: 5.0 }));
    let menu = link.session.context_menu_view().unwrap();
    assert_eq!(menu.title, "items");

    link.session.unregister(&2);
    assert!(link.session.state().context_menu.is_some());
    link.session.unregister(&1);
    assert!(link.session.state().context_menu.is_none());
    assert!(ContextMenuView::build(link.session.state(), link.session.resolved_types()).is_none());
}

#[test]
fn empty_focus_path_only_closes_menu() {
    let register = OverlayMsg::ElementRegister {
        id: "ve-1".into(),
        sanity: node("title"),
        rect: OverlayRect::default(),
    };
    let open = OverlayMsg::ElementContextMenu {
        id: "ve-1".into(),
        sanity: Some(node("title")),
        position: Point { x: 0.0, y: 0.0 },
    };
    let focus_title = PresentationMsg::Focus(FocusPayload {
        id: "home".into(),
        path: "title".into(),
    });
    let empty_focus = PresentationMsg::Focus(FocusPayload {
        id: "home".into(),
        path: "".into(),
    });

    let mut state = OverlayState::default();
    let actions: [OverlayAction; 3] = [register.into(), focus_title.into(), open.into()];
    for action in actions {
        state = reduce(state, &action);
    }
    assert!(state.context_menu.is_some());

    let state = reduce(state, &empty_focus.into());
    assert!(state.context_menu.is_none());
    assert_eq!(state.focus_path, "title");
}
