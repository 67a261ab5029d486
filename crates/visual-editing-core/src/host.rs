//! Host side of the overlay channel.
//!
//! The presentation host answers the handshake, keeps schema, perspective
//! and resolved types current on the overlay across reloads, and resolves
//! keyed member types the overlay reports.

use smol_str::SmolStr;

use crate::channel::{AuthoritativeState, Channel, ChannelEvent, ChannelRole, ChannelStatus, Transport};
use crate::messages::{
    DocumentsPayload, Envelope, FocusPayload, HistoryUpdate, Perspective, PresentationMsg, VisualEditingMsg,
};
use crate::node::SanityNode;
use crate::patch::PatchRequest;
use crate::resolved::ResolvedTypeTable;
use crate::schema::Schema;
use crate::type_resolver::{ProjectionFetcher, ProjectionQuery, QueryResult, TypeResolver, fetch_all};

pub type PresentationChannel<T> = Channel<T, VisualEditingMsg, PresentationMsg>;

/// What the overlay told the host.
#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    Status(ChannelStatus),
    /// An element was clicked; focus its field in the editor.
    Focus(SanityNode),
    OverlayToggled(bool),
    Navigated(HistoryUpdate),
    Patch(PatchRequest),
    Documents(DocumentsPayload),
    Meta(String),
    /// New keyed paths need their member types looked up.
    TypesPending,
}

pub struct PresentationHost<T> {
    channel: PresentationChannel<T>,
    authoritative: AuthoritativeState<PresentationMsg>,
    resolver: TypeResolver,
    perspective: Perspective,
}

impl<T: Transport> PresentationHost<T> {
    pub fn new(transport: T) -> Self {
        Self {
            channel: Channel::new(transport, ChannelRole::Host, SmolStr::default(), true),
            authoritative: AuthoritativeState::new(),
            resolver: TypeResolver::new(),
            perspective: Perspective::default(),
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.channel.status()
    }

    pub fn perspective(&self) -> Perspective {
        self.perspective
    }

    pub fn resolved_types(&self) -> &ResolvedTypeTable {
        self.resolver.table()
    }

    pub fn receive(&mut self, envelope: Envelope) -> Vec<HostEvent> {
        let mut out = Vec::new();
        for event in self.channel.receive(envelope) {
            match event {
                ChannelEvent::Status(status) => {
                    for msg in self.authoritative.on_status(status) {
                        self.channel.send(&msg);
                    }
                    out.push(HostEvent::Status(status));
                }
                ChannelEvent::Message(msg) => out.extend(self.handle(msg)),
            }
        }
        out
    }

    fn handle(&mut self, msg: VisualEditingMsg) -> Option<HostEvent> {
        let event = match msg {
            VisualEditingMsg::OverlayFocus(node) => HostEvent::Focus(node),
            VisualEditingMsg::OverlayToggle { enabled } => HostEvent::OverlayToggled(enabled),
            VisualEditingMsg::OverlayNavigate(update) => HostEvent::Navigated(update),
            VisualEditingMsg::Patch(request) => HostEvent::Patch(request),
            VisualEditingMsg::Documents(documents) => HostEvent::Documents(documents),
            VisualEditingMsg::Meta { title } => HostEvent::Meta(title),
            VisualEditingMsg::SchemaPaths(paths) => {
                if self.resolver.set_paths(paths).is_empty() {
                    return None;
                }
                HostEvent::TypesPending
            }
        };
        Some(event)
    }

    // === Outbound ===

    pub fn set_schema(&mut self, schema: Schema) {
        self.publish(PresentationMsg::Schema(schema));
    }

    /// Switch perspective. Paths still unresolved are queued again; returns
    /// whether there are type queries to run.
    pub fn set_perspective(&mut self, perspective: Perspective) -> bool {
        let changed = self.perspective != perspective;
        self.perspective = perspective;
        self.publish(PresentationMsg::Perspective(perspective));
        if changed {
            self.resolver.requery_unresolved();
        }
        self.resolver.has_pending()
    }

    pub fn focus(&mut self, id: impl Into<SmolStr>, path: impl Into<SmolStr>) -> bool {
        self.channel.send(&PresentationMsg::Focus(FocusPayload {
            id: id.into(),
            path: path.into(),
        }))
    }

    pub fn blur(&mut self) -> bool {
        self.channel.send(&PresentationMsg::Blur)
    }

    pub fn navigate(&mut self, update: HistoryUpdate) -> bool {
        self.channel.send(&PresentationMsg::Navigate(update))
    }

    pub fn toggle_overlay(&mut self) -> bool {
        self.channel.send(&PresentationMsg::ToggleOverlay)
    }

    // === Type resolution ===

    pub fn take_type_queries(&mut self) -> Vec<ProjectionQuery> {
        self.resolver.take_pending()
    }

    /// Merge query results and broadcast the table if it grew.
    pub fn apply_type_results(&mut self, results: Vec<QueryResult>) -> bool {
        let changed = self.resolver.apply_results(results);
        if changed {
            let table = self.resolver.table().clone();
            tracing::debug!(entries = table.len(), "broadcasting resolved types");
            self.publish(PresentationMsg::SchemaTypes(table));
        }
        changed
    }

    /// Fetch everything pending and apply it. Holds `&mut self` across the
    /// fetch; use the split methods when the host lives in a `RefCell`.
    pub async fn resolve_types<F: ProjectionFetcher>(&mut self, fetcher: &F) -> bool {
        let queries = self.take_type_queries();
        if queries.is_empty() {
            return false;
        }
        let results = fetch_all(fetcher, queries, self.perspective).await;
        self.apply_type_results(results)
    }

    fn publish(&mut self, msg: PresentationMsg) {
        self.channel.send(&msg);
        self.authoritative.record(msg);
    }
}
