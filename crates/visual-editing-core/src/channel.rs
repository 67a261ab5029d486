//! Cross-frame channel protocol.
//!
//! A channel connects the overlay (embed side, inside the preview frame) with
//! the presentation host (host side, the parent frame). The embed side opens
//! with `handshake/syn`, the host answers `handshake/syn-ack` and the embed
//! confirms with `handshake/ack`; both sides are then `Connected`.
//!
//! The channel itself is platform-agnostic. Delivery goes through a
//! [`Transport`]; inbound envelopes are fed to [`Channel::receive`], which
//! returns the resulting events instead of calling back into the caller.

use std::fmt;
use std::marker::PhantomData;

use smol_str::SmolStr;

use crate::error::VisualEditingError;
use crate::messages::{CHANNEL_DOMAIN, ChannelMessage, Envelope, HandshakeMsg};

/// Connection id of the overlay side.
pub const OVERLAYS: &str = "overlays";
/// Connection id of the presentation host side.
pub const PRESENTATION: &str = "presentation";

/// Delivers envelopes to the other side.
pub trait Transport {
    fn post(&self, envelope: &Envelope) -> Result<(), VisualEditingError>;
}

impl<T: Transport + ?Sized> Transport for std::rc::Rc<T> {
    fn post(&self, envelope: &Envelope) -> Result<(), VisualEditingError> {
        (**self).post(envelope)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelRole {
    /// Runs inside the preview frame and initiates the handshake.
    Embed,
    /// Runs in the parent frame and answers the handshake.
    Host,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ChannelStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ChannelStatus::Disconnected => "disconnected",
            ChannelStatus::Connecting => "connecting",
            ChannelStatus::Connected => "connected",
        })
    }
}

/// Outcome of feeding an envelope to [`Channel::receive`].
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent<In> {
    Status(ChannelStatus),
    Message(In),
}

/// Handle for removing a listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type StatusListener = Box<dyn FnMut(ChannelStatus)>;
type MessageListener<In> = Box<dyn FnMut(&In)>;

/// One end of a cross-frame connection.
///
/// `In` is the message family this side receives, `Out` the family it sends.
pub struct Channel<T, In, Out> {
    transport: T,
    role: ChannelRole,
    id: SmolStr,
    peer: SmolStr,
    channel_id: SmolStr,
    status: ChannelStatus,
    in_frame: bool,
    next_subscription: u64,
    status_listeners: Vec<(SubscriptionId, StatusListener)>,
    message_listeners: Vec<(SubscriptionId, MessageListener<In>)>,
    _messages: PhantomData<fn(Out)>,
}

impl<T, In, Out> Channel<T, In, Out>
where
    T: Transport,
    In: ChannelMessage,
    Out: ChannelMessage,
{
    /// Create a channel end.
    ///
    /// `in_frame` is fixed for the lifetime of the channel. An embed side that
    /// is not inside a frame has nobody to talk to and never connects.
    pub fn new(transport: T, role: ChannelRole, channel_id: impl Into<SmolStr>, in_frame: bool) -> Self {
        let (id, peer) = match role {
            ChannelRole::Embed => (OVERLAYS, PRESENTATION),
            ChannelRole::Host => (PRESENTATION, OVERLAYS),
        };
        Self {
            transport,
            role,
            id: SmolStr::new_static(id),
            peer: SmolStr::new_static(peer),
            channel_id: channel_id.into(),
            status: ChannelStatus::Disconnected,
            in_frame,
            next_subscription: 0,
            status_listeners: Vec::new(),
            message_listeners: Vec::new(),
            _messages: PhantomData,
        }
    }

    pub fn status(&self) -> ChannelStatus {
        self.status
    }

    pub fn role(&self) -> ChannelRole {
        self.role
    }

    pub fn in_frame(&self) -> bool {
        self.in_frame
    }

    pub fn channel_id(&self) -> &str {
        &self.channel_id
    }

    /// Start the handshake. Only the embed side sends anything.
    pub fn connect(&mut self) -> Vec<ChannelEvent<In>> {
        let mut events = Vec::new();
        if self.role == ChannelRole::Embed && !self.in_frame {
            tracing::debug!("not in a frame, channel stays disconnected");
            return events;
        }
        if self.status != ChannelStatus::Disconnected {
            return events;
        }
        self.set_status(ChannelStatus::Connecting, &mut events);
        if self.role == ChannelRole::Embed {
            self.post_handshake(HandshakeMsg::Syn);
        }
        events
    }

    /// Announce again while the host has not answered.
    ///
    /// Returns false once there is nothing left to retry, i.e. the channel is
    /// connected, disconnected, or this is the host side.
    pub fn retry_handshake(&self) -> bool {
        if self.role != ChannelRole::Embed || self.status != ChannelStatus::Connecting {
            return false;
        }
        tracing::debug!(channel_id = %self.channel_id, "re-announcing handshake");
        self.post_handshake(HandshakeMsg::Syn);
        true
    }

    /// Tell the other side we are going away.
    pub fn disconnect(&mut self) -> Vec<ChannelEvent<In>> {
        let mut events = Vec::new();
        if self.status == ChannelStatus::Disconnected {
            return events;
        }
        self.post_handshake(HandshakeMsg::Disconnect);
        self.set_status(ChannelStatus::Disconnected, &mut events);
        events
    }

    /// Send a message. Messages sent while not connected are dropped.
    ///
    /// Returns whether the message was handed to the transport.
    pub fn send(&self, msg: &Out) -> bool {
        let kind = msg.kind();
        if self.status != ChannelStatus::Connected {
            tracing::debug!(kind, status = %self.status, "dropping message, channel not connected");
            return false;
        }
        let data = match msg.encode_data() {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(kind, error = %e, "failed to encode message");
                return false;
            }
        };
        tracing::debug!(kind, "send");
        self.post(kind, data)
    }

    /// Feed an inbound envelope to the channel.
    pub fn receive(&mut self, envelope: Envelope) -> Vec<ChannelEvent<In>> {
        let mut events = Vec::new();
        if envelope.domain != CHANNEL_DOMAIN || envelope.to != self.id || envelope.from != self.peer {
            return events;
        }

        if let Some(handshake) = HandshakeMsg::from_kind(&envelope.kind) {
            self.handle_handshake(handshake, &envelope, &mut events);
            return events;
        }

        if !self.channel_id.is_empty() && envelope.channel_id != self.channel_id {
            tracing::debug!(channel = %envelope.channel_id, "ignoring message for another channel");
            return events;
        }
        if self.status != ChannelStatus::Connected {
            tracing::debug!(kind = %envelope.kind, "ignoring message before handshake");
            return events;
        }

        match In::decode(&envelope.kind, envelope.data) {
            Ok(Some(msg)) => {
                tracing::debug!(kind = %envelope.kind, "receive");
                for (_, listener) in self.message_listeners.iter_mut() {
                    listener(&msg);
                }
                events.push(ChannelEvent::Message(msg));
            }
            Ok(None) => tracing::debug!(kind = %envelope.kind, "ignoring unknown message"),
            Err(e) => tracing::warn!(kind = %envelope.kind, error = %e, "dropping malformed message"),
        }
        events
    }

    /// Register a status listener.
    pub fn on_status_update(&mut self, listener: impl FnMut(ChannelStatus) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.status_listeners.push((id, Box::new(listener)));
        id
    }

    /// Register a message listener.
    pub fn subscribe(&mut self, listener: impl FnMut(&In) + 'static) -> SubscriptionId {
        let id = self.next_id();
        self.message_listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.status_listeners.len() + self.message_listeners.len();
        self.status_listeners.retain(|(sub, _)| *sub != id);
        self.message_listeners.retain(|(sub, _)| *sub != id);
        before != self.status_listeners.len() + self.message_listeners.len()
    }

    fn handle_handshake(
        &mut self,
        handshake: HandshakeMsg,
        envelope: &Envelope,
        events: &mut Vec<ChannelEvent<In>>,
    ) {
        tracing::debug!(kind = handshake.kind(), role = ?self.role, "handshake");
        match (self.role, handshake) {
            (_, HandshakeMsg::Disconnect) => {
                self.set_status(ChannelStatus::Disconnected, events);
            }
            (ChannelRole::Host, HandshakeMsg::Syn) => {
                // A reloaded frame opens a fresh channel.
                self.channel_id = envelope.channel_id.clone();
                if self.status == ChannelStatus::Connected {
                    self.set_status(ChannelStatus::Disconnected, events);
                }
                self.set_status(ChannelStatus::Connecting, events);
                self.post_handshake(HandshakeMsg::SynAck);
            }
            (ChannelRole::Host, HandshakeMsg::Ack) if self.status == ChannelStatus::Connecting => {
                self.set_status(ChannelStatus::Connected, events);
            }
            (ChannelRole::Embed, HandshakeMsg::SynAck)
                if self.status == ChannelStatus::Connecting
                    && envelope.channel_id == self.channel_id =>
            {
                self.post_handshake(HandshakeMsg::Ack);
                self.set_status(ChannelStatus::Connected, events);
            }
            // The host answered a retried syn after we connected.
            (ChannelRole::Embed, HandshakeMsg::SynAck)
                if self.status == ChannelStatus::Connected && envelope.channel_id == self.channel_id =>
            {
                self.post_handshake(HandshakeMsg::Ack);
            }
            (role, handshake) => {
                tracing::debug!(?role, kind = handshake.kind(), status = %self.status, "unexpected handshake message");
            }
        }
    }

    fn set_status(&mut self, status: ChannelStatus, events: &mut Vec<ChannelEvent<In>>) {
        if self.status == status {
            return;
        }
        tracing::debug!(from = %self.status, to = %status, "channel status");
        self.status = status;
        for (_, listener) in self.status_listeners.iter_mut() {
            listener(status);
        }
        events.push(ChannelEvent::Status(status));
    }

    fn post_handshake(&self, handshake: HandshakeMsg) {
        self.post(handshake.kind(), serde_json::Value::Null);
    }

    fn post(&self, kind: &'static str, data: serde_json::Value) -> bool {
        let envelope = Envelope {
            domain: SmolStr::new_static(CHANNEL_DOMAIN),
            channel_id: self.channel_id.clone(),
            from: self.id.clone(),
            to: self.peer.clone(),
            kind: SmolStr::new_static(kind),
            data,
        };
        match self.transport.post(&envelope) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(kind, error = %e, "transport failed");
                false
            }
        }
    }

    fn next_id(&mut self) -> SubscriptionId {
        self.next_subscription += 1;
        SubscriptionId(self.next_subscription)
    }
}

/// State a side must re-send whenever its channel (re)connects.
///
/// Holds the latest message of each kind. [`on_status`](Self::on_status)
/// returns the messages to resend exactly once per transition into
/// `Connected`.
#[derive(Debug, Clone)]
pub struct AuthoritativeState<Out> {
    latest: Vec<Out>,
    last_status: ChannelStatus,
}

impl<Out> Default for AuthoritativeState<Out> {
    fn default() -> Self {
        Self {
            latest: Vec::new(),
            last_status: ChannelStatus::Disconnected,
        }
    }
}

impl<Out: ChannelMessage + Clone> AuthoritativeState<Out> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember `msg` as the current value for its kind.
    pub fn record(&mut self, msg: Out) {
        let kind = msg.kind();
        match self.latest.iter_mut().find(|m| m.kind() == kind) {
            Some(slot) => *slot = msg,
            None => self.latest.push(msg),
        }
    }

    pub fn get(&self, kind: &str) -> Option<&Out> {
        self.latest.iter().find(|m| m.kind() == kind)
    }

    /// Observe a status change; returns what to resend.
    pub fn on_status(&mut self, status: ChannelStatus) -> Vec<Out> {
        let entering = status == ChannelStatus::Connected && self.last_status != ChannelStatus::Connected;
        self.last_status = status;
        if entering { self.latest.clone() } else { Vec::new() }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::messages::{FocusPayload, Perspective, PresentationMsg, VisualEditingMsg};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Transport that records everything posted.
    #[derive(Default)]
    pub(crate) struct RecordingTransport {
        pub posted: RefCell<Vec<Envelope>>,
    }

    impl RecordingTransport {
        pub fn kinds(&self) -> Vec<String> {
            self.posted.borrow().iter().map(|e| e.kind.to_string()).collect()
        }
    }

    impl Transport for RecordingTransport {
        fn post(&self, envelope: &Envelope) -> Result<(), VisualEditingError> {
            self.posted.borrow_mut().push(envelope.clone());
            Ok(())
        }
    }

    type Embed = Channel<Rc<RecordingTransport>, PresentationMsg, VisualEditingMsg>;
    type Host = Channel<Rc<RecordingTransport>, VisualEditingMsg, PresentationMsg>;

    fn pump(from: &RecordingTransport, to_embed: Option<&mut Embed>, to_host: Option<&mut Host>) {
        let posted: Vec<_> = from.posted.borrow_mut().drain(..).collect();
        match (to_embed, to_host) {
            (Some(embed), _) => posted.into_iter().for_each(|e| {
                embed.receive(e);
            }),
            (_, Some(host)) => posted.into_iter().for_each(|e| {
                host.receive(e);
            }),
            _ => {}
        }
    }

    fn connected_pair() -> (Embed, Rc<RecordingTransport>, Host, Rc<RecordingTransport>) {
        let embed_tx = Rc::new(RecordingTransport::default());
        let host_tx = Rc::new(RecordingTransport::default());
        let mut embed: Embed = Channel::new(embed_tx.clone(), ChannelRole::Embed, "c1", true);
        let mut host: Host = Channel::new(host_tx.clone(), ChannelRole::Host, "", true);

        embed.connect();
        pump(&embed_tx, None, Some(&mut host));
        pump(&host_tx, Some(&mut embed), None);
        pump(&embed_tx, None, Some(&mut host));
        (embed, embed_tx, host, host_tx)
    }

    #[test]
    fn test_handshake_connects_both_sides() {
        let (embed, _, host, _) = connected_pair();
        assert_eq!(embed.status(), ChannelStatus::Connected);
        assert_eq!(host.status(), ChannelStatus::Connected);
        assert_eq!(host.channel_id(), "c1");
    }

    #[test]
    fn test_lost_syn_is_retried_until_connected() {
        let embed_tx = Rc::new(RecordingTransport::default());
        let host_tx = Rc::new(RecordingTransport::default());
        let mut embed: Embed = Channel::new(embed_tx.clone(), ChannelRole::Embed, "c1", true);
        let mut host: Host = Channel::new(host_tx.clone(), ChannelRole::Host, "", true);

        embed.connect();
        // Nobody was listening yet.
        embed_tx.posted.borrow_mut().clear();
        assert_eq!(embed.status(), ChannelStatus::Connecting);

        assert!(embed.retry_handshake());
        assert_eq!(embed_tx.kinds(), vec!["handshake/syn"]);
        pump(&embed_tx, None, Some(&mut host));
        pump(&host_tx, Some(&mut embed), None);
        pump(&embed_tx, None, Some(&mut host));

        assert_eq!(embed.status(), ChannelStatus::Connected);
        assert_eq!(host.status(), ChannelStatus::Connected);
        assert!(!embed.retry_handshake());
        assert!(embed_tx.posted.borrow().is_empty());
        assert!(!host.retry_handshake());
    }

    #[test]
    fn test_late_duplicate_syn_reconnects_host() {
        let (mut embed, embed_tx, mut host, host_tx) = connected_pair();
        // A retried syn reaches the host after the handshake finished.
        host.receive(Envelope {
            domain: CHANNEL_DOMAIN.into(),
            channel_id: "c1".into(),
            from: OVERLAYS.into(),
            to: PRESENTATION.into(),
            kind: "handshake/syn".into(),
            data: serde_json::Value::Null,
        });
        assert_eq!(host.status(), ChannelStatus::Connecting);

        pump(&host_tx, Some(&mut embed), None);
        assert_eq!(embed_tx.kinds(), vec!["handshake/ack"]);
        pump(&embed_tx, None, Some(&mut host));
        assert_eq!(host.status(), ChannelStatus::Connected);
        assert_eq!(embed.status(), ChannelStatus::Connected);
    }

    #[test]
    fn test_send_before_connect_is_dropped() {
        let tx = Rc::new(RecordingTransport::default());
        let embed: Embed = Channel::new(tx.clone(), ChannelRole::Embed, "c1", true);
        assert!(!embed.send(&VisualEditingMsg::OverlayToggle { enabled: true }));
        assert!(tx.posted.borrow().is_empty());
    }

    #[test]
    fn test_not_in_frame_never_connects() {
        let tx = Rc::new(RecordingTransport::default());
        let mut embed: Embed = Channel::new(tx.clone(), ChannelRole::Embed, "c1", false);
        assert!(embed.connect().is_empty());
        assert_eq!(embed.status(), ChannelStatus::Disconnected);
        assert!(tx.posted.borrow().is_empty());
    }

    #[test]
    fn test_messages_flow_after_handshake() {
        let (mut embed, _, host, host_tx) = connected_pair();
        assert!(host.send(&PresentationMsg::Focus(FocusPayload {
            id: "home".into(),
            path: "title".into(),
        })));

        let envelope = host_tx.posted.borrow_mut().remove(0);
        assert_eq!(envelope.from, PRESENTATION);
        assert_eq!(envelope.to, OVERLAYS);
        let events = embed.receive(envelope);
        assert!(matches!(
            events.as_slice(),
            [ChannelEvent::Message(PresentationMsg::Focus(f))] if f.path == "title"
        ));
    }

    #[test]
    fn test_unknown_and_misaddressed_messages_are_ignored() {
        let (mut embed, _, _, _) = connected_pair();
        let unknown = Envelope {
            domain: CHANNEL_DOMAIN.into(),
            channel_id: "c1".into(),
            from: PRESENTATION.into(),
            to: OVERLAYS.into(),
            kind: "presentation/somethingNew".into(),
            data: serde_json::Value::Null,
        };
        assert!(embed.receive(unknown.clone()).is_empty());

        let misaddressed = Envelope {
            kind: "presentation/blur".into(),
            to: "loaders".into(),
            ..unknown.clone()
        };
        assert!(embed.receive(misaddressed).is_empty());

        let other_channel = Envelope {
            kind: "presentation/blur".into(),
            channel_id: "c2".into(),
            ..unknown
        };
        assert!(embed.receive(other_channel).is_empty());
    }

    #[test]
    fn test_status_listener_unsubscribe() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let tx = Rc::new(RecordingTransport::default());
        let mut embed: Embed = Channel::new(tx, ChannelRole::Embed, "c1", true);

        let sink = seen.clone();
        let sub = embed.on_status_update(move |status| sink.borrow_mut().push(status));
        embed.connect();
        assert!(embed.unsubscribe(sub));
        assert!(!embed.unsubscribe(sub));
        embed.disconnect();

        assert_eq!(*seen.borrow(), vec![ChannelStatus::Connecting]);
    }

    #[test]
    fn test_disconnect_message_drops_status() {
        let (mut embed, embed_tx, mut host, _) = connected_pair();
        let events = embed.disconnect();
        assert_eq!(events, vec![ChannelEvent::Status(ChannelStatus::Disconnected)]);
        assert_eq!(embed_tx.kinds(), vec!["channel/disconnect"]);
        pump(&embed_tx, None, Some(&mut host));
        assert_eq!(host.status(), ChannelStatus::Disconnected);
    }

    #[test]
    fn test_authoritative_state_resends_once_per_connect() {
        let mut state = AuthoritativeState::<PresentationMsg>::new();
        state.record(PresentationMsg::Perspective(Perspective::Published));
        state.record(PresentationMsg::Perspective(Perspective::PreviewDrafts));

        assert!(state.on_status(ChannelStatus::Connecting).is_empty());
        let resend = state.on_status(ChannelStatus::Connected);
        assert_eq!(
            resend,
            vec![PresentationMsg::Perspective(Perspective::PreviewDrafts)]
        );
        assert!(state.on_status(ChannelStatus::Connected).is_empty());

        state.on_status(ChannelStatus::Disconnected);
        assert_eq!(state.on_status(ChannelStatus::Connected).len(), 1);
    }
}
