//! Message families exchanged with the presentation host.
//!
//! Each family is a closed enum. On the wire a message is a `type` string and
//! a JSON `data` payload, wrapped in an [`Envelope`]. Decoding an unknown
//! `type` yields `Ok(None)` so newer hosts do not break older overlays.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use smol_str::SmolStr;

use crate::error::DecodeError;
use crate::geometry::{OverlayRect, Point};
use crate::node::SanityNode;
use crate::patch::PatchRequest;
use crate::resolved::ResolvedTypeTable;
use crate::schema::Schema;

/// Value of the envelope `domain` field.
pub const CHANNEL_DOMAIN: &str = "sanity/channels";

/// Content lens the host is previewing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Perspective {
    #[default]
    Published,
    PreviewDrafts,
    Raw,
    Drafts,
}

impl Perspective {
    pub fn as_str(&self) -> &'static str {
        match self {
            Perspective::Published => "published",
            Perspective::PreviewDrafts => "previewDrafts",
            Perspective::Raw => "raw",
            Perspective::Drafts => "drafts",
        }
    }
}

/// A message family that can travel through a channel.
pub trait ChannelMessage: Sized {
    /// The wire `type` string.
    fn kind(&self) -> &'static str;

    /// Serialize the `data` payload.
    fn encode_data(&self) -> Result<Value, DecodeError>;

    /// Decode a payload for `kind`. Unknown kinds decode to `None`.
    fn decode(kind: &str, data: Value) -> Result<Option<Self>, DecodeError>;
}

/// Wire wrapper around every channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub domain: SmolStr,
    #[serde(default)]
    pub channel_id: SmolStr,
    pub from: SmolStr,
    pub to: SmolStr,
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default)]
    pub data: Value,
}

impl Envelope {
    pub fn is_channel_message(&self) -> bool {
        self.domain == CHANNEL_DOMAIN
    }

    /// Parse an envelope out of an arbitrary posted value.
    ///
    /// Values that are not channel envelopes (other scripts also post
    /// messages) come back as `None`.
    pub fn from_value(value: Value) -> Option<Self> {
        let envelope: Envelope = serde_json::from_value(value).ok()?;
        envelope.is_channel_message().then_some(envelope)
    }
}

// === Controller events ===

/// Events produced by the overlay controller.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayMsg {
    Activate,
    Deactivate,
    Blur,
    ElementRegister {
        id: SmolStr,
        sanity: SanityNode,
        rect: OverlayRect,
    },
    ElementUnregister {
        id: SmolStr,
    },
    ElementUpdateRect {
        id: SmolStr,
        rect: OverlayRect,
    },
    ElementMouseEnter {
        id: SmolStr,
        rect: OverlayRect,
    },
    ElementMouseLeave {
        id: SmolStr,
    },
    ElementActivate {
        id: SmolStr,
    },
    ElementDeactivate {
        id: SmolStr,
    },
    ElementClick {
        id: SmolStr,
        sanity: SanityNode,
    },
    /// An empty `id` closes the menu.
    ElementContextMenu {
        id: SmolStr,
        sanity: Option<SanityNode>,
        position: Point,
    },
}

impl OverlayMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayMsg::Activate => "overlay/activate",
            OverlayMsg::Deactivate => "overlay/deactivate",
            OverlayMsg::Blur => "overlay/blur",
            OverlayMsg::ElementRegister { .. } => "element/register",
            OverlayMsg::ElementUnregister { .. } => "element/unregister",
            OverlayMsg::ElementUpdateRect { .. } => "element/updateRect",
            OverlayMsg::ElementMouseEnter { .. } => "element/mouseenter",
            OverlayMsg::ElementMouseLeave { .. } => "element/mouseleave",
            OverlayMsg::ElementActivate { .. } => "element/activate",
            OverlayMsg::ElementDeactivate { .. } => "element/deactivate",
            OverlayMsg::ElementClick { .. } => "element/click",
            OverlayMsg::ElementContextMenu { .. } => "element/contextmenu",
        }
    }

    /// A close request for the context menu.
    pub fn close_context_menu() -> Self {
        OverlayMsg::ElementContextMenu {
            id: SmolStr::default(),
            sanity: None,
            position: Point::default(),
        }
    }
}

// === Embed-bound messages ===

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FocusPayload {
    pub id: SmolStr,
    pub path: SmolStr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HistoryUpdateKind {
    Push,
    Pop,
    Replace,
}

/// A navigation in either direction between host and page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryUpdate {
    #[serde(rename = "type")]
    pub kind: HistoryUpdateKind,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// Messages sent by the presentation host to the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum PresentationMsg {
    Focus(FocusPayload),
    Blur,
    Perspective(Perspective),
    Navigate(HistoryUpdate),
    ToggleOverlay,
    Schema(Schema),
    SchemaTypes(ResolvedTypeTable),
}

#[derive(Serialize, Deserialize)]
struct PerspectivePayload {
    perspective: Perspective,
}

#[derive(Serialize, Deserialize)]
struct SchemaPayload {
    schema: Schema,
}

#[derive(Serialize, Deserialize)]
struct SchemaTypesPayload {
    types: ResolvedTypeTable,
}

impl ChannelMessage for PresentationMsg {
    fn kind(&self) -> &'static str {
        match self {
            PresentationMsg::Focus(_) => "presentation/focus",
            PresentationMsg::Blur => "presentation/blur",
            PresentationMsg::Perspective(_) => "presentation/perspective",
            PresentationMsg::Navigate(_) => "presentation/navigate",
            PresentationMsg::ToggleOverlay => "presentation/toggleOverlay",
            PresentationMsg::Schema(_) => "presentation/schema",
            PresentationMsg::SchemaTypes(_) => "presentation/schemaTypes",
        }
    }

    fn encode_data(&self) -> Result<Value, DecodeError> {
        let kind = self.kind();
        match self {
            PresentationMsg::Focus(focus) => encode(kind, focus),
            PresentationMsg::Blur | PresentationMsg::ToggleOverlay => Ok(Value::Null),
            PresentationMsg::Perspective(perspective) => encode(
                kind,
                &PerspectivePayload {
                    perspective: *perspective,
                },
            ),
            PresentationMsg::Navigate(update) => encode(kind, update),
            PresentationMsg::Schema(schema) => encode(
                kind,
                &SchemaPayload {
                    schema: schema.clone(),
                },
            ),
            PresentationMsg::SchemaTypes(types) => encode(
                kind,
                &SchemaTypesPayload {
                    types: types.clone(),
                },
            ),
        }
    }

    fn decode(kind: &str, data: Value) -> Result<Option<Self>, DecodeError> {
        let msg = match kind {
            "presentation/focus" => PresentationMsg::Focus(payload("presentation/focus", data)?),
            "presentation/blur" => PresentationMsg::Blur,
            "presentation/perspective" => {
                let p: PerspectivePayload = payload("presentation/perspective", data)?;
                PresentationMsg::Perspective(p.perspective)
            }
            "presentation/navigate" => {
                PresentationMsg::Navigate(payload("presentation/navigate", data)?)
            }
            "presentation/toggleOverlay" => PresentationMsg::ToggleOverlay,
            "presentation/schema" => {
                let p: SchemaPayload = payload("presentation/schema", data)?;
                PresentationMsg::Schema(p.schema)
            }
            "presentation/schemaTypes" => {
                let p: SchemaTypesPayload = payload("presentation/schemaTypes", data)?;
                PresentationMsg::SchemaTypes(p.types)
            }
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }
}

// === Host-bound messages ===

/// A keyed path whose member type the host should look up.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnresolvedPath {
    pub id: SmolStr,
    pub path: SmolStr,
}

/// A document shown on the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRef {
    #[serde(rename = "_id")]
    pub id: SmolStr,
    #[serde(rename = "_type", default, skip_serializing_if = "Option::is_none")]
    pub type_name: Option<SmolStr>,
    #[serde(rename = "_projectId", default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<SmolStr>,
    #[serde(rename = "_dataset", default, skip_serializing_if = "Option::is_none")]
    pub dataset: Option<SmolStr>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentsPayload {
    pub documents: Vec<DocumentRef>,
    pub perspective: Perspective,
}

/// Messages sent by the overlay to the presentation host.
#[derive(Debug, Clone, PartialEq)]
pub enum VisualEditingMsg {
    OverlayFocus(SanityNode),
    OverlayToggle { enabled: bool },
    OverlayNavigate(HistoryUpdate),
    Patch(PatchRequest),
    SchemaPaths(Vec<UnresolvedPath>),
    Documents(DocumentsPayload),
    Meta { title: String },
}

#[derive(Serialize, Deserialize)]
struct TogglePayload {
    enabled: bool,
}

#[derive(Serialize, Deserialize)]
struct SchemaPathsPayload {
    paths: Vec<UnresolvedPath>,
}

#[derive(Serialize, Deserialize)]
struct MetaPayload {
    title: String,
}

impl ChannelMessage for VisualEditingMsg {
    fn kind(&self) -> &'static str {
        match self {
            VisualEditingMsg::OverlayFocus(_) => "overlay/focus",
            VisualEditingMsg::OverlayToggle { .. } => "overlay/toggle",
            VisualEditingMsg::OverlayNavigate(_) => "overlay/navigate",
            VisualEditingMsg::Patch(_) => "visual-editing/patch",
            VisualEditingMsg::SchemaPaths(_) => "visual-editing/schemaPaths",
            VisualEditingMsg::Documents(_) => "visual-editing/documents",
            VisualEditingMsg::Meta { .. } => "visual-editing/meta",
        }
    }

    fn encode_data(&self) -> Result<Value, DecodeError> {
        let kind = self.kind();
        match self {
            VisualEditingMsg::OverlayFocus(node) => encode(kind, node),
            VisualEditingMsg::OverlayToggle { enabled } => {
                encode(kind, &TogglePayload { enabled: *enabled })
            }
            VisualEditingMsg::OverlayNavigate(update) => encode(kind, update),
            VisualEditingMsg::Patch(request) => encode(kind, request),
            VisualEditingMsg::SchemaPaths(paths) => encode(
                kind,
                &SchemaPathsPayload {
                    paths: paths.clone(),
                },
            ),
            VisualEditingMsg::Documents(documents) => encode(kind, documents),
            VisualEditingMsg::Meta { title } => encode(
                kind,
                &MetaPayload {
                    title: title.clone(),
                },
            ),
        }
    }

    fn decode(kind: &str, data: Value) -> Result<Option<Self>, DecodeError> {
        let msg = match kind {
            "overlay/focus" => VisualEditingMsg::OverlayFocus(payload("overlay/focus", data)?),
            "overlay/toggle" => {
                let p: TogglePayload = payload("overlay/toggle", data)?;
                VisualEditingMsg::OverlayToggle { enabled: p.enabled }
            }
            "overlay/navigate" => {
                VisualEditingMsg::OverlayNavigate(payload("overlay/navigate", data)?)
            }
            "visual-editing/patch" => VisualEditingMsg::Patch(payload("visual-editing/patch", data)?),
            "visual-editing/schemaPaths" => {
                let p: SchemaPathsPayload = payload("visual-editing/schemaPaths", data)?;
                VisualEditingMsg::SchemaPaths(p.paths)
            }
            "visual-editing/documents" => {
                VisualEditingMsg::Documents(payload("visual-editing/documents", data)?)
            }
            "visual-editing/meta" => {
                let p: MetaPayload = payload("visual-editing/meta", data)?;
                VisualEditingMsg::Meta { title: p.title }
            }
            _ => return Ok(None),
        };
        Ok(Some(msg))
    }
}

// === Handshake ===

/// Connection management messages, shared by both sides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandshakeMsg {
    Syn,
    SynAck,
    Ack,
    Disconnect,
}

impl HandshakeMsg {
    pub fn kind(&self) -> &'static str {
        match self {
            HandshakeMsg::Syn => "handshake/syn",
            HandshakeMsg::SynAck => "handshake/syn-ack",
            HandshakeMsg::Ack => "handshake/ack",
            HandshakeMsg::Disconnect => "channel/disconnect",
        }
    }

    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "handshake/syn" => Some(HandshakeMsg::Syn),
            "handshake/syn-ack" => Some(HandshakeMsg::SynAck),
            "handshake/ack" => Some(HandshakeMsg::Ack),
            "channel/disconnect" => Some(HandshakeMsg::Disconnect),
            _ => None,
        }
    }
}

fn payload<T: DeserializeOwned>(kind: &'static str, data: Value) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::Payload { kind, source })
}

fn encode<T: Serialize>(kind: &'static str, value: &T) -> Result<Value, DecodeError> {
    serde_json::to_value(value).map_err(|source| DecodeError::Encode { kind, source })
}
