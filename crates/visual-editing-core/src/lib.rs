//! visual-editing-core: Overlay logic for visual editing without browser dependencies.
//!
//! This crate provides:
//! - `Schema` and the path resolver that maps annotated elements to schema fields
//! - `TypeResolver` for keyed array member types, with an HTTP fetcher
//! - `OverlayController<K>` - element registry and interaction state, generic
//!   over the platform's element handle
//! - `reduce` - the overlay state reducer
//! - `Channel` - the cross-frame handshake and message protocol
//! - `OverlaySession` / `PresentationHost` - the two ends, wired together

pub mod channel;
pub mod client;
pub mod config;
pub mod controller;
pub mod error;
pub mod flash;
pub mod geometry;
pub mod history;
pub mod host;
pub mod hotkeys;
pub mod menu;
pub mod messages;
pub mod node;
pub mod patch;
pub mod path;
pub mod reducer;
pub mod reporting;
pub mod resolve;
pub mod resolved;
pub mod schema;
pub mod session;
pub mod type_resolver;
pub mod view;

pub use channel::{
    AuthoritativeState, Channel, ChannelEvent, ChannelRole, ChannelStatus, SubscriptionId, Transport,
};
pub use client::HttpProjectionClient;
pub use config::OverlayConfig;
pub use controller::{ClickModifiers, ClickOutcome, OverlayController, PointerTarget};
pub use error::{DecodeError, VisualEditingError};
pub use flash::{FlashPhase, FlashState, FlashTicket};
pub use geometry::{OverlayRect, Point};
pub use history::HistoryAdapter;
pub use host::{HostEvent, PresentationHost};
pub use hotkeys::{HotkeyAction, KeyInput};
pub use menu::{ContextMenuNode, ContextMenuView, MenuCommand};
pub use messages::{
    ChannelMessage, Envelope, HistoryUpdate, HistoryUpdateKind, OverlayMsg, Perspective, PresentationMsg,
    UnresolvedPath, VisualEditingMsg,
};
pub use node::{ResolvedNode, SanityNode, StegaNode, create_data_attribute};
pub use patch::{InsertSide, Patch, PatchRequest};
pub use path::ContentPath;
pub use reducer::{ElementFocus, ElementState, OverlayAction, OverlayState, reduce};
pub use resolve::{FieldLookup, FieldRef, ParentRef, field_from_path, get_field, get_schema_type};
pub use resolved::ResolvedTypeTable;
pub use schema::{Schema, SchemaNode, SchemaType};
pub use session::{OverlaySession, SessionEffect};
pub use smol_str::SmolStr;
pub use type_resolver::{ProjectionFetcher, ProjectionQuery, TypeResolver};
pub use view::{ElementView, InsertOption, NodeIcon, ViewContext};
