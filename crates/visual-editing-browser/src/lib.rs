//! Browser DOM layer for visual editing overlays.
//!
//! This crate connects an `OverlaySession` to a live page: it finds annotated
//! elements, watches them, routes input, talks to the host frame over
//! `postMessage` and draws the overlay. It assumes a
//! `wasm32-unknown-unknown` target environment.
//!
//! # Architecture
//!
//! - `dom`: annotation reading, geometry, element handles
//! - `observers`: mutation/resize/scroll/pointer observation while active
//! - `dom_controller`: drives the session from the page and applies its effects
//! - `render`: the overlay boxes and context menu
//! - `post_message`: the channel transport
//! - `raf`: cancellable double animation frame scheduling
//! - `mount`: `enable_visual_editing`, the entry point
//!
//! # Re-exports
//!
//! This crate re-exports `visual-editing-core` for convenience, so consumers
//! only need to depend on `visual-editing-browser`.

// Re-export core crate
pub use visual_editing_core;
pub use visual_editing_core::*;

pub mod dom;
pub mod dom_controller;
pub mod events;
pub mod history;
pub mod mount;
pub mod observers;
pub mod platform;
pub mod post_message;
pub mod raf;
pub mod render;

pub use dom_controller::DomController;
pub use history::BrowserHistory;
pub use mount::{VisualEditing, VisualEditingOptions, enable_visual_editing};
pub use platform::{Platform, platform};
pub use post_message::PostMessageTransport;
pub use raf::Raf2;
