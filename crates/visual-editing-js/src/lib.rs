//! WASM bindings for visual editing overlays.
//!
//! Exposes `enableVisualEditing` and `createDataAttribute` to
//! JavaScript/TypeScript apps. The page calls `enableVisualEditing` once and
//! keeps the returned handle; `disable()` on the handle unmounts everything.

mod types;
mod visual_editing;

pub use types::*;
pub use visual_editing::*;

use wasm_bindgen::prelude::*;

/// Initialize panic hook and console logging.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    let console_level = if cfg!(debug_assertions) {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    install_tracing(console_level);
}

/// Install the console subscriber. Returns false when one was already set,
/// e.g. by the host page's own bundle.
fn install_tracing(console_level: tracing::Level) -> bool {
    use tracing::subscriber::set_global_default;
    use tracing_subscriber::Registry;
    use tracing_subscriber::filter::EnvFilter;
    use tracing_subscriber::layer::SubscriberExt;

    let wasm_layer = tracing_wasm::WASMLayer::new(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(console_level)
            .build(),
    );

    let filter = EnvFilter::new("info,visual_editing_core=debug,visual_editing_browser=debug");

    let reg = Registry::default().with(filter).with(wasm_layer);

    match set_global_default(reg) {
        Ok(()) => true,
        Err(e) => {
            tracing::debug!(error = %e, "tracing subscriber already installed");
            false
        }
    }
}
