//! Platform detection for hotkeys and frame handling.

use std::sync::OnceLock;

use wasm_bindgen::JsValue;

/// Cached platform detection results.
#[derive(Debug, Clone, Default)]
pub struct Platform {
    /// macOS (not iOS). Decides whether `mod` means Meta or Ctrl.
    pub mac: bool,
    pub ios: bool,
}

static PLATFORM: OnceLock<Platform> = OnceLock::new();

/// Get cached platform info. Detection runs once on first call.
pub fn platform() -> &'static Platform {
    PLATFORM.get_or_init(detect_platform)
}

fn detect_platform() -> Platform {
    let Some(window) = web_sys::window() else {
        return Platform::default();
    };
    let navigator = window.navigator();
    let user_agent = navigator.user_agent().unwrap_or_default().to_lowercase();
    let platform_str = navigator.platform().unwrap_or_default().to_lowercase();

    // iPadOS reports a Mac platform; touch points give it away.
    let ios = user_agent.contains("iphone")
        || user_agent.contains("ipad")
        || user_agent.contains("ipod")
        || (platform_str.contains("mac") && navigator.max_touch_points() > 0);
    let mac = platform_str.contains("mac") && !ios;

    Platform { mac, ios }
}

/// Whether this document is rendered inside another window's frame.
///
/// A cross-origin `top` that cannot be read counts as framed.
pub fn in_frame() -> bool {
    let Some(window) = web_sys::window() else {
        return false;
    };
    match window.top() {
        Ok(Some(top)) => JsValue::from(top) != JsValue::from(window),
        Ok(None) => false,
        Err(_) => true,
    }
}
