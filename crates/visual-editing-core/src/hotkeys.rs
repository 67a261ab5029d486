//! Keyboard shortcuts for the overlay.
//!
//! - platform mod + `\` toggles overlays
//! - alt/option toggles overlays on both keydown and keyup, so holding it
//!   temporarily flips them
//! - `Escape` closes an open context menu

/// A keyboard event, reduced to what shortcut matching needs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyInput {
    /// `KeyboardEvent.key`
    pub key: String,
    pub alt: bool,
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
    /// Auto-repeat from a held key.
    pub repeat: bool,
}

impl KeyInput {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    fn is_alt_key(&self) -> bool {
        self.key == "Alt"
    }

    /// Platform primary modifier: cmd on macOS, ctrl elsewhere.
    fn primary(&self, is_mac: bool) -> bool {
        if is_mac {
            self.meta && !self.ctrl
        } else {
            self.ctrl && !self.meta
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotkeyAction {
    ToggleOverlay,
    CloseContextMenu,
}

pub fn on_key_down(input: &KeyInput, is_mac: bool, context_menu_open: bool) -> Option<HotkeyAction> {
    if input.is_alt_key() {
        return (!input.repeat).then_some(HotkeyAction::ToggleOverlay);
    }
    if input.key == "\\" && input.primary(is_mac) && !input.alt && !input.shift {
        return Some(HotkeyAction::ToggleOverlay);
    }
    if input.key == "Escape" && context_menu_open {
        return Some(HotkeyAction::CloseContextMenu);
    }
    None
}

pub fn on_key_up(input: &KeyInput) -> Option<HotkeyAction> {
    input.is_alt_key().then_some(HotkeyAction::ToggleOverlay)
}
