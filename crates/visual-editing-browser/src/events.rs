//! Conversions from DOM events into core input types.

use wasm_bindgen::JsValue;
use web_sys::{KeyboardEvent, MouseEvent, MouseEventInit};

use visual_editing_core::{ClickModifiers, KeyInput, Point};

pub fn key_input(event: &KeyboardEvent) -> KeyInput {
    KeyInput {
        key: event.key(),
        alt: event.alt_key(),
        ctrl: event.ctrl_key(),
        meta: event.meta_key(),
        shift: event.shift_key(),
        repeat: event.repeat(),
    }
}

pub fn click_modifiers(event: &MouseEvent) -> ClickModifiers {
    ClickModifiers {
        alt: event.alt_key(),
        ctrl: event.ctrl_key(),
        meta: event.meta_key(),
        shift: event.shift_key(),
    }
}

pub fn client_point(event: &MouseEvent) -> Point {
    Point {
        x: f64::from(event.client_x()),
        y: f64::from(event.client_y()),
    }
}

/// Dispatch a copy of a click on the same target with alt released.
pub fn redispatch_without_alt(event: &MouseEvent) -> Result<(), JsValue> {
    let Some(target) = event.target() else {
        return Ok(());
    };
    let init = MouseEventInit::new();
    init.set_bubbles(true);
    init.set_cancelable(true);
    init.set_composed(true);
    init.set_client_x(event.client_x());
    init.set_client_y(event.client_y());
    init.set_screen_x(event.screen_x());
    init.set_screen_y(event.screen_y());
    init.set_button(event.button());
    init.set_buttons(event.buttons());
    init.set_ctrl_key(event.ctrl_key());
    init.set_meta_key(event.meta_key());
    init.set_shift_key(event.shift_key());
    init.set_alt_key(false);
    let copy = MouseEvent::new_with_mouse_event_init_dict(&event.type_(), &init)?;
    target.dispatch_event(&copy)?;
    Ok(())
}
