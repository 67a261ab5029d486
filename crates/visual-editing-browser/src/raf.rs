//! Double `requestAnimationFrame` scheduling.
//!
//! Layout settles one frame after a style change; measuring on the frame
//! after that sees the final geometry.

use std::cell::RefCell;
use std::rc::Rc;

use gloo_render::{AnimationFrame, request_animation_frame};

/// Runs a callback two animation frames from now.
///
/// Dropping the handle cancels whichever frame is still pending.
#[must_use = "dropping a Raf2 cancels it"]
pub struct Raf2 {
    _first: AnimationFrame,
    _second: Rc<RefCell<Option<AnimationFrame>>>,
}

impl Raf2 {
    pub fn new(callback: impl FnOnce() + 'static) -> Self {
        let second = Rc::new(RefCell::new(None));
        let slot = Rc::clone(&second);
        let first = request_animation_frame(move |_| {
            let frame = request_animation_frame(move |_| callback());
            *slot.borrow_mut() = Some(frame);
        });
        Self {
            _first: first,
            _second: second,
        }
    }
}

/// A slot holding at most one pending [`Raf2`].
///
/// Scheduling again replaces, and so cancels, the previous one.
#[derive(Default)]
pub struct RafSlot(RefCell<Option<Raf2>>);

impl RafSlot {
    pub fn schedule(&self, callback: impl FnOnce() + 'static) {
        let raf = Raf2::new(callback);
        *self.0.borrow_mut() = Some(raf);
    }

    pub fn cancel(&self) {
        self.0.borrow_mut().take();
    }
}
