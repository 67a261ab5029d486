//! Overlay flash when editing is switched on.
//!
//! Enabling overlays briefly outlines every element, then fades out. The
//! sequence is driven by the platform: two animation frames after
//! [`FlashState::start`] it calls [`begin`](FlashState::begin), two more
//! frames later [`fade`](FlashState::fade), and after the fade duration
//! [`finish`](FlashState::finish). Every step carries the ticket handed out
//! by `start`, so callbacks from a cancelled sequence do nothing.

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlashPhase {
    #[default]
    Idle,
    Flashing,
    FadingOut,
}

/// Identifies one flash sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlashTicket(u64);

#[derive(Debug, Clone)]
pub struct FlashState {
    phase: FlashPhase,
    generation: u64,
    duration_ms: u32,
}

impl FlashState {
    pub fn new(duration_ms: u32) -> Self {
        Self {
            phase: FlashPhase::Idle,
            generation: 0,
            duration_ms,
        }
    }

    pub fn phase(&self) -> FlashPhase {
        self.phase
    }

    /// Overlays are outlined (`data-overlays`).
    pub fn is_flashing(&self) -> bool {
        self.phase != FlashPhase::Idle
    }

    /// Outline is fading (`data-fading-out`).
    pub fn is_fading_out(&self) -> bool {
        self.phase == FlashPhase::FadingOut
    }

    pub fn duration_ms(&self) -> u32 {
        self.duration_ms
    }

    /// Start a new sequence, superseding any running one.
    pub fn start(&mut self) -> FlashTicket {
        self.generation += 1;
        FlashTicket(self.generation)
    }

    pub fn begin(&mut self, ticket: FlashTicket) -> bool {
        self.advance(ticket, FlashPhase::Flashing)
    }

    /// Returns the fade duration for the platform's timeout.
    pub fn fade(&mut self, ticket: FlashTicket) -> Option<u32> {
        self.advance(ticket, FlashPhase::FadingOut)
            .then_some(self.duration_ms)
    }

    pub fn finish(&mut self, ticket: FlashTicket) -> bool {
        self.advance(ticket, FlashPhase::Idle)
    }

    /// Abort the running sequence. Returns true if anything was showing.
    pub fn cancel(&mut self) -> bool {
        self.generation += 1;
        std::mem::take(&mut self.phase) != FlashPhase::Idle
    }

    fn advance(&mut self, ticket: FlashTicket, phase: FlashPhase) -> bool {
        if ticket.0 != self.generation {
            return false;
        }
        self.phase = phase;
        true
    }
}

impl Default for FlashState {
    fn default() -> Self {
        Self::new(1500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_sequence() {
        let mut flash = FlashState::new(1500);
        let ticket = flash.start();
        assert!(!flash.is_flashing());
        assert!(flash.begin(ticket));
        assert!(flash.is_flashing());
        assert_eq!(flash.fade(ticket), Some(1500));
        assert!(flash.is_fading_out());
        assert!(flash.finish(ticket));
        assert_eq!(flash.phase(), FlashPhase::Idle);
    }

    #[test]
    fn test_cancel_invalidates_ticket() {
        let mut flash = FlashState::default();
        let ticket = flash.start();
        flash.begin(ticket);
        assert!(flash.cancel());
        assert!(!flash.is_flashing());
        assert_eq!(flash.fade(ticket), None);
        assert!(!flash.finish(ticket));
        assert!(!flash.cancel());
    }

    #[test]
    fn test_restart_supersedes() {
        let mut flash = FlashState::default();
        let first = flash.start();
        let second = flash.start();
        assert!(!flash.begin(first));
        assert!(flash.begin(second));
    }
}
