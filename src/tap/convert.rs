//! Click conversion state machine
//!
//! Two states: Idle (pass events through) and Converting (a synthetic
//! middle-down has been emitted and its matching up is still pending).
//! The conversion flag, not the live finger count, gates the up-event:
//! fingers commonly lift before the button is released, and gating on the
//! count alone would leave a middle-down without its middle-up and
//! desynchronize button state with the OS.

/// Exactly three fingers trigger a conversion on mouse-down.
pub const TRIGGER_FINGERS: i32 = 3;

/// CGEventType values for the events the tap sees and emits.
pub mod cg {
    pub const LEFT_MOUSE_DOWN: u32 = 1;
    pub const LEFT_MOUSE_UP: u32 = 2;
    pub const OTHER_MOUSE_DOWN: u32 = 25;
    pub const OTHER_MOUSE_UP: u32 = 26;

    /// kCGMouseEventButtonNumber field id.
    pub const MOUSE_EVENT_BUTTON_NUMBER: u32 = 3;
    /// kCGMouseButtonCenter.
    pub const BUTTON_CENTER: i64 = 2;
}

/// Which edge of a button press the tap intercepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonEdge {
    Down,
    Up,
}

impl ButtonEdge {
    /// Map a CGEventType to an edge; non-button events are not intercepted.
    pub fn from_cg_event_type(event_type: u32) -> Option<Self> {
        match event_type {
            cg::LEFT_MOUSE_DOWN => Some(ButtonEdge::Down),
            cg::LEFT_MOUSE_UP => Some(ButtonEdge::Up),
            _ => None,
        }
    }
}

/// Outcome of one conversion decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Forward the event unmodified.
    Pass,
    /// Rewrite the event to a middle-button down.
    MiddleDown,
    /// Rewrite the event to a middle-button up.
    MiddleUp,
}

impl Verdict {
    /// The (event type, button number) to write into the intercepted event,
    /// or `None` when the event passes through unmodified.
    pub fn rewrite(self) -> Option<(u32, i64)> {
        match self {
            Verdict::Pass => None,
            Verdict::MiddleDown => Some((cg::OTHER_MOUSE_DOWN, cg::BUTTON_CENTER)),
            Verdict::MiddleUp => Some((cg::OTHER_MOUSE_UP, cg::BUTTON_CENTER)),
        }
    }
}

/// Per-session conversion state.
///
/// Lives on the tap thread only; no cross-thread synchronization needed.
#[derive(Debug, Default)]
pub struct ClickConverter {
    converting: bool,
}

impl ClickConverter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide what to do with an intercepted button edge given the current
    /// finger count.
    pub fn decide(&mut self, edge: ButtonEdge, fingers: i32) -> Verdict {
        match (edge, self.converting) {
            (ButtonEdge::Down, false) if fingers == TRIGGER_FINGERS => {
                self.converting = true;
                Verdict::MiddleDown
            }
            (ButtonEdge::Down, false) => Verdict::Pass,
            // A down while converting should not occur (downs pair with a
            // prior up); forward it and keep waiting for the up.
            (ButtonEdge::Down, true) => Verdict::Pass,
            (ButtonEdge::Up, true) => {
                self.converting = false;
                Verdict::MiddleUp
            }
            (ButtonEdge::Up, false) => Verdict::Pass,
        }
    }

    /// True between an emitted middle-down and its matching middle-up.
    pub fn is_converting(&self) -> bool {
        self.converting
    }
}
