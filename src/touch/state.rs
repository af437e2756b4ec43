//! Shared finger-count cell
//!
//! One atomic word written by the contact-frame callback and read by the
//! event tap. Last-writer-wins; the consistency requirement is "current
//! within one frame", so relaxed ordering is sufficient on both sides.

use std::sync::atomic::{AtomicI32, Ordering};

/// The number of fingers in the most recently delivered contact frame.
///
/// Constructed once per session and shared between the device registry
/// (writer) and the click converter (reader). No history, no per-finger
/// tracking.
#[derive(Debug, Default)]
pub struct TouchState {
    fingers: AtomicI32,
}

impl TouchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the finger count of a contact frame.
    ///
    /// Called from the platform's frame delivery context; must stay O(1),
    /// non-blocking, and allocation-free.
    #[inline]
    pub fn record_frame(&self, fingers: i32) {
        self.fingers.store(fingers, Ordering::Relaxed);
    }

    /// Finger count of the most recent frame.
    #[inline]
    pub fn fingers(&self) -> i32 {
        self.fingers.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn starts_at_zero() {
        let state = TouchState::new();
        assert_eq!(state.fingers(), 0);
    }

    #[test]
    fn last_write_wins() {
        let state = TouchState::new();
        for n in [1, 3, 2, 5, 0, 3] {
            state.record_frame(n);
        }
        assert_eq!(state.fingers(), 3);
    }

    #[test]
    fn visible_across_threads() {
        let state = Arc::new(TouchState::new());
        let writer = Arc::clone(&state);

        let handle = std::thread::spawn(move || {
            for n in 0..100 {
                writer.record_frame(n);
            }
        });
        handle.join().unwrap();

        assert_eq!(state.fingers(), 99);
    }
}
