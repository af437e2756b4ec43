//! End-to-end gesture flow over the platform-free core: contact frames
//! feed the touch state, the converter decides per button edge, and the
//! verdict carries the exact event rewrite.

use std::sync::Arc;

use midclick::tap::convert::cg;
use midclick::{ButtonEdge, ClickConverter, TouchState, Verdict};

#[test]
fn three_finger_click_becomes_middle_click() {
    let touch = Arc::new(TouchState::new());
    let mut converter = ClickConverter::new();

    // Trackpad reports a three-finger frame, then the user clicks.
    touch.record_frame(3);

    let down = converter.decide(ButtonEdge::Down, touch.fingers());
    assert_eq!(down, Verdict::MiddleDown);
    assert_eq!(
        down.rewrite(),
        Some((cg::OTHER_MOUSE_DOWN, cg::BUTTON_CENTER))
    );
    assert!(converter.is_converting());

    let up = converter.decide(ButtonEdge::Up, touch.fingers());
    assert_eq!(up, Verdict::MiddleUp);
    assert_eq!(up.rewrite(), Some((cg::OTHER_MOUSE_UP, cg::BUTTON_CENTER)));
    assert!(!converter.is_converting());
}

#[test]
fn normal_click_passes_untouched() {
    let touch = Arc::new(TouchState::new());
    let mut converter = ClickConverter::new();

    touch.record_frame(1);
    assert_eq!(
        converter.decide(ButtonEdge::Down, touch.fingers()),
        Verdict::Pass
    );
    assert_eq!(
        converter.decide(ButtonEdge::Up, touch.fingers()),
        Verdict::Pass
    );
}

#[test]
fn fingers_lift_before_button_release() {
    let touch = Arc::new(TouchState::new());
    let mut converter = ClickConverter::new();

    touch.record_frame(3);
    assert_eq!(
        converter.decide(ButtonEdge::Down, touch.fingers()),
        Verdict::MiddleDown
    );

    // Fingers leave the surface while the button is still held; the
    // matching up must still be converted so button state stays paired.
    touch.record_frame(0);
    assert_eq!(
        converter.decide(ButtonEdge::Up, touch.fingers()),
        Verdict::MiddleUp
    );

    // The next plain click is back to normal.
    touch.record_frame(1);
    assert_eq!(
        converter.decide(ButtonEdge::Down, touch.fingers()),
        Verdict::Pass
    );
}

#[test]
fn frame_stream_last_write_wins() {
    let touch = TouchState::new();

    for count in [1, 2, 3, 2, 4, 0, 3] {
        touch.record_frame(count);
        assert_eq!(touch.fingers(), count);
    }
}

#[test]
fn interleaved_frames_between_edges() {
    let touch = Arc::new(TouchState::new());
    let mut converter = ClickConverter::new();

    // Frames arrive continuously; only the value at each edge matters.
    touch.record_frame(2);
    touch.record_frame(3);
    assert_eq!(
        converter.decide(ButtonEdge::Down, touch.fingers()),
        Verdict::MiddleDown
    );

    touch.record_frame(4);
    touch.record_frame(2);
    assert_eq!(
        converter.decide(ButtonEdge::Up, touch.fingers()),
        Verdict::MiddleUp
    );
}

#[test]
fn four_finger_click_is_not_converted() {
    let touch = Arc::new(TouchState::new());
    let mut converter = ClickConverter::new();

    touch.record_frame(4);
    assert_eq!(
        converter.decide(ButtonEdge::Down, touch.fingers()),
        Verdict::Pass
    );
    assert_eq!(
        converter.decide(ButtonEdge::Up, touch.fingers()),
        Verdict::Pass
    );
}
