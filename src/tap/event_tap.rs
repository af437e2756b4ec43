//! Quartz event tap
//!
//! Installs a global HID-level event tap on left-button down/up events and
//! rewrites them in place to middle-button events when the click converter
//! says so. The tap runs on whichever thread calls [`QuartzTap::listen`],
//! which blocks in a CFRunLoop until the loop is stopped.
//!
//! # Permissions
//!
//! Requires Accessibility permissions in System Settings → Privacy &
//! Security → Accessibility. Tap creation fails until the grant has
//! propagated, which is why installation goes through the bounded retry.

use core_foundation::base::{CFRelease, CFTypeRef, TCFType};
use core_foundation::runloop::{kCFRunLoopCommonModes, kCFRunLoopDefaultMode};
use std::cell::UnsafeCell;
use std::ffi::c_void;
use std::ptr;
use std::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use tracing::{info, trace};

use super::convert::{cg, ButtonEdge, ClickConverter};
use super::retry::{install_with_retry, RetryPolicy};
use crate::session::{StopFn, TapLoop};
use crate::touch::state::TouchState;
use crate::{Error, Result};

type CGEventRef = CFTypeRef;
type CGEventTapProxy = *const c_void;
type CGEventMask = u64;

// CGEventTap location
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code)]
enum CGEventTapLocation {
    HidEventTap = 0,
    SessionEventTap = 1,
    AnnotatedSessionEventTap = 2,
}

// CGEventTap placement
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code)]
enum CGEventTapPlacement {
    HeadInsertEventTap = 0,
    TailAppendEventTap = 1,
}

// CGEventTap options
#[repr(u32)]
#[derive(Copy, Clone)]
#[allow(dead_code)]
enum CGEventTapOptions {
    DefaultTap = 0,
    ListenOnly = 1,
}

/// Events of interest: left-button down and up only.
fn button_event_mask() -> CGEventMask {
    (1 << cg::LEFT_MOUSE_DOWN) | (1 << cg::LEFT_MOUSE_UP)
}

// FFI declarations for Core Graphics
#[link(name = "CoreGraphics", kind = "framework")]
extern "C" {
    fn CGEventTapCreate(
        tap: CGEventTapLocation,
        place: CGEventTapPlacement,
        options: CGEventTapOptions,
        events_of_interest: CGEventMask,
        callback: extern "C" fn(CGEventTapProxy, u32, CGEventRef, *mut c_void) -> CGEventRef,
        user_info: *mut c_void,
    ) -> CFTypeRef;

    fn CGEventTapEnable(tap: CFTypeRef, enable: bool);

    fn CGEventSetType(event: CGEventRef, event_type: u32);
    fn CGEventSetIntegerValueField(event: CGEventRef, field: u32, value: i64);
}

// FFI declarations for Core Foundation
#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFMachPortCreateRunLoopSource(
        allocator: CFTypeRef,
        port: CFTypeRef,
        order: i64,
    ) -> CFTypeRef;

    fn CFRunLoopGetCurrent() -> CFTypeRef;
    fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRemoveSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRunInMode(
        mode: CFTypeRef,
        seconds: f64,
        return_after_source_handled: u8,
    ) -> i32;
    fn CFRunLoopStop(rl: CFTypeRef);
}

/// kCFRunLoopRunFinished: the loop has no sources left.
const RUN_LOOP_RUN_FINISHED: i32 = 1;

/// Upper bound on stop-request latency while the loop is quiescent.
const STOP_POLL_SECONDS: f64 = 0.25;

// FFI declarations for Accessibility
extern "C" {
    fn AXIsProcessTrusted() -> bool;
    fn AXIsProcessTrustedWithOptions(options: CFTypeRef) -> bool;
}

/// Context for the tap callback.
///
/// Safety: `converter` uses UnsafeCell because the conversion flag is
/// plain state, but access is single-threaded by construction: the
/// callback only runs on the thread blocked in `listen`. This keeps the
/// intercept path free of locks.
struct TapContext {
    touch: Arc<TouchState>,
    converter: UnsafeCell<ClickConverter>,
}

// Safety: the UnsafeCell<ClickConverter> is only accessed in the callback
// on the tap thread; the context is created and destroyed on the owning
// thread, never concurrently with the callback.
unsafe impl Sync for TapContext {}

/// Global context pointer for the callback.
/// CGEventTapCreate's callback cannot capture Rust closures.
static CONTEXT_PTR: AtomicPtr<TapContext> = AtomicPtr::new(ptr::null_mut());
static RUN_LOOP_PTR: AtomicPtr<c_void> = AtomicPtr::new(ptr::null_mut());

/// Latched stop request.
///
/// CFRunLoopStop only takes effect while the loop is actually running, so
/// a stop that races loop startup would otherwise evaporate and leave the
/// session blocked forever. The stopper sets this first; the listen loop
/// consumes it between run-loop passes.
static STOP_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Consume a pending stop request.
fn take_stop_request() -> bool {
    STOP_REQUESTED.swap(false, Ordering::SeqCst)
}

/// The tap callback: decides per event and mutates it in place.
///
/// Events are always returned for continued dispatch, never consumed.
extern "C" fn tap_callback(
    _proxy: CGEventTapProxy,
    event_type: u32,
    event: CGEventRef,
    _user_info: *mut c_void,
) -> CGEventRef {
    let ctx = CONTEXT_PTR.load(Ordering::SeqCst);
    if ctx.is_null() {
        return event;
    }
    let context = unsafe { &*ctx };

    let edge = match ButtonEdge::from_cg_event_type(event_type) {
        Some(edge) => edge,
        None => return event,
    };

    // Safety: single-threaded access, see TapContext.
    let converter = unsafe { &mut *context.converter.get() };
    let verdict = converter.decide(edge, context.touch.fingers());

    if let Some((new_type, button)) = verdict.rewrite() {
        unsafe {
            CGEventSetType(event, new_type);
            CGEventSetIntegerValueField(event, cg::MOUSE_EVENT_BUTTON_NUMBER, button);
        }
        trace!(?edge, "rewrote button event to middle click");
    }

    event
}

/// RAII guard for a CGEventTap handle. Disables and releases the tap on drop.
struct TapGuard(CFTypeRef);

impl Drop for TapGuard {
    fn drop(&mut self) {
        unsafe {
            CGEventTapEnable(self.0, false);
            CFRelease(self.0);
        }
    }
}

/// RAII guard for a CFRunLoopSource. Removes it from its run loop and
/// releases it on drop; removal is the designed unblock for CFRunLoopRun.
struct SourceGuard {
    source: CFTypeRef,
    run_loop: CFTypeRef,
}

impl Drop for SourceGuard {
    fn drop(&mut self) {
        unsafe {
            CFRunLoopRemoveSource(
                self.run_loop,
                self.source,
                kCFRunLoopCommonModes as CFTypeRef,
            );
            CFRelease(self.source);
        }
    }
}

/// RAII guard that clears RUN_LOOP_PTR on drop.
struct RunLoopPtrGuard;

impl Drop for RunLoopPtrGuard {
    fn drop(&mut self) {
        RUN_LOOP_PTR.store(ptr::null_mut(), Ordering::SeqCst);
    }
}

/// Global mutating event tap on left-button down/up events.
///
/// One instance per session; constructing it binds the callback context,
/// dropping it releases the binding.
pub struct QuartzTap {
    policy: RetryPolicy,
    context: *mut TapContext,
}

// Safety: the context pointer is owned by this struct; the callback only
// dereferences it on the tap thread while a listen() is in progress.
unsafe impl Send for QuartzTap {}

impl QuartzTap {
    pub fn new(policy: RetryPolicy, touch: Arc<TouchState>) -> Self {
        let context = Box::into_raw(Box::new(TapContext {
            touch,
            converter: UnsafeCell::new(ClickConverter::new()),
        }));
        CONTEXT_PTR.store(context, Ordering::SeqCst);
        // A stale request from a previous session must not stop this one.
        STOP_REQUESTED.store(false, Ordering::SeqCst);
        Self { policy, context }
    }
}

impl Drop for QuartzTap {
    fn drop(&mut self) {
        CONTEXT_PTR.store(ptr::null_mut(), Ordering::SeqCst);
        // Safety: context came from Box::into_raw in new(); the callback
        // can no longer observe it after the store above.
        unsafe { drop(Box::from_raw(self.context)) };
    }
}

impl TapLoop for QuartzTap {
    /// Install the tap and block dispatching events until the run loop is
    /// stopped. A fresh tap is created on every entry; the previous one is
    /// torn down by the guards when the loop exits.
    fn listen(&mut self) -> Result<()> {
        let tap = install_with_retry(
            &self.policy,
            || {
                let tap = unsafe {
                    CGEventTapCreate(
                        CGEventTapLocation::HidEventTap,
                        CGEventTapPlacement::HeadInsertEventTap,
                        CGEventTapOptions::DefaultTap,
                        button_event_mask(),
                        tap_callback,
                        ptr::null_mut(),
                    )
                };
                (!tap.is_null()).then_some(tap)
            },
            "event tap",
        )?;
        let _tap_guard = TapGuard(tap);

        let source = unsafe { CFMachPortCreateRunLoopSource(ptr::null(), tap, 0) };
        if source.is_null() {
            return Err(Error::Tap("failed to create run loop source".into()));
        }

        let run_loop = unsafe { CFRunLoopGetCurrent() };
        let _source_guard = SourceGuard { source, run_loop };

        RUN_LOOP_PTR.store(run_loop as *mut c_void, Ordering::SeqCst);
        let _ptr_guard = RunLoopPtrGuard;

        unsafe {
            CFRunLoopAddSource(run_loop, source, kCFRunLoopCommonModes as CFTypeRef);
            CGEventTapEnable(tap, true);
        }

        info!("event tap listening");

        // Dispatch in bounded passes, consuming the stop latch between
        // them: a stop delivered before a pass starts is observed at the
        // top of the loop instead of being lost, and a CFRunLoopStop
        // mid-pass ends that pass early.
        loop {
            if take_stop_request() {
                break;
            }
            let outcome = unsafe {
                CFRunLoopRunInMode(kCFRunLoopDefaultMode as CFTypeRef, STOP_POLL_SECONDS, 0)
            };
            if outcome == RUN_LOOP_RUN_FINISHED {
                // No sources left on the loop; nothing further can arrive.
                break;
            }
        }

        info!("event tap loop exited");
        Ok(())
    }

    fn stopper(&self) -> StopFn {
        Arc::new(|| {
            // Latch first so the request survives even when the loop is
            // not running at this instant.
            STOP_REQUESTED.store(true, Ordering::SeqCst);
            let run_loop = RUN_LOOP_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
            if !run_loop.is_null() {
                unsafe { CFRunLoopStop(run_loop as CFTypeRef) };
            }
        })
    }
}

/// Check if accessibility permissions are granted.
pub fn accessibility_trusted() -> bool {
    unsafe { AXIsProcessTrusted() }
}

/// Request accessibility permissions (shows the system dialog).
pub fn request_accessibility_prompt() -> bool {
    use core_foundation::boolean::CFBoolean;
    use core_foundation::dictionary::CFDictionary;
    use core_foundation::string::CFString;

    let key = CFString::new("AXTrustedCheckOptionPrompt");
    let value = CFBoolean::true_value();
    let options = CFDictionary::from_CFType_pairs(&[(key.as_CFType(), value.as_CFType())]);

    unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef() as CFTypeRef) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_covers_left_button_edges_only() {
        let mask = button_event_mask();
        assert!(mask & (1 << cg::LEFT_MOUSE_DOWN) != 0);
        assert!(mask & (1 << cg::LEFT_MOUSE_UP) != 0);
        assert_eq!(mask.count_ones(), 2);
    }

    #[test]
    fn accessibility_check_does_not_panic() {
        // Returns false in CI without permissions; must not crash.
        let _trusted = accessibility_trusted();
    }

    #[test]
    fn stop_request_latches_until_consumed() {
        let tap = QuartzTap::new(RetryPolicy::default(), Arc::new(TouchState::new()));
        let stop = tap.stopper();

        // A stop issued while the run loop is not running must not be
        // lost; it is latched until the listen loop consumes it.
        stop();
        assert!(take_stop_request());
        // Consumed exactly once.
        assert!(!take_stop_request());
    }
}
