//! Session lifecycle controller
//!
//! Composes the device registry, hot-plug watcher, and event tap into a
//! New → Running → Stopped state machine. The session owns every resource
//! it acquires; teardown runs in reverse acquisition order and is
//! idempotent, including after a partial or failed start.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use tracing::{error, info};

use crate::touch::devices::{DeviceRegistry, MultitouchApi};
use crate::touch::state::TouchState;
use crate::Result;

#[cfg(target_os = "macos")]
mod macos;
#[cfg(target_os = "macos")]
pub use macos::macos_session;

/// Unblocks a concurrent [`TapLoop::listen`]; callable from any thread.
pub type StopFn = Arc<dyn Fn() + Send + Sync>;

/// The blocking event-tap half of a session.
///
/// Implementations install the tap (with whatever retry their platform
/// needs) and dispatch events until stopped. The session re-enters
/// `listen` when it returns without a stop request, so a spurious run-loop
/// exit does not end the session.
pub trait TapLoop {
    /// Install the tap and block dispatching events until stopped.
    fn listen(&mut self) -> Result<()>;

    /// A handle that unblocks a concurrent `listen`.
    fn stopper(&self) -> StopFn;
}

/// Device-arrival subscription for a session.
pub trait HotplugWatch {
    /// Subscribe once for device-arrival notifications.
    fn subscribe(&mut self) -> Result<()>;

    /// Release the subscription. Safe when setup never completed, and safe
    /// to call more than once.
    fn unsubscribe(&mut self);
}

/// Session lifecycle phase.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    New = 0,
    Running = 1,
    Stopped = 2,
}

/// Atomic wrapper so the phase is readable from the shell's thread.
struct AtomicPhase(AtomicU8);

impl AtomicPhase {
    fn new(phase: Phase) -> Self {
        Self(AtomicU8::new(phase as u8))
    }

    fn load(&self) -> Phase {
        match self.0.load(Ordering::SeqCst) {
            0 => Phase::New,
            1 => Phase::Running,
            _ => Phase::Stopped,
        }
    }

    fn store(&self, phase: Phase) {
        self.0.store(phase as u8, Ordering::SeqCst);
    }
}

struct Shared {
    running: AtomicBool,
    enabled: AtomicBool,
    phase: AtomicPhase,
}

/// One middle-click session: device set, hot-plug subscription, event tap.
///
/// Lifecycle: create → [`run`](Self::run) (blocks until stopped or a fatal
/// setup error) → [`cleanup`](Self::cleanup). A session is one-shot; the
/// shell creates a new one to restart.
pub struct Session<A: MultitouchApi, T: TapLoop, W: HotplugWatch> {
    registry: Arc<Mutex<DeviceRegistry<A>>>,
    touch: Arc<TouchState>,
    tap: T,
    watcher: W,
    shared: Arc<Shared>,
    stop_tap: StopFn,
}

impl<A: MultitouchApi, T: TapLoop, W: HotplugWatch> Session<A, T, W> {
    pub fn new(
        registry: Arc<Mutex<DeviceRegistry<A>>>,
        touch: Arc<TouchState>,
        tap: T,
        watcher: W,
    ) -> Self {
        let stop_tap = tap.stopper();
        Self {
            registry,
            touch,
            tap,
            watcher,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                enabled: AtomicBool::new(true),
                phase: AtomicPhase::new(Phase::New),
            }),
            stop_tap,
        }
    }

    /// A cloneable handle for the presentation shell: stop the loop and
    /// toggle the enabled signal from another thread.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            shared: Arc::clone(&self.shared),
            stop_tap: Arc::clone(&self.stop_tap),
        }
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.load()
    }

    /// The finger-count cell this session's callbacks write to.
    pub fn touch(&self) -> &Arc<TouchState> {
        &self.touch
    }

    /// Register devices, subscribe for hot-plug, install the tap, and block
    /// dispatching events until stopped.
    ///
    /// Returns an error only for fatal setup conditions (no devices,
    /// notification setup failure, tap retry budget exhausted); in that
    /// case everything already acquired has been released. Calling `run`
    /// on an already-running or stopped session is a no-op.
    pub fn run(&mut self) -> Result<()> {
        if self.shared.phase.load() == Phase::Stopped {
            return Ok(());
        }
        if self.shared.running.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        self.shared.phase.store(Phase::Running);

        let init_result = self.registry.lock().init();
        let devices = match init_result {
            Ok(count) => count,
            Err(e) => return self.fail(e),
        };
        info!(devices, "registered multitouch devices");

        if let Err(e) = self.watcher.subscribe() {
            return self.fail(e);
        }

        while self.shared.running.load(Ordering::SeqCst)
            && self.shared.enabled.load(Ordering::SeqCst)
        {
            // The loop re-enters after a spurious run-loop exit; only an
            // explicit stop or a tap error ends the session.
            if let Err(e) = self.tap.listen() {
                return self.fail(e);
            }
        }

        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.phase.store(Phase::Stopped);
        info!("session stopped");
        Ok(())
    }

    fn fail(&mut self, e: crate::Error) -> Result<()> {
        error!(error = %e, "session setup failed");
        self.shared.running.store(false, Ordering::SeqCst);
        self.shared.phase.store(Phase::Stopped);
        self.cleanup();
        Err(e)
    }

    /// Release the hot-plug subscription and the device set.
    ///
    /// Callable from any state, including after a partial or failed start;
    /// repeated calls are no-ops.
    pub fn cleanup(&mut self) {
        self.watcher.unsubscribe();
        self.registry.lock().unregister_all();
    }
}

/// Cross-thread control surface for a running session.
#[derive(Clone)]
pub struct SessionHandle {
    shared: Arc<Shared>,
    stop_tap: StopFn,
}

impl SessionHandle {
    /// Stop the blocking loop. Idempotent; only the first call after start
    /// does anything.
    pub fn stop(&self) {
        if self.shared.running.swap(false, Ordering::SeqCst) {
            (self.stop_tap)();
        }
    }

    /// The shell's enabled toggle; switching off stops the loop.
    pub fn set_enabled(&self, enabled: bool) {
        self.shared.enabled.store(enabled, Ordering::SeqCst);
        if !enabled {
            self.stop();
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.shared.enabled.load(Ordering::SeqCst)
    }

    pub fn phase(&self) -> Phase {
        self.shared.phase.load()
    }
}
