//! Platform assembly for macOS sessions.

use parking_lot::Mutex;
use std::sync::Arc;

use super::Session;
use crate::hotplug::IoKitWatcher;
use crate::tap::event_tap::QuartzTap;
use crate::tap::RetryPolicy;
use crate::touch::devices::macos::MacMultitouch;
use crate::touch::devices::DeviceRegistry;
use crate::touch::state::TouchState;

/// Wire up a full session against the real platform: MultitouchSupport
/// devices, an IOKit hot-plug watcher, and a Quartz event tap installed
/// under the given retry policy.
pub fn macos_session(policy: RetryPolicy) -> Session<MacMultitouch, QuartzTap, IoKitWatcher> {
    let touch = Arc::new(TouchState::new());
    let registry = Arc::new(Mutex::new(DeviceRegistry::new(MacMultitouch::new(
        Arc::clone(&touch),
    ))));
    let tap = QuartzTap::new(policy, Arc::clone(&touch));
    let watcher = IoKitWatcher::new(Arc::clone(&registry));
    Session::new(registry, touch, tap, watcher)
}
