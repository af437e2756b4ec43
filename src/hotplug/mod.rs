//! Device hot-plug watcher
//!
//! Subscribes to IOKit first-match notifications for multitouch devices and
//! refreshes the device registry whenever one arrives, so a trackpad
//! plugged in mid-session starts feeding the touch state without a
//! restart. Unplug events are deliberately not watched: a removed device
//! simply stops producing frames, and its stale handle is flushed by the
//! next arrival's wholesale refresh.

#[cfg(target_os = "macos")]
mod iokit;

#[cfg(target_os = "macos")]
pub use iokit::IoKitWatcher;
