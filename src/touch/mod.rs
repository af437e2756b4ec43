//! Multitouch device handling
//!
//! Enumerates multitouch-capable devices through the private
//! MultitouchSupport framework, registers a contact-frame observer on each,
//! and keeps a process-wide finger count current for the event tap.

pub mod state;
pub mod devices;

pub use devices::{DeviceRegistry, MultitouchApi};
pub use state::TouchState;

#[cfg(target_os = "macos")]
pub use devices::macos::MacMultitouch;
