//! # midclick
//!
//! Emulates a middle mouse-click from a three-finger trackpad (or Magic
//! Mouse) click on macOS.
//!
//! ## Overview
//!
//! The crate consumes contact frames from the private MultitouchSupport
//! framework to track how many fingers rest on the touch surface, and
//! installs a global Quartz event tap that rewrites left-button down/up
//! events into middle-button events while a three-finger gesture is active.
//!
//! ## Event Pipeline
//!
//! ```text
//! ┌──────────────┐    ┌─────────────┐    ┌──────────────┐    ┌────────────┐
//! │ Contact frame│───▶│ Touch State │───▶│  Event tap   │───▶│ OS dispatch│
//! │  (registry)  │    │ (one word)  │    │  (rewrite)   │    │  (middle)  │
//! └──────────────┘    └─────────────┘    └──────────────┘    └────────────┘
//! ```
//!
//! ## Architecture
//!
//! - [`touch`]: device enumeration, contact-frame registration, finger count
//! - [`tap`]: event tap installation with bounded retry, click conversion
//! - [`hotplug`]: IOKit device-arrival notifications driving re-enumeration
//! - [`session`]: lifecycle controller composing the above
//! - [`app`]: CLI and configuration management
//!
//! ## Permissions
//!
//! The event tap requires Accessibility permissions on macOS:
//! System Settings → Privacy & Security → Accessibility

pub mod touch;
pub mod tap;
pub mod hotplug;
pub mod session;
pub mod app;

// Re-export commonly used types
pub use session::{Phase, Session, SessionHandle};
pub use tap::convert::{ButtonEdge, ClickConverter, Verdict};
pub use tap::retry::RetryPolicy;
pub use touch::state::TouchState;

/// Result type alias for midclick
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for midclick
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No multitouch hardware present, or enumeration itself failed.
    /// Non-retryable; the session reports this to its caller.
    #[error("multitouch device error: {0}")]
    Devices(String),

    /// The event tap could not be created within the retry budget,
    /// or its run-loop source could not be set up.
    #[error("event tap error: {0}")]
    Tap(String),

    /// Device hot-plug notification setup failed.
    #[error("device notification error: {0}")]
    Notification(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
