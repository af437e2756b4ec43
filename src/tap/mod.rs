//! Event interception
//!
//! A global Quartz event tap intercepts left-button down/up events and
//! rewrites them to middle-button events while a three-finger gesture is
//! active. The conversion decision itself is a small platform-free state
//! machine in [`convert`]; tap installation rides out permission
//! propagation with the bounded retry in [`retry`].

pub mod convert;
pub mod retry;

#[cfg(target_os = "macos")]
pub mod event_tap;

pub use convert::{ButtonEdge, ClickConverter, Verdict};
pub use retry::{install_with_retry, RetryPolicy};

#[cfg(target_os = "macos")]
pub use event_tap::{
    accessibility_trusted, request_accessibility_prompt, QuartzTap,
};
