//! Bounded retry for event tap installation
//!
//! Creating a global event tap fails until the user grants Accessibility
//! access, and keeps failing for a short while after the grant because the
//! permission takes time to propagate to running processes. Installation is
//! therefore retried on a fixed cadence with a hard attempt cap.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::{Error, Result};

/// Retry policy for tap installation: fixed attempt cap, fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 300,
            delay: Duration::from_secs(1),
        }
    }
}

/// Run `attempt` up to `policy.max_attempts` times, sleeping `policy.delay`
/// between failures.
///
/// Returns the first successful result, or [`Error::Tap`] once the budget
/// is exhausted. Parameterized over the attempt so the loop is testable
/// without an actual tap.
pub fn install_with_retry<T, F>(policy: &RetryPolicy, mut attempt: F, what: &str) -> Result<T>
where
    F: FnMut() -> Option<T>,
{
    for i in 0..policy.max_attempts {
        if let Some(value) = attempt() {
            if i > 0 {
                info!(attempts = i + 1, "{} created after retries", what);
            }
            return Ok(value);
        }
        if i == 0 {
            // Surface the wait at the default log level; the per-attempt
            // failures below would be noise at anything above debug.
            warn!(
                max = policy.max_attempts,
                "{} creation failed; retrying while the permission grant propagates", what
            );
        } else {
            debug!(attempt = i + 1, max = policy.max_attempts, "{} creation failed", what);
        }
        if i + 1 < policy.max_attempts {
            std::thread::sleep(policy.delay);
        }
    }

    warn!(attempts = policy.max_attempts, "{} creation exhausted its retry budget", what);
    Err(Error::Tap(format!(
        "failed to create {what} after {} attempts; check Accessibility permissions",
        policy.max_attempts
    )))
}
