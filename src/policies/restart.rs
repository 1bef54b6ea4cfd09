//! # Restart policies for workers.
//!
//! [`RestartPolicy`] decides whether a worker runs again after an attempt ends.
//!
//! ```text
//! Producer that appends a fixed batch     → RestartPolicy::OnFailure
//! Consumer that drains and exits          → RestartPolicy::OnFailure
//! Consumer polling forever between drains → RestartPolicy::Always { interval: Some(..) }
//! One-shot job, never retried             → RestartPolicy::Never
//! ```
//!
//! A consumer restarted after a failure keeps its consumer name, so its first
//! drain after the restart recovers whatever it left unacknowledged.

use std::time::Duration;

/// Policy controlling whether a worker is restarted after completion or failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum RestartPolicy {
    /// The worker runs once and exits permanently.
    Never,
    /// Restart only after a retryable failure (default).
    #[default]
    OnFailure,
    /// Restart after every attempt.
    ///
    /// `interval` is the pause after a successful attempt (`None` = immediately).
    Always { interval: Option<Duration> },
}

impl RestartPolicy {
    /// True if a successful attempt should be followed by another one.
    pub fn restarts_on_success(&self) -> bool {
        matches!(self, RestartPolicy::Always { .. })
    }

    /// True if a retryable failure should be followed by another attempt.
    pub fn restarts_on_failure(&self) -> bool {
        !matches!(self, RestartPolicy::Never)
    }
}
