//! # Supervisor configuration.
//!
//! [`Config`] is used in two ways:
//! 1. **Supervisor creation**: `Supervisor::new(config, subscribers)`
//! 2. **Worker defaults**: `WorkerSpec::with_defaults(worker, &config)`
//!
//! ## Sentinel values
//! - `timeout = 0s` → no per-attempt timeout
//! - `bus_capacity = 0` → clamped to 1

use std::time::Duration;

use crate::policies::{BackoffPolicy, RestartPolicy};

/// Global configuration of the supervisor runtime.
#[derive(Clone, Debug)]
pub struct Config {
    /// How long shutdown waits for workers to exit after cancelling them.
    pub grace: Duration,

    /// Capacity of the event bus ring buffer. Subscribers lagging further
    /// behind skip the oldest events.
    pub bus_capacity: usize,

    /// Default restart policy for [`WorkerSpec::with_defaults`](crate::WorkerSpec::with_defaults).
    pub restart: RestartPolicy,

    /// Default backoff policy for [`WorkerSpec::with_defaults`](crate::WorkerSpec::with_defaults).
    pub backoff: BackoffPolicy,

    /// Default per-attempt timeout (`Duration::ZERO` = none).
    pub timeout: Duration,
}

impl Config {
    /// Default per-attempt timeout as an `Option` (`0s` → `None`).
    #[inline]
    pub fn default_timeout(&self) -> Option<Duration> {
        if self.timeout == Duration::ZERO {
            None
        } else {
            Some(self.timeout)
        }
    }

    /// Bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for Config {
    /// `grace = 60s`, `bus_capacity = 1024`, no timeout,
    /// `RestartPolicy::OnFailure`, `BackoffPolicy::default()`.
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
            timeout: Duration::ZERO,
            restart: RestartPolicy::default(),
            backoff: BackoffPolicy::default(),
        }
    }
}
