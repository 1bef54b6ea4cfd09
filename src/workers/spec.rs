//! # Worker specification for supervised execution.
//!
//! [`WorkerSpec`] bundles a worker with its restart policy, backoff and
//! optional per-attempt timeout. Build it explicitly with [`WorkerSpec::new`]
//! or inherit the supervisor defaults with [`WorkerSpec::with_defaults`].

use std::time::Duration;

use crate::core::Config;
use crate::policies::{BackoffPolicy, RestartPolicy};

use super::worker::WorkerRef;

/// How one worker runs under the [`Supervisor`](crate::Supervisor).
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tokio_util::sync::CancellationToken;
/// use taskstream::{Config, RestartPolicy, WorkerError, WorkerFn, WorkerRef, WorkerSpec};
///
/// let w: WorkerRef = WorkerFn::arc("demo", |_ctx: CancellationToken| async move {
///     Ok::<(), WorkerError>(())
/// });
///
/// let spec = WorkerSpec::with_defaults(w, &Config::default())
///     .with_restart(RestartPolicy::Never)
///     .with_timeout(Some(Duration::from_secs(1)));
/// assert_eq!(spec.name(), "demo");
/// assert_eq!(spec.restart(), RestartPolicy::Never);
/// ```
#[derive(Clone)]
pub struct WorkerSpec {
    worker: WorkerRef,
    restart: RestartPolicy,
    backoff: BackoffPolicy,
    timeout: Option<Duration>,
}

impl WorkerSpec {
    pub fn new(
        worker: WorkerRef,
        restart: RestartPolicy,
        backoff: BackoffPolicy,
        timeout: Option<Duration>,
    ) -> Self {
        Self {
            worker,
            restart,
            backoff,
            timeout,
        }
    }

    /// Inherits restart/backoff/timeout from `cfg` (`timeout = 0s` means none).
    pub fn with_defaults(worker: WorkerRef, cfg: &Config) -> Self {
        Self {
            worker,
            restart: cfg.restart,
            backoff: cfg.backoff,
            timeout: cfg.default_timeout(),
        }
    }

    pub fn worker(&self) -> &WorkerRef {
        &self.worker
    }

    pub fn name(&self) -> &str {
        self.worker.name()
    }

    pub fn restart(&self) -> RestartPolicy {
        self.restart
    }

    pub fn backoff(&self) -> BackoffPolicy {
        self.backoff
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_backoff(mut self, backoff: BackoffPolicy) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_restart(mut self, restart: RestartPolicy) -> Self {
        self.restart = restart;
        self
    }
}
