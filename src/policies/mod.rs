//! Restart and backoff policies for supervised workers.
//!
//! ```text
//! WorkerSpec { restart: RestartPolicy, backoff: BackoffPolicy, timeout: Option<Duration> }
//!      └─► core::actor::WorkerActor uses:
//!           - restart to decide continue/exit
//!           - backoff.next(retry) to delay the next attempt
//! ```
//!
//! Defaults: `RestartPolicy::OnFailure`, constant 100ms backoff capped at 30s,
//! no jitter.

mod backoff;
mod jitter;
mod restart;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use restart::RestartPolicy;
