//! Runtime core: supervision of workers and graceful shutdown.
//!
//! The public API of this module is [`Supervisor`] and its [`Config`].
//!
//! Internal modules:
//! - [`runner`]: one attempt with timeout/cancellation and event publishing;
//! - [`actor`]: one worker under its restart policy and backoff;
//! - [`alive`]: seq-ordered tracker of running workers (stuck-worker reports);
//! - [`shutdown`]: cross-platform shutdown signal handling;
//! - [`supervisor`]: spawns actors, fans events out, enforces the grace period.

mod actor;
mod alive;
mod config;
mod runner;
mod shutdown;
mod supervisor;

pub use config::Config;
pub use supervisor::Supervisor;
