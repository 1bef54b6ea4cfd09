//! # Worker abstraction.
//!
//! A [`Worker`] receives a [`CancellationToken`] per attempt and should exit
//! promptly once it is cancelled. The shared handle type is [`WorkerRef`].

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;

/// Shared handle to a worker.
pub type WorkerRef = Arc<dyn Worker>;

/// # Asynchronous, cancelable unit of work.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use taskstream::{Worker, WorkerError};
///
/// struct Tick;
///
/// #[async_trait]
/// impl Worker for Tick {
///     fn name(&self) -> &str { "tick" }
///
///     async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
///         if ctx.is_cancelled() {
///             return Err(WorkerError::Canceled);
///         }
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Worker: Send + Sync + 'static {
    /// Stable, human-readable name. Unique within one supervisor.
    fn name(&self) -> &str;

    /// Runs one attempt until completion, failure or cancellation.
    ///
    /// Return [`WorkerError::Canceled`] when stopping because `ctx` was cancelled.
    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError>;
}
