//! Error types used by the stream core, the workers and the supervisor.
//!
//! This module defines three error enums:
//!
//! - [`StreamError`]: errors raised by log and consumer-group operations.
//! - [`WorkerError`]: errors raised by individual worker attempts.
//! - [`RuntimeError`]: errors raised by the supervisor itself.
//!
//! All of them provide `as_label` for logs/metrics. Conditions that the
//! delivery protocol treats as normal (group already exists, ack of an unknown
//! entry, an elapsed blocking read) are **not** errors and have no variant here.

use std::time::Duration;
use thiserror::Error;

/// # Errors produced by log and consumer-group operations.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// The backing log store cannot be reached. Never retried internally.
    #[error("log store unavailable: {reason}")]
    StoreUnavailable {
        /// Store-provided description of the outage.
        reason: String,
    },

    /// The named consumer group does not exist; create it first.
    #[error("unknown consumer group {group:?}")]
    UnknownGroup {
        /// Name that was looked up.
        group: String,
    },

    /// A textual entry id could not be parsed.
    #[error("invalid entry id {input:?}")]
    InvalidEntryId {
        /// The rejected input.
        input: String,
    },

    /// The [`Streams`](crate::Streams) context was closed.
    #[error("streams context closed")]
    Closed,
}

impl StreamError {
    /// Shorthand for [`StreamError::StoreUnavailable`].
    pub fn unavailable(reason: impl Into<String>) -> Self {
        StreamError::StoreUnavailable {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`StreamError::UnknownGroup`].
    pub fn unknown_group(group: impl Into<String>) -> Self {
        StreamError::UnknownGroup {
            group: group.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use taskstream::StreamError;
    ///
    /// let err = StreamError::unknown_group("g");
    /// assert_eq!(err.as_label(), "stream_unknown_group");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            StreamError::StoreUnavailable { .. } => "stream_store_unavailable",
            StreamError::UnknownGroup { .. } => "stream_unknown_group",
            StreamError::InvalidEntryId { .. } => "stream_invalid_entry_id",
            StreamError::Closed => "stream_closed",
        }
    }

    /// True when the caller may reasonably try again later.
    ///
    /// Only an unreachable store qualifies; the core itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, StreamError::StoreUnavailable { .. })
    }
}

/// # Errors produced by worker attempts.
///
/// Some errors are retryable (`Timeout`, `Fail`), others are fatal.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum WorkerError {
    /// The attempt exceeded its timeout duration.
    #[error("timed out after {timeout:?}")]
    Timeout {
        /// The timeout duration that was exceeded.
        timeout: Duration,
    },

    /// Non-recoverable error (never retried).
    #[error("fatal error (no retry): {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// The attempt failed but may succeed if retried.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The attempt observed cancellation and stopped.
    #[error("context cancelled")]
    Canceled,
}

impl WorkerError {
    /// Shorthand for [`WorkerError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        WorkerError::Fail {
            error: error.into(),
        }
    }

    /// Shorthand for [`WorkerError::Fatal`].
    pub fn fatal(error: impl Into<String>) -> Self {
        WorkerError::Fatal {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            WorkerError::Timeout { .. } => "worker_timeout",
            WorkerError::Fatal { .. } => "worker_fatal",
            WorkerError::Fail { .. } => "worker_failed",
            WorkerError::Canceled => "worker_canceled",
        }
    }

    /// Indicates whether the error is safe to retry.
    ///
    /// # Example
    /// ```
    /// use taskstream::WorkerError;
    ///
    /// assert!(WorkerError::fail("boom").is_retryable());
    /// assert!(!WorkerError::fatal("nope").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, WorkerError::Fail { .. } | WorkerError::Timeout { .. })
    }
}

impl From<StreamError> for WorkerError {
    /// An unreachable store is a transient failure, everything else is fatal
    /// (retrying against an unknown group or a closed context cannot succeed).
    fn from(err: StreamError) -> Self {
        if err.is_retryable() {
            WorkerError::fail(err.to_string())
        } else {
            WorkerError::fatal(err.to_string())
        }
    }
}

/// # Errors produced by the supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Shutdown grace period was exceeded; some workers remained stuck.
    #[error("shutdown timeout {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Workers that did not stop in time.
        stuck: Vec<String>,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::GraceExceeded { .. } => "runtime_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_outage_maps_to_retryable_worker_failure() {
        let err: WorkerError = StreamError::unavailable("connection refused").into();
        assert!(err.is_retryable());
        assert_eq!(err.as_label(), "worker_failed");
    }

    #[test]
    fn unknown_group_maps_to_fatal_worker_error() {
        let err: WorkerError = StreamError::unknown_group("g").into();
        assert!(!err.is_retryable());
        assert_eq!(err.as_label(), "worker_fatal");
    }

    #[test]
    fn closed_context_is_not_retryable() {
        assert!(!StreamError::Closed.is_retryable());
        assert!(StreamError::unavailable("down").is_retryable());
    }
}
