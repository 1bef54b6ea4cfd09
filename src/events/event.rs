//! # Events emitted by the streams context, the supervisor and worker actors.
//!
//! The [`EventKind`] enum classifies events across four categories:
//! - **Protocol events**: appends, group creation, deliveries, acknowledgments
//! - **Worker lifecycle events**: attempt flow (starting, stopped, failed, timeout, backoff)
//! - **Terminal events**: worker final states (exhausted policy, dead)
//! - **Runtime events**: shutdown and subscriber health
//!
//! The [`Event`] struct carries metadata such as timestamps, worker name,
//! group/consumer/entry, counts, reasons and backoff delays.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore order when events arrive out of order.
//!
//! ## Example
//! ```rust
//! use taskstream::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::EntriesDelivered)
//!     .with_group("consumer-group-1")
//!     .with_consumer("consumer-1")
//!     .with_count(1);
//!
//! assert_eq!(ev.kind, EventKind::EntriesDelivered);
//! assert_eq!(ev.consumer.as_deref(), Some("consumer-1"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::log::EntryId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(1);

/// Classification of events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Protocol events ===
    /// An entry was appended. Sets `entry`.
    EntryAppended,

    /// A consumer group was created. Sets `group`, `entry` (start cursor).
    GroupCreated,

    /// Creation was requested for an existing group (no-op). Sets `group`.
    GroupExists,

    /// New entries were handed to a consumer. Sets `group`, `consumer`, `count`,
    /// `entry` (last delivered id).
    EntriesDelivered,

    /// A consumer re-read its own pending entries. Sets `group`, `consumer`, `count`.
    EntriesRedelivered,

    /// A pending entry was acknowledged. Sets `group`, `entry`.
    EntryAcked,

    // === Worker lifecycle events ===
    /// Worker is starting an attempt. Sets `worker`, `attempt`.
    WorkerStarting,

    /// Worker attempt finished successfully or was cancelled. Sets `worker`, `attempt`.
    WorkerStopped,

    /// Worker attempt failed. Sets `worker`, `attempt`, `reason`.
    WorkerFailed,

    /// Worker attempt exceeded its timeout. Sets `worker`, `attempt`, `timeout_ms`.
    TimeoutHit,

    /// Next attempt scheduled. Sets `worker`, `attempt`, `delay_ms`,
    /// `backoff_source` and, for failures, `reason`.
    BackoffScheduled,

    // === Terminal events ===
    /// Restart policy forbids another attempt. Sets `worker`, `attempt`.
    WorkerExhausted,

    /// Worker terminated on a fatal error. Sets `worker`, `attempt`, `reason`.
    WorkerDead,

    // === Runtime events ===
    /// Shutdown requested (OS signal or external token).
    ShutdownRequested,

    /// All workers stopped within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not stop in time.
    GraceExceeded,

    /// Subscriber panicked while handling an event. Sets `worker` (subscriber name), `reason`.
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or closed). Sets `worker`, `reason`.
    SubscriberOverflow,
}

/// Why the next attempt was scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffSource {
    Success,
    Failure,
}

/// Event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker (or subscriber) name, if applicable.
    pub worker: Option<Arc<str>>,
    /// Consumer group name.
    pub group: Option<Arc<str>>,
    /// Consumer name.
    pub consumer: Option<Arc<str>>,
    /// Entry id the event is about.
    pub entry: Option<EntryId>,
    /// Number of entries involved.
    pub count: Option<u32>,
    /// Attempt count (starting from 1).
    pub attempt: Option<u64>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Attempt timeout in milliseconds.
    pub timeout_ms: Option<u32>,
    /// Backoff delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Source for backoff scheduling.
    pub backoff_source: Option<BackoffSource>,
}

fn clamp_ms(d: Duration) -> u32 {
    d.as_millis().min(u128::from(u32::MAX)) as u32
}

impl Event {
    /// Creates an event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            group: None,
            consumer: None,
            entry: None,
            count: None,
            attempt: None,
            reason: None,
            timeout_ms: None,
            delay_ms: None,
            backoff_source: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, worker: impl Into<Arc<str>>) -> Self {
        self.worker = Some(worker.into());
        self
    }

    #[inline]
    pub fn with_group(mut self, group: impl Into<Arc<str>>) -> Self {
        self.group = Some(group.into());
        self
    }

    #[inline]
    pub fn with_consumer(mut self, consumer: impl Into<Arc<str>>) -> Self {
        self.consumer = Some(consumer.into());
        self
    }

    #[inline]
    pub fn with_entry(mut self, id: EntryId) -> Self {
        self.entry = Some(id);
        self
    }

    /// Attaches a count (saturating at `u32::MAX`).
    #[inline]
    pub fn with_count(mut self, n: usize) -> Self {
        self.count = Some(u32::try_from(n).unwrap_or(u32::MAX));
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u64) -> Self {
        self.attempt = Some(n);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        self.timeout_ms = Some(clamp_ms(d));
        self
    }

    /// Attaches a backoff delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(clamp_ms(d));
        self
    }

    #[inline]
    pub fn with_backoff_source(mut self, source: BackoffSource) -> Self {
        self.backoff_source = Some(source);
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_worker(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_worker(subscriber)
            .with_reason(info)
    }

    /// True for events that describe subscriber health; never re-published
    /// on subscriber failures to avoid feedback loops.
    #[inline]
    pub fn is_subscriber_event(&self) -> bool {
        matches!(
            self.kind,
            EventKind::SubscriberOverflow | EventKind::SubscriberPanicked
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_is_monotonic() {
        let a = Event::new(EventKind::EntryAppended);
        let b = Event::new(EventKind::EntryAppended);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn durations_are_clamped_to_u32_millis() {
        let ev = Event::new(EventKind::BackoffScheduled)
            .with_delay(Duration::from_secs(u64::MAX / 2))
            .with_timeout(Duration::from_millis(1500));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
        assert_eq!(ev.timeout_ms, Some(1500));
    }
}
