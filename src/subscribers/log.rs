//! # LogWriter: events rendered through `tracing`
//!
//! A subscriber that turns every [`Event`] into one `tracing` record with
//! structured fields. Install any `tracing` subscriber (for example
//! `tracing_subscriber::fmt`) to see the output.
//!
//! ## Example output (fmt layer)
//! ```text
//! INFO  entry appended entry=1626817438793-0
//! DEBUG entries delivered group="consumer-group-1" consumer="consumer-1" count=1 last=1626817438793-0
//! WARN  entries redelivered group="consumer-group-1" consumer="consumer-2" count=1
//! INFO  entry acked group="consumer-group-1" entry=1626817438793-0
//! WARN  worker failed worker="consumer-2" attempt=1 reason="execution failed: ..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn opt<T: std::fmt::Display>(v: &Option<T>) -> String {
    v.as_ref().map_or_else(|| "-".to_string(), ToString::to_string)
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = opt(&e.worker);
        let group = opt(&e.group);
        let consumer = opt(&e.consumer);
        let entry = opt(&e.entry);
        let reason = opt(&e.reason);

        match e.kind {
            EventKind::EntryAppended => info!(%entry, "entry appended"),
            EventKind::GroupCreated => info!(%group, start = %entry, "group created"),
            EventKind::GroupExists => info!(%group, "group already exists, skipping"),
            EventKind::EntriesDelivered => {
                debug!(%group, %consumer, count = ?e.count, last = %entry, "entries delivered")
            }
            EventKind::EntriesRedelivered => {
                warn!(%group, %consumer, count = ?e.count, "entries redelivered")
            }
            EventKind::EntryAcked => info!(%group, %entry, "entry acked"),
            EventKind::WorkerStarting => info!(%worker, attempt = ?e.attempt, "worker starting"),
            EventKind::WorkerStopped => info!(%worker, attempt = ?e.attempt, "worker stopped"),
            EventKind::WorkerFailed => {
                warn!(%worker, attempt = ?e.attempt, %reason, "worker failed")
            }
            EventKind::TimeoutHit => {
                warn!(%worker, attempt = ?e.attempt, timeout_ms = ?e.timeout_ms, "worker timed out")
            }
            EventKind::BackoffScheduled => info!(
                %worker,
                after_attempt = ?e.attempt,
                delay_ms = ?e.delay_ms,
                source = ?e.backoff_source,
                %reason,
                "backoff scheduled"
            ),
            EventKind::WorkerExhausted => info!(%worker, attempt = ?e.attempt, "worker exhausted"),
            EventKind::WorkerDead => error!(%worker, attempt = ?e.attempt, %reason, "worker dead"),
            EventKind::ShutdownRequested => info!("shutdown requested"),
            EventKind::AllStoppedWithin => info!("all workers stopped within grace"),
            EventKind::GraceExceeded => error!("grace exceeded"),
            EventKind::SubscriberPanicked => {
                error!(subscriber = %worker, %reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = %worker, %reason, "subscriber overflow")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn handles_every_kind_without_a_global_subscriber() {
        let w = LogWriter::new();
        for kind in [
            EventKind::EntryAppended,
            EventKind::EntriesDelivered,
            EventKind::WorkerDead,
            EventKind::SubscriberOverflow,
        ] {
            w.on_event(&Event::new(kind).with_reason("x")).await;
        }
    }
}
