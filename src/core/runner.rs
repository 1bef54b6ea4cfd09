//! # One attempt of a worker.
//!
//! ```text
//! Success:      worker.run() → Ok(())           → WorkerStopped
//! Cancellation: worker.run() → Err(Canceled)    → WorkerStopped
//! Failure:      worker.run() → Err(Fail/Fatal)  → WorkerFailed
//! Timeout:      deadline hit → cancel child     → TimeoutHit + WorkerFailed
//! ```
//!
//! Exactly one of `WorkerStopped` / `WorkerFailed` is published per attempt.
//! Each attempt runs under a child token, so a timeout never cancels the parent.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::events::{Bus, Event, EventKind};
use crate::workers::Worker;

/// Runs `worker` once, publishing its terminal event to `bus`.
pub async fn run_once<W: Worker + ?Sized>(
    worker: &W,
    parent: &CancellationToken,
    timeout: Option<Duration>,
    attempt: u64,
    bus: &Bus,
) -> Result<(), WorkerError> {
    let child = parent.child_token();

    let res = match timeout.filter(|d| *d > Duration::ZERO) {
        Some(dur) => match time::timeout(dur, worker.run(child.clone())).await {
            Ok(r) => r,
            Err(_elapsed) => {
                child.cancel();
                bus.publish(
                    Event::new(EventKind::TimeoutHit)
                        .with_worker(worker.name())
                        .with_timeout(dur)
                        .with_attempt(attempt),
                );
                Err(WorkerError::Timeout { timeout: dur })
            }
        },
        None => worker.run(child.clone()).await,
    };

    match &res {
        Ok(()) | Err(WorkerError::Canceled) => bus.publish(
            Event::new(EventKind::WorkerStopped)
                .with_worker(worker.name())
                .with_attempt(attempt),
        ),
        Err(e) => bus.publish(
            Event::new(EventKind::WorkerFailed)
                .with_worker(worker.name())
                .with_attempt(attempt)
                .with_reason(e.to_string()),
        ),
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workers::WorkerFn;

    fn kinds(rx: &mut tokio::sync::broadcast::Receiver<Event>) -> Vec<EventKind> {
        let mut out = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            out.push(ev.kind);
        }
        out
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_cancels_the_attempt() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let w = WorkerFn::new("slow", |ctx: CancellationToken| async move {
            ctx.cancelled().await;
            Err(WorkerError::Canceled)
        });

        let res = run_once(
            &w,
            &CancellationToken::new(),
            Some(Duration::from_millis(50)),
            1,
            &bus,
        )
        .await;
        assert!(matches!(res, Err(WorkerError::Timeout { .. })));
        assert_eq!(
            kinds(&mut rx),
            vec![EventKind::TimeoutHit, EventKind::WorkerFailed]
        );
    }

    #[tokio::test]
    async fn cancellation_is_a_clean_stop() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let w = WorkerFn::new("polite", |_ctx: CancellationToken| async {
            Err(WorkerError::Canceled)
        });

        let res = run_once(&w, &CancellationToken::new(), None, 3, &bus).await;
        assert!(matches!(res, Err(WorkerError::Canceled)));
        assert_eq!(kinds(&mut rx), vec![EventKind::WorkerStopped]);
    }

    #[tokio::test]
    async fn failure_carries_the_reason() {
        let bus = Bus::new(16);
        let mut rx = bus.subscribe();
        let w = WorkerFn::new("broken", |_ctx: CancellationToken| async {
            Err(WorkerError::fail("store down"))
        });

        let _ = run_once(&w, &CancellationToken::new(), None, 1, &bus).await;
        let ev = rx.try_recv().unwrap();
        assert_eq!(ev.kind, EventKind::WorkerFailed);
        assert_eq!(ev.worker.as_deref(), Some("broken"));
        assert_eq!(ev.reason.as_deref(), Some("execution failed: store down"));
    }
}
