//! # WorkerActor: one worker under supervision.
//!
//! ```text
//! loop {
//!   ├─► publish WorkerStarting (attempt += 1)
//!   ├─► run_once() ──► WorkerStopped / WorkerFailed (+ TimeoutHit)
//!   ├─► Ok:
//!   │     ├─► Always { interval } → BackoffScheduled(Success) → sleep(interval)
//!   │     └─► otherwise           → WorkerExhausted, exit
//!   ├─► Err(Canceled)             → exit
//!   ├─► Err(fatal)                → WorkerDead, exit
//!   └─► Err(retryable):
//!         ├─► Never               → WorkerExhausted, exit
//!         └─► otherwise           → BackoffScheduled(Failure) → sleep(backoff.next(retry))
//! }
//! ```
//!
//! Attempts run sequentially. The attempt counter never resets; the retry
//! counter feeding the backoff resets after every successful attempt. Sleeps
//! end early on cancellation.

use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::core::runner::run_once;
use crate::error::WorkerError;
use crate::events::{BackoffSource, Bus, Event, EventKind};
use crate::policies::RestartPolicy;
use crate::workers::WorkerSpec;

pub struct WorkerActor {
    spec: WorkerSpec,
    bus: Bus,
}

impl WorkerActor {
    pub fn new(spec: WorkerSpec, bus: Bus) -> Self {
        Self { spec, bus }
    }

    /// Runs until the restart policy says stop, a fatal error, or cancellation.
    pub async fn run(self, token: CancellationToken) {
        let worker = self.spec.worker().clone();
        let name = worker.name().to_string();
        let mut attempt: u64 = 0;
        let mut retries: u32 = 0;

        loop {
            if token.is_cancelled() {
                break;
            }
            attempt += 1;
            self.bus.publish(
                Event::new(EventKind::WorkerStarting)
                    .with_worker(name.as_str())
                    .with_attempt(attempt),
            );

            let res = run_once(
                worker.as_ref(),
                &token,
                self.spec.timeout(),
                attempt,
                &self.bus,
            )
            .await;

            let (delay, ev) = match res {
                Ok(()) => {
                    retries = 0;
                    match self.spec.restart() {
                        RestartPolicy::Always { interval } => {
                            let delay = interval.unwrap_or(Duration::ZERO);
                            let ev = Event::new(EventKind::BackoffScheduled)
                                .with_backoff_source(BackoffSource::Success);
                            (delay, ev)
                        }
                        _ => {
                            let kind = EventKind::WorkerExhausted;
                            self.publish_terminal(kind, &name, attempt, None);
                            break;
                        }
                    }
                }
                Err(WorkerError::Canceled) => break,
                Err(e) if !e.is_retryable() => {
                    self.publish_terminal(EventKind::WorkerDead, &name, attempt, Some(&e));
                    break;
                }
                Err(e) => {
                    if !self.spec.restart().restarts_on_failure() {
                        let kind = EventKind::WorkerExhausted;
                        self.publish_terminal(kind, &name, attempt, Some(&e));
                        break;
                    }
                    let delay = self.spec.backoff().next(retries);
                    retries = retries.saturating_add(1);
                    let ev = Event::new(EventKind::BackoffScheduled)
                        .with_backoff_source(BackoffSource::Failure)
                        .with_reason(e.to_string());
                    (delay, ev)
                }
            };

            self.bus.publish(
                ev.with_worker(name.as_str())
                    .with_attempt(attempt)
                    .with_delay(delay),
            );
            tokio::select! {
                _ = time::sleep(delay) => {}
                _ = token.cancelled() => break,
            }
        }
    }

    fn publish_terminal(
        &self,
        kind: EventKind,
        name: &str,
        attempt: u64,
        err: Option<&WorkerError>,
    ) {
        let mut ev = Event::new(kind).with_worker(name).with_attempt(attempt);
        if let Some(e) = err {
            ev = ev.with_reason(e.to_string());
        }
        self.bus.publish(ev);
    }
}
