//! # ConsumerWorker: one named consumer draining a group.
//!
//! Each attempt runs the consumer loop:
//! ```text
//! create_group(group, start)            (idempotent; Existing is fine)
//! loop {
//!   batch = request_new(count, block)   (cancellable while blocked)
//!   if batch is empty:
//!       batch = own pending, minus entries left this attempt
//!                                       (recovery of unacked work)
//!   if batch is empty:
//!       drain ? stop : continue
//!   for entry in batch:
//!       Handler::handle(entry)
//!         Ok(Ack)   → ack
//!         Ok(Leave) → stays pending, skipped for the rest of this attempt
//!         Err(e)    → attempt fails, entry stays pending
//! }
//! ```
//!
//! A failed attempt leaves its entries in the pending entry table. The
//! supervisor restarts the worker under the same consumer name, and the first
//! idle turn of the next attempt hands those entries back through
//! `request_own_pending`.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::WorkerError;
use crate::log::{Block, Entry, EntryId, StartId};
use crate::streams::Streams;

use super::worker::Worker;

/// What to do with an entry after handling it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Processing finished; acknowledge the entry.
    Ack,
    /// Keep the entry pending (it is redelivered to this consumer later).
    Leave,
}

/// Processes one entry at a time for a [`ConsumerWorker`].
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn handle(&self, entry: &Entry) -> Result<Outcome, WorkerError>;
}

/// Closure-backed [`Handler`]. The closure receives an owned (cheap) clone of
/// the entry.
pub struct HandlerFn<F> {
    f: F,
}

impl<F> HandlerFn<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Entry) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Outcome, WorkerError>> + Send + 'static,
{
    async fn handle(&self, entry: &Entry) -> Result<Outcome, WorkerError> {
        (self.f)(entry.clone()).await
    }
}

/// Settings of one consumer loop.
#[derive(Clone, Debug)]
pub struct ConsumerOptions {
    pub group: String,
    pub consumer: String,
    /// Cursor of the group if this consumer creates it.
    pub start: StartId,
    /// Entries per `request_new` (`0` = unlimited).
    pub count: usize,
    pub block: Block,
    /// Finish the attempt once neither new nor own pending entries remain.
    pub drain: bool,
}

impl ConsumerOptions {
    /// Options with `start = 0`, `count = 1`, `block = 5s`, `drain = true`.
    pub fn new(group: impl Into<String>, consumer: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            consumer: consumer.into(),
            start: StartId::BEGINNING,
            count: 1,
            block: Block::For(Duration::from_secs(5)),
            drain: true,
        }
    }

    pub fn with_start(mut self, start: StartId) -> Self {
        self.start = start;
        self
    }

    pub fn with_count(mut self, count: usize) -> Self {
        self.count = count;
        self
    }

    pub fn with_block(mut self, block: Block) -> Self {
        self.block = block;
        self
    }

    pub fn with_drain(mut self, drain: bool) -> Self {
        self.drain = drain;
        self
    }
}

/// Consumer loop as a supervised [`Worker`]. The worker name is the consumer
/// name.
pub struct ConsumerWorker<H> {
    streams: Arc<Streams>,
    opts: ConsumerOptions,
    handler: H,
}

impl<H: Handler> ConsumerWorker<H> {
    pub fn new(streams: Arc<Streams>, opts: ConsumerOptions, handler: H) -> Self {
        Self {
            streams,
            opts,
            handler,
        }
    }

    pub fn arc(streams: Arc<Streams>, opts: ConsumerOptions, handler: H) -> Arc<Self> {
        Arc::new(Self::new(streams, opts, handler))
    }

    pub fn options(&self) -> &ConsumerOptions {
        &self.opts
    }

    async fn next_batch(
        &self,
        ctx: &CancellationToken,
        left: &HashSet<EntryId>,
    ) -> Result<Vec<Entry>, WorkerError> {
        let ConsumerOptions {
            group,
            consumer,
            count,
            block,
            ..
        } = &self.opts;

        let fresh = tokio::select! {
            res = self.streams.request_new(group, consumer, *count, *block) => res?,
            _ = ctx.cancelled() => return Err(WorkerError::Canceled),
        };
        if !fresh.is_empty() {
            return Ok(fresh);
        }

        self.streams
            .request_own_pending_except(group, consumer, left)
            .map_err(WorkerError::from)
    }
}

#[async_trait]
impl<H: Handler> Worker for ConsumerWorker<H> {
    fn name(&self) -> &str {
        &self.opts.consumer
    }

    async fn run(&self, ctx: CancellationToken) -> Result<(), WorkerError> {
        let group = self.opts.group.as_str();
        self.streams.create_group(group, self.opts.start).await?;

        let mut left = HashSet::new();
        loop {
            if ctx.is_cancelled() {
                return Err(WorkerError::Canceled);
            }

            let batch = self.next_batch(&ctx, &left).await?;
            if batch.is_empty() {
                if self.opts.drain {
                    return Ok(());
                }
                if self.opts.block == Block::No {
                    tokio::task::yield_now().await;
                }
                continue;
            }

            for entry in &batch {
                if ctx.is_cancelled() {
                    return Err(WorkerError::Canceled);
                }
                match self.handler.handle(entry).await? {
                    Outcome::Ack => {
                        self.streams.ack(group, entry.id())?;
                    }
                    Outcome::Leave => {
                        left.insert(entry.id());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::log::{Fields, MemoryLog};

    fn streams() -> Arc<Streams> {
        Arc::new(Streams::open(Arc::new(MemoryLog::new())))
    }

    fn opts(consumer: &str) -> ConsumerOptions {
        ConsumerOptions::new("g", consumer).with_block(Block::No)
    }

    async fn fill(s: &Streams, n: u32) -> Vec<EntryId> {
        let mut ids = Vec::new();
        for i in 0..n {
            ids.push(
                s.append(Fields::from([("worker_id", i.to_string())]))
                    .await
                    .unwrap(),
            );
        }
        ids
    }

    #[tokio::test]
    async fn drains_and_acks_in_order() {
        let s = streams();
        let ids = fill(&s, 5).await;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let handler = {
            let seen = Arc::clone(&seen);
            HandlerFn::new(move |e: Entry| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().push(e.id());
                    Ok::<_, WorkerError>(Outcome::Ack)
                }
            })
        };
        let w = ConsumerWorker::new(Arc::clone(&s), opts("c1"), handler);
        w.run(CancellationToken::new()).await.unwrap();

        assert_eq!(*seen.lock(), ids);
        assert_eq!(s.stats("g").unwrap().pending, 0);
        assert_eq!(w.name(), "c1");
    }

    #[tokio::test]
    async fn failed_attempt_is_recovered_by_the_next_one() {
        let s = streams();
        let ids = fill(&s, 3).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            HandlerFn::new(move |_e: Entry| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 1 {
                        Err(WorkerError::fail("crashed"))
                    } else {
                        Ok(Outcome::Ack)
                    }
                }
            })
        };
        let w = ConsumerWorker::new(Arc::clone(&s), opts("c1"), handler);

        assert!(w.run(CancellationToken::new()).await.is_err());
        let pending = s.pending("g").unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].entry_id(), ids[1]);

        w.run(CancellationToken::new()).await.unwrap();
        assert_eq!(s.stats("g").unwrap().pending, 0);
        assert_eq!(s.stats("g").unwrap().last_delivered, ids[2]);
    }

    #[tokio::test]
    async fn left_entries_stay_pending_and_do_not_spin() {
        let s = streams();
        let ids = fill(&s, 2).await;

        let handler = HandlerFn::new(|_e: Entry| async { Ok::<_, WorkerError>(Outcome::Leave) });
        let w = ConsumerWorker::new(Arc::clone(&s), opts("c1"), handler);
        w.run(CancellationToken::new()).await.unwrap();

        let pending = s.pending("g").unwrap();
        assert_eq!(
            pending.iter().map(|r| r.entry_id()).collect::<Vec<_>>(),
            ids
        );
        assert!(pending.iter().all(|r| r.owner() == "c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_turns_do_not_count_left_entries_as_delivered() {
        let s = streams();
        let ids = fill(&s, 1).await;

        let calls = Arc::new(AtomicUsize::new(0));
        let handler = {
            let calls = Arc::clone(&calls);
            move |_e: Entry| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, WorkerError>(Outcome::Leave) }
            }
        };
        let idle =
            ConsumerOptions::new("g", "c1").with_block(Block::For(Duration::from_millis(100)));

        let w = Arc::new(ConsumerWorker::new(
            Arc::clone(&s),
            idle.clone().with_drain(false),
            HandlerFn::new(handler.clone()),
        ));
        let token = CancellationToken::new();
        let run = {
            let w = Arc::clone(&w);
            let token = token.clone();
            tokio::spawn(async move { w.run(token).await })
        };
        tokio::time::sleep(Duration::from_millis(1050)).await;
        token.cancel();
        assert!(matches!(run.await.unwrap(), Err(WorkerError::Canceled)));

        let count = |s: &Streams| {
            let rec = s.group("g").unwrap().pending_record(ids[0]).unwrap();
            rec.delivery_count()
        };
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(count(&s), 1);

        // The next attempt recovers the entry exactly once more.
        let again = ConsumerWorker::new(Arc::clone(&s), idle, HandlerFn::new(handler));
        again.run(CancellationToken::new()).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(count(&s), 2);
    }

    #[tokio::test]
    async fn cancellation_interrupts_a_blocked_read() {
        let s = streams();
        let w = Arc::new(ConsumerWorker::new(
            Arc::clone(&s),
            ConsumerOptions::new("g", "c1")
                .with_block(Block::Forever)
                .with_drain(false),
            HandlerFn::new(|_e: Entry| async { Ok::<_, WorkerError>(Outcome::Ack) }),
        ));

        let token = CancellationToken::new();
        let run = {
            let w = Arc::clone(&w);
            let token = token.clone();
            tokio::spawn(async move { w.run(token).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();

        assert!(matches!(run.await.unwrap(), Err(WorkerError::Canceled)));
    }

    #[tokio::test]
    async fn closed_context_is_fatal() {
        let s = streams();
        s.close();
        let w = ConsumerWorker::new(
            Arc::clone(&s),
            opts("c1"),
            HandlerFn::new(|_e: Entry| async { Ok::<_, WorkerError>(Outcome::Ack) }),
        );
        let err = w.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, WorkerError::Fatal { .. }));
    }
}
