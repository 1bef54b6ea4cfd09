//! # Blocking reads over a [`LogStore`].
//!
//! [`Block`] selects how long a read may suspend when nothing is available.
//! [`AppendWaiter`] is the wake-up primitive shared by plain reads
//! ([`read_after`]) and group dispatch: it watches the store's head channel so
//! an append racing with an empty read is never missed.
//!
//! ## Flow
//! ```text
//! loop {
//!   ├─► waiter.mark_seen()           (everything up to now is observed)
//!   ├─► range_after(...)             (non-blocking)
//!   │     └─ non-empty ─► return batch
//!   └─► waiter.wait()
//!         ├─ head changed   ─► retry
//!         └─ deadline hit   ─► return []   (idle, not an error)
//! }
//! ```

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

use crate::error::StreamError;

use super::entry::Entry;
use super::id::EntryId;
use super::store::LogStore;

/// How long a read may wait for new entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Block {
    /// Return immediately, possibly with an empty batch.
    #[default]
    No,
    /// Wait up to the given duration.
    For(Duration),
    /// Wait until an entry arrives.
    Forever,
}

impl Block {
    /// Shorthand for `Block::For(Duration::from_millis(ms))`.
    pub fn millis(ms: u64) -> Self {
        Block::For(Duration::from_millis(ms))
    }

    fn deadline(self) -> Option<Instant> {
        match self {
            Block::For(d) => Some(Instant::now() + d),
            Block::No | Block::Forever => None,
        }
    }
}

/// Waits for the log head to move, bounded by a [`Block`] mode.
pub(crate) struct AppendWaiter {
    rx: watch::Receiver<EntryId>,
    block: Block,
    deadline: Option<Instant>,
}

impl AppendWaiter {
    /// Starts the clock for `block`.
    pub(crate) fn new(rx: watch::Receiver<EntryId>, block: Block) -> Self {
        Self {
            rx,
            block,
            deadline: block.deadline(),
        }
    }

    /// Marks the current head as observed. Call right before reading.
    pub(crate) fn mark_seen(&mut self) {
        self.rx.borrow_and_update();
    }

    /// Suspends until the head changes after the last [`mark_seen`](Self::mark_seen).
    ///
    /// Returns `Ok(false)` when the caller should give up with an empty result
    /// (non-blocking mode or deadline elapsed).
    pub(crate) async fn wait(&mut self) -> Result<bool, StreamError> {
        let changed = match (self.block, self.deadline) {
            (Block::No, _) => return Ok(false),
            (_, Some(deadline)) => match time::timeout_at(deadline, self.rx.changed()).await {
                Ok(res) => res,
                Err(_elapsed) => return Ok(false),
            },
            (_, None) => self.rx.changed().await,
        };
        changed
            .map(|_| true)
            .map_err(|_| StreamError::unavailable("log store dropped"))
    }
}

/// Returns up to `max_count` entries with id `> after`, waiting per `block`.
///
/// An empty result after the wait is the normal "idle" outcome.
pub async fn read_after(
    store: &dyn LogStore,
    after: EntryId,
    max_count: usize,
    block: Block,
) -> Result<Vec<Entry>, StreamError> {
    let mut waiter = AppendWaiter::new(store.subscribe(), block);
    loop {
        waiter.mark_seen();
        let batch = store.range_after(after, max_count).await?;
        if !batch.is_empty() {
            return Ok(batch);
        }
        if !waiter.wait().await? {
            return Ok(batch);
        }
    }
}
