//! # In-process log store.
//!
//! [`MemoryLog`] keeps entries in a sorted `Vec` behind a `parking_lot::RwLock`
//! and publishes its head through a `tokio::sync::watch` channel.
//!
//! Ids come from the wall clock (milliseconds since the Unix epoch) through
//! [`EntryId::successor`], so they look like Redis stream ids and stay strictly
//! monotonic even if the clock stalls or steps back.
//!
//! The store can be switched unavailable with [`MemoryLog::set_available`] to
//! reproduce an outage of a real backend: every operation then fails with
//! [`StreamError::StoreUnavailable`] and blocked readers are woken.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::watch;

use crate::error::StreamError;

use super::entry::{Entry, Fields};
use super::id::EntryId;
use super::store::LogStore;

struct Inner {
    entries: Vec<Entry>,
    head: EntryId,
}

/// Append-only log held in memory.
pub struct MemoryLog {
    inner: RwLock<Inner>,
    head_tx: watch::Sender<EntryId>,
    available: AtomicBool,
}

impl MemoryLog {
    /// Creates an empty, available log.
    pub fn new() -> Self {
        let (head_tx, _rx) = watch::channel(EntryId::ZERO);
        Self {
            inner: RwLock::new(Inner {
                entries: Vec::new(),
                head: EntryId::ZERO,
            }),
            head_tx,
            available: AtomicBool::new(true),
        }
    }

    /// Marks the store reachable or unreachable.
    ///
    /// Receivers are always notified so blocked readers re-check availability.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        self.head_tx.send_modify(|_| {});
    }

    /// Number of entries currently held.
    pub fn len(&self) -> usize {
        self.inner.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_available(&self) -> Result<(), StreamError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StreamError::unavailable("memory log marked unavailable"))
        }
    }
}

impl Default for MemoryLog {
    fn default() -> Self {
        Self::new()
    }
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[async_trait]
impl LogStore for MemoryLog {
    async fn append(&self, fields: Fields) -> Result<EntryId, StreamError> {
        self.check_available()?;
        let id = {
            let mut inner = self.inner.write();
            let id = inner.head.successor(now_ms());
            inner.entries.push(Entry::new(id, fields));
            inner.head = id;
            id
        };
        self.head_tx.send_replace(id);
        Ok(id)
    }

    async fn range_after(
        &self,
        after: EntryId,
        max_count: usize,
    ) -> Result<Vec<Entry>, StreamError> {
        self.check_available()?;
        let inner = self.inner.read();
        let start = inner.entries.partition_point(|e| e.id() <= after);
        let tail = &inner.entries[start..];
        let take = match max_count {
            0 => tail.len(),
            n => n.min(tail.len()),
        };
        Ok(tail[..take].to_vec())
    }

    async fn head(&self) -> Result<EntryId, StreamError> {
        self.check_available()?;
        Ok(self.inner.read().head)
    }

    fn subscribe(&self) -> watch::Receiver<EntryId> {
        self.head_tx.subscribe()
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(n: u32) -> Fields {
        Fields::from([("worker_id", n.to_string())])
    }

    #[tokio::test]
    async fn append_assigns_strictly_increasing_ids() {
        let log = MemoryLog::new();
        let mut prev = EntryId::ZERO;
        for n in 0..50 {
            let id = log.append(job(n)).await.unwrap();
            assert!(id > prev);
            prev = id;
        }
        assert_eq!(log.head().await.unwrap(), prev);
        assert_eq!(log.len(), 50);
    }

    #[tokio::test]
    async fn range_after_is_exclusive_and_bounded() {
        let log = MemoryLog::new();
        let mut ids = Vec::new();
        for n in 0..5 {
            ids.push(log.append(job(n)).await.unwrap());
        }

        let all = log.range_after(EntryId::ZERO, 0).await.unwrap();
        assert_eq!(all.len(), 5);

        let two = log.range_after(ids[1], 2).await.unwrap();
        let got: Vec<_> = two.iter().map(Entry::id).collect();
        assert_eq!(got, vec![ids[2], ids[3]]);

        assert!(log.range_after(ids[4], 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unavailable_store_fails_every_operation() {
        let log = MemoryLog::new();
        log.set_available(false);
        assert!(matches!(
            log.append(job(1)).await,
            Err(StreamError::StoreUnavailable { .. })
        ));
        assert!(log.range_after(EntryId::ZERO, 1).await.is_err());
        assert!(log.head().await.is_err());

        log.set_available(true);
        assert!(log.append(job(1)).await.is_ok());
    }

    #[tokio::test]
    async fn subscribers_see_new_head() {
        let log = MemoryLog::new();
        let mut rx = log.subscribe();
        let id = log.append(job(1)).await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(*rx.borrow_and_update(), id);
    }
}
