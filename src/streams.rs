//! # Streams: the explicit context object of the delivery protocol.
//!
//! A [`Streams`] value owns a handle to the log store, the consumer-group
//! registry and the event bus. Every producer and consumer receives it (usually
//! as `Arc<Streams>`); there is no process-wide state.
//!
//! ## Operations
//! ```text
//! producer ── append(fields) ───────────────────────► LogStore
//! consumer ── create_group(name, start) ────────────► GroupRegistry   (idempotent)
//!          ── request_new(group, consumer, n, block) ► ConsumerGroup   (may suspend)
//!          ── request_own_pending(group, consumer) ──► ConsumerGroup   (never suspends)
//!          ── ack(group, id) ────────────────────────► ConsumerGroup   (idempotent)
//! observer ── stats / groups / consumers / pending ──► snapshots
//! ```
//!
//! Every state change is published on the [`Bus`] as a protocol [`Event`].
//!
//! ## Lifecycle
//! [`Streams::open`] starts a context, [`Streams::close`] ends it: later calls
//! fail with [`StreamError::Closed`] and suspended reads are released with the
//! same error. Closing does not touch the store.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskstream::{Block, Fields, MemoryLog, StartId, Streams};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), taskstream::StreamError> {
//! let streams = Streams::open(Arc::new(MemoryLog::new()));
//! streams.create_group("workers", StartId::BEGINNING).await?;
//!
//! let id = streams.append(Fields::from([("worker_id", "2000")])).await?;
//! let batch = streams.request_new("workers", "consumer-1", 1, Block::No).await?;
//! assert_eq!(batch[0].id(), id);
//!
//! assert!(streams.ack("workers", id)?);
//! assert!(!streams.ack("workers", id)?);
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::error::StreamError;
use crate::events::{Bus, Event, EventKind};
use crate::group::{
    ConsumerGroup, ConsumerInfo, GroupCreation, GroupRegistry, GroupStats, PendingRecord,
};
use crate::log::{self, Block, Entry, EntryId, Fields, LogStore, StartId};

/// Store handle + group registry + event bus.
pub struct Streams {
    store: Arc<dyn LogStore>,
    groups: GroupRegistry,
    bus: Bus,
    closed: CancellationToken,
}

impl Streams {
    /// Opens a context over `store` with a private event bus.
    pub fn open(store: Arc<dyn LogStore>) -> Self {
        Self::open_with_bus(store, Bus::default())
    }

    /// Opens a context publishing its events on `bus`
    /// (typically [`Supervisor::bus`](crate::Supervisor::bus)).
    pub fn open_with_bus(store: Arc<dyn LogStore>, bus: Bus) -> Self {
        Self {
            store,
            groups: GroupRegistry::new(),
            bus,
            closed: CancellationToken::new(),
        }
    }

    /// Closes the context and releases suspended reads.
    pub fn close(&self) {
        self.closed.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.is_cancelled()
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    /// Appends an entry to the log.
    pub async fn append(&self, fields: Fields) -> Result<EntryId, StreamError> {
        self.ensure_open()?;
        let id = self.store.append(fields).await?;
        self.bus
            .publish(Event::new(EventKind::EntryAppended).with_entry(id));
        Ok(id)
    }

    /// Reads past `after` without any group bookkeeping.
    pub async fn read_after(
        &self,
        after: EntryId,
        max_count: usize,
        block: Block,
    ) -> Result<Vec<Entry>, StreamError> {
        self.ensure_open()?;
        self.until_closed(log::read_after(self.store.as_ref(), after, max_count, block))
            .await
    }

    /// Creates `name` unless it exists.
    ///
    /// The cursor starts at `start`, clamped to the current head. An existing
    /// group is left untouched and reported as [`GroupCreation::Existing`].
    pub async fn create_group(
        &self,
        name: &str,
        start: StartId,
    ) -> Result<GroupCreation, StreamError> {
        self.ensure_open()?;
        let head = self.store.head().await?;
        let cursor = match start {
            StartId::Latest => head,
            StartId::Id(id) => id.min(head),
        };

        let created = self.groups.create(name, cursor);
        let ev = match created {
            GroupCreation::Created => Event::new(EventKind::GroupCreated).with_entry(cursor),
            GroupCreation::Existing => Event::new(EventKind::GroupExists),
        };
        self.bus.publish(ev.with_group(name));
        Ok(created)
    }

    /// Hands entries never delivered to any member of `group` to `consumer`.
    ///
    /// See [`ConsumerGroup::request_new`]. An empty batch means idle.
    pub async fn request_new(
        &self,
        group: &str,
        consumer: &str,
        max_count: usize,
        block: Block,
    ) -> Result<Vec<Entry>, StreamError> {
        let g = self.group(group)?;
        let batch = self
            .until_closed(g.request_new(self.store.as_ref(), consumer, max_count, block))
            .await?;
        if let Some(last) = batch.last() {
            self.bus.publish(
                Event::new(EventKind::EntriesDelivered)
                    .with_group(group)
                    .with_consumer(consumer)
                    .with_count(batch.len())
                    .with_entry(last.id()),
            );
        }
        Ok(batch)
    }

    /// Returns `consumer`'s own unacknowledged entries again, ascending by id.
    pub fn request_own_pending(
        &self,
        group: &str,
        consumer: &str,
    ) -> Result<Vec<Entry>, StreamError> {
        self.request_own_pending_except(group, consumer, &HashSet::new())
    }

    /// Own-pending recovery that leaves the ids in `skip` alone: they are not
    /// returned and their delivery counts do not move.
    pub fn request_own_pending_except(
        &self,
        group: &str,
        consumer: &str,
        skip: &HashSet<EntryId>,
    ) -> Result<Vec<Entry>, StreamError> {
        let batch = self
            .group(group)?
            .request_own_pending_except(consumer, skip);
        if !batch.is_empty() {
            self.bus.publish(
                Event::new(EventKind::EntriesRedelivered)
                    .with_group(group)
                    .with_consumer(consumer)
                    .with_count(batch.len()),
            );
        }
        Ok(batch)
    }

    /// Acknowledges `id`. `Ok(false)` if it was not pending (already acked or
    /// never delivered to this group).
    pub fn ack(&self, group: &str, id: EntryId) -> Result<bool, StreamError> {
        let removed = self.group(group)?.ack(id);
        if removed {
            self.bus.publish(
                Event::new(EventKind::EntryAcked)
                    .with_group(group)
                    .with_entry(id),
            );
        }
        Ok(removed)
    }

    /// Acknowledges several ids; returns how many were pending.
    pub fn ack_many(&self, group: &str, ids: &[EntryId]) -> Result<usize, StreamError> {
        let acked = self.group(group)?.ack_many(ids);
        for id in &acked {
            self.bus.publish(
                Event::new(EventKind::EntryAcked)
                    .with_group(group)
                    .with_entry(*id),
            );
        }
        Ok(acked.len())
    }

    /// Atomic snapshot of one group.
    pub fn stats(&self, group: &str) -> Result<GroupStats, StreamError> {
        Ok(self.group(group)?.stats())
    }

    /// Snapshots of every group, sorted by name.
    pub fn groups(&self) -> Result<Vec<GroupStats>, StreamError> {
        self.ensure_open()?;
        Ok(self.groups.stats())
    }

    /// Consumers known to `group`, sorted by name.
    pub fn consumers(&self, group: &str) -> Result<Vec<ConsumerInfo>, StreamError> {
        Ok(self.group(group)?.consumers())
    }

    /// Pending entry table of `group`, ascending by id.
    pub fn pending(&self, group: &str) -> Result<Vec<PendingRecord>, StreamError> {
        Ok(self.group(group)?.pending())
    }

    /// Direct handle to a group.
    pub fn group(&self, name: &str) -> Result<Arc<ConsumerGroup>, StreamError> {
        self.ensure_open()?;
        self.groups.get(name)
    }

    fn ensure_open(&self) -> Result<(), StreamError> {
        if self.is_closed() {
            Err(StreamError::Closed)
        } else {
            Ok(())
        }
    }

    async fn until_closed<T>(
        &self,
        fut: impl Future<Output = Result<T, StreamError>>,
    ) -> Result<T, StreamError> {
        tokio::select! {
            res = fut => res,
            _ = self.closed.cancelled() => Err(StreamError::Closed),
        }
    }
}
