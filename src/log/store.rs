//! # Log store contract.
//!
//! [`LogStore`] is the seam to the external collaborator that owns the log:
//! an append-only, totally ordered sequence of [`Entry`] values. The store is
//! responsible for id assignment and for its own durability; the consumer-group
//! protocol only reads from it and never mutates existing entries.
//!
//! ## Contract
//! - `append` assigns an id strictly greater than every id assigned before.
//! - `range_after` never blocks; it returns what exists right now.
//! - `subscribe` hands out a [`watch::Receiver`] of the head id. The store must
//!   signal it after every append and when it becomes unavailable, so that
//!   blocked readers (see [`read`](super::read)) wake up and re-check.
//! - Any operation against an unreachable store fails with
//!   [`StreamError::StoreUnavailable`].

use async_trait::async_trait;
use tokio::sync::watch;

use crate::error::StreamError;

use super::entry::{Entry, Fields};
use super::id::EntryId;

/// Contract for an append-only log store.
#[async_trait]
pub trait LogStore: Send + Sync + 'static {
    /// Appends an entry and returns its newly assigned id.
    async fn append(&self, fields: Fields) -> Result<EntryId, StreamError>;

    /// Returns up to `max_count` entries with id `> after`, ascending.
    ///
    /// `max_count = 0` means no limit.
    async fn range_after(&self, after: EntryId, max_count: usize)
    -> Result<Vec<Entry>, StreamError>;

    /// Id of the most recent entry (`0-0` for an empty log).
    async fn head(&self) -> Result<EntryId, StreamError>;

    /// Receiver signalled on every append and on availability changes.
    fn subscribe(&self) -> watch::Receiver<EntryId>;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}
