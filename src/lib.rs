//! # taskstream
//!
//! **Taskstream** implements consumer-group delivery over an append-only task
//! log: many named consumers share one totally ordered log, every entry is
//! handed to exactly one consumer of a group, stays pending until it is
//! acknowledged, and is recoverable by its owner if processing never finishes.
//!
//! A small supervision harness runs producers and consumers as restartable
//! workers, so a consumer that crashes mid-entry is restarted under the same
//! name and picks its unacknowledged entries back up.
//!
//! ## Architecture
//! ### Protocol
//! ```text
//!  producer ── append ──►┌───────────────────────────────────────────────┐
//!                        │ Streams (explicit context, open/close)        │
//!                        │                                               │
//!                        │  LogStore (MemoryLog or external)             │
//!                        │  ┌──────┬──────┬──────┬──────┬──────┐         │
//!                        │  │ 1-0  │ 2-0  │ 3-0  │ 4-0  │ 5-0  │ ◄─ head │
//!                        │  └──────┴──────┴──────┴──────┴──────┘         │
//!                        │            ▲ cursor(g1)     ▲ cursor(g2)      │
//!                        │                                               │
//!                        │  GroupRegistry                                │
//!                        │   g1: cursor + PendingEntryTable              │
//!                        │   g2: cursor + PendingEntryTable              │
//!                        └───────┬───────────────────────┬───────────────┘
//!                                │ request_new           │ request_own_pending
//!                                ▼ (claims, may block)   ▼ (recovery, never blocks)
//!                            consumer c1 ... cN ── ack ──► PET
//! ```
//!
//! ### Harness
//! ```text
//!     WorkerSpec        WorkerSpec        WorkerSpec
//!   (producer)        (consumer c1)     (consumer c2)
//!         └────────────────┬────────────────┘
//!                          ▼
//! ┌──────────────────────────────────────────────────────┐
//! │ Supervisor                                           │
//! │  - WorkerActor per spec (restart, backoff, timeout)  │
//! │  - Bus (broadcast), shared with Streams              │
//! │  - AliveTracker (stuck workers on shutdown)          │
//! │  - SubscriberSet (per-subscriber queues)             │
//! └──────────────────────────┬───────────────────────────┘
//!                            ▼
//!                     Bus ──► listener ──► LogWriter (tracing), custom subscribers
//! ```
//!
//! ## Guarantees
//! - An entry is claimed by the "new" path at most once per group.
//! - Acknowledged entries never come back; unacknowledged ones stay pending
//!   and are redelivered only to their owner, with a growing delivery count.
//! - The "new" path delivers in strict id order across the whole group.
//! - Groups are independent; no lock spans two groups.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use taskstream::{Block, Fields, MemoryLog, StartId, Streams};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), taskstream::StreamError> {
//! let streams = Streams::open(Arc::new(MemoryLog::new()));
//! streams.create_group("consumer-group-1", StartId::BEGINNING).await?;
//!
//! let a1 = streams.append(Fields::from([("worker_id", "1")])).await?;
//!
//! // c1 gets the entry, c2 finds nothing new.
//! let got = streams.request_new("consumer-group-1", "c1", 1, Block::No).await?;
//! assert_eq!(got[0].id(), a1);
//! assert!(streams.request_new("consumer-group-1", "c2", 1, Block::No).await?.is_empty());
//!
//! // c1 never acked: its own pending read returns the entry again.
//! let again = streams.request_own_pending("consumer-group-1", "c1")?;
//! assert_eq!(again[0].id(), a1);
//! assert_eq!(streams.pending("consumer-group-1")?[0].delivery_count(), 2);
//!
//! assert!(streams.ack("consumer-group-1", a1)?);
//! # Ok(())
//! # }
//! ```

mod core;
mod error;
mod events;
mod group;
mod log;
mod policies;
mod streams;
mod subscribers;
mod workers;

// ---- Public re-exports ----

pub use crate::core::{Config, Supervisor};
pub use crate::error::{RuntimeError, StreamError, WorkerError};
pub use crate::events::{BackoffSource, Bus, Event, EventKind};
pub use crate::group::{ConsumerGroup, ConsumerInfo, GroupCreation, GroupStats, PendingRecord};
pub use crate::log::{Block, Entry, EntryId, Fields, LogStore, MemoryLog, StartId, read_after};
pub use crate::policies::{BackoffPolicy, JitterPolicy, RestartPolicy};
pub use crate::streams::Streams;
pub use crate::subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use crate::workers::{
    ConsumerOptions, ConsumerWorker, Handler, HandlerFn, Outcome, ProducerWorker, Worker,
    WorkerFn, WorkerRef, WorkerSpec,
};
