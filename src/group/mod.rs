//! Consumer groups: cursors, pending entry tables, dispatch and recovery.
//!
//! ## Contents
//! - [`ConsumerGroup`] cursor + PET with the "new" and "self-pending" read modes
//! - [`PendingRecord`] one delivered, unacknowledged entry
//! - [`GroupRegistry`], [`GroupCreation`] idempotent name → group map
//! - [`GroupStats`], [`ConsumerInfo`] read-only snapshots
//!
//! ## Entry lifecycle (per entry, per group)
//! ```text
//! Unseen ──request_new──► Delivered ──request_own_pending──► Redelivered ─┐
//!                             │                                   ▲       │
//!                             │                                   └───────┘
//!                             └───────────────ack─────────────► Acked (terminal)
//! ```

#[allow(clippy::module_inception)]
mod group;
mod pending;
mod registry;

pub use group::{ConsumerGroup, ConsumerInfo, GroupStats};
pub use pending::PendingRecord;
pub use registry::{GroupCreation, GroupRegistry};
