//! Append-only task log: ids, entries, the store contract and reads.
//!
//! ## Contents
//! - [`EntryId`], [`StartId`] identifiers and group start positions
//! - [`Entry`], [`Fields`] immutable log entries
//! - [`LogStore`] contract of the external store, [`MemoryLog`] in-process store
//! - [`Block`], [`read_after`] bounded blocking reads

mod entry;
mod id;
mod memory;
pub(crate) mod read;
mod store;

pub use entry::{Entry, Fields};
pub use id::{EntryId, StartId};
pub use memory::MemoryLog;
pub use read::{Block, read_after};
pub use store::LogStore;
