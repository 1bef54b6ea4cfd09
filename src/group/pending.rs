//! # Pending entry table (PET).
//!
//! Per group, the set of entries delivered but not yet acknowledged. Each
//! [`PendingRecord`] remembers its owner, how many times it was handed out and
//! when it was last handed out.
//!
//! ## Rules
//! - Records are keyed by entry id; at most one record per id.
//! - An owner index keeps each consumer's ids sorted so the recovery path reads
//!   them in ascending order without scanning the whole table.
//! - Removing a record is the only way it leaves the table (acknowledgment).

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use crate::log::{Entry, EntryId};

/// A delivered, unacknowledged entry.
#[derive(Debug, Clone)]
pub struct PendingRecord {
    entry: Entry,
    owner: Arc<str>,
    delivery_count: u32,
    last_delivered_at: SystemTime,
}

impl PendingRecord {
    pub fn entry_id(&self) -> EntryId {
        self.entry.id()
    }

    /// The delivered entry (the payload is immutable, so it is kept here).
    pub fn entry(&self) -> &Entry {
        &self.entry
    }

    /// Consumer that owns the record.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Number of deliveries so far (1 = first delivery).
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    pub fn last_delivered_at(&self) -> SystemTime {
        self.last_delivered_at
    }

    /// Time elapsed since the last delivery, measured against `now`.
    pub fn idle(&self, now: SystemTime) -> Duration {
        now.duration_since(self.last_delivered_at)
            .unwrap_or(Duration::ZERO)
    }
}

/// Delivered-but-unacknowledged entries of one group.
#[derive(Debug, Default)]
pub(crate) struct PendingTable {
    records: BTreeMap<EntryId, PendingRecord>,
    by_owner: HashMap<Arc<str>, BTreeSet<EntryId>>,
}

impl PendingTable {
    /// Records the first delivery of `entry` to `owner`.
    ///
    /// Returns `false` (and changes nothing) if the id is already pending.
    pub(crate) fn insert(&mut self, entry: Entry, owner: Arc<str>, now: SystemTime) -> bool {
        let id = entry.id();
        if self.records.contains_key(&id) {
            return false;
        }
        self.by_owner
            .entry(Arc::clone(&owner))
            .or_default()
            .insert(id);
        self.records.insert(
            id,
            PendingRecord {
                entry,
                owner,
                delivery_count: 1,
                last_delivered_at: now,
            },
        );
        true
    }

    /// Redelivers every record owned by `owner` whose id is not in `skip`,
    /// ascending by id.
    ///
    /// Each returned record has its delivery count bumped by one and its
    /// delivery time refreshed. Skipped records are left untouched.
    pub(crate) fn redeliver(
        &mut self,
        owner: &str,
        skip: &HashSet<EntryId>,
        now: SystemTime,
    ) -> Vec<Entry> {
        let Some(ids) = self.by_owner.get(owner) else {
            return Vec::new();
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids.iter().filter(|id| !skip.contains(id)) {
            if let Some(rec) = self.records.get_mut(id) {
                rec.delivery_count = rec.delivery_count.saturating_add(1);
                rec.last_delivered_at = now;
                out.push(rec.entry.clone());
            }
        }
        out
    }

    /// Removes the record for `id`. Returns whether one existed.
    pub(crate) fn remove(&mut self, id: EntryId) -> bool {
        let Some(rec) = self.records.remove(&id) else {
            return false;
        };
        if let Some(ids) = self.by_owner.get_mut(&rec.owner) {
            ids.remove(&id);
            if ids.is_empty() {
                self.by_owner.remove(&rec.owner);
            }
        }
        true
    }

    pub(crate) fn get(&self, id: EntryId) -> Option<&PendingRecord> {
        self.records.get(&id)
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    /// Number of records owned by `owner`.
    pub(crate) fn owned_by(&self, owner: &str) -> usize {
        self.by_owner.get(owner).map_or(0, BTreeSet::len)
    }

    /// All records in id order.
    pub(crate) fn records(&self) -> impl Iterator<Item = &PendingRecord> {
        self.records.values()
    }
}
