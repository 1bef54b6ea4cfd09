//! # Consumer group: cursor, dispatch, recovery and acknowledgment.
//!
//! A [`ConsumerGroup`] is a named read position over the log plus its pending
//! entry table. All mutable state sits behind one `parking_lot::Mutex` that is
//! never held across an `.await`.
//!
//! ## Dispatch ("new" mode)
//! ```text
//! loop {
//!   ├─► waiter.mark_seen()
//!   ├─► lock: register consumer, read cursor C, unlock
//!   ├─► store.range_after(C, max_count)             (no lock held)
//!   │     ├─ empty ─► waiter.wait() ─► retry | return []
//!   │     └─ batch ─► lock:
//!   │                   ├─ cursor still C ─► advance cursor + insert PET records ─► return batch
//!   │                   └─ cursor moved   ─► unlock, retry (someone else claimed)
//! }
//! ```
//! The compare-and-claim under the lock is the single-writer gate: the cursor
//! only moves forward while the lock is held and only if nobody moved it since
//! the batch was read, so two callers can never claim the same id.
//!
//! ## Recovery ("self-pending" mode)
//! Re-reads the caller's own PET records in id order, bumping their delivery
//! counts. Never blocks and never looks at the log.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use std::time::SystemTime;

use parking_lot::Mutex;

use crate::error::StreamError;
use crate::log::read::AppendWaiter;
use crate::log::{Block, Entry, EntryId, LogStore};

use super::pending::{PendingRecord, PendingTable};

/// Point-in-time snapshot of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupStats {
    /// Group name.
    pub name: String,
    /// Consumers known to the group.
    pub consumers: usize,
    /// Size of the pending entry table.
    pub pending: usize,
    /// The group cursor.
    pub last_delivered: EntryId,
}

/// Point-in-time view of one consumer of a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerInfo {
    pub name: String,
    /// Pending records owned by this consumer.
    pub pending: usize,
    /// Last time the consumer asked the group for work.
    pub seen_at: SystemTime,
}

#[derive(Debug)]
struct GroupState {
    cursor: EntryId,
    pending: PendingTable,
    consumers: BTreeMap<Arc<str>, SystemTime>,
}

impl GroupState {
    /// Registers `consumer` (if new) and refreshes its last-seen time.
    fn touch(&mut self, consumer: &str, now: SystemTime) -> Arc<str> {
        match self.consumers.get_key_value(consumer) {
            Some((name, _)) => {
                let name = Arc::clone(name);
                self.consumers.insert(Arc::clone(&name), now);
                name
            }
            None => {
                let name: Arc<str> = Arc::from(consumer);
                self.consumers.insert(Arc::clone(&name), now);
                name
            }
        }
    }

    /// Advances the cursor over `batch` and records each entry as pending.
    fn claim(&mut self, owner: Arc<str>, batch: Vec<Entry>, now: SystemTime) -> Vec<Entry> {
        for entry in &batch {
            debug_assert!(entry.id() > self.cursor, "claim must move the cursor forward");
            self.cursor = entry.id();
            self.pending.insert(entry.clone(), Arc::clone(&owner), now);
        }
        batch
    }
}

/// A named cursor over the log with its pending entry table.
#[derive(Debug)]
pub struct ConsumerGroup {
    name: Arc<str>,
    state: Mutex<GroupState>,
}

impl ConsumerGroup {
    /// Creates a group positioned at `cursor`.
    pub(crate) fn new(name: impl Into<Arc<str>>, cursor: EntryId) -> Self {
        Self {
            name: name.into(),
            state: Mutex::new(GroupState {
                cursor,
                pending: PendingTable::default(),
                consumers: BTreeMap::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last delivered id.
    pub fn cursor(&self) -> EntryId {
        self.state.lock().cursor
    }

    /// Hands never-delivered entries past the cursor to `consumer`.
    ///
    /// Returns at most `max_count` entries (`0` = no limit) in id order. With
    /// nothing past the cursor the call waits per `block` and may return an
    /// empty batch, which means "idle".
    pub async fn request_new(
        &self,
        store: &dyn LogStore,
        consumer: &str,
        max_count: usize,
        block: Block,
    ) -> Result<Vec<Entry>, StreamError> {
        let mut waiter = AppendWaiter::new(store.subscribe(), block);
        loop {
            waiter.mark_seen();
            let (owner, seen_cursor) = {
                let mut st = self.state.lock();
                let owner = st.touch(consumer, SystemTime::now());
                (owner, st.cursor)
            };

            let batch = store.range_after(seen_cursor, max_count).await?;
            if !batch.is_empty() {
                let mut st = self.state.lock();
                if st.cursor == seen_cursor {
                    return Ok(st.claim(owner, batch, SystemTime::now()));
                }
                // Lost the race for this window; read again past the new cursor.
                continue;
            }

            if !waiter.wait().await? {
                return Ok(batch);
            }
        }
    }

    /// Re-delivers every entry still pending for `consumer`, ascending by id.
    pub fn request_own_pending(&self, consumer: &str) -> Vec<Entry> {
        self.request_own_pending_except(consumer, &HashSet::new())
    }

    /// Like [`request_own_pending`](Self::request_own_pending), but ids in
    /// `skip` are neither returned nor counted as delivered.
    pub fn request_own_pending_except(
        &self,
        consumer: &str,
        skip: &HashSet<EntryId>,
    ) -> Vec<Entry> {
        let now = SystemTime::now();
        let mut st = self.state.lock();
        st.touch(consumer, now);
        st.pending.redeliver(consumer, skip, now)
    }

    /// Removes `id` from the pending table. `false` if it was not pending.
    pub fn ack(&self, id: EntryId) -> bool {
        self.state.lock().pending.remove(id)
    }

    /// Acknowledges several ids under one lock; returns the ids that were
    /// pending, in call order.
    pub fn ack_many(&self, ids: &[EntryId]) -> Vec<EntryId> {
        let mut st = self.state.lock();
        ids.iter().copied().filter(|id| st.pending.remove(*id)).collect()
    }

    /// Consistent snapshot of cursor, pending size and consumer count.
    pub fn stats(&self) -> GroupStats {
        let st = self.state.lock();
        GroupStats {
            name: self.name.to_string(),
            consumers: st.consumers.len(),
            pending: st.pending.len(),
            last_delivered: st.cursor,
        }
    }

    /// Consumers known to the group, sorted by name.
    pub fn consumers(&self) -> Vec<ConsumerInfo> {
        let st = self.state.lock();
        st.consumers
            .iter()
            .map(|(name, seen_at)| ConsumerInfo {
                name: name.to_string(),
                pending: st.pending.owned_by(name),
                seen_at: *seen_at,
            })
            .collect()
    }

    /// Every pending record, ascending by id.
    pub fn pending(&self) -> Vec<PendingRecord> {
        self.state.lock().pending.records().cloned().collect()
    }

    /// The pending record for `id`, if any.
    pub fn pending_record(&self, id: EntryId) -> Option<PendingRecord> {
        self.state.lock().pending.get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::time::Duration;

    use super::*;
    use crate::log::{Fields, MemoryLog};

    async fn log_with(n: u32) -> (Arc<MemoryLog>, Vec<EntryId>) {
        let log = Arc::new(MemoryLog::new());
        let mut ids = Vec::new();
        for i in 0..n {
            ids.push(
                log.append(Fields::from([("worker_id", (2000 + i).to_string())]))
                    .await
                    .unwrap(),
            );
        }
        (log, ids)
    }

    #[tokio::test]
    async fn new_entries_go_to_exactly_one_consumer() {
        let (log, ids) = log_with(2).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);

        let a = group.request_new(&*log, "c1", 1, Block::No).await.unwrap();
        let b = group.request_new(&*log, "c2", 1, Block::No).await.unwrap();
        let c = group.request_new(&*log, "c3", 1, Block::No).await.unwrap();

        assert_eq!(a.iter().map(Entry::id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(b.iter().map(Entry::id).collect::<Vec<_>>(), vec![ids[1]]);
        assert!(c.is_empty());

        assert_eq!(group.pending_record(ids[0]).unwrap().owner(), "c1");
        assert_eq!(group.pending_record(ids[1]).unwrap().owner(), "c2");
        assert_eq!(group.cursor(), ids[1]);
    }

    #[tokio::test]
    async fn zero_max_count_takes_everything() {
        let (log, ids) = log_with(4).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);
        let got = group.request_new(&*log, "c1", 0, Block::No).await.unwrap();
        assert_eq!(got.len(), 4);
        assert_eq!(group.cursor(), ids[3]);
        assert_eq!(group.stats().pending, 4);
    }

    #[tokio::test]
    async fn recovery_bumps_delivery_count_for_owner_only() {
        let (log, ids) = log_with(2).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);
        group.request_new(&*log, "c1", 1, Block::No).await.unwrap();
        group.request_new(&*log, "c2", 1, Block::No).await.unwrap();

        let again = group.request_own_pending("c1");
        assert_eq!(again.iter().map(Entry::id).collect::<Vec<_>>(), vec![ids[0]]);
        assert_eq!(group.pending_record(ids[0]).unwrap().delivery_count(), 2);
        assert_eq!(group.pending_record(ids[1]).unwrap().delivery_count(), 1);

        group.request_own_pending("c1");
        assert_eq!(group.pending_record(ids[0]).unwrap().delivery_count(), 3);
    }

    #[tokio::test]
    async fn ack_is_idempotent_and_stops_recovery() {
        let (log, ids) = log_with(1).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);
        group.request_new(&*log, "c1", 1, Block::No).await.unwrap();

        assert!(group.ack(ids[0]));
        assert!(!group.ack(ids[0]));
        assert!(group.request_own_pending("c1").is_empty());
        assert!(!group.ack(EntryId::new(1, 1)));
    }

    #[tokio::test]
    async fn ack_many_counts_only_pending_ids() {
        let (log, ids) = log_with(3).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);
        group.request_new(&*log, "c1", 2, Block::No).await.unwrap();
        let acked = group.ack_many(&[ids[0], ids[1], ids[2], ids[0]]);
        assert_eq!(acked, vec![ids[0], ids[1]]);
        assert_eq!(group.stats().pending, 0);
    }

    #[tokio::test]
    async fn stats_and_consumers_reflect_requests() {
        let (log, ids) = log_with(3).await;
        let group = ConsumerGroup::new("g", EntryId::ZERO);
        group.request_new(&*log, "c2", 2, Block::No).await.unwrap();
        group.request_own_pending("c1");

        assert_eq!(
            group.stats(),
            GroupStats {
                name: "g".into(),
                consumers: 2,
                pending: 2,
                last_delivered: ids[1],
            }
        );
        let consumers = group.consumers();
        let names: Vec<_> = consumers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c1", "c2"]);
        assert_eq!(consumers[0].pending, 0);
        assert_eq!(consumers[1].pending, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_consumers_never_share_an_entry() {
        let (log, ids) = log_with(200).await;
        let group = Arc::new(ConsumerGroup::new("g", EntryId::ZERO));

        let mut handles = Vec::new();
        for c in 0..8 {
            let log = Arc::clone(&log);
            let group = Arc::clone(&group);
            handles.push(tokio::spawn(async move {
                let name = format!("c{c}");
                let mut got = Vec::new();
                loop {
                    let batch = group
                        .request_new(&*log, &name, 3, Block::No)
                        .await
                        .unwrap();
                    if batch.is_empty() {
                        break;
                    }
                    got.extend(batch.iter().map(Entry::id));
                }
                (name, got)
            }));
        }

        let mut seen = HashSet::new();
        for h in handles {
            let (name, got) = h.await.unwrap();
            assert!(got.windows(2).all(|w| w[0] < w[1]), "{name} got out of order");
            for id in got {
                assert!(seen.insert(id), "{id} delivered twice");
                assert_eq!(group.pending_record(id).unwrap().owner(), name);
            }
        }
        assert_eq!(seen.len(), ids.len());
    }

    #[tokio::test(start_paused = true)]
    async fn blocked_request_picks_up_late_append() {
        let log = Arc::new(MemoryLog::new());
        let group = Arc::new(ConsumerGroup::new("g", EntryId::ZERO));

        let waiter = {
            let log = Arc::clone(&log);
            let group = Arc::clone(&group);
            tokio::spawn(async move {
                group
                    .request_new(&*log, "c1", 1, Block::For(Duration::from_secs(5)))
                    .await
            })
        };
        tokio::time::sleep(Duration::from_millis(100)).await;
        let id = log.append(Fields::from([("w", "1")])).await.unwrap();

        let got = waiter.await.unwrap().unwrap();
        assert_eq!(got.iter().map(Entry::id).collect::<Vec<_>>(), vec![id]);
    }
}
