//! # Consumer group registry.
//!
//! Owns every [`ConsumerGroup`] of one log by name. Creation is idempotent:
//! asking for a group that already exists is a normal startup path and returns
//! [`GroupCreation::Existing`] without touching the existing state.
//!
//! Groups are independent: the registry lock only guards the name map and is
//! released before any group operation runs.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StreamError;
use crate::log::EntryId;

use super::group::{ConsumerGroup, GroupStats};

/// Outcome of an idempotent group creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupCreation {
    /// A new group was created at the requested position.
    Created,
    /// The group already existed; its state was left untouched.
    Existing,
}

impl GroupCreation {
    pub fn is_created(self) -> bool {
        matches!(self, GroupCreation::Created)
    }
}

/// Name → group map.
#[derive(Debug, Default)]
pub struct GroupRegistry {
    groups: RwLock<HashMap<String, Arc<ConsumerGroup>>>,
}

impl GroupRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `name` positioned at `cursor` unless it already exists.
    pub fn create(&self, name: &str, cursor: EntryId) -> GroupCreation {
        if self.groups.read().contains_key(name) {
            return GroupCreation::Existing;
        }
        let mut groups = self.groups.write();
        if groups.contains_key(name) {
            return GroupCreation::Existing;
        }
        groups.insert(name.to_string(), Arc::new(ConsumerGroup::new(name, cursor)));
        GroupCreation::Created
    }

    /// Looks up `name`, failing with [`StreamError::UnknownGroup`].
    pub fn get(&self, name: &str) -> Result<Arc<ConsumerGroup>, StreamError> {
        self.groups
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| StreamError::unknown_group(name))
    }

    /// Stats of every group, sorted by name.
    pub fn stats(&self) -> Vec<GroupStats> {
        let groups: Vec<Arc<ConsumerGroup>> = self.groups.read().values().cloned().collect();
        let mut out: Vec<GroupStats> = groups.iter().map(|g| g.stats()).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_create_keeps_first_position() {
        let reg = GroupRegistry::new();
        assert_eq!(reg.create("g", EntryId::new(5, 0)), GroupCreation::Created);
        assert_eq!(reg.create("g", EntryId::new(9, 0)), GroupCreation::Existing);
        assert_eq!(reg.get("g").unwrap().cursor(), EntryId::new(5, 0));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn unknown_group_is_an_error() {
        let reg = GroupRegistry::new();
        let err = reg.get("missing").unwrap_err();
        assert_eq!(err, StreamError::unknown_group("missing"));
    }

    #[test]
    fn stats_are_sorted_by_name() {
        let reg = GroupRegistry::new();
        reg.create("b", EntryId::ZERO);
        reg.create("a", EntryId::ZERO);
        let names: Vec<_> = reg.stats().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
