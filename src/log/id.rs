//! # Entry identifiers.
//!
//! [`EntryId`] is a `(milliseconds, sequence)` pair rendered as `"<ms>-<seq>"`.
//! Ids are totally ordered, first by `ms`, then by `seq`; `0-0` sorts before
//! every id a log can assign and is used as "before the first entry".
//!
//! [`StartId`] is the starting position of a consumer group: either an explicit
//! id or [`StartId::Latest`] (`"$"`), the log head at creation time.

use std::fmt;
use std::str::FromStr;

use crate::error::StreamError;

/// Strictly ordered identifier of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct EntryId {
    /// Wall-clock milliseconds at append time.
    pub ms: u64,
    /// Tie breaker for entries appended within the same millisecond.
    pub seq: u64,
}

impl EntryId {
    /// The id before every assignable id.
    pub const ZERO: EntryId = EntryId { ms: 0, seq: 0 };

    /// Creates an id from its parts.
    pub const fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Returns the id a log assigns after `self` when the clock reads `now_ms`.
    ///
    /// If the clock moved forward the sequence restarts at 0, otherwise
    /// (same millisecond or clock went backwards) the sequence is bumped.
    pub fn successor(self, now_ms: u64) -> Self {
        if now_ms > self.ms {
            Self { ms: now_ms, seq: 0 }
        } else if self.seq == u64::MAX {
            Self {
                ms: self.ms.saturating_add(1),
                seq: 0,
            }
        } else {
            Self {
                ms: self.ms,
                seq: self.seq + 1,
            }
        }
    }

    /// True for `0-0`.
    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.ms, self.seq)
    }
}

impl FromStr for EntryId {
    type Err = StreamError;

    /// Accepts `"<ms>-<seq>"` and the shorthand `"<ms>"` (sequence 0).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || StreamError::InvalidEntryId {
            input: s.to_string(),
        };
        let (ms, seq) = match s.split_once('-') {
            Some((ms, seq)) => (ms, seq),
            None => (s, "0"),
        };
        let ms = ms.parse::<u64>().map_err(|_| invalid())?;
        let seq = seq.parse::<u64>().map_err(|_| invalid())?;
        Ok(Self { ms, seq })
    }
}

/// Where a newly created group starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartId {
    /// Deliver every entry with an id greater than this one.
    Id(EntryId),
    /// Deliver only entries appended after the group was created.
    Latest,
}

impl StartId {
    /// Start from the beginning of the log.
    pub const BEGINNING: StartId = StartId::Id(EntryId::ZERO);
}

impl Default for StartId {
    fn default() -> Self {
        StartId::BEGINNING
    }
}

impl From<EntryId> for StartId {
    fn from(id: EntryId) -> Self {
        StartId::Id(id)
    }
}

impl FromStr for StartId {
    type Err = StreamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "$" {
            Ok(StartId::Latest)
        } else {
            s.parse().map(StartId::Id)
        }
    }
}

impl fmt::Display for StartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartId::Id(id) => id.fmt(f),
            StartId::Latest => f.write_str("$"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_and_shorthand_forms() {
        assert_eq!("0".parse::<EntryId>().unwrap(), EntryId::ZERO);
        assert_eq!(
            "1626817438793-0".parse::<EntryId>().unwrap(),
            EntryId::new(1626817438793, 0)
        );
        assert_eq!("12-7".parse::<EntryId>().unwrap(), EntryId::new(12, 7));
        assert_eq!(EntryId::new(12, 7).to_string(), "12-7");
    }

    #[test]
    fn rejects_garbage() {
        for bad in ["", "-", "a-1", "1-b", "1-2-3", "-5"] {
            let err = bad.parse::<EntryId>().unwrap_err();
            assert_eq!(err.as_label(), "stream_invalid_entry_id", "input {bad:?}");
        }
    }

    #[test]
    fn ordering_is_ms_then_seq() {
        assert!(EntryId::new(1, 9) < EntryId::new(2, 0));
        assert!(EntryId::new(2, 0) < EntryId::new(2, 1));
        assert!(EntryId::ZERO < EntryId::new(0, 1));
    }

    #[test]
    fn successor_is_strictly_greater_even_when_clock_stalls_or_rewinds() {
        let id = EntryId::new(100, 3);
        assert_eq!(id.successor(150), EntryId::new(150, 0));
        assert_eq!(id.successor(100), EntryId::new(100, 4));
        assert_eq!(id.successor(50), EntryId::new(100, 4));
        assert!(EntryId::new(7, u64::MAX).successor(7) > EntryId::new(7, u64::MAX));
    }

    #[test]
    fn start_id_parses_dollar_as_latest() {
        assert_eq!("$".parse::<StartId>().unwrap(), StartId::Latest);
        assert_eq!("0".parse::<StartId>().unwrap(), StartId::BEGINNING);
        assert_eq!(StartId::Latest.to_string(), "$");
    }
}
