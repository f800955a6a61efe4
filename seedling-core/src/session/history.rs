//! Bounded announce history

use std::collections::VecDeque;

use super::snapshot::AnnounceSnapshot;

/// Number of announces kept when no capacity is configured.
pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Errors reading the announce history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HistoryError {
    #[error("Announce history is empty")]
    Empty,
}

/// Fixed-capacity FIFO of the most recent announce snapshots.
#[derive(Debug, Clone)]
pub struct AnnounceHistory {
    entries: VecDeque<AnnounceSnapshot>,
    capacity: usize,
}

impl Default for AnnounceHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

impl AnnounceHistory {
    /// Creates an empty history holding at most `capacity` snapshots.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be positive");
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a snapshot, evicting the oldest one when full.
    pub fn push(&mut self, snapshot: AnnounceSnapshot) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(snapshot);
    }

    /// Most recent snapshot.
    ///
    /// # Errors
    ///
    /// - `HistoryError::Empty` - If nothing was announced yet
    pub fn last(&self) -> Result<&AnnounceSnapshot, HistoryError> {
        self.entries.back().ok_or(HistoryError::Empty)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshots from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &AnnounceSnapshot> + Clone + '_ {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a AnnounceHistory {
    type Item = &'a AnnounceSnapshot;
    type IntoIter = std::collections::vec_deque::Iter<'a, AnnounceSnapshot>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
