//! Sorted container of pending messages, ordered by absolute due time.
//!
//! [`OrderedMessageList`] is the leaf structure under [`MessageQueue`]'s
//! lock: a sequence of [`Scheduled`] entries kept sorted ascending by due
//! time, ties broken first-in-first-out. It does no I/O and never blocks;
//! all synchronization is the owning queue's responsibility, so every
//! method here must be called with the queue lock held.
//!
//! [`MessageQueue`]: crate::queue::MessageQueue

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use crate::message::Message;

/// A pending entry: a message plus the absolute due time stamped at
/// enqueue. The due time lives here, not on the message, so shared
/// `Arc<Message>` handles stay immutable.
#[derive(Debug, Clone)]
pub struct Scheduled {
    /// Absolute monotonic timestamp at which the message becomes eligible
    /// for delivery.
    pub due: Instant,
    /// The scheduled message.
    pub message: Arc<Message>,
}

/// Mutation-only sorted list of pending messages.
///
/// Invariant: after any `insert` or `remove`, entries are sorted ascending
/// by `due`, and the head (if present) is the earliest-due entry. Among
/// equal due times, earlier insertions sort first.
#[derive(Debug, Default)]
pub struct OrderedMessageList {
    entries: VecDeque<Scheduled>,
}

impl OrderedMessageList {
    /// Create an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry immediately before the first entry whose due time
    /// is strictly greater, i.e. after any existing entries with an equal
    /// due time (FIFO among ties). Appends when no later entry exists.
    pub fn insert(&mut self, entry: Scheduled) {
        let at = self.entries.partition_point(|e| e.due <= entry.due);
        self.entries.insert(at, entry);
    }

    /// Remove and return the entry at `position`.
    ///
    /// # Panics
    ///
    /// Panics when `position` is out of bounds. Positions are only
    /// meaningful while the queue lock is held; a stale position is a
    /// caller contract violation.
    pub fn remove(&mut self, position: usize) -> Scheduled {
        let len = self.entries.len();
        match self.entries.remove(position) {
            Some(entry) => entry,
            None => panic!("remove position {position} out of bounds (len {len})"),
        }
    }

    /// Due time of the earliest-due entry, if any.
    #[must_use]
    pub fn head_due(&self) -> Option<Instant> {
        self.entries.front().map(|e| e.due)
    }

    /// Remove and return the earliest-due entry, if any.
    pub fn pop_head(&mut self) -> Option<Scheduled> {
        self.entries.pop_front()
    }

    /// Iterate entries in due order.
    pub fn iter(&self) -> impl Iterator<Item = &Scheduled> {
        self.entries.iter()
    }

    /// Number of pending entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::message::MessageTag;

    fn entry(base: Instant, offset_ms: u64, tag: u32) -> Scheduled {
        Scheduled {
            due: base + Duration::from_millis(offset_ms),
            message: Arc::new(Message::new(MessageTag(tag))),
        }
    }

    fn tags(list: &OrderedMessageList) -> Vec<u32> {
        list.iter().map(|e| e.message.tag().0).collect()
    }

    #[test]
    fn insert_keeps_due_order() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        list.insert(entry(base, 50, 1));
        list.insert(entry(base, 10, 2));
        list.insert(entry(base, 30, 3));
        assert_eq!(tags(&list), vec![2, 3, 1]);
    }

    #[test]
    fn equal_due_times_are_fifo() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        list.insert(entry(base, 10, 1));
        list.insert(entry(base, 10, 2));
        list.insert(entry(base, 10, 3));
        assert_eq!(tags(&list), vec![1, 2, 3]);
    }

    #[test]
    fn tie_inserts_after_equals_but_before_later() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        list.insert(entry(base, 10, 1));
        list.insert(entry(base, 20, 2));
        list.insert(entry(base, 10, 3));
        assert_eq!(tags(&list), vec![1, 3, 2]);
    }

    #[test]
    fn head_is_earliest_due() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        assert!(list.head_due().is_none());
        list.insert(entry(base, 40, 1));
        list.insert(entry(base, 20, 2));
        assert_eq!(list.head_due(), Some(base + Duration::from_millis(20)));
    }

    #[test]
    fn pop_head_drains_in_order() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        list.insert(entry(base, 30, 1));
        list.insert(entry(base, 10, 2));
        let mut drained = Vec::new();
        while let Some(e) = list.pop_head() {
            drained.push(e.message.tag().0);
        }
        assert_eq!(drained, vec![2, 1]);
        assert!(list.is_empty());
    }

    #[test]
    fn remove_at_position() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        list.insert(entry(base, 10, 1));
        list.insert(entry(base, 20, 2));
        list.insert(entry(base, 30, 3));
        let removed = list.remove(1);
        assert_eq!(removed.message.tag().0, 2);
        assert_eq!(tags(&list), vec![1, 3]);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn remove_out_of_bounds_panics() {
        let mut list = OrderedMessageList::new();
        let _ = list.remove(0);
    }

    #[test]
    fn len_tracks_mutations() {
        let base = Instant::now();
        let mut list = OrderedMessageList::new();
        assert_eq!(list.len(), 0);
        list.insert(entry(base, 10, 1));
        list.insert(entry(base, 20, 2));
        assert_eq!(list.len(), 2);
        let _ = list.pop_head();
        assert_eq!(list.len(), 1);
    }
}
