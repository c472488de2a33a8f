//! Fixed-capacity history log with FIFO eviction
//!
//! All rolling history collections in the engine (validation history, per-metric
//! samples, alert log) are `BoundedLog`s so memory stays bounded no matter how
//! many events a session produces. Insertion is O(1); once capacity is reached
//! the oldest entry is evicted.

use std::collections::VecDeque;

/// Insertion-ordered collection with a fixed capacity and FIFO eviction
///
/// Unlike a streaming ring buffer, entries remain iterable (oldest first)
/// until evicted, which is what the summary/statistics paths need.
#[derive(Debug, Clone)]
pub struct BoundedLog<T> {
    entries: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedLog<T> {
    /// Create a log holding at most `capacity` entries
    ///
    /// A capacity of 0 is clamped to 1 so `push` always retains the newest entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append an entry, evicting the oldest if the log is full
    pub fn push(&mut self, entry: T) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry);
    }

    /// Number of entries currently held
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries have been recorded (or all were evicted)
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Configured capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Most recently pushed entry
    pub fn latest(&self) -> Option<&T> {
        self.entries.back()
    }

    /// Iterate oldest → newest
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    /// Iterate newest → oldest
    pub fn iter_rev(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().rev()
    }

    /// Remove all entries for which the predicate returns false
    ///
    /// Used by retention sweeps; relative order of retained entries is kept.
    pub fn retain<F: FnMut(&T) -> bool>(&mut self, f: F) {
        self.entries.retain(f);
    }

    /// Drop all entries, keeping the capacity
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_within_capacity() {
        let mut log = BoundedLog::new(3);
        log.push(1);
        log.push(2);
        assert_eq!(log.len(), 2);
        assert_eq!(log.latest(), Some(&2));
    }

    #[test]
    fn test_fifo_eviction() {
        let mut log = BoundedLog::new(3);
        for i in 0..5 {
            log.push(i);
        }
        // Oldest entries (0, 1) evicted first
        assert_eq!(log.len(), 3);
        let held: Vec<_> = log.iter().copied().collect();
        assert_eq!(held, vec![2, 3, 4]);
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut log = BoundedLog::new(100);
        for i in 0..10_000 {
            log.push(i);
            assert!(log.len() <= 100);
        }
        assert_eq!(log.len(), 100);
        assert_eq!(log.iter().next(), Some(&9_900));
        assert_eq!(log.latest(), Some(&9_999));
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut log = BoundedLog::new(0);
        assert_eq!(log.capacity(), 1);
        log.push("a");
        log.push("b");
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest(), Some(&"b"));
    }

    #[test]
    fn test_iter_rev() {
        let mut log = BoundedLog::new(4);
        for i in 1..=4 {
            log.push(i);
        }
        let newest_first: Vec<_> = log.iter_rev().copied().collect();
        assert_eq!(newest_first, vec![4, 3, 2, 1]);
    }

    #[test]
    fn test_retain() {
        let mut log = BoundedLog::new(10);
        for i in 0..10 {
            log.push(i);
        }
        log.retain(|&i| i % 2 == 0);
        assert_eq!(log.len(), 5);
        let held: Vec<_> = log.iter().copied().collect();
        assert_eq!(held, vec![0, 2, 4, 6, 8]);
    }
}
