#![forbid(unsafe_code)]

//! Fixed-capacity FIFO buffer with oldest-first eviction.
//!
//! # Invariants
//!
//! 1. `len() <= capacity()` after every operation.
//! 2. Insertion order is preserved; eviction always removes the oldest item.
//! 3. A zero-capacity buffer accepts nothing: [`offer`](BoundedRecordBuffer::offer)
//!    returns `false` and leaves the buffer untouched.
//! 4. Capacity exhaustion is never an error. Eviction silently makes room.

use std::collections::VecDeque;

/// Insertion-ordered buffer that evicts its oldest entry on overflow.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundedRecordBuffer<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> BoundedRecordBuffer<T> {
    /// Create an empty buffer holding at most `capacity` items.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            // Preallocation is capped; a large capacity fills lazily.
            items: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Maximum number of items retained.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of items currently buffered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the buffer holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Append `item`, evicting the oldest entry first if the buffer is full.
    ///
    /// Returns `false` (without mutation) only for a zero-capacity buffer.
    pub fn offer(&mut self, item: T) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
        true
    }

    /// Remove and return the oldest item.
    pub fn remove_oldest(&mut self) -> Option<T> {
        self.items.pop_front()
    }

    /// The most recently inserted item.
    #[must_use]
    pub fn peek_last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Mutable access to the most recently inserted item.
    pub fn peek_last_mut(&mut self) -> Option<&mut T> {
        self.items.back_mut()
    }

    /// The oldest buffered item.
    #[must_use]
    pub fn peek_oldest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Bulk insert preserving the relative order of `items`.
    ///
    /// If the batch holds at least `capacity` items, the buffer is cleared
    /// and only the batch's last `capacity` items are kept. Otherwise just
    /// enough of the oldest entries are evicted to make room for the whole
    /// batch. Returns whether the buffer changed.
    pub fn add_all<I>(&mut self, items: I) -> bool
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        if self.capacity == 0 {
            return false;
        }
        let iter = items.into_iter();
        let batch = iter.len();

        if batch >= self.capacity {
            self.items.clear();
            self.items.extend(iter.skip(batch - self.capacity));
            return true;
        }

        let space_left = self.capacity - self.items.len();
        let overflow = batch.saturating_sub(space_left);
        self.items.drain(..overflow);
        self.items.extend(iter);
        batch > 0
    }

    /// Remove every item, returning them oldest first.
    pub fn drain(&mut self) -> Vec<T> {
        self.items.drain(..).collect()
    }

    /// Drop every buffered item.
    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Iterate from oldest to newest.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + ExactSizeIterator {
        self.items.iter()
    }
}

impl<'a, T> IntoIterator for &'a BoundedRecordBuffer<T> {
    type Item = &'a T;
    type IntoIter = std::collections::vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(buf: &BoundedRecordBuffer<i32>) -> Vec<i32> {
        buf.iter().copied().collect()
    }

    #[test]
    fn offer_within_capacity_keeps_everything() {
        let mut buf = BoundedRecordBuffer::new(3);
        assert!(buf.offer(1));
        assert!(buf.offer(2));
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.peek_last(), Some(&2));
        assert_eq!(buf.peek_oldest(), Some(&1));
    }

    #[test]
    fn offer_at_capacity_evicts_oldest() {
        let mut buf = BoundedRecordBuffer::new(3);
        for i in 1..=5 {
            assert!(buf.offer(i));
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(contents(&buf), vec![3, 4, 5]);
    }

    #[test]
    fn zero_capacity_rejects_offer() {
        let mut buf = BoundedRecordBuffer::new(0);
        assert!(!buf.offer(7));
        assert!(buf.is_empty());
        assert_eq!(buf.peek_last(), None);
    }

    #[test]
    fn remove_oldest_is_fifo() {
        let mut buf = BoundedRecordBuffer::new(4);
        buf.offer(10);
        buf.offer(20);
        assert_eq!(buf.remove_oldest(), Some(10));
        assert_eq!(buf.remove_oldest(), Some(20));
        assert_eq!(buf.remove_oldest(), None);
    }

    #[test]
    fn peek_last_mut_mutates_in_place() {
        let mut buf = BoundedRecordBuffer::new(2);
        buf.offer(1);
        if let Some(last) = buf.peek_last_mut() {
            *last += 41;
        }
        assert_eq!(contents(&buf), vec![42]);
    }

    #[test]
    fn add_all_oversized_batch_keeps_tail() {
        let mut buf = BoundedRecordBuffer::new(3);
        buf.offer(100);
        assert!(buf.add_all(vec![1, 2, 3, 4, 5]));
        assert_eq!(contents(&buf), vec![3, 4, 5]);
    }

    #[test]
    fn add_all_exact_capacity_replaces_contents() {
        let mut buf = BoundedRecordBuffer::new(3);
        buf.offer(9);
        buf.offer(8);
        assert!(buf.add_all(vec![1, 2, 3]));
        assert_eq!(contents(&buf), vec![1, 2, 3]);
    }

    #[test]
    fn add_all_small_batch_evicts_just_enough() {
        let mut buf = BoundedRecordBuffer::new(4);
        buf.add_all(vec![1, 2, 3]);
        assert!(buf.add_all(vec![4, 5]));
        assert_eq!(contents(&buf), vec![2, 3, 4, 5]);
    }

    #[test]
    fn add_all_fits_without_eviction() {
        let mut buf = BoundedRecordBuffer::new(5);
        buf.offer(1);
        assert!(buf.add_all(vec![2, 3]));
        assert_eq!(contents(&buf), vec![1, 2, 3]);
    }

    #[test]
    fn add_all_empty_batch_reports_unchanged() {
        let mut buf = BoundedRecordBuffer::new(2);
        buf.offer(1);
        assert!(!buf.add_all(Vec::new()));
        assert_eq!(contents(&buf), vec![1]);
    }

    #[test]
    fn add_all_zero_capacity_is_noop() {
        let mut buf = BoundedRecordBuffer::new(0);
        assert!(!buf.add_all(vec![1, 2]));
        assert!(buf.is_empty());
    }

    #[test]
    fn drain_empties_in_order() {
        let mut buf = BoundedRecordBuffer::new(3);
        buf.add_all(vec![1, 2, 3]);
        assert_eq!(buf.drain(), vec![1, 2, 3]);
        assert!(buf.is_empty());
        assert_eq!(buf.capacity(), 3);
    }
}
