// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Due-time ordered callback lists.
//!
//! A [`PhaseQueue`] is a singly linked list threaded through a
//! [`RecordPool`], kept sorted ascending by due time. Insertion is stable:
//! records with equal due times keep their arrival order. Because the list is
//! sorted, "is anything due?" only inspects the head, and "take everything
//! due" is a single split of the list.

use crate::pool::{RecordId, RecordPool};
use crate::time::HostTime;

/// A due-time sorted list of records for one phase.
#[derive(Clone, Copy, Debug, Default)]
pub struct PhaseQueue {
    head: Option<RecordId>,
    len: usize,
}

impl PhaseQueue {
    /// Creates an empty queue.
    #[must_use]
    pub const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// Number of queued records.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Due time of the earliest record.
    #[must_use]
    pub fn next_due<T>(&self, pool: &RecordPool<T>) -> Option<HostTime> {
        self.head.and_then(|head| pool.due_of(head))
    }

    /// Returns `true` if the head record is due at `now`.
    #[must_use]
    pub fn has_due<T>(&self, pool: &RecordPool<T>, now: HostTime) -> bool {
        self.next_due(pool).is_some_and(|due| due <= now)
    }

    /// Inserts a record after every record due at or before `due`.
    pub fn insert<T>(&mut self, pool: &mut RecordPool<T>, due: HostTime, payload: T) -> RecordId {
        let id = pool.acquire(due, payload);
        self.len += 1;

        let Some(head) = self.head else {
            self.head = Some(id);
            return id;
        };
        if pool.due_of(head).is_some_and(|head_due| due < head_due) {
            pool.set_next(id, Some(head));
            self.head = Some(id);
            return id;
        }

        let mut cursor = head;
        while let Some(next) = pool.next_of(cursor) {
            if pool.due_of(next).is_some_and(|next_due| due < next_due) {
                break;
            }
            cursor = next;
        }
        pool.set_next(id, pool.next_of(cursor));
        pool.set_next(cursor, Some(id));
        id
    }

    /// Detaches every record due at `now` and returns them as a batch.
    ///
    /// The queue keeps the records that are not yet due. An empty queue or a
    /// queue whose head is in the future yields an empty batch and is left
    /// untouched.
    pub fn extract_due<T>(&mut self, pool: &mut RecordPool<T>, now: HostTime) -> DueBatch {
        let Some(head) = self.head else {
            return DueBatch::EMPTY;
        };
        if !pool.due_of(head).is_some_and(|due| due <= now) {
            return DueBatch::EMPTY;
        }

        let mut last = head;
        let mut count = 1;
        let mut rest = pool.next_of(head);
        while let Some(next) = rest {
            if !pool.due_of(next).is_some_and(|due| due <= now) {
                break;
            }
            last = next;
            count += 1;
            rest = pool.next_of(next);
        }
        pool.set_next(last, None);
        self.head = rest;
        self.len -= count;

        DueBatch {
            head: Some(head),
            len: count,
        }
    }

    /// Unlinks and recycles every record whose payload matches `predicate`.
    ///
    /// Returns the number of records removed.
    pub fn remove_matching<T>(
        &mut self,
        pool: &mut RecordPool<T>,
        mut predicate: impl FnMut(&T) -> bool,
    ) -> usize {
        let mut removed = 0;
        let mut prev: Option<RecordId> = None;
        let mut cursor = self.head;
        while let Some(id) = cursor {
            let next = pool.next_of(id);
            let matches = pool.get(id).is_some_and(|record| predicate(&record.payload));
            if matches {
                match prev {
                    Some(prev) => pool.set_next(prev, next),
                    None => self.head = next,
                }
                pool.release(id);
                removed += 1;
            } else {
                prev = Some(id);
            }
            cursor = next;
        }
        self.len -= removed;
        removed
    }

    /// Recycles every queued record.
    pub fn clear<T>(&mut self, pool: &mut RecordPool<T>) {
        self.remove_matching(pool, |_| true);
    }
}

/// Records detached from a [`PhaseQueue`] by [`PhaseQueue::extract_due`].
///
/// The batch still owns its records. Walk it with [`head`](Self::head) and
/// [`Record::next`](crate::pool::Record::next), then hand the records back
/// with [`recycle`](Self::recycle), or consume the payloads directly with
/// [`drain`](Self::drain).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[must_use = "an unrecycled batch leaks its records"]
pub struct DueBatch {
    head: Option<RecordId>,
    len: usize,
}

impl DueBatch {
    const EMPTY: Self = Self { head: None, len: 0 };

    /// First record of the batch.
    #[must_use]
    pub const fn head(&self) -> Option<RecordId> {
        self.head
    }

    /// Number of records in the batch.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if nothing was due.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Returns every record of the batch to the pool.
    pub fn recycle<T>(self, pool: &mut RecordPool<T>) -> usize {
        self.drain(pool).count()
    }

    /// Returns an iterator that recycles each record and yields its payload.
    pub fn drain<T>(self, pool: &mut RecordPool<T>) -> Drain<'_, T> {
        Drain {
            pool,
            cursor: self.head,
        }
    }
}

/// Iterator returned by [`DueBatch::drain`].
///
/// Dropping it early still recycles the remaining records.
#[derive(Debug)]
pub struct Drain<'a, T> {
    pool: &'a mut RecordPool<T>,
    cursor: Option<RecordId>,
}

impl<T> Iterator for Drain<'_, T> {
    type Item = T;

    fn next(&mut self) -> Option<T> {
        let id = self.cursor?;
        self.cursor = self.pool.next_of(id);
        self.pool.release(id)
    }
}

impl<T> Drop for Drain<'_, T> {
    fn drop(&mut self) {
        for _ in self.by_ref() {}
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use proptest::prelude::*;

    use super::*;

    fn payloads(queue: &mut PhaseQueue, pool: &mut RecordPool<u32>, now: u64) -> Vec<u32> {
        queue.extract_due(pool, HostTime(now)).drain(pool).collect()
    }

    #[test]
    fn insert_keeps_due_order() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        queue.insert(&mut pool, HostTime(30), 3);
        queue.insert(&mut pool, HostTime(10), 1);
        queue.insert(&mut pool, HostTime(20), 2);

        assert_eq!(queue.len(), 3);
        assert_eq!(queue.next_due(&pool), Some(HostTime(10)));
        assert_eq!(payloads(&mut queue, &mut pool, 100), [1, 2, 3]);
        assert!(queue.is_empty());
    }

    #[test]
    fn equal_due_times_keep_arrival_order() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        queue.insert(&mut pool, HostTime(10), 1);
        queue.insert(&mut pool, HostTime(5), 0);
        queue.insert(&mut pool, HostTime(10), 2);
        queue.insert(&mut pool, HostTime(10), 3);

        assert_eq!(payloads(&mut queue, &mut pool, 10), [0, 1, 2, 3]);
    }

    #[test]
    fn extract_splits_at_first_future_record() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        for (due, v) in [(10, 1), (20, 2), (30, 3), (40, 4)] {
            queue.insert(&mut pool, HostTime(due), v);
        }

        let batch = queue.extract_due(&mut pool, HostTime(25));
        assert_eq!(batch.len(), 2);
        assert_eq!(queue.len(), 2);
        assert_eq!(queue.next_due(&pool), Some(HostTime(30)));
        assert_eq!(batch.drain(&mut pool).collect::<Vec<_>>(), [1, 2]);

        assert_eq!(pool.live(), 2, "drained records go back to the pool");
    }

    #[test]
    fn extract_with_nothing_due_is_a_no_op() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        assert!(queue.extract_due(&mut pool, HostTime(100)).is_empty());

        queue.insert(&mut pool, HostTime(50), 1);
        let batch = queue.extract_due(&mut pool, HostTime(49));
        assert!(batch.is_empty());
        assert_eq!(queue.len(), 1);
        assert!(!queue.has_due(&pool, HostTime(49)));
        assert!(queue.has_due(&pool, HostTime(50)));
    }

    #[test]
    fn batch_walk_and_recycle() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        queue.insert(&mut pool, HostTime(1), 'a');
        queue.insert(&mut pool, HostTime(2), 'b');

        let batch = queue.extract_due(&mut pool, HostTime(2));
        let mut seen = Vec::new();
        let mut cursor = batch.head();
        while let Some(id) = cursor {
            let record = pool.get(id).unwrap();
            seen.push(record.payload);
            cursor = record.next();
        }
        assert_eq!(seen, ['a', 'b']);
        assert_eq!(batch.recycle(&mut pool), 2);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn remove_matching_unlinks_head_middle_and_tail() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        for v in 0..6_u32 {
            queue.insert(&mut pool, HostTime(u64::from(v)), v);
        }

        let removed = queue.remove_matching(&mut pool, |v| v % 2 == 0 || *v == 5);
        assert_eq!(removed, 4);
        assert_eq!(queue.len(), 2);
        assert_eq!(pool.free(), 4);
        assert_eq!(payloads(&mut queue, &mut pool, 10), [1, 3]);
    }

    #[test]
    fn clear_recycles_everything() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        queue.insert(&mut pool, HostTime(1), 1);
        queue.insert(&mut pool, HostTime(2), 2);
        queue.clear(&mut pool);
        assert!(queue.is_empty());
        assert_eq!(queue.len(), 0);
        assert_eq!(pool.live(), 0);
    }

    #[test]
    fn dropping_a_partial_drain_recycles_the_rest() {
        let mut pool = RecordPool::new();
        let mut queue = PhaseQueue::new();
        for v in 0..4_u32 {
            queue.insert(&mut pool, HostTime(1), v);
        }
        let batch = queue.extract_due(&mut pool, HostTime(1));
        let first = batch.drain(&mut pool).next();
        assert_eq!(first, Some(0));
        assert_eq!(pool.live(), 0, "unconsumed records are recycled on drop");
    }

    proptest! {
        #[test]
        fn extraction_order_is_stable_by_due_time(dues in proptest::collection::vec(0_u64..20, 0..64)) {
            let mut pool = RecordPool::new();
            let mut queue = PhaseQueue::new();
            for (seq, due) in dues.iter().enumerate() {
                queue.insert(&mut pool, HostTime(*due), (*due, seq));
            }

            let out: Vec<(u64, usize)> = queue
                .extract_due(&mut pool, HostTime(u64::MAX))
                .drain(&mut pool)
                .collect();
            prop_assert_eq!(out.len(), dues.len());
            for pair in out.windows(2) {
                let (a, b) = (pair[0], pair[1]);
                prop_assert!(a.0 < b.0 || (a.0 == b.0 && a.1 < b.1), "{:?} before {:?}", a, b);
            }
        }

        #[test]
        fn partial_extraction_leaves_only_future_records(
            dues in proptest::collection::vec(0_u64..100, 1..64),
            now in 0_u64..100,
        ) {
            let mut pool = RecordPool::new();
            let mut queue = PhaseQueue::new();
            for due in &dues {
                queue.insert(&mut pool, HostTime(*due), *due);
            }

            let taken: Vec<u64> = queue
                .extract_due(&mut pool, HostTime(now))
                .drain(&mut pool)
                .collect();
            prop_assert!(taken.iter().all(|due| *due <= now));
            prop_assert_eq!(taken.len(), dues.iter().filter(|due| **due <= now).count());
            prop_assert!(!queue.has_due(&pool, HostTime(now)));
            prop_assert_eq!(queue.len() + taken.len(), dues.len());
        }
    }
}
