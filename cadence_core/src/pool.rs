// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recycled callback records addressed by generational handles.
//!
//! [`RecordPool`] is an arena of [`Record`]s. Every record is owned either by
//! exactly one [`PhaseQueue`](crate::queue::PhaseQueue) (linked through its
//! `next` field) or by the pool's free list. Released slots keep their
//! allocation and are handed out again by [`RecordPool::acquire`], so steady
//! state posting does not allocate.
//!
//! A [`RecordId`] carries the slot's generation. Releasing a record bumps the
//! generation, so a stale handle can never observe the slot's next tenant.

use alloc::vec::Vec;
use core::fmt;

use crate::time::HostTime;

/// A handle to a live record in a [`RecordPool`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordId {
    idx: u32,
    generation: u32,
}

impl RecordId {
    /// Returns the raw slot index (for diagnostics only).
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.idx
    }

    /// Returns the generation counter.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({}@gen{})", self.idx, self.generation)
    }
}

/// A pending callback: when it becomes due, what it carries, and the next
/// record in the same queue.
#[derive(Debug)]
pub struct Record<T> {
    /// Time after which the record is eligible to run.
    pub due: HostTime,
    /// Caller data (the action and its cancellation token).
    pub payload: T,
    pub(crate) next: Option<RecordId>,
}

impl<T> Record<T> {
    /// Returns the next record in the owning list, if any.
    #[inline]
    #[must_use]
    pub fn next(&self) -> Option<RecordId> {
        self.next
    }
}

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    record: Option<Record<T>>,
}

/// Arena of [`Record`]s with a free list of recycled slots.
#[derive(Debug)]
pub struct RecordPool<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    len: u32,
}

impl<T> Default for RecordPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> RecordPool<T> {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            len: 0,
        }
    }

    /// Creates a pool with `capacity` slots reserved up front.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free_list: Vec::with_capacity(capacity),
            len: 0,
        }
    }

    /// Takes a slot from the free list (or grows the arena) and stores a new
    /// unlinked record in it.
    pub fn acquire(&mut self, due: HostTime, payload: T) -> RecordId {
        let record = Record {
            due,
            payload,
            next: None,
        };
        let idx = if let Some(idx) = self.free_list.pop() {
            self.slots[idx as usize].record = Some(record);
            idx
        } else {
            let idx = self.len;
            self.len += 1;
            self.slots.push(Slot {
                generation: 0,
                record: Some(record),
            });
            idx
        };

        RecordId {
            idx,
            generation: self.slots[idx as usize].generation,
        }
    }

    /// Returns a record to the free list and hands back its payload.
    ///
    /// Returns `None` for a stale handle.
    pub fn release(&mut self, id: RecordId) -> Option<T> {
        let slot = self.slot_mut(id)?;
        let record = slot.record.take()?;
        // Bump generation so old handles immediately fail validation.
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(id.idx);
        Some(record.payload)
    }

    /// Returns the record behind `id`, or `None` for a stale handle.
    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&Record<T>> {
        let slot = self.slots.get(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        slot.record.as_ref()
    }

    /// Returns whether `id` refers to a live record.
    #[must_use]
    pub fn is_alive(&self, id: RecordId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live records.
    #[must_use]
    pub fn live(&self) -> usize {
        self.slots.len() - self.free_list.len()
    }

    /// Number of recycled slots waiting for reuse.
    #[must_use]
    pub fn free(&self) -> usize {
        self.free_list.len()
    }

    /// Total slots ever allocated.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn due_of(&self, id: RecordId) -> Option<HostTime> {
        self.get(id).map(|record| record.due)
    }

    pub(crate) fn next_of(&self, id: RecordId) -> Option<RecordId> {
        self.get(id).and_then(|record| record.next)
    }

    pub(crate) fn set_next(&mut self, id: RecordId, next: Option<RecordId>) {
        let record = self.slot_mut(id).and_then(|slot| slot.record.as_mut());
        debug_assert!(record.is_some(), "linking a stale record {id:?}");
        if let Some(record) = record {
            record.next = next;
        }
    }

    fn slot_mut(&mut self, id: RecordId) -> Option<&mut Slot<T>> {
        let slot = self.slots.get_mut(id.idx as usize)?;
        if slot.generation != id.generation {
            return None;
        }
        Some(slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn released_slots_are_reused() {
        let mut pool = RecordPool::new();
        let a = pool.acquire(HostTime(1), 'a');
        let _b = pool.acquire(HostTime(2), 'b');
        assert_eq!(pool.capacity(), 2);

        assert_eq!(pool.release(a), Some('a'));
        assert_eq!(pool.free(), 1);
        assert_eq!(pool.live(), 1);

        let c = pool.acquire(HostTime(3), 'c');
        assert_eq!(c.index(), a.index(), "freed slot should be reused");
        assert_eq!(pool.capacity(), 2, "no new slot allocated");
        assert_eq!(pool.free(), 0);
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut pool = RecordPool::new();
        let a = pool.acquire(HostTime(1), 1_u32);
        pool.release(a);
        let b = pool.acquire(HostTime(2), 2_u32);

        assert_eq!(a.index(), b.index());
        assert_ne!(a.generation(), b.generation());
        assert!(pool.get(a).is_none(), "stale handle must not alias");
        assert!(!pool.is_alive(a));
        assert_eq!(pool.get(b).map(|r| r.payload), Some(2));
    }

    #[test]
    fn double_release_is_rejected() {
        let mut pool = RecordPool::new();
        let a = pool.acquire(HostTime(1), ());
        assert_eq!(pool.release(a), Some(()));
        assert_eq!(pool.release(a), None);
        assert_eq!(pool.free(), 1, "slot must appear on the free list once");
    }

    #[test]
    fn acquired_records_are_unlinked() {
        let mut pool = RecordPool::new();
        let a = pool.acquire(HostTime(5), ());
        let b = pool.acquire(HostTime(6), ());
        pool.set_next(a, Some(b));
        assert_eq!(pool.next_of(a), Some(b));

        pool.release(a);
        let c = pool.acquire(HostTime(7), ());
        assert_eq!(pool.next_of(c), None, "recycled record must not keep a link");
        assert_eq!(pool.due_of(c), Some(HostTime(7)));
    }
}
