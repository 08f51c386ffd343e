// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owner-thread message loop.
//!
//! A [`Looper`] belongs to the thread that created it and runs that thread's
//! deferred work in time order. Any thread may queue work through a
//! [`LooperHandle`]; only the owner dispatches it.
//!
//! Messages are kept sorted by the time they become runnable. Messages with
//! equal times run in the order they were posted. A message posted with
//! [`LooperHandle::post_at_front`] jumps the whole queue.

use std::collections::VecDeque;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::thread::{self, ThreadId};

use cadence_core::time::HostTime;
use parking_lot::{Condvar, Mutex};

use crate::clock::SharedClock;
use crate::error::LooperError;

struct Entry<M> {
    when: HostTime,
    message: M,
}

struct QueueState<M> {
    entries: VecDeque<Entry<M>>,
    quitting: bool,
}

struct Shared<M> {
    queue: Mutex<QueueState<M>>,
    wake: Condvar,
    owner: ThreadId,
    clock: SharedClock,
}

/// The owner side of a message loop.
///
/// Not `Send`: dispatch always happens on the thread that created it.
pub struct Looper<M> {
    shared: Arc<Shared<M>>,
    _owner_only: PhantomData<*const ()>,
}

impl<M> fmt::Debug for Looper<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Looper")
            .field("owner", &self.shared.owner)
            .finish_non_exhaustive()
    }
}

impl<M> Looper<M> {
    /// Creates a loop owned by the calling thread.
    #[must_use]
    pub fn new(clock: SharedClock) -> Self {
        Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(QueueState {
                    entries: VecDeque::new(),
                    quitting: false,
                }),
                wake: Condvar::new(),
                owner: thread::current().id(),
                clock,
            }),
            _owner_only: PhantomData,
        }
    }

    /// Returns a handle for posting to this loop.
    #[must_use]
    pub fn handle(&self) -> LooperHandle<M> {
        LooperHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Time at which the earliest queued message becomes runnable.
    #[must_use]
    pub fn next_wakeup(&self) -> Option<HostTime> {
        self.shared.queue.lock().entries.front().map(|e| e.when)
    }

    /// Runs every message that is runnable now, in order.
    ///
    /// Messages queued by `handler` that are already runnable are picked up
    /// in the same pass. Stops at the first handler error, leaving the rest
    /// queued. Returns the number of messages handled.
    pub fn dispatch_pending<E>(&self, mut handler: impl FnMut(M) -> Result<(), E>) -> Result<usize, E> {
        let now = self.shared.clock.now();
        let mut handled = 0;
        loop {
            let message = {
                let mut queue = self.shared.queue.lock();
                match queue.entries.front() {
                    Some(entry) if entry.when <= now => queue.entries.pop_front().map(|e| e.message),
                    _ => None,
                }
            };
            let Some(message) = message else {
                return Ok(handled);
            };
            handler(message)?;
            handled += 1;
        }
    }

    /// Blocks until a message may be runnable, `timeout` elapses, or the
    /// loop is asked to quit.
    ///
    /// Returns `false` once the loop is quitting.
    pub fn poll(&self, timeout: Option<std::time::Duration>) -> bool {
        let mut queue = self.shared.queue.lock();
        if queue.quitting {
            return false;
        }
        let now = self.shared.clock.now();
        let until_next = queue.entries.front().map(|e| {
            std::time::Duration::from_nanos(e.when.saturating_duration_since(now).nanos())
        });
        let wait = match (until_next, timeout) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        match wait {
            Some(wait) if wait.is_zero() => {}
            Some(wait) => {
                _ = self.shared.wake.wait_for(&mut queue, wait);
            }
            None => self.shared.wake.wait(&mut queue),
        }
        !queue.quitting
    }

    /// Dispatches messages until [`LooperHandle::quit`] is called or
    /// `handler` fails.
    pub fn run<E>(&self, mut handler: impl FnMut(M) -> Result<(), E>) -> Result<(), E> {
        loop {
            self.dispatch_pending(&mut handler)?;
            if !self.poll(None) {
                return Ok(());
            }
        }
    }
}

/// A cloneable, thread-safe handle for posting to a [`Looper`].
pub struct LooperHandle<M> {
    shared: Arc<Shared<M>>,
}

impl<M> Clone for LooperHandle<M> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<M> fmt::Debug for LooperHandle<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LooperHandle")
            .field("owner", &self.shared.owner)
            .finish_non_exhaustive()
    }
}

impl<M> LooperHandle<M> {
    /// Queues `message` to run as soon as possible.
    pub fn post(&self, message: M) -> Result<(), LooperError> {
        self.post_at(self.now(), message)
    }

    /// Queues `message` to run once the clock reaches `when`.
    pub fn post_at(&self, when: HostTime, message: M) -> Result<(), LooperError> {
        let mut queue = self.shared.queue.lock();
        if queue.quitting {
            return Err(LooperError::Quit);
        }
        let at = queue.entries.partition_point(|e| e.when <= when);
        queue.entries.insert(at, Entry { when, message });
        drop(queue);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Queues `message` ahead of everything else, runnable immediately.
    pub fn post_at_front(&self, message: M) -> Result<(), LooperError> {
        let mut queue = self.shared.queue.lock();
        if queue.quitting {
            return Err(LooperError::Quit);
        }
        queue.entries.push_front(Entry {
            when: HostTime::ZERO,
            message,
        });
        drop(queue);
        self.shared.wake.notify_one();
        Ok(())
    }

    /// Drops every queued message matching `predicate`. Returns how many
    /// were removed.
    pub fn remove_where(&self, mut predicate: impl FnMut(&M) -> bool) -> usize {
        let mut queue = self.shared.queue.lock();
        let before = queue.entries.len();
        queue.entries.retain(|e| !predicate(&e.message));
        before - queue.entries.len()
    }

    /// Number of queued messages, runnable or not.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().entries.len()
    }

    /// Stops the loop. Queued messages are discarded and later posts fail.
    pub fn quit(&self) {
        let mut queue = self.shared.queue.lock();
        queue.quitting = true;
        queue.entries.clear();
        drop(queue);
        self.shared.wake.notify_all();
    }

    /// Whether [`quit`](Self::quit) has been called.
    #[must_use]
    pub fn is_quitting(&self) -> bool {
        self.shared.queue.lock().quitting
    }

    /// Whether the caller is the loop's owner thread.
    #[must_use]
    pub fn is_owner_thread(&self) -> bool {
        thread::current().id() == self.shared.owner
    }

    /// Current time on the loop's clock.
    #[must_use]
    pub fn now(&self) -> HostTime {
        self.shared.clock.now()
    }

    /// The loop's clock.
    #[must_use]
    pub fn clock(&self) -> &SharedClock {
        &self.shared.clock
    }
}
