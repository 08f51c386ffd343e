// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Monotonic clocks for the owner thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use cadence_core::time::{Clock, Duration, HostTime};

/// A clock shared between the looper, the scheduler, and pulse sources.
pub type SharedClock = Arc<dyn Clock + Send + Sync>;

/// The process-wide monotonic clock.
///
/// On Unix this reads `CLOCK_MONOTONIC`, the clock display pulses are usually
/// stamped with. Elsewhere it counts from the first read.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl SystemClock {
    /// Returns the clock as a [`SharedClock`].
    #[must_use]
    pub fn shared() -> SharedClock {
        Arc::new(Self)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> HostTime {
        monotonic_now()
    }
}

#[cfg(unix)]
fn monotonic_now() -> HostTime {
    use rustix::time::{ClockId, clock_gettime};

    const NANOS_PER_SECOND: u128 = 1_000_000_000;

    let timespec = clock_gettime(ClockId::Monotonic);
    let seconds = u64::try_from(timespec.tv_sec).unwrap_or(0);
    let nanos = u64::try_from(timespec.tv_nsec)
        .unwrap_or(0)
        .min(999_999_999);
    let ticks = u128::from(seconds)
        .saturating_mul(NANOS_PER_SECOND)
        .saturating_add(u128::from(nanos));
    HostTime(u64::try_from(ticks).unwrap_or(u64::MAX))
}

#[cfg(not(unix))]
fn monotonic_now() -> HostTime {
    use std::sync::OnceLock;
    use std::time::Instant;

    static EPOCH: OnceLock<Instant> = OnceLock::new();
    let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
    HostTime(u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
}

/// A clock that only moves when told to.
///
/// Clones share the same time, so a test can keep one handle and give
/// another to the scheduler.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    /// Creates a clock reading `start`.
    #[must_use]
    pub fn new(start: HostTime) -> Self {
        Self {
            nanos: Arc::new(AtomicU64::new(start.nanos())),
        }
    }

    /// Jumps to `time`. Moving backwards is allowed.
    pub fn set(&self, time: HostTime) {
        self.nanos.store(time.nanos(), Ordering::SeqCst);
    }

    /// Moves the clock forward by `by`.
    pub fn advance(&self, by: Duration) {
        self.nanos.fetch_add(by.nanos(), Ordering::SeqCst);
    }

    /// Returns the clock as a [`SharedClock`] sharing this clock's time.
    #[must_use]
    pub fn shared(&self) -> SharedClock {
        Arc::new(self.clone())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> HostTime {
        HostTime(self.nanos.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock;
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a, "monotonic clock went backwards: {a:?} -> {b:?}");
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new(HostTime(100));
        let shared = clock.shared();
        clock.advance(Duration(50));
        assert_eq!(shared.now(), HostTime(150));
        clock.set(HostTime(20));
        assert_eq!(shared.now(), HostTime(20));
    }
}
