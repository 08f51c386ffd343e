// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pulse delivery to the owner thread, and a timer-thread pulse source.
//!
//! Platform display links call back on their own threads. [`PulseSender`] is
//! the `Send + Sync` piece they hold: it stamps the pulse and queues a frame
//! on the owner's [`Looper`](crate::Looper). [`ThreadVsync`] is a
//! [`VsyncSource`] that simulates a display link with a background thread
//! sleeping to interval boundaries.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cadence_core::time::{Duration, HostTime};
use cadence_core::vsync::{VsyncPulse, VsyncSource};
use parking_lot::{Condvar, Mutex};

use crate::choreographer::FrameMessage;
use crate::looper::LooperHandle;

/// Forwards pulses from any thread to the owner thread's loop.
///
/// Cloning is cheap (Arc bump).
#[derive(Clone, Debug)]
pub struct PulseSender {
    looper: LooperHandle<FrameMessage>,
}

impl PulseSender {
    /// Creates a sender posting to `looper`.
    #[must_use]
    pub fn new(looper: LooperHandle<FrameMessage>) -> Self {
        Self { looper }
    }

    /// Queues a frame for `pulse`.
    ///
    /// A timestamp in the future is clamped to now; frame times never run
    /// ahead of the clock. Pulses sent after the loop quit are dropped.
    pub fn send(&self, mut pulse: VsyncPulse) {
        let now = self.looper.now();
        if pulse.timestamp > now {
            tracing::debug!(
                sequence = pulse.sequence,
                ahead_ns = (pulse.timestamp - now).nanos(),
                "pulse timestamp is in the future; clamping to now"
            );
            pulse.timestamp = now;
        }
        let message = FrameMessage::RunFrame { pulse: Some(pulse) };
        if self.looper.post_at(pulse.timestamp, message).is_err() {
            tracing::debug!(sequence = pulse.sequence, "dropping pulse; looper has quit");
        }
    }
}

#[derive(Debug, Default)]
struct ThreadState {
    armed: bool,
    stopping: bool,
}

#[derive(Debug, Default)]
struct Control {
    state: Mutex<ThreadState>,
    wake: Condvar,
}

/// A [`VsyncSource`] backed by a timer thread.
///
/// Each [`arm`](VsyncSource::arm) produces one pulse stamped with the next
/// multiple of the frame interval on the loop's clock. The clock must run in
/// real time; a manually advanced clock never reaches the boundary.
pub struct ThreadVsync {
    control: Arc<Control>,
    refresh_rate_hz: f64,
    thread: Option<JoinHandle<()>>,
}

impl fmt::Debug for ThreadVsync {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ThreadVsync")
            .field("refresh_rate_hz", &self.refresh_rate_hz)
            .field("running", &self.thread.is_some())
            .finish_non_exhaustive()
    }
}

impl ThreadVsync {
    /// Starts the timer thread.
    pub fn spawn(sender: PulseSender, refresh_rate_hz: f64) -> io::Result<Self> {
        let control = Arc::new(Control::default());
        let interval = Duration::from_refresh_rate(refresh_rate_hz);
        let thread = thread::Builder::new()
            .name("cadence-vsync".into())
            .spawn({
                let control = Arc::clone(&control);
                move || pulse_loop(&control, &sender, interval)
            })?;
        Ok(Self {
            control,
            refresh_rate_hz,
            thread: Some(thread),
        })
    }

    fn stop(&mut self) {
        let Some(thread) = self.thread.take() else {
            return;
        };
        self.control.state.lock().stopping = true;
        self.control.wake.notify_all();
        if thread.join().is_err() {
            tracing::warn!("vsync thread panicked");
        }
    }
}

impl VsyncSource for ThreadVsync {
    fn arm(&mut self) {
        self.control.state.lock().armed = true;
        self.control.wake.notify_all();
    }

    fn refresh_rate_hz(&self) -> f64 {
        self.refresh_rate_hz
    }

    fn release(&mut self) {
        self.stop();
    }
}

impl Drop for ThreadVsync {
    fn drop(&mut self) {
        self.stop();
    }
}

fn next_boundary(now: HostTime, interval: Duration) -> HostTime {
    let into = Duration(now.nanos()) % interval;
    now.saturating_add(interval - into)
}

fn pulse_loop(control: &Control, sender: &PulseSender, interval: Duration) {
    let clock = Arc::clone(sender.looper.clock());
    let mut sequence = 0_u64;
    let mut state = control.state.lock();
    loop {
        while !state.armed && !state.stopping {
            control.wake.wait(&mut state);
        }
        if state.stopping {
            return;
        }

        let target = next_boundary(clock.now(), interval);
        loop {
            let now = clock.now();
            if now >= target || state.stopping {
                break;
            }
            let wait = std::time::Duration::from_nanos((target - now).nanos());
            _ = control.wake.wait_for(&mut state, wait);
        }
        if state.stopping {
            return;
        }

        state.armed = false;
        sequence += 1;
        let pulse = VsyncPulse {
            timestamp: target,
            sequence,
        };
        parking_lot::MutexGuard::unlocked(&mut state, || sender.send(pulse));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_is_strictly_ahead() {
        let interval = Duration(10);
        assert_eq!(next_boundary(HostTime(0), interval), HostTime(10));
        assert_eq!(next_boundary(HostTime(3), interval), HostTime(10));
        assert_eq!(next_boundary(HostTime(10), interval), HostTime(20));
    }
}
