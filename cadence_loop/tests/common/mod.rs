// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared fixtures: a manual clock, a counting pulse source, and a log of
//! callback invocations.

#![allow(dead_code, reason = "not every test binary uses every fixture")]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use cadence_core::config::ChoreographerConfig;
use cadence_core::time::{Duration, HostTime};
use cadence_core::vsync::VsyncSource;
use cadence_loop::{Action, Choreographer, FrameMessage, Looper, ManualClock};
use parking_lot::Mutex;

pub(crate) const START: HostTime = HostTime(1_000_000_000);

/// 100 Hz keeps interval arithmetic in whole milliseconds.
pub(crate) const REFRESH_HZ: f64 = 100.0;
pub(crate) const INTERVAL: Duration = Duration(10_000_000);

pub(crate) fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Counts arm and release calls.
#[derive(Debug)]
pub(crate) struct CountingVsync {
    pub(crate) arms: Arc<AtomicUsize>,
    pub(crate) releases: Arc<AtomicUsize>,
}

impl VsyncSource for CountingVsync {
    fn arm(&mut self) {
        self.arms.fetch_add(1, Ordering::SeqCst);
    }

    fn refresh_rate_hz(&self) -> f64 {
        REFRESH_HZ
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

pub(crate) struct Harness {
    pub(crate) clock: ManualClock,
    pub(crate) looper: Looper<FrameMessage>,
    pub(crate) choreographer: Choreographer,
    pub(crate) arms: Arc<AtomicUsize>,
    pub(crate) releases: Arc<AtomicUsize>,
    pub(crate) log: Arc<Mutex<Vec<String>>>,
}

impl Harness {
    /// Frames driven by a [`CountingVsync`]; the test delivers pulses.
    pub(crate) fn vsync() -> Self {
        Self::build(ChoreographerConfig::vsync())
    }

    /// Frames paced by the software timer on the looper.
    pub(crate) fn software() -> Self {
        Self::build(ChoreographerConfig {
            refresh_rate_hz: REFRESH_HZ,
            ..ChoreographerConfig::software()
        })
    }

    fn build(config: ChoreographerConfig) -> Self {
        let clock = ManualClock::new(START);
        let looper = Looper::new(clock.shared());
        let arms = Arc::new(AtomicUsize::new(0));
        let releases = Arc::new(AtomicUsize::new(0));
        let source = CountingVsync {
            arms: Arc::clone(&arms),
            releases: Arc::clone(&releases),
        };
        let choreographer = Choreographer::new(looper.handle(), config, Some(Box::new(source)));
        Self {
            clock,
            looper,
            choreographer,
            arms,
            releases,
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn arms(&self) -> usize {
        self.arms.load(Ordering::SeqCst)
    }

    /// An action appending `label` to the log.
    pub(crate) fn logger(&self, label: &str) -> Action {
        let log = Arc::clone(&self.log);
        let label = label.to_owned();
        Action::run(move || {
            log.lock().push(label.clone());
            Ok(())
        })
    }

    /// An action appending `label@<frame time in ms>` to the log.
    pub(crate) fn frame_logger(&self, label: &str) -> Action {
        let log = Arc::clone(&self.log);
        let label = label.to_owned();
        Action::frame(move |t| {
            log.lock().push(format!("{label}@{}", t.as_millis()));
            Ok(())
        })
    }

    pub(crate) fn take_log(&self) -> Vec<String> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Dispatches every runnable looper message.
    pub(crate) fn pump(&self) -> usize {
        self.looper
            .dispatch_pending(|m| self.choreographer.dispatch(m))
            .expect("frame failed")
    }
}
