// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-time state machine.
//!
//! [`FrameState`] owns the scheduling flags and the frame-time bookkeeping
//! that decide, for each vsync pulse, whether a frame runs and which frame
//! time its callbacks observe. It is pure: callers pass in the current host
//! time, which keeps every anomaly policy testable without a clock or a
//! thread.
//!
//! # Per-pulse decision
//!
//! [`FrameState::begin_frame`] applies, in order:
//!
//! 1. **Debounce**: a pulse arriving while no frame is scheduled is stale.
//! 2. **Skip catch-up**: when the pulse is delivered one or more intervals
//!    late, the frame time is re-anchored to the most recent interval
//!    boundary before `now`, keeping frame times evenly spaced.
//! 3. **Backward guard**: a frame time earlier than the last committed one
//!    is rejected; the caller re-arms the source and the frame stays
//!    scheduled.
//! 4. **Throttling**: with an fps divisor above one, pulses closer than
//!    `interval * divisor` to the last frame are dropped.
//! 5. **Commit**: the frame is unscheduled and its time becomes the last
//!    frame time.
//!
//! [`FrameState::adjust_commit`] then re-anchors the commit phase when the
//! earlier phases slipped by two or more intervals.

use crate::time::{Duration, HostTime};

/// Skip count at which a late frame is worth a diagnostic.
pub const DEFAULT_SKIP_WARNING_THRESHOLD: u64 = 30;

/// Why a pulse was consumed without running a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DeferReason {
    /// The frame time would precede the last committed frame time.
    BackwardTime,
    /// The pulse arrived inside the throttling window.
    Throttled,
}

/// A frame that passed every anomaly check and is about to run its phases.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameStart {
    /// Frame time observed by callbacks (re-anchored when frames were
    /// skipped).
    pub frame_time: HostTime,
    /// Frame time carried by the pulse.
    pub intended_frame_time: HostTime,
    /// Pulse sequence number.
    pub sequence: u64,
    /// Whole intervals between the pulse and its delivery.
    pub skipped_frames: u64,
    /// Whether `skipped_frames` reached the warning threshold.
    pub warn: bool,
}

/// Outcome of [`FrameState::begin_frame`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameDecision {
    /// No frame was scheduled; the pulse is a duplicate.
    Stale,
    /// The frame is abandoned for this pulse and stays scheduled.
    Defer {
        /// Why the pulse was dropped.
        reason: DeferReason,
        /// Frame time the pulse resolved to.
        frame_time: HostTime,
    },
    /// The frame runs.
    Run(FrameStart),
}

/// A commit-phase re-anchor computed by [`FrameState::adjust_commit`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommitAdjustment {
    /// Frame time before the adjustment.
    pub previous: HostTime,
    /// Frame time commit callbacks observe.
    pub adjusted: HostTime,
    /// How far the commit phase trailed the frame time.
    pub commit_jitter: Duration,
}

/// Scheduling flags and frame-time bookkeeping for one owner thread.
#[derive(Clone, Copy, Debug)]
pub struct FrameState {
    frame_scheduled: bool,
    callbacks_running: bool,
    last_frame_time: HostTime,
    frame_interval: Duration,
    fps_divisor: u32,
    frame_sequence: u64,
    skip_warning_threshold: u64,
}

impl FrameState {
    /// Creates state for a display with the given frame interval.
    #[must_use]
    pub fn new(frame_interval: Duration) -> Self {
        Self {
            frame_scheduled: false,
            callbacks_running: false,
            last_frame_time: HostTime::ZERO,
            frame_interval: frame_interval.max(Duration(1)),
            fps_divisor: 1,
            frame_sequence: 0,
            skip_warning_threshold: DEFAULT_SKIP_WARNING_THRESHOLD,
        }
    }

    /// Sets the skip count at which [`FrameStart::warn`] is raised.
    #[must_use]
    pub fn with_skip_warning_threshold(mut self, threshold: u64) -> Self {
        self.skip_warning_threshold = threshold;
        self
    }

    /// Whether a frame has been requested and not yet run.
    #[must_use]
    pub const fn is_frame_scheduled(&self) -> bool {
        self.frame_scheduled
    }

    /// Whether phase callbacks are executing right now.
    #[must_use]
    pub const fn callbacks_running(&self) -> bool {
        self.callbacks_running
    }

    /// Frame time of the last committed frame. Zero before the first frame.
    #[must_use]
    pub const fn last_frame_time(&self) -> HostTime {
        self.last_frame_time
    }

    /// Frame time observed by running callbacks, or `None` outside a phase.
    #[must_use]
    pub const fn current_frame_time(&self) -> Option<HostTime> {
        if self.callbacks_running {
            Some(self.last_frame_time)
        } else {
            None
        }
    }

    /// Nominal display frame interval.
    #[must_use]
    pub const fn frame_interval(&self) -> Duration {
        self.frame_interval
    }

    /// Throttling factor; `1` means every pulse may produce a frame.
    #[must_use]
    pub const fn fps_divisor(&self) -> u32 {
        self.fps_divisor
    }

    /// Sequence number of the last committed pulse.
    #[must_use]
    pub const fn frame_sequence(&self) -> u64 {
        self.frame_sequence
    }

    /// Marks a frame as requested.
    ///
    /// Returns `false` if one was already scheduled, in which case the caller
    /// must not arm the pulse source again.
    pub fn request_frame(&mut self) -> bool {
        if self.frame_scheduled {
            return false;
        }
        self.frame_scheduled = true;
        true
    }

    /// Updates the frame interval after a display mode change.
    pub fn set_frame_interval(&mut self, frame_interval: Duration) {
        self.frame_interval = frame_interval.max(Duration(1));
    }

    /// Sets the throttling factor. Zero is treated as one.
    pub fn set_fps_divisor(&mut self, divisor: u32) {
        self.fps_divisor = divisor.max(1);
    }

    /// Flags the start or end of phase callback execution.
    pub fn set_callbacks_running(&mut self, running: bool) {
        self.callbacks_running = running;
    }

    /// Resolves a pulse carrying `pulse_time` and `sequence`, delivered at
    /// `now`, into a frame decision.
    pub fn begin_frame(&mut self, pulse_time: HostTime, sequence: u64, now: HostTime) -> FrameDecision {
        if !self.frame_scheduled {
            return FrameDecision::Stale;
        }

        let interval = self.frame_interval;
        let mut frame_time = pulse_time;
        let jitter = now.saturating_duration_since(pulse_time);
        let mut skipped_frames = 0;
        if jitter >= interval {
            skipped_frames = jitter.intervals(interval);
            frame_time = now - jitter % interval;
        }

        if frame_time < self.last_frame_time {
            return FrameDecision::Defer {
                reason: DeferReason::BackwardTime,
                frame_time,
            };
        }

        if self.fps_divisor > 1 {
            let since_last = frame_time - self.last_frame_time;
            let window = interval.saturating_mul(u64::from(self.fps_divisor));
            if since_last > Duration::ZERO && since_last < window {
                return FrameDecision::Defer {
                    reason: DeferReason::Throttled,
                    frame_time,
                };
            }
        }

        self.frame_scheduled = false;
        self.last_frame_time = frame_time;
        self.frame_sequence = sequence;

        FrameDecision::Run(FrameStart {
            frame_time,
            intended_frame_time: pulse_time,
            sequence,
            skipped_frames,
            warn: skipped_frames >= self.skip_warning_threshold,
        })
    }

    /// Re-anchors the commit phase when it trails `frame_time` by two or
    /// more intervals at `now`.
    ///
    /// The adjusted time becomes the last frame time so that later readers
    /// never observe a stale value. Returns `None` when no adjustment is
    /// needed.
    pub fn adjust_commit(&mut self, frame_time: HostTime, now: HostTime) -> Option<CommitAdjustment> {
        let interval = self.frame_interval;
        let commit_jitter = now.saturating_duration_since(frame_time);
        if commit_jitter < interval.saturating_mul(2) {
            return None;
        }

        let adjusted = now - (commit_jitter % interval + interval);
        self.last_frame_time = adjusted;
        Some(CommitAdjustment {
            previous: frame_time,
            adjusted,
            commit_jitter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration(16_000_000);

    fn scheduled() -> FrameState {
        let mut state = FrameState::new(INTERVAL);
        assert!(state.request_frame());
        state
    }

    fn expect_run(decision: FrameDecision) -> FrameStart {
        match decision {
            FrameDecision::Run(start) => start,
            other => panic!("expected frame to run, got {other:?}"),
        }
    }

    #[test]
    fn unscheduled_pulse_is_stale() {
        let mut state = FrameState::new(INTERVAL);
        assert_eq!(
            state.begin_frame(HostTime(100), 1, HostTime(100)),
            FrameDecision::Stale
        );
        assert_eq!(state.last_frame_time(), HostTime::ZERO);
    }

    #[test]
    fn request_frame_is_idempotent() {
        let mut state = FrameState::new(INTERVAL);
        assert!(state.request_frame());
        assert!(!state.request_frame(), "second request must not re-arm");
        assert!(state.is_frame_scheduled());
    }

    #[test]
    fn on_time_pulse_commits_its_timestamp() {
        let mut state = scheduled();
        let start = expect_run(state.begin_frame(HostTime(1_000_000_000), 7, HostTime(1_002_000_000)));
        assert_eq!(start.frame_time, HostTime(1_000_000_000));
        assert_eq!(start.skipped_frames, 0);
        assert!(!start.warn);
        assert!(!state.is_frame_scheduled());
        assert_eq!(state.last_frame_time(), HostTime(1_000_000_000));
        assert_eq!(state.frame_sequence(), 7);
    }

    #[test]
    fn late_pulse_reanchors_to_interval_boundary() {
        let mut state = scheduled();
        let pulse = HostTime(1_000_000_000);
        // 5 intervals plus 3ms late.
        let now = pulse + INTERVAL.saturating_mul(5) + Duration(3_000_000);
        let start = expect_run(state.begin_frame(pulse, 1, now));

        assert_eq!(start.skipped_frames, 5);
        assert!(!start.warn, "5 skipped frames is below the threshold");
        assert_eq!(start.frame_time, now - Duration(3_000_000));
        assert_eq!(start.intended_frame_time, pulse);
        assert!(now - start.frame_time < INTERVAL);
    }

    #[test]
    fn skip_warning_threshold_is_inclusive() {
        let mut state = scheduled();
        let pulse = HostTime(1_000_000_000);
        let now = pulse + INTERVAL.saturating_mul(DEFAULT_SKIP_WARNING_THRESHOLD);
        let start = expect_run(state.begin_frame(pulse, 1, now));
        assert_eq!(start.skipped_frames, DEFAULT_SKIP_WARNING_THRESHOLD);
        assert!(start.warn);
        assert_eq!(start.frame_time, now, "exact multiple re-anchors to now");

        let mut state = FrameState::new(INTERVAL).with_skip_warning_threshold(3);
        state.request_frame();
        let start = expect_run(state.begin_frame(pulse, 1, pulse + INTERVAL.saturating_mul(3)));
        assert!(start.warn, "custom threshold should be honored");
    }

    #[test]
    fn pulse_in_the_future_has_no_jitter() {
        let mut state = scheduled();
        let start = expect_run(state.begin_frame(HostTime(2_000), 1, HostTime(1_000)));
        assert_eq!(start.frame_time, HostTime(2_000));
        assert_eq!(start.skipped_frames, 0);
    }

    #[test]
    fn backward_pulse_is_deferred_and_stays_scheduled() {
        let mut state = scheduled();
        expect_run(state.begin_frame(HostTime(1_000_000_000), 1, HostTime(1_000_000_000)));

        state.request_frame();
        let decision = state.begin_frame(HostTime(990_000_000), 2, HostTime(1_001_000_000));
        assert_eq!(
            decision,
            FrameDecision::Defer {
                reason: DeferReason::BackwardTime,
                frame_time: HostTime(990_000_000),
            }
        );
        assert!(state.is_frame_scheduled(), "retry on the next pulse");
        assert_eq!(state.last_frame_time(), HostTime(1_000_000_000));
        assert_eq!(state.frame_sequence(), 1);
    }

    #[test]
    fn divisor_drops_alternate_pulses() {
        let mut state = FrameState::new(INTERVAL);
        state.set_fps_divisor(2);
        let base = HostTime(1_000_000_000);

        let mut ran = 0;
        for i in 0..8_u64 {
            let pulse = base + INTERVAL.saturating_mul(i);
            state.request_frame();
            if let FrameDecision::Run(_) = state.begin_frame(pulse, i, pulse) {
                ran += 1;
            }
        }
        assert_eq!(ran, 4, "every other pulse should run");
    }

    #[test]
    fn zero_divisor_is_clamped() {
        let mut state = FrameState::new(INTERVAL);
        state.set_fps_divisor(0);
        assert_eq!(state.fps_divisor(), 1);
    }

    #[test]
    fn repeated_timestamp_passes_throttle() {
        let mut state = FrameState::new(INTERVAL);
        state.set_fps_divisor(3);
        state.request_frame();
        expect_run(state.begin_frame(HostTime(1_000_000_000), 1, HostTime(1_000_000_000)));
        state.request_frame();
        // since_last == 0 is outside the (0, window) throttle range.
        expect_run(state.begin_frame(HostTime(1_000_000_000), 2, HostTime(1_000_000_000)));
    }

    #[test]
    fn commit_within_two_intervals_is_untouched() {
        let mut state = scheduled();
        let frame_time = HostTime(1_000_000_000);
        expect_run(state.begin_frame(frame_time, 1, frame_time));
        let now = frame_time + INTERVAL + Duration(15_000_000);
        assert_eq!(state.adjust_commit(frame_time, now), None);
        assert_eq!(state.last_frame_time(), frame_time);
    }

    #[test]
    fn slipped_commit_is_reanchored_and_persisted() {
        let mut state = scheduled();
        let frame_time = HostTime(1_000_000_000);
        expect_run(state.begin_frame(frame_time, 1, frame_time));

        let now = frame_time + INTERVAL.saturating_mul(3) + Duration(2_000_000);
        let adjustment = state.adjust_commit(frame_time, now).unwrap();
        assert_eq!(adjustment.previous, frame_time);
        assert_eq!(adjustment.adjusted, now - Duration(2_000_000) - INTERVAL);
        assert!(adjustment.adjusted > frame_time, "commit time must not regress");
        assert!(now - adjustment.adjusted < INTERVAL.saturating_mul(2));
        assert_eq!(state.last_frame_time(), adjustment.adjusted);
    }

    #[test]
    fn current_frame_time_requires_running_callbacks() {
        let mut state = scheduled();
        expect_run(state.begin_frame(HostTime(500), 1, HostTime(500)));
        assert_eq!(state.current_frame_time(), None);
        state.set_callbacks_running(true);
        assert_eq!(state.current_frame_time(), Some(HostTime(500)));
        state.set_callbacks_running(false);
        assert_eq!(state.current_frame_time(), None);
    }
}
