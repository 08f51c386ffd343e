// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame loop.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! scheduler calls as a pulse is resolved and each phase runs. All method
//! bodies default to no-ops, so implementing only the events you care about
//! is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps during a frame and
//! produces a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).

use crate::frame::{CommitAdjustment, DeferReason, FrameStart};
use crate::phase::Phase;
use crate::time::{Duration, HostTime};
use crate::vsync::VsyncPulse;

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when a pulse reaches the owner thread.
#[derive(Clone, Copy, Debug)]
pub struct VsyncPulseEvent {
    /// Pulse counter (zero for software-timed frames).
    pub sequence: u64,
    /// Nominal time of the pulse.
    pub timestamp: HostTime,
    /// Host time when the scheduler handled the pulse.
    pub received_at: HostTime,
}

impl VsyncPulseEvent {
    /// Creates an event for `pulse` handled at `received_at`.
    #[must_use]
    pub fn new(pulse: &VsyncPulse, received_at: HostTime) -> Self {
        Self {
            sequence: pulse.sequence,
            timestamp: pulse.timestamp,
            received_at,
        }
    }
}

/// Emitted when a pulse was delivered one or more intervals late.
#[derive(Clone, Copy, Debug)]
pub struct FramesSkippedEvent {
    /// Pulse counter.
    pub sequence: u64,
    /// Whole intervals between the pulse and its delivery.
    pub skipped_frames: u64,
    /// Frame time carried by the pulse.
    pub intended_frame_time: HostTime,
    /// Frame time after re-anchoring.
    pub frame_time: HostTime,
}

impl From<&FrameStart> for FramesSkippedEvent {
    fn from(start: &FrameStart) -> Self {
        Self {
            sequence: start.sequence,
            skipped_frames: start.skipped_frames,
            intended_frame_time: start.intended_frame_time,
            frame_time: start.frame_time,
        }
    }
}

/// Emitted when a pulse was consumed without running a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameDeferredEvent {
    /// Pulse counter.
    pub sequence: u64,
    /// Why the pulse was dropped.
    pub reason: DeferReason,
    /// Frame time the pulse resolved to.
    pub frame_time: HostTime,
    /// Frame time of the last committed frame.
    pub last_frame_time: HostTime,
}

/// Marks the beginning of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Pulse counter of the frame.
    pub sequence: u64,
    /// Which phase is starting.
    pub phase: Phase,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
    /// Number of callbacks due in this phase.
    pub callbacks: u32,
}

/// Marks the end of a phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Pulse counter of the frame.
    pub sequence: u64,
    /// Which phase is ending.
    pub phase: Phase,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// Emitted when the commit phase re-anchors the frame time.
#[derive(Clone, Copy, Debug)]
pub struct CommitAdjustEvent {
    /// Pulse counter of the frame.
    pub sequence: u64,
    /// Frame time before the adjustment.
    pub previous_frame_time: HostTime,
    /// Frame time commit callbacks observe.
    pub adjusted_frame_time: HostTime,
    /// How far the commit phase trailed the frame time.
    pub commit_jitter: Duration,
}

impl CommitAdjustEvent {
    /// Creates an event from a [`CommitAdjustment`] in frame `sequence`.
    #[must_use]
    pub fn new(sequence: u64, adjustment: &CommitAdjustment) -> Self {
        Self {
            sequence,
            previous_frame_time: adjustment.previous,
            adjusted_frame_time: adjustment.adjusted,
            commit_jitter: adjustment.commit_jitter,
        }
    }
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Pulse counter.
    pub sequence: u64,
    /// Frame time committed at the start of the frame.
    pub frame_time: HostTime,
    /// Frame time carried by the pulse.
    pub intended_frame_time: HostTime,
    /// Whole intervals skipped before the frame started.
    pub skipped_frames: u64,
    /// Wall time spent in each phase, in nanoseconds, indexed by
    /// [`Phase::index`] (0 if the phase had nothing due).
    pub phase_nanos: [u64; Phase::COUNT],
    /// Callbacks run across all phases.
    pub callbacks_run: u32,
    /// Whether the commit phase re-anchored the frame time.
    pub commit_adjusted: bool,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame loop.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a pulse reaches the owner thread.
    fn on_vsync_pulse(&mut self, e: &VsyncPulseEvent) {
        _ = e;
    }

    /// Called when a pulse arrived one or more intervals late.
    fn on_frames_skipped(&mut self, e: &FramesSkippedEvent) {
        _ = e;
    }

    /// Called when a pulse was dropped without running a frame.
    fn on_frame_deferred(&mut self, e: &FrameDeferredEvent) {
        _ = e;
    }

    /// Called at the beginning of a phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when the commit phase re-anchors the frame time.
    fn on_commit_adjust(&mut self, e: &CommitAdjustEvent) {
        _ = e;
    }

    /// Called with a per-frame timing summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:expr) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer for an optional sink.
    #[inline]
    #[must_use]
    pub fn from_option(sink: Option<&'a mut dyn TraceSink>) -> Self {
        match sink {
            Some(sink) => Self::new(sink),
            None => Self::none(),
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`VsyncPulseEvent`].
    #[inline]
    pub fn vsync_pulse(&mut self, e: &VsyncPulseEvent) {
        emit!(self, on_vsync_pulse, e);
    }

    /// Emits a [`FramesSkippedEvent`].
    #[inline]
    pub fn frames_skipped(&mut self, e: &FramesSkippedEvent) {
        emit!(self, on_frames_skipped, e);
    }

    /// Emits a [`FrameDeferredEvent`].
    #[inline]
    pub fn frame_deferred(&mut self, e: &FrameDeferredEvent) {
        emit!(self, on_frame_deferred, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        emit!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        emit!(self, on_phase_end, e);
    }

    /// Emits a [`CommitAdjustEvent`].
    #[inline]
    pub fn commit_adjust(&mut self, e: &CommitAdjustEvent) {
        emit!(self, on_commit_adjust, e);
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        emit!(self, on_frame_summary, s);
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps during a frame and produces a [`FrameSummary`].
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    start: FrameStart,
    phase_starts: [Option<HostTime>; Phase::COUNT],
    phase_ends: [Option<HostTime>; Phase::COUNT],
    callbacks_run: u32,
    commit_adjusted: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for a frame that passed its anomaly checks.
    #[must_use]
    pub fn new(start: &FrameStart) -> Self {
        Self {
            start: *start,
            phase_starts: [None; Phase::COUNT],
            phase_ends: [None; Phase::COUNT],
            callbacks_run: 0,
            commit_adjusted: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: Phase, t: HostTime) {
        self.phase_starts[phase.index()] = Some(t);
    }

    /// Records the end of a phase and how many callbacks it ran.
    pub fn phase_end(&mut self, phase: Phase, t: HostTime, callbacks: u32) {
        self.phase_ends[phase.index()] = Some(t);
        self.callbacks_run = self.callbacks_run.saturating_add(callbacks);
    }

    /// Notes that the commit phase re-anchored the frame time.
    pub fn set_commit_adjusted(&mut self) {
        self.commit_adjusted = true;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        let mut phase_nanos = [0; Phase::COUNT];
        for phase in Phase::ALL {
            phase_nanos[phase.index()] = self.phase_duration(phase);
        }
        FrameSummary {
            sequence: self.start.sequence,
            frame_time: self.start.frame_time,
            intended_frame_time: self.start.intended_frame_time,
            skipped_frames: self.start.skipped_frames,
            phase_nanos,
            callbacks_run: self.callbacks_run,
            commit_adjusted: self.commit_adjusted,
        }
    }

    fn phase_duration(&self, phase: Phase) -> u64 {
        let idx = phase.index();
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).nanos(),
            _ => 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
