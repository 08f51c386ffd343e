// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as tagged little-endian records. [`decode`] reads them back as an
//! iterator of [`RecordedEvent`]. Decoding stops at the first unknown tag or
//! truncated record.

use cadence_core::frame::DeferReason;
use cadence_core::phase::Phase;
use cadence_core::time::{Duration, HostTime};
use cadence_core::trace::{
    CommitAdjustEvent, FrameDeferredEvent, FrameSummary, FramesSkippedEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, VsyncPulseEvent,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_VSYNC_PULSE: u8 = 1;
const TAG_FRAMES_SKIPPED: u8 = 2;
const TAG_FRAME_DEFERRED: u8 = 3;
const TAG_PHASE_BEGIN: u8 = 4;
const TAG_PHASE_END: u8 = 5;
const TAG_COMMIT_ADJUST: u8 = 6;
const TAG_FRAME_SUMMARY: u8 = 7;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_time(&mut self, t: HostTime) {
        self.write_u64(t.nanos());
    }

    fn write_phase(&mut self, p: Phase) {
        #[expect(
            clippy::cast_possible_truncation,
            reason = "phase indices are below Phase::COUNT"
        )]
        self.write_u8(p.index() as u8);
    }

    fn write_reason(&mut self, r: DeferReason) {
        self.write_u8(match r {
            DeferReason::BackwardTime => 0,
            DeferReason::Throttled => 1,
        });
    }
}

impl TraceSink for RecorderSink {
    fn on_vsync_pulse(&mut self, e: &VsyncPulseEvent) {
        self.write_u8(TAG_VSYNC_PULSE);
        self.write_u64(e.sequence);
        self.write_time(e.timestamp);
        self.write_time(e.received_at);
    }

    fn on_frames_skipped(&mut self, e: &FramesSkippedEvent) {
        self.write_u8(TAG_FRAMES_SKIPPED);
        self.write_u64(e.sequence);
        self.write_u64(e.skipped_frames);
        self.write_time(e.intended_frame_time);
        self.write_time(e.frame_time);
    }

    fn on_frame_deferred(&mut self, e: &FrameDeferredEvent) {
        self.write_u8(TAG_FRAME_DEFERRED);
        self.write_u64(e.sequence);
        self.write_reason(e.reason);
        self.write_time(e.frame_time);
        self.write_time(e.last_frame_time);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.sequence);
        self.write_phase(e.phase);
        self.write_time(e.timestamp);
        self.write_u32(e.callbacks);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.sequence);
        self.write_phase(e.phase);
        self.write_time(e.timestamp);
    }

    fn on_commit_adjust(&mut self, e: &CommitAdjustEvent) {
        self.write_u8(TAG_COMMIT_ADJUST);
        self.write_u64(e.sequence);
        self.write_time(e.previous_frame_time);
        self.write_time(e.adjusted_frame_time);
        self.write_u64(e.commit_jitter.nanos());
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.sequence);
        self.write_time(s.frame_time);
        self.write_time(s.intended_frame_time);
        self.write_u64(s.skipped_frames);
        for nanos in s.phase_nanos {
            self.write_u64(nanos);
        }
        self.write_u32(s.callbacks_run);
        self.write_u8(u8::from(s.commit_adjusted));
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`VsyncPulseEvent`].
    VsyncPulse(VsyncPulseEvent),
    /// A [`FramesSkippedEvent`].
    FramesSkipped(FramesSkippedEvent),
    /// A [`FrameDeferredEvent`].
    FrameDeferred(FrameDeferredEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CommitAdjustEvent`].
    CommitAdjust(CommitAdjustEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_phase(&mut self) -> Option<Phase> {
        Phase::from_index(usize::from(self.read_u8()?))
    }

    fn read_reason(&mut self) -> Option<DeferReason> {
        match self.read_u8()? {
            0 => Some(DeferReason::BackwardTime),
            1 => Some(DeferReason::Throttled),
            _ => None,
        }
    }

    fn decode_vsync_pulse(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::VsyncPulse(VsyncPulseEvent {
            sequence: self.read_u64()?,
            timestamp: self.read_time()?,
            received_at: self.read_time()?,
        }))
    }

    fn decode_frames_skipped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FramesSkipped(FramesSkippedEvent {
            sequence: self.read_u64()?,
            skipped_frames: self.read_u64()?,
            intended_frame_time: self.read_time()?,
            frame_time: self.read_time()?,
        }))
    }

    fn decode_frame_deferred(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameDeferred(FrameDeferredEvent {
            sequence: self.read_u64()?,
            reason: self.read_reason()?,
            frame_time: self.read_time()?,
            last_frame_time: self.read_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            sequence: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
            callbacks: self.read_u32()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            sequence: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_commit_adjust(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::CommitAdjust(CommitAdjustEvent {
            sequence: self.read_u64()?,
            previous_frame_time: self.read_time()?,
            adjusted_frame_time: self.read_time()?,
            commit_jitter: Duration(self.read_u64()?),
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        let sequence = self.read_u64()?;
        let frame_time = self.read_time()?;
        let intended_frame_time = self.read_time()?;
        let skipped_frames = self.read_u64()?;
        let mut phase_nanos = [0; Phase::COUNT];
        for slot in &mut phase_nanos {
            *slot = self.read_u64()?;
        }
        Some(RecordedEvent::FrameSummary(FrameSummary {
            sequence,
            frame_time,
            intended_frame_time,
            skipped_frames,
            phase_nanos,
            callbacks_run: self.read_u32()?,
            commit_adjusted: self.read_u8()? != 0,
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_VSYNC_PULSE => self.decode_vsync_pulse(),
            TAG_FRAMES_SKIPPED => self.decode_frames_skipped(),
            TAG_FRAME_DEFERRED => self.decode_frame_deferred(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_COMMIT_ADJUST => self.decode_commit_adjust(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
