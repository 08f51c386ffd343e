// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr). Host times
//! are printed in milliseconds, spans in microseconds.

use std::io::Write;

use cadence_core::phase::Phase;
use cadence_core::time::HostTime;
use cadence_core::trace::{
    CommitAdjustEvent, FrameDeferredEvent, FrameSummary, FramesSkippedEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, VsyncPulseEvent,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write + Send>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }

    /// Consumes the sink and returns its writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[expect(
    clippy::cast_precision_loss,
    reason = "display only"
)]
fn ms(t: HostTime) -> f64 {
    t.nanos() as f64 / 1_000_000.0
}

#[expect(
    clippy::cast_precision_loss,
    reason = "display only"
)]
fn us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_vsync_pulse(&mut self, e: &VsyncPulseEvent) {
        let _ = writeln!(
            self.writer,
            "[vsync] seq={} at {:.3}ms latency={:.1}µs",
            e.sequence,
            ms(e.timestamp),
            us(e.received_at.saturating_duration_since(e.timestamp).nanos()),
        );
    }

    fn on_frames_skipped(&mut self, e: &FramesSkippedEvent) {
        let _ = writeln!(
            self.writer,
            "[skip] seq={} skipped={} frame_time {:.3}ms -> {:.3}ms",
            e.sequence,
            e.skipped_frames,
            ms(e.intended_frame_time),
            ms(e.frame_time),
        );
    }

    fn on_frame_deferred(&mut self, e: &FrameDeferredEvent) {
        let _ = writeln!(
            self.writer,
            "[defer] seq={} reason={:?} frame_time={:.3}ms last={:.3}ms",
            e.sequence,
            e.reason,
            ms(e.frame_time),
            ms(e.last_frame_time),
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] seq={} {} x{} at {:.3}ms",
            e.sequence,
            e.phase,
            e.callbacks,
            ms(e.timestamp),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] seq={} {} at {:.3}ms",
            e.sequence,
            e.phase,
            ms(e.timestamp),
        );
    }

    fn on_commit_adjust(&mut self, e: &CommitAdjustEvent) {
        let _ = writeln!(
            self.writer,
            "[commit] seq={} jitter={:.1}µs frame_time {:.3}ms -> {:.3}ms",
            e.sequence,
            us(e.commit_jitter.nanos()),
            ms(e.previous_frame_time),
            ms(e.adjusted_frame_time),
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let _ = write!(
            self.writer,
            "[summary] seq={} frame_time={:.3}ms callbacks={} skipped={}",
            s.sequence,
            ms(s.frame_time),
            s.callbacks_run,
            s.skipped_frames,
        );
        for phase in Phase::ALL {
            let nanos = s.phase_nanos[phase.index()];
            if nanos > 0 {
                let _ = write!(self.writer, " {phase}={:.1}µs", us(nanos));
            }
        }
        let adjusted = if s.commit_adjusted { " commit=ADJUSTED" } else { "" };
        let _ = writeln!(self.writer, "{adjusted}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_print_phase() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            sequence: 1,
            phase: Phase::Traversal,
            timestamp: HostTime(2_000_000),
            callbacks: 4,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("[phase:begin]"), "got: {output}");
        assert!(output.contains("traversal x4"), "got: {output}");
        assert!(output.contains("2.000ms"), "got: {output}");
    }

    #[test]
    fn summary_lists_only_busy_phases() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_summary(&FrameSummary {
            sequence: 9,
            frame_time: HostTime(16_000_000),
            intended_frame_time: HostTime(16_000_000),
            skipped_frames: 0,
            phase_nanos: [1_500, 0, 0, 3_000, 0],
            callbacks_run: 3,
            commit_adjusted: false,
        });
        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.contains("input=1.5µs"), "got: {output}");
        assert!(output.contains("traversal=3.0µs"), "got: {output}");
        assert!(!output.contains("animation="), "got: {output}");
        assert!(output.ends_with('\n'), "got: {output}");
    }
}
