// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`export`] reads recorded bytes from a [`RecorderSink`](super::recorder::RecorderSink)
//! and writes [Chrome Trace Event Format][format] JSON to the given writer.
//! Phases become duration slices; pulses, skips, deferrals, commit
//! adjustments, and frame summaries become instant events.
//!
//! [format]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use cadence_core::phase::Phase;
use cadence_core::time::HostTime;
use serde_json::{Value, json};

use crate::recorder::{RecordedEvent, decode};

/// Exports recorded events as Chrome Trace Event Format JSON.
///
/// The output is a complete JSON array of trace event objects, suitable for
/// loading into `chrome://tracing` or [Perfetto](https://ui.perfetto.dev/).
/// Host times are nanoseconds and are written as microseconds.
pub fn export(bytes: &[u8], writer: &mut dyn Write) -> io::Result<()> {
    let mut events: Vec<Value> = Vec::new();

    for recorded in decode(bytes) {
        let event = match recorded {
            RecordedEvent::VsyncPulse(e) => json!({
                "ph": "i",
                "name": "VsyncPulse",
                "cat": "Vsync",
                "ts": time_us(e.received_at),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "sequence": e.sequence,
                    "latency_us": nanos_to_us(e.received_at.saturating_duration_since(e.timestamp).nanos()),
                }
            }),
            RecordedEvent::FramesSkipped(e) => json!({
                "ph": "i",
                "name": "FramesSkipped",
                "cat": "Anomaly",
                "ts": time_us(e.frame_time),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "sequence": e.sequence,
                    "skipped_frames": e.skipped_frames,
                    "intended_frame_time_us": time_us(e.intended_frame_time),
                }
            }),
            RecordedEvent::FrameDeferred(e) => json!({
                "ph": "i",
                "name": "FrameDeferred",
                "cat": "Anomaly",
                "ts": time_us(e.frame_time),
                "pid": 0,
                "tid": 0,
                "s": "g",
                "args": {
                    "sequence": e.sequence,
                    "reason": format!("{:?}", e.reason),
                    "last_frame_time_us": time_us(e.last_frame_time),
                }
            }),
            RecordedEvent::PhaseBegin(e) => json!({
                "ph": "B",
                "name": e.phase.as_str(),
                "cat": "Frame",
                "ts": time_us(e.timestamp),
                "pid": 0,
                "tid": 0,
                "args": {
                    "sequence": e.sequence,
                    "callbacks": e.callbacks,
                }
            }),
            RecordedEvent::PhaseEnd(e) => json!({
                "ph": "E",
                "name": e.phase.as_str(),
                "cat": "Frame",
                "ts": time_us(e.timestamp),
                "pid": 0,
                "tid": 0,
                "args": {
                    "sequence": e.sequence,
                }
            }),
            RecordedEvent::CommitAdjust(e) => json!({
                "ph": "i",
                "name": "CommitAdjust",
                "cat": "Anomaly",
                "ts": time_us(e.adjusted_frame_time),
                "pid": 0,
                "tid": 0,
                "s": "t",
                "args": {
                    "sequence": e.sequence,
                    "previous_frame_time_us": time_us(e.previous_frame_time),
                    "commit_jitter_us": nanos_to_us(e.commit_jitter.nanos()),
                }
            }),
            RecordedEvent::FrameSummary(s) => {
                let mut phases = serde_json::Map::new();
                for phase in Phase::ALL {
                    phases.insert(
                        format!("{}_us", phase.as_str()),
                        json!(nanos_to_us(s.phase_nanos[phase.index()])),
                    );
                }
                json!({
                    "ph": "i",
                    "name": "FrameSummary",
                    "cat": "Summary",
                    "ts": time_us(s.frame_time),
                    "pid": 0,
                    "tid": 0,
                    "s": "g",
                    "args": {
                        "sequence": s.sequence,
                        "skipped_frames": s.skipped_frames,
                        "callbacks_run": s.callbacks_run,
                        "commit_adjusted": s.commit_adjusted,
                        "phases": phases,
                    }
                })
            }
        };
        events.push(event);
    }

    serde_json::to_writer_pretty(writer, &events)?;
    Ok(())
}

fn time_us(t: HostTime) -> f64 {
    nanos_to_us(t.nanos())
}

#[expect(
    clippy::cast_precision_loss,
    reason = "trace viewers take f64 microseconds"
)]
fn nanos_to_us(nanos: u64) -> f64 {
    nanos as f64 / 1000.0
}
