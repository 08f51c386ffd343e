// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace sink delivery from a running `Choreographer`.

#![cfg(feature = "trace")]

mod common;

use std::sync::Arc;

use cadence_core::phase::Phase;
use cadence_core::trace::{
    CommitAdjustEvent, FrameDeferredEvent, FrameSummary, FramesSkippedEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, VsyncPulseEvent,
};
use cadence_core::vsync::VsyncPulse;
use cadence_loop::{Action, FrameMessage};
use common::{Harness, START, ms};
use parking_lot::Mutex;

#[derive(Clone, Default)]
struct Events {
    lines: Arc<Mutex<Vec<String>>>,
    summaries: Arc<Mutex<Vec<FrameSummary>>>,
}

impl TraceSink for Events {
    fn on_vsync_pulse(&mut self, e: &VsyncPulseEvent) {
        self.lines.lock().push(format!("pulse {}", e.sequence));
    }

    fn on_frames_skipped(&mut self, e: &FramesSkippedEvent) {
        self.lines.lock().push(format!("skipped {}", e.skipped_frames));
    }

    fn on_frame_deferred(&mut self, e: &FrameDeferredEvent) {
        self.lines.lock().push(format!("deferred {:?}", e.reason));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.lines.lock().push(format!("begin {} x{}", e.phase, e.callbacks));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.lines.lock().push(format!("end {}", e.phase));
    }

    fn on_commit_adjust(&mut self, e: &CommitAdjustEvent) {
        self.lines
            .lock()
            .push(format!("commit adjust {}", e.commit_jitter.as_millis()));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.summaries.lock().push(*s);
    }
}

#[test]
fn frame_emits_pulse_phase_and_summary_events() {
    let h = Harness::vsync();
    let events = Events::default();
    h.choreographer.set_trace_sink(Some(Box::new(events.clone())));

    let clock = h.clock.clone();
    h.choreographer
        .post_callback(
            Phase::Input,
            Action::run(move || {
                clock.advance(ms(25));
                Ok(())
            }),
            None,
        )
        .unwrap();
    h.choreographer.post_callback(Phase::Commit, h.logger("c"), None).unwrap();

    h.clock.set(START + ms(12));
    h.looper
        .handle()
        .post(FrameMessage::RunFrame {
            pulse: Some(VsyncPulse {
                timestamp: START,
                sequence: 4,
            }),
        })
        .unwrap();
    h.pump();

    assert_eq!(
        *events.lines.lock(),
        [
            "pulse 4",
            "skipped 1",
            "begin input x1",
            "end input",
            "commit adjust 27",
            "begin commit x1",
            "end commit",
        ]
    );

    let summaries = events.summaries.lock();
    assert_eq!(summaries.len(), 1);
    let summary = summaries[0];
    assert_eq!(summary.sequence, 4);
    assert_eq!(summary.skipped_frames, 1);
    assert_eq!(summary.frame_time, START + ms(10));
    assert_eq!(summary.callbacks_run, 2);
    assert!(summary.commit_adjusted);
}

#[test]
fn throttled_pulse_emits_deferred_event() {
    let h = Harness::vsync();
    let events = Events::default();
    h.choreographer.set_trace_sink(Some(Box::new(events.clone())));
    h.choreographer.set_fps_divisor(3);

    h.choreographer.post_callback(Phase::Input, h.logger("a"), None).unwrap();
    h.choreographer.do_frame(START, 1).unwrap();
    h.choreographer.post_callback(Phase::Input, h.logger("b"), None).unwrap();
    h.clock.advance(ms(10));
    h.choreographer.do_frame(START + ms(10), 2).unwrap();

    assert!(
        events.lines.lock().contains(&"deferred Throttled".to_owned()),
        "missing deferral: {:?}",
        events.lines.lock()
    );
}
