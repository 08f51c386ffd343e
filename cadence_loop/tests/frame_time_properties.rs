// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame-time invariants under arbitrary pulse delivery.

mod common;

use std::sync::Arc;

use cadence_core::phase::Phase;
use cadence_loop::{Action, FrameOutcome};
use common::{Harness, INTERVAL, ms};
use parking_lot::Mutex;
use proptest::prelude::*;

proptest! {
    #[test]
    fn observed_frame_times_never_decrease(
        steps in prop::collection::vec((0_u64..40, 0_u64..60, 1_u32..4), 1..60),
    ) {
        let h = Harness::vsync();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let record = {
            let seen = Arc::clone(&seen);
            Action::frame(move |t| {
                seen.lock().push(t);
                Ok(())
            })
        };

        let mut sequence = 0;
        for (advance, lag, divisor) in steps {
            h.choreographer.set_fps_divisor(divisor);
            if !h.choreographer.is_frame_scheduled() {
                h.choreographer.post_callback(Phase::Input, record.clone(), None).unwrap();
                h.choreographer.post_callback(Phase::Commit, record.clone(), None).unwrap();
            }
            h.clock.advance(ms(advance));
            let now = h.looper.handle().now();
            let pulse = now.saturating_sub(ms(lag));
            sequence += 1;

            let before = h.choreographer.last_frame_time();
            let outcome = h.choreographer.do_frame(pulse, sequence).unwrap();
            let after = h.choreographer.last_frame_time();
            prop_assert!(after >= before, "last frame time went back: {before:?} -> {after:?}");

            if let FrameOutcome::Ran(report) = outcome {
                prop_assert!(report.frame_time <= now);
                prop_assert!(now - report.frame_time < INTERVAL, "frame time not re-anchored");
            }
        }

        let seen = seen.lock();
        prop_assert!(
            seen.windows(2).all(|w| w[0] <= w[1]),
            "callbacks observed decreasing frame times: {seen:?}"
        );
    }
}
