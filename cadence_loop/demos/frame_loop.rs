// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Drives a choreographer from a timer-thread vsync source.
//!
//! An animation callback re-posts itself every frame and stalls once to show
//! skipped-frame recovery. Run with `RUST_LOG=cadence_loop=trace` for the
//! full scheduling log.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, OnceLock};

use cadence_core::config::ChoreographerConfig;
use cadence_core::phase::Phase;
use cadence_core::time::HostTime;
use cadence_loop::{Action, Choreographer, Looper, PulseSender, SystemClock, ThreadVsync};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

const FRAMES: u32 = 120;
const STALL_AT: u32 = 30;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .init();

    let looper = Looper::new(SystemClock::shared());
    let vsync = ThreadVsync::spawn(PulseSender::new(looper.handle()), 60.0)?;
    let config = ChoreographerConfig {
        skip_warning_threshold: 3,
        ..ChoreographerConfig::vsync()
    };
    let choreographer = Choreographer::new(looper.handle(), config, Some(Box::new(vsync)));

    let frames = Arc::new(AtomicU32::new(0));
    let this: Arc<OnceLock<Action>> = Arc::new(OnceLock::new());
    let animate = Action::frame({
        let choreographer = choreographer.clone();
        let frames = Arc::clone(&frames);
        let this = Arc::clone(&this);
        let handle = looper.handle();
        move |frame_time: HostTime| {
            let n = frames.fetch_add(1, Ordering::SeqCst) + 1;
            if n == STALL_AT {
                tracing::info!("stalling the owner thread for 80ms");
                std::thread::sleep(std::time::Duration::from_millis(80));
            }
            if n >= FRAMES {
                handle.quit();
                return Ok(());
            }
            if n % 30 == 0 {
                tracing::info!(frame = n, frame_time_ms = frame_time.as_millis(), "animating");
            }
            if let Some(me) = this.get() {
                choreographer.post_frame_callback(me.clone())?;
            }
            Ok(())
        }
    });
    _ = this.set(animate.clone());

    let commit = Action::run({
        let choreographer = choreographer.clone();
        move || {
            let frame_ms = choreographer.frame_time_millis()?;
            tracing::trace!(frame_ms, "commit");
            Ok(())
        }
    });

    choreographer.post_frame_callback(animate)?;
    choreographer.post_callback(Phase::Commit, commit, None)?;

    let result = looper.run(|message| choreographer.dispatch(message));
    choreographer.shutdown();
    result?;

    tracing::info!(
        frames = frames.load(Ordering::SeqCst),
        last_frame_ms = choreographer.last_frame_time().as_millis(),
        "done"
    );
    Ok(())
}
