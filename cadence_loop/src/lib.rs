// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Owner-thread integration for the cadence frame scheduler.
//!
//! This crate wires the pure pieces of `cadence_core` to threads and clocks:
//!
//! - [`Looper`] / [`LooperHandle`]: the owner thread's timed message queue.
//! - [`Choreographer`]: the locked scheduler. Any thread posts callbacks into
//!   its five phase queues; the owner thread runs frames.
//! - [`PulseSender`] / [`ThreadVsync`]: pulse delivery from foreign threads,
//!   and a timer-thread pulse source.
//! - [`SystemClock`] / [`ManualClock`]: monotonic time sources.
//!
//! ```no_run
//! use cadence_core::config::ChoreographerConfig;
//! use cadence_core::phase::Phase;
//! use cadence_loop::{Action, Choreographer, Looper, SystemClock};
//!
//! let looper = Looper::new(SystemClock::shared());
//! let choreographer = Choreographer::new(looper.handle(), ChoreographerConfig::software(), None);
//! let handle = looper.handle();
//! choreographer
//!     .post_callback(
//!         Phase::Traversal,
//!         Action::run(move || {
//!             handle.quit();
//!             Ok(())
//!         }),
//!         None,
//!     )
//!     .unwrap();
//! looper.run(|message| choreographer.dispatch(message)).unwrap();
//! ```
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Forwards to `cadence_core/trace`, so an
//!   installed [`TraceSink`](cadence_core::trace::TraceSink) receives events.

mod action;
mod choreographer;
mod clock;
mod error;
mod looper;
mod vsync;

pub use action::{Action, Token};
pub use choreographer::{Choreographer, FrameMessage, FrameOutcome, FrameReport};
pub use clock::{ManualClock, SharedClock, SystemClock};
pub use error::{CallbackError, CallbackResult, FrameError, FrameTimeError, LooperError, PostError};
pub use looper::{Looper, LooperHandle};
pub use vsync::{PulseSender, ThreadVsync};
