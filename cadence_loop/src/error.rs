// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Error types.

use cadence_core::phase::Phase;
use thiserror::Error;

/// Error returned by a failing callback.
pub type CallbackError = Box<dyn core::error::Error + Send + Sync>;

/// Result returned by callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// A rejected post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PostError {
    /// Delays are measured forward from now.
    #[error("callback delay must not be negative (got {delay_millis} ms)")]
    NegativeDelay {
        /// The rejected delay.
        delay_millis: i64,
    },
}

/// The frame time was read outside a running phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FrameTimeError {
    /// No phase callbacks are executing.
    #[error("frame time is only available while frame callbacks are running")]
    NotRunningCallbacks,
}

/// A frame stopped early.
#[derive(Debug, Error)]
pub enum FrameError {
    /// A callback returned an error. The rest of its batch was dropped and
    /// later phases of the frame did not run.
    #[error("{phase} callback failed")]
    Callback {
        /// Phase the callback was posted to.
        phase: Phase,
        /// The callback's error.
        #[source]
        source: CallbackError,
    },
}

/// A message could not be queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum LooperError {
    /// [`LooperHandle::quit`](crate::LooperHandle::quit) was called.
    #[error("looper has quit")]
    Quit,
}
