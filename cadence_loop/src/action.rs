// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Callback values and cancellation tokens.

use std::fmt;
use std::sync::Arc;

use cadence_core::time::HostTime;

use crate::error::CallbackResult;

type RunFn = dyn Fn() -> CallbackResult + Send + Sync;
type FrameFn = dyn Fn(HostTime) -> CallbackResult + Send + Sync;

#[derive(Clone)]
enum Kind {
    Run(Arc<RunFn>),
    Frame(Arc<FrameFn>),
}

/// A unit of work posted to a phase.
///
/// Cloning is cheap (Arc bump). Two actions are equal only if one is a clone
/// of the other, which is what [`cancel`](crate::Choreographer::cancel)
/// matches on.
#[derive(Clone)]
pub struct Action(Kind);

impl Action {
    /// Wraps a callback that ignores the frame time.
    pub fn run<F>(f: F) -> Self
    where
        F: Fn() -> CallbackResult + Send + Sync + 'static,
    {
        Self(Kind::Run(Arc::new(f)))
    }

    /// Wraps a callback that receives the frame time.
    pub fn frame<F>(f: F) -> Self
    where
        F: Fn(HostTime) -> CallbackResult + Send + Sync + 'static,
    {
        Self(Kind::Frame(Arc::new(f)))
    }

    /// Whether this action receives the frame time.
    #[must_use]
    pub fn is_frame_callback(&self) -> bool {
        matches!(self.0, Kind::Frame(_))
    }

    /// Runs the callback for a frame at `frame_time`.
    pub fn invoke(&self, frame_time: HostTime) -> CallbackResult {
        match &self.0 {
            Kind::Run(f) => f(),
            Kind::Frame(f) => f(frame_time),
        }
    }

    /// Identity comparison.
    #[must_use]
    pub fn same(&self, other: &Self) -> bool {
        match (&self.0, &other.0) {
            (Kind::Run(a), Kind::Run(b)) => Arc::ptr_eq(a, b),
            (Kind::Frame(a), Kind::Frame(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl PartialEq for Action {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Action {}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.0 {
            Kind::Run(_) => "run",
            Kind::Frame(_) => "frame",
        };
        f.debug_tuple("Action").field(&kind).finish()
    }
}

/// Opaque tag for grouping posts so they can be cancelled together.
///
/// Every `u64` is available to clients. Entries posted through
/// [`post_frame_callback`](crate::Choreographer::post_frame_callback) carry a
/// separate tag that no client token equals.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Token(TokenKind);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum TokenKind {
    Client(u64),
    FrameCallback,
}

impl Token {
    pub(crate) const FRAME_CALLBACK: Self = Self(TokenKind::FrameCallback);

    /// Creates a client token.
    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(TokenKind::Client(value))
    }

    /// The client value, or `None` for the frame callback tag.
    #[must_use]
    pub const fn value(self) -> Option<u64> {
        match self.0 {
            TokenKind::Client(value) => Some(value),
            TokenKind::FrameCallback => None,
        }
    }
}

impl From<u64> for Token {
    fn from(value: u64) -> Self {
        Self::new(value)
    }
}
