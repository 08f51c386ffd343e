// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Contract for display pulse sources.
//!
//! A pulse source is anything that can be asked for "the next display
//! refresh" and later reports it as a [`VsyncPulse`]. Hardware display links,
//! compositor frame callbacks, and timer threads all fit. How a source talks
//! to the platform is its own business; the scheduler only relies on the
//! following:
//!
//! - **Arming**: [`VsyncSource::arm`] requests exactly one future pulse. It
//!   never blocks. Arming an already armed source is harmless and still
//!   produces a single pulse.
//!
//! - **Delivery**: the pulse reaches the owner thread asynchronously, as a
//!   new trigger on its event loop. Sources are handed a sender for this when
//!   they are constructed; they do not call into the scheduler directly.
//!
//! - **Owner affinity**: `arm` is only called from the owner thread. Sources
//!   that must be poked from elsewhere do their own hand-off.
//!
//! - **Release**: [`VsyncSource::release`] is called at most once. An
//!   explicit scheduler shutdown calls it on the owner thread. A scheduler
//!   dropped without one calls it from whichever thread drops it last, so
//!   `release` must tolerate any thread. No pulses may be delivered
//!   afterwards.
//!
//! When no source is configured the scheduler falls back to a software timer
//! with the same contract, driven by its own event loop.

use crate::time::HostTime;

/// One display refresh reported by a [`VsyncSource`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VsyncPulse {
    /// Nominal time of the refresh.
    pub timestamp: HostTime,
    /// Monotonically increasing pulse counter assigned by the source.
    pub sequence: u64,
}

/// A source of display refresh pulses.
pub trait VsyncSource: Send {
    /// Requests the next pulse.
    fn arm(&mut self);

    /// Current refresh rate of the display driving this source, in hertz.
    fn refresh_rate_hz(&self) -> f64;

    /// Unregisters from the platform. Called at most once, normally on the
    /// owner thread; see the module docs for the drop case.
    fn release(&mut self) {}
}

impl<S: VsyncSource + ?Sized> VsyncSource for alloc::boxed::Box<S> {
    fn arm(&mut self) {
        (**self).arm();
    }

    fn refresh_rate_hz(&self) -> f64 {
        (**self).refresh_rate_hz()
    }

    fn release(&mut self) {
        (**self).release();
    }
}
