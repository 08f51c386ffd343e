// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Phase queues and frame timing for a vsync-driven frame scheduler.
//!
//! `cadence_core` holds the parts of a per-thread frame scheduler that do not
//! depend on threads, clocks, or an event loop. It is `no_std` compatible
//! (with `alloc`) and every policy takes the current time as an argument, so
//! it can be exercised without sleeping.
//!
//! # Architecture
//!
//! ```text
//!   post(phase, action, delay)
//!       │
//!       ▼
//!   PhaseQueue::insert ──► RecordPool (arena, free list)
//!
//!   VsyncSource::arm ··· VsyncPulse
//!                            │
//!                            ▼
//!   FrameState::begin_frame ──► FrameDecision
//!                                   │ Run
//!                                   ▼
//!   for phase in Phase::ALL:  PhaseQueue::extract_due ──► DueBatch
//!                             (commit: FrameState::adjust_commit)
//! ```
//!
//! **[`phase`]**: The five ordered frame phases.
//!
//! **[`pool`]**: Generational arena that recycles callback records.
//!
//! **[`queue`]**: Stable, due-time sorted lists threaded through the pool.
//!
//! **[`frame`]**: Frame scheduling flags and the per-pulse decision: stale
//! pulse debounce, skipped-frame re-anchoring, backward-time guard,
//! throttling, and commit re-anchoring.
//!
//! **[`vsync`]**: The [`VsyncSource`](vsync::VsyncSource) contract.
//!
//! **[`config`]**: Scheduler configuration.
//!
//! **[`time`]**: Nanosecond host time, durations, and the
//! [`Clock`](time::Clock) seam.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame-loop instrumentation, with zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `serde` (disabled by default): Derives `Serialize`/`Deserialize` for
//!   time values, phases, and configuration.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

#[cfg(test)]
extern crate std;

pub mod config;
pub mod frame;
pub mod phase;
pub mod pool;
pub mod queue;
pub mod time;
pub mod trace;
pub mod vsync;
