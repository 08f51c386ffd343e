// Copyright 2026 the Cadence Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-thread frame scheduler.
//!
//! A [`Choreographer`] collects callbacks posted to the five [`Phase`]s and
//! runs them once per display frame on its owner thread. Any thread may post
//! or cancel; frames only run when the owner's [`Looper`](crate::Looper)
//! hands a [`FrameMessage`] to [`Choreographer::dispatch`].
//!
//! All scheduler state (frame flags, the five queues, the record pool, the
//! pulse source, and the trace sink) sits behind one mutex. Callbacks run
//! with the mutex released, so they may post, cancel, or read the frame time.

use std::fmt;
use std::sync::Arc;

use cadence_core::config::ChoreographerConfig;
use cadence_core::frame::{DeferReason, FrameDecision, FrameStart, FrameState};
use cadence_core::phase::Phase;
use cadence_core::pool::RecordPool;
use cadence_core::queue::{DueBatch, PhaseQueue};
use cadence_core::time::{Duration, HostTime};
use cadence_core::trace::{
    CommitAdjustEvent, FrameDeferredEvent, FrameSummaryBuilder, FramesSkippedEvent, PhaseBeginEvent,
    PhaseEndEvent, TraceSink, Tracer, VsyncPulseEvent,
};
use cadence_core::vsync::{VsyncPulse, VsyncSource};
use parking_lot::Mutex;

use crate::action::{Action, Token};
use crate::error::{CallbackResult, FrameError, FrameTimeError, PostError};
use crate::looper::LooperHandle;

/// Triggers the scheduler queues on its owner thread's loop.
#[derive(Clone, Debug)]
pub enum FrameMessage {
    /// Run a frame. `None` is a software timer tick stamped on arrival.
    RunFrame {
        /// The display pulse, if one drove this frame.
        pulse: Option<VsyncPulse>,
    },
    /// Arm the pulse source from the owner thread.
    ArmVsync,
    /// A delayed callback in `phase` may have become due.
    CallbackDue {
        /// Phase the callback was posted to.
        phase: Phase,
        /// The posted action, so cancelling it can drop this message too.
        action: Action,
    },
}

/// What a call to [`Choreographer::do_frame`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameOutcome {
    /// No frame was scheduled; the trigger was ignored.
    Stale,
    /// The pulse was dropped and the source re-armed. The frame stays
    /// scheduled.
    Deferred(DeferReason),
    /// Every phase ran.
    Ran(FrameReport),
}

/// Summary of a frame that ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FrameReport {
    /// Frame time observed by the first four phases.
    pub frame_time: HostTime,
    /// Pulse sequence (zero for software-timed frames).
    pub sequence: u64,
    /// Whole intervals the pulse was late by.
    pub skipped_frames: u64,
    /// Callbacks run across all phases.
    pub callbacks_run: u32,
}

#[derive(Clone, Debug)]
struct Entry {
    action: Action,
    token: Option<Token>,
}

struct State {
    frame: FrameState,
    queues: [PhaseQueue; Phase::COUNT],
    pool: RecordPool<Entry>,
    vsync: Option<Box<dyn VsyncSource>>,
    frame_delay: Duration,
    sink: Option<Box<dyn TraceSink + Send>>,
}

impl State {
    fn release_vsync(&mut self) {
        if let Some(mut vsync) = self.vsync.take() {
            vsync.release();
        }
    }
}

// Runs on whichever thread drops the last `Choreographer` clone.
impl Drop for State {
    fn drop(&mut self) {
        self.release_vsync();
    }
}

fn tracer(sink: &mut Option<Box<dyn TraceSink + Send>>) -> Tracer<'_> {
    Tracer::from_option(sink.as_deref_mut().map(|s| s as &mut dyn TraceSink))
}

struct Inner {
    state: Mutex<State>,
    looper: LooperHandle<FrameMessage>,
}

/// Coordinates phase callbacks with display pulses for one owner thread.
///
/// Cloning is cheap (Arc bump); clones share the same scheduler.
#[derive(Clone)]
pub struct Choreographer {
    inner: Arc<Inner>,
}

impl fmt::Debug for Choreographer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("Choreographer")
            .field("frame", &state.frame)
            .field("has_vsync", &state.vsync.is_some())
            .field("frame_delay", &state.frame_delay)
            .finish_non_exhaustive()
    }
}

impl Choreographer {
    /// Creates a scheduler for the thread owning `looper`.
    ///
    /// With `config.use_vsync` and a `vsync` source, frames follow the
    /// source's pulses and the interval follows its refresh rate. Otherwise
    /// frames are paced by a software timer on the loop and any source given
    /// is released immediately.
    #[must_use]
    pub fn new(
        looper: LooperHandle<FrameMessage>,
        config: ChoreographerConfig,
        vsync: Option<Box<dyn VsyncSource>>,
    ) -> Self {
        let vsync = match vsync {
            Some(mut source) if !config.use_vsync => {
                source.release();
                None
            }
            other => other,
        };
        let refresh_rate_hz = vsync
            .as_ref()
            .map_or(config.refresh_rate_hz, |v| v.refresh_rate_hz());
        let mut frame = FrameState::new(Duration::from_refresh_rate(refresh_rate_hz))
            .with_skip_warning_threshold(config.skip_warning_threshold);
        frame.set_fps_divisor(config.fps_divisor);

        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    frame,
                    queues: [PhaseQueue::new(); Phase::COUNT],
                    pool: RecordPool::new(),
                    vsync,
                    frame_delay: config.frame_delay,
                    sink: None,
                }),
                looper,
            }),
        }
    }

    /// Installs or removes the trace sink.
    pub fn set_trace_sink(&self, sink: Option<Box<dyn TraceSink + Send>>) {
        self.inner.state.lock().sink = sink;
    }

    // -----------------------------------------------------------------------
    // Posting
    // -----------------------------------------------------------------------

    /// Posts `action` to `phase`, due `delay_millis` from now.
    ///
    /// Callbacks that are already due run in the next frame, which is
    /// scheduled if needed. Later ones wake the owner loop when they become
    /// due.
    pub fn post(
        &self,
        phase: Phase,
        action: Action,
        token: Option<Token>,
        delay_millis: i64,
    ) -> Result<(), PostError> {
        let delay = u64::try_from(delay_millis).map_err(|_| PostError::NegativeDelay { delay_millis })?;
        let now = self.inner.looper.now();
        let due = now.saturating_add(Duration::from_millis(delay));

        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let entry = Entry {
            action: action.clone(),
            token,
        };
        state.queues[phase.index()].insert(&mut state.pool, due, entry);

        if due <= now {
            self.schedule_frame_locked(state, now);
        } else {
            drop(guard);
            self.post_message_at(due, FrameMessage::CallbackDue { phase, action });
        }
        Ok(())
    }

    /// Posts `action` to `phase`, due now.
    pub fn post_callback(&self, phase: Phase, action: Action, token: Option<Token>) -> Result<(), PostError> {
        self.post(phase, action, token, 0)
    }

    /// Posts a frame-time callback to [`Phase::Animation`] for the next frame.
    pub fn post_frame_callback(&self, action: Action) -> Result<(), PostError> {
        self.post_frame_callback_delayed(action, 0)
    }

    /// Posts a frame-time callback to [`Phase::Animation`], due
    /// `delay_millis` from now.
    pub fn post_frame_callback_delayed(&self, action: Action, delay_millis: i64) -> Result<(), PostError> {
        self.post(Phase::Animation, action, Some(Token::FRAME_CALLBACK), delay_millis)
    }

    /// Removes queued callbacks in `phase` matching `action` and `token`.
    ///
    /// `None` matches anything. When only an action is given, pending due
    /// notifications for it are dropped too. Returns the number of queued
    /// callbacks removed.
    pub fn cancel(&self, phase: Phase, action: Option<&Action>, token: Option<Token>) -> usize {
        let removed = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.queues[phase.index()].remove_matching(&mut state.pool, |entry| {
                action.is_none_or(|a| entry.action.same(a)) && token.is_none_or(|t| entry.token == Some(t))
            })
        };
        if let (Some(action), None) = (action, token) {
            self.inner.looper.remove_where(|message| {
                matches!(message, FrameMessage::CallbackDue { action: pending, .. } if pending.same(action))
            });
        }
        removed
    }

    /// Removes a callback posted with
    /// [`post_frame_callback`](Self::post_frame_callback).
    pub fn remove_frame_callback(&self, action: &Action) -> usize {
        self.cancel(Phase::Animation, Some(action), Some(Token::FRAME_CALLBACK))
    }

    /// Requests a frame without posting a callback.
    pub fn schedule_frame(&self) {
        let now = self.inner.looper.now();
        let mut state = self.inner.state.lock();
        self.schedule_frame_locked(&mut state, now);
    }

    fn schedule_frame_locked(&self, state: &mut State, now: HostTime) {
        if !state.frame.request_frame() {
            return;
        }
        let next = state
            .frame
            .last_frame_time()
            .saturating_add(state.frame_delay)
            .max(now);
        self.arm_locked(state, next);
    }

    /// Asks for the next pulse; without a source, queues a timer frame at
    /// `software_at`.
    fn arm_locked(&self, state: &mut State, software_at: HostTime) {
        match state.vsync.as_mut() {
            Some(vsync) if self.inner.looper.is_owner_thread() => {
                tracing::trace!("arming vsync source");
                vsync.arm();
            }
            Some(_) => {
                tracing::trace!("forwarding vsync arm to the owner thread");
                if self.inner.looper.post_at_front(FrameMessage::ArmVsync).is_err() {
                    tracing::debug!("dropping vsync arm request; looper has quit");
                }
            }
            None => {
                tracing::trace!(at_ns = software_at.nanos(), "scheduling software frame");
                self.post_message_at(software_at, FrameMessage::RunFrame { pulse: None });
            }
        }
    }

    fn post_message_at(&self, when: HostTime, message: FrameMessage) {
        if self.inner.looper.post_at(when, message).is_err() {
            tracing::debug!("dropping frame message; looper has quit");
        }
    }

    // -----------------------------------------------------------------------
    // Owner-thread side
    // -----------------------------------------------------------------------

    /// Handles a message from the owner loop.
    pub fn dispatch(&self, message: FrameMessage) -> Result<(), FrameError> {
        match message {
            FrameMessage::RunFrame { pulse: Some(pulse) } => {
                {
                    let mut state = self.inner.state.lock();
                    let event = VsyncPulseEvent::new(&pulse, self.inner.looper.now());
                    tracer(&mut state.sink).vsync_pulse(&event);
                }
                self.do_frame(pulse.timestamp, pulse.sequence)?;
            }
            FrameMessage::RunFrame { pulse: None } => {
                self.do_frame(self.inner.looper.now(), 0)?;
            }
            FrameMessage::ArmVsync => {
                let mut state = self.inner.state.lock();
                if state.frame.is_frame_scheduled()
                    && let Some(vsync) = state.vsync.as_mut()
                {
                    vsync.arm();
                }
            }
            FrameMessage::CallbackDue { phase, .. } => {
                let now = self.inner.looper.now();
                let mut guard = self.inner.state.lock();
                let state = &mut *guard;
                if !state.frame.is_frame_scheduled() && state.queues[phase.index()].has_due(&state.pool, now) {
                    self.schedule_frame_locked(state, now);
                }
            }
        }
        Ok(())
    }

    /// Runs a frame for a pulse stamped `frame_time`.
    ///
    /// Must be called on the owner thread.
    pub fn do_frame(&self, frame_time: HostTime, sequence: u64) -> Result<FrameOutcome, FrameError> {
        let start = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.looper.now();
            match state.frame.begin_frame(frame_time, sequence, now) {
                FrameDecision::Stale => return Ok(FrameOutcome::Stale),
                FrameDecision::Defer {
                    reason,
                    frame_time: resolved,
                } => {
                    self.defer_locked(state, reason, resolved, sequence, now);
                    return Ok(FrameOutcome::Deferred(reason));
                }
                FrameDecision::Run(start) => {
                    if start.skipped_frames > 0 {
                        tracer(&mut state.sink).frames_skipped(&FramesSkippedEvent::from(&start));
                    }
                    if start.warn {
                        tracing::warn!(
                            skipped_frames = start.skipped_frames,
                            "skipped {} frames; the owner thread may be doing too much work",
                            start.skipped_frames
                        );
                    }
                    start
                }
            }
        };

        let mut summary = FrameSummaryBuilder::new(&start);
        let mut callbacks_run = 0_u32;
        for phase in Phase::ALL {
            match self.run_phase(phase, &start, &mut summary) {
                Ok(ran) => callbacks_run = callbacks_run.saturating_add(ran),
                Err(err) => {
                    self.reschedule_leftovers();
                    return Err(err);
                }
            }
        }

        let mut state = self.inner.state.lock();
        tracer(&mut state.sink).frame_summary(&summary.finish());

        Ok(FrameOutcome::Ran(FrameReport {
            frame_time: start.frame_time,
            sequence: start.sequence,
            skipped_frames: start.skipped_frames,
            callbacks_run,
        }))
    }

    /// Schedules another frame for callbacks left due by an aborted frame.
    fn reschedule_leftovers(&self) {
        let now = self.inner.looper.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        let pool = &state.pool;
        if state.queues.iter().any(|queue| queue.has_due(pool, now)) {
            self.schedule_frame_locked(state, now);
        }
    }

    fn defer_locked(
        &self,
        state: &mut State,
        reason: DeferReason,
        frame_time: HostTime,
        sequence: u64,
        now: HostTime,
    ) {
        let last = state.frame.last_frame_time();
        tracing::debug!(
            ?reason,
            frame_time_ns = frame_time.nanos(),
            last_frame_time_ns = last.nanos(),
            "deferring frame to the next pulse"
        );
        tracer(&mut state.sink).frame_deferred(&FrameDeferredEvent {
            sequence,
            reason,
            frame_time,
            last_frame_time: last,
        });

        let software_at = match reason {
            DeferReason::Throttled => {
                let window = state
                    .frame
                    .frame_interval()
                    .saturating_mul(u64::from(state.frame.fps_divisor()));
                last.saturating_add(window)
            }
            DeferReason::BackwardTime => last.saturating_add(state.frame_delay),
        };
        self.arm_locked(state, software_at.max(now));
    }

    /// Runs every callback due in `phase`. Returns how many ran.
    fn run_phase(
        &self,
        phase: Phase,
        start: &FrameStart,
        summary: &mut FrameSummaryBuilder,
    ) -> Result<u32, FrameError> {
        let (batch, frame_time) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let now = self.inner.looper.now();
            let batch = state.queues[phase.index()].extract_due(&mut state.pool, now);
            if batch.is_empty() {
                return Ok(0);
            }
            state.frame.set_callbacks_running(true);

            let mut frame_time = start.frame_time;
            if phase == Phase::Commit
                && let Some(adjustment) = state.frame.adjust_commit(frame_time, now)
            {
                tracing::debug!(
                    commit_jitter_ms = adjustment.commit_jitter.as_millis(),
                    "commit phase is late; re-anchoring frame time"
                );
                tracer(&mut state.sink).commit_adjust(&CommitAdjustEvent::new(start.sequence, &adjustment));
                summary.set_commit_adjusted();
                frame_time = adjustment.adjusted;
            }

            tracer(&mut state.sink).phase_begin(&PhaseBeginEvent {
                sequence: start.sequence,
                phase,
                timestamp: now,
                callbacks: u32::try_from(batch.len()).unwrap_or(u32::MAX),
            });
            summary.phase_begin(phase, now);
            (batch, frame_time)
        };

        let (ran, result) = self.run_batch(&batch, frame_time);

        {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            state.frame.set_callbacks_running(false);
            batch.recycle(&mut state.pool);
            let end = self.inner.looper.now();
            tracer(&mut state.sink).phase_end(&PhaseEndEvent {
                sequence: start.sequence,
                phase,
                timestamp: end,
            });
            summary.phase_end(phase, end, ran);
        }

        result.map(|()| ran).map_err(|source| FrameError::Callback { phase, source })
    }

    /// Invokes the batch in order with the lock released around each call.
    /// Stops at the first error.
    fn run_batch(&self, batch: &DueBatch, frame_time: HostTime) -> (u32, CallbackResult) {
        let mut cursor = batch.head();
        let mut ran = 0_u32;
        while let Some(id) = cursor {
            let action = {
                let state = self.inner.state.lock();
                let Some(record) = state.pool.get(id) else {
                    break;
                };
                cursor = record.next();
                record.payload.action.clone()
            };
            ran += 1;
            if let Err(err) = action.invoke(frame_time) {
                return (ran, Err(err));
            }
        }
        (ran, Ok(()))
    }

    // -----------------------------------------------------------------------
    // Queries and settings
    // -----------------------------------------------------------------------

    /// Frame time of the frame whose callbacks are running.
    pub fn current_frame_time(&self) -> Result<HostTime, FrameTimeError> {
        self.inner
            .state
            .lock()
            .frame
            .current_frame_time()
            .ok_or(FrameTimeError::NotRunningCallbacks)
    }

    /// [`current_frame_time`](Self::current_frame_time) in whole milliseconds.
    pub fn frame_time_millis(&self) -> Result<u64, FrameTimeError> {
        self.current_frame_time().map(HostTime::as_millis)
    }

    /// Frame time of the last frame that ran. Zero before the first frame.
    #[must_use]
    pub fn last_frame_time(&self) -> HostTime {
        self.inner.state.lock().frame.last_frame_time()
    }

    /// Pulse sequence of the last frame that ran.
    #[must_use]
    pub fn last_frame_sequence(&self) -> u64 {
        self.inner.state.lock().frame.frame_sequence()
    }

    /// Whether a frame has been requested and not yet run.
    #[must_use]
    pub fn is_frame_scheduled(&self) -> bool {
        self.inner.state.lock().frame.is_frame_scheduled()
    }

    /// Number of callbacks queued in `phase`.
    #[must_use]
    pub fn pending_callbacks(&self, phase: Phase) -> usize {
        self.inner.state.lock().queues[phase.index()].len()
    }

    /// Current display frame interval.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        self.inner.state.lock().frame.frame_interval()
    }

    /// Recomputes the frame interval after a display mode change.
    pub fn set_refresh_rate(&self, hz: f64) {
        let interval = Duration::from_refresh_rate(hz);
        tracing::debug!(hz, interval_ns = interval.nanos(), "display refresh rate changed");
        self.inner.state.lock().frame.set_frame_interval(interval);
    }

    /// Runs a frame only every `divisor` pulses. Zero is treated as one.
    pub fn set_fps_divisor(&self, divisor: u32) {
        self.inner.state.lock().frame.set_fps_divisor(divisor);
    }

    /// Spacing of software-timed frames.
    #[must_use]
    pub fn frame_delay(&self) -> Duration {
        self.inner.state.lock().frame_delay
    }

    /// Sets the spacing of software-timed frames.
    pub fn set_frame_delay(&self, delay: Duration) {
        self.inner.state.lock().frame_delay = delay;
    }

    /// Releases the pulse source. Later frames fall back to the software
    /// timer, including a frame that was waiting on the released source.
    ///
    /// Call on the owner thread. This is the only way to release the source
    /// there: otherwise it is released by whichever thread drops the last
    /// clone, and actions that capture a clone keep the scheduler alive
    /// until they are run or cancelled.
    pub fn shutdown(&self) {
        let now = self.inner.looper.now();
        let mut guard = self.inner.state.lock();
        let state = &mut *guard;
        if state.vsync.is_none() {
            return;
        }
        state.release_vsync();
        if state.frame.is_frame_scheduled() {
            tracing::debug!("re-arming pending frame on the software timer");
            let next = state
                .frame
                .last_frame_time()
                .saturating_add(state.frame_delay)
                .max(now);
            self.arm_locked(state, next);
        }
    }
}
