use std::time::Instant;

use crate::backend::FrameScheduler;

/// Lifecycle of a session's frame loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Running,
    Stopped,
}

/// Session time base, latched at the first tick.
#[derive(Debug, Default)]
pub struct SessionClock {
    start: Option<Instant>,
    last: f32,
}

impl SessionClock {
    /// Seconds since the first call; never decreases.
    pub fn elapsed(&mut self, now: Instant) -> f32 {
        let start = *self.start.get_or_insert(now);
        let seconds = now.saturating_duration_since(start).as_secs_f32();
        self.last = self.last.max(seconds);
        self.last
    }

    pub fn started(&self) -> bool {
        self.start.is_some()
    }
}

/// One draw per scheduler tick, owned by a single session.
#[derive(Debug)]
pub struct RenderLoop {
    state: LoopState,
    clock: SessionClock,
    frames: u64,
}

impl Default for RenderLoop {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderLoop {
    pub fn new() -> Self {
        Self {
            state: LoopState::Idle,
            clock: SessionClock::default(),
            frames: 0,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == LoopState::Running
    }

    /// Frames whose draw was issued.
    pub fn frame_count(&self) -> u64 {
        self.frames
    }

    /// `Idle -> Running`; asks the scheduler for the first tick. Has no
    /// effect in any other state.
    pub fn start(&mut self, scheduler: &impl FrameScheduler) -> bool {
        if self.state != LoopState::Idle {
            return false;
        }
        self.state = LoopState::Running;
        scheduler.request_frame();
        true
    }

    /// Opens a tick: schedules the next one, then returns the session time
    /// to draw with. `None` when the loop is not running.
    pub fn begin_tick(&mut self, scheduler: &impl FrameScheduler, now: Instant) -> Option<f32> {
        if self.state != LoopState::Running {
            tracing::trace!(state = ?self.state, "ignoring tick");
            return None;
        }
        scheduler.request_frame();
        Some(self.clock.elapsed(now))
    }

    pub fn finish_tick(&mut self) {
        self.frames += 1;
    }

    /// Moves to `Stopped` and revokes the pending tick.
    pub fn stop(&mut self, scheduler: &impl FrameScheduler) {
        if self.state == LoopState::Stopped {
            return;
        }
        if self.state == LoopState::Running {
            scheduler.cancel_frame();
        }
        self.state = LoopState::Stopped;
        tracing::debug!(frames = self.frames, "render loop stopped");
    }
}
