/// Frame-scheduling discipline: a dirty flag plus a settle-frame countdown
/// gate the render loop, so a battery-powered device does no work while the
/// scene is visually at rest.
///
/// `mark_dirty` is the only way a stopped loop restarts; it is idempotent —
/// marking while a tick is already scheduled never double-schedules. The
/// hidden-tab pause composes with the settle mechanism: either condition
/// alone stops scheduling.
#[derive(Debug)]
pub struct DirtyScheduler {
    dirty: bool,
    dirty_frames: u32,
    settle_frames: u32,
    hidden: bool,
    scheduled: bool,
}

/// Everything outside the scheduler's own state that can keep the loop alive.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeepAlive {
    pub orbit_converged: bool,
    pub state_changed: bool,
    pub dragging: bool,
    pub flythrough_active: bool,
    pub pulsating: bool,
    pub auto_rotating: bool,
}

impl DirtyScheduler {
    pub fn new(settle_frames: u32) -> Self {
        Self {
            dirty: true,
            dirty_frames: settle_frames,
            settle_frames,
            hidden: false,
            scheduled: true,
        }
    }

    pub fn mark_dirty(&mut self) {
        self.mark_dirty_for(self.settle_frames);
    }

    /// Raise the countdown to at least `frames` (never lowers it).
    pub fn mark_dirty_for(&mut self, frames: u32) {
        self.dirty = true;
        self.dirty_frames = self.dirty_frames.max(frames);
        if !self.hidden {
            self.scheduled = true;
        }
    }

    /// Keep the countdown from dropping below `frames` without touching the
    /// dirty flag (flythrough / pause duty-cycle pinning).
    pub fn pin_frames(&mut self, frames: u32) {
        self.dirty_frames = self.dirty_frames.max(frames);
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.hidden = hidden;
        if hidden {
            // Cancel anything pending; visibility restore re-marks dirty.
            self.scheduled = false;
        } else {
            self.mark_dirty();
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.hidden
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    pub fn settle_frames(&self) -> u32 {
        self.settle_frames
    }

    /// Consume the pending schedule at tick entry (the animation-frame handle
    /// analogue). Returns false when no tick should run at all.
    pub fn begin_tick(&mut self) -> bool {
        if !self.scheduled || self.hidden {
            self.scheduled = false;
            return false;
        }
        self.scheduled = false;
        true
    }

    /// Decide whether the loop goes quiet. Counts the settle window down and,
    /// when every keep-alive condition clears, lets the loop stop: no next
    /// tick is scheduled until `mark_dirty` is called again.
    pub fn finish_tick(&mut self, keep: KeepAlive) -> bool {
        if keep.state_changed {
            self.dirty_frames = self.dirty_frames.max(self.settle_frames);
        }
        if self.dirty_frames > 0 {
            self.dirty_frames -= 1;
        }
        let settled = keep.orbit_converged
            && !keep.state_changed
            && self.dirty_frames == 0
            && !keep.dragging
            && !keep.flythrough_active
            && !keep.pulsating
            && !keep.auto_rotating;
        if settled {
            self.dirty = false;
            return false;
        }
        if !self.hidden {
            self.scheduled = true;
        }
        true
    }

    /// Failure-path cancellation: a tick that threw must leave nothing
    /// scheduled.
    pub fn cancel(&mut self) {
        self.scheduled = false;
        self.dirty = false;
        self.dirty_frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiet() -> KeepAlive {
        KeepAlive {
            orbit_converged: true,
            ..KeepAlive::default()
        }
    }

    /// Run ticks until the scheduler refuses to continue; panics if it never
    /// settles within `max` ticks.
    fn run_until_idle(s: &mut DirtyScheduler, keep: KeepAlive, max: u32) -> u32 {
        for i in 0..max {
            if !s.begin_tick() {
                return i;
            }
            if !s.finish_tick(keep) {
                return i + 1;
            }
        }
        panic!("scheduler never settled in {max} ticks");
    }

    #[test]
    fn settles_after_settle_frames_of_quiescence() {
        let mut s = DirtyScheduler::new(5);
        let ticks = run_until_idle(&mut s, quiet(), 100);
        assert_eq!(ticks, 5); // the settle window, then the loop goes quiet
        // Once idle, no tick runs until marked dirty again.
        assert!(!s.begin_tick());
        assert!(!s.begin_tick());
        s.mark_dirty();
        assert!(s.begin_tick());
    }

    #[test]
    fn mark_dirty_is_idempotent_while_scheduled() {
        let mut s = DirtyScheduler::new(3);
        s.mark_dirty();
        s.mark_dirty();
        s.mark_dirty();
        // Exactly one pending tick regardless of how many marks landed.
        assert!(s.begin_tick());
        assert!(!s.begin_tick());
    }

    #[test]
    fn keep_alive_conditions_prevent_idling() {
        let mut s = DirtyScheduler::new(2);
        let mut keep = quiet();
        keep.flythrough_active = true;
        for _ in 0..50 {
            assert!(s.begin_tick());
            assert!(s.finish_tick(keep));
        }
        keep.flythrough_active = false;
        keep.auto_rotating = true;
        for _ in 0..50 {
            assert!(s.begin_tick());
            assert!(s.finish_tick(keep));
        }
        keep.auto_rotating = false;
        run_until_idle(&mut s, keep, 100);
    }

    #[test]
    fn state_change_rewinds_the_countdown() {
        let mut s = DirtyScheduler::new(10);
        let mut keep = quiet();
        // Burn most of the countdown.
        for _ in 0..8 {
            assert!(s.begin_tick());
            assert!(s.finish_tick(keep));
        }
        keep.state_changed = true;
        assert!(s.begin_tick());
        assert!(s.finish_tick(keep));
        keep.state_changed = false;
        // Full settle window runs again.
        let ticks = run_until_idle(&mut s, keep, 100);
        assert!(ticks >= 9);
    }

    #[test]
    fn hidden_tab_cancels_and_resume_restarts() {
        let mut s = DirtyScheduler::new(4);
        assert!(s.is_scheduled());
        s.set_hidden(true);
        assert!(!s.begin_tick());
        // Marks while hidden do not schedule...
        s.mark_dirty();
        assert!(!s.begin_tick());
        // ...but becoming visible does.
        s.set_hidden(false);
        assert!(s.begin_tick());
    }

    #[test]
    fn unconverged_orbit_keeps_ticking_past_countdown() {
        let mut s = DirtyScheduler::new(2);
        let keep = KeepAlive::default(); // orbit_converged = false
        for _ in 0..30 {
            assert!(s.begin_tick());
            assert!(s.finish_tick(keep));
        }
    }

    #[test]
    fn cancel_clears_everything() {
        let mut s = DirtyScheduler::new(4);
        s.mark_dirty();
        s.cancel();
        assert!(!s.begin_tick());
        s.mark_dirty();
        assert!(s.begin_tick());
    }
}
