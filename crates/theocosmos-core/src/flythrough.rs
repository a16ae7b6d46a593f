use std::collections::HashSet;

use crate::corpus::NodeId;

pub const DWELL_TIME: f32 = 5.5;
pub const TRANSITION_TIME: f32 = 2.5;
/// Orbit radius while dwelling on a node / while framing a transition.
pub const DWELL_RADIUS: f32 = 28.0;
pub const TRANSITION_RADIUS: f32 = 36.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlyPhase {
    Dwell,
    Transition,
}

/// Outcome of one unpaused tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlyStep {
    Idle,
    Running,
    /// Focus advanced to a new node this tick (arrival bloom fired).
    Arrived(NodeId),
    /// The path is exhausted; the controller reset itself.
    Finished,
}

/// Timed state machine for the cinematic tour: Inactive → dwelling ⇄
/// transitioning → Inactive. Self-terminates past the last node.
#[derive(Debug, Clone, Default)]
pub struct Flythrough {
    pub active: bool,
    pub paused: bool,
    pub path_ids: Vec<NodeId>,
    pub node_set: HashSet<NodeId>,
    pub current_idx: usize,
    /// Seconds into the current dwell+transition phase pair.
    pub progress: f32,
    pub name: String,
    pub color: String,
    pub focus_id: Option<NodeId>,
    pub prev_focus_id: Option<NodeId>,
    /// Rises then falls across a transition to animate the connecting edge.
    pub transition_edge_alpha: f32,
    /// Decaying burst added to the focus node's glow and mesh scale.
    pub arrival_glow: f32,
}

impl Flythrough {
    /// `ids` must already be filtered to nodes that exist in the scene and
    /// hold at least two entries — the engine enforces that.
    pub fn start(&mut self, ids: Vec<NodeId>, name: String, color: String) {
        debug_assert!(ids.len() >= 2);
        self.node_set = ids.iter().cloned().collect();
        self.focus_id = ids.first().cloned();
        self.path_ids = ids;
        self.active = true;
        self.paused = false;
        self.current_idx = 0;
        self.progress = 0.0;
        self.name = name;
        self.color = color;
        self.prev_focus_id = None;
        self.transition_edge_alpha = 0.0;
        self.arrival_glow = 1.0;
    }

    pub fn stop(&mut self) {
        *self = Flythrough::default();
    }

    pub fn phase(&self) -> FlyPhase {
        if self.progress < DWELL_TIME {
            FlyPhase::Dwell
        } else {
            FlyPhase::Transition
        }
    }

    /// Normalized position inside the transition phase.
    pub fn transition_t(&self) -> f32 {
        ((self.progress - DWELL_TIME) / TRANSITION_TIME).clamp(0.0, 1.0)
    }

    pub fn next_id(&self) -> Option<&NodeId> {
        let next = (self.current_idx + 1).min(self.path_ids.len().saturating_sub(1));
        self.path_ids.get(next)
    }

    /// Advance timing and phase transitions. Camera easing stays with the
    /// engine; this only owns progress, bloom, edge alpha and the index.
    pub fn advance(&mut self, dt: f32) -> FlyStep {
        if !self.active || self.paused {
            return FlyStep::Idle;
        }
        self.progress += dt;
        if self.arrival_glow > 0.0 {
            self.arrival_glow -= dt * 1.5;
        }

        if self.progress >= DWELL_TIME + TRANSITION_TIME {
            self.progress = 0.0;
            self.prev_focus_id = self.focus_id.clone();
            self.current_idx += 1;
            if self.current_idx >= self.path_ids.len() {
                self.stop();
                return FlyStep::Finished;
            }
            self.focus_id = Some(self.path_ids[self.current_idx].clone());
            self.arrival_glow = 1.0;
            self.transition_edge_alpha = 0.0;
            return FlyStep::Arrived(self.path_ids[self.current_idx].clone());
        }

        match self.phase() {
            FlyPhase::Dwell => self.transition_edge_alpha *= 0.95,
            FlyPhase::Transition => {
                // Peaks mid-transition, zero at both ends.
                self.transition_edge_alpha = (self.transition_t() * std::f32::consts::PI).sin();
            }
        }
        FlyStep::Running
    }
}
