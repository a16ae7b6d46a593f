use std::collections::HashSet;

use crate::corpus::NodeId;
use crate::scene::{EdgeKind, NodeKind, VisualNode};
use crate::study::{LearningState, StudyProgress};

/// Every live visual attribute moves this fraction of the remaining distance
/// to its target per tick. Tick-count based on purpose, not dt-normalized —
/// the settle-frame countdown is calibrated against it.
pub const LERP_RATE: f32 = 0.15;
/// Below this delta an attribute counts as converged.
pub const CONVERGE_EPS: f32 = 0.005;
/// A node is click/hover-visible above this live opacity.
pub const VISIBLE_OPACITY: f32 = 0.1;

pub const PARENT_EDGE_ALPHA: f32 = 0.15;
pub const CROSS_EDGE_ALPHA: f32 = 0.06;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EmissiveTint {
    /// The node's own base color.
    #[default]
    Own,
    /// Review-due amber.
    Amber,
}

pub const AMBER_TINT: [f32; 3] = [0.8, 0.533, 0.2];

/// Per-frame computed targets; never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTargets {
    pub opacity: f32,
    pub glow: f32,
    pub label: f32,
    pub tint: EmissiveTint,
}

/// Live, smoothed visual attributes of one node.
#[derive(Debug, Clone)]
pub struct NodeVisual {
    pub opacity: f32,
    pub glow: f32,
    pub label_opacity: f32,
    pub emissive: f32,
    /// Absolute mesh scale; equals the node radius at rest.
    pub scale: f32,
    pub tint: EmissiveTint,
}

impl NodeVisual {
    /// Snap to the base targets at scene-build time (the only snap allowed).
    pub fn at_rest(node: &VisualNode) -> Self {
        let base = base_targets(node.kind);
        Self {
            opacity: base.opacity,
            glow: base.glow,
            label_opacity: base.label,
            emissive: emissive_target(base.glow),
            scale: node.radius,
            tint: EmissiveTint::Own,
        }
    }

    /// One smoothing step toward `t`.
    pub fn approach(&mut self, t: &NodeTargets) {
        self.opacity = approach(self.opacity, t.opacity);
        self.glow = approach(self.glow, t.glow);
        self.label_opacity = approach(self.label_opacity, t.label);
        self.emissive = approach(self.emissive, emissive_target(t.glow));
        self.tint = t.tint;
    }

    pub fn converged_to(&self, t: &NodeTargets) -> bool {
        (self.opacity - t.opacity).abs() < CONVERGE_EPS
            && (self.glow - t.glow).abs() < CONVERGE_EPS
            && (self.label_opacity - t.label).abs() < CONVERGE_EPS
            && (self.emissive - emissive_target(t.glow)).abs() < CONVERGE_EPS
    }
}

pub fn approach(current: f32, target: f32) -> f32 {
    current + (target - current) * LERP_RATE
}

pub fn emissive_target(glow_target: f32) -> f32 {
    if glow_target > 0.3 {
        0.8
    } else {
        0.45
    }
}

fn base_targets(kind: NodeKind) -> NodeTargets {
    match kind {
        NodeKind::Locus => NodeTargets {
            opacity: 1.0,
            glow: 0.62,
            label: 0.85,
            tint: EmissiveTint::Own,
        },
        NodeKind::Sub => NodeTargets {
            opacity: 0.9,
            glow: 0.35,
            label: 0.0,
            tint: EmissiveTint::Own,
        },
    }
}

/// Flythrough view of the resolver: membership plus the two focus ids and
/// the live bloom.
#[derive(Debug, Clone, Copy)]
pub struct FlyCtx<'a> {
    pub node_set: &'a HashSet<NodeId>,
    pub focus: Option<&'a NodeId>,
    pub prev: Option<&'a NodeId>,
    pub bloom: f32,
    pub transition_alpha: f32,
}

/// Frame-local union of highlight sources. Read, never owned, by the
/// resolver; `search` and `path` are externally supplied sets.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveCtx<'a> {
    pub filter_category: Option<&'a str>,
    /// Hover or selection id plus its cached adjacency highlight set.
    pub highlight: Option<(&'a NodeId, &'a HashSet<NodeId>)>,
    /// Guided-path membership and the current step, if a path is active.
    pub path: Option<(&'a HashSet<NodeId>, Option<&'a NodeId>)>,
    pub search: Option<&'a HashSet<NodeId>>,
    pub fly: Option<FlyCtx<'a>>,
    /// Engine time in seconds (pulsation phase) and wall-clock epoch millis
    /// (review aging).
    pub time: f32,
    pub now_ms: u64,
}

/// Ordered layering of highlight rules. Later rules override earlier ones
/// where they apply; hover/selection outranks path and search results (a
/// hovered search hit renders hover-tier), the cinematic flythrough outranks
/// everything, and studied-node pulsation applies last as a floor, not an
/// override.
pub fn node_targets(node: &VisualNode, ctx: &ResolveCtx<'_>, study: &StudyProgress) -> NodeTargets {
    let mut t = base_targets(node.kind);

    if let Some(cat) = ctx.filter_category {
        if node.category != cat {
            t.opacity = 0.04;
            t.glow = 0.02;
            t.label = 0.0;
        } else {
            t.glow = 0.5;
        }
    }

    if let Some((path_set, current)) = ctx.path {
        if path_set.contains(&node.id) {
            let is_current = current == Some(&node.id);
            t.glow = if is_current { 0.85 } else { 0.45 };
            t.opacity = 1.0;
            t.label = 0.9;
        } else {
            t.opacity = 0.04;
            t.glow = 0.01;
            t.label = 0.0;
        }
    }

    if let Some(search_set) = ctx.search {
        if search_set.contains(&node.id) {
            t.glow = 0.75;
            t.opacity = 1.0;
            t.label = 0.9;
        } else {
            t.opacity = 0.04;
            t.glow = 0.01;
            t.label = 0.0;
        }
    }

    if let Some((highlight_id, set)) = ctx.highlight {
        if set.contains(&node.id) {
            t.glow = if &node.id == highlight_id { 0.85 } else { 0.6 };
            t.opacity = 1.0;
            t.label = if node.kind == NodeKind::Locus { 1.0 } else { 0.0 };
        } else if ctx.filter_category.is_none() {
            t.opacity = 0.08;
            t.glow = 0.02;
            t.label = 0.1;
        }
    }

    if let Some(fly) = ctx.fly {
        if fly.node_set.contains(&node.id) {
            if fly.focus == Some(&node.id) {
                let bloom = fly.bloom.max(0.0);
                t.glow = 0.85 + bloom * 0.4;
                t.opacity = 1.0;
                t.label = 1.0;
            } else if fly.prev == Some(&node.id) {
                t.glow = 0.4;
                t.opacity = 0.85;
                t.label = 0.6;
            } else {
                t.glow = 0.15;
                t.opacity = 0.5;
                t.label = 0.35;
            }
        } else {
            t.opacity = 0.03;
            t.glow = 0.008;
            t.label = 0.0;
        }
    }

    match study.learning_state(&node.id, ctx.now_ms) {
        LearningState::Unstudied => {}
        LearningState::ReviewDue => {
            // Desynchronized amber pulse: phase offset rides the position.
            let pulse = 0.25 + 0.15 * (ctx.time * 2.2 + node.position.x * 0.5).sin();
            t.glow = t.glow.max(pulse);
            t.tint = EmissiveTint::Amber;
        }
        LearningState::Connected => {
            let glow = 0.35 + 0.08 * (ctx.time * 0.8 + node.position.y * 0.3).sin();
            t.glow = t.glow.max(glow);
        }
    }
    if study.is_studied(&node.id) {
        t.glow = t.glow.max(0.3);
    }

    t
}

/// Edge alpha under the same priority layering, applied to both endpoints'
/// membership. `from_opacity`/`to_opacity` are the endpoints' live opacities.
#[allow(clippy::too_many_arguments)]
pub fn edge_alpha(
    kind: EdgeKind,
    from: &NodeId,
    to: &NodeId,
    from_opacity: f32,
    to_opacity: f32,
    from_category: &str,
    to_category: &str,
    ctx: &ResolveCtx<'_>,
) -> f32 {
    let mut alpha = match kind {
        EdgeKind::Parent => PARENT_EDGE_ALPHA,
        EdgeKind::Cross => CROSS_EDGE_ALPHA,
    };

    if let Some((highlight_id, _)) = ctx.highlight {
        if from == highlight_id || to == highlight_id {
            alpha = if from_opacity > 0.05 && to_opacity > 0.05 {
                0.4
            } else {
                0.005
            };
        } else {
            alpha = 0.005;
        }
    }

    if let Some((path_set, _)) = ctx.path {
        alpha = if path_set.contains(from) && path_set.contains(to) {
            0.3
        } else {
            0.003
        };
    }

    if let Some(search_set) = ctx.search {
        alpha = if search_set.contains(from) && search_set.contains(to) {
            0.25
        } else {
            0.003
        };
    }

    if let Some(fly) = ctx.fly {
        if fly.node_set.contains(from) && fly.node_set.contains(to) {
            let touches_focus = fly.focus == Some(from) || fly.focus == Some(to);
            let is_transition = (fly.focus == Some(from) && fly.prev == Some(to))
                || (fly.focus == Some(to) && fly.prev == Some(from));
            alpha = if is_transition {
                0.15 + fly.transition_alpha * 0.55
            } else if touches_focus {
                0.45
            } else {
                0.08
            };
        } else {
            alpha = 0.003;
        }
    }

    if let Some(cat) = ctx.filter_category {
        if from_category != cat || to_category != cat {
            alpha = 0.003;
        }
    }

    alpha
}

/// Directional arrow marker alpha (cross edges only). Arrows follow the
/// highlight/path/flythrough layers; search leaves them untouched.
pub fn arrow_alpha(from: &NodeId, to: &NodeId, ctx: &ResolveCtx<'_>) -> f32 {
    let mut alpha = 0.0;
    if let Some((highlight_id, _)) = ctx.highlight {
        if from == highlight_id || to == highlight_id {
            alpha = 0.7;
        }
    }
    if let Some((path_set, _)) = ctx.path {
        if path_set.contains(from) && path_set.contains(to) {
            alpha = 0.5;
        }
    }
    if let Some(fly) = ctx.fly {
        if fly.node_set.contains(from) && fly.node_set.contains(to) {
            let touches_focus = fly.focus == Some(from) || fly.focus == Some(to);
            alpha = if touches_focus { 0.65 } else { 0.15 };
        } else {
            alpha = 0.0;
        }
    }
    alpha
}
