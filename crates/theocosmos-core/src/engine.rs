use glam::Vec3;
use std::collections::HashSet;
use tracing::debug;

use crate::adjacency::AdjacencyIndex;
use crate::camera::{CameraRig, Spherical};
use crate::corpus::{Corpus, NodeId};
use crate::flythrough::{
    FlyPhase, FlyStep, Flythrough, DWELL_RADIUS, TRANSITION_RADIUS,
};
use crate::geom::smoothstep;
use crate::octree::{Octree, SpatialItem};
use crate::quality::QualityPreset;
use crate::scene::{EdgeKind, SceneGraph};
use crate::scheduler::{DirtyScheduler, KeepAlive};
use crate::study::StudyProgress;
use crate::visual::{self, FlyCtx, NodeVisual, ResolveCtx};

pub const RAYCAST_MAX_DIST: f32 = 500.0;
/// Pointer travel beyond this many pixels turns a click into a drag.
const CLICK_DRAG_SUPPRESS: f32 = 5.0;
/// Upper bound on a single tick's delta (original clamps the clock too).
const DT_CLAMP: f32 = 0.05;
/// Extra settle frames granted on pointer movement so the hover raycast has
/// frames to run in.
const POINTER_WAKE_FRAMES: u32 = 10;

#[derive(Debug, Clone, Copy)]
struct SceneItem {
    position: Vec3,
    radius: f32,
}

impl SpatialItem for SceneItem {
    fn position(&self) -> Vec3 {
        self.position
    }
    fn radius(&self) -> f32 {
        self.radius
    }
}

/// Hover callback payload: the hovered node (None when hovering ended) and
/// the node's projected screen position for tooltip placement.
#[derive(Debug, Clone, PartialEq)]
pub struct HoverNotice {
    pub id: Option<NodeId>,
    pub screen: Option<(f32, f32)>,
    pub changed: bool,
}

/// What one tick produced, for the host to act on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// False when the scheduler kept the frame idle — nothing changed.
    pub ran: bool,
    pub hover: Option<HoverNotice>,
    /// Flythrough focus advanced to this node (overlay progress update).
    pub fly_advanced: Option<NodeId>,
    /// Flythrough exhausted its path and deactivated itself.
    pub fly_finished: bool,
}

#[derive(Debug, Clone)]
struct ActivePath {
    ids: Vec<NodeId>,
    set: HashSet<NodeId>,
    index: usize,
}

/// The engine instance: one per rendered cosmos, owned by the composition
/// root. External callers hold an [`crate::EngineBridge`], not a global.
///
/// Single-writer discipline: input methods only set targets and mark dirty;
/// all other mutation happens inside [`Engine::tick`].
pub struct Engine {
    scene: SceneGraph,
    octree: Octree<SceneItem>,
    adjacency: AdjacencyIndex,
    visuals: Vec<NodeVisual>,
    edge_alphas: Vec<f32>,
    /// Indices into the scene edge list that carry a directional arrow.
    arrow_edges: Vec<usize>,
    arrow_alphas: Vec<f32>,
    camera: CameraRig,
    scheduler: DirtyScheduler,
    flythrough: Flythrough,
    study: StudyProgress,
    quality: QualityPreset,

    // Highlight context. Hover/selection/filter are owned here; search and
    // path sets are owned by the UI controller and merely passed in.
    hovered: Option<NodeId>,
    selected: Option<NodeId>,
    filter_category: Option<String>,
    search_results: Option<HashSet<NodeId>>,
    active_path: Option<ActivePath>,
    /// Adjacency highlight set, cached keyed on the highlighted id.
    highlight_cache: Option<(NodeId, HashSet<NodeId>)>,

    // Pointer state. Exactly one pointer id may drive the orbit.
    active_pointer: Option<u64>,
    dragging: bool,
    drag_touch: bool,
    drag_start: (f32, f32),
    drag_dist: f32,
    last_pointer: Option<(f32, f32)>,
    pointer_screen: Option<(f32, f32)>,
    pinch_start: Option<(f32, f32)>,

    // Change tracking against the previous tick.
    last_filter: Option<String>,
    last_selected: Option<NodeId>,
    last_hovered: Option<NodeId>,
    last_fly_focus: Option<NodeId>,
    /// Set when an externally-owned highlight set (search results, guided
    /// path) was replaced; consumed by the next tick's change detection.
    sets_dirty: bool,

    hover_frame: u32,
    /// Animation time: advances only while ticks run (pulsation phase).
    time: f32,
    /// Host time: advances on every call, idle or not (resume deadlines).
    wall_time: f32,
    epoch_ms: u64,
    discard_next_dt: bool,
}

impl Engine {
    pub fn new(corpus: &Corpus, quality: QualityPreset, now_ms: u64, width: f32, height: f32) -> Self {
        let scene = SceneGraph::build(corpus);
        let items = scene
            .nodes
            .iter()
            .map(|n| SceneItem {
                position: n.position,
                radius: n.radius,
            })
            .collect();
        let octree = Octree::build(items);
        let adjacency = AdjacencyIndex::build(&scene.edges);
        let visuals = scene.nodes.iter().map(NodeVisual::at_rest).collect();
        let edge_alphas = scene
            .edges
            .iter()
            .map(|e| match e.kind {
                EdgeKind::Parent => visual::PARENT_EDGE_ALPHA,
                EdgeKind::Cross => visual::CROSS_EDGE_ALPHA,
            })
            .collect();
        let arrow_edges: Vec<usize> = if quality.enable_arrows {
            scene
                .edges
                .iter()
                .enumerate()
                .filter(|(_, e)| e.kind == EdgeKind::Cross)
                .map(|(i, _)| i)
                .collect()
        } else {
            Vec::new()
        };
        let arrow_alphas = vec![0.0; arrow_edges.len()];
        debug!(
            nodes = scene.nodes.len(),
            edges = scene.edges.len(),
            "scene graph and spatial indexes built"
        );

        Self {
            octree,
            adjacency,
            visuals,
            edge_alphas,
            arrow_edges,
            arrow_alphas,
            camera: CameraRig::new(width, height),
            scheduler: DirtyScheduler::new(quality.settle_frames),
            flythrough: Flythrough::default(),
            study: StudyProgress::default(),
            quality,
            scene,
            hovered: None,
            selected: None,
            filter_category: None,
            search_results: None,
            active_path: None,
            highlight_cache: None,
            active_pointer: None,
            dragging: false,
            drag_touch: false,
            drag_start: (0.0, 0.0),
            drag_dist: 0.0,
            last_pointer: None,
            pointer_screen: None,
            pinch_start: None,
            last_filter: None,
            last_selected: None,
            last_hovered: None,
            last_fly_focus: None,
            sets_dirty: false,
            hover_frame: 0,
            time: 0.0,
            wall_time: 0.0,
            epoch_ms: now_ms,
            discard_next_dt: false,
        }
    }

    // ----- read access for the rendering collaborator -----

    pub fn scene(&self) -> &SceneGraph {
        &self.scene
    }

    pub fn visuals(&self) -> &[NodeVisual] {
        &self.visuals
    }

    pub fn edge_alphas(&self) -> &[f32] {
        &self.edge_alphas
    }

    pub fn arrow_edges(&self) -> &[usize] {
        &self.arrow_edges
    }

    pub fn arrow_alphas(&self) -> &[f32] {
        &self.arrow_alphas
    }

    pub fn camera(&self) -> &CameraRig {
        &self.camera
    }

    pub fn flythrough(&self) -> &Flythrough {
        &self.flythrough
    }

    pub fn study(&self) -> &StudyProgress {
        &self.study
    }

    pub fn quality(&self) -> &QualityPreset {
        &self.quality
    }

    pub fn hovered(&self) -> Option<&NodeId> {
        self.hovered.as_ref()
    }

    pub fn selected(&self) -> Option<&NodeId> {
        self.selected.as_ref()
    }

    pub fn filter_category(&self) -> Option<&str> {
        self.filter_category.as_deref()
    }

    pub fn active_path(&self) -> Option<(&[NodeId], usize)> {
        self.active_path.as_ref().map(|p| (p.ids.as_slice(), p.index))
    }

    pub fn adjacency(&self) -> &AdjacencyIndex {
        &self.adjacency
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduler.is_scheduled()
    }

    pub fn now_ms(&self) -> u64 {
        self.epoch_ms + (self.wall_time * 1000.0) as u64
    }

    // ----- commands (set targets + mark dirty, nothing else) -----

    pub fn mark_dirty(&mut self) {
        self.scheduler.mark_dirty();
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.camera.set_viewport(width, height);
        self.scheduler.mark_dirty();
    }

    /// Unknown ids are a silent no-op.
    pub fn focus_node(&mut self, id: &NodeId, zoom: f32) {
        let Some(node) = self.scene.node(id) else {
            return;
        };
        self.camera.focus(node.position, zoom);
        self.scheduler.mark_dirty();
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        match id {
            Some(id) => {
                if !self.scene.contains(&id) {
                    return;
                }
                self.selected = Some(id);
                self.camera.stop_auto_rotate();
            }
            None => self.selected = None,
        }
        self.scheduler.mark_dirty();
    }

    pub fn filter_by_category(&mut self, category: Option<String>) {
        self.filter_category = category;
        self.scheduler.mark_dirty();
    }

    /// Hard view reset: the one place current camera values are set directly
    /// instead of chasing their targets.
    pub fn reset_view(&mut self) {
        self.camera.target_spherical = Spherical::default();
        self.camera.target_orbit_target = Vec3::ZERO;
        self.camera.snap_to_targets();
        self.scheduler.mark_dirty();
    }

    /// Search-result highlight set, owned by the UI controller.
    pub fn set_search_results(&mut self, ids: Option<HashSet<NodeId>>) {
        self.search_results = ids;
        self.sets_dirty = true;
        self.scheduler.mark_dirty();
    }

    /// Guided-path highlight, owned by the UI controller.
    pub fn set_active_path(&mut self, ids: Option<Vec<NodeId>>, index: usize) {
        self.active_path = ids.map(|ids| {
            let set = ids.iter().cloned().collect();
            let index = index.min(ids.len().saturating_sub(1));
            ActivePath { ids, set, index }
        });
        self.sets_dirty = true;
        self.scheduler.mark_dirty();
    }

    pub fn set_path_index(&mut self, index: usize) {
        if let Some(path) = &mut self.active_path {
            path.index = index.min(path.ids.len().saturating_sub(1));
            self.sets_dirty = true;
            self.scheduler.mark_dirty();
        }
    }

    /// Returns the node's new studied state; unknown ids are a no-op (None).
    pub fn toggle_studied(&mut self, id: &NodeId) -> Option<bool> {
        if !self.scene.contains(id) {
            return None;
        }
        let now = self.now_ms();
        let studied = self.study.toggle(id, now);
        self.scheduler.mark_dirty();
        Some(studied)
    }

    pub fn load_study_progress(
        &mut self,
        entries: impl IntoIterator<Item = (NodeId, Option<u64>)>,
    ) {
        let now = self.now_ms();
        self.study = StudyProgress::load(entries, now);
        self.scheduler.mark_dirty();
    }

    /// Rejects (no-op) unless at least two of the ids exist in the scene.
    pub fn start_flythrough(&mut self, ids: &[NodeId], name: &str, color: &str) {
        let valid: Vec<NodeId> = ids
            .iter()
            .filter(|id| self.scene.contains(id))
            .cloned()
            .collect();
        if valid.len() < 2 {
            debug!(requested = ids.len(), valid = valid.len(), "flythrough rejected");
            return;
        }
        // The cinematic owns the view: other highlights are cleared.
        self.selected = None;
        self.hovered = None;
        self.filter_category = None;
        self.highlight_cache = None;
        self.camera.stop_auto_rotate();
        if let Some(first) = self.scene.node(&valid[0]) {
            self.camera.target_orbit_target = first.position;
            self.camera.target_spherical.radius = DWELL_RADIUS;
        }
        self.flythrough.start(valid, name.to_string(), color.to_string());
        self.scheduler.mark_dirty();
    }

    pub fn stop_flythrough(&mut self) {
        if self.flythrough.active {
            self.restore_mesh_scales();
        }
        self.flythrough.stop();
        self.highlight_cache = None;
        self.scheduler.mark_dirty();
    }

    pub fn toggle_flythrough_pause(&mut self) {
        if self.flythrough.active {
            self.flythrough.paused = !self.flythrough.paused;
            self.scheduler.mark_dirty();
        }
    }

    /// Tab visibility. Hidden cancels scheduling; visible discards the stale
    /// elapsed-time measurement and restarts the loop.
    pub fn set_hidden(&mut self, hidden: bool) {
        if !hidden && self.scheduler.is_hidden() {
            self.discard_next_dt = true;
        }
        self.scheduler.set_hidden(hidden);
    }

    // ----- pointer input -----

    pub fn pointer_down(&mut self, pointer_id: u64, x: f32, y: f32, touch: bool) {
        // A second simultaneous pointer is ignored until the first releases.
        if self.active_pointer.is_some() && self.active_pointer != Some(pointer_id) {
            return;
        }
        self.active_pointer = Some(pointer_id);
        self.dragging = true;
        self.drag_touch = touch;
        self.drag_start = (x, y);
        self.last_pointer = Some((x, y));
        self.drag_dist = 0.0;
        self.camera.stop_auto_rotate();
        self.scheduler.mark_dirty();
    }

    pub fn pointer_move(&mut self, pointer_id: u64, x: f32, y: f32) {
        self.pointer_screen = Some((x, y));
        self.scheduler.mark_dirty_for(POINTER_WAKE_FRAMES);

        if self.dragging && self.active_pointer == Some(pointer_id) {
            let dx = x - self.drag_start.0;
            let dy = y - self.drag_start.1;
            self.drag_dist = (dx * dx + dy * dy).sqrt();
            let (lx, ly) = self.last_pointer.unwrap_or((x, y));
            self.camera.apply_drag(x - lx, y - ly, self.drag_touch);
            self.last_pointer = Some((x, y));
        }
    }

    pub fn pointer_up(&mut self, pointer_id: u64) {
        if self.active_pointer != Some(pointer_id) {
            return;
        }
        self.dragging = false;
        self.active_pointer = None;
        self.last_pointer = None;
        if self.selected.is_none() {
            self.camera.schedule_auto_rotate_resume(self.wall_time);
        }
        self.scheduler.mark_dirty();
    }

    pub fn pointer_cancel(&mut self, pointer_id: u64) {
        if self.active_pointer != Some(pointer_id) {
            return;
        }
        self.dragging = false;
        self.active_pointer = None;
        self.last_pointer = None;
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.camera.apply_wheel(delta_y);
        self.scheduler.mark_dirty();
    }

    pub fn pinch_start(&mut self, dist: f32) {
        self.pinch_start = Some((dist.max(1e-3), self.camera.spherical.radius));
        self.scheduler.mark_dirty();
    }

    pub fn pinch_move(&mut self, dist: f32) {
        if let Some((start_dist, start_radius)) = self.pinch_start {
            self.camera.apply_pinch(start_radius, start_dist / dist.max(1e-3));
            self.scheduler.mark_dirty();
        }
    }

    pub fn pinch_end(&mut self) {
        self.pinch_start = None;
    }

    /// Resolve a click at the last pointer position: the topmost *visible*
    /// hit wins; a drag over the suppression threshold resolves to nothing.
    pub fn click(&mut self) -> Option<NodeId> {
        if self.drag_dist > CLICK_DRAG_SUPPRESS {
            return None;
        }
        let (x, y) = self.pointer_screen?;
        let (origin, dir) = self.camera.screen_ray(x, y);
        let hits = self.octree.raycast(origin, dir, RAYCAST_MAX_DIST);
        let node = hits.iter().find_map(|hit| {
            (self.visuals[hit.item].opacity > visual::VISIBLE_OPACITY).then_some(hit.item)
        })?;
        self.scheduler.mark_dirty();
        Some(self.scene.nodes[node].id.clone())
    }

    // ----- the tick -----

    /// One animation frame. Call every host frame; the scheduler decides
    /// whether any work actually happens (`report.ran`).
    pub fn tick(&mut self, dt_raw: f32) -> TickReport {
        // Host time always advances — the auto-rotate resume deadline is the
        // analogue of an external timer and must fire while the loop idles.
        self.wall_time += dt_raw.max(0.0);
        let idle_for_resume = !self.dragging
            && self.hovered.is_none()
            && self.selected.is_none()
            && !self.flythrough.active;
        if self
            .camera
            .maybe_resume_auto_rotate(self.wall_time, idle_for_resume)
        {
            self.scheduler.mark_dirty();
        }

        if !self.scheduler.begin_tick() {
            return TickReport::default();
        }

        let dt = if self.discard_next_dt {
            self.discard_next_dt = false;
            0.0
        } else {
            dt_raw.clamp(0.0, DT_CLAMP)
        };

        // Tracked-state change detection against the previous tick.
        let fly_focus_now = if self.flythrough.active {
            self.flythrough.focus_id.clone()
        } else {
            None
        };
        let state_changed = std::mem::take(&mut self.sets_dirty)
            || self.last_filter != self.filter_category
            || self.last_selected != self.selected
            || self.last_hovered != self.hovered
            || self.last_fly_focus != fly_focus_now;
        if state_changed {
            self.last_filter = self.filter_category.clone();
            self.last_selected = self.selected.clone();
            self.last_hovered = self.hovered.clone();
            self.last_fly_focus = fly_focus_now;
        }

        let auto_rotating = self.camera.auto_rotate
            && !self.dragging
            && self.hovered.is_none()
            && self.selected.is_none()
            && !self.flythrough.active;

        let keep = KeepAlive {
            orbit_converged: self.camera.converged(),
            state_changed,
            dragging: self.dragging,
            flythrough_active: self.flythrough.active,
            pulsating: self.study.has_review_due(),
            auto_rotating,
        };
        if !self.scheduler.finish_tick(keep) {
            // Visually settled: the loop stops here until something marks
            // dirty again.
            return TickReport::default();
        }

        self.time += dt;
        self.hover_frame = self.hover_frame.wrapping_add(1);

        if auto_rotating {
            self.scheduler.pin_frames(2);
        }
        self.camera.tick(dt, auto_rotating);

        let hover = self.update_hover();
        self.refresh_highlight_cache();
        self.update_node_visuals(state_changed);
        if state_changed || self.flythrough.active {
            self.update_edge_visuals();
        }
        let (fly_advanced, fly_finished) = self.advance_flythrough(dt);

        TickReport {
            ran: true,
            hover,
            fly_advanced,
            fly_finished,
        }
    }

    /// Octree-accelerated hover raycast, throttled per the quality tier.
    fn update_hover(&mut self) -> Option<HoverNotice> {
        let throttle = self.quality.hover_throttle.max(1);
        if self.dragging || self.hover_frame % throttle != 0 {
            return None;
        }
        let (x, y) = self.pointer_screen?;
        let (origin, dir) = self.camera.screen_ray(x, y);
        let hits = self.octree.raycast(origin, dir, RAYCAST_MAX_DIST);
        let new_hover = hits
            .iter()
            .find(|hit| self.visuals[hit.item].opacity > visual::VISIBLE_OPACITY)
            .map(|hit| self.scene.nodes[hit.item].id.clone());

        if self.hovered != new_hover {
            self.hovered = new_hover.clone();
            self.highlight_cache = None;
            match &new_hover {
                Some(id) => {
                    self.camera.stop_auto_rotate();
                    let screen = self
                        .scene
                        .node(id)
                        .and_then(|n| self.camera.project_to_screen(n.position));
                    Some(HoverNotice {
                        id: new_hover,
                        screen,
                        changed: true,
                    })
                }
                None => {
                    if self.selected.is_none() {
                        self.camera.schedule_auto_rotate_resume(self.wall_time);
                    }
                    Some(HoverNotice {
                        id: None,
                        screen: None,
                        changed: true,
                    })
                }
            }
        } else if let Some(id) = &self.hovered {
            // Sustained hover: keep the tooltip tracking the node.
            let screen = self
                .scene
                .node(id)
                .and_then(|n| self.camera.project_to_screen(n.position));
            Some(HoverNotice {
                id: self.hovered.clone(),
                screen,
                changed: false,
            })
        } else {
            None
        }
    }

    /// During a flythrough the focused node acts as the highlight target;
    /// otherwise hover wins over selection.
    fn highlight_id(&self) -> Option<&NodeId> {
        if self.flythrough.active {
            self.flythrough.focus_id.as_ref()
        } else {
            self.hovered.as_ref().or(self.selected.as_ref())
        }
    }

    fn refresh_highlight_cache(&mut self) {
        let Some(id) = self.highlight_id().cloned() else {
            self.highlight_cache = None;
            return;
        };
        let stale = self
            .highlight_cache
            .as_ref()
            .map(|(cached, _)| cached != &id)
            .unwrap_or(true);
        if stale {
            let set = self.adjacency.get_highlight_set(&id);
            self.highlight_cache = Some((id, set));
        }
    }

    fn update_node_visuals(&mut self, state_changed: bool) {
        let frustum = self.camera.frustum();
        let now_ms = self.epoch_ms + (self.wall_time * 1000.0) as u64;
        // Field-split so the context can borrow highlight/search/path state
        // while the visuals are written.
        let scene = &self.scene;
        let study = &self.study;
        let visuals = &mut self.visuals;
        let ctx = build_ctx(
            self.filter_category.as_deref(),
            self.highlight_cache.as_ref(),
            self.active_path.as_ref(),
            self.search_results.as_ref(),
            &self.flythrough,
            self.time,
            now_ms,
        );

        for (node, vis) in scene.nodes.iter().zip(visuals.iter_mut()) {
            let targets = visual::node_targets(node, &ctx, study);
            // Off-screen early-out: purely a performance shortcut — it only
            // fires once the node is already at its computed target, so
            // steady-state visuals are unaffected.
            let in_frustum = frustum.contains_point(node.position);
            if !in_frustum && !state_changed && vis.converged_to(&targets) {
                continue;
            }
            vis.approach(&targets);
        }
    }

    /// Edge and arrow alphas, recomputed only when state changed or a
    /// flythrough is animating.
    fn update_edge_visuals(&mut self) {
        let now_ms = self.epoch_ms + (self.wall_time * 1000.0) as u64;
        let scene = &self.scene;
        let visuals = &self.visuals;
        let edge_alphas = &mut self.edge_alphas;
        let arrow_alphas = &mut self.arrow_alphas;
        let ctx = build_ctx(
            self.filter_category.as_deref(),
            self.highlight_cache.as_ref(),
            self.active_path.as_ref(),
            self.search_results.as_ref(),
            &self.flythrough,
            self.time,
            now_ms,
        );
        for (ei, edge) in scene.edges.iter().enumerate() {
            let (Some(fi), Some(ti)) = (scene.node_index(&edge.from), scene.node_index(&edge.to))
            else {
                continue;
            };
            edge_alphas[ei] = visual::edge_alpha(
                edge.kind,
                &edge.from,
                &edge.to,
                visuals[fi].opacity,
                visuals[ti].opacity,
                &scene.nodes[fi].category,
                &scene.nodes[ti].category,
                &ctx,
            );
        }
        for (ai, &ei) in self.arrow_edges.iter().enumerate() {
            let edge = &scene.edges[ei];
            let target = visual::arrow_alpha(&edge.from, &edge.to, &ctx);
            arrow_alphas[ai] = visual::approach(arrow_alphas[ai], target);
        }
    }

    fn advance_flythrough(&mut self, dt: f32) -> (Option<NodeId>, bool) {
        if !self.flythrough.active {
            return (None, false);
        }
        if self.flythrough.paused {
            // Paused still needs a low duty cycle so the dim/bright overlay
            // stays correctly rendered.
            self.scheduler.pin_frames(2);
            return (None, false);
        }

        let mut advanced = None;
        let mut finished = false;
        match self.flythrough.advance(dt) {
            FlyStep::Arrived(id) => {
                self.highlight_cache = None;
                advanced = Some(id);
            }
            FlyStep::Finished => {
                self.restore_mesh_scales();
                self.highlight_cache = None;
                finished = true;
            }
            FlyStep::Running | FlyStep::Idle => {}
        }

        if self.flythrough.active {
            let focus_pos = self
                .flythrough
                .focus_id
                .as_ref()
                .and_then(|id| self.scene.node(id))
                .map(|n| n.position);
            if let Some(pos) = focus_pos {
                match self.flythrough.phase() {
                    FlyPhase::Dwell => {
                        self.camera.target_spherical.theta += 0.12 * dt;
                        self.camera.target_orbit_target =
                            self.camera.target_orbit_target.lerp(pos, 0.04);
                        let r = self.camera.target_spherical.radius;
                        self.camera.target_spherical.radius += (DWELL_RADIUS - r) * 0.02;
                    }
                    FlyPhase::Transition => {
                        let next_pos = self
                            .flythrough
                            .next_id()
                            .and_then(|id| self.scene.node(id))
                            .map(|n| n.position)
                            .unwrap_or(pos);
                        let eased = smoothstep(self.flythrough.transition_t());
                        let track = pos.lerp(next_pos, eased);
                        self.camera.target_orbit_target =
                            self.camera.target_orbit_target.lerp(track, 0.06);
                        let r = self.camera.target_spherical.radius;
                        self.camera.target_spherical.radius += (TRANSITION_RADIUS - r) * 0.025;
                    }
                }
            }

            // Arrival bloom briefly swells the focused mesh; the previous
            // focus relaxes back to its rest scale.
            let bloom = self.flythrough.arrival_glow.max(0.0);
            if bloom > 0.1 {
                if let Some(i) = self
                    .flythrough
                    .focus_id
                    .as_ref()
                    .and_then(|id| self.scene.node_index(id))
                {
                    self.visuals[i].scale = self.scene.nodes[i].radius * (1.0 + bloom * 0.15);
                }
            }
            if let Some(i) = self
                .flythrough
                .prev_focus_id
                .as_ref()
                .and_then(|id| self.scene.node_index(id))
            {
                let rest = self.scene.nodes[i].radius;
                let cur = self.visuals[i].scale;
                if (cur - rest).abs() > 0.005 {
                    self.visuals[i].scale = cur + (rest - cur) * 0.12;
                }
            }
            self.scheduler.pin_frames(5);
        }

        (advanced, finished)
    }

    fn restore_mesh_scales(&mut self) {
        for (node, vis) in self.scene.nodes.iter().zip(self.visuals.iter_mut()) {
            vis.scale = node.radius;
        }
    }

    /// Failure-path teardown: nothing may remain scheduled.
    pub(crate) fn cancel_scheduling(&mut self) {
        self.scheduler.cancel();
    }
}

/// Assemble the frame-local resolve context from the engine's split fields.
fn build_ctx<'a>(
    filter: Option<&'a str>,
    highlight: Option<&'a (NodeId, HashSet<NodeId>)>,
    path: Option<&'a ActivePath>,
    search: Option<&'a HashSet<NodeId>>,
    fly: &'a Flythrough,
    time: f32,
    now_ms: u64,
) -> ResolveCtx<'a> {
    ResolveCtx {
        filter_category: filter,
        highlight: highlight.map(|(id, set)| (id, set)),
        path: path.map(|p| (&p.set, p.ids.get(p.index))),
        search,
        fly: fly.active.then(|| FlyCtx {
            node_set: &fly.node_set,
            focus: fly.focus_id.as_ref(),
            prev: fly.prev_focus_id.as_ref(),
            bloom: fly.arrival_glow,
            transition_alpha: fly.transition_edge_alpha,
        }),
        time,
        now_ms,
    }
}
