use std::collections::HashSet;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

use crate::corpus::{Corpus, NodeId};
use crate::engine::{Engine, TickReport};
use crate::quality::QualityPreset;

const INIT_FAILURE_NOTICE: &str = "3D rendering failed to initialize. \
Search, study panels, and paths remain fully functional.";
const RUNTIME_FAILURE_NOTICE: &str = "3D rendering encountered an error and has been disabled. \
Search, study panels, and paths remain fully functional.";

/// Guarded boundary between the application and the render core.
///
/// Every call is a no-op if the engine never initialized or has already been
/// latched failed. A panic inside any guarded call (the tick included) trips
/// a one-time latch: best-effort teardown, permanent disablement for the
/// session, and a single failure notice for the UI's degradation banner.
/// The rest of the application keeps working without the 3D view.
pub struct EngineBridge {
    engine: Option<Engine>,
    failed: bool,
    failure_notice: Option<String>,
}

impl EngineBridge {
    /// A bridge with no engine behind it: every call is a harmless no-op.
    pub fn uninitialized() -> Self {
        Self {
            engine: None,
            failed: false,
            failure_notice: None,
        }
    }

    pub fn init(
        corpus: &Corpus,
        quality: QualityPreset,
        now_ms: u64,
        width: f32,
        height: f32,
    ) -> Self {
        match catch_unwind(AssertUnwindSafe(|| {
            Engine::new(corpus, quality, now_ms, width, height)
        })) {
            Ok(engine) => Self {
                engine: Some(engine),
                failed: false,
                failure_notice: None,
            },
            Err(_) => {
                error!("engine initialization panicked; 3D view disabled for the session");
                Self {
                    engine: None,
                    failed: true,
                    failure_notice: Some(INIT_FAILURE_NOTICE.to_string()),
                }
            }
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.failed && self.engine.is_some()
    }

    pub fn is_failed(&self) -> bool {
        self.failed
    }

    /// Read access for the rendering collaborator; None once failed.
    pub fn engine(&self) -> Option<&Engine> {
        if self.failed {
            None
        } else {
            self.engine.as_ref()
        }
    }

    /// One-shot degradation notice for the external UI.
    pub fn take_failure_notice(&mut self) -> Option<String> {
        self.failure_notice.take()
    }

    /// A context-loss signal from the graphics backend routes through the
    /// same failure path instead of crashing the tick loop.
    pub fn notify_context_lost(&mut self) {
        // No-op unless an engine actually exists to tear down.
        if self.engine.is_some() {
            self.handle_runtime_failure("graphics context lost");
        }
    }

    fn guard<R>(&mut self, label: &str, f: impl FnOnce(&mut Engine) -> R) -> Option<R> {
        if self.failed {
            return None;
        }
        let engine = self.engine.as_mut()?;
        match catch_unwind(AssertUnwindSafe(|| f(engine))) {
            Ok(out) => Some(out),
            Err(_) => {
                self.handle_runtime_failure(label);
                None
            }
        }
    }

    fn handle_runtime_failure(&mut self, label: &str) {
        if self.failed {
            return;
        }
        self.failed = true;
        error!(call = label, "runtime failure in render core; disabling 3D view");
        // Best-effort teardown; a secondary failure is swallowed. The failed
        // tick must leave nothing scheduled.
        if let Some(mut engine) = self.engine.take() {
            let _ = catch_unwind(AssertUnwindSafe(|| engine.cancel_scheduling()));
        }
        self.failure_notice = Some(RUNTIME_FAILURE_NOTICE.to_string());
    }

    // ----- guarded command surface -----

    pub fn tick(&mut self, dt: f32) -> TickReport {
        self.guard("tick", |e| e.tick(dt)).unwrap_or_default()
    }

    pub fn mark_dirty(&mut self) {
        self.guard("mark_dirty", |e| e.mark_dirty());
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.guard("resize", |e| e.resize(width, height));
    }

    pub fn focus_node(&mut self, id: &NodeId, zoom: f32) {
        self.guard("focus_node", |e| e.focus_node(id, zoom));
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.guard("set_selected", |e| e.set_selected(id));
    }

    pub fn filter_by_category(&mut self, category: Option<String>) {
        self.guard("filter_by_category", |e| e.filter_by_category(category));
    }

    pub fn reset_view(&mut self) {
        self.guard("reset_view", |e| e.reset_view());
    }

    pub fn set_search_results(&mut self, ids: Option<HashSet<NodeId>>) {
        self.guard("set_search_results", |e| e.set_search_results(ids));
    }

    pub fn set_active_path(&mut self, ids: Option<Vec<NodeId>>, index: usize) {
        self.guard("set_active_path", |e| e.set_active_path(ids, index));
    }

    pub fn set_path_index(&mut self, index: usize) {
        self.guard("set_path_index", |e| e.set_path_index(index));
    }

    pub fn toggle_studied(&mut self, id: &NodeId) -> Option<bool> {
        self.guard("toggle_studied", |e| e.toggle_studied(id)).flatten()
    }

    pub fn load_study_progress(&mut self, entries: Vec<(NodeId, Option<u64>)>) {
        self.guard("load_study_progress", |e| e.load_study_progress(entries));
    }

    pub fn start_flythrough(&mut self, ids: &[NodeId], name: &str, color: &str) {
        self.guard("start_flythrough", |e| e.start_flythrough(ids, name, color));
    }

    pub fn stop_flythrough(&mut self) {
        self.guard("stop_flythrough", |e| e.stop_flythrough());
    }

    pub fn toggle_flythrough_pause(&mut self) {
        self.guard("toggle_flythrough_pause", |e| e.toggle_flythrough_pause());
    }

    pub fn set_hidden(&mut self, hidden: bool) {
        self.guard("set_hidden", |e| e.set_hidden(hidden));
    }

    pub fn pointer_down(&mut self, pointer_id: u64, x: f32, y: f32, touch: bool) {
        self.guard("pointer_down", |e| e.pointer_down(pointer_id, x, y, touch));
    }

    pub fn pointer_move(&mut self, pointer_id: u64, x: f32, y: f32) {
        self.guard("pointer_move", |e| e.pointer_move(pointer_id, x, y));
    }

    pub fn pointer_up(&mut self, pointer_id: u64) {
        self.guard("pointer_up", |e| e.pointer_up(pointer_id));
    }

    pub fn pointer_cancel(&mut self, pointer_id: u64) {
        self.guard("pointer_cancel", |e| e.pointer_cancel(pointer_id));
    }

    pub fn wheel(&mut self, delta_y: f32) {
        self.guard("wheel", |e| e.wheel(delta_y));
    }

    pub fn pinch_start(&mut self, dist: f32) {
        self.guard("pinch_start", |e| e.pinch_start(dist));
    }

    pub fn pinch_move(&mut self, dist: f32) {
        self.guard("pinch_move", |e| e.pinch_move(dist));
    }

    pub fn pinch_end(&mut self) {
        self.guard("pinch_end", |e| e.pinch_end());
    }

    pub fn click(&mut self) -> Option<NodeId> {
        self.guard("click", |e| e.click()).flatten()
    }

    #[cfg(test)]
    fn trigger_guarded_panic(&mut self) {
        let _: Option<()> = self.guard("test_panic", |_| panic!("synthetic render fault"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corpus::Locus;
    use crate::quality::{QualityPreset, QualityTier};

    fn id(s: &str) -> NodeId {
        NodeId(s.to_string())
    }

    fn corpus() -> Corpus {
        let locus = |name: &str, order: u32| Locus {
            id: id(name),
            name: name.to_string(),
            category: "godhead".to_string(),
            color: "#e0c050".to_string(),
            weight: 1.0,
            order,
            description: String::new(),
            keywords: Vec::new(),
            subs: Vec::new(),
            cross_refs: Vec::new(),
        };
        Corpus {
            loci: vec![locus("a", 1), locus("b", 2)],
            paths: Vec::new(),
        }
    }

    fn bridge() -> EngineBridge {
        EngineBridge::init(
            &corpus(),
            QualityPreset::for_tier(QualityTier::Mid),
            0,
            800.0,
            600.0,
        )
    }

    #[test]
    fn uninitialized_bridge_noops_every_call() {
        let mut b = EngineBridge::uninitialized();
        b.mark_dirty();
        b.focus_node(&id("a"), 2.0);
        b.wheel(10.0);
        assert_eq!(b.click(), None);
        assert!(!b.tick(0.016).ran);
        assert!(b.take_failure_notice().is_none());
        assert!(!b.is_failed());
    }

    #[test]
    fn panic_in_guarded_call_latches_and_degrades() {
        let mut b = bridge();
        assert!(b.is_alive());
        assert!(b.tick(0.016).ran);

        b.trigger_guarded_panic();
        assert!(b.is_failed());
        assert!(!b.is_alive());
        assert!(b.engine().is_none());

        // The notice fires once, then stays quiet.
        let notice = b.take_failure_notice().expect("degradation notice");
        assert!(notice.contains("disabled"));
        assert!(b.take_failure_notice().is_none());

        // Everything afterwards is a no-op; the loop never resumes.
        b.mark_dirty();
        for _ in 0..5 {
            assert!(!b.tick(0.016).ran);
        }
        assert_eq!(b.click(), None);
    }

    #[test]
    fn second_failure_does_not_stack_notices() {
        let mut b = bridge();
        b.trigger_guarded_panic();
        b.notify_context_lost();
        let notice = b.take_failure_notice();
        assert!(notice.is_some());
        assert!(b.take_failure_notice().is_none());
    }

    #[test]
    fn context_loss_routes_through_the_failure_path() {
        let mut b = bridge();
        b.notify_context_lost();
        assert!(b.is_failed());
        assert!(b.take_failure_notice().is_some());
        assert!(!b.tick(0.016).ran);
    }

    #[test]
    fn healthy_bridge_passes_commands_through() {
        let mut b = bridge();
        b.set_selected(Some(id("a")));
        assert_eq!(b.engine().unwrap().selected(), Some(&id("a")));
        b.set_selected(None);
        assert_eq!(b.engine().unwrap().selected(), None);
        assert_eq!(b.toggle_studied(&id("b")), Some(true));
        assert_eq!(b.toggle_studied(&id("b")), Some(false));
    }
}
