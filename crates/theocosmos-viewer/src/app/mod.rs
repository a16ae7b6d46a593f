use bevy::prelude::*;
use std::time::{SystemTime, UNIX_EPOCH};
use theocosmos_core::{Corpus, EngineBridge, NodeId, QualityPreset, StudyProgress};

use crate::search::{build_search_entries, SearchEntry};
use crate::util::config::{self, ViewerConfig};
use crate::util::progress;

const DEFAULT_CORPUS: &str = include_str!("../../assets/corpus.json");

/// Category key + swatch color for the legend, in corpus order.
pub struct CategoryEntry {
    pub key: String,
    pub color: [f32; 3],
}

#[derive(Default)]
pub struct UiState {
    pub search_open: bool,
    pub search_query: String,
    pub search_hits: Vec<(NodeId, f32)>,
    /// Which node's detail the side panel shows. Kept here, not in the
    /// engine, so panels survive a 3D failure.
    pub panel_node: Option<NodeId>,
    /// Guided path UI state: corpus path key + current step.
    pub active_path: Option<(String, usize)>,
    /// Mirror of the engine's category filter for the legend highlight.
    pub filter: Option<String>,
    pub hover: Option<(NodeId, Vec2)>,
    pub banner: Option<String>,
    /// True when the engine did visual work last frame (material sync gate).
    pub engine_ran: bool,
}

#[derive(Resource)]
pub struct CosmosState {
    pub bridge: EngineBridge,
    pub corpus: Corpus,
    pub cfg: ViewerConfig,
    pub categories: Vec<CategoryEntry>,
    pub search_entries: Vec<SearchEntry>,
    /// Viewer-owned progress mirror; the engine holds a copy for pulsation.
    pub progress: StudyProgress,
    pub ui: UiState,
}

impl CosmosState {
    pub fn locus_name(&self, id: &NodeId) -> Option<&str> {
        for locus in &self.corpus.loci {
            if &locus.id == id {
                return Some(&locus.name);
            }
            for sub in &locus.subs {
                if &sub.id == id {
                    return Some(&sub.name);
                }
            }
        }
        None
    }

    pub fn now_ms(&self) -> u64 {
        wall_clock_ms()
    }
}

pub fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn load_corpus(cfg: &ViewerConfig) -> anyhow::Result<Corpus> {
    if let Some(path) = &cfg.corpus_path {
        let json = std::fs::read_to_string(path)?;
        return Ok(Corpus::from_json(&json)?);
    }
    Ok(Corpus::from_json(DEFAULT_CORPUS)?)
}

fn legend_categories(corpus: &Corpus) -> Vec<CategoryEntry> {
    let mut out: Vec<CategoryEntry> = Vec::new();
    for locus in &corpus.loci {
        if out.iter().any(|c| c.key == locus.category) {
            continue;
        }
        out.push(CategoryEntry {
            key: locus.category.clone(),
            color: theocosmos_core::corpus::parse_hex_color(&locus.color)
                .unwrap_or([0.8, 0.8, 0.8]),
        });
    }
    out
}

pub struct TheocosmosPlugin;

impl Plugin for TheocosmosPlugin {
    fn build(&self, app: &mut App) {
        let cfg = config::load_or_default();
        let now_ms = wall_clock_ms();
        let mut ui = UiState {
            engine_ran: true,
            ..UiState::default()
        };

        let (corpus, bridge) = match load_corpus(&cfg) {
            Ok(corpus) => {
                let quality = QualityPreset::for_tier(cfg.quality_tier);
                let bridge = EngineBridge::init(&corpus, quality, now_ms, 1280.0, 720.0);
                (corpus, bridge)
            }
            Err(err) => {
                error!("corpus failed to load: {err:#}");
                ui.banner = Some(
                    "The doctrine corpus could not be loaded. \
                     Please check the configured corpus path."
                        .to_string(),
                );
                (Corpus { loci: Vec::new(), paths: Vec::new() }, EngineBridge::uninitialized())
            }
        };

        let mut bridge = bridge;
        let stored = progress::load();
        let progress_mirror = StudyProgress::load(stored.clone(), now_ms);
        bridge.load_study_progress(stored);

        let search_entries = build_search_entries(&corpus);
        let categories = legend_categories(&corpus);

        app.insert_resource(CosmosState {
            bridge,
            categories,
            search_entries,
            progress: progress_mirror,
            cfg,
            corpus,
            ui,
        })
        .add_systems(Startup, crate::render::setup_scene)
        .add_systems(
            Update,
            (
                crate::input::dispatch_pointer,
                crate::input::handle_window_events,
                engine_tick,
                crate::render::sync_camera,
                crate::render::sync_node_visuals,
                crate::render::draw_edges,
                crate::render::despawn_on_failure,
                crate::ui::ui_panel,
                crate::ui::search_overlay,
                crate::ui::handle_shortcuts,
                crate::ui::hud_overlay,
            ),
        );
    }
}

/// Drive the core's animation tick from the host frame clock. The core's
/// scheduler decides whether any work actually happens.
fn engine_tick(time: Res<Time>, mut st: ResMut<CosmosState>) {
    let report = st.bridge.tick(time.delta_seconds());
    st.ui.engine_ran = report.ran;

    if let Some(notice) = report.hover {
        if notice.changed || notice.id.is_some() {
            st.ui.hover = notice
                .id
                .zip(notice.screen.map(|(x, y)| Vec2::new(x, y)));
        }
    }
    if report.fly_finished {
        info!("flythrough finished");
    }
    if let Some(notice) = st.bridge.take_failure_notice() {
        warn!("render core degraded: {notice}");
        st.ui.banner = Some(notice);
    }
}
