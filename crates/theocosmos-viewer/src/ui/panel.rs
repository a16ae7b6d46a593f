use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use theocosmos_core::{Locus, NodeId, StudyProgress, SubTopic};

use crate::app::{wall_clock_ms, CosmosState};
use crate::util::progress;

/// Where a node id lives in the authored corpus.
pub enum EntryRef<'a> {
    Locus(&'a Locus),
    Sub(&'a Locus, &'a SubTopic),
}

pub fn find_entry<'a>(
    corpus: &'a theocosmos_core::Corpus,
    id: &NodeId,
) -> Option<EntryRef<'a>> {
    for locus in &corpus.loci {
        if &locus.id == id {
            return Some(EntryRef::Locus(locus));
        }
        for sub in &locus.subs {
            if &sub.id == id {
                return Some(EntryRef::Sub(locus, sub));
            }
        }
    }
    None
}

enum PanelAction {
    Select(NodeId),
    ClearSelection,
    ToggleFilter(String),
    ToggleStudied(NodeId),
    ResetProgress,
    FollowPath(String),
    PathStep(i32),
    ClearPath,
    StartTour(String),
    StopTour,
    TogglePause,
    OpenSearch,
    ResetView,
}

pub fn ui_panel(mut contexts: EguiContexts, mut st: ResMut<CosmosState>) {
    let st = &mut *st;
    let mut actions: Vec<PanelAction> = Vec::new();
    let fly = st
        .bridge
        .engine()
        .map(|e| e.flythrough().clone())
        .unwrap_or_default();

    egui::SidePanel::left("cosmos-panel")
        .default_width(290.0)
        .show(contexts.ctx_mut(), |ui| {
            ui.heading("Theocosmos");
            ui.label(format!(
                "{} loci · {} entries",
                st.corpus.loci.len(),
                st.corpus.node_count()
            ));
            ui.label(format!(
                "{} / {} entries reviewed",
                st.progress.len(),
                st.corpus.node_count()
            ));
            ui.separator();

            ui.label("Categories (click to filter):");
            ui.horizontal_wrapped(|ui| {
                for cat in &st.categories {
                    let active = st.ui.filter.as_deref() == Some(cat.key.as_str());
                    let [r, g, b] = cat.color;
                    let swatch = egui::Color32::from_rgb(
                        (r * 255.0) as u8,
                        (g * 255.0) as u8,
                        (b * 255.0) as u8,
                    );
                    let text = egui::RichText::new(format!("● {}", cat.key)).color(swatch);
                    if ui.selectable_label(active, text).clicked() {
                        actions.push(PanelAction::ToggleFilter(cat.key.clone()));
                    }
                }
            });

            ui.add_space(8.0);
            ui.separator();
            if let Some(id) = st.ui.panel_node.clone() {
                draw_detail(ui, st, &id, &mut actions);
            } else {
                ui.label("Click a sphere to open its entry.");
            }

            ui.add_space(8.0);
            ui.separator();
            ui.heading("Study paths");
            if let Some((key, index)) = st.ui.active_path.clone() {
                if let Some(path) = st.corpus.paths.iter().find(|p| p.key == key) {
                    ui.label(format!("{} — {}/{}", path.name, index + 1, path.ids.len()));
                    ui.horizontal(|ui| {
                        if ui.button("◀ Prev").clicked() {
                            actions.push(PanelAction::PathStep(-1));
                        }
                        if ui.button("Next ▶").clicked() {
                            actions.push(PanelAction::PathStep(1));
                        }
                        if ui.button("Leave path").clicked() {
                            actions.push(PanelAction::ClearPath);
                        }
                    });
                }
            } else {
                for path in &st.corpus.paths {
                    ui.horizontal(|ui| {
                        ui.label(&path.name);
                        if ui.small_button("Follow").clicked() {
                            actions.push(PanelAction::FollowPath(path.key.clone()));
                        }
                        if ui.small_button("Tour").clicked() {
                            actions.push(PanelAction::StartTour(path.key.clone()));
                        }
                    });
                }
            }

            if fly.active {
                ui.add_space(6.0);
                ui.group(|ui| {
                    ui.label(format!(
                        "Flythrough: {} ({}/{})",
                        fly.name,
                        fly.current_idx + 1,
                        fly.path_ids.len()
                    ));
                    ui.horizontal(|ui| {
                        let pause_label = if fly.paused { "Resume" } else { "Pause" };
                        if ui.button(pause_label).clicked() {
                            actions.push(PanelAction::TogglePause);
                        }
                        if ui.button("Stop").clicked() {
                            actions.push(PanelAction::StopTour);
                        }
                    });
                });
            }

            ui.add_space(8.0);
            ui.separator();
            if ui.button("Search (Ctrl+P)").clicked() {
                actions.push(PanelAction::OpenSearch);
            }
            if ui.button("Reset view").clicked() {
                actions.push(PanelAction::ResetView);
            }
            if ui.button("Reset review progress").clicked() {
                actions.push(PanelAction::ResetProgress);
            }
        });

    for action in actions {
        apply(st, action);
    }
}

fn draw_detail(ui: &mut egui::Ui, st: &CosmosState, id: &NodeId, actions: &mut Vec<PanelAction>) {
    let Some(entry) = find_entry(&st.corpus, id) else {
        ui.label("Entry not found.");
        return;
    };
    let (name, category, description) = match &entry {
        EntryRef::Locus(l) => (&l.name, &l.category, &l.description),
        EntryRef::Sub(parent, s) => (
            &s.name,
            s.category.as_ref().unwrap_or(&parent.category),
            &s.description,
        ),
    };
    ui.heading(name);
    ui.label(format!("Category: {category}"));
    if !description.is_empty() {
        ui.add_space(4.0);
        ui.label(description);
    }

    ui.add_space(6.0);
    let studied = st.progress.is_studied(id);
    let toggle_text = if studied {
        "✓ Reviewed"
    } else {
        "☐ Mark as reviewed"
    };
    if ui.button(toggle_text).clicked() {
        actions.push(PanelAction::ToggleStudied(id.clone()));
    }

    match entry {
        EntryRef::Locus(locus) => {
            if !locus.subs.is_empty() {
                ui.add_space(6.0);
                ui.label("Sub-topics:");
                for sub in &locus.subs {
                    let mark = if st.progress.is_studied(&sub.id) { " ✓" } else { "" };
                    if ui
                        .selectable_label(false, format!("  {}{}", sub.name, mark))
                        .clicked()
                    {
                        actions.push(PanelAction::Select(sub.id.clone()));
                    }
                }
            }
            if !locus.cross_refs.is_empty() {
                ui.add_space(6.0);
                ui.label("Cross-references:");
                for target in &locus.cross_refs {
                    let label = st
                        .locus_name(target)
                        .unwrap_or(target.as_str())
                        .to_string();
                    let mark = if st.progress.is_studied(target) { " ✓" } else { "" };
                    if ui
                        .selectable_label(false, format!("  ↔ {label}{mark}"))
                        .clicked()
                    {
                        actions.push(PanelAction::Select(target.clone()));
                    }
                }
            }
        }
        EntryRef::Sub(parent, _) => {
            ui.add_space(6.0);
            if ui
                .selectable_label(false, format!("Part of: {}", parent.name))
                .clicked()
            {
                actions.push(PanelAction::Select(parent.id.clone()));
            }
        }
    }

    ui.add_space(6.0);
    if ui.button("Close").clicked() {
        actions.push(PanelAction::ClearSelection);
    }
}

fn apply(st: &mut CosmosState, action: PanelAction) {
    match action {
        PanelAction::Select(id) => {
            st.bridge.set_selected(Some(id.clone()));
            st.bridge.focus_node(&id, 1.8);
            st.ui.panel_node = Some(id);
        }
        PanelAction::ClearSelection => {
            st.bridge.set_selected(None);
            st.ui.panel_node = None;
        }
        PanelAction::ToggleFilter(key) => {
            if st.ui.filter.as_deref() == Some(key.as_str()) {
                st.ui.filter = None;
            } else {
                st.ui.filter = Some(key);
            }
            st.bridge.filter_by_category(st.ui.filter.clone());
        }
        PanelAction::ToggleStudied(id) => {
            st.progress.toggle(&id, wall_clock_ms());
            st.bridge.toggle_studied(&id);
            if let Err(err) = progress::save(&st.progress) {
                warn!("failed to persist study progress: {err:#}");
            }
        }
        PanelAction::ResetProgress => {
            st.progress = StudyProgress::default();
            st.bridge.load_study_progress(Vec::new());
            if let Err(err) = progress::clear() {
                warn!("failed to clear study progress: {err:#}");
            }
        }
        PanelAction::FollowPath(key) => {
            if let Some(path) = st.corpus.paths.iter().find(|p| p.key == key) {
                let ids = path.ids.clone();
                let first = ids.first().cloned();
                st.ui.active_path = Some((key, 0));
                st.bridge.set_active_path(Some(ids), 0);
                if let Some(first) = first {
                    st.bridge.focus_node(&first, 1.6);
                }
            }
        }
        PanelAction::PathStep(delta) => super::step_path(st, delta),
        PanelAction::ClearPath => {
            st.ui.active_path = None;
            st.bridge.set_active_path(None, 0);
        }
        PanelAction::StartTour(key) => {
            if let Some(path) = st.corpus.paths.iter().find(|p| p.key == key).cloned() {
                // The cinematic clears selection/filter inside the core;
                // mirror that in the UI state.
                st.ui.panel_node = None;
                st.ui.filter = None;
                st.ui.active_path = None;
                st.bridge.set_active_path(None, 0);
                st.bridge.start_flythrough(&path.ids, &path.name, &path.color);
            }
        }
        PanelAction::StopTour => st.bridge.stop_flythrough(),
        PanelAction::TogglePause => st.bridge.toggle_flythrough_pause(),
        PanelAction::OpenSearch => st.ui.search_open = true,
        PanelAction::ResetView => st.bridge.reset_view(),
    }
}
