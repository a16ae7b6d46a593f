use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use std::collections::HashSet;
use theocosmos_core::NodeId;

use crate::app::CosmosState;
use crate::search::search_nodes;

// Ctrl+P search overlay. The ranked hits double as the engine's
// search-result highlight set.
pub fn search_overlay(mut contexts: EguiContexts, mut st: ResMut<CosmosState>) {
    let st = &mut *st;
    let ctx = contexts.ctx_mut();

    if !st.ui.search_open {
        return;
    }

    let mut picked: Option<NodeId> = None;
    let mut close = false;

    egui::Window::new("Search the cosmos (Ctrl+P)")
        .collapsible(false)
        .resizable(true)
        .show(ctx, |ui| {
            ui.horizontal(|ui| {
                ui.label("Query:");
                let resp = ui.text_edit_singleline(&mut st.ui.search_query);
                resp.request_focus();
                if resp.changed() {
                    st.ui.search_hits = search_nodes(&st.search_entries, &st.ui.search_query);
                    let set: HashSet<NodeId> =
                        st.ui.search_hits.iter().map(|(id, _)| id.clone()).collect();
                    st.bridge
                        .set_search_results((!set.is_empty()).then_some(set));
                }
                if ui.button("Close (Esc)").clicked() {
                    close = true;
                }
            });

            ui.separator();
            ui.label(format!("{} hits:", st.ui.search_hits.len()));
            ui.add_space(4.0);

            egui::ScrollArea::vertical()
                .max_height(260.0)
                .show(ui, |ui| {
                    for (id, _score) in st.ui.search_hits.iter() {
                        let label = st
                            .locus_name(id)
                            .map(|name| format!("{name} ({})", id.as_str()))
                            .unwrap_or_else(|| id.as_str().to_string());
                        if ui.selectable_label(false, label).clicked() {
                            picked = Some(id.clone());
                        }
                    }
                });

            if ctx.input(|i| i.key_pressed(egui::Key::Enter)) {
                if let Some((first, _)) = st.ui.search_hits.first() {
                    picked = Some(first.clone());
                }
            }
        });

    if let Some(id) = picked {
        st.bridge.set_selected(Some(id.clone()));
        st.bridge.focus_node(&id, 1.8);
        st.ui.panel_node = Some(id);
        close = true;
    }
    if close {
        st.ui.search_open = false;
        st.ui.search_query.clear();
        st.ui.search_hits.clear();
        st.bridge.set_search_results(None);
    }
}
