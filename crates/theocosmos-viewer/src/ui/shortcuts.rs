use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};

use crate::app::CosmosState;

pub fn handle_shortcuts(mut contexts: EguiContexts, mut st: ResMut<CosmosState>) {
    let st = &mut *st;
    let ctx = contexts.ctx_mut();
    let esc_pressed = ctx.input(|i| i.key_pressed(egui::Key::Escape));
    let wants_keyboard = ctx.wants_keyboard_input();

    let fly_active = st
        .bridge
        .engine()
        .map(|e| e.flythrough().active)
        .unwrap_or(false);

    if esc_pressed {
        if st.ui.search_open {
            st.ui.search_open = false;
            st.ui.search_query.clear();
            st.ui.search_hits.clear();
            st.bridge.set_search_results(None);
        } else if fly_active {
            st.bridge.stop_flythrough();
        } else {
            st.ui.panel_node = None;
            st.ui.filter = None;
            st.ui.active_path = None;
            st.bridge.set_selected(None);
            st.bridge.filter_by_category(None);
            st.bridge.set_active_path(None, 0);
        }
    }

    if wants_keyboard {
        return;
    }

    if ctx.input(|i| i.key_pressed(egui::Key::P) && i.modifiers.ctrl) {
        st.ui.search_open = true;
    }
    if ctx.input(|i| i.key_pressed(egui::Key::Space)) && fly_active {
        st.bridge.toggle_flythrough_pause();
    }
    if ctx.input(|i| i.key_pressed(egui::Key::ArrowRight)) {
        super::step_path(st, 1);
    }
    if ctx.input(|i| i.key_pressed(egui::Key::ArrowLeft)) {
        super::step_path(st, -1);
    }
}
