use bevy::input::mouse::{MouseScrollUnit, MouseWheel};
use bevy::prelude::*;
use bevy::window::{WindowOccluded, WindowResized};
use bevy_egui::EguiContexts;

use crate::app::CosmosState;

/// One scroll "line" in pixels, for wheel events reported in lines.
const LINE_SCROLL_PX: f32 = 40.0;
/// The single mouse pointer's id in the core's exclusive-pointer model.
const MOUSE_POINTER_ID: u64 = 0;

/// Single ordered dispatch of pointer input into the engine bridge. All
/// mutation funnels through bridge commands; nothing here touches engine
/// state directly.
pub fn dispatch_pointer(
    windows: Query<&Window>,
    buttons: Res<ButtonInput<MouseButton>>,
    mut wheel_evr: EventReader<MouseWheel>,
    mut contexts: EguiContexts,
    mut st: ResMut<CosmosState>,
) {
    let Ok(window) = windows.get_single() else {
        return;
    };
    let egui_owns_pointer = contexts.ctx_mut().wants_pointer_input();
    let cursor = window.cursor_position();

    if let Some(pos) = cursor {
        if !egui_owns_pointer {
            st.bridge.pointer_move(MOUSE_POINTER_ID, pos.x, pos.y);
        }
    }

    if buttons.just_pressed(MouseButton::Left) && !egui_owns_pointer {
        if let Some(pos) = cursor {
            st.bridge.pointer_down(MOUSE_POINTER_ID, pos.x, pos.y, false);
        }
    }

    if buttons.just_released(MouseButton::Left) {
        st.bridge.pointer_up(MOUSE_POINTER_ID);
        if !egui_owns_pointer {
            // Click resolution: topmost visible hit opens the detail panel.
            if let Some(id) = st.bridge.click() {
                st.bridge.set_selected(Some(id.clone()));
                st.ui.panel_node = Some(id);
            }
        }
    }

    if !egui_owns_pointer {
        for ev in wheel_evr.read() {
            let dy = match ev.unit {
                MouseScrollUnit::Line => ev.y * LINE_SCROLL_PX,
                MouseScrollUnit::Pixel => ev.y,
            };
            // Scrolling up zooms in (radius shrinks).
            st.bridge.wheel(-dy);
        }
    }
}

/// Window resize and occlusion map onto the core's resize and hidden-tab
/// transitions.
pub fn handle_window_events(
    mut resized: EventReader<WindowResized>,
    mut occluded: EventReader<WindowOccluded>,
    mut st: ResMut<CosmosState>,
) {
    for ev in resized.read() {
        st.bridge.resize(ev.width, ev.height);
    }
    for ev in occluded.read() {
        st.bridge.set_hidden(ev.occluded);
    }
}
