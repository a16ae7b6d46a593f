pub mod hud;
pub mod panel;
pub mod search;
pub mod shortcuts;

pub use hud::hud_overlay;
pub use panel::ui_panel;
pub use search::search_overlay;
pub use shortcuts::handle_shortcuts;

use crate::app::CosmosState;

/// Step the active guided path by `delta`, refocusing the camera on the new
/// step. Shared between the panel buttons and the arrow-key shortcuts.
pub(crate) fn step_path(st: &mut CosmosState, delta: i32) {
    let Some((key, index)) = st.ui.active_path.clone() else {
        return;
    };
    let Some(path) = st.corpus.paths.iter().find(|p| p.key == key) else {
        return;
    };
    let next = index as i64 + delta as i64;
    if next < 0 || next >= path.ids.len() as i64 {
        return;
    }
    let next = next as usize;
    let id = path.ids[next].clone();
    st.ui.active_path = Some((key, next));
    st.bridge.set_path_index(next);
    st.bridge.focus_node(&id, 1.6);
}
