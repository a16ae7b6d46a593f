pub mod camera;
pub mod scene;

pub use camera::sync_camera;
pub use scene::{despawn_on_failure, draw_edges, setup_scene, sync_node_visuals};
