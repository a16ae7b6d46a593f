use bevy::prelude::*;

use crate::app::CosmosState;

/// Mirror the core camera rig's pose onto the bevy camera. The rig owns all
/// orbit math; this is a plain copy each frame.
pub fn sync_camera(st: Res<CosmosState>, mut cam_q: Query<&mut Transform, With<Camera>>) {
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let Ok(mut cam_tf) = cam_q.get_single_mut() else {
        return;
    };
    let rig = engine.camera();
    cam_tf.translation = rig.position();
    cam_tf.look_at(rig.orbit_target, Vec3::Y);
}
