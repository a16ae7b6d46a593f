use bevy::prelude::*;
use theocosmos_core::visual::{EmissiveTint, AMBER_TINT};
use theocosmos_core::NodeKind;

use crate::app::CosmosState;

#[derive(Component)]
pub struct NodeMarker {
    pub index: usize,
}

/// Lights, camera, and one sphere entity per scene node. Node meshes are
/// shared per kind at the quality preset's tessellation; materials are
/// per-node (each carries its own color and live opacity).
pub fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    st: Res<CosmosState>,
) {
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.27, 0.33, 0.4),
        brightness: 220.0,
    });
    let key_light = PointLight {
        intensity: 2_400_000.0,
        range: 350.0,
        color: Color::srgb(0.86, 0.76, 0.35),
        shadows_enabled: false,
        ..default()
    };
    commands.spawn(PointLightBundle {
        point_light: key_light,
        transform: Transform::from_xyz(0.0, 35.0, 25.0),
        ..default()
    });
    commands.spawn(PointLightBundle {
        point_light: PointLight {
            intensity: 1_100_000.0,
            range: 350.0,
            color: Color::srgb(0.33, 0.53, 0.73),
            shadows_enabled: false,
            ..default()
        },
        transform: Transform::from_xyz(-35.0, -10.0, -25.0),
        ..default()
    });

    commands.spawn(Camera3dBundle {
        transform: Transform::from_xyz(0.0, 18.0, 55.0).looking_at(Vec3::ZERO, Vec3::Y),
        ..default()
    });

    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let q = engine.quality();
    let locus_mesh = meshes.add(
        Sphere::new(1.0)
            .mesh()
            .uv(q.sphere_segments.0 as usize, q.sphere_segments.1 as usize),
    );
    let sub_mesh = meshes.add(Sphere::new(1.0).mesh().uv(
        q.sub_sphere_segments.0 as usize,
        q.sub_sphere_segments.1 as usize,
    ));

    for (i, node) in engine.scene().nodes.iter().enumerate() {
        let vis = &engine.visuals()[i];
        let [r, g, b] = node.color;
        let mesh = match node.kind {
            NodeKind::Locus => locus_mesh.clone(),
            NodeKind::Sub => sub_mesh.clone(),
        };
        let material = mats.add(StandardMaterial {
            base_color: Color::srgba(r, g, b, vis.opacity),
            emissive: Color::srgb(r * vis.emissive, g * vis.emissive, b * vis.emissive).into(),
            alpha_mode: AlphaMode::Blend,
            perceptual_roughness: 0.8,
            ..default()
        });
        commands.spawn((
            PbrBundle {
                mesh,
                material,
                transform: Transform::from_translation(node.position)
                    .with_scale(Vec3::splat(vis.scale)),
                ..default()
            },
            NodeMarker { index: i },
        ));
    }
}

/// Push the core's smoothed visual attributes into materials and transforms.
/// Skipped entirely on frames where the engine's scheduler idled.
pub fn sync_node_visuals(
    st: Res<CosmosState>,
    mut mats: ResMut<Assets<StandardMaterial>>,
    mut query: Query<(&NodeMarker, &Handle<StandardMaterial>, &mut Transform)>,
) {
    if !st.ui.engine_ran {
        return;
    }
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let glow_enabled = engine.quality().enable_glow;
    for (marker, handle, mut tf) in query.iter_mut() {
        let node = &engine.scene().nodes[marker.index];
        let vis = &engine.visuals()[marker.index];
        let Some(mat) = mats.get_mut(handle) else {
            continue;
        };
        let [r, g, b] = node.color;
        mat.base_color = Color::srgba(r, g, b, vis.opacity);
        let tint = match vis.tint {
            EmissiveTint::Own => node.color,
            EmissiveTint::Amber => AMBER_TINT,
        };
        // The glow channel folds into emissive when halo sprites are on for
        // this tier; low-end tiers keep the flat emissive alone.
        let intensity = vis.emissive + if glow_enabled { vis.glow * 0.6 } else { 0.0 };
        mat.emissive =
            Color::srgb(tint[0] * intensity, tint[1] * intensity, tint[2] * intensity).into();
        tf.scale = Vec3::splat(vis.scale);
    }
}

/// Edges and directional arrows as immediate-mode gizmo lines, tinted by the
/// core's per-edge alphas.
pub fn draw_edges(st: Res<CosmosState>, mut gizmos: Gizmos) {
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    if st.cfg.show_edges {
        let alphas = engine.edge_alphas();
        for (ei, edge) in engine.scene().edges.iter().enumerate() {
            let alpha = alphas[ei];
            if alpha < 0.005 {
                continue;
            }
            let (Some(a), Some(b)) = (
                engine.scene().node(&edge.from),
                engine.scene().node(&edge.to),
            ) else {
                continue;
            };
            gizmos.line(
                a.position,
                b.position,
                Color::srgba(0.85, 0.85, 1.0, alpha),
            );
        }
    }

    if st.cfg.show_arrows {
        for (ai, &ei) in engine.arrow_edges().iter().enumerate() {
            let alpha = engine.arrow_alphas()[ai];
            if alpha < 0.02 {
                continue;
            }
            let edge = &engine.scene().edges[ei];
            let (Some(a), Some(b)) = (
                engine.scene().node(&edge.from),
                engine.scene().node(&edge.to),
            ) else {
                continue;
            };
            // Short head near the target end of the edge.
            let start = a.position.lerp(b.position, 0.70);
            let end = a.position.lerp(b.position, 0.82);
            gizmos.arrow(start, end, Color::srgba(0.53, 0.53, 0.53, alpha));
        }
    }
}

/// Failure teardown: once the bridge latches, the 3D entities go away and
/// only the egui surfaces remain.
pub fn despawn_on_failure(
    mut commands: Commands,
    st: Res<CosmosState>,
    query: Query<Entity, With<NodeMarker>>,
) {
    if !st.bridge.is_failed() {
        return;
    }
    for entity in query.iter() {
        commands.entity(entity).despawn_recursive();
    }
}
