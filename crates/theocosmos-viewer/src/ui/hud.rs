use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts};
use theocosmos_core::{LearningState, NodeKind};

use crate::app::CosmosState;

/// Overlay surfaces drawn straight onto the egui layers: node labels, the
/// hover tooltip, the flythrough caption, and the degradation banner.
pub fn hud_overlay(mut contexts: EguiContexts, st: Res<CosmosState>) {
    let ctx = contexts.ctx_mut();

    draw_labels(ctx, &st);
    draw_tooltip(ctx, &st);
    draw_flythrough_caption(ctx, &st);
    draw_banner(ctx, &st);
}

fn draw_labels(ctx: &egui::Context, st: &CosmosState) {
    if !st.cfg.show_labels {
        return;
    }
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let painter = ctx.layer_painter(egui::LayerId::new(
        egui::Order::Background,
        egui::Id::new("cosmos-labels"),
    ));
    let budget = engine.quality().max_label_sprites;
    let mut drawn = 0usize;
    for (i, node) in engine.scene().nodes.iter().enumerate() {
        if node.kind != NodeKind::Locus {
            continue;
        }
        if drawn >= budget {
            break;
        }
        drawn += 1;
        let vis = &engine.visuals()[i];
        if vis.label_opacity < 0.02 {
            continue;
        }
        // Anchor just below the sphere, like a billboarded label.
        let anchor = node.position - Vec3::Y * (node.radius + 1.5);
        let Some((x, y)) = engine.camera().project_to_screen(anchor) else {
            continue;
        };
        let [r, g, b] = node.color;
        let color = egui::Color32::from_rgba_unmultiplied(
            (r * 255.0) as u8,
            (g * 255.0) as u8,
            (b * 255.0) as u8,
            (vis.label_opacity * 255.0) as u8,
        );
        painter.text(
            egui::pos2(x, y),
            egui::Align2::CENTER_CENTER,
            &node.name,
            egui::FontId::proportional(13.0),
            color,
        );
    }
}

fn draw_tooltip(ctx: &egui::Context, st: &CosmosState) {
    let Some((id, screen)) = &st.ui.hover else {
        return;
    };
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let Some(node) = engine.scene().node(id) else {
        return;
    };
    let mut lines = vec![node.name.clone(), format!("category: {}", node.category)];
    match st.progress.learning_state(id, st.now_ms()) {
        LearningState::ReviewDue => lines.push("review due".to_string()),
        LearningState::Connected => lines.push("reviewed".to_string()),
        LearningState::Unstudied => {}
    }

    egui::Area::new("cosmos-tooltip".into())
        .order(egui::Order::Foreground)
        .fixed_pos(egui::pos2(screen.x + 14.0, screen.y + 14.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                for line in lines {
                    ui.label(line);
                }
            });
        });
}

fn draw_flythrough_caption(ctx: &egui::Context, st: &CosmosState) {
    let Some(engine) = st.bridge.engine() else {
        return;
    };
    let fly = engine.flythrough();
    if !fly.active {
        return;
    }
    let focus_name = fly
        .focus_id
        .as_ref()
        .and_then(|id| engine.scene().node(id))
        .map(|n| n.name.clone())
        .unwrap_or_default();
    let screen = ctx.screen_rect();
    egui::Area::new("cosmos-flythrough".into())
        .order(egui::Order::Foreground)
        .fixed_pos(egui::pos2(screen.center().x - 140.0, screen.max.y - 70.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.label(format!(
                    "{} — {} ({}/{})",
                    fly.name,
                    focus_name,
                    fly.current_idx + 1,
                    fly.path_ids.len()
                ));
                let hint = if fly.paused {
                    "paused: Space resumes, Esc stops"
                } else {
                    "Space pauses, Esc stops"
                };
                ui.label(egui::RichText::new(hint).small());
            });
        });
}

fn draw_banner(ctx: &egui::Context, st: &CosmosState) {
    let Some(message) = &st.ui.banner else {
        return;
    };
    let screen = ctx.screen_rect();
    egui::Area::new("cosmos-banner".into())
        .order(egui::Order::Foreground)
        .fixed_pos(egui::pos2(screen.center().x - 220.0, screen.min.y + 10.0))
        .show(ctx, |ui| {
            egui::Frame::popup(ui.style()).show(ui, |ui| {
                ui.colored_label(egui::Color32::from_rgb(224, 160, 80), message);
            });
        });
}
