use crate::pointer::LaserDecal;
use egui::{Color32, Id, LayerId, Order, Stroke};

/// Per-controller decal colour, indexed by slot.
pub const DECAL_COLORS: [Color32; 2] = [Color32::from_rgb(100, 200, 255), Color32::from_rgb(255, 200, 100)];

/// Draws a ringed dot wherever a laser touches the surface, above all UI.
pub fn draw_laser_decals(ctx: &egui::Context, decals: &[LaserDecal]) {
    if decals.is_empty() {
        return;
    }
    let painter = ctx.layer_painter(LayerId::new(Order::Foreground, Id::new("laser_decals")));
    for decal in decals {
        let color = DECAL_COLORS[decal.slot % DECAL_COLORS.len()];
        let center = egui::pos2(decal.x, decal.y);
        painter.circle_stroke(center, 20.0, Stroke::new(3.0, Color32::from_white_alpha(128)));
        painter.circle_stroke(center, 15.0, Stroke::new(2.0, color));
        painter.circle_filled(center, 8.0, color);
        painter.circle_filled(center, 3.0, Color32::WHITE);
    }
}
