//! egui drawing for each surface.

pub mod dashboard;
pub mod decals;
pub mod hud;
pub mod keyboard;

pub use self::{
    dashboard::draw_dashboard, decals::draw_laser_decals, hud::draw_hud, keyboard::draw_keyboard,
};

/// Text scale applied to every surface; overlays are read at arm's length.
pub const VR_TEXT_SCALE: f32 = 1.5;

/// Dark visuals with enlarged text.
pub fn apply_style(ctx: &egui::Context) {
    ctx.set_visuals(egui::Visuals::dark());
    ctx.style_mut(|style| {
        for font in style.text_styles.values_mut() {
            font.size *= VR_TEXT_SCALE;
        }
        style.spacing.item_spacing = egui::vec2(8.0, 6.0);
        style.spacing.button_padding = egui::vec2(10.0, 6.0);
    });
}
