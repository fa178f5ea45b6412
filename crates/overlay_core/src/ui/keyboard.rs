use crate::keyboard::{KeyAction, KeyboardLayout};
use egui::{Align2, Color32, FontId, LayerId, Pos2, Rect, Stroke};

const KEY_FILL: Color32 = Color32::from_rgb(60, 60, 66);
const KEY_HOVER: Color32 = Color32::from_rgb(77, 179, 255);
const BACK_HOVER: Color32 = Color32::from_rgb(255, 77, 77);
const ENTER_HOVER: Color32 = Color32::from_rgb(77, 255, 77);
const CURSOR_FILL: Color32 = Color32::from_rgb(255, 100, 100);

/// Paints the keyboard: the current input line, every key, and a cursor at
/// `pointer` when the laser is on the surface.
pub fn draw_keyboard(ctx: &egui::Context, layout: &KeyboardLayout, text: &str, pointer: Option<Pos2>) {
    let painter = ctx.layer_painter(LayerId::background());
    let hovered = pointer.and_then(|p| layout.hit_test(p.x, p.y));

    painter.text(
        egui::pos2(10.0, 20.0),
        Align2::LEFT_TOP,
        if text.is_empty() { "Type your message..." } else { text },
        FontId::proportional(22.0),
        if text.is_empty() {
            Color32::from_gray(140)
        } else {
            Color32::WHITE
        },
    );
    painter.hline(10.0..=502.0, 60.0, Stroke::new(1.0, Color32::from_gray(100)));

    for (i, key) in layout.keys().iter().enumerate() {
        let rect = Rect::from_min_max(
            egui::pos2(key.rect.min_x, key.rect.min_y),
            egui::pos2(key.rect.max_x, key.rect.max_y),
        );
        let fill = match (hovered == Some(i), key.action) {
            (true, KeyAction::Backspace) => BACK_HOVER,
            (true, KeyAction::Enter) => ENTER_HOVER,
            (true, _) => KEY_HOVER,
            (false, _) => KEY_FILL,
        };
        painter.rect_filled(rect, 4.0, fill);
        painter.text(
            rect.center(),
            Align2::CENTER_CENTER,
            &key.label,
            FontId::proportional(18.0),
            Color32::WHITE,
        );
    }

    if let Some(p) = pointer {
        painter.circle_filled(p, 5.0, CURSOR_FILL);
        painter.circle_stroke(p, 8.0, Stroke::new(2.0, Color32::from_white_alpha(200)));
    }
}
