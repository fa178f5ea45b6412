//! Settings dashboard: a category list that opens into detail panes.

use crate::settings::{DashboardModel, OverlaySettings, DASHBOARD_TABS, STREAM_OVERLAY_TAB};
use egui::RichText;

const TAB_BUTTON_SIZE: [f32; 2] = [280.0, 44.0];

pub fn draw_dashboard(ctx: &egui::Context, model: &mut DashboardModel) {
    egui::CentralPanel::default().show(ctx, |ui| {
        if model.state.show_settings {
            draw_detail(ui, model);
        } else {
            draw_categories(ui, model);
        }
    });
}

fn draw_categories(ui: &mut egui::Ui, model: &mut DashboardModel) {
    ui.heading("Settings");
    ui.separator();
    ui.add_space(8.0);

    let mut opened = None;
    for (i, name) in DASHBOARD_TABS.iter().enumerate() {
        let selected = model.state.current_tab == i as i32;
        let button = egui::Button::new(*name).selected(selected);
        if ui.add_sized(TAB_BUTTON_SIZE, button).clicked() {
            opened = Some(i as i32);
        }
    }
    if let Some(tab) = opened {
        model.open_tab(tab);
    }
}

fn draw_detail(ui: &mut egui::Ui, model: &mut DashboardModel) {
    let tab = model.state.sanitized().current_tab;
    let mut back = false;
    ui.horizontal(|ui| {
        back = ui.button("< Back").clicked();
        ui.heading(DASHBOARD_TABS[tab as usize]);
    });
    ui.separator();
    ui.add_space(8.0);

    if tab == STREAM_OVERLAY_TAB {
        if stream_overlay_pane(ui, &mut model.settings) {
            model.commit_settings();
        }
    } else {
        ui.label(placeholder_text(tab));
    }

    if back {
        model.close_tab();
    }
}

/// Returns `true` when "Apply Settings" was pressed.
fn stream_overlay_pane(ui: &mut egui::Ui, settings: &mut OverlaySettings) -> bool {
    ui.label(RichText::new("Chat").strong());
    ui.checkbox(&mut settings.show_chat, "Show chat");
    ui.add(egui::Slider::new(&mut settings.chat_opacity, 0.0..=1.0).text("Opacity"));
    ui.horizontal(|ui| {
        ui.label("Position");
        ui.add(egui::DragValue::new(&mut settings.chat_position_x).prefix("x: "));
        ui.add(egui::DragValue::new(&mut settings.chat_position_y).prefix("y: "));
    });
    ui.add(egui::Slider::new(&mut settings.chat_width, 100.0..=800.0).text("Width"));
    ui.add(egui::Slider::new(&mut settings.chat_height, 100.0..=1000.0).text("Height"));

    ui.add_space(8.0);
    ui.label(RichText::new("Alerts").strong());
    ui.checkbox(&mut settings.show_alerts, "Show alerts");
    ui.add(
        egui::Slider::new(&mut settings.alert_duration, 1.0..=30.0)
            .text("Duration")
            .suffix(" s"),
    );

    ui.add_space(12.0);
    ui.button("Apply Settings").clicked()
}

fn placeholder_text(tab: i32) -> String {
    match tab {
        0 => "Connection settings will appear here.".into(),
        1 => "General preferences will appear here.".into(),
        2 => "Streaming platform accounts will appear here.".into(),
        3 => "Theme and layout options will appear here.".into(),
        4 => "Audio devices and levels will appear here.".into(),
        6 => "Quick action bindings will appear here.".into(),
        7 => "Installed plugins will appear here.".into(),
        _ => format!("Stream overlay\nVersion: {}", env!("CARGO_PKG_VERSION")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_shows_on_about() {
        assert!(placeholder_text(8).contains("Version: 0.1.0"));
    }

    #[test]
    fn clicking_a_category_opens_it() {
        let ctx = egui::Context::default();
        let mut model = DashboardModel::new();
        let screen = egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1280.0, 960.0));
        let frame = |model: &mut DashboardModel, events: Vec<egui::Event>| {
            let input = egui::RawInput {
                screen_rect: Some(screen),
                events,
                ..Default::default()
            };
            let _ = ctx.run(input, |ctx| draw_dashboard(ctx, model));
        };
        let button = |pos, pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };

        frame(&mut model, Vec::new());
        // Walk down the category column until a click lands on a button.
        for y in (60..400).step_by(15) {
            let pos = egui::pos2(100.0, y as f32);
            frame(&mut model, vec![egui::Event::PointerMoved(pos)]);
            frame(&mut model, vec![button(pos, true)]);
            frame(&mut model, vec![button(pos, false)]);
            if model.state.show_settings {
                break;
            }
        }

        let state = model.take_state_change().expect("a category should have opened");
        assert!(state.show_settings);
        assert_eq!(model.take_state_change(), None);
    }
}
