use crate::{
    chat::{truncate_utf8, ChatState, MAX_TEXT_BYTES},
    settings::OverlaySettings,
};
use egui::{Color32, RichText};

const TITLE_COLOR: Color32 = Color32::from_rgb(180, 230, 255);
const AUTHOR_COLOR: Color32 = Color32::from_rgb(204, 204, 51);
const INPUT_ID: &str = "hud_chat_input";

/// Chat panel: transcript, input line and send button.
///
/// Enter or Send posts the input to the sent mailbox. Focusing the input
/// raises the focus mailbox so the host side can bring up the keyboard.
pub fn draw_hud(ctx: &egui::Context, chat: &mut ChatState, settings: &OverlaySettings) {
    if !settings.show_chat {
        return;
    }

    let alpha = (settings.chat_opacity.clamp(0.0, 1.0) * 255.0).round() as u8;
    let frame = egui::Frame::none()
        .fill(Color32::from_rgba_unmultiplied(18, 18, 24, alpha))
        .rounding(6.0)
        .inner_margin(10.0);

    egui::Area::new(egui::Id::new("hud_chat"))
        .fixed_pos(egui::pos2(settings.chat_position_x, settings.chat_position_y))
        .order(egui::Order::Middle)
        .show(ctx, |ui| {
            frame.show(ui, |ui| {
                ui.set_width(settings.chat_width);
                ui.set_max_height(settings.chat_height);

                ui.label(RichText::new("Stream Chat").color(TITLE_COLOR).strong());
                ui.separator();

                let log_height = (settings.chat_height - 110.0).max(40.0);
                egui::ScrollArea::vertical()
                    .id_source("hud_chat_log")
                    .max_height(log_height)
                    .auto_shrink([false, false])
                    .stick_to_bottom(true)
                    .show(ui, |ui| {
                        for msg in chat.messages() {
                            ui.horizontal_wrapped(|ui| {
                                ui.label(RichText::new(format!("{}:", msg.author)).color(AUTHOR_COLOR));
                                ui.label(&msg.text);
                            });
                        }
                    });

                ui.separator();
                ui.horizontal(|ui| {
                    let send_clicked = ui.button("Send").clicked();
                    let response = ui.add(
                        egui::TextEdit::singleline(&mut chat.input)
                            .id(egui::Id::new(INPUT_ID))
                            .char_limit(MAX_TEXT_BYTES)
                            .desired_width(f32::INFINITY)
                            .hint_text("Type a message..."),
                    );
                    // char_limit counts chars; the line is bounded in bytes.
                    truncate_utf8(&mut chat.input, MAX_TEXT_BYTES);
                    // Focus requested outside a pass must still count as gained.
                    let focus_key = egui::Id::new(INPUT_ID).with("was_focused");
                    let focused = response.has_focus();
                    let was_focused = ui.data(|d| d.get_temp::<bool>(focus_key).unwrap_or(false));
                    if focused && !was_focused {
                        chat.notify_input_focused();
                    }
                    ui.data_mut(|d| d.insert_temp(focus_key, focused));
                    let enter_pressed =
                        response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
                    if send_clicked || enter_pressed {
                        chat.submit_input();
                    }
                });
            });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::ChatMessage;

    fn run(ctx: &egui::Context, chat: &mut ChatState, events: Vec<egui::Event>) {
        let input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(egui::Pos2::ZERO, egui::vec2(1024.0, 768.0))),
            events,
            ..Default::default()
        };
        let _ = ctx.run(input, |ctx| draw_hud(ctx, chat, &OverlaySettings::default()));
    }

    #[test]
    fn typing_enter_posts_message() {
        let ctx = egui::Context::default();
        let mut chat = ChatState::new();
        chat.replace_transcript(vec![ChatMessage::new("alice", "hi")]);
        run(&ctx, &mut chat, Vec::new());

        ctx.memory_mut(|m| m.request_focus(egui::Id::new(INPUT_ID)));
        run(&ctx, &mut chat, Vec::new());
        assert!(chat.take_input_focused());

        run(&ctx, &mut chat, vec![egui::Event::Text("hello".into())]);
        assert_eq!(chat.input, "hello");

        run(
            &ctx,
            &mut chat,
            vec![egui::Event::Key {
                key: egui::Key::Enter,
                physical_key: None,
                pressed: true,
                repeat: false,
                modifiers: egui::Modifiers::NONE,
            }],
        );
        assert_eq!(chat.take_sent().as_deref(), Some("hello"));
        assert!(chat.input.is_empty());
    }

    #[test]
    fn typed_input_is_capped_in_bytes() {
        let ctx = egui::Context::default();
        let mut chat = ChatState::new();
        run(&ctx, &mut chat, Vec::new());
        ctx.memory_mut(|m| m.request_focus(egui::Id::new(INPUT_ID)));
        run(&ctx, &mut chat, Vec::new());

        run(&ctx, &mut chat, vec![egui::Event::Text("x".repeat(400))]);
        assert_eq!(chat.input.len(), MAX_TEXT_BYTES);
        // The virtual keyboard keeps working once room is made.
        assert!(chat.pop_input().is_some());
        assert!(chat.push_input("q"));

        chat.input.clear();
        run(&ctx, &mut chat, vec![egui::Event::Text("é".repeat(200))]);
        assert!(chat.input.len() <= MAX_TEXT_BYTES);
        assert!(chat.input.chars().all(|c| c == 'é'));
    }

    #[test]
    fn hidden_chat_draws_nothing() {
        let ctx = egui::Context::default();
        let mut chat = ChatState::new();
        let settings = OverlaySettings {
            show_chat: false,
            ..Default::default()
        };
        let output = ctx.run(egui::RawInput::default(), |ctx| draw_hud(ctx, &mut chat, &settings));
        assert!(output.shapes.is_empty());
    }
}
