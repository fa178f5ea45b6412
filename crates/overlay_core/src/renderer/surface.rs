//! Per-surface UI pass: pointer → egui input → tessellation → backend →
//! compositor.

use super::{GraphicsBackend, UiFrame};
use crate::{
    chat::ChatState,
    error::OverlayError,
    frame_pool::FramePool,
    keyboard::KeyboardLayout,
    pointer::{LaserDecal, PointerState},
    runtime::VrRuntime,
    settings::{DashboardModel, OverlaySettings},
    surface::{OverlayHandle, SurfaceKind},
    ui,
};
use std::time::Instant;
use tracing::{trace, warn};

/// What a surface shows this frame.
pub enum SurfaceContent<'a> {
    Hud {
        chat: &'a mut ChatState,
        settings: OverlaySettings,
        decals: &'a [LaserDecal],
    },
    Dashboard {
        model: &'a mut DashboardModel,
    },
    Keyboard {
        layout: &'a KeyboardLayout,
        text: &'a str,
        decals: &'a [LaserDecal],
    },
}

impl SurfaceContent<'_> {
    fn kind(&self) -> SurfaceKind {
        match self {
            SurfaceContent::Hud { .. } => SurfaceKind::Hud,
            SurfaceContent::Dashboard { .. } => SurfaceKind::Dashboard,
            SurfaceContent::Keyboard { .. } => SurfaceKind::Keyboard,
        }
    }

    fn draw(&mut self, ctx: &egui::Context, pointer: Option<egui::Pos2>) {
        match self {
            SurfaceContent::Hud {
                chat,
                settings,
                decals,
            } => {
                ui::draw_hud(ctx, chat, settings);
                ui::draw_laser_decals(ctx, decals);
            }
            SurfaceContent::Dashboard { model } => ui::draw_dashboard(ctx, model),
            SurfaceContent::Keyboard {
                layout,
                text,
                decals,
            } => {
                ui::draw_keyboard(ctx, layout, text, pointer);
                ui::draw_laser_decals(ctx, decals);
            }
        }
    }
}

/// Owns one surface's egui context and the pointer state last fed to it.
pub struct SurfaceRenderer {
    kind: SurfaceKind,
    ctx: egui::Context,
    background: [f32; 4],
    /// `None` while the pointer is off the surface.
    last_pointer: Option<PointerState>,
    started: Instant,
    frames: u64,
}

impl SurfaceRenderer {
    pub fn new(kind: SurfaceKind, background: [f32; 4]) -> Self {
        let ctx = egui::Context::default();
        ui::apply_style(&ctx);
        Self {
            kind,
            ctx,
            background,
            last_pointer: None,
            started: Instant::now(),
            frames: 0,
        }
    }

    pub fn kind(&self) -> SurfaceKind {
        self.kind
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Translates the routed pointer into egui events.
    ///
    /// Moves are sent every frame the pointer is on the surface; button
    /// events only on change. Leaving the surface releases a held button
    /// before the pointer is reported gone.
    pub fn build_input(&mut self, pointer: PointerState, width: u32, height: u32) -> egui::RawInput {
        let mut input = egui::RawInput {
            screen_rect: Some(egui::Rect::from_min_size(
                egui::Pos2::ZERO,
                egui::vec2(width as f32, height as f32),
            )),
            time: Some(self.started.elapsed().as_secs_f64()),
            focused: true,
            ..Default::default()
        };

        let press = |pos, pressed| egui::Event::PointerButton {
            pos,
            button: egui::PointerButton::Primary,
            pressed,
            modifiers: egui::Modifiers::NONE,
        };

        if pointer.is_within(width as f32, height as f32) {
            let pos = egui::pos2(pointer.x, pointer.y);
            input.events.push(egui::Event::PointerMoved(pos));
            let was_down = self.last_pointer.is_some_and(|p| p.button_down);
            if pointer.button_down != was_down {
                input.events.push(press(pos, pointer.button_down));
            }
            self.last_pointer = Some(pointer);
        } else if let Some(last) = self.last_pointer.take() {
            if last.button_down {
                input.events.push(press(egui::pos2(last.x, last.y), false));
            }
            input.events.push(egui::Event::PointerGone);
        }
        input
    }

    /// Draws `content` into the pool's current target for this surface and
    /// submits it. Returns `false` when nothing was submitted or the
    /// compositor refused the frame.
    pub fn render(
        &mut self,
        pool: &mut FramePool,
        backend: &mut dyn GraphicsBackend,
        runtime: &mut dyn VrRuntime,
        handle: OverlayHandle,
        pointer: PointerState,
        content: SurfaceContent<'_>,
    ) -> bool {
        debug_assert_eq!(content.kind(), self.kind);
        let (Some(target), Some((width, height))) = (pool.acquire_write_target(self.kind), pool.size(self.kind))
        else {
            return false;
        };

        if let Err(e) = self.draw(backend, target, pointer, content, width, height) {
            // Submit anyway: the ring must advance in lock-step with
            // presentation attempts.
            warn!(surface = self.kind.label(), error = %e, "Surface draw failed");
        }
        self.frames += 1;

        pool.submit(self.kind, target, |t| backend.present_to_overlay(t, handle, runtime))
    }

    fn draw(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        target: super::RenderTargetId,
        pointer: PointerState,
        mut content: SurfaceContent<'_>,
        width: u32,
        height: u32,
    ) -> Result<(), OverlayError> {
        backend.bind_render_target(target)?;
        backend.clear(self.background)?;

        let input = self.build_input(pointer, width, height);
        let cursor = self
            .last_pointer
            .map(|p| egui::pos2(p.x, p.y));
        let output = self.ctx.run(input, |ctx| content.draw(ctx, cursor));
        let primitives = self.ctx.tessellate(output.shapes, output.pixels_per_point);
        trace!(
            surface = self.kind.label(),
            primitives = primitives.len(),
            "Surface tessellated"
        );

        backend.paint(&UiFrame {
            surface: self.kind,
            primitives: &primitives,
            textures_delta: &output.textures_delta,
            pixels_per_point: output.pixels_per_point,
            size_px: [width, height],
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(x: f32, y: f32, down: bool) -> PointerState {
        PointerState {
            x,
            y,
            button_down: down,
        }
    }

    fn button_events(input: &egui::RawInput) -> Vec<bool> {
        input
            .events
            .iter()
            .filter_map(|e| match e {
                egui::Event::PointerButton { pressed, .. } => Some(*pressed),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn button_events_only_on_change() {
        let mut r = SurfaceRenderer::new(SurfaceKind::Hud, [0.0; 4]);
        assert_eq!(button_events(&r.build_input(at(10.0, 10.0, false), 100, 100)), Vec::<bool>::new());
        assert_eq!(button_events(&r.build_input(at(10.0, 10.0, true), 100, 100)), vec![true]);
        assert_eq!(button_events(&r.build_input(at(12.0, 10.0, true), 100, 100)), Vec::<bool>::new());
        assert_eq!(button_events(&r.build_input(at(12.0, 10.0, false), 100, 100)), vec![false]);
    }

    #[test]
    fn leaving_with_button_held_releases_then_goes() {
        let mut r = SurfaceRenderer::new(SurfaceKind::Keyboard, [0.0; 4]);
        r.build_input(at(10.0, 10.0, true), 100, 100);
        let input = r.build_input(PointerState::OFF_SURFACE, 100, 100);
        assert_eq!(button_events(&input), vec![false]);
        assert!(matches!(input.events.last(), Some(egui::Event::PointerGone)));

        let again = r.build_input(PointerState::OFF_SURFACE, 100, 100);
        assert!(again.events.is_empty(), "gone is reported once");
    }

    #[test]
    fn off_surface_pointer_never_clicks() {
        let mut r = SurfaceRenderer::new(SurfaceKind::Hud, [0.0; 4]);
        let input = r.build_input(at(500.0, 10.0, true), 100, 100);
        assert!(input.events.is_empty());
    }
}
