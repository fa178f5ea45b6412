//! The overlay session: owns the surfaces and drives one tick per
//! compositor frame.
//!
//! Public operations never panic and never return errors; failures are
//! logged and reported as `false`/`None`, matching the contract a host
//! loop expects from a best-effort overlay.

use crate::{
    chat::ChatMessage,
    config::SessionConfig,
    controller::{find_hip_tracker, ControllerTracker, CONTROLLER_SLOTS},
    error::{OverlayError, RuntimeError},
    frame_pool::FramePool,
    keyboard::{apply_key, KeyOutcome, KeyboardLayout},
    laser::{self, LaserHit},
    placement,
    pointer::{LaserSample, PointerBridge, PointerState},
    renderer::{GraphicsBackend, SurfaceContent, SurfaceRenderer},
    runtime::{InputMethod, MouseButton, OverlayEvent, VrRuntime},
    settings::{DashboardState, OverlaySettings},
    shared::SharedState,
    surface::{OverlayHandle, OverlaySurface, SurfaceKind, SurfaceState},
};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// What one [`OverlaySession::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub hud_submitted: bool,
    pub dashboard_submitted: bool,
    /// `None` when the keyboard was hidden this tick.
    pub keyboard_submitted: Option<bool>,
    pub keys_typed: u32,
    pub dashboard_events: u32,
}

/// This tick's laser results against the world-locked surfaces.
#[derive(Debug, Clone, Copy, Default)]
struct LaserFrame {
    hud: [LaserHit; CONTROLLER_SLOTS],
    keyboard: [LaserHit; CONTROLLER_SLOTS],
}

pub struct OverlaySession<R: VrRuntime> {
    config: SessionConfig,
    runtime: R,
    backend: Box<dyn GraphicsBackend>,
    surfaces: [OverlaySurface; 3],
    pool: FramePool,
    renderers: [SurfaceRenderer; 3],
    tracker: ControllerTracker,
    bridge: PointerBridge,
    keyboard: KeyboardLayout,
    keyboard_visible: bool,
    shared: Arc<SharedState>,
    initialised: bool,
}

impl<R: VrRuntime> OverlaySession<R> {
    pub fn new(config: SessionConfig, runtime: R, backend: Box<dyn GraphicsBackend>) -> Self {
        let surfaces = SurfaceKind::ALL.map(|kind| OverlaySurface::new(kind, config.surface(kind)));
        let renderers = SurfaceKind::ALL.map(|kind| SurfaceRenderer::new(kind, config.surface(kind).background));
        Self {
            tracker: ControllerTracker::new(config.trigger_threshold),
            config,
            runtime,
            backend,
            surfaces,
            pool: FramePool::new(),
            renderers,
            bridge: PointerBridge::new(),
            keyboard: KeyboardLayout::qwerty(),
            keyboard_visible: false,
            shared: SharedState::new(),
            initialised: false,
        }
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Connects to the runtime. Idempotent.
    pub fn init(&mut self) -> bool {
        if self.initialised {
            return true;
        }
        match self.runtime.init() {
            Ok(()) => {
                self.initialised = true;
                info!(backend = self.backend.name(), "Overlay session initialised");
                true
            }
            Err(e) => {
                error!(error = %e, "VR runtime initialisation failed");
                false
            }
        }
    }

    pub fn is_initialised(&self) -> bool {
        self.initialised
    }

    /// Destroys every surface and disconnects. Safe to call repeatedly.
    pub fn shutdown(&mut self) {
        if !self.initialised {
            return;
        }
        for kind in SurfaceKind::ALL {
            self.destroy_surface(kind);
        }
        self.runtime.shutdown();
        self.initialised = false;
        info!("Overlay session shut down");
    }

    /// Creates the overlay for `kind` with its render targets.
    ///
    /// Returns the existing handle when the surface is already live.
    pub fn create_overlay(&mut self, kind: SurfaceKind, key: &str, name: &str, width_m: f32) -> Option<OverlayHandle> {
        if !self.initialised {
            warn!(surface = kind.label(), "Cannot create overlay before init");
            return None;
        }
        let surface = &self.surfaces[kind.index()];
        if surface.is_live() {
            return Some(surface.handle);
        }
        match self.try_create(kind, key, name, width_m) {
            Ok(handle) => {
                info!(surface = kind.label(), key, ?handle, "Overlay created");
                Some(handle)
            }
            Err(e) => {
                error!(surface = kind.label(), key, error = %e, "Overlay creation failed");
                None
            }
        }
    }

    fn try_create(&mut self, kind: SurfaceKind, key: &str, name: &str, width_m: f32) -> Result<OverlayHandle, OverlayError> {
        let handle = self.runtime.create_overlay(key, name, kind.is_dashboard())?;
        if let Err(e) = self.configure_overlay(kind, handle, width_m) {
            let _ = self.runtime.destroy_overlay(handle);
            return Err(e.into());
        }

        let (width, height) = {
            let s = &self.surfaces[kind.index()];
            (s.width_px, s.height_px)
        };
        if let Err(e) = self.pool.create(kind, self.backend.as_mut(), width, height) {
            let _ = self.runtime.destroy_overlay(handle);
            return Err(e.into());
        }

        let surface = &mut self.surfaces[kind.index()];
        surface.handle = handle;
        surface.width_m = width_m;
        surface.state = SurfaceState::Created;
        Ok(handle)
    }

    fn configure_overlay(&mut self, kind: SurfaceKind, handle: OverlayHandle, width_m: f32) -> Result<(), RuntimeError> {
        self.runtime.set_overlay_width_meters(handle, width_m)?;
        self.runtime.set_overlay_input_method(handle, InputMethod::Mouse)?;
        let s = &self.surfaces[kind.index()];
        self.runtime.set_overlay_mouse_scale(handle, s.width_px, s.height_px)?;
        if kind == SurfaceKind::Hud {
            self.runtime
                .set_overlay_placement(handle, placement::in_front_of_hmd(self.config.hud_distance_m))?;
        }
        Ok(())
    }

    /// Creates HUD, dashboard and keyboard from the session config and shows
    /// the HUD. The keyboard is optional; returns `false` if HUD or
    /// dashboard could not be created.
    pub fn create_default_overlays(&mut self) -> bool {
        let mut ok = true;
        for kind in SurfaceKind::ALL {
            let cfg = self.config.surface(kind).clone();
            match self.create_overlay(kind, &cfg.key, &cfg.name, cfg.width_m) {
                Some(handle) if kind == SurfaceKind::Hud => {
                    self.show(handle);
                }
                Some(_) => {}
                None if kind == SurfaceKind::Keyboard => {
                    warn!("Virtual keyboard unavailable");
                }
                None => ok = false,
            }
        }
        ok
    }

    pub fn destroy_overlay(&mut self, handle: OverlayHandle) {
        if let Some(kind) = self.kind_of(handle) {
            self.destroy_surface(kind);
        }
    }

    fn destroy_surface(&mut self, kind: SurfaceKind) {
        let Some(handle) = self.surfaces[kind.index()].mark_destroyed() else {
            return;
        };
        if let Err(e) = self.runtime.destroy_overlay(handle) {
            warn!(surface = kind.label(), error = %e, "Runtime refused overlay destruction");
        }
        self.pool.release(kind, self.backend.as_mut());
        if kind == SurfaceKind::Keyboard {
            self.keyboard_visible = false;
        }
        debug!(surface = kind.label(), "Overlay destroyed");
    }

    pub fn show(&mut self, handle: OverlayHandle) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        if kind == SurfaceKind::Keyboard {
            self.dock_keyboard(handle);
        }
        match self.runtime.show_overlay(handle) {
            Ok(()) => {
                self.surfaces[kind.index()].mark_visible();
                if kind == SurfaceKind::Keyboard {
                    self.keyboard_visible = true;
                }
                true
            }
            Err(e) => {
                warn!(surface = kind.label(), error = %e, "Show failed");
                false
            }
        }
    }

    pub fn hide(&mut self, handle: OverlayHandle) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        match self.runtime.hide_overlay(handle) {
            Ok(()) => {
                self.surfaces[kind.index()].mark_hidden();
                if kind == SurfaceKind::Keyboard {
                    self.keyboard_visible = false;
                }
                true
            }
            Err(e) => {
                warn!(surface = kind.label(), error = %e, "Hide failed");
                false
            }
        }
    }

    /// Updates the physical width of a live overlay.
    pub fn set_overlay_width(&mut self, handle: OverlayHandle, width_m: f32) -> bool {
        let Some(kind) = self.kind_of(handle) else {
            return false;
        };
        if !(width_m.is_finite() && width_m > 0.0) {
            return false;
        }
        match self.runtime.set_overlay_width_meters(handle, width_m) {
            Ok(()) => {
                self.surfaces[kind.index()].width_m = width_m;
                true
            }
            Err(e) => {
                warn!(surface = kind.label(), error = %e, "Width update failed");
                false
            }
        }
    }

    fn dock_keyboard(&mut self, handle: OverlayHandle) {
        let hip = find_hip_tracker(&self.runtime.tracked_devices());
        let dock = placement::keyboard_dock(hip);
        if let Err(e) = self.runtime.set_overlay_placement(handle, dock) {
            warn!(error = %e, "Keyboard docking failed");
        } else {
            debug!(hip_tracker = ?hip, "Keyboard docked");
        }
    }

    pub fn set_keyboard_visible(&mut self, visible: bool) -> bool {
        let handle = self.surfaces[SurfaceKind::Keyboard.index()].handle;
        if !handle.is_valid() {
            return false;
        }
        if visible {
            self.show(handle)
        } else {
            self.hide(handle)
        }
    }

    pub fn keyboard_visible(&self) -> bool {
        self.keyboard_visible
    }

    fn kind_of(&self, handle: OverlayHandle) -> Option<SurfaceKind> {
        if !handle.is_valid() {
            return None;
        }
        self.surfaces
            .iter()
            .find(|s| s.is_live() && s.handle == handle)
            .map(|s| s.kind)
    }

    pub fn surface(&self, kind: SurfaceKind) -> &OverlaySurface {
        &self.surfaces[kind.index()]
    }

    pub fn handle(&self, kind: SurfaceKind) -> Option<OverlayHandle> {
        let s = &self.surfaces[kind.index()];
        s.is_live().then_some(s.handle)
    }

    // ---------------------------------------------------------------------
    // Frame pump
    // ---------------------------------------------------------------------

    /// Blocks until the compositor's next frame.
    pub fn wait_for_frame(&mut self) {
        if self.initialised {
            self.runtime.wait_get_poses();
        }
    }

    /// Tells the compositor this frame's submissions are done.
    pub fn compositor_sync(&mut self) {
        if self.initialised {
            self.runtime.post_present_handoff();
        }
    }

    /// Draws and submits one frame of `kind` at `width`×`height` pixels.
    ///
    /// A size change reallocates the surface's render targets first.
    pub fn render_and_submit(&mut self, kind: SurfaceKind, width: u32, height: u32) -> bool {
        let idx = kind.index();
        if !self.surfaces[idx].is_live() || width == 0 || height == 0 {
            return false;
        }
        if let Err(e) = self.pool.resize(kind, self.backend.as_mut(), width, height) {
            warn!(surface = kind.label(), width, height, error = %e, "Render target reallocation failed");
            return false;
        }
        let handle = self.surfaces[idx].handle;
        if (self.surfaces[idx].width_px, self.surfaces[idx].height_px) != (width, height) {
            if let Err(e) = self.runtime.set_overlay_mouse_scale(handle, width, height) {
                warn!(surface = kind.label(), width, height, error = %e, "Mouse scale update failed");
            }
            self.surfaces[idx].width_px = width;
            self.surfaces[idx].height_px = height;
        }

        let pointer = self.bridge.pointer_for(kind);
        let decals = self.bridge.decals(kind);
        let shared = Arc::clone(&self.shared);
        let renderer = &mut self.renderers[idx];
        let backend = self.backend.as_mut();

        match kind {
            SurfaceKind::Hud => {
                let settings = shared.dashboard.lock().settings;
                let mut chat = shared.chat.lock();
                let content = SurfaceContent::Hud {
                    chat: &mut *chat,
                    settings,
                    decals: &decals,
                };
                renderer.render(&mut self.pool, backend, &mut self.runtime, handle, pointer, content)
            }
            SurfaceKind::Dashboard => {
                let mut model = shared.dashboard.lock();
                let content = SurfaceContent::Dashboard { model: &mut *model };
                renderer.render(&mut self.pool, backend, &mut self.runtime, handle, pointer, content)
            }
            SurfaceKind::Keyboard => {
                let text = shared.chat.lock().input.clone();
                let content = SurfaceContent::Keyboard {
                    layout: &self.keyboard,
                    text: &text,
                    decals: &decals,
                };
                renderer.render(&mut self.pool, backend, &mut self.runtime, handle, pointer, content)
            }
        }
    }

    fn render_surface(&mut self, kind: SurfaceKind) -> bool {
        let s = &self.surfaces[kind.index()];
        let (w, h) = (s.width_px, s.height_px);
        self.render_and_submit(kind, w, h)
    }

    /// Drains the dashboard overlay's event queue into the injected pointer.
    fn pump_dashboard_events(&mut self) -> u32 {
        let Some(handle) = self.handle(SurfaceKind::Dashboard) else {
            return 0;
        };
        let mut drained = 0;
        while let Some(event) = self.runtime.poll_overlay_event(handle) {
            drained += 1;
            match event {
                OverlayEvent::MouseMove { x, y } => self.bridge.inject_position(x, y),
                OverlayEvent::MouseButtonDown { button: MouseButton::Left } => self.bridge.inject_button(0, true),
                OverlayEvent::MouseButtonUp { button: MouseButton::Left } => self.bridge.inject_button(0, false),
                _ => {}
            }
        }
        drained
    }

    /// One full frame: input, interaction, rendering, compositor sync.
    pub fn tick(&mut self) -> TickReport {
        let mut report = TickReport::default();

        self.update_controllers();
        let lasers = self.update_lasers();
        report.keys_typed = self.handle_controller_actions(&lasers);

        report.hud_submitted = self.render_surface(SurfaceKind::Hud);

        // Focusing the HUD input brings the keyboard up in the same tick.
        if self.shared.chat.lock().take_input_focused() && !self.keyboard_visible {
            self.set_keyboard_visible(true);
        }
        if self.keyboard_visible {
            report.keyboard_submitted = Some(self.render_surface(SurfaceKind::Keyboard));
        }

        report.dashboard_events = self.pump_dashboard_events();
        report.dashboard_submitted = self.render_surface(SurfaceKind::Dashboard);

        self.compositor_sync();
        report
    }

    fn update_lasers(&mut self) -> LaserFrame {
        let mut frame = LaserFrame::default();
        for kind in [SurfaceKind::Hud, SurfaceKind::Keyboard] {
            let active = match kind {
                SurfaceKind::Keyboard => self.keyboard_visible,
                _ => true,
            };
            let handle = self.handle(kind).filter(|_| active);
            let mut samples = [LaserSample {
                slot: 0,
                hit: LaserHit::MISS,
                trigger_down: false,
            }; CONTROLLER_SLOTS];
            for (slot, sample) in samples.iter_mut().enumerate() {
                let hit = handle.map_or(LaserHit::MISS, |h| self.test_laser_intersection(slot, h));
                *sample = LaserSample {
                    slot,
                    hit,
                    trigger_down: self.tracker.is_trigger_down(slot),
                };
                match kind {
                    SurfaceKind::Keyboard => frame.keyboard[slot] = hit,
                    _ => frame.hud[slot] = hit,
                }
            }
            let s = &self.surfaces[kind.index()];
            self.bridge.update_laser(kind, s.width_px, s.height_px, &samples);
        }
        frame
    }

    /// Haptics, menu toggling and virtual key presses. Returns keys typed.
    fn handle_controller_actions(&mut self, lasers: &LaserFrame) -> u32 {
        let mut typed = 0;
        // Any number of menu presses in one tick toggle the keyboard once.
        let mut toggle_to = None;
        for slot in 0..CONTROLLER_SLOTS {
            if !self.tracker.is_connected(slot) {
                continue;
            }
            if lasers.hud[slot].hit {
                if self.tracker.trigger_pressed(slot) {
                    self.trigger_haptic(slot, self.config.hud_click_haptic_us);
                }
                if self.tracker.menu_pressed(slot) {
                    toggle_to = Some(!self.keyboard_visible);
                }
            }

            let key_hit = lasers.keyboard[slot];
            if self.keyboard_visible && key_hit.hit && self.tracker.trigger_pressed(slot) {
                let kb = &self.surfaces[SurfaceKind::Keyboard.index()];
                let Some((x, y)) = key_hit.to_pixels(kb.width_px, kb.height_px) else {
                    continue;
                };
                let Some(action) = self.keyboard.hit_test(x, y).and_then(|i| self.keyboard.key(i)).map(|k| k.action)
                else {
                    continue;
                };
                self.trigger_haptic(slot, self.config.key_haptic_us);
                let outcome = apply_key(action, &mut self.shared.chat.lock());
                debug!(slot, ?action, ?outcome, "Virtual key pressed");
                match outcome {
                    KeyOutcome::Typed | KeyOutcome::Deleted => typed += 1,
                    KeyOutcome::Submitted(_) => {
                        typed += 1;
                        self.set_keyboard_visible(false);
                    }
                    KeyOutcome::Ignored => {}
                }
            }
        }
        if let Some(visible) = toggle_to {
            self.set_keyboard_visible(visible);
        }
        typed
    }

    // ---------------------------------------------------------------------
    // Controllers and lasers
    // ---------------------------------------------------------------------

    /// Samples every tracked device and advances edge detection.
    pub fn update_controllers(&mut self) {
        let devices = if self.initialised {
            self.runtime.tracked_devices()
        } else {
            Vec::new()
        };
        self.tracker.update(&devices);
    }

    pub fn controllers(&self) -> &ControllerTracker {
        &self.tracker
    }

    pub fn is_connected(&self, slot: usize) -> bool {
        self.tracker.is_connected(slot)
    }

    pub fn trigger_value(&self, slot: usize) -> f32 {
        self.tracker.trigger_value(slot)
    }

    pub fn trigger_pressed(&self, slot: usize) -> bool {
        self.tracker.trigger_pressed(slot)
    }

    pub fn trigger_released(&self, slot: usize) -> bool {
        self.tracker.trigger_released(slot)
    }

    pub fn menu_pressed(&self, slot: usize) -> bool {
        self.tracker.menu_pressed(slot)
    }

    /// Pulses a connected controller; ignored otherwise.
    pub fn trigger_haptic(&mut self, slot: usize, duration_us: u16) {
        if let Some(device) = self.tracker.device_index(slot) {
            self.runtime.trigger_haptic_pulse(device, duration_us);
        }
    }

    pub fn test_laser_intersection(&self, slot: usize, handle: OverlayHandle) -> LaserHit {
        if !self.initialised {
            return LaserHit::MISS;
        }
        laser::intersect(&self.tracker, &self.runtime, slot, handle)
    }

    // ---------------------------------------------------------------------
    // Pointer injection (dashboard)
    // ---------------------------------------------------------------------

    pub fn inject_pointer_position(&mut self, x: f32, y: f32) {
        self.bridge.inject_position(x, y);
    }

    pub fn inject_pointer_button(&mut self, index: u32, down: bool) {
        self.bridge.inject_button(index, down);
    }

    /// Pointer the next frame of `kind` will see.
    pub fn pointer(&self, kind: SurfaceKind) -> PointerState {
        self.bridge.pointer_for(kind)
    }

    // ---------------------------------------------------------------------
    // Chat and dashboard state
    // ---------------------------------------------------------------------

    pub fn replace_chat_transcript(&self, messages: Vec<ChatMessage>) {
        self.shared.chat.lock().replace_transcript(messages);
    }

    pub fn poll_sent_message(&self) -> Option<String> {
        self.shared.chat.lock().take_sent()
    }

    pub fn update_settings(&self, settings: OverlaySettings) {
        self.shared.dashboard.lock().apply_settings(settings);
    }

    pub fn update_dashboard_state(&self, state: DashboardState) {
        self.shared.dashboard.lock().apply_state(state);
    }

    pub fn poll_dashboard_state_change(&self) -> Option<DashboardState> {
        self.shared.dashboard.lock().take_state_change()
    }

    pub fn poll_settings_change(&self) -> Option<OverlaySettings> {
        self.shared.dashboard.lock().take_settings_change()
    }

    /// Handle for host threads that push chat or settings directly.
    pub fn shared(&self) -> Arc<SharedState> {
        Arc::clone(&self.shared)
    }

    // ---------------------------------------------------------------------
    // Accessors
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn runtime(&self) -> &R {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut R {
        &mut self.runtime
    }

    pub fn backend(&self) -> &dyn GraphicsBackend {
        self.backend.as_ref()
    }

    pub fn write_index(&self, kind: SurfaceKind) -> usize {
        self.pool.write_index(kind)
    }

    pub fn renderer(&self, kind: SurfaceKind) -> &SurfaceRenderer {
        &self.renderers[kind.index()]
    }
}

impl<R: VrRuntime> Drop for OverlaySession<R> {
    fn drop(&mut self) {
        self.shutdown();
    }
}
