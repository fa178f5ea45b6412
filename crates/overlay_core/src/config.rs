//! Session configuration: surface geometry and interaction constants.

use crate::surface::SurfaceKind;
use std::time::Duration;

/// Geometry and identity of one overlay surface.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfaceConfig {
    /// Compositor key; must be unique per process.
    pub key: String,
    /// Human-readable name shown by the compositor.
    pub name: String,
    pub width_px: u32,
    pub height_px: u32,
    pub width_m: f32,
    /// Clear colour, linear RGBA.
    pub background: [f32; 4],
}

/// Everything a session needs to know up front.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub hud: SurfaceConfig,
    pub dashboard: SurfaceConfig,
    pub keyboard: SurfaceConfig,
    /// Distance of the HUD in front of the HMD at creation (meters).
    pub hud_distance_m: f32,
    /// Trigger axis value above which the trigger counts as held.
    pub trigger_threshold: f32,
    /// Haptic pulse when the trigger fires on the HUD.
    pub hud_click_haptic_us: u16,
    /// Haptic pulse when a virtual key is typed.
    pub key_haptic_us: u16,
    /// Target compositor frame period (90 Hz).
    pub frame_period: Duration,
}

impl SessionConfig {
    pub fn surface(&self, kind: SurfaceKind) -> &SurfaceConfig {
        match kind {
            SurfaceKind::Hud => &self.hud,
            SurfaceKind::Dashboard => &self.dashboard,
            SurfaceKind::Keyboard => &self.keyboard,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hud: SurfaceConfig {
                key: "overlay.hud".into(),
                name: "Chat HUD".into(),
                width_px: 1024,
                height_px: 768,
                width_m: 1.0,
                background: [0.05, 0.05, 0.05, 0.95],
            },
            dashboard: SurfaceConfig {
                key: "overlay.dashboard".into(),
                name: "Overlay Settings".into(),
                width_px: 1280,
                height_px: 960,
                width_m: 2.5,
                background: [0.1, 0.1, 0.1, 1.0],
            },
            keyboard: SurfaceConfig {
                key: "overlay.keyboard".into(),
                name: "Virtual Keyboard".into(),
                width_px: 512,
                height_px: 384,
                width_m: 0.5,
                background: [0.1, 0.1, 0.1, 0.95],
            },
            hud_distance_m: 1.5,
            trigger_threshold: 0.5,
            hud_click_haptic_us: 1000,
            key_haptic_us: 2000,
            frame_period: Duration::from_micros(11_111),
        }
    }
}
