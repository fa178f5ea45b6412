//! Routes pointer input to each surface.
//!
//! The dashboard is driven by the host-injected pointer (the compositor's
//! mouse stream). The HUD and keyboard are driven by controller lasers.

use crate::{controller::CONTROLLER_SLOTS, laser::LaserHit, surface::SurfaceKind};

/// Pointer as a surface's UI sees it, in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerState {
    pub x: f32,
    pub y: f32,
    pub button_down: bool,
}

impl PointerState {
    /// Parked outside every surface.
    pub const OFF_SURFACE: PointerState = PointerState {
        x: -1.0,
        y: -1.0,
        button_down: false,
    };

    pub fn is_within(&self, width: f32, height: f32) -> bool {
        self.x >= 0.0 && self.y >= 0.0 && self.x <= width && self.y <= height
    }
}

impl Default for PointerState {
    fn default() -> Self {
        Self::OFF_SURFACE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerSource {
    Injected,
    Laser,
}

impl PointerSource {
    pub fn for_surface(kind: SurfaceKind) -> Self {
        if kind.is_dashboard() {
            PointerSource::Injected
        } else {
            PointerSource::Laser
        }
    }
}

/// One controller's laser result for a surface this tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserSample {
    pub slot: usize,
    pub hit: LaserHit,
    pub trigger_down: bool,
}

/// Where a laser touches a surface, for drawing its decal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserDecal {
    pub slot: usize,
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Default)]
pub struct PointerBridge {
    injected: PointerState,
    laser: [PointerState; 3],
    decals: [[Option<LaserDecal>; CONTROLLER_SLOTS]; 3],
}

impl PointerBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Non-finite coordinates are ignored.
    pub fn inject_position(&mut self, x: f32, y: f32) {
        if x.is_finite() && y.is_finite() {
            self.injected.x = x;
            self.injected.y = y;
        }
    }

    /// Only the primary button (index 0) is tracked.
    pub fn inject_button(&mut self, index: u32, down: bool) {
        if index == 0 {
            self.injected.button_down = down;
        }
    }

    pub fn injected(&self) -> PointerState {
        self.injected
    }

    /// Folds this tick's laser samples for `kind` into a pointer.
    ///
    /// The highest hitting slot positions the pointer; the button is down
    /// while any hitting controller holds its trigger. With no hit the
    /// pointer leaves the surface.
    pub fn update_laser(&mut self, kind: SurfaceKind, width: u32, height: u32, samples: &[LaserSample]) {
        let idx = kind.index();
        self.decals[idx] = [None; CONTROLLER_SLOTS];

        let mut pointer = PointerState::OFF_SURFACE;
        let mut any_hit = false;
        for sample in samples.iter().filter(|s| s.slot < CONTROLLER_SLOTS) {
            let Some((x, y)) = sample.hit.to_pixels(width, height) else {
                continue;
            };
            self.decals[idx][sample.slot] = Some(LaserDecal {
                slot: sample.slot,
                x,
                y,
            });
            any_hit = true;
            pointer.button_down |= sample.trigger_down;
        }
        if any_hit {
            if let Some(d) = self.decals[idx].iter().rev().flatten().next() {
                pointer.x = d.x;
                pointer.y = d.y;
            }
        }
        self.laser[idx] = pointer;
    }

    pub fn resolve(&self, kind: SurfaceKind, source: PointerSource) -> PointerState {
        match source {
            PointerSource::Injected => self.injected,
            PointerSource::Laser => self.laser[kind.index()],
        }
    }

    /// Pointer for `kind` from its routed source.
    pub fn pointer_for(&self, kind: SurfaceKind) -> PointerState {
        self.resolve(kind, PointerSource::for_surface(kind))
    }

    pub fn decals(&self, kind: SurfaceKind) -> Vec<LaserDecal> {
        self.decals[kind.index()].iter().flatten().copied().collect()
    }
}
