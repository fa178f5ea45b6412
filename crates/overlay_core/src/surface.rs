//! Logical overlay surfaces and their lifecycle.

use crate::config::SurfaceConfig;

/// The three panels the core knows how to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceKind {
    Hud,
    Dashboard,
    Keyboard,
}

impl SurfaceKind {
    pub const ALL: [SurfaceKind; 3] = [SurfaceKind::Hud, SurfaceKind::Dashboard, SurfaceKind::Keyboard];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            SurfaceKind::Hud => 0,
            SurfaceKind::Dashboard => 1,
            SurfaceKind::Keyboard => 2,
        }
    }

    /// Dashboard overlays are docked by the compositor and receive their own
    /// mouse event stream instead of controller rays.
    #[inline]
    pub fn is_dashboard(self) -> bool {
        self == SurfaceKind::Dashboard
    }

    /// World-locked surfaces are driven by laser pointers and draw laser decals.
    #[inline]
    pub fn is_world_locked(self) -> bool {
        !self.is_dashboard()
    }

    pub fn label(self) -> &'static str {
        match self {
            SurfaceKind::Hud => "HUD",
            SurfaceKind::Dashboard => "Dashboard",
            SurfaceKind::Keyboard => "Keyboard",
        }
    }
}

/// Opaque compositor handle. Zero is never a valid overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OverlayHandle(pub u64);

impl OverlayHandle {
    pub const INVALID: OverlayHandle = OverlayHandle(0);

    #[inline]
    pub fn is_valid(self) -> bool {
        self != Self::INVALID
    }
}

/// `Uninitialized → Created → Visible ⇄ Hidden → Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceState {
    Uninitialized,
    Created,
    Visible,
    Hidden,
    Destroyed,
}

impl SurfaceState {
    /// True while the surface owns a live compositor handle.
    #[inline]
    pub fn is_live(self) -> bool {
        matches!(self, SurfaceState::Created | SurfaceState::Visible | SurfaceState::Hidden)
    }
}

/// One logical overlay: handle, geometry and lifecycle state.
#[derive(Debug, Clone)]
pub struct OverlaySurface {
    pub kind: SurfaceKind,
    pub handle: OverlayHandle,
    pub state: SurfaceState,
    pub width_px: u32,
    pub height_px: u32,
    /// Physical width in meters; height follows the texture aspect.
    pub width_m: f32,
}

impl OverlaySurface {
    pub fn new(kind: SurfaceKind, config: &SurfaceConfig) -> Self {
        Self {
            kind,
            handle: OverlayHandle::INVALID,
            state: SurfaceState::Uninitialized,
            width_px: config.width_px,
            height_px: config.height_px,
            width_m: config.width_m,
        }
    }

    #[inline]
    pub fn is_live(&self) -> bool {
        self.state.is_live() && self.handle.is_valid()
    }

    /// Moves to `Visible`; only legal from `Created` or `Hidden`.
    pub fn mark_visible(&mut self) -> bool {
        match self.state {
            SurfaceState::Created | SurfaceState::Hidden | SurfaceState::Visible => {
                self.state = SurfaceState::Visible;
                true
            }
            _ => false,
        }
    }

    /// Moves to `Hidden`; only legal from `Created` or `Visible`.
    pub fn mark_hidden(&mut self) -> bool {
        match self.state {
            SurfaceState::Created | SurfaceState::Visible | SurfaceState::Hidden => {
                self.state = SurfaceState::Hidden;
                true
            }
            _ => false,
        }
    }

    /// Returns the handle that must be released, if any. Uninitialised and
    /// already-destroyed surfaces yield `None`.
    pub fn mark_destroyed(&mut self) -> Option<OverlayHandle> {
        if !self.is_live() {
            return None;
        }
        let handle = self.handle;
        self.handle = OverlayHandle::INVALID;
        self.state = SurfaceState::Destroyed;
        Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SessionConfig;

    fn hud() -> OverlaySurface {
        OverlaySurface::new(SurfaceKind::Hud, &SessionConfig::default().hud)
    }

    #[test]
    fn lifecycle_transitions() {
        let mut s = hud();
        assert!(!s.mark_visible(), "uninitialised surface cannot be shown");
        assert_eq!(s.mark_destroyed(), None);

        s.handle = OverlayHandle(7);
        s.state = SurfaceState::Created;
        assert!(s.mark_visible());
        assert!(s.mark_hidden());
        assert!(s.mark_visible());
        assert_eq!(s.mark_destroyed(), Some(OverlayHandle(7)));
        assert_eq!(s.state, SurfaceState::Destroyed);
        assert_eq!(s.mark_destroyed(), None, "double destroy is a no-op");
        assert!(!s.mark_hidden());
    }

    #[test]
    fn invalid_handle_sentinel() {
        assert!(!OverlayHandle::INVALID.is_valid());
        assert!(OverlayHandle(1).is_valid());
        assert!(!SurfaceKind::Dashboard.is_world_locked());
        assert!(SurfaceKind::Keyboard.is_world_locked());
    }
}
