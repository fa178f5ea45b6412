//! Double-buffered render targets per surface.
//!
//! Each surface alternates between two targets so the compositor can read
//! the last submitted one while the next frame is drawn. The write index
//! advances on every submit of an initialised ring, whether or not the
//! compositor accepted the frame.

use crate::{
    error::{BackendError, OverlayError},
    renderer::{GraphicsBackend, RenderTargetId},
    surface::SurfaceKind,
};
use tracing::{debug, warn};

pub const SLOTS_PER_SURFACE: usize = 2;

#[derive(Debug, Default, Clone)]
struct TargetRing {
    targets: Option<[RenderTargetId; SLOTS_PER_SURFACE]>,
    write_index: usize,
    width: u32,
    height: u32,
}

#[derive(Debug, Default)]
pub struct FramePool {
    rings: [TargetRing; 3],
}

impl FramePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates both targets for `kind`. On failure nothing is kept and the
    /// ring stays uninitialised.
    pub fn create(
        &mut self,
        kind: SurfaceKind,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), BackendError> {
        self.release(kind, backend);

        let first = backend.allocate_render_target(width, height, &format!("{} target 0", kind.label()))?;
        let second = match backend.allocate_render_target(width, height, &format!("{} target 1", kind.label())) {
            Ok(id) => id,
            Err(e) => {
                backend.release_render_target(first);
                return Err(e);
            }
        };

        self.rings[kind.index()] = TargetRing {
            targets: Some([first, second]),
            write_index: 0,
            width,
            height,
        };
        debug!(surface = kind.label(), width, height, "Frame pool created");
        Ok(())
    }

    /// Reallocates both targets when the size changes.
    pub fn resize(
        &mut self,
        kind: SurfaceKind,
        backend: &mut dyn GraphicsBackend,
        width: u32,
        height: u32,
    ) -> Result<(), BackendError> {
        if self.size(kind) == Some((width, height)) {
            return Ok(());
        }
        self.create(kind, backend, width, height)
    }

    pub fn release(&mut self, kind: SurfaceKind, backend: &mut dyn GraphicsBackend) {
        let ring = std::mem::take(&mut self.rings[kind.index()]);
        if let Some(targets) = ring.targets {
            for t in targets {
                backend.release_render_target(t);
            }
        }
    }

    pub fn is_initialised(&self, kind: SurfaceKind) -> bool {
        self.rings[kind.index()].targets.is_some()
    }

    pub fn size(&self, kind: SurfaceKind) -> Option<(u32, u32)> {
        let ring = &self.rings[kind.index()];
        ring.targets.map(|_| (ring.width, ring.height))
    }

    pub fn write_index(&self, kind: SurfaceKind) -> usize {
        self.rings[kind.index()].write_index
    }

    /// The target the next frame of `kind` must draw into.
    pub fn acquire_write_target(&self, kind: SurfaceKind) -> Option<RenderTargetId> {
        let ring = &self.rings[kind.index()];
        ring.targets.map(|t| t[ring.write_index])
    }

    /// Hands `target` to `present` and advances the write index.
    ///
    /// Returns whether presentation succeeded. Uninitialised rings are left
    /// untouched and return `false`.
    pub fn submit<F>(&mut self, kind: SurfaceKind, target: RenderTargetId, present: F) -> bool
    where
        F: FnOnce(RenderTargetId) -> Result<(), OverlayError>,
    {
        let ring = &mut self.rings[kind.index()];
        let Some(targets) = ring.targets else {
            return false;
        };

        let result = if targets[ring.write_index] == target {
            present(target)
        } else {
            Err(OverlayError::StaleTarget {
                surface: kind,
                target: target.0,
            })
        };
        ring.write_index = (ring.write_index + 1) % SLOTS_PER_SURFACE;

        match result {
            Ok(()) => true,
            Err(e) => {
                warn!(surface = kind.label(), error = %e, "Frame submission failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::RuntimeError, renderer::HeadlessBackend, surface::OverlayHandle};

    fn pool_with_hud() -> (FramePool, HeadlessBackend) {
        let mut backend = HeadlessBackend::new();
        let mut pool = FramePool::new();
        pool.create(SurfaceKind::Hud, &mut backend, 64, 32).unwrap();
        (pool, backend)
    }

    #[test]
    fn write_index_alternates_even_when_presentation_fails() {
        let (mut pool, _backend) = pool_with_hud();
        let mut seen = Vec::new();
        for i in 0..4 {
            seen.push(pool.write_index(SurfaceKind::Hud));
            let target = pool.acquire_write_target(SurfaceKind::Hud).unwrap();
            let ok = pool.submit(SurfaceKind::Hud, target, |_| {
                if i % 2 == 0 {
                    Ok(())
                } else {
                    Err(RuntimeError::TextureRejected(OverlayHandle(1), "busy".into()).into())
                }
            });
            assert_eq!(ok, i % 2 == 0);
        }
        assert_eq!(seen, vec![0, 1, 0, 1]);
    }

    #[test]
    fn consecutive_targets_differ() {
        let (mut pool, _backend) = pool_with_hud();
        let a = pool.acquire_write_target(SurfaceKind::Hud).unwrap();
        pool.submit(SurfaceKind::Hud, a, |_| Ok(()));
        let b = pool.acquire_write_target(SurfaceKind::Hud).unwrap();
        assert_ne!(a, b);
        pool.submit(SurfaceKind::Hud, b, |_| Ok(()));
        assert_eq!(pool.acquire_write_target(SurfaceKind::Hud), Some(a));
    }

    #[test]
    fn uninitialised_ring_is_a_no_op() {
        let mut pool = FramePool::new();
        assert_eq!(pool.acquire_write_target(SurfaceKind::Keyboard), None);
        let mut called = false;
        assert!(!pool.submit(SurfaceKind::Keyboard, RenderTargetId(1), |_| {
            called = true;
            Ok(())
        }));
        assert!(!called);
        assert_eq!(pool.write_index(SurfaceKind::Keyboard), 0);
    }

    #[test]
    fn stale_target_is_not_presented_but_still_advances() {
        let (mut pool, _backend) = pool_with_hud();
        let mut called = false;
        let ok = pool.submit(SurfaceKind::Hud, RenderTargetId(999), |_| {
            called = true;
            Ok(())
        });
        assert!(!ok);
        assert!(!called);
        assert_eq!(pool.write_index(SurfaceKind::Hud), 1);
    }

    #[test]
    fn failed_second_allocation_leaves_nothing_behind() {
        let mut backend = HeadlessBackend::new().with_allocation_budget(1);
        let mut pool = FramePool::new();
        assert!(pool.create(SurfaceKind::Hud, &mut backend, 8, 8).is_err());
        assert!(!pool.is_initialised(SurfaceKind::Hud));
        assert_eq!(backend.live_targets(), 0);
    }

    #[test]
    fn resize_reallocates_and_resets() {
        let (mut pool, mut backend) = pool_with_hud();
        let before = pool.acquire_write_target(SurfaceKind::Hud).unwrap();
        pool.submit(SurfaceKind::Hud, before, |_| Ok(()));
        pool.resize(SurfaceKind::Hud, &mut backend, 128, 64).unwrap();
        assert_eq!(pool.size(SurfaceKind::Hud), Some((128, 64)));
        assert_eq!(pool.write_index(SurfaceKind::Hud), 0);
        assert_eq!(backend.live_targets(), 2);
        assert_ne!(pool.acquire_write_target(SurfaceKind::Hud), Some(before));
    }
}
