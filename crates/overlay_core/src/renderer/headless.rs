//! Backend that draws nothing and counts what it was asked to do.

use super::{GraphicsBackend, OverlayTexture, RenderTargetId, TextureContent, UiFrame};
use crate::{
    error::{BackendError, OverlayError},
    runtime::VrRuntime,
    surface::OverlayHandle,
};
use std::collections::HashMap;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HeadlessStats {
    pub allocations: u64,
    pub releases: u64,
    pub clears: u64,
    pub paints: u64,
    pub primitives: u64,
    pub presents: u64,
}

#[derive(Debug, Default)]
pub struct HeadlessBackend {
    targets: HashMap<RenderTargetId, (u32, u32)>,
    bound: Option<RenderTargetId>,
    next_id: u64,
    /// Allocations left before they start failing; `None` means unlimited.
    allocation_budget: Option<u32>,
    stats: HeadlessStats,
}

impl HeadlessBackend {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Lets `n` more allocations succeed, then fails the rest.
    pub fn with_allocation_budget(mut self, n: u32) -> Self {
        self.allocation_budget = Some(n);
        self
    }

    pub fn stats(&self) -> HeadlessStats {
        self.stats
    }

    pub fn live_targets(&self) -> usize {
        self.targets.len()
    }
}

impl GraphicsBackend for HeadlessBackend {
    fn name(&self) -> &'static str {
        "headless"
    }

    fn allocate_render_target(&mut self, width: u32, height: u32, _label: &str) -> Result<RenderTargetId, BackendError> {
        if width == 0 || height == 0 {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: "zero-sized target".into(),
            });
        }
        if let Some(budget) = self.allocation_budget.as_mut() {
            if *budget == 0 {
                return Err(BackendError::Allocation {
                    width,
                    height,
                    reason: "out of memory".into(),
                });
            }
            *budget -= 1;
        }
        let id = RenderTargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, (width, height));
        self.stats.allocations += 1;
        Ok(id)
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        if self.targets.remove(&target).is_some() {
            self.stats.releases += 1;
        }
        if self.bound == Some(target) {
            self.bound = None;
        }
    }

    fn bind_render_target(&mut self, target: RenderTargetId) -> Result<(), BackendError> {
        if !self.targets.contains_key(&target) {
            return Err(BackendError::UnknownTarget(target.0));
        }
        self.bound = Some(target);
        Ok(())
    }

    fn clear(&mut self, _color: [f32; 4]) -> Result<(), BackendError> {
        self.bound.ok_or(BackendError::NothingBound)?;
        self.stats.clears += 1;
        Ok(())
    }

    fn paint(&mut self, frame: &UiFrame<'_>) -> Result<(), BackendError> {
        self.bound.ok_or(BackendError::NothingBound)?;
        self.stats.paints += 1;
        self.stats.primitives += frame.primitives.len() as u64;
        Ok(())
    }

    fn present_to_overlay(
        &mut self,
        target: RenderTargetId,
        handle: OverlayHandle,
        runtime: &mut dyn VrRuntime,
    ) -> Result<(), OverlayError> {
        let (width, height) = *self
            .targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        self.stats.presents += 1;
        runtime.set_overlay_texture(
            handle,
            &OverlayTexture {
                target,
                width,
                height,
                content: TextureContent::Empty,
            },
        )?;
        Ok(())
    }
}
