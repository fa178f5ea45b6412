//! GPU backend: egui-wgpu painting into off-screen textures.

use super::{
    context::GfxContext,
    targets::{RenderTarget, TARGET_FORMAT},
    GraphicsBackend, OverlayTexture, RenderTargetId, TextureContent, UiFrame,
};
use crate::{
    error::{BackendError, OverlayError},
    runtime::VrRuntime,
    surface::{OverlayHandle, SurfaceKind},
};
use std::collections::HashMap;
use tracing::{debug, info};

pub struct WgpuBackend {
    gfx: GfxContext,
    targets: HashMap<RenderTargetId, RenderTarget>,
    /// One painter per surface: egui texture ids are per context.
    painters: HashMap<SurfaceKind, egui_wgpu::Renderer>,
    bound: Option<RenderTargetId>,
    /// Clear requested for the bound target, folded into the next pass.
    pending_clear: Option<wgpu::Color>,
    next_id: u64,
}

impl WgpuBackend {
    pub fn new(backends: wgpu::Backends) -> Result<Self, BackendError> {
        let gfx = pollster::block_on(GfxContext::new(backends))?;
        info!(
            adapter = %gfx.adapter_info.name,
            api = ?gfx.adapter_info.backend,
            "GPU backend ready"
        );
        Ok(Self {
            gfx,
            targets: HashMap::new(),
            painters: HashMap::new(),
            bound: None,
            pending_clear: None,
            next_id: 1,
        })
    }

    pub fn adapter_info(&self) -> &wgpu::AdapterInfo {
        &self.gfx.adapter_info
    }

    fn bound_target(&self) -> Result<(RenderTargetId, &RenderTarget), BackendError> {
        let id = self.bound.ok_or(BackendError::NothingBound)?;
        let target = self.targets.get(&id).ok_or(BackendError::UnknownTarget(id.0))?;
        Ok((id, target))
    }

    /// Runs a pass that only applies the pending clear.
    fn flush_clear(&mut self, id: RenderTargetId) {
        let Some(color) = self.pending_clear.take() else {
            return;
        };
        let Some(target) = self.targets.get(&id) else {
            return;
        };
        let mut encoder = self
            .gfx
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Overlay Clear Encoder"),
            });
        {
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay Clear Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(color),
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.gfx.queue.submit(std::iter::once(encoder.finish()));
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &'static str {
        "wgpu"
    }

    fn allocate_render_target(&mut self, width: u32, height: u32, label: &str) -> Result<RenderTargetId, BackendError> {
        let target = RenderTarget::new(&self.gfx.device, width, height, label)?;
        let id = RenderTargetId(self.next_id);
        self.next_id += 1;
        self.targets.insert(id, target);
        debug!(id = id.0, width, height, label, "Render target allocated");
        Ok(id)
    }

    fn release_render_target(&mut self, target: RenderTargetId) {
        if let Some(t) = self.targets.remove(&target) {
            t.texture.destroy();
        }
        if self.bound == Some(target) {
            self.bound = None;
            self.pending_clear = None;
        }
    }

    fn bind_render_target(&mut self, target: RenderTargetId) -> Result<(), BackendError> {
        if !self.targets.contains_key(&target) {
            return Err(BackendError::UnknownTarget(target.0));
        }
        if self.bound != Some(target) {
            self.pending_clear = None;
        }
        self.bound = Some(target);
        Ok(())
    }

    fn clear(&mut self, color: [f32; 4]) -> Result<(), BackendError> {
        self.bound_target()?;
        self.pending_clear = Some(wgpu::Color {
            r: color[0] as f64,
            g: color[1] as f64,
            b: color[2] as f64,
            a: color[3] as f64,
        });
        Ok(())
    }

    fn paint(&mut self, frame: &UiFrame<'_>) -> Result<(), BackendError> {
        let id = self.bound.ok_or(BackendError::NothingBound)?;
        let target = self.targets.get(&id).ok_or(BackendError::UnknownTarget(id.0))?;
        let device = &self.gfx.device;
        let queue = &self.gfx.queue;

        let painter = self
            .painters
            .entry(frame.surface)
            .or_insert_with(|| egui_wgpu::Renderer::new(device, TARGET_FORMAT, None, 1));

        let screen_descriptor = egui_wgpu::ScreenDescriptor {
            size_in_pixels: frame.size_px,
            pixels_per_point: frame.pixels_per_point,
        };

        for (id, delta) in &frame.textures_delta.set {
            painter.update_texture(device, queue, *id, delta);
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("Overlay UI Encoder"),
        });
        let user_buffers = painter.update_buffers(device, queue, &mut encoder, frame.primitives, &screen_descriptor);

        let load = match self.pending_clear.take() {
            Some(color) => wgpu::LoadOp::Clear(color),
            None => wgpu::LoadOp::Load,
        };
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Overlay UI Pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &target.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            painter.render(&mut render_pass, frame.primitives, &screen_descriptor);
        }

        for id in &frame.textures_delta.free {
            painter.free_texture(id);
        }

        queue.submit(user_buffers.into_iter().chain(std::iter::once(encoder.finish())));
        Ok(())
    }

    fn present_to_overlay(
        &mut self,
        target: RenderTargetId,
        handle: OverlayHandle,
        runtime: &mut dyn VrRuntime,
    ) -> Result<(), OverlayError> {
        if self.bound == Some(target) {
            self.flush_clear(target);
        }
        let t = self
            .targets
            .get(&target)
            .ok_or(BackendError::UnknownTarget(target.0))?;
        runtime.set_overlay_texture(
            handle,
            &OverlayTexture {
                target,
                width: t.width,
                height: t.height,
                content: TextureContent::Gpu(&t.texture),
            },
        )?;
        Ok(())
    }
}
