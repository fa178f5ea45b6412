//! Graphics backends and the per-surface UI pass.
//!
//! A [`GraphicsBackend`] owns render targets and knows how to paint tessellated
//! egui output into them and hand them to the compositor. The
//! [`SurfaceRenderer`] drives one surface's UI frame on top of it.

pub mod context;
pub mod headless;
pub mod software;
pub mod surface;
pub mod targets;
pub mod wgpu_backend;

pub use self::{
    headless::HeadlessBackend,
    software::SoftwareBackend,
    surface::{SurfaceContent, SurfaceRenderer},
    wgpu_backend::WgpuBackend,
};

use crate::{
    error::{BackendError, OverlayError},
    runtime::VrRuntime,
    surface::{OverlayHandle, SurfaceKind},
};

/// Backend-assigned identifier of one render target. Never reused within a
/// backend's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RenderTargetId(pub u64);

/// What the compositor receives for one frame.
#[derive(Debug, Clone, Copy)]
pub struct OverlayTexture<'a> {
    pub target: RenderTargetId,
    pub width: u32,
    pub height: u32,
    pub content: TextureContent<'a>,
}

#[derive(Debug, Clone, Copy)]
pub enum TextureContent<'a> {
    /// A GPU texture the compositor samples directly.
    Gpu(&'a wgpu::Texture),
    /// Tightly packed premultiplied RGBA8 rows, top row first.
    Pixels(&'a [u8]),
    /// Nothing was rasterised.
    Empty,
}

/// One tessellated egui frame for the bound render target.
pub struct UiFrame<'a> {
    /// Texture ids are namespaced per surface; each surface has its own
    /// egui context.
    pub surface: SurfaceKind,
    pub primitives: &'a [egui::ClippedPrimitive],
    pub textures_delta: &'a egui::TexturesDelta,
    pub pixels_per_point: f32,
    pub size_px: [u32; 2],
}

pub trait GraphicsBackend {
    fn name(&self) -> &'static str;

    fn allocate_render_target(&mut self, width: u32, height: u32, label: &str) -> Result<RenderTargetId, BackendError>;
    /// Unknown ids are ignored.
    fn release_render_target(&mut self, target: RenderTargetId);

    fn bind_render_target(&mut self, target: RenderTargetId) -> Result<(), BackendError>;
    /// Clears the bound target, colour in linear RGBA.
    fn clear(&mut self, color: [f32; 4]) -> Result<(), BackendError>;
    /// Paints into the bound target over whatever is there.
    fn paint(&mut self, frame: &UiFrame<'_>) -> Result<(), BackendError>;

    /// Finishes pending work on `target` and submits it to the overlay.
    fn present_to_overlay(
        &mut self,
        target: RenderTargetId,
        handle: OverlayHandle,
        runtime: &mut dyn VrRuntime,
    ) -> Result<(), OverlayError>;

    /// CPU readback of one pixel, premultiplied RGBA8. Backends without a
    /// CPU copy return `None`.
    fn read_pixel(&self, _target: RenderTargetId, _x: u32, _y: u32) -> Option<[u8; 4]> {
        None
    }
}

/// Selects a backend implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// wgpu on the platform's primary API (Vulkan, Metal, DX12).
    Wgpu,
    /// wgpu forced onto OpenGL.
    WgpuGl,
    /// CPU rasteriser.
    Software,
    /// Records calls, draws nothing.
    Headless,
}

pub fn create_backend(kind: BackendKind) -> Result<Box<dyn GraphicsBackend>, BackendError> {
    Ok(match kind {
        BackendKind::Wgpu => Box::new(WgpuBackend::new(wgpu::Backends::PRIMARY)?),
        BackendKind::WgpuGl => Box::new(WgpuBackend::new(wgpu::Backends::GL)?),
        BackendKind::Software => Box::new(SoftwareBackend::new()),
        BackendKind::Headless => Box::new(HeadlessBackend::new()),
    })
}
