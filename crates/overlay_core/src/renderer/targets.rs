//! GPU render targets handed to the compositor.

use crate::error::BackendError;

/// Format of every overlay target; the compositor expects 8-bit sRGB RGBA.
pub const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8UnormSrgb;

pub struct RenderTarget {
    // The compositor samples the texture itself, so keep it public.
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub width: u32,
    pub height: u32,
}

impl RenderTarget {
    pub fn new(device: &wgpu::Device, width: u32, height: u32, label: &str) -> Result<Self, BackendError> {
        let max = device.limits().max_texture_dimension_2d;
        if width == 0 || height == 0 || width > max || height > max {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: format!("dimensions must be within 1..={max}"),
            });
        }

        // Out-of-memory surfaces as a scoped error instead of a device panic.
        device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some(label),
            size: wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: TARGET_FORMAT,
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT
                | wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(BackendError::Allocation {
                width,
                height,
                reason: err.to_string(),
            });
        }

        Ok(Self {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            texture,
            width,
            height,
        })
    }
}
