use crate::error::BackendError;

/// Holds the GPU device used for off-screen overlay rendering.
pub struct GfxContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_info: wgpu::AdapterInfo,
}

impl GfxContext {
    /// Creates a headless device on one of `backends`.
    pub async fn new(backends: wgpu::Backends) -> Result<Self, BackendError> {
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        // No surface: overlays render to textures the compositor samples.
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference:       wgpu::PowerPreference::HighPerformance,
                compatible_surface:     None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(BackendError::NoAdapter)?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label:             Some("Overlay Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits:   wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
                },
                None, // no trace
            )
            .await
            .map_err(|e| BackendError::DeviceRequest(e.to_string()))?;

        Ok(Self {
            device,
            queue,
            adapter_info: adapter.get_info(),
        })
    }
}
