use clap::{Parser, ValueEnum};
use overlay_core::BackendKind;

/// `overlay_host` - runs the chat HUD, settings dashboard and virtual
/// keyboard overlays against the in-process VR runtime.
///
/// Chat lines are read from stdin as `author: text`. Messages typed on the
/// virtual keyboard and dashboard changes are logged as they come back.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Graphics backend used to draw the overlay textures.
    #[arg(long, value_enum, default_value_t = Backend::Wgpu, env = "OVERLAY_BACKEND")]
    pub backend: Backend,

    /// Number of frames to run. 0 runs until stdin closes.
    #[arg(long, default_value_t = 900, env = "OVERLAY_FRAMES")]
    pub frames: u64,

    /// Compositor frame period in microseconds.
    #[arg(long, default_value_t = 11_111)]
    pub frame_period_us: u64,

    /// Don't pace frames; run as fast as rendering allows.
    #[arg(long)]
    pub no_pacing: bool,

    /// Distance of the chat HUD in front of the headset, in meters.
    #[arg(long, default_value_t = 1.5)]
    pub hud_distance: f32,

    /// Drive a scripted controller, hip tracker and dashboard clicks.
    #[arg(long)]
    pub demo: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "OVERLAY_LOG_JSON")]
    pub log_json: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Backend {
    /// Native GPU through wgpu.
    Wgpu,
    /// wgpu restricted to its OpenGL backend.
    WgpuGl,
    /// CPU rasteriser.
    Software,
    /// Allocates and presents but draws nothing.
    Headless,
}

impl From<Backend> for BackendKind {
    fn from(b: Backend) -> Self {
        match b {
            Backend::Wgpu => BackendKind::Wgpu,
            Backend::WgpuGl => BackendKind::WgpuGl,
            Backend::Software => BackendKind::Software,
            Backend::Headless => BackendKind::Headless,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let config = Config::try_parse_from(["overlay_host"]).unwrap();
        assert_eq!(config.backend, Backend::Wgpu);
        assert_eq!(config.frames, 900);
        assert!(!config.demo);
    }

    #[test]
    fn backend_names_are_kebab_case() {
        let config = Config::try_parse_from(["overlay_host", "--backend", "wgpu-gl", "--demo"]).unwrap();
        assert_eq!(BackendKind::from(config.backend), BackendKind::WgpuGl);
        assert!(config.demo);
    }
}
