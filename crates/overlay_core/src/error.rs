//! Error types for the overlay core.
//!
//! Everything below the session boundary propagates these with `?`; the
//! session converts them into `bool`/`Option` results and logs them.

use crate::surface::{OverlayHandle, SurfaceKind};
use thiserror::Error;

/// Failures reported by a [`crate::runtime::VrRuntime`] implementation.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("VR runtime is not initialised")]
    NotInitialised,
    #[error("VR runtime failed to initialise: {0}")]
    InitFailed(String),
    #[error("overlay key '{0}' is already in use")]
    KeyInUse(String),
    #[error("overlay creation for '{key}' failed: {reason}")]
    CreateFailed { key: String, reason: String },
    #[error("invalid overlay handle {0:?}")]
    InvalidHandle(OverlayHandle),
    #[error("invalid overlay property: {0}")]
    InvalidProperty(String),
    #[error("compositor rejected texture for {0:?}: {1}")]
    TextureRejected(OverlayHandle, String),
}

/// Failures reported by a [`crate::renderer::GraphicsBackend`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BackendError {
    #[error("no suitable GPU adapter found")]
    NoAdapter,
    #[error("device request failed: {0}")]
    DeviceRequest(String),
    #[error("render target allocation of {width}x{height} failed: {reason}")]
    Allocation {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("unknown render target {0}")]
    UnknownTarget(u64),
    #[error("no render target is bound")]
    NothingBound,
}

/// Top-level error for session operations.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OverlayError {
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("surface {0:?} is not initialised")]
    SurfaceUninitialised(SurfaceKind),
    #[error("render target {target} is not the current write slot of {surface:?}")]
    StaleTarget { surface: SurfaceKind, target: u64 },
}
