// src/lib.rs
//! In-headset overlay panels: a chat HUD, a settings dashboard and a virtual
//! keyboard, drawn with egui into double-buffered render targets and handed
//! to a VR compositor every frame.
//!
//! The host owns an [`OverlaySession`] and calls [`OverlaySession::tick`]
//! once per compositor frame. Chat, settings and dashboard navigation flow
//! in through setters and back out through single-slot mailboxes.

pub mod chat;
pub mod config;
pub mod controller;
pub mod error;
pub mod frame_pool;
pub mod keyboard;
pub mod laser;
pub mod mailbox;
pub mod placement;
pub mod pointer;
pub mod renderer;
pub mod runtime;
pub mod session;
pub mod settings;
pub mod shared;
pub mod surface;
pub mod ui;

pub use chat::ChatMessage;
pub use config::{SessionConfig, SurfaceConfig};
pub use error::{BackendError, OverlayError, RuntimeError};
pub use laser::LaserHit;
pub use renderer::{create_backend, BackendKind, GraphicsBackend};
pub use runtime::{sim::SimulatedRuntime, VrRuntime};
pub use session::{OverlaySession, TickReport};
pub use settings::{DashboardState, OverlaySettings};
pub use surface::{OverlayHandle, SurfaceKind};
