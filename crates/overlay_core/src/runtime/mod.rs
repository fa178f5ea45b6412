//! Seam to the VR runtime: overlay management, tracked devices, laser
//! intersection, haptics and frame pacing.
//!
//! The core never talks to a compositor directly; everything goes through
//! [`VrRuntime`]. [`sim::SimulatedRuntime`] implements it in-process.

pub mod sim;

use crate::{error::RuntimeError, renderer::OverlayTexture, surface::OverlayHandle};
use glam::{Affine3A, Mat3A, Vec2, Vec3, Vec3A};

/// Tracked device index of the headset.
pub const HMD_DEVICE_INDEX: u32 = 0;
/// Sentinel for "no device".
pub const INVALID_DEVICE_INDEX: u32 = u32::MAX;
/// Application-menu button bit in [`DeviceSample::buttons`].
pub const BUTTON_APPLICATION_MENU: u64 = 1 << 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceClass {
    Hmd,
    Controller,
    GenericTracker,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerRole {
    Invalid,
    LeftHand,
    RightHand,
}

/// One tracked device as reported by the runtime for the current frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceSample {
    pub index: u32,
    pub class: DeviceClass,
    pub role: ControllerRole,
    pub connected: bool,
    pub pose_valid: bool,
    /// Device-to-tracking-space transform, translation in meters.
    pub pose: Affine3A,
    /// Analog trigger in [0, 1].
    pub trigger: f32,
    pub buttons: u64,
}

impl DeviceSample {
    pub fn controller(index: u32, role: ControllerRole, pose: Affine3A) -> Self {
        Self {
            index,
            class: DeviceClass::Controller,
            role,
            connected: true,
            pose_valid: true,
            pose,
            trigger: 0.0,
            buttons: 0,
        }
    }

    pub fn tracker(index: u32, class: DeviceClass, pose: Affine3A) -> Self {
        Self {
            index,
            class,
            role: ControllerRole::Invalid,
            connected: true,
            pose_valid: true,
            pose,
            trigger: 0.0,
            buttons: 0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Right,
}

/// Events delivered on an overlay's own queue. Coordinates are in the
/// overlay's pixel space, origin top-left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayEvent {
    MouseMove { x: f32, y: f32 },
    MouseButtonDown { button: MouseButton },
    MouseButtonUp { button: MouseButton },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMethod {
    None,
    Mouse,
}

/// Where an overlay sits in the world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OverlayPlacement {
    Absolute(Affine3A),
    DeviceRelative { device: u32, transform: Affine3A },
}

/// Result of the runtime's planar intersection primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intersection {
    /// Texture-space UV, origin top-left.
    pub uv: Vec2,
    /// Distance from the ray origin in meters.
    pub distance: f32,
}

pub trait VrRuntime {
    fn init(&mut self) -> Result<(), RuntimeError>;
    fn is_initialised(&self) -> bool;
    fn shutdown(&mut self);

    fn create_overlay(&mut self, key: &str, name: &str, dashboard: bool) -> Result<OverlayHandle, RuntimeError>;
    fn destroy_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError>;
    fn set_overlay_width_meters(&mut self, handle: OverlayHandle, width_m: f32) -> Result<(), RuntimeError>;
    fn set_overlay_input_method(&mut self, handle: OverlayHandle, method: InputMethod) -> Result<(), RuntimeError>;
    fn set_overlay_placement(&mut self, handle: OverlayHandle, placement: OverlayPlacement) -> Result<(), RuntimeError>;
    /// Pixel extent of the overlay's texture. Fixes the panel's aspect and
    /// the coordinate space of its mouse events.
    fn set_overlay_mouse_scale(&mut self, handle: OverlayHandle, width_px: u32, height_px: u32) -> Result<(), RuntimeError>;
    fn show_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError>;
    fn hide_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError>;
    fn poll_overlay_event(&mut self, handle: OverlayHandle) -> Option<OverlayEvent>;
    fn set_overlay_texture(&mut self, handle: OverlayHandle, texture: &OverlayTexture<'_>) -> Result<(), RuntimeError>;

    /// Latest poses and input state of every tracked device.
    fn tracked_devices(&self) -> Vec<DeviceSample>;
    /// Intersects a world-space ray with an overlay's plane.
    fn compute_overlay_intersection(&self, handle: OverlayHandle, origin: Vec3, direction: Vec3) -> Option<Intersection>;
    fn trigger_haptic_pulse(&mut self, device_index: u32, duration_us: u16);

    /// Blocks until the compositor opens the next frame window.
    fn wait_get_poses(&mut self);
    /// Non-blocking hint that this frame's submissions are done.
    fn post_present_handoff(&mut self);
}

/// Builds a transform from a row-major 3x4 matrix as the runtime ABI
/// delivers it (`m[row][col]`, translation in the last column).
pub fn pose_from_rows(m: [[f32; 4]; 3]) -> Affine3A {
    Affine3A {
        matrix3: Mat3A::from_cols(
            Vec3A::new(m[0][0], m[1][0], m[2][0]),
            Vec3A::new(m[0][1], m[1][1], m[2][1]),
            Vec3A::new(m[0][2], m[1][2], m[2][2]),
        ),
        translation: Vec3A::new(m[0][3], m[1][3], m[2][3]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_major_pose_maps_translation_and_axes() {
        let pose = pose_from_rows([
            [1.0, 0.0, 0.0, 0.5],
            [0.0, 0.0, -1.0, 1.2],
            [0.0, 1.0, 0.0, -2.0],
        ]);
        assert_eq!(Vec3::from(pose.translation), Vec3::new(0.5, 1.2, -2.0));
        let z = pose.transform_vector3(Vec3::Z);
        assert!((z - Vec3::new(0.0, -1.0, 0.0)).length() < 1e-6);
    }
}
