//! In-process VR runtime.
//!
//! Keeps overlays in a map, resolves laser rays against each overlay's plane,
//! queues scripted dashboard events and paces frames with a sleep. Used by
//! the host binary when no headset is attached and by every test.

use super::{
    DeviceClass, DeviceSample, InputMethod, Intersection, OverlayEvent, OverlayPlacement, VrRuntime,
    HMD_DEVICE_INDEX,
};
use crate::{
    error::RuntimeError,
    renderer::{OverlayTexture, RenderTargetId, TextureContent},
    surface::OverlayHandle,
};
use glam::{Affine3A, Vec2, Vec3};
use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};
use tracing::{debug, trace};

/// What the compositor last received for an overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedFrame {
    pub target: RenderTargetId,
    pub width: u32,
    pub height: u32,
    pub kind: SubmittedKind,
    /// Copy of CPU pixels, kept only when capture is enabled.
    pub pixels: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmittedKind {
    Gpu,
    Pixels,
    Empty,
}

#[derive(Debug, Clone)]
pub struct SimOverlay {
    pub key: String,
    pub name: String,
    pub dashboard: bool,
    pub width_m: f32,
    pub input_method: InputMethod,
    pub visible: bool,
    pub placement: Option<OverlayPlacement>,
    /// Texture extent in pixels, as set by the client.
    pub mouse_scale: Option<(u32, u32)>,
    pub last_frame: Option<SubmittedFrame>,
    /// Accepted texture submissions.
    pub submissions: u64,
    events: VecDeque<OverlayEvent>,
}

impl SimOverlay {
    /// Height in meters, from the width and the mouse-scale aspect. Square
    /// until a mouse scale is set.
    pub fn height_m(&self) -> f32 {
        match self.mouse_scale {
            Some((w, h)) if w > 0 => self.width_m * h as f32 / w as f32,
            _ => self.width_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HapticPulse {
    pub device_index: u32,
    pub duration_us: u16,
}

#[derive(Debug)]
pub struct SimulatedRuntime {
    initialised: bool,
    fail_init: bool,
    reject_textures: bool,
    capture_pixels: bool,
    next_handle: u64,
    overlays: HashMap<OverlayHandle, SimOverlay>,
    devices: Vec<DeviceSample>,
    haptics: Vec<HapticPulse>,
    frame_period: Duration,
    next_frame: Option<Instant>,
    frames_waited: u64,
    handoffs: u64,
}

impl Default for SimulatedRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRuntime {
    /// A runtime with only an HMD at the origin and no pacing.
    pub fn new() -> Self {
        Self {
            initialised: false,
            fail_init: false,
            reject_textures: false,
            capture_pixels: false,
            next_handle: 1,
            overlays: HashMap::new(),
            devices: vec![DeviceSample::tracker(HMD_DEVICE_INDEX, DeviceClass::Hmd, Affine3A::IDENTITY)],
            haptics: Vec::new(),
            frame_period: Duration::ZERO,
            next_frame: None,
            frames_waited: 0,
            handoffs: 0,
        }
    }

    pub fn with_frame_period(mut self, period: Duration) -> Self {
        self.frame_period = period;
        self
    }

    /// Makes the next `init` fail, as when no runtime is installed.
    pub fn fail_init(&mut self, fail: bool) {
        self.fail_init = fail;
    }

    /// Makes `set_overlay_texture` reject every submission.
    pub fn reject_textures(&mut self, reject: bool) {
        self.reject_textures = reject;
    }

    /// Keeps a copy of submitted CPU pixels in [`SubmittedFrame::pixels`].
    pub fn capture_pixels(&mut self, capture: bool) {
        self.capture_pixels = capture;
    }

    /// Inserts or replaces the device with the same index.
    pub fn set_device(&mut self, sample: DeviceSample) {
        match self.devices.iter_mut().find(|d| d.index == sample.index) {
            Some(slot) => *slot = sample,
            None => self.devices.push(sample),
        }
    }

    pub fn remove_device(&mut self, index: u32) {
        self.devices.retain(|d| d.index != index);
    }

    pub fn device_mut(&mut self, index: u32) -> Option<&mut DeviceSample> {
        self.devices.iter_mut().find(|d| d.index == index)
    }

    /// Queues an event on an overlay. Unknown handles are ignored.
    pub fn push_overlay_event(&mut self, handle: OverlayHandle, event: OverlayEvent) {
        if let Some(overlay) = self.overlays.get_mut(&handle) {
            overlay.events.push_back(event);
        }
    }

    pub fn overlay(&self, handle: OverlayHandle) -> Option<&SimOverlay> {
        self.overlays.get(&handle)
    }

    pub fn overlay_by_key(&self, key: &str) -> Option<(OverlayHandle, &SimOverlay)> {
        self.overlays
            .iter()
            .find(|(_, o)| o.key == key)
            .map(|(h, o)| (*h, o))
    }

    pub fn overlay_count(&self) -> usize {
        self.overlays.len()
    }

    pub fn haptics(&self) -> &[HapticPulse] {
        &self.haptics
    }

    pub fn clear_haptics(&mut self) {
        self.haptics.clear();
    }

    pub fn frames_waited(&self) -> u64 {
        self.frames_waited
    }

    pub fn handoffs(&self) -> u64 {
        self.handoffs
    }

    fn overlay_mut(&mut self, handle: OverlayHandle) -> Result<&mut SimOverlay, RuntimeError> {
        if !self.initialised {
            return Err(RuntimeError::NotInitialised);
        }
        self.overlays
            .get_mut(&handle)
            .ok_or(RuntimeError::InvalidHandle(handle))
    }

    fn device_pose(&self, index: u32) -> Option<Affine3A> {
        self.devices
            .iter()
            .find(|d| d.index == index && d.connected && d.pose_valid)
            .map(|d| d.pose)
    }

    fn world_transform(&self, placement: &OverlayPlacement) -> Option<Affine3A> {
        match placement {
            OverlayPlacement::Absolute(t) => Some(*t),
            OverlayPlacement::DeviceRelative { device, transform } => {
                self.device_pose(*device).map(|pose| pose * *transform)
            }
        }
    }
}

impl VrRuntime for SimulatedRuntime {
    fn init(&mut self) -> Result<(), RuntimeError> {
        if self.fail_init {
            return Err(RuntimeError::InitFailed("no runtime installed".into()));
        }
        self.initialised = true;
        debug!("Simulated runtime initialised");
        Ok(())
    }

    fn is_initialised(&self) -> bool {
        self.initialised
    }

    fn shutdown(&mut self) {
        self.overlays.clear();
        self.initialised = false;
        self.next_frame = None;
    }

    fn create_overlay(&mut self, key: &str, name: &str, dashboard: bool) -> Result<OverlayHandle, RuntimeError> {
        if !self.initialised {
            return Err(RuntimeError::NotInitialised);
        }
        if key.is_empty() {
            return Err(RuntimeError::CreateFailed {
                key: key.into(),
                reason: "empty key".into(),
            });
        }
        if self.overlays.values().any(|o| o.key == key) {
            return Err(RuntimeError::KeyInUse(key.into()));
        }
        let handle = OverlayHandle(self.next_handle);
        self.next_handle += 1;
        self.overlays.insert(
            handle,
            SimOverlay {
                key: key.into(),
                name: name.into(),
                dashboard,
                width_m: 1.0,
                input_method: InputMethod::None,
                visible: false,
                placement: None,
                mouse_scale: None,
                last_frame: None,
                submissions: 0,
                events: VecDeque::new(),
            },
        );
        Ok(handle)
    }

    fn destroy_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError> {
        self.overlays
            .remove(&handle)
            .map(|_| ())
            .ok_or(RuntimeError::InvalidHandle(handle))
    }

    fn set_overlay_width_meters(&mut self, handle: OverlayHandle, width_m: f32) -> Result<(), RuntimeError> {
        self.overlay_mut(handle)?.width_m = width_m;
        Ok(())
    }

    fn set_overlay_input_method(&mut self, handle: OverlayHandle, method: InputMethod) -> Result<(), RuntimeError> {
        self.overlay_mut(handle)?.input_method = method;
        Ok(())
    }

    fn set_overlay_placement(&mut self, handle: OverlayHandle, placement: OverlayPlacement) -> Result<(), RuntimeError> {
        self.overlay_mut(handle)?.placement = Some(placement);
        Ok(())
    }

    fn set_overlay_mouse_scale(&mut self, handle: OverlayHandle, width_px: u32, height_px: u32) -> Result<(), RuntimeError> {
        let overlay = self.overlay_mut(handle)?;
        if width_px == 0 || height_px == 0 {
            return Err(RuntimeError::InvalidProperty(format!("mouse scale {width_px}x{height_px}")));
        }
        overlay.mouse_scale = Some((width_px, height_px));
        Ok(())
    }

    fn show_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError> {
        self.overlay_mut(handle)?.visible = true;
        Ok(())
    }

    fn hide_overlay(&mut self, handle: OverlayHandle) -> Result<(), RuntimeError> {
        self.overlay_mut(handle)?.visible = false;
        Ok(())
    }

    fn poll_overlay_event(&mut self, handle: OverlayHandle) -> Option<OverlayEvent> {
        self.overlays.get_mut(&handle)?.events.pop_front()
    }

    fn set_overlay_texture(&mut self, handle: OverlayHandle, texture: &OverlayTexture<'_>) -> Result<(), RuntimeError> {
        let reject = self.reject_textures;
        let capture = self.capture_pixels;
        let overlay = self.overlay_mut(handle)?;
        if reject {
            return Err(RuntimeError::TextureRejected(handle, "compositor refused texture".into()));
        }
        let (kind, pixels) = match texture.content {
            TextureContent::Gpu(_) => (SubmittedKind::Gpu, None),
            TextureContent::Pixels(bytes) => (SubmittedKind::Pixels, capture.then(|| bytes.to_vec())),
            TextureContent::Empty => (SubmittedKind::Empty, None),
        };
        overlay.last_frame = Some(SubmittedFrame {
            target: texture.target,
            width: texture.width,
            height: texture.height,
            kind,
            pixels,
        });
        overlay.submissions += 1;
        trace!(?handle, target = texture.target.0, "Texture submitted");
        Ok(())
    }

    fn tracked_devices(&self) -> Vec<DeviceSample> {
        if !self.initialised {
            return Vec::new();
        }
        self.devices.clone()
    }

    fn compute_overlay_intersection(&self, handle: OverlayHandle, origin: Vec3, direction: Vec3) -> Option<Intersection> {
        if !self.initialised {
            return None;
        }
        let overlay = self.overlays.get(&handle)?;
        if overlay.dashboard {
            return None;
        }
        let world = self.world_transform(overlay.placement.as_ref()?)?;
        let to_local = world.inverse();
        let o = to_local.transform_point3(origin);
        let d = to_local.transform_vector3(direction);
        // Plane z = 0, facing +Z. Rays travelling away from the front face miss.
        if d.z >= -f32::EPSILON {
            return None;
        }
        let t = -o.z / d.z;
        if t < 0.0 {
            return None;
        }
        let p = o + d * t;
        let (w, h) = (overlay.width_m, overlay.height_m());
        if w <= 0.0 || h <= 0.0 {
            return None;
        }
        let uv = Vec2::new(p.x / w + 0.5, 0.5 - p.y / h);
        if !(0.0..=1.0).contains(&uv.x) || !(0.0..=1.0).contains(&uv.y) {
            return None;
        }
        let distance = (world.transform_point3(p) - origin).length();
        Some(Intersection { uv, distance })
    }

    fn trigger_haptic_pulse(&mut self, device_index: u32, duration_us: u16) {
        if !self.initialised {
            return;
        }
        self.haptics.push(HapticPulse {
            device_index,
            duration_us,
        });
    }

    fn wait_get_poses(&mut self) {
        if !self.initialised {
            return;
        }
        let now = Instant::now();
        let deadline = self.next_frame.unwrap_or(now);
        if deadline > now {
            std::thread::sleep(deadline - now);
        }
        self.next_frame = Some(deadline.max(now) + self.frame_period);
        self.frames_waited += 1;
    }

    fn post_present_handoff(&mut self) {
        if self.initialised {
            self.handoffs += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{ControllerRole, MouseButton};

    fn runtime_with_panel(width_m: f32) -> (SimulatedRuntime, OverlayHandle) {
        let mut rt = SimulatedRuntime::new();
        rt.init().unwrap();
        let h = rt.create_overlay("panel", "Panel", false).unwrap();
        rt.set_overlay_width_meters(h, width_m).unwrap();
        rt.set_overlay_mouse_scale(h, 100, 100).unwrap();
        rt.set_overlay_placement(
            h,
            OverlayPlacement::Absolute(Affine3A::from_translation(Vec3::new(0.0, 0.0, -1.0))),
        )
        .unwrap();
        (rt, h)
    }

    #[test]
    fn ray_through_centre_hits_middle_of_texture() {
        let (rt, h) = runtime_with_panel(1.0);
        let hit = rt
            .compute_overlay_intersection(h, Vec3::ZERO, Vec3::NEG_Z)
            .expect("centre ray should hit");
        assert!((hit.uv - Vec2::splat(0.5)).length() < 1e-5);
        assert!((hit.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn uv_origin_is_top_left() {
        let (rt, h) = runtime_with_panel(1.0);
        let hit = rt
            .compute_overlay_intersection(h, Vec3::new(-0.25, 0.25, 0.0), Vec3::NEG_Z)
            .unwrap();
        assert!((hit.uv - Vec2::new(0.25, 0.25)).length() < 1e-5);
    }

    #[test]
    fn mouse_scale_sets_aspect_before_any_frame() {
        let (mut rt, h) = runtime_with_panel(1.0);
        rt.set_overlay_mouse_scale(h, 1024, 768).unwrap();
        // Panel is 0.75 m tall; y = -0.1875 is three quarters down.
        let hit = rt
            .compute_overlay_intersection(h, Vec3::new(0.0, -0.1875, 0.0), Vec3::NEG_Z)
            .unwrap();
        assert!((hit.uv.y - 0.75).abs() < 1e-5);
        assert!(rt.overlay(h).unwrap().last_frame.is_none());
        assert!(rt
            .compute_overlay_intersection(h, Vec3::new(0.0, 0.45, 0.0), Vec3::NEG_Z)
            .is_none());
        assert!(matches!(
            rt.set_overlay_mouse_scale(h, 0, 768),
            Err(RuntimeError::InvalidProperty(_))
        ));
    }

    #[test]
    fn rays_pointing_away_or_off_panel_miss() {
        let (rt, h) = runtime_with_panel(1.0);
        assert!(rt.compute_overlay_intersection(h, Vec3::ZERO, Vec3::Z).is_none());
        assert!(rt
            .compute_overlay_intersection(h, Vec3::new(2.0, 0.0, 0.0), Vec3::NEG_Z)
            .is_none());
    }

    #[test]
    fn dashboard_overlays_never_intersect() {
        let mut rt = SimulatedRuntime::new();
        rt.init().unwrap();
        let h = rt.create_overlay("dash", "Dash", true).unwrap();
        rt.set_overlay_placement(h, OverlayPlacement::Absolute(Affine3A::from_translation(Vec3::NEG_Z)))
            .unwrap();
        assert!(rt.compute_overlay_intersection(h, Vec3::ZERO, Vec3::NEG_Z).is_none());
    }

    #[test]
    fn device_relative_placement_follows_device() {
        let mut rt = SimulatedRuntime::new();
        rt.init().unwrap();
        rt.set_device(DeviceSample::controller(
            3,
            ControllerRole::LeftHand,
            Affine3A::from_translation(Vec3::new(5.0, 0.0, 0.0)),
        ));
        let h = rt.create_overlay("kb", "Keyboard", false).unwrap();
        rt.set_overlay_placement(
            h,
            OverlayPlacement::DeviceRelative {
                device: 3,
                transform: Affine3A::from_translation(Vec3::NEG_Z),
            },
        )
        .unwrap();
        assert!(rt.compute_overlay_intersection(h, Vec3::ZERO, Vec3::NEG_Z).is_none());
        let hit = rt
            .compute_overlay_intersection(h, Vec3::new(5.0, 0.0, 0.0), Vec3::NEG_Z)
            .unwrap();
        assert!((hit.distance - 1.0).abs() < 1e-5);
    }

    #[test]
    fn keys_are_unique_and_uninitialised_runtime_refuses() {
        let mut rt = SimulatedRuntime::new();
        assert_eq!(
            rt.create_overlay("a", "A", false),
            Err(RuntimeError::NotInitialised)
        );
        rt.init().unwrap();
        rt.create_overlay("a", "A", false).unwrap();
        assert_eq!(
            rt.create_overlay("a", "A", false),
            Err(RuntimeError::KeyInUse("a".into()))
        );
    }

    #[test]
    fn events_drain_in_order() {
        let mut rt = SimulatedRuntime::new();
        rt.init().unwrap();
        let h = rt.create_overlay("dash", "Dash", true).unwrap();
        rt.push_overlay_event(h, OverlayEvent::MouseMove { x: 1.0, y: 2.0 });
        rt.push_overlay_event(h, OverlayEvent::MouseButtonDown { button: MouseButton::Left });
        assert_eq!(rt.poll_overlay_event(h), Some(OverlayEvent::MouseMove { x: 1.0, y: 2.0 }));
        assert!(matches!(rt.poll_overlay_event(h), Some(OverlayEvent::MouseButtonDown { .. })));
        assert_eq!(rt.poll_overlay_event(h), None);
    }
}
