//! Controller rays against overlay planes.

use crate::{controller::ControllerTracker, runtime::VrRuntime, surface::OverlayHandle};
use glam::{Affine3A, Vec3};

/// Result of one laser test. Computed fresh every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserHit {
    pub hit: bool,
    /// Texture-space coordinates in [0, 1], origin top-left.
    pub u: f32,
    pub v: f32,
    /// Meters from the controller.
    pub distance: f32,
}

impl LaserHit {
    pub const MISS: LaserHit = LaserHit {
        hit: false,
        u: 0.0,
        v: 0.0,
        distance: f32::INFINITY,
    };

    /// Surface pixel coordinates for a hit.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<(f32, f32)> {
        self.hit
            .then(|| (self.u * width as f32, self.v * height as f32))
    }
}

impl Default for LaserHit {
    fn default() -> Self {
        Self::MISS
    }
}

/// Origin and unit direction of the laser for a controller pose. The laser
/// points down the controller's -Z axis.
pub fn laser_ray(pose: &Affine3A) -> Option<(Vec3, Vec3)> {
    let dir = pose.transform_vector3(Vec3::NEG_Z).try_normalize()?;
    Some((pose.translation.into(), dir))
}

/// Casts the laser of controller `slot` against `handle`.
///
/// Misses for unknown slots, disconnected controllers, invalid poses,
/// invalid handles and dashboard overlays.
pub fn intersect(
    tracker: &ControllerTracker,
    runtime: &dyn VrRuntime,
    slot: usize,
    handle: OverlayHandle,
) -> LaserHit {
    if !handle.is_valid() {
        return LaserHit::MISS;
    }
    let Some((origin, dir)) = tracker.pose(slot).as_ref().and_then(laser_ray) else {
        return LaserHit::MISS;
    };
    match runtime.compute_overlay_intersection(handle, origin, dir) {
        Some(hit) if hit.uv.is_finite() && hit.distance.is_finite() => LaserHit {
            hit: true,
            u: hit.uv.x.clamp(0.0, 1.0),
            v: hit.uv.y.clamp(0.0, 1.0),
            distance: hit.distance,
        },
        _ => LaserHit::MISS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{
        sim::SimulatedRuntime, ControllerRole, DeviceSample, OverlayPlacement, VrRuntime,
    };

    fn scene() -> (SimulatedRuntime, OverlayHandle, ControllerTracker) {
        let mut rt = SimulatedRuntime::new();
        rt.init().unwrap();
        let h = rt.create_overlay("hud", "HUD", false).unwrap();
        rt.set_overlay_width_meters(h, 1.0).unwrap();
        rt.set_overlay_placement(h, OverlayPlacement::Absolute(Affine3A::from_translation(Vec3::NEG_Z)))
            .unwrap();
        rt.set_device(DeviceSample::controller(1, ControllerRole::LeftHand, Affine3A::IDENTITY));
        let mut tracker = ControllerTracker::new(0.5);
        tracker.update(&rt.tracked_devices());
        (rt, h, tracker)
    }

    #[test]
    fn straight_ahead_hits_centre() {
        let (rt, h, tracker) = scene();
        let hit = intersect(&tracker, &rt, 0, h);
        assert!(hit.hit);
        assert!((hit.u - 0.5).abs() < 1e-5 && (hit.v - 0.5).abs() < 1e-5);
        assert!((hit.distance - 1.0).abs() < 1e-5);
        assert_eq!(hit.to_pixels(1024, 768), Some((512.0, 384.0)));
    }

    #[test]
    fn misses_use_the_miss_value() {
        let (rt, h, tracker) = scene();
        assert_eq!(intersect(&tracker, &rt, 1, h), LaserHit::MISS);
        assert_eq!(intersect(&tracker, &rt, 9, h), LaserHit::MISS);
        assert_eq!(intersect(&tracker, &rt, 0, OverlayHandle::INVALID), LaserHit::MISS);
        assert_eq!(LaserHit::MISS.to_pixels(10, 10), None);
        assert!(LaserHit::MISS.distance.is_infinite());
    }

    #[test]
    fn degenerate_pose_has_no_ray() {
        assert!(laser_ray(&Affine3A::from_scale(Vec3::ZERO)).is_none());
    }
}
