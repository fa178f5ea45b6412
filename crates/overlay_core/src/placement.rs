//! Where overlays are put in the world.
//!
//! Tracking space is right-handed with +Y up and the HMD looking down -Z.

use crate::runtime::{OverlayPlacement, HMD_DEVICE_INDEX};
use glam::{Affine3A, Quat, Vec3};

/// Downward tilt of the keyboard when docked at the hip, so it faces the user.
const HIP_TILT_DEG: f32 = 30.0;

/// `distance` meters straight ahead of the HMD.
pub fn in_front_of_hmd(distance: f32) -> OverlayPlacement {
    OverlayPlacement::DeviceRelative {
        device: HMD_DEVICE_INDEX,
        transform: Affine3A::from_translation(Vec3::new(0.0, 0.0, -distance)),
    }
}

/// Keyboard dock: tilted in front of a hip tracker when there is one,
/// otherwise low and ahead of the HMD.
pub fn keyboard_dock(hip_tracker: Option<u32>) -> OverlayPlacement {
    match hip_tracker {
        Some(device) => OverlayPlacement::DeviceRelative {
            device,
            transform: Affine3A::from_rotation_translation(
                Quat::from_rotation_x(HIP_TILT_DEG.to_radians()),
                Vec3::new(0.0, -0.3, 0.5),
            ),
        },
        None => OverlayPlacement::DeviceRelative {
            device: HMD_DEVICE_INDEX,
            transform: Affine3A::from_translation(Vec3::new(0.0, -0.3, -0.8)),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hip_dock_is_tilted_thirty_degrees() {
        let OverlayPlacement::DeviceRelative { device, transform } = keyboard_dock(Some(9)) else {
            panic!("expected a device-relative placement");
        };
        assert_eq!(device, 9);
        // Row 1 of the rotation is (0, cos 30, -sin 30).
        let y = transform.matrix3.y_axis;
        let z = transform.matrix3.z_axis;
        assert!((y.y - 0.866).abs() < 1e-3 && (y.z - 0.5).abs() < 1e-3);
        assert!((z.y + 0.5).abs() < 1e-3 && (z.z - 0.866).abs() < 1e-3);
    }

    #[test]
    fn fallback_dock_hangs_below_the_view() {
        assert_eq!(
            keyboard_dock(None),
            OverlayPlacement::DeviceRelative {
                device: HMD_DEVICE_INDEX,
                transform: Affine3A::from_translation(Vec3::new(0.0, -0.3, -0.8)),
            }
        );
    }
}
