//! Scripted input for running without hardware: a right controller that
//! sweeps its laser across the HUD and pulls the trigger now and then, a
//! hip tracker for the keyboard dock, and periodic dashboard clicks.

use glam::{Affine3A, Vec3};
use overlay_core::{
    runtime::{
        ControllerRole, DeviceClass, DeviceSample, MouseButton, OverlayEvent, HMD_DEVICE_INDEX,
    },
    OverlayHandle, SimulatedRuntime,
};

const HEAD_HEIGHT_M: f32 = 1.6;
const HIP_HEIGHT_M: f32 = 1.0;
const RIGHT_CONTROLLER: u32 = 3;
const HIP_TRACKER: u32 = 5;
const TRIGGER_EVERY: u64 = 180;
const TRIGGER_HOLD: u64 = 12;
const CLICK_EVERY: u64 = 240;

pub struct Demo {
    rate_hz: f32,
}

impl Demo {
    pub fn new(rate_hz: f32) -> Self {
        Self {
            rate_hz: rate_hz.max(1.0),
        }
    }

    pub fn setup(&self, runtime: &mut SimulatedRuntime) {
        runtime.set_device(DeviceSample::tracker(
            HMD_DEVICE_INDEX,
            DeviceClass::Hmd,
            Affine3A::from_translation(Vec3::new(0.0, HEAD_HEIGHT_M, 0.0)),
        ));
        runtime.set_device(DeviceSample::tracker(
            HIP_TRACKER,
            DeviceClass::GenericTracker,
            Affine3A::from_translation(Vec3::new(0.0, HIP_HEIGHT_M, 0.0)),
        ));
    }

    /// Advances the script to `frame`.
    pub fn step(&self, frame: u64, runtime: &mut SimulatedRuntime, dashboard: Option<OverlayHandle>) {
        let t = frame as f32 / self.rate_hz;
        runtime.set_device(DeviceSample {
            trigger: if frame % TRIGGER_EVERY < TRIGGER_HOLD { 0.9 } else { 0.0 },
            ..DeviceSample::controller(RIGHT_CONTROLLER, ControllerRole::RightHand, controller_pose(t))
        });

        let Some(dash) = dashboard else {
            return;
        };
        match frame % CLICK_EVERY {
            0 => {
                let (x, y) = click_target(frame / CLICK_EVERY);
                runtime.push_overlay_event(dash, OverlayEvent::MouseMove { x, y });
                runtime.push_overlay_event(dash, OverlayEvent::MouseButtonDown { button: MouseButton::Left });
            }
            2 => runtime.push_overlay_event(dash, OverlayEvent::MouseButtonUp { button: MouseButton::Left }),
            _ => {}
        }
    }
}

/// Held at chest height, tracing a slow Lissajous figure across the HUD.
fn controller_pose(t: f32) -> Affine3A {
    let x = 0.35 * (0.6 * t).sin();
    let y = HEAD_HEIGHT_M + 0.25 * (0.9 * t).cos();
    Affine3A::from_translation(Vec3::new(x, y, -0.3))
}

/// Alternates between the first category button and the Back button.
fn click_target(n: u64) -> (f32, f32) {
    if n % 2 == 0 {
        (640.0, 120.0)
    } else {
        (60.0, 40.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_pulses_periodically() {
        let demo = Demo::new(90.0);
        let mut rt = SimulatedRuntime::new();
        demo.step(0, &mut rt, None);
        assert_eq!(rt.device_mut(RIGHT_CONTROLLER).unwrap().trigger, 0.9);
        demo.step(TRIGGER_HOLD, &mut rt, None);
        assert_eq!(rt.device_mut(RIGHT_CONTROLLER).unwrap().trigger, 0.0);
    }

    #[test]
    fn controller_stays_in_front_of_the_head() {
        for frame in (0..2000).step_by(37) {
            let p = controller_pose(frame as f32 / 90.0).translation;
            assert!(p.x.abs() <= 0.35 && (p.y - HEAD_HEIGHT_M).abs() <= 0.25);
            assert!(p.z < 0.0);
        }
    }
}
