//! Per-tick controller snapshots with edge detection.
//!
//! Slot 0 is the left hand, slot 1 the right. Every tick the current sample
//! becomes the previous one and a fresh sample is read; a controller the
//! runtime no longer reports reads as disconnected.

use crate::runtime::{
    ControllerRole, DeviceClass, DeviceSample, BUTTON_APPLICATION_MENU, INVALID_DEVICE_INDEX,
};
use glam::Affine3A;

pub const CONTROLLER_SLOTS: usize = 2;

/// Tracking heights between which a generic tracker counts as a hip tracker.
const HIP_HEIGHT_RANGE: (f32, f32) = (0.8, 1.2);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerSample {
    pub device_index: u32,
    pub connected: bool,
    pub pose_valid: bool,
    pub pose: Affine3A,
    pub trigger: f32,
    pub buttons: u64,
}

impl Default for ControllerSample {
    fn default() -> Self {
        Self {
            device_index: INVALID_DEVICE_INDEX,
            connected: false,
            pose_valid: false,
            pose: Affine3A::IDENTITY,
            trigger: 0.0,
            buttons: 0,
        }
    }
}

impl ControllerSample {
    fn from_device(d: &DeviceSample) -> Self {
        Self {
            device_index: d.index,
            connected: d.connected,
            pose_valid: d.connected && d.pose_valid,
            pose: d.pose,
            trigger: if d.trigger.is_finite() {
                d.trigger.clamp(0.0, 1.0)
            } else {
                0.0
            },
            buttons: d.buttons,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Edges {
    trigger_pressed: bool,
    trigger_released: bool,
    menu_pressed: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ControllerSnapshot {
    pub current: ControllerSample,
    pub previous: ControllerSample,
    edges: Edges,
}

#[derive(Debug, Clone)]
pub struct ControllerTracker {
    slots: [ControllerSnapshot; CONTROLLER_SLOTS],
    threshold: f32,
}

impl Default for ControllerTracker {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl ControllerTracker {
    pub fn new(trigger_threshold: f32) -> Self {
        Self {
            slots: [ControllerSnapshot::default(); CONTROLLER_SLOTS],
            threshold: trigger_threshold,
        }
    }

    /// Advances one tick using this frame's device list.
    pub fn update(&mut self, devices: &[DeviceSample]) {
        let mut fresh = [ControllerSample::default(); CONTROLLER_SLOTS];
        for d in devices.iter().filter(|d| d.class == DeviceClass::Controller) {
            let slot = match d.role {
                ControllerRole::LeftHand => 0,
                ControllerRole::RightHand => 1,
                ControllerRole::Invalid => continue,
            };
            fresh[slot] = ControllerSample::from_device(d);
        }

        let threshold = self.threshold;
        for (snap, sample) in self.slots.iter_mut().zip(fresh) {
            snap.previous = snap.current;
            snap.current = sample;
            snap.edges = if sample.connected {
                let was_down = snap.previous.trigger > threshold;
                let is_down = sample.trigger > threshold;
                let menu_was = snap.previous.buttons & BUTTON_APPLICATION_MENU != 0;
                let menu_is = sample.buttons & BUTTON_APPLICATION_MENU != 0;
                Edges {
                    trigger_pressed: is_down && !was_down,
                    trigger_released: was_down && !is_down,
                    menu_pressed: menu_is && !menu_was,
                }
            } else {
                Edges::default()
            };
        }
    }

    fn connected(&self, slot: usize) -> Option<&ControllerSnapshot> {
        self.slots.get(slot).filter(|s| s.current.connected)
    }

    pub fn snapshot(&self, slot: usize) -> Option<&ControllerSnapshot> {
        self.slots.get(slot)
    }

    pub fn is_connected(&self, slot: usize) -> bool {
        self.connected(slot).is_some()
    }

    pub fn trigger_value(&self, slot: usize) -> f32 {
        self.connected(slot).map_or(0.0, |s| s.current.trigger)
    }

    pub fn is_trigger_down(&self, slot: usize) -> bool {
        self.trigger_value(slot) > self.threshold
    }

    pub fn trigger_pressed(&self, slot: usize) -> bool {
        self.connected(slot).is_some_and(|s| s.edges.trigger_pressed)
    }

    pub fn trigger_released(&self, slot: usize) -> bool {
        self.connected(slot).is_some_and(|s| s.edges.trigger_released)
    }

    pub fn menu_pressed(&self, slot: usize) -> bool {
        self.connected(slot).is_some_and(|s| s.edges.menu_pressed)
    }

    /// Pose usable for a laser ray this tick.
    pub fn pose(&self, slot: usize) -> Option<Affine3A> {
        self.connected(slot)
            .filter(|s| s.current.pose_valid)
            .map(|s| s.current.pose)
    }

    /// Device index to pulse, if the slot is connected.
    pub fn device_index(&self, slot: usize) -> Option<u32> {
        self.connected(slot).map(|s| s.current.device_index)
    }
}

/// First connected generic tracker held at hip height.
pub fn find_hip_tracker(devices: &[DeviceSample]) -> Option<u32> {
    devices
        .iter()
        .filter(|d| d.class == DeviceClass::GenericTracker && d.connected && d.pose_valid)
        .find(|d| {
            let y = d.pose.translation.y;
            y > HIP_HEIGHT_RANGE.0 && y < HIP_HEIGHT_RANGE.1
        })
        .map(|d| d.index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn right(trigger: f32, buttons: u64) -> DeviceSample {
        DeviceSample {
            trigger,
            buttons,
            ..DeviceSample::controller(4, ControllerRole::RightHand, Affine3A::IDENTITY)
        }
    }

    #[test]
    fn trigger_edges_fire_once_per_crossing() {
        let mut tracker = ControllerTracker::new(0.5);
        let mut pressed = Vec::new();
        let mut released = Vec::new();
        for t in [0.0, 0.6, 0.6, 0.0] {
            tracker.update(&[right(t, 0)]);
            pressed.push(tracker.trigger_pressed(1));
            released.push(tracker.trigger_released(1));
        }
        assert_eq!(pressed, vec![false, true, false, false]);
        assert_eq!(released, vec![false, false, false, true]);
    }

    #[test]
    fn threshold_itself_is_not_down() {
        let mut tracker = ControllerTracker::new(0.5);
        tracker.update(&[right(0.5, 0)]);
        assert!(!tracker.is_trigger_down(1));
        assert!(!tracker.trigger_pressed(1));
    }

    #[test]
    fn disconnected_slots_read_as_defaults() {
        let mut tracker = ControllerTracker::new(0.5);
        tracker.update(&[right(0.9, BUTTON_APPLICATION_MENU)]);
        assert!(tracker.trigger_pressed(1));
        tracker.update(&[]);
        assert!(!tracker.is_connected(1));
        assert_eq!(tracker.trigger_value(1), 0.0);
        assert!(!tracker.trigger_pressed(1));
        assert!(!tracker.trigger_released(1));
        assert!(!tracker.menu_pressed(1));
        assert_eq!(tracker.pose(1), None);
        assert!(!tracker.is_connected(0));
        assert!(!tracker.is_connected(7));
        assert_eq!(tracker.trigger_value(7), 0.0);
    }

    #[test]
    fn menu_edge_and_slot_mapping() {
        let mut tracker = ControllerTracker::new(0.5);
        let left = DeviceSample {
            buttons: BUTTON_APPLICATION_MENU,
            ..DeviceSample::controller(3, ControllerRole::LeftHand, Affine3A::IDENTITY)
        };
        tracker.update(&[left]);
        assert!(tracker.menu_pressed(0));
        assert!(!tracker.menu_pressed(1));
        tracker.update(&[left]);
        assert!(!tracker.menu_pressed(0), "held button is not a new press");
        assert_eq!(tracker.device_index(0), Some(3));
    }

    #[test]
    fn invalid_pose_keeps_buttons_but_not_pose() {
        let mut tracker = ControllerTracker::new(0.5);
        let sample = DeviceSample {
            pose_valid: false,
            ..right(0.8, 0)
        };
        tracker.update(&[sample]);
        assert!(tracker.is_connected(1));
        assert!(tracker.is_trigger_down(1));
        assert_eq!(tracker.pose(1), None);
    }

    #[test]
    fn hip_tracker_must_sit_at_hip_height() {
        let low = DeviceSample::tracker(
            5,
            DeviceClass::GenericTracker,
            Affine3A::from_translation(Vec3::new(0.0, 0.3, 0.0)),
        );
        let hip = DeviceSample::tracker(
            6,
            DeviceClass::GenericTracker,
            Affine3A::from_translation(Vec3::new(0.0, 1.0, 0.0)),
        );
        assert_eq!(find_hip_tracker(&[low]), None);
        assert_eq!(find_hip_tracker(&[low, hip]), Some(6));
    }
}
