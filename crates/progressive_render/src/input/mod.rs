//! Camera navigation
//!
//! A navigation provider turns user input into camera changes. The renderer
//! polls it once per update phase; any setter call that really changes the
//! camera raises the camera's `altered` flag and therefore restarts
//! accumulation.

use crate::foundation::math::{utils, Quat, Unit, Vec3};
use crate::render::Camera;

/// Input-driven camera controller polled once per update
pub trait Navigation {
    /// Apply pending input to `camera`
    fn update(&mut self, camera: &mut Camera);
}

/// Orbits the eye around the camera center
///
/// Input is queued with [`rotate`](Self::rotate) and [`zoom`](Self::zoom)
/// and applied on the next [`Navigation::update`]. Without pending input the
/// camera is left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrbitNavigation {
    yaw: f32,
    pitch: f32,
    zoom: f32,
}

impl OrbitNavigation {
    /// Smallest eye-to-center distance reachable by zooming
    pub const MIN_DISTANCE: f32 = 1e-3;

    /// Create a navigation without pending input
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a rotation in degrees around the up vector (yaw) and the
    /// camera's right vector (pitch)
    pub fn rotate(&mut self, yaw_degrees: f32, pitch_degrees: f32) {
        self.yaw += yaw_degrees;
        self.pitch += pitch_degrees;
    }

    /// Queue a zoom; the eye distance is multiplied by `factor`
    pub fn zoom(&mut self, factor: f32) {
        self.zoom = if self.zoom == 0.0 { factor } else { self.zoom * factor };
    }

    /// Whether input is waiting for the next update
    pub fn has_pending_input(&self) -> bool {
        self.yaw != 0.0 || self.pitch != 0.0 || self.zoom != 0.0
    }
}

impl Navigation for OrbitNavigation {
    fn update(&mut self, camera: &mut Camera) {
        if !self.has_pending_input() {
            return;
        }

        let center = camera.center();
        let up = camera.up().normalize();
        let mut offset = camera.eye() - center;

        if self.yaw != 0.0 {
            let yaw = Quat::from_axis_angle(&Unit::new_normalize(up), utils::deg_to_rad(self.yaw));
            offset = yaw * offset;
        }
        if self.pitch != 0.0 {
            let right = offset.cross(&up);
            if right.norm() > f32::EPSILON {
                let pitch =
                    Quat::from_axis_angle(&Unit::new_normalize(right), utils::deg_to_rad(self.pitch));
                offset = pitch * offset;
            }
        }
        if self.zoom != 0.0 {
            let distance = (offset.norm() * self.zoom).max(Self::MIN_DISTANCE);
            offset = offset.normalize() * distance;
        }

        log::trace!("Orbit navigation: yaw {} pitch {} zoom {}", self.yaw, self.pitch, self.zoom);
        camera.set_eye(center + offset);
        *self = Self::default();
    }
}

/// Replays a fixed list of eye positions, one per update
///
/// Used by headless runs to simulate user interaction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScriptedNavigation {
    eyes: Vec<Vec3>,
    next: usize,
}

impl ScriptedNavigation {
    /// Create a navigation that visits `eyes` in order
    pub fn new(eyes: Vec<Vec3>) -> Self {
        Self { eyes, next: 0 }
    }

    /// Whether every position has been replayed
    pub fn is_finished(&self) -> bool {
        self.next >= self.eyes.len()
    }
}

impl Navigation for ScriptedNavigation {
    fn update(&mut self, camera: &mut Camera) {
        if let Some(eye) = self.eyes.get(self.next) {
            camera.set_eye(*eye);
            self.next += 1;
        }
    }
}
