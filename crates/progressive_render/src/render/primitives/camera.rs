//! # 3D Camera
//!
//! Look-at perspective camera with change tracking.
//!
//! Every setter compares against the current value and raises the camera's
//! `altered` flag only on a real change. Navigation providers mutate the
//! camera through these setters; the renderer reads `altered` in its update
//! phase to decide whether the accumulated image is stale, and clears it at
//! the end of prepare.

use crate::core::CameraConfig;
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec2, Vec3};

/// 3D camera for perspective projections
///
/// Uses a right-handed Y-up view space and GL clip conventions (depth in
/// [-1, 1]). Matrices are computed on demand.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    eye: Vec3,
    center: Vec3,
    up: Vec3,
    fovy: f32,
    near: f32,
    far: f32,
    aspect: f32,
    viewport: (u32, u32),
    altered: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self::from_config(&CameraConfig::default())
    }
}

impl Camera {
    /// Create a perspective camera
    ///
    /// # Arguments
    /// * `eye` - Camera position in world space
    /// * `center` - Point the camera looks at
    /// * `up` - Up vector (need not be orthogonal to the view direction)
    /// * `fovy_degrees` - Vertical field of view in degrees
    /// * `near` / `far` - Clipping plane distances, `0 < near < far`
    pub fn new(eye: Vec3, center: Vec3, up: Vec3, fovy_degrees: f32, near: f32, far: f32) -> Self {
        Self {
            eye,
            center,
            up,
            fovy: utils::deg_to_rad(fovy_degrees),
            near,
            far,
            aspect: 1.0,
            viewport: (1, 1),
            altered: true,
        }
    }

    /// Create a camera from its serialized configuration
    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(
            Vec3::from(config.eye),
            Vec3::from(config.center),
            Vec3::from(config.up),
            config.fovy_degrees,
            config.near,
            config.far,
        )
    }

    fn update<T: PartialEq>(field: &mut T, value: T, altered: &mut bool) {
        if *field != value {
            *field = value;
            *altered = true;
        }
    }

    /// Set the eye position
    pub fn set_eye(&mut self, eye: Vec3) {
        Self::update(&mut self.eye, eye, &mut self.altered);
        log::trace!("Camera eye set to {:?}", eye);
    }

    /// Set the look-at target
    pub fn set_center(&mut self, center: Vec3) {
        Self::update(&mut self.center, center, &mut self.altered);
    }

    /// Set the up vector
    pub fn set_up(&mut self, up: Vec3) {
        Self::update(&mut self.up, up, &mut self.altered);
    }

    /// Set the vertical field of view in degrees
    pub fn set_fovy_degrees(&mut self, degrees: f32) {
        Self::update(&mut self.fovy, utils::deg_to_rad(degrees), &mut self.altered);
    }

    /// Set the near clipping plane
    pub fn set_near(&mut self, near: f32) {
        Self::update(&mut self.near, near, &mut self.altered);
    }

    /// Set the far clipping plane
    pub fn set_far(&mut self, far: f32) {
        Self::update(&mut self.far, far, &mut self.altered);
    }

    /// Set the aspect ratio (width / height)
    pub fn set_aspect(&mut self, aspect: f32) {
        Self::update(&mut self.aspect, aspect, &mut self.altered);
    }

    /// Set the viewport in pixels
    pub fn set_viewport(&mut self, viewport: (u32, u32)) {
        Self::update(&mut self.viewport, viewport, &mut self.altered);
    }

    /// Eye position
    pub fn eye(&self) -> Vec3 {
        self.eye
    }

    /// Look-at target
    pub fn center(&self) -> Vec3 {
        self.center
    }

    /// Up vector
    pub fn up(&self) -> Vec3 {
        self.up
    }

    /// Vertical field of view in radians
    pub fn fovy(&self) -> f32 {
        self.fovy
    }

    /// Near clipping plane
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Far clipping plane
    pub fn far(&self) -> f32 {
        self.far
    }

    /// Aspect ratio
    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    /// Viewport in pixels
    pub fn viewport(&self) -> (u32, u32) {
        self.viewport
    }

    /// Whether any parameter changed since the last [`clear_altered`](Self::clear_altered)
    pub fn altered(&self) -> bool {
        self.altered
    }

    /// Force the camera to report a change
    pub fn mark_altered(&mut self) {
        self.altered = true;
    }

    /// Acknowledge all pending changes
    pub fn clear_altered(&mut self) {
        self.altered = false;
    }

    /// World-to-view transform
    pub fn view(&self) -> Mat4 {
        Mat4::look_at(self.eye, self.center, self.up)
    }

    /// View-to-clip transform
    pub fn projection(&self) -> Mat4 {
        Mat4::perspective(self.fovy, self.aspect, self.near, self.far)
    }

    /// Combined world-to-clip transform `P * V`
    pub fn view_projection(&self) -> Mat4 {
        self.projection() * self.view()
    }

    /// World-to-clip transform with a sub-pixel displacement in NDC units
    pub fn jittered_view_projection(&self, ndc_offset: Vec2) -> Mat4 {
        Mat4::ndc_translation(ndc_offset) * self.view_projection()
    }
}
