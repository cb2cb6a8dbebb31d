//! # Camera State Management
//!
//! The viewpoint that drives chunk streaming. There is no input handling: the
//! camera flies a scripted path (straight ahead while slowly turning), which
//! is enough to keep chunks entering and leaving the render distance.
//!
//! ## Core Components
//! - `Camera`: Represents the camera's position and orientation in 3D space
//! - `Projection`: Manages the camera's projection matrix
//! - `CameraState`: Camera plus projection plus flight parameters

use cgmath::{Matrix4, Point3, Rad};

pub mod camera;

/// Camera, projection and the scripted flight moving them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraState {
    /// The current camera position and orientation
    pub camera: camera::Camera,
    /// Perspective settings
    pub projection: camera::Projection,
    /// Forward speed in world units per second
    pub speed: f32,
    /// Yaw change in radians per second
    pub turn_rate: f32,
}

impl CameraState {
    /// Creates a camera state at `position` looking along +X.
    ///
    /// # Arguments
    /// * `position` - Start of the flight
    /// * `width` - Viewport width in pixels
    /// * `height` - Viewport height in pixels
    /// * `far` - Far plane distance, usually the render distance in world units
    pub fn new(position: Point3<f32>, width: u32, height: u32, far: f32) -> Self {
        Self {
            camera: camera::Camera::new(position, Rad(0.0), Rad(-0.2)),
            projection: camera::Projection::new(width, height, cgmath::Deg(60.0), 0.1, far.max(1.0)),
            speed: 24.0,
            turn_rate: 0.15,
        }
    }

    /// Advances the flight by `dt` seconds.
    pub fn fly(&mut self, dt: f32) {
        self.camera.rotate(Rad(self.turn_rate * dt), Rad(0.0));
        let forward = self.camera.forward();
        self.camera.position += forward * self.speed * dt;
    }

    /// Current camera position.
    pub fn position(&self) -> Point3<f32> {
        self.camera.position
    }

    /// Combined projection and view matrix.
    pub fn view_projection(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.camera.calc_matrix()
    }
}
