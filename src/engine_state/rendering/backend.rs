//! # Render Backend
//!
//! The seam between chunk bookkeeping and the GPU. Chunks hand their
//! [`MeshBuffers`] to a [`RenderBackend`] and keep only the returned
//! [`MeshHandle`]; per frame the renderer asks the backend for its current
//! [`Frustum`] and queues translated draws.
//!
//! All calls happen on the main thread.

use std::collections::HashMap;

use cgmath::{Matrix4, Vector3};

use super::{frustum::Frustum, meshing::MeshBuffers};

/// Opaque id of a mesh owned by a backend.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeshHandle(pub u64);

/// GPU facade used by chunks and the chunk renderer.
pub trait RenderBackend {
    /// Uploads new geometry and returns its handle.
    fn create_mesh(&mut self, buffers: &MeshBuffers) -> MeshHandle;

    /// Replaces the geometry behind an existing handle.
    fn update_mesh(&mut self, handle: MeshHandle, buffers: &MeshBuffers);

    /// Frees a mesh. The handle is dead afterwards.
    fn destroy_mesh(&mut self, handle: MeshHandle);

    /// Called once before the draws of a frame are queued.
    fn begin_frame(&mut self) {}

    /// Queues one draw of `handle` placed at `translation` in world space.
    fn draw(&mut self, handle: MeshHandle, translation: Vector3<f32>);

    /// Called once after the last draw of a frame. GPU backends submit here.
    fn end_frame(&mut self) {}

    /// Sets the camera used for the following frames and updates the frustum.
    fn set_view_projection(&mut self, view_projection: Matrix4<f32>);

    /// Current view frustum.
    fn frustum(&self) -> &Frustum;
}

/// Headless backend that keeps geometry sizes and records every call.
///
/// Used where no GPU is available and to observe what the streaming core does.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Index count of every live mesh
    pub live: HashMap<MeshHandle, usize>,
    /// Number of `create_mesh` calls
    pub created: usize,
    /// Number of `update_mesh` calls
    pub updated: usize,
    /// Number of `destroy_mesh` calls
    pub destroyed: usize,
    /// Draws queued since the last `begin_frame`
    pub draws: Vec<(MeshHandle, Vector3<f32>)>,
    /// Frustum reported to the renderer
    pub frustum: Frustum,
    next_handle: u64,
}

impl RecordingBackend {
    /// Creates a backend whose frustum accepts everything.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RenderBackend for RecordingBackend {
    fn create_mesh(&mut self, buffers: &MeshBuffers) -> MeshHandle {
        let handle = MeshHandle(self.next_handle);
        self.next_handle += 1;
        self.created += 1;
        self.live.insert(handle, buffers.indices.len());
        handle
    }

    fn update_mesh(&mut self, handle: MeshHandle, buffers: &MeshBuffers) {
        self.updated += 1;
        if let Some(index_count) = self.live.get_mut(&handle) {
            *index_count = buffers.indices.len();
        } else {
            log::warn!("Update of unknown mesh {:?}", handle);
        }
    }

    fn destroy_mesh(&mut self, handle: MeshHandle) {
        self.destroyed += 1;
        if self.live.remove(&handle).is_none() {
            log::warn!("Destroy of unknown mesh {:?}", handle);
        }
    }

    fn begin_frame(&mut self) {
        self.draws.clear();
    }

    fn draw(&mut self, handle: MeshHandle, translation: Vector3<f32>) {
        self.draws.push((handle, translation));
    }

    fn set_view_projection(&mut self, view_projection: Matrix4<f32>) {
        self.frustum = Frustum::from_view_projection(view_projection);
    }

    fn frustum(&self) -> &Frustum {
        &self.frustum
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{perspective, Deg, Point3};

    use super::*;

    fn buffers_with_indices(count: usize) -> MeshBuffers {
        let mut buffers = MeshBuffers::new();
        buffers.indices = (0..count as u32).collect();
        buffers
    }

    #[test]
    fn records_mesh_lifecycle() {
        let mut backend = RecordingBackend::new();
        let first = backend.create_mesh(&buffers_with_indices(6));
        let second = backend.create_mesh(&buffers_with_indices(12));
        assert_ne!(first, second);

        backend.update_mesh(first, &buffers_with_indices(36));
        assert_eq!(backend.live[&first], 36);

        backend.destroy_mesh(second);
        assert_eq!((backend.created, backend.updated, backend.destroyed), (2, 1, 1));
        assert_eq!(backend.live.len(), 1);
    }

    #[test]
    fn begin_frame_clears_queued_draws() {
        let mut backend = RecordingBackend::new();
        let handle = backend.create_mesh(&buffers_with_indices(6));
        backend.draw(handle, Vector3::new(16.0, 0.0, 0.0));
        assert_eq!(backend.draws.len(), 1);

        backend.begin_frame();
        assert!(backend.draws.is_empty());
    }

    #[test]
    fn view_projection_narrows_the_frustum() {
        let mut backend = RecordingBackend::new();
        let behind = (Vector3::new(-1.0, -1.0, 50.0), Vector3::new(1.0, 1.0, 52.0));
        assert!(backend.frustum().intersects_aabb(behind.0, behind.1));

        let view = Matrix4::look_at_rh(
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(0.0, 0.0, -1.0),
            Vector3::unit_y(),
        );
        backend.set_view_projection(perspective(Deg(60.0), 1.0, 0.1, 100.0) * view);
        assert!(!backend.frustum().intersects_aabb(behind.0, behind.1));
        assert!(backend
            .frustum()
            .intersects_aabb(Vector3::new(-1.0, -1.0, -12.0), Vector3::new(1.0, 1.0, -10.0)));
    }
}
