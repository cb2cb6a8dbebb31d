//! # Chunk Renderer
//!
//! Walks the resident chunks once per frame, drops the ones whose bounding
//! box is outside the view frustum, and queues a translated draw for every
//! remaining chunk that has geometry.

use cgmath::Vector3;

use crate::engine_state::voxels::chunk::{chunk_origin, ChunkMap, CHUNK_DIMENSION};

use super::backend::RenderBackend;

/// What happened to the resident chunks during one frame.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct RenderStats {
    /// Chunks examined
    pub considered: usize,
    /// Chunks outside the frustum
    pub culled: usize,
    /// Visible chunks without a mesh (all air or not meshed yet)
    pub without_mesh: usize,
    /// Draws queued
    pub drawn: usize,
}

/// Frustum-culled drawing of chunk meshes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrustumChunkRenderer {
    /// World-space offset added to every chunk position
    pub world_origin: Vector3<f32>,
}

impl FrustumChunkRenderer {
    /// Creates a renderer placing chunk (0, 0, 0) at `world_origin`.
    pub fn new(world_origin: Vector3<f32>) -> Self {
        FrustumChunkRenderer { world_origin }
    }

    /// World-space bounding box of a chunk.
    pub fn chunk_bounds(&self, position: cgmath::Point3<i32>) -> (Vector3<f32>, Vector3<f32>) {
        let origin = chunk_origin(position);
        let min = Vector3::new(origin.x as f32, origin.y as f32, origin.z as f32) + self.world_origin;
        let size = CHUNK_DIMENSION as f32;
        (min, min + Vector3::new(size, size, size))
    }

    /// Queues draws for every visible chunk with a mesh.
    ///
    /// # Arguments
    /// * `chunks` - Resident chunks
    /// * `backend` - Receives the draws and supplies the frustum
    ///
    /// # Returns
    /// Per-frame counters
    pub fn render<B>(&self, chunks: &ChunkMap, backend: &mut B) -> RenderStats
    where
        B: RenderBackend + ?Sized,
    {
        let mut stats = RenderStats::default();
        let frustum = *backend.frustum();
        backend.begin_frame();

        for (position, chunk) in chunks {
            stats.considered += 1;

            let (min, max) = self.chunk_bounds(*position);
            if !frustum.intersects_aabb(min, max) {
                stats.culled += 1;
                continue;
            }

            match chunk.mesh() {
                Some(mesh) => {
                    backend.draw(mesh.handle, min);
                    stats.drawn += 1;
                }
                None => stats.without_mesh += 1,
            }
        }

        backend.end_frame();

        log::trace!("Rendered chunks: {:?}", stats);
        stats
    }
}

impl Default for FrustumChunkRenderer {
    fn default() -> Self {
        Self::new(Vector3::new(0.0, 0.0, 0.0))
    }
}
