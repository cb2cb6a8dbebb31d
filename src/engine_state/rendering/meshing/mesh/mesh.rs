//! Mesh data structures for voxel rendering.
//!
//! [`MeshBuffers`] is the CPU-side result of meshing one chunk. It carries no
//! GPU state, so it can be produced on a worker thread and handed to the main
//! thread for upload.

use crate::engine_state::voxels::block::block_side::BlockSide;

use super::face::Face;

/// Parallel vertex attribute arrays plus a triangle index list.
///
/// Positions are chunk-local (`0..=16`). Every quad contributes four entries to
/// each attribute array and six indices.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshBuffers {
    /// Vertex positions
    pub positions: Vec<[f32; 3]>,
    /// Outward face normals
    pub normals: Vec<[f32; 3]>,
    /// Atlas coordinates
    pub texcoords: Vec<[f32; 2]>,
    /// Per-vertex RGBA tint
    pub colors: Vec<[f32; 4]>,
    /// Two triangles per quad
    pub indices: Vec<u32>,
}

impl MeshBuffers {
    /// Creates empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one quad.
    ///
    /// # Arguments
    /// * `face` - Corner positions and tile corners of the quad
    /// * `uv_rect` - `[u0, v0, u1, v1]` of the tile to sample
    /// * `tint` - RGBA applied to all four vertices
    pub fn push_face(&mut self, face: &Face, uv_rect: [f32; 4], tint: [f32; 4]) {
        let base = self.positions.len() as u32;
        let normal = face.block_side.normal();

        for (corner, uv_corner) in face.corners.iter().zip(face.uv_corners) {
            self.positions
                .push([corner.x as f32, corner.y as f32, corner.z as f32]);
            self.normals.push(normal);
            self.texcoords.push(uv_corner.pick(uv_rect));
            self.colors.push(tint);
        }

        self.indices.extend_from_slice(&Face::indices(base));
    }

    /// Number of vertices.
    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Number of quads.
    pub fn face_count(&self) -> usize {
        self.indices.len() / 6
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Number of quads facing `side`.
    pub fn faces_on(&self, side: BlockSide) -> usize {
        let normal = side.normal();
        self.normals.iter().filter(|&&n| n == normal).count() / 4
    }
}
