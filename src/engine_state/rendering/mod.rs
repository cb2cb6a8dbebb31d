//! Rendering system for the voxel engine.
//!
//! Everything between voxel data and the GPU: the texture atlas layout,
//! CPU-side meshing, the background mesh job, frustum culling, and the
//! [`backend::RenderBackend`] seam with its wgpu and recording implementations.

pub mod atlas;
pub mod backend;
pub mod chunk_renderer;
pub mod frustum;
pub mod meshing;
pub mod tasks;
pub mod texture;
pub mod vertex;
pub mod wgpu_backend;
