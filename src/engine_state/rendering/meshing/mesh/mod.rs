//! Mesh data structures for voxel rendering.
//!
//! - [`Face`]: One unit quad with its corner positions and tile corners
//! - [`MeshBuffers`]: Parallel vertex arrays and indices for a whole chunk

mod face;
mod mesh;

pub use face::{Face, UvCorner};
pub use mesh::*;
