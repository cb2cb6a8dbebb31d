//! Task for generating mesh data for chunks in a background thread.
//!
//! The task owns a [`NeighborSnapshot`] captured on the main thread, so the
//! worker never reads live chunk storage. The result carries the chunk
//! generation the snapshot was taken at, letting the main thread throw away
//! results that were overtaken by later edits.

use std::sync::Arc;

use crate::engine_state::{
    rendering::{
        atlas::TextureAtlas,
        meshing::{mesh_chunk, MeshBuffers},
    },
    task_management::task::Task,
    voxels::{block::BlockRegistry, chunk::ChunkCoordinate, snapshot::NeighborSnapshot},
};

/// A task that meshes one chunk from a snapshot.
pub struct ChunkMeshGenerationTask {
    /// The chunk being meshed
    position: ChunkCoordinate,
    /// Chunk generation at capture time
    generation: u64,
    /// Copied voxels of the chunk and its resident neighbours
    snapshot: NeighborSnapshot,
    /// Shared, read-only block definitions
    registry: Arc<BlockRegistry>,
    /// Shared, read-only atlas layout
    atlas: Arc<TextureAtlas>,
}

impl ChunkMeshGenerationTask {
    /// Creates a new chunk mesh generation task.
    ///
    /// # Arguments
    /// * `position` - The chunk to mesh; must be present in `snapshot`
    /// * `generation` - The chunk's generation when `snapshot` was captured
    /// * `snapshot` - Voxels the mesher may read
    /// * `registry` - Block definitions
    /// * `atlas` - Tile layout
    pub fn new(
        position: ChunkCoordinate,
        generation: u64,
        snapshot: NeighborSnapshot,
        registry: Arc<BlockRegistry>,
        atlas: Arc<TextureAtlas>,
    ) -> Self {
        ChunkMeshGenerationTask {
            position,
            generation,
            snapshot,
            registry,
            atlas,
        }
    }
}

impl Task for ChunkMeshGenerationTask {
    type Output = ChunkMeshGenerationTaskResult;

    fn process(self) -> ChunkMeshGenerationTaskResult {
        let buffers = match self.snapshot.voxels(self.position) {
            Some(voxels) => mesh_chunk(
                self.position,
                voxels,
                &self.snapshot,
                &self.registry,
                &self.atlas,
            ),
            None => {
                log::warn!("Mesh task for {:?} has no voxels", self.position);
                MeshBuffers::new()
            }
        };

        ChunkMeshGenerationTaskResult {
            position: self.position,
            generation: self.generation,
            buffers,
        }
    }
}

/// The result of a chunk mesh generation task.
#[derive(Debug)]
pub struct ChunkMeshGenerationTaskResult {
    /// The chunk that was meshed
    pub position: ChunkCoordinate,
    /// Chunk generation the mesh was built from
    pub generation: u64,
    /// Chunk-local geometry
    pub buffers: MeshBuffers,
}
