//! # Chunk Module
//!
//! This module provides the `Chunk` struct: a 16x16x16 cube of block ids plus
//! the GPU mesh last built from it, together with the coordinate helpers used
//! to move between world space and chunk-local space.
//!
//! ## Storage
//!
//! Voxels live in a flat array of `CHUNK_SIZE` block ids in x-fastest order
//! (`x + y * 16 + z * 256`). The same layout is used by snapshots and by the
//! save file, so bulk copies never re-index.
//!
//! ## Dirty Tracking
//!
//! Every mutation marks the chunk dirty and gives it a new generation. A mesh
//! built from any other generation is stale; [`Chunk::apply_mesh`] refuses it.
//! Generations come from one process-wide counter, so a job started for an
//! earlier residency of the same coordinate can never match a reloaded chunk.

use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
};

use cgmath::{Point3, Vector3};

use crate::engine_state::rendering::{
    atlas::TextureAtlas,
    backend::{MeshHandle, RenderBackend},
    meshing::{self, MeshBuffers},
};

use super::{
    block::{BlockId, BlockRegistry, AIR},
    snapshot::OccupancyOracle,
};

/// The dimension (width, height, depth) of a chunk in blocks.
pub const CHUNK_DIMENSION: i32 = 16;
/// The number of blocks in a single 2D plane of a chunk (CHUNK_DIMENSION²).
pub const CHUNK_PLANE_SIZE: i32 = CHUNK_DIMENSION * CHUNK_DIMENSION;
/// The total number of blocks in a chunk (CHUNK_DIMENSION³).
pub const CHUNK_SIZE: i32 = CHUNK_PLANE_SIZE * CHUNK_DIMENSION;

/// Integer chunk position. Chunk `c` covers world voxels `c * 16 .. c * 16 + 16`.
pub type ChunkCoordinate = Point3<i32>;

/// Resident chunks keyed by coordinate.
pub type ChunkMap = HashMap<ChunkCoordinate, Chunk>;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(1);

fn next_generation() -> u64 {
    NEXT_GENERATION.fetch_add(1, Ordering::Relaxed)
}

/// Splits a world voxel position into the owning chunk and the local position
/// inside it.
///
/// Uses floor semantics so negative coordinates land in the chunk below zero:
/// world x = -1 is local x = 15 of chunk x = -1.
pub fn world_to_chunk_local(wx: i32, wy: i32, wz: i32) -> (ChunkCoordinate, Point3<usize>) {
    let chunk = Point3::new(
        wx.div_euclid(CHUNK_DIMENSION),
        wy.div_euclid(CHUNK_DIMENSION),
        wz.div_euclid(CHUNK_DIMENSION),
    );
    let local = Point3::new(
        wx.rem_euclid(CHUNK_DIMENSION) as usize,
        wy.rem_euclid(CHUNK_DIMENSION) as usize,
        wz.rem_euclid(CHUNK_DIMENSION) as usize,
    );
    (chunk, local)
}

/// World position of voxel (0, 0, 0) of the chunk.
pub fn chunk_origin(position: ChunkCoordinate) -> Vector3<i32> {
    Vector3::new(
        position.x * CHUNK_DIMENSION,
        position.y * CHUNK_DIMENSION,
        position.z * CHUNK_DIMENSION,
    )
}

/// Save-file key of a chunk: `"cx,cy,cz"`.
pub fn chunk_key(position: ChunkCoordinate) -> String {
    format!("{},{},{}", position.x, position.y, position.z)
}

/// Inverse of [`chunk_key`]. Returns `None` for anything that is not three
/// comma separated integers.
pub fn parse_chunk_key(key: &str) -> Option<ChunkCoordinate> {
    let mut parts = key.split(',').map(|part| part.trim().parse::<i32>());
    let x = parts.next()?.ok()?;
    let y = parts.next()?.ok()?;
    let z = parts.next()?.ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some(Point3::new(x, y, z))
}

/// Flat array index of a local position.
///
/// # Panics
/// Panics if any component is outside `0..CHUNK_DIMENSION`.
pub fn voxel_index(x: usize, y: usize, z: usize) -> usize {
    let dimension = CHUNK_DIMENSION as usize;
    assert!(
        x < dimension && y < dimension && z < dimension,
        "local voxel position ({x}, {y}, {z}) outside chunk"
    );
    x + y * dimension + z * dimension * dimension
}

/// GPU mesh cached on a chunk.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ChunkMesh {
    /// Backend handle owning the vertex and index buffers
    pub handle: MeshHandle,
    /// Number of indices to draw
    pub index_count: u32,
}

/// Represents a 16x16x16 collection of voxel blocks in the world.
pub struct Chunk {
    /// The position of this chunk in chunk coordinates (not block coordinates).
    pub position: ChunkCoordinate,
    voxels: Box<[BlockId]>,
    mesh: Option<ChunkMesh>,
    dirty: bool,
    generation: u64,
}

impl Chunk {
    /// Creates a new, completely empty chunk (all blocks are air).
    ///
    /// A fresh chunk has no mesh and is therefore dirty.
    pub fn empty(position: ChunkCoordinate) -> Self {
        Self::from_voxels(position, vec![AIR; CHUNK_SIZE as usize])
    }

    /// Creates a chunk from a flat voxel array.
    ///
    /// # Panics
    /// Panics if `voxels` does not hold exactly `CHUNK_SIZE` ids.
    pub fn from_voxels(position: ChunkCoordinate, voxels: Vec<BlockId>) -> Self {
        assert_eq!(
            voxels.len(),
            CHUNK_SIZE as usize,
            "chunk voxel array has the wrong length"
        );
        Chunk {
            position,
            voxels: voxels.into_boxed_slice(),
            mesh: None,
            dirty: true,
            generation: next_generation(),
        }
    }

    /// Gets the block at the specified chunk-relative coordinates.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn get_block(&self, x: usize, y: usize, z: usize) -> BlockId {
        self.voxels[voxel_index(x, y, z)]
    }

    /// Sets the block at the specified chunk-relative coordinates and marks the
    /// chunk dirty.
    ///
    /// # Panics
    /// Panics if the coordinates are out of bounds.
    pub fn set_block(&mut self, x: usize, y: usize, z: usize, block: BlockId) {
        self.voxels[voxel_index(x, y, z)] = block;
        self.mark_dirty();
    }

    /// Read access to the whole voxel array.
    pub fn voxel_data(&self) -> &[BlockId] {
        &self.voxels
    }

    /// Write access to the whole voxel array for bulk fills. Marks the chunk dirty.
    pub fn voxel_data_mut(&mut self) -> &mut [BlockId] {
        self.mark_dirty();
        &mut self.voxels
    }

    /// Flags the cached mesh as out of date and starts a new generation.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
        self.generation = next_generation();
    }

    /// Whether the voxels changed since the cached mesh was built.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Id of the current voxel state, renewed on every dirty transition.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The cached mesh, if any geometry has been uploaded.
    pub fn mesh(&self) -> Option<ChunkMesh> {
        self.mesh
    }

    /// Meshes the chunk on the calling thread and uploads the result.
    ///
    /// Does nothing when the chunk is clean.
    pub fn rebuild_mesh<O, B>(
        &mut self,
        oracle: &O,
        registry: &BlockRegistry,
        atlas: &TextureAtlas,
        backend: &mut B,
    ) where
        O: OccupancyOracle + ?Sized,
        B: RenderBackend + ?Sized,
    {
        if !self.dirty {
            return;
        }

        let buffers = meshing::mesh_chunk(self.position, &self.voxels, oracle, registry, atlas);
        self.upload(&buffers, backend);
        self.dirty = false;
    }

    /// Installs geometry produced by a background job.
    ///
    /// Returns `false` and leaves the chunk untouched when the job was built
    /// from a different generation than the chunk's current one.
    pub fn apply_mesh<B>(&mut self, generation: u64, buffers: &MeshBuffers, backend: &mut B) -> bool
    where
        B: RenderBackend + ?Sized,
    {
        if generation != self.generation {
            return false;
        }

        self.upload(buffers, backend);
        self.dirty = false;
        true
    }

    fn upload<B>(&mut self, buffers: &MeshBuffers, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        if buffers.is_empty() {
            self.release(backend);
            return;
        }

        let index_count = buffers.indices.len() as u32;
        match self.mesh {
            Some(ref mut mesh) => {
                backend.update_mesh(mesh.handle, buffers);
                mesh.index_count = index_count;
            }
            None => {
                let handle = backend.create_mesh(buffers);
                self.mesh = Some(ChunkMesh {
                    handle,
                    index_count,
                });
            }
        }
    }

    /// Frees the cached mesh. Safe to call any number of times.
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        if let Some(mesh) = self.mesh.take() {
            backend.destroy_mesh(mesh.handle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::{
        rendering::backend::RecordingBackend,
        voxels::{block::BlockDefinition, snapshot::NeighborSnapshot},
    };

    fn registry() -> BlockRegistry {
        let mut registry = BlockRegistry::new();
        registry.register(BlockDefinition::uniform("stone", 0)).unwrap();
        registry
    }

    fn atlas() -> TextureAtlas {
        TextureAtlas::grid(["stone"], 16, 16, 0)
    }

    #[test]
    fn set_then_get_round_trips_and_dirties() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        let mut backend = RecordingBackend::default();
        let oracle = NeighborSnapshot::default();
        chunk.rebuild_mesh(&oracle, &registry(), &atlas(), &mut backend);
        assert!(!chunk.is_dirty());

        for &(x, y, z) in &[(0, 0, 0), (15, 15, 15), (3, 9, 14)] {
            chunk.set_block(x, y, z, 7);
            assert_eq!(chunk.get_block(x, y, z), 7);
            assert!(chunk.is_dirty());
        }
    }

    #[test]
    #[should_panic(expected = "outside chunk")]
    fn out_of_range_access_panics() {
        let chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.get_block(16, 0, 0);
    }

    #[test]
    fn negative_world_coordinates_floor() {
        let (chunk, local) = world_to_chunk_local(-1, 0, 0);
        assert_eq!(chunk, Point3::new(-1, 0, 0));
        assert_eq!(local, Point3::new(15, 0, 0));

        let (chunk, local) = world_to_chunk_local(-16, -17, 16);
        assert_eq!(chunk, Point3::new(-1, -2, 1));
        assert_eq!(local, Point3::new(0, 15, 0));
    }

    #[test]
    fn chunk_keys_round_trip() {
        let position = Point3::new(-3, 0, 12);
        assert_eq!(chunk_key(position), "-3,0,12");
        assert_eq!(parse_chunk_key("-3,0,12"), Some(position));
        assert_eq!(parse_chunk_key("1,2"), None);
        assert_eq!(parse_chunk_key("1,2,3,4"), None);
        assert_eq!(parse_chunk_key("a,b,c"), None);
    }

    #[test]
    fn rebuild_is_a_no_op_when_clean() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(1, 1, 1, 2);
        let mut backend = RecordingBackend::default();
        let oracle = NeighborSnapshot::default();
        chunk.rebuild_mesh(&oracle, &registry(), &atlas(), &mut backend);
        chunk.rebuild_mesh(&oracle, &registry(), &atlas(), &mut backend);
        assert_eq!(backend.created, 1);
        assert_eq!(chunk.mesh().unwrap().index_count, 36);
    }

    #[test]
    fn emptied_chunk_releases_its_mesh() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(1, 1, 1, 2);
        let mut backend = RecordingBackend::default();
        let oracle = NeighborSnapshot::default();
        chunk.rebuild_mesh(&oracle, &registry(), &atlas(), &mut backend);
        assert!(chunk.mesh().is_some());

        chunk.set_block(1, 1, 1, AIR);
        chunk.rebuild_mesh(&oracle, &registry(), &atlas(), &mut backend);
        assert!(chunk.mesh().is_none());
        assert_eq!(backend.destroyed, 1);
        assert!(backend.live.is_empty());
    }

    #[test]
    fn release_is_idempotent() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(0, 0, 0, 2);
        let mut backend = RecordingBackend::default();
        chunk.rebuild_mesh(&NeighborSnapshot::default(), &registry(), &atlas(), &mut backend);
        chunk.release(&mut backend);
        chunk.release(&mut backend);
        assert_eq!(backend.destroyed, 1);
    }

    #[test]
    fn stale_generation_is_refused() {
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(0, 0, 0, 2);
        let stale = chunk.generation();
        chunk.set_block(1, 0, 0, 2);

        let mut backend = RecordingBackend::default();
        let buffers = MeshBuffers::default();
        assert!(!chunk.apply_mesh(stale, &buffers, &mut backend));
        assert!(chunk.is_dirty());
        assert!(chunk.apply_mesh(chunk.generation(), &buffers, &mut backend));
        assert!(!chunk.is_dirty());
    }
}
