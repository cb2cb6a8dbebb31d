//! Mesh generation for voxel rendering.
//!
//! This module turns the voxels of one chunk into GPU-ready [`MeshBuffers`]
//! using per-voxel face culling: every side of a solid voxel whose neighbour is
//! not occluding gets one quad. Coplanar faces are not merged.
//!
//! # Architecture
//! - [`mesh_chunk`]: Pure meshing function, safe to run on any thread
//! - [`Face`]: Fixed 4-vertex layout of one side of a unit voxel
//! - [`MeshBuffers`]: Parallel position/normal/texcoord/color arrays plus indices
//!
//! # Neighbour Queries
//! Neighbour lookups go through an [`OccupancyOracle`] by world position, so a
//! voxel on the chunk boundary sees into adjacent chunks when they were
//! resident at capture time and sees air otherwise.

mod mesh;

pub use mesh::*;

use crate::engine_state::{
    rendering::atlas::TextureAtlas,
    voxels::{
        block::{block_side::BlockSide, BlockId, BlockRegistry},
        chunk::{chunk_origin, voxel_index, ChunkCoordinate, CHUNK_DIMENSION},
        snapshot::OccupancyOracle,
    },
};

/// Builds the face-culled mesh of one chunk.
///
/// Output is fully determined by the inputs: voxels are visited z-outermost,
/// x-innermost and faces in [`BlockSide::all`] order.
///
/// # Arguments
/// * `position` - Chunk coordinate, used to turn local positions into world
///   positions for neighbour queries
/// * `voxels` - The chunk's `CHUNK_SIZE` block ids
/// * `oracle` - Answers what lies beyond each face
/// * `registry` - Tiles, tints and opacity per block id
/// * `atlas` - Maps tiles to UV rectangles
///
/// # Returns
/// Chunk-local geometry. Air and unregistered ids contribute nothing.
pub fn mesh_chunk<O>(
    position: ChunkCoordinate,
    voxels: &[BlockId],
    oracle: &O,
    registry: &BlockRegistry,
    atlas: &TextureAtlas,
) -> MeshBuffers
where
    O: OccupancyOracle + ?Sized,
{
    let origin = chunk_origin(position);
    let mut buffers = MeshBuffers::new();

    for k in 0..CHUNK_DIMENSION {
        for j in 0..CHUNK_DIMENSION {
            for i in 0..CHUNK_DIMENSION {
                let block = voxels[voxel_index(i as usize, j as usize, k as usize)];
                if registry.is_air(block) {
                    continue;
                }
                let Some(definition) = registry.get(block) else {
                    continue;
                };

                for side in BlockSide::all() {
                    let offset = side.offset();
                    let neighbour = oracle.block_at(
                        origin.x + i + offset.x,
                        origin.y + j + offset.y,
                        origin.z + k + offset.z,
                    );
                    if registry.occludes(neighbour) {
                        continue;
                    }

                    let uv_rect = atlas.uv_rect(definition.tile_for_face(side));
                    buffers.push_face(&Face::new(i, j, k, side), uv_rect, definition.tint);
                }
            }
        }
    }

    buffers
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::voxels::{
        block::{BlockDefinition, AIR},
        chunk::{Chunk, ChunkMap},
        snapshot::NeighborSnapshot,
    };

    fn registry() -> (BlockRegistry, BlockId) {
        let mut registry = BlockRegistry::new();
        let stone = registry
            .register(BlockDefinition::new("stone", [0, 1, 2, 3, 0, 1]).with_tint([0.5, 0.5, 0.5, 1.0]))
            .unwrap();
        (registry, stone)
    }

    fn atlas() -> TextureAtlas {
        TextureAtlas::grid(["a", "b", "c", "d"], 16, 16, 0)
    }

    fn single_chunk(chunk: Chunk) -> ChunkMap {
        std::iter::once((chunk.position, chunk)).collect()
    }

    #[test]
    fn isolated_voxel_has_six_faces() {
        let (registry, stone) = registry();
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(5, 5, 5, stone);
        let chunks = single_chunk(chunk);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));

        let buffers = mesh_chunk(
            Point3::new(0, 0, 0),
            snapshot.voxels(Point3::new(0, 0, 0)).unwrap(),
            &snapshot,
            &registry,
            &atlas(),
        );

        assert_eq!(buffers.vertex_count(), 24);
        assert_eq!(buffers.indices.len(), 36);
        assert_eq!(buffers.normals.len(), 24);
        assert_eq!(buffers.texcoords.len(), 24);
        assert!(buffers.colors.iter().all(|&c| c == [0.5, 0.5, 0.5, 1.0]));
        for side in BlockSide::all() {
            assert_eq!(buffers.faces_on(side), 1);
        }
    }

    #[test]
    fn fully_enclosed_voxel_has_no_faces() {
        let (registry, stone) = registry();
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        let center = Point3::new(5i32, 5, 5);
        chunk.set_block(5, 5, 5, stone);
        for side in BlockSide::all() {
            let p = center + side.offset();
            chunk.set_block(p.x as usize, p.y as usize, p.z as usize, stone);
        }
        let chunks = single_chunk(chunk);

        let mut centre_only = vec![AIR; chunks[&Point3::new(0, 0, 0)].voxel_data().len()];
        centre_only[voxel_index(5, 5, 5)] = stone;
        let buffers = mesh_chunk(Point3::new(0, 0, 0), &centre_only, &chunks, &registry, &atlas());
        assert!(buffers.is_empty());
    }

    #[test]
    fn boundary_faces_consult_the_neighbour_chunk() {
        let (registry, stone) = registry();
        let mut here = Chunk::empty(Point3::new(0, 0, 0));
        here.set_block(15, 0, 0, stone);
        let mut east = Chunk::empty(Point3::new(1, 0, 0));
        east.set_block(0, 0, 0, stone);

        let mut chunks = single_chunk(here);
        let alone = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));
        chunks.insert(east.position, east);
        let together = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));

        let voxels = alone.voxels(Point3::new(0, 0, 0)).unwrap();
        let without = mesh_chunk(Point3::new(0, 0, 0), voxels, &alone, &registry, &atlas());
        let with = mesh_chunk(Point3::new(0, 0, 0), voxels, &together, &registry, &atlas());
        assert_eq!(without.faces_on(BlockSide::EAST), 1);
        assert_eq!(with.faces_on(BlockSide::EAST), 0);
        assert_eq!(with.face_count(), 5);
    }

    #[test]
    fn unknown_ids_are_skipped() {
        let (registry, _) = registry();
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(1, 1, 1, 999);
        let chunks = single_chunk(chunk);
        let voxels = chunks[&Point3::new(0, 0, 0)].voxel_data().to_vec();
        let buffers = mesh_chunk(Point3::new(0, 0, 0), &voxels, &chunks, &registry, &atlas());
        assert!(buffers.is_empty());
    }

    #[test]
    fn meshing_is_deterministic() {
        let (registry, stone) = registry();
        let mut chunk = Chunk::empty(Point3::new(-2, 3, 1));
        for n in 0..200 {
            chunk.set_block(n % 16, (n * 7) % 16, (n * 13) % 16, stone);
        }
        let chunks = single_chunk(chunk);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(-2, 3, 1));
        let voxels = snapshot.voxels(Point3::new(-2, 3, 1)).unwrap();

        let first = mesh_chunk(Point3::new(-2, 3, 1), voxels, &snapshot, &registry, &atlas());
        let second = mesh_chunk(Point3::new(-2, 3, 1), voxels, &snapshot, &registry, &atlas());
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn faces_sample_their_own_tile() {
        let (registry, stone) = registry();
        let atlas = atlas();
        let mut chunk = Chunk::empty(Point3::new(0, 0, 0));
        chunk.set_block(0, 0, 0, stone);
        let chunks = single_chunk(chunk);
        let voxels = chunks[&Point3::new(0, 0, 0)].voxel_data().to_vec();
        let buffers = mesh_chunk(Point3::new(0, 0, 0), &voxels, &chunks, &registry, &atlas);

        // TOP is the fourth face emitted and uses tile 3.
        let [u0, v0, u1, v1] = atlas.uv_rect(3);
        let top = &buffers.texcoords[12..16];
        assert_eq!(top, &[[u0, v0], [u1, v0], [u1, v1], [u0, v1]]);
    }
}
