//! # Neighbour Snapshots
//!
//! Background mesh jobs must not touch live chunk storage. Before a job is
//! submitted, the voxels it needs (the target chunk and whichever of its six
//! face neighbours are resident) are copied into a [`NeighborSnapshot`]. The
//! mesher then answers "what block is at this world position" through the
//! [`OccupancyOracle`] trait, so the same code runs against live or copied data.

use std::collections::HashMap;

use cgmath::Point3;

use super::{
    block::{block_side::BlockSide, BlockId, AIR},
    chunk::{world_to_chunk_local, voxel_index, ChunkCoordinate, ChunkMap},
};

/// Answers block queries by world voxel position.
pub trait OccupancyOracle {
    /// Block at a world voxel position. Anything not covered reads as [`AIR`].
    fn block_at(&self, wx: i32, wy: i32, wz: i32) -> BlockId;

    /// Whether the world voxel position holds a non-air block.
    fn occupied_at(&self, wx: i32, wy: i32, wz: i32) -> bool {
        self.block_at(wx, wy, wz) != AIR
    }
}

/// Immutable copy of a chunk and its resident face neighbours.
#[derive(Debug, Default, Clone)]
pub struct NeighborSnapshot {
    chunks: HashMap<ChunkCoordinate, Box<[BlockId]>>,
}

impl NeighborSnapshot {
    /// Copies the voxels of `coordinate` and of each of its six face neighbours
    /// that is present in `chunks`.
    ///
    /// Missing chunks are simply left out and later read as air.
    pub fn capture(chunks: &ChunkMap, coordinate: ChunkCoordinate) -> Self {
        let mut snapshot = Self::default();

        let positions = std::iter::once(coordinate)
            .chain(BlockSide::all().into_iter().map(|side| coordinate + side.offset()));

        for position in positions {
            if let Some(chunk) = chunks.get(&position) {
                snapshot.insert(position, chunk.voxel_data());
            }
        }

        snapshot
    }

    /// Adds a copy of one chunk's voxels.
    pub fn insert(&mut self, coordinate: ChunkCoordinate, voxels: &[BlockId]) {
        self.chunks.insert(coordinate, voxels.into());
    }

    /// Voxels copied for `coordinate`, if it was resident at capture time.
    pub fn voxels(&self, coordinate: ChunkCoordinate) -> Option<&[BlockId]> {
        self.chunks.get(&coordinate).map(|voxels| &voxels[..])
    }

    /// Number of chunks captured.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether nothing was captured.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

impl OccupancyOracle for NeighborSnapshot {
    fn block_at(&self, wx: i32, wy: i32, wz: i32) -> BlockId {
        let (chunk, local) = world_to_chunk_local(wx, wy, wz);
        self.chunks
            .get(&chunk)
            .map_or(AIR, |voxels| voxels[voxel_index(local.x, local.y, local.z)])
    }
}

impl OccupancyOracle for ChunkMap {
    fn block_at(&self, wx: i32, wy: i32, wz: i32) -> BlockId {
        let (chunk, local) = world_to_chunk_local(wx, wy, wz);
        self.get(&chunk)
            .map_or(AIR, |chunk| chunk.get_block(local.x, local.y, local.z))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::voxels::chunk::Chunk;

    fn map_with(positions: &[Point3<i32>]) -> ChunkMap {
        positions
            .iter()
            .map(|&position| {
                let mut chunk = Chunk::empty(position);
                chunk.set_block(0, 0, 0, 5);
                (position, chunk)
            })
            .collect()
    }

    #[test]
    fn captures_only_resident_face_neighbours() {
        let chunks = map_with(&[
            Point3::new(0, 0, 0),
            Point3::new(1, 0, 0),
            Point3::new(0, -1, 0),
            Point3::new(1, 1, 0),
        ]);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));
        assert_eq!(snapshot.len(), 3);
        assert!(snapshot.voxels(Point3::new(1, 1, 0)).is_none());
    }

    #[test]
    fn absent_chunks_read_as_air() {
        let chunks = map_with(&[Point3::new(0, 0, 0)]);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));
        assert_eq!(snapshot.block_at(0, 0, 0), 5);
        assert_eq!(snapshot.block_at(16, 0, 0), AIR);
        assert!(!snapshot.occupied_at(-16, 0, 0));
    }

    #[test]
    fn snapshot_is_independent_of_later_edits() {
        let mut chunks = map_with(&[Point3::new(0, 0, 0)]);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(0, 0, 0));
        chunks
            .get_mut(&Point3::new(0, 0, 0))
            .unwrap()
            .set_block(0, 0, 0, AIR);
        assert_eq!(snapshot.block_at(0, 0, 0), 5);
        assert_eq!(chunks.block_at(0, 0, 0), AIR);
    }

    #[test]
    fn negative_positions_resolve_to_the_chunk_below_zero() {
        let chunks = map_with(&[Point3::new(-1, -1, -1)]);
        let snapshot = NeighborSnapshot::capture(&chunks, Point3::new(-1, -1, -1));
        assert_eq!(snapshot.block_at(-16, -16, -16), 5);
        assert_eq!(snapshot.block_at(-1, -1, -1), AIR);
    }
}
