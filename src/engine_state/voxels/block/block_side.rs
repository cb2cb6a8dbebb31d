//! # Block Side Module
//!
//! This module defines the six faces of a voxel block and the unit offsets
//! that lead from a voxel to the neighbour lying beyond each face.

use cgmath::Vector3;

/// Represents the six possible faces of a voxel block.
///
/// The discriminants are stable and index per-face tables such as
/// [`BlockDefinition::face_tiles`](super::BlockDefinition).
///
/// The order is: [NORTH, SOUTH, BOTTOM, TOP, WEST, EAST]
#[allow(clippy::upper_case_acronyms)]
#[derive(PartialEq, Eq, Hash, Copy, Clone, Debug)]
pub enum BlockSide {
    /// The north face (facing negative Z)
    NORTH = 0,

    /// The south face (facing positive Z)
    SOUTH = 1,

    /// The bottom face (facing negative Y)
    BOTTOM = 2,

    /// The top face (facing positive Y)
    TOP = 3,

    /// The west face (facing negative X)
    WEST = 4,

    /// The east face (facing positive X)
    EAST = 5,
}

impl BlockSide {
    /// Returns an array containing all six block faces in a consistent order.
    ///
    /// The mesher walks faces in exactly this order, which keeps its output
    /// deterministic for identical input.
    pub fn all() -> [BlockSide; 6] {
        [
            BlockSide::NORTH,
            BlockSide::SOUTH,
            BlockSide::BOTTOM,
            BlockSide::TOP,
            BlockSide::WEST,
            BlockSide::EAST,
        ]
    }

    /// Integer step from a voxel to the neighbour beyond this face.
    pub fn offset(self) -> Vector3<i32> {
        match self {
            BlockSide::NORTH => Vector3::new(0, 0, -1),
            BlockSide::SOUTH => Vector3::new(0, 0, 1),
            BlockSide::BOTTOM => Vector3::new(0, -1, 0),
            BlockSide::TOP => Vector3::new(0, 1, 0),
            BlockSide::WEST => Vector3::new(-1, 0, 0),
            BlockSide::EAST => Vector3::new(1, 0, 0),
        }
    }

    /// Outward unit normal of this face.
    pub fn normal(self) -> [f32; 3] {
        let offset = self.offset();
        [offset.x as f32, offset.y as f32, offset.z as f32]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discriminants_follow_iteration_order() {
        for (i, side) in BlockSide::all().into_iter().enumerate() {
            assert_eq!(side as usize, i);
        }
    }

    #[test]
    fn opposite_faces_have_opposite_offsets() {
        assert_eq!(BlockSide::NORTH.offset(), -BlockSide::SOUTH.offset());
        assert_eq!(BlockSide::BOTTOM.offset(), -BlockSide::TOP.offset());
        assert_eq!(BlockSide::WEST.offset(), -BlockSide::EAST.offset());
    }
}
