use cgmath::{Point3, Vector3};

use crate::engine_state::voxels::block::block_side::BlockSide;

/// Which edge of the atlas tile a quad corner samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UvCorner {
    /// `(u0, v0)`
    LowLow,
    /// `(u1, v0)`
    HighLow,
    /// `(u1, v1)`
    HighHigh,
    /// `(u0, v1)`
    LowHigh,
}

impl UvCorner {
    /// Picks the matching coordinates out of an `[u0, v0, u1, v1]` rectangle.
    pub fn pick(self, rect: [f32; 4]) -> [f32; 2] {
        let [u0, v0, u1, v1] = rect;
        match self {
            UvCorner::LowLow => [u0, v0],
            UvCorner::HighLow => [u1, v0],
            UvCorner::HighHigh => [u1, v1],
            UvCorner::LowHigh => [u0, v1],
        }
    }
}

/// Represents a single unit quad on one side of a voxel.
///
/// The four corners are stored in emission order. Seen from outside the solid
/// they run counter-clockwise, so the fixed index pattern `0 1 2 2 3 0` yields
/// two front-facing triangles.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Face {
    /// Corner positions in chunk-local coordinates
    pub corners: [Point3<i32>; 4],
    /// Tile corner sampled by each position
    pub uv_corners: [UvCorner; 4],
    /// Which side of the block this face represents
    pub block_side: BlockSide,
}

/// Corner offsets from the voxel origin for each side, in emission order.
const CORNER_OFFSETS: [[[i32; 3]; 4]; 6] = [
    // NORTH
    [[1, 0, 0], [0, 0, 0], [0, 1, 0], [1, 1, 0]],
    // SOUTH
    [[0, 0, 1], [1, 0, 1], [1, 1, 1], [0, 1, 1]],
    // BOTTOM
    [[0, 0, 0], [1, 0, 0], [1, 0, 1], [0, 0, 1]],
    // TOP
    [[0, 1, 1], [1, 1, 1], [1, 1, 0], [0, 1, 0]],
    // WEST
    [[0, 0, 0], [0, 0, 1], [0, 1, 1], [0, 1, 0]],
    // EAST
    [[1, 0, 1], [1, 0, 0], [1, 1, 0], [1, 1, 1]],
];

const UV_LAYOUTS: [[UvCorner; 4]; 6] = {
    use UvCorner::*;
    [
        [HighLow, LowLow, LowHigh, HighHigh],
        [LowLow, HighLow, HighHigh, LowHigh],
        [LowLow, HighLow, HighHigh, LowHigh],
        [LowLow, HighLow, HighHigh, LowHigh],
        [HighLow, LowLow, LowHigh, HighHigh],
        [HighLow, LowLow, LowHigh, HighHigh],
    ]
};

impl Face {
    /// Creates the face on `block_side` of the voxel at local `(i, j, k)`.
    ///
    /// # Arguments
    /// * `i`, `j`, `k` - The coordinates of the voxel in chunk space
    /// * `block_side` - Which side of the block this face represents
    pub fn new(i: i32, j: i32, k: i32, block_side: BlockSide) -> Self {
        let origin = Point3::new(i, j, k);
        let offsets = CORNER_OFFSETS[block_side as usize];
        Face {
            corners: offsets.map(|[x, y, z]| origin + Vector3::new(x, y, z)),
            uv_corners: UV_LAYOUTS[block_side as usize],
            block_side,
        }
    }

    /// Indices of the two triangles covering this face, given the index of its
    /// first vertex.
    pub fn indices(base: u32) -> [u32; 6] {
        [base, base + 1, base + 2, base + 2, base + 3, base]
    }
}
