//! # World Generation
//!
//! A [`ChunkGenerator`] produces the voxels of a chunk that has never been
//! saved. Generators are only ever called from the main thread, once per
//! coordinate per residency, so they may keep mutable state such as an RNG.
//!
//! Provided strategies:
//! - [`FlatWorldGenerator`]: solid ground below a fixed world height
//! - [`StressWorldGenerator`]: half the chunks empty, the rest packed with random blocks
//! - [`PerlinWorldGenerator`]: thresholded 3D Perlin noise

use noise::{NoiseFn, Perlin};

use super::{
    block::{BlockId, BlockRegistry, AIR},
    chunk::{chunk_origin, Chunk, ChunkCoordinate, CHUNK_DIMENSION},
};
use crate::error::EngineError;

/// Noise values above this are solid.
pub const PERLIN_POSITIVE_THRESHOLD: f64 = 0.2;
/// Noise values below this are solid.
pub const PERLIN_NEGATIVE_THRESHOLD: f64 = -0.2;
/// World-to-noise space scale.
pub const PERLIN_SCALE_FACTOR: f64 = 0.02;

/// Source of voxels for chunks without saved data.
pub trait ChunkGenerator {
    /// Produces a fully populated chunk at `position`.
    fn generate_chunk(&mut self, position: ChunkCoordinate) -> Chunk;
}

impl<G: ChunkGenerator + ?Sized> ChunkGenerator for Box<G> {
    fn generate_chunk(&mut self, position: ChunkCoordinate) -> Chunk {
        (**self).generate_chunk(position)
    }
}

/// Calls `fill` for every voxel of a fresh chunk with its world position.
fn fill_chunk<F>(position: ChunkCoordinate, mut fill: F) -> Chunk
where
    F: FnMut(i32, i32, i32) -> BlockId,
{
    let origin = chunk_origin(position);
    let mut chunk = Chunk::empty(position);
    let voxels = chunk.voxel_data_mut();

    let mut index = 0;
    for k in 0..CHUNK_DIMENSION {
        for j in 0..CHUNK_DIMENSION {
            for i in 0..CHUNK_DIMENSION {
                voxels[index] = fill(origin.x + i, origin.y + j, origin.z + k);
                index += 1;
            }
        }
    }

    chunk
}

/// Everything below `ground_height` (world Y) is one block type.
#[derive(Debug, Clone)]
pub struct FlatWorldGenerator {
    ground_height: i32,
    ground: BlockId,
}

impl FlatWorldGenerator {
    /// Creates a generator filling with `stone`.
    ///
    /// # Errors
    /// [`EngineError::UnknownBlockName`] if `stone` is not registered.
    pub fn new(ground_height: i32, registry: &BlockRegistry) -> Result<Self, EngineError> {
        Ok(Self::with_block(ground_height, registry.require("stone")?))
    }

    /// Creates a generator filling with an arbitrary block.
    pub fn with_block(ground_height: i32, ground: BlockId) -> Self {
        FlatWorldGenerator {
            ground_height,
            ground,
        }
    }
}

impl ChunkGenerator for FlatWorldGenerator {
    fn generate_chunk(&mut self, position: ChunkCoordinate) -> Chunk {
        let (ground_height, ground) = (self.ground_height, self.ground);
        fill_chunk(position, |_, wy, _| {
            if wy < ground_height {
                ground
            } else {
                AIR
            }
        })
    }
}

/// Load generator: each chunk is either left empty or completely filled with
/// blocks drawn from a palette, decided by a coin flip.
///
/// Seeded, so a run can be reproduced.
#[derive(Debug, Clone)]
pub struct StressWorldGenerator {
    rng: fastrand::Rng,
    palette: Vec<BlockId>,
}

impl StressWorldGenerator {
    /// Creates a generator drawing from stone, stone, dirt and grass.
    ///
    /// # Errors
    /// [`EngineError::UnknownBlockName`] if one of the blocks is not registered.
    pub fn new(seed: u64, registry: &BlockRegistry) -> Result<Self, EngineError> {
        let stone = registry.require("stone")?;
        let palette = vec![
            stone,
            stone,
            registry.require("dirt")?,
            registry.require("grass")?,
        ];
        Ok(Self::with_palette(seed, palette))
    }

    /// Creates a generator drawing uniformly from `palette`.
    ///
    /// # Panics
    /// Panics if `palette` is empty.
    pub fn with_palette(seed: u64, palette: Vec<BlockId>) -> Self {
        assert!(!palette.is_empty(), "stress palette must not be empty");
        StressWorldGenerator {
            rng: fastrand::Rng::with_seed(seed),
            palette,
        }
    }
}

impl ChunkGenerator for StressWorldGenerator {
    fn generate_chunk(&mut self, position: ChunkCoordinate) -> Chunk {
        if self.rng.bool() {
            return Chunk::empty(position);
        }

        let StressWorldGenerator { rng, palette } = self;
        fill_chunk(position, |_, _, _| palette[rng.usize(..palette.len())])
    }
}

/// Generates terrain by thresholding 3D Perlin noise sampled in world space.
///
/// Voxels where the noise strays far from zero are solid, which yields
/// floating, cave-riddled masses separated by open air.
pub struct PerlinWorldGenerator {
    perlin: Perlin,
    rng: fastrand::Rng,
    palette: Vec<BlockId>,
}

impl PerlinWorldGenerator {
    /// Creates a generator using stone, dirt and grass for solid voxels.
    ///
    /// # Errors
    /// [`EngineError::UnknownBlockName`] if one of the blocks is not registered.
    pub fn new(seed: u64, registry: &BlockRegistry) -> Result<Self, EngineError> {
        let palette = ["stone", "dirt", "grass"]
            .into_iter()
            .map(|name| registry.require(name))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(PerlinWorldGenerator {
            perlin: Perlin::new(seed as u32),
            rng: fastrand::Rng::with_seed(seed),
            palette,
        })
    }

    /// Converts world block coordinates to noise space.
    fn to_perlin_pos(wx: i32, wy: i32, wz: i32) -> [f64; 3] {
        [
            wx as f64 * PERLIN_SCALE_FACTOR,
            wy as f64 * PERLIN_SCALE_FACTOR,
            wz as f64 * PERLIN_SCALE_FACTOR,
        ]
    }
}

impl ChunkGenerator for PerlinWorldGenerator {
    fn generate_chunk(&mut self, position: ChunkCoordinate) -> Chunk {
        let PerlinWorldGenerator {
            perlin,
            rng,
            palette,
        } = self;

        fill_chunk(position, |wx, wy, wz| {
            let sample = perlin.get(Self::to_perlin_pos(wx, wy, wz));
            if (PERLIN_NEGATIVE_THRESHOLD..=PERLIN_POSITIVE_THRESHOLD).contains(&sample) {
                AIR
            } else {
                palette[rng.usize(..palette.len())]
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use cgmath::Point3;

    use super::*;
    use crate::engine_state::rendering::atlas::TextureAtlas;

    fn registry() -> BlockRegistry {
        let atlas = TextureAtlas::grid(["dirt", "grass_side", "grass_top", "stone"], 16, 16, 0);
        BlockRegistry::with_default_blocks(&atlas).unwrap()
    }

    #[test]
    fn flat_fills_below_ground_height() {
        let registry = registry();
        let stone = registry.require("stone").unwrap();
        let mut generator = FlatWorldGenerator::new(8, &registry).unwrap();

        let chunk = generator.generate_chunk(Point3::new(0, 0, 0));
        assert_eq!(chunk.get_block(3, 7, 3), stone);
        assert_eq!(chunk.get_block(3, 8, 3), AIR);

        let below = generator.generate_chunk(Point3::new(5, -1, -2));
        assert!(below.voxel_data().iter().all(|&block| block == stone));
        let above = generator.generate_chunk(Point3::new(0, 1, 0));
        assert!(above.voxel_data().iter().all(|&block| block == AIR));
    }

    #[test]
    fn stress_chunks_are_empty_or_full() {
        let registry = registry();
        let mut generator = StressWorldGenerator::new(7, &registry).unwrap();
        let mut empty = 0;
        let mut full = 0;
        for x in 0..40 {
            let chunk = generator.generate_chunk(Point3::new(x, 0, 0));
            if chunk.voxel_data().iter().all(|&block| block == AIR) {
                empty += 1;
            } else {
                assert!(chunk.voxel_data().iter().all(|&block| block != AIR));
                full += 1;
            }
        }
        assert!(empty > 0 && full > 0);
    }

    #[test]
    fn stress_is_reproducible_from_its_seed() {
        let registry = registry();
        let mut a = StressWorldGenerator::new(99, &registry).unwrap();
        let mut b = StressWorldGenerator::new(99, &registry).unwrap();
        for x in 0..4 {
            let position = Point3::new(x, 0, 0);
            assert_eq!(
                a.generate_chunk(position).voxel_data(),
                b.generate_chunk(position).voxel_data()
            );
        }
    }

    #[test]
    fn perlin_produces_a_mix_of_air_and_solid() {
        let registry = registry();
        let mut generator = PerlinWorldGenerator::new(0, &registry).unwrap();
        let (mut air, mut solid) = (0, 0);
        for i in 0..10 {
            let chunk = generator.generate_chunk(Point3::new(i * 7, i * 3, -i * 5));
            for &block in chunk.voxel_data() {
                if block == AIR {
                    air += 1;
                } else {
                    solid += 1;
                }
            }
        }
        assert!(air > 0);
        assert!(solid > 0);
    }

    #[test]
    fn generators_require_their_blocks() {
        let empty = BlockRegistry::new();
        assert!(FlatWorldGenerator::new(8, &empty).is_err());
        assert!(StressWorldGenerator::new(0, &empty).is_err());
        assert!(PerlinWorldGenerator::new(0, &empty).is_err());
    }
}
