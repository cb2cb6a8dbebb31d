//! # Engine State Module
//!
//! The core engine module: voxel data, meshing, rendering, the worker pool,
//! and `EngineState`, which ties them to a moving camera.
//!
//! ## Key Components
//!
//! * `EngineState` - Camera plus world, advanced one frame at a time
//! * `camera_state` - Camera, projection and the scripted flight
//! * `rendering` - Atlas, meshing, culling and GPU backends
//! * `task_management` - Worker threads running mesh jobs
//! * `voxels` - Blocks, chunks, generation, persistence and the streaming world
//!
//! ## Frame Flow
//!
//! 1. The camera advances and hands its view-projection to the backend
//! 2. Occasionally a block is edited below the camera
//! 3. The world runs its streaming tick from the camera position

use std::sync::Arc;

use cgmath::{Point3, Vector3};
use log::info;

use camera_state::CameraState;
use rendering::{atlas::TextureAtlas, backend::RenderBackend};
use voxels::{
    block::{BlockId, BlockRegistry, AIR},
    chunk::{world_to_chunk_local, CHUNK_DIMENSION},
    generation::{ChunkGenerator, FlatWorldGenerator, PerlinWorldGenerator, StressWorldGenerator},
    world::{TickReport, World},
};

use crate::{
    error::EngineError,
    options::{GeneratorKind, Options},
};

pub mod camera_state;
pub mod rendering;
pub mod task_management;
pub mod voxels;

/// Tile names of the built-in atlas, in tile index order.
pub const DEFAULT_TILE_NAMES: [&str; 4] = ["dirt", "grass_side", "grass_top", "stone"];

/// Pixel size of one built-in tile.
const TILE_SIZE: u32 = 16;

/// Frames between two scripted block edits.
const EDIT_INTERVAL: u64 = 30;

/// World generator chosen at runtime.
pub type DynGenerator = Box<dyn ChunkGenerator>;

/// Lays out the built-in tiles.
pub fn default_atlas() -> TextureAtlas {
    TextureAtlas::grid(DEFAULT_TILE_NAMES, TILE_SIZE, TILE_SIZE, 0)
}

/// Builds the generator selected in `options`.
///
/// # Errors
/// [`EngineError::UnknownBlockName`] if the registry lacks a block the generator uses.
pub fn build_generator(options: &Options, registry: &BlockRegistry) -> Result<DynGenerator, EngineError> {
    let generator: DynGenerator = match options.generator {
        GeneratorKind::Flat => Box::new(FlatWorldGenerator::new(options.flat_ground_height, registry)?),
        GeneratorKind::Stress => Box::new(StressWorldGenerator::new(options.seed, registry)?),
        GeneratorKind::Perlin => Box::new(PerlinWorldGenerator::new(options.seed, registry)?),
    };
    Ok(generator)
}

/// The main state container for a streaming session.
///
/// # Examples
///
/// ```no_run
/// use voxel_streaming::{
///     engine_state::{rendering::backend::RecordingBackend, EngineState},
///     options::Options,
/// };
///
/// let mut engine = EngineState::new(&Options::default(), RecordingBackend::new()).unwrap();
/// for _ in 0..60 {
///     engine.frame(1.0 / 60.0);
/// }
/// engine.close().unwrap();
/// ```
pub struct EngineState<B: RenderBackend> {
    /// Scripted camera
    pub camera_state: CameraState,
    world: World<B, DynGenerator>,
    world_origin: Vector3<f32>,
    edit_block: BlockId,
    frame_index: u64,
}

impl<B: RenderBackend> EngineState<B> {
    /// Creates the atlas, registry and generator described by `options` and
    /// opens the world.
    ///
    /// # Errors
    /// Propagates registry and generator construction failures.
    pub fn new(options: &Options, backend: B) -> Result<Self, EngineError> {
        let atlas = Arc::new(default_atlas());
        let registry = Arc::new(BlockRegistry::with_default_blocks(&atlas)?);
        let generator = build_generator(options, &registry)?;
        let edit_block = registry.require("grass")?;

        let [ox, oy, oz] = options.world_origin;
        let far = ((options.render_distance() + 1) * CHUNK_DIMENSION) as f32;
        let camera_state = CameraState::new(
            Point3::new(ox + 8.0, oy + 24.0, oz + 8.0),
            options.render_width,
            options.render_height,
            far,
        );

        info!("Starting with {:?} generator", options.generator);
        let world = World::new(options, registry, atlas, generator, backend);

        Ok(EngineState {
            camera_state,
            world,
            world_origin: Vector3::new(ox, oy, oz),
            edit_block,
            frame_index: 0,
        })
    }

    /// Advances the camera by `dt` seconds and runs one streaming tick.
    pub fn frame(&mut self, dt: f32) -> TickReport {
        self.camera_state.fly(dt);
        let view_projection = self.camera_state.view_projection();
        self.world.backend_mut().set_view_projection(view_projection);

        if self.frame_index % EDIT_INTERVAL == 0 {
            self.edit_below_camera();
        }
        self.frame_index += 1;

        self.world.streaming_tick(self.camera_state.position())
    }

    /// Toggles the block a few voxels below the camera between air and grass.
    fn edit_below_camera(&mut self) {
        let (wx, wy, wz) = self.voxel_below_camera();

        let (position, local) = world_to_chunk_local(wx, wy, wz);
        let current = self
            .world
            .load_or_generate(position)
            .get_block(local.x, local.y, local.z);
        let block = if current == AIR { self.edit_block } else { AIR };
        self.world.set_block(wx, wy, wz, block);
    }

    /// World voxel a few blocks below the camera, in voxel space (origin removed).
    pub fn voxel_below_camera(&self) -> (i32, i32, i32) {
        let position = self.camera_state.position() - self.world_origin;
        (
            position.x.floor() as i32,
            position.y.floor() as i32 - 4,
            position.z.floor() as i32,
        )
    }

    /// Frames advanced so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The streamed world.
    pub fn world(&self) -> &World<B, DynGenerator> {
        &self.world
    }

    /// The streamed world, mutably.
    pub fn world_mut(&mut self) -> &mut World<B, DynGenerator> {
        &mut self.world
    }

    /// Saves and releases the world.
    ///
    /// # Errors
    /// Propagates save failures.
    pub fn close(&mut self) -> Result<(), EngineError> {
        self.world.close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine_state::rendering::backend::RecordingBackend;

    fn test_options(name: &str) -> Options {
        Options {
            render_distance: 1,
            generator: GeneratorKind::Flat,
            flat_ground_height: 20,
            save_path: std::env::temp_dir().join(format!(
                "voxel-streaming-engine-{}-{}.json",
                name,
                std::process::id()
            )),
            ..Options::default()
        }
    }

    #[test]
    fn frames_stream_and_edit() {
        let options = test_options("frames");
        let mut engine = EngineState::new(&options, RecordingBackend::new()).unwrap();

        let first = engine.frame(1.0 / 30.0);
        assert_eq!(first.view_chunk, Point3::new(0, 1, 0));
        assert_eq!(engine.world().chunks().len(), 27);
        for _ in 0..10 {
            engine.frame(1.0 / 30.0);
        }
        assert_eq!(engine.frame_index(), 11);

        engine.close().unwrap();
        assert!(engine.world().persisted().len() >= 27);
        std::fs::remove_file(&options.save_path).unwrap();
    }

    #[test]
    fn edits_land_below_the_camera_with_an_offset_origin() {
        let options = Options {
            world_origin: [100.0, -40.0, 36.0],
            ..test_options("origin")
        };
        let mut engine = EngineState::new(&options, RecordingBackend::new()).unwrap();

        let report = engine.frame(1.0 / 30.0);
        assert_eq!(report.view_chunk, Point3::new(0, 1, 0));

        let (wx, wy, wz) = engine.voxel_below_camera();
        assert!((0..16).contains(&wx) && (0..16).contains(&wz));
        assert!((16..24).contains(&wy));
        let expected = if wy < options.flat_ground_height {
            AIR
        } else {
            engine.edit_block
        };
        assert_eq!(engine.world().get_block(wx, wy, wz), Some(expected));

        engine.close().unwrap();
        std::fs::remove_file(&options.save_path).unwrap();
    }

    #[test]
    fn every_generator_kind_builds() {
        let atlas = default_atlas();
        let registry = BlockRegistry::with_default_blocks(&atlas).unwrap();
        for generator in [GeneratorKind::Flat, GeneratorKind::Stress, GeneratorKind::Perlin] {
            let options = Options {
                generator,
                ..Options::default()
            };
            assert!(build_generator(&options, &registry).is_ok());
        }
    }
}
