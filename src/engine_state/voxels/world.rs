//! # World Module
//!
//! This module provides the `World` struct, which owns every resident chunk
//! and drives chunk streaming around a moving viewpoint.
//!
//! ## Architecture
//!
//! The world uses a sparse storage approach: only chunks within the render
//! distance of the viewpoint are resident. Chunks leaving that cube are copied
//! into [`PersistedWorldData`] and dropped; chunks entering it are restored
//! from there or produced by the [`ChunkGenerator`].
//!
//! Voxel data is loaded synchronously. Meshing is not: dirty chunks wait in a
//! deduplicated queue of coordinates, and only when a worker slot is free is a
//! chunk snapshotted together with its resident neighbours and handed to the
//! worker pool. Finished meshes are applied on the main thread at a bounded
//! rate per tick.
//!
//! ## Per-tick order
//!
//! 1. Work out the viewpoint chunk
//! 2. Load every chunk in the cube around it
//! 3. Unload every resident chunk outside the cube
//! 4. Submit mesh jobs for queued dirty chunks, as far as worker slots allow
//! 5. Apply up to `max_mesh_uploads_per_frame` finished meshes
//! 6. Draw the visible chunks
//! 7. Free the GPU meshes of chunks unloaded in step 3

use std::{
    collections::{HashSet, VecDeque},
    sync::Arc,
};

use cgmath::{Point3, Vector3};
use log::{debug, info, warn};

use super::{
    block::{block_side::BlockSide, BlockId, BlockRegistry},
    chunk::{world_to_chunk_local, Chunk, ChunkCoordinate, ChunkMap, CHUNK_DIMENSION},
    generation::ChunkGenerator,
    persistence::PersistedWorldData,
    snapshot::NeighborSnapshot,
};
use crate::{
    engine_state::{
        rendering::{
            atlas::TextureAtlas,
            backend::RenderBackend,
            chunk_renderer::{FrustumChunkRenderer, RenderStats},
            tasks::chunk_mesh_generation_task::ChunkMeshGenerationTask,
        },
        task_management::TaskManager,
    },
    error::EngineError,
    options::Options,
};

/// What one call to [`World::streaming_tick`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    /// Chunk containing the viewpoint
    pub view_chunk: Point3<i32>,
    /// Chunks that became resident
    pub loaded: usize,
    /// Chunks that left residency
    pub unloaded: usize,
    /// Mesh jobs handed to the pipeline
    pub submitted: usize,
    /// Mesh results installed on chunks
    pub applied: usize,
    /// Mesh results dropped as stale or for non-resident chunks
    pub discarded: usize,
    /// Frustum culling counters
    pub render: RenderStats,
}

impl Default for TickReport {
    fn default() -> Self {
        TickReport {
            view_chunk: Point3::new(0, 0, 0),
            loaded: 0,
            unloaded: 0,
            submitted: 0,
            applied: 0,
            discarded: 0,
            render: RenderStats::default(),
        }
    }
}

/// Represents a streamed voxel world composed of chunks.
///
/// # Type Parameters
/// * `B` - GPU facade receiving meshes and draws
/// * `G` - Terrain source for chunks without saved data
pub struct World<B: RenderBackend, G: ChunkGenerator> {
    chunks: ChunkMap,
    persisted: PersistedWorldData,
    generator: G,
    backend: B,
    registry: Arc<BlockRegistry>,
    atlas: Arc<TextureAtlas>,
    task_manager: TaskManager<ChunkMeshGenerationTask>,
    renderer: FrustumChunkRenderer,
    pending_remesh: HashSet<ChunkCoordinate>,
    remesh_queue: VecDeque<ChunkCoordinate>,
    pending_release: Vec<Chunk>,
    render_distance: i32,
    max_mesh_uploads_per_frame: usize,
    generated_chunks: usize,
    closed: bool,
}

impl<B: RenderBackend, G: ChunkGenerator> World<B, G> {
    /// Opens a world, reading saved chunks from `options.save_path`.
    ///
    /// # Arguments
    /// * `options` - Render distance, upload budget, worker count, save path and world origin
    /// * `registry` - Block definitions shared with the mesh workers
    /// * `atlas` - Tile layout shared with the mesh workers
    /// * `generator` - Produces chunks that have never been saved
    /// * `backend` - Receives meshes and draws
    pub fn new(
        options: &Options,
        registry: Arc<BlockRegistry>,
        atlas: Arc<TextureAtlas>,
        generator: G,
        backend: B,
    ) -> Self {
        let [ox, oy, oz] = options.world_origin;
        info!(
            "Opening world: render distance {}, {} uploads per frame, save file {}",
            options.render_distance(),
            options.max_mesh_uploads_per_frame,
            options.save_path.display()
        );

        World {
            chunks: ChunkMap::new(),
            persisted: PersistedWorldData::open(&options.save_path),
            generator,
            backend,
            registry,
            atlas,
            task_manager: TaskManager::new(options.worker_count()),
            renderer: FrustumChunkRenderer::new(Vector3::new(ox, oy, oz)),
            pending_remesh: HashSet::new(),
            remesh_queue: VecDeque::new(),
            pending_release: Vec::new(),
            render_distance: options.render_distance(),
            max_mesh_uploads_per_frame: options.max_mesh_uploads_per_frame,
            generated_chunks: 0,
            closed: false,
        }
    }

    /// Returns the chunk at `position`, loading or generating it first if it
    /// is not resident.
    ///
    /// A newly resident chunk is queued for meshing, as are its resident face
    /// neighbours.
    pub fn load_or_generate(&mut self, position: ChunkCoordinate) -> &Chunk {
        if self.make_resident(position) {
            self.submit_pending_meshes();
        }
        self.resident(position)
    }

    /// Inserts the chunk into the resident map if needed.
    ///
    /// # Returns
    /// `true` if the chunk was not resident before.
    fn make_resident(&mut self, position: ChunkCoordinate) -> bool {
        if self.chunks.contains_key(&position) {
            return false;
        }

        let chunk = match self.persisted.get(position) {
            Some(voxels) => Chunk::from_voxels(position, voxels.to_vec()),
            None => {
                self.generated_chunks += 1;
                let mut chunk = self.generator.generate_chunk(position);
                chunk.position = position;
                chunk.mark_dirty();
                chunk
            }
        };

        self.chunks.insert(position, chunk);
        self.queue_remesh(position);

        // Faces the neighbours emitted toward this previously empty space may now be hidden.
        for side in BlockSide::all() {
            let neighbour = position + side.offset();
            if let Some(chunk) = self.chunks.get_mut(&neighbour) {
                chunk.mark_dirty();
                self.queue_remesh(neighbour);
            }
        }

        true
    }

    fn resident(&self, position: ChunkCoordinate) -> &Chunk {
        match self.chunks.get(&position) {
            Some(chunk) => chunk,
            None => unreachable!("chunk {:?} was just made resident", position),
        }
    }

    /// Removes a chunk from residency and saves its voxels.
    ///
    /// The chunk's GPU mesh is freed at the end of the current tick, or
    /// immediately when called outside of one.
    ///
    /// # Returns
    /// `false` if the chunk was not resident.
    pub fn unload(&mut self, position: ChunkCoordinate) -> bool {
        let unloaded = self.stage_unload(position);
        self.release_pending();
        unloaded
    }

    fn stage_unload(&mut self, position: ChunkCoordinate) -> bool {
        let Some(chunk) = self.chunks.remove(&position) else {
            return false;
        };

        self.persisted.insert(position, chunk.voxel_data());
        self.pending_remesh.remove(&position);
        self.pending_release.push(chunk);
        true
    }

    fn release_pending(&mut self) {
        for mut chunk in self.pending_release.drain(..) {
            chunk.release(&mut self.backend);
        }
    }

    /// Sets a block by world position.
    ///
    /// The owning chunk is loaded if needed and re-meshed. A resident
    /// neighbour sharing the face the edited voxel touches is re-meshed as well.
    pub fn set_block(&mut self, wx: i32, wy: i32, wz: i32, block: BlockId) {
        if self.closed {
            warn!("Ignoring block edit at ({}, {}, {}) on a closed world", wx, wy, wz);
            return;
        }

        let (position, local) = world_to_chunk_local(wx, wy, wz);
        self.make_resident(position);
        if let Some(chunk) = self.chunks.get_mut(&position) {
            chunk.set_block(local.x, local.y, local.z, block);
        }
        self.queue_remesh(position);

        let last = (CHUNK_DIMENSION - 1) as usize;
        let local = [local.x, local.y, local.z];
        for (axis, &coordinate) in local.iter().enumerate() {
            let step = if coordinate == 0 {
                -1
            } else if coordinate == last {
                1
            } else {
                continue;
            };

            let mut neighbour = position;
            neighbour[axis] += step;
            if let Some(chunk) = self.chunks.get_mut(&neighbour) {
                chunk.mark_dirty();
                self.queue_remesh(neighbour);
            }
        }

        self.submit_pending_meshes();
    }

    /// Block at a world position, or `None` if its chunk is not resident.
    pub fn get_block(&self, wx: i32, wy: i32, wz: i32) -> Option<BlockId> {
        let (position, local) = world_to_chunk_local(wx, wy, wz);
        self.chunks
            .get(&position)
            .map(|chunk| chunk.get_block(local.x, local.y, local.z))
    }

    /// Queues a chunk for meshing unless it is already waiting.
    fn queue_remesh(&mut self, position: ChunkCoordinate) {
        if self.pending_remesh.insert(position) {
            self.remesh_queue.push_back(position);
        }
    }

    /// Publishes mesh jobs for queued chunks while workers have free slots.
    ///
    /// The snapshot is captured at publish time, so a chunk dirtied again
    /// while it waits still gets a single job built from its latest voxels.
    fn submit_pending_meshes(&mut self) -> usize {
        self.task_manager.process_queued_tasks();
        let mut submitted = 0;

        while self.task_manager.available_slots() > 0 {
            let Some(position) = self.remesh_queue.pop_front() else {
                break;
            };
            // Entries of unloaded chunks linger in the queue until popped.
            if !self.pending_remesh.remove(&position) {
                continue;
            }
            let Some(chunk) = self.chunks.get(&position) else {
                continue;
            };

            let task = ChunkMeshGenerationTask::new(
                position,
                chunk.generation(),
                NeighborSnapshot::capture(&self.chunks, position),
                self.registry.clone(),
                self.atlas.clone(),
            );
            self.task_manager.publish_task(task);
            submitted += 1;
        }

        submitted
    }

    /// Applies at most `max_mesh_uploads_per_frame` finished mesh jobs.
    ///
    /// # Returns
    /// `(applied, discarded)`
    fn apply_completed_meshes(&mut self) -> (usize, usize) {
        let mut applied = 0;
        let mut discarded = 0;

        for result in self
            .task_manager
            .drain_completed(self.max_mesh_uploads_per_frame)
        {
            let installed = match self.chunks.get_mut(&result.position) {
                Some(chunk) => chunk.apply_mesh(result.generation, &result.buffers, &mut self.backend),
                None => false,
            };

            if installed {
                applied += 1;
            } else {
                discarded += 1;
            }
        }

        (applied, discarded)
    }

    /// Chunk containing a world-space point.
    pub fn view_chunk(&self, viewpoint: Point3<f32>) -> ChunkCoordinate {
        let local = viewpoint - self.renderer.world_origin;
        let size = CHUNK_DIMENSION as f32;
        Point3::new(
            (local.x / size).floor() as i32,
            (local.y / size).floor() as i32,
            (local.z / size).floor() as i32,
        )
    }

    /// Advances streaming by one frame for a viewer at `viewpoint`.
    ///
    /// Loads the cube of chunks within the render distance of the viewpoint
    /// chunk, unloads the rest, feeds the mesh pipeline, applies a bounded
    /// number of finished meshes and draws.
    pub fn streaming_tick(&mut self, viewpoint: Point3<f32>) -> TickReport {
        let view_chunk = self.view_chunk(viewpoint);
        let mut report = TickReport {
            view_chunk,
            ..TickReport::default()
        };

        if self.closed {
            warn!("Streaming tick on a closed world");
            return report;
        }

        let distance = self.render_distance;
        for x in -distance..=distance {
            for y in -distance..=distance {
                for z in -distance..=distance {
                    if self.make_resident(view_chunk + Vector3::new(x, y, z)) {
                        report.loaded += 1;
                    }
                }
            }
        }

        let out_of_range: Vec<ChunkCoordinate> = self
            .chunks
            .keys()
            .filter(|position| {
                let offset = *position - view_chunk;
                offset.x.abs() > distance || offset.y.abs() > distance || offset.z.abs() > distance
            })
            .copied()
            .collect();
        for position in out_of_range {
            if self.stage_unload(position) {
                report.unloaded += 1;
            }
        }

        report.submitted = self.submit_pending_meshes();
        (report.applied, report.discarded) = self.apply_completed_meshes();
        report.render = self.renderer.render(&self.chunks, &mut self.backend);
        self.release_pending();

        debug!(
            "Tick at {:?}: loaded {}, unloaded {}, submitted {}, applied {}, discarded {}, drawn {}/{}",
            view_chunk,
            report.loaded,
            report.unloaded,
            report.submitted,
            report.applied,
            report.discarded,
            report.render.drawn,
            report.render.considered
        );
        report
    }

    /// Stops meshing, saves every resident chunk and frees all GPU meshes.
    ///
    /// Further calls do nothing.
    ///
    /// # Errors
    /// Propagates failures writing the save file. The world is closed either way.
    pub fn close(&mut self) -> Result<(), EngineError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        self.task_manager.shutdown();
        self.pending_remesh.clear();
        self.remesh_queue.clear();

        for (position, mut chunk) in self.chunks.drain() {
            self.persisted.insert(position, chunk.voxel_data());
            chunk.release(&mut self.backend);
        }
        self.release_pending();

        info!("Closing world with {} saved chunks", self.persisted.len());
        self.persisted.save()
    }

    /// Whether [`close`](Self::close) has run.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Whether a chunk is resident.
    pub fn is_resident(&self, position: ChunkCoordinate) -> bool {
        self.chunks.contains_key(&position)
    }

    /// A resident chunk.
    pub fn chunk(&self, position: ChunkCoordinate) -> Option<&Chunk> {
        self.chunks.get(&position)
    }

    /// All resident chunks.
    pub fn chunks(&self) -> &ChunkMap {
        &self.chunks
    }

    /// Saved voxel arrays.
    pub fn persisted(&self) -> &PersistedWorldData {
        &self.persisted
    }

    /// Number of times the generator has been asked for a chunk.
    pub fn generated_chunks(&self) -> usize {
        self.generated_chunks
    }

    /// Whether no mesh job is queued, running or waiting to be applied.
    pub fn is_meshing_idle(&self) -> bool {
        self.pending_remesh.is_empty() && self.task_manager.is_idle()
    }

    /// Number of chunks waiting for a free worker before they are meshed.
    pub fn pending_meshes(&self) -> usize {
        self.pending_remesh.len()
    }

    /// Number of published mesh jobs the worker pool has queued internally.
    pub fn queued_mesh_jobs(&self) -> usize {
        self.task_manager.queued()
    }

    /// Render distance in chunks.
    pub fn render_distance(&self) -> i32 {
        self.render_distance
    }

    /// The render backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The render backend, mutably (to update the camera, encode passes, ...).
    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Block definitions.
    pub fn registry(&self) -> &BlockRegistry {
        &self.registry
    }
}

impl<B: RenderBackend, G: ChunkGenerator> Drop for World<B, G> {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            log::error!("Failed to save world while dropping it: {}", err);
        }
    }
}
