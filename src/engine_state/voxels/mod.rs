//! # Voxels
//!
//! Voxel data and the streaming world built on it.
//!
//! ## Architecture
//!
//! * **Block**: block ids, definitions and the registry mapping ids to tiles
//! * **Chunk**: fixed-size 16³ voxel arrays with their cached GPU mesh
//! * **Snapshot**: read-only voxel copies handed to mesh workers
//! * **Generation**: terrain sources for chunks that have never been saved
//! * **Persistence**: voxel arrays of unloaded chunks, saved as one JSON file
//! * **World**: residency, edits and the per-frame streaming tick
//!
//! ## Data Flow
//!
//! 1. The world loads chunks around the viewpoint (saved data first, then the generator)
//! 2. Loads and edits mark chunks dirty and queue a mesh job per chunk
//! 3. Workers mesh against neighbour snapshots
//! 4. The world applies a bounded number of results per tick and draws
//!
//! ## Thread Safety
//!
//! Chunks are only touched on the main thread. Workers see copies.

pub mod block;
pub mod chunk;
pub mod generation;
pub mod persistence;
pub mod snapshot;
pub mod world;
