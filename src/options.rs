//! # Options
//!
//! Runtime settings read from an optional JSON file. Every field has a default,
//! so a partial file (or no file at all) is valid:
//!
//! ```json
//! { "render_distance": 4, "generator": "flat" }
//! ```

use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Smallest worker pool the meshing pipeline runs with.
pub const MIN_MESH_WORKERS: usize = 2;

/// Which terrain generator fills chunks that have never been saved.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeneratorKind {
    /// Random solid chunks, half of them empty
    #[default]
    Stress,
    /// Stone below a fixed height
    Flat,
    /// Thresholded Perlin noise
    Perlin,
}

/// Streaming, generation and demo settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Options {
    /// Chunks kept resident on each axis around the viewpoint chunk
    pub render_distance: i32,
    /// Mesh results applied per tick at most
    pub max_mesh_uploads_per_frame: usize,
    /// Meshing worker threads (at least [`MIN_MESH_WORKERS`] are started)
    pub mesh_worker_count: usize,
    /// Where unloaded chunks are saved
    pub save_path: PathBuf,
    /// Terrain generator
    pub generator: GeneratorKind,
    /// World Y below which the flat generator places stone
    pub flat_ground_height: i32,
    /// World-space position of chunk (0, 0, 0)
    pub world_origin: [f32; 3],
    /// Seed for the stress and Perlin generators
    pub seed: u64,
    /// Frames rendered by the demo before it closes the world
    pub demo_frames: u32,
    /// Width of the demo's off-screen target
    pub render_width: u32,
    /// Height of the demo's off-screen target
    pub render_height: u32,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            render_distance: 8,
            max_mesh_uploads_per_frame: 10,
            mesh_worker_count: 4,
            save_path: PathBuf::from("saves/world.json"),
            generator: GeneratorKind::default(),
            flat_ground_height: 8,
            world_origin: [0.0, 0.0, 0.0],
            seed: 0,
            demo_frames: 240,
            render_width: 1280,
            render_height: 720,
        }
    }
}

impl Options {
    /// Reads options from `path`.
    ///
    /// A missing file yields the defaults.
    ///
    /// # Errors
    /// [`EngineError::Io`] if the file exists but cannot be read;
    /// [`EngineError::Options`] if it is not valid options JSON.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                log::info!("No options file at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(EngineError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| EngineError::Options {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Worker count clamped to the pipeline minimum.
    pub fn worker_count(&self) -> usize {
        self.mesh_worker_count.max(MIN_MESH_WORKERS)
    }

    /// Render distance, never negative.
    pub fn render_distance(&self) -> i32 {
        self.render_distance.max(0)
    }
}
