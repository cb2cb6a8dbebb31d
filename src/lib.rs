#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]
#![warn(rustdoc::invalid_rust_codeblocks)]

//! # Voxel Streaming
//!
//! Chunk streaming and meshing core for a voxel world, rendered with WGPU.
//!
//! The world is cut into 16³ chunks. Chunks near the viewpoint are kept
//! resident, meshed on worker threads with hidden-face culling against their
//! neighbours, and drawn with frustum culling. Chunks that drift out of range
//! are saved and released, and come back from the save when revisited.
//!
//! ## Key Modules
//!
//! * `engine_state` - Voxels, meshing, rendering and the worker pool
//! * `options` - Runtime settings loaded from JSON
//! * `error` - The crate's error type
//!
//! ## Usage
//!
//! ```no_run
//! fn main() {
//!     if let Err(err) = voxel_streaming::run() {
//!         eprintln!("{err}");
//!     }
//! }
//! ```
//!
//! The demo flies a camera through the world for `demo_frames` frames,
//! rendering off-screen when a GPU is available and into a recording backend
//! otherwise, then saves the world and exits.

use std::path::PathBuf;

use log::{info, warn};

use engine_state::{
    rendering::{backend::{RecordingBackend, RenderBackend}, wgpu_backend::WgpuChunkBackend},
    EngineState,
};
use error::EngineError;
use options::Options;

pub mod engine_state;
pub mod error;
pub mod options;

/// Options file read when no path is given on the command line.
pub const DEFAULT_OPTIONS_PATH: &str = "voxel-streaming.json";

/// Simulated time per demo frame.
const FRAME_TIME: f32 = 1.0 / 60.0;

/// Frames between two progress log lines.
const REPORT_INTERVAL: u32 = 60;

/// Initializes logging, loads options and runs the streaming demo.
///
/// The options path is the first command line argument, or
/// [`DEFAULT_OPTIONS_PATH`].
///
/// # Errors
/// Propagates option, device and save failures. A missing GPU is not an
/// error: the demo then runs against [`RecordingBackend`].
pub fn run() -> Result<(), EngineError> {
    let mut log_builder = env_logger::Builder::new();
    log_builder
        .target(env_logger::Target::Stdout)
        .parse_env("RUST_LOG")
        .init();

    info!("Logger initialized");

    let options_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OPTIONS_PATH));
    let options = Options::load(&options_path)?;

    match pollster::block_on(WgpuChunkBackend::request(
        options.render_width,
        options.render_height,
    )) {
        Ok(backend) => run_demo(&options, backend, |backend| {
            backend.wait_idle();
            info!(
                "Submitted {} frames, {} meshes still live",
                backend.frames_submitted(),
                backend.live_meshes()
            );
        }),
        Err(EngineError::NoAdapter(err)) => {
            warn!("No GPU available ({}), running without rendering", err);
            run_demo(&options, RecordingBackend::new(), |backend| {
                info!(
                    "Recorded {} mesh creations, {} updates, {} destructions",
                    backend.created, backend.updated, backend.destroyed
                );
            })
        }
        Err(err) => Err(err),
    }
}

/// Flies the camera for `options.demo_frames` frames, closes the world and
/// lets `summarize` inspect the backend.
fn run_demo<B, F>(options: &Options, backend: B, summarize: F) -> Result<(), EngineError>
where
    B: RenderBackend,
    F: FnOnce(&B),
{
    let mut engine = EngineState::new(options, backend)?;

    for frame in 0..options.demo_frames {
        let report = engine.frame(FRAME_TIME);
        if frame % REPORT_INTERVAL == 0 {
            info!(
                "Frame {}: chunk {:?}, {} resident, {} drawn, {} culled",
                frame,
                report.view_chunk,
                engine.world().chunks().len(),
                report.render.drawn,
                report.render.culled
            );
        }
    }

    engine.close()?;
    summarize(engine.world().backend());
    Ok(())
}
