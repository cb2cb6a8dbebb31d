//! # Voxel Streaming Entry Point
//!
//! Runs the streaming demo from the library.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release -- [options.json]
//! ```

fn main() {
    if let Err(err) = voxel_streaming::run() {
        eprintln!("voxel-streaming: {err}");
        std::process::exit(1);
    }
}
