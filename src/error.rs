//! # Error Types
//!
//! Every fallible operation in the crate reports through [`EngineError`].
//! Missing-data conditions (absent neighbours, unknown block ids, absent save
//! entries) are not errors and never appear here.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by construction, persistence and GPU start-up.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Reading or writing a file failed.
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// File that was being accessed
        path: PathBuf,
        /// Underlying operating system error
        #[source]
        source: std::io::Error,
    },

    /// Save data could not be encoded or decoded.
    #[error("world save data is malformed: {0}")]
    SaveFormat(#[from] serde_json::Error),

    /// The options file exists but does not parse.
    #[error("invalid options file {path}: {source}")]
    Options {
        /// Options file that failed to parse
        path: PathBuf,
        /// Parser diagnostic
        #[source]
        source: serde_json::Error,
    },

    /// A block was looked up by a name nobody registered.
    #[error("no block registered under the name '{0}'")]
    UnknownBlockName(String),

    /// Two block definitions share a name.
    #[error("block name '{0}' is already registered")]
    DuplicateBlockName(String),

    /// A texture tile was looked up by a name the atlas does not contain.
    #[error("texture atlas has no tile named '{0}'")]
    UnknownTile(String),

    /// No GPU adapter satisfied the request.
    #[error("no compatible GPU adapter: {0}")]
    NoAdapter(#[from] wgpu::RequestAdapterError),

    /// The adapter refused to create a device.
    #[error("failed to create GPU device: {0}")]
    RequestDevice(#[from] wgpu::RequestDeviceError),
}
