//! Central error types for the engine (thiserror-based).

use thiserror::Error;

/// Top-level engine error.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    #[error("Resolve error: {0}")]
    Resolve(#[from] ResolveError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Frame source errors.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Failed to open source: {path}")]
    OpenFailed { path: String },

    #[error("Source reports no frames: {path}")]
    ZeroFrameCount { path: String },

    #[error("Stream closed unexpectedly")]
    StreamClosed,

    #[error("Seek to frame {frame} failed")]
    SeekFailed { frame: i64 },

    #[error("Read at frame {frame} failed")]
    ReadFailed { frame: i64 },
}

/// Texture sink errors.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Texture creation failed at {width}x{height}: {reason}")]
    CreateFailed {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("Texture upload failed: {reason}")]
    UploadFailed { reason: String },

    #[error("Unknown texture handle: {handle}")]
    UnknownHandle { handle: u64 },
}

/// Path/profile resolution errors.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("No source found for play case: {case}")]
    NotFound { case: String },

    #[error("Malformed profile {path}: {reason}")]
    MalformedProfile { path: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
