//! `fc-common`: shared types, traits, and errors for the framecast engine.
//!
//! This crate is the foundation the engine crate depends on. It defines the
//! core abstractions:
//!
//! - **Types**: `Resolution`, `UpdateRegion`, `TextureHandle` (newtypes for safety)
//! - **Frames**: `SourceFrame` (decoded BGR frame, demuxer/decoder output)
//! - **Traits**: `FrameSource`, `TextureSink`, `PathResolver` (collaborator seams)
//! - **Errors**: `EngineError`, `SourceError`, `SinkError`, `ResolveError` (thiserror-based)
//! - **Config**: `PlaybackConfig`, `PacingMode`

pub mod config;
pub mod error;
pub mod frame;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::{PacingMode, PlaybackConfig};
pub use error::{EngineError, EngineResult, ResolveError, SinkError, SourceError};
pub use frame::SourceFrame;
pub use traits::{FrameSource, FrameSourceFactory, PathResolver, ResolvedSource, TextureSink};
pub use types::{Resolution, TextureHandle, UpdateRegion};
