//! Collaborator abstraction traits.
//!
//! These traits define the interface between the engine and its external
//! collaborators: the decode primitive (`FrameSource`), the render-thread
//! texture object (`TextureSink`), and play-case path resolution
//! (`PathResolver`). The engine programs against these traits only, never
//! against concrete implementations.

use std::path::PathBuf;

use crate::error::{ResolveError, SinkError, SourceError};
use crate::frame::SourceFrame;
use crate::types::{Resolution, TextureHandle, UpdateRegion};

/// Decode/seek primitive over one media source.
///
/// Owned and driven exclusively by the decode worker thread.
pub trait FrameSource: Send {
    /// Open the source at `path`. A source may be re-opened after `release`.
    fn open(&mut self, path: &str) -> Result<(), SourceError>;

    /// Whether the underlying stream is currently open.
    fn is_open(&self) -> bool;

    /// Close the underlying stream. Idempotent.
    fn release(&mut self);

    /// Total frame count, or 0 when unknown (live sources).
    fn frame_count(&self) -> i64;

    /// Absolute seek to a frame index.
    fn seek_to_frame(&mut self, frame: i64) -> Result<(), SourceError>;

    /// Decode and return the next frame.
    fn read_next(&mut self) -> Result<SourceFrame, SourceError>;

    /// Advance one frame without a full decode (cheap skip).
    fn grab_only(&mut self) -> Result<(), SourceError>;

    /// The source's own current frame position.
    fn position_frame(&self) -> i64;
}

/// Constructs fresh frame sources, letting a stopped run be restarted
/// without the consumer handing the engine a new source.
pub trait FrameSourceFactory: Send + Sync {
    fn create(&self) -> Box<dyn FrameSource>;
}

/// Render-thread texture object.
///
/// Every method must be called from the thread that owns the rendering
/// context; the engine guarantees this by routing all calls through its
/// pump.
pub trait TextureSink {
    /// Create the backing texture, or recreate it at a new size.
    fn create_or_resize(&mut self, resolution: Resolution) -> Result<TextureHandle, SinkError>;

    /// Upload a pixel region. `pixels` is read-only for the duration of
    /// the call and not retained afterwards.
    fn upload_region(
        &mut self,
        handle: TextureHandle,
        region: UpdateRegion,
        pixels: &[u8],
        pitch: u32,
        bytes_per_pixel: u32,
    ) -> Result<(), SinkError>;

    /// Release the texture behind `handle`. Idempotent for unknown handles.
    fn release(&mut self, handle: TextureHandle);
}

/// A resolved play case: concrete path plus an optional per-case playback
/// resolution from the profile.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedSource {
    pub path: PathBuf,
    pub resolution: Option<Resolution>,
}

impl ResolvedSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            resolution: None,
        }
    }
}

/// Maps a logical play case to a concrete, existing source path.
pub trait PathResolver: Send + Sync {
    fn resolve(&self, case: &str) -> Result<ResolvedSource, ResolveError>;
}
