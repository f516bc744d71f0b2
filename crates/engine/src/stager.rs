//! Frame staging: packed BGR decoder output to renderer-ready BGRA.
//!
//! The stager owns two pixel buffers and alternates between them so one can
//! be in flight to the renderer while the other is filled. Buffers are grown
//! as needed but never shrunk, so resolution oscillation does not churn the
//! allocator. Conversion adds an opaque alpha byte per pixel and is
//! parallelized across rows.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use image::imageops::{self, FilterType};
use image::{ImageBuffer, Rgb};
use rayon::prelude::*;
use thiserror::Error;

use fc_common::{Resolution, SourceFrame};

/// How long to sleep between in-flight checks while waiting for a buffer.
const BUFFER_POLL: Duration = Duration::from_micros(500);

/// Errors from frame staging.
#[derive(Debug, Error)]
pub enum StageError {
    /// Frame data length does not match its declared resolution.
    #[error("Malformed frame: {resolution} needs {needed} bytes, got {got}")]
    MalformedFrame {
        resolution: Resolution,
        needed: usize,
        got: usize,
    },

    /// Staging was cancelled while waiting for a free buffer.
    #[error("Staging cancelled")]
    Cancelled,
}

/// A staged BGRA pixel buffer. `data` may be larger than the current frame;
/// [`bytes`](Self::bytes) returns the valid prefix.
#[derive(Debug)]
pub struct PixelSurface {
    data: Vec<u8>,
    resolution: Resolution,
}

impl PixelSurface {
    fn empty() -> Self {
        Self {
            data: Vec::new(),
            resolution: Resolution::new(0, 0),
        }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// The staged frame's pixels: `height` rows of `width * 4` bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.data[..self.resolution.bgra_byte_size()]
    }
}

/// Result of staging one frame.
pub struct StagedFrame {
    /// Shared reference handed to the render queue; the stager reuses the
    /// underlying buffer once all other references are dropped.
    pub surface: Arc<PixelSurface>,
    /// Whether the staged size differs from the previous frame's, requiring
    /// the sink texture to be recreated.
    pub reallocated: bool,
}

/// Double-buffered BGR-to-BGRA pixel stager. One instance per worker run.
pub struct FrameStager {
    buffers: [Arc<PixelSurface>; 2],
    next: usize,
    last_resolution: Option<Resolution>,
}

impl FrameStager {
    pub fn new() -> Self {
        Self {
            buffers: [Arc::new(PixelSurface::empty()), Arc::new(PixelSurface::empty())],
            next: 0,
            last_resolution: None,
        }
    }

    /// Stage a decoded frame, resizing to `target` when set.
    ///
    /// Blocks in short bounded sleeps while the next buffer is still
    /// referenced by an in-flight upload; `cancel` is polled between sleeps
    /// and aborts the wait with [`StageError::Cancelled`].
    pub fn stage(
        &mut self,
        frame: &SourceFrame,
        target: Option<Resolution>,
        cancel: impl Fn() -> bool,
    ) -> Result<StagedFrame, StageError> {
        if !frame.is_well_formed() {
            return Err(StageError::MalformedFrame {
                resolution: frame.resolution,
                needed: frame.expected_len(),
                got: frame.data.len(),
            });
        }

        let resized;
        let (bgr, resolution): (&[u8], Resolution) = match target {
            Some(target) if !target.is_empty() && target != frame.resolution => {
                resized = resize_bgr(frame, target);
                (&resized, target)
            }
            _ => (&frame.data, frame.resolution),
        };

        let slot = self.next;
        self.next = (self.next + 1) % self.buffers.len();

        loop {
            if cancel() {
                return Err(StageError::Cancelled);
            }
            if let Some(surface) = Arc::get_mut(&mut self.buffers[slot]) {
                fill_bgra(surface, bgr, resolution);
                break;
            }
            thread::sleep(BUFFER_POLL);
        }

        let reallocated = self.last_resolution != Some(resolution);
        self.last_resolution = Some(resolution);

        Ok(StagedFrame {
            surface: Arc::clone(&self.buffers[slot]),
            reallocated,
        })
    }

    /// Forget the last staged size, forcing the next stage to report a
    /// reallocation. Used when a fresh texture is known to be needed.
    pub fn invalidate(&mut self) {
        self.last_resolution = None;
    }
}

impl Default for FrameStager {
    fn default() -> Self {
        Self::new()
    }
}

/// Resample a packed 3-byte frame to `target`. Channel order is irrelevant
/// to the filter, so BGR data rides through an RGB image view unchanged.
fn resize_bgr(frame: &SourceFrame, target: Resolution) -> Vec<u8> {
    let src: ImageBuffer<Rgb<u8>, &[u8]> = match ImageBuffer::from_raw(
        frame.resolution.width,
        frame.resolution.height,
        frame.data.as_slice(),
    ) {
        Some(img) => img,
        // Length was validated against the resolution before this call.
        None => return vec![0; target.bgr_byte_size()],
    };
    imageops::resize(&src, target.width, target.height, FilterType::Triangle).into_raw()
}

/// Convert packed BGR rows into the surface as BGRA with opaque alpha,
/// growing the surface buffer if needed (never shrinking it).
fn fill_bgra(surface: &mut PixelSurface, bgr: &[u8], resolution: Resolution) {
    let needed = resolution.bgra_byte_size();
    if surface.data.len() < needed {
        surface.data.resize(needed, 0);
    }
    surface.resolution = resolution;

    let src_row = resolution.width as usize * 3;
    let dst_row = resolution.width as usize * 4;
    surface.data[..needed]
        .par_chunks_exact_mut(dst_row)
        .zip(bgr.par_chunks_exact(src_row))
        .for_each(|(dst, src)| {
            for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(3)) {
                d[0] = s[0];
                d[1] = s[1];
                d[2] = s[2];
                d[3] = 255;
            }
        });
}
