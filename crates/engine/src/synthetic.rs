//! Procedural frame source for bring-up and tests.
//!
//! Generates BGR gradient frames whose bytes depend only on the frame index
//! and resolution, so any frame can be re-read bit-identically after a seek.

use fc_common::{FrameSource, FrameSourceFactory, Resolution, SourceError, SourceFrame};

/// In-memory frame source producing deterministic gradient patterns.
pub struct SyntheticSource {
    resolution: Resolution,
    total: i64,
    position: i64,
    open: bool,
}

impl SyntheticSource {
    pub fn new(resolution: Resolution, frame_count: i64) -> Self {
        Self {
            resolution,
            total: frame_count.max(0),
            position: 0,
            open: false,
        }
    }

    fn render(&self, index: i64) -> SourceFrame {
        let Resolution { width, height } = self.resolution;
        let n = index as u32;
        let mut data = Vec::with_capacity(self.resolution.bgr_byte_size());
        for y in 0..height {
            for x in 0..width {
                data.push(((x + n) % 256) as u8);
                data.push(((y + n * 2) % 256) as u8);
                data.push(((x + y + n * 3) % 256) as u8);
            }
        }
        SourceFrame::new(data, self.resolution)
    }
}

impl FrameSource for SyntheticSource {
    fn open(&mut self, _path: &str) -> Result<(), SourceError> {
        self.open = true;
        self.position = 0;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }

    fn release(&mut self) {
        self.open = false;
    }

    fn frame_count(&self) -> i64 {
        self.total
    }

    fn seek_to_frame(&mut self, frame: i64) -> Result<(), SourceError> {
        if frame < 0 || frame >= self.total {
            return Err(SourceError::SeekFailed { frame });
        }
        self.position = frame;
        Ok(())
    }

    fn read_next(&mut self) -> Result<SourceFrame, SourceError> {
        if !self.open {
            return Err(SourceError::StreamClosed);
        }
        if self.position >= self.total {
            return Err(SourceError::ReadFailed {
                frame: self.position,
            });
        }
        let frame = self.render(self.position);
        self.position += 1;
        Ok(frame)
    }

    fn grab_only(&mut self) -> Result<(), SourceError> {
        if self.position >= self.total {
            return Err(SourceError::ReadFailed {
                frame: self.position,
            });
        }
        self.position += 1;
        Ok(())
    }

    fn position_frame(&self) -> i64 {
        self.position
    }
}

/// Factory handing out fresh synthetic sources with a fixed shape.
pub struct SyntheticFactory {
    pub resolution: Resolution,
    pub frame_count: i64,
}

impl SyntheticFactory {
    pub fn new(resolution: Resolution, frame_count: i64) -> Self {
        Self {
            resolution,
            frame_count,
        }
    }
}

impl FrameSourceFactory for SyntheticFactory {
    fn create(&self) -> Box<dyn FrameSource> {
        Box::new(SyntheticSource::new(self.resolution, self.frame_count))
    }
}
