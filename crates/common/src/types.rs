//! Core types with newtype pattern for type safety.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Video/image resolution.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const HD: Self = Self {
        width: 1920,
        height: 1080,
    };
    pub const UHD: Self = Self {
        width: 3840,
        height: 2160,
    };

    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn aspect_ratio(self) -> f64 {
        self.width as f64 / self.height as f64
    }

    /// True when either dimension is zero. A zero resolution disables
    /// custom-resolution staging.
    pub fn is_empty(self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Byte size for packed BGR8 pixel data (3 bytes/pixel).
    pub fn bgr_byte_size(self) -> usize {
        self.width as usize * self.height as usize * 3
    }

    /// Byte size for packed BGRA8 pixel data (4 bytes/pixel).
    pub fn bgra_byte_size(self) -> usize {
        self.width as usize * self.height as usize * 4
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Rectangular texture region for partial or full uploads.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct UpdateRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl UpdateRegion {
    /// Region covering an entire texture of the given resolution.
    pub fn covering(resolution: Resolution) -> Self {
        Self {
            x: 0,
            y: 0,
            width: resolution.width,
            height: resolution.height,
        }
    }

    /// Row pitch in bytes for the given bytes-per-pixel.
    pub fn pitch(self, bytes_per_pixel: u32) -> u32 {
        self.width * bytes_per_pixel
    }
}

impl fmt::Display for UpdateRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// Opaque handle to a sink-owned texture.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u64);

impl fmt::Display for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}
