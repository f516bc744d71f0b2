//! Configuration structs for playback.

use serde::{Deserialize, Serialize};

/// How the decode loop paces frame delivery.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PacingMode {
    /// Wall-clock pacing at a target fps with catch-up frame skipping.
    #[default]
    Timed,
    /// Fixed sleep quota, read every iteration. For externally-paced
    /// (live) sources; no catch-up logic.
    RealTime,
}

/// Configuration for one playback run. Immutable for the lifetime of a
/// single Start; a new Start fully replaces it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Concrete source path handed to the frame source.
    pub source_path: String,
    pub mode: PacingMode,
    /// Target frames per second, must be > 0.
    pub target_fps: u32,
    /// Initial playback rate, clamped to [`PlaybackConfig::MIN_RATE`].
    pub rate: f32,
}

impl PlaybackConfig {
    /// Minimum playback rate. Lower values would blow up the pacing
    /// interval division and spin the loop.
    pub const MIN_RATE: f32 = 0.1;

    pub fn new(source_path: impl Into<String>, mode: PacingMode, target_fps: u32) -> Self {
        Self {
            source_path: source_path.into(),
            mode,
            target_fps: target_fps.max(1),
            rate: 1.0,
        }
    }

    pub fn with_rate(mut self, rate: f32) -> Self {
        self.rate = clamp_rate(rate);
        self
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            source_path: String::new(),
            mode: PacingMode::Timed,
            target_fps: 30,
            rate: 1.0,
        }
    }
}

/// Clamp a playback rate to the supported minimum.
pub fn clamp_rate(rate: f32) -> f32 {
    rate.max(PlaybackConfig::MIN_RATE)
}
