//! Frame pacing: decides when the decode loop may emit the next frame.
//!
//! Timed mode paces against the wall clock: a target inter-frame interval
//! derived from fps and rate, with catch-up frame skipping when the loop
//! falls behind. RealTime mode is a plain rate limiter: a fixed sleep quota
//! per iteration, a read every iteration, no catch-up.

use std::time::{Duration, Instant};

use fc_common::{config::clamp_rate, PacingMode};

/// Outcome of one pacing consultation.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PaceDecision {
    /// Whether it is time to decode and emit a frame.
    pub advance: bool,
    /// Frames the wall clock has already passed, to be skipped with cheap
    /// grabs. Zero unless `advance`.
    pub frames_to_skip: u32,
    /// How long the caller should sleep before re-consulting. Zero when
    /// `advance`.
    pub sleep_hint: Duration,
}

impl PaceDecision {
    fn advance(frames_to_skip: u32) -> Self {
        Self {
            advance: true,
            frames_to_skip,
            sleep_hint: Duration::ZERO,
        }
    }

    fn wait(sleep_hint: Duration) -> Self {
        Self {
            advance: false,
            frames_to_skip: 0,
            sleep_hint,
        }
    }
}

/// Target inter-frame interval in milliseconds for a given fps and rate.
/// Rate is clamped before the division so a zero rate cannot blow it up.
pub fn scaled_interval_ms(target_fps: u32, rate: f32) -> f64 {
    1000.0 / (target_fps.max(1) as f64 * clamp_rate(rate) as f64)
}

/// Catch-up frames for an elapsed time past the interval: how many whole
/// intervals elapsed beyond the one being emitted now.
pub fn catch_up_frames(elapsed_ms: f64, interval_ms: f64) -> u32 {
    let passed = (elapsed_ms / interval_ms).floor() as i64 - 1;
    passed.max(0) as u32
}

/// Paces the decode loop. One instance per worker run.
pub struct FramePacer {
    mode: PacingMode,
    target_fps: u32,
    last_emit: Option<Instant>,
}

impl FramePacer {
    pub fn new(mode: PacingMode, target_fps: u32) -> Self {
        Self {
            mode,
            target_fps: target_fps.max(1),
            last_emit: None,
        }
    }

    pub fn mode(&self) -> PacingMode {
        self.mode
    }

    /// Per-iteration sleep quota in RealTime mode: one frame period,
    /// rate-scaled.
    pub fn realtime_quota(&self, rate: f32) -> Duration {
        Duration::from_secs_f64(1.0 / (self.target_fps as f64 * clamp_rate(rate) as f64))
    }

    /// Consult the pacer (Timed mode). The first call after construction or
    /// [`reset`](Self::reset) always advances with no skip.
    pub fn tick(&mut self, rate: f32) -> PaceDecision {
        let now = Instant::now();
        let last = match self.last_emit {
            Some(last) => last,
            None => return PaceDecision::advance(0),
        };
        let interval_ms = scaled_interval_ms(self.target_fps, rate);
        let elapsed_ms = now.duration_since(last).as_secs_f64() * 1000.0;
        if elapsed_ms < interval_ms {
            return PaceDecision::wait(Duration::from_secs_f64(
                (interval_ms - elapsed_ms) / 1000.0,
            ));
        }
        PaceDecision::advance(catch_up_frames(elapsed_ms, interval_ms))
    }

    /// Record that a frame was just emitted.
    pub fn mark_emitted(&mut self) {
        self.last_emit = Some(Instant::now());
    }

    /// Forget the last emission, so the next tick advances immediately.
    pub fn reset(&mut self) {
        self.last_emit = None;
    }
}
