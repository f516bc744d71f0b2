//! Playback state shared between the consumer thread and the decode worker,
//! plus the index advance/wrap policy.
//!
//! Scalar flags and the rate are atomics so the worker can read them every
//! loop tick without locking; composite fields (custom resolution, seek
//! target) sit behind a mutex to avoid torn reads.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU32, AtomicU64, AtomicU8, Ordering};

use parking_lot::Mutex;

use fc_common::{config::clamp_rate, Resolution};

/// Reverse playback steps this many frames per tick for each unit of rate,
/// giving rewind a faster feel than forward playback.
pub const REVERSE_STEP_FACTOR: f32 = 3.0;

/// Current playback status.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// No worker thread alive.
    #[default]
    Stopped,
    /// Worker running the decode loop.
    Running,
    /// Worker alive but idling; the source is not touched.
    Paused,
}

impl PlaybackStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Running,
            2 => Self::Paused,
            _ => Self::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Self::Stopped => 0,
            Self::Running => 1,
            Self::Paused => 2,
        }
    }
}

/// Playback state shared across the consumer and worker threads.
///
/// A fresh instance is created per Start; the worker holds an `Arc` to the
/// instance that was current when it spawned, so a stale worker winding
/// down can never clobber the state of its successor.
pub struct PlaybackShared {
    status: AtomicU8,
    stopping: AtomicBool,
    paused: AtomicBool,
    reversed: AtomicBool,
    /// f32 bit pattern, clamped on write.
    rate: AtomicU32,
    /// f64 bit pattern of the fractional frame index.
    position: AtomicU64,
    total_frames: AtomicI64,
    custom_resolution: Mutex<Option<Resolution>>,
    seek_request: Mutex<Option<i64>>,
}

impl PlaybackShared {
    pub fn new(initial_rate: f32) -> Self {
        Self {
            status: AtomicU8::new(PlaybackStatus::Stopped.as_u8()),
            stopping: AtomicBool::new(false),
            paused: AtomicBool::new(false),
            reversed: AtomicBool::new(false),
            rate: AtomicU32::new(clamp_rate(initial_rate).to_bits()),
            position: AtomicU64::new(0f64.to_bits()),
            total_frames: AtomicI64::new(0),
            custom_resolution: Mutex::new(None),
            seek_request: Mutex::new(None),
        }
    }

    // -- Status & lifecycle flags --

    pub fn status(&self) -> PlaybackStatus {
        PlaybackStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: PlaybackStatus) {
        self.status.store(status.as_u8(), Ordering::Release);
    }

    /// Signal the worker to wind down. The worker polls this at every
    /// blocking point.
    pub fn request_stop(&self) {
        self.stopping.store(true, Ordering::Release);
        tracing::debug!("Stop requested");
    }

    pub fn is_stopping(&self) -> bool {
        self.stopping.load(Ordering::Acquire)
    }

    /// Running -> Paused. No-op in any other status.
    pub fn pause(&self) {
        if self.status() == PlaybackStatus::Running {
            self.paused.store(true, Ordering::Release);
            self.set_status(PlaybackStatus::Paused);
            tracing::debug!(frame = self.position(), "Playback paused");
        }
    }

    /// Paused -> Running. No-op in any other status.
    pub fn resume(&self) {
        if self.status() == PlaybackStatus::Paused {
            self.paused.store(false, Ordering::Release);
            self.set_status(PlaybackStatus::Running);
            tracing::debug!(frame = self.position(), "Playback resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    // -- Tunables --

    /// Set the playback rate, clamped to the supported minimum. Takes
    /// effect on the worker's next loop iteration.
    pub fn set_rate(&self, rate: f32) {
        let clamped = clamp_rate(rate);
        self.rate.store(clamped.to_bits(), Ordering::Release);
        tracing::debug!(rate = clamped, "Playback rate set");
    }

    pub fn rate(&self) -> f32 {
        f32::from_bits(self.rate.load(Ordering::Acquire))
    }

    pub fn set_reversed(&self, reversed: bool) {
        self.reversed.store(reversed, Ordering::Release);
        tracing::debug!(reversed, "Playback direction set");
    }

    pub fn is_reversed(&self) -> bool {
        self.reversed.load(Ordering::Acquire)
    }

    /// Set or clear the custom staging resolution. An empty (zero)
    /// resolution clears it.
    pub fn set_resolution(&self, resolution: Option<Resolution>) {
        let effective = resolution.filter(|r| !r.is_empty());
        *self.custom_resolution.lock() = effective;
        match effective {
            Some(r) => tracing::debug!(resolution = %r, "Custom resolution set"),
            None => tracing::debug!("Custom resolution cleared"),
        }
    }

    pub fn resolution(&self) -> Option<Resolution> {
        *self.custom_resolution.lock()
    }

    // -- Position --

    /// Post an absolute seek. Negative indices are ignored.
    pub fn request_seek(&self, frame: i64) {
        if frame >= 0 {
            *self.seek_request.lock() = Some(frame);
            tracing::debug!(frame, "Seek requested");
        }
    }

    /// Consume a pending seek request, if any.
    pub fn take_seek(&self) -> Option<i64> {
        self.seek_request.lock().take()
    }

    pub fn store_position(&self, index: f64) {
        self.position.store(index.to_bits(), Ordering::Release);
    }

    /// Fractional current frame index.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position.load(Ordering::Acquire))
    }

    pub fn set_total_frames(&self, total: i64) {
        self.total_frames.store(total, Ordering::Release);
    }

    pub fn total_frames(&self) -> i64 {
        self.total_frames.load(Ordering::Acquire)
    }
}

// ---------------------------------------------------------------------------
// Index advance policy
// ---------------------------------------------------------------------------

/// Boundary wrap performed by an index advance.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Wrap {
    None,
    /// Forward playback ran past the end and wrapped to frame 0.
    ToStart,
    /// Reverse playback ran past frame 0 and wrapped to the last frame.
    ToEnd,
}

/// Result of advancing the frame index by one accepted tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Advance {
    pub next_index: f64,
    pub wrap: Wrap,
}

/// Compute the next frame index for one accepted tick.
///
/// Forward: index moves by `rate` plus any catch-up skip; at or past
/// `total` it wraps to 0. Reverse: index moves back by
/// `REVERSE_STEP_FACTOR * rate` (catch-up skip does not apply, reverse
/// reseeks every tick); below 0 it wraps to `total - 1`. A non-positive
/// `total` (unknown length) never wraps.
pub fn advance_index(
    current: f64,
    rate: f32,
    reversed: bool,
    frames_to_skip: u32,
    total: i64,
) -> Advance {
    let rate = clamp_rate(rate) as f64;
    if reversed {
        let next = current - REVERSE_STEP_FACTOR as f64 * rate;
        if next < 0.0 && total > 0 {
            return Advance {
                next_index: (total - 1) as f64,
                wrap: Wrap::ToEnd,
            };
        }
        Advance {
            next_index: next.max(0.0),
            wrap: Wrap::None,
        }
    } else {
        let next = current + rate + frames_to_skip as f64;
        if total > 0 && next >= total as f64 {
            return Advance {
                next_index: 0.0,
                wrap: Wrap::ToStart,
            };
        }
        Advance {
            next_index: next,
            wrap: Wrap::None,
        }
    }
}
