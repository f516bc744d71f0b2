//! Decode worker: the background fetch-pace-emit loop.
//!
//! One worker thread exists per playback run. It owns the frame source, the
//! pacer, and the stager; everything it shares with the consumer goes
//! through [`PlaybackShared`], the event channel, and the render queue. The
//! loop winds down cooperatively: every sleep is short and bounded, and the
//! stopping flag is checked at each blocking point.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use fc_common::{FrameSource, PacingMode, PlaybackConfig, SourceError, SourceFrame};

use crate::notify::{EventSender, PlaybackEvent};
use crate::pacer::FramePacer;
use crate::render::RenderHandle;
use crate::stager::{FrameStager, StageError};
use crate::state::{advance_index, PlaybackShared, PlaybackStatus, Wrap};

/// Sleep quantum while paused.
const PAUSE_QUANTUM: Duration = Duration::from_millis(1);

/// Maximum single sleep slice; longer waits are chopped into slices so the
/// stopping flag is polled often.
const SLEEP_SLICE: Duration = Duration::from_millis(2);

/// Forward gaps up to this many frames are bridged with cheap grabs instead
/// of an absolute seek.
const GRAB_BRIDGE_MAX: i64 = 10;

/// Consecutive read failures tolerated before the run is declared failed.
const MAX_READ_FAILURES: u32 = 120;

/// Everything a worker thread needs for one playback run.
pub struct WorkerContext {
    pub source: Box<dyn FrameSource>,
    pub config: PlaybackConfig,
    pub shared: Arc<PlaybackShared>,
    pub events: EventSender,
    pub render: RenderHandle,
    /// Absolute frame to seek to before the loop starts (ContinuePlay).
    pub start_frame: Option<i64>,
}

/// Spawn the decode worker thread.
pub fn spawn(ctx: WorkerContext) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("decode-worker".into())
        .spawn(move || run(ctx))
}

fn run(ctx: WorkerContext) {
    let WorkerContext {
        mut source,
        config,
        shared,
        events,
        render,
        start_frame,
    } = ctx;

    tracing::info!(
        path = %config.source_path,
        mode = ?config.mode,
        fps = config.target_fps,
        "Decode worker starting"
    );

    if let Err(err) = open_source(source.as_mut(), &config, start_frame, &shared) {
        tracing::warn!(error = %err, "Source open failed");
        source.release();
        shared.set_status(PlaybackStatus::Stopped);
        events.post(PlaybackEvent::Failed);
        return;
    }

    let exit = decode_loop(source.as_mut(), &config, &shared, &events, &render);
    source.release();
    shared.set_status(PlaybackStatus::Stopped);
    if exit == LoopExit::Failed {
        events.post(PlaybackEvent::Failed);
    }
    tracing::info!(?exit, "Decode worker exited");
}

fn open_source(
    source: &mut dyn FrameSource,
    config: &PlaybackConfig,
    start_frame: Option<i64>,
    shared: &PlaybackShared,
) -> Result<(), SourceError> {
    source.open(&config.source_path)?;
    let total = source.frame_count();
    // Live sources legitimately report no frame count; a seekable clip
    // reporting none is unplayable in Timed mode.
    if config.mode == PacingMode::Timed && total <= 0 {
        return Err(SourceError::ZeroFrameCount {
            path: config.source_path.clone(),
        });
    }
    shared.set_total_frames(total.max(0));
    if let Some(frame) = start_frame {
        source.seek_to_frame(frame)?;
        shared.store_position(frame as f64);
    }
    tracing::debug!(total, "Source opened");
    Ok(())
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum LoopExit {
    Stopped,
    Failed,
}

fn decode_loop(
    source: &mut dyn FrameSource,
    config: &PlaybackConfig,
    shared: &PlaybackShared,
    events: &EventSender,
    render: &RenderHandle,
) -> LoopExit {
    let mut pacer = FramePacer::new(config.mode, config.target_fps);
    let mut emitter = FrameEmitter::new(shared, events, render);
    let mut loop_completed = false;
    let mut read_failures = 0u32;

    loop {
        if shared.is_stopping() {
            return LoopExit::Stopped;
        }

        if shared.is_paused() {
            thread::sleep(PAUSE_QUANTUM);
            continue;
        }

        if !source.is_open() {
            tracing::warn!("Stream closed mid-play");
            return LoopExit::Failed;
        }

        if let Some(frame) = shared.take_seek() {
            match source.seek_to_frame(frame) {
                Ok(()) => {
                    shared.store_position(frame as f64);
                    pacer.reset();
                }
                Err(err) => tracing::warn!(error = %err, frame, "Seek failed"),
            }
        }

        let rate = shared.rate();

        match config.mode {
            PacingMode::Timed => {
                let decision = pacer.tick(rate);
                if !decision.advance {
                    sleep_interruptible(decision.sleep_hint, shared);
                    continue;
                }

                let current = shared.position();
                let desired = current.floor() as i64;
                let frame = match position_source(source, desired)
                    .and_then(|()| source.read_next())
                {
                    Ok(frame) => frame,
                    Err(err) => {
                        read_failures += 1;
                        tracing::warn!(
                            error = %err,
                            frame = desired,
                            failures = read_failures,
                            "Frame read failed"
                        );
                        if read_failures >= MAX_READ_FAILURES {
                            return LoopExit::Failed;
                        }
                        recover_to_boundary(source, shared);
                        continue;
                    }
                };
                read_failures = 0;

                match emitter.emit(&frame) {
                    EmitResult::Delivered => {}
                    EmitResult::Cancelled => return LoopExit::Stopped,
                    EmitResult::SinkFailed => return LoopExit::Failed,
                    EmitResult::BadFrame => {
                        read_failures += 1;
                        if read_failures >= MAX_READ_FAILURES {
                            return LoopExit::Failed;
                        }
                        continue;
                    }
                }
                pacer.mark_emitted();

                let advance = advance_index(
                    current,
                    rate,
                    shared.is_reversed(),
                    decision.frames_to_skip,
                    shared.total_frames(),
                );
                shared.store_position(advance.next_index);
                match advance.wrap {
                    Wrap::ToStart => {
                        tracing::debug!("Forward playback wrapped to start");
                        if let Err(err) = source.seek_to_frame(0) {
                            tracing::warn!(error = %err, "Wrap seek failed");
                        }
                        if !loop_completed {
                            loop_completed = true;
                            events.post(PlaybackEvent::FirstPlayCompleted);
                        }
                    }
                    Wrap::ToEnd => {
                        let last = (shared.total_frames() - 1).max(0);
                        tracing::debug!(frame = last, "Reverse playback wrapped to end");
                        if let Err(err) = source.seek_to_frame(last) {
                            tracing::warn!(error = %err, "Wrap seek failed");
                        }
                    }
                    Wrap::None => {}
                }
            }
            PacingMode::RealTime => {
                sleep_interruptible(pacer.realtime_quota(rate), shared);
                if shared.is_stopping() {
                    return LoopExit::Stopped;
                }
                match source.read_next() {
                    Ok(frame) => {
                        read_failures = 0;
                        match emitter.emit(&frame) {
                            EmitResult::Delivered => {}
                            EmitResult::Cancelled => return LoopExit::Stopped,
                            EmitResult::SinkFailed => return LoopExit::Failed,
                            EmitResult::BadFrame => continue,
                        }
                        // An externally paced source owns its position.
                        shared.store_position(source.position_frame() as f64);
                    }
                    Err(err) => {
                        read_failures += 1;
                        tracing::warn!(error = %err, failures = read_failures, "Live read failed");
                        if read_failures >= MAX_READ_FAILURES {
                            return LoopExit::Failed;
                        }
                    }
                }
            }
        }
    }
}

/// Bring the source to `desired`: sequential read needs nothing, a short
/// forward gap is bridged with cheap grabs, anything else is an absolute
/// seek.
fn position_source(source: &mut dyn FrameSource, desired: i64) -> Result<(), SourceError> {
    let gap = desired - source.position_frame();
    if gap == 0 {
        return Ok(());
    }
    if gap > 0 && gap <= GRAB_BRIDGE_MAX {
        for _ in 0..gap {
            source.grab_only()?;
        }
        return Ok(());
    }
    source.seek_to_frame(desired)
}

/// After a failed read, fall back to the near boundary of the current
/// direction and retry from there.
fn recover_to_boundary(source: &mut dyn FrameSource, shared: &PlaybackShared) {
    let boundary = if shared.is_reversed() {
        (shared.total_frames() - 1).max(0)
    } else {
        0
    };
    if source.seek_to_frame(boundary).is_ok() {
        shared.store_position(boundary as f64);
    }
}

fn sleep_interruptible(total: Duration, shared: &PlaybackShared) {
    let mut remaining = total;
    while remaining > Duration::ZERO && !shared.is_stopping() && !shared.is_paused() {
        let slice = remaining.min(SLEEP_SLICE);
        thread::sleep(slice);
        remaining = remaining.saturating_sub(slice);
    }
}

enum EmitResult {
    Delivered,
    Cancelled,
    SinkFailed,
    BadFrame,
}

/// Stages frames and forwards them to the render queue, owning the texture
/// handle and the first-frame latch for one run.
struct FrameEmitter<'a> {
    stager: FrameStager,
    shared: &'a PlaybackShared,
    events: &'a EventSender,
    render: &'a RenderHandle,
    texture: Option<fc_common::TextureHandle>,
    first_frame_sent: bool,
}

impl<'a> FrameEmitter<'a> {
    fn new(shared: &'a PlaybackShared, events: &'a EventSender, render: &'a RenderHandle) -> Self {
        Self {
            stager: FrameStager::new(),
            shared,
            events,
            render,
            texture: None,
            first_frame_sent: false,
        }
    }

    fn emit(&mut self, frame: &SourceFrame) -> EmitResult {
        let shared = self.shared;
        let staged = match self
            .stager
            .stage(frame, shared.resolution(), || shared.is_stopping())
        {
            Ok(staged) => staged,
            Err(StageError::Cancelled) => return EmitResult::Cancelled,
            Err(err) => {
                tracing::warn!(error = %err, "Dropping frame");
                return EmitResult::BadFrame;
            }
        };

        if staged.reallocated {
            let resolution = staged.surface.resolution();
            match self
                .render
                .create_or_resize_blocking(resolution, || shared.is_stopping())
            {
                Some(handle) => {
                    if let Some(old) = self.texture.take() {
                        if old != handle {
                            self.render.release(old);
                        }
                    }
                    self.texture = Some(handle);
                }
                None => {
                    return if shared.is_stopping() {
                        EmitResult::Cancelled
                    } else {
                        EmitResult::SinkFailed
                    };
                }
            }
        }

        if let Some(handle) = self.texture {
            self.render.upload(handle, staged.surface);
        }

        if !self.first_frame_sent {
            self.first_frame_sent = true;
            self.events.post(PlaybackEvent::FirstFrame);
        }
        EmitResult::Delivered
    }
}
