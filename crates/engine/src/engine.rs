//! Engine facade: the consumer-facing control surface.
//!
//! One `VideoEngine` owns at most one decode worker at a time. Control calls
//! (start, stop, pause, seek) return immediately; the worker reacts on its
//! next loop iteration. The consumer drives delivery by calling
//! [`pump`](VideoEngine::pump) from the thread that owns its `TextureSink`,
//! which executes queued texture tasks and dispatches queued notifications.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use fc_common::{
    FrameSourceFactory, PacingMode, PathResolver, PlaybackConfig, Resolution, TextureSink,
};

use crate::notify::{NotificationBus, PlaybackEvent};
use crate::render::RenderQueue;
use crate::state::{PlaybackShared, PlaybackStatus};
use crate::worker::{self, WorkerContext};

/// Playback engine for one video surface.
///
/// Collaborators are injected at construction: a factory producing fresh
/// frame sources (one per run) and a resolver mapping logical play cases to
/// concrete paths.
pub struct VideoEngine {
    factory: Arc<dyn FrameSourceFactory>,
    resolver: Arc<dyn PathResolver>,
    bus: NotificationBus,
    queue: RenderQueue,
    shared: Arc<PlaybackShared>,
    worker: Option<JoinHandle<()>>,
    /// Background join of the previous worker; awaited before a new worker
    /// spawns so two decode loops never overlap.
    reaper: Option<JoinHandle<()>>,
    /// Retained so ContinuePlay can restart a stopped run.
    config: Option<PlaybackConfig>,
}

impl VideoEngine {
    pub fn new(factory: Arc<dyn FrameSourceFactory>, resolver: Arc<dyn PathResolver>) -> Self {
        Self {
            factory,
            resolver,
            bus: NotificationBus::new(),
            queue: RenderQueue::new(),
            shared: Arc::new(PlaybackShared::new(1.0)),
            worker: None,
            reaper: None,
            config: None,
        }
    }

    // -- Lifecycle --

    /// Begin playback of `case`. Any prior run is stopped first.
    ///
    /// Path resolution happens before a worker is spawned; a case that
    /// resolves to nothing posts `SourceNotFound` and leaves the engine
    /// stopped. All later failures arrive through `on_failed`.
    pub fn start(
        &mut self,
        case: &str,
        mode: PacingMode,
        target_fps: u32,
        on_failed: impl FnMut() + Send + 'static,
        on_first_frame: impl FnMut() + Send + 'static,
    ) {
        self.stop();
        self.bus.bind_failed(on_failed);
        self.bus.bind_first_frame(on_first_frame);

        let resolved = match self.resolver.resolve(case) {
            Ok(resolved) => resolved,
            Err(err) => {
                tracing::warn!(error = %err, case, "Play case did not resolve");
                self.bus.post(PlaybackEvent::SourceNotFound);
                return;
            }
        };
        tracing::info!(case, path = %resolved.path.display(), "Starting playback");

        let config = PlaybackConfig::new(
            resolved.path.to_string_lossy().into_owned(),
            mode,
            target_fps,
        );
        let shared = Arc::new(PlaybackShared::new(config.rate));
        shared.set_resolution(resolved.resolution);

        self.shared = Arc::clone(&shared);
        self.config = Some(config.clone());
        self.spawn_worker(config, shared, None);
    }

    /// Stop playback. Safe to call from any state and never blocks on the
    /// worker: the stop flag is raised, the join happens on a reaper
    /// thread, and texture release is queued for the next pump.
    pub fn stop(&mut self) {
        self.shared.request_stop();
        self.queue.post_release_all();
        if let Some(handle) = self.worker.take() {
            let spawned = thread::Builder::new().name("worker-reaper".into()).spawn(
                move || {
                    if handle.join().is_err() {
                        tracing::error!("Decode worker panicked");
                    }
                },
            );
            match spawned {
                Ok(reaper) => self.reaper = Some(reaper),
                Err(err) => {
                    // The worker still winds down on the stop flag; it just
                    // goes unjoined.
                    tracing::warn!(error = %err, "Reaper spawn failed");
                }
            }
        }
    }

    /// Wait for any previous worker to finish winding down. Quick: the stop
    /// flag is already raised and every worker sleep is bounded.
    fn await_teardown(&mut self) {
        if let Some(reaper) = self.reaper.take() {
            let _ = reaper.join();
        }
        if let Some(worker) = self.worker.take() {
            // A worker that exited on its own (Failed) was never reaped.
            let _ = worker.join();
        }
    }

    /// Resume playback at `frame` (negative keeps the current position).
    ///
    /// On a live run this is an absolute seek. On a stopped engine it
    /// restarts the worker from the retained config, carrying over rate,
    /// direction, and custom resolution.
    pub fn continue_play(&mut self, frame: i64) {
        if self.status() != PlaybackStatus::Stopped {
            if frame >= 0 {
                self.shared.request_seek(frame);
            }
            return;
        }

        let config = match self.config.clone() {
            Some(config) => config,
            None => {
                tracing::warn!("ContinuePlay without a prior start");
                return;
            }
        };
        tracing::info!(frame, "Restarting stopped playback");

        let shared = Arc::new(PlaybackShared::new(self.shared.rate()));
        shared.set_reversed(self.shared.is_reversed());
        shared.set_resolution(self.shared.resolution());
        let start_frame = (frame >= 0).then_some(frame);
        if let Some(frame) = start_frame {
            shared.store_position(frame as f64);
        }

        self.shared = Arc::clone(&shared);
        self.spawn_worker(config, shared, start_frame);
    }

    fn spawn_worker(
        &mut self,
        config: PlaybackConfig,
        shared: Arc<PlaybackShared>,
        start_frame: Option<i64>,
    ) {
        self.await_teardown();
        shared.set_status(PlaybackStatus::Running);
        let ctx = WorkerContext {
            source: self.factory.create(),
            config,
            shared: Arc::clone(&shared),
            events: self.bus.sender(),
            render: self.queue.handle(),
            start_frame,
        };
        match worker::spawn(ctx) {
            Ok(handle) => self.worker = Some(handle),
            Err(err) => {
                tracing::error!(error = %err, "Worker thread spawn failed");
                shared.set_status(PlaybackStatus::Stopped);
                self.bus.post(PlaybackEvent::Failed);
            }
        }
    }

    // -- Playback controls --

    pub fn pause(&self) {
        self.shared.pause();
    }

    pub fn resume(&self) {
        self.shared.resume();
    }

    pub fn set_rate(&self, rate: f32) {
        self.shared.set_rate(rate);
    }

    pub fn set_reverse(&self, reversed: bool) {
        self.shared.set_reversed(reversed);
    }

    /// Set the staging resolution. `None` or a zero size restores the
    /// source's native size on the next staged frame.
    pub fn set_resolution(&self, resolution: Option<Resolution>) {
        self.shared.set_resolution(resolution);
    }

    /// Request an absolute seek, honored on the worker's next iteration.
    pub fn seek(&self, frame: i64) {
        self.shared.request_seek(frame);
    }

    // -- Notifications --

    pub fn bind_first_play_completed(&mut self, callback: impl FnMut() + Send + 'static) {
        self.bus.bind_first_play_completed(callback);
    }

    pub fn bind_source_not_found(&mut self, callback: impl FnMut() + Send + 'static) {
        self.bus.bind_source_not_found(callback);
    }

    // -- Consumer-thread pump --

    /// Execute queued texture tasks against `sink` and deliver queued
    /// notifications. Must be called from the thread that owns the
    /// rendering context. Returns the number of tasks plus events handled.
    pub fn pump(&mut self, sink: &mut dyn TextureSink) -> usize {
        self.queue.pump(sink) + self.bus.drain()
    }

    // -- Snapshots --

    pub fn status(&self) -> PlaybackStatus {
        self.shared.status()
    }

    /// Fractional current frame index.
    pub fn position(&self) -> f64 {
        self.shared.position()
    }

    /// Total frame count of the current source, 0 until known.
    pub fn total_frames(&self) -> i64 {
        self.shared.total_frames()
    }
}

impl Drop for VideoEngine {
    fn drop(&mut self) {
        self.shared.request_stop();
        // Unlike Stop, drop joins inline so no worker outlives the engine.
        self.await_teardown();
    }
}
