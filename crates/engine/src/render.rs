//! Render-thread task queue.
//!
//! Texture creation, upload, and release execute only on the consumer
//! thread that owns the rendering context. The worker posts tasks onto this
//! queue; the consumer executes them against its `TextureSink` during the
//! engine pump. Creation is the only task the worker waits on (one-shot
//! reply channel, polled with a short timeout so a stop request is never
//! missed); uploads are fire-and-forget.

use std::sync::Arc;
use std::time::Duration;

use crossbeam::channel::{bounded, unbounded, Receiver, RecvTimeoutError, Sender};

use fc_common::{Resolution, SinkError, TextureHandle, TextureSink, UpdateRegion};

use crate::stager::PixelSurface;

/// How long the worker waits on a creation reply before re-checking for
/// cancellation.
const REPLY_POLL: Duration = Duration::from_millis(10);

/// A texture operation to execute on the consumer thread.
pub enum RenderTask {
    /// Create the backing texture or recreate it at a new size. The worker
    /// blocks on `reply` until the consumer has executed the task.
    CreateOrResize {
        resolution: Resolution,
        reply: Sender<Result<TextureHandle, SinkError>>,
    },
    /// Upload a staged surface region. The surface reference is dropped
    /// once the upload has run, freeing the stager buffer for reuse.
    Upload {
        handle: TextureHandle,
        region: UpdateRegion,
        surface: Arc<PixelSurface>,
        pitch: u32,
        bytes_per_pixel: u32,
    },
    /// Release the texture behind `handle`.
    Release { handle: TextureHandle },
    /// Release every texture live at the moment this task executes. Posted
    /// by the engine's Stop path; ordering in the queue guarantees tasks
    /// from a later run are unaffected.
    ReleaseAll,
}

/// Worker-side handle for posting render tasks.
#[derive(Clone)]
pub struct RenderHandle {
    tx: Sender<RenderTask>,
}

impl RenderHandle {
    /// Post a creation task and wait for the resulting handle. `cancel` is
    /// polled between reply timeouts; returns `None` on cancellation, sink
    /// failure, or a dropped queue.
    pub fn create_or_resize_blocking(
        &self,
        resolution: Resolution,
        cancel: impl Fn() -> bool,
    ) -> Option<TextureHandle> {
        let (reply_tx, reply_rx) = bounded(1);
        if self
            .tx
            .send(RenderTask::CreateOrResize {
                resolution,
                reply: reply_tx,
            })
            .is_err()
        {
            return None;
        }
        loop {
            match reply_rx.recv_timeout(REPLY_POLL) {
                Ok(Ok(handle)) => return Some(handle),
                Ok(Err(err)) => {
                    tracing::warn!(error = %err, resolution = %resolution, "Texture creation failed");
                    return None;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if cancel() {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Post a fire-and-forget upload of the full surface.
    pub fn upload(&self, handle: TextureHandle, surface: Arc<PixelSurface>) {
        let resolution = surface.resolution();
        let region = UpdateRegion::covering(resolution);
        let _ = self.tx.send(RenderTask::Upload {
            handle,
            region,
            surface,
            pitch: region.pitch(4),
            bytes_per_pixel: 4,
        });
    }

    /// Post a fire-and-forget release.
    pub fn release(&self, handle: TextureHandle) {
        let _ = self.tx.send(RenderTask::Release { handle });
    }
}

/// Consumer-side queue executor. Tracks handles produced by creation tasks
/// so teardown can release whatever is still live.
pub struct RenderQueue {
    tx: Sender<RenderTask>,
    rx: Receiver<RenderTask>,
    live: Vec<TextureHandle>,
}

impl RenderQueue {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            live: Vec::new(),
        }
    }

    pub fn handle(&self) -> RenderHandle {
        RenderHandle {
            tx: self.tx.clone(),
        }
    }

    /// Execute all queued tasks against `sink` on the calling thread.
    /// Returns the number of tasks executed.
    pub fn pump(&mut self, sink: &mut dyn TextureSink) -> usize {
        let mut executed = 0;
        while let Ok(task) = self.rx.try_recv() {
            executed += 1;
            match task {
                RenderTask::CreateOrResize { resolution, reply } => {
                    let result = sink.create_or_resize(resolution);
                    if let Ok(handle) = &result {
                        if !self.live.contains(handle) {
                            self.live.push(*handle);
                        }
                    }
                    let _ = reply.send(result);
                }
                RenderTask::Upload {
                    handle,
                    region,
                    surface,
                    pitch,
                    bytes_per_pixel,
                } => {
                    if let Err(err) =
                        sink.upload_region(handle, region, surface.bytes(), pitch, bytes_per_pixel)
                    {
                        tracing::warn!(error = %err, handle = %handle, "Texture upload failed");
                    }
                }
                RenderTask::Release { handle } => {
                    sink.release(handle);
                    self.live.retain(|h| *h != handle);
                }
                RenderTask::ReleaseAll => {
                    for handle in self.live.drain(..) {
                        sink.release(handle);
                    }
                }
            }
        }
        executed
    }

    /// Queue the release of every live texture. Executed by a later pump,
    /// after any uploads already in the queue.
    pub fn post_release_all(&self) {
        let _ = self.tx.send(RenderTask::ReleaseAll);
    }

    /// Synchronously release every live texture through `sink`.
    pub fn release_all(&mut self, sink: &mut dyn TextureSink) {
        for handle in self.live.drain(..) {
            sink.release(handle);
        }
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stager::FrameStager;
    use fc_common::SourceFrame;

    /// Sink that records every call for assertions.
    #[derive(Default)]
    struct RecordingSink {
        next_handle: u64,
        creates: Vec<Resolution>,
        uploads: Vec<(TextureHandle, UpdateRegion, usize)>,
        releases: Vec<TextureHandle>,
    }

    impl TextureSink for RecordingSink {
        fn create_or_resize(&mut self, resolution: Resolution) -> Result<TextureHandle, SinkError> {
            self.creates.push(resolution);
            self.next_handle += 1;
            Ok(TextureHandle(self.next_handle))
        }

        fn upload_region(
            &mut self,
            handle: TextureHandle,
            region: UpdateRegion,
            pixels: &[u8],
            _pitch: u32,
            _bytes_per_pixel: u32,
        ) -> Result<(), SinkError> {
            self.uploads.push((handle, region, pixels.len()));
            Ok(())
        }

        fn release(&mut self, handle: TextureHandle) {
            self.releases.push(handle);
        }
    }

    fn staged_surface(width: u32, height: u32) -> Arc<PixelSurface> {
        let mut stager = FrameStager::new();
        let frame = SourceFrame::new(
            vec![7u8; (width * height * 3) as usize],
            Resolution::new(width, height),
        );
        stager.stage(&frame, None, || false).unwrap().surface
    }

    #[test]
    fn create_roundtrip_through_pump() {
        let mut queue = RenderQueue::new();
        let handle = queue.handle();
        let mut sink = RecordingSink::default();

        let resolution = Resolution::new(64, 32);
        let worker = std::thread::spawn(move || {
            handle.create_or_resize_blocking(resolution, || false)
        });

        // Pump until the worker's task arrives and is executed.
        let mut executed = 0;
        while executed == 0 {
            executed = queue.pump(&mut sink);
        }
        let got = worker.join().unwrap();
        assert_eq!(got, Some(TextureHandle(1)));
        assert_eq!(sink.creates, vec![resolution]);
    }

    #[test]
    fn blocking_create_respects_cancel() {
        let queue = RenderQueue::new();
        let handle = queue.handle();
        // Nobody pumps: the cancel predicate must break the wait.
        let got = handle.create_or_resize_blocking(Resolution::new(8, 8), || true);
        assert_eq!(got, None);
    }

    #[test]
    fn upload_executes_with_surface_bytes() {
        let mut queue = RenderQueue::new();
        let handle = queue.handle();
        let mut sink = RecordingSink::default();

        let surface = staged_surface(4, 2);
        handle.upload(TextureHandle(9), Arc::clone(&surface));
        assert_eq!(queue.pump(&mut sink), 1);

        let (texture, region, len) = sink.uploads[0];
        assert_eq!(texture, TextureHandle(9));
        assert_eq!(region, UpdateRegion::covering(Resolution::new(4, 2)));
        assert_eq!(len, 4 * 2 * 4);
    }

    #[test]
    fn upload_drops_surface_reference_after_pump() {
        let mut queue = RenderQueue::new();
        let handle = queue.handle();
        let mut sink = RecordingSink::default();

        let surface = staged_surface(4, 2);
        handle.upload(TextureHandle(1), Arc::clone(&surface));
        assert_eq!(Arc::strong_count(&surface), 3);
        queue.pump(&mut sink);
        // Queue and task copies are gone; only the stager's and ours remain.
        assert_eq!(Arc::strong_count(&surface), 2);
    }

    #[test]
    fn release_all_covers_live_handles() {
        let mut queue = RenderQueue::new();
        let handle = queue.handle();
        let mut sink = RecordingSink::default();

        let resolution = Resolution::new(16, 16);
        let worker = std::thread::spawn(move || {
            handle.create_or_resize_blocking(resolution, || false)
        });
        while queue.pump(&mut sink) == 0 {}
        let created = worker.join().unwrap().unwrap();

        queue.post_release_all();
        queue.pump(&mut sink);
        assert_eq!(sink.releases, vec![created]);

        // A second teardown is a no-op.
        queue.post_release_all();
        queue.pump(&mut sink);
        assert_eq!(sink.releases.len(), 1);
    }

    #[test]
    fn explicit_release_removes_from_live_set() {
        let mut queue = RenderQueue::new();
        let handle = queue.handle();
        let mut sink = RecordingSink::default();

        let worker = {
            let handle = handle.clone();
            std::thread::spawn(move || {
                handle.create_or_resize_blocking(Resolution::new(8, 8), || false)
            })
        };
        while queue.pump(&mut sink) == 0 {}
        let created = worker.join().unwrap().unwrap();

        handle.release(created);
        queue.pump(&mut sink);
        assert_eq!(sink.releases, vec![created]);

        queue.release_all(&mut sink);
        assert_eq!(sink.releases.len(), 1);
    }
}
