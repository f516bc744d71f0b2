//! Asynchronous playback notifications.
//!
//! The decode worker never invokes a consumer callback directly. It posts
//! events onto a channel; the consumer drains the channel from its own
//! thread (via the engine pump), which is where the bound callbacks run.

use crossbeam::channel::{unbounded, Receiver, Sender};

/// Playback lifecycle events delivered to the consumer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    /// The source failed to open or closed mid-play. The decode loop has
    /// stopped.
    Failed,
    /// The first frame of this run was decoded and handed to the sink.
    FirstFrame,
    /// Forward playback wrapped past the last frame for the first time
    /// this run.
    FirstPlayCompleted,
    /// Path resolution found no source; no worker was started.
    SourceNotFound,
}

/// Worker-side handle for posting events.
#[derive(Clone)]
pub struct EventSender {
    tx: Sender<PlaybackEvent>,
}

impl EventSender {
    /// Post an event. Delivery is best-effort; a consumer that dropped its
    /// bus is no longer listening.
    pub fn post(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }
}

type Callback = Box<dyn FnMut() + Send>;

/// Consumer-side event queue with four independently bindable callback
/// slots. Unbound slots swallow their events; rebinding replaces the
/// previous callback, never stacks.
pub struct NotificationBus {
    tx: Sender<PlaybackEvent>,
    rx: Receiver<PlaybackEvent>,
    on_failed: Option<Callback>,
    on_first_frame: Option<Callback>,
    on_first_play_completed: Option<Callback>,
    on_source_not_found: Option<Callback>,
}

impl NotificationBus {
    pub fn new() -> Self {
        let (tx, rx) = unbounded();
        Self {
            tx,
            rx,
            on_failed: None,
            on_first_frame: None,
            on_first_play_completed: None,
            on_source_not_found: None,
        }
    }

    /// A cloneable sender for the worker thread.
    pub fn sender(&self) -> EventSender {
        EventSender {
            tx: self.tx.clone(),
        }
    }

    /// Post an event from the consumer side (e.g. an early rejection before
    /// any worker exists). Delivered on the next drain like any other.
    pub fn post(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }

    pub fn bind_failed(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_failed = Some(Box::new(callback));
    }

    pub fn bind_first_frame(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_first_frame = Some(Box::new(callback));
    }

    pub fn bind_first_play_completed(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_first_play_completed = Some(Box::new(callback));
    }

    pub fn bind_source_not_found(&mut self, callback: impl FnMut() + Send + 'static) {
        self.on_source_not_found = Some(Box::new(callback));
    }

    /// Dispatch all queued events to their bound callbacks on the calling
    /// thread. Returns the number of events drained.
    pub fn drain(&mut self) -> usize {
        let mut drained = 0;
        while let Ok(event) = self.rx.try_recv() {
            drained += 1;
            tracing::debug!(?event, "Delivering playback event");
            let slot = match event {
                PlaybackEvent::Failed => &mut self.on_failed,
                PlaybackEvent::FirstFrame => &mut self.on_first_frame,
                PlaybackEvent::FirstPlayCompleted => &mut self.on_first_play_completed,
                PlaybackEvent::SourceNotFound => &mut self.on_source_not_found,
            };
            if let Some(callback) = slot {
                callback();
            }
        }
        drained
    }
}

impl Default for NotificationBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn bound_callback_receives_event() {
        let mut bus = NotificationBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.bind_first_frame(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.sender().post(PlaybackEvent::FirstFrame);
        assert_eq!(bus.drain(), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unbound_slot_swallows_event() {
        let mut bus = NotificationBus::new();
        bus.sender().post(PlaybackEvent::Failed);
        assert_eq!(bus.drain(), 1);
    }

    #[test]
    fn rebind_replaces_not_stacks() {
        let mut bus = NotificationBus::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&first);
        bus.bind_failed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let counter = Arc::clone(&second);
        bus.bind_failed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        bus.sender().post(PlaybackEvent::Failed);
        bus.drain();
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn events_cross_threads() {
        let mut bus = NotificationBus::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        bus.bind_first_play_completed(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let sender = bus.sender();
        let handle = std::thread::spawn(move || {
            sender.post(PlaybackEvent::FirstPlayCompleted);
        });
        handle.join().unwrap();

        bus.drain();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn drain_empties_queue() {
        let mut bus = NotificationBus::new();
        bus.post(PlaybackEvent::FirstFrame);
        bus.post(PlaybackEvent::Failed);
        assert_eq!(bus.drain(), 2);
        assert_eq!(bus.drain(), 0);
    }
}
