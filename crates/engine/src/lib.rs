//! `fc-engine`: the video-frame streaming engine.
//!
//! Decodes a video source on a dedicated worker thread, paces frame delivery
//! to a configurable rate and direction, and hands renderer-ready BGRA
//! buffers to the consumer's `TextureSink` without ever blocking the
//! consumer's main loop. The pieces:
//!
//! - **engine**: `VideoEngine`, the consumer-facing facade
//! - **worker**: the decode loop thread
//! - **pacer**: wall-clock frame timing and catch-up skipping
//! - **state**: shared playback state and the index advance policy
//! - **stager**: double-buffered BGR→BGRA conversion and resizing
//! - **render**: the render-thread task queue
//! - **notify**: the asynchronous notification bus
//! - **profile**, **synthetic**: shipped resolver and source collaborators

pub mod engine;
pub mod notify;
pub mod pacer;
pub mod profile;
pub mod render;
pub mod stager;
pub mod state;
pub mod synthetic;
pub mod worker;

pub use engine::VideoEngine;
pub use notify::{NotificationBus, PlaybackEvent};
pub use profile::{FileResolver, ProfileResolver};
pub use state::{PlaybackShared, PlaybackStatus};
pub use synthetic::{SyntheticFactory, SyntheticSource};
