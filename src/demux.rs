//! The frame-source boundary the Pipeline consumes. The MPEG-TS section
//! parsing, PES reassembly, and elementary-stream parsing that actually
//! produce these frames are out of scope for this crate; `Demuxer` is the
//! typed seam a concrete implementation plugs into.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use tokio::sync::{mpsc, Notify};
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::frame::{AudioFrame, AudioTrackChannel, CaptionFrame, VideoFrame};

/// Channel capacities recommended by the spec's observed SRT delivery
/// characteristics: video at ~60 frames of headroom, audio ~120 (audio
/// produces roughly 3x the frame rate of video), captions rarely buffer.
pub const VIDEO_CHANNEL_CAPACITY: usize = 60;
pub const AUDIO_CHANNEL_CAPACITY: usize = 120;
pub const CAPTION_CHANNEL_CAPACITY: usize = 30;

/// A one-shot, level-triggered readiness signal. Unlike a bare
/// `tokio::sync::Notify`, a waiter that calls `wait` after the signal has
/// already fired observes it immediately rather than hanging forever --
/// exactly the "manually-reset event" behavior the spec calls for.
#[derive(Debug, Default)]
pub struct Readiness {
    fired: std::sync::atomic::AtomicBool,
    notify: Notify,
}

impl Readiness {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fires the signal. Idempotent: subsequent calls are no-ops.
    pub fn fire(&self) {
        if !self.fired.swap(true, Ordering::SeqCst) {
            self.notify.notify_waiters();
        }
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::SeqCst)
    }

    /// Waits for the signal to fire, returning immediately if it already
    /// has.
    pub async fn wait(&self) {
        if self.is_fired() {
            return;
        }
        let notified = self.notify.notified();
        if self.is_fired() {
            return;
        }
        notified.await;
    }
}

/// The three receive-only frame channels a demuxer exposes to the
/// pipeline, handed over once via [`Demuxer::take_ports`].
pub struct DemuxerPorts {
    pub video: mpsc::Receiver<VideoFrame>,
    pub audio: mpsc::Receiver<AudioFrame>,
    pub captions: mpsc::Receiver<CaptionFrame>,
}

/// Approximate, atomically-updated counters a demuxer maintains so the
/// pipeline can report channel depth without holding a lock.
#[derive(Debug, Default)]
pub struct DemuxStats {
    pub video_queue_depth: AtomicU64,
    pub audio_queue_depth: AtomicU64,
    pub caption_queue_depth: AtomicU64,
    pub video_frames_in: AtomicU64,
    pub audio_frames_in: AtomicU64,
    pub caption_frames_in: AtomicU64,
}

/// The frame-source boundary. A concrete implementation wraps an SRT
/// socket and an MPEG-TS parser; this crate only depends on the trait.
///
/// Construction happens outside `run`: callers build a `Demuxer`, call
/// `take_ports` exactly once to obtain its channels, then move the boxed
/// demuxer into `run` on its own task. This two-phase shape keeps the
/// trait object-safe (the channels can't be returned by `run` itself,
/// since `run` takes `self` by value for the task spawn) while still
/// letting the pipeline own the receiving ends.
///
/// `pmt_ready` and `audio_track_channels_handle` both return shared
/// handles rather than borrowing `&self`, because by the time the PMT
/// fires the `Demuxer` value itself has already been moved into the
/// spawned `run` task -- the pipeline can no longer call `&self` methods
/// on it. Both handles must be obtained before `run` is called.
#[async_trait]
pub trait Demuxer: Send + 'static {
    /// Hands over the video/audio/caption receivers. Must be called
    /// exactly once, before `run`.
    fn take_ports(&mut self) -> DemuxerPorts;

    /// Fires once the PMT (program composition) has been parsed.
    fn pmt_ready(&self) -> Arc<Readiness>;

    /// Shared, lock-free handle to the audio tracks discovered so far.
    /// The vector it points to may grow as later PMT updates arrive; the
    /// pipeline re-checks it on each audio frame.
    fn audio_track_channels_handle(&self) -> Arc<ArcSwap<Vec<AudioTrackChannel>>>;

    fn set_stats(&mut self, stats: Arc<DemuxStats>);

    /// Runs until the input ends or `cancel` fires. An `Err` return means
    /// the demuxer terminated abnormally before producing any usable
    /// stream data; the pipeline treats even this as a normal
    /// end-of-stream, per the error-absorption policy in `error.rs`.
    async fn run(self: Box<Self>, cancel: CancellationToken) -> Result<()>;
}
