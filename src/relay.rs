//! Fan-out relay: broadcasts video/audio/caption frames to every
//! registered viewer of one stream, caches the current Group of Pictures
//! so late joiners can start decoding cleanly, and latches video/audio
//! metadata behind a readiness signal.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use parking_lot::RwLock;

use crate::demux::Readiness;
use crate::frame::{AudioFrame, AudioInfo, CaptionFrame, GroupId, VideoFrame, VideoInfo, ViewerStats};

/// A registered fan-out destination. Sends must never block the relay;
/// a viewer implementation owns its own queueing and back-pressure policy
/// and reports drops through `stats`.
pub trait Viewer: Send + Sync + 'static {
    fn id(&self) -> &str;
    fn send_video(&self, frame: VideoFrame);
    fn send_audio(&self, frame: AudioFrame);
    fn send_captions(&self, frame: CaptionFrame);
    fn stats(&self) -> ViewerStats;
}

/// The fan-out surface the pipeline drives. `Relay` is the only
/// implementation in this crate; the trait exists so `Pipeline` depends
/// on behavior rather than a concrete type.
#[async_trait]
pub trait Broadcaster: Send + Sync + 'static {
    fn broadcast_video(&self, frame: VideoFrame);
    fn broadcast_audio(&self, frame: AudioFrame);
    fn broadcast_captions(&self, frame: CaptionFrame);
    fn set_video_info(&self, info: VideoInfo);
    fn video_info(&self) -> VideoInfo;
    async fn wait_video_info(&self);
    fn set_audio_info(&self, info: AudioInfo);
    fn audio_info(&self) -> AudioInfo;
    fn set_audio_track_count(&self, n: usize);
    fn audio_track_count(&self) -> usize;
    fn add_viewer(&self, viewer: Arc<dyn Viewer>);
    fn remove_viewer(&self, id: &str);
    fn viewer_count(&self) -> usize;
    fn viewer_stats_all(&self) -> Vec<ViewerStats>;
}

/// GOP cache and viewer map are guarded by one lock, not two. `AddViewer`
/// (replay-then-insert) and `BroadcastVideo` (cache-then-send) each hold
/// this lock for their whole critical section, so the two can never
/// interleave: a viewer added mid-broadcast either joins before the cache
/// mutation and the send loop picks it up, or joins after and its replay
/// already includes the frame just broadcast. Never the gap between.
struct RelayCache {
    viewers: HashMap<String, Arc<dyn Viewer>>,
    gop: Vec<VideoFrame>,
}

struct RelayState {
    cache: RwLock<RelayCache>,
    max_gop_cache_frames: usize,
    video_info: ArcSwap<VideoInfo>,
    audio_info: ArcSwap<AudioInfo>,
    audio_track_count: AtomicUsize,
    video_info_ready: Arc<Readiness>,
}

/// Concurrent fan-out from one producer (the pipeline) to N viewers.
///
/// The viewer map and GOP cache share one `parking_lot::RwLock` (read-mostly:
/// broadcasts take a read lock where they don't mutate the cache, add/remove
/// and keyframe-triggered cache resets take a write lock); the hot
/// single-value info reads sit behind an `ArcSwap` so a new viewer's info
/// lookup never contends with in-flight broadcasts.
pub struct Relay {
    stream_key: String,
    state: Arc<RelayState>,
}

impl Relay {
    pub fn new(stream_key: impl Into<String>, max_gop_cache_frames: usize) -> Self {
        Relay {
            stream_key: stream_key.into(),
            state: Arc::new(RelayState {
                cache: RwLock::new(RelayCache {
                    viewers: HashMap::new(),
                    gop: Vec::new(),
                }),
                max_gop_cache_frames,
                video_info: ArcSwap::from_pointee(VideoInfo::default()),
                audio_info: ArcSwap::from_pointee(AudioInfo::default()),
                audio_track_count: AtomicUsize::new(1),
                video_info_ready: Arc::new(Readiness::new()),
            }),
        }
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }
}

#[async_trait]
impl Broadcaster for Relay {
    fn broadcast_video(&self, frame: VideoFrame) {
        let mut cache = self.state.cache.write();
        if frame.is_keyframe {
            cache.gop.clear();
            cache.gop.push(frame.clone());
        } else if cache.gop.first().map(|k| k.group_id) == Some(frame.group_id) {
            if cache.gop.len() >= self.state.max_gop_cache_frames {
                // No keyframe for far too long; drop the stale cache
                // rather than let a late viewer replay an unbounded backlog.
                cache.gop.clear();
            } else {
                cache.gop.push(frame.clone());
            }
        }
        // else: pre-roll delta before the first keyframe has been seen
        // for this cache lifetime -- broadcast live, don't cache.
        for viewer in cache.viewers.values() {
            viewer.send_video(frame.clone());
        }
    }

    fn broadcast_audio(&self, frame: AudioFrame) {
        let cache = self.state.cache.read();
        for viewer in cache.viewers.values() {
            viewer.send_audio(frame.clone());
        }
    }

    fn broadcast_captions(&self, frame: CaptionFrame) {
        let cache = self.state.cache.read();
        for viewer in cache.viewers.values() {
            viewer.send_captions(frame.clone());
        }
    }

    fn set_video_info(&self, info: VideoInfo) {
        self.state.video_info.store(Arc::new(info));
        self.state.video_info_ready.fire();
    }

    fn video_info(&self) -> VideoInfo {
        (**self.state.video_info.load()).clone()
    }

    async fn wait_video_info(&self) {
        self.state.video_info_ready.wait().await;
    }

    fn set_audio_info(&self, info: AudioInfo) {
        self.state.audio_info.store(Arc::new(info));
    }

    fn audio_info(&self) -> AudioInfo {
        (**self.state.audio_info.load()).clone()
    }

    fn set_audio_track_count(&self, n: usize) {
        self.state.audio_track_count.store(n.max(1), Ordering::SeqCst);
    }

    fn audio_track_count(&self) -> usize {
        self.state.audio_track_count.load(Ordering::SeqCst)
    }

    fn add_viewer(&self, viewer: Arc<dyn Viewer>) {
        let id = viewer.id().to_string();
        let mut cache = self.state.cache.write();
        for frame in cache.gop.iter() {
            viewer.send_video(frame.clone());
        }
        cache.viewers.insert(id, viewer);
    }

    fn remove_viewer(&self, id: &str) {
        self.state.cache.write().viewers.remove(id);
    }

    fn viewer_count(&self) -> usize {
        self.state.cache.read().viewers.len()
    }

    fn viewer_stats_all(&self) -> Vec<ViewerStats> {
        self.state.cache.read().viewers.values().map(|v| v.stats()).collect()
    }
}
