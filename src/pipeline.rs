//! Per-stream orchestrator: owns a demuxer, enforces video-priority
//! forwarding, emits decoder configuration on the first keyframe, and
//! accumulates observability counters.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::codec_config::{build_avc_decoder_config, build_hevc_decoder_config, parse_h264_sps, parse_h265_sps};
use crate::demux::{DemuxStats, Demuxer, DemuxerPorts};
use crate::frame::{AudioInfo, AudioTrackChannel, VideoCodec, VideoFrame, VideoInfo};
use crate::relay::Broadcaster;

/// How long `run_loop` tolerates total silence on every frame channel
/// before treating the stream as dead, absent a better signal from the
/// demuxer itself. Mirrors the teacher's `tokio::time::timeout`-around-`recv`
/// idle-detection pattern used for its audio and rendezvous channels.
pub const DEFAULT_STREAM_IDLE_TIMEOUT: Duration = Duration::from_secs(10);

/// Point-in-time snapshot for the external status surface. `Serialize` so
/// the (out-of-scope) HTTP JSON status API can emit this directly.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StreamSnapshot {
    pub stream_key: String,
    pub uptime_secs: u64,
    pub protocol: &'static str,
    pub video_frames_in: u64,
    pub audio_frames_in: u64,
    pub caption_frames_in: u64,
    pub viewer_count: usize,
}

/// Internal counters, queried via `pipeline_debug`.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PipelineDebug {
    pub video_forwarded: u64,
    pub audio_forwarded: u64,
    pub captions_forwarded: u64,
    pub last_video_pts: i64,
    pub last_audio_pts: i64,
    pub video_queue_depth: u64,
    pub audio_queue_depth: u64,
}

#[derive(Default)]
struct Counters {
    video_forwarded: AtomicU64,
    audio_forwarded: AtomicU64,
    captions_forwarded: AtomicU64,
    last_video_pts: AtomicI64,
    last_audio_pts: AtomicI64,
}

/// Drives one stream end to end: pulls frames from a [`Demuxer`], applies
/// the video-priority forwarding discipline, and pushes them into a
/// [`Broadcaster`].
pub struct Pipeline {
    stream_key: String,
    broadcaster: Arc<dyn Broadcaster>,
    demux_stats: Arc<DemuxStats>,
    counters: Counters,
    started_at: Instant,
    video_info_sent: std::sync::atomic::AtomicBool,
    audio_tracks: Option<Arc<ArcSwap<Vec<AudioTrackChannel>>>>,
    stream_idle_timeout: Duration,
}

impl Pipeline {
    pub fn new(stream_key: impl Into<String>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Pipeline {
            stream_key: stream_key.into(),
            broadcaster,
            demux_stats: Arc::new(DemuxStats::default()),
            counters: Counters::default(),
            started_at: Instant::now(),
            video_info_sent: std::sync::atomic::AtomicBool::new(false),
            audio_tracks: None,
            stream_idle_timeout: DEFAULT_STREAM_IDLE_TIMEOUT,
        }
    }

    /// Overrides the default idle timeout, normally sourced from
    /// `AppConfig::stream_idle_timeout_secs`.
    pub fn with_stream_idle_timeout(mut self, timeout: Duration) -> Self {
        self.stream_idle_timeout = timeout;
        self
    }

    pub fn stream_key(&self) -> &str {
        &self.stream_key
    }

    pub fn snapshot(&self) -> StreamSnapshot {
        StreamSnapshot {
            stream_key: self.stream_key.clone(),
            uptime_secs: self.started_at.elapsed().as_secs(),
            protocol: "srt/mpeg-ts",
            video_frames_in: self.demux_stats.video_frames_in.load(Ordering::Relaxed),
            audio_frames_in: self.demux_stats.audio_frames_in.load(Ordering::Relaxed),
            caption_frames_in: self.demux_stats.caption_frames_in.load(Ordering::Relaxed),
            viewer_count: self.broadcaster.viewer_count(),
        }
    }

    pub fn debug(&self) -> PipelineDebug {
        PipelineDebug {
            video_forwarded: self.counters.video_forwarded.load(Ordering::Relaxed),
            audio_forwarded: self.counters.audio_forwarded.load(Ordering::Relaxed),
            captions_forwarded: self.counters.captions_forwarded.load(Ordering::Relaxed),
            last_video_pts: self.counters.last_video_pts.load(Ordering::Relaxed),
            last_audio_pts: self.counters.last_audio_pts.load(Ordering::Relaxed),
            video_queue_depth: self.demux_stats.video_queue_depth.load(Ordering::Relaxed),
            audio_queue_depth: self.demux_stats.audio_queue_depth.load(Ordering::Relaxed),
        }
    }

    /// Drives the stream until the demuxer ends or `cancel` fires. Every
    /// internal failure is logged and absorbed -- this always returns
    /// `Ok(())` on normal termination; end-of-stream is not a
    /// caller-visible fault.
    #[instrument(skip_all, fields(stream_key = %self.stream_key))]
    pub async fn run(mut self, mut demuxer: Box<dyn Demuxer>, cancel: CancellationToken) {
        demuxer.set_stats(self.demux_stats.clone());
        let pmt_ready = demuxer.pmt_ready();
        let audio_tracks = demuxer.audio_track_channels_handle();
        let DemuxerPorts {
            mut video,
            mut audio,
            mut captions,
        } = demuxer.take_ports();

        let demux_cancel = cancel.child_token();
        let mut demux_task = tokio::spawn(demuxer.run(demux_cancel.clone()));

        tokio::select! {
            _ = pmt_ready.wait() => {}
            result = &mut demux_task => {
                match result {
                    Ok(Ok(())) => info!("demuxer terminated before PMT ready"),
                    Ok(Err(e)) => warn!(error = %e, "demuxer error before PMT ready"),
                    Err(e) => warn!(error = %e, "demuxer task panicked before PMT ready"),
                }
                demux_cancel.cancel();
                return;
            }
            _ = cancel.cancelled() => {
                demux_cancel.cancel();
                demux_task.abort();
                return;
            }
        }

        self.broadcaster
            .set_audio_track_count(audio_tracks.load().len());
        self.audio_tracks = Some(audio_tracks);

        self.run_loop(&mut video, &mut audio, &mut captions, &cancel).await;

        demux_cancel.cancel();
    }

    async fn run_loop(
        &mut self,
        video: &mut mpsc::Receiver<VideoFrame>,
        audio: &mut mpsc::Receiver<crate::frame::AudioFrame>,
        captions: &mut mpsc::Receiver<crate::frame::CaptionFrame>,
        cancel: &CancellationToken,
    ) {
        loop {
            self.demux_stats
                .video_queue_depth
                .store(video.len() as u64, Ordering::Relaxed);
            self.demux_stats
                .audio_queue_depth
                .store(audio.len() as u64, Ordering::Relaxed);

            // Priority drain: a non-blocking video receive first. SRT
            // delivers audio in bursts that would otherwise win a fair
            // select every time and starve video.
            match video.try_recv() {
                Ok(frame) => {
                    self.forward_video(frame);
                    continue;
                }
                Err(mpsc::error::TryRecvError::Disconnected) => return,
                Err(mpsc::error::TryRecvError::Empty) => {}
            }

            let idle = tokio::time::sleep(self.stream_idle_timeout);
            tokio::pin!(idle);

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return,
                _ = &mut idle => {
                    warn!(
                        stream_key = %self.stream_key,
                        timeout_secs = self.stream_idle_timeout.as_secs(),
                        "no frames on any channel within the idle timeout; ending stream"
                    );
                    return;
                }
                video_frame = video.recv() => {
                    match video_frame {
                        Some(frame) => self.forward_video(frame),
                        None => return,
                    }
                }
                audio_frame = audio.recv() => {
                    match audio_frame {
                        Some(frame) => self.forward_audio(frame),
                        None => return,
                    }
                }
                caption_frame = captions.recv() => {
                    match caption_frame {
                        Some(frame) => self.forward_captions(frame),
                        None => return,
                    }
                }
            }
        }
    }

    fn forward_video(&self, frame: VideoFrame) {
        if !self.video_info_sent.load(Ordering::Relaxed) && frame.is_keyframe && frame.sps.is_some() {
            if let Some(info) = build_video_info(&frame) {
                self.broadcaster.set_video_info(info);
                self.video_info_sent.store(true, Ordering::Relaxed);
            }
        }
        self.counters.last_video_pts.store(frame.pts, Ordering::Relaxed);
        self.counters.video_forwarded.fetch_add(1, Ordering::Relaxed);
        self.broadcaster.broadcast_video(frame);
    }

    fn forward_audio(&self, frame: crate::frame::AudioFrame) {
        if frame.sample_rate > 0 && self.broadcaster.audio_info().sample_rate == 0 {
            self.broadcaster.set_audio_info(AudioInfo {
                codec: "mp4a.40.02".to_string(),
                sample_rate: frame.sample_rate,
                channels: frame.channels,
            });
        }
        if let Some(tracks) = &self.audio_tracks {
            let discovered = tracks.load().len();
            if discovered != self.broadcaster.audio_track_count() {
                self.broadcaster.set_audio_track_count(discovered);
            }
        }
        self.counters.last_audio_pts.store(frame.pts, Ordering::Relaxed);
        self.counters.audio_forwarded.fetch_add(1, Ordering::Relaxed);
        self.broadcaster.broadcast_audio(frame);
    }

    fn forward_captions(&self, frame: crate::frame::CaptionFrame) {
        self.counters.captions_forwarded.fetch_add(1, Ordering::Relaxed);
        self.broadcaster.broadcast_captions(frame);
    }
}

fn build_video_info(frame: &VideoFrame) -> Option<VideoInfo> {
    let sps = frame.sps.as_ref()?;
    match frame.codec {
        VideoCodec::H264 => {
            let pps = frame.pps.as_ref()?;
            let config = build_avc_decoder_config(sps, pps)?;
            // A malformed or truncated SPS still yields a usable decoder
            // config from its fixed profile/level bytes; geometry just
            // falls back to unknown (0, 0) rather than failing the whole
            // publish.
            let (codec, width, height) = match parse_h264_sps(sps) {
                Some(geometry) => (geometry.codec, geometry.width, geometry.height),
                None => (format!("avc1.{:02x}{:02x}{:02x}", sps[1], sps[2], sps[3]), 0, 0),
            };
            Some(VideoInfo {
                codec,
                width,
                height,
                decoder_config: config,
            })
        }
        VideoCodec::H265 => {
            let vps = frame.vps.as_ref()?;
            let pps = frame.pps.as_ref()?;
            let info = parse_h265_sps(sps)?;
            let config = build_hevc_decoder_config(vps, sps, pps)?;
            Some(VideoInfo {
                codec: format!(
                    "hvc1.{}.{:X}.L{}.B0",
                    info.general_profile_idc,
                    info.general_profile_compatibility_flags,
                    info.general_level_idc
                ),
                width: info.width,
                height: info.height,
                decoder_config: config,
            })
        }
    }
}
