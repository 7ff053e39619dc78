//! Elementary media frame types shared by the demuxer boundary, the
//! pipeline, and the relay.

use bytes::Bytes;

/// Monotonic identifier shared by every frame in one Group of Pictures.
/// Newtype rather than a bare `u64` so GOP bookkeeping can't be confused
/// with PTS/DTS or counter values at the call site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u64);

/// Video codec carried by a frame. Only the two codecs CodecConfig builds
/// configuration records for are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    H264,
    H265,
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
        }
    }
}

/// One decoded access unit of video, still in Annex-B NAL framing.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Presentation timestamp, microticks.
    pub pts: i64,
    /// Decode timestamp, microticks.
    pub dts: i64,
    pub is_keyframe: bool,
    /// NAL units in Annex-B form: each may carry a 3- or 4-byte start code,
    /// or be raw. `AnnexBToAVC1` strips whichever is present.
    pub nalus: Vec<Bytes>,
    /// Sequence Parameter Set, present on every frame of an AVC/HEVC
    /// stream (demuxer re-attaches the most recent one).
    pub sps: Option<Bytes>,
    /// Picture Parameter Set.
    pub pps: Option<Bytes>,
    /// Video Parameter Set; HEVC only.
    pub vps: Option<Bytes>,
    pub codec: VideoCodec,
    pub group_id: GroupId,
    /// Pre-serialized AVC1 (length-prefixed) form of `nalus`, ready for
    /// wire emission without re-walking the NAL list per viewer.
    pub avc1: Bytes,
}

/// One decoded access unit of audio. ADTS-wrapped on ingress; callers
/// strip the ADTS header before wire emission via `codec_config::strip_adts`.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    pub pts: i64,
    pub payload: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    pub track_index: usize,
}

/// One caption access unit, forwarded unmodified.
#[derive(Debug, Clone)]
pub struct CaptionFrame {
    pub pts: i64,
    pub payload: Bytes,
}

/// Metadata a new viewer's decoder needs before it can consume video.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoInfo {
    /// MIME codec string, e.g. "avc1.42e01e" or "hvc1.1.6.L93.B0".
    pub codec: String,
    pub width: u16,
    pub height: u16,
    /// AVCDecoderConfigurationRecord or HEVCDecoderConfigurationRecord bytes.
    pub decoder_config: Bytes,
}

/// Metadata a new viewer's audio decoder needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioInfo {
    pub codec: String,
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for AudioInfo {
    fn default() -> Self {
        AudioInfo {
            codec: "mp4a.40.02".to_string(),
            sample_rate: 0,
            channels: 0,
        }
    }
}

/// One audio elementary channel as announced by the demuxer's PMT.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioTrackChannel {
    pub sample_rate: u32,
    pub channels: u16,
}

/// Per-viewer counters reported back through the relay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewerStats {
    pub video_sent: u64,
    pub video_dropped: u64,
    pub audio_sent: u64,
    pub audio_dropped: u64,
    pub captions_sent: u64,
    pub captions_dropped: u64,
}
