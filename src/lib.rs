//! Prism - realtime SRT/MPEG-TS ingest and MoQ/WebTransport fan-out relay
//!
//! This crate implements the data-plane core: per-stream pipeline
//! orchestration, a fan-out relay with GOP replay, codec-configuration
//! record builders, and global stream admission control. The SRT listener,
//! MPEG-TS demuxer internals, WebTransport/HTTP-3 session layer, and MoQ
//! control-message codec are out of scope here and are represented only as
//! the typed boundaries in [`demux`] and [`relay`].

pub mod codec_config;
pub mod config;
pub mod demux;
pub mod error;
pub mod frame;
pub mod pipeline;
pub mod relay;
pub mod stream_manager;

pub use error::{AppError, Result};
