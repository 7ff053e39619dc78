//! Prism entry point: parses CLI arguments, initializes logging, and
//! wires up the stream admission registry. The SRT listener, MPEG-TS
//! demuxer, WebTransport/HTTP-3 session layer, MoQ control-message
//! codec, and HTTP status API are integration points outside this
//! crate's scope and are not started here -- see `prism::demux::Demuxer`
//! and `prism::relay::Broadcaster` for the seams a full server binary
//! would plug into.

use std::path::PathBuf;

use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use prism::config::AppConfig;
use prism::stream_manager::StreamManager;

#[derive(Parser, Debug)]
#[command(name = "prism", about = "SRT/MPEG-TS ingest and MoQ fan-out relay core")]
struct CliArgs {
    /// Address the SRT listener would bind to.
    #[arg(long)]
    address: Option<String>,

    /// Path to a TOML configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level: error, warn, info, debug, trace.
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn init_logging(log_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt().with_env_filter(filter).init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();
    init_logging(&args.log_level);

    let mut config = AppConfig::load(args.config.as_deref())?;
    if let Some(address) = args.address {
        config.bind_address = address;
    }

    info!(bind_address = %config.bind_address, "starting prism core");

    let stream_manager = StreamManager::new();

    info!(
        "prism core initialized; SRT listener, MoQ/WebTransport session layer, \
         and HTTP status API are external integration points not started by this binary"
    );

    // Placeholder for the surrounding server loop: a full binary accepts
    // SRT connections here, extracts a stream key via
    // `stream_manager::extract_stream_key`, admits it through
    // `stream_manager`, and spawns a `Pipeline::run` per admitted stream.
    let _ = &stream_manager;

    Ok(())
}
