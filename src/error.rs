use thiserror::Error;

/// Application-wide error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("stream '{0}' already exists")]
    AdmissionRejected(String),

    #[error("failed to build {kind} decoder configuration: {reason}")]
    ConfigBuildFailure { kind: &'static str, reason: String },

    #[error("control message parse error in field '{field}': {source}")]
    ParseError {
        field: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("protocol version mismatch: got {got}, want {want}")]
    VersionMismatch { got: u64, want: u64 },

    #[error("unknown track '{0}'")]
    UnknownTrack(String),

    #[error("unsupported filter '{0}'")]
    UnsupportedFilter(String),

    #[error("unknown namespace '{0}'")]
    UnknownNamespace(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AppError>;
