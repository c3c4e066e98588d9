//! Error type shared by every fallible operation in the crate.

use thiserror::Error;

/// Errors reported by audio sources, the poller and configuration loading.
#[derive(Error, Debug)]
pub enum TunerError {
    /// `start()` was called before the audio source was connected.
    #[error("audio source is not connected; call connect() before starting")]
    NotConnected,
    /// The host platform cannot provide an audio stream.
    #[error("audio capture is not supported by this host")]
    Unsupported,
    /// The host refused access to the audio stream.
    #[error("audio capture permission denied: {0}")]
    PermissionDenied(String),
    /// Every producer feeding the source has gone away.
    #[error("audio source has no remaining producers")]
    SourceClosed,
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("configuration parse error: {0}")]
    Config(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, TunerError>;
