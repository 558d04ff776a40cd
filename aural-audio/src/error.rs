//! Engine error types

use thiserror::Error;

/// Errors reported by the audio graph
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AudioError {
    /// The source could not be decoded or is in a format we cannot play
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),
    /// The output device refused to start (e.g. autoplay policy, device lost)
    #[error("Output device unavailable: {0}")]
    DeviceUnavailable(String),
    /// Any other playback failure
    #[error("Playback error: {0}")]
    PlaybackError(String),
}
