//! # Playback Error Types

use thiserror::Error;

/// Errors returned by the playback orchestrator.
///
/// Transport problems are not errors here: the engine reports them through
/// the session's network signal.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The orchestrator was shut down before or while the request ran.
    #[error("Playback request cancelled")]
    Cancelled,

    /// Background requests need a Tokio runtime.
    #[error("No async runtime available to run playback requests")]
    NoRuntime,
}

impl PlaybackError {
    /// Returns `true` if the request was dropped because of a shutdown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, PlaybackError::Cancelled)
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
