//! # Playback Error Types
//!
//! Errors produced by the playback session controller. None of these escape
//! a transport operation: the controller turns them into a log line or a
//! single user-visible alert, and reports them to callers only through
//! [`LoadOutcome`](crate::controller::LoadOutcome).

use bridge_traits::AudioError;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    // ========================================================================
    // Source Errors
    // ========================================================================
    /// The audio source could not be fetched (offline, DNS, reset).
    #[error("Audio source unavailable: {0}")]
    SourceUnavailable(String),

    // ========================================================================
    // Format/Codec Errors
    // ========================================================================
    /// The element cannot play this source at all.
    #[error("Unsupported audio source: {0}")]
    UnsupportedSource(String),

    /// The source was fetched but could not be decoded.
    #[error("Decoding error: {0}")]
    DecodingError(String),

    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// The host refused to start playback (autoplay policy).
    #[error("Playback not allowed: {0}")]
    PlayNotAllowed(String),

    /// A pending play request was interrupted by a pause or a new source.
    #[error("Play request aborted")]
    PlayAborted,

    /// Playback rate outside the supported set.
    #[error("Unsupported playback rate: {0} (must be 1.0, 1.5 or 2.0)")]
    InvalidPlaybackRate(f64),

    /// Keyboard code without a shortcut.
    #[error("No shortcut bound to key: {0}")]
    UnsupportedKey(String),

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    #[error("Invalid playback configuration: {0}")]
    InvalidConfig(String),
}

impl PlaybackError {
    /// Returns `true` if this error is due to network issues.
    pub fn is_network_error(&self) -> bool {
        matches!(self, PlaybackError::SourceUnavailable(_))
    }

    /// Returns `true` if this error is related to audio format/codec issues.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::UnsupportedSource(_) | PlaybackError::DecodingError(_)
        )
    }
}

impl From<AudioError> for PlaybackError {
    fn from(error: AudioError) -> Self {
        match error {
            AudioError::Aborted => PlaybackError::PlayAborted,
            AudioError::NotAllowed(message) => PlaybackError::PlayNotAllowed(message),
            AudioError::NotSupported(message) => PlaybackError::UnsupportedSource(message),
            AudioError::Network(message) => PlaybackError::SourceUnavailable(message),
            AudioError::Decode(message) => PlaybackError::DecodingError(message),
        }
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;
