//! # Playback Configuration
//!
//! Configuration types for the playback session controller.

use crate::error::{PlaybackError, Result};
use bridge_traits::AudioError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Playback controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Whether `load` issues a play request right away.
    ///
    /// Default: true.
    #[serde(default = "default_autoplay")]
    pub autoplay: bool,

    /// Step used by the arrow keys and the media-session seek actions.
    ///
    /// Default: 10 seconds.
    #[serde(default = "default_seek_step_secs")]
    pub seek_step_secs: f64,

    /// Retry policy for rejected play requests during `load`.
    ///
    /// Default: a single attempt (no retry).
    #[serde(default)]
    pub retry: LoadRetryPolicy,

    /// Labels published to the now-playing surface.
    #[serde(default)]
    pub media: MediaLabels,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            autoplay: default_autoplay(),
            seek_step_secs: default_seek_step_secs(),
            retry: LoadRetryPolicy::default(),
            media: MediaLabels::default(),
        }
    }
}

impl PlaybackConfig {
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    pub fn with_seek_step(mut self, seconds: f64) -> Self {
        self.seek_step_secs = seconds;
        self
    }

    pub fn with_retry(mut self, retry: LoadRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_media_labels(mut self, media: MediaLabels) -> Self {
        self.media = media;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if !self.seek_step_secs.is_finite() || self.seek_step_secs <= 0.0 {
            return Err(PlaybackError::InvalidConfig(
                "seek_step_secs must be a positive number".to_string(),
            ));
        }

        if self.retry.max_attempts == 0 {
            return Err(PlaybackError::InvalidConfig(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }

        if self.media.artwork_sizes.is_empty() || self.media.artwork_type.is_empty() {
            return Err(PlaybackError::InvalidConfig(
                "artwork sizes and type cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Bounded retry for play requests that fail for network reasons.
///
/// Only [`AudioError::Network`] rejections are retried, and only while the
/// load that issued them is still the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadRetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: u32,
    /// Pause before reassigning the source and trying again.
    pub delay: Duration,
}

impl LoadRetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// One attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Whether a rejection on attempt `attempt` (1-based) may be retried.
    pub fn should_retry(&self, attempt: u32, error: &AudioError) -> bool {
        error.is_transient() && attempt < self.max_attempts
    }
}

impl Default for LoadRetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

/// Static labels for the now-playing surface.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaLabels {
    pub artist: String,
    pub album: String,
    pub artwork_sizes: String,
    pub artwork_type: String,
}

impl Default for MediaLabels {
    fn default() -> Self {
        Self {
            artist: "Radio App".to_string(),
            album: "Episodes".to_string(),
            artwork_sizes: "400x400".to_string(),
            artwork_type: "image/png".to_string(),
        }
    }
}

// Default value functions for serde
fn default_autoplay() -> bool {
    true
}

fn default_seek_step_secs() -> f64 {
    10.0
}
