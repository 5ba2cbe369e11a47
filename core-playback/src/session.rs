//! Playback session model
//!
//! The single mutable session owned by the controller. Everything here is
//! plain data plus the arithmetic that keeps its invariants; side effects
//! live in the controller.

use crate::error::PlaybackError;
use bridge_traits::MediaPlaybackState;
use core_library::Episode;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Transport lifecycle phase of the current episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransportState {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
    Ended,
    Errored,
}

impl TransportState {
    /// State mirrored to the now-playing surface.
    pub fn media_state(&self) -> MediaPlaybackState {
        match self {
            TransportState::Playing => MediaPlaybackState::Playing,
            TransportState::Loading | TransportState::Paused | TransportState::Ended => {
                MediaPlaybackState::Paused
            }
            TransportState::Idle | TransportState::Errored => MediaPlaybackState::None,
        }
    }
}

impl fmt::Display for TransportState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TransportState::Idle => "idle",
            TransportState::Loading => "loading",
            TransportState::Playing => "playing",
            TransportState::Paused => "paused",
            TransportState::Ended => "ended",
            TransportState::Errored => "errored",
        };
        f.write_str(name)
    }
}

/// Supported playback speeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PlaybackRate {
    #[default]
    Normal,
    OneAndHalf,
    Double,
}

impl PlaybackRate {
    pub const ALL: [PlaybackRate; 3] = [
        PlaybackRate::Normal,
        PlaybackRate::OneAndHalf,
        PlaybackRate::Double,
    ];

    pub fn as_f64(&self) -> f64 {
        match self {
            PlaybackRate::Normal => 1.0,
            PlaybackRate::OneAndHalf => 1.5,
            PlaybackRate::Double => 2.0,
        }
    }

    pub fn percent(&self) -> u16 {
        match self {
            PlaybackRate::Normal => 100,
            PlaybackRate::OneAndHalf => 150,
            PlaybackRate::Double => 200,
        }
    }
}

impl TryFrom<f64> for PlaybackRate {
    type Error = PlaybackError;

    fn try_from(rate: f64) -> Result<Self, Self::Error> {
        PlaybackRate::ALL
            .into_iter()
            .find(|candidate| candidate.as_f64() == rate)
            .ok_or(PlaybackError::InvalidPlaybackRate(rate))
    }
}

/// State of the one playback session per page load.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackSession {
    pub current_episode: Option<Episode>,
    pub transport: TransportState,
    pub position_seconds: f64,
    /// `None` until metadata is loaded
    pub duration_seconds: Option<f64>,
    /// `0.0..=100.0`, for progress bars
    pub progress_percent: f64,
    pub playback_rate: PlaybackRate,
    /// `0.0..=1.0`
    pub volume: f64,
    /// Between `loadstart` and `canplay`/`error`
    pub loading: bool,
    /// A play request is outstanding
    pub play_requested: bool,
}

impl Default for PlaybackSession {
    fn default() -> Self {
        Self {
            current_episode: None,
            transport: TransportState::Idle,
            position_seconds: 0.0,
            duration_seconds: None,
            progress_percent: 0.0,
            playback_rate: PlaybackRate::Normal,
            volume: 1.0,
            loading: false,
            play_requested: false,
        }
    }
}

impl PlaybackSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn muted(&self) -> bool {
        self.volume == 0.0
    }

    pub fn has_episode(&self) -> bool {
        self.current_episode.is_some()
    }

    pub fn episode_id(&self) -> Option<String> {
        self.current_episode.as_ref().map(|episode| episode.id.clone())
    }

    pub fn is_playing(&self) -> bool {
        self.transport == TransportState::Playing
    }

    /// Bind `episode` and reset position, duration and progress.
    pub fn bind(&mut self, episode: Episode) {
        self.current_episode = Some(episode);
        self.transport = TransportState::Loading;
        self.position_seconds = 0.0;
        self.duration_seconds = None;
        self.progress_percent = 0.0;
        self.loading = true;
        self.play_requested = false;
    }

    /// Drop the current episode and return to idle. Volume and rate survive.
    pub fn unbind(&mut self) {
        *self = Self {
            volume: self.volume,
            playback_rate: self.playback_rate,
            ..Self::default()
        };
    }

    /// Set the position, clamped to `[0, duration]` when the duration is known.
    pub fn set_position(&mut self, seconds: f64) {
        let seconds = if seconds.is_finite() { seconds.max(0.0) } else { 0.0 };
        self.position_seconds = match self.duration_seconds {
            Some(duration) => seconds.min(duration),
            None => seconds,
        };
        self.refresh_progress();
    }

    /// Record the duration. Non-finite or non-positive values (live streams,
    /// empty sources) leave it unknown.
    pub fn set_duration(&mut self, seconds: f64) {
        self.duration_seconds = (seconds.is_finite() && seconds > 0.0).then_some(seconds);
        let position = self.position_seconds;
        self.set_position(position);
    }

    fn refresh_progress(&mut self) {
        self.progress_percent = match self.duration_seconds {
            Some(duration) => (self.position_seconds / duration * 100.0).clamp(0.0, 100.0),
            None => 0.0,
        };
    }

    /// Absolute position for a seek to `fraction` of the duration.
    ///
    /// `None` when the duration is unknown or `fraction` is NaN.
    pub fn seek_target(&self, fraction: f64) -> Option<f64> {
        if fraction.is_nan() {
            return None;
        }
        let duration = self.duration_seconds?;
        Some(fraction.clamp(0.0, 1.0) * duration)
    }

    /// Position after a relative seek of `delta` seconds.
    ///
    /// Clamped to `[0, duration]`. Without a known duration, backward seeks
    /// stop at zero and forward seeks are ignored.
    pub fn seek_by_target(&self, delta: f64) -> Option<f64> {
        if !delta.is_finite() {
            return None;
        }
        let target = self.position_seconds + delta;
        match self.duration_seconds {
            Some(duration) => Some(target.clamp(0.0, duration)),
            None if delta < 0.0 => Some(target.max(0.0)),
            None => None,
        }
    }
}

/// Position in whole milliseconds, for events.
pub(crate) fn to_millis(seconds: f64) -> u64 {
    (seconds.max(0.0) * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_accepts_only_supported_values() {
        assert_eq!(PlaybackRate::try_from(1.5).unwrap(), PlaybackRate::OneAndHalf);
        assert_eq!(PlaybackRate::try_from(2.0).unwrap(), PlaybackRate::Double);
        assert!(PlaybackRate::try_from(1.25).is_err());
        assert!(PlaybackRate::try_from(f64::NAN).is_err());
    }

    #[test]
    fn test_position_clamped_to_duration() {
        let mut session = PlaybackSession::new();
        session.set_duration(200.0);
        session.set_position(250.0);
        assert_eq!(session.position_seconds, 200.0);
        assert_eq!(session.progress_percent, 100.0);

        session.set_position(-3.0);
        assert_eq!(session.position_seconds, 0.0);

        session.set_position(50.0);
        assert_eq!(session.progress_percent, 25.0);
    }

    #[test]
    fn test_infinite_duration_stays_unknown() {
        let mut session = PlaybackSession::new();
        session.set_duration(f64::INFINITY);
        assert_eq!(session.duration_seconds, None);
        assert_eq!(session.seek_target(0.5), None);
    }

    #[test]
    fn test_seek_by_without_duration() {
        let mut session = PlaybackSession::new();
        session.set_position(4.0);
        assert_eq!(session.seek_by_target(-10.0), Some(0.0));
        assert_eq!(session.seek_by_target(10.0), None);
    }

    #[test]
    fn test_unbind_keeps_volume_and_rate() {
        let mut session = PlaybackSession::new();
        session.volume = 0.4;
        session.playback_rate = PlaybackRate::Double;
        session.transport = TransportState::Paused;
        session.unbind();

        assert_eq!(session.transport, TransportState::Idle);
        assert_eq!(session.volume, 0.4);
        assert_eq!(session.playback_rate, PlaybackRate::Double);
        assert!(!session.has_episode());
    }

    #[test]
    fn test_media_state_mapping() {
        assert_eq!(TransportState::Playing.media_state(), MediaPlaybackState::Playing);
        assert_eq!(TransportState::Ended.media_state(), MediaPlaybackState::Paused);
        assert_eq!(TransportState::Errored.media_state(), MediaPlaybackState::None);
    }
}
