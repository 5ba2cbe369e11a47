//! Audio element bridge.
//!
//! Models the single underlying audio resource owned by the playback
//! controller: a source URL, a play request that can reject, and a stream of
//! lifecycle events delivered in emission order.

use async_trait::async_trait;
use std::fmt;
use std::sync::Weak;
use thiserror::Error;

/// Lifecycle event names emitted by an [`AudioElement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AudioEventKind {
    LoadStart,
    CanPlay,
    Play,
    Pause,
    Ended,
    TimeUpdate,
    LoadedMetadata,
    Error,
}

impl AudioEventKind {
    /// Every event kind, in the order they are typically first observed.
    pub const ALL: [AudioEventKind; 8] = [
        AudioEventKind::LoadStart,
        AudioEventKind::LoadedMetadata,
        AudioEventKind::CanPlay,
        AudioEventKind::Play,
        AudioEventKind::TimeUpdate,
        AudioEventKind::Pause,
        AudioEventKind::Ended,
        AudioEventKind::Error,
    ];

    /// DOM event name.
    pub fn name(&self) -> &'static str {
        match self {
            AudioEventKind::LoadStart => "loadstart",
            AudioEventKind::CanPlay => "canplay",
            AudioEventKind::Play => "play",
            AudioEventKind::Pause => "pause",
            AudioEventKind::Ended => "ended",
            AudioEventKind::TimeUpdate => "timeupdate",
            AudioEventKind::LoadedMetadata => "loadedmetadata",
            AudioEventKind::Error => "error",
        }
    }
}

impl fmt::Display for AudioEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// An event emitted by the audio element, with the element state the
/// listener would otherwise have to read back.
#[derive(Debug, Clone, PartialEq)]
pub enum AudioEvent {
    LoadStart,
    CanPlay,
    Play,
    Pause,
    Ended,
    TimeUpdate { current_time: f64 },
    LoadedMetadata { duration: f64 },
    Error { message: String },
}

impl AudioEvent {
    pub fn kind(&self) -> AudioEventKind {
        match self {
            AudioEvent::LoadStart => AudioEventKind::LoadStart,
            AudioEvent::CanPlay => AudioEventKind::CanPlay,
            AudioEvent::Play => AudioEventKind::Play,
            AudioEvent::Pause => AudioEventKind::Pause,
            AudioEvent::Ended => AudioEventKind::Ended,
            AudioEvent::TimeUpdate { .. } => AudioEventKind::TimeUpdate,
            AudioEvent::LoadedMetadata { .. } => AudioEventKind::LoadedMetadata,
            AudioEvent::Error { .. } => AudioEventKind::Error,
        }
    }
}

/// Why a play request was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AudioError {
    /// The request was interrupted by a pause or a new source.
    #[error("Play request aborted")]
    Aborted,

    /// The host refused to start playback (autoplay policy).
    #[error("Playback not allowed: {0}")]
    NotAllowed(String),

    /// The source format is not playable.
    #[error("Source not supported: {0}")]
    NotSupported(String),

    /// The source could not be fetched.
    #[error("Network error: {0}")]
    Network(String),

    /// The source was fetched but could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),
}

impl AudioError {
    /// Whether retrying the same source could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, AudioError::Network(_))
    }
}

/// Receiver of audio lifecycle events.
pub trait AudioEventSink: Send + Sync {
    fn on_event(&self, event: AudioEvent);
}

/// The underlying audio resource.
///
/// Implementations must deliver events to the registered sink in the order
/// they happen, and must not hold internal locks while doing so (the sink may
/// read element state back).
#[async_trait]
pub trait AudioElement: Send + Sync {
    /// Register the listener for lifecycle events. Only one sink is kept.
    fn set_event_sink(&self, sink: Weak<dyn AudioEventSink>);

    /// Assign a new source. Any pending play request is aborted.
    fn set_source(&self, url: &str);

    /// Currently assigned source.
    fn source(&self) -> Option<String>;

    /// Request playback; resolves once playback actually started.
    async fn play(&self) -> Result<(), AudioError>;

    /// Pause playback. Rejects a pending play request with
    /// [`AudioError::Aborted`].
    fn pause(&self);

    fn is_paused(&self) -> bool;

    /// Current position in seconds.
    fn current_time(&self) -> f64;

    fn set_current_time(&self, seconds: f64);

    /// Duration in seconds, `None` until metadata is loaded.
    fn duration(&self) -> Option<f64>;

    fn volume(&self) -> f64;

    /// Volume normalized to `0.0..=1.0`.
    fn set_volume(&self, volume: f64);

    fn playback_rate(&self) -> f64;

    fn set_playback_rate(&self, rate: f64);
}
