//! # Event Bus System
//!
//! Typed, in-process broadcast of what the player core is doing, built on
//! `tokio::sync::broadcast`.
//!
//! ```text
//! ┌────────────────────┐  emit   ┌───────────┐  subscribe  ┌────────────┐
//! │ PlaybackController ├────────>│           ├────────────>│ UI binding │
//! └────────────────────┘         │ EventBus  │             └────────────┘
//! ┌────────────────────┐  emit   │ (broadcast│  subscribe  ┌────────────┐
//! │ CacheWorker        ├────────>│  channel) ├────────────>│ Telemetry  │
//! └────────────────────┘         │           │             └────────────┘
//! ┌────────────────────┐  emit   │           │
//! │ Catalog            ├────────>│           │
//! └────────────────────┘         └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let bus = EventBus::new(100);
//! let mut subscriber = bus.subscribe();
//!
//! bus.emit(CoreEvent::Playback(PlaybackEvent::Started {
//!     episode_id: "7".to_string(),
//! }))
//! .ok();
//!
//! let event = subscriber.recv().await.unwrap();
//! assert_eq!(event.description(), "Playback started");
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: the subscriber missed `n` events; it may keep
//!   receiving. Position updates arrive several times per second, so slow
//!   subscribers should expect this.
//! - **`RecvError::Closed`**: every sender is gone; treat it as shutdown.
//!
//! Emitting with no subscribers returns `Err`, which publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Playback session changes
    Playback(PlaybackEvent),
    /// Offline cache worker lifecycle and fetch handling
    Cache(CacheEvent),
    /// Episode catalog, likes and comments
    Catalog(CatalogEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Playback(e) => e.description(),
            CoreEvent::Cache(e) => e.description(),
            CoreEvent::Catalog(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Playback(PlaybackEvent::Error { .. }) => EventSeverity::Error,
            CoreEvent::Catalog(CatalogEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Cache(CacheEvent::InstallFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::WriteFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::ServedOffline { .. }) => EventSeverity::Warning,
            CoreEvent::Cache(CacheEvent::Activated { .. }) => EventSeverity::Info,
            CoreEvent::Catalog(CatalogEvent::Loaded { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    Debug,
    Info,
    Warning,
    Error,
}

// ============================================================================
// Playback Events
// ============================================================================

/// Events emitted by the playback session controller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum PlaybackEvent {
    /// A new episode was bound and its source assigned.
    Loading { episode_id: String, title: String },
    /// The source is ready to play.
    Ready { episode_id: String },
    /// Playback started or resumed.
    Started { episode_id: String },
    /// Playback paused.
    Paused {
        episode_id: String,
        /// Position when paused (milliseconds).
        position_ms: u64,
    },
    /// The stream played to its end.
    Completed { episode_id: String },
    /// Position moved (natural progression or seek).
    PositionChanged {
        episode_id: String,
        position_ms: u64,
        /// `None` until metadata is known.
        duration_ms: Option<u64>,
    },
    /// Volume changed, in percent.
    VolumeChanged { volume_percent: u8 },
    /// Playback speed changed, in percent of normal speed.
    RateChanged { rate_percent: u16 },
    /// The current episode was unbound.
    Cleared,
    /// Playback failed.
    Error {
        episode_id: Option<String>,
        message: String,
        /// Whether an explicit reload may succeed.
        recoverable: bool,
    },
}

impl PlaybackEvent {
    fn description(&self) -> &str {
        match self {
            PlaybackEvent::Loading { .. } => "Episode loading",
            PlaybackEvent::Ready { .. } => "Episode ready",
            PlaybackEvent::Started { .. } => "Playback started",
            PlaybackEvent::Paused { .. } => "Playback paused",
            PlaybackEvent::Completed { .. } => "Episode completed",
            PlaybackEvent::PositionChanged { .. } => "Playback position changed",
            PlaybackEvent::VolumeChanged { .. } => "Volume changed",
            PlaybackEvent::RateChanged { .. } => "Playback rate changed",
            PlaybackEvent::Cleared => "Episode cleared",
            PlaybackEvent::Error { .. } => "Playback error",
        }
    }
}

// ============================================================================
// Cache Events
// ============================================================================

/// Events emitted by the offline cache worker.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CacheEvent {
    /// The manifest was stored in the named generation.
    Installed { version: String, entries: usize },
    /// Pre-population failed; the page keeps working uncached.
    InstallFailed { version: String, message: String },
    /// Old generations were deleted and clients claimed.
    Activated {
        version: String,
        removed: Vec<String>,
    },
    /// A static asset was served from cache without touching the network.
    ServedFromCache { url: String },
    /// The network failed and a cached copy (or the offline shell) was served.
    ServedOffline { url: String },
    /// A background cache write failed.
    WriteFailed { url: String, message: String },
    /// A push message was turned into a notification.
    NotificationShown { title: String },
    /// A background sync tag was handled.
    SyncCompleted { tag: String },
}

impl CacheEvent {
    fn description(&self) -> &str {
        match self {
            CacheEvent::Installed { .. } => "Cache installed",
            CacheEvent::InstallFailed { .. } => "Cache install failed",
            CacheEvent::Activated { .. } => "Cache activated",
            CacheEvent::ServedFromCache { .. } => "Served from cache",
            CacheEvent::ServedOffline { .. } => "Served offline fallback",
            CacheEvent::WriteFailed { .. } => "Cache write failed",
            CacheEvent::NotificationShown { .. } => "Notification shown",
            CacheEvent::SyncCompleted { .. } => "Background sync completed",
        }
    }
}

// ============================================================================
// Catalog Events
// ============================================================================

/// Events emitted by the episode catalog and its collaborators.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum CatalogEvent {
    /// The feed was fetched and parsed.
    Loaded { episode_count: usize },
    /// The feed could not be loaded; the catalog is empty.
    LoadFailed { message: String },
    /// An episode was liked or unliked.
    LikeToggled { episode_id: String, liked: bool },
    /// A comment was appended to an episode.
    CommentAdded {
        episode_id: String,
        comment_id: String,
    },
}

impl CatalogEvent {
    fn description(&self) -> &str {
        match self {
            CatalogEvent::Loaded { .. } => "Catalog loaded",
            CatalogEvent::LoadFailed { .. } => "Catalog load failed",
            CatalogEvent::LikeToggled { .. } => "Like toggled",
            CatalogEvent::CommentAdded { .. } => "Comment added",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Cloning the bus clones the sender; every [`subscribe`](Self::subscribe)
/// creates an independent receiver that sees only future events.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus buffering up to `capacity` events per
    /// subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an error
    /// when nobody is listening.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A `broadcast::Receiver` with an optional predicate.
///
/// ```rust
/// use core_runtime::events::{CoreEvent, EventBus, EventStream};
///
/// let bus = EventBus::new(100);
/// let cache_only = EventStream::new(bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Cache(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Only events matching `predicate` are returned from `recv`/`try_recv`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    fn accepts(&self, event: &CoreEvent) -> bool {
        self.filter.as_ref().map_or(true, |filter| filter(event))
    }

    /// Receives the next event that passes the filter.
    ///
    /// # Errors
    ///
    /// `RecvError::Lagged(n)` when the subscriber fell behind by `n` events,
    /// `RecvError::Closed` when all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;
            if self.accepts(&event) {
                return Ok(event);
            }
        }
    }

    /// Non-blocking receive; `None` when nothing matching is queued.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.accepts(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
