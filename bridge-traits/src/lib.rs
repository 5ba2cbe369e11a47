//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host.
//!
//! ## Overview
//!
//! This crate defines the contract between the player core and the host
//! environment. The page side (playback controller, catalog) and the offline
//! worker side (resource cache) both reach the outside world exclusively
//! through these traits, which keeps the core testable with fakes and lets a
//! browser host and a desktop host ship different adapters.
//!
//! ## Traits
//!
//! ### Page side
//! - [`AudioElement`](audio::AudioElement) - The single underlying audio resource
//! - [`MediaSessionSurface`](media_session::MediaSessionSurface) - Now-playing metadata and media keys
//! - [`UserNotifier`](notification::UserNotifier) - Blocking user-visible messages
//! - [`SettingsStore`](storage::SettingsStore) - Durable key-value preferences
//!
//! ### Worker side
//! - [`HttpClient`](http::HttpClient) - Network fetches
//! - [`NotificationPresenter`](notification::NotificationPresenter) - System notifications
//! - [`ClientWindows`](clients::ClientWindows) - Open pages controlled by the worker
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Error Handling
//!
//! Every bridge trait reports failures as [`BridgeError`](error::BridgeError),
//! except the audio element whose play request rejects with
//! [`AudioError`](audio::AudioError) so the controller can tell an aborted
//! request from a genuine playback failure.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so adapters can be shared across
//! async tasks behind `Arc`.

pub mod audio;
pub mod clients;
pub mod error;
pub mod http;
pub mod media_session;
pub mod notification;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use audio::{AudioElement, AudioError, AudioEvent, AudioEventKind, AudioEventSink};
pub use clients::{ClientWindow, ClientWindows};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RequestDestination};
pub use media_session::{
    MediaAction, MediaActionHandler, MediaArtwork, MediaMetadata, MediaPlaybackState,
    MediaSessionSurface,
};
pub use notification::{
    NotificationAction, NotificationOptions, NotificationPresenter, UserNotifier,
};
pub use storage::SettingsStore;
pub use time::{Clock, FixedClock, LogEntry, LogLevel, LoggerSink, SystemClock};
