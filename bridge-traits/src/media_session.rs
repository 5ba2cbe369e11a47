//! Now-playing surface abstraction
//!
//! Platform media controls (lock screen, OS media keys, browser media
//! session). The core publishes metadata and playback state and registers
//! handlers for the transport actions the platform forwards back.

use futures::future::BoxFuture;
use std::sync::Arc;

/// Transport actions a platform surface can forward to the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaAction {
    Play,
    Pause,
    SeekBackward,
    SeekForward,
}

impl MediaAction {
    pub const ALL: [MediaAction; 4] = [
        MediaAction::Play,
        MediaAction::Pause,
        MediaAction::SeekBackward,
        MediaAction::SeekForward,
    ];

    /// Action name as used by the browser media session API.
    pub fn name(&self) -> &'static str {
        match self {
            MediaAction::Play => "play",
            MediaAction::Pause => "pause",
            MediaAction::SeekBackward => "seekbackward",
            MediaAction::SeekForward => "seekforward",
        }
    }
}

/// Artwork descriptor for the now-playing surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaArtwork {
    pub src: String,
    pub sizes: String,
    pub mime_type: String,
}

/// Now-playing metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MediaMetadata {
    pub title: String,
    pub artist: String,
    pub album: String,
    pub artwork: Vec<MediaArtwork>,
}

/// Playback state mirrored to the surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MediaPlaybackState {
    #[default]
    None,
    Paused,
    Playing,
}

/// Handler invoked when the platform forwards an action.
pub type MediaActionHandler = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Platform now-playing surface.
///
/// Hosts without media controls simply do not provide one; the core treats
/// the surface as optional.
pub trait MediaSessionSurface: Send + Sync {
    fn set_metadata(&self, metadata: MediaMetadata);

    fn set_playback_state(&self, state: MediaPlaybackState);

    /// Register (or replace) the handler for `action`.
    fn set_action_handler(&self, action: MediaAction, handler: MediaActionHandler);
}
