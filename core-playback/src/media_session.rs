//! Media-session bridge
//!
//! Publishes now-playing metadata and transport state to the platform
//! surface, and routes the platform's play/pause/seek actions back into the
//! controller. The bridge keeps nothing but the surface handle and the
//! closures it registered; those hold a weak controller reference so the
//! surface never keeps a dropped controller alive.

use crate::config::MediaLabels;
use crate::controller::PlaybackController;
use bridge_traits::{
    MediaAction, MediaActionHandler, MediaArtwork, MediaMetadata, MediaPlaybackState,
    MediaSessionSurface,
};
use core_library::Episode;
use futures::FutureExt;
use std::sync::{Arc, Weak};
use tracing::debug;

pub struct MediaSessionBridge {
    surface: Arc<dyn MediaSessionSurface>,
    labels: MediaLabels,
}

impl MediaSessionBridge {
    pub fn new(surface: Arc<dyn MediaSessionSurface>, labels: MediaLabels) -> Self {
        Self { surface, labels }
    }

    /// Metadata for `episode` with the static artist and album labels.
    pub fn metadata_for(&self, episode: &Episode) -> MediaMetadata {
        MediaMetadata {
            title: episode.title.clone(),
            artist: self.labels.artist.clone(),
            album: self.labels.album.clone(),
            artwork: vec![MediaArtwork {
                src: episode.cover_image.clone(),
                sizes: self.labels.artwork_sizes.clone(),
                mime_type: self.labels.artwork_type.clone(),
            }],
        }
    }

    pub fn publish_metadata(&self, episode: &Episode) {
        debug!(episode_id = %episode.id, "Publishing now-playing metadata");
        self.surface.set_metadata(self.metadata_for(episode));
    }

    pub fn sync_state(&self, state: MediaPlaybackState) {
        self.surface.set_playback_state(state);
    }

    /// Register handlers for every transport action the surface forwards.
    ///
    /// Seek actions move by `seek_step` seconds through the same clamped
    /// relative seek the keyboard uses.
    pub fn register_handlers(&self, controller: Weak<PlaybackController>, seek_step: f64) {
        for action in MediaAction::ALL {
            self.surface
                .set_action_handler(action, action_handler(controller.clone(), action, seek_step));
        }
    }
}

fn action_handler(
    controller: Weak<PlaybackController>,
    action: MediaAction,
    seek_step: f64,
) -> MediaActionHandler {
    Arc::new(move || {
        let controller = controller.clone();
        async move {
            let Some(controller) = controller.upgrade() else {
                debug!(action = action.name(), "Media action after controller dropped");
                return;
            };
            debug!(action = action.name(), "Media action");
            match action {
                MediaAction::Play => controller.play().await,
                MediaAction::Pause => controller.pause(),
                MediaAction::SeekBackward => controller.seek_by(-seek_step),
                MediaAction::SeekForward => controller.seek_by(seek_step),
            }
        }
        .boxed()
    })
}
