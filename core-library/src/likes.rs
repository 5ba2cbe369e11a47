//! Liked episodes
//!
//! The liked set is persisted as a JSON array of episode ids under
//! [`LIKED_EPISODES_KEY`]. Like counts live on the catalog's episodes and are
//! adjusted alongside the persisted set.

use crate::catalog::EpisodeCatalog;
use crate::error::{LibraryError, Result};
use bridge_traits::SettingsStore;
use core_runtime::events::CatalogEvent;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};

/// Settings key holding the liked episode ids.
pub const LIKED_EPISODES_KEY: &str = "likedEpisodes";

/// Result of toggling a like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeState {
    pub liked: bool,
    pub likes: u32,
}

pub struct LikeStore {
    settings: Arc<dyn SettingsStore>,
}

impl LikeStore {
    pub fn new(settings: Arc<dyn SettingsStore>) -> Self {
        Self { settings }
    }

    /// Liked ids in stored order.
    ///
    /// A corrupt stored value is logged and treated as an empty set so a bad
    /// write never locks the listener out of liking episodes.
    pub async fn liked_ids(&self) -> Result<Vec<String>> {
        let Some(raw) = self.settings.get_string(LIKED_EPISODES_KEY).await? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str::<Vec<Value>>(&raw) {
            Ok(values) => Ok(values
                .into_iter()
                .filter_map(|value| match value {
                    Value::String(id) => Some(id),
                    Value::Number(id) => Some(id.to_string()),
                    _ => None,
                })
                .collect()),
            Err(error) => {
                warn!(error = %error, "Discarding corrupt liked episode list");
                Ok(Vec::new())
            }
        }
    }

    pub async fn is_liked(&self, episode_id: &str) -> Result<bool> {
        Ok(self.liked_ids().await?.iter().any(|id| id == episode_id))
    }

    async fn store_ids(&self, ids: &[String]) -> Result<()> {
        let raw = serde_json::to_string(ids)?;
        self.settings.set_string(LIKED_EPISODES_KEY, &raw).await?;
        Ok(())
    }

    /// Like or unlike an episode.
    ///
    /// Liking increments the episode's count; unliking decrements it, never
    /// below zero.
    pub async fn toggle(&self, catalog: &EpisodeCatalog, episode_id: &str) -> Result<LikeState> {
        if catalog.find(episode_id).is_none() {
            return Err(LibraryError::episode_not_found(episode_id));
        }

        let mut ids = self.liked_ids().await?;
        let liked = match ids.iter().position(|id| id == episode_id) {
            Some(index) => {
                ids.remove(index);
                false
            }
            None => {
                ids.push(episode_id.to_string());
                true
            }
        };

        let episode = catalog.update(episode_id, |episode| {
            episode.likes = if liked {
                episode.likes.saturating_add(1)
            } else {
                episode.likes.saturating_sub(1)
            };
        })?;

        self.store_ids(&ids).await?;

        debug!(episode_id, liked, likes = episode.likes, "Toggled like");
        catalog.emit(CatalogEvent::LikeToggled {
            episode_id: episode_id.to_string(),
            liked,
        });

        Ok(LikeState {
            liked,
            likes: episode.likes,
        })
    }

    /// Liked ids that exist in the catalog, for restoring like buttons.
    pub async fn restore(&self, catalog: &EpisodeCatalog) -> Result<BTreeSet<String>> {
        let ids = self.liked_ids().await?;
        Ok(ids
            .into_iter()
            .filter(|id| catalog.find(id).is_some())
            .collect())
    }
}
