//! Episode catalog
//!
//! Holds the episodes fetched from the feed and answers the list views the
//! page renders. The feed is fetched once at startup; a failure leaves the
//! catalog empty and tells the listener, it never propagates.

use crate::error::{LibraryError, Result};
use crate::models::{Episode, EpisodeFeed};
use bridge_traits::{HttpClient, HttpRequest, RequestDestination, UserNotifier};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus};
use parking_lot::RwLock;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Message shown when the feed cannot be loaded.
pub const LOAD_FAILED_MESSAGE: &str = "Could not load episodes";

/// Number of episodes in the "recent" view.
pub const RECENT_LIMIT: usize = 5;

/// Number of episodes in the "popular" view.
pub const POPULAR_LIMIT: usize = 3;

/// List views offered by the episode page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EpisodeFilter {
    /// Feed order
    #[default]
    All,
    /// Newest first, limited to [`RECENT_LIMIT`]
    Recent,
    /// Limited to [`POPULAR_LIMIT`]. There is no play-count signal yet, so
    /// this ranks by recency as well.
    Popular,
}

impl FromStr for EpisodeFilter {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "all" => Ok(EpisodeFilter::All),
            "recent" => Ok(EpisodeFilter::Recent),
            "popular" => Ok(EpisodeFilter::Popular),
            other => Err(LibraryError::InvalidInput {
                field: "filter".to_string(),
                message: format!("unknown filter '{}'", other),
            }),
        }
    }
}

/// The in-memory episode catalog.
pub struct EpisodeCatalog {
    http: Arc<dyn HttpClient>,
    notifier: Arc<dyn UserNotifier>,
    feed_url: String,
    episodes: RwLock<Vec<Episode>>,
    events: Option<EventBus>,
}

impl EpisodeCatalog {
    pub fn new(
        http: Arc<dyn HttpClient>,
        notifier: Arc<dyn UserNotifier>,
        feed_url: impl Into<String>,
    ) -> Self {
        Self {
            http,
            notifier,
            feed_url: feed_url.into(),
            episodes: RwLock::new(Vec::new()),
            events: None,
        }
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Fetch and parse the feed without touching the catalog.
    pub async fn fetch_feed(&self) -> Result<Vec<Episode>> {
        let request = HttpRequest::get(&self.feed_url)
            .header("Accept", "application/json")
            .destination(RequestDestination::Other);
        let response = self.http.execute(request).await?;

        if !response.is_success() {
            return Err(LibraryError::HttpStatus {
                status: response.status,
            });
        }

        let feed: EpisodeFeed = serde_json::from_slice(&response.body)?;
        Ok(feed.episodes)
    }

    /// Load the feed into the catalog.
    ///
    /// Returns the number of episodes available afterwards. On failure the
    /// catalog is emptied, the listener is alerted once and `0` is returned.
    #[instrument(skip(self), fields(feed = %self.feed_url))]
    pub async fn load(&self) -> usize {
        match self.fetch_feed().await {
            Ok(episodes) => {
                let count = episodes.len();
                *self.episodes.write() = episodes;
                info!(episode_count = count, "Episode catalog loaded");
                self.emit(CatalogEvent::Loaded {
                    episode_count: count,
                });
                count
            }
            Err(error) => {
                warn!(error = %error, "Failed to load episode catalog");
                self.episodes.write().clear();
                self.notifier.alert(LOAD_FAILED_MESSAGE);
                self.emit(CatalogEvent::LoadFailed {
                    message: error.to_string(),
                });
                0
            }
        }
    }

    /// Replace the catalog contents directly.
    pub fn replace(&self, episodes: Vec<Episode>) {
        *self.episodes.write() = episodes;
    }

    /// All episodes in feed order.
    pub fn episodes(&self) -> Vec<Episode> {
        self.episodes.read().clone()
    }

    pub fn len(&self) -> usize {
        self.episodes.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.episodes.read().is_empty()
    }

    /// Episodes for a list view. The catalog order is never changed.
    pub fn filtered(&self, filter: EpisodeFilter) -> Vec<Episode> {
        let mut episodes = self.episodes();
        let limit = match filter {
            EpisodeFilter::All => return episodes,
            EpisodeFilter::Recent => RECENT_LIMIT,
            EpisodeFilter::Popular => POPULAR_LIMIT,
        };

        // Stable sort keeps feed order among equal timestamps
        episodes.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        episodes.truncate(limit);
        debug!(?filter, shown = episodes.len(), "Filtered episode view");
        episodes
    }

    pub fn find(&self, id: &str) -> Option<Episode> {
        self.episodes.read().iter().find(|e| e.id == id).cloned()
    }

    /// Apply `update` to the episode with `id` and return its new value.
    pub fn update<F>(&self, id: &str, update: F) -> Result<Episode>
    where
        F: FnOnce(&mut Episode),
    {
        let mut episodes = self.episodes.write();
        let episode = episodes
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| LibraryError::episode_not_found(id))?;
        update(episode);
        Ok(episode.clone())
    }

    pub(crate) fn emit(&self, event: CatalogEvent) {
        if let Some(bus) = &self.events {
            // No subscribers is fine
            let _ = bus.emit(CoreEvent::Catalog(event));
        }
    }
}
