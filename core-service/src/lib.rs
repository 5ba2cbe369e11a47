//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations into the player
//! core. [`RadioCore::bootstrap`] takes a validated
//! [`CoreConfig`](core_runtime::config::CoreConfig) and builds, in order:
//!
//! 1. the event bus every component publishes to,
//! 2. the offline cache worker (when enabled), whose handle then becomes the
//!    HTTP client for everything on the page side,
//! 3. the episode catalog, likes and comment composer,
//! 4. the playback controller with its media-session bridge (when enabled).
//!
//! Desktop apps typically enable the `desktop-shims` feature, which fills in
//! missing bridges with the adapters from `bridge-desktop`.

pub mod error;

pub use error::{CoreError, Result};

use bridge_traits::{Clock, HttpClient, SystemClock};
use bytes::Bytes;
use core_cache::{
    CacheConfig, CacheManager, CacheWorker, ClickOutcome, NotificationClick, WorkerHandle,
};
use core_library::{
    CommentComposer, CommentReceipt, Episode, EpisodeCatalog, EpisodeFilter, LibraryError,
    LikeState, LikeStore,
};
use core_playback::{FocusTarget, LoadOutcome, PlaybackConfig, PlaybackController};
use core_runtime::config::CoreConfig;
use core_runtime::events::{EventBus, EventStream};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

pub use core_runtime::config::FeatureFlags;

/// Per-component settings that are not part of [`CoreConfig`].
#[derive(Clone)]
pub struct ServiceOptions {
    pub playback: PlaybackConfig,
    /// Worker settings; derived from the origin when `None`
    pub cache: Option<CacheConfig>,
    /// Time source for comment timestamps
    pub clock: Arc<dyn Clock>,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            playback: PlaybackConfig::default(),
            cache: None,
            clock: Arc::new(SystemClock),
        }
    }
}

impl ServiceOptions {
    pub fn with_playback(mut self, playback: PlaybackConfig) -> Self {
        self.playback = playback;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Primary façade exposed to host applications.
pub struct RadioCore {
    config: CoreConfig,
    events: EventBus,
    http: Arc<dyn HttpClient>,
    worker: Option<WorkerHandle>,
    worker_task: Mutex<Option<JoinHandle<()>>>,
    catalog: Arc<EpisodeCatalog>,
    likes: LikeStore,
    comments: CommentComposer,
    player: Option<Arc<PlaybackController>>,
}

impl RadioCore {
    /// Build the core with default component settings.
    ///
    /// Must be called from within a tokio runtime when the offline cache is
    /// enabled, since the worker is spawned onto it.
    pub fn bootstrap(config: CoreConfig) -> Result<Self> {
        Self::bootstrap_with(config, ServiceOptions::default())
    }

    #[instrument(skip_all, fields(origin = %config.origin))]
    pub fn bootstrap_with(config: CoreConfig, options: ServiceOptions) -> Result<Self> {
        config.validate()?;
        options.playback.validate()?;

        let events = EventBus::new(config.event_buffer_size);
        let (worker, worker_task) = if config.features.enable_offline_cache {
            let (handle, task) = Self::spawn_worker(&config, options.cache, &events)?;
            (Some(handle), Some(task))
        } else {
            (None, None)
        };

        let http: Arc<dyn HttpClient> = match &worker {
            Some(handle) => Arc::new(handle.clone()),
            None => Arc::clone(&config.http_client),
        };

        let catalog_url = config.catalog_url()?;
        let catalog = Arc::new(
            EpisodeCatalog::new(
                Arc::clone(&http),
                Arc::clone(&config.user_notifier),
                catalog_url.as_str(),
            )
            .with_event_bus(events.clone()),
        );
        let likes = LikeStore::new(Arc::clone(&config.settings_store));
        let comments = CommentComposer::new(options.clock, config.comment_recipient.clone());

        let player = Self::build_player(&config, options.playback, &events)?;

        info!(
            offline_cache = worker.is_some(),
            playback = player.is_some(),
            "Radio core ready"
        );

        Ok(Self {
            config,
            events,
            http,
            worker,
            worker_task: Mutex::new(worker_task),
            catalog,
            likes,
            comments,
            player,
        })
    }

    fn spawn_worker(
        config: &CoreConfig,
        cache: Option<CacheConfig>,
        events: &EventBus,
    ) -> Result<(WorkerHandle, JoinHandle<()>)> {
        let (Some(presenter), Some(windows)) = (
            config.notification_presenter.clone(),
            config.client_windows.clone(),
        ) else {
            return Err(CoreError::InitializationFailed(
                "offline cache enabled without worker bridges".to_string(),
            ));
        };

        let cache = cache.unwrap_or_else(|| CacheConfig::new(config.origin.clone()));
        let manager = CacheManager::new(cache, Arc::clone(&config.http_client), presenter, windows)?
            .with_event_bus(events.clone());
        Ok(CacheWorker::spawn(manager))
    }

    fn build_player(
        config: &CoreConfig,
        playback: PlaybackConfig,
        events: &EventBus,
    ) -> Result<Option<Arc<PlaybackController>>> {
        if !config.features.enable_playback {
            return Ok(None);
        }
        let Some(audio) = config.audio_element.clone() else {
            return Err(CoreError::InitializationFailed(
                "playback enabled without an audio element".to_string(),
            ));
        };

        let player = PlaybackController::with_event_bus(
            audio,
            Arc::clone(&config.user_notifier),
            playback,
            events.clone(),
        )?;

        if config.features.enable_media_session {
            if let Some(surface) = config.media_session.clone() {
                player.attach_media_session(surface);
            }
        }
        Ok(Some(player))
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// The client page-side fetches should go through: the worker handle
    /// when the offline cache is on, the host client otherwise.
    pub fn http_client(&self) -> Arc<dyn HttpClient> {
        Arc::clone(&self.http)
    }

    pub fn worker(&self) -> Option<&WorkerHandle> {
        self.worker.as_ref()
    }

    pub fn catalog(&self) -> &Arc<EpisodeCatalog> {
        &self.catalog
    }

    pub fn player(&self) -> Result<&Arc<PlaybackController>> {
        self.player.as_ref().ok_or(CoreError::FeatureDisabled("playback"))
    }

    // ========================================================================
    // Catalog, likes and comments
    // ========================================================================

    /// Load the feed and restore liked state. Returns the episode count.
    pub async fn start(&self) -> usize {
        let count = self.catalog.load().await;
        if let Err(e) = self.likes.restore(&self.catalog).await {
            warn!(error = %e, "Failed to restore liked episodes");
        }
        count
    }

    pub fn episodes(&self, filter: EpisodeFilter) -> Vec<Episode> {
        self.catalog.filtered(filter)
    }

    pub async fn toggle_like(&self, episode_id: &str) -> Result<LikeState> {
        Ok(self.likes.toggle(&self.catalog, episode_id).await?)
    }

    pub fn submit_comment(&self, episode_id: &str, text: &str) -> Result<CommentReceipt> {
        Ok(self.comments.submit(&self.catalog, episode_id, text)?)
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Load a catalog episode into the player.
    pub async fn play_episode(&self, episode_id: &str) -> Result<LoadOutcome> {
        let player = self.player()?;
        let episode = self
            .catalog
            .find(episode_id)
            .ok_or_else(|| LibraryError::episode_not_found(episode_id))?;
        Ok(player.load(episode).await)
    }

    /// Route a key press to the player. Returns `true` when handled.
    pub async fn handle_key(&self, code: &str, focus: FocusTarget) -> bool {
        if !self.config.features.enable_keyboard_shortcuts {
            return false;
        }
        match &self.player {
            Some(player) => player.handle_key(code, focus).await,
            None => false,
        }
    }

    // ========================================================================
    // Worker
    // ========================================================================

    fn require_worker(&self) -> Result<&WorkerHandle> {
        self.worker
            .as_ref()
            .ok_or(CoreError::FeatureDisabled("offline cache"))
    }

    pub async fn cache_version(&self) -> Result<String> {
        Ok(self.require_worker()?.get_version().await?)
    }

    pub async fn deliver_push(
        &self,
        payload: Option<Bytes>,
    ) -> Result<bridge_traits::NotificationOptions> {
        Ok(self.require_worker()?.push(payload).await?)
    }

    pub async fn notification_click(&self, click: NotificationClick) -> Result<ClickOutcome> {
        Ok(self.require_worker()?.notification_click(click).await?)
    }

    /// Forward a sync tag to the worker. Returns `false` when background
    /// sync is disabled or the tag is unknown.
    pub async fn background_sync(&self, tag: &str) -> Result<bool> {
        if !self.config.features.enable_background_sync {
            return Ok(false);
        }
        Ok(self.require_worker()?.sync(tag).await?)
    }

    /// Stop the worker and wait for its pending cache writes.
    pub async fn shutdown(&self) {
        if let Some(player) = &self.player {
            player.clear();
        }
        if let Some(worker) = &self.worker {
            worker.shutdown();
        }
        let task = self.worker_task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "Cache worker ended abnormally");
            }
        }
    }
}

/// Build a desktop core: logging-only notification and window surfaces,
/// default network and settings adapters, playback off.
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub fn bootstrap_desktop(origin: &str) -> Result<RadioCore> {
    use bridge_desktop::{DesktopWindows, LoggingNotificationPresenter};

    let origin_url = url::Url::parse(origin)
        .map_err(|e| CoreError::InitializationFailed(format!("Invalid origin: {}", e)))?;
    let config = CoreConfig::builder()
        .origin(origin)
        .notification_presenter(Arc::new(LoggingNotificationPresenter::new()))
        .client_windows(Arc::new(DesktopWindows::new(origin_url)))
        .enable_playback(false)
        .build()?;

    RadioCore::bootstrap(config)
}
