//! # Cache Manager
//!
//! Lifecycle of the offline worker: install the manifest into the
//! generation named by the version tag, activate by rotating out every
//! other generation and claiming the open pages, then serve fetches with
//! the strategies in [`crate::strategy`].
//!
//! The manager also answers page messages, shows push notifications,
//! routes notification clicks and runs the background sync hook.

use crate::classify::RequestClassifier;
use crate::config::{CacheConfig, BACKGROUND_SYNC_TAG};
use crate::error::{CacheError, Result};
use crate::notification::{merge_push_payload, ClickOutcome, NotificationClick};
use crate::storage::{CacheStorage, CachedResponse};
use bridge_traits::{
    ClientWindows, HttpClient, HttpRequest, NotificationOptions, NotificationPresenter,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, instrument, warn};

/// Where the worker is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    /// Constructed, install not run yet.
    Parsed,
    Installing,
    /// Installed and waiting for activation.
    Installed,
    Activating,
    /// Controlling clients and intercepting fetches.
    Activated,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::Parsed => "parsed",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Activated => "activated",
        };
        f.write_str(name)
    }
}

/// Messages a page posts to the worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientMessage {
    SkipWaiting,
    GetVersion,
}

/// Reply to [`ClientMessage::GetVersion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionReply {
    pub version: String,
}

pub struct CacheManager {
    pub(crate) config: CacheConfig,
    pub(crate) classifier: RequestClassifier,
    pub(crate) storage: Arc<CacheStorage>,
    pub(crate) http: Arc<dyn HttpClient>,
    notifications: Arc<dyn NotificationPresenter>,
    clients: Arc<dyn ClientWindows>,
    pub(crate) events: Option<EventBus>,
    state: Mutex<LifecycleState>,
    skip_waiting: AtomicBool,
    pub(crate) writes: TaskTracker,
}

impl CacheManager {
    pub fn new(
        config: CacheConfig,
        http: Arc<dyn HttpClient>,
        notifications: Arc<dyn NotificationPresenter>,
        clients: Arc<dyn ClientWindows>,
    ) -> Result<Self> {
        config.validate()?;
        let classifier = RequestClassifier::new(config.origin.clone(), &config.audio_extensions);
        let storage = Arc::new(CacheStorage::new(config.max_cache_bytes));

        Ok(Self {
            config,
            classifier,
            storage,
            http,
            notifications,
            clients,
            events: None,
            state: Mutex::new(LifecycleState::Parsed),
            skip_waiting: AtomicBool::new(false),
            writes: TaskTracker::new(),
        })
    }

    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = Some(events);
        self
    }

    /// Use an existing storage, e.g. one that survived a previous version.
    pub fn with_storage(mut self, storage: Arc<CacheStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn storage(&self) -> Arc<CacheStorage> {
        Arc::clone(&self.storage)
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    pub fn is_active(&self) -> bool {
        self.state() == LifecycleState::Activated
    }

    fn set_state(&self, state: LifecycleState) {
        *self.state.lock() = state;
    }

    /// Install, then activate right away when install asked to skip waiting.
    ///
    /// A failed install on a first run still activates, so pages get runtime
    /// caching. When an older generation is present the new version waits
    /// for `SKIP_WAITING` instead.
    pub async fn start(&self) {
        if let Err(e) = self.install().await {
            warn!(error = %e, version = %self.config.version, "Install failed");
            if self.has_previous_generation().await {
                info!("Previous generation present, waiting for SKIP_WAITING");
            } else {
                self.skip_waiting.store(true, Ordering::SeqCst);
            }
        }
        if self.skip_waiting.load(Ordering::SeqCst) {
            if let Err(e) = self.activate().await {
                warn!(error = %e, "Activation failed");
            }
        }
    }

    async fn has_previous_generation(&self) -> bool {
        self.storage
            .keys()
            .await
            .iter()
            .any(|name| name != &self.config.version)
    }

    /// Pre-populate the generation named by the version tag with the
    /// manifest. Entries are stored all together or not at all.
    #[instrument(skip(self), fields(version = %self.config.version))]
    pub async fn install(&self) -> Result<usize> {
        {
            let mut state = self.state.lock();
            if *state != LifecycleState::Parsed {
                return Err(CacheError::InvalidState {
                    operation: "install",
                    state: state.to_string(),
                });
            }
            *state = LifecycleState::Installing;
        }
        self.storage.open(&self.config.version).await;

        let result = self.fetch_manifest().await;
        let result = match result {
            Ok(entries) => {
                let count = entries.len();
                self.storage
                    .put_all(&self.config.version, entries)
                    .await
                    .map(|_| count)
            }
            Err(e) => Err(e),
        };

        // A failed install still leaves a waiting worker; fetches pass
        // through until something activates it.
        self.set_state(LifecycleState::Installed);
        match result {
            Ok(count) => {
                info!(entries = count, "Pre-cached manifest");
                self.skip_waiting.store(true, Ordering::SeqCst);
                self.emit(CacheEvent::Installed {
                    version: self.config.version.clone(),
                    entries: count,
                });
                Ok(count)
            }
            Err(e) => {
                self.emit(CacheEvent::InstallFailed {
                    version: self.config.version.clone(),
                    message: e.to_string(),
                });
                Err(e)
            }
        }
    }

    async fn fetch_manifest(&self) -> Result<Vec<(String, CachedResponse)>> {
        let mut entries = Vec::with_capacity(self.config.manifest.len());
        for path in &self.config.manifest {
            let response = self
                .http
                .execute(HttpRequest::get(path.as_str()))
                .await
                .map_err(|e| CacheError::ManifestEntry {
                    url: path.clone(),
                    reason: e.to_string(),
                })?;
            if !response.is_success() {
                return Err(CacheError::ManifestEntry {
                    url: path.clone(),
                    reason: format!("HTTP {}", response.status),
                });
            }
            entries.push((self.classifier.cache_key(path), CachedResponse::from(&response)));
        }
        Ok(entries)
    }

    /// Delete every generation except the current one, then claim clients.
    #[instrument(skip(self), fields(version = %self.config.version))]
    pub async fn activate(&self) -> Result<Vec<String>> {
        {
            let mut state = self.state.lock();
            match *state {
                LifecycleState::Activated => return Ok(Vec::new()),
                LifecycleState::Installed => {}
                other => {
                    return Err(CacheError::InvalidState {
                        operation: "activate",
                        state: other.to_string(),
                    })
                }
            }
            *state = LifecycleState::Activating;
        }

        let mut removed = Vec::new();
        for name in self.storage.keys().await {
            if name != self.config.version && self.storage.delete(&name).await {
                info!(generation = %name, "Deleted old cache generation");
                removed.push(name);
            }
        }

        if let Err(e) = self.clients.claim().await {
            warn!(error = %e, "Failed to claim clients");
        }

        self.set_state(LifecycleState::Activated);
        self.emit(CacheEvent::Activated {
            version: self.config.version.clone(),
            removed: removed.clone(),
        });
        Ok(removed)
    }

    /// Handle a raw page message. Returns the reply to post back, if any.
    pub async fn handle_message(&self, message: &Value) -> Option<VersionReply> {
        let message = match serde_json::from_value::<ClientMessage>(message.clone()) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, %message, "Ignoring malformed worker message");
                return None;
            }
        };

        match message {
            ClientMessage::GetVersion => Some(VersionReply {
                version: self.config.version.clone(),
            }),
            ClientMessage::SkipWaiting => {
                if self.state() == LifecycleState::Installed {
                    if let Err(e) = self.activate().await {
                        warn!(error = %e, "Skip-waiting activation failed");
                    }
                } else {
                    debug!(state = %self.state(), "Nothing waiting, SKIP_WAITING ignored");
                }
                None
            }
        }
    }

    /// Show a notification for a push message.
    #[instrument(skip(self, payload))]
    pub async fn handle_push(&self, payload: Option<&[u8]>) -> NotificationOptions {
        let options = merge_push_payload(&self.config.notification, payload);
        if let Err(e) = self.notifications.show(options.clone()).await {
            warn!(error = %e, "Failed to show push notification");
        } else {
            self.emit(CacheEvent::NotificationShown {
                title: options.title.clone(),
            });
        }
        options
    }

    /// Close the clicked notification, then bring a window of the app to
    /// the front unless the click was a dismiss.
    #[instrument(skip(self))]
    pub async fn handle_notification_click(&self, click: NotificationClick) -> ClickOutcome {
        if let Err(e) = self.notifications.close(&click.tag).await {
            warn!(error = %e, tag = %click.tag, "Failed to close notification");
        }
        if click.is_dismiss() {
            return ClickOutcome::Dismissed;
        }

        match self.clients.match_all_windows().await {
            Ok(windows) => {
                let existing = windows
                    .into_iter()
                    .find(|window| self.classifier.is_same_origin(&window.url));
                if let Some(window) = existing {
                    match self.clients.focus(&window.id).await {
                        Ok(()) => return ClickOutcome::Focused(window.id),
                        Err(e) => warn!(error = %e, id = %window.id, "Failed to focus window"),
                    }
                }
            }
            Err(e) => warn!(error = %e, "Failed to list windows"),
        }

        match self.clients.open_window("/").await {
            Ok(window) => ClickOutcome::Opened(window.id),
            Err(e) => {
                warn!(error = %e, "Failed to open window");
                ClickOutcome::NoWindow
            }
        }
    }

    /// Run the sync hook for `tag`. Returns `false` for unknown tags.
    pub async fn handle_sync(&self, tag: &str) -> bool {
        if tag != BACKGROUND_SYNC_TAG {
            debug!(tag, "Ignoring unknown sync tag");
            return false;
        }
        self.sync_offline_data().await;
        self.emit(CacheEvent::SyncCompleted {
            tag: tag.to_string(),
        });
        true
    }

    async fn sync_offline_data(&self) {
        let entries = self.storage.entry_count(&self.config.version).await;
        info!(
            generation = %self.config.version,
            entries,
            "Syncing offline data"
        );
    }

    /// Wait for every background cache write started so far.
    pub async fn flush_pending_writes(&self) {
        self.writes.close();
        self.writes.wait().await;
        self.writes.reopen();
    }

    pub(crate) fn emit(&self, event: CacheEvent) {
        if let Some(bus) = &self.events {
            let _ = bus.emit(CoreEvent::Cache(event));
        }
    }
}
