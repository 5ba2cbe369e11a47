//! # Core Configuration Module
//!
//! Builder-based configuration for the player core.
//!
//! `CoreConfig` carries the application origin, the catalog location and the
//! host bridges every other crate reaches the outside world through. The
//! builder fails fast with [`Error::CapabilityMissing`] when a required bridge
//! is absent, so a misconfigured host is caught at startup rather than on the
//! first fetch.
//!
//! ## Required bridges
//!
//! - `SettingsStore` - liked episodes and preferences
//! - `UserNotifier` - the single channel for user-visible failures
//! - `HttpClient` - network access for the cache worker and catalog
//!
//! ## Feature-dependent bridges
//!
//! - `AudioElement` - required when `enable_playback` is set
//! - `NotificationPresenter`, `ClientWindows` - required when
//!   `enable_offline_cache` is set
//! - `MediaSessionSurface` - optional; without it the media-session feature
//!   is silently inactive
//!
//! With the `desktop-shims` feature, a reqwest `HttpClient`, a SQLite
//! `SettingsStore` and a console `UserNotifier` are injected when missing.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::CoreConfig;
//! use std::sync::Arc;
//!
//! let config = CoreConfig::builder()
//!     .origin("https://radio.example")
//!     .comment_recipient("studio@radio.example")
//!     .audio_element(Arc::new(MyAudioElement::default()))
//!     .settings_store(Arc::new(MySettingsStore))
//!     .user_notifier(Arc::new(MyNotifier))
//!     .http_client(Arc::new(MyHttpClient))
//!     .build()?;
//! ```

use crate::error::{Error, Result};
use crate::events::DEFAULT_EVENT_BUFFER_SIZE;
use bridge_traits::{
    AudioElement, ClientWindows, HttpClient, MediaSessionSurface, NotificationPresenter,
    SettingsStore, UserNotifier,
};
use std::path::PathBuf;
use std::sync::Arc;
use url::Url;

/// Default location of the episode feed, relative to the origin.
pub const DEFAULT_CATALOG_PATH: &str = "/episodes.json";

/// Core configuration for the player.
///
/// Use [`CoreConfigBuilder`] to construct instances.
#[derive(Clone)]
pub struct CoreConfig {
    /// Origin the application is served from (scheme, host, port)
    pub origin: Url,

    /// Path or URL of the episode feed
    pub catalog_path: String,

    /// Address used for comment notification links
    pub comment_recipient: Option<String>,

    /// Capacity of the event bus channel
    pub event_buffer_size: usize,

    /// Network access (required)
    pub http_client: Arc<dyn HttpClient>,

    /// User preferences storage (required)
    pub settings_store: Arc<dyn SettingsStore>,

    /// User-visible messages (required)
    pub user_notifier: Arc<dyn UserNotifier>,

    /// Audio resource (required when playback is enabled)
    pub audio_element: Option<Arc<dyn AudioElement>>,

    /// Platform now-playing surface (optional)
    pub media_session: Option<Arc<dyn MediaSessionSurface>>,

    /// System notifications for the offline worker
    pub notification_presenter: Option<Arc<dyn NotificationPresenter>>,

    /// Pages controlled by the offline worker
    pub client_windows: Option<Arc<dyn ClientWindows>>,

    pub features: FeatureFlags,
}

impl std::fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoreConfig")
            .field("origin", &self.origin.as_str())
            .field("catalog_path", &self.catalog_path)
            .field("comment_recipient", &self.comment_recipient.is_some())
            .field("event_buffer_size", &self.event_buffer_size)
            .field("http_client", &"HttpClient { ... }")
            .field("settings_store", &"SettingsStore { ... }")
            .field("user_notifier", &"UserNotifier { ... }")
            .field(
                "audio_element",
                &self.audio_element.as_ref().map(|_| "AudioElement { ... }"),
            )
            .field(
                "media_session",
                &self
                    .media_session
                    .as_ref()
                    .map(|_| "MediaSessionSurface { ... }"),
            )
            .field(
                "notification_presenter",
                &self
                    .notification_presenter
                    .as_ref()
                    .map(|_| "NotificationPresenter { ... }"),
            )
            .field(
                "client_windows",
                &self.client_windows.as_ref().map(|_| "ClientWindows { ... }"),
            )
            .field("features", &self.features)
            .finish()
    }
}

/// Feature flags control optional functionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeatureFlags {
    /// Drive an audio element through the playback controller
    pub enable_playback: bool,

    /// Route fetches through the offline cache worker
    pub enable_offline_cache: bool,

    /// Publish now-playing metadata when a surface is available
    pub enable_media_session: bool,

    /// Handle the global keyboard shortcuts
    pub enable_keyboard_shortcuts: bool,

    /// Accept background-sync requests in the worker
    pub enable_background_sync: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            enable_playback: true,
            enable_offline_cache: true,
            enable_media_session: true,
            enable_keyboard_shortcuts: true,
            enable_background_sync: false,
        }
    }
}

impl CoreConfig {
    pub fn builder() -> CoreConfigBuilder {
        CoreConfigBuilder::default()
    }

    /// Resolve the catalog location against the origin.
    pub fn catalog_url(&self) -> Result<Url> {
        self.origin
            .join(&self.catalog_path)
            .map_err(|e| Error::Config(format!("Invalid catalog path: {}", e)))
    }

    /// Validates the configuration.
    ///
    /// Checks that the origin is an http(s) URL, the catalog path resolves,
    /// the event buffer is non-empty, the comment recipient looks like an
    /// address and feature flags are backed by their bridges.
    pub fn validate(&self) -> Result<()> {
        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(Error::Config(format!(
                "Origin must be an http(s) URL, got '{}'",
                self.origin
            )));
        }

        if self.catalog_path.trim().is_empty() {
            return Err(Error::Config("Catalog path cannot be empty".to_string()));
        }
        self.catalog_url()?;

        if self.event_buffer_size == 0 {
            return Err(Error::Config(
                "Event buffer size must be greater than 0".to_string(),
            ));
        }

        if let Some(recipient) = &self.comment_recipient {
            if !recipient.contains('@') {
                return Err(Error::Config(format!(
                    "Comment recipient '{}' is not an email address",
                    recipient
                )));
            }
        }

        if self.features.enable_playback && self.audio_element.is_none() {
            return Err(Error::CapabilityMissing {
                capability: "AudioElement".to_string(),
                message: "Playback is enabled but no AudioElement was provided. \
                          Inject the host audio element or disable playback."
                    .to_string(),
            });
        }

        if self.features.enable_offline_cache {
            if self.notification_presenter.is_none() {
                return Err(Error::CapabilityMissing {
                    capability: "NotificationPresenter".to_string(),
                    message: "The offline cache worker needs a NotificationPresenter \
                              to show push messages."
                        .to_string(),
                });
            }
            if self.client_windows.is_none() {
                return Err(Error::CapabilityMissing {
                    capability: "ClientWindows".to_string(),
                    message: "The offline cache worker needs ClientWindows to claim \
                              and focus pages."
                        .to_string(),
                });
            }
        }

        if self.features.enable_background_sync && !self.features.enable_offline_cache {
            return Err(Error::Config(
                "Background sync runs inside the offline cache worker; \
                 enable the offline cache as well."
                    .to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(not(feature = "desktop-shims"))]
fn capability_missing(capability: &str, purpose: &str) -> Error {
    Error::CapabilityMissing {
        capability: capability.to_string(),
        message: format!(
            "{} implementation is required for {}. \
             Desktop: enable the 'desktop-shims' feature to use the default adapter. \
             Web: inject the browser-backed implementation.",
            capability, purpose
        ),
    }
}

#[cfg(feature = "desktop-shims")]
fn provide_default_http_client(origin: &Url) -> Result<Arc<dyn HttpClient>> {
    use bridge_desktop::ReqwestHttpClient;

    let client = ReqwestHttpClient::new()?.with_base_url(origin.clone());
    Ok(Arc::new(client))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_http_client(_origin: &Url) -> Result<Arc<dyn HttpClient>> {
    Err(capability_missing("HttpClient", "network access"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_user_notifier() -> Result<Arc<dyn UserNotifier>> {
    Ok(Arc::new(bridge_desktop::ConsoleNotifier))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_user_notifier() -> Result<Arc<dyn UserNotifier>> {
    Err(capability_missing("UserNotifier", "user-visible messages"))
}

#[cfg(feature = "desktop-shims")]
fn provide_default_settings_store(path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    use bridge_desktop::SqliteSettingsStore;
    use std::thread;
    use tokio::runtime::{Handle, Runtime};

    let path = path.unwrap_or_else(|| std::env::temp_dir().join("radio-player-settings.db"));

    let init_store = |path: PathBuf| -> Result<_> {
        let runtime = Runtime::new().map_err(|e| {
            Error::Internal(format!(
                "Failed to create Tokio runtime for default settings store: {}",
                e
            ))
        })?;

        runtime
            .block_on(SqliteSettingsStore::new(path))
            .map_err(|e| {
                Error::Internal(format!("Failed to initialize default SettingsStore: {}", e))
            })
    };

    // A runtime cannot be blocked on from inside another one
    let store = match Handle::try_current() {
        Ok(_) => thread::spawn(move || init_store(path))
            .join()
            .map_err(|_| {
                Error::Internal(
                    "Worker thread panicked while creating default SettingsStore".to_string(),
                )
            })??,
        Err(_) => init_store(path)?,
    };

    Ok(Arc::new(store))
}

#[cfg(not(feature = "desktop-shims"))]
fn provide_default_settings_store(_path: Option<PathBuf>) -> Result<Arc<dyn SettingsStore>> {
    Err(capability_missing("SettingsStore", "liked episodes"))
}

/// Builder for [`CoreConfig`].
#[derive(Default)]
pub struct CoreConfigBuilder {
    origin: Option<String>,
    catalog_path: Option<String>,
    comment_recipient: Option<String>,
    event_buffer_size: Option<usize>,
    settings_path: Option<PathBuf>,
    http_client: Option<Arc<dyn HttpClient>>,
    settings_store: Option<Arc<dyn SettingsStore>>,
    user_notifier: Option<Arc<dyn UserNotifier>>,
    audio_element: Option<Arc<dyn AudioElement>>,
    media_session: Option<Arc<dyn MediaSessionSurface>>,
    notification_presenter: Option<Arc<dyn NotificationPresenter>>,
    client_windows: Option<Arc<dyn ClientWindows>>,
    features: Option<FeatureFlags>,
}

impl CoreConfigBuilder {
    /// Sets the application origin, e.g. `https://radio.example`.
    pub fn origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    /// Sets the feed location (defaults to `/episodes.json`).
    pub fn catalog_path(mut self, path: impl Into<String>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn comment_recipient(mut self, address: impl Into<String>) -> Self {
        self.comment_recipient = Some(address.into());
        self
    }

    pub fn event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = Some(size);
        self
    }

    /// Where the desktop default settings database lives.
    pub fn settings_path<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.settings_path = Some(path.into());
        self
    }

    pub fn http_client(mut self, client: Arc<dyn HttpClient>) -> Self {
        self.http_client = Some(client);
        self
    }

    pub fn settings_store(mut self, store: Arc<dyn SettingsStore>) -> Self {
        self.settings_store = Some(store);
        self
    }

    pub fn user_notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.user_notifier = Some(notifier);
        self
    }

    pub fn audio_element(mut self, element: Arc<dyn AudioElement>) -> Self {
        self.audio_element = Some(element);
        self
    }

    pub fn media_session(mut self, surface: Arc<dyn MediaSessionSurface>) -> Self {
        self.media_session = Some(surface);
        self
    }

    pub fn notification_presenter(mut self, presenter: Arc<dyn NotificationPresenter>) -> Self {
        self.notification_presenter = Some(presenter);
        self
    }

    pub fn client_windows(mut self, windows: Arc<dyn ClientWindows>) -> Self {
        self.client_windows = Some(windows);
        self
    }

    pub fn features(mut self, features: FeatureFlags) -> Self {
        self.features = Some(features);
        self
    }

    pub fn enable_offline_cache(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_offline_cache = enabled;
        self
    }

    pub fn enable_playback(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_playback = enabled;
        self
    }

    pub fn enable_background_sync(mut self, enabled: bool) -> Self {
        self.features.get_or_insert_with(FeatureFlags::default).enable_background_sync = enabled;
        self
    }

    /// Builds and validates the configuration.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] when the origin is missing or malformed, or a
    ///   value fails validation
    /// - [`Error::CapabilityMissing`] when a required bridge is absent and no
    ///   desktop default is available
    pub fn build(self) -> Result<CoreConfig> {
        let origin = self.origin.ok_or_else(|| {
            Error::Config("Origin is required. Use .origin() to set it.".to_string())
        })?;
        let origin = Url::parse(&origin)
            .map_err(|e| Error::Config(format!("Invalid origin '{}': {}", origin, e)))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => provide_default_http_client(&origin)?,
        };

        let settings_store = match self.settings_store {
            Some(store) => store,
            None => provide_default_settings_store(self.settings_path)?,
        };

        let user_notifier = match self.user_notifier {
            Some(notifier) => notifier,
            None => provide_default_user_notifier()?,
        };

        let config = CoreConfig {
            origin,
            catalog_path: self
                .catalog_path
                .unwrap_or_else(|| DEFAULT_CATALOG_PATH.to_string()),
            comment_recipient: self.comment_recipient,
            event_buffer_size: self.event_buffer_size.unwrap_or(DEFAULT_EVENT_BUFFER_SIZE),
            http_client,
            settings_store,
            user_notifier,
            audio_element: self.audio_element,
            media_session: self.media_session,
            notification_presenter: self.notification_presenter,
            client_windows: self.client_windows,
            features: self.features.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::{
        AudioError, AudioEventSink, ClientWindow, HttpRequest, HttpResponse, NotificationOptions,
    };
    use std::sync::Weak;

    struct NullHttp;

    #[async_trait]
    impl HttpClient for NullHttp {
        async fn execute(&self, _request: HttpRequest) -> BridgeResult<HttpResponse> {
            Ok(HttpResponse::new(200, "{}"))
        }
    }

    struct NullSettings;

    #[async_trait]
    impl SettingsStore for NullSettings {
        async fn set_string(&self, _key: &str, _value: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_string(&self, _key: &str) -> BridgeResult<Option<String>> {
            Ok(None)
        }
        async fn set_bool(&self, _key: &str, _value: bool) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_bool(&self, _key: &str) -> BridgeResult<Option<bool>> {
            Ok(None)
        }
        async fn set_f64(&self, _key: &str, _value: f64) -> BridgeResult<()> {
            Ok(())
        }
        async fn get_f64(&self, _key: &str) -> BridgeResult<Option<f64>> {
            Ok(None)
        }
        async fn delete(&self, _key: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(Vec::new())
        }
    }

    struct NullNotifier;

    impl UserNotifier for NullNotifier {
        fn alert(&self, _message: &str) {}
    }

    struct NullAudio;

    #[async_trait]
    impl AudioElement for NullAudio {
        fn set_event_sink(&self, _sink: Weak<dyn AudioEventSink>) {}
        fn set_source(&self, _url: &str) {}
        fn source(&self) -> Option<String> {
            None
        }
        async fn play(&self) -> std::result::Result<(), AudioError> {
            Ok(())
        }
        fn pause(&self) {}
        fn is_paused(&self) -> bool {
            true
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        fn set_current_time(&self, _seconds: f64) {}
        fn duration(&self) -> Option<f64> {
            None
        }
        fn volume(&self) -> f64 {
            1.0
        }
        fn set_volume(&self, _volume: f64) {}
        fn playback_rate(&self) -> f64 {
            1.0
        }
        fn set_playback_rate(&self, _rate: f64) {}
    }

    struct NullWorkerSurfaces;

    #[async_trait]
    impl NotificationPresenter for NullWorkerSurfaces {
        async fn show(&self, _options: NotificationOptions) -> BridgeResult<()> {
            Ok(())
        }
        async fn close(&self, _tag: &str) -> BridgeResult<()> {
            Ok(())
        }
    }

    #[async_trait]
    impl ClientWindows for NullWorkerSurfaces {
        async fn claim(&self) -> BridgeResult<()> {
            Ok(())
        }
        async fn match_all_windows(&self) -> BridgeResult<Vec<ClientWindow>> {
            Ok(Vec::new())
        }
        async fn focus(&self, _id: &str) -> BridgeResult<()> {
            Ok(())
        }
        async fn open_window(&self, url: &str) -> BridgeResult<ClientWindow> {
            Ok(ClientWindow {
                id: "1".to_string(),
                url: url.to_string(),
                focused: true,
            })
        }
    }

    fn complete_builder() -> CoreConfigBuilder {
        let surfaces = Arc::new(NullWorkerSurfaces);
        CoreConfig::builder()
            .origin("https://radio.example")
            .http_client(Arc::new(NullHttp))
            .settings_store(Arc::new(NullSettings))
            .user_notifier(Arc::new(NullNotifier))
            .audio_element(Arc::new(NullAudio))
            .notification_presenter(surfaces.clone())
            .client_windows(surfaces)
    }

    #[test]
    fn test_builder_with_all_required_fields() {
        let config = complete_builder().build().unwrap();
        assert_eq!(config.origin.as_str(), "https://radio.example/");
        assert_eq!(config.catalog_path, DEFAULT_CATALOG_PATH);
        assert_eq!(config.event_buffer_size, DEFAULT_EVENT_BUFFER_SIZE);
        assert_eq!(
            config.catalog_url().unwrap().as_str(),
            "https://radio.example/episodes.json"
        );
    }

    #[test]
    fn test_builder_requires_origin() {
        let result = CoreConfig::builder()
            .http_client(Arc::new(NullHttp))
            .settings_store(Arc::new(NullSettings))
            .build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Origin")));
    }

    #[test]
    fn test_builder_rejects_non_http_origin() {
        let result = complete_builder().origin("file:///tmp/app").build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_playback_requires_audio_element() {
        let surfaces = Arc::new(NullWorkerSurfaces);
        let result = CoreConfig::builder()
            .origin("https://radio.example")
            .http_client(Arc::new(NullHttp))
            .settings_store(Arc::new(NullSettings))
            .user_notifier(Arc::new(NullNotifier))
            .notification_presenter(surfaces.clone())
            .client_windows(surfaces)
            .build();

        match result {
            Err(Error::CapabilityMissing { capability, .. }) => {
                assert_eq!(capability, "AudioElement")
            }
            other => panic!("expected CapabilityMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_offline_cache_requires_worker_surfaces() {
        let result = CoreConfig::builder()
            .origin("https://radio.example")
            .http_client(Arc::new(NullHttp))
            .settings_store(Arc::new(NullSettings))
            .user_notifier(Arc::new(NullNotifier))
            .audio_element(Arc::new(NullAudio))
            .build();
        assert!(matches!(result, Err(Error::CapabilityMissing { .. })));

        let without_cache = CoreConfig::builder()
            .origin("https://radio.example")
            .http_client(Arc::new(NullHttp))
            .settings_store(Arc::new(NullSettings))
            .user_notifier(Arc::new(NullNotifier))
            .audio_element(Arc::new(NullAudio))
            .enable_offline_cache(false)
            .build();
        assert!(without_cache.is_ok());
    }

    #[test]
    fn test_background_sync_requires_offline_cache() {
        let result = complete_builder()
            .enable_offline_cache(false)
            .enable_background_sync(true)
            .build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_zero_event_buffer() {
        let result = complete_builder().event_buffer_size(0).build();
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_validate_rejects_malformed_recipient() {
        let result = complete_builder().comment_recipient("not-an-address").build();
        assert!(matches!(result, Err(Error::Config(_))));

        let ok = complete_builder()
            .comment_recipient("studio@radio.example")
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn test_feature_flags_default() {
        let flags = FeatureFlags::default();
        assert!(flags.enable_playback);
        assert!(flags.enable_offline_cache);
        assert!(!flags.enable_background_sync);
    }

    #[test]
    fn test_debug_hides_recipient() {
        let config = complete_builder()
            .comment_recipient("studio@radio.example")
            .build()
            .unwrap();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("studio@"));
        assert!(rendered.contains("radio.example"));
    }

    #[cfg(not(feature = "desktop-shims"))]
    #[test]
    fn test_missing_settings_store_is_reported() {
        let result = CoreConfig::builder()
            .origin("https://radio.example")
            .http_client(Arc::new(NullHttp))
            .build();
        assert!(matches!(
            result,
            Err(Error::CapabilityMissing { capability, .. }) if capability == "SettingsStore"
        ));
    }
}
