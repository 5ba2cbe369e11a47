//! The assembled core: worker, catalog, likes, comments and player.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ClientWindow, ClientWindows, FixedClock, HttpClient, HttpRequest, HttpResponse,
    NotificationOptions, NotificationPresenter, SettingsStore,
};
use bytes::Bytes;
use core_cache::DEFAULT_MANIFEST;
use core_library::{EpisodeFilter, LIKED_EPISODES_KEY};
use core_playback::testing::{FakeAudioElement, RecordingNotifier};
use core_playback::{LoadOutcome, PlaybackError, TransportState, PLAY_FAILED_MESSAGE};
use core_runtime::config::CoreConfig;
use core_service::{CoreError, RadioCore, ServiceOptions};
use mockall::mock;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

const ORIGIN: &str = "https://radio.example";

const FEED: &str = r#"{
  "episodes": [
    {"id": 1, "title": "Pilot", "description": "First", "coverImage": "/img/1.png",
     "audioUrl": "/audio/1.mp3", "duration": "12:00", "publishedAt": "2024-01-01", "likes": 2},
    {"id": 2, "title": "Second", "description": "Next", "coverImage": "/img/2.png",
     "audioUrl": "/audio/2.mp3", "duration": "14:00", "publishedAt": "2024-02-01"}
  ]
}"#;

mock! {
    Presenter {}

    #[async_trait]
    impl NotificationPresenter for Presenter {
        async fn show(&self, options: NotificationOptions) -> BridgeResult<()>;
        async fn close(&self, tag: &str) -> BridgeResult<()>;
    }
}

/// The station's web server.
#[derive(Default)]
struct Station {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
}

impl Station {
    fn new() -> Arc<Self> {
        let station = Self::default();
        {
            let mut routes = station.routes.lock();
            for path in DEFAULT_MANIFEST {
                routes.insert(path.to_string(), HttpResponse::new(200, "asset"));
            }
            routes.insert("/episodes.json".to_string(), HttpResponse::new(200, FEED));
        }
        Arc::new(station)
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }
}

#[async_trait]
impl HttpClient for Station {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("offline".to_string()));
        }
        let path = request
            .url
            .strip_prefix(ORIGIN)
            .unwrap_or(&request.url)
            .to_string();
        Ok(self
            .routes
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}

/// Forwards to a client wired in after the core is built, the way a page's
/// audio element only starts going through the worker once it controls the
/// page.
#[derive(Default)]
struct DeferredHttp(OnceLock<Arc<dyn HttpClient>>);

#[async_trait]
impl HttpClient for DeferredHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        match self.0.get() {
            Some(client) => client.execute(request).await,
            None => Err(BridgeError::NotAvailable("loader not wired".to_string())),
        }
    }
}

#[derive(Default)]
struct MemorySettings(Mutex<HashMap<String, String>>);

#[async_trait]
impl SettingsStore for MemorySettings {
    async fn set_string(&self, key: &str, value: &str) -> BridgeResult<()> {
        self.0.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }
    async fn get_string(&self, key: &str) -> BridgeResult<Option<String>> {
        Ok(self.0.lock().get(key).cloned())
    }
    async fn set_bool(&self, key: &str, value: bool) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }
    async fn get_bool(&self, key: &str) -> BridgeResult<Option<bool>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }
    async fn set_f64(&self, key: &str, value: f64) -> BridgeResult<()> {
        self.set_string(key, &value.to_string()).await
    }
    async fn get_f64(&self, key: &str) -> BridgeResult<Option<f64>> {
        Ok(self.get_string(key).await?.and_then(|v| v.parse().ok()))
    }
    async fn delete(&self, key: &str) -> BridgeResult<()> {
        self.0.lock().remove(key);
        Ok(())
    }
    async fn list_keys(&self) -> BridgeResult<Vec<String>> {
        Ok(self.0.lock().keys().cloned().collect())
    }
}

struct NoWindows;

#[async_trait]
impl ClientWindows for NoWindows {
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
            id: "w1".to_string(),
            url: format!("{}{}", ORIGIN, url),
            focused: true,
        })
    }
}

struct Setup {
    station: Arc<Station>,
    loader: Arc<DeferredHttp>,
    audio: Arc<FakeAudioElement>,
    notifier: Arc<RecordingNotifier>,
    settings: Arc<MemorySettings>,
}

impl Setup {
    fn new() -> Self {
        let loader = Arc::new(DeferredHttp::default());
        Self {
            station: Station::new(),
            audio: Arc::new(FakeAudioElement::new().with_loader(loader.clone())),
            loader,
            notifier: Arc::new(RecordingNotifier::new()),
            settings: Arc::new(MemorySettings::default()),
        }
    }

    fn config(&self) -> core_runtime::config::CoreConfigBuilder {
        let mut presenter = MockPresenter::new();
        presenter.expect_show().returning(|_| Ok(()));
        presenter.expect_close().returning(|_| Ok(()));

        CoreConfig::builder()
            .origin(ORIGIN)
            .comment_recipient("studio@radio.example")
            .http_client(self.station.clone())
            .settings_store(self.settings.clone())
            .user_notifier(self.notifier.clone())
            .audio_element(self.audio.clone())
            .notification_presenter(Arc::new(presenter))
            .client_windows(Arc::new(NoWindows))
    }

    fn bootstrap(&self) -> RadioCore {
        let config = self.config().build().unwrap();
        let options =
            ServiceOptions::default().with_clock(Arc::new(FixedClock::at_millis(1_714_000_000_000)));
        let core = RadioCore::bootstrap_with(config, options).unwrap();
        let _ = self.loader.0.set(core.http_client());
        core
    }
}

#[tokio::test]
async fn offline_episode_load_errors_with_one_alert() {
    let setup = Setup::new();
    let core = setup.bootstrap();
    assert_eq!(core.start().await, 2);

    setup.station.set_offline(true);
    let outcome = core.play_episode("1").await.unwrap();

    assert!(matches!(
        outcome,
        LoadOutcome::Failed(PlaybackError::SourceUnavailable(_))
    ));
    assert_eq!(core.player().unwrap().transport(), TransportState::Errored);
    assert_eq!(setup.notifier.messages(), vec![PLAY_FAILED_MESSAGE.to_string()]);

    core.shutdown().await;
}

#[tokio::test]
async fn online_episode_load_starts_playing() {
    let setup = Setup::new();
    setup
        .station
        .routes
        .lock()
        .insert("/audio/2.mp3".to_string(), HttpResponse::new(200, "mp3"));
    let core = setup.bootstrap();
    core.start().await;

    assert_eq!(core.play_episode("2").await.unwrap(), LoadOutcome::Started);
    assert_eq!(core.player().unwrap().transport(), TransportState::Playing);
    assert_eq!(setup.notifier.count(), 0);

    assert!(matches!(
        core.play_episode("99").await,
        Err(CoreError::Library(_))
    ));
    core.shutdown().await;
}

#[tokio::test]
async fn catalog_reloads_from_cache_when_offline() {
    let setup = Setup::new();
    let core = setup.bootstrap();
    assert_eq!(core.start().await, 2);

    setup.station.set_offline(true);
    assert_eq!(core.catalog().load().await, 2);
    assert_eq!(setup.notifier.count(), 0);
    assert_eq!(core.episodes(EpisodeFilter::Recent)[0].id, "2");

    core.shutdown().await;
}

#[tokio::test]
async fn likes_and_comments_go_through_the_facade() {
    let setup = Setup::new();
    let core = setup.bootstrap();
    core.start().await;

    let state = core.toggle_like("1").await.unwrap();
    assert!(state.liked);
    assert_eq!(state.likes, 3);
    assert_eq!(
        setup.settings.0.lock().get(LIKED_EPISODES_KEY).cloned(),
        Some(r#"["1"]"#.to_string())
    );

    let receipt = core.submit_comment("2", "  Great show  ").unwrap();
    assert_eq!(receipt.comment.text, "Great show");
    assert_eq!(receipt.comment_count, 1);
    assert!(receipt
        .mailto
        .unwrap()
        .starts_with("mailto:studio@radio.example?subject="));

    core.shutdown().await;
}

#[tokio::test]
async fn worker_operations() {
    let setup = Setup::new();
    let core = setup.bootstrap();

    assert_eq!(core.cache_version().await.unwrap(), "radio-app-v1");
    // Background sync is off by default
    assert!(!core.background_sync("background-sync").await.unwrap());

    let shown = core
        .deliver_push(Some(Bytes::from_static(br#"{"title":"New Ep"}"#)))
        .await
        .unwrap();
    assert_eq!(shown.title, "New Ep");
    assert_eq!(shown.body, "A new episode is out!");

    core.shutdown().await;
    assert!(core.cache_version().await.is_err());
}

#[tokio::test]
async fn background_sync_when_enabled() {
    let setup = Setup::new();
    let config = setup.config().enable_background_sync(true).build().unwrap();
    let core = RadioCore::bootstrap(config).unwrap();

    assert!(core.background_sync("background-sync").await.unwrap());
    assert!(!core.background_sync("other").await.unwrap());
    core.shutdown().await;
}

#[tokio::test]
async fn disabled_features_are_reported() {
    let setup = Setup::new();
    let config = setup
        .config()
        .enable_playback(false)
        .enable_offline_cache(false)
        .build()
        .unwrap();
    let core = RadioCore::bootstrap(config).unwrap();

    assert!(matches!(
        core.player(),
        Err(CoreError::FeatureDisabled("playback"))
    ));
    assert!(matches!(
        core.cache_version().await,
        Err(CoreError::FeatureDisabled("offline cache"))
    ));
    assert!(!core.handle_key("Space", Default::default()).await);

    // Without the worker the feed comes straight from the host client.
    assert_eq!(core.start().await, 2);
}
