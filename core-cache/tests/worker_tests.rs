//! Cache worker lifecycle, fetch strategies and notifications.

use async_trait::async_trait;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{
    BridgeError, ClientWindow, ClientWindows, HttpClient, HttpRequest, HttpResponse,
    NotificationOptions, NotificationPresenter, RequestDestination,
};
use core_cache::{
    CacheConfig, CacheError, CacheManager, CacheStorage, CacheWorker, CachedResponse,
    ClickOutcome, LifecycleState, NotificationClick, DEFAULT_MANIFEST,
};
use core_runtime::events::{CacheEvent, CoreEvent, EventBus};
use mockall::mock;
use parking_lot::Mutex;
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::Receiver;
use tokio::sync::Notify;
use tokio::time::timeout;
use url::Url;

const ORIGIN: &str = "https://radio.example";

mock! {
    Presenter {}

    #[async_trait]
    impl NotificationPresenter for Presenter {
        async fn show(&self, options: NotificationOptions) -> BridgeResult<()>;
        async fn close(&self, tag: &str) -> BridgeResult<()>;
    }
}

/// Serves fixed routes by path and can be switched offline.
#[derive(Default)]
struct FakeNetwork {
    routes: Mutex<HashMap<String, HttpResponse>>,
    offline: AtomicBool,
    requests: Mutex<Vec<String>>,
    /// Paths whose responses wait for a release
    held: Mutex<HashMap<String, Arc<Notify>>>,
}

impl FakeNetwork {
    fn site() -> Arc<Self> {
        let network = Self::default();
        for path in DEFAULT_MANIFEST {
            network.route(path, HttpResponse::new(200, format!("asset {}", path)));
        }
        Arc::new(network)
    }

    fn route(&self, url: &str, response: HttpResponse) {
        self.routes.lock().insert(url.to_string(), response);
    }

    fn remove(&self, url: &str) {
        self.routes.lock().remove(url);
    }

    fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn request_count(&self, url: &str) -> usize {
        self.requests.lock().iter().filter(|seen| *seen == url).count()
    }

    /// Hold responses for `url` until the returned gate is notified.
    fn hold(&self, url: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.held.lock().insert(url.to_string(), gate.clone());
        gate
    }
}

fn path_of(url: &str) -> String {
    match url.strip_prefix(ORIGIN) {
        Some("") => "/".to_string(),
        Some(path) => path.to_string(),
        None => url.to_string(),
    }
}

#[async_trait]
impl HttpClient for FakeNetwork {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let path = path_of(&request.url);
        self.requests.lock().push(path.clone());
        if self.offline.load(Ordering::SeqCst) {
            return Err(BridgeError::Network("offline".to_string()));
        }
        let gate = self.held.lock().get(&path).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self
            .routes
            .lock()
            .get(&path)
            .cloned()
            .unwrap_or_else(|| HttpResponse::new(404, "not found")))
    }
}

/// Window list that records claims, focuses and opens.
struct FakeWindows {
    storage: Arc<CacheStorage>,
    generations_at_claim: Mutex<Option<Vec<String>>>,
    windows: Mutex<Vec<ClientWindow>>,
    focused: Mutex<Vec<String>>,
    opened: Mutex<Vec<String>>,
}

impl FakeWindows {
    fn new(storage: Arc<CacheStorage>) -> Self {
        Self {
            storage,
            generations_at_claim: Mutex::new(None),
            windows: Mutex::new(Vec::new()),
            focused: Mutex::new(Vec::new()),
            opened: Mutex::new(Vec::new()),
        }
    }

    fn add_window(&self, id: &str, url: &str) {
        self.windows.lock().push(ClientWindow {
            id: id.to_string(),
            url: url.to_string(),
            focused: false,
        });
    }
}

#[async_trait]
impl ClientWindows for FakeWindows {
    async fn claim(&self) -> BridgeResult<()> {
        let generations = self.storage.keys().await;
        *self.generations_at_claim.lock() = Some(generations);
        Ok(())
    }

    async fn match_all_windows(&self) -> BridgeResult<Vec<ClientWindow>> {
        Ok(self.windows.lock().clone())
    }

    async fn focus(&self, id: &str) -> BridgeResult<()> {
        self.focused.lock().push(id.to_string());
        Ok(())
    }

    async fn open_window(&self, url: &str) -> BridgeResult<ClientWindow> {
        self.opened.lock().push(url.to_string());
        Ok(ClientWindow {
            id: "window-new".to_string(),
            url: format!("{}{}", ORIGIN, url),
            focused: true,
        })
    }
}

struct Fixture {
    network: Arc<FakeNetwork>,
    storage: Arc<CacheStorage>,
    windows: Arc<FakeWindows>,
    events: EventBus,
}

impl Fixture {
    fn new() -> Self {
        Self::with_quota(Some(1024 * 1024))
    }

    fn with_quota(max_bytes: Option<u64>) -> Self {
        let storage = Arc::new(CacheStorage::new(max_bytes));
        Self {
            network: FakeNetwork::site(),
            windows: Arc::new(FakeWindows::new(storage.clone())),
            storage,
            events: EventBus::new(64),
        }
    }

    fn manager(&self, config: CacheConfig, presenter: Arc<dyn NotificationPresenter>) -> CacheManager {
        CacheManager::new(config, self.network.clone(), presenter, self.windows.clone())
            .unwrap()
            .with_storage(self.storage.clone())
            .with_event_bus(self.events.clone())
    }

    async fn started(&self, config: CacheConfig) -> CacheManager {
        let manager = self.manager(config, quiet_presenter());
        manager.start().await;
        manager
    }
}

fn config() -> CacheConfig {
    CacheConfig::new(Url::parse(ORIGIN).unwrap())
}

fn key(path: &str) -> String {
    format!("{}{}", ORIGIN, path)
}

fn quiet_presenter() -> Arc<MockPresenter> {
    let mut presenter = MockPresenter::new();
    presenter.expect_show().returning(|_| Ok(()));
    presenter.expect_close().returning(|_| Ok(()));
    Arc::new(presenter)
}

fn cache_events(receiver: &mut Receiver<CoreEvent>) -> Vec<CacheEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        if let CoreEvent::Cache(event) = event {
            events.push(event);
        }
    }
    events
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_activation_leaves_only_current_generation() {
    let fx = Fixture::new();
    fx.storage
        .put(
            "radio-app-v0",
            &key("/app.js"),
            CachedResponse::from(&HttpResponse::new(200, "old app")),
        )
        .await
        .unwrap();
    fx.storage.open("scratch").await;
    let mut events = fx.events.subscribe();

    let manager = fx.started(config()).await;

    assert_eq!(manager.state(), LifecycleState::Activated);
    assert_eq!(fx.storage.keys().await, vec!["radio-app-v1".to_string()]);
    assert_eq!(fx.storage.entry_count("radio-app-v1").await, 8);
    assert_eq!(
        *fx.windows.generations_at_claim.lock(),
        Some(vec!["radio-app-v1".to_string()])
    );
    assert_eq!(
        cache_events(&mut events),
        vec![
            CacheEvent::Installed {
                version: "radio-app-v1".to_string(),
                entries: 8
            },
            CacheEvent::Activated {
                version: "radio-app-v1".to_string(),
                removed: vec!["radio-app-v0".to_string(), "scratch".to_string()]
            },
        ]
    );
}

#[tokio::test]
async fn test_failed_first_install_still_activates_and_caches_at_runtime() {
    let fx = Fixture::new();
    fx.network.remove("/manifest.json");
    let mut events = fx.events.subscribe();

    let manager = fx.started(config()).await;

    assert_eq!(manager.state(), LifecycleState::Activated);
    assert_eq!(fx.storage.entry_count("radio-app-v1").await, 0);
    assert!(matches!(
        cache_events(&mut events).as_slice(),
        [
            CacheEvent::InstallFailed { .. },
            CacheEvent::Activated { removed, .. },
        ] if removed.is_empty()
    ));

    let response = manager.fetch(HttpRequest::get("/styles.css")).await.unwrap();
    manager.flush_pending_writes().await;
    assert_eq!(response.body, "asset /styles.css");
    assert_eq!(fx.network.request_count("/styles.css"), 2);
    assert_eq!(fx.storage.entry_count("radio-app-v1").await, 1);

    fx.network.set_offline(true);
    let offline = manager.fetch(HttpRequest::get("/styles.css")).await.unwrap();
    assert_eq!(offline.body, "asset /styles.css");
}

#[tokio::test]
async fn test_failed_upgrade_install_waits_for_skip_waiting() {
    let fx = Fixture::new();
    fx.storage
        .put(
            "radio-app-v0",
            &key("/app.js"),
            CachedResponse::from(&HttpResponse::new(200, "old app")),
        )
        .await
        .unwrap();
    fx.network.remove("/manifest.json");

    let manager = fx.started(config()).await;

    assert_eq!(manager.state(), LifecycleState::Installed);
    let response = manager.fetch(HttpRequest::get("/styles.css")).await.unwrap();
    manager.flush_pending_writes().await;
    assert_eq!(response.body, "asset /styles.css");
    assert_eq!(fx.storage.entry_count("radio-app-v1").await, 0);

    // A page asking the waiting worker to take over activates it.
    let reply = manager.handle_message(&json!({ "type": "SKIP_WAITING" })).await;
    assert!(reply.is_none());
    assert_eq!(manager.state(), LifecycleState::Activated);
    assert_eq!(fx.storage.keys().await, vec!["radio-app-v1".to_string()]);
}

#[tokio::test]
async fn test_install_twice_is_rejected() {
    let fx = Fixture::new();
    let manager = fx.started(config()).await;

    assert!(matches!(
        manager.install().await,
        Err(CacheError::InvalidState { .. })
    ));
    assert!(manager.activate().await.unwrap().is_empty());
}

// ============================================================================
// Fetch strategies
// ============================================================================

#[tokio::test]
async fn test_static_miss_cached_only_for_same_origin_ok() {
    let fx = Fixture::new();
    let manager = fx.started(config().with_manifest(["/"])).await;
    fx.network.route(
        "https://cdn.example.net/episodes.json",
        HttpResponse::new(200, "mirror"),
    );

    let feed = manager.fetch(HttpRequest::get("/episodes.json")).await.unwrap();
    let missing = manager.fetch(HttpRequest::get("/missing.json")).await.unwrap();
    let mirror = manager
        .fetch(HttpRequest::get("https://cdn.example.net/episodes.json"))
        .await
        .unwrap();
    manager.flush_pending_writes().await;

    assert_eq!(feed.status, 200);
    assert_eq!(missing.status, 404);
    assert_eq!(mirror.body, "mirror");
    assert!(fx
        .storage
        .match_in("radio-app-v1", &key("/episodes.json"))
        .await
        .is_some());
    assert!(fx.storage.match_any(&key("/missing.json")).await.is_none());
    assert!(fx
        .storage
        .match_any("https://cdn.example.net/episodes.json")
        .await
        .is_none());

    // Second request is a cache hit.
    let again = manager.fetch(HttpRequest::get("/episodes.json")).await.unwrap();
    assert_eq!(again.body, feed.body);
    assert_eq!(fx.network.request_count("/episodes.json"), 1);
}

#[tokio::test]
async fn test_audio_is_network_first_with_cached_fallback() {
    let fx = Fixture::new();
    let manager = fx.started(config()).await;
    fx.network.route("/ep1.mp3", HttpResponse::new(200, "fresh audio"));
    fx.storage
        .put(
            "archive",
            &key("/ep1.mp3"),
            CachedResponse::from(&HttpResponse::new(200, "cached audio")),
        )
        .await
        .unwrap();

    let online = manager.fetch(HttpRequest::get("/ep1.mp3")).await.unwrap();
    manager.flush_pending_writes().await;
    assert_eq!(online.body, "fresh audio");
    assert!(fx.storage.match_in("radio-app-v1", &key("/ep1.mp3")).await.is_none());

    fx.network.set_offline(true);
    let offline = manager.fetch(HttpRequest::get("/ep1.mp3")).await.unwrap();
    assert_eq!(offline.body, "cached audio");

    let missing = manager.fetch(HttpRequest::get("/ep2.MP3?t=30")).await;
    assert!(matches!(missing, Err(BridgeError::Network(_))));
}

#[tokio::test]
async fn test_offline_navigation_serves_app_shell() {
    let fx = Fixture::new();
    let manager = fx.started(config()).await;
    fx.network.set_offline(true);

    let page = manager
        .fetch(HttpRequest::get("/episodes/42").destination(RequestDestination::Document))
        .await
        .unwrap();
    assert_eq!(page.body, "asset /index.html");

    let asset = manager.fetch(HttpRequest::get("/theme.css")).await;
    assert!(asset.is_err());
}

#[tokio::test]
async fn test_write_over_quota_is_dropped() {
    let fx = Fixture::with_quota(Some(32));
    let mut events = fx.events.subscribe();
    let manager = fx.started(config().with_manifest(["/"])).await;
    fx.network.route("/big.json", HttpResponse::new(200, vec![b'x'; 100]));

    let response = manager.fetch(HttpRequest::get("/big.json")).await.unwrap();
    manager.flush_pending_writes().await;

    assert_eq!(response.body.len(), 100);
    assert!(fx.storage.match_any(&key("/big.json")).await.is_none());
    assert!(cache_events(&mut events)
        .iter()
        .any(|event| matches!(event, CacheEvent::WriteFailed { url, .. } if url == &key("/big.json"))));
}

// ============================================================================
// Push, clicks and sync
// ============================================================================

#[tokio::test]
async fn test_push_payload_overrides_template() {
    let fx = Fixture::new();
    let mut presenter = MockPresenter::new();
    presenter
        .expect_show()
        .withf(|options| options.title == "New Ep" && options.body == "A new episode is out!")
        .times(1)
        .returning(|_| Ok(()));
    let manager = fx.manager(config(), Arc::new(presenter));

    let shown = manager.handle_push(Some(br#"{"title":"New Ep"}"#.as_slice())).await;

    assert_eq!(shown.title, "New Ep");
    assert_eq!(shown.tag, "new-episode");
    assert!(shown.require_interaction);
}

#[tokio::test]
async fn test_malformed_push_shows_template() {
    let fx = Fixture::new();
    let mut events = fx.events.subscribe();
    let mut presenter = MockPresenter::new();
    presenter
        .expect_show()
        .withf(|options| options.title == "Radio App")
        .times(1)
        .returning(|_| Ok(()));
    let manager = fx.manager(config(), Arc::new(presenter));

    manager.handle_push(Some(b"{not json".as_slice())).await;

    assert_eq!(
        cache_events(&mut events),
        vec![CacheEvent::NotificationShown {
            title: "Radio App".to_string()
        }]
    );
}

#[tokio::test]
async fn test_dismiss_only_closes() {
    let fx = Fixture::new();
    fx.windows.add_window("w1", &key("/"));
    let mut presenter = MockPresenter::new();
    presenter
        .expect_close()
        .withf(|tag| tag == "new-episode")
        .times(1)
        .returning(|_| Ok(()));
    let manager = fx.manager(config(), Arc::new(presenter));

    let outcome = manager
        .handle_notification_click(NotificationClick::action("new-episode", "dismiss"))
        .await;

    assert_eq!(outcome, ClickOutcome::Dismissed);
    assert!(fx.windows.focused.lock().is_empty());
    assert!(fx.windows.opened.lock().is_empty());
}

#[tokio::test]
async fn test_click_focuses_app_window_or_opens_root() {
    let fx = Fixture::new();
    let manager = fx.manager(config(), quiet_presenter());
    fx.windows.add_window("other", "https://elsewhere.example/");

    let opened = manager
        .handle_notification_click(NotificationClick::body("new-episode"))
        .await;
    assert_eq!(opened, ClickOutcome::Opened("window-new".to_string()));
    assert_eq!(*fx.windows.opened.lock(), vec!["/".to_string()]);

    fx.windows.add_window("app", &key("/#episodes"));
    let focused = manager
        .handle_notification_click(NotificationClick::action("new-episode", "open"))
        .await;
    assert_eq!(focused, ClickOutcome::Focused("app".to_string()));
    assert_eq!(*fx.windows.focused.lock(), vec!["app".to_string()]);
}

#[tokio::test]
async fn test_background_sync_tag() {
    let fx = Fixture::new();
    let mut events = fx.events.subscribe();
    let manager = fx.manager(config(), quiet_presenter());

    assert!(manager.handle_sync("background-sync").await);
    assert!(!manager.handle_sync("periodic-refresh").await);
    assert_eq!(
        cache_events(&mut events),
        vec![CacheEvent::SyncCompleted {
            tag: "background-sync".to_string()
        }]
    );
}

// ============================================================================
// Worker task
// ============================================================================

#[tokio::test]
async fn test_worker_answers_messages_and_intercepts_fetches() {
    let fx = Fixture::new();
    let (worker, task) = CacheWorker::spawn(fx.manager(config(), quiet_presenter()));

    assert_eq!(worker.get_version().await.unwrap(), "radio-app-v1");
    assert_eq!(worker.state().await.unwrap(), LifecycleState::Activated);

    worker.post_message(json!({ "type": "NOPE" })).await.unwrap();
    worker.post_message(json!("garbage")).await.unwrap();
    assert_eq!(worker.send_message(json!({ "foo": 1 })).await.unwrap(), None);

    let client: Arc<dyn HttpClient> = Arc::new(worker.clone());
    let styles = client.execute(HttpRequest::get("/styles.css")).await.unwrap();
    assert_eq!(styles.body, "asset /styles.css");
    assert_eq!(fx.network.request_count("/styles.css"), 1);

    assert!(worker.sync("background-sync").await.unwrap());
    let shown = worker.push(None).await.unwrap();
    assert_eq!(shown.title, "Radio App");

    worker.shutdown();
    task.await.unwrap();
    assert!(matches!(
        worker.get_version().await,
        Err(CacheError::WorkerClosed)
    ));
    assert!(client.execute(HttpRequest::get("/app.js")).await.is_err());
}

#[tokio::test]
async fn test_slow_audio_fetch_does_not_hold_up_other_requests() {
    let fx = Fixture::new();
    fx.network.route("/ep1.mp3", HttpResponse::new(200, "audio"));
    let gate = fx.network.hold("/ep1.mp3");
    let (worker, task) = CacheWorker::spawn(fx.manager(config(), quiet_presenter()));

    let loader = worker.clone();
    let audio = tokio::spawn(async move { loader.execute(HttpRequest::get("/ep1.mp3")).await });
    timeout(Duration::from_secs(2), async {
        while fx.network.request_count("/ep1.mp3") == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    let version = timeout(Duration::from_secs(2), worker.get_version()).await;
    assert_eq!(version.unwrap().unwrap(), "radio-app-v1");
    let styles = timeout(
        Duration::from_secs(2),
        worker.execute(HttpRequest::get("/styles.css")),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(styles.body, "asset /styles.css");
    assert!(!audio.is_finished());

    gate.notify_one();
    let audio = audio.await.unwrap().unwrap();
    assert_eq!(audio.body, "audio");

    worker.shutdown();
    task.await.unwrap();
}
