//! Fetch strategies.
//!
//! Audio streams go network first and fall back to any cached copy. All
//! other requests are served cache first; misses are fetched and, when the
//! response is a same-origin `200`, written to the current generation in
//! the background.

use crate::classify::RequestClass;
use crate::manager::CacheManager;
use crate::storage::CachedResponse;
use bridge_traits::error::Result as BridgeResult;
use bridge_traits::{HttpMethod, HttpRequest, HttpResponse};
use core_runtime::events::{CacheEvent, CoreEvent};
use tracing::{debug, info, instrument, warn};

/// Whether a network response may be written to the cache.
pub fn is_cacheable(method: HttpMethod, response: &HttpResponse, same_origin: bool) -> bool {
    method == HttpMethod::Get && response.status == 200 && same_origin
}

impl CacheManager {
    /// Serve `request` the way an intercepted page fetch is served.
    #[instrument(skip(self, request), fields(url = %request.url))]
    pub async fn fetch(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        if !self.is_active() {
            debug!(state = %self.state(), "Not active, passing through");
            return self.http.execute(request).await;
        }

        match self.classifier.classify(&request.url) {
            RequestClass::AudioStream => self.network_first(request).await,
            RequestClass::StaticAsset => self.cache_first(request).await,
        }
    }

    async fn network_first(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let key = self.classifier.cache_key(&request.url);
        match self.http.execute(request).await {
            Ok(response) => Ok(response),
            Err(error) => match self.storage.match_any(&key).await {
                Some(cached) => {
                    info!(url = %key, error = %error, "Network failed, serving cached audio");
                    self.emit(CacheEvent::ServedOffline { url: key });
                    Ok(cached.to_response())
                }
                None => {
                    warn!(url = %key, error = %error, "Network failed and no cached audio");
                    Err(error)
                }
            },
        }
    }

    async fn cache_first(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        let key = self.classifier.cache_key(&request.url);
        if request.method == HttpMethod::Get {
            if let Some(cached) = self.storage.match_any(&key).await {
                debug!(url = %key, "Cache hit");
                self.emit(CacheEvent::ServedFromCache { url: key });
                return Ok(cached.to_response());
            }
        }

        let method = request.method;
        let navigation = request.is_navigation();
        let same_origin = self.classifier.is_same_origin(&request.url);

        match self.http.execute(request).await {
            Ok(response) => {
                if is_cacheable(method, &response, same_origin) {
                    self.store_in_background(key, CachedResponse::from(&response));
                }
                Ok(response)
            }
            Err(error) if navigation => {
                let shell = self.classifier.cache_key(&self.config.offline_shell);
                match self.storage.match_any(&shell).await {
                    Some(cached) => {
                        info!(url = %key, error = %error, "Offline, serving app shell");
                        self.emit(CacheEvent::ServedOffline { url: key });
                        Ok(cached.to_response())
                    }
                    None => Err(error),
                }
            }
            Err(error) => Err(error),
        }
    }

    fn store_in_background(&self, key: String, response: CachedResponse) {
        let storage = self.storage();
        let generation = self.config.version.clone();
        let events = self.events.clone();

        self.writes.spawn(async move {
            if let Err(e) = storage.put(&generation, &key, response).await {
                warn!(url = %key, error = %e, "Background cache write failed");
                if let Some(bus) = events {
                    let _ = bus.emit(CoreEvent::Cache(CacheEvent::WriteFailed {
                        url: key,
                        message: e.to_string(),
                    }));
                }
            }
        });
    }
}
