//! HTTP Client Implementation using Reqwest

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy},
};
use reqwest::Client;
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};
use url::Url;

/// Reqwest-based HTTP client implementation
///
/// Provides HTTP operations with:
/// - Connection pooling via reqwest
/// - Root-relative URLs resolved against an optional base (the app origin)
/// - Optional retry with exponential backoff
///
/// Any response the server sends back is `Ok`, whatever its status. Only
/// transport failures (connect, DNS, TLS, timeout) are reported as
/// [`BridgeError::Network`].
pub struct ReqwestHttpClient {
    client: Client,
    base_url: Option<Url>,
    policy: RetryPolicy,
}

impl ReqwestHttpClient {
    /// Create a new HTTP client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(30))
    }

    /// Create a new HTTP client with custom timeout
    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(10)
            .user_agent("radio-player-core/0.1.0")
            .build()
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self::with_client(client))
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_client(client: Client) -> Self {
        Self {
            client,
            base_url: None,
            policy: RetryPolicy::none(),
        }
    }

    /// Resolve relative request URLs against `base`.
    pub fn with_base_url(mut self, base: Url) -> Self {
        self.base_url = Some(base);
        self
    }

    /// Policy used by [`HttpClient::execute`]. Defaults to a single attempt.
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Convert bridge HttpMethod to reqwest Method
    fn convert_method(method: HttpMethod) -> reqwest::Method {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Delete => reqwest::Method::DELETE,
            HttpMethod::Head => reqwest::Method::HEAD,
        }
    }

    fn resolve_url(&self, raw: &str) -> Result<Url> {
        let resolved = match &self.base_url {
            Some(base) => base.join(raw),
            None => Url::parse(raw),
        };
        resolved.map_err(|e| BridgeError::OperationFailed(format!("Invalid URL '{}': {}", raw, e)))
    }

    /// Build reqwest request from bridge request
    fn build_request(&self, request: HttpRequest) -> Result<reqwest::RequestBuilder> {
        let method = Self::convert_method(request.method);
        let url = self.resolve_url(&request.url)?;
        let mut req = self.client.request(method, url);

        for (key, value) in request.headers {
            req = req.header(key, value);
        }

        if let Some(body) = request.body {
            req = req.body(body);
        }

        if let Some(timeout) = request.timeout {
            req = req.timeout(timeout);
        }

        Ok(req)
    }

    async fn into_response(response: reqwest::Response) -> Result<HttpResponse> {
        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|s| (k.to_string(), s.to_string())))
            .collect();

        let body = response
            .bytes()
            .await
            .map_err(|e| BridgeError::Network(format!("Failed to read body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    fn transport_error(e: &reqwest::Error) -> BridgeError {
        if e.is_timeout() {
            BridgeError::Network("Request timed out".to_string())
        } else if e.is_connect() {
            BridgeError::Network(format!("Connection failed: {}", e))
        } else {
            BridgeError::Network(e.to_string())
        }
    }

    /// Execute request with retry logic
    async fn execute_with_retry_internal(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(
                attempt,
                max_attempts = attempts,
                url = %request.url,
                "Executing HTTP request"
            );

            let outcome = match self.build_request(request.clone())?.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let retryable = status >= 500 || status == 429;
                    if retryable && attempt < attempts {
                        warn!(status, attempt, "HTTP request failed with retryable status");
                        None
                    } else {
                        Some(Self::into_response(response).await)
                    }
                }
                Err(e) => {
                    warn!(error = %e, attempt, "HTTP request failed");
                    let error = Self::transport_error(&e);
                    if attempt < attempts {
                        None
                    } else {
                        Some(Err(error))
                    }
                }
            };

            if let Some(result) = outcome {
                return result;
            }

            let delay = if policy.use_exponential_backoff {
                let exponential_delay = policy.base_delay * 2u32.pow(attempt - 1);
                exponential_delay.min(policy.max_delay)
            } else {
                policy.base_delay
            };

            debug!(delay_ms = delay.as_millis(), "Retrying after delay");
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl HttpClient for ReqwestHttpClient {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, self.policy.clone())
            .await
    }

    async fn execute_with_retry(
        &self,
        request: HttpRequest,
        policy: RetryPolicy,
    ) -> Result<HttpResponse> {
        self.execute_with_retry_internal(request, policy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_conversion() {
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Get),
            reqwest::Method::GET
        );
        assert_eq!(
            ReqwestHttpClient::convert_method(HttpMethod::Post),
            reqwest::Method::POST
        );
    }

    #[test]
    fn test_relative_urls_use_base() {
        let client = ReqwestHttpClient::new()
            .unwrap()
            .with_base_url(Url::parse("https://radio.example").unwrap());

        assert_eq!(
            client.resolve_url("/episodes.json").unwrap().as_str(),
            "https://radio.example/episodes.json"
        );
        assert_eq!(
            client.resolve_url("https://cdn.example.net/ep1.mp3").unwrap().as_str(),
            "https://cdn.example.net/ep1.mp3"
        );
    }

    #[test]
    fn test_relative_url_without_base_is_rejected() {
        let client = ReqwestHttpClient::new().unwrap();
        assert!(client.resolve_url("/episodes.json").is_err());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_network_error() {
        let client = ReqwestHttpClient::with_timeout(Duration::from_secs(2)).unwrap();
        let result = client.execute(HttpRequest::get("http://127.0.0.1:9/")).await;

        assert!(matches!(result, Err(BridgeError::Network(_))));
    }
}
