//! # Cache Configuration
//!
//! Version tag, pre-cache manifest and fetch classification for the offline
//! worker, plus the notification template used for push messages.

use crate::error::{CacheError, Result};
use crate::notification::default_template;
use bridge_traits::NotificationOptions;
use url::Url;

/// Name of the cache generation owned by this build.
pub const DEFAULT_CACHE_VERSION: &str = "radio-app-v1";

/// Same-origin assets stored at install time.
pub const DEFAULT_MANIFEST: [&str; 8] = [
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/episodes.json",
    "/manifest.json",
    "/icons/icon-192x192.png",
    "/icons/icon-512x512.png",
];

/// Path extensions fetched network-first.
pub const DEFAULT_AUDIO_EXTENSIONS: [&str; 3] = ["mp3", "wav", "m4a"];

/// Document served to navigations when the network is gone.
pub const DEFAULT_OFFLINE_SHELL: &str = "/index.html";

/// Byte quota across all generations.
pub const DEFAULT_MAX_CACHE_BYTES: u64 = 50 * 1024 * 1024;

/// Sync tag that triggers the offline data sync.
pub const BACKGROUND_SYNC_TAG: &str = "background-sync";

/// Default capacity of the worker request queue.
pub const DEFAULT_REQUEST_BUFFER: usize = 64;

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub version: String,
    pub origin: Url,
    pub manifest: Vec<String>,
    pub audio_extensions: Vec<String>,
    pub offline_shell: String,
    /// `None` disables the quota
    pub max_cache_bytes: Option<u64>,
    pub notification: NotificationOptions,
    pub request_buffer: usize,
}

impl CacheConfig {
    pub fn new(origin: Url) -> Self {
        Self {
            version: DEFAULT_CACHE_VERSION.to_string(),
            origin,
            manifest: DEFAULT_MANIFEST.iter().map(|path| path.to_string()).collect(),
            audio_extensions: DEFAULT_AUDIO_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            offline_shell: DEFAULT_OFFLINE_SHELL.to_string(),
            max_cache_bytes: Some(DEFAULT_MAX_CACHE_BYTES),
            notification: default_template(),
            request_buffer: DEFAULT_REQUEST_BUFFER,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_manifest<I, S>(mut self, manifest: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.manifest = manifest.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_audio_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.audio_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_offline_shell(mut self, path: impl Into<String>) -> Self {
        self.offline_shell = path.into();
        self
    }

    pub fn with_max_cache_bytes(mut self, max: Option<u64>) -> Self {
        self.max_cache_bytes = max;
        self
    }

    pub fn with_notification_template(mut self, template: NotificationOptions) -> Self {
        self.notification = template;
        self
    }

    pub fn with_request_buffer(mut self, size: usize) -> Self {
        self.request_buffer = size;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.version.trim().is_empty() {
            return Err(CacheError::Config("version cannot be empty".to_string()));
        }

        if !matches!(self.origin.scheme(), "http" | "https") {
            return Err(CacheError::Config(format!(
                "origin must be http(s), got '{}'",
                self.origin
            )));
        }

        if let Some(path) = self.manifest.iter().find(|path| !path.starts_with('/')) {
            return Err(CacheError::Config(format!(
                "manifest entries must be root-relative, got '{}'",
                path
            )));
        }

        if self.audio_extensions.iter().any(|ext| ext.is_empty() || ext.starts_with('.')) {
            return Err(CacheError::Config(
                "audio extensions must be given without a leading dot".to_string(),
            ));
        }

        if self.max_cache_bytes == Some(0) {
            return Err(CacheError::Config(
                "max_cache_bytes must be > 0 (use None to disable)".to_string(),
            ));
        }

        if self.request_buffer == 0 {
            return Err(CacheError::Config("request_buffer must be > 0".to_string()));
        }

        Ok(())
    }
}
