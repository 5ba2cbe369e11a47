//! # Offline Resource Cache
//!
//! The worker side of the player: a cache of named generations that keeps
//! the app shell and played episodes available without a network.
//!
//! ## Overview
//!
//! - [`CacheStorage`](storage::CacheStorage) - Generations of cached responses with a byte quota
//! - [`RequestClassifier`](classify::RequestClassifier) - Audio vs static asset, same-origin checks
//! - [`CacheManager`](manager::CacheManager) - Install, activate, messages, push, clicks, sync
//! - [`strategy`] - Network-first audio and cache-first static assets
//! - [`CacheWorker`](worker::CacheWorker) - The manager on its own task, reached through a
//!   [`WorkerHandle`](worker::WorkerHandle)
//!
//! ## Usage
//!
//! ```ignore
//! let manager = CacheManager::new(config, http, presenter, windows)?;
//! let (worker, _task) = CacheWorker::spawn(manager);
//!
//! // Page-side fetches go through the worker.
//! let feed = worker.execute(HttpRequest::get("/episodes.json")).await?;
//! ```

pub mod classify;
pub mod config;
pub mod error;
pub mod manager;
pub mod notification;
pub mod storage;
pub mod strategy;
pub mod worker;

pub use classify::{RequestClass, RequestClassifier};
pub use config::{CacheConfig, BACKGROUND_SYNC_TAG, DEFAULT_CACHE_VERSION, DEFAULT_MANIFEST};
pub use error::{CacheError, Result};
pub use manager::{CacheManager, ClientMessage, LifecycleState, VersionReply};
pub use notification::{
    default_template, merge_push_payload, ClickOutcome, NotificationClick, DISMISS_ACTION,
};
pub use storage::{CacheStorage, CachedResponse};
pub use worker::{CacheWorker, WorkerHandle, WorkerRequest};
