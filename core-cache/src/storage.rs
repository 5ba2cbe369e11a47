//! # Cache Storage
//!
//! Named cache generations holding responses keyed by absolute URL.
//!
//! Generations are shared between the worker loop and its background
//! writers, so they live behind an async `RwLock`. A byte quota spans all
//! generations; a write that would exceed it is refused and leaves the
//! existing entries untouched.

use crate::error::{CacheError, Result};
use bridge_traits::HttpResponse;
use bytes::Bytes;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

/// A stored response.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Bytes,
}

impl CachedResponse {
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }

    pub fn to_response(&self) -> HttpResponse {
        HttpResponse {
            status: self.status,
            headers: self.headers.clone(),
            body: self.body.clone(),
        }
    }
}

impl From<&HttpResponse> for CachedResponse {
    fn from(response: &HttpResponse) -> Self {
        Self {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct Generation {
    entries: HashMap<String, CachedResponse>,
    bytes: u64,
}

#[derive(Debug, Default)]
pub struct CacheStorage {
    generations: RwLock<BTreeMap<String, Generation>>,
    max_bytes: Option<u64>,
}

impl CacheStorage {
    pub fn new(max_bytes: Option<u64>) -> Self {
        Self {
            generations: RwLock::new(BTreeMap::new()),
            max_bytes,
        }
    }

    /// Create the generation if missing. Returns `true` when it was created.
    pub async fn open(&self, name: &str) -> bool {
        let mut generations = self.generations.write().await;
        if generations.contains_key(name) {
            return false;
        }
        generations.insert(name.to_string(), Generation::default());
        true
    }

    pub async fn has(&self, name: &str) -> bool {
        self.generations.read().await.contains_key(name)
    }

    /// Generation names in sorted order.
    pub async fn keys(&self) -> Vec<String> {
        self.generations.read().await.keys().cloned().collect()
    }

    pub async fn delete(&self, name: &str) -> bool {
        self.generations.write().await.remove(name).is_some()
    }

    /// Store one response, creating the generation if needed and replacing
    /// any previous entry under `key`.
    pub async fn put(&self, name: &str, key: &str, response: CachedResponse) -> Result<()> {
        let mut generations = self.generations.write().await;
        let replaced = generations
            .get(name)
            .and_then(|generation| generation.entries.get(key))
            .map(CachedResponse::size)
            .unwrap_or(0);
        self.check_quota(&generations, replaced, response.size())?;

        let generation = generations.entry(name.to_string()).or_default();
        generation.bytes = generation.bytes - replaced + response.size();
        generation.entries.insert(key.to_string(), response);
        debug!(generation = name, key, "Stored cache entry");
        Ok(())
    }

    /// Store a batch of responses. Either every entry is stored or none is.
    pub async fn put_all(&self, name: &str, entries: Vec<(String, CachedResponse)>) -> Result<()> {
        let mut generations = self.generations.write().await;
        let existing = generations.get(name);

        let mut replaced = 0;
        let mut added = 0;
        for (key, response) in &entries {
            replaced += existing
                .and_then(|generation| generation.entries.get(key))
                .map(CachedResponse::size)
                .unwrap_or(0);
            added += response.size();
        }
        self.check_quota(&generations, replaced, added)?;

        let generation = generations.entry(name.to_string()).or_default();
        for (key, response) in entries {
            let size = response.size();
            if let Some(previous) = generation.entries.insert(key, response) {
                generation.bytes -= previous.size();
            }
            generation.bytes += size;
        }
        Ok(())
    }

    /// Look up `key` in one generation.
    pub async fn match_in(&self, name: &str, key: &str) -> Option<CachedResponse> {
        self.generations
            .read()
            .await
            .get(name)
            .and_then(|generation| generation.entries.get(key))
            .cloned()
    }

    /// Look up `key` across every generation.
    pub async fn match_any(&self, key: &str) -> Option<CachedResponse> {
        self.generations
            .read()
            .await
            .values()
            .find_map(|generation| generation.entries.get(key))
            .cloned()
    }

    pub async fn entry_count(&self, name: &str) -> usize {
        self.generations
            .read()
            .await
            .get(name)
            .map(|generation| generation.entries.len())
            .unwrap_or(0)
    }

    pub async fn total_bytes(&self) -> u64 {
        self.generations
            .read()
            .await
            .values()
            .map(|generation| generation.bytes)
            .sum()
    }

    fn check_quota(
        &self,
        generations: &BTreeMap<String, Generation>,
        replaced: u64,
        added: u64,
    ) -> Result<()> {
        let Some(max) = self.max_bytes else {
            return Ok(());
        };
        let used: u64 = generations.values().map(|generation| generation.bytes).sum();
        let available = max.saturating_sub(used - replaced);
        if added > available {
            return Err(CacheError::QuotaExceeded {
                needed: added,
                available,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(body: &'static str) -> CachedResponse {
        CachedResponse::from(&HttpResponse::new(200, body))
    }

    #[tokio::test]
    async fn test_put_and_match() {
        let storage = CacheStorage::new(None);
        storage.put("v1", "https://a/x", entry("hello")).await.unwrap();

        assert!(storage.has("v1").await);
        assert_eq!(storage.match_in("v1", "https://a/x").await.unwrap().body, "hello");
        assert!(storage.match_in("v2", "https://a/x").await.is_none());
        assert_eq!(storage.total_bytes().await, 5);
    }

    #[tokio::test]
    async fn test_match_any_searches_all_generations() {
        let storage = CacheStorage::new(None);
        storage.put("old", "https://a/ep.mp3", entry("audio")).await.unwrap();
        storage.open("new").await;

        assert!(storage.match_any("https://a/ep.mp3").await.is_some());
    }

    #[tokio::test]
    async fn test_replacing_entry_updates_size() {
        let storage = CacheStorage::new(Some(10));
        storage.put("v1", "k", entry("12345678")).await.unwrap();
        storage.put("v1", "k", entry("1234567890")).await.unwrap();

        assert_eq!(storage.total_bytes().await, 10);
        assert_eq!(storage.entry_count("v1").await, 1);
    }

    #[tokio::test]
    async fn test_quota_refuses_write() {
        let storage = CacheStorage::new(Some(8));
        storage.put("v1", "a", entry("12345")).await.unwrap();

        let result = storage.put("v1", "b", entry("12345")).await;
        assert!(matches!(
            result,
            Err(CacheError::QuotaExceeded {
                needed: 5,
                available: 3
            })
        ));
        assert!(storage.match_in("v1", "b").await.is_none());
    }

    #[tokio::test]
    async fn test_put_all_is_atomic() {
        let storage = CacheStorage::new(Some(6));
        let batch = vec![
            ("a".to_string(), entry("1234")),
            ("b".to_string(), entry("1234")),
        ];

        assert!(storage.put_all("v1", batch).await.is_err());
        assert_eq!(storage.entry_count("v1").await, 0);
        assert!(!storage.has("v1").await);
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = CacheStorage::new(None);
        storage.open("v0").await;
        assert!(!storage.open("v0").await);
        assert!(storage.delete("v0").await);
        assert!(!storage.delete("v0").await);
        assert!(storage.keys().await.is_empty());
    }
}
