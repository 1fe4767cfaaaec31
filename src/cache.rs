//! Response caching — serialized endpoint payloads with a fixed TTL.
//!
//! Entries expire one hour after insertion and are otherwise never
//! evicted: there is no LRU and no size bound, so memory is bounded only
//! by traffic diversity over the TTL window. Expired entries are dropped
//! on lookup and by a periodic sweep.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Default time-to-live applied at insertion.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct CacheEntry {
    value: Value,
    cached_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.cached_at.elapsed() > self.ttl
    }
}

/// In-memory key → JSON response store.
pub struct ResponseCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    default_ttl: Duration,
}

impl ResponseCache {
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
        }
    }

    /// Get the stored value for the key if it exists and is fresh.
    pub async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Store a value under the key with the default TTL.
    pub async fn set(&self, key: &str, value: Value) {
        let mut entries = self.entries.write().await;
        entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
                ttl: self.default_ttl,
            },
        );
    }

    /// Drop all expired entries, returning how many were removed.
    pub async fn cleanup_expired(&self) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        before - entries.len()
    }

    /// Number of stored entries (including expired ones not yet swept).
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

/// Cache key for a catalog request: composite of the normalized params.
pub fn catalog_key(page: u32, search: &str, kind: &str) -> String {
    format!("catalog:{page}:{search}:{kind}")
}

/// Cache key for a detail request. Base64 turns an arbitrary URL into a
/// safe key alphabet; there is no security property here.
pub fn detail_key(url: &str) -> String {
    format!("detail:{}", STANDARD.encode(url))
}

/// Cache key for a player-page extraction request.
pub fn player_key(url: &str) -> String {
    format!("player:{}", STANDARD.encode(url))
}
