//! Key-value store for transient checkout state

use crate::error::{PaymentError, PaymentResult};
use async_trait::async_trait;
use dashmap::DashMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::Instant;

/// Store for cached payloads and channel routes.
#[async_trait]
pub trait PayloadStore: Send + Sync {
    /// Get a JSON value.
    ///
    /// Returns `Ok(None)` for missing or expired keys.
    async fn get_json(&self, key: &str) -> PaymentResult<Option<String>>;

    /// Set a JSON value with an optional time-to-live.
    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> PaymentResult<()>;

    /// Delete a key.
    async fn delete(&self, key: &str) -> PaymentResult<()>;

    /// Check if a key exists.
    async fn exists(&self, key: &str) -> PaymentResult<bool> {
        Ok(self.get_json(key).await?.is_some())
    }
}

/// Serialize and store a value
pub async fn store_value<T: Serialize + Sync>(
    store: &dyn PayloadStore,
    key: &str,
    value: &T,
    ttl: Option<Duration>,
) -> PaymentResult<()> {
    let json = serde_json::to_string(value)?;
    store.set_json(key, json, ttl).await
}

/// Load and deserialize a value
pub async fn load_value<T: DeserializeOwned>(
    store: &dyn PayloadStore,
    key: &str,
) -> PaymentResult<Option<T>> {
    match store.get_json(key).await? {
        Some(json) => serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| PaymentError::Store(format!("Corrupt entry '{}': {}", key, e))),
        None => Ok(None),
    }
}

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// In-process store
///
/// ```rust
/// use jinah_payments::store::{MemoryStore, PayloadStore};
/// use std::time::Duration;
///
/// # tokio_test::block_on(async {
/// let store = MemoryStore::new();
/// store
///     .set_json("jinah_route_ORD-1", "\"finpay\"".to_string(), Some(Duration::from_secs(60)))
///     .await
///     .unwrap();
/// assert!(store.exists("jinah_route_ORD-1").await.unwrap());
/// # });
/// ```
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Entry>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired entries
    pub fn purge_expired(&self) {
        self.entries.retain(|_, entry| !entry.is_expired());
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        self.entries.iter().filter(|e| !e.is_expired()).count()
    }

    /// Whether no live entries remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl PayloadStore for MemoryStore {
    async fn get_json(&self, key: &str) -> PaymentResult<Option<String>> {
        let expired = match self.entries.get(key) {
            Some(entry) if !entry.is_expired() => return Ok(Some(entry.value.clone())),
            Some(_) => true,
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        Ok(None)
    }

    async fn set_json(&self, key: &str, value: String, ttl: Option<Duration>) -> PaymentResult<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: ttl.map(|ttl| Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> PaymentResult<()> {
        self.entries.remove(key);
        Ok(())
    }
}
