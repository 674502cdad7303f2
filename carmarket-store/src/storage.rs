//! Storage backends for persistent holders.
//!
//! A backend is a flat string key-value store. Holders serialize their whole
//! collection into one JSON document per key, wrapped in a `{state, version}`
//! envelope, and rewrite it on every committed mutation.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use carmarket_shared::clients::redis::RedisClient;
use carmarket_shared::AppResult;

pub const FAVORITES_KEY: &str = "favorite-storage";
pub const REPORTS_KEY: &str = "report-storage";
pub const RATINGS_KEY: &str = "rating-store";

const STATE_VERSION: u32 = 0;

#[async_trait]
pub trait StateStorage: Send + Sync {
    async fn load(&self, key: &str) -> AppResult<Option<String>>;
    async fn save(&self, key: &str, value: String) -> AppResult<()>;

    /// Short backend name for logs and health checks.
    fn name(&self) -> &'static str;

    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct Envelope<T> {
    state: T,
    version: u32,
}

/// Read and decode the state stored under `key`. A missing key is `Ok(None)`.
pub async fn load_state<T: DeserializeOwned>(
    storage: &dyn StateStorage,
    key: &str,
) -> AppResult<Option<T>> {
    let Some(raw) = storage.load(key).await? else {
        return Ok(None);
    };
    let envelope: Envelope<T> = serde_json::from_str(&raw)?;
    if envelope.version != STATE_VERSION {
        tracing::warn!(key, version = envelope.version, "stored state has unexpected version");
    }
    Ok(Some(envelope.state))
}

pub async fn save_state<T: Serialize>(
    storage: &dyn StateStorage,
    key: &str,
    state: &T,
) -> AppResult<()> {
    let raw = serde_json::to_string(&Envelope {
        state,
        version: STATE_VERSION,
    })?;
    storage.save(key, raw).await
}

// ─── In-memory backend ──────────────────────────────────────────────────────

/// Process-local backend. Clones share the same map.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStorage for MemoryStorage {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        let map = self.inner.read().await;
        Ok(map.get(key).cloned())
    }

    async fn save(&self, key: &str, value: String) -> AppResult<()> {
        let mut map = self.inner.write().await;
        map.insert(key.to_string(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

// ─── Redis backend ──────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct RedisStorage {
    client: RedisClient,
}

impl RedisStorage {
    pub fn new(client: RedisClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StateStorage for RedisStorage {
    async fn load(&self, key: &str) -> AppResult<Option<String>> {
        Ok(self.client.get(key).await?)
    }

    async fn save(&self, key: &str, value: String) -> AppResult<()> {
        Ok(self.client.set(key, &value).await?)
    }

    fn name(&self) -> &'static str {
        "redis"
    }

    async fn ping(&self) -> AppResult<()> {
        Ok(self.client.ping().await?)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Memory backend whose writes can be switched to fail.
    #[derive(Clone, Default)]
    pub struct FlakyStorage {
        pub inner: MemoryStorage,
        failing: Arc<AtomicBool>,
    }

    impl FlakyStorage {
        pub fn fail_writes(&self, fail: bool) {
            self.failing.store(fail, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl StateStorage for FlakyStorage {
        async fn load(&self, key: &str) -> AppResult<Option<String>> {
            self.inner.load(key).await
        }

        async fn save(&self, key: &str, value: String) -> AppResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(carmarket_shared::AppError::new(
                    carmarket_shared::ErrorCode::ServiceUnavailable,
                    "backend offline",
                ));
            }
            self.inner.save(key, value).await
        }

        fn name(&self) -> &'static str {
            "flaky"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn state_round_trips_through_envelope() {
        let storage = MemoryStorage::new();
        save_state(&storage, "k", &vec![1u32, 2, 3]).await.unwrap();

        let raw = storage.load("k").await.unwrap().unwrap();
        assert!(raw.contains("\"version\":0"));

        let back: Option<Vec<u32>> = load_state(&storage, "k").await.unwrap();
        assert_eq!(back, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn missing_key_loads_as_none() {
        let storage = MemoryStorage::new();
        let back: Option<Vec<u32>> = load_state(&storage, "absent").await.unwrap();
        assert!(back.is_none());
    }

    #[tokio::test]
    async fn corrupt_state_is_an_error() {
        let storage = MemoryStorage::new();
        storage.save("k", "not json".into()).await.unwrap();
        let result: AppResult<Option<Vec<u32>>> = load_state(&storage, "k").await;
        assert!(result.is_err());
    }
}
