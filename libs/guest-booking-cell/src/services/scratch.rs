use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use deadpool_redis::{Config, Pool, Runtime};
use redis::AsyncCommands;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::ScratchStoreError;

/// Short-lived key/value area scoped by guest session.
#[async_trait]
pub trait ScratchStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, ScratchStoreError>;

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), ScratchStoreError>;

    /// Writes only when the key is absent. Returns whether the write happened.
    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool, ScratchStoreError>;

    async fn remove(&self, key: &str) -> Result<(), ScratchStoreError>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// In-process store used when no Redis is configured, and in tests.
#[derive(Default)]
pub struct MemoryScratchStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl MemoryScratchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ScratchStore for MemoryScratchStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ScratchStoreError> {
        let entries = self.entries.read().await;
        let now = Instant::now();
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), ScratchStoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        entries.retain(|_, entry| entry.is_live(now));
        entries.insert(key.to_string(), Entry { value, expires_at: now + ttl });
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool, ScratchStoreError> {
        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if entries.get(key).map(|entry| entry.is_live(now)).unwrap_or(false) {
            return Ok(false);
        }
        entries.insert(key.to_string(), Entry { value, expires_at: now + ttl });
        Ok(true)
    }

    async fn remove(&self, key: &str) -> Result<(), ScratchStoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

pub struct RedisScratchStore {
    pool: Pool,
}

impl RedisScratchStore {
    pub async fn new(redis_url: &str) -> Result<Self, ScratchStoreError> {
        let pool = Config::from_url(redis_url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| ScratchStoreError::Unavailable(format!("Failed to create Redis pool: {}", e)))?;

        let mut conn = pool
            .get()
            .await
            .map_err(|e| ScratchStoreError::Unavailable(format!("Failed to connect to Redis: {}", e)))?;

        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis scratch store initialized");

        Ok(Self { pool })
    }

    async fn connection(&self) -> Result<deadpool_redis::Connection, ScratchStoreError> {
        self.pool
            .get()
            .await
            .map_err(|e| ScratchStoreError::Unavailable(e.to_string()))
    }

    // EX rejects zero
    fn ttl_secs(ttl: Duration) -> u64 {
        ttl.as_secs().max(1)
    }
}

#[async_trait]
impl ScratchStore for RedisScratchStore {
    async fn get(&self, key: &str) -> Result<Option<String>, ScratchStoreError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(key).await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), ScratchStoreError> {
        let mut conn = self.connection().await?;
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn put_if_absent(&self, key: &str, value: String, ttl: Duration) -> Result<bool, ScratchStoreError> {
        let mut conn = self.connection().await?;
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(Self::ttl_secs(ttl))
            .query_async(&mut conn)
            .await?;
        debug!("SET NX on {} -> {:?}", key, reply);
        Ok(reply.is_some())
    }

    async fn remove(&self, key: &str) -> Result<(), ScratchStoreError> {
        let mut conn = self.connection().await?;
        let _: () = conn.del(key).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn put_if_absent_only_writes_once() {
        let store = MemoryScratchStore::new();
        assert!(store.put_if_absent("attempt", "a".to_string(), HOUR).await.unwrap());
        assert!(!store.put_if_absent("attempt", "b".to_string(), HOUR).await.unwrap());
        assert_eq!(store.get("attempt").await.unwrap().as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn expired_entries_read_as_absent() {
        let store = MemoryScratchStore::new();
        store.put("intent", "x".to_string(), Duration::ZERO).await.unwrap();
        assert_eq!(store.get("intent").await.unwrap(), None);
        assert!(store.put_if_absent("intent", "y".to_string(), HOUR).await.unwrap());
    }

    #[tokio::test]
    async fn remove_clears_the_key() {
        let store = MemoryScratchStore::new();
        store.put("intent", "x".to_string(), HOUR).await.unwrap();
        store.remove("intent").await.unwrap();
        assert_eq!(store.get("intent").await.unwrap(), None);
        store.remove("never-written").await.unwrap();
    }
}
