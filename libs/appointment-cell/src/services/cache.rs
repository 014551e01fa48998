// libs/appointment-cell/src/services/cache.rs
use async_trait::async_trait;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use shared_config::AppConfig;

use crate::error::CacheError;

/// String key/value cache with per-entry TTL.
#[async_trait]
pub trait AppointmentCache: Send + Sync {
    /// `Ok(None)` is a miss.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

// ==============================================================================
// REDIS
// ==============================================================================

pub struct RedisAppointmentCache {
    pool: Pool,
}

impl RedisAppointmentCache {
    pub async fn new(config: &AppConfig) -> Result<Self, CacheError> {
        let cfg = Config::from_url(config.redis_url.clone());
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1))
            .map_err(|e| CacheError::Pool(format!("Failed to create Redis pool: {}", e)))?;

        let cache = Self { pool };

        let mut conn = cache.get_connection().await?;
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        info!("Redis appointment cache initialized successfully");

        Ok(cache)
    }

    /// Wraps an existing pool without probing it.
    pub fn from_pool(pool: Pool) -> Self {
        Self { pool }
    }

    async fn get_connection(&self) -> Result<Connection, CacheError> {
        self.pool
            .get()
            .await
            .map_err(|e| CacheError::Pool(format!("Connection error: {}", e)))
    }
}

#[async_trait]
impl AppointmentCache for RedisAppointmentCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        debug!("Redis GET {} hit={}", key, value.is_some());
        Ok(value)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let seconds = ttl.as_secs().max(1);
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(seconds)
            .query_async(&mut conn)
            .await?;
        debug!("Redis SET {} ttl={}s", key, seconds);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.get_connection().await?;
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        debug!("Redis DEL {}", key);
        Ok(())
    }
}

// ==============================================================================
// IN-MEMORY
// ==============================================================================

/// Process-local cache. Expired entries are dropped lazily on read.
#[derive(Default)]
pub struct InMemoryAppointmentCache {
    entries: RwLock<HashMap<String, (String, Instant)>>,
}

impl InMemoryAppointmentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn contains(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }

    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|(_, expires_at)| *expires_at > now)
            .count()
    }
}

#[async_trait]
impl AppointmentCache for InMemoryAppointmentCache {
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some((value, expires_at)) if *expires_at > now => return Ok(Some(value.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        self.entries.write().await.remove(key);
        Ok(None)
    }

    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError> {
        let expires_at = Instant::now() + ttl;
        self.entries
            .write()
            .await
            .insert(key.to_string(), (value, expires_at));
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn entries_expire_after_ttl() {
        let cache = InMemoryAppointmentCache::new();
        cache
            .set("appointment:1", "{}".to_string(), Duration::from_secs(300))
            .await
            .unwrap();

        tokio::time::advance(Duration::from_secs(299)).await;
        assert_eq!(cache.get("appointment:1").await.unwrap().as_deref(), Some("{}"));

        tokio::time::advance(Duration::from_secs(2)).await;
        assert_eq!(cache.get("appointment:1").await.unwrap(), None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn unreachable_redis_is_a_pool_error() {
        let pool = Config::from_url("redis://127.0.0.1:1")
            .create_pool(Some(Runtime::Tokio1))
            .unwrap();
        let cache = RedisAppointmentCache::from_pool(pool);

        let err = cache.get("appointment:1").await.unwrap_err();
        assert!(matches!(err, CacheError::Pool(_)));
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = InMemoryAppointmentCache::new();
        cache
            .set("appointments:user:u1", "[]".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(cache.contains("appointments:user:u1").await);

        cache.delete("appointments:user:u1").await.unwrap();
        assert!(!cache.contains("appointments:user:u1").await);
    }
}
