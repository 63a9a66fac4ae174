//! Key-value cache with TTL expiry for aggregated stats.
//!
//! Redis is the production store; a cache outage must never fail the caller.
//! The trait surface returns `Result<Option<_>>` so callers *can* tell
//! "absent" from "unreachable", but the default policy (see the `_or_miss`
//! helpers) logs a warning and treats both as a miss, forcing a DB fallback.

use async_trait::async_trait;
use chrono::NaiveDate;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// 30 days, applied on every stats write.
pub const STATS_TTL_SECS: u64 = 2_592_000;

pub const HOURLY_PREFIX: &str = "stats:hourly:";
pub const DAILY_PREFIX: &str = "stats:daily:";
pub const PROVIDER_PREFIX: &str = "stats:provider:";

pub fn hourly_key(date: NaiveDate) -> String {
    format!("{HOURLY_PREFIX}{date}")
}

pub fn daily_key(date: NaiveDate) -> String {
    format!("{DAILY_PREFIX}{date}")
}

pub fn provider_key(provider: &str) -> String {
    format!("{PROVIDER_PREFIX}{provider}")
}

#[async_trait]
pub trait StatsCache: Send + Sync {
    async fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>>;
    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// Keys matching a glob-style pattern (e.g. `stats:hourly:*`).
    async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>>;
}

/// JSON helpers with the degrade-to-miss policy applied.
#[async_trait]
pub trait StatsCacheExt: StatsCache {
    /// Get and deserialize; a cache error or corrupt entry is a miss.
    async fn get_or_miss<T: DeserializeOwned + Send>(&self, key: &str) -> Option<T> {
        let raw = match self.get_raw(key).await {
            Ok(raw) => raw?,
            Err(e) => {
                tracing::warn!(key, error = %e, "cache read failed, treating as miss");
                return None;
            }
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key, error = %e, "corrupt cache entry, treating as miss");
                None
            }
        }
    }

    /// Serialize and set with TTL; a cache error drops the write.
    async fn put_or_drop<T: Serialize + Sync>(&self, key: &str, value: &T, ttl_secs: u64) {
        let json = match serde_json::to_string(value) {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(key, error = %e, "failed to serialize cache value");
                return;
            }
        };
        if let Err(e) = self.set_ex(key, &json, ttl_secs).await {
            tracing::warn!(key, error = %e, "cache write dropped");
        }
    }
}

impl<C: StatsCache + ?Sized> StatsCacheExt for C {}

/// Redis-backed cache. `ConnectionManager` reconnects with backoff on its
/// own; while the connection is down every call errors and the `_or_miss`
/// policy turns that into empty reads / dropped writes.
#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
}

impl RedisCache {
    pub async fn connect(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl StatsCache for RedisCache {
    async fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut conn = self.conn.clone();
        Ok(conn.get::<_, Option<String>>(key).await?)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_secs).await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut conn = self.conn.clone();
        conn.del::<_, ()>(key).await?;
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        let mut conn = self.conn.clone();
        let mut iter: redis::AsyncIter<String> = conn.scan_match(pattern).await?;
        let mut keys = Vec::new();
        while let Some(key) = iter.next_item().await {
            keys.push(key);
        }
        Ok(keys)
    }
}

/// In-memory cache for tests and redis-less local runs
/// (`PAYDASH_REDIS_URL=memory`). Honors TTLs lazily on read/scan.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, (String, Instant)>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StatsCache for MemoryCache {
    async fn get_raw(&self, key: &str) -> anyhow::Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_secs: u64) -> anyhow::Result<()> {
        self.entries.lock().unwrap().insert(
            key.to_string(),
            (value.to_string(), Instant::now() + Duration::from_secs(ttl_secs)),
        );
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        self.entries.lock().unwrap().remove(key);
        Ok(())
    }

    async fn scan_keys(&self, pattern: &str) -> anyhow::Result<Vec<String>> {
        let now = Instant::now();
        let prefix = pattern.strip_suffix('*').unwrap_or(pattern);
        Ok(self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(key, (_, expires_at))| {
                *expires_at > now
                    && if prefix.len() < pattern.len() {
                        key.starts_with(prefix)
                    } else {
                        key.as_str() == pattern
                    }
            })
            .map(|(key, _)| key.clone())
            .collect())
    }
}
