use serde::Deserialize;
use std::path::PathBuf;

use crate::cache::STATS_TTL_SECS;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub port: u16,
    /// Redis connection URL, or the literal `memory` for the in-process
    /// cache (tests / redis-less local runs).
    pub redis_url: String,
    /// Base Postgres URL; tenant databases live at `<base>/<tenant>`.
    pub tenant_db_url: String,
    /// Path to the tenant registry JSON file.
    pub registry_path: PathBuf,
    /// Seconds between scheduled current-day syncs. Default: 60.
    pub sync_interval_secs: u64,
    /// TTL applied to every stats cache write. Default: 30 days.
    pub cache_ttl_secs: u64,
    /// Write DB-fallback reads back into the cache (cache-aside). Default:
    /// off; the scheduled sync repopulates the cache instead.
    pub fallback_write_back: bool,
    /// Bound on the fire-and-forget sync queue. Default: 64.
    pub sync_queue_depth: usize,
}

pub fn load() -> anyhow::Result<Config> {
    dotenvy::dotenv().ok();

    Ok(Config {
        port: std::env::var("PAYDASH_PORT")
            .unwrap_or_else(|_| "8080".into())
            .parse()
            .unwrap_or(8080),
        redis_url: std::env::var("PAYDASH_REDIS_URL")
            .or_else(|_| std::env::var("REDIS_URL"))
            .unwrap_or_else(|_| "redis://127.0.0.1:6379".into()),
        tenant_db_url: std::env::var("PAYDASH_TENANT_DB_URL")
            .unwrap_or_else(|_| "postgres://localhost".into()),
        registry_path: std::env::var("PAYDASH_REGISTRY_PATH")
            .unwrap_or_else(|_| "tenants.json".into())
            .into(),
        sync_interval_secs: std::env::var("PAYDASH_SYNC_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(60),
        cache_ttl_secs: std::env::var("PAYDASH_CACHE_TTL_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(STATS_TTL_SECS),
        fallback_write_back: std::env::var("PAYDASH_FALLBACK_WRITE_BACK")
            .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
            .unwrap_or(false),
        sync_queue_depth: std::env::var("PAYDASH_SYNC_QUEUE_DEPTH")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(64),
    })
}
