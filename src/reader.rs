//! Cache-first stats reads.
//!
//! Hourly reads fall back to a synchronous aggregation pass on miss; whether
//! the fallback result is written back is a config toggle (off by default;
//! the scheduled sync repopulates the cache on its next tick). Weekly and
//! provider reads are cache-only.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::cache::{daily_key, hourly_key, provider_key, StatsCache, StatsCacheExt};
use crate::models::stats::{DailyStats, DailySummary, ProviderStats, WeeklyStats};

pub struct StatsReader {
    aggregator: Arc<Aggregator>,
    cache: Arc<dyn StatsCache>,
    /// Cache-aside write-back of fallback reads (PAYDASH_FALLBACK_WRITE_BACK).
    write_back: bool,
    ttl_secs: u64,
}

impl StatsReader {
    pub fn new(
        aggregator: Arc<Aggregator>,
        cache: Arc<dyn StatsCache>,
        write_back: bool,
        ttl_secs: u64,
    ) -> Self {
        Self {
            aggregator,
            cache,
            write_back,
            ttl_secs,
        }
    }

    /// Hourly stats for a date: cache hit, or a direct aggregation pass.
    ///
    /// With zero tenants configured (or simply no matching records) the
    /// result is a well-formed all-zero day, never an error. Callers cannot
    /// tell "no tenants" from "no traffic", which is the documented contract.
    pub async fn get_hourly_stats(&self, date: NaiveDate) -> anyhow::Result<DailyStats> {
        let key = hourly_key(date);
        if let Some(stats) = self.cache.get_or_miss::<DailyStats>(&key).await {
            return Ok(stats);
        }

        tracing::warn!(date = %date, "hourly stats cache miss, aggregating directly");
        let stats = self.aggregator.compute_day_stats(date).await?;
        if self.write_back {
            self.cache.put_or_drop(&key, &stats, self.ttl_secs).await;
        }
        Ok(stats)
    }

    /// Cached daily summaries over `[start, end]` inclusive, ascending.
    /// Days without a cache entry are omitted (callers must handle sparse
    /// ranges); `None` when no day in the range has data.
    pub async fn get_weekly_stats(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Option<WeeklyStats> {
        let mut daily = Vec::new();
        let mut day = start;
        while day <= end {
            if let Some(summary) = self.cache.get_or_miss::<DailySummary>(&daily_key(day)).await {
                daily.push(summary);
            }
            day = day.succ_opt()?;
        }

        if daily.is_empty() {
            return None;
        }
        Some(WeeklyStats {
            start_date: start,
            end_date: end,
            daily,
            timestamp: Utc::now(),
        })
    }

    /// Provider stats are populated by the summary builder only; no DB
    /// fallback on miss.
    pub async fn get_provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        self.cache.get_or_miss(&provider_key(provider)).await
    }
}
