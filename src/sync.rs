//! Aggregation-and-cache synchronization.
//!
//! The orchestrator is the only writer of the stats key space. Every write
//! carries the 30-day TTL; re-syncing a date overwrites the previous blob
//! (last write wins; concurrent syncs for the same date are an accepted
//! race, the output is deterministic over the same underlying data). A cache
//! outage drops writes with a warning instead of failing the sync.

use chrono::{Local, NaiveDate};
use std::sync::Arc;

use crate::aggregator::Aggregator;
use crate::cache::{
    daily_key, hourly_key, provider_key, StatsCache, StatsCacheExt, DAILY_PREFIX, HOURLY_PREFIX,
};
use crate::errors::AppError;
use crate::models::stats::{BulkSyncFailure, BulkSyncReport, ProviderStats};

/// Rolling window covered by `full_sync`, today inclusive.
pub const FULL_SYNC_DAYS: i64 = 30;

/// Window covered by a cache warm-up (day + summary per date).
pub const WARM_DAYS: i64 = 7;

/// Strict `YYYY-MM-DD` parsing. chrono accepts unpadded fields, so the
/// round-trip check rejects forms like `2024-1-1`.
pub fn parse_date(raw: &str) -> Result<NaiveDate, AppError> {
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) if date.format("%Y-%m-%d").to_string() == raw => Ok(date),
        _ => Err(AppError::InvalidDate(raw.to_string())),
    }
}

pub struct SyncOrchestrator {
    aggregator: Arc<Aggregator>,
    cache: Arc<dyn StatsCache>,
    ttl_secs: u64,
}

impl SyncOrchestrator {
    pub fn new(aggregator: Arc<Aggregator>, cache: Arc<dyn StatsCache>, ttl_secs: u64) -> Self {
        Self {
            aggregator,
            cache,
            ttl_secs,
        }
    }

    /// Aggregate one date and cache it under `stats:hourly:<date>`.
    /// Idempotent: same underlying data, same cached bytes.
    pub async fn sync_day(&self, date: NaiveDate) -> anyhow::Result<()> {
        let stats = self.aggregator.compute_day_stats(date).await?;
        self.cache
            .put_or_drop(&hourly_key(date), &stats, self.ttl_secs)
            .await;
        tracing::debug!(date = %date, "hourly stats synced");
        Ok(())
    }

    /// Build the daily summary and cache it under `stats:daily:<date>` plus
    /// one `stats:provider:<id>` entry per provider seen that day.
    pub async fn sync_summary(&self, date: NaiveDate) -> anyhow::Result<()> {
        let summary = self.aggregator.build_day_summary(date).await?;

        for (provider, breakdown) in &summary.providers {
            let stats = ProviderStats {
                provider: provider.clone(),
                date,
                transactions: breakdown.clone(),
                timestamp: summary.timestamp,
            };
            self.cache
                .put_or_drop(&provider_key(provider), &stats, self.ttl_secs)
                .await;
        }

        self.cache
            .put_or_drop(&daily_key(date), &summary, self.ttl_secs)
            .await;
        tracing::debug!(date = %date, providers = summary.providers.len(), "daily summary synced");
        Ok(())
    }

    /// Keep "today" fresh. Driven by the minute scheduler; also exposed as a
    /// fire-and-forget trigger.
    pub async fn sync_current(&self) -> anyhow::Result<()> {
        self.sync_day(today()).await
    }

    /// Re-sync the rolling 30-day window, today back to today-29. Per-day
    /// failures are logged and the run continues.
    pub async fn full_sync(&self) {
        let today = today();
        for offset in 0..FULL_SYNC_DAYS {
            let date = today - chrono::Duration::days(offset);
            if let Err(e) = self.sync_day(date).await {
                tracing::error!(date = %date, error = %e, "full sync: day failed");
            }
        }
        tracing::info!(days = FULL_SYNC_DAYS, "full sync pass complete");
    }

    /// Day + summary sync for the last `WARM_DAYS` days.
    pub async fn warm_cache(&self) {
        let today = today();
        for offset in 0..WARM_DAYS {
            let date = today - chrono::Duration::days(offset);
            if let Err(e) = self.sync_day(date).await {
                tracing::error!(date = %date, error = %e, "cache warm: day failed");
            }
            if let Err(e) = self.sync_summary(date).await {
                tracing::error!(date = %date, error = %e, "cache warm: summary failed");
            }
        }
        tracing::info!(days = WARM_DAYS, "cache warm pass complete");
    }

    /// Validate-then-run bulk sync. The whole batch is rejected before any
    /// aggregation if the list is empty or any date is malformed; afterwards
    /// per-date outcomes are collected into a report.
    pub async fn sync_bulk(&self, raw_dates: &[String]) -> Result<BulkSyncReport, AppError> {
        if raw_dates.is_empty() {
            return Err(AppError::EmptyBatch);
        }
        let dates = raw_dates
            .iter()
            .map(|raw| parse_date(raw))
            .collect::<Result<Vec<_>, _>>()?;

        let mut report = BulkSyncReport::default();
        for date in dates {
            match self.sync_day(date).await {
                Ok(()) => report.synced.push(date),
                Err(e) => {
                    tracing::error!(date = %date, error = %e, "bulk sync: day failed");
                    report.failed.push(BulkSyncFailure {
                        date,
                        error: e.to_string(),
                    });
                }
            }
        }
        Ok(report)
    }

    /// Dates with a warm cache entry, for the dashboard calendar. Scans the
    /// hourly and daily prefixes, dedupes and sorts ascending. A cache
    /// outage reads as "nothing cached".
    pub async fn list_cached_dates(&self) -> Vec<NaiveDate> {
        let mut dates = std::collections::BTreeSet::new();
        for prefix in [HOURLY_PREFIX, DAILY_PREFIX] {
            let keys = match self.cache.scan_keys(&format!("{prefix}*")).await {
                Ok(keys) => keys,
                Err(e) => {
                    tracing::warn!(prefix, error = %e, "cache scan failed, treating as empty");
                    continue;
                }
            };
            for key in keys {
                if let Some(raw) = key.strip_prefix(prefix) {
                    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                        dates.insert(date);
                    }
                }
            }
        }
        dates.into_iter().collect()
    }
}

/// "Today" in the process-local timezone; no conversion is applied to the
/// tenants' reference timestamps.
fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;
    use crate::registry::TenantRegistry;
    use crate::store::{
        Collection, HourBucket, ProviderBucket, StatusBucket, TenantConnector, TenantStore,
    };
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    }

    /// Store with one fixed transactions hour plus a FAILED row for the
    /// summary path; counts how often it is opened.
    struct CountingStore;

    #[async_trait]
    impl TenantStore for CountingStore {
        async fn hourly_rollup(
            &self,
            collection: Collection,
            _day: NaiveDate,
        ) -> anyhow::Result<Vec<HourBucket>> {
            Ok(match collection {
                Collection::Transactions => vec![HourBucket {
                    hour: 10,
                    count: 5,
                    amount: Decimal::from(500),
                }],
                Collection::Withdrawals => vec![],
            })
        }

        async fn status_rollup(
            &self,
            collection: Collection,
            _day: NaiveDate,
        ) -> anyhow::Result<Vec<StatusBucket>> {
            Ok(match collection {
                Collection::Transactions => vec![
                    StatusBucket {
                        status: "SUCCESS".into(),
                        count: 5,
                        amount: Decimal::from(500),
                    },
                    StatusBucket {
                        status: "FAILED".into(),
                        count: 1,
                        amount: Decimal::from(30),
                    },
                ],
                Collection::Withdrawals => vec![],
            })
        }

        async fn provider_rollup(&self, _day: NaiveDate) -> anyhow::Result<Vec<ProviderBucket>> {
            Ok(vec![ProviderBucket {
                provider: "acme-pay".into(),
                status: "SUCCESS".into(),
                count: 5,
                amount: Decimal::from(500),
            }])
        }

        async fn amount_histogram(&self, _day: NaiveDate) -> anyhow::Result<Vec<(String, u64)>> {
            Ok(vec![("100-1k".into(), 5)])
        }
    }

    struct CountingConnector {
        opens: AtomicUsize,
    }

    #[async_trait]
    impl TenantConnector for CountingConnector {
        async fn open(&self, _tenant: &str) -> anyhow::Result<Arc<dyn TenantStore>> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(CountingStore))
        }
    }

    struct Fixture {
        sync: SyncOrchestrator,
        cache: Arc<MemoryCache>,
        connector: Arc<CountingConnector>,
        _dir: tempfile::TempDir,
    }

    fn fixture(tenants: &[&str]) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::new(dir.path().join("tenants.json"));
        registry
            .save(tenants.iter().map(|s| s.to_string()).collect())
            .unwrap();
        let connector = Arc::new(CountingConnector {
            opens: AtomicUsize::new(0),
        });
        let cache = Arc::new(MemoryCache::new());
        let aggregator = Arc::new(Aggregator::new(registry, connector.clone()));
        let sync = SyncOrchestrator::new(aggregator, cache.clone(), 60);
        Fixture {
            sync,
            cache,
            connector,
            _dir: dir,
        }
    }

    #[tokio::test]
    async fn sync_day_writes_hourly_blob_under_dated_key() {
        let f = fixture(&["siteA"]);
        f.sync.sync_day(date()).await.unwrap();

        let raw = f
            .cache
            .get_raw("stats:hourly:2024-01-01")
            .await
            .unwrap()
            .expect("blob cached");
        let stats: crate::models::stats::DailyStats = serde_json::from_str(&raw).unwrap();
        assert_eq!(stats.hourly[10].transactions.success.count, 5);
    }

    #[tokio::test]
    async fn sync_day_is_idempotent_over_unchanged_data() {
        let f = fixture(&["siteA"]);
        f.sync.sync_day(date()).await.unwrap();
        let first = f.cache.get_raw("stats:hourly:2024-01-01").await.unwrap();
        f.sync.sync_day(date()).await.unwrap();
        let second = f.cache.get_raw("stats:hourly:2024-01-01").await.unwrap();
        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn sync_summary_writes_daily_and_provider_keys() {
        let f = fixture(&["siteA"]);
        f.sync.sync_summary(date()).await.unwrap();

        let raw = f
            .cache
            .get_raw("stats:daily:2024-01-01")
            .await
            .unwrap()
            .expect("summary cached");
        let summary: crate::models::stats::DailySummary = serde_json::from_str(&raw).unwrap();
        assert_eq!(summary.transactions.failed.count, 1);

        let raw = f
            .cache
            .get_raw("stats:provider:acme-pay")
            .await
            .unwrap()
            .expect("provider cached");
        let provider: ProviderStats = serde_json::from_str(&raw).unwrap();
        assert_eq!(provider.transactions.success.count, 5);
    }

    #[tokio::test]
    async fn bulk_rejects_whole_batch_before_any_aggregation() {
        let f = fixture(&["siteA"]);
        let err = f
            .sync
            .sync_bulk(&["2024-01-01".to_string(), "bad-date".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidDate(_)));
        assert_eq!(f.connector.opens.load(Ordering::SeqCst), 0);
        assert!(f
            .cache
            .get_raw("stats:hourly:2024-01-01")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn bulk_rejects_empty_list() {
        let f = fixture(&["siteA"]);
        let err = f.sync.sync_bulk(&[]).await.unwrap_err();
        assert!(matches!(err, AppError::EmptyBatch));
    }

    #[tokio::test]
    async fn bulk_reports_per_date_outcome() {
        let f = fixture(&["siteA"]);
        let report = f
            .sync
            .sync_bulk(&["2024-01-01".to_string(), "2024-01-02".to_string()])
            .await
            .unwrap();
        assert_eq!(report.synced.len(), 2);
        assert!(report.failed.is_empty());
    }

    #[tokio::test]
    async fn cached_dates_merge_prefixes_dedupe_and_sort() {
        let f = fixture(&[]);
        f.cache
            .set_ex("stats:hourly:2024-01-03", "{}", 60)
            .await
            .unwrap();
        f.cache
            .set_ex("stats:hourly:2024-01-01", "{}", 60)
            .await
            .unwrap();
        f.cache
            .set_ex("stats:daily:2024-01-01", "{}", 60)
            .await
            .unwrap();
        f.cache
            .set_ex("stats:hourly:garbage", "{}", 60)
            .await
            .unwrap();

        let dates = f.sync.list_cached_dates().await;
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
            ]
        );
    }

    #[test]
    fn date_parsing_is_strict() {
        assert!(parse_date("2024-01-01").is_ok());
        assert!(parse_date("2024-1-1").is_err());
        assert!(parse_date("01-01-2024").is_err());
        assert!(parse_date("").is_err());
    }
}
