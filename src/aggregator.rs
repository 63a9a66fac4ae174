//! Daily aggregation across tenant databases.
//!
//! One pass reads the tenant registry, scans each tenant sequentially and
//! merges the roll-ups. Tenant identity is discarded in the hourly stats
//! (sites survive only in the daily summary). A tenant that cannot be
//! scanned is logged and contributes zero; a single unreachable tenant must
//! never abort the pass.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::models::stats::{DailyStats, DailySummary, SiteStats};
use crate::registry::TenantRegistry;
use crate::store::{Collection, TenantConnector};

pub struct Aggregator {
    registry: TenantRegistry,
    connector: Arc<dyn TenantConnector>,
}

impl Aggregator {
    pub fn new(registry: TenantRegistry, connector: Arc<dyn TenantConnector>) -> Self {
        Self {
            registry,
            connector,
        }
    }

    /// Compute hourly stats for one calendar date across all tenants.
    ///
    /// Pure read: the caller persists the result. Only SUCCESS records are
    /// summed, so `failed`/`pending` stay zero on this path. Zero configured
    /// tenants yields a well-formed all-zero day.
    pub async fn compute_day_stats(&self, date: NaiveDate) -> anyhow::Result<DailyStats> {
        let tenants = self.registry.load()?.databases;
        let mut stats = DailyStats::empty(date);

        for tenant in &tenants {
            if let Err(e) = self.scan_tenant_hourly(&mut stats, tenant, date).await {
                tracing::warn!(
                    tenant = %tenant,
                    date = %date,
                    error = %e,
                    "tenant scan failed, counting zero contribution"
                );
            }
        }

        Ok(stats)
    }

    async fn scan_tenant_hourly(
        &self,
        stats: &mut DailyStats,
        tenant: &str,
        date: NaiveDate,
    ) -> anyhow::Result<()> {
        let store = self.connector.open(tenant).await?;

        for collection in Collection::ALL {
            for bucket in store.hourly_rollup(collection, date).await? {
                let Some(slot) = stats.hourly.get_mut(bucket.hour as usize) else {
                    tracing::warn!(tenant, hour = bucket.hour, "roll-up returned hour out of range");
                    continue;
                };
                let breakdown = match collection {
                    Collection::Transactions => &mut slot.transactions,
                    Collection::Withdrawals => &mut slot.withdrawals,
                };
                breakdown.record_success(bucket.count, bucket.amount);
            }
        }

        Ok(())
    }

    /// Build the same-day roll-up: full status breakdowns per collection,
    /// per provider and per site, plus amount-tier and hour histograms.
    /// Unlike the hourly path this sums every status.
    pub async fn build_day_summary(&self, date: NaiveDate) -> anyhow::Result<DailySummary> {
        let tenants = self.registry.load()?.databases;
        let mut summary = DailySummary::empty(date);

        for tenant in &tenants {
            if let Err(e) = self.scan_tenant_summary(&mut summary, tenant, date).await {
                tracing::warn!(
                    tenant = %tenant,
                    date = %date,
                    error = %e,
                    "tenant summary scan failed, site omitted"
                );
            }
        }

        summary.timestamp = Utc::now();
        Ok(summary)
    }

    async fn scan_tenant_summary(
        &self,
        summary: &mut DailySummary,
        tenant: &str,
        date: NaiveDate,
    ) -> anyhow::Result<()> {
        let store = self.connector.open(tenant).await?;

        let mut site = SiteStats::default();
        for collection in Collection::ALL {
            for bucket in store.status_rollup(collection, date).await? {
                let (global, local) = match collection {
                    Collection::Transactions => {
                        (&mut summary.transactions, &mut site.transactions)
                    }
                    Collection::Withdrawals => (&mut summary.withdrawals, &mut site.withdrawals),
                };
                global.record(&bucket.status, bucket.count, bucket.amount);
                local.record(&bucket.status, bucket.count, bucket.amount);
            }
        }

        for bucket in store.provider_rollup(date).await? {
            summary
                .providers
                .entry(bucket.provider)
                .or_default()
                .record(&bucket.status, bucket.count, bucket.amount);
        }

        for (tier, count) in store.amount_histogram(date).await? {
            *summary.amount_ranges.entry(tier).or_insert(0) += count;
        }

        for bucket in store.hourly_rollup(Collection::Transactions, date).await? {
            if let Some(slot) = summary.hour_distribution.get_mut(bucket.hour as usize) {
                *slot += bucket.count;
            }
        }

        summary.sites.insert(tenant.to_string(), site);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{HourBucket, ProviderBucket, StatusBucket, TenantStore};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::collections::HashMap;

    fn dec(v: i64) -> Decimal {
        Decimal::from(v)
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
    }

    /// Canned tenant store: fixed roll-up rows for every query.
    #[derive(Default)]
    struct FakeStore {
        tx_hours: Vec<HourBucket>,
        wd_hours: Vec<HourBucket>,
        tx_statuses: Vec<StatusBucket>,
        wd_statuses: Vec<StatusBucket>,
        providers: Vec<ProviderBucket>,
        histogram: Vec<(String, u64)>,
    }

    #[async_trait]
    impl TenantStore for FakeStore {
        async fn hourly_rollup(
            &self,
            collection: Collection,
            _day: NaiveDate,
        ) -> anyhow::Result<Vec<HourBucket>> {
            Ok(match collection {
                Collection::Transactions => self.tx_hours.clone(),
                Collection::Withdrawals => self.wd_hours.clone(),
            })
        }

        async fn status_rollup(
            &self,
            collection: Collection,
            _day: NaiveDate,
        ) -> anyhow::Result<Vec<StatusBucket>> {
            Ok(match collection {
                Collection::Transactions => self.tx_statuses.clone(),
                Collection::Withdrawals => self.wd_statuses.clone(),
            })
        }

        async fn provider_rollup(&self, _day: NaiveDate) -> anyhow::Result<Vec<ProviderBucket>> {
            Ok(self.providers.clone())
        }

        async fn amount_histogram(&self, _day: NaiveDate) -> anyhow::Result<Vec<(String, u64)>> {
            Ok(self.histogram.clone())
        }
    }

    /// Connector mapping tenant names to canned stores; unknown tenants are
    /// unreachable.
    #[derive(Default)]
    struct FakeConnector {
        stores: HashMap<String, Arc<FakeStore>>,
    }

    #[async_trait]
    impl TenantConnector for FakeConnector {
        async fn open(&self, tenant: &str) -> anyhow::Result<Arc<dyn TenantStore>> {
            self.stores
                .get(tenant)
                .cloned()
                .map(|s| s as Arc<dyn TenantStore>)
                .ok_or_else(|| anyhow::anyhow!("connection refused: {tenant}"))
        }
    }

    fn aggregator_with(
        tenants: &[&str],
        stores: HashMap<String, Arc<FakeStore>>,
    ) -> (Aggregator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let registry = TenantRegistry::new(dir.path().join("tenants.json"));
        registry
            .save(tenants.iter().map(|s| s.to_string()).collect())
            .unwrap();
        let connector = Arc::new(FakeConnector { stores });
        (Aggregator::new(registry, connector), dir)
    }

    #[tokio::test]
    async fn always_emits_24_ascending_zero_filled_hours() {
        let (aggregator, _dir) = aggregator_with(&[], HashMap::new());
        let stats = aggregator.compute_day_stats(date()).await.unwrap();

        assert_eq!(stats.date, date());
        assert_eq!(stats.hourly.len(), 24);
        for (i, slot) in stats.hourly.iter().enumerate() {
            assert_eq!(slot.hour as usize, i);
            assert_eq!(slot.transactions.total.count, 0);
            assert_eq!(slot.withdrawals.total.count, 0);
        }
    }

    #[tokio::test]
    async fn unreachable_tenant_contributes_zero_without_aborting() {
        // siteA has 5 SUCCESS transactions of 100 in hour 10; siteB is down.
        let store = FakeStore {
            tx_hours: vec![HourBucket {
                hour: 10,
                count: 5,
                amount: dec(500),
            }],
            ..Default::default()
        };
        let mut stores = HashMap::new();
        stores.insert("siteA".to_string(), Arc::new(store));
        let (aggregator, _dir) = aggregator_with(&["siteA", "siteB"], stores);

        let stats = aggregator.compute_day_stats(date()).await.unwrap();
        let slot = &stats.hourly[10];
        assert_eq!(slot.transactions.success.count, 5);
        assert_eq!(slot.transactions.success.amount, dec(500));
        assert_eq!(slot.transactions.total.count, 5);
    }

    #[tokio::test]
    async fn hourly_path_never_fills_failed_or_pending() {
        let store = FakeStore {
            tx_hours: vec![
                HourBucket { hour: 0, count: 2, amount: dec(20) },
                HourBucket { hour: 23, count: 1, amount: dec(10) },
            ],
            wd_hours: vec![HourBucket { hour: 5, count: 3, amount: dec(60) }],
            ..Default::default()
        };
        let mut stores = HashMap::new();
        stores.insert("siteA".to_string(), Arc::new(store));
        let (aggregator, _dir) = aggregator_with(&["siteA"], stores);

        let stats = aggregator.compute_day_stats(date()).await.unwrap();
        for slot in &stats.hourly {
            assert_eq!(slot.transactions.failed.count, 0);
            assert_eq!(slot.transactions.pending.count, 0);
            assert_eq!(slot.withdrawals.failed.count, 0);
            assert_eq!(slot.withdrawals.pending.count, 0);
        }
        assert_eq!(stats.hourly[23].transactions.success.count, 1);
        assert_eq!(stats.hourly[5].withdrawals.success.amount, dec(60));
    }

    #[tokio::test]
    async fn hourly_results_sum_across_tenants() {
        let make = |count, amount| FakeStore {
            tx_hours: vec![HourBucket { hour: 7, count, amount }],
            ..Default::default()
        };
        let mut stores = HashMap::new();
        stores.insert("siteA".to_string(), Arc::new(make(2, dec(200))));
        stores.insert("siteB".to_string(), Arc::new(make(3, dec(450))));
        let (aggregator, _dir) = aggregator_with(&["siteA", "siteB"], stores);

        let stats = aggregator.compute_day_stats(date()).await.unwrap();
        // tenant identity is discarded: one merged pair per hour
        assert_eq!(stats.hourly[7].transactions.success.count, 5);
        assert_eq!(stats.hourly[7].transactions.success.amount, dec(650));
    }

    #[tokio::test]
    async fn summary_fills_full_breakdown_and_sites() {
        let store = FakeStore {
            tx_statuses: vec![
                StatusBucket { status: "SUCCESS".into(), count: 4, amount: dec(400) },
                StatusBucket { status: "FAILED".into(), count: 2, amount: dec(90) },
                StatusBucket { status: "PENDING".into(), count: 1, amount: dec(15) },
            ],
            wd_statuses: vec![StatusBucket {
                status: "SUCCESS".into(),
                count: 2,
                amount: dec(120),
            }],
            providers: vec![
                ProviderBucket {
                    provider: "acme-pay".into(),
                    status: "SUCCESS".into(),
                    count: 4,
                    amount: dec(400),
                },
                ProviderBucket {
                    provider: "acme-pay".into(),
                    status: "FAILED".into(),
                    count: 2,
                    amount: dec(90),
                },
            ],
            histogram: vec![("0-100".into(), 3), ("100-1k".into(), 1)],
            tx_hours: vec![HourBucket { hour: 10, count: 4, amount: dec(400) }],
            ..Default::default()
        };
        let mut stores = HashMap::new();
        stores.insert("siteA".to_string(), Arc::new(store));
        let (aggregator, _dir) = aggregator_with(&["siteA", "siteDown"], stores);

        let summary = aggregator.build_day_summary(date()).await.unwrap();

        // full breakdown, unlike the hourly path
        assert_eq!(summary.transactions.success.count, 4);
        assert_eq!(summary.transactions.failed.count, 2);
        assert_eq!(summary.transactions.pending.count, 1);
        assert_eq!(summary.transactions.total.count, 7);
        assert_eq!(summary.withdrawals.success.amount, dec(120));

        // sites keyed by tenant name; unreachable tenant omitted
        assert_eq!(summary.sites.len(), 1);
        assert_eq!(summary.sites["siteA"].transactions.failed.count, 2);
        assert!(!summary.sites.contains_key("siteDown"));

        let acme = &summary.providers["acme-pay"];
        assert_eq!(acme.total.count, 6);
        assert_eq!(acme.failed.amount, dec(90));

        assert_eq!(summary.amount_ranges["0-100"], 3);
        assert_eq!(summary.hour_distribution[10], 4);
    }
}
