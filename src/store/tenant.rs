//! sqlx-backed tenant store.
//!
//! One `PgPool` per tenant database, memoized in a `DashMap` so repeated
//! sync passes reuse connections. Pools are deliberately small: aggregation
//! scans tenants one at a time.

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use std::sync::Arc;

use super::{
    day_window, Collection, HourBucket, ProviderBucket, StatusBucket, TenantConnector, TenantStore,
};

pub struct PgTenantStore {
    pool: PgPool,
}

impl PgTenantStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TenantStore for PgTenantStore {
    async fn hourly_rollup(
        &self,
        collection: Collection,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<HourBucket>> {
        let (start, end) = day_window(day);
        // Table names are the two fixed values of `Collection`, never user
        // input, so interpolation is safe here.
        let sql = format!(
            r#"
            SELECT EXTRACT(HOUR FROM created_at)::INT AS hour,
                   COUNT(*)                           AS count,
                   COALESCE(SUM(amount), 0)           AS amount
            FROM {}
            WHERE created_at >= $1 AND created_at < $2 AND status = 'SUCCESS'
            GROUP BY 1
            ORDER BY 1
            "#,
            collection.table()
        );

        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let hour: i32 = row.try_get("hour")?;
                let count: i64 = row.try_get("count")?;
                let amount: Decimal = row.try_get("amount")?;
                Ok(HourBucket {
                    hour: hour as u8,
                    count: count as u64,
                    amount,
                })
            })
            .collect()
    }

    async fn status_rollup(
        &self,
        collection: Collection,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<StatusBucket>> {
        let (start, end) = day_window(day);
        let sql = format!(
            r#"
            SELECT status,
                   COUNT(*)                 AS count,
                   COALESCE(SUM(amount), 0) AS amount
            FROM {}
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY 1
            "#,
            collection.table()
        );

        let rows = sqlx::query(&sql)
            .bind(start)
            .bind(end)
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let status: String = row.try_get("status")?;
                let count: i64 = row.try_get("count")?;
                let amount: Decimal = row.try_get("amount")?;
                Ok(StatusBucket {
                    status,
                    count: count as u64,
                    amount,
                })
            })
            .collect()
    }

    async fn provider_rollup(&self, day: NaiveDate) -> anyhow::Result<Vec<ProviderBucket>> {
        let (start, end) = day_window(day);
        let rows = sqlx::query(
            r#"
            SELECT provider,
                   status,
                   COUNT(*)                 AS count,
                   COALESCE(SUM(amount), 0) AS amount
            FROM transactions
            WHERE created_at >= $1 AND created_at < $2 AND provider IS NOT NULL
            GROUP BY 1, 2
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let provider: String = row.try_get("provider")?;
                let status: String = row.try_get("status")?;
                let count: i64 = row.try_get("count")?;
                let amount: Decimal = row.try_get("amount")?;
                Ok(ProviderBucket {
                    provider,
                    status,
                    count: count as u64,
                    amount,
                })
            })
            .collect()
    }

    async fn amount_histogram(&self, day: NaiveDate) -> anyhow::Result<Vec<(String, u64)>> {
        let (start, end) = day_window(day);
        // Tier bounds mirror models::stats::amount_tier.
        let rows = sqlx::query(
            r#"
            SELECT CASE
                       WHEN amount < 100   THEN '0-100'
                       WHEN amount < 1000  THEN '100-1k'
                       WHEN amount < 10000 THEN '1k-10k'
                       ELSE '10k+'
                   END      AS tier,
                   COUNT(*) AS count
            FROM transactions
            WHERE created_at >= $1 AND created_at < $2 AND status = 'SUCCESS'
            GROUP BY 1
            "#,
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                let tier: String = row.try_get("tier")?;
                let count: i64 = row.try_get("count")?;
                Ok((tier, count as u64))
            })
            .collect()
    }
}

/// Connects tenant names to pools on a shared Postgres server: the tenant
/// database URL is `<base_url>/<tenant>`.
pub struct PgTenantConnector {
    base_url: String,
    pools: DashMap<String, PgPool>,
}

impl PgTenantConnector {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            pools: DashMap::new(),
        }
    }

    fn tenant_url(&self, tenant: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), tenant)
    }
}

#[async_trait]
impl TenantConnector for PgTenantConnector {
    async fn open(&self, tenant: &str) -> anyhow::Result<Arc<dyn TenantStore>> {
        if let Some(pool) = self.pools.get(tenant) {
            return Ok(Arc::new(PgTenantStore::new(pool.clone())));
        }

        let pool = PgPoolOptions::new()
            .max_connections(4)
            .connect(&self.tenant_url(tenant))
            .await?;
        self.pools.insert(tenant.to_string(), pool.clone());
        Ok(Arc::new(PgTenantStore::new(pool)))
    }
}
