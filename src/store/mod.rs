//! Tenant database access.
//!
//! Each payment site has its own database with `transactions` and
//! `withdrawals` tables. The aggregator only ever needs day-scoped roll-ups,
//! so the trait surface is a handful of GROUP BY queries; everything returns
//! plain rows and the aggregator owns the merging.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use std::sync::Arc;

pub mod tenant;

/// The two record collections every tenant database carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Transactions,
    Withdrawals,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Transactions, Collection::Withdrawals];

    pub fn table(&self) -> &'static str {
        match self {
            Collection::Transactions => "transactions",
            Collection::Withdrawals => "withdrawals",
        }
    }
}

/// Midnight-to-midnight window for a date, half-open. No timezone
/// conversion: tenant timestamps are taken as-is, and a record exactly on an
/// hour boundary belongs to the later hour.
pub fn day_window(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    (start, start + Duration::days(1))
}

/// SUCCESS-only roll-up for one hour-of-day slot.
#[derive(Debug, Clone, PartialEq)]
pub struct HourBucket {
    pub hour: u8,
    pub count: u64,
    pub amount: Decimal,
}

/// Roll-up of one status value over a whole day.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusBucket {
    pub status: String,
    pub count: u64,
    pub amount: Decimal,
}

/// Per-provider, per-status roll-up over a whole day (transactions only;
/// withdrawals carry no provider).
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderBucket {
    pub provider: String,
    pub status: String,
    pub count: u64,
    pub amount: Decimal,
}

#[async_trait]
pub trait TenantStore: Send + Sync {
    /// SUCCESS records grouped into hour-of-day buckets. Hours with no data
    /// are absent from the result; the caller zero-fills.
    async fn hourly_rollup(
        &self,
        collection: Collection,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<HourBucket>>;

    /// All records for the day grouped by status.
    async fn status_rollup(
        &self,
        collection: Collection,
        day: NaiveDate,
    ) -> anyhow::Result<Vec<StatusBucket>>;

    /// Transactions for the day grouped by provider and status.
    async fn provider_rollup(&self, day: NaiveDate) -> anyhow::Result<Vec<ProviderBucket>>;

    /// Successful transactions for the day bucketed into amount tiers.
    async fn amount_histogram(&self, day: NaiveDate) -> anyhow::Result<Vec<(String, u64)>>;
}

/// Opens a [`TenantStore`] for a tenant database by name. Implementations
/// are expected to memoize connections; a tenant that cannot be reached
/// surfaces as an `Err` the aggregator contains per tenant.
#[async_trait]
pub trait TenantConnector: Send + Sync {
    async fn open(&self, tenant: &str) -> anyhow::Result<Arc<dyn TenantStore>>;
}
