//! Wire types for the stats pipeline.
//!
//! Everything here is serialized as camelCase JSON; the same blobs that land
//! in Redis are what the REST layer returns, so the cache is the wire format.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const STATUS_SUCCESS: &str = "SUCCESS";
pub const STATUS_FAILED: &str = "FAILED";
pub const STATUS_PENDING: &str = "PENDING";

/// One count/amount pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    pub count: u64,
    pub amount: Decimal,
}

impl Bucket {
    pub fn add(&mut self, count: u64, amount: Decimal) {
        self.count += count;
        self.amount += amount;
    }
}

/// The four-way success/failed/pending/total roll-up used throughout the
/// stats schema. `total` always receives every record; statuses other than
/// the three known ones are counted into `total` only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusBreakdown {
    pub success: Bucket,
    pub failed: Bucket,
    pub pending: Bucket,
    pub total: Bucket,
}

impl StatusBreakdown {
    /// Record a roll-up row under its status bucket.
    pub fn record(&mut self, status: &str, count: u64, amount: Decimal) {
        match status {
            STATUS_SUCCESS => self.success.add(count, amount),
            STATUS_FAILED => self.failed.add(count, amount),
            STATUS_PENDING => self.pending.add(count, amount),
            _ => {}
        }
        self.total.add(count, amount);
    }

    /// Record SUCCESS rows only, the hourly aggregator path.
    pub fn record_success(&mut self, count: u64, amount: Decimal) {
        self.success.add(count, amount);
        self.total.add(count, amount);
    }
}

/// Stats for a single hour-of-day slot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyStats {
    pub hour: u8,
    pub transactions: StatusBreakdown,
    pub withdrawals: StatusBreakdown,
}

/// One calendar day broken into 24 hourly slots. Cached under
/// `stats:hourly:<date>`; superseded whenever sync re-runs for the date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub hourly: Vec<HourlyStats>,
}

impl DailyStats {
    /// Zero-filled stats: always exactly 24 entries, hours 0..=23 ascending.
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            hourly: (0..24)
                .map(|hour| HourlyStats {
                    hour,
                    ..Default::default()
                })
                .collect(),
        }
    }
}

/// Per-site (tenant database) roll-up inside a daily summary.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteStats {
    pub transactions: StatusBreakdown,
    pub withdrawals: StatusBreakdown,
}

/// Same-day roll-up with per-provider and per-site breakdowns plus amount
/// and hour distribution histograms. Cached under `stats:daily:<date>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
    pub date: NaiveDate,
    pub transactions: StatusBreakdown,
    pub withdrawals: StatusBreakdown,
    pub providers: BTreeMap<String, StatusBreakdown>,
    pub sites: BTreeMap<String, SiteStats>,
    pub amount_ranges: BTreeMap<String, u64>,
    pub hour_distribution: Vec<u64>,
    pub timestamp: DateTime<Utc>,
}

impl DailySummary {
    pub fn empty(date: NaiveDate) -> Self {
        Self {
            date,
            transactions: StatusBreakdown::default(),
            withdrawals: StatusBreakdown::default(),
            providers: BTreeMap::new(),
            sites: BTreeMap::new(),
            amount_ranges: BTreeMap::new(),
            hour_distribution: vec![0; 24],
            timestamp: Utc::now(),
        }
    }
}

/// A date range of cached daily summaries. Assembled on read; there is no
/// independent weekly storage, and days missing from the cache are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyStats {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub daily: Vec<DailySummary>,
    pub timestamp: DateTime<Utc>,
}

/// Per-provider stats written by the summary builder under
/// `stats:provider:<id>`. Read-only for the stats reader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderStats {
    pub provider: String,
    pub date: NaiveDate,
    pub transactions: StatusBreakdown,
    pub timestamp: DateTime<Utc>,
}

/// Per-date outcome of a bulk sync request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BulkSyncReport {
    pub synced: Vec<NaiveDate>,
    pub failed: Vec<BulkSyncFailure>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkSyncFailure {
    pub date: NaiveDate,
    pub error: String,
}

/// Amount tier label for the summary histogram. Lower bound inclusive,
/// upper bound exclusive.
pub fn amount_tier(amount: Decimal) -> &'static str {
    if amount < Decimal::from(100) {
        "0-100"
    } else if amount < Decimal::from(1_000) {
        "100-1k"
    } else if amount < Decimal::from(10_000) {
        "1k-10k"
    } else {
        "10k+"
    }
}
