//! Payment-transaction stats sync service.
//!
//! Aggregates transaction and withdrawal records from per-tenant databases
//! into hourly/daily statistics, cached in Redis with a 30-day TTL and
//! served cache-first through a REST API.

pub mod aggregator;
pub mod api;
pub mod cache;
pub mod config;
pub mod errors;
pub mod jobs;
pub mod models;
pub mod reader;
pub mod registry;
pub mod store;
pub mod sync;

use std::sync::Arc;

use jobs::worker::SyncQueue;
use reader::StatsReader;
use sync::SyncOrchestrator;

/// Shared application state passed to handlers.
pub struct AppState {
    pub sync: Arc<SyncOrchestrator>,
    pub reader: StatsReader,
    pub queue: SyncQueue,
}
