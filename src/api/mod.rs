use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::AppState;

pub mod handlers;

/// Build the stats API router. The caller mounts this at the root.
pub fn api_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/daily", post(handlers::trigger_daily_sync))
        .route("/sync/bulk", post(handlers::sync_bulk))
        .route("/sync/cache-status", get(handlers::cache_status))
        .route("/stats/hourly", get(handlers::get_hourly_stats))
        .route("/stats/summary", get(handlers::get_summary))
        .route("/stats/provider/:id", get(handlers::get_provider_stats))
        .route("/admin/sync/current", post(handlers::trigger_current_sync))
        .route("/admin/sync/full", post(handlers::trigger_full_sync))
        .route("/admin/cache/warm", post(handlers::trigger_cache_warm))
        .layer(TraceLayer::new_for_http())
}
