use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::jobs::worker::SyncJob;
use crate::models::stats::{BulkSyncReport, DailyStats, ProviderStats, WeeklyStats};
use crate::sync::parse_date;
use crate::AppState;

// ── Request / Response DTOs ──────────────────────────────────

#[derive(Deserialize)]
pub struct DailySyncRequest {
    pub date: String,
}

#[derive(Deserialize)]
pub struct BulkSyncRequest {
    pub dates: Vec<String>,
}

#[derive(Deserialize)]
pub struct HourlyParams {
    pub date: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryParams {
    pub start_date: String,
    pub end_date: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatusResponse {
    pub cached_dates: Vec<NaiveDate>,
}

// ── Sync triggers ────────────────────────────────────────────

/// POST /sync/daily: validate, enqueue hourly + summary sync for the date,
/// return before the work runs. Poll /sync/cache-status for completion.
pub async fn trigger_daily_sync(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DailySyncRequest>,
) -> Result<Json<Value>, AppError> {
    let date = parse_date(&req.date)?;
    if !state.queue.enqueue(SyncJob::Day(date)) {
        return Err(AppError::QueueFull);
    }
    Ok(Json(json!({
        "message": "sync scheduled",
        "date": date,
    })))
}

/// POST /sync/bulk, synchronous: validates the whole batch up front, then
/// returns the per-date outcome report.
pub async fn sync_bulk(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BulkSyncRequest>,
) -> Result<Json<BulkSyncReport>, AppError> {
    let report = state.sync.sync_bulk(&req.dates).await?;
    Ok(Json(report))
}

/// GET /sync/cache-status: dates with a warm cache entry.
pub async fn cache_status(
    State(state): State<Arc<AppState>>,
) -> Json<CacheStatusResponse> {
    Json(CacheStatusResponse {
        cached_dates: state.sync.list_cached_dates().await,
    })
}

// ── Stats reads ──────────────────────────────────────────────

/// GET /stats/hourly?date=YYYY-MM-DD
pub async fn get_hourly_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<HourlyParams>,
) -> Result<Json<DailyStats>, AppError> {
    let date = parse_date(&params.date)?;
    let stats = state.reader.get_hourly_stats(date).await?;
    Ok(Json(stats))
}

/// GET /stats/summary?startDate=YYYY-MM-DD&endDate=YYYY-MM-DD
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SummaryParams>,
) -> Result<Json<WeeklyStats>, AppError> {
    let start = parse_date(&params.start_date)?;
    let end = parse_date(&params.end_date)?;
    if start > end {
        return Err(AppError::InvalidRange);
    }

    state
        .reader
        .get_weekly_stats(start, end)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("summaries between {start} and {end}")))
}

/// GET /stats/provider/:id
pub async fn get_provider_stats(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
) -> Result<Json<ProviderStats>, AppError> {
    state
        .reader
        .get_provider_stats(&provider)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("provider {provider}")))
}

// ── Admin fire-and-forget triggers ───────────────────────────

pub async fn trigger_current_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    enqueue_ack(&state, SyncJob::Current, "current-day sync triggered")
}

pub async fn trigger_full_sync(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    enqueue_ack(&state, SyncJob::Full, "full 30-day sync triggered")
}

pub async fn trigger_cache_warm(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Value>, AppError> {
    enqueue_ack(&state, SyncJob::Warm, "cache warm-up triggered")
}

/// The response acknowledges the trigger only; downstream failures are
/// logged, never reflected here.
fn enqueue_ack(state: &AppState, job: SyncJob, message: &str) -> Result<Json<Value>, AppError> {
    if !state.queue.enqueue(job) {
        return Err(AppError::QueueFull);
    }
    Ok(Json(json!({ "message": message })))
}
