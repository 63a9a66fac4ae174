//! Fire-and-forget sync execution.
//!
//! REST triggers enqueue a job onto a bounded queue and return immediately;
//! a single worker drains it sequentially. Completion is observed by polling
//! `GET /sync/cache-status`, never through the trigger response. Downstream
//! failures are logged only.

use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::sync::SyncOrchestrator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncJob {
    /// Hourly stats + daily summary for one date.
    Day(NaiveDate),
    Current,
    Full,
    Warm,
}

/// Cloneable enqueue handle shared with the REST layer.
#[derive(Clone)]
pub struct SyncQueue {
    tx: mpsc::Sender<SyncJob>,
}

impl SyncQueue {
    /// Non-blocking enqueue; `false` when the queue is full.
    pub fn enqueue(&self, job: SyncJob) -> bool {
        match self.tx.try_send(job) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(job = ?e.into_inner(), "sync queue full, trigger rejected");
                false
            }
        }
    }
}

/// Spawn the worker. Call this once at startup.
pub fn spawn(sync: Arc<SyncOrchestrator>, depth: usize) -> (SyncQueue, JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel(depth);
    let task = tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            run_job(&sync, job).await;
        }
        tracing::info!("sync worker stopped");
    });
    (SyncQueue { tx }, task)
}

async fn run_job(sync: &SyncOrchestrator, job: SyncJob) {
    match job {
        SyncJob::Day(date) => {
            if let Err(e) = sync.sync_day(date).await {
                tracing::error!(date = %date, error = %e, "triggered day sync failed");
            }
            if let Err(e) = sync.sync_summary(date).await {
                tracing::error!(date = %date, error = %e, "triggered summary build failed");
            }
        }
        SyncJob::Current => {
            if let Err(e) = sync.sync_current().await {
                tracing::error!(error = %e, "triggered current-day sync failed");
            }
        }
        SyncJob::Full => sync.full_sync().await,
        SyncJob::Warm => sync.warm_cache().await,
    }
}
