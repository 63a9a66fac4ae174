//! Periodic current-day sync.
//!
//! One ticker drives `sync_current()` so "today" stays fresh as new
//! transactions land. The handle owns the task: no ambient global timer,
//! and shutdown is explicit so the server can stop the ticker before exit.
//! A failed tick is logged; the ticker fires again on its next interval
//! regardless.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time;

use crate::sync::SyncOrchestrator;

pub struct SchedulerHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stop the ticker and wait for the task to finish. An in-flight sync
    /// pass completes first; there is no mid-pass cancellation.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

/// Spawn the sync ticker. Call this once at startup. The first tick fires
/// immediately, warming "today" on boot.
pub fn spawn(sync: Arc<SyncOrchestrator>, every: Duration) -> SchedulerHandle {
    let (stop, mut stopped) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut interval = time::interval(every);
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = sync.sync_current().await {
                        tracing::error!(error = %e, "scheduled current-day sync failed");
                    }
                }
                _ = stopped.changed() => {
                    tracing::info!("sync scheduler stopped");
                    break;
                }
            }
        }
    });
    SchedulerHandle { stop, task }
}
