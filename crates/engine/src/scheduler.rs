//! Retry cadence for the sync manager.
//!
//! The manager itself never schedules anything. `SyncScheduler` owns when a
//! sweep runs: right after every offline → online transition and on a fixed
//! interval, until shutdown.

use std::{future::Future, sync::Arc, time::Duration};

use tokio::{sync::watch, time::MissedTickBehavior};

use crate::{Connectivity, SweepOutcome, SyncManager};

pub struct SyncScheduler {
    manager: Arc<SyncManager>,
    connectivity: watch::Receiver<bool>,
    interval: Duration,
}

impl SyncScheduler {
    pub fn new(
        manager: Arc<SyncManager>,
        connectivity: &dyn Connectivity,
        interval: Duration,
    ) -> Self {
        Self {
            manager,
            connectivity: connectivity.subscribe(),
            interval,
        }
    }

    async fn sweep(&self, trigger: &str) {
        match self.manager.sync_pending().await {
            Ok(SweepOutcome::Completed(report)) if report.attempted > 0 => {
                tracing::info!(
                    "{trigger} sync: {}/{} synced",
                    report.synced,
                    report.attempted
                );
            }
            Ok(_) => {}
            Err(err) => tracing::error!("{trigger} sync failed: {err}"),
        }
    }

    /// Run until `shutdown` completes. A sweep already in progress finishes
    /// before the loop observes shutdown.
    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut watching = true;

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                changed = self.connectivity.changed(), if watching => {
                    if changed.is_err() {
                        tracing::warn!("connectivity signal dropped; falling back to interval sync");
                        watching = false;
                        continue;
                    }
                    let online = *self.connectivity.borrow_and_update();
                    if online {
                        self.sweep("reconnect").await;
                    }
                }
                _ = ticker.tick() => self.sweep("periodic").await,
            }
        }
        tracing::info!("sync scheduler stopped");
    }
}
