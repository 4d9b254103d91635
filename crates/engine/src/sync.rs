//! Offline-first sync manager.
//!
//! Writes go straight to the remote store when it is reachable and fall back to
//! the local store (as `pending`, under a temporary id) when it is not. A sweep
//! later pushes every `pending` row and records the outcome per row.
//!
//! Remote problems never surface as errors from this module; local-store
//! problems always do.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use chrono::Utc;
use serde::Serialize;

use crate::{
    Connectivity, EngineError, LocalStore, Record, RecordFilter, RecordId, RecordKind,
    RecordPatch, RecordPayload, RemoteError, RemoteRecord, RemoteStore, ResultEngine,
    StoredRecord, SyncStatus,
};

const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(10);
const REMOTE_ORDER_FIELD: &str = "created_at";

/// Local counts per status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SyncCounts {
    pub pending: u64,
    pub failed: u64,
    pub synced: u64,
}

/// Result of one completed sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub attempted: usize,
    pub synced: usize,
    pub failed: usize,
    /// Local copies of synced records removed after the sweep.
    pub cleaned: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    Offline,
    AlreadyRunning,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SweepOutcome {
    Skipped(SkipReason),
    Completed(SweepReport),
}

/// Rewrite a transaction payload's `category_id` when it names a renamed
/// category. Returns whether the payload changed.
fn relink_category(
    payload: &mut serde_json::Value,
    renamed: &HashMap<RecordId, RecordId>,
) -> bool {
    let Some(target) = payload
        .get("category_id")
        .and_then(serde_json::Value::as_str)
        .and_then(|current| renamed.get(&RecordId::from(current)))
        .cloned()
    else {
        return false;
    };
    payload["category_id"] = serde_json::Value::String(target.to_string());
    true
}

/// Holds the single-flight flag for the lifetime of a sweep.
struct SweepGuard<'a>(&'a AtomicBool);

impl<'a> SweepGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for SweepGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Mediates between the local record store, the remote store and the
/// connectivity signal.
///
/// Build one at startup and share it (`Arc<SyncManager>`); the sweep guard is
/// per instance.
pub struct SyncManager {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Arc<dyn Connectivity>,
    remote_timeout: Duration,
    sweeping: AtomicBool,
}

impl std::fmt::Debug for SyncManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncManager")
            .field("remote_timeout", &self.remote_timeout)
            .field("sweeping", &self.sweeping.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SyncManager {
    /// Return a builder for `SyncManager`.
    pub fn builder() -> SyncManagerBuilder {
        SyncManagerBuilder::default()
    }

    /// Direct read of the connectivity signal.
    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    async fn remote_create(
        &self,
        kind: RecordKind,
        fields: &serde_json::Value,
    ) -> Result<RemoteRecord, RemoteError> {
        tokio::time::timeout(self.remote_timeout, self.remote.create(kind, fields))
            .await
            .map_err(|_| RemoteError::Timeout(self.remote_timeout))?
    }

    async fn remote_list(
        &self,
        kind: RecordKind,
        owner: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        tokio::time::timeout(
            self.remote_timeout,
            self.remote.list(kind, owner, REMOTE_ORDER_FIELD),
        )
        .await
        .map_err(|_| RemoteError::Timeout(self.remote_timeout))?
    }

    /// Create a record and return its id.
    ///
    /// Online, the record goes to the remote store and the server id comes
    /// back. Offline, or when the remote attempt fails for any reason, the
    /// record is kept locally as `pending` and a temporary id comes back.
    pub async fn create<P: RecordPayload>(&self, payload: P) -> ResultEngine<RecordId> {
        if self.is_online() {
            let fields = serde_json::to_value(&payload)?;
            match self.remote_create(P::KIND, &fields).await {
                Ok(created) => {
                    tracing::debug!("created {} {} remotely", P::KIND.as_str(), created.id);
                    return Ok(created.id);
                }
                Err(err) => {
                    tracing::warn!(
                        "remote create of {} failed, keeping it locally: {err}",
                        P::KIND.as_str()
                    );
                }
            }
        }

        let record = StoredRecord::pending(&payload, Utc::now())?;
        let id = record.id.clone();
        self.local.insert(record).await?;
        tracing::debug!("stored {} {id} as pending", P::KIND.as_str());
        Ok(id)
    }

    /// Remote records of `owner` (none when offline or the remote fails)
    /// followed by the local records of `owner`, newest first.
    ///
    /// A local row whose id the remote already returned is left out.
    pub async fn list<P: RecordPayload>(&self, owner: &str) -> ResultEngine<Vec<Record<P>>> {
        let mut records: Vec<Record<P>> = Vec::new();

        if self.is_online() {
            match self.remote_list(P::KIND, owner).await {
                Ok(rows) => {
                    for row in rows {
                        let id = row.id.clone();
                        match row.into_record::<P>() {
                            Ok(record) => records.push(record),
                            Err(err) => {
                                tracing::warn!("skipping undecodable remote row {id}: {err}")
                            }
                        }
                    }
                }
                Err(err) => tracing::warn!("remote list of {} failed: {err}", P::KIND.as_str()),
            }
        }

        let remote_ids: HashSet<RecordId> = records.iter().map(|r| r.id.clone()).collect();
        let filter = RecordFilter::owner(owner).with_kind(P::KIND);
        for row in self.local.find(&filter).await? {
            if remote_ids.contains(&row.id) {
                continue;
            }
            records.push(row.into_record::<P>()?);
        }

        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(records)
    }

    /// Push every `pending` local record to the remote store, oldest first.
    ///
    /// Skipped when offline or when another sweep on this instance is still
    /// running. Each record ends `synced` (under its server id) or `failed`;
    /// one failure never stops the sweep. Transactions filed under a budget
    /// category that gets a server id are relinked to it, and the local copies
    /// of synced records are dropped once the sweep is done.
    pub async fn sync_pending(&self) -> ResultEngine<SweepOutcome> {
        if !self.is_online() {
            tracing::debug!("sync skipped: offline");
            return Ok(SweepOutcome::Skipped(SkipReason::Offline));
        }
        let Some(_guard) = SweepGuard::acquire(&self.sweeping) else {
            tracing::debug!("sync skipped: sweep already running");
            return Ok(SweepOutcome::Skipped(SkipReason::AlreadyRunning));
        };

        let pending = self
            .local
            .find(&RecordFilter::status(SyncStatus::Pending))
            .await?;
        tracing::info!("sync started: {} pending record(s)", pending.len());

        let mut report = SweepReport::default();
        let mut renamed: HashMap<RecordId, RecordId> = HashMap::new();
        for mut record in pending {
            report.attempted += 1;
            if record.kind == RecordKind::Transaction {
                relink_category(&mut record.payload, &renamed);
            }
            match self.remote_create(record.kind, &record.payload).await {
                Ok(created) => {
                    let patch = RecordPatch {
                        id: Some(created.id.clone()),
                        sync_status: Some(SyncStatus::Synced),
                        last_error: Some(None),
                        updated_at: Some(Utc::now()),
                        ..RecordPatch::default()
                    };
                    self.local.update(&record.id, patch).await?;
                    tracing::debug!("synced {} as {}", record.id, created.id);
                    report.synced += 1;

                    if record.kind == RecordKind::BudgetCategory {
                        renamed.insert(record.id.clone(), created.id.clone());
                        self.relink_local_transactions(&record.owner, &renamed)
                            .await?;
                    }
                }
                Err(err) => {
                    tracing::warn!("sync of {} failed: {err}", record.id);
                    let patch = RecordPatch {
                        sync_status: Some(SyncStatus::Failed),
                        last_error: Some(Some(err.to_string())),
                        updated_at: Some(Utc::now()),
                        ..RecordPatch::default()
                    };
                    self.local.update(&record.id, patch).await?;
                    report.failed += 1;
                }
            }
        }

        if report.synced > 0 {
            report.cleaned = self.cleanup_synced().await?;
        }

        tracing::info!(
            "sync finished: {} synced, {} failed",
            report.synced,
            report.failed
        );
        Ok(SweepOutcome::Completed(report))
    }

    /// Point local transactions of `owner` that still reference a temporary
    /// category id at the category's server id.
    async fn relink_local_transactions(
        &self,
        owner: &str,
        renamed: &HashMap<RecordId, RecordId>,
    ) -> ResultEngine<usize> {
        let filter = RecordFilter::owner(owner).with_kind(RecordKind::Transaction);
        let mut relinked = 0;
        for mut row in self.local.find(&filter).await? {
            if !relink_category(&mut row.payload, renamed) {
                continue;
            }
            let patch = RecordPatch {
                payload: Some(row.payload),
                updated_at: Some(Utc::now()),
                ..RecordPatch::default()
            };
            self.local.update(&row.id, patch).await?;
            relinked += 1;
        }
        if relinked > 0 {
            tracing::debug!("relinked {relinked} transaction(s) to synced categories");
        }
        Ok(relinked)
    }

    /// Counts of local records per status. Never touches the remote store.
    pub async fn sync_status(&self) -> ResultEngine<SyncCounts> {
        Ok(SyncCounts {
            pending: self
                .local
                .count(&RecordFilter::status(SyncStatus::Pending))
                .await?,
            failed: self
                .local
                .count(&RecordFilter::status(SyncStatus::Failed))
                .await?,
            synced: self
                .local
                .count(&RecordFilter::status(SyncStatus::Synced))
                .await?,
        })
    }

    /// Local records whose last sync attempt failed, with their error.
    pub async fn failures(&self) -> ResultEngine<Vec<StoredRecord>> {
        self.local
            .find(&RecordFilter::status(SyncStatus::Failed))
            .await
    }

    /// Manual retry: move every `failed` record back to `pending` so the next
    /// sweep picks it up. Returns how many records moved.
    pub async fn retry_failed(&self) -> ResultEngine<usize> {
        let failed = self.failures().await?;
        let now = Utc::now();
        for record in &failed {
            let patch = RecordPatch {
                sync_status: Some(SyncStatus::Pending),
                last_error: Some(None),
                updated_at: Some(now),
                ..RecordPatch::default()
            };
            self.local.update(&record.id, patch).await?;
        }
        if !failed.is_empty() {
            tracing::info!("{} failed record(s) queued for retry", failed.len());
        }
        Ok(failed.len())
    }

    /// Drop local copies of `synced` records. Safe to call any time, any
    /// number of times.
    pub async fn cleanup_synced(&self) -> ResultEngine<usize> {
        let synced = self
            .local
            .find(&RecordFilter::status(SyncStatus::Synced))
            .await?;
        for record in &synced {
            self.local.delete(&record.id).await?;
        }
        if !synced.is_empty() {
            tracing::debug!("removed {} synced record(s) from local store", synced.len());
        }
        Ok(synced.len())
    }
}

/// The builder for `SyncManager`.
#[derive(Default)]
pub struct SyncManagerBuilder {
    local: Option<Arc<dyn LocalStore>>,
    remote: Option<Arc<dyn RemoteStore>>,
    connectivity: Option<Arc<dyn Connectivity>>,
    remote_timeout: Option<Duration>,
}

impl SyncManagerBuilder {
    pub fn local_store(mut self, store: Arc<dyn LocalStore>) -> SyncManagerBuilder {
        self.local = Some(store);
        self
    }

    pub fn remote_store(mut self, store: Arc<dyn RemoteStore>) -> SyncManagerBuilder {
        self.remote = Some(store);
        self
    }

    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> SyncManagerBuilder {
        self.connectivity = Some(connectivity);
        self
    }

    /// Upper bound for a single remote call (default 10s).
    pub fn remote_timeout(mut self, timeout: Duration) -> SyncManagerBuilder {
        self.remote_timeout = Some(timeout);
        self
    }

    /// Construct `SyncManager`
    pub fn build(self) -> ResultEngine<SyncManager> {
        let missing = |what: &str| EngineError::MissingComponent(what.to_string());
        Ok(SyncManager {
            local: self.local.ok_or_else(|| missing("local store"))?,
            remote: self.remote.ok_or_else(|| missing("remote store"))?,
            connectivity: self.connectivity.ok_or_else(|| missing("connectivity"))?,
            remote_timeout: self.remote_timeout.unwrap_or(DEFAULT_REMOTE_TIMEOUT),
            sweeping: AtomicBool::new(false),
        })
    }
}
