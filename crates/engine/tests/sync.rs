use std::{
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use sea_orm::Database;
use serde_json::json;
use tokio::sync::{Notify, Semaphore};

use engine::{
    BudgetCategory, BudgetPeriod, ConnectivitySignal, Currency, EarningsSnapshot, EngineError,
    Goal, Income, LocalStore, Money, Record, RecordFilter, RecordId, RecordKind, RecordPatch,
    RemoteError, RemoteRecord, RemoteStore, SkipReason, SqliteStore, StoredRecord, SweepOutcome,
    SweepReport, SyncCounts, SyncManager, SyncScheduler, SyncStatus, Transaction,
    TransactionKind, budget_utilization,
};
use migration::MigratorTrait;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    Accept,
    Reject,
    /// Every second call fails.
    Alternate,
    /// Calls never complete.
    Hang,
}

struct FakeRemote {
    mode: Mutex<Mode>,
    calls: AtomicUsize,
    rows: Mutex<Vec<(RecordKind, RemoteRecord)>>,
    /// When set, every create waits for a permit.
    gate: Option<Arc<Semaphore>>,
    entered: Notify,
}

impl FakeRemote {
    fn new(mode: Mode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: AtomicUsize::new(0),
            rows: Mutex::new(Vec::new()),
            gate: None,
            entered: Notify::new(),
        }
    }

    fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new(Mode::Accept)
        }
    }

    fn set_mode(&self, mode: Mode) {
        *self.mode.lock().unwrap() = mode;
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn seed(&self, kind: RecordKind, id: &str, age_minutes: i64, fields: serde_json::Value) {
        let at = Utc::now() - ChronoDuration::minutes(age_minutes);
        self.rows.lock().unwrap().push((
            kind,
            RemoteRecord {
                id: RecordId::new(id),
                created_at: at,
                updated_at: at,
                fields,
            },
        ));
    }
}

#[async_trait]
impl RemoteStore for FakeRemote {
    async fn create(
        &self,
        kind: RecordKind,
        fields: &serde_json::Value,
    ) -> Result<RemoteRecord, RemoteError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        let mode = *self.mode.lock().unwrap();
        match mode {
            Mode::Reject => {
                return Err(RemoteError::Transport("connection reset".to_string()));
            }
            Mode::Alternate if call % 2 == 1 => {
                return Err(RemoteError::Rejected {
                    status: 422,
                    message: "invalid row".to_string(),
                });
            }
            Mode::Hang => std::future::pending::<()>().await,
            _ => {}
        }

        let now = Utc::now();
        let created = RemoteRecord {
            id: RecordId::new(format!("00000000-0000-4000-8000-{:012}", call + 1)),
            created_at: now,
            updated_at: now,
            fields: fields.clone(),
        };
        self.rows.lock().unwrap().push((kind, created.clone()));
        Ok(created)
    }

    async fn list(
        &self,
        kind: RecordKind,
        owner: &str,
        _order_by: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError> {
        if *self.mode.lock().unwrap() == Mode::Reject {
            return Err(RemoteError::Transport("connection reset".to_string()));
        }
        let mut rows: Vec<RemoteRecord> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, row)| *k == kind && row.fields["owner"] == owner)
            .map(|(_, row)| row.clone())
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

struct Harness {
    manager: Arc<SyncManager>,
    store: Arc<SqliteStore>,
    remote: Arc<FakeRemote>,
    signal: Arc<ConnectivitySignal>,
}

async fn harness(remote: FakeRemote, online: bool) -> Harness {
    harness_with_timeout(remote, online, Duration::from_secs(5)).await
}

async fn harness_with_timeout(remote: FakeRemote, online: bool, timeout: Duration) -> Harness {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();

    let store = Arc::new(SqliteStore::new(db));
    let remote = Arc::new(remote);
    let signal = Arc::new(ConnectivitySignal::new(online));
    let manager = SyncManager::builder()
        .local_store(store.clone())
        .remote_store(remote.clone())
        .connectivity(signal.clone())
        .remote_timeout(timeout)
        .build()
        .unwrap();

    Harness {
        manager: Arc::new(manager),
        store,
        remote,
        signal,
    }
}

fn income(owner: &str, amount: i64) -> Income {
    Income {
        owner: owner.to_string(),
        source: Some("Salary".to_string()),
        amount_minor: Some(Money::new(amount)),
        currency: Currency::Eur,
        received_on: None,
        note: None,
    }
}

fn expense(owner: &str, amount: i64) -> Transaction {
    Transaction {
        owner: owner.to_string(),
        kind: TransactionKind::Expense,
        amount_minor: Some(Money::new(amount)),
        currency: Currency::Eur,
        category_id: None,
        description: Some("Groceries".to_string()),
        occurred_on: None,
    }
}

fn completed(outcome: SweepOutcome) -> SweepReport {
    match outcome {
        SweepOutcome::Completed(report) => report,
        SweepOutcome::Skipped(reason) => panic!("sweep skipped: {reason:?}"),
    }
}

#[tokio::test]
async fn offline_create_is_kept_locally_as_pending() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;

    let id = h.manager.create(income("alice", 100_000)).await.unwrap();
    assert!(id.is_temporary());
    assert_eq!(h.remote.calls(), 0);

    let rows = h.store.find(&RecordFilter::owner("alice")).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);
    assert_eq!(rows[0].kind, RecordKind::Income);
    assert_eq!(rows[0].sync_status, SyncStatus::Pending);
    assert_eq!(rows[0].payload["amount_minor"], 100_000);
}

#[tokio::test]
async fn online_create_returns_server_id() {
    let h = harness(FakeRemote::new(Mode::Accept), true).await;

    let id = h.manager.create(expense("alice", 2_500)).await.unwrap();
    assert!(!id.is_temporary());
    assert_eq!(h.remote.calls(), 1);
    assert_eq!(h.store.count(&RecordFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn failed_remote_create_falls_back_to_local() {
    let h = harness(FakeRemote::new(Mode::Reject), true).await;

    let id = h.manager.create(income("alice", 500)).await.unwrap();
    assert!(id.is_temporary());
    assert_eq!(h.remote.calls(), 1);
    assert_eq!(
        h.manager.sync_status().await.unwrap(),
        SyncCounts {
            pending: 1,
            failed: 0,
            synced: 0,
        }
    );
}

#[tokio::test]
async fn sweep_is_skipped_while_offline() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    h.manager.create(income("alice", 1)).await.unwrap();

    let outcome = h.manager.sync_pending().await.unwrap();
    assert_eq!(outcome, SweepOutcome::Skipped(SkipReason::Offline));
    assert_eq!(h.remote.calls(), 0);
}

#[tokio::test]
async fn sweep_pushes_every_pending_record_and_replaces_ids() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    let mut temp_ids = Vec::new();
    for amount in [100, 200, 300] {
        temp_ids.push(h.manager.create(income("alice", amount)).await.unwrap());
    }

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(
        report,
        SweepReport {
            attempted: 3,
            synced: 3,
            failed: 0,
            cleaned: 3,
        }
    );
    assert_eq!(h.remote.calls(), 3);
    assert_eq!(h.manager.sync_status().await.unwrap(), SyncCounts::default());

    // Oldest first, so the remote saw them in creation order.
    let pushed: Vec<_> = h
        .remote
        .rows
        .lock()
        .unwrap()
        .iter()
        .map(|(_, row)| row.fields["amount_minor"].clone())
        .collect();
    assert_eq!(pushed, vec![json!(100), json!(200), json!(300)]);

    let listed = h.manager.list::<Income>("alice").await.unwrap();
    assert_eq!(listed.len(), 3);
    for record in &listed {
        assert!(!record.id.is_temporary());
        assert!(!temp_ids.contains(&record.id));
        assert_eq!(record.sync_status, SyncStatus::Synced);
    }
}

#[tokio::test]
async fn earnings_are_not_double_counted_after_a_sweep() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    h.manager.create(income("alice", 1_000)).await.unwrap();
    h.manager.create(expense("alice", 300)).await.unwrap();

    let available = |incomes: &[Record<Income>], txs: &[Record<Transaction>]| {
        EarningsSnapshot::by_currency(
            incomes.iter().map(|r| &r.payload),
            txs.iter().map(|r| &r.payload),
            std::iter::empty::<&Goal>(),
        )[0]
        .available
    };

    let incomes = h.manager.list::<Income>("alice").await.unwrap();
    let txs = h.manager.list::<Transaction>("alice").await.unwrap();
    assert_eq!(available(&incomes, &txs), Money::new(700));

    h.signal.set_online(true);
    let scheduler = SyncScheduler::new(h.manager.clone(), &*h.signal, Duration::from_millis(20));
    tokio::time::timeout(
        Duration::from_millis(200),
        scheduler.run(std::future::pending::<()>()),
    )
    .await
    .unwrap_err();

    let incomes = h.manager.list::<Income>("alice").await.unwrap();
    let txs = h.manager.list::<Transaction>("alice").await.unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(txs.len(), 1);
    assert_eq!(available(&incomes, &txs), Money::new(700));
    assert_eq!(h.store.count(&RecordFilter::default()).await.unwrap(), 0);
}

#[tokio::test]
async fn sweep_relinks_expenses_to_synced_categories() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    let category_id = h
        .manager
        .create(BudgetCategory {
            owner: "alice".to_string(),
            name: "Groceries".to_string(),
            limit_minor: Some(Money::new(1_000)),
            currency: Currency::Eur,
            period: BudgetPeriod::Monthly,
        })
        .await
        .unwrap();
    assert!(category_id.is_temporary());

    let mut filed = expense("alice", 250);
    filed.category_id = Some(category_id.to_string());
    h.manager.create(filed.clone()).await.unwrap();

    let categories = h.manager.list::<BudgetCategory>("alice").await.unwrap();
    let txs = h.manager.list::<Transaction>("alice").await.unwrap();
    assert_eq!(
        budget_utilization(&categories[0], txs.iter().map(|r| &r.payload)),
        25
    );

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.synced, 2);

    let categories = h.manager.list::<BudgetCategory>("alice").await.unwrap();
    let txs = h.manager.list::<Transaction>("alice").await.unwrap();
    assert_eq!(categories.len(), 1);
    assert!(!categories[0].id.is_temporary());
    assert_eq!(
        txs[0].payload.category_id.as_deref(),
        Some(categories[0].id.as_str())
    );
    assert_eq!(
        budget_utilization(&categories[0], txs.iter().map(|r| &r.payload)),
        25
    );
}

#[tokio::test]
async fn failed_expenses_keep_the_relinked_category() {
    let h = harness(FakeRemote::new(Mode::Alternate), false).await;
    let category_id = h
        .manager
        .create(BudgetCategory {
            owner: "alice".to_string(),
            name: "Rent".to_string(),
            limit_minor: Some(Money::new(100_000)),
            currency: Currency::Eur,
            period: BudgetPeriod::Monthly,
        })
        .await
        .unwrap();
    let mut filed = expense("alice", 80_000);
    filed.category_id = Some(category_id.to_string());
    let expense_id = h.manager.create(filed).await.unwrap();

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!((report.synced, report.failed), (1, 1));

    let failures = h.manager.failures().await.unwrap();
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].id, expense_id);
    let server_category = h.remote.rows.lock().unwrap()[0].1.id.clone();
    assert_eq!(
        failures[0].payload["category_id"],
        json!(server_category.as_str())
    );
}

#[tokio::test]
async fn sweep_records_failures_per_row() {
    let h = harness(FakeRemote::new(Mode::Alternate), false).await;
    let mut temp_ids = Vec::new();
    for amount in [1, 2, 3, 4] {
        temp_ids.push(h.manager.create(income("alice", amount)).await.unwrap());
    }

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.attempted, 4);
    assert_eq!(report.synced, 2);
    assert_eq!(report.failed, 2);

    let failures = h.manager.failures().await.unwrap();
    let failed_ids: Vec<_> = failures.iter().map(|r| r.id.clone()).collect();
    assert_eq!(failed_ids, vec![temp_ids[1].clone(), temp_ids[3].clone()]);
    for row in &failures {
        let error = row.last_error.as_deref().unwrap();
        assert!(error.contains("invalid row"), "unexpected error: {error}");
    }

    assert_eq!(report.cleaned, 2);
    assert_eq!(
        h.manager.sync_status().await.unwrap(),
        SyncCounts {
            pending: 0,
            failed: 2,
            synced: 0,
        }
    );
}

#[tokio::test]
async fn failed_records_wait_for_manual_retry() {
    let h = harness(FakeRemote::new(Mode::Reject), false).await;
    h.manager.create(income("alice", 10)).await.unwrap();
    h.manager.create(income("alice", 20)).await.unwrap();

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.failed, 2);

    h.remote.set_mode(Mode::Accept);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report, SweepReport::default());
    assert_eq!(h.remote.calls(), 2);

    assert_eq!(h.manager.retry_failed().await.unwrap(), 2);
    let counts = h.manager.sync_status().await.unwrap();
    assert_eq!((counts.pending, counts.failed), (2, 0));
    assert!(
        h.store
            .find(&RecordFilter::status(SyncStatus::Pending))
            .await
            .unwrap()
            .iter()
            .all(|r| r.last_error.is_none())
    );

    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.synced, 2);
    assert_eq!(h.manager.retry_failed().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_sweeps_run_once() {
    let gate = Arc::new(Semaphore::new(0));
    let h = harness(FakeRemote::gated(gate.clone()), false).await;
    h.manager.create(income("alice", 1)).await.unwrap();
    h.manager.create(income("alice", 2)).await.unwrap();
    h.signal.set_online(true);

    let first = tokio::spawn({
        let manager = h.manager.clone();
        async move { manager.sync_pending().await }
    });
    h.remote.entered.notified().await;

    let second = h.manager.sync_pending().await.unwrap();
    assert_eq!(second, SweepOutcome::Skipped(SkipReason::AlreadyRunning));

    gate.add_permits(2);
    let report = completed(first.await.unwrap().unwrap());
    assert_eq!(report.synced, 2);
    assert_eq!(h.remote.calls(), 2);

    // The guard is released once the sweep ends.
    let again = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(again, SweepReport::default());
}

#[tokio::test]
async fn hung_remote_call_times_out_as_failure() {
    let h = harness_with_timeout(
        FakeRemote::new(Mode::Hang),
        false,
        Duration::from_millis(50),
    )
    .await;
    h.manager.create(income("alice", 1)).await.unwrap();

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.failed, 1);

    let failures = h.manager.failures().await.unwrap();
    let error = failures[0].last_error.as_deref().unwrap();
    assert!(error.contains("timed out"), "unexpected error: {error}");

    // A hung create while online still lands locally.
    let id = h.manager.create(income("alice", 2)).await.unwrap();
    assert!(id.is_temporary());
}

#[tokio::test]
async fn list_merges_remote_and_local_newest_first() {
    let h = harness(FakeRemote::new(Mode::Accept), true).await;
    h.remote.seed(
        RecordKind::Income,
        "00000000-0000-4000-8000-00000000aaaa",
        60,
        serde_json::to_value(income("alice", 7)).unwrap(),
    );
    h.remote.seed(
        RecordKind::Income,
        "00000000-0000-4000-8000-00000000bbbb",
        30,
        serde_json::to_value(income("bob", 8)).unwrap(),
    );

    h.signal.set_online(false);
    let local_id = h.manager.create(income("alice", 9)).await.unwrap();
    h.signal.set_online(true);

    let listed = h.manager.list::<Income>("alice").await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, local_id);
    assert_eq!(listed[0].sync_status, SyncStatus::Pending);
    assert_eq!(listed[1].sync_status, SyncStatus::Synced);
    assert_eq!(listed[1].payload.amount_minor, Some(Money::new(7)));

    // Listing has no side effects.
    let again = h.manager.list::<Income>("alice").await.unwrap();
    assert_eq!(again, listed);
    assert_eq!(h.remote.calls(), 0);

    let goals = h.manager.list::<Goal>("alice").await.unwrap();
    assert!(goals.is_empty());
}

#[tokio::test]
async fn list_survives_remote_failures_and_bad_rows() {
    let h = harness(FakeRemote::new(Mode::Accept), true).await;
    h.remote.seed(
        RecordKind::Goal,
        "00000000-0000-4000-8000-00000000cccc",
        5,
        json!({ "owner": "alice", "target_minor": 100, "currency": "EUR" }),
    );
    h.remote.seed(
        RecordKind::Goal,
        "00000000-0000-4000-8000-00000000dddd",
        4,
        json!({
            "owner": "alice",
            "name": "Holiday",
            "target_minor": 500_000,
            "currency": "EUR",
        }),
    );
    h.remote.seed(
        RecordKind::Goal,
        "00000000-0000-4000-8000-00000000eeee",
        3,
        json!({ "owner": "alice", "name": "Car", "target_minor": 900_000 }),
    );

    let goals = h.manager.list::<Goal>("alice").await.unwrap();
    assert_eq!(goals.len(), 1);
    assert_eq!(goals[0].payload.name, "Holiday");
    assert_eq!(goals[0].payload.current_minor, None);

    h.remote.set_mode(Mode::Reject);
    h.signal.set_online(false);
    h.manager.create(income("alice", 3)).await.unwrap();
    h.signal.set_online(true);

    let incomes = h.manager.list::<Income>("alice").await.unwrap();
    assert_eq!(incomes.len(), 1);
    assert!(incomes[0].id.is_temporary());
}

#[tokio::test]
async fn status_and_cleanup_are_idempotent() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    h.manager.create(income("alice", 1)).await.unwrap();
    h.manager.create(expense("alice", 2)).await.unwrap();

    let first = h.manager.sync_status().await.unwrap();
    let second = h.manager.sync_status().await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.pending, 2);
    assert_eq!(h.remote.calls(), 0);

    h.signal.set_online(true);
    let report = completed(h.manager.sync_pending().await.unwrap());
    assert_eq!(report.cleaned, 2);
    assert_eq!(h.manager.sync_status().await.unwrap(), SyncCounts::default());

    // A synced copy left behind by an interrupted sweep.
    let leftover = StoredRecord::pending(&income("alice", 3), Utc::now()).unwrap();
    let leftover_id = leftover.id.clone();
    h.store.insert(leftover).await.unwrap();
    h.store
        .update(
            &leftover_id,
            RecordPatch {
                sync_status: Some(SyncStatus::Synced),
                ..RecordPatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(h.manager.cleanup_synced().await.unwrap(), 1);
    assert_eq!(h.manager.cleanup_synced().await.unwrap(), 0);
    assert_eq!(h.manager.sync_status().await.unwrap(), SyncCounts::default());
}

#[tokio::test]
async fn scheduler_sweeps_on_reconnect() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    h.manager.create(income("alice", 42)).await.unwrap();

    let scheduler = SyncScheduler::new(h.manager.clone(), &*h.signal, Duration::from_secs(3600));
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let task = tokio::spawn(scheduler.run(async move {
        let _ = stop_rx.await;
    }));

    h.signal.set_online(true);
    let synced = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if h.remote.calls() == 1 && h.manager.sync_status().await.unwrap().pending == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(synced.is_ok(), "scheduler never swept");
    assert_eq!(h.remote.calls(), 1);

    stop_tx.send(()).unwrap();
    task.await.unwrap();
}

#[tokio::test]
async fn store_update_substitutes_ids() {
    let h = harness(FakeRemote::new(Mode::Accept), false).await;
    let record = StoredRecord::pending(&income("alice", 5), Utc::now()).unwrap();
    let temp_id = record.id.clone();
    h.store.insert(record).await.unwrap();

    let server_id = RecordId::new("00000000-0000-4000-8000-000000000042");
    h.store
        .update(
            &temp_id,
            RecordPatch {
                id: Some(server_id.clone()),
                sync_status: Some(SyncStatus::Synced),
                ..RecordPatch::default()
            },
        )
        .await
        .unwrap();

    let rows = h.store.find(&RecordFilter::default()).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, server_id);
    assert_eq!(rows[0].sync_status, SyncStatus::Synced);
    assert_eq!(rows[0].payload["amount_minor"], 5);

    let err = h
        .store
        .update(&temp_id, RecordPatch::default())
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::KeyNotFound(temp_id.to_string()));

    h.store.delete(&temp_id).await.unwrap();
    h.store.delete(&server_id).await.unwrap();
    assert_eq!(h.store.count(&RecordFilter::default()).await.unwrap(), 0);
}
