//! Local record store contract.
//!
//! The sync manager only needs equality lookups and single-row writes, so the
//! trait stays small enough for any embedded store to implement. Writes to the
//! same id are last-write-wins.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{RecordId, RecordKind, ResultEngine, StoredRecord, SyncStatus};

mod local_records;
mod sqlite;

pub use sqlite::SqliteStore;

/// Equality filter; `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordFilter {
    pub owner: Option<String>,
    pub kind: Option<RecordKind>,
    pub status: Option<SyncStatus>,
}

impl RecordFilter {
    pub fn owner(owner: &str) -> Self {
        Self {
            owner: Some(owner.to_string()),
            ..Self::default()
        }
    }

    pub fn status(status: SyncStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn with_kind(mut self, kind: RecordKind) -> Self {
        self.kind = Some(kind);
        self
    }
}

/// Partial update merged into an existing row. `None` leaves a field as is.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecordPatch {
    /// Identity substitution: the row keeps its data under a new id.
    pub id: Option<RecordId>,
    pub sync_status: Option<SyncStatus>,
    /// `Some(None)` clears the stored error.
    pub last_error: Option<Option<String>>,
    /// Replacement business payload.
    pub payload: Option<serde_json::Value>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Insert (or overwrite) the row with `record.id`.
    async fn insert(&self, record: StoredRecord) -> ResultEngine<()>;

    /// Rows matching `filter`, oldest first (`created_at`, then `id`).
    async fn find(&self, filter: &RecordFilter) -> ResultEngine<Vec<StoredRecord>>;

    /// Merge `patch` into the row with `id`.
    ///
    /// Returns `EngineError::KeyNotFound` when no such row exists.
    async fn update(&self, id: &RecordId, patch: RecordPatch) -> ResultEngine<()>;

    /// Delete the row with `id`. Deleting a missing row is not an error.
    async fn delete(&self, id: &RecordId) -> ResultEngine<()>;

    async fn count(&self, filter: &RecordFilter) -> ResultEngine<u64>;
}
