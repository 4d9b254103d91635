//! Record envelope and sync metadata.
//!
//! A `Record<P>` wraps a business payload `P` (such as [`crate::Income`]) with
//! the fields the sync layer owns: identifier, status and timestamps. Payloads
//! never carry sync metadata, so serializing a payload yields exactly what the
//! remote store should receive.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::{Currency, EngineError, ResultEngine};

const TEMP_PREFIX: &str = "local_";

/// Last timestamp component handed out, so ids minted within the same
/// millisecond still sort in creation order.
static LAST_TEMP_MILLIS: AtomicU64 = AtomicU64::new(0);

/// Record identifier: either server-assigned (UUID) or temporary.
///
/// Temporary ids look like `local_0192a3b4c5d6e_1f2e3d4c5b6a`: a 13 hex digit
/// monotonic millisecond component followed by 12 random hex digits. Server ids
/// are UUIDs and can never start with `local_`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Mint a fresh temporary identifier.
    pub fn temporary() -> Self {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        let previous = LAST_TEMP_MILLIS
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or(now);
        let millis = now.max(previous + 1);
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{TEMP_PREFIX}{millis:013x}_{}", &random[..12]))
    }

    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_PREFIX)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for RecordId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Kinds of user-owned financial records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordKind {
    Income,
    Transaction,
    Asset,
    Goal,
    BudgetCategory,
}

impl RecordKind {
    pub const ALL: [RecordKind; 5] = [
        RecordKind::Income,
        RecordKind::Transaction,
        RecordKind::Asset,
        RecordKind::Goal,
        RecordKind::BudgetCategory,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Transaction => "transaction",
            Self::Asset => "asset",
            Self::Goal => "goal",
            Self::BudgetCategory => "budget_category",
        }
    }

    /// Remote collection (table) name for this kind.
    pub fn collection(self) -> &'static str {
        match self {
            Self::Income => "incomes",
            Self::Transaction => "transactions",
            Self::Asset => "assets",
            Self::Goal => "goals",
            Self::BudgetCategory => "budget_categories",
        }
    }
}

impl TryFrom<&str> for RecordKind {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        RecordKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| EngineError::InvalidRecord(format!("invalid record kind: {value}")))
    }
}

/// Reconciliation state of a locally originated record.
///
/// `Pending` → `Synced` | `Failed` only through a sync sweep;
/// `Failed` → `Pending` only through an explicit retry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncStatus {
    Pending,
    Synced,
    Failed,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Synced => "synced",
            Self::Failed => "failed",
        }
    }
}

impl TryFrom<&str> for SyncStatus {
    type Error = EngineError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "pending" => Ok(Self::Pending),
            "synced" => Ok(Self::Synced),
            "failed" => Ok(Self::Failed),
            other => Err(EngineError::InvalidRecord(format!(
                "invalid sync status: {other}"
            ))),
        }
    }
}

/// Business fields of one record kind.
pub trait RecordPayload: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    fn owner(&self) -> &str;

    fn currency(&self) -> Currency;
}

/// A typed record: sync metadata around a business payload.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Record<P> {
    pub id: RecordId,
    pub sync_status: SyncStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: P,
}

/// Untyped row of the local record store.
#[derive(Clone, Debug, PartialEq)]
pub struct StoredRecord {
    pub id: RecordId,
    pub kind: RecordKind,
    pub owner: String,
    pub payload: serde_json::Value,
    pub sync_status: SyncStatus,
    pub last_error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredRecord {
    /// Wrap a payload as a new `pending` row with a temporary id.
    pub fn pending<P: RecordPayload>(payload: &P, now: DateTime<Utc>) -> ResultEngine<Self> {
        Ok(Self {
            id: RecordId::temporary(),
            kind: P::KIND,
            owner: payload.owner().to_string(),
            payload: serde_json::to_value(payload)?,
            sync_status: SyncStatus::Pending,
            last_error: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Decode the row into a typed record of kind `P`.
    pub fn into_record<P: RecordPayload>(self) -> ResultEngine<Record<P>> {
        if self.kind != P::KIND {
            return Err(EngineError::InvalidRecord(format!(
                "record {} is a {}, not a {}",
                self.id,
                self.kind.as_str(),
                P::KIND.as_str()
            )));
        }
        Ok(Record {
            id: self.id,
            sync_status: self.sync_status,
            created_at: self.created_at,
            updated_at: self.updated_at,
            payload: serde_json::from_value(self.payload)?,
        })
    }
}
