//! Remote CRUD contract.
//!
//! The hosted backend is an external collaborator: it assigns ids, enforces
//! row-level security and owns the durable copy of synced records. The engine
//! only needs "create a row" and "list rows for an owner".

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::{Record, RecordId, RecordKind, RecordPayload, ResultEngine, SyncStatus};

/// Remote-side failures. These never escape the sync manager as errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
}

impl RemoteError {
    /// `true` when the backend answered and refused the request (4xx).
    ///
    /// The sync manager does not act on this: rejected and transient failures
    /// both end as `failed` and are retried only on request.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Rejected { status, .. } if (400..500).contains(status))
    }
}

/// A row as returned by the remote store.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteRecord {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Business fields.
    pub fields: serde_json::Value,
}

impl RemoteRecord {
    /// Decode into a typed record; remote rows are `synced` by definition.
    pub fn into_record<P: RecordPayload>(self) -> ResultEngine<Record<P>> {
        Ok(Record {
            id: self.id,
            sync_status: SyncStatus::Synced,
            created_at: self.created_at,
            updated_at: self.updated_at,
            payload: serde_json::from_value(self.fields)?,
        })
    }
}

#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create a row of `kind` from business `fields`; returns the stored row
    /// including its server-assigned id.
    async fn create(
        &self,
        kind: RecordKind,
        fields: &serde_json::Value,
    ) -> Result<RemoteRecord, RemoteError>;

    /// Rows of `kind` belonging to `owner`, ordered by `order_by` descending.
    async fn list(
        &self,
        kind: RecordKind,
        owner: &str,
        order_by: &str,
    ) -> Result<Vec<RemoteRecord>, RemoteError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_client_errors_are_rejections() {
        let rejected = RemoteError::Rejected {
            status: 422,
            message: "amount must be positive".to_string(),
        };
        let server = RemoteError::Rejected {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert!(rejected.is_rejection());
        assert!(!server.is_rejection());
        assert!(!RemoteError::Transport("connection refused".to_string()).is_rejection());
        assert!(!RemoteError::Timeout(Duration::from_secs(1)).is_rejection());
    }
}
