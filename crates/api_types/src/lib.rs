//! Wire types of the hosted record API.
//!
//! Each record kind lives in its own collection (`incomes`, `transactions`,
//! `assets`, `goals`, `budget_categories`). Rows are flat JSON objects: the
//! server-owned columns below plus the business fields of the kind.

use serde::{Deserialize, Serialize};

/// Error body returned with any non-success status.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

pub mod record {
    use chrono::{DateTime, Utc};
    use serde_json::{Map, Value};

    use super::*;

    /// A stored row: server-assigned id and timestamps plus business fields.
    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    pub struct RecordView {
        pub id: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
        #[serde(flatten)]
        pub fields: Map<String, Value>,
    }

    /// Query string of `GET /records/{collection}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecordListQuery {
        pub owner: String,
        /// Column to sort by, newest first.
        pub order: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RecordListResponse {
        pub records: Vec<RecordView>,
    }
}
