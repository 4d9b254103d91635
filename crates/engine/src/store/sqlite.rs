use async_trait::async_trait;
use sea_orm::{
    PaginatorTrait, QueryFilter, QueryOrder, Select,
    prelude::*,
    sea_query::{Expr, OnConflict},
};

use crate::{EngineError, RecordId, ResultEngine, StoredRecord};

use super::{LocalStore, RecordFilter, RecordPatch, local_records};

/// `LocalStore` backed by the `local_records` table of a sea-orm connection.
///
/// The schema is created by the `migration` crate.
#[derive(Clone, Debug)]
pub struct SqliteStore {
    database: DatabaseConnection,
}

impl SqliteStore {
    pub fn new(database: DatabaseConnection) -> Self {
        Self { database }
    }

    fn select(filter: &RecordFilter) -> Select<local_records::Entity> {
        let mut query = local_records::Entity::find();
        if let Some(owner) = &filter.owner {
            query = query.filter(local_records::Column::Owner.eq(owner.as_str()));
        }
        if let Some(kind) = filter.kind {
            query = query.filter(local_records::Column::Kind.eq(kind.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(local_records::Column::SyncStatus.eq(status.as_str()));
        }
        query
    }
}

#[async_trait]
impl LocalStore for SqliteStore {
    async fn insert(&self, record: StoredRecord) -> ResultEngine<()> {
        let model = local_records::ActiveModel::try_from(&record)?;
        local_records::Entity::insert(model)
            .on_conflict(
                OnConflict::column(local_records::Column::Id)
                    .update_columns([
                        local_records::Column::Kind,
                        local_records::Column::Owner,
                        local_records::Column::Payload,
                        local_records::Column::SyncStatus,
                        local_records::Column::LastError,
                        local_records::Column::CreatedAt,
                        local_records::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(&self.database)
            .await?;
        Ok(())
    }

    async fn find(&self, filter: &RecordFilter) -> ResultEngine<Vec<StoredRecord>> {
        Self::select(filter)
            .order_by_asc(local_records::Column::CreatedAt)
            .order_by_asc(local_records::Column::Id)
            .all(&self.database)
            .await?
            .into_iter()
            .map(StoredRecord::try_from)
            .collect()
    }

    async fn update(&self, id: &RecordId, patch: RecordPatch) -> ResultEngine<()> {
        let not_found = || EngineError::KeyNotFound(id.to_string());

        let mut update = local_records::Entity::update_many()
            .filter(local_records::Column::Id.eq(id.as_str()));
        let mut touched = false;
        if let Some(new_id) = patch.id {
            update = update.col_expr(
                local_records::Column::Id,
                Expr::value(new_id.as_str().to_string()),
            );
            touched = true;
        }
        if let Some(status) = patch.sync_status {
            update = update.col_expr(
                local_records::Column::SyncStatus,
                Expr::value(status.as_str().to_string()),
            );
            touched = true;
        }
        if let Some(last_error) = patch.last_error {
            update =
                update.col_expr(local_records::Column::LastError, Expr::value(last_error));
            touched = true;
        }
        if let Some(payload) = patch.payload {
            update = update.col_expr(
                local_records::Column::Payload,
                Expr::value(serde_json::to_string(&payload)?),
            );
            touched = true;
        }
        if let Some(updated_at) = patch.updated_at {
            update =
                update.col_expr(local_records::Column::UpdatedAt, Expr::value(updated_at));
            touched = true;
        }

        if !touched {
            // Nothing to merge, but the row must still exist.
            return local_records::Entity::find_by_id(id.as_str())
                .one(&self.database)
                .await?
                .map(|_| ())
                .ok_or_else(not_found);
        }

        let result = update.exec(&self.database).await?;
        if result.rows_affected == 0 {
            return Err(not_found());
        }
        Ok(())
    }

    async fn delete(&self, id: &RecordId) -> ResultEngine<()> {
        local_records::Entity::delete_by_id(id.as_str())
            .exec(&self.database)
            .await?;
        Ok(())
    }

    async fn count(&self, filter: &RecordFilter) -> ResultEngine<u64> {
        Ok(Self::select(filter).count(&self.database).await?)
    }
}
