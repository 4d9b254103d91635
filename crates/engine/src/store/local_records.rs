//! `local_records` table: records written on this device.

use sea_orm::{ActiveValue, entity::prelude::*};

use crate::{EngineError, RecordId, RecordKind, StoredRecord, SyncStatus};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "local_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,
    pub kind: String,
    pub owner: String,
    pub payload: String,
    pub sync_status: String,
    pub last_error: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<&StoredRecord> for ActiveModel {
    type Error = EngineError;

    fn try_from(record: &StoredRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ActiveValue::Set(record.id.as_str().to_string()),
            kind: ActiveValue::Set(record.kind.as_str().to_string()),
            owner: ActiveValue::Set(record.owner.clone()),
            payload: ActiveValue::Set(serde_json::to_string(&record.payload)?),
            sync_status: ActiveValue::Set(record.sync_status.as_str().to_string()),
            last_error: ActiveValue::Set(record.last_error.clone()),
            created_at: ActiveValue::Set(record.created_at),
            updated_at: ActiveValue::Set(record.updated_at),
        })
    }
}

impl TryFrom<Model> for StoredRecord {
    type Error = EngineError;

    fn try_from(model: Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: RecordId::new(model.id),
            kind: RecordKind::try_from(model.kind.as_str())?,
            owner: model.owner,
            payload: serde_json::from_str(&model.payload)?,
            sync_status: SyncStatus::try_from(model.sync_status.as_str())?,
            last_error: model.last_error,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
