//! Local record store schema.
//!
//! - `local_records`: records written on this device, keyed by their current
//!   id (temporary until synced, then the server id), with the business
//!   payload stored as JSON text.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum LocalRecords {
    Table,
    Id,
    Kind,
    Owner,
    Payload,
    SyncStatus,
    LastError,
    CreatedAt,
    UpdatedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(LocalRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(LocalRecords::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(LocalRecords::Kind).string().not_null())
                    .col(ColumnDef::new(LocalRecords::Owner).string().not_null())
                    .col(ColumnDef::new(LocalRecords::Payload).text().not_null())
                    .col(
                        ColumnDef::new(LocalRecords::SyncStatus)
                            .string()
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(LocalRecords::LastError).text())
                    .col(
                        ColumnDef::new(LocalRecords::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(LocalRecords::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-local_records-owner-kind")
                    .table(LocalRecords::Table)
                    .col(LocalRecords::Owner)
                    .col(LocalRecords::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-local_records-sync_status")
                    .table(LocalRecords::Table)
                    .col(LocalRecords::SyncStatus)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(LocalRecords::Table).to_owned())
            .await
    }
}
