use sea_orm_migration::prelude::*;

use crate::m20260115_090000_accounts::Accounts;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Transfers {
    Table,
    Id,
    FromAccountId,
    ToAccountId,
    FromUserId,
    ToUserId,
    AmountMinor,
    Currency,
    Kind,
    Note,
    IdempotencyKey,
    RecordedAt,
    CreatedBy,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Transfers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transfers::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(Transfers::FromAccountId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::ToAccountId).string().not_null())
                    .col(ColumnDef::new(Transfers::FromUserId).string().not_null())
                    .col(ColumnDef::new(Transfers::ToUserId).string().not_null())
                    .col(
                        ColumnDef::new(Transfers::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transfers::Currency).string().not_null())
                    .col(ColumnDef::new(Transfers::Kind).string().not_null())
                    .col(ColumnDef::new(Transfers::Note).string())
                    .col(ColumnDef::new(Transfers::IdempotencyKey).string())
                    .col(ColumnDef::new(Transfers::RecordedAt).timestamp().not_null())
                    .col(ColumnDef::new(Transfers::CreatedBy).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfers-from_account_id")
                            .from(Transfers::Table, Transfers::FromAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-transfers-to_account_id")
                            .from(Transfers::Table, Transfers::ToAccountId)
                            .to(Accounts::Table, Accounts::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-from_account_id")
                    .table(Transfers::Table)
                    .col(Transfers::FromAccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-to_account_id")
                    .table(Transfers::Table)
                    .col(Transfers::ToAccountId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transfers-settlement-pair")
                    .table(Transfers::Table)
                    .col(Transfers::Kind)
                    .col(Transfers::FromUserId)
                    .col(Transfers::ToUserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("uq-transfers-created_by-idempotency_key")
                    .table(Transfers::Table)
                    .col(Transfers::CreatedBy)
                    .col(Transfers::IdempotencyKey)
                    .unique()
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Transfers::Table).to_owned())
            .await?;
        Ok(())
    }
}
