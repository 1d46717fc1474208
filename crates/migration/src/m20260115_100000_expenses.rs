use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(Iden)]
enum Expenses {
    Table,
    Id,
    PayerId,
    TotalMinor,
    Currency,
    Description,
    OccurredAt,
    CreatedBy,
}

#[derive(Iden)]
enum SplitObligations {
    Table,
    Id,
    ExpenseId,
    OwerId,
    OwedToId,
    AmountMinor,
    Currency,
    IsPaid,
    PaidAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Expenses::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Expenses::PayerId).string().not_null())
                    .col(
                        ColumnDef::new(Expenses::TotalMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Expenses::Currency).string().not_null())
                    .col(ColumnDef::new(Expenses::Description).string())
                    .col(ColumnDef::new(Expenses::OccurredAt).timestamp().not_null())
                    .col(ColumnDef::new(Expenses::CreatedBy).string().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SplitObligations::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SplitObligations::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SplitObligations::ExpenseId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitObligations::OwerId).string().not_null())
                    .col(
                        ColumnDef::new(SplitObligations::OwedToId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitObligations::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitObligations::Currency)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SplitObligations::IsPaid)
                            .boolean()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SplitObligations::PaidAt).timestamp())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk-split_obligations-expense_id")
                            .from(SplitObligations::Table, SplitObligations::ExpenseId)
                            .to(Expenses::Table, Expenses::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_obligations-expense_id")
                    .table(SplitObligations::Table)
                    .col(SplitObligations::ExpenseId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-split_obligations-pair")
                    .table(SplitObligations::Table)
                    .col(SplitObligations::OwerId)
                    .col(SplitObligations::OwedToId)
                    .col(SplitObligations::IsPaid)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SplitObligations::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await?;
        Ok(())
    }
}
