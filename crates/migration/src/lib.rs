pub use sea_orm_migration::prelude::*;

mod m20260115_090000_accounts;
mod m20260115_100000_expenses;
mod m20260115_110000_transfers;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260115_090000_accounts::Migration),
            Box::new(m20260115_100000_expenses::Migration),
            Box::new(m20260115_110000_transfers::Migration),
        ]
    }
}
