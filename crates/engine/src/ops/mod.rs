use sea_orm::{DatabaseConnection, DatabaseTransaction, QueryFilter, prelude::*};
use uuid::Uuid;

use crate::{EngineError, ResultEngine, obligations};

mod accounts;
mod debts;
mod expenses;
mod ledger;
mod settlements;

/// Run a block inside a DB transaction, committing on success and rolling
/// back (on drop) when the block returns an error.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = $self.database.begin().await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

/// The split/settlement engine.
///
/// Holds only the store handle; every read and write goes straight to the
/// database, so concurrent engines over the same store stay consistent (the
/// commit path is guarded by version-conditional updates).
#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    pub(crate) async fn require_account(
        &self,
        db: &DatabaseTransaction,
        account_id: Uuid,
    ) -> ResultEngine<crate::accounts::Model> {
        crate::accounts::Entity::find_by_id(account_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))
    }

    pub(crate) async fn require_obligation(
        &self,
        db: &DatabaseTransaction,
        obligation_id: Uuid,
    ) -> ResultEngine<obligations::Model> {
        obligations::Entity::find_by_id(obligation_id.to_string())
            .one(db)
            .await?
            .ok_or_else(|| EngineError::KeyNotFound("obligation not exists".to_string()))
    }

    pub(crate) async fn obligations_for_expense_tx(
        &self,
        db: &DatabaseTransaction,
        expense_id: Uuid,
    ) -> ResultEngine<Vec<obligations::Model>> {
        obligations::Entity::find()
            .filter(obligations::Column::ExpenseId.eq(expense_id.to_string()))
            .all(db)
            .await
            .map_err(Into::into)
    }
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        Ok(Engine {
            database: self.database,
        })
    }
}
