//! Account lifecycle, audit listing and reconciliation.

use sea_orm::{
    Condition, QueryFilter, QueryOrder, QuerySelect, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use uuid::Uuid;

use crate::{
    Account, Currency, EngineError, ResultEngine, TransferRecord, accounts, transfers,
    util::normalize_required_name,
};

use super::{Engine, with_tx};

impl Engine {
    /// Creates an account for `owner_id` with an opening balance.
    ///
    /// The opening balance is remembered separately from the running balance
    /// so reconciliation can replay the audit trail on top of it.
    pub async fn new_account(
        &self,
        name: &str,
        owner_id: &str,
        opening_balance_minor: i64,
    ) -> ResultEngine<Uuid> {
        let name = normalize_required_name(name, "account")?;
        let owner_id = normalize_required_name(owner_id, "owner")?;
        if opening_balance_minor < 0 {
            return Err(EngineError::InvalidAmount(
                "opening_balance_minor must be >= 0".to_string(),
            ));
        }

        with_tx!(self, |db_tx| {
            let exists = accounts::Entity::find()
                .filter(accounts::Column::OwnerId.eq(owner_id.clone()))
                .filter(Expr::cust("LOWER(name)").eq(name.to_lowercase()))
                .one(&db_tx)
                .await?
                .is_some();
            if exists {
                return Err(EngineError::ExistingKey(name.clone()));
            }

            let account = Account::new(
                name.clone(),
                owner_id.clone(),
                opening_balance_minor,
                Currency::default(),
            );
            let account_id = account.id;
            accounts::ActiveModel::from(&account).insert(&db_tx).await?;
            Ok(account_id)
        })
    }

    /// Returns an account snapshot. Owner-only; anyone else sees the same
    /// not-found error as for a missing id.
    pub async fn account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<Account> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::KeyNotFound("account not exists".to_string()));
            }
            Account::try_from(model)
        })
    }

    /// Archives an account. Archived accounts keep their history but reject
    /// any further ledger operation.
    pub async fn archive_account(&self, account_id: Uuid, user_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::KeyNotFound("account not exists".to_string()));
            }
            let res = accounts::Entity::update_many()
                .col_expr(accounts::Column::Archived, Expr::value(true))
                .col_expr(accounts::Column::Version, Expr::value(model.version + 1))
                .filter(accounts::Column::Id.eq(account_id.to_string()))
                .filter(accounts::Column::Version.eq(model.version))
                .exec(&db_tx)
                .await?;
            if res.rows_affected != 1 {
                return Err(EngineError::Conflict(
                    "account was modified concurrently".to_string(),
                ));
            }
            Ok(())
        })
    }

    /// Lists the audit trail touching an account, newest first. Owner-only.
    pub async fn list_transfers_for_account(
        &self,
        account_id: Uuid,
        user_id: &str,
        limit: u64,
    ) -> ResultEngine<Vec<TransferRecord>> {
        with_tx!(self, |db_tx| {
            let model = self.require_account(&db_tx, account_id).await?;
            if model.owner_id != user_id {
                return Err(EngineError::KeyNotFound("account not exists".to_string()));
            }

            let rows = transfers::Entity::find()
                .filter(
                    Condition::any()
                        .add(transfers::Column::FromAccountId.eq(account_id.to_string()))
                        .add(transfers::Column::ToAccountId.eq(account_id.to_string())),
                )
                .order_by_desc(transfers::Column::RecordedAt)
                .limit(limit)
                .all(&db_tx)
                .await?;
            rows.into_iter()
                .map(TransferRecord::try_from)
                .collect::<ResultEngine<Vec<_>>>()
        })
    }

    /// Recomputes the running balance of every account owned by `owner_id`
    /// from the audit trail (`opening + transfers in − transfers out`).
    ///
    /// Repair/testing only: the running balance is the source of truth in
    /// normal operation and is only ever written by the ledger commit path.
    pub async fn recompute_balances(&self, owner_id: &str) -> ResultEngine<()> {
        with_tx!(self, |db_tx| {
            let account_models = accounts::Entity::find()
                .filter(accounts::Column::OwnerId.eq(owner_id.to_string()))
                .all(&db_tx)
                .await?;

            for model in account_models {
                let rows = transfers::Entity::find()
                    .filter(
                        Condition::any()
                            .add(transfers::Column::FromAccountId.eq(model.id.clone()))
                            .add(transfers::Column::ToAccountId.eq(model.id.clone())),
                    )
                    .all(&db_tx)
                    .await?;

                let mut balance_minor = model.opening_balance_minor;
                for row in rows {
                    if row.to_account_id == model.id {
                        balance_minor += row.amount_minor;
                    }
                    if row.from_account_id == model.id {
                        balance_minor -= row.amount_minor;
                    }
                }

                accounts::Entity::update_many()
                    .col_expr(accounts::Column::BalanceMinor, Expr::value(balance_minor))
                    .col_expr(accounts::Column::Version, Expr::value(model.version + 1))
                    .filter(accounts::Column::Id.eq(model.id.clone()))
                    .exec(&db_tx)
                    .await?;
            }

            Ok(())
        })
    }
}
