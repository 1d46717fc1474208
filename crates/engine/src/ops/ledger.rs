//! The ledger executor: the sole mutation path for account balances,
//! obligation paid-flags and transfer audit rows.
//!
//! A commit runs three strictly ordered phases inside one store transaction:
//!
//! 1. gather & validate: load every touched row in its current state and
//!    reject bad batches before anything is written;
//! 2. build: pure computation of the full mutation batch, including the
//!    conservation checks that must never fail;
//! 3. apply: conditional updates + inserts, then the store commit. Either
//!    every mutation becomes visible or none does.
//!
//! Account updates carry a `WHERE version = <gathered>` condition and
//! obligation flips a `WHERE is_paid = false` condition, so a concurrent
//! writer turns into a typed `Conflict` instead of a lost update.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use sea_orm::{
    DatabaseTransaction, QueryFilter, TransactionTrait, prelude::*, sea_query::Expr,
};

use crate::{
    AccountBalance, BalanceOp, CommitCmd, CommitResult, Currency, EngineError, ResultEngine,
    TransferRecord, accounts, obligations, transfers,
    util::{ensure_currency, model_currency, normalize_optional_text, parse_uuid},
};

use super::{Engine, with_tx};

/// Current state of every row a batch touches.
struct Gathered {
    accounts: HashMap<Uuid, accounts::Model>,
    obligations: HashMap<Uuid, obligations::Model>,
    currency: Currency,
}

/// One version-conditional account update.
#[derive(Debug)]
struct AccountUpdate {
    account_id: Uuid,
    new_balance_minor: i64,
    expected_version: i64,
}

/// The complete mutation batch produced by the build phase.
#[derive(Debug)]
struct Batch {
    account_updates: Vec<AccountUpdate>,
    obligation_ids: Vec<Uuid>,
    transfer_rows: Vec<TransferRecord>,
}

impl Engine {
    /// Applies a batch of balance ops as one indivisible unit.
    ///
    /// Validation rejections (`Forbidden`, `InsufficientFunds`,
    /// `InvalidAmount`, `KeyNotFound`, `AlreadySettled`, `CurrencyMismatch`)
    /// are reported before any write. `Conflict` and `Database` mean the
    /// store transaction rolled back and nothing was applied; re-read state
    /// before retrying; never resubmit the same batch blindly, the
    /// idempotency key exists for that.
    pub async fn commit(&self, cmd: CommitCmd) -> ResultEngine<CommitResult> {
        let note = normalize_optional_text(cmd.note.as_deref());
        let CommitCmd {
            user_id,
            occurred_at,
            idempotency_key,
            ops,
            ..
        } = cmd;
        with_tx!(self, |db_tx| {
            self.commit_ops(&db_tx, &user_id, occurred_at, note, idempotency_key, &ops)
                .await
        })
    }

    /// Commit path shared with the settlement/transfer flows, which run it
    /// inside their own transaction.
    pub(super) async fn commit_ops(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        occurred_at: DateTime<Utc>,
        note: Option<String>,
        idempotency_key: Option<String>,
        ops: &[BalanceOp],
    ) -> ResultEngine<CommitResult> {
        if let Some(key) = idempotency_key.as_deref() {
            let existing = transfers::Entity::find()
                .filter(transfers::Column::CreatedBy.eq(user_id.to_string()))
                .filter(transfers::Column::IdempotencyKey.eq(key.to_string()))
                .one(db_tx)
                .await?;
            if let Some(existing) = existing {
                tracing::debug!(user = %user_id, key, "idempotent replay, returning existing transfer");
                return Ok(CommitResult {
                    transfer_ids: vec![parse_uuid(&existing.id, "transfer")?],
                    settled_obligation_ids: Vec::new(),
                    new_balances: Vec::new(),
                });
            }
        }

        let gathered = self.gather_and_validate(db_tx, user_id, ops).await?;
        let batch = build_batch(
            user_id,
            occurred_at,
            note,
            idempotency_key,
            ops,
            &gathered,
        )?;
        let result = self.apply(db_tx, occurred_at, &batch).await?;

        tracing::info!(
            user = %user_id,
            transfers = result.transfer_ids.len(),
            settled = result.settled_obligation_ids.len(),
            accounts = result.new_balances.len(),
            "ledger batch applied"
        );
        Ok(result)
    }

    /// Phase 1: load every touched row and reject invalid batches with no
    /// side effects.
    async fn gather_and_validate(
        &self,
        db_tx: &DatabaseTransaction,
        user_id: &str,
        ops: &[BalanceOp],
    ) -> ResultEngine<Gathered> {
        if ops.is_empty() {
            return Err(EngineError::InvalidAmount(
                "commit must contain at least one operation".to_string(),
            ));
        }

        let mut account_ids: BTreeSet<Uuid> = BTreeSet::new();
        let mut obligation_ids: Vec<Uuid> = Vec::new();
        for op in ops {
            match op {
                BalanceOp::AdjustBalance {
                    account_id,
                    delta_minor,
                } => {
                    if *delta_minor == 0 {
                        return Err(EngineError::InvalidAmount(
                            "delta_minor must not be 0".to_string(),
                        ));
                    }
                    account_ids.insert(*account_id);
                }
                BalanceOp::MarkObligationPaid { obligation_id } => {
                    if obligation_ids.contains(obligation_id) {
                        return Err(EngineError::InvalidAmount(
                            "duplicate obligation in batch".to_string(),
                        ));
                    }
                    obligation_ids.push(*obligation_id);
                }
                BalanceOp::AppendTransfer {
                    from_account_id,
                    to_account_id,
                    amount_minor,
                    ..
                } => {
                    if *amount_minor <= 0 {
                        return Err(EngineError::InvalidAmount(
                            "amount_minor must be > 0".to_string(),
                        ));
                    }
                    if from_account_id == to_account_id {
                        return Err(EngineError::InvalidAmount(
                            "from_account_id and to_account_id must differ".to_string(),
                        ));
                    }
                    account_ids.insert(*from_account_id);
                    account_ids.insert(*to_account_id);
                }
            }
        }

        let mut currency: Option<Currency> = None;
        let mut check_currency = |code: &str| -> ResultEngine<()> {
            let parsed = model_currency(code)?;
            match currency {
                Some(expected) => ensure_currency(expected, parsed),
                None => {
                    currency = Some(parsed);
                    Ok(())
                }
            }
        };

        let mut account_models: HashMap<Uuid, accounts::Model> = HashMap::new();
        for account_id in &account_ids {
            let model = self.require_account(db_tx, *account_id).await?;
            if model.archived {
                return Err(EngineError::Forbidden(format!(
                    "account '{}' is archived",
                    model.name
                )));
            }
            check_currency(&model.currency)?;
            account_models.insert(*account_id, model);
        }

        let mut obligation_models: HashMap<Uuid, obligations::Model> = HashMap::new();
        for obligation_id in &obligation_ids {
            let model = self.require_obligation(db_tx, *obligation_id).await?;
            if model.is_paid {
                return Err(EngineError::AlreadySettled(model.id.clone()));
            }
            if model.ower_id != user_id && model.owed_to_id != user_id {
                return Err(EngineError::Forbidden(
                    "only a party of an obligation may settle it".to_string(),
                ));
            }
            check_currency(&model.currency)?;
            obligation_models.insert(*obligation_id, model);
        }

        // Ownership and sufficiency are checked on the aggregated per-account
        // delta: several ops on one account count as one balance change.
        for (account_id, delta_minor) in aggregate_deltas(ops)? {
            let model = account_models
                .get(&account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            if delta_minor < 0 {
                if model.owner_id != user_id {
                    return Err(EngineError::Forbidden(format!(
                        "only the owner may debit account '{}'",
                        model.name
                    )));
                }
                let new_balance = model
                    .balance_minor
                    .checked_add(delta_minor)
                    .ok_or_else(|| {
                        EngineError::InvalidAmount("amount too large".to_string())
                    })?;
                if new_balance < 0 {
                    return Err(EngineError::InsufficientFunds(model.name.clone()));
                }
            }
        }

        Ok(Gathered {
            accounts: account_models,
            obligations: obligation_models,
            currency: currency.unwrap_or_default(),
        })
    }

    /// Phase 3: conditional updates and inserts, all inside the caller's
    /// store transaction.
    async fn apply(
        &self,
        db_tx: &DatabaseTransaction,
        occurred_at: DateTime<Utc>,
        batch: &Batch,
    ) -> ResultEngine<CommitResult> {
        for update in &batch.account_updates {
            let res = accounts::Entity::update_many()
                .col_expr(
                    accounts::Column::BalanceMinor,
                    Expr::value(update.new_balance_minor),
                )
                .col_expr(
                    accounts::Column::Version,
                    Expr::value(update.expected_version + 1),
                )
                .filter(accounts::Column::Id.eq(update.account_id.to_string()))
                .filter(accounts::Column::Version.eq(update.expected_version))
                .exec(db_tx)
                .await?;
            if res.rows_affected != 1 {
                return Err(EngineError::Conflict(
                    "account was modified concurrently".to_string(),
                ));
            }
        }

        for obligation_id in &batch.obligation_ids {
            let res = obligations::Entity::update_many()
                .col_expr(obligations::Column::IsPaid, Expr::value(true))
                .col_expr(obligations::Column::PaidAt, Expr::value(Some(occurred_at)))
                .filter(obligations::Column::Id.eq(obligation_id.to_string()))
                .filter(obligations::Column::IsPaid.eq(false))
                .exec(db_tx)
                .await?;
            if res.rows_affected != 1 {
                return Err(EngineError::Conflict(
                    "obligation was settled concurrently".to_string(),
                ));
            }
        }

        for row in &batch.transfer_rows {
            transfers::ActiveModel::from(row).insert(db_tx).await?;
        }

        Ok(CommitResult {
            transfer_ids: batch.transfer_rows.iter().map(|r| r.id).collect(),
            settled_obligation_ids: batch.obligation_ids.clone(),
            new_balances: batch
                .account_updates
                .iter()
                .map(|u| AccountBalance {
                    account_id: u.account_id,
                    balance_minor: u.new_balance_minor,
                })
                .collect(),
        })
    }
}

/// Aggregated signed delta per account, in stable (id) order.
fn aggregate_deltas(ops: &[BalanceOp]) -> ResultEngine<BTreeMap<Uuid, i64>> {
    let mut deltas: BTreeMap<Uuid, i64> = BTreeMap::new();
    for op in ops {
        if let BalanceOp::AdjustBalance {
            account_id,
            delta_minor,
        } = op
        {
            let entry = deltas.entry(*account_id).or_insert(0);
            *entry = entry
                .checked_add(*delta_minor)
                .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        }
    }
    Ok(deltas)
}

/// Phase 2: pure construction of the mutation batch.
///
/// The conservation checks live here: account deltas must sum to zero and
/// the audit rows must cover exactly the moved amount. A failure is an
/// `Invariant`: the batch was assembled wrong and nothing may be written.
fn build_batch(
    user_id: &str,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
    idempotency_key: Option<String>,
    ops: &[BalanceOp],
    gathered: &Gathered,
) -> ResultEngine<Batch> {
    let deltas = aggregate_deltas(ops)?;

    let mut delta_sum: i64 = 0;
    let mut moved: i64 = 0;
    for delta_minor in deltas.values() {
        delta_sum = delta_sum
            .checked_add(*delta_minor)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        if *delta_minor > 0 {
            moved += *delta_minor;
        }
    }
    if delta_sum != 0 {
        return Err(EngineError::Invariant(
            "account deltas do not sum to zero".to_string(),
        ));
    }

    let audit_total: i64 = ops
        .iter()
        .map(|op| match op {
            BalanceOp::AppendTransfer { amount_minor, .. } => *amount_minor,
            _ => 0,
        })
        .sum();
    if audit_total != moved {
        return Err(EngineError::Invariant(
            "audit records do not cover the moved amount".to_string(),
        ));
    }

    let mut account_updates = Vec::with_capacity(deltas.len());
    for (account_id, delta_minor) in deltas {
        let model = gathered
            .accounts
            .get(&account_id)
            .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
        let new_balance_minor = model
            .balance_minor
            .checked_add(delta_minor)
            .ok_or_else(|| EngineError::InvalidAmount("amount too large".to_string()))?;
        account_updates.push(AccountUpdate {
            account_id,
            new_balance_minor,
            expected_version: model.version,
        });
    }

    let mut transfer_rows = Vec::new();
    let mut remaining_key = idempotency_key;
    for op in ops {
        if let BalanceOp::AppendTransfer {
            from_account_id,
            to_account_id,
            amount_minor,
            kind,
        } = op
        {
            let from = gathered
                .accounts
                .get(from_account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            let to = gathered
                .accounts
                .get(to_account_id)
                .ok_or_else(|| EngineError::KeyNotFound("account not exists".to_string()))?;
            transfer_rows.push(TransferRecord {
                id: Uuid::new_v4(),
                from_account_id: *from_account_id,
                to_account_id: *to_account_id,
                from_user_id: from.owner_id.clone(),
                to_user_id: to.owner_id.clone(),
                amount_minor: *amount_minor,
                currency: gathered.currency,
                kind: *kind,
                note: note.clone(),
                idempotency_key: remaining_key.take(),
                recorded_at: occurred_at,
                created_by: user_id.to_string(),
            });
        }
    }

    let mut obligation_ids = Vec::new();
    for op in ops {
        if let BalanceOp::MarkObligationPaid { obligation_id } = op {
            if !gathered.obligations.contains_key(obligation_id) {
                return Err(EngineError::KeyNotFound("obligation not exists".to_string()));
            }
            obligation_ids.push(*obligation_id);
        }
    }

    Ok(Batch {
        account_updates,
        obligation_ids,
        transfer_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TransferKind;

    fn account_model(id: Uuid, owner: &str, balance_minor: i64) -> accounts::Model {
        accounts::Model {
            id: id.to_string(),
            owner_id: owner.to_string(),
            name: format!("{owner}-main"),
            balance_minor,
            opening_balance_minor: balance_minor,
            currency: "EUR".to_string(),
            version: 0,
            archived: false,
        }
    }

    fn gathered(models: Vec<accounts::Model>) -> Gathered {
        let accounts = models
            .into_iter()
            .map(|m| (Uuid::parse_str(&m.id).unwrap(), m))
            .collect();
        Gathered {
            accounts,
            obligations: HashMap::new(),
            currency: Currency::Eur,
        }
    }

    #[test]
    fn unbalanced_deltas_violate_conservation() {
        let from = Uuid::new_v4();
        let state = gathered(vec![account_model(from, "alice", 100_00)]);
        let err = build_batch(
            "alice",
            chrono::Utc::now(),
            None,
            None,
            &[BalanceOp::debit(from, 50_00)],
            &state,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Invariant("account deltas do not sum to zero".to_string())
        );
    }

    #[test]
    fn movement_without_audit_violates_conservation() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let state = gathered(vec![
            account_model(from, "alice", 100_00),
            account_model(to, "bob", 0),
        ]);
        let err = build_batch(
            "alice",
            chrono::Utc::now(),
            None,
            None,
            &[BalanceOp::debit(from, 50_00), BalanceOp::credit(to, 50_00)],
            &state,
        )
        .unwrap_err();
        assert_eq!(
            err,
            EngineError::Invariant("audit records do not cover the moved amount".to_string())
        );
    }

    #[test]
    fn balanced_batch_builds_updates_and_audit() {
        let from = Uuid::new_v4();
        let to = Uuid::new_v4();
        let state = gathered(vec![
            account_model(from, "alice", 100_00),
            account_model(to, "bob", 20_00),
        ]);
        let batch = build_batch(
            "alice",
            chrono::Utc::now(),
            Some("rent".to_string()),
            None,
            &[
                BalanceOp::debit(from, 50_00),
                BalanceOp::credit(to, 50_00),
                BalanceOp::AppendTransfer {
                    from_account_id: from,
                    to_account_id: to,
                    amount_minor: 50_00,
                    kind: TransferKind::Transfer,
                },
            ],
            &state,
        )
        .unwrap();

        assert_eq!(batch.account_updates.len(), 2);
        let new_balances: HashMap<Uuid, i64> = batch
            .account_updates
            .iter()
            .map(|u| (u.account_id, u.new_balance_minor))
            .collect();
        assert_eq!(new_balances[&from], 50_00);
        assert_eq!(new_balances[&to], 70_00);
        assert_eq!(batch.transfer_rows.len(), 1);
        assert_eq!(batch.transfer_rows[0].from_user_id, "alice");
        assert_eq!(batch.transfer_rows[0].to_user_id, "bob");
    }
}
