//! Transfer and settlement flows.
//!
//! Thin builders over the ledger executor: each flow validates its own
//! preconditions, assembles a balance-op batch and runs it through
//! `commit_ops` inside one store transaction.

use sea_orm::TransactionTrait;
use uuid::Uuid;

use crate::{
    BalanceOp, CommitResult, EngineError, OnAccountCmd, ResultEngine, SettleCmd, SplitObligation,
    TransferCmd, TransferKind, util::normalize_optional_text,
};

use super::{Engine, with_tx};

impl Engine {
    /// Moves money between two accounts.
    ///
    /// Debit + credit + audit row, applied atomically. The caller must own
    /// the source account and the source balance must cover the amount.
    pub async fn transfer(&self, cmd: TransferCmd) -> ResultEngine<CommitResult> {
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidAmount(
                "from_account_id and to_account_id must differ".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());
        let ops = movement_ops(
            cmd.from_account_id,
            cmd.to_account_id,
            cmd.amount_minor,
            TransferKind::Transfer,
        );
        with_tx!(self, |db_tx| {
            self.commit_ops(
                &db_tx,
                &cmd.user_id,
                cmd.occurred_at,
                note,
                cmd.idempotency_key.clone(),
                &ops,
            )
            .await
        })
    }

    /// Clears the chosen obligations and, when a source account is given,
    /// moves the owed amount in the same commit.
    ///
    /// All obligations must be owed by the caller to one single
    /// counterparty, and the destination account must belong to that
    /// counterparty. The moved amount defaults to the obligation sum; an
    /// explicit override covers the partially-paid-on-account case. Without
    /// a source account the commit only flips the paid flags.
    pub async fn settle(&self, cmd: SettleCmd) -> ResultEngine<CommitResult> {
        if cmd.obligation_ids.is_empty() {
            return Err(EngineError::InvalidAmount(
                "settle requires at least one obligation".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());

        with_tx!(self, |db_tx| {
            let mut counterparty: Option<String> = None;
            let mut owed_sum: i64 = 0;
            for obligation_id in &cmd.obligation_ids {
                let model = self.require_obligation(&db_tx, *obligation_id).await?;
                let obligation = SplitObligation::try_from(model)?;
                if obligation.is_paid {
                    return Err(EngineError::AlreadySettled(obligation.id.to_string()));
                }
                if obligation.ower_id != cmd.user_id {
                    return Err(EngineError::Forbidden(
                        "only the ower may settle an obligation".to_string(),
                    ));
                }
                if let Some(expected) = &counterparty {
                    if *expected != obligation.owed_to_id {
                        return Err(EngineError::InvalidAmount(
                            "obligations must share one counterparty".to_string(),
                        ));
                    }
                } else {
                    counterparty = Some(obligation.owed_to_id.clone());
                }
                owed_sum = owed_sum.checked_add(obligation.amount_minor).ok_or_else(|| {
                    EngineError::InvalidAmount("amount too large".to_string())
                })?;
            }

            let mut ops: Vec<BalanceOp> = cmd
                .obligation_ids
                .iter()
                .map(|obligation_id| BalanceOp::MarkObligationPaid {
                    obligation_id: *obligation_id,
                })
                .collect();

            let amount_minor = cmd.amount_minor.unwrap_or(owed_sum);
            if amount_minor < 0 {
                return Err(EngineError::InvalidAmount(
                    "amount_minor must be >= 0".to_string(),
                ));
            }

            if let Some(from_account_id) = cmd.from_account_id {
                let to_account_id = cmd.to_account_id.ok_or_else(|| {
                    EngineError::InvalidAmount(
                        "to_account_id is required when moving funds".to_string(),
                    )
                })?;
                if from_account_id == to_account_id {
                    return Err(EngineError::InvalidAmount(
                        "from_account_id and to_account_id must differ".to_string(),
                    ));
                }
                let to_model = self.require_account(&db_tx, to_account_id).await?;
                if counterparty.as_deref() != Some(to_model.owner_id.as_str()) {
                    return Err(EngineError::Forbidden(
                        "destination account must belong to the settled counterparty".to_string(),
                    ));
                }
                if amount_minor > 0 {
                    ops.extend(movement_ops(
                        from_account_id,
                        to_account_id,
                        amount_minor,
                        TransferKind::Settlement,
                    ));
                }
            }

            self.commit_ops(
                &db_tx,
                &cmd.user_id,
                cmd.occurred_at,
                note,
                cmd.idempotency_key.clone(),
                &ops,
            )
            .await
        })
    }

    /// Records a payment toward an outstanding debt without clearing any
    /// particular obligation.
    ///
    /// The receiving account must belong to another user; the debt netting
    /// counts the payment until the pair's next settlement close.
    pub async fn settle_on_account(&self, cmd: OnAccountCmd) -> ResultEngine<CommitResult> {
        if cmd.from_account_id == cmd.to_account_id {
            return Err(EngineError::InvalidAmount(
                "from_account_id and to_account_id must differ".to_string(),
            ));
        }
        let note = normalize_optional_text(cmd.note.as_deref());

        with_tx!(self, |db_tx| {
            let to_model = self.require_account(&db_tx, cmd.to_account_id).await?;
            if to_model.owner_id == cmd.user_id {
                return Err(EngineError::InvalidAmount(
                    "an on-account payment must go to another user's account".to_string(),
                ));
            }

            let ops = movement_ops(
                cmd.from_account_id,
                cmd.to_account_id,
                cmd.amount_minor,
                TransferKind::Settlement,
            );
            self.commit_ops(
                &db_tx,
                &cmd.user_id,
                cmd.occurred_at,
                note,
                cmd.idempotency_key.clone(),
                &ops,
            )
            .await
        })
    }
}

/// Debit + credit + matching audit row for one movement.
fn movement_ops(
    from_account_id: Uuid,
    to_account_id: Uuid,
    amount_minor: i64,
    kind: TransferKind,
) -> Vec<BalanceOp> {
    vec![
        BalanceOp::debit(from_account_id, amount_minor),
        BalanceOp::credit(to_account_id, amount_minor),
        BalanceOp::AppendTransfer {
            from_account_id,
            to_account_id,
            amount_minor,
            kind,
        },
    ]
}
