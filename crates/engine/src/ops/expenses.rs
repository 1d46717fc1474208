//! Shared-expense write path.
//!
//! An expense and its obligations are one unit: created in full inside a
//! single store transaction, or replaced in full by the regeneration flow.
//! Settlement is the only other writer of obligations, and it never deletes.

use sea_orm::{QueryFilter, TransactionTrait, prelude::*};
use uuid::Uuid;

use crate::{
    EngineError, Expense, ExpenseCreated, Money, RegenerateSplitsCmd, ResultEngine,
    SharedExpenseCmd, SplitObligation, SplitShare, expenses, obligations,
    split::split,
    util::{normalize_optional_text, normalize_required_name},
};

use super::{Engine, with_tx};

impl Engine {
    /// Records a shared expense: splits the total over the participants and
    /// persists one unpaid obligation per non-payer share.
    ///
    /// The payer's own share produces no obligation, and zero-amount shares
    /// are skipped. Account balances are untouched; obligations only come
    /// into money movement when they are settled.
    pub async fn record_shared_expense(
        &self,
        cmd: SharedExpenseCmd,
    ) -> ResultEngine<ExpenseCreated> {
        let payer_id = normalize_required_name(&cmd.payer_id, "payer")?;
        for participant in &cmd.participants {
            normalize_required_name(&participant.id, "participant")?;
        }
        let description = normalize_optional_text(cmd.description.as_deref());

        let expense = Expense::new(
            payer_id.clone(),
            cmd.total_minor,
            crate::Currency::default(),
            description,
            cmd.occurred_at,
            cmd.user_id.clone(),
        )?;
        let shares = split(Money::new(cmd.total_minor), &cmd.participants);
        let rows = obligation_rows(&expense, &shares);

        let expense_id = expense.id;
        with_tx!(self, |db_tx| {
            expenses::ActiveModel::from(&expense).insert(&db_tx).await?;
            for obligation in &rows {
                obligations::ActiveModel::from(obligation)
                    .insert(&db_tx)
                    .await?;
            }
            Ok::<(), EngineError>(())
        })?;

        tracing::info!(
            expense = %expense_id,
            payer = %payer_id,
            obligations = rows.len(),
            "shared expense recorded"
        );
        Ok(ExpenseCreated { expense_id, shares })
    }

    /// Expense-edit flow: recomputes the split and replaces the expense's
    /// obligation set in full.
    ///
    /// Only the payer or the expense's creator may regenerate, and only
    /// while no obligation of the expense is paid: a paid obligation is a
    /// historical record a later edit must not rewrite.
    pub async fn regenerate_splits(
        &self,
        cmd: RegenerateSplitsCmd,
    ) -> ResultEngine<ExpenseCreated> {
        for participant in &cmd.participants {
            normalize_required_name(&participant.id, "participant")?;
        }

        with_tx!(self, |db_tx| {
            let expense_model = expenses::Entity::find_by_id(cmd.expense_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            let expense = Expense::try_from(expense_model)?;
            if expense.payer_id != cmd.user_id && expense.created_by != cmd.user_id {
                return Err(EngineError::Forbidden(
                    "only the payer or the creator may edit an expense's split".to_string(),
                ));
            }

            let existing = self.obligations_for_expense_tx(&db_tx, cmd.expense_id).await?;
            if let Some(paid) = existing.iter().find(|o| o.is_paid) {
                return Err(EngineError::AlreadySettled(paid.id.clone()));
            }

            let shares = split(Money::new(expense.total_minor), &cmd.participants);
            let rows = obligation_rows(&expense, &shares);

            obligations::Entity::delete_many()
                .filter(obligations::Column::ExpenseId.eq(cmd.expense_id.to_string()))
                .exec(&db_tx)
                .await?;
            for obligation in &rows {
                obligations::ActiveModel::from(obligation)
                    .insert(&db_tx)
                    .await?;
            }

            Ok(ExpenseCreated {
                expense_id: expense.id,
                shares,
            })
        })
    }

    /// Returns an expense together with its current obligation set.
    pub async fn expense(
        &self,
        expense_id: Uuid,
    ) -> ResultEngine<(Expense, Vec<SplitObligation>)> {
        with_tx!(self, |db_tx| {
            let expense_model = expenses::Entity::find_by_id(expense_id.to_string())
                .one(&db_tx)
                .await?
                .ok_or_else(|| EngineError::KeyNotFound("expense not exists".to_string()))?;
            let expense = Expense::try_from(expense_model)?;
            let obligation_models = self.obligations_for_expense_tx(&db_tx, expense_id).await?;
            let obligations = obligation_models
                .into_iter()
                .map(SplitObligation::try_from)
                .collect::<ResultEngine<Vec<_>>>()?;
            Ok((expense, obligations))
        })
    }
}

/// Shares → unpaid obligation rows: one per non-payer participant with a
/// non-zero amount.
fn obligation_rows(expense: &Expense, shares: &[SplitShare]) -> Vec<SplitObligation> {
    shares
        .iter()
        .filter(|share| share.participant_id != expense.payer_id && !share.amount.is_zero())
        .map(|share| {
            SplitObligation::new(
                expense.id,
                share.participant_id.clone(),
                expense.payer_id.clone(),
                share.amount.minor(),
                expense.currency,
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use crate::split::Participant;

    use super::*;

    #[test]
    fn payer_share_produces_no_obligation() {
        let expense = Expense::new(
            "alice".to_string(),
            90_00,
            crate::Currency::Eur,
            None,
            Utc::now(),
            "alice".to_string(),
        )
        .unwrap();
        let shares = split(
            Money::new(90_00),
            &[
                Participant::new("alice", 1),
                Participant::new("bob", 1),
                Participant::new("carol", 1),
            ],
        );
        let rows = obligation_rows(&expense, &shares);

        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|o| o.owed_to_id == "alice"));
        assert!(rows.iter().all(|o| !o.is_paid));
        assert_eq!(rows.iter().map(|o| o.amount_minor).sum::<i64>(), 60_00);
    }

    #[test]
    fn zero_amount_shares_are_skipped() {
        let expense = Expense::new(
            "alice".to_string(),
            10_00,
            crate::Currency::Eur,
            None,
            Utc::now(),
            "alice".to_string(),
        )
        .unwrap();
        let shares = split(
            Money::new(10_00),
            &[
                Participant::new("alice", 1),
                Participant::new("bob", 1),
                Participant::new("carol", 0),
            ],
        );
        let rows = obligation_rows(&expense, &shares);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ower_id, "bob");
    }
}
