//! Ledger commit vocabulary.
//!
//! A [`BalanceOp`] is a single balance-affecting mutation requested from the
//! ledger executor. Ops are gathered into one batch and applied as one
//! indivisible unit (see `Engine::commit`), so a reader can never observe a
//! state between "before" and "after".
//!
//! Sign convention follows the ledger: a negative `delta_minor` decreases the
//! account balance (a debit), a positive one increases it (a credit).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::transfers::TransferKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum BalanceOp {
    /// Change an account balance by a signed delta. Debits require the
    /// committing user to own the account and may not exceed its balance.
    AdjustBalance { account_id: Uuid, delta_minor: i64 },
    /// Flip an unpaid obligation to paid. Settlement-flow only.
    MarkObligationPaid { obligation_id: Uuid },
    /// Append the immutable audit row documenting the movement. Mandatory in
    /// any batch whose adjustments move money.
    AppendTransfer {
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
        kind: TransferKind,
    },
}

impl BalanceOp {
    /// A debit of `amount_minor` (> 0) against `account_id`.
    #[must_use]
    pub fn debit(account_id: Uuid, amount_minor: i64) -> Self {
        Self::AdjustBalance {
            account_id,
            delta_minor: -amount_minor,
        }
    }

    /// A credit of `amount_minor` (> 0) to `account_id`.
    #[must_use]
    pub fn credit(account_id: Uuid, amount_minor: i64) -> Self {
        Self::AdjustBalance {
            account_id,
            delta_minor: amount_minor,
        }
    }
}

/// One account's balance after a successful commit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: Uuid,
    pub balance_minor: i64,
}

/// Success payload of a ledger commit.
///
/// `transfer_ids` holds the audit rows appended by this commit (or the
/// pre-existing row when an idempotency key short-circuited the batch).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CommitResult {
    pub transfer_ids: Vec<Uuid>,
    pub settled_obligation_ids: Vec<Uuid>,
    pub new_balances: Vec<AccountBalance>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debit_and_credit_sign_the_delta() {
        let account_id = Uuid::new_v4();
        assert_eq!(
            BalanceOp::debit(account_id, 50_00),
            BalanceOp::AdjustBalance {
                account_id,
                delta_minor: -50_00
            }
        );
        assert_eq!(
            BalanceOp::credit(account_id, 50_00),
            BalanceOp::AdjustBalance {
                account_id,
                delta_minor: 50_00
            }
        );
    }
}
