//! Command structs for engine operations.
//!
//! These types group parameters for write operations (expense recording,
//! transfers, settlements, raw commits), keeping call sites readable and
//! avoiding long argument lists. Timestamps are always supplied by the
//! caller; the engine never reads the clock itself.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{BalanceOp, split::Participant};

/// Run a raw batch of balance ops through the ledger executor.
#[derive(Clone, Debug)]
pub struct CommitCmd {
    pub user_id: String,
    pub occurred_at: DateTime<Utc>,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub ops: Vec<BalanceOp>,
}

impl CommitCmd {
    #[must_use]
    pub fn new(user_id: impl Into<String>, occurred_at: DateTime<Utc>, ops: Vec<BalanceOp>) -> Self {
        Self {
            user_id: user_id.into(),
            occurred_at,
            note: None,
            idempotency_key: None,
            ops,
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Move money between two accounts (plain transfer, no debt meaning).
#[derive(Clone, Debug)]
pub struct TransferCmd {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

impl TransferCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount_minor,
            note: None,
            idempotency_key: None,
            occurred_at,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Record an on-account settlement payment: money toward what the caller
/// owes the receiving account's owner, without clearing specific
/// obligations. Counted by the debt netting until the pair's next close.
#[derive(Clone, Debug)]
pub struct OnAccountCmd {
    pub from_account_id: Uuid,
    pub to_account_id: Uuid,
    pub amount_minor: i64,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

impl OnAccountCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        from_account_id: Uuid,
        to_account_id: Uuid,
        amount_minor: i64,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            from_account_id,
            to_account_id,
            amount_minor,
            note: None,
            idempotency_key: None,
            occurred_at,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Clear chosen obligations, optionally moving funds in the same commit.
///
/// All obligations must be owed by the caller to one single counterparty.
/// With `from_account_id` set, the commit debits it and credits
/// `to_account_id` (which must belong to the counterparty) for
/// `amount_minor` (defaulting to the sum of the cleared obligations) and
/// appends a settlement audit row. Without it, the commit only flips the
/// paid flags (used when the debt was already covered on account).
#[derive(Clone, Debug)]
pub struct SettleCmd {
    pub obligation_ids: Vec<Uuid>,
    pub from_account_id: Option<Uuid>,
    pub to_account_id: Option<Uuid>,
    pub amount_minor: Option<i64>,
    pub note: Option<String>,
    pub idempotency_key: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

impl SettleCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        obligation_ids: Vec<Uuid>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            obligation_ids,
            from_account_id: None,
            to_account_id: None,
            amount_minor: None,
            note: None,
            idempotency_key: None,
            occurred_at,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn accounts(mut self, from_account_id: Uuid, to_account_id: Uuid) -> Self {
        self.from_account_id = Some(from_account_id);
        self.to_account_id = Some(to_account_id);
        self
    }

    /// Override the moved amount (defaults to the obligation sum).
    #[must_use]
    pub fn amount_minor(mut self, amount_minor: i64) -> Self {
        self.amount_minor = Some(amount_minor);
        self
    }

    #[must_use]
    pub fn note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    #[must_use]
    pub fn idempotency_key(mut self, key: impl Into<String>) -> Self {
        self.idempotency_key = Some(key.into());
        self
    }
}

/// Record a shared expense: split the total over the participants and
/// persist one unpaid obligation per non-payer share.
#[derive(Clone, Debug)]
pub struct SharedExpenseCmd {
    pub payer_id: String,
    pub total_minor: i64,
    pub participants: Vec<Participant>,
    pub description: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub user_id: String,
}

impl SharedExpenseCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        payer_id: impl Into<String>,
        total_minor: i64,
        participants: Vec<Participant>,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            payer_id: payer_id.into(),
            total_minor,
            participants,
            description: None,
            occurred_at,
            user_id: user_id.into(),
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Expense-edit flow: recompute the split and replace the expense's
/// obligation set in full. Rejected once any obligation is paid.
#[derive(Clone, Debug)]
pub struct RegenerateSplitsCmd {
    pub expense_id: Uuid,
    pub participants: Vec<Participant>,
    pub user_id: String,
}

impl RegenerateSplitsCmd {
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        expense_id: Uuid,
        participants: Vec<Participant>,
    ) -> Self {
        Self {
            expense_id,
            participants,
            user_id: user_id.into(),
        }
    }
}
