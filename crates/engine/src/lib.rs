//! Shared-expense splitting and balance-settlement engine.
//!
//! Three contracts make up the public surface:
//!
//! - [`split`]: pure. Divide a total over weighted participants, summing
//!   back exactly;
//! - [`Engine::net_balance`]: read. Reduce everything outstanding between
//!   two users to one signed figure;
//! - [`Engine::commit`]: the sole mutation path for account balances,
//!   obligation paid-flags and transfer audit rows, applied all-or-nothing.
//!
//! The higher-level flows (`record_shared_expense`, `transfer`, `settle`,
//! `settle_on_account`) are conveniences over the same three contracts.
//! Amounts are integer minor units end to end; see [`Money`].

pub use accounts::Account;
pub use commands::{
    CommitCmd, OnAccountCmd, RegenerateSplitsCmd, SettleCmd, SharedExpenseCmd, TransferCmd,
};
pub use currency::Currency;
pub use debts::{DebtBalance, DebtDirection};
pub use error::EngineError;
pub use expenses::{Expense, ExpenseCreated};
pub use ledger::{AccountBalance, BalanceOp, CommitResult};
pub use money::Money;
pub use obligations::SplitObligation;
pub use ops::{Engine, EngineBuilder};
pub use split::{Participant, SplitShare, split};
pub use transfers::{TransferKind, TransferRecord};

mod accounts;
mod commands;
mod currency;
mod debts;
mod error;
mod expenses;
mod ledger;
mod money;
mod obligations;
mod ops;
mod split;
mod transfers;
mod util;

type ResultEngine<T> = Result<T, EngineError>;
