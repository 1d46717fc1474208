//! The module contains the errors the engine can return.
//!
//! Variants fall into three classes:
//!
//! - validation rejections ([`Forbidden`], [`InsufficientFunds`],
//!   [`InvalidAmount`], [`InvalidId`], [`KeyNotFound`], [`ExistingKey`],
//!   [`AlreadySettled`], [`CurrencyMismatch`]): reported before any write,
//!   the caller fixes the input and retries at will;
//! - infrastructure failures ([`Database`], [`Conflict`]): the store
//!   transaction rolled back, state is unchanged; the caller must re-read
//!   current state before retrying;
//! - [`Invariant`]: a conservation check failed. This must never fire in
//!   correct code and is not recoverable.
//!
//! [`Forbidden`]: EngineError::Forbidden
//! [`InsufficientFunds`]: EngineError::InsufficientFunds
//! [`InvalidAmount`]: EngineError::InvalidAmount
//! [`InvalidId`]: EngineError::InvalidId
//! [`KeyNotFound`]: EngineError::KeyNotFound
//! [`ExistingKey`]: EngineError::ExistingKey
//! [`AlreadySettled`]: EngineError::AlreadySettled
//! [`CurrencyMismatch`]: EngineError::CurrencyMismatch
//! [`Database`]: EngineError::Database
//! [`Conflict`]: EngineError::Conflict
//! [`Invariant`]: EngineError::Invariant
use sea_orm::DbErr;
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Insufficient funds: {0}")]
    InsufficientFunds(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("\"{0}\" key not found!")]
    KeyNotFound(String),
    #[error("\"{0}\" already present!")]
    ExistingKey(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Invalid id: {0}")]
    InvalidId(String),
    #[error("Already settled: {0}")]
    AlreadySettled(String),
    #[error("Currency mismatch: {0}")]
    CurrencyMismatch(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invariant violated: {0}")]
    Invariant(String),
    #[error(transparent)]
    Database(#[from] DbErr),
}

impl EngineError {
    /// Whether the caller may retry after re-reading current state.
    ///
    /// Validation rejections are not retryable as-is (the input is wrong);
    /// `Database` and `Conflict` mean the atomic apply did not happen and a
    /// fresh attempt can succeed.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Conflict(_))
    }
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::InsufficientFunds(a), Self::InsufficientFunds(b)) => a == b,
            (Self::Forbidden(a), Self::Forbidden(b)) => a == b,
            (Self::KeyNotFound(a), Self::KeyNotFound(b)) => a == b,
            (Self::ExistingKey(a), Self::ExistingKey(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::InvalidId(a), Self::InvalidId(b)) => a == b,
            (Self::AlreadySettled(a), Self::AlreadySettled(b)) => a == b,
            (Self::CurrencyMismatch(a), Self::CurrencyMismatch(b)) => a == b,
            (Self::Conflict(a), Self::Conflict(b)) => a == b,
            (Self::Invariant(a), Self::Invariant(b)) => a == b,
            (Self::Database(a), Self::Database(b)) => a.to_string() == b.to_string(),
            _ => false,
        }
    }
}
