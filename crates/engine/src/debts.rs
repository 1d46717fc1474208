//! Net debt between two users.
//!
//! `DebtBalance` is a derived view, recomputed on demand from unpaid
//! obligations and on-account settlement payments. It is never persisted and
//! never a source of truth.

use serde::{Deserialize, Serialize};

use crate::{Currency, Money};

/// Who owes whom, relative to the order the two users were passed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebtDirection {
    FirstOwesSecond,
    SecondOwesFirst,
    Settled,
}

/// The single signed figure summarizing all outstanding obligations and
/// settlement payments between two users.
///
/// `net_minor` is positive when `first` owes `second`. Zero means settled,
/// exactly zero, since all arithmetic is integer minor units.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DebtBalance {
    pub first: String,
    pub second: String,
    pub net_minor: i64,
    pub direction: DebtDirection,
    pub currency: Currency,
}

impl DebtBalance {
    pub(crate) fn from_net(
        first: impl Into<String>,
        second: impl Into<String>,
        net_minor: i64,
        currency: Currency,
    ) -> Self {
        let direction = match net_minor {
            0 => DebtDirection::Settled,
            n if n > 0 => DebtDirection::FirstOwesSecond,
            _ => DebtDirection::SecondOwesFirst,
        };
        Self {
            first: first.into(),
            second: second.into(),
            net_minor,
            direction,
            currency,
        }
    }

    /// Absolute amount owed, whoever the ower is.
    #[must_use]
    pub fn magnitude(&self) -> Money {
        Money::new(self.net_minor.abs())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_follows_sign() {
        let owes = DebtBalance::from_net("a", "b", 20_00, Currency::Eur);
        assert_eq!(owes.direction, DebtDirection::FirstOwesSecond);
        assert_eq!(owes.magnitude(), Money::new(20_00));

        let owed = DebtBalance::from_net("a", "b", -5, Currency::Eur);
        assert_eq!(owed.direction, DebtDirection::SecondOwesFirst);
        assert_eq!(owed.magnitude(), Money::new(5));

        let settled = DebtBalance::from_net("a", "b", 0, Currency::Eur);
        assert_eq!(settled.direction, DebtDirection::Settled);
        assert!(settled.magnitude().is_zero());
    }
}
