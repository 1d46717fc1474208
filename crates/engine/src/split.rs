//! Expense splitting.
//!
//! [`split`] divides a total amount among weighted participants so that the
//! per-participant amounts sum back to the total **exactly**, in integer
//! minor units. Leftover minor units after flooring are handed out one at a
//! time by largest fractional remainder (ties: larger ratio first, then
//! participant id ascending), so identical inputs always produce identical
//! output.
//!
//! The function is pure and never fails: malformed input degrades to a safe
//! zeroed result instead of panicking, so a money display can always render
//! something.

use serde::{Deserialize, Serialize};

use crate::Money;

/// Calculator input: a participant and their relative weight.
///
/// `ratio` is a plain integer weight (shares, percent points, …). Fractional
/// ratios are expressed as integer pairs (`3:2` instead of `1.5:1`) so the
/// distribution stays exact. Non-positive ratios take no share; when no
/// participant has a positive ratio the split falls back to an even split.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: String,
    pub ratio: i64,
}

impl Participant {
    #[must_use]
    pub fn new(id: impl Into<String>, ratio: i64) -> Self {
        Self {
            id: id.into(),
            ratio,
        }
    }
}

/// One participant's portion of a divided amount.
///
/// `percentage` is the requested weight share (ratio over the ratio sum), for
/// display only and never fed back into arithmetic. It is defined (not
/// NaN) even when the split total is zero.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SplitShare {
    pub participant_id: String,
    pub amount: Money,
    pub percentage: f64,
}

/// Divides `total` among `participants` proportionally to their ratios.
///
/// Guarantees, for any `total >= 0` and non-empty participant list:
///
/// - the share amounts sum to `total` exactly;
/// - the output is deterministic, including remainder placement;
/// - shares are returned in the caller's participant order.
///
/// Edge behavior:
///
/// - empty participant list → empty result;
/// - no positive ratio → even split in participant-id order, the largest id
///   absorbing the rounding remainder;
/// - `total < 0` → zero amounts for everyone (fail safe, never a panic).
#[must_use]
pub fn split(total: Money, participants: &[Participant]) -> Vec<SplitShare> {
    if participants.is_empty() {
        return Vec::new();
    }

    let any_positive = participants.iter().any(|p| p.ratio > 0);
    let percentages = weight_percentages(participants, any_positive);

    let total_minor = total.minor();
    if total_minor < 0 {
        return participants
            .iter()
            .zip(percentages)
            .map(|(p, percentage)| SplitShare {
                participant_id: p.id.clone(),
                amount: Money::ZERO,
                percentage,
            })
            .collect();
    }

    let amounts = if any_positive {
        weighted_amounts(total_minor, participants)
    } else {
        even_amounts(total_minor, participants)
    };

    participants
        .iter()
        .zip(amounts)
        .zip(percentages)
        .map(|((p, amount_minor), percentage)| SplitShare {
            participant_id: p.id.clone(),
            amount: Money::new(amount_minor),
            percentage,
        })
        .collect()
}

/// Display percentages derived from the weights actually used.
fn weight_percentages(participants: &[Participant], any_positive: bool) -> Vec<f64> {
    if any_positive {
        let ratio_sum: i64 = participants.iter().map(|p| p.ratio.max(0)).sum();
        participants
            .iter()
            .map(|p| {
                if p.ratio > 0 {
                    p.ratio as f64 / ratio_sum as f64 * 100.0
                } else {
                    0.0
                }
            })
            .collect()
    } else {
        let even = 100.0 / participants.len() as f64;
        participants.iter().map(|_| even).collect()
    }
}

/// Largest-remainder apportionment over positive ratios.
///
/// Exact shares are `total * ratio / ratio_sum` in `i128`; floors are taken
/// first, then the missing minor units (always `< positive participant
/// count`) go to the largest fractional remainders. Ties break by larger
/// ratio, then participant id ascending.
fn weighted_amounts(total_minor: i64, participants: &[Participant]) -> Vec<i64> {
    let ratio_sum: i128 = participants
        .iter()
        .map(|p| i128::from(p.ratio.max(0)))
        .sum();

    let mut amounts = vec![0i64; participants.len()];
    let mut remainders: Vec<(usize, i128)> = Vec::with_capacity(participants.len());
    let mut floored_sum: i64 = 0;

    for (idx, p) in participants.iter().enumerate() {
        if p.ratio <= 0 {
            continue;
        }
        let exact = i128::from(total_minor) * i128::from(p.ratio);
        let floor = (exact / ratio_sum) as i64;
        amounts[idx] = floor;
        floored_sum += floor;
        remainders.push((idx, exact % ratio_sum));
    }

    let mut leftover = total_minor - floored_sum;
    remainders.sort_by(|(a_idx, a_rem), (b_idx, b_rem)| {
        b_rem
            .cmp(a_rem)
            .then_with(|| participants[*b_idx].ratio.cmp(&participants[*a_idx].ratio))
            .then_with(|| participants[*a_idx].id.cmp(&participants[*b_idx].id))
    });
    for (idx, _) in remainders {
        if leftover == 0 {
            break;
        }
        amounts[idx] += 1;
        leftover -= 1;
    }

    amounts
}

/// Even-split fallback used when no ratio is positive.
///
/// Participants are ranked by id; everyone gets the floored even share and
/// the largest id absorbs the rounding remainder.
fn even_amounts(total_minor: i64, participants: &[Participant]) -> Vec<i64> {
    let count = participants.len() as i64;
    let base = total_minor / count;

    let last_idx = participants
        .iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.id.cmp(&b.id))
        .map(|(idx, _)| idx)
        .unwrap_or(0);

    let mut amounts = vec![base; participants.len()];
    amounts[last_idx] = total_minor - base * (count - 1);
    amounts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sum(shares: &[SplitShare]) -> i64 {
        shares.iter().map(|s| s.amount.minor()).sum()
    }

    #[test]
    fn fifty_fifty_odd_cent_goes_to_first_id() {
        let shares = split(
            Money::new(100_01),
            &[Participant::new("a", 50), Participant::new("b", 50)],
        );
        assert_eq!(shares[0].amount, Money::new(50_01));
        assert_eq!(shares[1].amount, Money::new(50_00));
        assert_eq!(sum(&shares), 100_01);
    }

    #[test]
    fn sixty_forty_divides_exactly() {
        let shares = split(
            Money::new(100_00),
            &[Participant::new("a", 60), Participant::new("b", 40)],
        );
        assert_eq!(shares[0].amount, Money::new(60_00));
        assert_eq!(shares[1].amount, Money::new(40_00));
        assert_eq!(shares[0].percentage, 60.0);
        assert_eq!(shares[1].percentage, 40.0);
    }

    #[test]
    fn identical_inputs_identical_outputs() {
        let participants = vec![
            Participant::new("carol", 3),
            Participant::new("alice", 1),
            Participant::new("bob", 3),
        ];
        let first = split(Money::new(99_99), &participants);
        let second = split(Money::new(99_99), &participants);
        assert_eq!(first, second);
        assert_eq!(sum(&first), 99_99);
    }

    #[test]
    fn leftover_follows_largest_remainder() {
        // Exact shares: 20.2 / 30.3 / 50.5; the single leftover cent belongs
        // to the largest remainder, which is also the largest ratio here.
        let shares = split(
            Money::new(101),
            &[
                Participant::new("a", 2),
                Participant::new("b", 3),
                Participant::new("c", 5),
            ],
        );
        assert_eq!(shares[0].amount, Money::new(20));
        assert_eq!(shares[1].amount, Money::new(30));
        assert_eq!(shares[2].amount, Money::new(51));
        assert_eq!(sum(&shares), 101);
    }

    #[test]
    fn remainder_never_skips_a_larger_pending_remainder() {
        // Exact shares: 0.75 / 0.25; the only cent must go to the larger
        // remainder even though both floors are zero.
        let shares = split(
            Money::new(1),
            &[Participant::new("small", 1), Participant::new("big", 3)],
        );
        assert_eq!(shares[0].amount, Money::ZERO);
        assert_eq!(shares[1].amount, Money::new(1));
    }

    #[test]
    fn remainder_tie_breaks_by_ratio_then_id() {
        // Equal remainders at equal ratios: id ascending wins.
        let shares = split(
            Money::new(1_01),
            &[Participant::new("b", 1), Participant::new("a", 1)],
        );
        assert_eq!(shares[1].amount, Money::new(51), "a takes the odd cent");
        assert_eq!(shares[0].amount, Money::new(50));

        // Equal remainders at different ratios: larger ratio wins.
        let shares = split(
            Money::new(2),
            &[Participant::new("a", 1), Participant::new("b", 3)],
        );
        assert_eq!(shares[0].amount, Money::ZERO);
        assert_eq!(shares[1].amount, Money::new(2));
    }

    #[test]
    fn zero_total_keeps_percentages_defined() {
        let shares = split(
            Money::ZERO,
            &[Participant::new("a", 1), Participant::new("b", 1)],
        );
        assert_eq!(sum(&shares), 0);
        for share in &shares {
            assert!(!share.percentage.is_nan());
            assert_eq!(share.percentage, 50.0);
        }
    }

    #[test]
    fn empty_participants_yield_empty_result() {
        assert!(split(Money::new(10_00), &[]).is_empty());
    }

    #[test]
    fn negative_total_yields_zeroed_result() {
        let shares = split(
            Money::new(-5_00),
            &[Participant::new("a", 1), Participant::new("b", 1)],
        );
        assert_eq!(shares.len(), 2);
        assert_eq!(sum(&shares), 0);
    }

    #[test]
    fn all_nonpositive_ratios_fall_back_to_even_split() {
        let shares = split(
            Money::new(100_01),
            &[
                Participant::new("b", 0),
                Participant::new("c", -2),
                Participant::new("a", 0),
            ],
        );
        // Largest id ("c") absorbs the remainder; order is the caller's.
        assert_eq!(shares[0].amount, Money::new(33_33));
        assert_eq!(shares[1].amount, Money::new(33_35));
        assert_eq!(shares[2].amount, Money::new(33_33));
        assert_eq!(sum(&shares), 100_01);
    }

    #[test]
    fn single_participant_takes_everything() {
        let shares = split(Money::new(42_00), &[Participant::new("a", 7)]);
        assert_eq!(shares[0].amount, Money::new(42_00));
        assert_eq!(shares[0].percentage, 100.0);

        // Non-positive ratio goes through the even fallback and still owns
        // the full amount, keeping the sum invariant unconditional.
        let shares = split(Money::new(42_00), &[Participant::new("a", 0)]);
        assert_eq!(shares[0].amount, Money::new(42_00));
    }

    #[test]
    fn mixed_ratios_give_nonpositive_participants_nothing() {
        let shares = split(
            Money::new(90_00),
            &[
                Participant::new("a", 2),
                Participant::new("b", 0),
                Participant::new("c", 1),
            ],
        );
        assert_eq!(shares[0].amount, Money::new(60_00));
        assert_eq!(shares[1].amount, Money::ZERO);
        assert_eq!(shares[1].percentage, 0.0);
        assert_eq!(shares[2].amount, Money::new(30_00));
    }
}
