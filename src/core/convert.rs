//! Conversion between money-based and percentage-based splits.
//!
//! Totals, payers and ids are never touched here; only the entries change
//! representation. Rounding follows the split calculator: half-to-even to two
//! decimals, with the last entry absorbing the residual.

use crate::core::errors::LedgerError;
use crate::core::models::expense::{MoneyShare, PercentShare, SplitType, Splits};
use crate::core::money::{Cents, Percentage};
use crate::core::split::owed_amounts;
use std::str::FromStr;

/// What to do when a zero-cost expense with several entries is converted to
/// percentages, where `cost / total` is undefined.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ZeroTotalPolicy {
    /// Give every entry an equal share of 100%.
    #[default]
    EqualShares,
    /// Fail with a conversion error.
    Reject,
}

impl FromStr for ZeroTotalPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "equal" | "equal_shares" => Ok(ZeroTotalPolicy::EqualShares),
            "reject" => Ok(ZeroTotalPolicy::Reject),
            other => Err(format!("unknown zero-cost conversion policy `{}`", other)),
        }
    }
}

/// Converts `splits` to `target`. Converting to the current type returns the
/// entries unchanged.
pub fn convert_splits(
    expense_id: &str,
    total: Cents,
    splits: &Splits,
    target: SplitType,
    policy: ZeroTotalPolicy,
) -> Result<Splits, LedgerError> {
    if splits.split_type() == target {
        return Ok(splits.clone());
    }
    if splits.is_empty() {
        return Err(LedgerError::Conversion(expense_id.to_string(), "expense has no split entries".to_string()));
    }
    match splits {
        Splits::Money(shares) => to_percentage(expense_id, total, shares, policy).map(Splits::Percentage),
        Splits::Percentage(_) => to_money(expense_id, total, splits).map(Splits::Money),
    }
}

fn to_percentage(
    expense_id: &str,
    total: Cents,
    shares: &[MoneyShare],
    policy: ZeroTotalPolicy,
) -> Result<Vec<PercentShare>, LedgerError> {
    let percentages = if total.is_zero() {
        if shares.len() > 1 && policy == ZeroTotalPolicy::Reject {
            return Err(LedgerError::Conversion(
                expense_id.to_string(),
                "total cost is zero, percentages are undefined".to_string(),
            ));
        }
        Percentage::split_evenly(shares.len())
    } else {
        let mut percentages = shares
            .iter()
            .map(|s| Percentage::of_ratio(s.cost, total))
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| LedgerError::Conversion(expense_id.to_string(), "percentage overflow".to_string()))?;
        absorb_residual(&mut percentages);
        percentages
    };

    Ok(shares
        .iter()
        .zip(percentages)
        .map(|(share, percentage)| PercentShare {
            member_id: share.member_id.clone(),
            percentage,
        })
        .collect())
}

fn to_money(expense_id: &str, total: Cents, splits: &Splits) -> Result<Vec<MoneyShare>, LedgerError> {
    let owed = owed_amounts(total, splits)
        .ok_or_else(|| LedgerError::Conversion(expense_id.to_string(), "amount overflow".to_string()))?;
    Ok(owed
        .into_iter()
        .map(|(member_id, cost)| MoneyShare {
            member_id: member_id.to_string(),
            cost,
        })
        .collect())
}

// Last entry takes the rounding residual; if that would make it negative
// (a zero share next to rounded-up ones) the largest entry takes it instead.
fn absorb_residual(percentages: &mut [Percentage]) {
    let sum: Percentage = percentages.iter().copied().sum();
    let residual = Percentage::FULL - sum;
    let Some(last) = percentages.len().checked_sub(1) else {
        return;
    };
    let target = if (percentages[last] + residual).is_negative() {
        percentages
            .iter()
            .enumerate()
            .max_by_key(|(_, p)| **p)
            .map(|(i, _)| i)
            .unwrap_or(last)
    } else {
        last
    };
    percentages[target] = percentages[target] + residual;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::split::check_exact_sum;

    fn money(entries: &[(&str, i64)]) -> Splits {
        Splits::Money(
            entries
                .iter()
                .map(|(id, c)| MoneyShare {
                    member_id: id.to_string(),
                    cost: Cents::new(*c),
                })
                .collect(),
        )
    }

    fn percent(entries: &[(&str, i64)]) -> Splits {
        Splits::Percentage(
            entries
                .iter()
                .map(|(id, p)| PercentShare {
                    member_id: id.to_string(),
                    percentage: Percentage::from_hundredths(*p),
                })
                .collect(),
        )
    }

    #[test]
    fn half_and_half_converts_both_ways() {
        let total = Cents::new(10_000);
        let original = percent(&[("a", 5000), ("b", 5000)]);
        let as_money = convert_splits("e", total, &original, SplitType::Money, ZeroTotalPolicy::default()).unwrap();
        assert_eq!(as_money, money(&[("a", 5000), ("b", 5000)]));
        let back = convert_splits("e", total, &as_money, SplitType::Percentage, ZeroTotalPolicy::default()).unwrap();
        assert_eq!(back, original);
    }

    #[test]
    fn money_to_percentage_sums_to_full() {
        let total = Cents::new(20_000);
        let splits = money(&[("a", 6667), ("c", 6667), ("d", 6666)]);
        let converted = convert_splits("e", total, &splits, SplitType::Percentage, ZeroTotalPolicy::default()).unwrap();
        assert_eq!(converted, percent(&[("a", 3334), ("c", 3334), ("d", 3332)]));
        assert!(check_exact_sum(total, &converted).is_ok());
    }

    #[test]
    fn round_trip_restores_costs_within_a_cent() {
        let total = Cents::new(9_731);
        let original = money(&[("a", 1234), ("b", 4321), ("c", 2176), ("d", 2000)]);
        let pct = convert_splits("e", total, &original, SplitType::Percentage, ZeroTotalPolicy::default()).unwrap();
        let back = convert_splits("e", total, &pct, SplitType::Money, ZeroTotalPolicy::default()).unwrap();
        assert!(check_exact_sum(total, &back).is_ok());
        let (Splits::Money(before), Splits::Money(after)) = (&original, &back) else {
            panic!("expected money splits");
        };
        for (b, a) in before.iter().zip(after) {
            assert_eq!(b.member_id, a.member_id);
            assert!((b.cost - a.cost).abs().cents() <= 1, "{} vs {}", b.cost, a.cost);
        }
    }

    #[test]
    fn same_type_is_a_no_op() {
        let splits = money(&[("a", 100)]);
        let converted = convert_splits("e", Cents::new(100), &splits, SplitType::Money, ZeroTotalPolicy::Reject).unwrap();
        assert_eq!(converted, splits);
    }

    #[test]
    fn zero_total_follows_policy() {
        let splits = money(&[("a", 0), ("b", 0)]);
        let equal = convert_splits("e", Cents::ZERO, &splits, SplitType::Percentage, ZeroTotalPolicy::EqualShares).unwrap();
        assert_eq!(equal, percent(&[("a", 5000), ("b", 5000)]));

        let rejected = convert_splits("e", Cents::ZERO, &splits, SplitType::Percentage, ZeroTotalPolicy::Reject);
        assert!(matches!(rejected, Err(LedgerError::Conversion(..))));

        let single = money(&[("a", 0)]);
        let converted = convert_splits("e", Cents::ZERO, &single, SplitType::Percentage, ZeroTotalPolicy::Reject).unwrap();
        assert_eq!(converted, percent(&[("a", 10_000)]));
    }

    #[test]
    fn zero_share_never_goes_negative() {
        // 16.67% + 16.67% + 66.67% overshoots by 0.01%; the trailing zero share
        // must not absorb it.
        let splits = money(&[("a", 1), ("b", 1), ("c", 4), ("d", 0)]);
        let converted =
            convert_splits("e", Cents::new(6), &splits, SplitType::Percentage, ZeroTotalPolicy::default()).unwrap();
        assert!(check_exact_sum(Cents::new(6), &converted).is_ok());
        assert_eq!(converted, percent(&[("a", 1667), ("b", 1667), ("c", 6666), ("d", 0)]));
    }

    #[test]
    fn policy_parses_from_config_strings() {
        assert_eq!("equal".parse::<ZeroTotalPolicy>(), Ok(ZeroTotalPolicy::EqualShares));
        assert_eq!("REJECT".parse::<ZeroTotalPolicy>(), Ok(ZeroTotalPolicy::Reject));
        assert!("maybe".parse::<ZeroTotalPolicy>().is_err());
    }
}
