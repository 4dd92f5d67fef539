//! Split calculator.
//!
//! Turns an expense total and its split entries into per-member owed amounts,
//! and validates entries before they are stored. Inputs that miss the exact
//! sum by no more than [`SPLIT_TOLERANCE`] are accepted and normalized: the
//! last entry absorbs the residual so the stored set adds up exactly.
//!
//! [`SPLIT_TOLERANCE`]: crate::constants::SPLIT_TOLERANCE

use crate::constants::{MAX_AMOUNT, SPLIT_TOLERANCE};
use crate::core::errors::LedgerError;
use crate::core::models::expense::{MoneyShare, PercentShare, SplitType, Splits};
use crate::core::money::{Cents, Percentage};
use std::collections::HashSet;

/// Builds equal shares for `members`, last member absorbing the remainder.
pub fn equal_splits(total: Cents, members: &[String], split_type: SplitType) -> Result<Splits, LedgerError> {
    if total.is_negative() {
        return Err(LedgerError::InvalidSplit("total cost cannot be negative".to_string()));
    }
    if members.is_empty() {
        return Err(LedgerError::InvalidSplit("at least one member is required".to_string()));
    }
    let mut seen = HashSet::new();
    for member in members {
        if !seen.insert(member.as_str()) {
            return Err(LedgerError::DuplicateSplitMember(member.clone()));
        }
    }

    let splits = match split_type {
        SplitType::Money => Splits::Money(
            members
                .iter()
                .zip(total.split_evenly(members.len()))
                .map(|(member_id, cost)| MoneyShare {
                    member_id: member_id.clone(),
                    cost,
                })
                .collect(),
        ),
        SplitType::Percentage => Splits::Percentage(
            members
                .iter()
                .zip(Percentage::split_evenly(members.len()))
                .map(|(member_id, percentage)| PercentShare {
                    member_id: member_id.clone(),
                    percentage,
                })
                .collect(),
        ),
    };
    Ok(splits)
}

/// Validates `splits` against `total` and the trip's member set and returns
/// the normalized entries.
pub fn validate_splits(total: Cents, splits: Splits, trip_members: &HashSet<&str>) -> Result<Splits, LedgerError> {
    if total.is_negative() {
        return Err(LedgerError::InvalidSplit("total cost cannot be negative".to_string()));
    }
    if splits.is_empty() {
        return Err(LedgerError::InvalidSplit("at least one split entry is required".to_string()));
    }

    let mut seen = HashSet::new();
    for member_id in splits.member_ids() {
        if !trip_members.contains(member_id) {
            return Err(LedgerError::InvalidSplitMember(member_id.to_string()));
        }
        if !seen.insert(member_id) {
            return Err(LedgerError::DuplicateSplitMember(member_id.to_string()));
        }
    }

    match splits {
        Splits::Money(mut shares) => {
            if shares.iter().any(|s| s.cost.is_negative()) {
                return Err(LedgerError::InvalidSplit("split costs cannot be negative".to_string()));
            }
            if shares.iter().any(|s| s.cost > MAX_AMOUNT) {
                return Err(LedgerError::InvalidSplit(format!("split costs cannot exceed {}", MAX_AMOUNT)));
            }
            let sum = shares
                .iter()
                .try_fold(Cents::ZERO, |acc, s| acc.checked_add(s.cost))
                .ok_or_else(|| LedgerError::InvalidSplit("split costs overflow".to_string()))?;
            let residual = total - sum;
            if residual.abs().cents() > SPLIT_TOLERANCE {
                return Err(LedgerError::InvalidSplit(format!(
                    "split costs sum to {} but total cost is {}",
                    sum, total
                )));
            }
            if let Some(last) = shares.last_mut() {
                last.cost += residual;
                if last.cost.is_negative() {
                    return Err(LedgerError::InvalidSplit("split costs cannot be negative".to_string()));
                }
            }
            Ok(Splits::Money(shares))
        }
        Splits::Percentage(mut shares) => {
            if shares.iter().any(|s| s.percentage.is_negative()) {
                return Err(LedgerError::InvalidSplit("percentages cannot be negative".to_string()));
            }
            if shares.iter().any(|s| s.percentage > Percentage::FULL) {
                return Err(LedgerError::InvalidSplit("percentages cannot exceed 100.00%".to_string()));
            }
            let sum = shares
                .iter()
                .try_fold(Percentage::ZERO, |acc, s| acc.checked_add(s.percentage))
                .ok_or_else(|| LedgerError::InvalidSplit("percentages overflow".to_string()))?;
            let residual = Percentage::FULL - sum;
            if residual.hundredths().abs() > SPLIT_TOLERANCE {
                return Err(LedgerError::InvalidSplit(format!(
                    "percentages sum to {} instead of 100.00%",
                    sum
                )));
            }
            if let Some(last) = shares.last_mut() {
                last.percentage = last.percentage + residual;
                if last.percentage.is_negative() {
                    return Err(LedgerError::InvalidSplit("percentages cannot be negative".to_string()));
                }
            }
            Ok(Splits::Percentage(shares))
        }
    }
}

/// Checks the stored-form invariant: entries add up *exactly* to the total
/// (money) or to 100.00% (percentage).
pub fn check_exact_sum(total: Cents, splits: &Splits) -> Result<(), String> {
    if total.is_negative() {
        return Err(format!("negative total cost {}", total));
    }
    if splits.is_empty() {
        return Err("no split entries".to_string());
    }
    match splits {
        Splits::Money(shares) => {
            let sum = shares
                .iter()
                .try_fold(Cents::ZERO, |acc, s| acc.checked_add(s.cost))
                .ok_or_else(|| "split costs overflow".to_string())?;
            if sum != total {
                return Err(format!("split costs sum to {} but total cost is {}", sum, total));
            }
        }
        Splits::Percentage(shares) => {
            let sum = shares
                .iter()
                .try_fold(Percentage::ZERO, |acc, s| acc.checked_add(s.percentage))
                .ok_or_else(|| "percentages overflow".to_string())?;
            if sum != Percentage::FULL {
                return Err(format!("percentages sum to {}", sum));
            }
        }
    }
    Ok(())
}

/// Per-member owed amounts, in split order.
///
/// Percentage shares are rounded half-to-even to the cent and the last entry
/// absorbs the residual, so the amounts always add up to `total`. Returns
/// `None` only on arithmetic overflow.
pub fn owed_amounts(total: Cents, splits: &Splits) -> Option<Vec<(&str, Cents)>> {
    match splits {
        Splits::Money(shares) => Some(shares.iter().map(|s| (s.member_id.as_str(), s.cost)).collect()),
        Splits::Percentage(shares) => {
            let mut owed = Vec::with_capacity(shares.len());
            let mut allocated = Cents::ZERO;
            for share in shares {
                let amount = total.share(share.percentage)?;
                allocated = allocated.checked_add(amount)?;
                owed.push((share.member_id.as_str(), amount));
            }
            let residual = total.checked_sub(allocated)?;
            if let Some((_, last)) = owed.last_mut() {
                *last = last.checked_add(residual)?;
            }
            Some(owed)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members(ids: &[&str]) -> Vec<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

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
    fn equal_money_split_gives_last_member_the_remainder() {
        let splits = equal_splits(Cents::new(10_000), &members(&["a", "b", "c"]), SplitType::Money).unwrap();
        assert_eq!(splits, money(&[("a", 3333), ("b", 3333), ("c", 3334)]));
    }

    #[test]
    fn equal_percentage_split_sums_to_full() {
        let splits = equal_splits(Cents::new(500), &members(&["a", "b", "c"]), SplitType::Percentage).unwrap();
        assert_eq!(splits, percent(&[("a", 3333), ("b", 3333), ("c", 3334)]));
    }

    #[test]
    fn equal_split_rejects_empty_and_duplicate_members() {
        assert!(matches!(
            equal_splits(Cents::new(100), &[], SplitType::Money),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert_eq!(
            equal_splits(Cents::new(100), &members(&["a", "a"]), SplitType::Money),
            Err(LedgerError::DuplicateSplitMember("a".to_string()))
        );
    }

    #[test]
    fn validation_normalizes_within_tolerance() {
        let trip: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let splits = validate_splits(Cents::new(10_000), money(&[("a", 3333), ("b", 3333), ("c", 3333)]), &trip).unwrap();
        assert_eq!(splits, money(&[("a", 3333), ("b", 3333), ("c", 3334)]));

        let splits = validate_splits(Cents::new(10_000), percent(&[("a", 3333), ("b", 3333), ("c", 3333)]), &trip).unwrap();
        assert_eq!(splits, percent(&[("a", 3333), ("b", 3333), ("c", 3334)]));
    }

    #[test]
    fn validation_rejects_bad_sums_and_members() {
        let trip: HashSet<&str> = ["a", "b"].into_iter().collect();
        assert!(matches!(
            validate_splits(Cents::new(10_000), money(&[("a", 5000), ("b", 4000)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(Cents::new(10_000), percent(&[("a", 5000), ("b", 4900)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert_eq!(
            validate_splits(Cents::new(10_000), money(&[("a", 5000), ("z", 5000)]), &trip),
            Err(LedgerError::InvalidSplitMember("z".to_string()))
        );
        assert!(matches!(
            validate_splits(Cents::new(-1), money(&[("a", -1)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(Cents::new(100), money(&[("a", 150), ("b", -50)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
    }

    #[test]
    fn validation_rejects_oversized_entries() {
        let trip: HashSet<&str> = ["a", "b", "c"].into_iter().collect();
        let huge = Cents::from_decimal(5.0e16).unwrap().cents();
        assert!(matches!(
            validate_splits(Cents::new(100), money(&[("a", huge), ("b", huge)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        // Entries whose sum would wrap around to the total.
        let wrapping = money(&[
            ("a", 6_000_000_000_000_000_000),
            ("b", 6_000_000_000_000_000_000),
            ("c", 6_446_744_073_709_552_640),
        ]);
        assert!(matches!(
            validate_splits(Cents::new(1_024), wrapping, &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(Cents::new(100), money(&[("a", MAX_AMOUNT.cents() + 1), ("b", 0)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(Cents::new(100), percent(&[("a", huge), ("b", huge)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(matches!(
            validate_splits(Cents::new(100), percent(&[("a", 20_000), ("b", 0)]), &trip),
            Err(LedgerError::InvalidSplit(_))
        ));
        assert!(check_exact_sum(Cents::new(100), &percent(&[("a", i64::MAX), ("b", 1)])).is_err());
    }

    #[test]
    fn owed_amounts_for_percentages_add_up_to_total() {
        let splits = percent(&[("a", 3333), ("b", 3333), ("c", 3334)]);
        let owed = owed_amounts(Cents::new(100), &splits).unwrap();
        let total: Cents = owed.iter().map(|(_, c)| *c).sum();
        assert_eq!(total, Cents::new(100));
        assert_eq!(owed[0], ("a", Cents::new(33)));
        assert_eq!(owed[2], ("c", Cents::new(34)));
    }

    #[test]
    fn exact_sum_check() {
        assert!(check_exact_sum(Cents::new(200), &money(&[("a", 100), ("b", 100)])).is_ok());
        assert!(check_exact_sum(Cents::new(200), &money(&[("a", 100), ("b", 99)])).is_err());
        assert!(check_exact_sum(Cents::new(200), &percent(&[("a", 9999)])).is_err());
    }
}
