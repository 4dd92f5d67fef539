//! Balance aggregation and settle-up planning.
//!
//! Both functions are pure: they take a trip snapshot and return derived
//! values. Neither ever fails. An expense that cannot be applied cleanly is
//! left out whole and reported in [`BalanceSheet::skipped`] so the caller can
//! audit it.

use crate::constants::SETTLEMENT_EPSILON;
use crate::core::models::expense::Expense;
use crate::core::models::trip::Trip;
use crate::core::money::Cents;
use crate::core::split::{check_exact_sum, owed_amounts};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SkippedExpense {
    pub expense_id: String,
    pub reason: String,
}

/// Net position of every trip member. Positive: the group owes the member.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BalanceSheet {
    pub balances: BTreeMap<String, Cents>,
    pub skipped: Vec<SkippedExpense>,
}

impl BalanceSheet {
    /// Sum over all members; zero for a closed ledger.
    pub fn total(&self) -> Cents {
        self.balances.values().copied().sum()
    }

    pub fn balance_of(&self, member_id: &str) -> Option<Cents> {
        self.balances.get(member_id).copied()
    }
}

/// Suggested payment from a debtor to a creditor.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transfer {
    pub from: String,
    pub to: String,
    pub amount: Cents,
}

pub fn compute_balances(trip: &Trip, expenses: &[Expense]) -> BalanceSheet {
    let mut sheet = BalanceSheet {
        balances: trip.member_ids().map(|id| (id.to_string(), Cents::ZERO)).collect(),
        skipped: Vec::new(),
    };

    for expense in expenses {
        let applied = expense_deltas(trip, expense).and_then(|deltas| apply_deltas(&mut sheet.balances, &deltas));
        if let Err(reason) = applied {
            sheet.skipped.push(SkippedExpense {
                expense_id: expense.id.clone(),
                reason,
            });
        }
    }

    for balance in sheet.balances.values_mut() {
        if balance.abs() < SETTLEMENT_EPSILON {
            *balance = Cents::ZERO;
        }
    }
    sheet
}

fn expense_deltas<'a>(trip: &Trip, expense: &'a Expense) -> Result<Vec<(&'a str, Cents)>, String> {
    if expense.trip_id != trip.id {
        return Err(format!("belongs to trip {}", expense.trip_id));
    }
    if !trip.is_member(&expense.payer_id) {
        return Err(format!("payer {} is not a trip member", expense.payer_id));
    }
    check_exact_sum(expense.total_cost, &expense.splits)?;

    let owed = owed_amounts(expense.total_cost, &expense.splits).ok_or_else(|| "amount overflow".to_string())?;
    let mut deltas = Vec::with_capacity(owed.len() + 1);
    deltas.push((expense.payer_id.as_str(), expense.total_cost));
    for (member_id, amount) in owed {
        if !trip.is_member(member_id) {
            return Err(format!("split member {} is not a trip member", member_id));
        }
        deltas.push((member_id, -amount));
    }
    Ok(deltas)
}

// All-or-nothing: balances are only touched once every delta has been applied
// without overflow.
fn apply_deltas(balances: &mut BTreeMap<String, Cents>, deltas: &[(&str, Cents)]) -> Result<(), String> {
    let mut staged: HashMap<&str, Cents> = HashMap::new();
    for (member_id, delta) in deltas {
        let current = match staged.get(member_id) {
            Some(value) => *value,
            None => balances.get(*member_id).copied().unwrap_or(Cents::ZERO),
        };
        let next = current
            .checked_add(*delta)
            .ok_or_else(|| "balance overflow".to_string())?;
        staged.insert(*member_id, next);
    }
    for (member_id, value) in staged {
        balances.insert(member_id.to_string(), value);
    }
    Ok(())
}

/// Greedy settle-up: the largest debtor pays the largest creditor until every
/// balance is settled. Ties are broken by member id so the plan is stable.
pub fn plan_settlements(balances: &BTreeMap<String, Cents>) -> Vec<Transfer> {
    let mut creditors: Vec<(String, Cents)> = balances
        .iter()
        .filter(|(_, amount)| **amount >= SETTLEMENT_EPSILON)
        .map(|(id, amount)| (id.clone(), *amount))
        .collect();
    let mut debtors: Vec<(String, Cents)> = balances
        .iter()
        .filter(|(_, amount)| -**amount >= SETTLEMENT_EPSILON)
        .map(|(id, amount)| (id.clone(), -*amount))
        .collect();

    let by_amount = |a: &(String, Cents), b: &(String, Cents)| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0));
    creditors.sort_by(by_amount);
    debtors.sort_by(by_amount);

    let mut transfers = Vec::new();
    while !creditors.is_empty() && !debtors.is_empty() {
        let amount = creditors[0].1.min(debtors[0].1);
        transfers.push(Transfer {
            from: debtors[0].0.clone(),
            to: creditors[0].0.clone(),
            amount,
        });

        creditors[0].1 -= amount;
        debtors[0].1 -= amount;

        if creditors[0].1 < SETTLEMENT_EPSILON {
            creditors.remove(0);
        }
        if debtors[0].1 < SETTLEMENT_EPSILON {
            debtors.remove(0);
        }
        creditors.sort_by(by_amount);
        debtors.sort_by(by_amount);
    }

    transfers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::expense::{MoneyShare, PercentShare, Splits};
    use crate::core::models::trip::{Role, TripMember};
    use crate::core::money::Percentage;
    use chrono::Utc;

    fn trip(members: &[&str]) -> Trip {
        Trip {
            id: "trip".to_string(),
            name: "Lisbon".to_string(),
            members: members
                .iter()
                .enumerate()
                .map(|(i, id)| TripMember {
                    traveler_id: id.to_string(),
                    name: id.to_uppercase(),
                    role: if i == 0 { Role::Owner } else { Role::Member },
                })
                .collect(),
            created_by: members[0].to_string(),
            created_at: Utc::now(),
        }
    }

    fn expense(id: &str, payer: &str, total: i64, splits: Splits) -> Expense {
        let now = Utc::now();
        Expense {
            id: id.to_string(),
            trip_id: "trip".to_string(),
            title: id.to_string(),
            total_cost: Cents::new(total),
            payer_id: payer.to_string(),
            splits,
            version: 1,
            created_by: payer.to_string(),
            created_at: now,
            updated_at: now,
        }
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

    #[test]
    fn payer_is_credited_and_debtors_charged() {
        let trip = trip(&["a", "b", "c", "d"]);
        let lunch = expense("lunch", "c", 20_000, money(&[("a", 6667), ("c", 6667), ("d", 6666)]));
        let sheet = compute_balances(&trip, &[lunch]);
        assert_eq!(sheet.balance_of("c"), Some(Cents::new(13_333)));
        assert_eq!(sheet.balance_of("a"), Some(Cents::new(-6667)));
        assert_eq!(sheet.balance_of("d"), Some(Cents::new(-6666)));
        assert_eq!(sheet.balance_of("b"), Some(Cents::ZERO));
        assert_eq!(sheet.total(), Cents::ZERO);
    }

    #[test]
    fn order_of_expenses_does_not_matter() {
        let trip = trip(&["a", "b", "c"]);
        let first = expense("1", "a", 9_000, money(&[("a", 3000), ("b", 3000), ("c", 3000)]));
        let second = expense(
            "2",
            "b",
            1_000,
            Splits::Percentage(vec![
                PercentShare {
                    member_id: "a".to_string(),
                    percentage: Percentage::from_hundredths(3333),
                },
                PercentShare {
                    member_id: "c".to_string(),
                    percentage: Percentage::from_hundredths(6667),
                },
            ]),
        );
        let forward = compute_balances(&trip, &[first.clone(), second.clone()]);
        let backward = compute_balances(&trip, &[second, first]);
        assert_eq!(forward, backward);
        assert_eq!(forward.total(), Cents::ZERO);
    }

    #[test]
    fn malformed_expenses_are_skipped_whole() {
        let trip = trip(&["a", "b"]);
        let good = expense("good", "a", 1_000, money(&[("a", 500), ("b", 500)]));
        let outsider = expense("outsider", "a", 1_000, money(&[("a", 500), ("z", 500)]));
        let broken = expense("broken", "b", 1_000, money(&[("a", 400), ("b", 500)]));
        let mut foreign = expense("foreign", "a", 1_000, money(&[("a", 1_000)]));
        foreign.trip_id = "elsewhere".to_string();

        let sheet = compute_balances(&trip, &[good, outsider, broken, foreign]);
        assert_eq!(sheet.balance_of("a"), Some(Cents::new(500)));
        assert_eq!(sheet.balance_of("b"), Some(Cents::new(-500)));
        let skipped: Vec<_> = sheet.skipped.iter().map(|s| s.expense_id.as_str()).collect();
        assert_eq!(skipped, vec!["outsider", "broken", "foreign"]);
        assert_eq!(sheet.total(), Cents::ZERO);
    }

    #[test]
    fn settlement_plan_pays_off_every_debt() {
        let balances: BTreeMap<String, Cents> = [
            ("a".to_string(), Cents::new(90_000)),
            ("b".to_string(), Cents::new(-30_000)),
            ("c".to_string(), Cents::new(-30_000)),
            ("d".to_string(), Cents::new(-30_000)),
        ]
        .into_iter()
        .collect();
        let plan = plan_settlements(&balances);
        assert_eq!(plan.len(), 3);
        assert!(plan.iter().all(|t| t.to == "a" && t.amount == Cents::new(30_000)));
        let payers: Vec<_> = plan.iter().map(|t| t.from.as_str()).collect();
        assert_eq!(payers, vec!["b", "c", "d"]);
    }

    #[test]
    fn settlement_plan_matches_largest_first() {
        let balances: BTreeMap<String, Cents> = [
            ("a".to_string(), Cents::new(5_000)),
            ("b".to_string(), Cents::new(2_000)),
            ("c".to_string(), Cents::new(-6_000)),
            ("d".to_string(), Cents::new(-1_000)),
        ]
        .into_iter()
        .collect();
        let plan = plan_settlements(&balances);
        assert_eq!(
            plan,
            vec![
                Transfer {
                    from: "c".to_string(),
                    to: "a".to_string(),
                    amount: Cents::new(5_000)
                },
                Transfer {
                    from: "c".to_string(),
                    to: "b".to_string(),
                    amount: Cents::new(1_000)
                },
                Transfer {
                    from: "d".to_string(),
                    to: "b".to_string(),
                    amount: Cents::new(1_000)
                },
            ]
        );
    }
}
