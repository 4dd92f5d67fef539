use crate::core::money::{Cents, Percentage};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, ToSchema, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SplitType {
    Money,
    Percentage,
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SplitType::Money => "money",
            SplitType::Percentage => "percentage",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for SplitType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "money" => Ok(SplitType::Money),
            "percentage" => Ok(SplitType::Percentage),
            other => Err(format!("unknown split type `{}`", other)),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct MoneyShare {
    pub member_id: String,
    pub cost: Cents,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PercentShare {
    pub member_id: String,
    pub percentage: Percentage,
}

/// Per-member split entries. The variant is the expense's split type, so an
/// entry can never carry both a cost and a percentage.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "split_type", content = "entries", rename_all = "lowercase")]
pub enum Splits {
    Money(Vec<MoneyShare>),
    Percentage(Vec<PercentShare>),
}

impl Splits {
    pub fn split_type(&self) -> SplitType {
        match self {
            Splits::Money(_) => SplitType::Money,
            Splits::Percentage(_) => SplitType::Percentage,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Splits::Money(shares) => shares.len(),
            Splits::Percentage(shares) => shares.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn member_ids(&self) -> Vec<&str> {
        match self {
            Splits::Money(shares) => shares.iter().map(|s| s.member_id.as_str()).collect(),
            Splits::Percentage(shares) => shares.iter().map(|s| s.member_id.as_str()).collect(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Expense {
    pub id: String,
    pub trip_id: String,
    pub title: String,
    pub total_cost: Cents,
    pub payer_id: String,
    pub splits: Splits,
    /// Starts at 1 and grows with every accepted write.
    pub version: u64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn split_type(&self) -> SplitType {
        self.splits.split_type()
    }

    /// True when the traveler paid for or owes a share of this expense.
    pub fn involves(&self, traveler_id: &str) -> bool {
        self.payer_id == traveler_id || self.splits.member_ids().contains(&traveler_id)
    }
}
