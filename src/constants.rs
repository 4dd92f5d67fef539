use crate::core::money::Cents;

/// Largest gap, in minor units (0.01 or 0.01%), between submitted split
/// entries and their target sum that is still accepted and normalized.
pub const SPLIT_TOLERANCE: i64 = 1;

/// Balances strictly below this magnitude are reported as settled.
pub const SETTLEMENT_EPSILON: Cents = Cents::new(1);

/// Upper bound for any single amount accepted at the boundary (1,000,000.00).
pub const MAX_AMOUNT: Cents = Cents::new(100_000_000);

pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_TITLE_LENGTH: usize = 255;

// Audit actions
pub const TRAVELER_REGISTERED: &str = "TRAVELER_REGISTERED";
pub const TRAVELER_LOGGED_IN: &str = "TRAVELER_LOGGED_IN";
pub const TRIP_CREATED: &str = "TRIP_CREATED";
pub const TRIP_DELETED: &str = "TRIP_DELETED";
pub const MEMBER_ADDED: &str = "MEMBER_ADDED";
pub const MEMBER_REMOVED: &str = "MEMBER_REMOVED";
pub const EXPENSE_CREATED: &str = "EXPENSE_CREATED";
pub const EXPENSE_MODIFIED: &str = "EXPENSE_MODIFIED";
pub const EXPENSE_CONVERTED: &str = "EXPENSE_CONVERTED";
pub const EXPENSE_DELETED: &str = "EXPENSE_DELETED";
pub const BALANCE_EXPENSE_SKIPPED: &str = "BALANCE_EXPENSE_SKIPPED";
