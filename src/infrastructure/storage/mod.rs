use crate::core::errors::LedgerError;
use crate::core::models::{
    audit::TripAudit,
    expense::Expense,
    traveler::Traveler,
    trip::{Trip, TripMember},
};
use async_trait::async_trait;

/// Expenses of one trip together with the trip's ledger revision, read
/// atomically.
#[derive(Clone, Debug, Default)]
pub struct LedgerSnapshot {
    pub revision: u64,
    pub expenses: Vec<Expense>,
}

#[async_trait]
pub trait Storage: Send + Sync {
    /// Returns `None` when the email is already registered.
    async fn create_traveler_if_not_exists(&self, traveler: Traveler) -> Result<Option<Traveler>, LedgerError>;
    async fn get_traveler(&self, traveler_id: &str) -> Result<Option<Traveler>, LedgerError>;
    async fn get_traveler_by_email(&self, email: &str) -> Result<Option<Traveler>, LedgerError>;

    /// Inserts or replaces a trip. Bumps the trip's ledger revision, since
    /// the member set feeds into its balances.
    async fn save_trip(&self, trip: Trip) -> Result<(), LedgerError>;
    async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, LedgerError>;
    /// Appends a member to the stored trip. Fails with `AlreadyTripMember`
    /// if the traveler is on it already.
    async fn add_trip_member(&self, trip_id: &str, member: TripMember) -> Result<Trip, LedgerError>;
    /// Removes a member from the stored trip. Fails with
    /// `MemberHasExpenses` while any expense of the trip names the traveler
    /// as payer or debtor; the check and the removal happen under one lock.
    async fn remove_trip_member(&self, trip_id: &str, traveler_id: &str) -> Result<Trip, LedgerError>;
    /// Removes the trip, its audit trail and every expense it owns; returns
    /// the number of expenses removed.
    async fn delete_trip(&self, trip_id: &str) -> Result<usize, LedgerError>;
    async fn get_traveler_trips(&self, traveler_id: &str) -> Result<Vec<Trip>, LedgerError>;

    /// Stores a new expense and bumps its trip's ledger revision. Fails with
    /// `TripNotFound` if the trip is gone, or when the payer or a split member
    /// is no longer on the trip.
    async fn insert_expense(&self, expense: Expense) -> Result<(), LedgerError>;
    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, LedgerError>;
    /// Compare-and-swap on `expected_version`. The stored copy gets version
    /// `expected_version + 1` and is returned. Membership is re-checked as in
    /// [`Storage::insert_expense`].
    async fn replace_expense(&self, expense: Expense, expected_version: u64) -> Result<Expense, LedgerError>;
    /// Removes an expense, checking its version when one is given.
    async fn delete_expense(&self, expense_id: &str, expected_version: Option<u64>) -> Result<Expense, LedgerError>;
    async fn get_ledger(&self, trip_id: &str) -> Result<LedgerSnapshot, LedgerError>;
    async fn get_ledger_revision(&self, trip_id: &str) -> Result<u64, LedgerError>;

    async fn save_trip_audit(&self, audit: TripAudit) -> Result<(), LedgerError>;
    async fn get_trip_audits(&self, trip_id: &str) -> Result<Vec<TripAudit>, LedgerError>;
}

pub mod in_memory;
