use crate::core::errors::LedgerError;
use crate::core::models::{
    audit::TripAudit,
    expense::Expense,
    traveler::Traveler,
    trip::{Trip, TripMember},
};
use crate::infrastructure::storage::{LedgerSnapshot, Storage};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Ledger {
    expenses: HashMap<String, Expense>,
    // trip_id -> revision
    revisions: HashMap<String, u64>,
}

impl Ledger {
    fn bump(&mut self, trip_id: &str) {
        *self.revisions.entry(trip_id.to_string()).or_insert(0) += 1;
    }
}

fn check_participants(trip: &Trip, expense: &Expense) -> Result<(), LedgerError> {
    if !trip.is_member(&expense.payer_id) {
        return Err(LedgerError::invalid_input(
            "payer_id",
            "Invalid payer",
            format!("Payer {} is not a member of the trip", expense.payer_id),
        ));
    }
    if let Some(outsider) = expense.splits.member_ids().into_iter().find(|m| !trip.is_member(m)) {
        return Err(LedgerError::InvalidSplitMember(outsider.to_string()));
    }
    Ok(())
}

/// In-memory storage. Lock order is `trips` before `ledger` wherever both are
/// held.
#[derive(Clone)]
pub struct InMemoryStorage {
    travelers: Arc<RwLock<HashMap<String, Traveler>>>,
    travelers_by_email: Arc<RwLock<HashMap<String, String>>>,
    trips: Arc<RwLock<HashMap<String, Trip>>>,
    ledger: Arc<RwLock<Ledger>>,
    trip_audits: Arc<RwLock<HashMap<String, Vec<TripAudit>>>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        InMemoryStorage {
            travelers: Arc::new(RwLock::new(HashMap::new())),
            travelers_by_email: Arc::new(RwLock::new(HashMap::new())),
            trips: Arc::new(RwLock::new(HashMap::new())),
            ledger: Arc::new(RwLock::new(Ledger::default())),
            trip_audits: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn create_traveler_if_not_exists(&self, traveler: Traveler) -> Result<Option<Traveler>, LedgerError> {
        let mut travelers_by_email = self.travelers_by_email.write().await;
        if travelers_by_email.contains_key(&traveler.email) {
            return Ok(None);
        }
        travelers_by_email.insert(traveler.email.clone(), traveler.id.clone());
        let mut travelers = self.travelers.write().await;
        travelers.insert(traveler.id.clone(), traveler.clone());
        Ok(Some(traveler))
    }

    async fn get_traveler(&self, traveler_id: &str) -> Result<Option<Traveler>, LedgerError> {
        let travelers = self.travelers.read().await;
        Ok(travelers.get(traveler_id).cloned())
    }

    async fn get_traveler_by_email(&self, email: &str) -> Result<Option<Traveler>, LedgerError> {
        let travelers_by_email = self.travelers_by_email.read().await;
        let travelers = self.travelers.read().await;
        Ok(travelers_by_email.get(email).and_then(|id| travelers.get(id).cloned()))
    }

    async fn save_trip(&self, trip: Trip) -> Result<(), LedgerError> {
        let mut trips = self.trips.write().await;
        let mut ledger = self.ledger.write().await;
        ledger.bump(&trip.id);
        trips.insert(trip.id.clone(), trip);
        Ok(())
    }

    async fn get_trip(&self, trip_id: &str) -> Result<Option<Trip>, LedgerError> {
        let trips = self.trips.read().await;
        Ok(trips.get(trip_id).cloned())
    }

    async fn add_trip_member(&self, trip_id: &str, member: TripMember) -> Result<Trip, LedgerError> {
        let mut trips = self.trips.write().await;
        let trip = trips
            .get_mut(trip_id)
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))?;
        if trip.is_member(&member.traveler_id) {
            return Err(LedgerError::AlreadyTripMember(member.traveler_id));
        }
        trip.members.push(member);
        let updated = trip.clone();
        self.ledger.write().await.bump(trip_id);
        Ok(updated)
    }

    async fn remove_trip_member(&self, trip_id: &str, traveler_id: &str) -> Result<Trip, LedgerError> {
        let mut trips = self.trips.write().await;
        let trip = trips
            .get_mut(trip_id)
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))?;
        if !trip.is_member(traveler_id) {
            return Err(LedgerError::NotTripMember(traveler_id.to_string()));
        }
        let mut ledger = self.ledger.write().await;
        if ledger
            .expenses
            .values()
            .any(|e| e.trip_id == trip_id && e.involves(traveler_id))
        {
            return Err(LedgerError::MemberHasExpenses(traveler_id.to_string()));
        }
        trip.members.retain(|m| m.traveler_id != traveler_id);
        ledger.bump(trip_id);
        Ok(trip.clone())
    }

    async fn delete_trip(&self, trip_id: &str) -> Result<usize, LedgerError> {
        let mut trips = self.trips.write().await;
        if trips.remove(trip_id).is_none() {
            return Err(LedgerError::TripNotFound(trip_id.to_string()));
        }
        let mut ledger = self.ledger.write().await;
        let before = ledger.expenses.len();
        ledger.expenses.retain(|_, e| e.trip_id != trip_id);
        let removed = before - ledger.expenses.len();
        ledger.bump(trip_id);
        self.trip_audits.write().await.remove(trip_id);
        Ok(removed)
    }

    async fn get_traveler_trips(&self, traveler_id: &str) -> Result<Vec<Trip>, LedgerError> {
        let trips = self.trips.read().await;
        let mut found: Vec<Trip> = trips.values().filter(|t| t.is_member(traveler_id)).cloned().collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(found)
    }

    async fn insert_expense(&self, expense: Expense) -> Result<(), LedgerError> {
        let trips = self.trips.read().await;
        let trip = trips
            .get(&expense.trip_id)
            .ok_or_else(|| LedgerError::TripNotFound(expense.trip_id.clone()))?;
        check_participants(trip, &expense)?;
        let mut ledger = self.ledger.write().await;
        if ledger.expenses.contains_key(&expense.id) {
            return Err(LedgerError::StorageError(format!("Expense {} already exists", expense.id)));
        }
        ledger.bump(&expense.trip_id);
        ledger.expenses.insert(expense.id.clone(), expense);
        Ok(())
    }

    async fn get_expense(&self, expense_id: &str) -> Result<Option<Expense>, LedgerError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.expenses.get(expense_id).cloned())
    }

    async fn replace_expense(&self, mut expense: Expense, expected_version: u64) -> Result<Expense, LedgerError> {
        let trips = self.trips.read().await;
        let trip = trips
            .get(&expense.trip_id)
            .ok_or_else(|| LedgerError::TripNotFound(expense.trip_id.clone()))?;
        check_participants(trip, &expense)?;
        let mut ledger = self.ledger.write().await;
        let stored = ledger
            .expenses
            .get(&expense.id)
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense.id.clone()))?;
        if stored.version != expected_version {
            return Err(LedgerError::ConcurrentModification {
                expense_id: expense.id.clone(),
                expected: expected_version,
                actual: stored.version,
            });
        }
        if stored.trip_id != expense.trip_id {
            return Err(LedgerError::StorageError(format!(
                "Expense {} cannot move between trips",
                expense.id
            )));
        }
        expense.version = expected_version + 1;
        ledger.bump(&expense.trip_id);
        ledger.expenses.insert(expense.id.clone(), expense.clone());
        Ok(expense)
    }

    async fn delete_expense(&self, expense_id: &str, expected_version: Option<u64>) -> Result<Expense, LedgerError> {
        let mut ledger = self.ledger.write().await;
        let stored = ledger
            .expenses
            .get(expense_id)
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))?;
        if let Some(expected) = expected_version {
            if stored.version != expected {
                return Err(LedgerError::ConcurrentModification {
                    expense_id: expense_id.to_string(),
                    expected,
                    actual: stored.version,
                });
            }
        }
        let trip_id = stored.trip_id.clone();
        let removed = ledger
            .expenses
            .remove(expense_id)
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))?;
        ledger.bump(&trip_id);
        Ok(removed)
    }

    async fn get_ledger(&self, trip_id: &str) -> Result<LedgerSnapshot, LedgerError> {
        let ledger = self.ledger.read().await;
        let mut expenses: Vec<Expense> = ledger
            .expenses
            .values()
            .filter(|e| e.trip_id == trip_id)
            .cloned()
            .collect();
        expenses.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(LedgerSnapshot {
            revision: ledger.revisions.get(trip_id).copied().unwrap_or(0),
            expenses,
        })
    }

    async fn get_ledger_revision(&self, trip_id: &str) -> Result<u64, LedgerError> {
        let ledger = self.ledger.read().await;
        Ok(ledger.revisions.get(trip_id).copied().unwrap_or(0))
    }

    async fn save_trip_audit(&self, audit: TripAudit) -> Result<(), LedgerError> {
        let mut trip_audits = self.trip_audits.write().await;
        trip_audits.entry(audit.trip_id.clone()).or_default().push(audit);
        Ok(())
    }

    async fn get_trip_audits(&self, trip_id: &str) -> Result<Vec<TripAudit>, LedgerError> {
        let trip_audits = self.trip_audits.read().await;
        Ok(trip_audits.get(trip_id).cloned().unwrap_or_default())
    }
}
