use crate::auth::jwt::{Claims, JwtService};
use crate::constants::{
    BALANCE_EXPENSE_SKIPPED, EXPENSE_CONVERTED, EXPENSE_CREATED, EXPENSE_DELETED, EXPENSE_MODIFIED,
    MAX_AMOUNT, MAX_NAME_LENGTH, MAX_TITLE_LENGTH, MEMBER_ADDED, MEMBER_REMOVED, TRAVELER_LOGGED_IN,
    TRAVELER_REGISTERED, TRIP_CREATED, TRIP_DELETED,
};
use crate::core::balance::{BalanceSheet, Transfer, compute_balances, plan_settlements};
use crate::core::convert::{ZeroTotalPolicy, convert_splits};
use crate::core::errors::LedgerError;
use crate::core::models::{
    audit::{AppLog, TripAudit},
    expense::{Expense, SplitType, Splits},
    traveler::Traveler,
    trip::{Role, Trip, TripMember},
};
use crate::core::money::Cents;
use crate::core::split::{equal_splits, validate_splits};
use crate::infrastructure::cache::{Cache, CachedBalances};
use crate::infrastructure::logging::LoggingService;
use crate::infrastructure::storage::Storage;
use chrono::Utc;
use serde_json::json;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Knobs the service needs at runtime. Built from `CONFIG` in `main` and by
/// hand in tests.
#[derive(Clone)]
pub struct ServiceSettings {
    pub jwt_secret: String,
    pub session_ttl: Duration,
    pub balance_cache_ttl: Duration,
    pub zero_cost_policy: ZeroTotalPolicy,
    pub password_cost: u32,
}

impl ServiceSettings {
    pub fn new(jwt_secret: impl Into<String>) -> Self {
        ServiceSettings {
            jwt_secret: jwt_secret.into(),
            session_ttl: Duration::from_secs(3600),
            balance_cache_ttl: Duration::from_secs(300),
            zero_cost_policy: ZeroTotalPolicy::default(),
            password_cost: bcrypt::DEFAULT_COST,
        }
    }
}

impl std::fmt::Debug for ServiceSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceSettings")
            .field("jwt_secret", &"<redacted>")
            .field("session_ttl", &self.session_ttl)
            .field("balance_cache_ttl", &self.balance_cache_ttl)
            .field("zero_cost_policy", &self.zero_cost_policy)
            .field("password_cost", &self.password_cost)
            .finish()
    }
}

/// Fields shared by both ways of creating an expense.
#[derive(Clone, Debug)]
pub struct NewExpense {
    pub title: String,
    pub payer_id: String,
    pub total_cost: Cents,
}

/// Full replacement of an expense's total and split set. `title` and
/// `payer_id` keep their stored values when `None`.
#[derive(Clone, Debug)]
pub struct ExpenseUpdate {
    pub title: Option<String>,
    pub payer_id: Option<String>,
    pub total_cost: Cents,
    pub splits: Splits,
    pub expected_version: Option<u64>,
}

pub struct LedgerService<L: LoggingService, S: Storage, C: Cache> {
    storage: S,
    logging: L,
    cache: C,
    jwt_service: JwtService,
    balance_cache_ttl: Duration,
    zero_cost_policy: ZeroTotalPolicy,
    password_cost: u32,
}

impl<L: LoggingService, S: Storage, C: Cache> LedgerService<L, S, C> {
    pub fn new(storage: S, logging: L, cache: C, settings: ServiceSettings) -> Self {
        LedgerService {
            storage,
            logging,
            cache,
            jwt_service: JwtService::new(settings.jwt_secret, settings.session_ttl),
            balance_cache_ttl: settings.balance_cache_ttl,
            zero_cost_policy: settings.zero_cost_policy,
            password_cost: settings.password_cost,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<Claims, LedgerError> {
        self.jwt_service.validate_token(token)
    }

    async fn require_traveler(&self, traveler_id: &str) -> Result<Traveler, LedgerError> {
        self.storage
            .get_traveler(traveler_id)
            .await?
            .ok_or_else(|| LedgerError::TravelerNotFound(traveler_id.to_string()))
    }

    async fn load_trip(&self, trip_id: &str) -> Result<Trip, LedgerError> {
        self.storage
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| LedgerError::TripNotFound(trip_id.to_string()))
    }

    async fn trip_for_member(&self, trip_id: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        let trip = self.load_trip(trip_id).await?;
        if !trip.is_member(actor_id) {
            return Err(LedgerError::NotTripMember(actor_id.to_string()));
        }
        Ok(trip)
    }

    async fn trip_for_owner(&self, trip_id: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        let trip = self.load_trip(trip_id).await?;
        if !trip.is_owner(actor_id) {
            return Err(LedgerError::NotTripOwner(actor_id.to_string()));
        }
        Ok(trip)
    }

    async fn expense_for_member(&self, expense_id: &str, actor_id: &str) -> Result<(Expense, Trip), LedgerError> {
        let expense = self
            .storage
            .get_expense(expense_id)
            .await?
            .ok_or_else(|| LedgerError::ExpenseNotFound(expense_id.to_string()))?;
        let trip = self.trip_for_member(&expense.trip_id, actor_id).await?;
        Ok((expense, trip))
    }

    async fn log_and_audit(
        &self,
        trip_id: Option<&str>,
        action: &str,
        log_details: serde_json::Value,
        user_id: Option<&str>,
    ) -> Result<(), LedgerError> {
        self.logging.log_action(action, log_details.clone(), user_id).await?;
        if let Some(tid) = trip_id {
            self.storage
                .save_trip_audit(TripAudit {
                    id: Uuid::new_v4().to_string(),
                    trip_id: tid.to_string(),
                    action: action.to_string(),
                    user_id: user_id.map(String::from),
                    details: log_details,
                    timestamp: Utc::now(),
                })
                .await?;
        }
        Ok(())
    }

    fn validate_string_input(&self, field: &str, value: &str, max_length: usize) -> Result<(), LedgerError> {
        if value.trim().is_empty() {
            return Err(LedgerError::invalid_input(
                field,
                format!("Invalid {}", field),
                format!("{} cannot be empty", field),
            ));
        }
        if value.chars().count() > max_length {
            return Err(LedgerError::invalid_input(
                field,
                format!("{} Too Long", field),
                format!("{} cannot exceed {} characters", field, max_length),
            ));
        }
        if value.chars().any(|c| c.is_control() || "<>{}[]".contains(c)) {
            return Err(LedgerError::invalid_input(
                field,
                format!("Invalid {}", field),
                format!("{} contains invalid characters", field),
            ));
        }
        Ok(())
    }

    fn validate_amount_input(&self, field: &str, amount: Cents) -> Result<(), LedgerError> {
        if amount.is_negative() {
            return Err(LedgerError::invalid_input(
                field,
                "Invalid Amount",
                "Amount cannot be negative",
            ));
        }
        if amount > MAX_AMOUNT {
            return Err(LedgerError::invalid_input(
                field,
                "Amount Too Large",
                format!("Amount cannot exceed {}", MAX_AMOUNT),
            ));
        }
        Ok(())
    }

    fn validate_payer(&self, trip: &Trip, payer_id: &str) -> Result<(), LedgerError> {
        if !trip.is_member(payer_id) {
            return Err(LedgerError::invalid_input(
                "payer_id",
                "Invalid payer",
                format!("Payer {} is not a member of the trip", payer_id),
            ));
        }
        Ok(())
    }

    fn check_version(expense: &Expense, expected_version: Option<u64>) -> Result<u64, LedgerError> {
        match expected_version {
            Some(expected) if expected != expense.version => Err(LedgerError::ConcurrentModification {
                expense_id: expense.id.clone(),
                expected,
                actual: expense.version,
            }),
            _ => Ok(expense.version),
        }
    }

    pub async fn register_traveler(&self, name: &str, email: &str, password: &str) -> Result<Traveler, LedgerError> {
        let email = email.trim().to_lowercase();
        if email.is_empty() {
            return Err(LedgerError::MissingEmail);
        }
        if !email.contains('@') || !email.contains('.') || email.len() < 5 {
            return Err(LedgerError::InvalidEmail(email));
        }
        if password.is_empty() {
            return Err(LedgerError::invalid_input(
                "password",
                "Invalid password",
                "Password cannot be empty",
            ));
        }
        self.validate_string_input("name", name, MAX_NAME_LENGTH)?;

        let password_hash = bcrypt::hash(password, self.password_cost)
            .map_err(|e| LedgerError::InternalServerError(format!("Password hashing error: {}", e)))?;
        let traveler = Traveler {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            email: email.clone(),
            password_hash,
        };

        let traveler = self
            .storage
            .create_traveler_if_not_exists(traveler)
            .await?
            .ok_or(LedgerError::EmailAlreadyRegistered(email))?;

        self.log_and_audit(
            None,
            TRAVELER_REGISTERED,
            json!({ "traveler_id": traveler.id, "name": traveler.name, "email": traveler.email }),
            Some(traveler.id.as_str()),
        )
        .await?;
        info!(traveler_id = %traveler.id, "traveler registered");
        Ok(traveler)
    }

    pub async fn authenticate(&self, email: &str, password: &str) -> Result<String, LedgerError> {
        let traveler = self
            .storage
            .get_traveler_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or(LedgerError::InvalidCredentials)?;

        let verified = bcrypt::verify(password, &traveler.password_hash)
            .map_err(|e| LedgerError::InternalServerError(format!("Password verification error: {}", e)))?;
        if !verified {
            return Err(LedgerError::InvalidCredentials);
        }

        let token = self.jwt_service.generate_token(&traveler.id)?;
        self.log_and_audit(
            None,
            TRAVELER_LOGGED_IN,
            json!({ "traveler_id": traveler.id }),
            Some(traveler.id.as_str()),
        )
        .await?;
        Ok(token)
    }

    pub async fn get_traveler(&self, traveler_id: &str) -> Result<Traveler, LedgerError> {
        self.require_traveler(traveler_id).await
    }

    pub async fn create_trip(&self, name: &str, member_ids: &[String], actor_id: &str) -> Result<Trip, LedgerError> {
        let creator = self.require_traveler(actor_id).await?;
        self.validate_string_input("name", name, MAX_NAME_LENGTH)?;

        let mut seen = HashSet::from([actor_id]);
        let others: Vec<&str> = member_ids
            .iter()
            .map(String::as_str)
            .filter(|id| seen.insert(*id))
            .collect();
        let others =
            futures::future::try_join_all(others.into_iter().map(|id| self.require_traveler(id))).await?;

        let mut members = vec![TripMember::new(&creator, Role::Owner)];
        members.extend(others.iter().map(|t| TripMember::new(t, Role::Member)));

        let trip = Trip {
            id: Uuid::new_v4().to_string(),
            name: name.trim().to_string(),
            members,
            created_by: creator.id.clone(),
            created_at: Utc::now(),
        };
        self.storage.save_trip(trip.clone()).await?;

        self.log_and_audit(
            Some(&trip.id),
            TRIP_CREATED,
            json!({
                "trip_id": trip.id,
                "name": trip.name,
                "member_ids": trip.member_ids().collect::<Vec<_>>()
            }),
            Some(actor_id),
        )
        .await?;
        info!(trip_id = %trip.id, members = trip.members.len(), "trip created");
        Ok(trip)
    }

    pub async fn get_trip(&self, trip_id: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        self.trip_for_member(trip_id, actor_id).await
    }

    pub async fn get_traveler_trips(&self, actor_id: &str) -> Result<Vec<Trip>, LedgerError> {
        self.storage.get_traveler_trips(actor_id).await
    }

    /// Deletes the trip together with all of its expenses. Owner only.
    pub async fn delete_trip(&self, trip_id: &str, actor_id: &str) -> Result<(), LedgerError> {
        let trip = self.trip_for_owner(trip_id, actor_id).await?;
        let removed = self.storage.delete_trip(trip_id).await?;
        self.cache.invalidate_trip_balances(trip_id).await?;

        self.log_and_audit(
            None,
            TRIP_DELETED,
            json!({ "trip_id": trip_id, "name": trip.name, "expenses_removed": removed }),
            Some(actor_id),
        )
        .await?;
        info!(trip_id, expenses_removed = removed, "trip deleted");
        Ok(())
    }

    pub async fn add_member(&self, trip_id: &str, traveler_id: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        let trip = self.trip_for_owner(trip_id, actor_id).await?;
        let traveler = self.require_traveler(traveler_id).await?;
        self.insert_member(trip, &traveler, actor_id).await
    }

    pub async fn add_member_by_email(&self, trip_id: &str, email: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        let trip = self.trip_for_owner(trip_id, actor_id).await?;
        let traveler = self
            .storage
            .get_traveler_by_email(&email.trim().to_lowercase())
            .await?
            .ok_or_else(|| LedgerError::TravelerNotFound(email.to_string()))?;
        self.insert_member(trip, &traveler, actor_id).await
    }

    async fn insert_member(&self, trip: Trip, traveler: &Traveler, actor_id: &str) -> Result<Trip, LedgerError> {
        if trip.is_member(&traveler.id) {
            return Err(LedgerError::AlreadyTripMember(traveler.id.clone()));
        }
        let trip = self
            .storage
            .add_trip_member(&trip.id, TripMember::new(traveler, Role::Member))
            .await?;
        self.cache.invalidate_trip_balances(&trip.id).await?;

        self.log_and_audit(
            Some(&trip.id),
            MEMBER_ADDED,
            json!({ "trip_id": trip.id, "traveler_id": traveler.id, "name": traveler.name }),
            Some(actor_id),
        )
        .await?;
        Ok(trip)
    }

    /// Removes a member who neither paid for nor owes a share of any expense.
    pub async fn remove_member(&self, trip_id: &str, traveler_id: &str, actor_id: &str) -> Result<Trip, LedgerError> {
        let trip = self.trip_for_owner(trip_id, actor_id).await?;
        if traveler_id == actor_id {
            return Err(LedgerError::OwnerCannotRemoveSelf);
        }
        if !trip.is_member(traveler_id) {
            return Err(LedgerError::NotTripMember(traveler_id.to_string()));
        }
        let trip = self.storage.remove_trip_member(trip_id, traveler_id).await?;
        self.cache.invalidate_trip_balances(trip_id).await?;

        self.log_and_audit(
            Some(trip_id),
            MEMBER_REMOVED,
            json!({ "trip_id": trip_id, "traveler_id": traveler_id }),
            Some(actor_id),
        )
        .await?;
        Ok(trip)
    }

    /// Splits `expense.total_cost` evenly between `members`, or between every
    /// trip member when `members` is empty.
    pub async fn create_equal_split_expense(
        &self,
        trip_id: &str,
        expense: NewExpense,
        members: Vec<String>,
        split_type: SplitType,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let trip = self.trip_for_member(trip_id, actor_id).await?;
        self.validate_string_input("title", &expense.title, MAX_TITLE_LENGTH)?;
        self.validate_amount_input("total_cost", expense.total_cost)?;
        self.validate_payer(&trip, &expense.payer_id)?;

        let members = if members.is_empty() {
            trip.member_ids().map(String::from).collect()
        } else {
            members
        };
        if let Some(outsider) = members.iter().find(|m| !trip.is_member(m)) {
            return Err(LedgerError::InvalidSplitMember(outsider.clone()));
        }
        let splits = equal_splits(expense.total_cost, &members, split_type)?;
        self.insert_expense(&trip, expense, splits, actor_id).await
    }

    pub async fn create_custom_split_expense(
        &self,
        trip_id: &str,
        expense: NewExpense,
        splits: Splits,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let trip = self.trip_for_member(trip_id, actor_id).await?;
        self.validate_string_input("title", &expense.title, MAX_TITLE_LENGTH)?;
        self.validate_amount_input("total_cost", expense.total_cost)?;
        self.validate_payer(&trip, &expense.payer_id)?;

        let member_set: HashSet<&str> = trip.member_ids().collect();
        let splits = validate_splits(expense.total_cost, splits, &member_set)?;
        self.insert_expense(&trip, expense, splits, actor_id).await
    }

    async fn insert_expense(
        &self,
        trip: &Trip,
        expense: NewExpense,
        splits: Splits,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let now = Utc::now();
        let expense = Expense {
            id: Uuid::new_v4().to_string(),
            trip_id: trip.id.clone(),
            title: expense.title.trim().to_string(),
            total_cost: expense.total_cost,
            payer_id: expense.payer_id,
            splits,
            version: 1,
            created_by: actor_id.to_string(),
            created_at: now,
            updated_at: now,
        };

        self.storage.insert_expense(expense.clone()).await?;
        self.cache.invalidate_trip_balances(&trip.id).await?;

        self.log_and_audit(
            Some(&trip.id),
            EXPENSE_CREATED,
            json!({
                "expense_id": expense.id,
                "trip_id": trip.id,
                "title": expense.title,
                "total_cost": expense.total_cost.to_decimal(),
                "payer_id": expense.payer_id,
                "split_type": expense.split_type()
            }),
            Some(actor_id),
        )
        .await?;
        info!(expense_id = %expense.id, trip_id = %trip.id, split_type = %expense.split_type(), "expense created");
        Ok(expense)
    }

    /// Replaces total cost and the whole split set at once. Nothing is
    /// written unless the new state validates.
    pub async fn modify_expense(
        &self,
        expense_id: &str,
        update: ExpenseUpdate,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let (stored, trip) = self.expense_for_member(expense_id, actor_id).await?;
        let expected = Self::check_version(&stored, update.expected_version)?;

        if let Some(title) = &update.title {
            self.validate_string_input("title", title, MAX_TITLE_LENGTH)?;
        }
        let payer_id = update.payer_id.unwrap_or_else(|| stored.payer_id.clone());
        self.validate_payer(&trip, &payer_id)?;
        self.validate_amount_input("total_cost", update.total_cost)?;

        let member_set: HashSet<&str> = trip.member_ids().collect();
        let splits = validate_splits(update.total_cost, update.splits, &member_set)?;

        let modified = Expense {
            title: update
                .title
                .map(|t| t.trim().to_string())
                .unwrap_or_else(|| stored.title.clone()),
            payer_id,
            total_cost: update.total_cost,
            splits,
            updated_at: Utc::now(),
            ..stored.clone()
        };
        let saved = self.storage.replace_expense(modified, expected).await?;
        self.cache.invalidate_trip_balances(&saved.trip_id).await?;

        self.log_and_audit(
            Some(&saved.trip_id),
            EXPENSE_MODIFIED,
            json!({
                "expense_id": saved.id,
                "previous_total_cost": stored.total_cost.to_decimal(),
                "total_cost": saved.total_cost.to_decimal(),
                "split_type": saved.split_type(),
                "version": saved.version
            }),
            Some(actor_id),
        )
        .await?;
        debug!(expense_id = %saved.id, version = saved.version, "expense modified");
        Ok(saved)
    }

    /// Changes only the total of a percentage-split expense; every member's
    /// share follows from the unchanged percentages.
    pub async fn modify_expense_total_cost(
        &self,
        expense_id: &str,
        total_cost: Cents,
        expected_version: Option<u64>,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let (stored, trip) = self.expense_for_member(expense_id, actor_id).await?;
        let expected = Self::check_version(&stored, expected_version)?;
        if stored.split_type() != SplitType::Percentage {
            return Err(LedgerError::InvalidSplit(
                "total cost of a money split can only change together with its entries".to_string(),
            ));
        }
        self.validate_amount_input("total_cost", total_cost)?;

        let member_set: HashSet<&str> = trip.member_ids().collect();
        let splits = validate_splits(total_cost, stored.splits.clone(), &member_set)?;

        let modified = Expense {
            total_cost,
            splits,
            updated_at: Utc::now(),
            ..stored.clone()
        };
        let saved = self.storage.replace_expense(modified, expected).await?;
        self.cache.invalidate_trip_balances(&saved.trip_id).await?;

        self.log_and_audit(
            Some(&saved.trip_id),
            EXPENSE_MODIFIED,
            json!({
                "expense_id": saved.id,
                "previous_total_cost": stored.total_cost.to_decimal(),
                "total_cost": saved.total_cost.to_decimal(),
                "version": saved.version
            }),
            Some(actor_id),
        )
        .await?;
        Ok(saved)
    }

    /// Converts between money and percentage splits. Converting to the
    /// current type returns the expense untouched.
    pub async fn convert_expense_type(
        &self,
        expense_id: &str,
        target: SplitType,
        expected_version: Option<u64>,
        actor_id: &str,
    ) -> Result<Expense, LedgerError> {
        let (stored, _trip) = self.expense_for_member(expense_id, actor_id).await?;
        let expected = Self::check_version(&stored, expected_version)?;
        if stored.split_type() == target {
            debug!(expense_id, split_type = %target, "conversion to current type skipped");
            return Ok(stored);
        }

        let splits = convert_splits(
            &stored.id,
            stored.total_cost,
            &stored.splits,
            target,
            self.zero_cost_policy,
        )?;
        let converted = Expense {
            splits,
            updated_at: Utc::now(),
            ..stored.clone()
        };
        let saved = self.storage.replace_expense(converted, expected).await?;
        self.cache.invalidate_trip_balances(&saved.trip_id).await?;

        self.log_and_audit(
            Some(&saved.trip_id),
            EXPENSE_CONVERTED,
            json!({
                "expense_id": saved.id,
                "from": stored.split_type(),
                "to": target,
                "version": saved.version
            }),
            Some(actor_id),
        )
        .await?;
        info!(expense_id = %saved.id, from = %stored.split_type(), to = %target, "expense converted");
        Ok(saved)
    }

    pub async fn delete_expense(
        &self,
        expense_id: &str,
        expected_version: Option<u64>,
        actor_id: &str,
    ) -> Result<(), LedgerError> {
        let (_stored, trip) = self.expense_for_member(expense_id, actor_id).await?;
        let removed = self.storage.delete_expense(expense_id, expected_version).await?;
        self.cache.invalidate_trip_balances(&trip.id).await?;

        self.log_and_audit(
            Some(&trip.id),
            EXPENSE_DELETED,
            json!({
                "expense_id": removed.id,
                "title": removed.title,
                "total_cost": removed.total_cost.to_decimal()
            }),
            Some(actor_id),
        )
        .await?;
        info!(expense_id, trip_id = %trip.id, "expense deleted");
        Ok(())
    }

    pub async fn get_expense_details(&self, expense_id: &str, actor_id: &str) -> Result<Expense, LedgerError> {
        let (expense, _trip) = self.expense_for_member(expense_id, actor_id).await?;
        Ok(expense)
    }

    pub async fn list_expenses(
        &self,
        trip_id: &str,
        split_type: Option<SplitType>,
        actor_id: &str,
    ) -> Result<Vec<Expense>, LedgerError> {
        self.trip_for_member(trip_id, actor_id).await?;
        let ledger = self.storage.get_ledger(trip_id).await?;
        Ok(ledger
            .expenses
            .into_iter()
            .filter(|e| split_type.is_none_or(|t| e.split_type() == t))
            .collect())
    }

    /// Net balance per member. Served from cache only when the cached sheet
    /// was computed from the trip's current revision.
    pub async fn get_balances(&self, trip_id: &str, actor_id: &str) -> Result<BalanceSheet, LedgerError> {
        self.trip_for_member(trip_id, actor_id).await?;

        let revision = self.storage.get_ledger_revision(trip_id).await?;
        let sheet = match self.cache.get_trip_balances(trip_id).await? {
            Some(cached) if cached.revision == revision => {
                debug!(trip_id, revision, "balance cache hit");
                cached.sheet
            }
            _ => self.recompute_balances(trip_id, actor_id).await?,
        };
        debug!(trip_id, actor_id, skipped = sheet.skipped.len(), "balances queried");
        Ok(sheet)
    }

    async fn recompute_balances(&self, trip_id: &str, actor_id: &str) -> Result<BalanceSheet, LedgerError> {
        // Snapshot before trip: a membership change in between leaves the
        // sheet tagged with an already stale revision.
        let ledger = self.storage.get_ledger(trip_id).await?;
        let trip = self.load_trip(trip_id).await?;
        let sheet = compute_balances(&trip, &ledger.expenses);

        for skipped in &sheet.skipped {
            warn!(trip_id, expense_id = %skipped.expense_id, reason = %skipped.reason, "expense left out of balances");
            // A failed audit write must not fail the read.
            if let Err(e) = self
                .log_and_audit(
                    Some(trip_id),
                    BALANCE_EXPENSE_SKIPPED,
                    json!({ "expense_id": skipped.expense_id, "reason": skipped.reason }),
                    Some(actor_id),
                )
                .await
            {
                warn!(trip_id, expense_id = %skipped.expense_id, error = %e, "failed to audit skipped expense");
            }
        }

        self.cache
            .save_trip_balances(
                trip_id,
                &CachedBalances {
                    revision: ledger.revision,
                    sheet: sheet.clone(),
                },
                self.balance_cache_ttl,
            )
            .await?;
        Ok(sheet)
    }

    pub async fn get_settlement_plan(&self, trip_id: &str, actor_id: &str) -> Result<Vec<Transfer>, LedgerError> {
        let sheet = self.get_balances(trip_id, actor_id).await?;
        Ok(plan_settlements(&sheet.balances))
    }

    pub async fn get_trip_audits(&self, trip_id: &str, actor_id: &str) -> Result<Vec<TripAudit>, LedgerError> {
        self.trip_for_member(trip_id, actor_id).await?;
        self.storage.get_trip_audits(trip_id).await
    }

    /// Application log entries recorded for `actor_id`.
    pub async fn get_app_logs(&self, actor_id: &str) -> Result<Vec<AppLog>, LedgerError> {
        let logs = self.logging.get_logs().await?;
        Ok(logs
            .into_iter()
            .filter(|log| log.user_id.as_deref() == Some(actor_id))
            .collect())
    }
}
