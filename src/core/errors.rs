use serde::Serialize;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

/// Coarse classification surfaced to API clients next to the message.
#[derive(Debug, Serialize, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    ConversionError,
    ConcurrentModificationError,
    Unauthorized,
    Forbidden,
    Conflict,
    InternalError,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::ValidationError => "ValidationError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::ConversionError => "ConversionError",
            ErrorKind::ConcurrentModificationError => "ConcurrentModificationError",
            ErrorKind::Unauthorized => "Unauthorized",
            ErrorKind::Forbidden => "Forbidden",
            ErrorKind::Conflict => "Conflict",
            ErrorKind::InternalError => "InternalError",
        };
        write!(f, "{}", s)
    }
}

#[derive(Error, Debug, Serialize, Clone, PartialEq)]
pub enum LedgerError {
    /// Email field is empty
    #[error("Email is required")]
    MissingEmail,

    #[error("Invalid email format: {0}")]
    InvalidEmail(String),

    #[error("Email {0} already registered")]
    EmailAlreadyRegistered(String),

    #[error("Traveler {0} not found")]
    TravelerNotFound(String),

    #[error("Trip {0} not found")]
    TripNotFound(String),

    #[error("Expense {0} not found")]
    ExpenseNotFound(String),

    #[error("Traveler {0} is already a trip member")]
    AlreadyTripMember(String),

    #[error("Traveler {0} is not a trip member")]
    NotTripMember(String),

    #[error("Traveler {0} is not trip owner")]
    NotTripOwner(String),

    #[error("Owner cannot remove themselves")]
    OwnerCannotRemoveSelf,

    /// Member still appears as payer or debtor in at least one expense
    #[error("Traveler {0} still takes part in trip expenses")]
    MemberHasExpenses(String),

    /// Generic input validation error with detailed field information
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),

    /// Split entries do not add up, or carry a bad value
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// Split entry names a traveler who is not on the trip
    #[error("Invalid split member: {0}")]
    InvalidSplitMember(String),

    #[error("Member {0} appears more than once in the split")]
    DuplicateSplitMember(String),

    #[error("Cannot convert expense {0}: {1}")]
    Conversion(String, String),

    #[error("Expense {expense_id} was modified concurrently (expected version {expected}, found {actual})")]
    ConcurrentModification {
        expense_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Internal server error: {0}")]
    InternalServerError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Logging error: {0}")]
    LoggingError(String),

    #[error("Cache error: {0}")]
    CacheError(String),
}

impl LedgerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::MissingEmail
            | LedgerError::InvalidEmail(_)
            | LedgerError::InvalidInput(..)
            | LedgerError::InvalidSplit(_)
            | LedgerError::InvalidSplitMember(_)
            | LedgerError::DuplicateSplitMember(_)
            | LedgerError::MemberHasExpenses(_) => ErrorKind::ValidationError,
            LedgerError::TravelerNotFound(_) | LedgerError::TripNotFound(_) | LedgerError::ExpenseNotFound(_) => {
                ErrorKind::NotFound
            }
            LedgerError::Conversion(..) => ErrorKind::ConversionError,
            LedgerError::ConcurrentModification { .. } => ErrorKind::ConcurrentModificationError,
            LedgerError::InvalidCredentials | LedgerError::Unauthorized(_) => ErrorKind::Unauthorized,
            LedgerError::NotTripMember(_) | LedgerError::NotTripOwner(_) | LedgerError::OwnerCannotRemoveSelf => {
                ErrorKind::Forbidden
            }
            LedgerError::EmailAlreadyRegistered(_) | LedgerError::AlreadyTripMember(_) => ErrorKind::Conflict,
            LedgerError::InternalServerError(_)
            | LedgerError::StorageError(_)
            | LedgerError::LoggingError(_)
            | LedgerError::CacheError(_) => ErrorKind::InternalError,
        }
    }

    pub(crate) fn invalid_input(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        LedgerError::InvalidInput(field.to_string(), FieldError::new(field, title, description))
    }
}
