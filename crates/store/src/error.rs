use domain::BookingError;
use thiserror::Error;

/// Errors that can occur when interacting with a store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store refused the operation for a business reason decided inside
    /// its transaction (missing row, bound violation, uniqueness).
    #[error("{0}")]
    Rejected(#[from] BookingError),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored row could not be decoded into a domain value.
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    /// Returns the business error if the store rejected the operation.
    pub fn as_rejection(&self) -> Option<&BookingError> {
        match self {
            StoreError::Rejected(e) => Some(e),
            _ => None,
        }
    }
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
