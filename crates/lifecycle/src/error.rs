//! Lifecycle error types.

use domain::BookingError;
use store::StoreError;
use thiserror::Error;

/// Errors returned by lifecycle operations.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// A business rule rejected the operation.
    #[error(transparent)]
    Booking(#[from] BookingError),

    /// The store failed for a non-business reason.
    #[error("Storage error: {0}")]
    Store(StoreError),
}

impl LifecycleError {
    /// Returns the business error, if this is one.
    pub fn as_booking_error(&self) -> Option<&BookingError> {
        match self {
            LifecycleError::Booking(e) => Some(e),
            LifecycleError::Store(_) => None,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::Booking(e) => e.code(),
            LifecycleError::Store(_) => "STORAGE_ERROR",
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::Rejected(rejection) => LifecycleError::Booking(rejection),
            other => LifecycleError::Store(other),
        }
    }
}

/// Convenience type alias for lifecycle results.
pub type Result<T> = std::result::Result<T, LifecycleError>;
