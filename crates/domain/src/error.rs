//! Domain error types.

use thiserror::Error;

use crate::booking::BookingStatus;

/// Coarse classification of a [`BookingError`].
///
/// Transport layers map a kind to a status code; tests branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Capacity,
    Expired,
    Payment,
}

/// Business failures of the booking core.
///
/// Display strings are stable and surface to callers verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BookingError {
    #[error("Cannot book less than 1 seat")]
    BookingTooSmall { requested: i32 },

    #[error("Cannot book more than 5 seats")]
    BookingTooLarge { requested: i32 },

    #[error("Invalid email address: {email}")]
    InvalidEmail { email: String },

    #[error("Invalid travel offering: {reason}")]
    InvalidTravel { reason: String },

    #[error("Travel not found")]
    TravelNotFound,

    #[error("Booking not found")]
    BookingNotFound,

    #[error("You already have a pending booking for this travel")]
    DuplicatePendingBooking,

    #[error("Booking is not in a confirmable state")]
    NotConfirmable { status: BookingStatus },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },

    #[error("User with this email already exists")]
    UserAlreadyExists,

    #[error("Cannot increase available seats beyond total seats")]
    CapacityExceeded { available: i32, total: i32, delta: i32 },

    #[error("Not enough available seats")]
    InsufficientInventory { available: i32, requested: i32 },

    #[error("Booking expired")]
    BookingExpired,

    #[error("Payment failed")]
    PaymentFailed,
}

impl BookingError {
    /// Returns the error class.
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::BookingTooSmall { .. }
            | BookingError::BookingTooLarge { .. }
            | BookingError::InvalidEmail { .. }
            | BookingError::InvalidTravel { .. } => ErrorKind::Validation,
            BookingError::TravelNotFound | BookingError::BookingNotFound => ErrorKind::NotFound,
            BookingError::DuplicatePendingBooking
            | BookingError::NotConfirmable { .. }
            | BookingError::InvalidTransition { .. }
            | BookingError::UserAlreadyExists => ErrorKind::Conflict,
            BookingError::CapacityExceeded { .. } | BookingError::InsufficientInventory { .. } => {
                ErrorKind::Capacity
            }
            BookingError::BookingExpired => ErrorKind::Expired,
            BookingError::PaymentFailed => ErrorKind::Payment,
        }
    }

    /// Returns a stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            BookingError::BookingTooSmall { .. } => "BOOKING_TOO_SMALL",
            BookingError::BookingTooLarge { .. } => "BOOKING_TOO_LARGE",
            BookingError::InvalidEmail { .. } => "INVALID_EMAIL",
            BookingError::InvalidTravel { .. } => "INVALID_TRAVEL",
            BookingError::TravelNotFound => "TRAVEL_NOT_FOUND",
            BookingError::BookingNotFound => "BOOKING_NOT_FOUND",
            BookingError::DuplicatePendingBooking => "DUPLICATE_PENDING_BOOKING",
            BookingError::NotConfirmable { .. } => "NOT_CONFIRMABLE",
            BookingError::InvalidTransition { .. } => "INVALID_TRANSITION",
            BookingError::UserAlreadyExists => "USER_ALREADY_EXISTS",
            BookingError::CapacityExceeded { .. } => "CAPACITY_EXCEEDED",
            BookingError::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            BookingError::BookingExpired => "BOOKING_EXPIRED",
            BookingError::PaymentFailed => "PAYMENT_FAILED",
        }
    }
}
