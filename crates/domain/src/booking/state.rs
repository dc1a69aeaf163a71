//! Booking state machine.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The status of a booking.
///
/// State transitions:
/// ```text
/// Pending ──┬──► Confirmed
///           ├──► Expired
///           ├──► Cancelled
///           └──► UserRemoved
/// ```
/// Every state other than `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Seats are held and the booking awaits payment.
    #[default]
    Pending,

    /// Payment succeeded (terminal state).
    Confirmed,

    /// Cancelled before payment (terminal state).
    Cancelled,

    /// The hold window passed without payment (terminal state).
    Expired,

    /// The owning user was removed while the booking was pending (terminal state).
    UserRemoved,
}

impl BookingStatus {
    /// Returns true if a booking in this state may move to `target`.
    pub fn can_transition_to(&self, target: BookingStatus) -> bool {
        matches!(self, BookingStatus::Pending) && target != BookingStatus::Pending
    }

    /// Returns true if the booking can be confirmed in this state.
    pub fn can_confirm(&self) -> bool {
        self.can_transition_to(BookingStatus::Confirmed)
    }

    /// Returns true if this is a terminal state (no further transitions possible).
    pub fn is_terminal(&self) -> bool {
        !matches!(self, BookingStatus::Pending)
    }

    /// Returns the status name as stored and exposed to callers.
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
            BookingStatus::UserRemoved => "user_removed",
        }
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown booking status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BookingStatus::Pending),
            "confirmed" => Ok(BookingStatus::Confirmed),
            "cancelled" => Ok(BookingStatus::Cancelled),
            "expired" => Ok(BookingStatus::Expired),
            "user_removed" => Ok(BookingStatus::UserRemoved),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}
