//! Booking size and expiry policies.

use chrono::{DateTime, Utc};

use crate::error::BookingError;

/// Smallest number of seats a single booking may hold.
pub const MIN_BOOKING_SIZE: i32 = 1;

/// Largest number of seats a single booking may hold.
pub const MAX_BOOKING_SIZE: i32 = 5;

/// How long a pending booking holds its seats.
pub const HOLD_DURATION_MINUTES: i64 = 15;

/// Period of the expiry sweep.
pub const SWEEP_INTERVAL_SECS: u64 = 5 * 60;

/// Validates the requested seat count of a booking.
pub fn validate_size(selected_seats: i32) -> Result<(), BookingError> {
    if selected_seats < MIN_BOOKING_SIZE {
        return Err(BookingError::BookingTooSmall {
            requested: selected_seats,
        });
    }

    if selected_seats > MAX_BOOKING_SIZE {
        return Err(BookingError::BookingTooLarge {
            requested: selected_seats,
        });
    }

    Ok(())
}

/// Returns true once `now` is strictly past `expiration_time`.
pub fn is_expired(expiration_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now > expiration_time
}
