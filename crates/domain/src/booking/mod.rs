//! Bookings: seat holds on a travel offering.

mod policy;
mod state;

pub use policy::{
    HOLD_DURATION_MINUTES, MAX_BOOKING_SIZE, MIN_BOOKING_SIZE, SWEEP_INTERVAL_SECS, is_expired,
    validate_size,
};
pub use state::{BookingStatus, UnknownStatus};

use chrono::{DateTime, Duration, Utc};
use common::{BookingId, TravelId, UserId};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;
use crate::money::Money;
use crate::travel::TravelOffering;

/// A seat hold on a travel offering.
///
/// `user_id`, `travel_id`, `selected_seats` and `total_price` are frozen at
/// creation. Only `status` (and `updated_at`) change afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub user_id: UserId,
    pub travel_id: TravelId,
    pub selected_seats: i32,
    pub total_price: Money,
    pub status: BookingStatus,
    pub expiration_time: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// Builds a new pending booking holding `selected_seats` on `travel`.
    ///
    /// Validates the size and prices the booking at `travel.price * selected_seats`.
    pub fn pending(
        user_id: UserId,
        travel: &TravelOffering,
        selected_seats: i32,
        now: DateTime<Utc>,
        hold: Duration,
    ) -> Result<Self, BookingError> {
        validate_size(selected_seats)?;

        let total_price =
            travel
                .price
                .times(selected_seats)
                .ok_or_else(|| BookingError::InvalidTravel {
                    reason: format!("price overflow for {selected_seats} seats"),
                })?;

        Ok(Self {
            id: BookingId::new(),
            user_id,
            travel_id: travel.id,
            selected_seats,
            total_price,
            status: BookingStatus::Pending,
            expiration_time: now + hold,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns true once `now` is past the hold window.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        is_expired(self.expiration_time, now)
    }

    /// Returns true if this booking still holds seats and its window has passed.
    pub fn is_due_for_expiry(&self, now: DateTime<Utc>) -> bool {
        self.status == BookingStatus::Pending && self.expiration_time < now
    }

    /// Moves the booking to `target`, rejecting transitions out of terminal states.
    pub fn transition_to(
        &mut self,
        target: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<(), BookingError> {
        if !self.status.can_transition_to(target) {
            return Err(BookingError::InvalidTransition {
                from: self.status,
                to: target,
            });
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }
}
