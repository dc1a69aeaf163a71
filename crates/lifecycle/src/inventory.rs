//! Seat inventory: the only writer of an offering's available-seat counter.

use chrono::{DateTime, Utc};
use common::{BookingId, TravelId};
use domain::{Booking, BookingError, TravelOffering};
use store::{Store, TravelStore};

use crate::error::Result;

/// Adjusts the available-seat counter of travel offerings.
///
/// The read-validate-write happens inside [`TravelStore::adjust_available_seats`],
/// which serializes concurrent adjustments on the same offering.
#[derive(Debug, Clone)]
pub struct SeatInventory<S> {
    store: S,
}

impl<S: TravelStore> SeatInventory<S> {
    /// Creates a seat inventory over the given store.
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Applies `delta` to the available seats of `travel_id`.
    ///
    /// Fails with `TravelNotFound`, `CapacityExceeded` or
    /// `InsufficientInventory`; a failed adjustment leaves the counter as it was.
    #[tracing::instrument(skip(self))]
    pub async fn adjust(&self, travel_id: TravelId, delta: i32) -> Result<TravelOffering> {
        match self.store.adjust_available_seats(travel_id, delta).await {
            Ok(travel) => {
                let direction = if delta >= 0 { "increase" } else { "decrease" };
                metrics::counter!("seat_adjustments_total", "direction" => direction)
                    .increment(1);
                tracing::debug!(
                    available_seats = travel.available_seats,
                    total_seats = travel.total_seats,
                    "seats adjusted"
                );
                Ok(travel)
            }
            Err(e) => {
                if e.as_rejection().is_some() {
                    metrics::counter!("seat_adjustments_rejected_total").increment(1);
                } else {
                    tracing::error!(error = %e, "seat adjustment failed");
                }
                Err(e.into())
            }
        }
    }

    /// Gives `seats` back to the offering.
    pub async fn increase(&self, travel_id: TravelId, seats: i32) -> Result<TravelOffering> {
        check_positive(seats)?;
        self.adjust(travel_id, seats).await
    }

    /// Takes `seats` from the offering.
    pub async fn decrease(&self, travel_id: TravelId, seats: i32) -> Result<TravelOffering> {
        check_positive(seats)?;
        self.adjust(travel_id, -seats).await
    }
}

impl<S: Store> SeatInventory<S> {
    /// Expires a pending booking and gives its seats back in one step.
    ///
    /// Returns `None` when the booking already left PENDING. A rejected or
    /// failed release leaves both the booking and the counter untouched.
    #[tracing::instrument(skip(self))]
    pub async fn release_expired(
        &self,
        booking_id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        match self.store.expire_and_release(booking_id, now).await {
            Ok(released) => {
                if released.is_some() {
                    metrics::counter!("seat_adjustments_total", "direction" => "increase")
                        .increment(1);
                }
                Ok(released)
            }
            Err(e) => {
                if e.as_rejection().is_some() {
                    metrics::counter!("seat_adjustments_rejected_total").increment(1);
                }
                Err(e.into())
            }
        }
    }
}

fn check_positive(seats: i32) -> std::result::Result<(), BookingError> {
    if seats < 1 {
        return Err(BookingError::InvalidTravel {
            reason: format!("seat adjustment must be at least 1, got {seats}"),
        });
    }
    Ok(())
}
