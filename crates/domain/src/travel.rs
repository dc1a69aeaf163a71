//! Travel offerings and their seat counters.

use chrono::{DateTime, Utc};
use common::TravelId;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;
use crate::money::Money;

/// A bookable travel product with a fixed capacity and a live seat counter.
///
/// `0 <= available_seats <= total_seats` holds for every value this type
/// hands out. The counter is only ever moved through
/// [`TravelOffering::apply_seat_delta`], which the storage layer calls inside
/// its transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelOffering {
    pub id: TravelId,
    pub slug: String,
    pub name: String,
    pub description: Option<String>,
    pub starting_date: Option<DateTime<Utc>>,
    pub ending_date: Option<DateTime<Utc>>,
    pub price: Money,
    pub total_seats: i32,
    pub available_seats: i32,
}

impl TravelOffering {
    /// Creates a fully available offering.
    pub fn new(
        slug: impl Into<String>,
        name: impl Into<String>,
        price: Money,
        total_seats: i32,
    ) -> Result<Self, BookingError> {
        let slug = slug.into();
        if slug.trim().is_empty() {
            return Err(invalid("slug must not be empty"));
        }
        if total_seats < 0 {
            return Err(invalid("total seats must not be negative"));
        }
        if price.cents() < 0 {
            return Err(invalid("price must not be negative"));
        }

        Ok(Self {
            id: TravelId::new(),
            slug,
            name: name.into(),
            description: None,
            starting_date: None,
            ending_date: None,
            price,
            total_seats,
            available_seats: total_seats,
        })
    }

    /// Overrides the available-seat counter at creation time.
    pub fn with_available_seats(mut self, available_seats: i32) -> Result<Self, BookingError> {
        if !(0..=self.total_seats).contains(&available_seats) {
            return Err(invalid(format!(
                "available seats {available_seats} outside 0..={}",
                self.total_seats
            )));
        }
        self.available_seats = available_seats;
        Ok(self)
    }

    /// Sets the free-text description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the travel dates.
    pub fn with_dates(
        mut self,
        starting_date: DateTime<Utc>,
        ending_date: DateTime<Utc>,
    ) -> Result<Self, BookingError> {
        if ending_date < starting_date {
            return Err(invalid("ending date precedes starting date"));
        }
        self.starting_date = Some(starting_date);
        self.ending_date = Some(ending_date);
        Ok(self)
    }

    /// Computes the available-seat count after applying `delta`.
    ///
    /// Fails with `CapacityExceeded` when a positive delta would push the
    /// counter past `total_seats`, and with `InsufficientInventory` when a
    /// negative delta would push it below zero. Does not mutate `self`.
    pub fn apply_seat_delta(&self, delta: i32) -> Result<i32, BookingError> {
        let new_available = self.available_seats.checked_add(delta);

        match new_available {
            Some(n) if delta > 0 && n > self.total_seats => Err(self.capacity_exceeded(delta)),
            Some(n) if delta < 0 && n < 0 => Err(self.insufficient(delta)),
            Some(n) => Ok(n),
            None if delta > 0 => Err(self.capacity_exceeded(delta)),
            None => Err(self.insufficient(delta)),
        }
    }

    /// Returns true when no seats are left.
    pub fn is_sold_out(&self) -> bool {
        self.available_seats == 0
    }

    fn capacity_exceeded(&self, delta: i32) -> BookingError {
        BookingError::CapacityExceeded {
            available: self.available_seats,
            total: self.total_seats,
            delta,
        }
    }

    fn insufficient(&self, delta: i32) -> BookingError {
        BookingError::InsufficientInventory {
            available: self.available_seats,
            requested: delta.saturating_neg(),
        }
    }
}

fn invalid(reason: impl Into<String>) -> BookingError {
    BookingError::InvalidTravel {
        reason: reason.into(),
    }
}
