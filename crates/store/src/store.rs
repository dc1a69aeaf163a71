use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, TravelId, UserId};
use domain::{Booking, BookingStatus, TravelOffering, UserIdentity};

use crate::Result;

/// Storage of travel offerings and their seat counters.
#[async_trait]
pub trait TravelStore: Send + Sync {
    /// Inserts a new offering. Offerings are created out-of-band; the booking
    /// core never deletes them.
    async fn insert_travel(&self, travel: TravelOffering) -> Result<TravelOffering>;

    /// Retrieves an offering by id.
    async fn get_travel(&self, id: TravelId) -> Result<Option<TravelOffering>>;

    /// Retrieves an offering by its slug.
    async fn get_travel_by_slug(&self, slug: &str) -> Result<Option<TravelOffering>>;

    /// Adds `delta` to the offering's available seats.
    ///
    /// The read, the bound check ([`TravelOffering::apply_seat_delta`]) and
    /// the write happen as one isolated unit: two concurrent adjustments on
    /// the same offering serialize and the second observes the first's
    /// committed result. Fails with `Rejected(TravelNotFound)`,
    /// `Rejected(CapacityExceeded)` or `Rejected(InsufficientInventory)`,
    /// leaving the counter untouched.
    async fn adjust_available_seats(&self, id: TravelId, delta: i32) -> Result<TravelOffering>;
}

/// Storage of user identities.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `Rejected(UserAlreadyExists)` if the email
    /// is taken.
    async fn insert_user(&self, user: UserIdentity) -> Result<UserIdentity>;

    /// Retrieves a user by id.
    async fn get_user(&self, id: UserId) -> Result<Option<UserIdentity>>;

    /// Retrieves a user by normalized email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>>;
}

/// Storage of bookings.
#[async_trait]
pub trait BookingStore: Send + Sync {
    /// Inserts a booking.
    ///
    /// If the booking is pending and another pending booking exists for the
    /// same (user, travel) pair, fails with `Rejected(DuplicatePendingBooking)`.
    /// The check and the insert are atomic. Fails with `Rejected(TravelNotFound)`
    /// if the offering does not exist.
    async fn insert_booking(&self, booking: Booking) -> Result<Booking>;

    /// Retrieves a booking by id.
    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>>;

    /// Returns the pending booking for a (user, travel) pair, if any.
    async fn find_pending_booking(
        &self,
        user_id: UserId,
        travel_id: TravelId,
    ) -> Result<Option<Booking>>;

    /// Returns every pending booking whose expiration time is before `now`,
    /// oldest expiration first.
    async fn find_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Booking>>;

    /// Compare-and-set on the booking status.
    ///
    /// Moves the booking from `from` to `to` only if its stored status is
    /// still `from`, returning the updated booking. Returns `None` when the
    /// stored status differs, so a concurrent writer that already moved the
    /// booking wins and the caller observes it. Fails with
    /// `Rejected(InvalidTransition)` when `from` may not move to `to`, and
    /// with `Rejected(BookingNotFound)` for an unknown id.
    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>>;

    /// Moves a pending booking to EXPIRED and gives its seats back to the
    /// offering, as one isolated unit.
    ///
    /// Returns `None` when the booking already left PENDING. If the seat
    /// release is rejected (`TravelNotFound`, `CapacityExceeded`) or fails,
    /// neither the status nor the counter changes and the booking stays
    /// PENDING.
    async fn expire_and_release(&self, id: BookingId, now: DateTime<Utc>)
    -> Result<Option<Booking>>;

    /// Lists a user's bookings, newest first.
    async fn list_bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>>;
}

/// Everything the booking lifecycle needs from one storage backend.
pub trait Store: TravelStore + UserStore + BookingStore + Clone + 'static {}

// Blanket implementation for all complete backends
impl<T> Store for T where T: TravelStore + UserStore + BookingStore + Clone + 'static {}
