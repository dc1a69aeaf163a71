//! Booking lifecycle operations.

use std::sync::Arc;
use std::time::Instant;

use chrono::Duration;
use common::{BookingId, Clock, SystemClock, TravelId};
use domain::{
    Booking, BookingError, BookingStatus, HOLD_DURATION_MINUTES, TravelOffering, validate_size,
};
use store::Store;

use crate::error::{LifecycleError, Result};
use crate::inventory::SeatInventory;
use crate::services::{IdentityResolver, PaymentService};

/// Tunables of the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleConfig {
    /// How long a pending booking holds its seats.
    pub hold_duration: Duration,
}

impl Default for LifecycleConfig {
    fn default() -> Self {
        Self {
            hold_duration: Duration::minutes(HOLD_DURATION_MINUTES),
        }
    }
}

/// Outcome of one expiry sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Bookings moved to EXPIRED with their seats released.
    pub expired: usize,
    /// Bookings that left PENDING before the sweep reached them.
    pub skipped: usize,
    /// Bookings left PENDING for the next sweep after an error.
    pub failed: usize,
}

/// Creates, confirms and expires bookings.
///
/// Holds no in-process lock across storage calls. Seat counters are
/// serialized by [`SeatInventory`]; pending uniqueness and status changes
/// are decided by the store.
pub struct BookingLifecycle<S, P> {
    store: S,
    inventory: SeatInventory<S>,
    identity: IdentityResolver<S>,
    payment: P,
    clock: Arc<dyn Clock>,
    config: LifecycleConfig,
}

impl<S, P> BookingLifecycle<S, P>
where
    S: Store,
    P: PaymentService,
{
    /// Creates a lifecycle using the system clock and default config.
    pub fn new(store: S, payment: P) -> Self {
        Self::with_clock(store, payment, Arc::new(SystemClock))
    }

    /// Creates a lifecycle with an explicit time source.
    pub fn with_clock(store: S, payment: P, clock: Arc<dyn Clock>) -> Self {
        Self {
            inventory: SeatInventory::new(store.clone()),
            identity: IdentityResolver::new(store.clone(), clock.clone()),
            store,
            payment,
            clock,
            config: LifecycleConfig::default(),
        }
    }

    /// Replaces the config.
    pub fn with_config(mut self, config: LifecycleConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the seat inventory.
    pub fn inventory(&self) -> &SeatInventory<S> {
        &self.inventory
    }

    /// Returns the identity resolver.
    pub fn identity(&self) -> &IdentityResolver<S> {
        &self.identity
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Places a pending hold of `selected_seats` on `travel_id` for `user_email`.
    ///
    /// The user identity is resolved before the offering is loaded, so an
    /// unknown offering still leaves the (idempotently created) user behind.
    /// Seats are taken before the booking row is written; if the write fails
    /// they are given back before the error is returned.
    #[tracing::instrument(skip(self), fields(booking_id = tracing::field::Empty))]
    pub async fn create(
        &self,
        user_email: &str,
        travel_id: TravelId,
        selected_seats: i32,
    ) -> Result<Booking> {
        let result = self.try_create(user_email, travel_id, selected_seats).await;

        match &result {
            Ok(booking) => {
                tracing::Span::current().record("booking_id", tracing::field::display(booking.id));
                metrics::counter!("bookings_created_total").increment(1);
                tracing::info!(
                    booking_id = %booking.id,
                    total_price = %booking.total_price,
                    expiration_time = %booking.expiration_time,
                    "booking created"
                );
            }
            Err(e) => {
                metrics::counter!("bookings_rejected_total", "reason" => e.code()).increment(1);
                tracing::info!(error = %e, "booking rejected");
            }
        }

        result
    }

    async fn try_create(
        &self,
        user_email: &str,
        travel_id: TravelId,
        selected_seats: i32,
    ) -> Result<Booking> {
        validate_size(selected_seats)?;

        let user = self.identity.resolve(user_email).await?;

        self.store
            .get_travel(travel_id)
            .await?
            .ok_or(BookingError::TravelNotFound)?;

        if self
            .store
            .find_pending_booking(user.id, travel_id)
            .await?
            .is_some()
        {
            return Err(BookingError::DuplicatePendingBooking.into());
        }

        let travel = self.inventory.decrease(travel_id, selected_seats).await?;

        let persisted = match Booking::pending(
            user.id,
            &travel,
            selected_seats,
            self.clock.now(),
            self.config.hold_duration,
        ) {
            Ok(booking) => self
                .store
                .insert_booking(booking)
                .await
                .map_err(LifecycleError::from),
            Err(e) => Err(e.into()),
        };

        if let Err(e) = &persisted {
            // A concurrent create for the same pair can get past the
            // duplicate check and lose at the unique index here
            tracing::warn!(error = %e, "booking write failed, releasing held seats");
            if let Err(release_err) = self.inventory.increase(travel_id, selected_seats).await {
                tracing::error!(
                    %travel_id,
                    seats = selected_seats,
                    error = %release_err,
                    "could not release seats after failed booking write"
                );
            }
        }

        persisted
    }

    /// Charges for a pending booking and marks it confirmed.
    ///
    /// Expiry is checked against the clock before the stored status, so a
    /// booking the sweep has not reached yet is still reported as expired.
    /// A failed charge changes nothing.
    #[tracing::instrument(skip(self))]
    pub async fn confirm(&self, booking_id: BookingId) -> Result<Booking> {
        let booking = self.get_booking(booking_id).await?;

        if booking.is_expired_at(self.clock.now()) {
            return Err(BookingError::BookingExpired.into());
        }

        if !booking.status.can_confirm() {
            return Err(BookingError::NotConfirmable {
                status: booking.status,
            }
            .into());
        }

        if !self.payment.charge(booking.id, booking.total_price).await {
            tracing::info!(amount = %booking.total_price, "payment failed");
            return Err(BookingError::PaymentFailed.into());
        }

        let confirmed = self
            .store
            .transition_status(
                booking.id,
                BookingStatus::Pending,
                BookingStatus::Confirmed,
                self.clock.now(),
            )
            .await?;

        match confirmed {
            Some(confirmed) => {
                metrics::counter!("bookings_confirmed_total").increment(1);
                tracing::info!(amount = %confirmed.total_price, "booking confirmed");
                Ok(confirmed)
            }
            None => {
                // The sweep won the race after the charge went through
                let current = self.get_booking(booking_id).await?;
                tracing::warn!(
                    status = %current.status,
                    amount = %booking.total_price,
                    "booking left pending during payment, charge needs reconciliation"
                );
                Err(match current.status {
                    BookingStatus::Expired => BookingError::BookingExpired,
                    status => BookingError::NotConfirmable { status },
                }
                .into())
            }
        }
    }

    /// Expires every pending booking whose hold window has passed and
    /// releases its seats.
    ///
    /// Each booking is handled on its own: a failure is counted and logged
    /// and the booking stays pending for the next sweep. Bookings that have
    /// already left PENDING are skipped, so running this twice releases
    /// nothing the second time.
    #[tracing::instrument(skip(self))]
    pub async fn expire_due_bookings(&self) -> Result<SweepReport> {
        let started = Instant::now();
        let due = self
            .store
            .find_expired_pending(self.clock.now())
            .await?;

        let mut report = SweepReport::default();
        for booking in &due {
            match self.expire_one(booking).await {
                Ok(true) => report.expired += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    report.failed += 1;
                    metrics::counter!("expiry_sweep_failures_total").increment(1);
                    tracing::warn!(booking_id = %booking.id, error = %e, "failed to expire booking");
                }
            }
        }

        metrics::histogram!("expiry_sweep_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        if !due.is_empty() {
            tracing::info!(
                expired = report.expired,
                skipped = report.skipped,
                failed = report.failed,
                "expiry sweep finished"
            );
        }

        Ok(report)
    }

    /// Returns Ok(false) when the booking was no longer pending.
    async fn expire_one(&self, booking: &Booking) -> Result<bool> {
        let Some(expired) = self
            .inventory
            .release_expired(booking.id, self.clock.now())
            .await?
        else {
            return Ok(false);
        };

        metrics::counter!("bookings_expired_total").increment(1);
        tracing::info!(
            booking_id = %expired.id,
            travel_id = %expired.travel_id,
            seats = expired.selected_seats,
            "booking expired"
        );
        Ok(true)
    }

    /// Adds a new travel offering to the catalog.
    #[tracing::instrument(skip(self, travel), fields(travel_id = %travel.id, slug = %travel.slug))]
    pub async fn register_travel(&self, travel: TravelOffering) -> Result<TravelOffering> {
        let travel = self.store.insert_travel(travel).await?;
        tracing::info!(total_seats = travel.total_seats, "travel registered");
        Ok(travel)
    }

    /// Loads a booking.
    pub async fn get_booking(&self, booking_id: BookingId) -> Result<Booking> {
        Ok(self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or(BookingError::BookingNotFound)?)
    }

    /// Loads a travel offering.
    pub async fn get_travel(&self, travel_id: TravelId) -> Result<TravelOffering> {
        Ok(self
            .store
            .get_travel(travel_id)
            .await?
            .ok_or(BookingError::TravelNotFound)?)
    }

    /// Loads a travel offering by its slug.
    pub async fn get_travel_by_slug(&self, slug: &str) -> Result<TravelOffering> {
        Ok(self
            .store
            .get_travel_by_slug(slug)
            .await?
            .ok_or(BookingError::TravelNotFound)?)
    }

    /// Lists a user's bookings, newest first. Unknown emails have none.
    pub async fn list_bookings(&self, user_email: &str) -> Result<Vec<Booking>> {
        match self.identity.find(user_email).await? {
            Some(user) => Ok(self.store.list_bookings_for_user(user.id).await?),
            None => Ok(Vec::new()),
        }
    }

    /// Administrative seat release.
    #[tracing::instrument(skip(self))]
    pub async fn increase_seats(&self, travel_id: TravelId, seats: i32) -> Result<TravelOffering> {
        self.inventory.increase(travel_id, seats).await
    }

    /// Administrative seat withdrawal.
    #[tracing::instrument(skip(self))]
    pub async fn decrease_seats(&self, travel_id: TravelId, seats: i32) -> Result<TravelOffering> {
        self.inventory.decrease(travel_id, seats).await
    }
}
