use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{BookingId, TravelId, UserId};
use domain::{Booking, BookingError, BookingStatus, TravelOffering, UserIdentity};
use tokio::sync::RwLock;

use crate::{
    Result, StoreError,
    store::{BookingStore, TravelStore, UserStore},
};

/// In-memory store for tests and single-process deployments.
///
/// Each table sits behind its own lock. Every mutation holds the relevant
/// write lock for its whole read-validate-write sequence, which gives the
/// same serialization a row lock gives in PostgreSQL. When several locks are
/// needed they are taken in the order travels, users, bookings.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    travels: Arc<RwLock<HashMap<TravelId, TravelOffering>>>,
    users: Arc<RwLock<HashMap<UserId, UserIdentity>>>,
    bookings: Arc<RwLock<HashMap<BookingId, Booking>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored bookings.
    pub async fn booking_count(&self) -> usize {
        self.bookings.read().await.len()
    }

    /// Returns the number of stored users.
    pub async fn user_count(&self) -> usize {
        self.users.read().await.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        self.travels.write().await.clear();
        self.users.write().await.clear();
        self.bookings.write().await.clear();
    }
}

#[async_trait]
impl TravelStore for InMemoryStore {
    async fn insert_travel(&self, travel: TravelOffering) -> Result<TravelOffering> {
        let mut travels = self.travels.write().await;

        if travels.values().any(|t| t.slug == travel.slug) {
            return Err(StoreError::Rejected(BookingError::InvalidTravel {
                reason: format!("slug '{}' already exists", travel.slug),
            }));
        }

        travels.insert(travel.id, travel.clone());
        Ok(travel)
    }

    async fn get_travel(&self, id: TravelId) -> Result<Option<TravelOffering>> {
        Ok(self.travels.read().await.get(&id).cloned())
    }

    async fn get_travel_by_slug(&self, slug: &str) -> Result<Option<TravelOffering>> {
        let travels = self.travels.read().await;
        Ok(travels.values().find(|t| t.slug == slug).cloned())
    }

    async fn adjust_available_seats(&self, id: TravelId, delta: i32) -> Result<TravelOffering> {
        let mut travels = self.travels.write().await;

        let travel = travels.get_mut(&id).ok_or(BookingError::TravelNotFound)?;
        travel.available_seats = travel.apply_seat_delta(delta)?;

        Ok(travel.clone())
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn insert_user(&self, user: UserIdentity) -> Result<UserIdentity> {
        let mut users = self.users.write().await;

        if users.values().any(|u| u.email == user.email) {
            return Err(BookingError::UserAlreadyExists.into());
        }

        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserIdentity>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserIdentity>> {
        let users = self.users.read().await;
        Ok(users.values().find(|u| u.email == email).cloned())
    }
}

#[async_trait]
impl BookingStore for InMemoryStore {
    async fn insert_booking(&self, booking: Booking) -> Result<Booking> {
        let travels = self.travels.read().await;
        let users = self.users.read().await;
        let mut bookings = self.bookings.write().await;

        if !travels.contains_key(&booking.travel_id) {
            return Err(BookingError::TravelNotFound.into());
        }
        if !users.contains_key(&booking.user_id) {
            return Err(StoreError::Corrupt(format!(
                "booking {} references unknown user {}",
                booking.id, booking.user_id
            )));
        }

        // Unique (user, travel) among pending bookings
        if booking.status == BookingStatus::Pending
            && bookings.values().any(|b| {
                b.status == BookingStatus::Pending
                    && b.user_id == booking.user_id
                    && b.travel_id == booking.travel_id
            })
        {
            return Err(BookingError::DuplicatePendingBooking.into());
        }

        bookings.insert(booking.id, booking.clone());
        Ok(booking)
    }

    async fn get_booking(&self, id: BookingId) -> Result<Option<Booking>> {
        Ok(self.bookings.read().await.get(&id).cloned())
    }

    async fn find_pending_booking(
        &self,
        user_id: UserId,
        travel_id: TravelId,
    ) -> Result<Option<Booking>> {
        let bookings = self.bookings.read().await;
        Ok(bookings
            .values()
            .find(|b| {
                b.status == BookingStatus::Pending
                    && b.user_id == user_id
                    && b.travel_id == travel_id
            })
            .cloned())
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut due: Vec<_> = bookings
            .values()
            .filter(|b| b.is_due_for_expiry(now))
            .cloned()
            .collect();
        due.sort_by_key(|b| b.expiration_time);
        Ok(due)
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        if !from.can_transition_to(to) {
            return Err(BookingError::InvalidTransition { from, to }.into());
        }

        let mut bookings = self.bookings.write().await;

        let booking = bookings.get_mut(&id).ok_or(BookingError::BookingNotFound)?;
        if booking.status != from {
            return Ok(None);
        }
        booking.transition_to(to, now)?;

        Ok(Some(booking.clone()))
    }

    async fn expire_and_release(
        &self,
        id: BookingId,
        now: DateTime<Utc>,
    ) -> Result<Option<Booking>> {
        let mut travels = self.travels.write().await;
        let mut bookings = self.bookings.write().await;

        let booking = bookings.get(&id).ok_or(BookingError::BookingNotFound)?;
        if booking.status != BookingStatus::Pending {
            return Ok(None);
        }

        let travel = travels
            .get_mut(&booking.travel_id)
            .ok_or(BookingError::TravelNotFound)?;
        let new_available = travel.apply_seat_delta(booking.selected_seats)?;

        let mut expired = booking.clone();
        expired.transition_to(BookingStatus::Expired, now)?;

        // Both writes happen only after every check passed
        travel.available_seats = new_available;
        bookings.insert(id, expired.clone());

        Ok(Some(expired))
    }

    async fn list_bookings_for_user(&self, user_id: UserId) -> Result<Vec<Booking>> {
        let bookings = self.bookings.read().await;
        let mut owned: Vec<_> = bookings
            .values()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }
}
