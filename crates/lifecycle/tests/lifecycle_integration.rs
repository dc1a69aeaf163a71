//! Integration tests for the booking lifecycle over the in-memory store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use common::{BookingId, Clock, FixedClock, TravelId, UserId};
use domain::{Booking, BookingError, BookingStatus, Money, TravelOffering, UserIdentity};
use lifecycle::{
    BookingLifecycle, InMemoryPaymentService, LifecycleError, PaymentService, SweepReport,
};
use store::{BookingStore, InMemoryStore, StoreError, TravelStore, UserStore};

struct Harness {
    store: InMemoryStore,
    payment: InMemoryPaymentService,
    clock: FixedClock,
    lifecycle: Arc<BookingLifecycle<InMemoryStore, InMemoryPaymentService>>,
}

fn harness() -> Harness {
    let store = InMemoryStore::new();
    let payment = InMemoryPaymentService::new();
    let clock = FixedClock::at(Utc::now());
    let lifecycle = Arc::new(BookingLifecycle::with_clock(
        store.clone(),
        payment.clone(),
        Arc::new(clock.clone()),
    ));
    Harness {
        store,
        payment,
        clock,
        lifecycle,
    }
}

async fn add_travel(store: &InMemoryStore, total: i32, available: i32, price: i64) -> TravelId {
    let travel = TravelOffering::new(
        format!("travel-{}", BookingId::new()),
        "Thailand Escape",
        Money::from_cents(price),
        total,
    )
    .unwrap()
    .with_available_seats(available)
    .unwrap();
    store.insert_travel(travel).await.unwrap().id
}

async fn available(h: &Harness, travel_id: TravelId) -> i32 {
    h.lifecycle
        .get_travel(travel_id)
        .await
        .unwrap()
        .available_seats
}

fn booking_error(err: LifecycleError) -> BookingError {
    match err {
        LifecycleError::Booking(e) => e,
        other => panic!("expected booking error, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_a_create_holds_seats_and_prices_booking() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;

    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.total_price, Money::from_cents(2000));
    assert_eq!(booking.selected_seats, 2);
    assert_eq!(booking.expiration_time, h.clock.now() + Duration::minutes(15));
    assert_eq!(available(&h, travel_id).await, 8);
}

#[tokio::test]
async fn scenario_b_second_pending_booking_is_rejected() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;

    h.lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();
    let err = h
        .lifecycle
        .create("Alice@Example.com", travel_id, 1)
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "You already have a pending booking for this travel"
    );
    assert_eq!(available(&h, travel_id).await, 8);
    assert_eq!(h.store.booking_count().await, 1);
}

#[tokio::test]
async fn scenario_c_more_than_five_seats_is_rejected() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;

    let err = h
        .lifecycle
        .create("alice@example.com", travel_id, 6)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Cannot book more than 5 seats");
    assert_eq!(available(&h, travel_id).await, 10);

    let err = h
        .lifecycle
        .create("alice@example.com", travel_id, 0)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Cannot book less than 1 seat");
    assert_eq!(h.store.user_count().await, 0);
}

#[tokio::test]
async fn scenario_d_confirm_after_expiration_fails() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    h.clock
        .advance(Duration::minutes(15) + Duration::milliseconds(1));
    let err = h.lifecycle.confirm(booking.id).await.unwrap_err();

    assert_eq!(err.to_string(), "Booking expired");
    assert_eq!(h.payment.charge_count(), 0);
    let stored = h.lifecycle.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
}

#[tokio::test]
async fn confirm_exactly_at_expiration_succeeds() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    h.clock.set(booking.expiration_time);
    let confirmed = h.lifecycle.confirm(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
}

#[tokio::test]
async fn scenario_e_payment_failure_keeps_booking_pending() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    h.payment.set_fail_on_charge(true);
    let err = h.lifecycle.confirm(booking.id).await.unwrap_err();

    assert_eq!(err.to_string(), "Payment failed");
    let stored = h.lifecycle.get_booking(booking.id).await.unwrap();
    assert_eq!(stored.status, BookingStatus::Pending);
    assert_eq!(available(&h, travel_id).await, 8);

    // Retry succeeds while the hold is still valid
    h.payment.set_fail_on_charge(false);
    let confirmed = h.lifecycle.confirm(booking.id).await.unwrap();
    assert_eq!(confirmed.status, BookingStatus::Confirmed);
    assert_eq!(
        h.payment.charged_amount(booking.id),
        Some(Money::from_cents(2000))
    );
    assert_eq!(available(&h, travel_id).await, 8);
}

#[tokio::test]
async fn scenario_f_sweep_expires_and_releases_seats() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    let first = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();
    let second = h
        .lifecycle
        .create("bob@example.com", travel_id, 4)
        .await
        .unwrap();
    assert_eq!(available(&h, travel_id).await, 4);

    h.clock.advance(Duration::minutes(16));
    let report = h.lifecycle.expire_due_bookings().await.unwrap();

    assert_eq!(
        report,
        SweepReport {
            expired: 2,
            skipped: 0,
            failed: 0
        }
    );
    for id in [first.id, second.id] {
        let stored = h.lifecycle.get_booking(id).await.unwrap();
        assert_eq!(stored.status, BookingStatus::Expired);
    }
    assert_eq!(available(&h, travel_id).await, 10);
}

#[tokio::test]
async fn sweep_is_idempotent() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    h.lifecycle
        .create("alice@example.com", travel_id, 3)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(16));
    let first = h.lifecycle.expire_due_bookings().await.unwrap();
    let second = h.lifecycle.expire_due_bookings().await.unwrap();

    assert_eq!(first.expired, 1);
    assert_eq!(second, SweepReport::default());
    assert_eq!(available(&h, travel_id).await, 10);
}

#[tokio::test]
async fn sweep_leaves_live_and_confirmed_bookings_alone() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 20, 1000).await;
    let confirmed = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();
    h.lifecycle.confirm(confirmed.id).await.unwrap();

    h.clock.advance(Duration::minutes(10));
    let live = h
        .lifecycle
        .create("bob@example.com", travel_id, 1)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(10));
    let report = h.lifecycle.expire_due_bookings().await.unwrap();

    assert_eq!(report.expired, 0);
    assert_eq!(
        h.lifecycle.get_booking(confirmed.id).await.unwrap().status,
        BookingStatus::Confirmed
    );
    assert_eq!(
        h.lifecycle.get_booking(live.id).await.unwrap().status,
        BookingStatus::Pending
    );
    assert_eq!(available(&h, travel_id).await, 17);
}

#[tokio::test]
async fn expired_booking_allows_a_new_hold() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    h.lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    h.clock.advance(Duration::minutes(16));
    h.lifecycle.expire_due_bookings().await.unwrap();

    let again = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();
    assert_eq!(again.status, BookingStatus::Pending);
    assert_eq!(available(&h, travel_id).await, 8);
    assert_eq!(
        h.lifecycle
            .list_bookings("alice@example.com")
            .await
            .unwrap()
            .len(),
        2
    );
}

#[tokio::test]
async fn confirm_non_pending_booking_is_a_conflict() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;
    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();
    h.lifecycle.confirm(booking.id).await.unwrap();

    let err = h.lifecycle.confirm(booking.id).await.unwrap_err();
    assert_eq!(
        booking_error(err),
        BookingError::NotConfirmable {
            status: BookingStatus::Confirmed
        }
    );
    assert_eq!(h.payment.charge_count(), 1);

    // Still a conflict when payment would also fail
    h.payment.set_fail_on_charge(true);
    let err = h.lifecycle.confirm(booking.id).await.unwrap_err();
    assert_eq!(err.to_string(), "Booking is not in a confirmable state");
}

#[tokio::test]
async fn unknown_ids_are_not_found() {
    let h = harness();

    let err = h.lifecycle.confirm(BookingId::new()).await.unwrap_err();
    assert_eq!(booking_error(err), BookingError::BookingNotFound);

    let err = h.lifecycle.get_travel(TravelId::new()).await.unwrap_err();
    assert_eq!(booking_error(err), BookingError::TravelNotFound);
}

#[tokio::test]
async fn identity_is_created_even_when_travel_is_missing() {
    let h = harness();

    let err = h
        .lifecycle
        .create("carol@example.com", TravelId::new(), 1)
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Travel not found");
    assert_eq!(h.store.user_count().await, 1);

    // Retrying reuses the identity instead of failing or duplicating it
    let travel_id = add_travel(&h.store, 5, 5, 1000).await;
    h.lifecycle
        .create("carol@example.com", travel_id, 1)
        .await
        .unwrap();
    assert_eq!(h.store.user_count().await, 1);
}

#[tokio::test]
async fn insufficient_seats_creates_no_booking() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 3, 1000).await;

    let err = h
        .lifecycle
        .create("alice@example.com", travel_id, 4)
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Not enough available seats");
    assert_eq!(h.store.booking_count().await, 0);
    assert_eq!(available(&h, travel_id).await, 3);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_never_oversell() {
    let h = harness();
    let travel_id = add_travel(&h.store, 10, 10, 1000).await;

    let handles: Vec<_> = (0..25)
        .map(|i| {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move {
                lifecycle
                    .create(&format!("user{i}@example.com"), travel_id, 1)
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(e.to_string(), "Not enough available seats"),
        }
    }

    assert_eq!(created, 10);
    assert_eq!(available(&h, travel_id).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_creates_for_same_pair_hold_seats_once() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 20, 1000).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.create("same@example.com", travel_id, 2).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => created += 1,
            Err(e) => assert_eq!(
                booking_error(e),
                BookingError::DuplicatePendingBooking
            ),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(h.store.booking_count().await, 1);
    // Losers that got past the duplicate check gave their seats back
    assert_eq!(available(&h, travel_id).await, 18);
}

#[tokio::test]
async fn rejected_release_keeps_booking_pending_for_next_sweep() {
    let h = harness();
    let travel_id = add_travel(&h.store, 10, 10, 1000).await;
    let booking = h
        .lifecycle
        .create("alice@example.com", travel_id, 3)
        .await
        .unwrap();

    // Counter refilled behind the hold's back; releasing would overflow capacity
    h.lifecycle.increase_seats(travel_id, 3).await.unwrap();

    h.clock.advance(Duration::minutes(16));
    let report = h.lifecycle.expire_due_bookings().await.unwrap();
    assert_eq!(report.failed, 1);
    assert_eq!(
        h.lifecycle.get_booking(booking.id).await.unwrap().status,
        BookingStatus::Pending
    );

    // Still rejected by the live expiry check in the meantime
    let err = h.lifecycle.confirm(booking.id).await.unwrap_err();
    assert_eq!(booking_error(err), BookingError::BookingExpired);

    h.lifecycle.decrease_seats(travel_id, 3).await.unwrap();
    let report = h.lifecycle.expire_due_bookings().await.unwrap();
    assert_eq!(report.expired, 1);
    assert_eq!(available(&h, travel_id).await, 10);
}

#[tokio::test]
async fn admin_adjustments_respect_bounds() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 10, 1000).await;

    let travel = h.lifecycle.decrease_seats(travel_id, 10).await.unwrap();
    assert_eq!(travel.available_seats, 0);

    let err = h.lifecycle.decrease_seats(travel_id, 1).await.unwrap_err();
    assert!(matches!(
        booking_error(err),
        BookingError::InsufficientInventory { .. }
    ));

    let err = h.lifecycle.increase_seats(travel_id, 21).await.unwrap_err();
    assert!(matches!(
        booking_error(err),
        BookingError::CapacityExceeded { .. }
    ));

    let travel = h.lifecycle.increase_seats(travel_id, 20).await.unwrap();
    assert_eq!(travel.available_seats, 20);
}

/// Payment that lets the sweep expire the booking while the charge is in flight.
struct SweepDuringCharge {
    store: InMemoryStore,
}

#[async_trait]
impl PaymentService for SweepDuringCharge {
    async fn charge(&self, booking_id: BookingId, _amount: Money) -> bool {
        self.store
            .expire_and_release(booking_id, Utc::now())
            .await
            .unwrap();
        true
    }
}

#[tokio::test]
async fn sweep_winning_during_payment_fails_confirm() {
    let store = InMemoryStore::new();
    let lifecycle = BookingLifecycle::new(
        store.clone(),
        SweepDuringCharge {
            store: store.clone(),
        },
    );
    let travel_id = add_travel(&store, 20, 10, 1000).await;
    let booking = lifecycle
        .create("alice@example.com", travel_id, 2)
        .await
        .unwrap();

    let err = lifecycle.confirm(booking.id).await.unwrap_err();

    assert_eq!(err.to_string(), "Booking expired");
    assert_eq!(
        lifecycle.get_booking(booking.id).await.unwrap().status,
        BookingStatus::Expired
    );
    assert_eq!(
        lifecycle.get_travel(travel_id).await.unwrap().available_seats,
        10
    );
}

#[tokio::test]
async fn travel_lookup_by_slug() {
    let h = harness();
    let travel = TravelOffering::new("jordan-360", "Jordan 360", Money::from_cents(2000), 10)
        .unwrap()
        .with_description("Desert, canyons and Petra by night");
    h.lifecycle.register_travel(travel).await.unwrap();

    let found = h.lifecycle.get_travel_by_slug("jordan-360").await.unwrap();
    assert_eq!(found.name, "Jordan 360");
    assert_eq!(
        found.description.as_deref(),
        Some("Desert, canyons and Petra by night")
    );

    let err = h.lifecycle.get_travel_by_slug("nowhere").await.unwrap_err();
    assert_eq!(booking_error(err), BookingError::TravelNotFound);
}

/// Store whose first seat release fails after a same-pair booking attempt
/// slipped in while the release was in flight.
#[derive(Clone)]
struct FlakyRelease {
    inner: InMemoryStore,
    failed_once: Arc<Mutex<bool>>,
    interleaved: Arc<Mutex<Option<Result<Booking, StoreError>>>>,
}

impl FlakyRelease {
    fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            failed_once: Arc::new(Mutex::new(false)),
            interleaved: Arc::new(Mutex::new(None)),
        }
    }
}

#[async_trait]
impl TravelStore for FlakyRelease {
    async fn insert_travel(&self, travel: TravelOffering) -> store::Result<TravelOffering> {
        self.inner.insert_travel(travel).await
    }

    async fn get_travel(&self, id: TravelId) -> store::Result<Option<TravelOffering>> {
        self.inner.get_travel(id).await
    }

    async fn get_travel_by_slug(&self, slug: &str) -> store::Result<Option<TravelOffering>> {
        self.inner.get_travel_by_slug(slug).await
    }

    async fn adjust_available_seats(
        &self,
        id: TravelId,
        delta: i32,
    ) -> store::Result<TravelOffering> {
        self.inner.adjust_available_seats(id, delta).await
    }
}

#[async_trait]
impl UserStore for FlakyRelease {
    async fn insert_user(&self, user: UserIdentity) -> store::Result<UserIdentity> {
        self.inner.insert_user(user).await
    }

    async fn get_user(&self, id: UserId) -> store::Result<Option<UserIdentity>> {
        self.inner.get_user(id).await
    }

    async fn find_user_by_email(&self, email: &str) -> store::Result<Option<UserIdentity>> {
        self.inner.find_user_by_email(email).await
    }
}

#[async_trait]
impl BookingStore for FlakyRelease {
    async fn insert_booking(&self, booking: Booking) -> store::Result<Booking> {
        self.inner.insert_booking(booking).await
    }

    async fn get_booking(&self, id: BookingId) -> store::Result<Option<Booking>> {
        self.inner.get_booking(id).await
    }

    async fn find_pending_booking(
        &self,
        user_id: UserId,
        travel_id: TravelId,
    ) -> store::Result<Option<Booking>> {
        self.inner.find_pending_booking(user_id, travel_id).await
    }

    async fn find_expired_pending(&self, now: DateTime<Utc>) -> store::Result<Vec<Booking>> {
        self.inner.find_expired_pending(now).await
    }

    async fn transition_status(
        &self,
        id: BookingId,
        from: BookingStatus,
        to: BookingStatus,
        now: DateTime<Utc>,
    ) -> store::Result<Option<Booking>> {
        self.inner.transition_status(id, from, to, now).await
    }

    async fn expire_and_release(
        &self,
        id: BookingId,
        now: DateTime<Utc>,
    ) -> store::Result<Option<Booking>> {
        if std::mem::replace(&mut *self.failed_once.lock().unwrap(), true) {
            return self.inner.expire_and_release(id, now).await;
        }

        let old = self.inner.get_booking(id).await?.unwrap();
        let travel = self.inner.get_travel(old.travel_id).await?.unwrap();
        let rival = Booking::pending(old.user_id, &travel, 1, now, Duration::minutes(15)).unwrap();
        let attempt = self.inner.insert_booking(rival).await;
        *self.interleaved.lock().unwrap() = Some(attempt);

        Err(StoreError::Corrupt("seat release unavailable".to_string()))
    }

    async fn list_bookings_for_user(&self, user_id: UserId) -> store::Result<Vec<Booking>> {
        self.inner.list_bookings_for_user(user_id).await
    }
}

#[tokio::test]
async fn failed_release_never_strands_seats() {
    let inner = InMemoryStore::new();
    let store = FlakyRelease::new(inner.clone());
    let clock = FixedClock::at(Utc::now());
    let lifecycle = BookingLifecycle::with_clock(
        store.clone(),
        InMemoryPaymentService::new(),
        Arc::new(clock.clone()),
    );
    let travel_id = add_travel(&inner, 10, 10, 1000).await;
    let old = lifecycle
        .create("alice@example.com", travel_id, 3)
        .await
        .unwrap();

    clock.advance(Duration::minutes(16));
    let first = lifecycle.expire_due_bookings().await.unwrap();
    assert_eq!(first.failed, 1);

    // The old hold was still pending, so the same-pair booking was refused
    let attempt = store.interleaved.lock().unwrap().take().unwrap();
    assert!(matches!(
        attempt,
        Err(StoreError::Rejected(BookingError::DuplicatePendingBooking))
    ));
    assert_eq!(
        lifecycle.get_booking(old.id).await.unwrap().status,
        BookingStatus::Pending
    );
    assert_eq!(
        lifecycle.get_travel(travel_id).await.unwrap().available_seats,
        7
    );

    let second = lifecycle.expire_due_bookings().await.unwrap();
    assert_eq!(second.expired, 1);
    assert_eq!(
        lifecycle.get_booking(old.id).await.unwrap().status,
        BookingStatus::Expired
    );
    assert_eq!(
        lifecycle.get_travel(travel_id).await.unwrap().available_seats,
        10
    );
    assert_eq!(inner.booking_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_sweeps_release_each_hold_once() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 20, 1000).await;
    for i in 0..8 {
        h.lifecycle
            .create(&format!("user{i}@example.com"), travel_id, 2)
            .await
            .unwrap();
    }
    assert_eq!(available(&h, travel_id).await, 4);

    h.clock.advance(Duration::minutes(16));
    let sweeps: Vec<_> = (0..2)
        .map(|_| {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.expire_due_bookings().await })
        })
        .collect();

    let mut expired = 0;
    for sweep in sweeps {
        let report = sweep.await.unwrap().unwrap();
        assert_eq!(report.failed, 0);
        expired += report.expired;
    }

    assert_eq!(expired, 8);
    assert_eq!(available(&h, travel_id).await, 20);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sweep_racing_create_for_same_pair_keeps_counter_exact() {
    let h = harness();
    let travel_id = add_travel(&h.store, 20, 20, 1000).await;

    for round in 0..20 {
        let email = format!("racer{round}@example.com");
        h.lifecycle.create(&email, travel_id, 3).await.unwrap();
        h.clock.advance(Duration::minutes(16));

        let sweep = {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.expire_due_bookings().await })
        };
        let create = {
            let lifecycle = h.lifecycle.clone();
            tokio::spawn(async move { lifecycle.create(&email, travel_id, 2).await })
        };

        sweep.await.unwrap().unwrap();
        if let Err(e) = create.await.unwrap() {
            assert_eq!(booking_error(e), BookingError::DuplicatePendingBooking);
        }
        // Whatever the interleaving, the old hold is gone after one more sweep
        h.clock.advance(Duration::minutes(16));
        h.lifecycle.expire_due_bookings().await.unwrap();

        assert_eq!(available(&h, travel_id).await, 20, "round {round}");
    }
}
