//! Payment service trait and in-memory implementation.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::BookingId;
use domain::Money;

/// Charges for a booking.
///
/// A charge either succeeds or fails as a whole; transport faults count as
/// failures.
#[async_trait]
pub trait PaymentService: Send + Sync {
    /// Charges `amount` for `booking_id`. Returns true on success.
    async fn charge(&self, booking_id: BookingId, amount: Money) -> bool;
}

#[async_trait]
impl<T: PaymentService + ?Sized> PaymentService for Arc<T> {
    async fn charge(&self, booking_id: BookingId, amount: Money) -> bool {
        (**self).charge(booking_id, amount).await
    }
}

#[derive(Debug, Default)]
struct InMemoryPaymentState {
    charges: Vec<(BookingId, Money)>,
    declined: usize,
    fail_on_charge: bool,
}

/// In-memory payment service that approves every charge unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentService {
    state: Arc<RwLock<InMemoryPaymentState>>,
}

impl InMemoryPaymentService {
    /// Creates a new in-memory payment service.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the service to decline charges.
    pub fn set_fail_on_charge(&self, fail: bool) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .fail_on_charge = fail;
    }

    /// Returns the number of successful charges.
    pub fn charge_count(&self) -> usize {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .charges
            .len()
    }

    /// Returns the number of declined charges.
    pub fn declined_count(&self) -> usize {
        self.state.read().unwrap_or_else(|e| e.into_inner()).declined
    }

    /// Returns the amount charged for a booking, if any.
    pub fn charged_amount(&self, booking_id: BookingId) -> Option<Money> {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .charges
            .iter()
            .find(|(id, _)| *id == booking_id)
            .map(|(_, amount)| *amount)
    }
}

#[async_trait]
impl PaymentService for InMemoryPaymentService {
    async fn charge(&self, booking_id: BookingId, amount: Money) -> bool {
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());

        if state.fail_on_charge {
            state.declined += 1;
            tracing::info!(%booking_id, %amount, "charge declined");
            return false;
        }

        state.charges.push((booking_id, amount));
        true
    }
}
