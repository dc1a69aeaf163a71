//! Booking lifecycle for seat-limited travel offerings.
//!
//! A booking starts as a pending hold that takes seats from the offering's
//! counter. It is either confirmed after a successful charge or expired by
//! the periodic sweep, which gives its seats back:
//!
//! 1. `create` validates the size, resolves the user and decrements seats
//! 2. `confirm` checks the hold window, charges and marks it confirmed
//! 3. `expire_due_bookings` expires overdue holds and releases their seats

pub mod error;
pub mod inventory;
pub mod lifecycle;
pub mod services;
pub mod sweeper;

pub use error::{LifecycleError, Result};
pub use inventory::SeatInventory;
pub use lifecycle::{BookingLifecycle, LifecycleConfig, SweepReport};
pub use services::{IdentityResolver, InMemoryPaymentService, PaymentService};
pub use sweeper::ExpirySweeper;
