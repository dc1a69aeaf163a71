//! Domain layer for the booking system.
//!
//! This crate holds the pure parts of the booking core:
//! - `TravelOffering` with its seat-delta arithmetic
//! - `Booking` and the `BookingStatus` state machine
//! - booking size and expiry policies
//! - the `BookingError` taxonomy shared by every layer above
//!
//! Nothing here performs I/O; persistence and orchestration live in the
//! `store` and `lifecycle` crates.

pub mod booking;
pub mod error;
pub mod money;
pub mod travel;
pub mod user;

pub use booking::{
    Booking, BookingStatus, HOLD_DURATION_MINUTES, MAX_BOOKING_SIZE, MIN_BOOKING_SIZE,
    SWEEP_INTERVAL_SECS, UnknownStatus, is_expired, validate_size,
};
pub use error::{BookingError, ErrorKind};
pub use money::Money;
pub use travel::TravelOffering;
pub use user::{UserIdentity, normalize_email};
