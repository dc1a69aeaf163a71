//! Shared types for the booking system.
//!
//! Identifiers are distinct newtypes over UUIDs so a booking id can never be
//! passed where a travel id is expected. The [`Clock`] trait lets the
//! lifecycle read "now" from a source tests can control.

pub mod clock;
pub mod ids;

pub use clock::{Clock, FixedClock, SystemClock};
pub use ids::{BookingId, TravelId, UserId};
