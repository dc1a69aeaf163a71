//! Persistence boundary for the booking core.
//!
//! The traits in [`store`] describe what the lifecycle needs from storage;
//! each adapter must make the seat adjustment, the pending-booking insert and
//! the status compare-and-set atomic on its own.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod store;

pub use error::{Result, StoreError};
pub use memory::InMemoryStore;
pub use postgres::PostgresStore;
pub use store::{BookingStore, Store, TravelStore, UserStore};
