//! Collaborators the lifecycle depends on: user identity and payment.

pub mod identity;
pub mod payment;

pub use identity::IdentityResolver;
pub use payment::{InMemoryPaymentService, PaymentService};
