//! User identities as seen by the booking core.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// A user resolved or created from an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserIdentity {
    pub id: UserId,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl UserIdentity {
    /// Creates a new identity for an already normalized email.
    pub fn new(email: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            email: email.into(),
            created_at,
        }
    }
}

/// Trims and lowercases an email address, rejecting obviously malformed ones.
///
/// Only the shape `local@domain` is checked; deliverability is not.
pub fn normalize_email(raw: &str) -> Result<String, BookingError> {
    let email = raw.trim().to_lowercase();
    let invalid = || BookingError::InvalidEmail {
        email: raw.to_string(),
    };

    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.is_empty()
        || domain.contains('@')
        || email.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(email)
}
