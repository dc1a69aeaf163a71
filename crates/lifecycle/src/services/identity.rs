//! User identity resolution by email.

use std::sync::Arc;

use common::Clock;
use domain::{BookingError, UserIdentity, normalize_email};
use store::{StoreError, UserStore};

use crate::error::Result;

/// Finds or creates the user identity behind an email address.
#[derive(Clone)]
pub struct IdentityResolver<S> {
    store: S,
    clock: Arc<dyn Clock>,
}

impl<S: UserStore> IdentityResolver<S> {
    /// Creates a resolver over the given store.
    pub fn new(store: S, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Returns the identity for `email`, creating it on first sight.
    ///
    /// Emails are trimmed and lowercased. Repeated and concurrent calls with
    /// the same address yield the same identity.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, email: &str) -> Result<UserIdentity> {
        let email = normalize_email(email)?;

        if let Some(user) = self.store.find_user_by_email(&email).await? {
            return Ok(user);
        }

        match self.insert(email.clone()).await {
            Ok(user) => Ok(user),
            // Lost a creation race: the winner's row is the identity
            Err(StoreError::Rejected(BookingError::UserAlreadyExists)) => self
                .store
                .find_user_by_email(&email)
                .await?
                .ok_or_else(|| BookingError::UserAlreadyExists.into()),
            Err(e) => Err(e.into()),
        }
    }

    /// Creates a new identity, failing with `UserAlreadyExists` if the email is taken.
    #[tracing::instrument(skip(self))]
    pub async fn create_user(&self, email: &str) -> Result<UserIdentity> {
        let email = normalize_email(email)?;
        Ok(self.insert(email).await?)
    }

    /// Looks up an identity without creating it.
    pub async fn find(&self, email: &str) -> Result<Option<UserIdentity>> {
        let email = normalize_email(email)?;
        Ok(self.store.find_user_by_email(&email).await?)
    }

    async fn insert(&self, email: String) -> std::result::Result<UserIdentity, StoreError> {
        let user = self
            .store
            .insert_user(UserIdentity::new(email, self.clock.now()))
            .await?;
        tracing::info!(user_id = %user.id, "user identity created");
        Ok(user)
    }
}
