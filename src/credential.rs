use chrono::{DateTime, Utc};

use crate::error::IdentityError;

/// A bearer credential issued by the managed identity endpoint.
///
/// Superseded as a whole on every successful refresh, never mutated in place.
#[derive(Clone)]
pub struct Credential {
    pub access_token: String,
    pub expires_on: DateTime<Utc>, // absolute expiry instant
}

impl Credential {
    /// Build a credential, rejecting one whose expiry is not strictly in
    /// the future.
    pub fn new(access_token: String, expires_on: DateTime<Utc>) -> Result<Self, IdentityError> {
        if expires_on <= Utc::now() {
            return Err(IdentityError::AlreadyExpired(expires_on));
        }
        Ok(Self {
            access_token,
            expires_on,
        })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"[REDACTED]")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}
