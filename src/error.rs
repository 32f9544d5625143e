use chrono::{DateTime, Utc};
use thiserror::Error;

/// Failure taxonomy for credential fetching and refresh.
///
/// The fetch-level variants surface from a single fetch operation. The
/// scheduler-level variants (`StaleToken`, `NegativeDuration`,
/// `ExpiringTooSoonToRetry`, `Callback`) are produced by the refresh loop
/// and reach the caller only through its callback.
#[derive(Error, Debug, Clone)]
pub enum IdentityError {
    /// Endpoint environment value missing or unparseable.
    #[error("invalid identity endpoint: {0}")]
    Configuration(String),

    /// Transport failed on every attempt.
    #[error("identity request failed after {attempts} attempts: {message}")]
    Transport { attempts: u32, message: String },

    #[error("unexpected status {status}: {body}: {url}")]
    UnexpectedStatus {
        status: u16,
        body: String,
        url: String,
    },

    /// Response body is not a JSON object.
    #[error("malformed identity response: {0}")]
    MalformedBody(String),

    #[error("identity response has no {0:?} field")]
    MissingField(&'static str),

    #[error("identity response field {0:?} has an unexpected type")]
    InvalidFieldType(&'static str),

    #[error("expires_on is not a unix timestamp: {0}")]
    InvalidTimestamp(String),

    /// Endpoint returned a token whose expiry is not in the future.
    #[error("token already expired at {0}")]
    AlreadyExpired(DateTime<Utc>),

    /// Refresh returned the same access token as the one currently held.
    #[error("endpoint returned an unchanged access token")]
    StaleToken,

    /// Credential expiry lies in the past; no refresh timer can be armed from it.
    #[error("credential expired at {0}, refusing to arm refresh timer")]
    NegativeDuration(DateTime<Utc>),

    /// Terminal: the held credential expires before another retry could land.
    #[error("credential expires at {0}, too soon for another refresh attempt")]
    ExpiringTooSoonToRetry(DateTime<Utc>),

    /// The caller's callback rejected a refreshed credential.
    #[error("refresh callback failed: {0}")]
    Callback(String),
}
