use std::env;

/// Environment variable naming the managed identity endpoint URL.
pub const ENV_IDENTITY_ENDPOINT: &str = "IDENTITY_ENDPOINT";
/// Environment variable carrying the secret identity header value.
pub const ENV_IDENTITY_HEADER: &str = "IDENTITY_HEADER";

/// API version pinned for the metadata identity endpoint.
pub const API_VERSION: &str = "2019-08-01";
/// Resource the issued token grants access to.
pub const RESOURCE: &str = "https://ossrdbms-aad.database.windows.net";

/// Endpoint settings as captured from the process environment.
///
/// Capture is infallible; presence and parseability are validated by the
/// fetch operation, which reports a missing endpoint as a configuration
/// error before any transport call is made.
#[derive(Debug, Clone, Default)]
pub struct EndpointSettings {
    pub endpoint: Option<String>,
    pub identity_header: Option<String>,
}

impl EndpointSettings {
    pub fn from_env() -> Self {
        Self {
            endpoint: env::var(ENV_IDENTITY_ENDPOINT)
                .ok()
                .filter(|v| !v.is_empty()),
            identity_header: env::var(ENV_IDENTITY_HEADER).ok(),
        }
    }

    pub fn new(endpoint: impl Into<String>, identity_header: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            identity_header: Some(identity_header.into()),
        }
    }
}
