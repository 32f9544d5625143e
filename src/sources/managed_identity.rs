use std::sync::Arc;

use chrono::TimeZone;
use chrono::Utc;
use reqwest::Url;
use serde_json::Value;

use crate::config::endpoint::{EndpointSettings, API_VERSION, ENV_IDENTITY_ENDPOINT, RESOURCE};
use crate::config::settings::FetchAttemptPolicy;
use crate::credential::Credential;
use crate::error::IdentityError;
use crate::fetcher::{FetchRequest, Fetcher};
use crate::resilience::retry::RetrySettings;

pub const IDENTITY_HEADER_NAME: &str = "x-identity-header";

/// Fetch one credential from the managed identity endpoint.
///
/// Builds the request from `settings`, runs it through `fetcher` with the
/// bounded retry policy, and parses and validates the response body.
pub async fn fetch_credential(
    fetcher: &Arc<dyn Fetcher>,
    settings: &EndpointSettings,
    policy: &FetchAttemptPolicy,
) -> Result<Credential, IdentityError> {
    let request = build_request(settings)?;
    let url = request.url.to_string();

    let retry = RetrySettings {
        attempts: policy.max_attempts.max(1),
        delay: policy.inter_attempt_delay,
    };

    let response = retry
        .run_with_retry(|| {
            let fetcher = fetcher.clone();
            let request = request.clone();
            async move { fetcher.fetch(&request).await }
        })
        .await
        .map_err(|e| IdentityError::Transport {
            attempts: retry.attempts,
            message: e.to_string(),
        })?;

    if response.status != 200 {
        return Err(IdentityError::UnexpectedStatus {
            status: response.status,
            body: response.body,
            url,
        });
    }

    parse_credential(&response.body)
}

fn build_request(settings: &EndpointSettings) -> Result<FetchRequest, IdentityError> {
    let endpoint = settings.endpoint.as_deref().ok_or_else(|| {
        IdentityError::Configuration(format!("please set {}", ENV_IDENTITY_ENDPOINT))
    })?;

    let mut url = Url::parse(endpoint).map_err(|e| {
        IdentityError::Configuration(format!("{}: {}", ENV_IDENTITY_ENDPOINT, e))
    })?;

    url.query_pairs_mut()
        .append_pair("api-version", API_VERSION)
        .append_pair("resource", RESOURCE);

    let headers = vec![(
        IDENTITY_HEADER_NAME.to_owned(),
        settings.identity_header.clone().unwrap_or_default(),
    )];

    Ok(FetchRequest { url, headers })
}

/// Parse the identity endpoint body: `access_token` plus a string-encoded
/// unix timestamp in `expires_on`.
fn parse_credential(body: &str) -> Result<Credential, IdentityError> {
    let parsed: Value =
        serde_json::from_str(body).map_err(|e| IdentityError::MalformedBody(e.to_string()))?;
    let object = parsed
        .as_object()
        .ok_or_else(|| IdentityError::MalformedBody("not a JSON object".to_owned()))?;

    let access_token = match object.get("access_token") {
        None => return Err(IdentityError::MissingField("access_token")),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(IdentityError::InvalidFieldType("access_token")),
    };

    let expires_on = match object.get("expires_on") {
        None => return Err(IdentityError::MissingField("expires_on")),
        Some(Value::String(s)) => s.clone(),
        Some(_) => return Err(IdentityError::InvalidFieldType("expires_on")),
    };

    let unix: i64 = expires_on
        .parse()
        .map_err(|_| IdentityError::InvalidTimestamp(expires_on.clone()))?;
    let expires_on = Utc
        .timestamp_opt(unix, 0)
        .single()
        .ok_or(IdentityError::InvalidTimestamp(expires_on))?;

    Credential::new(access_token, expires_on)
}
