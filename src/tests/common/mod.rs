// tests/common/mod.rs
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::mpsc;

use crate::config::endpoint::EndpointSettings;
use crate::config::settings::FetchAttemptPolicy;
use crate::credential::Credential;
use crate::error::IdentityError;
use crate::fetcher::{FetchRequest, FetchResponse, Fetcher};
use crate::refresh::RefreshCallback;

/// JSON body in the identity endpoint's wire format.
pub fn token_body(token: &str, expires_in_secs: i64) -> serde_json::Value {
    json!({
        "access_token": token,
        "expires_on": (Utc::now().timestamp() + expires_in_secs).to_string(),
    })
}

pub fn test_endpoint() -> EndpointSettings {
    EndpointSettings::new("http://identity.test/msi/token", "secret-header")
}

/// Attempt policy with a delay short enough for tests.
pub fn fast_attempts(max_attempts: u32) -> FetchAttemptPolicy {
    FetchAttemptPolicy {
        max_attempts,
        inter_attempt_delay: Duration::from_millis(1),
    }
}

/// Coerce a concrete stub into the shared capability type.
pub fn as_dyn(fetcher: Arc<impl Fetcher + 'static>) -> Arc<dyn Fetcher> {
    fetcher
}

pub type Event = Result<Credential, IdentityError>;

/// Callback forwarding every refresh outcome into an mpsc channel.
pub fn channel_callback() -> (RefreshCallback, mpsc::UnboundedReceiver<Event>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: RefreshCallback = Box::new(move |outcome| {
        let _ = tx.send(outcome.map(Credential::clone).map_err(IdentityError::clone));
        Ok(())
    });
    (callback, rx)
}

/// Fetcher stub returning a fixed status and body, counting invocations.
pub struct StubFetcher {
    status: u16,
    body: String,
    calls: AtomicUsize,
}

impl StubFetcher {
    pub fn ok(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            status: 200,
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn with_status(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            status,
            body: body.to_owned(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for StubFetcher {
    async fn fetch(&self, _req: &FetchRequest) -> Result<FetchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(FetchResponse {
            status: self.status,
            body: self.body.clone(),
        })
    }
}

/// Fetcher stub failing at the transport level for the first `failures`
/// calls, then serving the body.
pub struct FlakyFetcher {
    failures: usize,
    body: String,
    calls: AtomicUsize,
}

impl FlakyFetcher {
    pub fn new(failures: usize, body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            failures,
            body: body.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn always_failing() -> Arc<Self> {
        Arc::new(Self {
            failures: usize::MAX,
            body: String::new(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Fetcher for FlakyFetcher {
    async fn fetch(&self, _req: &FetchRequest) -> Result<FetchResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(anyhow!("connection refused"));
        }
        Ok(FetchResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}

/// Fetcher stub serving queued bodies in order, repeating the last one.
pub struct SequenceFetcher {
    bodies: Vec<String>,
    calls: AtomicUsize,
}

impl SequenceFetcher {
    pub fn new(bodies: Vec<serde_json::Value>) -> Arc<Self> {
        Arc::new(Self {
            bodies: bodies.into_iter().map(|b| b.to_string()).collect(),
            calls: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Fetcher for SequenceFetcher {
    async fn fetch(&self, _req: &FetchRequest) -> Result<FetchResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let body = self.bodies[n.min(self.bodies.len() - 1)].clone();
        Ok(FetchResponse { status: 200, body })
    }
}

/// Fetcher recording the last request it served.
pub struct RecordingFetcher {
    body: String,
    pub last: Mutex<Option<FetchRequest>>,
}

impl RecordingFetcher {
    pub fn new(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            last: Mutex::new(None),
        })
    }
}

#[async_trait]
impl Fetcher for RecordingFetcher {
    async fn fetch(&self, req: &FetchRequest) -> Result<FetchResponse> {
        *self.last.lock().unwrap() = Some(req.clone());
        Ok(FetchResponse {
            status: 200,
            body: self.body.clone(),
        })
    }
}
