use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::endpoint::EndpointSettings;
use crate::config::settings::{FetchAttemptPolicy, RefreshPolicy};
use crate::credential::Credential;
use crate::error::IdentityError;
use crate::fetcher::Fetcher;
use crate::helpers::time::until;
use crate::sources::managed_identity::fetch_credential;

/// Callback invoked on every refresh outcome. A returned error rejects the
/// refreshed credential and feeds the scheduler's retry/terminate decision.
pub type RefreshCallback =
    Box<dyn FnMut(Result<&Credential, &IdentityError>) -> anyhow::Result<()> + Send>;

/// Lifecycle of one scheduler instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefreshState {
    Idle,
    Armed,
    Refreshing,
    Stopped,
}

fn transition(from: RefreshState, to: RefreshState) -> RefreshState {
    debug!("refresh state {from:?} -> {to:?}");
    to
}

/// Time to wait before refreshing a credential expiring at `expires_on`:
/// time-to-expiry minus the safety margin. Inside the margin the remaining
/// time is returned unchanged (refresh as soon as possible); an expiry in
/// the past is an error so the timer is never armed with a negative
/// duration.
pub fn refresh_duration(
    expires_on: DateTime<Utc>,
    safety_margin: Duration,
) -> Result<Duration, IdentityError> {
    refresh_duration_at(expires_on, Utc::now(), safety_margin)
}

pub(crate) fn refresh_duration_at(
    expires_on: DateTime<Utc>,
    now: DateTime<Utc>,
    safety_margin: Duration,
) -> Result<Duration, IdentityError> {
    let until_expiry = (expires_on - now)
        .to_std()
        .map_err(|_| IdentityError::NegativeDuration(expires_on))?;

    if until_expiry < safety_margin {
        warn!(
            "credential expires at {expires_on}, inside the {safety_margin:?} safety margin, refreshing as soon as possible"
        );
        return Ok(until_expiry);
    }

    Ok(until_expiry - safety_margin)
}

/// Drives the background refresh of a single credential.
///
/// One scheduler owns one credential, one timer and one background task;
/// state transitions and the held credential never leave that task. See
/// [`RefreshScheduler::start`].
pub struct RefreshScheduler {
    fetcher: Arc<dyn Fetcher>,
    endpoint: EndpointSettings,
    attempts: FetchAttemptPolicy,
    policy: RefreshPolicy,
}

/// Handle to a running refresh task plus a snapshot channel for readers.
#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
    receiver: watch::Receiver<Credential>,
}

impl RefreshHandle {
    /// Point-in-time copy of the most recently committed credential.
    pub fn current(&self) -> Credential {
        self.receiver.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Credential> {
        self.receiver.clone()
    }

    /// Wait for the refresh task to finish (after cancellation or
    /// self-termination).
    pub async fn join(self) {
        let _ = self.handle.await;
    }
}

impl RefreshScheduler {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        endpoint: EndpointSettings,
        attempts: FetchAttemptPolicy,
        policy: RefreshPolicy,
    ) -> Self {
        Self {
            fetcher,
            endpoint,
            attempts,
            policy,
        }
    }

    /// Start the background refresh loop for `credential`.
    ///
    /// Fails synchronously if the supplied credential cannot yield a first
    /// refresh duration (its expiry is not in the future); otherwise returns
    /// immediately. Cancelling `cancel` stops the loop without further
    /// callback invocations.
    pub fn start(
        self,
        credential: Credential,
        callback: RefreshCallback,
        cancel: CancellationToken,
    ) -> Result<RefreshHandle, IdentityError> {
        let first = refresh_duration(credential.expires_on, self.policy.safety_margin)?;
        let (tx, rx) = watch::channel(credential.clone());

        let handle = tokio::spawn(async move {
            self.run(credential, first, callback, tx, cancel).await;
        });

        Ok(RefreshHandle {
            handle,
            receiver: rx,
        })
    }

    async fn run(
        self,
        mut held: Credential,
        first: Duration,
        mut callback: RefreshCallback,
        tx: watch::Sender<Credential>,
        cancel: CancellationToken,
    ) {
        let mut state = RefreshState::Idle;
        let mut wait = first;

        loop {
            state = transition(state, RefreshState::Armed);

            tokio::select! {
                () = cancel.cancelled() => {
                    transition(state, RefreshState::Stopped);
                    debug!("cancellation received, stopping refresh loop");
                    return;
                }
                () = sleep(wait) => {}
            }

            state = transition(state, RefreshState::Refreshing);

            match self.refresh_once(&held).await {
                Ok((fresh, next)) => match callback(Ok(&fresh)) {
                    Ok(()) => {
                        info!(
                            "credential refreshed, expires at {}, next refresh in {next:?}",
                            fresh.expires_on
                        );
                        held = fresh;
                        let _ = tx.send(held.clone());
                        wait = next;
                    }
                    Err(e) => {
                        // A rejected credential must not advance the held expiry.
                        let err = IdentityError::Callback(e.to_string());
                        warn!("{err}");
                        match self.after_failure(&held, &mut callback, false, &err) {
                            Some(retry) => wait = retry,
                            None => {
                                transition(state, RefreshState::Stopped);
                                return;
                            }
                        }
                    }
                },
                Err(err) => {
                    warn!("credential refresh failed: {err}");
                    match self.after_failure(&held, &mut callback, true, &err) {
                        Some(retry) => wait = retry,
                        None => {
                            transition(state, RefreshState::Stopped);
                            return;
                        }
                    }
                }
            }
        }
    }

    /// One refresh cycle: fetch, reject an unchanged token, compute the
    /// next refresh duration from the new expiry.
    async fn refresh_once(
        &self,
        held: &Credential,
    ) -> Result<(Credential, Duration), IdentityError> {
        let fresh = fetch_credential(&self.fetcher, &self.endpoint, &self.attempts).await?;

        if fresh.access_token == held.access_token {
            return Err(IdentityError::StaleToken);
        }

        let next = refresh_duration(fresh.expires_on, self.policy.safety_margin)?;
        Ok((fresh, next))
    }

    /// Failure path: notify the callback, then either rearm at the fixed
    /// retry interval or terminate when the held credential expires before
    /// another attempt could land. `notify` is false when the error came
    /// from the callback itself.
    fn after_failure(
        &self,
        held: &Credential,
        callback: &mut RefreshCallback,
        notify: bool,
        err: &IdentityError,
    ) -> Option<Duration> {
        if notify {
            if let Err(e) = callback(Err(err)) {
                debug!("failure callback returned error: {e}");
            }
        }

        // Terminal check uses the held credential's expiry, not the
        // attempted one.
        if until(held.expires_on) < self.policy.failure_retry_interval {
            let terminal = IdentityError::ExpiringTooSoonToRetry(held.expires_on);
            warn!("{terminal}");
            if let Err(e) = callback(Err(&terminal)) {
                debug!("terminal callback returned error: {e}");
            }
            return None;
        }

        Some(self.policy.failure_retry_interval)
    }
}
