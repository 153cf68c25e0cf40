//! Silent token renewal ahead of expiry.
//!
//! The scheduler watches one session key and drives the adapter's renewal
//! path before the gate would start rejecting calls. Renewal is advisory:
//! it never blocks the store or the gate, and a failed attempt applies no
//! partial state.

use crate::auth::adapter::LoginFlowAdapter;
use crate::config::SessionConfig;
use crate::session::record::TokenRecord;
use crate::session::store::SessionStore;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, timeout};
use tracing::{debug, info, warn};

/// Lifecycle of a session key as seen by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshState {
    Unauthenticated,
    Authenticated,
    /// A renewal attempt is in flight. Guarded calls keep using the old
    /// record until the swap.
    Renewing,
}

/// Commands for the background scheduler loop.
pub enum RefreshMessage {
    /// Request a renewal attempt now, regardless of the threshold.
    RenewNow,
    /// Signal the loop to stop.
    Stop,
}

/// Proactively renews the token for one session key before it lapses.
pub struct RefreshScheduler {
    store: Arc<SessionStore>,
    adapter: Arc<dyn LoginFlowAdapter>,
    key: String,
    skew_margin: ChronoDuration,
    renewal_timeout: Duration,
    state: Mutex<RefreshState>,
}

impl RefreshScheduler {
    pub fn new(
        store: Arc<SessionStore>,
        adapter: Arc<dyn LoginFlowAdapter>,
        key: impl Into<String>,
        session: &SessionConfig,
    ) -> Self {
        Self {
            store,
            adapter,
            key: key.into(),
            skew_margin: session.skew_margin(),
            renewal_timeout: session.renewal_timeout(),
            state: Mutex::new(RefreshState::Unauthenticated),
        }
    }

    pub fn state(&self) -> RefreshState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_state(&self, state: RefreshState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = state;
    }

    /// Mark the renewal in flight. Returns false when one already is, so a
    /// threshold crossing fires at most one attempt.
    fn begin_renewal(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == RefreshState::Renewing {
            return false;
        }
        *state = RefreshState::Renewing;
        true
    }

    /// One scheduling decision: renew when `now >= expires_at - skew_margin`,
    /// at most one attempt per call. A record without an expiry is never
    /// renewed.
    pub async fn tick(&self) {
        let now = Utc::now();

        let Some(record) = self.store.get(&self.key) else {
            self.set_state(RefreshState::Unauthenticated);
            return;
        };

        if !record.authenticated() {
            self.set_state(RefreshState::Unauthenticated);
            return;
        }

        let Some(expires_at) = record.expires_at() else {
            self.set_state(RefreshState::Authenticated);
            return;
        };

        if now < expires_at - self.skew_margin {
            self.set_state(RefreshState::Authenticated);
            return;
        }

        debug!(key = %self.key, %expires_at, "renewal threshold crossed");
        self.attempt_renewal(record).await;
    }

    /// Attempt a renewal immediately if a session exists, regardless of the
    /// threshold.
    pub async fn renew_now(&self) {
        let Some(record) = self.store.get(&self.key) else {
            self.set_state(RefreshState::Unauthenticated);
            return;
        };

        if !record.authenticated() {
            self.set_state(RefreshState::Unauthenticated);
            return;
        }

        self.attempt_renewal(record).await;
    }

    /// Run one bounded renewal attempt and apply its outcome atomically.
    ///
    /// `stale` is the record the attempt began from; the failure path only
    /// ever drops that exact record, so a login stored mid-flight survives.
    async fn attempt_renewal(&self, stale: Arc<TokenRecord>) {
        if !self.begin_renewal() {
            return;
        }

        info!(key = %self.key, "attempting silent token renewal");

        match timeout(self.renewal_timeout, self.adapter.renew()).await {
            Ok(Ok(payload)) => match TokenRecord::from_payload(payload) {
                Ok(fresh) if fresh.authenticated() => {
                    self.store.set(&self.key, fresh);
                    self.set_state(RefreshState::Authenticated);
                    info!(key = %self.key, "token renewed");
                    return;
                }
                Ok(_) => {
                    warn!(key = %self.key, "renewal returned an unauthenticated payload");
                }
                Err(e) => {
                    warn!(key = %self.key, error = %e, "renewal payload rejected");
                }
            },
            Ok(Err(e)) => {
                warn!(key = %self.key, error = %e, "silent renewal failed");
            }
            Err(_) => {
                warn!(
                    key = %self.key,
                    timeout_secs = self.renewal_timeout.as_secs(),
                    "silent renewal timed out"
                );
            }
        }

        // Failure path: no partial state was applied. Keep the old record
        // while it is still valid; once it has lapsed, force a full re-login.
        // Only the record this attempt started from is ever dropped: if the
        // key was replaced mid-flight, the replacement stands.
        match stale.expires_at() {
            Some(expires_at)
                if Utc::now() >= expires_at && self.store.clear_if_current(&self.key, &stale) =>
            {
                self.set_state(RefreshState::Unauthenticated);
            }
            _ => self.set_state(RefreshState::Authenticated),
        }
    }

    /// Drive ticks from an interval until a [`RefreshMessage::Stop`].
    ///
    /// Returns the command channel for the spawned loop.
    pub fn spawn(self: Arc<Self>, poll_interval: Duration) -> mpsc::Sender<RefreshMessage> {
        let (tx, mut rx) = mpsc::channel::<RefreshMessage>(10);

        tokio::spawn(async move {
            info!(
                key = %self.key,
                interval_secs = poll_interval.as_secs(),
                "renewal scheduler started"
            );

            // The interval fires immediately, so a token already inside the
            // skew window when the loop starts is renewed right away.
            let mut interval = time::interval(poll_interval);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        self.tick().await;
                    }
                    Some(msg) = rx.recv() => {
                        match msg {
                            RefreshMessage::RenewNow => {
                                info!(key = %self.key, "manual renewal requested");
                                self.renew_now().await;
                            }
                            RefreshMessage::Stop => {
                                info!(key = %self.key, "renewal scheduler stopped");
                                break;
                            }
                        }
                    }
                }
            }
        });

        tx
    }
}
