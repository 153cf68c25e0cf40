//! Boundary with the login transport: the adapter trait, the single-shot
//! login handoff, and the Azure AD implementation.

use crate::auth::graph::GraphClient;
use crate::auth::oauth::{OAuth2Client, TokenResponse};
use crate::error::AdapterError;
use crate::session::record::LoginPayload;
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::time::timeout;
use tracing::info;

/// External collaborator performing the provider handshake.
///
/// The crate never talks to the identity provider directly; it receives
/// payloads through this boundary. `renew` is the silent-renewal path the
/// scheduler drives.
#[async_trait]
pub trait LoginFlowAdapter: Send + Sync {
    /// Attempt a silent renewal, returning a fresh provider payload.
    async fn renew(&self) -> Result<LoginPayload, AdapterError>;
}

/// Single-shot handoff from the asynchronous login transport.
///
/// The transport resolves it exactly once with the provider payload; the
/// consumer awaits it with a bounded timeout instead of polling.
pub struct LoginHandoff {
    tx: Mutex<Option<oneshot::Sender<LoginPayload>>>,
    rx: Mutex<Option<oneshot::Receiver<LoginPayload>>>,
}

impl LoginHandoff {
    pub fn new() -> Self {
        let (tx, rx) = oneshot::channel();
        Self {
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Deliver the payload. Returns false if the handoff was already
    /// resolved or the consumer is gone.
    pub fn resolve(&self, payload: LoginPayload) -> bool {
        let sender = self
            .tx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match sender {
            Some(tx) => tx.send(payload).is_ok(),
            None => false,
        }
    }

    /// Await the payload, failing with `CallbackTimeout` past `deadline`.
    /// Can only be awaited once.
    pub async fn wait(&self, deadline: Duration) -> Result<LoginPayload, AdapterError> {
        let receiver = self
            .rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .ok_or(AdapterError::HandoffConsumed)?;

        match timeout(deadline, receiver).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => Err(AdapterError::OAuthFailed(
                "login transport dropped without resolving".into(),
            )),
            Err(_) => Err(AdapterError::CallbackTimeout),
        }
    }
}

impl Default for LoginHandoff {
    fn default() -> Self {
        Self::new()
    }
}

/// Normalize a token response and claims into the provider payload shape,
/// with an RFC 3339 UTC expiry.
pub(crate) fn renewal_payload(
    response: &TokenResponse,
    user: Map<String, Value>,
) -> LoginPayload {
    let expires_at = Utc::now() + ChronoDuration::seconds(response.expires_in as i64);

    LoginPayload {
        authenticated: true,
        token: Some(response.access_token.clone()),
        user: Some(user),
        token_expire_date: Some(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true)),
    }
}

/// Azure AD adapter: OAuth2 code exchange and refresh-token renewal plus a
/// Graph profile fetch, normalized into [`LoginPayload`].
pub struct AzureLoginAdapter {
    oauth: OAuth2Client,
    graph: GraphClient,
    /// Current refresh token, rotated when the provider issues a new one.
    refresh_token: Mutex<Option<String>>,
}

impl AzureLoginAdapter {
    pub fn new(oauth: OAuth2Client, graph: GraphClient) -> Self {
        Self {
            oauth,
            graph,
            refresh_token: Mutex::new(None),
        }
    }

    /// Seed or replace the refresh token (e.g. from a restored session).
    pub fn set_refresh_token(&self, token: impl Into<String>) {
        *self
            .refresh_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    pub fn clear_refresh_token(&self) {
        *self
            .refresh_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn current_refresh_token(&self) -> Option<String> {
        self.refresh_token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn rotate_refresh_token(&self, response: &TokenResponse) {
        if let Some(next) = &response.refresh_token {
            self.set_refresh_token(next.clone());
        }
    }

    /// Complete an interactive login: exchange the authorization code, fetch
    /// the profile, and return the normalized payload.
    pub async fn complete_login(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<LoginPayload, AdapterError> {
        let response = self.oauth.exchange_code(code, pkce_verifier).await?;
        self.rotate_refresh_token(&response);

        let claims = self.graph.user_claims(&response.access_token).await?;
        info!("Sign-in completed for {:?}", claims.get("name"));

        Ok(renewal_payload(&response, claims))
    }
}

#[async_trait]
impl LoginFlowAdapter for AzureLoginAdapter {
    async fn renew(&self) -> Result<LoginPayload, AdapterError> {
        let refresh_token = self
            .current_refresh_token()
            .ok_or_else(|| AdapterError::RenewalFailed("no refresh token held".into()))?;

        let response = self.oauth.refresh_token(&refresh_token).await?;
        self.rotate_refresh_token(&response);

        let claims = self.graph.user_claims(&response.access_token).await?;

        Ok(renewal_payload(&response, claims))
    }
}
