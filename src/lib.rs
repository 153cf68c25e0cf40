//! azsession - client-side Azure AD (OIDC) session core.
//!
//! Normalizes provider login payloads into immutable [`TokenRecord`]s held in
//! a process-local [`SessionStore`], guards protected operations through
//! [`AuthGate`], and renews tokens silently ahead of expiry with
//! [`RefreshScheduler`]. The UI transport that runs the interactive provider
//! handshake stays outside this crate, behind [`LoginFlowAdapter`].
//!
//! ```no_run
//! use azsession::{AuthGate, LoginPayload, SessionStore, TokenRecord, DEFAULT_SESSION_KEY};
//! use std::sync::Arc;
//!
//! # fn main() -> Result<(), azsession::SessionError> {
//! let store = Arc::new(SessionStore::new());
//!
//! // The login transport delivered a payload; normalize and store it.
//! let payload = LoginPayload {
//!     authenticated: true,
//!     token: Some("eyJ...".into()),
//!     user: None,
//!     token_expire_date: Some("2030-06-15T10:30:00Z".into()),
//! };
//! store.set(DEFAULT_SESSION_KEY, TokenRecord::from_payload(payload)?);
//!
//! // Guarded calls run only against a valid, unexpired session.
//! let gate = AuthGate::new(Arc::clone(&store), DEFAULT_SESSION_KEY);
//! let header = gate.guard(|record| format!("Bearer {}", record.access_token().unwrap()))?;
//! # Ok(())
//! # }
//! ```

#![deny(clippy::all)]

pub mod auth;
pub mod config;
pub mod error;
pub mod gate;
pub mod session;

pub use auth::adapter::{AzureLoginAdapter, LoginFlowAdapter, LoginHandoff};
pub use auth::graph::GraphClient;
pub use auth::oauth::{OAuth2Client, PkceChallenge};
pub use auth::refresh::{RefreshMessage, RefreshScheduler, RefreshState};
pub use config::{Config, CustomLabels, OAuthConfig, SessionConfig};
pub use error::{AdapterError, SessionError};
pub use gate::AuthGate;
pub use session::record::{LoginPayload, TokenRecord};
pub use session::store::{SessionStore, DEFAULT_SESSION_KEY};
