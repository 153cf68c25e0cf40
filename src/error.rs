//! Error types for the azsession crate.
//!
//! Uses `thiserror` for library-style errors with automatic `Display` and `Error` implementations.

use thiserror::Error;

/// Default message carried by [`SessionError::RequiredLogin`].
pub const REQUIRED_LOGIN_MESSAGE: &str = "Login necessário";

/// Default message carried by [`SessionError::ExpiredToken`].
pub const EXPIRED_TOKEN_MESSAGE: &str = "Token Expirado";

/// Errors surfaced to callers of guarded operations and record construction.
///
/// These always propagate to the immediate caller; nothing in the crate
/// swallows or retries them.
#[derive(Error, Debug)]
pub enum SessionError {
    /// No valid session exists; the caller must (re)initiate login.
    #[error("{}", .0.as_deref().unwrap_or(REQUIRED_LOGIN_MESSAGE))]
    RequiredLogin(Option<String>),

    /// A session existed but the token has lapsed.
    #[error("{}", .0.as_deref().unwrap_or(EXPIRED_TOKEN_MESSAGE))]
    ExpiredToken(Option<String>),

    /// An expiry timestamp was present but unparsable. Fatal to that login
    /// attempt; a missing expiry is not the same thing as a broken one.
    #[error("Malformed token expiry: {0}")]
    MalformedToken(String),
}

impl SessionError {
    /// `RequiredLogin` with the default message.
    pub fn required_login() -> Self {
        Self::RequiredLogin(None)
    }

    /// `ExpiredToken` with the default message.
    pub fn expired_token() -> Self {
        Self::ExpiredToken(None)
    }
}

/// Failures at the provider boundary (interactive login and silent renewal).
///
/// These are logged by the scheduler, never thrown into guarded call sites;
/// they manifest there only as a later, correctly classified [`SessionError`].
#[derive(Error, Debug)]
pub enum AdapterError {
    #[error("OAuth2 authorization failed: {0}")]
    OAuthFailed(String),

    #[error("Invalid authorization code")]
    InvalidAuthCode,

    #[error("State validation failed (possible CSRF attack)")]
    StateValidationFailed,

    #[error("Token exchange failed: {0}")]
    TokenExchangeFailed(String),

    #[error("Token renewal failed: {0}")]
    RenewalFailed(String),

    #[error("Login handoff timed out")]
    CallbackTimeout,

    #[error("Login handoff already consumed")]
    HandoffConsumed,

    #[error("Profile request failed: {0}")]
    ProfileRequestFailed(String),

    #[error("Failed to parse provider response: {0}")]
    ParseFailed(String),
}
