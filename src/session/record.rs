//! Login payload normalization and the immutable token record.

use crate::error::SessionError;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Raw payload delivered by the login transport.
///
/// Shape dictated by the provider/adapter; opaque to this crate beyond the
/// four fields. Unknown fields are ignored on deserialization.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginPayload {
    pub authenticated: bool,
    pub token: Option<String>,
    pub user: Option<Map<String, Value>>,
    /// ISO-8601 expiry, optionally with a trailing UTC `Z` marker.
    pub token_expire_date: Option<String>,
}

/// Normalized authentication outcome. Immutable once constructed; a renewal
/// produces a whole new record that replaces this one in the store.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenRecord {
    authenticated: bool,
    access_token: Option<String>,
    expires_at: Option<DateTime<Utc>>,
    user: Option<Map<String, Value>>,
}

impl TokenRecord {
    /// The record for a session with no established identity.
    pub fn unauthenticated() -> Self {
        Self {
            authenticated: false,
            access_token: None,
            expires_at: None,
            user: None,
        }
    }

    /// Normalize a provider payload into a record.
    ///
    /// An unauthenticated payload yields a record with every other field
    /// absent, whatever the payload supplied. An expiry string that is
    /// present but unparsable is a [`SessionError::MalformedToken`].
    pub fn from_payload(payload: LoginPayload) -> Result<Self, SessionError> {
        if !payload.authenticated {
            return Ok(Self::unauthenticated());
        }

        let expires_at = payload
            .token_expire_date
            .as_deref()
            .map(parse_expiry)
            .transpose()?;

        Ok(Self {
            authenticated: true,
            access_token: payload.token,
            expires_at,
            user: payload.user,
        })
    }

    pub fn authenticated(&self) -> bool {
        self.authenticated
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_at
    }

    /// Provider-returned claims (name, email, id).
    pub fn user(&self) -> Option<&Map<String, Value>> {
        self.user.as_ref()
    }

    /// Whether the record has lapsed as of `now`. A record without an expiry
    /// never lapses.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(expires_at) if now >= expires_at)
    }
}

/// Parse a provider expiry timestamp as a UTC instant.
///
/// Accepts RFC 3339 with an explicit offset (`Z`, `z`, `+00:00`, ...), or a
/// plain ISO-8601 timestamp (`T` or space separated) with at most a trailing
/// UTC marker, which is stripped and the remainder read as UTC.
fn parse_expiry(raw: &str) -> Result<DateTime<Utc>, SessionError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }

    let trimmed = raw
        .strip_suffix('Z')
        .or_else(|| raw.strip_suffix('z'))
        .unwrap_or(raw);

    trimmed
        .parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%d %H:%M:%S%.f"))
        .map(|naive| naive.and_utc())
        .map_err(|_| SessionError::MalformedToken(raw.to_string()))
}
