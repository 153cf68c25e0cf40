//! Microsoft Graph client for fetching the signed-in user's profile claims.

use crate::error::AdapterError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Base URL for Microsoft Graph API.
const GRAPH_BASE_URL: &str = "https://graph.microsoft.com/v1.0";

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Microsoft Graph API client.
pub struct GraphClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl GraphClient {
    /// Create a new Graph client.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            base_url: GRAPH_BASE_URL.to_string(),
            http_client,
        })
    }

    /// Fetch the current user's profile from `/me`.
    pub async fn get_user_profile(&self, access_token: &str) -> Result<UserProfile, AdapterError> {
        let url = format!("{}/me", self.base_url);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AdapterError::ProfileRequestFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            // Don't expose raw API error details - just log status code
            tracing::warn!("Profile request failed: HTTP {}", status);
            return Err(AdapterError::ProfileRequestFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AdapterError::ParseFailed(e.to_string()))
    }

    /// Fetch the user's profile as the claims mapping carried on the login payload.
    pub async fn user_claims(
        &self,
        access_token: &str,
    ) -> Result<Map<String, Value>, AdapterError> {
        let profile = self.get_user_profile(access_token).await?;
        Ok(profile.into_claims())
    }
}

/// User profile from the Microsoft Graph `/me` endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier for the user.
    pub id: String,

    /// User's display name.
    pub display_name: Option<String>,

    /// User's email address.
    pub mail: Option<String>,

    /// User Principal Name (typically email-like format).
    pub user_principal_name: Option<String>,
}

impl UserProfile {
    /// Get the best available display name.
    pub fn display_name_or_upn(&self) -> String {
        self.display_name
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "Unknown User".to_string())
    }

    /// Get the best available email.
    pub fn email(&self) -> String {
        self.mail
            .clone()
            .or_else(|| self.user_principal_name.clone())
            .unwrap_or_else(|| "No email".to_string())
    }

    /// Flatten into the provider-claims mapping (name, email, id).
    pub fn into_claims(self) -> Map<String, Value> {
        let mut claims = Map::new();
        claims.insert("id".into(), Value::String(self.id.clone()));
        claims.insert("name".into(), Value::String(self.display_name_or_upn()));
        claims.insert("email".into(), Value::String(self.email()));
        if let Some(upn) = self.user_principal_name {
            claims.insert("userPrincipalName".into(), Value::String(upn));
        }
        claims
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_profile_display_name() {
        let profile = UserProfile {
            id: "123".into(),
            display_name: Some("John Doe".into()),
            mail: Some("john@example.com".into()),
            user_principal_name: Some("john@example.com".into()),
        };

        assert_eq!(profile.display_name_or_upn(), "John Doe");
        assert_eq!(profile.email(), "john@example.com");
    }

    #[test]
    fn test_user_profile_fallback() {
        let profile = UserProfile {
            id: "123".into(),
            display_name: None,
            mail: None,
            user_principal_name: Some("user@tenant.com".into()),
        };

        assert_eq!(profile.display_name_or_upn(), "user@tenant.com");
        assert_eq!(profile.email(), "user@tenant.com");
    }

    #[test]
    fn test_into_claims() {
        let profile = UserProfile {
            id: "123".into(),
            display_name: Some("John Doe".into()),
            mail: Some("john@example.com".into()),
            user_principal_name: Some("john@tenant.com".into()),
        };

        let claims = profile.into_claims();
        assert_eq!(claims.get("id"), Some(&Value::String("123".into())));
        assert_eq!(claims.get("name"), Some(&Value::String("John Doe".into())));
        assert_eq!(
            claims.get("email"),
            Some(&Value::String("john@example.com".into()))
        );
        assert_eq!(
            claims.get("userPrincipalName"),
            Some(&Value::String("john@tenant.com".into()))
        );
    }
}
