//! OAuth2 client with PKCE support for Azure AD authentication.

use crate::config::OAuthConfig;
use crate::error::AdapterError;
use anyhow::{Context, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

/// HTTP request timeout.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);
/// HTTP connection timeout.
const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// PKCE code verifier and challenge pair.
#[derive(Debug)]
pub struct PkceChallenge {
    /// The code verifier (stored locally, sent in token exchange).
    pub verifier: String,
    /// The code challenge (SHA256 hash of verifier, sent in auth request).
    pub challenge: String,
}

impl PkceChallenge {
    /// Generate a new PKCE challenge pair.
    pub fn new() -> Self {
        // Generate 32 random bytes for the verifier
        let mut rng = rand::thread_rng();
        let verifier_bytes: Vec<u8> = (0..32).map(|_| rng.gen()).collect();
        let verifier = URL_SAFE_NO_PAD.encode(&verifier_bytes);

        // Create challenge = BASE64URL(SHA256(verifier))
        let mut hasher = Sha256::new();
        hasher.update(verifier.as_bytes());
        let hash = hasher.finalize();
        let challenge = URL_SAFE_NO_PAD.encode(hash);

        Self {
            verifier,
            challenge,
        }
    }
}

impl Default for PkceChallenge {
    fn default() -> Self {
        Self::new()
    }
}

/// OAuth2 client for the configured authority.
pub struct OAuth2Client {
    client_id: String,
    redirect_uri: String,
    scopes: Vec<String>,
    authorize_endpoint: Url,
    token_endpoint: Url,
    http_client: reqwest::Client,
}

impl OAuth2Client {
    /// Create a new OAuth2 client from configuration.
    ///
    /// The authority is validated here so URL building is infallible later.
    pub fn new(oauth: &OAuthConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(HTTP_CONNECT_TIMEOUT)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .context("Failed to create HTTP client")?;

        let authorize_endpoint = Url::parse(&oauth.authorize_url())
            .with_context(|| format!("Invalid authority '{}'", oauth.authority))?;
        let token_endpoint = Url::parse(&oauth.token_url())
            .with_context(|| format!("Invalid authority '{}'", oauth.authority))?;

        Ok(Self {
            client_id: oauth.client_id.clone(),
            redirect_uri: oauth.redirect_uri.clone(),
            scopes: oauth.scopes.clone(),
            authorize_endpoint,
            token_endpoint,
            http_client,
        })
    }

    /// Generate the authorization URL for browser-based sign-in.
    ///
    /// Returns the URL and a CSRF state token that must be verified in the callback.
    pub fn generate_auth_url(&self, pkce: &PkceChallenge) -> (Url, String) {
        // Generate random state for CSRF protection
        let mut rng = rand::thread_rng();
        let state_bytes: Vec<u8> = (0..16).map(|_| rng.gen()).collect();
        let state = URL_SAFE_NO_PAD.encode(&state_bytes);

        let mut url = self.authorize_endpoint.clone();

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("response_mode", "query")
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("state", &state)
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", "S256");

        (url, state)
    }

    /// Exchange an authorization code for tokens.
    pub async fn exchange_code(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<TokenResponse, AdapterError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.redirect_uri.as_str()),
            ("code_verifier", pkce_verifier),
            ("scope", &self.scopes.join(" ")),
        ];

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AdapterError::TokenExchangeFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token exchange failed: HTTP {} - {}", status, error_body);
            return Err(AdapterError::TokenExchangeFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::TokenExchangeFailed(e.to_string()))?;

        Ok(token_response)
    }

    /// Refresh an access token using a refresh token.
    pub async fn refresh_token(&self, refresh_token: &str) -> Result<TokenResponse, AdapterError> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("scope", &self.scopes.join(" ")),
        ];

        let response = self
            .http_client
            .post(self.token_endpoint.clone())
            .form(&params)
            .send()
            .await
            .map_err(|e| AdapterError::RenewalFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            // Log error details for debugging (doesn't expose to user)
            let error_body = response.text().await.unwrap_or_default();
            tracing::error!("Token refresh failed: HTTP {} - {}", status, error_body);
            return Err(AdapterError::RenewalFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| AdapterError::RenewalFailed(e.to_string()))?;

        Ok(token_response)
    }
}

/// Token response from the provider token endpoint.
#[derive(Debug, serde::Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: u64,
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: String,
}

/// Parse OAuth callback URL to extract code and state.
pub fn parse_callback_url(url_string: &str) -> Result<(String, String), AdapterError> {
    let url = Url::parse(url_string).map_err(|_| AdapterError::InvalidAuthCode)?;

    let params: HashMap<_, _> = url.query_pairs().collect();

    // Check for error response
    if let Some(error) = params.get("error") {
        let description = params
            .get("error_description")
            .map(|s| s.to_string())
            .unwrap_or_else(|| error.to_string());
        return Err(AdapterError::OAuthFailed(description));
    }

    let code = params
        .get("code")
        .ok_or(AdapterError::InvalidAuthCode)?
        .to_string();

    let state = params
        .get("state")
        .ok_or(AdapterError::StateValidationFailed)?
        .to_string();

    Ok((code, state))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_oauth_config() -> OAuthConfig {
        OAuthConfig {
            client_id: "test-client".into(),
            authority: "https://login.microsoftonline.com/test-tenant".into(),
            redirect_uri: "http://localhost:3000".into(),
            scopes: vec!["User.Read".into(), "offline_access".into()],
        }
    }

    #[test]
    fn test_pkce_generation() {
        let pkce = PkceChallenge::new();

        // Verifier should be base64url encoded (43 chars for 32 bytes)
        assert!(!pkce.verifier.is_empty());
        assert!(!pkce.challenge.is_empty());

        // Challenge should be different from verifier
        assert_ne!(pkce.verifier, pkce.challenge);
    }

    #[test]
    fn test_auth_url_contains_pkce_and_state() {
        let client = OAuth2Client::new(&test_oauth_config()).unwrap();
        let pkce = PkceChallenge::new();

        let (url, state) = client.generate_auth_url(&pkce);

        assert!(url
            .as_str()
            .starts_with("https://login.microsoftonline.com/test-tenant/oauth2/v2.0/authorize"));
        let pairs: HashMap<_, _> = url.query_pairs().collect();
        assert_eq!(pairs.get("client_id").map(|s| s.as_ref()), Some("test-client"));
        assert_eq!(pairs.get("code_challenge_method").map(|s| s.as_ref()), Some("S256"));
        assert_eq!(pairs.get("state").map(|s| s.as_ref()), Some(state.as_str()));
    }

    #[test]
    fn test_rejects_unparsable_authority() {
        let mut config = test_oauth_config();
        config.authority = "not a url".into();
        assert!(OAuth2Client::new(&config).is_err());
    }

    #[test]
    fn test_parse_callback_success() {
        let url = "http://localhost:3000/callback?code=abc123&state=xyz789";
        let (code, state) = parse_callback_url(url).unwrap();
        assert_eq!(code, "abc123");
        assert_eq!(state, "xyz789");
    }

    #[test]
    fn test_parse_callback_error() {
        let url =
            "http://localhost:3000/callback?error=access_denied&error_description=User%20cancelled";
        let result = parse_callback_url(url);
        assert!(matches!(result, Err(AdapterError::OAuthFailed(_))));
    }

    #[test]
    fn test_parse_callback_missing_code() {
        let url = "http://localhost:3000/callback?state=xyz789";
        let result = parse_callback_url(url);
        assert!(matches!(result, Err(AdapterError::InvalidAuthCode)));
    }
}
