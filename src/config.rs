//! Configuration loading and management.
//!
//! Parses a TOML document into the crate configuration, applies environment
//! variable overrides, and validates required OAuth values. Everything under
//! `[oauth]` and `[labels]` is opaque pass-through for the identity provider
//! and the embedding UI; only presence is checked.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

use crate::session::store::DEFAULT_SESSION_KEY;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub oauth: OAuthConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub labels: CustomLabels,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OAuthConfig {
    /// Azure AD application (client) id.
    pub client_id: String,
    /// Authority URL, e.g. `https://login.microsoftonline.com/<tenant>`.
    pub authority: String,
    /// A redirect URI registered on the application.
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

/// Session and renewal tuning.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Session-state key holding the current record.
    pub key: String,
    /// Renew once `now >= expires_at - skew_margin`. Absorbs clock drift and
    /// request latency.
    pub skew_margin_seconds: u64,
    /// Upper bound on a single silent-renewal attempt.
    pub renewal_timeout_seconds: u64,
    /// Cadence of the background scheduler loop.
    pub poll_interval_seconds: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            key: DEFAULT_SESSION_KEY.to_string(),
            skew_margin_seconds: 120,
            renewal_timeout_seconds: 30,
            poll_interval_seconds: 60,
        }
    }
}

impl SessionConfig {
    pub fn skew_margin(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.skew_margin_seconds as i64)
    }

    pub fn renewal_timeout(&self) -> Duration {
        Duration::from_secs(self.renewal_timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_seconds)
    }
}

/// Label overrides shown by the embedding UI. Pass-through, never validated.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CustomLabels {
    pub label_button_in: Option<String>,
    pub label_button_out: Option<String>,
    pub label_login: Option<String>,
    pub label_logout: Option<String>,
    pub label_loading: Option<String>,
    pub error_fatal: Option<String>,
}

fn default_scopes() -> Vec<String> {
    vec!["User.Read".to_string(), "offline_access".to_string()]
}

impl Config {
    /// Parse configuration from a TOML document with environment variable overrides.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(raw).context("Failed to parse configuration TOML")?;

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(client_id) = env::var("AZURE_CLIENT_ID") {
            self.oauth.client_id = client_id;
        }

        if let Ok(authority) = env::var("AZURE_AUTHORITY") {
            self.oauth.authority = authority;
        }

        if let Ok(redirect_uri) = env::var("AZURE_REDIRECT_URI") {
            self.oauth.redirect_uri = redirect_uri;
        }
    }

    /// Validate that required configuration is present.
    fn validate(&self) -> Result<()> {
        if self.oauth.client_id.is_empty() || self.oauth.client_id == "YOUR_AZURE_AD_CLIENT_ID" {
            anyhow::bail!(
                "Azure AD client_id not configured. Set AZURE_CLIENT_ID environment variable \
                 or fill in the [oauth] section"
            );
        }

        if self.oauth.authority.is_empty() {
            anyhow::bail!(
                "Azure AD authority not configured. Set AZURE_AUTHORITY environment variable \
                 or fill in the [oauth] section"
            );
        }

        if self.oauth.redirect_uri.is_empty() {
            anyhow::bail!("redirect_uri not configured");
        }

        Ok(())
    }
}

impl OAuthConfig {
    /// Get the authorization endpoint for the configured authority.
    pub fn authorize_url(&self) -> String {
        format!(
            "{}/oauth2/v2.0/authorize",
            self.authority.trim_end_matches('/')
        )
    }

    /// Get the token endpoint for the configured authority.
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/v2.0/token", self.authority.trim_end_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [oauth]
            client_id = "test-client"
            authority = "https://login.microsoftonline.com/test-tenant"
            redirect_uri = "http://localhost:3000"
        "#
    }

    #[test]
    fn test_minimal_config_gets_defaults() {
        let config = Config::from_toml_str(minimal_toml()).unwrap();

        assert_eq!(config.session.key, "account");
        assert_eq!(config.session.skew_margin_seconds, 120);
        assert_eq!(config.session.renewal_timeout_seconds, 30);
        assert_eq!(config.oauth.scopes, vec!["User.Read", "offline_access"]);
        assert!(config.labels.label_button_in.is_none());
    }

    #[test]
    fn test_validation_rejects_placeholder_client_id() {
        let raw = r#"
            [oauth]
            client_id = "YOUR_AZURE_AD_CLIENT_ID"
            authority = "https://login.microsoftonline.com/test-tenant"
            redirect_uri = "http://localhost:3000"
        "#;

        // Bypass env overrides so the placeholder is what gets validated.
        let config: Config = toml::from_str(raw).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_endpoint_urls() {
        let oauth = OAuthConfig {
            client_id: "test-client".into(),
            authority: "https://login.microsoftonline.com/test-tenant".into(),
            redirect_uri: "http://localhost:3000".into(),
            scopes: default_scopes(),
        };

        assert_eq!(
            oauth.authorize_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/authorize"
        );
        assert_eq!(
            oauth.token_url(),
            "https://login.microsoftonline.com/test-tenant/oauth2/v2.0/token"
        );
    }

    #[test]
    fn test_labels_parse_camel_case() {
        let raw = r#"
            [oauth]
            client_id = "test-client"
            authority = "https://login.microsoftonline.com/test-tenant"
            redirect_uri = "http://localhost:3000"

            [labels]
            labelButtonIn = "Entrar"
            labelLogout = "Sair"
        "#;

        let config = Config::from_toml_str(raw).unwrap();
        assert_eq!(config.labels.label_button_in.as_deref(), Some("Entrar"));
        assert_eq!(config.labels.label_logout.as_deref(), Some("Sair"));
        assert!(config.labels.error_fatal.is_none());
    }

    #[test]
    fn test_session_durations() {
        let session = SessionConfig::default();
        assert_eq!(session.skew_margin(), chrono::Duration::seconds(120));
        assert_eq!(session.renewal_timeout(), Duration::from_secs(30));
        assert_eq!(session.poll_interval(), Duration::from_secs(60));
    }
}
