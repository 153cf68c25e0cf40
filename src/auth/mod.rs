//! Azure AD authentication: OAuth2 with PKCE, the login-transport boundary,
//! and silent token renewal.

pub mod adapter;
pub mod graph;
pub mod oauth;
pub mod refresh;
