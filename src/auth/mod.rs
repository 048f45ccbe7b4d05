//! Identity boundary for the dashboard API.
//!
//! Authentication itself is external: something upstream (Clerk, an OIDC
//! proxy, a gateway) has already exchanged credentials for an opaque bearer
//! token. This module only resolves that token to a stable user id. Every
//! mutating handler requires an [`AuthUser`]; a missing or unknown token is
//! rejected with 401 before any business logic runs.

use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::errors::ApiError;
use crate::server::app::AppState;

/// Resolves a bearer token to a verified user id.
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Returns the user id for `token`, or `None` if the token is unknown.
    async fn resolve(&self, token: &str) -> Option<String>;
}

/// Static token-to-user map, for local deployments and tests.
///
/// Tokens are loaded from `STARBRAINS_TOKENS` as comma-separated
/// `token=user_id` pairs, e.g. `STARBRAINS_TOKENS=abc123=user_1,def456=user_2`.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut tokens = HashMap::new();
        if let Ok(raw) = std::env::var("STARBRAINS_TOKENS") {
            for pair in raw.split(',') {
                if let Some((token, user_id)) = pair.split_once('=') {
                    let token = token.trim();
                    let user_id = user_id.trim();
                    if !token.is_empty() && !user_id.is_empty() {
                        tokens.insert(token.to_string(), user_id.to_string());
                    }
                }
            }
        }
        Self { tokens }
    }

    pub fn with_token(mut self, token: impl Into<String>, user_id: impl Into<String>) -> Self {
        self.tokens.insert(token.into(), user_id.into());
        self
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn resolve(&self, token: &str) -> Option<String> {
        self.tokens.get(token).cloned()
    }
}

/// The verified caller identity for a request.
#[derive(Debug, Clone)]
pub struct AuthUser(pub String);

impl AuthUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let token = header.strip_prefix("Bearer ").ok_or(ApiError::Unauthorized)?;

        match state.identity.resolve(token).await {
            Some(user_id) => Ok(AuthUser(user_id)),
            None => Err(ApiError::Unauthorized),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn static_provider_resolves_known_tokens() {
        let provider = StaticTokenProvider::new().with_token("abc123", "user_1");

        assert_eq!(provider.resolve("abc123").await.as_deref(), Some("user_1"));
        assert_eq!(provider.resolve("nope").await, None);
    }

    #[tokio::test]
    async fn env_parsing_skips_malformed_pairs() {
        std::env::set_var("STARBRAINS_TOKENS", "abc=user_1, def = user_2 ,broken,=x");
        let provider = StaticTokenProvider::from_env();
        std::env::remove_var("STARBRAINS_TOKENS");

        assert_eq!(provider.resolve("abc").await.as_deref(), Some("user_1"));
        assert_eq!(provider.resolve("def").await.as_deref(), Some("user_2"));
        assert_eq!(provider.resolve("broken").await, None);
    }
}
