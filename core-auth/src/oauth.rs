//! OAuth 2.0 Token Exchange
//!
//! Wire client for the two grants the app uses against Google's token
//! endpoint (RFC 6749 §4.1.3 and §6).
//!
//! # Overview
//!
//! - `authorization_code`: trades the server auth code obtained by Google
//!   Sign-In for an access/refresh token pair.
//! - `refresh_token`: renews the access token. The response normally carries
//!   no refresh token.
//!
//! Neither call retries. Transport failures and non-2xx responses are
//! returned to the caller, which owns the retry policy.
//!
//! # Example
//!
//! ```no_run
//! use core_auth::oauth::TokenExchangeClient;
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! # use bridge_traits::http::HttpClient;
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let client = TokenExchangeClient::new(
//!     http_client,
//!     "https://www.googleapis.com/oauth2/v4/token",
//!     "client-id.apps.googleusercontent.com",
//!     "client-secret",
//! );
//!
//! let token = client.exchange_access_token("4/0AX4Xf...").await?;
//! // Persist with TokenStore::save before use
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::types::TokenInfo;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, RetryPolicy};
use core_runtime::config::PhotosConfig;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// OAuth 2.0 token endpoint client.
pub struct TokenExchangeClient {
    http_client: Arc<dyn HttpClient>,
    token_endpoint: String,
    client_id: String,
    client_secret: String,
    request_timeout: Option<Duration>,
}

impl TokenExchangeClient {
    /// Create a client for an explicit endpoint and credential pair.
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        token_endpoint: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        Self {
            http_client,
            token_endpoint: token_endpoint.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            request_timeout: None,
        }
    }

    /// Create a client from the validated core configuration.
    pub fn from_config(http_client: Arc<dyn HttpClient>, config: &PhotosConfig) -> Self {
        let mut client = Self::new(
            http_client,
            config.token_endpoint.clone(),
            config.client_id.clone(),
            config.client_secret.clone(),
        );
        client.request_timeout = Some(config.request_timeout);
        client
    }

    /// Exchange a server auth code for a fresh token pair.
    ///
    /// The returned token has not been saved; `expires_at` is still 0.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NetworkError`] when the request cannot be sent
    /// - [`AuthError::TokenEndpoint`] on a non-2xx response
    /// - [`AuthError::InvalidResponse`] when the body is not a token response
    #[instrument(skip(self, server_auth_code))]
    pub async fn exchange_access_token(&self, server_auth_code: &str) -> Result<TokenInfo> {
        let params = [
            ("code", server_auth_code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", ""),
            ("grant_type", "authorization_code"),
        ];

        debug!("Exchanging authorization code for tokens");
        let token = self.post_grant(&params).await?;

        info!(
            expires_in = token.expires_in,
            has_refresh_token = !token.refresh_token.is_empty(),
            "Exchanged authorization code for tokens"
        );
        Ok(token)
    }

    /// Renew the access token with a refresh token.
    ///
    /// The result usually has an empty `refresh_token`; merge it into the
    /// current token with [`TokenInfo::merge_refresh`].
    #[instrument(skip(self, refresh_token))]
    pub async fn refresh_access_token(&self, refresh_token: &str) -> Result<TokenInfo> {
        let params = [
            ("refresh_token", refresh_token),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        debug!("Refreshing access token");
        let token = self.post_grant(&params).await?;

        info!(expires_in = token.expires_in, "Refreshed access token");
        Ok(token)
    }

    async fn post_grant(&self, params: &[(&str, &str)]) -> Result<TokenInfo> {
        let mut request = HttpRequest::new(HttpMethod::Post, self.token_endpoint.clone())
            .form(params)
            .map_err(|e| AuthError::InvalidResponse(format!("Failed to encode grant: {}", e)))?;
        if let Some(timeout) = self.request_timeout {
            request = request.timeout(timeout);
        }

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        if !response.is_success() {
            let status = response.status;
            let body = response
                .text()
                .unwrap_or_else(|_| "Unable to read error response".to_string());

            warn!(status, error = %body, "Token endpoint rejected the grant");

            return Err(AuthError::TokenEndpoint { status, body });
        }

        let token_response: TokenResponse = response
            .json()
            .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;

        Ok(token_response.into())
    }
}

/// Token response from the OAuth provider.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: String,
    #[serde(default)]
    expires_in: i64,
    #[serde(default)]
    token_type: String,
}

impl From<TokenResponse> for TokenInfo {
    fn from(response: TokenResponse) -> Self {
        TokenInfo {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            token_type: response.token_type,
            expires_at: 0,
        }
    }
}
