//! # Token Manager
//!
//! Owns the sign-in and check-and-refresh flows on top of [`TokenStore`] and
//! [`TokenExchangeClient`].
//!
//! ## Overview
//!
//! Every Photos Library call first asks the manager for a fresh access token.
//! The manager serializes those checks behind one async mutex, so concurrent
//! callers that find an expired token trigger exactly one refresh; the others
//! wait and then read the refreshed token.
//!
//! ## Usage
//!
//! ```no_run
//! use core_auth::{TokenExchangeClient, TokenManager, TokenStore};
//! use core_runtime::events::EventBus;
//! use bridge_traits::{MemorySettingsStore, SystemClock};
//! use std::sync::Arc;
//! # use bridge_traits::http::HttpClient;
//!
//! # #[tokio::main]
//! # async fn main() -> core_auth::Result<()> {
//! # let http_client: Arc<dyn HttpClient> = todo!();
//! let store = TokenStore::new(Arc::new(MemorySettingsStore::new()), Arc::new(SystemClock));
//! let exchange = TokenExchangeClient::new(
//!     http_client,
//!     "https://www.googleapis.com/oauth2/v4/token",
//!     "client-id",
//!     "client-secret",
//! );
//! let manager = TokenManager::new(store, exchange, EventBus::new(100));
//!
//! manager.sign_in("4/0AX4Xf...").await?;
//! let bearer = manager.ensure_fresh_token().await?.access_token;
//! # Ok(())
//! # }
//! ```

use crate::error::{AuthError, Result};
use crate::oauth::TokenExchangeClient;
use crate::token_store::TokenStore;
use crate::types::TokenInfo;
use async_trait::async_trait;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use tokio::sync::Mutex;
use tokio::time::{timeout, Duration};
use tracing::{debug, error, info, instrument};

/// Default timeout for a token endpoint round trip (2 minutes)
const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(120);

/// Source of a bearer token that is valid for at least the next request.
#[async_trait]
pub trait AccessTokenProvider: Send + Sync {
    /// Return an access token, refreshing it first when needed.
    async fn access_token(&self) -> Result<String>;
}

/// Sign-in and token freshness orchestrator.
pub struct TokenManager {
    store: TokenStore,
    exchange: TokenExchangeClient,
    event_bus: EventBus,
    /// Serializes sign-in and check-and-refresh
    refresh_lock: Mutex<()>,
    operation_timeout: Duration,
}

impl TokenManager {
    pub fn new(store: TokenStore, exchange: TokenExchangeClient, event_bus: EventBus) -> Self {
        Self {
            store,
            exchange,
            event_bus,
            refresh_lock: Mutex::new(()),
            operation_timeout: DEFAULT_AUTH_TIMEOUT,
        }
    }

    /// Override the bound on a single token endpoint round trip.
    pub fn with_timeout(mut self, operation_timeout: Duration) -> Self {
        self.operation_timeout = operation_timeout;
        self
    }

    /// The underlying token store.
    pub fn store(&self) -> &TokenStore {
        &self.store
    }

    /// Exchange a server auth code and persist the resulting token.
    ///
    /// The auth code is recorded before the exchange so a failed attempt can
    /// be diagnosed from settings.
    #[instrument(skip(self, server_auth_code))]
    pub async fn sign_in(&self, server_auth_code: &str) -> Result<TokenInfo> {
        let _guard = self.refresh_lock.lock().await;

        self.store.save_auth_code(server_auth_code).await?;

        let exchanged = match timeout(
            self.operation_timeout,
            self.exchange.exchange_access_token(server_auth_code),
        )
        .await
        {
            Ok(Ok(token)) => token,
            Ok(Err(e)) => {
                error!(error = %e, "Authorization code exchange failed");
                self.emit_auth_error(format!("Sign-in failed: {}", e), e.is_recoverable());
                return Err(e);
            }
            Err(_) => {
                error!("Authorization code exchange timed out");
                self.emit_auth_error("Sign-in timeout".to_string(), true);
                return Err(AuthError::OperationTimeout {
                    operation: "token exchange".to_string(),
                });
            }
        };

        let saved = self.store.save(exchanged).await?;

        let _ = self.event_bus.emit(CoreEvent::Auth(AuthEvent::SignedIn {
            expires_at: saved.expires_at,
        }));

        info!(expires_at = saved.expires_at, "Sign-in completed successfully");
        Ok(saved)
    }

    /// Return the current token, refreshing it first if it is about to expire.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] when no valid token pair is stored
    /// - any refresh failure, after emitting [`AuthEvent::AuthError`]
    #[instrument(skip(self))]
    pub async fn ensure_fresh_token(&self) -> Result<TokenInfo> {
        let _guard = self.refresh_lock.lock().await;

        let mut token = self.store.current().await;
        if !token.is_valid() {
            token = self.store.load().await;
        }

        if !token.is_valid() {
            debug!("No stored token pair");
            return Err(AuthError::NotAuthenticated);
        }

        if !self.store.is_expired(&token) {
            debug!("Token is valid, no refresh needed");
            return Ok(token);
        }

        info!(expires_at = token.expires_at, "Token expired or expiring soon, refreshing");
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshing));

        let refreshed = match timeout(
            self.operation_timeout,
            self.exchange.refresh_access_token(&token.refresh_token),
        )
        .await
        {
            Ok(Ok(refreshed)) => refreshed,
            Ok(Err(e)) => {
                error!(error = %e, "Token refresh failed");
                self.emit_auth_error(format!("Token refresh failed: {}", e), e.is_recoverable());
                return Err(e);
            }
            Err(_) => {
                error!("Token refresh timed out");
                self.emit_auth_error("Token refresh timeout".to_string(), true);
                return Err(AuthError::OperationTimeout {
                    operation: "token refresh".to_string(),
                });
            }
        };

        let saved = self.store.save(token.merge_refresh(refreshed)).await?;

        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::TokenRefreshed {
                expires_at: saved.expires_at,
            }));

        info!(expires_at = saved.expires_at, "Token refreshed successfully");
        Ok(saved)
    }

    /// Whether a usable token pair is stored.
    pub async fn is_authorized(&self) -> bool {
        let token = self.store.current().await;
        if token.is_valid() {
            return true;
        }
        self.store.load().await.is_valid()
    }

    fn emit_auth_error(&self, message: String, recoverable: bool) {
        let _ = self
            .event_bus
            .emit(CoreEvent::Auth(AuthEvent::AuthError {
                message,
                recoverable,
            }));
    }
}

#[async_trait]
impl AccessTokenProvider for TokenManager {
    async fn access_token(&self) -> Result<String> {
        Ok(self.ensure_fresh_token().await?.access_token)
    }
}
