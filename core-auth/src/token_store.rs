//! Token Storage
//!
//! Persists the OAuth token pair in the host settings store and keeps the
//! process-wide copy that every API call reads.
//!
//! ## Persisted keys
//!
//! | Key | Type |
//! |-----|------|
//! | `auth_access_token` | string |
//! | `auth_refresh_token` | string |
//! | `auth_token_expires_in` | i64 (seconds) |
//! | `auth_token_expires_at` | i64 (epoch millis) |
//! | `auth_code` | string |
//!
//! ## Example
//!
//! ```no_run
//! use core_auth::{TokenInfo, TokenStore};
//! use bridge_traits::{MemorySettingsStore, SystemClock};
//! use std::sync::Arc;
//!
//! # async fn example() -> core_auth::Result<()> {
//! let store = TokenStore::new(Arc::new(MemorySettingsStore::new()), Arc::new(SystemClock));
//!
//! let saved = store.save(TokenInfo::new("access", "refresh", 3600)).await?;
//! assert!(saved.expires_at > 0);
//!
//! let loaded = store.load().await;
//! assert_eq!(loaded.access_token, "access");
//! # Ok(())
//! # }
//! ```

use crate::error::Result;
use crate::types::TokenInfo;
use bridge_traits::storage::SettingsStore;
use bridge_traits::time::Clock;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

pub const KEY_ACCESS_TOKEN: &str = "auth_access_token";
pub const KEY_REFRESH_TOKEN: &str = "auth_refresh_token";
pub const KEY_EXPIRES_IN: &str = "auth_token_expires_in";
pub const KEY_EXPIRES_AT: &str = "auth_token_expires_at";
pub const KEY_AUTH_CODE: &str = "auth_code";

/// Durable token storage with an in-memory cache.
///
/// Clones share the same cache, so a single `TokenStore` can be handed to the
/// token manager and to anything else that needs to read the current token.
#[derive(Clone)]
pub struct TokenStore {
    settings: Arc<dyn SettingsStore>,
    clock: Arc<dyn Clock>,
    cache: Arc<RwLock<TokenInfo>>,
}

impl TokenStore {
    /// Create a token store with an empty cache.
    pub fn new(settings: Arc<dyn SettingsStore>, clock: Arc<dyn Clock>) -> Self {
        debug!("Initializing TokenStore");
        Self {
            settings,
            clock,
            cache: Arc::new(RwLock::new(TokenInfo::default())),
        }
    }

    /// Reload the cache from durable storage and return it.
    ///
    /// Never fails: a missing or unreadable field becomes an empty string or 0.
    pub async fn load(&self) -> TokenInfo {
        let token = TokenInfo {
            access_token: self.read_string(KEY_ACCESS_TOKEN).await,
            refresh_token: self.read_string(KEY_REFRESH_TOKEN).await,
            expires_in: self.read_i64(KEY_EXPIRES_IN).await,
            token_type: String::new(),
            expires_at: self.read_i64(KEY_EXPIRES_AT).await,
        };

        debug!(
            has_access_token = !token.access_token.is_empty(),
            has_refresh_token = !token.refresh_token.is_empty(),
            expires_at = token.expires_at,
            "Token loaded from settings"
        );

        let mut cache = self.cache.write().await;
        *cache = token.clone();
        token
    }

    /// Compute the expiry, persist every field and swap the cache.
    ///
    /// The fields are written in one settings transaction and the cache is
    /// replaced while its write lock is held, so readers observe either the
    /// previous token or the new one.
    pub async fn save(&self, mut token: TokenInfo) -> Result<TokenInfo> {
        token.compute_expires_at(self.clock.unix_timestamp_millis());

        let mut cache = self.cache.write().await;

        let mut tx = self.settings.begin_transaction().await?;
        tx.set_string(KEY_ACCESS_TOKEN, &token.access_token).await?;
        tx.set_string(KEY_REFRESH_TOKEN, &token.refresh_token).await?;
        tx.set_i64(KEY_EXPIRES_IN, token.expires_in).await?;
        tx.set_i64(KEY_EXPIRES_AT, token.expires_at).await?;
        tx.commit().await?;

        *cache = token.clone();

        info!(
            has_refresh_token = !token.refresh_token.is_empty(),
            expires_at = token.expires_at,
            "Token saved"
        );

        Ok(token)
    }

    /// The cached token, without touching durable storage.
    pub async fn current(&self) -> TokenInfo {
        self.cache.read().await.clone()
    }

    /// Expiry check against the store's clock.
    pub fn is_expired(&self, token: &TokenInfo) -> bool {
        token.is_expired_at(self.clock.unix_timestamp_millis())
    }

    /// Validity check; see [`TokenInfo::is_valid`].
    pub fn is_valid(&self, token: &TokenInfo) -> bool {
        token.is_valid()
    }

    /// Record the last server auth code used for sign-in.
    pub async fn save_auth_code(&self, auth_code: &str) -> Result<()> {
        self.settings.set_string(KEY_AUTH_CODE, auth_code).await?;
        Ok(())
    }

    /// The last recorded server auth code, empty when none was stored.
    pub async fn auth_code(&self) -> String {
        self.read_string(KEY_AUTH_CODE).await
    }

    async fn read_string(&self, key: &str) -> String {
        match self.settings.get_string(key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read token field, using empty value");
                String::new()
            }
        }
    }

    async fn read_i64(&self, key: &str) -> i64 {
        match self.settings.get_i64(key).await {
            Ok(value) => value.unwrap_or_default(),
            Err(e) => {
                warn!(key, error = %e, "Failed to read token field, using 0");
                0
            }
        }
    }
}
