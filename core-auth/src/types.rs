use serde::{Deserialize, Serialize};
use std::fmt;

/// Safety margin before `expires_at` at which a token already counts as expired.
pub const EXPIRY_MARGIN_MS: i64 = 10_000;

/// OAuth 2.0 token set.
///
/// `expires_at` is derived: it is computed from `expires_in` at the moment
/// the token is saved, so a value restored after a restart still refers to
/// the original save time.
///
/// # Security
///
/// Tokens must never be logged. The `Debug` implementation redacts both
/// token strings.
///
/// # Examples
///
/// ```
/// use core_auth::TokenInfo;
///
/// let mut token = TokenInfo::new("ya29.a0", "1//0g", 3600);
/// token.compute_expires_at(1_000);
///
/// assert_eq!(token.expires_at, 3_601_000);
/// assert!(token.is_valid());
/// assert!(!token.is_expired_at(1_000));
/// ```
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// Bearer token sent with API requests
    pub access_token: String,
    /// Long-lived token used to obtain new access tokens
    pub refresh_token: String,
    /// Lifetime of the access token in seconds, as reported by the endpoint
    pub expires_in: i64,
    /// Token type reported by the endpoint (normally `Bearer`)
    pub token_type: String,
    /// Absolute expiry in Unix epoch milliseconds
    pub expires_at: i64,
}

impl TokenInfo {
    /// Create a token pair that has not been saved yet (`expires_at == 0`).
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_in: i64,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in,
            token_type: String::new(),
            expires_at: 0,
        }
    }

    /// Set `expires_at = now + expires_in * 1000`.
    pub fn compute_expires_at(&mut self, now_millis: i64) {
        self.expires_at = now_millis.saturating_add(self.expires_in.saturating_mul(1000));
    }

    /// Both token strings are present.
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.refresh_token.is_empty()
    }

    /// Expired when either token is missing or less than
    /// [`EXPIRY_MARGIN_MS`] remains before `expires_at`.
    pub fn is_expired_at(&self, now_millis: i64) -> bool {
        self.access_token.is_empty()
            || self.refresh_token.is_empty()
            || self.expires_at.saturating_sub(now_millis) < EXPIRY_MARGIN_MS
    }

    /// Merge a refresh-grant response into this token.
    ///
    /// Refresh responses usually omit the refresh token, in which case the
    /// current one is kept.
    pub fn merge_refresh(&self, refreshed: TokenInfo) -> TokenInfo {
        let refresh_token = if refreshed.refresh_token.is_empty() {
            self.refresh_token.clone()
        } else {
            refreshed.refresh_token
        };

        TokenInfo {
            access_token: refreshed.access_token,
            refresh_token,
            expires_in: refreshed.expires_in,
            token_type: refreshed.token_type,
            expires_at: refreshed.expires_at,
        }
    }
}

// Custom Debug implementation to avoid logging tokens
impl fmt::Debug for TokenInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenInfo")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_in", &self.expires_in)
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
