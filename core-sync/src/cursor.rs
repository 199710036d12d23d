//! # Pagination Cursor Store
//!
//! Persists where each album's sync left off and when the last sync ran.
//!
//! Two settings namespaces are involved:
//! - the default preferences, holding `last_download_ts`
//! - [`PAGE_TOKENS_NAMESPACE`], holding one `photos_page_token_<albumId>`
//!   key per album
//!
//! Keeping cursors in their own namespace lets [`PageTokenStore::clear_all`]
//! wipe every album's cursor without touching unrelated preferences.

use std::sync::Arc;

use bridge_traits::storage::SettingsStore;
use tracing::debug;

use crate::Result;

/// Namespace that holds the per-album page tokens.
pub const PAGE_TOKENS_NAMESPACE: &str = "album_photos_page_tokens";

/// Global throttle timestamp key (unix millis).
pub const KEY_LAST_DOWNLOAD_TS: &str = "last_download_ts";

const PAGE_TOKEN_KEY_PREFIX: &str = "photos_page_token_";

/// Settings key of an album's page token.
pub fn page_token_key(album_id: &str) -> String {
    format!("{}{}", PAGE_TOKEN_KEY_PREFIX, album_id)
}

/// Per-album page tokens plus the global last-sync timestamp.
#[derive(Clone)]
pub struct PageTokenStore {
    prefs: Arc<dyn SettingsStore>,
    page_tokens: Arc<dyn SettingsStore>,
}

impl PageTokenStore {
    /// `prefs` is the default namespace, `page_tokens` the
    /// [`PAGE_TOKENS_NAMESPACE`] namespace.
    pub fn new(prefs: Arc<dyn SettingsStore>, page_tokens: Arc<dyn SettingsStore>) -> Self {
        Self { prefs, page_tokens }
    }

    /// Stored cursor for `album_id`; an empty stored token counts as none.
    pub async fn load_page_token(&self, album_id: &str) -> Result<Option<String>> {
        let token = self.page_tokens.get_string(&page_token_key(album_id)).await?;
        Ok(token.filter(|t| !t.is_empty()))
    }

    /// Store the cursor for `album_id`. `None` or an empty token removes it.
    pub async fn save_page_token(&self, album_id: &str, token: Option<&str>) -> Result<()> {
        let key = page_token_key(album_id);
        match token {
            Some(token) if !token.is_empty() => {
                self.page_tokens.set_string(&key, token).await?;
                debug!(album_id, "Saved page token");
            }
            _ => {
                self.page_tokens.delete(&key).await?;
                debug!(album_id, "Removed page token, album is at its last page");
            }
        }
        Ok(())
    }

    /// Unix millis of the last admitted sync, 0 when none.
    pub async fn last_download_time(&self) -> Result<i64> {
        Ok(self
            .prefs
            .get_i64(KEY_LAST_DOWNLOAD_TS)
            .await?
            .unwrap_or(0)
            .max(0))
    }

    /// Negative timestamps are stored as 0.
    pub async fn set_last_download_time(&self, timestamp_ms: i64) -> Result<()> {
        self.prefs
            .set_i64(KEY_LAST_DOWNLOAD_TS, timestamp_ms.max(0))
            .await?;
        Ok(())
    }

    /// Remove every album's cursor and reset the last-sync timestamp.
    pub async fn clear_all(&self) -> Result<()> {
        self.page_tokens.clear_all().await?;
        self.set_last_download_time(0).await?;
        debug!("Cleared all page tokens");
        Ok(())
    }

    /// Forget any leftover cursor of the newly selected album and reset the
    /// last-sync timestamp, so its next sync starts from the first page.
    pub async fn clear_for_album_switch(&self, album_id: &str) -> Result<()> {
        self.page_tokens.delete(&page_token_key(album_id)).await?;
        self.set_last_download_time(0).await?;
        debug!(album_id, "Reset cursor for album switch");
        Ok(())
    }
}
