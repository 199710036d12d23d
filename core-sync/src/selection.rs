//! Selected album persistence.
//!
//! The selection summary is stored apart from the album list so the host
//! can show the current album without fetching albums again.

use std::sync::Arc;

use bridge_traits::storage::SettingsStore;
use provider_google_photos::Album;
use tracing::{debug, info};

use crate::cursor::PageTokenStore;
use crate::Result;

pub const KEY_SELECTED_ALBUM_ID: &str = "selected_album_id";
pub const KEY_SELECTED_ALBUM_TITLE: &str = "selected_album_title";
pub const KEY_SELECTED_ALBUM_COVER: &str = "selected_album_coverPhotoBaseUrl";
pub const KEY_SELECTED_ALBUM_COUNT: &str = "selected_album_mediaItemsCount";

#[derive(Clone)]
pub struct SelectedAlbumStore {
    prefs: Arc<dyn SettingsStore>,
    cursors: PageTokenStore,
}

impl SelectedAlbumStore {
    pub fn new(prefs: Arc<dyn SettingsStore>, cursors: PageTokenStore) -> Self {
        Self { prefs, cursors }
    }

    pub async fn selected_album_id(&self) -> Result<Option<String>> {
        let id = self.prefs.get_string(KEY_SELECTED_ALBUM_ID).await?;
        Ok(id.filter(|id| !id.is_empty()))
    }

    /// The persisted selection, `None` when no album id is stored.
    pub async fn load_selected_album(&self) -> Result<Option<Album>> {
        let Some(id) = self.selected_album_id().await? else {
            return Ok(None);
        };

        let mut album = Album::new(id);
        album.title = self
            .prefs
            .get_string(KEY_SELECTED_ALBUM_TITLE)
            .await?
            .unwrap_or_default();
        album.cover_photo_base_url = self
            .prefs
            .get_string(KEY_SELECTED_ALBUM_COVER)
            .await?
            .unwrap_or_default();
        album.media_items_count = self
            .prefs
            .get_i64(KEY_SELECTED_ALBUM_COUNT)
            .await?
            .unwrap_or(-1);
        album.is_selected = true;
        Ok(Some(album))
    }

    /// Persist `album` as the selection and reset its cursor.
    ///
    /// Re-selecting the current album also resets it, so the next sync
    /// starts again from the first page.
    pub async fn save_selected_album(&self, album: &Album) -> Result<()> {
        let mut tx = self.prefs.begin_transaction().await?;
        tx.set_string(KEY_SELECTED_ALBUM_ID, &album.id).await?;
        tx.set_string(KEY_SELECTED_ALBUM_TITLE, &album.title).await?;
        tx.set_string(KEY_SELECTED_ALBUM_COVER, &album.cover_photo_base_url)
            .await?;
        tx.set_i64(KEY_SELECTED_ALBUM_COUNT, album.media_items_count)
            .await?;
        tx.commit().await?;

        self.cursors.clear_for_album_switch(&album.id).await?;

        info!(album_id = %album.id, title = %album.title, "Selected album");
        Ok(())
    }

    /// Refresh the stored title, cover and count of the selected album.
    ///
    /// Unlike [`save_selected_album`](Self::save_selected_album) this keeps
    /// the cursor. Returns `false` when `album` is not the selected album
    /// or nothing changed.
    pub async fn update_summary(&self, album: &Album) -> Result<bool> {
        let Some(current) = self.load_selected_album().await? else {
            return Ok(false);
        };
        if current.id != album.id || !current.is_summary_updated(album) {
            return Ok(false);
        }

        let mut tx = self.prefs.begin_transaction().await?;
        tx.set_string(KEY_SELECTED_ALBUM_TITLE, &album.title).await?;
        tx.set_string(KEY_SELECTED_ALBUM_COVER, &album.cover_photo_base_url)
            .await?;
        tx.set_i64(KEY_SELECTED_ALBUM_COUNT, album.media_items_count)
            .await?;
        tx.commit().await?;

        debug!(album_id = %album.id, "Updated selected album summary");
        Ok(true)
    }

    /// Drop the selection and every album's cursor.
    pub async fn clear_album_and_page_tokens(&self) -> Result<()> {
        let mut tx = self.prefs.begin_transaction().await?;
        for key in [
            KEY_SELECTED_ALBUM_ID,
            KEY_SELECTED_ALBUM_TITLE,
            KEY_SELECTED_ALBUM_COVER,
            KEY_SELECTED_ALBUM_COUNT,
        ] {
            tx.delete(key).await?;
        }
        tx.commit().await?;

        self.cursors.clear_all().await?;

        info!("Cleared album selection and page tokens");
        Ok(())
    }
}
