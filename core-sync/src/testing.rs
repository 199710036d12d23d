//! Minimal collaborators for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::storage::{MemorySettingsStore, SettingsStore};
use bridge_traits::time::Clock;
use bytes::Bytes;
use core_auth::{AccessTokenProvider, AuthError};
use core_runtime::events::EventBus;
use provider_google_photos::{AlbumsPage, MediaItemsPage, PhotosLibrary, Result as PhotosResult};
use tokio::io::AsyncWrite;

use crate::cursor::PageTokenStore;
use crate::orchestrator::{PhotosSyncWorker, SyncConfig};
use crate::publisher::{ArtworkHandle, ArtworkPublisher, ArtworkRecord, PublishedArtwork};
use crate::selection::SelectedAlbumStore;
use crate::Result;

/// Library returning empty pages; counts every call.
#[derive(Default)]
pub struct CountingLibrary {
    calls: AtomicUsize,
}

impl CountingLibrary {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PhotosLibrary for CountingLibrary {
    async fn list_albums(&self, _: u32, _: Option<&str>) -> PhotosResult<AlbumsPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(AlbumsPage::default())
    }

    async fn search_media_items(
        &self,
        _: &str,
        _: u32,
        _: Option<&str>,
    ) -> PhotosResult<MediaItemsPage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(MediaItemsPage::default())
    }

    async fn fetch_media(&self, _: &str, _: &str) -> PhotosResult<Bytes> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Bytes::new())
    }
}

/// Token provider whose refresh token was revoked.
pub struct RevokedTokens;

#[async_trait]
impl AccessTokenProvider for RevokedTokens {
    async fn access_token(&self) -> core_auth::Result<String> {
        Err(AuthError::TokenEndpoint {
            status: 400,
            body: "invalid_grant".to_string(),
        })
    }
}

/// Publisher that declines everything.
pub struct NoPublisher;

#[async_trait]
impl ArtworkPublisher for NoPublisher {
    async fn add_artwork(&self, _: &ArtworkRecord) -> Result<Option<ArtworkHandle>> {
        Ok(None)
    }

    async fn open_output_stream(
        &self,
        _: &ArtworkHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        Ok(Box::new(tokio::io::sink()))
    }

    async fn find_by_token(&self, _: &str) -> Result<Option<PublishedArtwork>> {
        Ok(None)
    }

    async fn payload_exists(&self, _: &ArtworkHandle) -> Result<bool> {
        Ok(false)
    }

    async fn discard_payload(&self, _: &ArtworkHandle) -> Result<()> {
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        Ok(0)
    }

    async fn clear_all(&self) -> Result<u64> {
        Ok(0)
    }
}

pub fn worker_with(library: Arc<CountingLibrary>, clock: Arc<dyn Clock>) -> PhotosSyncWorker {
    let prefs: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
    let cursors = PageTokenStore::new(prefs.clone(), Arc::new(MemorySettingsStore::new()));
    let selection = SelectedAlbumStore::new(prefs, cursors.clone());
    PhotosSyncWorker::new(
        library,
        Arc::new(RevokedTokens),
        cursors,
        selection,
        Arc::new(NoPublisher),
        clock,
        EventBus::new(16),
        SyncConfig::default(),
    )
}
