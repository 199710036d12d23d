//! # Artwork Publisher
//!
//! Sink for downloaded photos. A publisher keeps one record per media item
//! (keyed by its token) and a byte payload per record.
//!
//! Publishing is two steps: [`ArtworkPublisher::add_artwork`] registers the
//! record and returns a handle, then the bytes are streamed into
//! [`ArtworkPublisher::open_output_stream`]. A crash between the two steps
//! leaves a record without a usable payload, which is why
//! [`ArtworkPublisher::payload_exists`] is part of the dedup check.

use std::path::PathBuf;

use async_trait::async_trait;
use provider_google_photos::MediaItem;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWrite;

use crate::Result;

/// Display metadata of one published photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtworkRecord {
    /// Media item id; unique per publisher
    pub token: String,
    pub title: String,
    pub byline: Option<String>,
    /// Formatted creation time
    pub attribution: String,
    pub web_uri: String,
    /// Original-size fetch URL of the photo
    pub persistent_uri: String,
}

impl ArtworkRecord {
    /// Build the record for `item`, falling back to `default_title` when the
    /// item has no description.
    pub fn from_media_item(item: &MediaItem, default_title: &str) -> Self {
        let title = item
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(default_title)
            .to_string();

        let byline = item
            .contributor_info
            .as_ref()
            .map(|c| c.display_name.clone())
            .filter(|name| !name.is_empty());

        Self {
            token: item.id.clone(),
            title,
            byline,
            attribution: item.media_metadata.formatted_creation_time(),
            web_uri: item.product_url.clone(),
            persistent_uri: format!("{}=d", item.base_url),
        }
    }
}

/// Storage slot returned when a record is registered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtworkHandle {
    pub id: i64,
    pub payload_path: PathBuf,
}

/// A record as stored by a publisher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishedArtwork {
    pub handle: ArtworkHandle,
    pub record: ArtworkRecord,
    /// Unix millis of the last registration
    pub added_at: i64,
}

#[async_trait]
pub trait ArtworkPublisher: Send + Sync {
    /// Register `record`, replacing an existing record with the same token.
    ///
    /// Returns `None` when the sink declined the record.
    async fn add_artwork(&self, record: &ArtworkRecord) -> Result<Option<ArtworkHandle>>;

    /// Open the payload of `handle` for writing, truncating previous bytes.
    async fn open_output_stream(
        &self,
        handle: &ArtworkHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>>;

    async fn find_by_token(&self, token: &str) -> Result<Option<PublishedArtwork>>;

    /// Whether the payload of `handle` exists and is not empty.
    async fn payload_exists(&self, handle: &ArtworkHandle) -> Result<bool>;

    /// Delete the payload of `handle`, if any. The record is kept.
    async fn discard_payload(&self, handle: &ArtworkHandle) -> Result<()>;

    async fn count(&self) -> Result<u64>;

    /// Remove every record and payload. Returns the number of records removed.
    async fn clear_all(&self) -> Result<u64>;
}
