//! Google Photos API response types
//!
//! Data structures for deserializing Photos Library API v1 responses.
//! Fields the API omits deserialize to their defaults, so an album without
//! a cover or a page without `nextPageToken` still parses.

use chrono::{DateTime, Local};
use serde::{Deserialize, Deserializer, Serialize};

fn unknown_count() -> i64 {
    -1
}

/// Int64 fields arrive as JSON strings; accept numbers too.
fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Count {
        Number(i64),
        Text(String),
    }

    Ok(match Option::<Count>::deserialize(deserializer)? {
        Some(Count::Number(n)) => n,
        Some(Count::Text(s)) => s.trim().parse().unwrap_or(-1),
        None => -1,
    })
}

/// Google Photos album resource
///
/// See: https://developers.google.com/photos/library/reference/rest/v1/albums
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,

    #[serde(default)]
    pub title: String,

    /// Link that opens the album in Google Photos
    #[serde(default)]
    pub product_url: String,

    #[serde(default)]
    pub cover_photo_base_url: String,

    #[serde(default)]
    pub cover_photo_media_item_id: String,

    /// Number of media items, -1 when unknown
    #[serde(default = "unknown_count", deserialize_with = "lenient_count")]
    pub media_items_count: i64,

    /// Local-only selection flag
    #[serde(skip)]
    pub is_selected: bool,
}

impl Album {
    /// An album with only an id; other fields take their defaults.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            product_url: String::new(),
            cover_photo_base_url: String::new(),
            cover_photo_media_item_id: String::new(),
            media_items_count: -1,
            is_selected: false,
        }
    }

    /// Mark the album selected iff its id equals `selected_id`.
    pub fn set_selected(mut self, selected_id: Option<&str>) -> Self {
        self.is_selected = selected_id == Some(self.id.as_str());
        self
    }

    /// Whether the summary shown for a selected album differs from `other`.
    pub fn is_summary_updated(&self, other: &Album) -> bool {
        self.title != other.title
            || self.cover_photo_base_url != other.cover_photo_base_url
            || self.media_items_count != other.media_items_count
    }
}

/// Google Photos API albums.list response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumsPage {
    #[serde(default)]
    pub albums: Vec<Album>,

    /// Token for the next page, empty on the last page
    #[serde(default)]
    pub next_page_token: String,
}

/// Outcome of one album browse request.
#[derive(Debug, Clone, PartialEq)]
pub enum AlbumsResult {
    /// A page of albums
    Pagination {
        albums: Vec<Album>,
        next_page_token: String,
        /// The page extends the list already shown instead of replacing it
        is_incremental: bool,
    },
    /// The request failed
    Failure { error: String },
}

/// Google Photos API mediaItems.search response
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItemsPage {
    #[serde(default)]
    pub media_items: Vec<MediaItem>,

    /// Its presence is the only reliable signal that more items exist
    #[serde(default)]
    pub next_page_token: String,
}

impl MediaItemsPage {
    pub fn has_more(&self) -> bool {
        !self.next_page_token.is_empty()
    }
}

/// Google Photos media item resource
///
/// See: https://developers.google.com/photos/library/reference/rest/v1/mediaItems
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaItem {
    pub id: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Link that opens the item in Google Photos
    #[serde(default)]
    pub product_url: String,

    /// Byte URL that needs a size suffix such as `=w2048-h1024` or `=d`
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub mime_type: String,

    #[serde(default)]
    pub media_metadata: MediaMetadata,

    #[serde(default)]
    pub contributor_info: Option<Contributor>,

    #[serde(default)]
    pub filename: String,
}

/// Metadata for a media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaMetadata {
    /// RFC 3339 timestamp of when the item was created (not uploaded)
    #[serde(default)]
    pub creation_time: String,

    #[serde(default)]
    pub width: String,

    #[serde(default)]
    pub height: String,
}

impl MediaMetadata {
    /// Creation time as a medium date and short time in the local zone,
    /// e.g. `Oct 2, 2014 3:01 PM`. Empty when the timestamp does not parse.
    pub fn formatted_creation_time(&self) -> String {
        match DateTime::parse_from_rfc3339(&self.creation_time) {
            Ok(created) => created
                .with_timezone(&Local)
                .format("%b %-d, %Y %-I:%M %p")
                .to_string(),
            Err(_) => String::new(),
        }
    }

    /// Pixel dimensions, when both parse to positive integers.
    pub fn dimensions(&self) -> Option<(u64, u64)> {
        let width: u64 = self.width.trim().parse().ok()?;
        let height: u64 = self.height.trim().parse().ok()?;
        (width > 0 && height > 0).then_some((width, height))
    }
}

/// Information about the user who added a shared media item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contributor {
    #[serde(default)]
    pub profile_picture_base_url: String,

    #[serde(default)]
    pub display_name: String,
}
