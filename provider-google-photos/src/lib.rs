//! # Google Photos Provider
//!
//! Client for the Google Photos Library API v1.
//!
//! ## Overview
//!
//! This module provides:
//! - Paginated album listing for the album picker
//! - Paginated media item search within one album
//! - Image byte fetches against templated `baseUrl`s
//! - Wire types with lenient defaults for omitted fields
//!
//! Every API call obtains its bearer token from an
//! [`AccessTokenProvider`](core_auth::AccessTokenProvider), which refreshes
//! an expiring token before the request goes out. Nothing here retries.

pub mod connector;
pub mod error;
pub mod types;

pub use connector::{GooglePhotosClient, PhotosLibrary};
pub use error::{GooglePhotosError, Result};
pub use types::{
    Album, AlbumsPage, AlbumsResult, Contributor, MediaItem, MediaItemsPage, MediaMetadata,
};
