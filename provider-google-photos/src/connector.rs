//! Google Photos Library API connector implementation
//!
//! Implements the `PhotosLibrary` trait for the Photos Library API v1.

use async_trait::async_trait;
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
use bytes::Bytes;
use core_auth::AccessTokenProvider;
use core_runtime::config::{PhotosConfig, DEFAULT_PHOTOS_API_BASE};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::error::{GooglePhotosError, Result};
use crate::types::{AlbumsPage, MediaItemsPage};

/// Default per-request timeout
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Read access to a user's Google Photos library.
///
/// Implementations make exactly one attempt per call; retry policy belongs
/// to the caller.
#[async_trait]
pub trait PhotosLibrary: Send + Sync {
    /// List one page of the user's albums.
    async fn list_albums(&self, page_size: u32, page_token: Option<&str>) -> Result<AlbumsPage>;

    /// List one page of the media items in an album.
    async fn search_media_items(
        &self,
        album_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MediaItemsPage>;

    /// Fetch image bytes from `{base_url}={size_spec}`.
    ///
    /// Base URLs are pre-authorized; no bearer token is sent.
    async fn fetch_media(&self, base_url: &str, size_spec: &str) -> Result<Bytes>;
}

/// Google Photos Library API connector
///
/// # Example
///
/// ```ignore
/// use provider_google_photos::{GooglePhotosClient, PhotosLibrary};
///
/// let client = GooglePhotosClient::new(http_client, token_manager);
/// let page = client.search_media_items("album-id", 3, None).await?;
/// ```
pub struct GooglePhotosClient {
    /// HTTP client for API requests
    http_client: Arc<dyn HttpClient>,

    /// Source of fresh bearer tokens
    tokens: Arc<dyn AccessTokenProvider>,

    /// API base URL ending with `/`
    api_base: String,

    request_timeout: Duration,
}

impl GooglePhotosClient {
    /// Create a connector against the public API endpoint.
    pub fn new(http_client: Arc<dyn HttpClient>, tokens: Arc<dyn AccessTokenProvider>) -> Self {
        Self {
            http_client,
            tokens,
            api_base: DEFAULT_PHOTOS_API_BASE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Create a connector using the configured API base and timeout.
    pub fn from_config(
        http_client: Arc<dyn HttpClient>,
        tokens: Arc<dyn AccessTokenProvider>,
        config: &PhotosConfig,
    ) -> Self {
        Self {
            http_client,
            tokens,
            api_base: config.photos_api_base.clone(),
            request_timeout: config.request_timeout,
        }
    }

    /// Override the API base (normally only for tests).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        let mut api_base = api_base.into();
        if !api_base.ends_with('/') {
            api_base.push('/');
        }
        self.api_base = api_base;
        self
    }

    /// Attach a fresh bearer token and send the request once.
    async fn send_authorized(&self, request: HttpRequest) -> Result<HttpResponse> {
        let access_token = self.tokens.access_token().await?;
        self.send(request.bearer_token(access_token)).await
    }

    /// Send the request once, without credentials.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request.timeout(self.request_timeout);

        let response = self
            .http_client
            .execute_with_retry(request, RetryPolicy::no_retry())
            .await
            .map_err(|e| GooglePhotosError::NetworkError(e.to_string()))?;

        Self::ensure_success(response)
    }

    fn ensure_success(response: HttpResponse) -> Result<HttpResponse> {
        if response.is_success() {
            debug!(status = response.status, "API request succeeded");
            return Ok(response);
        }

        let message = String::from_utf8_lossy(&response.body).to_string();
        warn!(status = response.status, "API request failed");
        Err(GooglePhotosError::ApiError {
            status_code: response.status,
            message,
        })
    }
}

#[async_trait]
impl PhotosLibrary for GooglePhotosClient {
    #[instrument(skip(self), fields(has_page_token = page_token.is_some()))]
    async fn list_albums(&self, page_size: u32, page_token: Option<&str>) -> Result<AlbumsPage> {
        let mut url = format!("{}albums?pageSize={}", self.api_base, page_size);
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            url.push_str(&format!("&pageToken={}", urlencoding::encode(token)));
        }

        let request = HttpRequest::new(HttpMethod::Get, url).header("Accept", "application/json");
        let response = self.send_authorized(request).await?;

        let page: AlbumsPage = serde_json::from_slice(&response.body).map_err(|e| {
            GooglePhotosError::ParseError(format!("Failed to parse albums response: {}", e))
        })?;

        info!(
            count = page.albums.len(),
            has_more = !page.next_page_token.is_empty(),
            "Listed albums"
        );
        Ok(page)
    }

    #[instrument(skip(self), fields(album_id = %album_id, has_page_token = page_token.is_some()))]
    async fn search_media_items(
        &self,
        album_id: &str,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<MediaItemsPage> {
        let url = format!("{}mediaItems:search", self.api_base);
        let page_size = page_size.to_string();

        let mut fields = vec![("albumId", album_id), ("pageSize", page_size.as_str())];
        if let Some(token) = page_token.filter(|t| !t.is_empty()) {
            fields.push(("pageToken", token));
        }

        let request = HttpRequest::new(HttpMethod::Post, url)
            .header("Accept", "application/json")
            .form(&fields)
            .map_err(|e| GooglePhotosError::ParseError(format!("Failed to encode search: {}", e)))?;
        let response = self.send_authorized(request).await?;

        let page: MediaItemsPage = serde_json::from_slice(&response.body).map_err(|e| {
            GooglePhotosError::ParseError(format!("Failed to parse media items response: {}", e))
        })?;

        info!(
            count = page.media_items.len(),
            has_more = page.has_more(),
            "Fetched media items page"
        );
        Ok(page)
    }

    #[instrument(skip(self, base_url), fields(size_spec = %size_spec))]
    async fn fetch_media(&self, base_url: &str, size_spec: &str) -> Result<Bytes> {
        let url = format!("{}={}", base_url, size_spec);
        let request = HttpRequest::new(HttpMethod::Get, url);
        let response = self.send(request).await?;

        debug!(bytes = response.body.len(), "Downloaded media");
        Ok(response.body)
    }
}
