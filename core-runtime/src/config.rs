//! # Core Configuration Module
//!
//! Provides configuration management for the photo sync core.
//!
//! ## Overview
//!
//! The configuration system uses a builder pattern to construct a
//! [`PhotosConfig`] holding the OAuth client credentials, API endpoints and
//! the tuning knobs of the sync pipeline. It enforces fail-fast validation so
//! a misconfigured host is rejected before any network traffic happens.
//!
//! Host capabilities (HTTP, settings, file system, scheduling) are not part of
//! this struct; they are injected separately through `core-service`.
//!
//! ## Usage
//!
//! ```ignore
//! use core_runtime::config::PhotosConfig;
//!
//! let config = PhotosConfig::builder()
//!     .client_id("1234.apps.googleusercontent.com")
//!     .client_secret(std::env::var("PHOTOS_CLIENT_SECRET")?)
//!     .data_dir("/var/lib/photos-sync")
//!     .screen_height(1920)
//!     .build()?;
//! ```
//!
//! ## Error Handling
//!
//! ```should_panic
//! use core_runtime::config::PhotosConfig;
//!
//! // Missing client credentials produce an actionable error
//! let config = PhotosConfig::builder()
//!     .data_dir("/tmp/photos")
//!     .build()
//!     .expect("Should fail - missing client id");
//! ```

use crate::error::{Error, Result};
use crate::logging::LoggingConfig;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

/// OAuth token endpoint used for code exchange and refresh
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v4/token";

/// Base URL of the Photos Library REST API
pub const DEFAULT_PHOTOS_API_BASE: &str = "https://photoslibrary.googleapis.com/v1/";

/// Media items requested per sync run
pub const DEFAULT_SYNC_PAGE_SIZE: u32 = 3;

/// Albums requested per browse page
pub const DEFAULT_ALBUM_PAGE_SIZE: u32 = 36;

/// Minimum spacing between two non-initial sync runs
pub const DEFAULT_MIN_SYNC_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Title used for photos without a description
pub const DEFAULT_PHOTO_TITLE: &str = "Google Photos";

/// Configuration for the photo sync core.
///
/// Use [`PhotosConfig::builder`] to construct instances.
#[derive(Clone)]
pub struct PhotosConfig {
    /// OAuth client identifier
    pub client_id: String,

    /// OAuth client secret
    pub client_secret: String,

    /// Token endpoint for authorization-code exchange and refresh
    pub token_endpoint: String,

    /// Photos Library API base URL, always ending with `/`
    pub photos_api_base: String,

    /// Directory holding the settings database and artwork payloads
    pub data_dir: PathBuf,

    /// Number of media items fetched per sync run
    pub sync_page_size: u32,

    /// Number of albums fetched per browse page
    pub album_page_size: u32,

    /// Minimum spacing between non-initial sync runs
    pub min_sync_interval: Duration,

    /// Target screen height in pixels used to size downloads
    ///
    /// `None` downloads the original (`=d`).
    pub screen_height: Option<u32>,

    /// Title for photos without a description
    pub default_photo_title: String,

    /// Per-request timeout for API calls
    pub request_timeout: Duration,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl std::fmt::Debug for PhotosConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotosConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("token_endpoint", &self.token_endpoint)
            .field("photos_api_base", &self.photos_api_base)
            .field("data_dir", &self.data_dir)
            .field("sync_page_size", &self.sync_page_size)
            .field("album_page_size", &self.album_page_size)
            .field("min_sync_interval", &self.min_sync_interval)
            .field("screen_height", &self.screen_height)
            .field("default_photo_title", &self.default_photo_title)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl PhotosConfig {
    /// Creates a new builder for constructing a `PhotosConfig`.
    pub fn builder() -> PhotosConfigBuilder {
        PhotosConfigBuilder::default()
    }

    /// Minimum sync interval in milliseconds
    pub fn min_sync_interval_ms(&self) -> i64 {
        self.min_sync_interval.as_millis().min(i64::MAX as u128) as i64
    }

    /// Validates the configuration and returns an error if invalid.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("OAuth client id cannot be empty".to_string()));
        }

        if self.client_secret.trim().is_empty() {
            return Err(Error::Config(
                "OAuth client secret cannot be empty".to_string(),
            ));
        }

        validate_url("Token endpoint", &self.token_endpoint)?;
        validate_url("Photos API base", &self.photos_api_base)?;

        if !self.photos_api_base.ends_with('/') {
            return Err(Error::Config(
                "Photos API base must end with '/'".to_string(),
            ));
        }

        if self.data_dir.as_os_str().is_empty() {
            return Err(Error::Config("Data directory cannot be empty".to_string()));
        }

        if !(1..=100).contains(&self.sync_page_size) {
            return Err(Error::Config(
                "Sync page size must be between 1 and 100".to_string(),
            ));
        }

        if !(1..=50).contains(&self.album_page_size) {
            return Err(Error::Config(
                "Album page size must be between 1 and 50".to_string(),
            ));
        }

        if self.min_sync_interval.is_zero() {
            return Err(Error::Config(
                "Minimum sync interval must be greater than zero".to_string(),
            ));
        }

        if self.screen_height == Some(0) {
            return Err(Error::Config(
                "Screen height must be greater than zero when set".to_string(),
            ));
        }

        if self.default_photo_title.trim().is_empty() {
            return Err(Error::Config(
                "Default photo title cannot be empty".to_string(),
            ));
        }

        if self.request_timeout.is_zero() {
            return Err(Error::Config(
                "Request timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

fn validate_url(name: &str, value: &str) -> Result<()> {
    let url = Url::parse(value)
        .map_err(|e| Error::Config(format!("{} is not a valid URL ({}): {}", name, value, e)))?;

    if !matches!(url.scheme(), "https" | "http") {
        return Err(Error::Config(format!(
            "{} must use http or https, got {}",
            name,
            url.scheme()
        )));
    }

    Ok(())
}

/// Builder for constructing [`PhotosConfig`] instances.
#[derive(Default)]
pub struct PhotosConfigBuilder {
    client_id: Option<String>,
    client_secret: Option<String>,
    token_endpoint: Option<String>,
    photos_api_base: Option<String>,
    data_dir: Option<PathBuf>,
    sync_page_size: Option<u32>,
    album_page_size: Option<u32>,
    min_sync_interval: Option<Duration>,
    screen_height: Option<u32>,
    default_photo_title: Option<String>,
    request_timeout: Option<Duration>,
    logging: Option<LoggingConfig>,
}

impl PhotosConfigBuilder {
    /// Sets the OAuth client id (required).
    pub fn client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    /// Sets the OAuth client secret (required).
    pub fn client_secret(mut self, client_secret: impl Into<String>) -> Self {
        self.client_secret = Some(client_secret.into());
        self
    }

    /// Overrides the token endpoint.
    ///
    /// Default: [`DEFAULT_TOKEN_ENDPOINT`]
    pub fn token_endpoint(mut self, url: impl Into<String>) -> Self {
        self.token_endpoint = Some(url.into());
        self
    }

    /// Overrides the Photos Library API base URL.
    ///
    /// A trailing `/` is appended when missing.
    ///
    /// Default: [`DEFAULT_PHOTOS_API_BASE`]
    pub fn photos_api_base(mut self, url: impl Into<String>) -> Self {
        self.photos_api_base = Some(url.into());
        self
    }

    /// Sets the data directory (required).
    pub fn data_dir<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.data_dir = Some(path.into());
        self
    }

    /// Number of photos fetched per sync run.
    ///
    /// Default: 3
    pub fn sync_page_size(mut self, size: u32) -> Self {
        self.sync_page_size = Some(size);
        self
    }

    /// Number of albums fetched per browse page.
    ///
    /// Default: 36
    pub fn album_page_size(mut self, size: u32) -> Self {
        self.album_page_size = Some(size);
        self
    }

    /// Minimum spacing between non-initial sync runs.
    ///
    /// Default: 15 minutes
    pub fn min_sync_interval(mut self, interval: Duration) -> Self {
        self.min_sync_interval = Some(interval);
        self
    }

    /// Screen height in pixels used to size downloaded photos.
    pub fn screen_height(mut self, height: u32) -> Self {
        self.screen_height = Some(height);
        self
    }

    /// Title used for photos without a description.
    pub fn default_photo_title(mut self, title: impl Into<String>) -> Self {
        self.default_photo_title = Some(title.into());
        self
    }

    /// Per-request timeout for API calls.
    ///
    /// Default: 30 seconds
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Logging configuration.
    pub fn logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = Some(logging);
        self
    }

    /// Builds and validates the final `PhotosConfig`.
    pub fn build(self) -> Result<PhotosConfig> {
        let client_id = self.client_id.ok_or_else(|| {
            Error::Config("OAuth client id is required. Use .client_id() to set it.".to_string())
        })?;

        let client_secret = self.client_secret.ok_or_else(|| {
            Error::Config(
                "OAuth client secret is required. Use .client_secret() to set it.".to_string(),
            )
        })?;

        let data_dir = self.data_dir.ok_or_else(|| {
            Error::Config("Data directory is required. Use .data_dir() to set it.".to_string())
        })?;

        let mut photos_api_base = self
            .photos_api_base
            .unwrap_or_else(|| DEFAULT_PHOTOS_API_BASE.to_string());
        if !photos_api_base.ends_with('/') {
            photos_api_base.push('/');
        }

        let config = PhotosConfig {
            client_id,
            client_secret,
            token_endpoint: self
                .token_endpoint
                .unwrap_or_else(|| DEFAULT_TOKEN_ENDPOINT.to_string()),
            photos_api_base,
            data_dir,
            sync_page_size: self.sync_page_size.unwrap_or(DEFAULT_SYNC_PAGE_SIZE),
            album_page_size: self.album_page_size.unwrap_or(DEFAULT_ALBUM_PAGE_SIZE),
            min_sync_interval: self.min_sync_interval.unwrap_or(DEFAULT_MIN_SYNC_INTERVAL),
            screen_height: self.screen_height,
            default_photo_title: self
                .default_photo_title
                .unwrap_or_else(|| DEFAULT_PHOTO_TITLE.to_string()),
            request_timeout: self.request_timeout.unwrap_or(Duration::from_secs(30)),
            logging: self.logging.unwrap_or_default(),
        };

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_builder() -> PhotosConfigBuilder {
        PhotosConfig::builder()
            .client_id("client")
            .client_secret("secret")
            .data_dir("/tmp/photos-sync")
    }

    #[test]
    fn test_defaults() {
        let config = base_builder().build().unwrap();

        assert_eq!(config.token_endpoint, DEFAULT_TOKEN_ENDPOINT);
        assert_eq!(config.photos_api_base, DEFAULT_PHOTOS_API_BASE);
        assert_eq!(config.sync_page_size, 3);
        assert_eq!(config.album_page_size, 36);
        assert_eq!(config.min_sync_interval_ms(), 900_000);
        assert_eq!(config.screen_height, None);
        assert_eq!(config.default_photo_title, DEFAULT_PHOTO_TITLE);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_missing_client_id() {
        let result = PhotosConfig::builder()
            .client_secret("secret")
            .data_dir("/tmp")
            .build();

        match result {
            Err(Error::Config(msg)) => assert!(msg.contains("client id")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_data_dir() {
        let result = PhotosConfig::builder()
            .client_id("client")
            .client_secret("secret")
            .build();

        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("Data directory")));
    }

    #[test]
    fn test_blank_secret_rejected() {
        let result = base_builder().client_secret("   ").build();
        assert!(matches!(result, Err(Error::Config(msg)) if msg.contains("secret")));
    }

    #[test]
    fn test_api_base_gets_trailing_slash() {
        let config = base_builder()
            .photos_api_base("http://127.0.0.1:8080/v1")
            .build()
            .unwrap();

        assert_eq!(config.photos_api_base, "http://127.0.0.1:8080/v1/");
    }

    #[test]
    fn test_invalid_urls_rejected() {
        assert!(base_builder().token_endpoint("not a url").build().is_err());
        assert!(base_builder()
            .photos_api_base("ftp://example.com/")
            .build()
            .is_err());
    }

    #[test]
    fn test_numeric_bounds() {
        assert!(base_builder().sync_page_size(0).build().is_err());
        assert!(base_builder().sync_page_size(101).build().is_err());
        assert!(base_builder().album_page_size(51).build().is_err());
        assert!(base_builder().screen_height(0).build().is_err());
        assert!(base_builder()
            .min_sync_interval(Duration::ZERO)
            .build()
            .is_err());
        assert!(base_builder()
            .request_timeout(Duration::ZERO)
            .build()
            .is_err());
        assert!(base_builder().default_photo_title("").build().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let config = base_builder().client_secret("super-secret").build().unwrap();
        let rendered = format!("{:?}", config);

        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("[REDACTED]"));
        assert!(rendered.contains("client"));
    }
}
