//! Core service façade and bootstrap helpers.
//!
//! This crate wires host-provided bridge implementations (HTTP, filesystem,
//! settings, background work, clock) and an artwork publisher into the photo
//! sync pipeline. Desktop hosts typically enable the `desktop-shims` feature,
//! which builds every bridge from `bridge-desktop` and publishes artwork into
//! a local SQLite catalog.

pub mod albums;
pub mod error;
pub mod service;

pub use albums::AlbumBrowser;
pub use error::{CoreError, Result};
pub use service::PhotosService;

use std::sync::Arc;

use bridge_traits::{
    background::BackgroundExecutor,
    http::HttpClient,
    storage::{FileSystemAccess, SettingsStore},
    time::Clock,
};
use core_sync::ArtworkPublisher;

/// Aggregated handle to all bridge dependencies the core requires.
#[derive(Clone)]
pub struct CoreDependencies {
    pub http_client: Arc<dyn HttpClient>,
    pub filesystem: Arc<dyn FileSystemAccess>,
    /// Preferences holding tokens, the selected album and the last sync time
    pub settings_store: Arc<dyn SettingsStore>,
    /// Separate store for per-album page tokens so they can be wiped at once
    pub page_token_store: Arc<dyn SettingsStore>,
    pub background_executor: Arc<dyn BackgroundExecutor>,
    pub clock: Arc<dyn Clock>,
    pub artwork_publisher: Arc<dyn ArtworkPublisher>,
}

impl CoreDependencies {
    /// Construct a dependency bundle from explicit bridge handles.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        http_client: Arc<dyn HttpClient>,
        filesystem: Arc<dyn FileSystemAccess>,
        settings_store: Arc<dyn SettingsStore>,
        page_token_store: Arc<dyn SettingsStore>,
        background_executor: Arc<dyn BackgroundExecutor>,
        clock: Arc<dyn Clock>,
        artwork_publisher: Arc<dyn ArtworkPublisher>,
    ) -> Self {
        Self {
            http_client,
            filesystem,
            settings_store,
            page_token_store,
            background_executor,
            clock,
            artwork_publisher,
        }
    }
}

/// Convenience bootstrapper for desktop hosts.
///
/// Everything lives under `config.data_dir`: `settings.db` for preferences
/// and page tokens, `artwork.db` for the published catalog and `artwork/`
/// for the downloaded payloads.
///
/// ```no_run
/// # async fn example() -> core_service::Result<()> {
/// use core_runtime::PhotosConfig;
///
/// let config = PhotosConfig::builder()
///     .client_id("client-id.apps.googleusercontent.com")
///     .client_secret("secret")
///     .data_dir("/tmp/photos-sync")
///     .build()?;
/// let service = core_service::bootstrap_desktop(config).await?;
/// service.reload(true).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(all(feature = "desktop-shims", not(target_arch = "wasm32")))]
pub async fn bootstrap_desktop(config: core_runtime::PhotosConfig) -> Result<PhotosService> {
    use bridge_desktop::{
        DesktopNetworkMonitor, ReqwestHttpClient, SqliteSettingsStore, TokioBackgroundExecutor,
        TokioFileSystem,
    };
    use bridge_traits::{network::NetworkMonitor, time::SystemClock};
    use core_sync::{SqliteArtworkStore, PAGE_TOKENS_NAMESPACE};

    let filesystem: Arc<dyn FileSystemAccess> = Arc::new(TokioFileSystem::with_data_directory(
        config.data_dir.clone(),
    ));
    let data_dir = filesystem.get_data_directory().await?;

    let settings = SqliteSettingsStore::new(data_dir.join("settings.db"))
        .await
        .map_err(|e| CoreError::InitializationFailed(format!("settings store: {}", e)))?;
    let page_tokens = settings.scoped(PAGE_TOKENS_NAMESPACE)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let monitor: Arc<dyn NetworkMonitor> = Arc::new(DesktopNetworkMonitor::new());
    let executor = TokioBackgroundExecutor::with_network_monitor(Some(monitor));

    let artwork = SqliteArtworkStore::open(
        &data_dir.join("artwork.db"),
        filesystem.clone(),
        data_dir.join("artwork"),
        clock.clone(),
    )
    .await?;

    let deps = CoreDependencies::new(
        Arc::new(ReqwestHttpClient::with_timeout(config.request_timeout)),
        filesystem,
        Arc::new(settings),
        Arc::new(page_tokens),
        Arc::new(executor),
        clock,
        Arc::new(artwork),
    );

    PhotosService::new(config, deps).await
}
