//! Photo sync façade.

use std::sync::Arc;

use bridge_traits::background::TaskId;
use core_auth::{AccessTokenProvider, TokenExchangeClient, TokenManager, TokenStore};
use core_runtime::config::PhotosConfig;
use core_runtime::events::{EventBus, EventStream};
use core_sync::{
    PageTokenStore, PhotosSyncWorker, SelectedAlbumStore, SyncCommands, SyncConfig, SyncOutcome,
};
use provider_google_photos::{Album, AlbumsResult, GooglePhotosClient, PhotosLibrary};
use tracing::info;

use crate::albums::AlbumBrowser;
use crate::{CoreDependencies, Result};

/// Capacity of the service event channel
const EVENT_BUS_CAPACITY: usize = 128;

/// Primary façade exposed to host applications.
///
/// Owns the token manager, the album browser and the sync commands built
/// from one [`PhotosConfig`] and one set of bridges.
#[derive(Clone)]
pub struct PhotosService {
    inner: Arc<ServiceInner>,
}

struct ServiceInner {
    config: PhotosConfig,
    deps: CoreDependencies,
    event_bus: EventBus,
    tokens: Arc<TokenManager>,
    browser: AlbumBrowser,
    commands: SyncCommands,
}

impl PhotosService {
    /// Wire the pipeline and register the load task with the executor.
    ///
    /// The persisted token is loaded into memory before returning.
    pub async fn new(config: PhotosConfig, deps: CoreDependencies) -> Result<Self> {
        config.validate()?;

        let event_bus = EventBus::new(EVENT_BUS_CAPACITY);

        let store = TokenStore::new(deps.settings_store.clone(), deps.clock.clone());
        store.load().await;
        let exchange = TokenExchangeClient::from_config(deps.http_client.clone(), &config);
        let tokens = Arc::new(
            TokenManager::new(store, exchange, event_bus.clone())
                .with_timeout(config.request_timeout),
        );

        let provider: Arc<dyn AccessTokenProvider> = tokens.clone();
        let library: Arc<dyn PhotosLibrary> = Arc::new(GooglePhotosClient::from_config(
            deps.http_client.clone(),
            provider.clone(),
            &config,
        ));

        let cursors = PageTokenStore::new(
            deps.settings_store.clone(),
            deps.page_token_store.clone(),
        );
        let selection = SelectedAlbumStore::new(deps.settings_store.clone(), cursors.clone());

        let worker = Arc::new(PhotosSyncWorker::new(
            library.clone(),
            provider,
            cursors,
            selection.clone(),
            deps.artwork_publisher.clone(),
            deps.clock.clone(),
            event_bus.clone(),
            SyncConfig::from(&config),
        ));

        let commands = SyncCommands::new(deps.background_executor.clone(), worker);
        commands.register().await?;

        let browser = AlbumBrowser::new(library, selection, config.album_page_size);

        info!(
            data_dir = %config.data_dir.display(),
            page_size = config.sync_page_size,
            "Photo sync service ready"
        );

        Ok(Self {
            inner: Arc::new(ServiceInner {
                config,
                deps,
                event_bus,
                tokens,
                browser,
                commands,
            }),
        })
    }

    pub fn config(&self) -> &PhotosConfig {
        &self.inner.config
    }

    pub fn dependencies(&self) -> &CoreDependencies {
        &self.inner.deps
    }

    pub fn subscribe_events(&self) -> EventStream {
        EventStream::new(self.inner.event_bus.subscribe())
    }

    /// Exchange the server auth code from Google Sign-In for tokens.
    pub async fn sign_in(&self, server_auth_code: &str) -> Result<()> {
        self.inner.tokens.sign_in(server_auth_code).await?;
        Ok(())
    }

    pub async fn is_authorized(&self) -> bool {
        self.inner.tokens.is_authorized().await
    }

    /// See [`AlbumBrowser::fetch_albums`].
    pub async fn fetch_albums(&self, incremental: bool, force: bool) -> Option<AlbumsResult> {
        self.inner.browser.fetch_albums(incremental, force).await
    }

    pub fn is_loading_albums(&self) -> bool {
        self.inner.browser.is_loading()
    }

    pub async fn select_album(&self, album: &Album) -> Result<()> {
        Ok(self.inner.commands.select_album(album).await?)
    }

    pub async fn selected_album(&self) -> Result<Option<Album>> {
        Ok(self.inner.commands.selected_album().await?)
    }

    pub async fn clear_album_selection(&self) -> Result<()> {
        Ok(self.inner.commands.clear_album_and_page_tokens().await?)
    }

    /// Schedule a background load. `None` when the admission gate is closed.
    pub async fn reload(&self, initial: bool) -> Result<Option<TaskId>> {
        Ok(self.inner.commands.enqueue_load(initial).await?)
    }

    /// Run one sync cycle on the calling task instead of the executor.
    pub async fn sync_now(&self, initial: bool) -> SyncOutcome {
        self.inner.commands.worker().run(initial).await
    }

    /// Remove all published artwork and reset the cursors.
    pub async fn prune(&self) -> Result<u64> {
        Ok(self.inner.commands.prune().await?)
    }

    pub async fn artwork_count(&self) -> Result<u64> {
        Ok(self.inner.deps.artwork_publisher.count().await?)
    }
}
