//! Album browsing pager.
//!
//! Keeps the albums page token between calls so a host can refresh the list
//! or load the next page. Only one fetch runs at a time unless forced.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use core_sync::SelectedAlbumStore;
use provider_google_photos::{AlbumsResult, PhotosLibrary};
use tokio::sync::Mutex;
use tracing::{debug, warn};

pub struct AlbumBrowser {
    library: Arc<dyn PhotosLibrary>,
    selection: SelectedAlbumStore,
    page_size: u32,
    page_token: Mutex<Option<String>>,
    loading: AtomicBool,
}

/// Clears the loading flag when the fetch ends, including on cancellation.
struct LoadingGuard<'a>(&'a AtomicBool);

impl<'a> LoadingGuard<'a> {
    /// Claim the flag; `None` when another fetch holds it.
    fn try_enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| Self(flag))
    }

    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl AlbumBrowser {
    pub fn new(
        library: Arc<dyn PhotosLibrary>,
        selection: SelectedAlbumStore,
        page_size: u32,
    ) -> Self {
        Self {
            library,
            selection,
            page_size,
            page_token: Mutex::new(None),
            loading: AtomicBool::new(false),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading.load(Ordering::SeqCst)
    }

    /// Whether another albums page is known to exist.
    pub async fn has_more(&self) -> bool {
        self.page_token.lock().await.is_some()
    }

    /// Fetch a page of albums.
    ///
    /// A non-incremental fetch starts over from the first page; an
    /// incremental one continues after the last page fetched. Returns
    /// `None` without a request while another fetch is running or when an
    /// incremental fetch has no page left, unless `force` is set.
    ///
    /// When the page contains the selected album with a changed title,
    /// cover or count, the stored selection summary is refreshed.
    pub async fn fetch_albums(&self, incremental: bool, force: bool) -> Option<AlbumsResult> {
        let _loading = if force {
            LoadingGuard::enter(&self.loading)
        } else {
            if incremental && !self.has_more().await {
                debug!("No further album page");
                return None;
            }
            match LoadingGuard::try_enter(&self.loading) {
                Some(guard) => guard,
                None => {
                    debug!(incremental, "Album fetch already running");
                    return None;
                }
            }
        };

        let page_token = {
            let mut token = self.page_token.lock().await;
            if !incremental {
                *token = None;
            }
            token.clone()
        };

        let page = match self
            .library
            .list_albums(self.page_size, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(e) => {
                warn!(error = %e, incremental, "Failed to fetch albums");
                return Some(AlbumsResult::Failure {
                    error: e.to_string(),
                });
            }
        };

        *self.page_token.lock().await =
            Some(page.next_page_token.clone()).filter(|t| !t.is_empty());

        let selected = match self.selection.load_selected_album().await {
            Ok(selected) => selected,
            Err(e) => {
                warn!(error = %e, "Failed to read the selected album");
                None
            }
        };
        let selected_id = selected.as_ref().map(|album| album.id.as_str());

        let albums: Vec<_> = page
            .albums
            .into_iter()
            .map(|album| album.set_selected(selected_id))
            .collect();

        if let Some(fresh) = albums.iter().find(|album| album.is_selected) {
            if let Err(e) = self.selection.update_summary(fresh).await {
                warn!(error = %e, "Failed to refresh the selected album summary");
            }
        }

        debug!(count = albums.len(), incremental, "Fetched albums");
        Some(AlbumsResult::Pagination {
            albums,
            next_page_token: page.next_page_token,
            is_incremental: incremental,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bridge_traits::storage::{MemorySettingsStore, SettingsStore};
    use bytes::Bytes;
    use core_sync::PageTokenStore;
    use provider_google_photos::{
        Album, AlbumsPage, GooglePhotosError, MediaItemsPage, Result as PhotosResult,
    };
    use std::collections::VecDeque;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct AlbumPages {
        pages: StdMutex<VecDeque<PhotosResult<AlbumsPage>>>,
        requested: StdMutex<Vec<Option<String>>>,
    }

    impl AlbumPages {
        fn push_page(&self, ids: &[&str], next_page_token: &str) {
            let albums = ids
                .iter()
                .map(|id| {
                    let mut album = Album::new(*id);
                    album.title = format!("Album {id}");
                    album
                })
                .collect();
            self.pages.lock().unwrap().push_back(Ok(AlbumsPage {
                albums,
                next_page_token: next_page_token.to_string(),
            }));
        }

        fn push_error(&self) {
            self.pages
                .lock()
                .unwrap()
                .push_back(Err(GooglePhotosError::ApiError {
                    status_code: 429,
                    message: "RESOURCE_EXHAUSTED".to_string(),
                }));
        }

        fn requested(&self) -> Vec<Option<String>> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PhotosLibrary for AlbumPages {
        async fn list_albums(
            &self,
            _page_size: u32,
            page_token: Option<&str>,
        ) -> PhotosResult<AlbumsPage> {
            self.requested
                .lock()
                .unwrap()
                .push(page_token.map(str::to_string));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(AlbumsPage::default()))
        }

        async fn search_media_items(
            &self,
            _: &str,
            _: u32,
            _: Option<&str>,
        ) -> PhotosResult<MediaItemsPage> {
            Ok(MediaItemsPage::default())
        }

        async fn fetch_media(&self, _: &str, _: &str) -> PhotosResult<Bytes> {
            Ok(Bytes::new())
        }
    }

    /// Parks in `list_albums` until released.
    #[derive(Default)]
    struct GatedAlbums {
        entered: tokio::sync::Notify,
        release: tokio::sync::Notify,
        calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl PhotosLibrary for GatedAlbums {
        async fn list_albums(&self, _: u32, _: Option<&str>) -> PhotosResult<AlbumsPage> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.entered.notify_one();
            self.release.notified().await;
            Ok(AlbumsPage::default())
        }

        async fn search_media_items(
            &self,
            _: &str,
            _: u32,
            _: Option<&str>,
        ) -> PhotosResult<MediaItemsPage> {
            Ok(MediaItemsPage::default())
        }

        async fn fetch_media(&self, _: &str, _: &str) -> PhotosResult<Bytes> {
            Ok(Bytes::new())
        }
    }

    fn browser(library: Arc<dyn PhotosLibrary>) -> (AlbumBrowser, SelectedAlbumStore) {
        let prefs: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
        let cursors = PageTokenStore::new(prefs.clone(), Arc::new(MemorySettingsStore::new()));
        let selection = SelectedAlbumStore::new(prefs, cursors);
        (AlbumBrowser::new(library, selection.clone(), 36), selection)
    }

    fn ids(result: &AlbumsResult) -> Vec<String> {
        match result {
            AlbumsResult::Pagination { albums, .. } => albums.iter().map(|a| a.id.clone()).collect(),
            AlbumsResult::Failure { error } => panic!("unexpected failure: {error}"),
        }
    }

    #[tokio::test]
    async fn test_refresh_then_load_more() {
        let library = Arc::new(AlbumPages::default());
        library.push_page(&["a1", "a2"], "P2");
        library.push_page(&["a3"], "");
        let (browser, _) = browser(library.clone());

        let first = browser.fetch_albums(false, false).await.unwrap();
        assert_eq!(ids(&first), vec!["a1", "a2"]);
        assert!(matches!(
            first,
            AlbumsResult::Pagination {
                is_incremental: false,
                ..
            }
        ));
        assert!(browser.has_more().await);

        let second = browser.fetch_albums(true, false).await.unwrap();
        assert_eq!(ids(&second), vec!["a3"]);
        assert!(matches!(
            second,
            AlbumsResult::Pagination {
                is_incremental: true,
                ..
            }
        ));

        assert!(browser.fetch_albums(true, false).await.is_none());
        assert_eq!(library.requested(), vec![None, Some("P2".to_string())]);
        assert!(!browser.is_loading());
    }

    #[tokio::test]
    async fn test_incremental_without_token_needs_force() {
        let library = Arc::new(AlbumPages::default());
        let (browser, _) = browser(library.clone());

        assert!(browser.fetch_albums(true, false).await.is_none());
        assert!(library.requested().is_empty());

        assert!(browser.fetch_albums(true, true).await.is_some());
        assert_eq!(library.requested(), vec![None]);
    }

    #[tokio::test]
    async fn test_refresh_resets_page_token() {
        let library = Arc::new(AlbumPages::default());
        library.push_page(&["a1"], "P2");
        library.push_page(&["a1"], "P2");
        let (browser, _) = browser(library.clone());

        browser.fetch_albums(false, false).await.unwrap();
        browser.fetch_albums(false, false).await.unwrap();

        assert_eq!(library.requested(), vec![None, None]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_fetch_is_not_started() {
        let library = Arc::new(GatedAlbums::default());
        let (browser, _) = browser(library.clone());
        let browser = Arc::new(browser);

        let first = tokio::spawn({
            let browser = Arc::clone(&browser);
            async move { browser.fetch_albums(false, false).await }
        });
        library.entered.notified().await;

        assert!(browser.is_loading());
        assert!(browser.fetch_albums(false, false).await.is_none());

        library.release.notify_one();
        assert!(first.await.unwrap().is_some());
        assert_eq!(library.calls.load(Ordering::SeqCst), 1);
        assert!(!browser.is_loading());
    }

    #[tokio::test]
    async fn test_failure_is_reported_as_result() {
        let library = Arc::new(AlbumPages::default());
        library.push_error();
        let (browser, _) = browser(library);

        match browser.fetch_albums(false, false).await.unwrap() {
            AlbumsResult::Failure { error } => assert!(error.contains("429")),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(!browser.is_loading());
    }

    #[tokio::test]
    async fn test_selected_album_is_flagged_and_summary_refreshed() {
        let library = Arc::new(AlbumPages::default());
        library.push_page(&["a1", "a2"], "");
        let (browser, selection) = browser(library);
        let mut stale = Album::new("a2");
        stale.title = "Old title".to_string();
        selection.save_selected_album(&stale).await.unwrap();

        let result = browser.fetch_albums(false, false).await.unwrap();

        let AlbumsResult::Pagination { albums, .. } = result else {
            panic!("expected a page");
        };
        assert!(!albums[0].is_selected);
        assert!(albums[1].is_selected);
        assert_eq!(
            selection.load_selected_album().await.unwrap().unwrap().title,
            "Album a2"
        );
    }
}
