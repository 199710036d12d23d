//! Integration tests for the photo sync pipeline
//!
//! These tests drive the sync worker end to end against:
//! - a scripted photos library that records every request
//! - in-memory settings namespaces and a manual clock
//! - an in-memory artwork publisher (and the SQLite store for payload checks)

use async_trait::async_trait;
use bridge_desktop::{TokioBackgroundExecutor, TokioFileSystem};
use bridge_traits::background::{BackgroundExecutor, TaskStatus};
use bridge_traits::storage::{MemorySettingsStore, SettingsStore};
use bridge_traits::time::ManualClock;
use bytes::Bytes;
use core_auth::AccessTokenProvider;
use core_runtime::events::{ArtworkEvent, CoreEvent, EventBus, SyncEvent};
use core_sync::{
    ArtworkHandle, ArtworkPublisher, ArtworkRecord, PageTokenStore, PhotosSyncWorker,
    PublishedArtwork, SelectedAlbumStore, SqliteArtworkStore, SyncCommands, SyncConfig,
    SyncOutcome, LOAD_TASK_ID,
};
use provider_google_photos::{
    Album, AlbumsPage, GooglePhotosError, MediaItem, MediaItemsPage, MediaMetadata, PhotosLibrary,
};
use std::collections::{HashMap, HashSet};
use std::io;
use std::path::PathBuf;
use std::pin::Pin;
use std::sync::{Arc, Mutex as StdMutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::AsyncWrite;

const T0: i64 = 1_700_000_000_000;

// ============================================================================
// Test Doubles
// ============================================================================

#[derive(Default)]
struct ScriptedLibrary {
    page: StdMutex<Option<MediaItemsPage>>,
    page_error: StdMutex<Option<u16>>,
    failing_urls: StdMutex<HashSet<String>>,
    searches: StdMutex<Vec<(String, Option<String>)>>,
    fetches: StdMutex<Vec<String>>,
}

impl ScriptedLibrary {
    fn with_page(items: Vec<MediaItem>, next_page_token: &str) -> Self {
        let library = Self::default();
        library.set_page(items, next_page_token);
        library
    }

    fn set_page(&self, items: Vec<MediaItem>, next_page_token: &str) {
        *self.page.lock().unwrap() = Some(MediaItemsPage {
            media_items: items,
            next_page_token: next_page_token.to_string(),
        });
    }

    fn fail_page_with(&self, status: u16) {
        *self.page_error.lock().unwrap() = Some(status);
    }

    fn fail_fetch(&self, base_url: &str) {
        self.failing_urls.lock().unwrap().insert(base_url.to_string());
    }

    fn searches(&self) -> Vec<(String, Option<String>)> {
        self.searches.lock().unwrap().clone()
    }

    fn fetches(&self) -> Vec<String> {
        self.fetches.lock().unwrap().clone()
    }

    fn network_calls(&self) -> usize {
        self.searches.lock().unwrap().len() + self.fetches.lock().unwrap().len()
    }
}

#[async_trait]
impl PhotosLibrary for ScriptedLibrary {
    async fn list_albums(
        &self,
        _page_size: u32,
        _page_token: Option<&str>,
    ) -> provider_google_photos::Result<AlbumsPage> {
        Ok(AlbumsPage::default())
    }

    async fn search_media_items(
        &self,
        album_id: &str,
        _page_size: u32,
        page_token: Option<&str>,
    ) -> provider_google_photos::Result<MediaItemsPage> {
        self.searches
            .lock()
            .unwrap()
            .push((album_id.to_string(), page_token.map(str::to_string)));

        if let Some(status_code) = *self.page_error.lock().unwrap() {
            return Err(GooglePhotosError::ApiError {
                status_code,
                message: "scripted failure".to_string(),
            });
        }
        Ok(self.page.lock().unwrap().clone().unwrap_or_default())
    }

    async fn fetch_media(
        &self,
        base_url: &str,
        size_spec: &str,
    ) -> provider_google_photos::Result<Bytes> {
        self.fetches
            .lock()
            .unwrap()
            .push(format!("{}={}", base_url, size_spec));

        if self.failing_urls.lock().unwrap().contains(base_url) {
            return Err(GooglePhotosError::ApiError {
                status_code: 500,
                message: "backend error".to_string(),
            });
        }
        Ok(Bytes::from(format!("jpeg:{}", base_url)))
    }
}

struct StaticTokens;

#[async_trait]
impl AccessTokenProvider for StaticTokens {
    async fn access_token(&self) -> core_auth::Result<String> {
        Ok("ya29.test".to_string())
    }
}

type Payloads = Arc<StdMutex<HashMap<PathBuf, Vec<u8>>>>;

#[derive(Default)]
struct MemoryPublisher {
    records: StdMutex<HashMap<String, PublishedArtwork>>,
    payloads: Payloads,
    adds: StdMutex<Vec<String>>,
    /// Bytes a payload stream accepts before failing with "disk full"
    write_budget: StdMutex<Option<usize>>,
}

impl MemoryPublisher {
    fn adds(&self) -> Vec<String> {
        self.adds.lock().unwrap().clone()
    }

    fn fail_writes_after(&self, budget: Option<usize>) {
        *self.write_budget.lock().unwrap() = budget;
    }

    fn payload(&self, token: &str) -> Option<Vec<u8>> {
        let path = self.records.lock().unwrap().get(token)?.handle.payload_path.clone();
        self.payloads.lock().unwrap().get(&path).cloned()
    }
}

struct PayloadWriter {
    path: PathBuf,
    payloads: Payloads,
    budget: Option<usize>,
}

impl AsyncWrite for PayloadWriter {
    fn poll_write(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let mut payloads = self.payloads.lock().unwrap();
        let payload = payloads.entry(self.path.clone()).or_default();
        let accepted = match self.budget {
            Some(budget) if payload.len() >= budget => {
                return Poll::Ready(Err(io::Error::new(io::ErrorKind::Other, "disk full")));
            }
            Some(budget) => buf.len().min(budget - payload.len()),
            None => buf.len(),
        };
        payload.extend_from_slice(&buf[..accepted]);
        Poll::Ready(Ok(accepted))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

#[async_trait]
impl ArtworkPublisher for MemoryPublisher {
    async fn add_artwork(&self, record: &ArtworkRecord) -> core_sync::Result<Option<ArtworkHandle>> {
        self.adds.lock().unwrap().push(record.token.clone());
        let mut records = self.records.lock().unwrap();
        let id = records
            .get(&record.token)
            .map(|existing| existing.handle.id)
            .unwrap_or(records.len() as i64 + 1);
        let handle = ArtworkHandle {
            id,
            payload_path: PathBuf::from(format!("/artwork/{}", record.token)),
        };
        records.insert(
            record.token.clone(),
            PublishedArtwork {
                handle: handle.clone(),
                record: record.clone(),
                added_at: 0,
            },
        );
        Ok(Some(handle))
    }

    async fn open_output_stream(
        &self,
        handle: &ArtworkHandle,
    ) -> core_sync::Result<Box<dyn AsyncWrite + Send + Unpin>> {
        self.payloads
            .lock()
            .unwrap()
            .insert(handle.payload_path.clone(), Vec::new());
        Ok(Box::new(PayloadWriter {
            path: handle.payload_path.clone(),
            payloads: Arc::clone(&self.payloads),
            budget: *self.write_budget.lock().unwrap(),
        }))
    }

    async fn find_by_token(&self, token: &str) -> core_sync::Result<Option<PublishedArtwork>> {
        Ok(self.records.lock().unwrap().get(token).cloned())
    }

    async fn payload_exists(&self, handle: &ArtworkHandle) -> core_sync::Result<bool> {
        Ok(self
            .payloads
            .lock()
            .unwrap()
            .get(&handle.payload_path)
            .is_some_and(|bytes| !bytes.is_empty()))
    }

    async fn discard_payload(&self, handle: &ArtworkHandle) -> core_sync::Result<()> {
        self.payloads.lock().unwrap().remove(&handle.payload_path);
        Ok(())
    }

    async fn count(&self) -> core_sync::Result<u64> {
        Ok(self.records.lock().unwrap().len() as u64)
    }

    async fn clear_all(&self) -> core_sync::Result<u64> {
        let removed = self.records.lock().unwrap().drain().count() as u64;
        self.payloads.lock().unwrap().clear();
        Ok(removed)
    }
}

// ============================================================================
// Fixtures
// ============================================================================

fn media_item(id: &str) -> MediaItem {
    MediaItem {
        id: id.to_string(),
        description: None,
        product_url: format!("https://photos.google.com/lr/photo/{}", id),
        base_url: format!("https://lh3.googleusercontent.com/{}", id),
        mime_type: "image/jpeg".to_string(),
        media_metadata: MediaMetadata {
            creation_time: "2014-10-02T15:01:23Z".to_string(),
            width: "4000".to_string(),
            height: "3000".to_string(),
        },
        contributor_info: None,
        filename: format!("{}.jpg", id),
    }
}

struct Harness {
    library: Arc<ScriptedLibrary>,
    clock: Arc<ManualClock>,
    page_tokens: Arc<MemorySettingsStore>,
    cursors: PageTokenStore,
    selection: SelectedAlbumStore,
    event_bus: EventBus,
    worker: Arc<PhotosSyncWorker>,
}

impl Harness {
    async fn new(library: ScriptedLibrary, publisher: Arc<dyn ArtworkPublisher>) -> Self {
        Self::with_clock(library, publisher, Arc::new(ManualClock::new(T0))).await
    }

    async fn with_clock(
        library: ScriptedLibrary,
        publisher: Arc<dyn ArtworkPublisher>,
        clock: Arc<ManualClock>,
    ) -> Self {
        let library = Arc::new(library);
        let prefs: Arc<dyn SettingsStore> = Arc::new(MemorySettingsStore::new());
        let page_tokens = Arc::new(MemorySettingsStore::new());
        let cursors = PageTokenStore::new(prefs.clone(), page_tokens.clone());
        let selection = SelectedAlbumStore::new(prefs, cursors.clone());
        let event_bus = EventBus::new(64);

        let mut album = Album::new("album1");
        album.title = "Trip".to_string();
        selection.save_selected_album(&album).await.unwrap();

        let worker = Arc::new(PhotosSyncWorker::new(
            library.clone(),
            Arc::new(StaticTokens),
            cursors.clone(),
            selection.clone(),
            publisher,
            clock.clone(),
            event_bus.clone(),
            SyncConfig::default(),
        ));

        Self {
            library,
            clock,
            page_tokens,
            cursors,
            selection,
            event_bus,
            worker,
        }
    }
}

fn completed(outcome: SyncOutcome) -> core_sync::SyncReport {
    match outcome {
        SyncOutcome::Completed(report) => report,
        other => panic!("expected a completed run, got {other:?}"),
    }
}

// ============================================================================
// Scenarios
// ============================================================================

#[tokio::test]
async fn test_initial_sync_publishes_page_and_stores_cursor() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1"), media_item("item2")], "TOK2"),
        publisher.clone(),
    )
    .await;
    harness
        .page_tokens
        .set_string("photos_page_token_album1", "STALE")
        .await
        .unwrap();

    let report = completed(harness.worker.run(true).await);

    assert_eq!(report.items_seen, 2);
    assert_eq!(report.items_published, 2);
    assert_eq!(report.next_page_token.as_deref(), Some("TOK2"));
    assert_eq!(
        harness.library.searches(),
        vec![("album1".to_string(), None)],
        "initial sync starts from the first page"
    );
    assert_eq!(
        harness.library.fetches(),
        vec![
            "https://lh3.googleusercontent.com/item1=d".to_string(),
            "https://lh3.googleusercontent.com/item2=d".to_string(),
        ]
    );
    assert_eq!(publisher.adds(), vec!["item1".to_string(), "item2".to_string()]);
    assert_eq!(
        publisher.payload("item1").unwrap(),
        b"jpeg:https://lh3.googleusercontent.com/item1".to_vec()
    );
    assert_eq!(
        harness
            .page_tokens
            .get_string("photos_page_token_album1")
            .await
            .unwrap()
            .as_deref(),
        Some("TOK2")
    );
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), T0);
}

#[tokio::test]
async fn test_published_record_carries_item_metadata() {
    let publisher = Arc::new(MemoryPublisher::default());
    let mut item = media_item("item1");
    item.description = Some("Harbour".to_string());
    let harness = Harness::new(ScriptedLibrary::with_page(vec![item], ""), publisher.clone()).await;

    completed(harness.worker.run(true).await);

    let stored = publisher.find_by_token("item1").await.unwrap().unwrap();
    assert_eq!(stored.record.title, "Harbour");
    assert_eq!(
        stored.record.persistent_uri,
        "https://lh3.googleusercontent.com/item1=d"
    );
    assert_eq!(
        stored.record.web_uri,
        "https://photos.google.com/lr/photo/item1"
    );
    assert!(!stored.record.attribution.is_empty());
}

#[tokio::test]
async fn test_failed_payload_write_is_downloaded_again() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1")], ""),
        publisher.clone(),
    )
    .await;

    publisher.fail_writes_after(Some(4));
    let first = completed(harness.worker.run(true).await);
    assert_eq!(first.items_published, 0);
    assert_eq!(first.items_failed, 1);
    assert_eq!(publisher.payload("item1"), None);

    publisher.fail_writes_after(None);
    let second = completed(harness.worker.run(true).await);
    assert_eq!(second.items_published, 1);
    assert_eq!(second.items_skipped, 0);
    assert_eq!(harness.library.fetches().len(), 2);
    assert_eq!(
        publisher.payload("item1").unwrap(),
        b"jpeg:https://lh3.googleusercontent.com/item1".to_vec()
    );
}

#[tokio::test]
async fn test_non_initial_sync_resumes_from_cursor() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item3")], "TOK3"),
        publisher,
    )
    .await;
    harness
        .cursors
        .save_page_token("album1", Some("TOK2"))
        .await
        .unwrap();
    harness
        .cursors
        .set_last_download_time(T0 - 900_001)
        .await
        .unwrap();

    completed(harness.worker.run(false).await);

    assert_eq!(
        harness.library.searches(),
        vec![("album1".to_string(), Some("TOK2".to_string()))]
    );
    assert_eq!(
        harness.cursors.load_page_token("album1").await.unwrap().as_deref(),
        Some("TOK3")
    );
}

#[tokio::test]
async fn test_gate_rejects_run_five_minutes_after_last_sync() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1")], "TOK2"),
        publisher.clone(),
    )
    .await;
    completed(harness.worker.run(true).await);
    let calls_after_first_run = harness.library.network_calls();
    let mut events = harness.event_bus.subscribe();

    harness.clock.advance(Duration::from_secs(5 * 60));
    let outcome = harness.worker.run(false).await;

    assert!(matches!(outcome, SyncOutcome::Skipped { .. }));
    assert!(outcome.is_success());
    assert_eq!(harness.library.network_calls(), calls_after_first_run);
    assert!(matches!(
        events.recv().await.unwrap(),
        CoreEvent::Sync(SyncEvent::Skipped { .. })
    ));
}

#[tokio::test]
async fn test_cursor_advances_even_when_every_download_fails() {
    let publisher = Arc::new(MemoryPublisher::default());
    let library = ScriptedLibrary::with_page(vec![media_item("item1"), media_item("item2")], "TOK2");
    library.fail_fetch("https://lh3.googleusercontent.com/item1");
    library.fail_fetch("https://lh3.googleusercontent.com/item2");
    let harness = Harness::new(library, publisher.clone()).await;
    harness
        .cursors
        .save_page_token("album1", Some("TOK1"))
        .await
        .unwrap();

    let report = completed(harness.worker.run(false).await);

    assert_eq!(report.items_failed, 2);
    assert_eq!(report.items_published, 0);
    assert!(publisher.adds().is_empty());
    assert_eq!(
        harness.cursors.load_page_token("album1").await.unwrap().as_deref(),
        Some("TOK2")
    );
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), T0);
}

#[tokio::test]
async fn test_one_failing_item_does_not_abort_the_page() {
    let publisher = Arc::new(MemoryPublisher::default());
    let library = ScriptedLibrary::with_page(
        vec![media_item("item1"), media_item("item2"), media_item("item3")],
        "TOK2",
    );
    library.fail_fetch("https://lh3.googleusercontent.com/item2");
    let harness = Harness::new(library, publisher.clone()).await;
    let mut events = harness.event_bus.subscribe();

    let report = completed(harness.worker.run(true).await);

    assert_eq!(report.items_published, 2);
    assert_eq!(report.items_failed, 1);
    assert_eq!(publisher.adds(), vec!["item1".to_string(), "item3".to_string()]);

    let mut failed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let CoreEvent::Artwork(ArtworkEvent::DownloadFailed { token, .. }) = event {
            failed.push(token);
        }
    }
    assert_eq!(failed, vec!["item2".to_string()]);
}

#[tokio::test]
async fn test_rerun_of_downloaded_page_fetches_nothing() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1"), media_item("item2")], "TOK2"),
        publisher.clone(),
    )
    .await;

    completed(harness.worker.run(true).await);
    assert_eq!(harness.library.fetches().len(), 2);

    let report = completed(harness.worker.run(true).await);

    assert_eq!(report.items_skipped, 2);
    assert_eq!(report.items_published, 0);
    assert_eq!(harness.library.fetches().len(), 2, "no new fetch requests");
    assert_eq!(publisher.adds().len(), 2);
}

#[tokio::test]
async fn test_empty_payload_is_downloaded_again() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(T0));
    let store = Arc::new(
        SqliteArtworkStore::in_memory(
            Arc::new(TokioFileSystem::with_data_directory(dir.path().to_path_buf())),
            dir.path().join("artwork"),
            clock.clone(),
        )
        .await
        .unwrap(),
    );

    // A record whose payload write never completed
    let leftover = store
        .add_artwork(&ArtworkRecord::from_media_item(&media_item("item1"), "Google Photos"))
        .await
        .unwrap()
        .unwrap();
    std::fs::create_dir_all(leftover.payload_path.parent().unwrap()).unwrap();
    std::fs::write(&leftover.payload_path, b"").unwrap();

    let harness = Harness::with_clock(
        ScriptedLibrary::with_page(vec![media_item("item1")], ""),
        store.clone(),
        clock,
    )
    .await;

    let report = completed(harness.worker.run(true).await);

    assert_eq!(report.items_published, 1);
    assert_eq!(harness.library.fetches().len(), 1);
    assert_eq!(
        std::fs::read(&leftover.payload_path).unwrap(),
        b"jpeg:https://lh3.googleusercontent.com/item1".to_vec()
    );
    assert_eq!(store.count().await.unwrap(), 1);
    assert_eq!(report.next_page_token, None);
    assert_eq!(harness.cursors.load_page_token("album1").await.unwrap(), None);
}

#[tokio::test]
async fn test_empty_page_is_reported_without_publishing() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(ScriptedLibrary::with_page(Vec::new(), ""), publisher.clone()).await;

    let outcome = harness.worker.run(true).await;

    assert_eq!(
        outcome,
        SyncOutcome::EmptyPage {
            album_id: "album1".to_string()
        }
    );
    assert!(!outcome.is_success());
    assert!(publisher.adds().is_empty());
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), T0);
}

#[tokio::test]
async fn test_page_failure_is_transport_error_and_keeps_cursor() {
    let publisher = Arc::new(MemoryPublisher::default());
    let library = ScriptedLibrary::default();
    library.fail_page_with(503);
    let harness = Harness::new(library, publisher).await;
    harness
        .cursors
        .save_page_token("album1", Some("TOK1"))
        .await
        .unwrap();

    let outcome = harness.worker.run(true).await;

    assert!(matches!(outcome, SyncOutcome::TransportError { .. }));
    assert_eq!(
        harness.cursors.load_page_token("album1").await.unwrap().as_deref(),
        Some("TOK1")
    );
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), 0);
}

#[tokio::test]
async fn test_album_switch_starts_new_album_from_first_page() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1")], "TOK2"),
        publisher,
    )
    .await;
    completed(harness.worker.run(true).await);
    harness
        .cursors
        .save_page_token("album2", Some("LEFTOVER"))
        .await
        .unwrap();

    harness
        .selection
        .save_selected_album(&Album::new("album2"))
        .await
        .unwrap();
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), 0);

    harness.clock.advance(Duration::from_secs(1));
    completed(harness.worker.run(false).await);

    assert_eq!(
        harness.library.searches().last().cloned(),
        Some(("album2".to_string(), None))
    );
}

#[tokio::test]
async fn test_scheduled_load_runs_through_executor() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1")], "TOK2"),
        publisher.clone(),
    )
    .await;
    let executor = Arc::new(TokioBackgroundExecutor::new());
    let commands = SyncCommands::new(executor.clone(), harness.worker.clone());
    commands.register().await.unwrap();

    let task_id = commands.enqueue_load(true).await.unwrap().unwrap();
    assert_eq!(task_id.as_str(), LOAD_TASK_ID);

    let mut status = TaskStatus::Scheduled;
    for _ in 0..100 {
        status = executor.get_task_status(&task_id).await.unwrap();
        if !status.is_active() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(status, TaskStatus::Completed);
    assert_eq!(publisher.adds(), vec!["item1".to_string()]);

    // Within the interval the gate keeps the next load from being scheduled
    harness.clock.advance(Duration::from_secs(60));
    assert_eq!(commands.enqueue_load(false).await.unwrap(), None);
}

#[tokio::test]
async fn test_prune_clears_artwork_and_cursors() {
    let publisher = Arc::new(MemoryPublisher::default());
    let harness = Harness::new(
        ScriptedLibrary::with_page(vec![media_item("item1"), media_item("item2")], "TOK2"),
        publisher.clone(),
    )
    .await;
    completed(harness.worker.run(true).await);
    let commands = SyncCommands::new(Arc::new(TokioBackgroundExecutor::new()), harness.worker.clone());

    assert_eq!(commands.prune().await.unwrap(), 2);

    assert_eq!(publisher.count().await.unwrap(), 0);
    assert_eq!(harness.cursors.load_page_token("album1").await.unwrap(), None);
    assert_eq!(harness.cursors.last_download_time().await.unwrap(), 0);
    assert_eq!(
        harness
            .selection
            .selected_album_id()
            .await
            .unwrap()
            .as_deref(),
        Some("album1"),
        "prune keeps the selected album"
    );
}
