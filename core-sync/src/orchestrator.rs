//! # Photo Sync Orchestrator
//!
//! Runs one sync cycle for the selected album.
//!
//! ## Workflow
//!
//! 1. Check the [`AdmissionGate`] against the last-sync timestamp
//! 2. Resolve the selected album
//! 3. Make sure a fresh access token is available (refreshing if needed)
//! 4. Look up the album's cursor (none for an initial sync)
//! 5. Fetch one page of media items
//! 6. Persist the page's `nextPageToken` and the sync timestamp
//! 7. For each item, in server order: skip it if already published with a
//!    payload, otherwise download it and publish it
//!
//! The cursor and timestamp are written before any download starts. A crash
//! mid-page therefore moves on to the next page instead of delivering the
//! same page again.
//!
//! Per-item failures are logged and counted; they never abort the page.
//! Everything that ends a run early is reported as a [`SyncOutcome`], not
//! as an error, and the host scheduler decides about retries.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_sync::{PhotosSyncWorker, SyncOutcome};
//!
//! # async fn example(worker: &PhotosSyncWorker) {
//! match worker.run(false).await {
//!     SyncOutcome::Completed(report) => println!("published {}", report.items_published),
//!     SyncOutcome::Skipped { remaining_ms, .. } => println!("try again in {remaining_ms} ms"),
//!     other => println!("sync did not complete: {other}"),
//! }
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bridge_traits::error::BridgeError;
use bridge_traits::time::Clock;
use core_auth::AccessTokenProvider;
use core_runtime::config::{
    PhotosConfig, DEFAULT_MIN_SYNC_INTERVAL, DEFAULT_PHOTO_TITLE, DEFAULT_SYNC_PAGE_SIZE,
};
use core_runtime::events::{ArtworkEvent, CoreEvent, EventBus, SyncEvent};
use provider_google_photos::{GooglePhotosError, MediaItem, PhotosLibrary};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::cursor::PageTokenStore;
use crate::gate::AdmissionGate;
use crate::publisher::{ArtworkHandle, ArtworkPublisher, ArtworkRecord};
use crate::selection::SelectedAlbumStore;
use crate::{Result, SyncError};

/// Sync worker configuration
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Media items requested per run
    pub page_size: u32,

    /// Minimum time between two non-initial runs
    pub min_sync_interval: Duration,

    /// Target photo height in pixels; `None` downloads originals
    pub screen_height: Option<u32>,

    /// Artwork title for photos without a description
    pub default_title: String,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_SYNC_PAGE_SIZE,
            min_sync_interval: DEFAULT_MIN_SYNC_INTERVAL,
            screen_height: None,
            default_title: DEFAULT_PHOTO_TITLE.to_string(),
        }
    }
}

impl From<&PhotosConfig> for SyncConfig {
    fn from(config: &PhotosConfig) -> Self {
        Self {
            page_size: config.sync_page_size,
            min_sync_interval: config.min_sync_interval,
            screen_height: config.screen_height,
            default_title: config.default_photo_title.clone(),
        }
    }
}

/// Counters of a run that processed a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub run_id: String,
    pub album_id: String,
    pub items_seen: u64,
    pub items_published: u64,
    /// Already published with an intact payload
    pub items_skipped: u64,
    pub items_failed: u64,
    /// Cursor stored for the next run, `None` after the album's last page
    pub next_page_token: Option<String>,
}

/// How a sync run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The admission gate turned the run away. No network call was made.
    Skipped { last_sync_ms: i64, remaining_ms: i64 },
    /// There is no album to sync.
    NoAlbumSelected,
    /// No fresh access token could be obtained.
    AuthFailed { message: String, recoverable: bool },
    /// The page request failed.
    TransportError { message: String },
    /// Local state could not be read or written.
    StorageError { message: String },
    /// The page had no items.
    EmptyPage { album_id: String },
    /// The page was processed; individual items may still have failed.
    Completed(SyncReport),
}

impl SyncOutcome {
    /// Outcomes the host scheduler should treat as success.
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Completed(_) | SyncOutcome::Skipped { .. })
    }

    /// Coarse success/failure signal for the host scheduler.
    pub fn into_result(self) -> Result<()> {
        if self.is_success() {
            Ok(())
        } else {
            Err(SyncError::Unsuccessful(self.to_string()))
        }
    }

    /// Same as [`into_result`](Self::into_result) in bridge terms, for task handlers.
    pub fn into_task_result(self) -> bridge_traits::error::Result<()> {
        self.into_result().map_err(BridgeError::from)
    }
}

impl fmt::Display for SyncOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncOutcome::Skipped { remaining_ms, .. } => {
                write!(f, "skipped, next sync allowed in {} ms", remaining_ms)
            }
            SyncOutcome::NoAlbumSelected => write!(f, "no album selected"),
            SyncOutcome::AuthFailed { message, .. } => write!(f, "authorization failed: {}", message),
            SyncOutcome::TransportError { message } => write!(f, "page fetch failed: {}", message),
            SyncOutcome::StorageError { message } => write!(f, "storage failed: {}", message),
            SyncOutcome::EmptyPage { album_id } => write!(f, "album {} returned no items", album_id),
            SyncOutcome::Completed(report) => write!(
                f,
                "completed: {} published, {} skipped, {} failed",
                report.items_published, report.items_skipped, report.items_failed
            ),
        }
    }
}

/// Size suffix for a media fetch.
///
/// With a known screen height and item dimensions the width keeps the
/// item's aspect ratio (`w<width>-h<height>`); otherwise the original is
/// requested (`d`).
pub fn fetch_size_spec(dimensions: Option<(u64, u64)>, screen_height: Option<u32>) -> String {
    match (dimensions, screen_height) {
        (Some((width, height)), Some(target_height)) if target_height > 0 && height > 0 => {
            let target_width =
                (f64::from(target_height) * width as f64 / height as f64).round() as u64;
            format!("w{}-h{}", target_width.max(1), target_height)
        }
        _ => "d".to_string(),
    }
}

enum ItemOutcome {
    Published(ArtworkRecord),
    AlreadyPublished,
}

/// Background worker that pulls photos from the selected album.
///
/// Runs are serialized; a run that waited for another one re-checks the
/// admission gate after acquiring the lock.
pub struct PhotosSyncWorker {
    library: Arc<dyn PhotosLibrary>,
    tokens: Arc<dyn AccessTokenProvider>,
    cursors: PageTokenStore,
    selection: SelectedAlbumStore,
    publisher: Arc<dyn ArtworkPublisher>,
    clock: Arc<dyn Clock>,
    event_bus: EventBus,
    gate: AdmissionGate,
    config: SyncConfig,
    run_lock: Mutex<()>,
}

impl PhotosSyncWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        library: Arc<dyn PhotosLibrary>,
        tokens: Arc<dyn AccessTokenProvider>,
        cursors: PageTokenStore,
        selection: SelectedAlbumStore,
        publisher: Arc<dyn ArtworkPublisher>,
        clock: Arc<dyn Clock>,
        event_bus: EventBus,
        config: SyncConfig,
    ) -> Self {
        Self {
            library,
            tokens,
            cursors,
            selection,
            publisher,
            clock,
            event_bus,
            gate: AdmissionGate::new(config.min_sync_interval),
            config,
            run_lock: Mutex::new(()),
        }
    }

    pub fn gate(&self) -> AdmissionGate {
        self.gate
    }

    pub fn cursors(&self) -> &PageTokenStore {
        &self.cursors
    }

    pub fn selection(&self) -> &SelectedAlbumStore {
        &self.selection
    }

    pub fn publisher(&self) -> &Arc<dyn ArtworkPublisher> {
        &self.publisher
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Whether a run with `initial` would currently pass the gate.
    pub async fn is_sync_allowed(&self, initial: bool) -> Result<bool> {
        let last_sync_ms = self.cursors.last_download_time().await?;
        Ok(self
            .gate
            .is_sync_allowed(initial, last_sync_ms, self.clock.unix_timestamp_millis()))
    }

    /// Run one sync cycle.
    ///
    /// `initial` starts the album from its first page and bypasses the gate.
    #[instrument(skip(self))]
    pub async fn run(&self, initial: bool) -> SyncOutcome {
        let _guard = self.run_lock.lock().await;

        let last_sync_ms = match self.cursors.last_download_time().await {
            Ok(ts) => ts,
            Err(e) => return self.storage_failure(None, e),
        };
        let now_ms = self.clock.unix_timestamp_millis();
        if !self.gate.is_sync_allowed(initial, last_sync_ms, now_ms) {
            let remaining_ms = self.gate.remaining_ms(last_sync_ms, now_ms);
            info!(last_sync_ms, remaining_ms, "Sync rejected by admission gate");
            let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Skipped {
                reason: format!("last sync {} ms ago", now_ms.saturating_sub(last_sync_ms)),
            }));
            return SyncOutcome::Skipped {
                last_sync_ms,
                remaining_ms,
            };
        }

        let album_id = match self.selection.selected_album_id().await {
            Ok(Some(id)) => id,
            Ok(None) => {
                info!("No album selected, nothing to sync");
                let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Skipped {
                    reason: "no album selected".to_string(),
                }));
                return SyncOutcome::NoAlbumSelected;
            }
            Err(e) => return self.storage_failure(None, e),
        };

        let run_id = Uuid::new_v4().to_string();
        info!(run_id = %run_id, album_id = %album_id, initial, "Starting photo sync");
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Started {
            run_id: run_id.clone(),
            album_id: album_id.clone(),
            initial,
        }));

        if let Err(e) = self.tokens.access_token().await {
            return self.auth_failure(&run_id, e.to_string(), e.is_recoverable());
        }

        let page_token = if initial {
            None
        } else {
            match self.cursors.load_page_token(&album_id).await {
                Ok(token) => token,
                Err(e) => return self.storage_failure(Some(&run_id), e),
            }
        };

        debug!(album_id = %album_id, has_cursor = page_token.is_some(), "Fetching media page");
        let page = match self
            .library
            .search_media_items(&album_id, self.config.page_size, page_token.as_deref())
            .await
        {
            Ok(page) => page,
            Err(GooglePhotosError::Auth(e)) => {
                return self.auth_failure(&run_id, e.to_string(), e.is_recoverable());
            }
            Err(e) => {
                warn!(run_id = %run_id, error = %e, "Failed to fetch media page");
                let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Failed {
                    run_id: Some(run_id),
                    message: e.to_string(),
                    recoverable: true,
                }));
                return SyncOutcome::TransportError {
                    message: e.to_string(),
                };
            }
        };

        let next_page_token = Some(page.next_page_token.clone()).filter(|t| !t.is_empty());
        if let Err(e) = self
            .cursors
            .save_page_token(&album_id, next_page_token.as_deref())
            .await
        {
            return self.storage_failure(Some(&run_id), e);
        }
        if let Err(e) = self
            .cursors
            .set_last_download_time(self.clock.unix_timestamp_millis())
            .await
        {
            return self.storage_failure(Some(&run_id), e);
        }

        if page.media_items.is_empty() {
            info!(run_id = %run_id, album_id = %album_id, "Page has no media items");
            let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Failed {
                run_id: Some(run_id),
                message: "no new photos".to_string(),
                recoverable: true,
            }));
            return SyncOutcome::EmptyPage { album_id };
        }

        let mut report = SyncReport {
            run_id: run_id.clone(),
            album_id,
            items_seen: page.media_items.len() as u64,
            items_published: 0,
            items_skipped: 0,
            items_failed: 0,
            next_page_token,
        };

        for item in &page.media_items {
            match self.sync_item(item).await {
                Ok(ItemOutcome::Published(record)) => {
                    report.items_published += 1;
                    let _ = self.event_bus.emit(CoreEvent::Artwork(ArtworkEvent::Published {
                        token: record.token,
                        title: record.title,
                    }));
                }
                Ok(ItemOutcome::AlreadyPublished) => {
                    report.items_skipped += 1;
                }
                Err(e) => {
                    report.items_failed += 1;
                    warn!(run_id = %run_id, media_item_id = %item.id, error = %e, "Failed to publish photo");
                    let _ = self.event_bus.emit(CoreEvent::Artwork(ArtworkEvent::DownloadFailed {
                        token: item.id.clone(),
                        message: e.to_string(),
                    }));
                }
            }
        }

        info!(
            run_id = %run_id,
            published = report.items_published,
            skipped = report.items_skipped,
            failed = report.items_failed,
            has_more = report.next_page_token.is_some(),
            "Photo sync completed"
        );
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Completed {
            run_id,
            items_seen: report.items_seen,
            items_published: report.items_published,
            items_skipped: report.items_skipped,
            items_failed: report.items_failed,
            has_more: report.next_page_token.is_some(),
        }));

        SyncOutcome::Completed(report)
    }

    async fn sync_item(&self, item: &MediaItem) -> Result<ItemOutcome> {
        if let Some(existing) = self.publisher.find_by_token(&item.id).await? {
            if self.publisher.payload_exists(&existing.handle).await? {
                debug!(media_item_id = %item.id, "Already published");
                return Ok(ItemOutcome::AlreadyPublished);
            }
            debug!(media_item_id = %item.id, "Published earlier but payload is missing");
        }

        let size_spec = fetch_size_spec(item.media_metadata.dimensions(), self.config.screen_height);
        let bytes = self.library.fetch_media(&item.base_url, &size_spec).await?;

        let record = ArtworkRecord::from_media_item(item, &self.config.default_title);
        let handle = self.publisher.add_artwork(&record).await?.ok_or_else(|| {
            SyncError::ArtworkStore(format!("Artwork {} was not accepted", record.token))
        })?;

        if let Err(e) = self.write_payload(&handle, &bytes).await {
            // A partial payload would pass the dedup check on later runs.
            if let Err(discard) = self.publisher.discard_payload(&handle).await {
                warn!(media_item_id = %item.id, error = %discard, "Failed to discard partial payload");
            }
            return Err(e);
        }

        debug!(media_item_id = %item.id, bytes = bytes.len(), size_spec = %size_spec, "Published photo");
        Ok(ItemOutcome::Published(record))
    }

    async fn write_payload(&self, handle: &ArtworkHandle, bytes: &[u8]) -> Result<()> {
        let mut output = self.publisher.open_output_stream(handle).await?;
        output.write_all(bytes).await.map_err(BridgeError::Io)?;
        output.shutdown().await.map_err(BridgeError::Io)?;
        Ok(())
    }

    fn auth_failure(&self, run_id: &str, message: String, recoverable: bool) -> SyncOutcome {
        warn!(run_id = %run_id, error = %message, recoverable, "Sync authorization failed");
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Failed {
            run_id: Some(run_id.to_string()),
            message: message.clone(),
            recoverable,
        }));
        SyncOutcome::AuthFailed {
            message,
            recoverable,
        }
    }

    fn storage_failure(&self, run_id: Option<&str>, error: SyncError) -> SyncOutcome {
        warn!(run_id = ?run_id, error = %error, "Sync state storage failed");
        let _ = self.event_bus.emit(CoreEvent::Sync(SyncEvent::Failed {
            run_id: run_id.map(str::to_string),
            message: error.to_string(),
            recoverable: true,
        }));
        SyncOutcome::StorageError {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{worker_with, CountingLibrary};
    use bridge_traits::time::ManualClock;

    fn worker(library: Arc<CountingLibrary>, clock: Arc<ManualClock>) -> PhotosSyncWorker {
        worker_with(library, clock)
    }

    #[test]
    fn test_fetch_size_spec_keeps_aspect_ratio() {
        assert_eq!(fetch_size_spec(Some((4000, 3000)), Some(1920)), "w2560-h1920");
        assert_eq!(fetch_size_spec(Some((3000, 4000)), Some(1920)), "w1440-h1920");
        assert_eq!(fetch_size_spec(Some((1000, 3)), Some(2)), "w667-h2");
    }

    #[test]
    fn test_fetch_size_spec_falls_back_to_original() {
        assert_eq!(fetch_size_spec(None, Some(1920)), "d");
        assert_eq!(fetch_size_spec(Some((4000, 3000)), None), "d");
        assert_eq!(fetch_size_spec(Some((4000, 3000)), Some(0)), "d");
    }

    #[test]
    fn test_outcome_task_mapping() {
        let skipped = SyncOutcome::Skipped {
            last_sync_ms: 0,
            remaining_ms: 10,
        };
        assert!(skipped.into_task_result().is_ok());
        assert!(SyncOutcome::NoAlbumSelected.into_result().is_err());
        assert!(SyncOutcome::EmptyPage {
            album_id: "a".into()
        }
        .into_task_result()
        .is_err());
        assert!(matches!(
            SyncOutcome::TransportError {
                message: "reset".into()
            }
            .into_result(),
            Err(SyncError::Unsuccessful(_))
        ));
    }

    #[tokio::test]
    async fn test_no_album_selected() {
        let library = Arc::new(CountingLibrary::default());
        let worker = worker(library.clone(), Arc::new(ManualClock::new(10_000_000)));

        assert_eq!(worker.run(true).await, SyncOutcome::NoAlbumSelected);
        assert_eq!(library.calls(), 0);
    }

    #[tokio::test]
    async fn test_auth_failure_stops_before_page_fetch() {
        let library = Arc::new(CountingLibrary::default());
        let worker = worker(library.clone(), Arc::new(ManualClock::new(10_000_000)));
        worker
            .selection()
            .save_selected_album(&provider_google_photos::Album::new("album1"))
            .await
            .unwrap();
        let mut events = worker.event_bus().subscribe();

        let outcome = worker.run(true).await;

        assert!(matches!(
            outcome,
            SyncOutcome::AuthFailed {
                recoverable: false,
                ..
            }
        ));
        assert_eq!(library.calls(), 0);
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Started { .. })
        ));
        assert!(matches!(
            events.recv().await.unwrap(),
            CoreEvent::Sync(SyncEvent::Failed {
                recoverable: false,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_gate_rejection_reports_remaining_time() {
        let library = Arc::new(CountingLibrary::default());
        let clock = Arc::new(ManualClock::new(10_000_000));
        let worker = worker(library.clone(), clock.clone());
        worker
            .cursors()
            .set_last_download_time(10_000_000 - 300_000)
            .await
            .unwrap();

        assert!(!worker.is_sync_allowed(false).await.unwrap());
        assert_eq!(
            worker.run(false).await,
            SyncOutcome::Skipped {
                last_sync_ms: 9_700_000,
                remaining_ms: 600_001,
            }
        );
        assert_eq!(library.calls(), 0);
    }
}
