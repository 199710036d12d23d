//! # Sync Commands
//!
//! Entry points the host triggers: reload, prune and album selection.
//!
//! Reloads go through the [`BackgroundExecutor`] as unique one-time work
//! under [`LOAD_TASK_ID`], so at most one load is pending or running at a
//! time. The task input carries the `initial` flag.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::background::{
    BackgroundExecutor, TaskConstraints, TaskFuture, TaskHandler, TaskId, TaskInput,
};
use core_runtime::events::{AlbumEvent, ArtworkEvent, CoreEvent};
use provider_google_photos::Album;
use tracing::{debug, info, instrument};

use crate::orchestrator::PhotosSyncWorker;
use crate::Result;

/// Unique work id of the photo load task.
pub const LOAD_TASK_ID: &str = "photos_load";

/// Task input key of the `initial` flag.
pub const INPUT_INITIAL: &str = "initial";

pub struct SyncCommands {
    executor: Arc<dyn BackgroundExecutor>,
    worker: Arc<PhotosSyncWorker>,
}

impl SyncCommands {
    pub fn new(executor: Arc<dyn BackgroundExecutor>, worker: Arc<PhotosSyncWorker>) -> Self {
        Self { executor, worker }
    }

    pub fn worker(&self) -> &Arc<PhotosSyncWorker> {
        &self.worker
    }

    /// Register the load handler with the executor.
    ///
    /// The handler fails the task for every outcome except a completed or
    /// skipped run, leaving retries to the executor.
    pub async fn register(&self) -> Result<()> {
        let worker = Arc::clone(&self.worker);
        let handler: TaskHandler = Arc::new(move |input: TaskInput| {
            let worker = Arc::clone(&worker);
            Box::pin(async move {
                let initial = input.get_bool(INPUT_INITIAL, false);
                worker.run(initial).await.into_task_result()
            }) as TaskFuture
        });

        self.executor.register_handler(LOAD_TASK_ID, handler).await?;
        debug!(task_id = LOAD_TASK_ID, "Registered photo load handler");
        Ok(())
    }

    /// Schedule a photo load.
    ///
    /// Returns `None` without scheduling anything when the admission gate
    /// is closed. The worker checks the gate again when the task runs.
    #[instrument(skip(self))]
    pub async fn enqueue_load(&self, initial: bool) -> Result<Option<TaskId>> {
        if !self.worker.is_sync_allowed(initial).await? {
            info!("Load not scheduled, last sync is too recent");
            return Ok(None);
        }

        let task_id = self
            .executor
            .schedule_once(
                LOAD_TASK_ID,
                Duration::ZERO,
                TaskConstraints::default(),
                TaskInput::new().with_bool(INPUT_INITIAL, initial),
            )
            .await?;

        info!(task_id = task_id.as_str(), "Scheduled photo load");
        Ok(Some(task_id))
    }

    /// Remove all published artwork and reset every cursor.
    pub async fn prune(&self) -> Result<u64> {
        let removed = self.worker.publisher().clear_all().await?;
        self.worker.cursors().clear_all().await?;

        info!(removed, "Pruned published artwork");
        let _ = self
            .worker
            .event_bus()
            .emit(CoreEvent::Artwork(ArtworkEvent::Pruned { removed }));
        Ok(removed)
    }

    /// Make `album` the synced album, starting over from its first page.
    pub async fn select_album(&self, album: &Album) -> Result<()> {
        self.worker.selection().save_selected_album(album).await?;
        let _ = self
            .worker
            .event_bus()
            .emit(CoreEvent::Album(AlbumEvent::Selected {
                album_id: album.id.clone(),
                title: album.title.clone(),
            }));
        Ok(())
    }

    pub async fn selected_album(&self) -> Result<Option<Album>> {
        self.worker.selection().load_selected_album().await
    }

    /// Forget the selected album and every cursor.
    pub async fn clear_album_and_page_tokens(&self) -> Result<()> {
        self.worker.selection().clear_album_and_page_tokens().await?;
        let _ = self
            .worker
            .event_bus()
            .emit(CoreEvent::Album(AlbumEvent::Cleared));
        Ok(())
    }
}
