//! # Photo Sync Module
//!
//! Pulls photos from the selected Google Photos album into an artwork store.
//!
//! ## Overview
//!
//! Each sync run fetches one page of media items for the selected album,
//! advances the album's cursor and publishes the photos that are not
//! already stored. Runs are throttled by a minimum interval and scheduled
//! as unique background work.
//!
//! ## Components
//!
//! - **Admission Gate** (`gate`): Minimum-interval check in front of every run
//! - **Cursor Store** (`cursor`): Per-album page tokens and the last-sync timestamp
//! - **Album Selection** (`selection`): Persisted selected-album summary
//! - **Artwork Publisher** (`publisher`): Sink contract for published photos
//! - **Artwork Store** (`artwork_store`): SQLite + file system publisher
//! - **Sync Worker** (`orchestrator`): Runs one sync cycle
//! - **Commands** (`commands`): Reload, prune and album selection entry points

pub mod artwork_store;
pub mod commands;
pub mod cursor;
pub mod error;
pub mod gate;
pub mod orchestrator;
pub mod publisher;
pub mod selection;

#[cfg(test)]
mod testing;

pub use artwork_store::SqliteArtworkStore;
pub use commands::{SyncCommands, INPUT_INITIAL, LOAD_TASK_ID};
pub use cursor::{page_token_key, PageTokenStore, KEY_LAST_DOWNLOAD_TS, PAGE_TOKENS_NAMESPACE};
pub use error::{Result, SyncError};
pub use gate::{AdmissionGate, MIN_SYNC_INTERVAL_MS};
pub use orchestrator::{fetch_size_spec, PhotosSyncWorker, SyncConfig, SyncOutcome, SyncReport};
pub use publisher::{ArtworkHandle, ArtworkPublisher, ArtworkRecord, PublishedArtwork};
pub use selection::SelectedAlbumStore;
