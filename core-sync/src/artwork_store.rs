//! # SQLite Artwork Store
//!
//! Desktop [`ArtworkPublisher`]: records live in an `artworks` table, payloads
//! are files named by the SHA-256 of the artwork token under one directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bridge_traits::storage::FileSystemAccess;
use bridge_traits::time::Clock;
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::FromRow;
use tokio::io::AsyncWrite;
use tracing::{debug, info, warn};

use crate::publisher::{ArtworkHandle, ArtworkPublisher, ArtworkRecord, PublishedArtwork};
use crate::{Result, SyncError};

/// SQLite + file system implementation of [`ArtworkPublisher`]
pub struct SqliteArtworkStore {
    pool: SqlitePool,
    fs: Arc<dyn FileSystemAccess>,
    artwork_dir: PathBuf,
    clock: Arc<dyn Clock>,
}

impl SqliteArtworkStore {
    /// Create a store over an existing pool, creating the table if needed.
    pub async fn new(
        pool: SqlitePool,
        fs: Arc<dyn FileSystemAccess>,
        artwork_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        Self::init_schema(&pool).await?;
        Ok(Self {
            pool,
            fs,
            artwork_dir,
            clock,
        })
    }

    /// Open (or create) the database at `db_path`.
    pub async fn open(
        db_path: &Path,
        fs: Arc<dyn FileSystemAccess>,
        artwork_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            fs.create_dir_all(parent).await?;
        }

        let options = SqliteConnectOptions::new()
            .filename(db_path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.map_err(|e| {
            SyncError::Database(format!("Failed to open artwork database: {}", e))
        })?;

        debug!(path = ?db_path, "Opened artwork database");
        Self::new(pool, fs, artwork_dir, clock).await
    }

    /// In-memory database for tests and throwaway sessions
    pub async fn in_memory(
        fs: Arc<dyn FileSystemAccess>,
        artwork_dir: PathBuf,
        clock: Arc<dyn Clock>,
    ) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await?;
        Self::new(pool, fs, artwork_dir, clock).await
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS artworks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                token TEXT NOT NULL UNIQUE,
                title TEXT NOT NULL,
                byline TEXT,
                attribution TEXT NOT NULL,
                web_uri TEXT NOT NULL,
                persistent_uri TEXT NOT NULL,
                data_path TEXT NOT NULL,
                added_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| SyncError::Database(format!("Failed to create artworks table: {}", e)))?;

        Ok(())
    }

    /// Payload location of `token`
    pub fn payload_path(&self, token: &str) -> PathBuf {
        self.artwork_dir
            .join(format!("{:x}", Sha256::digest(token.as_bytes())))
    }
}

#[derive(Debug, FromRow)]
struct ArtworkRow {
    id: i64,
    token: String,
    title: String,
    byline: Option<String>,
    attribution: String,
    web_uri: String,
    persistent_uri: String,
    data_path: String,
    added_at: i64,
}

impl From<ArtworkRow> for PublishedArtwork {
    fn from(row: ArtworkRow) -> Self {
        PublishedArtwork {
            handle: ArtworkHandle {
                id: row.id,
                payload_path: PathBuf::from(row.data_path),
            },
            record: ArtworkRecord {
                token: row.token,
                title: row.title,
                byline: row.byline,
                attribution: row.attribution,
                web_uri: row.web_uri,
                persistent_uri: row.persistent_uri,
            },
            added_at: row.added_at,
        }
    }
}

#[async_trait]
impl ArtworkPublisher for SqliteArtworkStore {
    async fn add_artwork(&self, record: &ArtworkRecord) -> Result<Option<ArtworkHandle>> {
        if record.token.is_empty() {
            warn!("Refusing artwork without a token");
            return Ok(None);
        }

        let payload_path = self.payload_path(&record.token);
        let data_path = payload_path.to_string_lossy().into_owned();

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO artworks (
                token, title, byline, attribution, web_uri, persistent_uri, data_path, added_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(token) DO UPDATE SET
                title = excluded.title,
                byline = excluded.byline,
                attribution = excluded.attribution,
                web_uri = excluded.web_uri,
                persistent_uri = excluded.persistent_uri,
                data_path = excluded.data_path,
                added_at = excluded.added_at
            RETURNING id
            "#,
        )
        .bind(&record.token)
        .bind(&record.title)
        .bind(&record.byline)
        .bind(&record.attribution)
        .bind(&record.web_uri)
        .bind(&record.persistent_uri)
        .bind(&data_path)
        .bind(self.clock.unix_timestamp_millis())
        .fetch_one(&self.pool)
        .await?;

        debug!(token = %record.token, id, "Registered artwork");
        Ok(Some(ArtworkHandle { id, payload_path }))
    }

    async fn open_output_stream(
        &self,
        handle: &ArtworkHandle,
    ) -> Result<Box<dyn AsyncWrite + Send + Unpin>> {
        Ok(self.fs.open_write_stream(&handle.payload_path).await?)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<PublishedArtwork>> {
        let row: Option<ArtworkRow> = sqlx::query_as(
            r#"
            SELECT id, token, title, byline, attribution, web_uri, persistent_uri, data_path, added_at
            FROM artworks
            WHERE token = ?
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(PublishedArtwork::from))
    }

    async fn payload_exists(&self, handle: &ArtworkHandle) -> Result<bool> {
        if !self.fs.exists(&handle.payload_path).await? {
            return Ok(false);
        }
        let metadata = self.fs.metadata(&handle.payload_path).await?;
        Ok(!metadata.is_directory && metadata.size > 0)
    }

    async fn discard_payload(&self, handle: &ArtworkHandle) -> Result<()> {
        if self.fs.exists(&handle.payload_path).await? {
            self.fs.delete_file(&handle.payload_path).await?;
            debug!(id = handle.id, "Discarded artwork payload");
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM artworks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn clear_all(&self) -> Result<u64> {
        let paths: Vec<String> = sqlx::query_scalar("SELECT data_path FROM artworks")
            .fetch_all(&self.pool)
            .await?;

        for path in &paths {
            let path = Path::new(path);
            match self.fs.exists(path).await {
                Ok(true) => {
                    if let Err(e) = self.fs.delete_file(path).await {
                        warn!(path = ?path, error = %e, "Failed to delete artwork payload");
                    }
                }
                Ok(false) => {}
                Err(e) => warn!(path = ?path, error = %e, "Failed to inspect artwork payload"),
            }
        }

        let removed = sqlx::query("DELETE FROM artworks")
            .execute(&self.pool)
            .await?
            .rows_affected();

        info!(removed, "Cleared published artwork");
        Ok(removed)
    }
}
