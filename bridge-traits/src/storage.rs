//! Storage and File System Abstractions
//!
//! Provides platform-agnostic traits for artwork payload I/O and key-value
//! settings storage.

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{BridgeError, Result};

/// File metadata information
#[derive(Debug, Clone)]
pub struct FileMetadata {
    pub size: u64,
    pub created_at: Option<i64>,
    pub modified_at: Option<i64>,
    pub is_directory: bool,
}

/// File system access trait
///
/// Abstracts file I/O operations to support different platforms:
/// - Desktop: Direct filesystem access
/// - Android: App-private storage
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::FileSystemAccess;
///
/// async fn store_payload(fs: &dyn FileSystemAccess, data: &[u8]) -> Result<()> {
///     let dir = fs.get_data_directory().await?.join("artwork");
///     fs.create_dir_all(&dir).await?;
///     fs.write_file(&dir.join("payload"), data.to_vec().into()).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait FileSystemAccess: Send + Sync {
    /// Get the application's data directory
    ///
    /// This directory is suitable for persistent application data.
    async fn get_data_directory(&self) -> Result<PathBuf>;

    /// Check if a file or directory exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Get metadata for a file or directory
    async fn metadata(&self, path: &Path) -> Result<FileMetadata>;

    /// Create a directory and all parent directories if they don't exist
    async fn create_dir_all(&self, path: &Path) -> Result<()>;

    /// Read entire file contents into memory
    async fn read_file(&self, path: &Path) -> Result<Bytes>;

    /// Write data to a file, creating or truncating it
    async fn write_file(&self, path: &Path, data: Bytes) -> Result<()>;

    /// Delete a file
    async fn delete_file(&self, path: &Path) -> Result<()>;

    /// Delete a directory and all its contents
    async fn delete_dir_all(&self, path: &Path) -> Result<()>;

    /// List all entries in a directory
    async fn list_directory(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Open a file for streaming writes, truncating existing content
    async fn open_write_stream(
        &self,
        path: &Path,
    ) -> Result<Box<dyn tokio::io::AsyncWrite + Send + Unpin>>;
}

/// Key-value settings storage trait
///
/// Abstracts platform-specific preferences storage:
/// - Android: SharedPreferences
/// - Desktop: SQLite-backed settings table
///
/// A store instance is one namespace. Hosts that need several namespaces
/// (for example the per-album page tokens) hand out several instances.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::storage::SettingsStore;
///
/// async fn remember_album(store: &dyn SettingsStore) -> Result<()> {
///     store.set_string("selected_album_id", "album-1").await?;
///     store.set_i64("selected_album_mediaItemsCount", 12).await?;
///     Ok(())
/// }
/// ```
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Store a string value
    async fn set_string(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a string value
    async fn get_string(&self, key: &str) -> Result<Option<String>>;

    /// Store an integer value
    async fn set_i64(&self, key: &str, value: i64) -> Result<()>;

    /// Retrieve an integer value
    async fn get_i64(&self, key: &str) -> Result<Option<i64>>;

    /// Delete a setting
    async fn delete(&self, key: &str) -> Result<()>;

    /// Check if a setting exists
    async fn has_key(&self, key: &str) -> Result<bool>;

    /// List all setting keys
    async fn list_keys(&self) -> Result<Vec<String>>;

    /// Clear all settings in this namespace
    async fn clear_all(&self) -> Result<()>;

    /// Begin a transaction for atomic updates
    ///
    /// Changes become visible on `commit`; `rollback` or dropping the
    /// transaction discards them.
    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>>;
}

/// Transaction for atomic settings updates
#[async_trait]
pub trait SettingsTransaction: Send {
    /// Set a string value within the transaction
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Set an integer value within the transaction
    async fn set_i64(&mut self, key: &str, value: i64) -> Result<()>;

    /// Delete a key within the transaction
    async fn delete(&mut self, key: &str) -> Result<()>;

    /// Commit the transaction
    async fn commit(self: Box<Self>) -> Result<()>;

    /// Rollback the transaction
    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
enum StoredValue {
    Text(String),
    Integer(i64),
}

fn type_mismatch(key: &str, expected: &str, actual: &StoredValue) -> BridgeError {
    let actual = match actual {
        StoredValue::Text(_) => "string",
        StoredValue::Integer(_) => "i64",
    };
    BridgeError::OperationFailed(format!(
        "Type mismatch for {}: expected {}, got {}",
        key, expected, actual
    ))
}

/// In-memory settings store for testing/development
///
/// Values are typed: reading an integer key with `get_string` (or the
/// reverse) is an error, matching the desktop store's type checks.
#[derive(Debug, Clone, Default)]
pub struct MemorySettingsStore {
    values: Arc<Mutex<HashMap<String, StoredValue>>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), StoredValue::Text(value.to_string()));
        Ok(())
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        match self.values.lock().await.get(key) {
            Some(StoredValue::Text(value)) => Ok(Some(value.clone())),
            Some(other) => Err(type_mismatch(key, "string", other)),
            None => Ok(None),
        }
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), StoredValue::Integer(value));
        Ok(())
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.values.lock().await.get(key) {
            Some(StoredValue::Integer(value)) => Ok(Some(*value)),
            Some(other) => Err(type_mismatch(key, "i64", other)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        Ok(self.values.lock().await.contains_key(key))
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let mut keys: Vec<String> = self.values.lock().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn clear_all(&self) -> Result<()> {
        self.values.lock().await.clear();
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        Ok(Box::new(MemorySettingsTransaction {
            values: Arc::clone(&self.values),
            pending: Vec::new(),
        }))
    }
}

struct MemorySettingsTransaction {
    values: Arc<Mutex<HashMap<String, StoredValue>>>,
    pending: Vec<(String, Option<StoredValue>)>,
}

#[async_trait]
impl SettingsTransaction for MemorySettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.pending
            .push((key.to_string(), Some(StoredValue::Text(value.to_string()))));
        Ok(())
    }

    async fn set_i64(&mut self, key: &str, value: i64) -> Result<()> {
        self.pending
            .push((key.to_string(), Some(StoredValue::Integer(value))));
        Ok(())
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        self.pending.push((key.to_string(), None));
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut values = self.values.lock().await;
        for (key, value) in self.pending {
            match value {
                Some(value) => {
                    values.insert(key, value);
                }
                None => {
                    values.remove(&key);
                }
            }
        }
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}
