//! Settings Storage using SQLite

use async_trait::async_trait;
use bridge_traits::{
    error::{BridgeError, Result},
    storage::{SettingsStore, SettingsTransaction},
};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions},
    Row,
};
use std::path::PathBuf;
use tracing::{debug, error};

/// Namespace used when a store is opened without an explicit scope
pub const DEFAULT_NAMESPACE: &str = "default";

/// SQLite-backed settings store implementation
///
/// Provides persistent key-value storage using SQLite:
/// - Type-checked value storage
/// - Transactional updates
/// - Independent namespaces sharing one database (see [`scoped`](Self::scoped))
#[derive(Clone)]
pub struct SqliteSettingsStore {
    pool: SqlitePool,
    namespace: String,
}

impl SqliteSettingsStore {
    /// Create a new settings store with the given database path
    pub async fn new(db_path: PathBuf) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(BridgeError::Io)?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::init_schema(&pool).await?;

        debug!(path = ?db_path, "Initialized settings store");

        Ok(Self {
            pool,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Create an in-memory settings store (for testing)
    pub async fn in_memory() -> Result<Self> {
        // A single connection keeps every query on the same in-memory database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to connect to DB: {}", e)))?;

        Self::init_schema(&pool).await?;

        Ok(Self {
            pool,
            namespace: DEFAULT_NAMESPACE.to_string(),
        })
    }

    /// Open another namespace backed by the same database
    ///
    /// Namespaces are isolated: `clear_all` and `list_keys` only see the
    /// keys of their own namespace.
    pub fn scoped(&self, namespace: &str) -> Result<Self> {
        let valid = !namespace.is_empty()
            && namespace
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.');
        if !valid {
            return Err(BridgeError::InvalidInput(format!(
                "Invalid settings namespace: {:?}",
                namespace
            )));
        }

        Ok(Self {
            pool: self.pool.clone(),
            namespace: namespace.to_string(),
        })
    }

    /// Name of the namespace this store reads and writes
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    async fn init_schema(pool: &SqlitePool) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS settings (
                namespace TEXT NOT NULL,
                key TEXT NOT NULL,
                value TEXT NOT NULL,
                value_type TEXT NOT NULL,
                updated_at INTEGER NOT NULL,
                PRIMARY KEY (namespace, key)
            )
            "#,
        )
        .execute(pool)
        .await
        .map_err(|e| BridgeError::OperationFailed(format!("Failed to create table: {}", e)))?;

        Ok(())
    }

    /// Get the current Unix timestamp
    fn now() -> i64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or_default()
    }

    /// Set a value with type information
    async fn set_value(&self, key: &str, value: &str, value_type: &str) -> Result<()> {
        sqlx::query(UPSERT_SQL)
            .bind(&self.namespace)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(Self::now())
            .execute(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        debug!(namespace = %self.namespace, key = key, value_type = value_type, "Stored setting");
        Ok(())
    }

    /// Get a value and verify its type
    async fn get_value(&self, key: &str, expected_type: &str) -> Result<Option<String>> {
        let row = sqlx::query("SELECT value, value_type FROM settings WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to get setting: {}", e)))?;

        match row {
            Some(row) => {
                let value: String = row.get(0);
                let value_type: String = row.get(1);

                if value_type != expected_type {
                    error!(
                        namespace = %self.namespace,
                        key = key,
                        expected = expected_type,
                        actual = value_type,
                        "Type mismatch"
                    );
                    return Err(BridgeError::OperationFailed(format!(
                        "Type mismatch: expected {}, got {}",
                        expected_type, value_type
                    )));
                }

                Ok(Some(value))
            }
            None => Ok(None),
        }
    }
}

const UPSERT_SQL: &str = r#"
    INSERT INTO settings (namespace, key, value, value_type, updated_at)
    VALUES (?, ?, ?, ?, ?)
    ON CONFLICT(namespace, key) DO UPDATE SET
        value = excluded.value,
        value_type = excluded.value_type,
        updated_at = excluded.updated_at
"#;

#[async_trait]
impl SettingsStore for SqliteSettingsStore {
    async fn set_string(&self, key: &str, value: &str) -> Result<()> {
        self.set_value(key, value, "string").await
    }

    async fn get_string(&self, key: &str) -> Result<Option<String>> {
        self.get_value(key, "string").await
    }

    async fn set_i64(&self, key: &str, value: i64) -> Result<()> {
        self.set_value(key, &value.to_string(), "i64").await
    }

    async fn get_i64(&self, key: &str) -> Result<Option<i64>> {
        match self.get_value(key, "i64").await? {
            Some(s) => Ok(Some(s.parse().map_err(|e| {
                BridgeError::OperationFailed(format!("Parse error: {}", e))
            })?)),
            None => Ok(None),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to delete setting: {}", e))
            })?;

        debug!(namespace = %self.namespace, key = key, "Deleted setting");
        Ok(())
    }

    async fn has_key(&self, key: &str) -> Result<bool> {
        let row = sqlx::query("SELECT 1 FROM settings WHERE namespace = ? AND key = ?")
            .bind(&self.namespace)
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to check key: {}", e)))?;

        Ok(row.is_some())
    }

    async fn list_keys(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT key FROM settings WHERE namespace = ? ORDER BY key")
            .bind(&self.namespace)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to list keys: {}", e)))?;

        let keys = rows.into_iter().map(|row| row.get(0)).collect();
        Ok(keys)
    }

    async fn clear_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM settings WHERE namespace = ?")
            .bind(&self.namespace)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to clear settings: {}", e))
            })?;

        debug!(namespace = %self.namespace, "Cleared all settings");
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<Box<dyn SettingsTransaction + Send>> {
        let tx = self.pool.begin().await.map_err(|e| {
            BridgeError::OperationFailed(format!("Failed to begin transaction: {}", e))
        })?;

        Ok(Box::new(SqliteSettingsTransaction {
            tx: Some(tx),
            namespace: self.namespace.clone(),
        }))
    }
}

/// SQLite settings transaction
struct SqliteSettingsTransaction {
    tx: Option<sqlx::Transaction<'static, sqlx::Sqlite>>,
    namespace: String,
}

impl SqliteSettingsTransaction {
    fn active(&mut self) -> Result<&mut sqlx::Transaction<'static, sqlx::Sqlite>> {
        self.tx.as_mut().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })
    }

    async fn upsert(&mut self, key: &str, value: &str, value_type: &str) -> Result<()> {
        let namespace = self.namespace.clone();
        let tx = self.active()?;

        sqlx::query(UPSERT_SQL)
            .bind(namespace)
            .bind(key)
            .bind(value)
            .bind(value_type)
            .bind(SqliteSettingsStore::now())
            .execute(&mut **tx)
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to set setting: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl SettingsTransaction for SqliteSettingsTransaction {
    async fn set_string(&mut self, key: &str, value: &str) -> Result<()> {
        self.upsert(key, value, "string").await
    }

    async fn set_i64(&mut self, key: &str, value: i64) -> Result<()> {
        self.upsert(key, &value.to_string(), "i64").await
    }

    async fn delete(&mut self, key: &str) -> Result<()> {
        let namespace = self.namespace.clone();
        let tx = self.active()?;

        sqlx::query("DELETE FROM settings WHERE namespace = ? AND key = ?")
            .bind(namespace)
            .bind(key)
            .execute(&mut **tx)
            .await
            .map_err(|e| {
                BridgeError::OperationFailed(format!("Failed to delete setting: {}", e))
            })?;

        Ok(())
    }

    async fn commit(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.commit()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to commit: {}", e)))?;

        debug!(namespace = %self.namespace, "Committed transaction");
        Ok(())
    }

    async fn rollback(mut self: Box<Self>) -> Result<()> {
        let tx = self.tx.take().ok_or_else(|| {
            BridgeError::OperationFailed("Transaction already committed".to_string())
        })?;

        tx.rollback()
            .await
            .map_err(|e| BridgeError::OperationFailed(format!("Failed to rollback: {}", e)))?;

        debug!(namespace = %self.namespace, "Rolled back transaction");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_string_operations() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("test_key", "test_value").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, Some("test_value".to_string()));

        store.delete("test_key").await.unwrap();
        let value = store.get_string("test_key").await.unwrap();
        assert_eq!(value, None);
    }

    #[tokio::test]
    async fn test_typed_operations() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_i64("auth_token_expires_at", 42).await.unwrap();
        assert_eq!(
            store.get_i64("auth_token_expires_at").await.unwrap(),
            Some(42)
        );
        assert!(store.get_string("auth_token_expires_at").await.is_err());
    }

    #[tokio::test]
    async fn test_list_keys() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();

        store.set_string("key1", "value1").await.unwrap();
        store.set_string("key2", "value2").await.unwrap();

        let keys = store.list_keys().await.unwrap();
        assert_eq!(keys, vec!["key1", "key2"]);
    }

    #[tokio::test]
    async fn test_namespaces_are_isolated() {
        let prefs = SqliteSettingsStore::in_memory().await.unwrap();
        let tokens = prefs.scoped("album_photos_page_tokens").unwrap();

        prefs.set_string("selected_album_id", "a1").await.unwrap();
        tokens
            .set_string("photos_page_token_a1", "cursor")
            .await
            .unwrap();

        assert_eq!(prefs.list_keys().await.unwrap(), vec!["selected_album_id"]);
        assert_eq!(
            tokens.list_keys().await.unwrap(),
            vec!["photos_page_token_a1"]
        );

        tokens.clear_all().await.unwrap();
        assert!(tokens.list_keys().await.unwrap().is_empty());
        assert_eq!(
            prefs.get_string("selected_album_id").await.unwrap(),
            Some("a1".to_string())
        );
    }

    #[test]
    fn test_scoped_rejects_bad_names() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let store = rt.block_on(SqliteSettingsStore::in_memory()).unwrap();

        assert!(store.scoped("").is_err());
        assert!(store.scoped("bad name;").is_err());
        assert_eq!(store.scoped("a-b.c_1").unwrap().namespace(), "a-b.c_1");
    }

    #[tokio::test]
    async fn test_transaction_commit_and_rollback() {
        let store = SqliteSettingsStore::in_memory().await.unwrap();
        store.set_string("auth_refresh_token", "old").await.unwrap();

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("auth_access_token", "new").await.unwrap();
        tx.set_i64("auth_token_expires_in", 3600).await.unwrap();
        tx.delete("auth_refresh_token").await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(
            store.get_string("auth_access_token").await.unwrap(),
            Some("new".to_string())
        );
        assert_eq!(
            store.get_i64("auth_token_expires_in").await.unwrap(),
            Some(3600)
        );
        assert!(!store.has_key("auth_refresh_token").await.unwrap());

        let mut tx = store.begin_transaction().await.unwrap();
        tx.set_string("auth_access_token", "discarded").await.unwrap();
        tx.rollback().await.unwrap();

        assert_eq!(
            store.get_string("auth_access_token").await.unwrap(),
            Some("new".to_string())
        );
    }
}
