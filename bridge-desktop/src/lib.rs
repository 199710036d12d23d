//! # Desktop Bridge Implementations
//!
//! Default implementations of bridge traits for desktop platforms
//! (macOS, Windows, Linux).
//!
//! ## Overview
//!
//! - `HttpClient` using `reqwest` with retry of transient failures
//! - `FileSystemAccess` using `tokio::fs`
//! - `SettingsStore` using a SQLite-backed key-value table with namespaces
//! - `NetworkMonitor` using a TCP reachability probe
//! - `BackgroundExecutor` running unique one-time work on the Tokio runtime
//!
//! ## Usage
//!
//! ```ignore
//! use bridge_desktop::{ReqwestHttpClient, SqliteSettingsStore, TokioFileSystem};
//!
//! #[tokio::main]
//! async fn main() -> bridge_traits::error::Result<()> {
//!     let http_client = ReqwestHttpClient::new();
//!     let fs = TokioFileSystem::new();
//!     let prefs = SqliteSettingsStore::new(TokioFileSystem::default_data_dir().join("settings.db")).await?;
//!     let page_tokens = prefs.scoped("album_photos_page_tokens")?;
//!
//!     // Hand the bridges to core-service
//!     Ok(())
//! }
//! ```

mod background;
mod filesystem;
mod http;
mod network;
mod settings;

pub use background::{TokioBackgroundExecutor, DEFAULT_CONSTRAINT_RETRY};
pub use filesystem::TokioFileSystem;
pub use http::ReqwestHttpClient;
pub use network::{DesktopNetworkMonitor, DEFAULT_PROBE_TARGET};
pub use settings::{SqliteSettingsStore, DEFAULT_NAMESPACE};
