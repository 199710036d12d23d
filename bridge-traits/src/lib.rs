//! # Host Bridge Traits
//!
//! Platform abstraction traits that must be implemented by each host platform.
//!
//! ## Overview
//!
//! This crate defines the contract between the photo sync core and the
//! platform-specific implementations. Each trait represents a capability the
//! core requires but that a host provides differently (desktop, Android, ...).
//!
//! ## Traits
//!
//! ### Networking & I/O
//! - [`HttpClient`](http::HttpClient) - Async HTTP operations with retry and TLS
//! - [`FileSystemAccess`](storage::FileSystemAccess) - Artwork payload storage
//!
//! ### Storage
//! - [`SettingsStore`](storage::SettingsStore) - Key-value preferences storage with transactions
//!
//! ### Platform Integration
//! - [`NetworkMonitor`](network::NetworkMonitor) - Connectivity detection
//! - [`BackgroundExecutor`](background::BackgroundExecutor) - Unique one-time work honoring constraints
//!
//! ### Utilities
//! - [`Clock`](time::Clock) - Time source for deterministic testing
//! - [`LoggerSink`](time::LoggerSink) - Forward structured logs to host logging
//!
//! ## Platform Requirements
//!
//! | Platform | Implementation Crate | Status |
//! |----------|---------------------|--------|
//! | Desktop  | `bridge-desktop`    | ✅ Available |
//! | Android  | TBD                 | 📋 Planned |
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Platform
//! implementations convert their native errors into it and include context such
//! as file paths or setting keys.
//!
//! ## Thread Safety
//!
//! All bridge traits require `Send + Sync` so a single instance can be shared
//! across async tasks behind an `Arc`.
//!
//! ## Examples
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest};
//!
//! async fn list_albums(client: &dyn HttpClient, token: &str) -> Result<String> {
//!     let request = HttpRequest::new(
//!         HttpMethod::Get,
//!         "https://photoslibrary.googleapis.com/v1/albums?pageSize=36",
//!     )
//!     .bearer_token(token);
//!
//!     client.execute(request).await?.text()
//! }
//! ```

pub mod background;
pub mod error;
pub mod http;
pub mod network;
pub mod storage;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use background::{
    BackgroundExecutor, TaskConstraints, TaskHandler, TaskId, TaskInput, TaskStatus,
};
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType};
pub use storage::{
    FileMetadata, FileSystemAccess, MemorySettingsStore, SettingsStore, SettingsTransaction,
};
pub use time::{Clock, LogEntry, LogLevel, LoggerSink, ManualClock, SystemClock};
