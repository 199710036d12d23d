//! # Event Bus System
//!
//! Provides an event-driven architecture for the photo sync core using `tokio::sync::broadcast`.
//! Modules publish typed events; hosts subscribe to surface progress or diagnostics.
//!
//! ## Overview
//!
//! - **Event Types**: Strongly-typed enums per domain (auth, sync, artwork, album)
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐     emit      ┌───────────┐
//! │ Token Manager├──────────────>│           │     subscribe    ┌────────────┐
//! └──────────────┘               │ EventBus  ├─────────────────>│ Subscriber │
//! ┌──────────────┐     emit      │ (broadcast│                  └────────────┘
//! │ Sync Worker  ├──────────────>│  channel) │
//! └──────────────┘               └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{CoreEvent, EventBus, SyncEvent};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let event_bus = EventBus::new(100);
//! let mut stream = event_bus.subscribe();
//!
//! event_bus
//!     .emit(CoreEvent::Sync(SyncEvent::Skipped {
//!         reason: "throttled".to_string(),
//!     }))
//!     .ok();
//!
//! let event = stream.recv().await.unwrap();
//! assert!(matches!(event, CoreEvent::Sync(SyncEvent::Skipped { .. })));
//! # }
//! ```
//!
//! ## Error Handling
//!
//! - **`RecvError::Lagged(n)`**: Subscriber was too slow and missed `n` events.
//! - **`RecvError::Closed`**: All senders have been dropped.
//!
//! Emitting without subscribers returns an error that publishers ignore.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

/// Default buffer size for the event bus channel.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Authentication-related events
    Auth(AuthEvent),
    /// Sync run events
    Sync(SyncEvent),
    /// Published artwork events
    Artwork(ArtworkEvent),
    /// Album selection events
    Album(AlbumEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Auth(e) => e.description(),
            CoreEvent::Sync(e) => e.description(),
            CoreEvent::Artwork(e) => e.description(),
            CoreEvent::Album(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Auth(AuthEvent::AuthError { .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { recoverable: false, .. }) => EventSeverity::Error,
            CoreEvent::Sync(SyncEvent::Failed { .. }) => EventSeverity::Warning,
            CoreEvent::Artwork(ArtworkEvent::DownloadFailed { .. }) => EventSeverity::Warning,
            CoreEvent::Auth(AuthEvent::SignedIn { .. })
            | CoreEvent::Sync(SyncEvent::Completed { .. })
            | CoreEvent::Artwork(ArtworkEvent::Pruned { .. })
            | CoreEvent::Album(AlbumEvent::Selected { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Authentication Events
// ============================================================================

/// Events related to the OAuth token lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AuthEvent {
    /// An authorization code was exchanged for tokens.
    SignedIn {
        /// Expiry of the new access token (Unix epoch milliseconds).
        expires_at: i64,
    },
    /// Access token is being refreshed.
    TokenRefreshing,
    /// Token refresh completed successfully.
    TokenRefreshed {
        /// Expiry of the refreshed access token (Unix epoch milliseconds).
        expires_at: i64,
    },
    /// Authentication error occurred.
    AuthError {
        /// Human-readable error message.
        message: String,
        /// Whether the error is recoverable (e.g., retry possible).
        recoverable: bool,
    },
}

impl AuthEvent {
    fn description(&self) -> &str {
        match self {
            AuthEvent::SignedIn { .. } => "Signed in to Google Photos",
            AuthEvent::TokenRefreshing => "Refreshing access token",
            AuthEvent::TokenRefreshed { .. } => "Token refreshed successfully",
            AuthEvent::AuthError { .. } => "Authentication error",
        }
    }
}

// ============================================================================
// Sync Events
// ============================================================================

/// Events emitted by photo sync runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SyncEvent {
    /// A sync run passed admission and started.
    Started {
        /// Unique identifier for this run.
        run_id: String,
        /// Album being synced.
        album_id: String,
        /// Whether the run starts the album from its first page.
        initial: bool,
    },
    /// A sync run was not admitted.
    Skipped {
        /// Why the run did not proceed.
        reason: String,
    },
    /// Sync run finished its page.
    Completed {
        /// The run identifier.
        run_id: String,
        /// Items returned by the page.
        items_seen: u64,
        /// Items published as new artwork.
        items_published: u64,
        /// Items skipped because they were already published.
        items_skipped: u64,
        /// Items whose download or publish failed.
        items_failed: u64,
        /// Whether another page remains for the album.
        has_more: bool,
    },
    /// Sync run stopped before processing items.
    Failed {
        /// The run identifier, when the run got far enough to have one.
        run_id: Option<String>,
        /// Human-readable error message.
        message: String,
        /// Whether a later run may succeed without user action.
        recoverable: bool,
    },
}

impl SyncEvent {
    fn description(&self) -> &str {
        match self {
            SyncEvent::Started { .. } => "Sync started",
            SyncEvent::Skipped { .. } => "Sync skipped",
            SyncEvent::Completed { .. } => "Sync completed",
            SyncEvent::Failed { .. } => "Sync failed",
        }
    }
}

// ============================================================================
// Artwork Events
// ============================================================================

/// Events related to published artwork.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum ArtworkEvent {
    /// A photo was published as artwork.
    Published {
        /// Media item id used as the artwork token.
        token: String,
        /// Artwork title.
        title: String,
    },
    /// A photo could not be fetched or stored.
    DownloadFailed {
        /// Media item id.
        token: String,
        /// Human-readable error message.
        message: String,
    },
    /// All published artwork and cursors were cleared.
    Pruned {
        /// Number of artwork records removed.
        removed: u64,
    },
}

impl ArtworkEvent {
    fn description(&self) -> &str {
        match self {
            ArtworkEvent::Published { .. } => "Artwork published",
            ArtworkEvent::DownloadFailed { .. } => "Artwork download failed",
            ArtworkEvent::Pruned { .. } => "Artwork pruned",
        }
    }
}

// ============================================================================
// Album Events
// ============================================================================

/// Events related to album selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum AlbumEvent {
    /// The user selected an album to sync.
    Selected {
        /// Album id.
        album_id: String,
        /// Album title.
        title: String,
    },
    /// The selected album and all cursors were cleared.
    Cleared,
}

impl AlbumEvent {
    fn description(&self) -> &str {
        match self {
            AlbumEvent::Selected { .. } => "Album selected",
            AlbumEvent::Cleared => "Album selection cleared",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central event bus for publishing and subscribing to events.
///
/// Uses `tokio::sync::broadcast` internally, which provides:
/// - Multiple producers (clone the `EventBus`)
/// - Multiple consumers (each `subscribe()` creates a new receiver)
/// - Non-blocking sends (events are cloned for each subscriber)
/// - Lagging detection (slow subscribers get `RecvError::Lagged`)
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
///
/// // Subscribe to events
/// let mut subscriber1 = event_bus.subscribe();
/// let mut subscriber2 = event_bus.subscribe();
///
/// // Emit an event
/// let event = CoreEvent::Auth(AuthEvent::SignedIn { expires_at: 1_700_000_000_000 });
/// event_bus.emit(event).ok();
///
/// // Both subscribers receive the event
/// # tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
/// # }
/// ```
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    ///
    /// # Arguments
    ///
    /// * `capacity` - Maximum number of events to buffer per subscriber.
    ///   When a subscriber falls behind by more than this amount, it will
    ///   receive a `RecvError::Lagged` error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::default();
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event.
    /// Returns an error if there are no active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, CoreEvent, AuthEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let event = CoreEvent::Auth(AuthEvent::SignedIn { expires_at: 1_700_000_000_000 });
    ///
    /// match event_bus.emit(event) {
    ///     Ok(n) => println!("Event sent to {} subscribers", n),
    ///     Err(_) => println!("No active subscribers"),
    /// }
    /// ```
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all future events.
    /// Past events are not replayed.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use core_runtime::events::EventBus;
    ///
    /// # #[tokio::main]
    /// # async fn main() {
    /// let event_bus = EventBus::new(100);
    /// let mut subscriber = event_bus.subscribe();
    ///
    /// tokio::spawn(async move {
    ///     while let Ok(event) = subscriber.recv().await {
    ///         println!("Received: {:?}", event);
    ///     }
    /// });
    /// # }
    /// ```
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.subscriber_count(), 0);
    ///
    /// let _subscriber = event_bus.subscribe();
    /// assert_eq!(event_bus.subscriber_count(), 1);
    /// ```
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with additional filtering capabilities.
///
/// This provides a more ergonomic API for consuming events with optional filtering
/// by event type or severity.
///
/// # Example
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// # #[tokio::main]
/// # async fn main() {
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe());
///
/// // Filter for auth events only
/// let mut auth_stream = stream.filter(|event| {
///     matches!(event, CoreEvent::Auth(_))
/// });
/// # }
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use core_runtime::events::{EventBus, EventStream, CoreEvent};
    ///
    /// let event_bus = EventBus::new(100);
    /// let stream = EventStream::new(event_bus.subscribe());
    ///
    /// let auth_stream = stream.filter(|event| {
    ///     matches!(event, CoreEvent::Auth(_))
    /// });
    /// ```
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// This will skip events that don't match the filter and return the next matching event.
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n` events.
    /// Returns `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            // If no filter, return immediately
            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            // Apply filter
            if filter(&event) {
                return Ok(event);
            }

            // Event didn't match filter, continue to next event
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    // If no filter, return immediately
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    // Apply filter
                    if filter(&event) {
                        return Some(Ok(event));
                    }

                    // Event didn't match filter, continue
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
