//! Background Execution and Task Scheduling
//!
//! Provides platform-aware one-time background work with unique identities.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Result;

/// Task execution constraints
#[derive(Debug, Clone)]
pub struct TaskConstraints {
    /// Require WiFi connection
    pub requires_wifi: bool,
    /// Require any network connection
    pub requires_network: bool,
}

impl Default for TaskConstraints {
    fn default() -> Self {
        Self {
            requires_wifi: false,
            requires_network: true,
        }
    }
}

/// Scheduled task identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Small key-value payload handed to a task handler when it runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskInput {
    values: BTreeMap<String, String>,
}

impl TaskInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bool(mut self, key: impl Into<String>, value: bool) -> Self {
        self.values.insert(key.into(), value.to_string());
        self
    }

    pub fn with_string(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Returns `default` when the key is absent or not a boolean.
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.values
            .get(key)
            .and_then(|value| value.parse().ok())
            .unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }
}

/// Future returned by a task handler
pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send>>;

/// Work function registered for a task id
pub type TaskHandler = Arc<dyn Fn(TaskInput) -> TaskFuture + Send + Sync>;

/// Task execution status
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    /// Task is scheduled but not yet running
    Scheduled,
    /// Task is currently executing
    Running,
    /// Task completed successfully
    Completed,
    /// Task failed
    Failed,
    /// Task was cancelled
    Cancelled,
}

impl TaskStatus {
    /// Whether the task still occupies its unique slot.
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::Scheduled | TaskStatus::Running)
    }
}

/// Background task executor trait
///
/// Abstracts platform-specific background work scheduling:
/// - **Android**: WorkManager unique one-time work (KEEP policy)
/// - **Desktop**: In-process tokio executor
///
/// One-time work is unique per task id: scheduling a task id that is still
/// scheduled or running keeps the existing instance and returns its id.
///
/// # Example
///
/// ```ignore
/// use bridge_traits::background::{BackgroundExecutor, TaskConstraints, TaskInput};
/// use std::time::Duration;
///
/// async fn enqueue_load(executor: &dyn BackgroundExecutor) -> Result<()> {
///     executor
///         .schedule_once(
///             "photos_load",
///             Duration::ZERO,
///             TaskConstraints::default(),
///             TaskInput::new().with_bool("initial", true),
///         )
///         .await?;
///     Ok(())
/// }
/// ```
#[async_trait::async_trait]
pub trait BackgroundExecutor: Send + Sync {
    /// Register the work function executed for `task_id`
    ///
    /// Registering again replaces the previous handler.
    async fn register_handler(&self, task_id: &str, handler: TaskHandler) -> Result<()>;

    /// Schedule a one-time delayed task
    ///
    /// The task waits until `constraints` are satisfied before running.
    async fn schedule_once(
        &self,
        task_id: &str,
        delay: Duration,
        constraints: TaskConstraints,
        input: TaskInput,
    ) -> Result<TaskId>;

    /// Cancel a scheduled task
    async fn cancel_task(&self, task_id: &TaskId) -> Result<()>;

    /// Get status of a task
    async fn get_task_status(&self, task_id: &TaskId) -> Result<TaskStatus>;

    /// List all known tasks
    async fn list_tasks(&self) -> Result<Vec<TaskId>>;

    /// Check if background execution is available
    async fn is_available(&self) -> bool {
        true
    }

    /// Get estimated time until next execution
    ///
    /// Returns `None` if the information is not available or if the task
    /// will execute immediately.
    async fn next_execution_time(&self, task_id: &TaskId) -> Result<Option<Duration>>;
}
