//! Background Task Execution Implementation

use async_trait::async_trait;
use bridge_traits::{
    background::{
        BackgroundExecutor, TaskConstraints, TaskHandler, TaskId, TaskInput, TaskStatus,
    },
    error::{BridgeError, Result},
    network::{NetworkInfo, NetworkMonitor, NetworkStatus, NetworkType},
    time::{Clock, SystemClock},
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, RwLock};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Interval between constraint checks while a task waits for the network
pub const DEFAULT_CONSTRAINT_RETRY: Duration = Duration::from_secs(5);

/// Tokio-based background executor for desktop.
///
/// Runs unique one-time work: while a task id is scheduled or running,
/// scheduling it again keeps the existing instance.
pub struct TokioBackgroundExecutor {
    tasks: Arc<RwLock<HashMap<TaskId, TaskInfo>>>,
    handlers: Arc<RwLock<HashMap<String, TaskHandler>>>,
    network_monitor: Option<Arc<dyn NetworkMonitor>>,
    clock: Arc<dyn Clock>,
    constraint_retry: Duration,
}

struct TaskInfo {
    status: TaskStatus,
    handle: Option<JoinHandle<()>>,
    cancel: Option<oneshot::Sender<()>>,
    last_run: Option<i64>,
    next_run: Option<i64>,
}

impl TokioBackgroundExecutor {
    /// Create a new background executor with no network monitoring.
    pub fn new() -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_network_monitor_and_clock(None, clock)
    }

    /// Create a background executor with an optional network monitor.
    pub fn with_network_monitor(monitor: Option<Arc<dyn NetworkMonitor>>) -> Self {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        Self::with_network_monitor_and_clock(monitor, clock)
    }

    /// Create a background executor with an optional network monitor and custom clock.
    pub fn with_network_monitor_and_clock(
        monitor: Option<Arc<dyn NetworkMonitor>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            tasks: Arc::new(RwLock::new(HashMap::new())),
            handlers: Arc::new(RwLock::new(HashMap::new())),
            network_monitor: monitor,
            clock,
            constraint_retry: DEFAULT_CONSTRAINT_RETRY,
        }
    }

    /// Override how often unmet constraints are re-checked.
    pub fn with_constraint_retry(mut self, interval: Duration) -> Self {
        self.constraint_retry = interval;
        self
    }

    fn now_millis(clock: &dyn Clock) -> i64 {
        clock.unix_timestamp_millis()
    }

    fn duration_to_millis(duration: Duration) -> i64 {
        duration.as_millis().min(i64::MAX as u128) as i64
    }

    fn schedule_after(clock: &dyn Clock, delay: Duration) -> i64 {
        let now = Self::now_millis(clock);
        now.saturating_add(Self::duration_to_millis(delay))
    }

    fn millis_to_duration(millis: i64) -> Duration {
        if millis <= 0 {
            Duration::from_secs(0)
        } else {
            Duration::from_millis(millis as u64)
        }
    }

    async fn handler_for(&self, task_id: &str) -> Option<TaskHandler> {
        let handlers = self.handlers.read().await;
        handlers.get(task_id).cloned()
    }

    async fn set_status(
        tasks: &RwLock<HashMap<TaskId, TaskInfo>>,
        id: &TaskId,
        status: TaskStatus,
    ) {
        let mut tasks = tasks.write().await;
        if let Some(info) = tasks.get_mut(id) {
            if status == TaskStatus::Cancelled {
                info.next_run = None;
            }
            info.status = status;
        }
    }

    async fn constraints_satisfied(
        monitor: Option<Arc<dyn NetworkMonitor>>,
        constraints: &TaskConstraints,
    ) -> bool {
        if !(constraints.requires_network || constraints.requires_wifi) {
            return true;
        }

        if let Some(monitor) = monitor {
            match monitor.get_network_info().await {
                Ok(NetworkInfo {
                    status: NetworkStatus::Connected,
                    network_type,
                    ..
                }) => {
                    if constraints.requires_wifi {
                        matches!(network_type, Some(NetworkType::WiFi))
                    } else {
                        true
                    }
                }
                Ok(_) => false,
                Err(err) => {
                    warn!(error = %err, "Network monitor error");
                    false
                }
            }
        } else {
            warn!(
                "Network constraints requested but no monitor provided; assuming constraint satisfied"
            );
            true
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_one_time_task(
        tasks: Arc<RwLock<HashMap<TaskId, TaskInfo>>>,
        id: TaskId,
        handler: TaskHandler,
        input: TaskInput,
        delay: Duration,
        constraints: TaskConstraints,
        mut cancel_rx: oneshot::Receiver<()>,
        monitor: Option<Arc<dyn NetworkMonitor>>,
        clock: Arc<dyn Clock>,
        constraint_retry: Duration,
    ) {
        let delay_sleep = sleep(delay);
        tokio::pin!(delay_sleep);
        tokio::select! {
            _ = &mut cancel_rx => {
                Self::set_status(&tasks, &id, TaskStatus::Cancelled).await;
                return;
            }
            _ = delay_sleep.as_mut() => {}
        }

        loop {
            if Self::constraints_satisfied(monitor.clone(), &constraints).await {
                break;
            }
            debug!(task_id = %id.0, "Constraints not satisfied; waiting");

            let retry_sleep = sleep(constraint_retry);
            tokio::pin!(retry_sleep);
            tokio::select! {
                _ = &mut cancel_rx => {
                    Self::set_status(&tasks, &id, TaskStatus::Cancelled).await;
                    return;
                }
                _ = retry_sleep.as_mut() => {}
            }
        }

        Self::set_status(&tasks, &id, TaskStatus::Running).await;

        let result = handler(input).await;

        let mut tasks = tasks.write().await;
        if let Some(info) = tasks.get_mut(&id) {
            info.last_run = Some(Self::now_millis(clock.as_ref()));
            info.next_run = None;
            info.cancel = None;
            info.status = match result {
                Ok(()) => TaskStatus::Completed,
                Err(err) => {
                    warn!(task_id = %id.0, error = %err, "One-time task failed");
                    TaskStatus::Failed
                }
            };
        }
    }
}

impl Default for TokioBackgroundExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundExecutor for TokioBackgroundExecutor {
    async fn register_handler(&self, task_id: &str, handler: TaskHandler) -> Result<()> {
        let mut handlers = self.handlers.write().await;
        handlers.insert(task_id.to_string(), handler);
        debug!(task_id = task_id, "Registered task handler");
        Ok(())
    }

    async fn schedule_once(
        &self,
        task_id: &str,
        delay: Duration,
        constraints: TaskConstraints,
        input: TaskInput,
    ) -> Result<TaskId> {
        let id = TaskId::new(task_id);

        let handler = self.handler_for(task_id).await.ok_or_else(|| {
            BridgeError::OperationFailed(format!("No handler registered for task: {}", task_id))
        })?;

        let cancel_rx = {
            let mut tasks = self.tasks.write().await;
            if let Some(existing) = tasks.get(&id) {
                if existing.status.is_active() {
                    info!(
                        task_id = task_id,
                        status = ?existing.status,
                        "Task already pending; keeping existing work"
                    );
                    return Ok(id);
                }
            }

            let previous_run = tasks.get(&id).and_then(|info| info.last_run);
            let (cancel_tx, cancel_rx) = oneshot::channel();
            tasks.insert(
                id.clone(),
                TaskInfo {
                    status: TaskStatus::Scheduled,
                    handle: None,
                    cancel: Some(cancel_tx),
                    last_run: previous_run,
                    next_run: Some(Self::schedule_after(self.clock.as_ref(), delay)),
                },
            );
            cancel_rx
        };

        debug!(
            task_id = task_id,
            delay_ms = delay.as_millis() as u64,
            requires_network = constraints.requires_network,
            "Scheduling one-time task"
        );

        let handle = tokio::spawn(TokioBackgroundExecutor::run_one_time_task(
            Arc::clone(&self.tasks),
            id.clone(),
            handler,
            input,
            delay,
            constraints,
            cancel_rx,
            self.network_monitor.clone(),
            Arc::clone(&self.clock),
            self.constraint_retry,
        ));

        let mut tasks = self.tasks.write().await;
        if let Some(info) = tasks.get_mut(&id) {
            info.handle = Some(handle);
        }

        Ok(id)
    }

    async fn cancel_task(&self, task_id: &TaskId) -> Result<()> {
        debug!(task_id = ?task_id, "Cancelling task");

        let mut tasks = self.tasks.write().await;
        if let Some(mut info) = tasks.remove(task_id) {
            if let Some(cancel) = info.cancel.take() {
                let _ = cancel.send(());
            }
            if let Some(handle) = info.handle.take() {
                handle.abort();
            }
            return Ok(());
        }

        Err(BridgeError::OperationFailed(format!(
            "Task not found: {:?}",
            task_id
        )))
    }

    async fn get_task_status(&self, task_id: &TaskId) -> Result<TaskStatus> {
        let tasks = self.tasks.read().await;
        tasks
            .get(task_id)
            .map(|info| info.status.clone())
            .ok_or_else(|| BridgeError::OperationFailed(format!("Task not found: {:?}", task_id)))
    }

    async fn list_tasks(&self) -> Result<Vec<TaskId>> {
        let tasks = self.tasks.read().await;
        Ok(tasks.keys().cloned().collect())
    }

    async fn next_execution_time(&self, task_id: &TaskId) -> Result<Option<Duration>> {
        let tasks = self.tasks.read().await;
        if let Some(info) = tasks.get(task_id) {
            if let Some(next) = info.next_run {
                let now = Self::now_millis(self.clock.as_ref());
                Ok(Some(Self::millis_to_duration(next - now)))
            } else {
                Ok(None)
            }
        } else {
            Err(BridgeError::OperationFailed(format!(
                "Task not found: {:?}",
                task_id
            )))
        }
    }
}
