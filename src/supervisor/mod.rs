//! Task Supervisor (§4.1), ground truth `mq/handler.py`'s `MQ_HANDLER`
//! registry plus `mq/api.py`'s start/stop control plane.
//!
//! Each registered task is a spawn closure rather than a literal
//! `(function, stop_signal, queues...)` tuple — Rust has no dict-of-mixed-
//! arity-callables, so the queues/store/client a task needs are captured by
//! the closure at registration time, and only the per-start `n_tasks`
//! (parsed from the name, §4.1 "Naming shortcut") crosses the `start` call.

pub mod queues;
pub mod registry;

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

type SpawnFn = Arc<dyn Fn(CancellationToken, Option<u32>) -> JoinHandle<()> + Send + Sync>;

struct TaskEntry {
    spawn: SpawnFn,
    running: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
pub struct TaskDescription {
    pub name: String,
    pub start_url: String,
    pub stop_url: String,
    pub running: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("no task registered under the name '{0}'")]
    UnknownTask(String),
}

/// Owns the stage graph's lifecycle: every producer/consumer is registered
/// once at startup, then started/stopped by name from the operator surface.
#[derive(Default, Clone)]
pub struct TaskSupervisor {
    tasks: Arc<DashMap<String, Arc<TaskEntry>>>,
}

impl TaskSupervisor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a task under `name`. `spawn` receives the per-start stop
    /// token and the optional worker count parsed from the name's numeric
    /// prefix, and must return the `JoinHandle` of the spawned work.
    pub fn register<F>(&self, name: impl Into<String>, spawn: F)
    where
        F: Fn(CancellationToken, Option<u32>) -> JoinHandle<()> + Send + Sync + 'static,
    {
        self.tasks.insert(
            name.into(),
            Arc::new(TaskEntry {
                spawn: Arc::new(spawn),
                running: Mutex::new(None),
            }),
        );
    }

    /// Clears the stop signal and launches the task. If already running,
    /// no-op with a warning (§4.1).
    pub async fn start(&self, name: &str) -> Result<(), SupervisorError> {
        let entry = self
            .tasks
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| SupervisorError::UnknownTask(name.to_string()))?;

        let mut running = entry.running.lock().await;
        if let Some((_, join)) = running.as_ref() {
            if !join.is_finished() {
                log::warn!("task '{name}' is already running; ignoring start request");
                return Ok(());
            }
        }

        let (_, n) = registry::parse_task_name(name);
        let token = CancellationToken::new();
        let join = (entry.spawn)(token.clone(), n);
        *running = Some((token, join));
        log::info!("started task '{name}'");
        Ok(())
    }

    /// Sets the stop signal; does not await completion (§4.1: "expected to
    /// return promptly", not guaranteed synchronous with this call).
    pub async fn stop(&self, name: &str) -> Result<(), SupervisorError> {
        let entry = self
            .tasks
            .get(name)
            .map(|e| e.value().clone())
            .ok_or_else(|| SupervisorError::UnknownTask(name.to_string()))?;

        let running = entry.running.lock().await;
        match running.as_ref() {
            Some((token, _)) => {
                token.cancel();
                log::info!("stop requested for task '{name}'");
            }
            None => log::warn!("task '{name}' is not running; ignoring stop request"),
        }
        Ok(())
    }

    /// Sets every stop signal and awaits completion best-effort (§4.1,
    /// called on shutdown).
    pub async fn stop_all(&self) {
        for entry in self.tasks.iter() {
            let mut running = entry.running.lock().await;
            if let Some((token, join)) = running.take() {
                token.cancel();
                if let Err(e) = join.await {
                    log::warn!("task '{}' panicked while stopping: {e}", entry.key());
                }
            }
        }
    }

    /// For the dashboard: each task's display name, start URL, stop URL,
    /// and whether it's currently running (§4.1).
    ///
    /// `task_type` for the URL's `<task_type>` segment (required by
    /// `GET /control/<action>/<task_type>/<name>`, `routes/control.rs`) is
    /// read off every registered name's own `_producer`/`_consumer` suffix
    /// — every task name registered in `pipeline::register` already ends in
    /// one, so there's nothing further to track per-entry.
    pub async fn describe(&self) -> Vec<TaskDescription> {
        let mut out = Vec::with_capacity(self.tasks.len());
        for entry in self.tasks.iter() {
            let name = entry.key().clone();
            let running = entry.running.lock().await;
            let is_running = running.as_ref().is_some_and(|(_, j)| !j.is_finished());
            let task_type = task_type_from_name(&name);
            out.push(TaskDescription {
                start_url: format!("/api/v1/control/start/{task_type}/{name}"),
                stop_url: format!("/api/v1/control/end/{task_type}/{name}"),
                running: is_running,
                name,
            });
        }
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}

/// `routes/control.rs` only accepts `producer`/`consumer`; every registered
/// task name ends in one or the other, so the suffix is authoritative.
fn task_type_from_name(name: &str) -> &'static str {
    if name.ends_with("_producer") {
        "producer"
    } else {
        "consumer"
    }
}
