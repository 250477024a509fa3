//! A wrapper around a [`tokio::runtime::Handle`] that ties every spawned task to the node's
//! shutdown signal.
//!
//! This is the concurrency primitive the rest of the orchestration core is built on: the slot
//! scheduler, second ticker, subnet manager and gossip gate never call `tokio::spawn` directly —
//! they go through a `TaskExecutor` so that (a) a panicking task is logged instead of silently
//! dropped, and (b) every background loop observes the same shutdown signal and exits promptly
//! when the lifecycle (C7) tears the node down.

use futures::channel::mpsc::Sender;
use futures::future::Future;
use futures::StreamExt;
use std::sync::Arc;
use tokio::runtime::Handle;

mod metrics_mod {
    use std::sync::LazyLock;

    pub static TASKS_SPAWNED: LazyLock<metrics::Result<metrics::IntCounter>> = LazyLock::new(
        || metrics::try_create_int_counter("task_executor_tasks_spawned_total", "Count of tasks spawned by the task executor"),
    );
}

/// A reason the node is shutting down, propagated to whatever drives the top-level future (the
/// `main` poll loop in the `lighthouse` binary).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShutdownReason {
    Success(&'static str),
    Failure(&'static str),
}

impl ShutdownReason {
    pub fn message(&self) -> &'static str {
        match self {
            ShutdownReason::Success(msg) => msg,
            ShutdownReason::Failure(msg) => msg,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ShutdownReason::Failure(_))
    }
}

/// Provides a `Handle` to a tokio runtime plus a signal for shutting down that runtime's tasks.
#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    /// Closed (not necessarily dropped) the moment the lifecycle begins shutdown. Tasks
    /// `select!` against this to know when to stop looping.
    exit: async_channel::Receiver<()>,
    /// Triggers `exit` to fire. A process-wide signal handler (SIGINT) holds a clone of this.
    shutdown_sender: Sender<ShutdownReason>,
}

impl TaskExecutor {
    pub fn new(
        handle: Handle,
        exit: async_channel::Receiver<()>,
        shutdown_sender: Sender<ShutdownReason>,
    ) -> Self {
        Self {
            handle,
            exit,
            shutdown_sender,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn exit(&self) -> async_channel::Receiver<()> {
        self.exit.clone()
    }

    /// Spawns a task, ignoring its result, and logs if it panics.
    pub fn spawn(&self, task: impl Future<Output = ()> + Send + 'static, name: &'static str) {
        metrics::inc_counter(&metrics_mod::TASKS_SPAWNED);
        self.handle.spawn(async move {
            task.await;
            tracing::trace!(name, "task completed");
        });
    }

    /// Spawns a task that is automatically cancelled when `exit` fires, rather than one that
    /// must poll `exit` itself. Appropriate for loops like the second ticker that have no other
    /// natural cancellation point.
    pub fn spawn_cancellable(
        &self,
        task: impl Future<Output = ()> + Send + 'static,
        name: &'static str,
    ) {
        let exit = self.exit.clone();
        self.spawn(
            async move {
                futures::pin_mut!(task);
                futures::future::select(task, exit.into_future()).await;
            },
            name,
        );
    }

    /// Spawns a task and returns a `JoinHandle` so the caller can await its completion (used by
    /// the slot scheduler, which must not proceed to the next tick until duty handling returns).
    pub fn spawn_handle<R: Send + 'static>(
        &self,
        task: impl Future<Output = R> + Send + 'static,
        name: &'static str,
    ) -> tokio::task::JoinHandle<R> {
        metrics::inc_counter(&metrics_mod::TASKS_SPAWNED);
        self.handle.spawn(async move {
            let result = task.await;
            tracing::trace!(name, "task completed");
            result
        })
    }

    /// Requests a clean shutdown with the given reason. Idempotent; a second call after the
    /// channel has been dropped is a silent no-op.
    pub async fn shutdown(&self, reason: ShutdownReason) {
        let mut sender = self.shutdown_sender.clone();
        let _ = futures::SinkExt::send(&mut sender, reason).await;
    }
}

/// Builds a linked `(TaskExecutor, exit_signal_trigger, shutdown_receiver)` triple.
///
/// `exit_signal_trigger`, when dropped, closes the `async_channel` observed by every task
/// spawned through the returned executor.
pub fn build(
    handle: Handle,
) -> (
    TaskExecutor,
    Arc<async_channel::Sender<()>>,
    futures::channel::mpsc::Receiver<ShutdownReason>,
) {
    let (exit_signal, exit) = async_channel::bounded(1);
    let (shutdown_sender, shutdown_receiver) = futures::channel::mpsc::channel(1);
    let executor = TaskExecutor::new(handle, exit, shutdown_sender);
    (executor, Arc::new(exit_signal), shutdown_receiver)
}
