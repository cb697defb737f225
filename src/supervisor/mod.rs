pub(crate) mod builder;

use std::time::Duration;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

use crate::{
    config::ResolvedConfig,
    signal::SignalListener,
    task::{DynTask, TaskCompletion, TaskError, TaskPanicked},
};

const UNGRACEFUL_MESSAGE: &str = "one or more tasks failed to gracefully finish";

#[derive(Debug, Error)]
pub enum SupervisorError {
    /// The error returned by the task whose completion triggered shutdown.
    #[error("{0}")]
    Task(TaskError),
    /// Not every task returned within the timeout after cancellation.
    ///
    /// `original` is the error of the task that triggered shutdown, if any.
    #[error("{}", ungraceful_message(.original))]
    Ungraceful { original: Option<TaskError> },
    #[error("no tasks to supervise")]
    NoTasks,
}

fn ungraceful_message(original: &Option<TaskError>) -> String {
    match original {
        Some(err) => format!("{err}; {UNGRACEFUL_MESSAGE}"),
        None => UNGRACEFUL_MESSAGE.to_string(),
    }
}

impl SupervisorError {
    pub fn is_ungraceful(&self) -> bool {
        matches!(self, Self::Ungraceful { .. })
    }

    /// The underlying task error, whether or not shutdown was graceful.
    pub fn original_error(&self) -> Option<&(dyn std::error::Error + Send + Sync + 'static)> {
        match self {
            Self::Task(err) => Some(err.as_ref()),
            Self::Ungraceful { original } => original.as_deref(),
            Self::NoTasks => None,
        }
    }

    /// Consumes the error, returning the underlying task error if there is one.
    pub fn into_task_error(self) -> Option<TaskError> {
        match self {
            Self::Task(err) => Some(err),
            Self::Ungraceful { original } => original,
            Self::NoTasks => None,
        }
    }
}

/// Runs a fixed group of tasks and stops all of them as soon as one returns.
///
/// Every task shares one cancellation token. The token is cancelled when the
/// first task returns or when one of the configured termination signals is
/// delivered. The supervisor then waits, up to the configured timeout, for
/// every other task to return.
///
/// A `Supervisor` runs once; build a new one for every run.
pub struct Supervisor {
    pub(crate) tasks: Vec<DynTask>,
    pub(crate) config: ResolvedConfig,
}

impl Supervisor {
    /// Runs every task to completion, consuming the supervisor.
    ///
    /// Returns `Ok(())` when the first task to return succeeded and every task
    /// returned within the timeout, [`SupervisorError::Task`] when the first
    /// task failed and every task returned within the timeout, and
    /// [`SupervisorError::Ungraceful`] when the timeout elapsed first.
    ///
    /// A termination signal only cancels the token: the outcome is still
    /// decided by the first task to return afterwards.
    pub async fn run(self) -> Result<(), SupervisorError> {
        let Self { tasks, config } = self;
        if tasks.is_empty() {
            return Err(SupervisorError::NoTasks);
        }

        let token = config.base_token.child_token();
        // Listen before any task starts, so no signal delivered from here on is missed.
        let watcher = match config.signal_source.listen(&config.signals) {
            Ok(listener) => Some(tokio::spawn(watch_signals(listener, token.clone()))),
            Err(err) => {
                tracing::warn!(error = %err, "failed to listen for termination signals");
                None
            }
        };

        let tracker = TaskTracker::new();
        // Sized to the number of tasks: reporting a result never waits on the supervisor.
        let (tx, mut rx) = mpsc::channel::<TaskCompletion>(tasks.len());
        for (ordinal, task) in tasks.into_iter().enumerate() {
            tracing::debug!(task = ordinal, "starting task");
            let handle = tracker.spawn(task.run_boxed(token.clone()));
            let tx = tx.clone();
            tokio::spawn(async move {
                let result = match handle.await {
                    Ok(result) => result,
                    Err(err) => Err(TaskPanicked::from_join_error(ordinal, err).into()),
                };
                let _ = tx.try_send(TaskCompletion { ordinal, result });
            });
        }
        tracker.close();
        drop(tx);

        let Some(trigger) = rx.recv().await else {
            return Err(SupervisorError::NoTasks);
        };
        match &trigger.result {
            Ok(()) => tracing::info!(task = trigger.ordinal, "task finished, shutting down"),
            Err(err) => {
                tracing::info!(task = trigger.ordinal, error = %err, "task failed, shutting down")
            }
        }
        token.cancel();

        let outcome = wait_all_stopped(&tracker, config.timeout).await;
        if let Some(watcher) = watcher {
            if let Err(err) = watcher.await {
                tracing::warn!(error = %err, "signal watcher panicked");
            }
        }

        match (outcome, trigger.result) {
            (Ok(()), Ok(())) => Ok(()),
            (Ok(()), Err(err)) => Err(SupervisorError::Task(err)),
            (Err(StillRunning(running)), result) => {
                tracing::warn!(
                    running,
                    timeout = ?config.timeout,
                    "tasks did not stop in time"
                );
                Err(SupervisorError::Ungraceful {
                    original: result.err(),
                })
            }
        }
    }
}

/// Number of tasks still running when the shutdown timeout elapsed.
struct StillRunning(usize);

/// Races the completion of every tracked task against `timeout`.
async fn wait_all_stopped(tracker: &TaskTracker, timeout: Duration) -> Result<(), StillRunning> {
    match tokio::time::timeout(timeout, tracker.wait()).await {
        Ok(()) => Ok(()),
        Err(_) => Err(StillRunning(tracker.len())),
    }
}

/// Cancels `token` the first time `listener` yields a signal.
///
/// Returns, dropping the listener, as soon as the token is cancelled for any
/// reason.
async fn watch_signals(mut listener: Box<dyn SignalListener>, token: CancellationToken) {
    tokio::select! {
        _ = token.cancelled() => {}
        signal = listener.recv() => {
            tracing::info!(%signal, "termination signal received, shutting down");
            token.cancel();
        }
    }
}
