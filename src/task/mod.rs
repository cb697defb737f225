use std::{future::Future, pin::Pin};

use thiserror::Error;
use tokio_util::sync::CancellationToken;

pub type TaskError = Box<dyn std::error::Error + Send + Sync + 'static>;

pub type TaskResult = Result<(), TaskError>;

/// The trait users implement for tasks run by the supervisor.
///
/// # Cancellation
///
/// Every task receives a clone of the same [`CancellationToken`]. Once any
/// task returns (or a termination signal arrives) the token is cancelled and
/// each task is expected to wrap up and return promptly. Cancellation is
/// cooperative only: a task that never looks at its token keeps running after
/// the supervisor gave up on it.
///
/// Tasks run exactly once, so `run` consumes `self`.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use graceful_supervisor::{SupervisedTask, TaskResult};
/// use tokio_util::sync::CancellationToken;
///
/// struct Poller {
///     every: Duration,
/// }
///
/// impl SupervisedTask for Poller {
///     async fn run(self, token: CancellationToken) -> TaskResult {
///         loop {
///             tokio::select! {
///                 _ = token.cancelled() => return Ok(()),
///                 _ = tokio::time::sleep(self.every) => {
///                     // poll something
///                 }
///             }
///         }
///     }
/// }
/// ```
///
/// Plain closures returning a future work as well:
///
/// ```rust
/// use graceful_supervisor::{SupervisedTask, TaskResult};
/// use tokio_util::sync::CancellationToken;
///
/// fn assert_task(_: impl SupervisedTask) {}
///
/// assert_task(|token: CancellationToken| async move {
///     token.cancelled().await;
///     TaskResult::Ok(())
/// });
/// ```
pub trait SupervisedTask: Send + 'static {
    /// Runs the task until it completes, fails or observes cancellation.
    fn run(self, token: CancellationToken) -> impl Future<Output = TaskResult> + Send;
}

impl<F, Fut> SupervisedTask for F
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = TaskResult> + Send + 'static,
{
    fn run(self, token: CancellationToken) -> impl Future<Output = TaskResult> + Send {
        self(token)
    }
}

/// Dyn-compatible wrapper for `SupervisedTask`. Not user-facing.
pub(crate) trait DynSupervisedTask: Send + 'static {
    fn run_boxed(
        self: Box<Self>,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = TaskResult> + Send + 'static>>;
}

impl<T> DynSupervisedTask for T
where
    T: SupervisedTask,
{
    fn run_boxed(
        self: Box<Self>,
        token: CancellationToken,
    ) -> Pin<Box<dyn Future<Output = TaskResult> + Send + 'static>> {
        Box::pin((*self).run(token))
    }
}

pub(crate) type DynTask = Box<dyn DynSupervisedTask>;

/// Reported in place of a task's result when the task panicked.
#[derive(Debug, Error)]
#[error("task #{ordinal} panicked: {message}")]
pub struct TaskPanicked {
    pub ordinal: usize,
    pub message: String,
}

impl TaskPanicked {
    pub(crate) fn from_join_error(ordinal: usize, err: tokio::task::JoinError) -> Self {
        let message = match err.try_into_panic() {
            Ok(payload) => {
                if let Some(s) = payload.downcast_ref::<&'static str>() {
                    (*s).to_string()
                } else if let Some(s) = payload.downcast_ref::<String>() {
                    s.clone()
                } else {
                    "opaque panic payload".to_string()
                }
            }
            Err(err) => err.to_string(),
        };
        Self { ordinal, message }
    }
}

/// One task's result, tagged with the order it was registered in.
#[derive(Debug)]
pub(crate) struct TaskCompletion {
    pub(crate) ordinal: usize,
    pub(crate) result: TaskResult,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_panicked_task_message_is_captured() {
        let handle: tokio::task::JoinHandle<()> = tokio::spawn(async { panic!("boom") });
        let err = handle.await.unwrap_err();
        let panicked = TaskPanicked::from_join_error(3, err);
        assert_eq!(panicked.ordinal, 3);
        assert_eq!(panicked.message, "boom");
        assert_eq!(panicked.to_string(), "task #3 panicked: boom");
    }

    #[tokio::test]
    async fn test_closure_runs_as_boxed_task() {
        let task: DynTask = Box::new(|token: CancellationToken| async move {
            token.cancelled().await;
            TaskResult::Err("stopped".into())
        });
        let token = CancellationToken::new();
        token.cancel();
        let result = task.run_boxed(token).await;
        assert_eq!(result.unwrap_err().to_string(), "stopped");
    }
}
