use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use graceful_supervisor::{SupervisedTask, TaskResult};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{0}")]
pub struct TestError(pub &'static str);

/// Returns its error after `end_after`, or as soon as the token is cancelled.
#[derive(Clone)]
pub struct Worker {
    pub end_after: Duration,
    pub err: Option<&'static str>,
    pub cancelled: Arc<AtomicUsize>,
}

impl Worker {
    #[allow(unused)]
    pub fn new(end_after_ms: u64, err: Option<&'static str>) -> Self {
        Self {
            end_after: Duration::from_millis(end_after_ms),
            err,
            cancelled: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[allow(unused)]
    pub fn sharing(mut self, cancelled: &Arc<AtomicUsize>) -> Self {
        self.cancelled = cancelled.clone();
        self
    }

    fn result(&self) -> TaskResult {
        match self.err {
            Some(msg) => Err(TestError(msg).into()),
            None => Ok(()),
        }
    }
}

impl SupervisedTask for Worker {
    async fn run(self, token: CancellationToken) -> TaskResult {
        tokio::select! {
            _ = tokio::time::sleep(self.end_after) => {}
            _ = token.cancelled() => {
                self.cancelled.fetch_add(1, Ordering::SeqCst);
            }
        }
        self.result()
    }
}

/// Ignores cancellation entirely and never returns.
#[allow(unused)]
#[derive(Clone)]
pub struct StubbornWorker;

impl SupervisedTask for StubbornWorker {
    async fn run(self, _token: CancellationToken) -> TaskResult {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Runs until cancelled, then returns `err`.
#[allow(unused)]
#[derive(Clone)]
pub struct UntilCancelled {
    pub err: Option<&'static str>,
}

impl SupervisedTask for UntilCancelled {
    async fn run(self, token: CancellationToken) -> TaskResult {
        token.cancelled().await;
        match self.err {
            Some(msg) => Err(TestError(msg).into()),
            None => Ok(()),
        }
    }
}
