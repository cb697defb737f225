use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;

use crate::{
    config::Config,
    signal::{Signal, SignalSource},
    task::{DynTask, SupervisedTask},
    Supervisor,
};

/// Builds a `Supervisor` instance with configurable parameters.
///
/// Allows customization of the shutdown timeout, the base cancellation token
/// and the termination signals to watch. Tasks run in the order they were added.
#[derive(Default)]
pub struct SupervisorBuilder {
    tasks: Vec<DynTask>,
    config: Config,
}

impl SupervisorBuilder {
    /// Creates a new builder with default configuration values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from an existing configuration.
    pub fn from_config(config: Config) -> Self {
        Self {
            tasks: Vec::new(),
            config,
        }
    }

    /// Adds a task to the group.
    pub fn with_task(mut self, task: impl SupervisedTask) -> Self {
        self.tasks.push(Box::new(task));
        self
    }

    /// Adds every task yielded by `tasks` to the group.
    pub fn with_tasks<I>(mut self, tasks: I) -> Self
    where
        I: IntoIterator,
        I::Item: SupervisedTask,
    {
        for task in tasks {
            self = self.with_task(task);
        }
        self
    }

    /// Sets how long to wait for every task to stop once shutdown began.
    /// Zero keeps the default.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Derives the run's token from `token`, so cancelling it stops the group.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.config.cancellation_token = Some(token);
        self
    }

    /// Sets the termination signals to watch. An empty set keeps the default.
    pub fn with_signals(mut self, signals: impl IntoIterator<Item = Signal>) -> Self {
        self.config.signals = signals.into_iter().collect();
        self
    }

    /// Replaces the process signals with another source of termination requests.
    pub fn with_signal_source(mut self, source: impl SignalSource) -> Self {
        self.config.signal_source = Some(Arc::new(source));
        self
    }

    /// Constructs the `Supervisor` with the configured settings.
    pub fn build(self) -> Supervisor {
        Supervisor {
            tasks: self.tasks,
            config: self.config.resolve(),
        }
    }
}
