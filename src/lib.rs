//! # 🛑 graceful-supervisor
//!
//! `graceful-supervisor` runs a fixed group of long-lived Tokio tasks and shuts
//! all of them down together.
//! As soon as one task returns (or the process receives a termination signal)
//! every other task is asked to stop, and the supervisor waits a bounded
//! amount of time for them to actually do it.
//!
//! ## Quick example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use graceful_supervisor::{SupervisorBuilder, TaskResult};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     SupervisorBuilder::new()
//!         .with_timeout(Duration::from_secs(10))
//!         .with_task(|token: CancellationToken| async move {
//!             token.cancelled().await; // serve until asked to stop
//!             TaskResult::Ok(())
//!         })
//!         .build()
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```
//!
//! ## What you get
//!
//! * **First result wins** – the first task to return decides the outcome.
//! * **Cancellation fan-out** – one shared `CancellationToken` tells every task to stop.
//! * **Bounded shutdown** – tasks that do not stop in time turn the outcome into
//!   [`SupervisorError::Ungraceful`]. They are never killed.
//! * **Injectable signals** – swap [`OsSignals`] for [`ManualSignals`] in tests.
//!
//! ## Outcomes
//!
//! | `run().await`                          | Meaning                                                   |
//! | -------------------------------------- | --------------------------------------------------------- |
//! | `Ok(())`                               | First task succeeded, every task stopped in time          |
//! | `Err(SupervisorError::Task(e))`        | First task failed with `e`, every task stopped in time    |
//! | `Err(SupervisorError::Ungraceful{..})` | Some task was still running when the timeout elapsed      |
//! | `Err(SupervisorError::NoTasks)`        | Nothing to run                                            |

pub use config::{Config, ResolvedConfig, DEFAULT_SIGNALS, DEFAULT_TIMEOUT};
pub use signal::{ManualSignals, OsSignals, Signal, SignalListener, SignalSource};
pub use supervisor::{builder::SupervisorBuilder, Supervisor, SupervisorError};
pub use task::{SupervisedTask, TaskError, TaskPanicked, TaskResult};

mod config;
mod signal;
mod supervisor;
mod task;

/// Runs `tasks` under `config` until the first of them returns, then stops the rest.
///
/// Shorthand for [`SupervisorBuilder::from_config`] followed by
/// [`Supervisor::run`].
pub async fn run<I>(config: Config, tasks: I) -> Result<(), SupervisorError>
where
    I: IntoIterator,
    I::Item: SupervisedTask,
{
    SupervisorBuilder::from_config(config)
        .with_tasks(tasks)
        .build()
        .run()
        .await
}
