//! Runs the listener and the consumer as two tasks that share only the
//! ingestion queue and one cancellation token.
//!
//! - External shutdown (token cancelled) stops both; `run` returns `Ok`.
//! - A task failing (error or panic) cancels the other; `run` returns the
//!   first failure as [`PipelineError::Fatal`].
//! - A task ending on its own without cancellation also stops the other.

use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use antiradar_queue::Listener;

use crate::consumer::Consumer;
use crate::error::{PipelineError, TaskFailure, TaskKind};

type TaskResult = Result<(), TaskFailure>;

pub struct Supervisor {
    listener: Listener,
    consumer: Consumer,
    cancel: CancellationToken,
    shutdown_timeout: Duration,
}

impl Supervisor {
    pub fn new(listener: Listener, consumer: Consumer) -> Self {
        Self {
            listener,
            consumer,
            cancel: CancellationToken::new(),
            shutdown_timeout: Duration::from_secs(10),
        }
    }

    /// Use an externally owned token, e.g. one wired to OS signals.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// How long the surviving task gets to unwind before it is aborted.
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(self) -> Result<(), PipelineError> {
        let cancel = self.cancel;

        let listener_token = cancel.clone();
        let listener = self.listener;
        let mut listener_handle: JoinHandle<TaskResult> = tokio::spawn(async move {
            listener.run(listener_token).await.map_err(TaskFailure::from)
        });

        let consumer_token = cancel.clone();
        let consumer = self.consumer;
        let mut consumer_handle: JoinHandle<TaskResult> = tokio::spawn(async move {
            consumer.run(consumer_token).await;
            Ok(())
        });

        info!("pipeline running");

        let (first_task, first) = tokio::select! {
            joined = &mut listener_handle => (TaskKind::Listener, joined),
            joined = &mut consumer_handle => (TaskKind::Consumer, joined),
        };
        let (survivor_task, survivor) = match first_task {
            TaskKind::Listener => (TaskKind::Consumer, consumer_handle),
            TaskKind::Consumer => (TaskKind::Listener, listener_handle),
        };

        let first = flatten(first_task, first);
        if cancel.is_cancelled() {
            info!(task = %first_task, "pipeline shutting down");
        } else {
            match &first {
                Err(e) => error!(error = %e, "fatal task failure, stopping pipeline"),
                Ok(()) => warn!(task = %first_task, "task ended unexpectedly, stopping pipeline"),
            }
            cancel.cancel();
        }

        let second = join_survivor(survivor_task, survivor, self.shutdown_timeout).await;

        info!("pipeline stopped");
        first.and(second)
    }
}

async fn join_survivor(
    task: TaskKind,
    mut handle: JoinHandle<TaskResult>,
    timeout: Duration,
) -> Result<(), PipelineError> {
    match tokio::time::timeout(timeout, &mut handle).await {
        Ok(joined) => flatten(task, joined),
        Err(_) => {
            warn!(task = %task, ?timeout, "task did not stop in time, aborting");
            handle.abort();
            Ok(())
        }
    }
}

fn flatten(task: TaskKind, joined: Result<TaskResult, JoinError>) -> Result<(), PipelineError> {
    let result = match joined {
        Ok(result) => result,
        Err(e) if e.is_panic() => Err(TaskFailure::Panicked(e.to_string())),
        // Only happens after our own abort.
        Err(_) => Ok(()),
    };
    result.map_err(|source| PipelineError::Fatal { task, source })
}

/// Cancel `token` on Ctrl-C or SIGTERM.
pub fn spawn_signal_handlers(token: CancellationToken) {
    let ctrl_c_token = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                ctrl_c_token.cancel();
            }
            Err(err) => error!("Error setting up signal handler: {}", err),
        }
    });

    #[cfg(unix)]
    tokio::spawn(async move {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
                info!("Received SIGTERM signal");
                token.cancel();
            }
            Err(err) => error!("Error setting up SIGTERM handler: {}", err),
        }
    });
}
