use std::fmt;

use thiserror::Error;

use antiradar_queue::ListenerError;

/// The two supervised units of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    Listener,
    Consumer,
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Listener => write!(f, "listener"),
            TaskKind::Consumer => write!(f, "consumer"),
        }
    }
}

/// Why a supervised task stopped abnormally.
#[derive(Debug, Error)]
pub enum TaskFailure {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("task panicked: {0}")]
    Panicked(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{task} task failed: {source}")]
    Fatal {
        task: TaskKind,
        #[source]
        source: TaskFailure,
    },
}

impl PipelineError {
    pub fn task(&self) -> TaskKind {
        match self {
            PipelineError::Fatal { task, .. } => *task,
        }
    }
}
