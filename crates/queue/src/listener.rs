//! The listener task: holds one source session and forwards every message
//! not written by the session's own account into the ingestion queue.

use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use antiradar_core::{excerpt, InboundMessage};

use crate::channel::QueueSender;
use crate::credentials::Credentials;
use crate::error::{QueueError, SourceError};
use crate::source::{MessageSource, Session};

#[derive(Debug, Error)]
pub enum ListenerError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Queue(#[from] QueueError),
}

pub struct Listener {
    source: Arc<dyn MessageSource>,
    credentials: Credentials,
    queue: QueueSender,
}

impl Listener {
    pub fn new(source: Arc<dyn MessageSource>, credentials: Credentials, queue: QueueSender) -> Self {
        Self {
            source,
            credentials,
            queue,
        }
    }

    /// Run until cancelled (`Ok`) or until the session fails (`Err`).
    ///
    /// There is no reconnect: a lost session ends the listener and the
    /// caller decides what happens next. The session is closed on every exit
    /// path once it has been opened.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ListenerError> {
        let mut session = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                info!("listener cancelled before session start");
                return Ok(());
            }
            result = self.source.start_session(&self.credentials) => result?,
        };

        let identity = session.identity().to_string();
        info!(source = %self.source.name(), identity = %identity, "listener started");

        let outcome = self.forward(session.as_mut(), &identity, &cancel).await;

        if let Err(e) = session.close().await {
            warn!(error = %e, "failed to close source session");
        }
        match &outcome {
            Ok(()) => info!("listener stopped"),
            Err(e) => warn!(error = %e, "listener failed"),
        }
        outcome
    }

    async fn forward(
        &self,
        session: &mut dyn Session,
        identity: &str,
        cancel: &CancellationToken,
    ) -> Result<(), ListenerError> {
        loop {
            let event = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                event = session.next_event() => event?,
            };

            if event.author_id == identity {
                debug!("skipping own message");
                continue;
            }

            debug!(author_id = %event.author_id, message = %excerpt(&event.text), "enqueue");
            self.queue.enqueue(InboundMessage::new(event.text))?;
        }
    }
}
