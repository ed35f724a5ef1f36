//! Queue and message-source error types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("ingestion queue closed: consumer is gone")]
    Closed,
}

/// Session-level failures. All of these are fatal for the listener.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("credentials error: {0}")]
    Credentials(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("connection error: {0}")]
    Connect(String),

    #[error("handshake error: {0}")]
    Handshake(String),

    #[error("session disconnected: {0}")]
    Disconnected(String),
}
