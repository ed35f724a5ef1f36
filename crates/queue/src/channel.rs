//! The ingestion queue: unbounded, strictly FIFO, single producer and single
//! consumer. It is the only thing the listener and the consumer share.

use tokio::sync::mpsc;

use antiradar_core::InboundMessage;

use crate::error::QueueError;

/// Create a connected sender/receiver pair.
pub fn ingestion_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (QueueSender { tx }, QueueReceiver { rx })
}

/// Producer half, owned by the listener.
#[derive(Debug)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<InboundMessage>,
}

impl QueueSender {
    /// Enqueue without blocking. Fails only when the receiver was dropped.
    pub fn enqueue(&self, message: InboundMessage) -> Result<(), QueueError> {
        self.tx.send(message).map_err(|_| QueueError::Closed)
    }
}

/// Consumer half, owned by the processing loop.
#[derive(Debug)]
pub struct QueueReceiver {
    rx: mpsc::UnboundedReceiver<InboundMessage>,
}

impl QueueReceiver {
    /// Wait for the next message. `None` once the sender is dropped and the
    /// queue is drained. Cancel-safe: a cancelled call loses nothing.
    pub async fn dequeue(&mut self) -> Option<InboundMessage> {
        self.rx.recv().await
    }
}
