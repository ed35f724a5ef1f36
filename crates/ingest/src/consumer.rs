//! The consumer task: dequeue → extract → geocode → assemble → persist, one
//! message at a time in arrival order.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use antiradar_core::{Extraction, InboundMessage, StoredRecord};
use antiradar_geocode::GeocoderAdapter;
use antiradar_llm::Extractor;
use antiradar_queue::QueueReceiver;
use antiradar_storage::PersistenceSink;

use crate::assembler::RecordAssembler;

pub struct Consumer {
    queue: QueueReceiver,
    extractor: Extractor,
    geocoder: GeocoderAdapter,
    assembler: RecordAssembler,
    sink: PersistenceSink,
}

impl Consumer {
    pub fn new(
        queue: QueueReceiver,
        extractor: Extractor,
        geocoder: GeocoderAdapter,
        assembler: RecordAssembler,
        sink: PersistenceSink,
    ) -> Self {
        Self {
            queue,
            extractor,
            geocoder,
            assembler,
            sink,
        }
    }

    /// Process messages until cancelled or until the queue is closed and
    /// drained. A failing message never ends the loop.
    ///
    /// On cancellation the message in flight, if any, is dropped.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!("consumer started");
        let mut processed: u64 = 0;
        let mut stored: u64 = 0;

        loop {
            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                message = self.queue.dequeue() => match message {
                    Some(message) => message,
                    None => {
                        info!("ingestion queue closed");
                        break;
                    }
                },
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!(message = %message.excerpt(), "shutdown with message in flight; dropped");
                    break;
                }
                outcome = self.process(&message) => outcome,
            };

            processed += 1;
            if outcome.is_some() {
                stored += 1;
            }
        }

        info!(processed, stored, "consumer stopped");
    }

    /// Run one message through the enrichment chain. `None` when no record
    /// was stored, for whatever reason; the reason has been logged.
    pub async fn process(&self, message: &InboundMessage) -> Option<StoredRecord> {
        let location = match self.extractor.extract(&message.text).await {
            Extraction::Extracted(location) => location,
            Extraction::NoExtraction => {
                debug!(message = %message.excerpt(), "no record for message");
                return None;
            }
        };

        let outcome = self.geocoder.resolve(&location).await;
        let record = self.assembler.assemble(&message.text, &location, outcome);
        self.sink.persist(&record).await
    }
}
