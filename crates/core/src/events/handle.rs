use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::PipelineEvent;

/// An event with its capture timestamp, as sent over the channel
#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub timestamp: DateTime<Utc>,
    pub event: PipelineEvent,
}

/// Handle for emitting pipeline events
///
/// Clone this freely; all clones feed the same background writer. Emitting
/// never fails the caller: if the writer is gone or the buffer is full the
/// event is dropped with an error log.
#[derive(Clone)]
pub struct EventLogHandle {
    tx: mpsc::Sender<EventEnvelope>,
}

impl EventLogHandle {
    pub fn new(tx: mpsc::Sender<EventEnvelope>) -> Self {
        Self { tx }
    }

    /// Emit an event, waiting if the buffer is full
    pub async fn emit(&self, event: PipelineEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };

        if let Err(e) = self.tx.send(envelope).await {
            tracing::error!("Failed to emit pipeline event: {}", e);
        }
    }

    /// Emit an event from a blocking context
    pub fn emit_blocking(&self, event: PipelineEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };

        if let Err(e) = self.tx.blocking_send(envelope) {
            tracing::error!("Failed to emit pipeline event: {}", e);
        }
    }

    /// Emit an event without waiting; drops the event if the buffer is full
    pub fn try_emit(&self, event: PipelineEvent) {
        let envelope = EventEnvelope {
            timestamp: Utc::now(),
            event,
        };

        if let Err(e) = self.tx.try_send(envelope) {
            tracing::error!("Failed to emit pipeline event (buffer full?): {}", e);
        }
    }
}
