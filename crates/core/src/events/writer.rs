use std::sync::Arc;

use tokio::sync::mpsc;

use super::{EventEnvelope, EventLogHandle, EventRecord, EventStore};

/// Background task that receives pipeline events and writes them to storage
pub struct EventLogWriter {
    rx: mpsc::Receiver<EventEnvelope>,
    store: Arc<dyn EventStore>,
}

impl EventLogWriter {
    pub fn new(rx: mpsc::Receiver<EventEnvelope>, store: Arc<dyn EventStore>) -> Self {
        Self { rx, store }
    }

    /// Run the writer, consuming events until the channel is closed
    ///
    /// This should be spawned as a background task. It exits only when every
    /// `EventLogHandle` clone has been dropped.
    pub async fn run(mut self) {
        tracing::info!("Event log writer started");

        while let Some(envelope) = self.rx.recv().await {
            let record = EventRecord {
                id: 0, // Will be set by the database
                timestamp: envelope.timestamp,
                event_type: envelope.event.event_type().to_string(),
                task_id: envelope.event.task_id().map(String::from),
                project_id: envelope.event.project_id().map(String::from),
                data: envelope.event,
            };

            if let Err(e) = self.store.insert(&record) {
                tracing::error!("Failed to write pipeline event: {}", e);
            }
        }

        tracing::info!("Event log writer shutting down");
    }
}

/// Create a complete event log
///
/// Returns:
/// - `EventLogHandle` - for emitting events (clone this to share across tasks)
/// - `EventLogWriter` - spawn this with `tokio::spawn(writer.run())`
pub fn create_event_log(
    store: Arc<dyn EventStore>,
    buffer_size: usize,
) -> (EventLogHandle, EventLogWriter) {
    let (tx, rx) = mpsc::channel(buffer_size);
    let handle = EventLogHandle::new(tx);
    let writer = EventLogWriter::new(rx, store);
    (handle, writer)
}
