//! Pipeline event log
//!
//! Components emit [`PipelineEvent`]s through a cloned [`EventLogHandle`];
//! a single background [`EventLogWriter`] drains the channel and persists
//! them through an [`EventStore`]. Emission never blocks correctness:
//! a full buffer or a dead writer only costs the event itself.

mod handle;
mod sqlite;
mod store;
mod types;
mod writer;

pub use handle::{EventEnvelope, EventLogHandle};
pub use sqlite::SqliteEventStore;
pub use store::{EventFilter, EventLogError, EventStore};
pub use types::{EventRecord, PipelineEvent};
pub use writer::{create_event_log, EventLogWriter};
