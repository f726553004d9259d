//! Task records for tracking pipeline stage work.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTaskStore;
pub use store::{CreateTaskRequest, TaskError, TaskFilter, TaskStore};
pub use types::{
    GeneratedFile, StageKind, StageResult, Task, TaskStatus, ValidationSummary,
    DEFAULT_MAX_RETRIES,
};
