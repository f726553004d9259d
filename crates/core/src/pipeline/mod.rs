//! Stage execution: the worker pool, the per-stage handlers, project
//! stage sequencing and the startup recovery scan.

mod context;
mod dispatcher;
pub mod handlers;
mod recovery;
mod sequencer;

pub use context::TaskHandle;
pub use dispatcher::{DispatchError, Dispatcher};
pub use handlers::{build_registry, HandlerOutcome, StageError, StageHandler};
pub use recovery::{recover_interrupted_tasks, replay_completed_stages, RecoveryReport};
pub use sequencer::{next_stage_after, project_stage_for, StageSequencer};
