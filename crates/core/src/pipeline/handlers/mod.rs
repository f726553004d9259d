//! One handler per pipeline stage.
//!
//! Handlers iterate their units of work (usually one per document), check
//! for cancellation before each unit and report progress through the
//! [`TaskHandle`]. A per-unit failure degrades or is recorded and the loop
//! continues; only a structural error aborts the whole task.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::content::{ContentError, ContentStore};
use crate::processor::ProcessorClient;
use crate::task::{StageKind, StageResult, Task, TaskError};
use crate::translation::TranslationStore;

use super::TaskHandle;

mod clean;
mod create;
mod generate;
mod parse;
mod structure;
mod translate;
mod understand;

pub use clean::CleanHandler;
pub use create::CreateHandler;
pub use generate::GenerateHandler;
pub use parse::ParseHandler;
pub use structure::StructureHandler;
pub use translate::TranslateHandler;
pub use understand::UnderstandHandler;

/// Structural (task-fatal) stage failure. Per-unit failures never surface
/// here; they are folded into the stage result.
#[derive(Debug, Error)]
pub enum StageError {
    #[error(transparent)]
    Content(#[from] ContentError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Translation(#[from] crate::translation::TranslationError),

    #[error("Processing service error: {0}")]
    Processor(String),

    #[error("{0}")]
    Invalid(String),
}

/// How a handler run ended.
pub enum HandlerOutcome {
    Completed(StageResult),
    /// Cancellation observed mid-run; the task status is already
    /// cancelled and must not be finalized.
    Cancelled,
}

/// A procedure executing one pipeline stage for one project.
#[async_trait]
pub trait StageHandler: Send + Sync {
    /// The stage this handler executes.
    fn stage(&self) -> StageKind;

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError>;
}

/// Build the closed handler set, one entry per [`StageKind`].
pub fn build_registry(
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
    translations: Arc<dyn TranslationStore>,
) -> HashMap<StageKind, Arc<dyn StageHandler>> {
    let handlers: Vec<Arc<dyn StageHandler>> = vec![
        Arc::new(ParseHandler::new(content.clone(), processor.clone())),
        Arc::new(CleanHandler::new(content.clone(), processor.clone())),
        Arc::new(UnderstandHandler::new(content.clone(), processor.clone())),
        Arc::new(StructureHandler::new(content.clone())),
        Arc::new(CreateHandler::new(content.clone(), processor.clone())),
        Arc::new(TranslateHandler::new(content.clone(), translations)),
        Arc::new(GenerateHandler::new(content, processor)),
    ];

    handlers
        .into_iter()
        .map(|handler| (handler.stage(), handler))
        .collect()
}

/// Percentage of `done` out of `total`, saturating at 100.
pub(crate) fn unit_progress(done: usize, total: usize) -> u8 {
    (((done * 100) / total.max(1)).min(100)) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::SqliteContentStore;
    use crate::testing::MockProcessorClient;
    use crate::translation::SqliteTranslationStore;

    #[test]
    fn test_registry_covers_every_stage() {
        let registry = build_registry(
            Arc::new(SqliteContentStore::in_memory().unwrap()),
            Arc::new(MockProcessorClient::new()),
            Arc::new(SqliteTranslationStore::in_memory().unwrap()),
        );

        assert_eq!(registry.len(), StageKind::ALL.len());
        for stage in StageKind::ALL {
            let handler = registry.get(&stage).expect("missing handler");
            assert_eq!(handler.stage(), stage);
        }
    }

    #[test]
    fn test_unit_progress() {
        assert_eq!(unit_progress(0, 4), 0);
        assert_eq!(unit_progress(1, 4), 25);
        assert_eq!(unit_progress(4, 4), 100);
        assert_eq!(unit_progress(1, 0), 100);
    }
}
