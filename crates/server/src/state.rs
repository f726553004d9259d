use std::sync::Arc;

use bindery_core::config::SanitizedConfig;
use bindery_core::content::ContentStore;
use bindery_core::events::{EventLogHandle, EventStore};
use bindery_core::pipeline::{Dispatcher, StageSequencer};
use bindery_core::task::TaskStore;
use bindery_core::translation::{TranslationCoordinator, TranslationStore};
use bindery_core::Config;

/// Shared application state
pub struct AppState {
    config: Config,
    tasks: Arc<dyn TaskStore>,
    content: Arc<dyn ContentStore>,
    translations: Arc<dyn TranslationStore>,
    event_store: Arc<dyn EventStore>,
    events: EventLogHandle,
    dispatcher: Arc<Dispatcher>,
    sequencer: StageSequencer,
    coordinator: TranslationCoordinator,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        tasks: Arc<dyn TaskStore>,
        content: Arc<dyn ContentStore>,
        translations: Arc<dyn TranslationStore>,
        event_store: Arc<dyn EventStore>,
        events: EventLogHandle,
        dispatcher: Arc<Dispatcher>,
        sequencer: StageSequencer,
        coordinator: TranslationCoordinator,
    ) -> Self {
        Self {
            config,
            tasks,
            content,
            translations,
            event_store,
            events,
            dispatcher,
            sequencer,
            coordinator,
        }
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn task_store(&self) -> &dyn TaskStore {
        self.tasks.as_ref()
    }

    pub fn content_store(&self) -> &dyn ContentStore {
        self.content.as_ref()
    }

    pub fn translation_store(&self) -> &dyn TranslationStore {
        self.translations.as_ref()
    }

    pub fn event_store(&self) -> &dyn EventStore {
        self.event_store.as_ref()
    }

    pub fn events(&self) -> &EventLogHandle {
        &self.events
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn sequencer(&self) -> &StageSequencer {
        &self.sequencer
    }

    pub fn coordinator(&self) -> &TranslationCoordinator {
        &self.coordinator
    }
}
