//! Multi-language translation fan-out.
//!
//! One [`TranslationJob`] per target language, all independent; the
//! [`TranslationCoordinator`] creates and drives them, publishing a new
//! non-primary draft per completed language.

mod coordinator;
mod sqlite_store;
mod store;
mod types;

pub use coordinator::{FanoutOutcome, TranslationCoordinator};
pub use sqlite_store::SqliteTranslationStore;
pub use store::{
    CreateTranslationJob, TranslationError, TranslationFilter, TranslationStore,
};
pub use types::{
    is_supported_language, TranslationJob, TranslationStatus, SUPPORTED_LANGUAGES,
};
