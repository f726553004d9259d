use std::sync::Arc;

use async_trait::async_trait;
use regex_lite::Regex;
use tracing::warn;

use crate::content::{ContentStore, Document, DocumentStatus, DocumentUpdate};
use crate::processor::ProcessorClient;
use crate::task::{StageKind, StageResult, Task};

use super::{unit_progress, HandlerOutcome, StageError, StageHandler, TaskHandle};

const REDACTION: &str = "[redacted]";

/// Detects and replaces sensitive entities in parsed document text.
///
/// When the processing service cannot be reached the handler degrades to a
/// built-in pattern pass (e-mail addresses and URLs) instead of failing the
/// task; the stage result records the degraded mode.
pub struct CleanHandler {
    content: Arc<dyn ContentStore>,
    processor: Arc<dyn ProcessorClient>,
    fallback_patterns: [Regex; 2],
}

impl CleanHandler {
    pub fn new(content: Arc<dyn ContentStore>, processor: Arc<dyn ProcessorClient>) -> Self {
        let email = Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
            .expect("valid email pattern");
        let url = Regex::new(r"https?://[^\s]+").expect("valid url pattern");
        Self {
            content,
            processor,
            fallback_patterns: [email, url],
        }
    }

    /// The text a document carries into this stage.
    fn document_text(document: &Document) -> Option<String> {
        let parsed = document.parsed_content.as_ref()?;
        parsed
            .get("ast")
            .and_then(|ast| ast.get("text"))
            .or_else(|| parsed.get("text"))
            .and_then(|text| text.as_str())
            .map(String::from)
    }

    /// Offline fallback: redact e-mail addresses and URLs.
    fn fallback_clean(&self, text: &str) -> (String, u32) {
        let mut replaced = 0u32;
        let mut cleaned = String::from(text);
        for pattern in &self.fallback_patterns {
            replaced += pattern.find_iter(&cleaned).count() as u32;
            cleaned = pattern.replace_all(&cleaned, REDACTION).into_owned();
        }
        (cleaned, replaced)
    }

    /// Clean one document's text, via the service or the fallback.
    /// Returns the cleaned text, the replacement count, and whether the
    /// fallback was used.
    async fn clean_text(&self, text: &str) -> (String, u32, bool) {
        let entities = match self.processor.detect_entities(text).await {
            Ok(entities) => entities,
            Err(e) => {
                warn!("Entity detection unavailable, using fallback: {}", e);
                let (cleaned, replaced) = self.fallback_clean(text);
                return (cleaned, replaced, true);
            }
        };

        if entities.is_empty() {
            return (text.to_string(), 0, false);
        }

        match self.processor.replace_entities(text, entities).await {
            Ok(response) => (response.text, response.replaced_count, false),
            Err(e) => {
                warn!("Entity replacement unavailable, using fallback: {}", e);
                let (cleaned, replaced) = self.fallback_clean(text);
                (cleaned, replaced, true)
            }
        }
    }
}

#[async_trait]
impl StageHandler for CleanHandler {
    fn stage(&self) -> StageKind {
        StageKind::Clean
    }

    async fn run(&self, task: &Task, handle: &TaskHandle) -> Result<HandlerOutcome, StageError> {
        let documents = self.content.list_documents(&task.project_id)?;
        let total = documents.len().max(1);

        let mut cleaned = 0u32;
        let mut entities_replaced = 0u32;
        let mut degraded = false;

        for (index, document) in documents.iter().enumerate() {
            if handle.is_cancelled()? {
                return Ok(HandlerOutcome::Cancelled);
            }

            if document.status == DocumentStatus::Parsed {
                let Some(text) = Self::document_text(document) else {
                    warn!(document_id = %document.id, "Parsed document has no text, skipping");
                    continue;
                };

                let (clean_text, replaced, used_fallback) = self.clean_text(&text).await;
                self.content
                    .update_document(&document.id, DocumentUpdate::Sanitized(clean_text))?;

                cleaned += 1;
                entities_replaced += replaced;
                degraded |= used_fallback;
            }

            let done = index + 1;
            handle.set_progress(
                unit_progress(done, total),
                &format!("cleaned {}/{} documents", done, documents.len()),
            )?;
        }

        if documents.is_empty() {
            handle.set_progress(100, "no documents")?;
        }

        Ok(HandlerOutcome::Completed(StageResult::Clean {
            cleaned,
            entities_replaced,
            degraded,
        }))
    }
}
