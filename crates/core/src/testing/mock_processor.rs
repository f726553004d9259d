use std::sync::Mutex;

use async_trait::async_trait;

use crate::processor::{
    DetectedEntity, GenerateRequest, GenerateResponse, GenerateValidation, GeneratedFileInfo,
    ParseRequest, ParseResponse, ProcessorClient, ProcessorError, ReplaceResponse,
};

/// Scripted processing-service double.
///
/// Answers every endpoint with a deterministic transform of its input, so
/// tests can assert on outputs without a live service. Failure modes are
/// switchable per instance: `set_unavailable` simulates the service being
/// down (connectivity errors everywhere), `fail_endpoint` scripts an API
/// error for one endpoint.
pub struct MockProcessorClient {
    unavailable: Mutex<bool>,
    failing_endpoints: Mutex<Vec<String>>,
    detected_entities: Mutex<Vec<DetectedEntity>>,
    calls: Mutex<Vec<String>>,
}

impl Default for MockProcessorClient {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProcessorClient {
    pub fn new() -> Self {
        Self {
            unavailable: Mutex::new(false),
            failing_endpoints: Mutex::new(Vec::new()),
            detected_entities: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Simulate the whole service being unreachable.
    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock().unwrap() = unavailable;
    }

    /// Script an API error for one endpoint ("parse", "rewrite", ...).
    pub fn fail_endpoint(&self, endpoint: &str) {
        self.failing_endpoints
            .lock()
            .unwrap()
            .push(endpoint.to_string());
    }

    /// Entities the detect endpoint reports for any input.
    pub fn set_detected_entities(&self, entities: Vec<DetectedEntity>) {
        *self.detected_entities.lock().unwrap() = entities;
    }

    /// Endpoint names in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, endpoint: &str) -> Result<(), ProcessorError> {
        self.calls.lock().unwrap().push(endpoint.to_string());

        if *self.unavailable.lock().unwrap() {
            return Err(ProcessorError::Unavailable(
                "mock service unavailable".to_string(),
            ));
        }
        if self
            .failing_endpoints
            .lock()
            .unwrap()
            .iter()
            .any(|e| e == endpoint)
        {
            return Err(ProcessorError::Api(format!("mock {} failure", endpoint)));
        }
        Ok(())
    }
}

#[async_trait]
impl ProcessorClient for MockProcessorClient {
    async fn health(&self) -> bool {
        self.calls.lock().unwrap().push("health".to_string());
        !*self.unavailable.lock().unwrap()
    }

    async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, ProcessorError> {
        self.record("parse")?;
        Ok(ParseResponse {
            success: true,
            ast: serde_json::json!({
                "text": format!("text of {}", request.filename),
            }),
            metadata: serde_json::json!({ "filename": request.filename }),
            error: None,
        })
    }

    async fn analyze(&self, ast: serde_json::Value) -> Result<serde_json::Value, ProcessorError> {
        self.record("analyze")?;
        let text = ast
            .get("text")
            .and_then(|t| t.as_str())
            .unwrap_or_default()
            .to_string();
        Ok(serde_json::json!({
            "title": "Analyzed section",
            "summary": text,
            "key_points": [],
        }))
    }

    async fn detect_entities(&self, _text: &str) -> Result<Vec<DetectedEntity>, ProcessorError> {
        self.record("detect")?;
        Ok(self.detected_entities.lock().unwrap().clone())
    }

    async fn replace_entities(
        &self,
        text: &str,
        entities: Vec<DetectedEntity>,
    ) -> Result<ReplaceResponse, ProcessorError> {
        self.record("replace")?;
        let mut replaced = text.to_string();
        for entity in &entities {
            replaced = replaced.replace(&entity.text, "[redacted]");
        }
        Ok(ReplaceResponse {
            text: replaced,
            replaced_count: entities.len() as u32,
        })
    }

    async fn rewrite(
        &self,
        content: &str,
        style: &str,
        _language: &str,
    ) -> Result<String, ProcessorError> {
        self.record("rewrite")?;
        Ok(format!("rewritten ({}): {}", style, content))
    }

    async fn translate(
        &self,
        content: &str,
        target_language: &str,
        _preserve_formatting: bool,
    ) -> Result<String, ProcessorError> {
        self.record("translate")?;
        Ok(format!("[{}] {}", target_language, content))
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProcessorError> {
        self.record("generate")?;
        Ok(GenerateResponse {
            files: vec![GeneratedFileInfo {
                filename: format!("book.{}", request.format),
                format: request.format.clone(),
                size_bytes: Some(1024),
            }],
            validation: GenerateValidation {
                valid: true,
                issues: vec![],
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_answers_and_records_calls() {
        let mock = MockProcessorClient::new();

        assert!(mock.health().await);
        let translated = mock.translate("hello", "ja", true).await.unwrap();
        assert_eq!(translated, "[ja] hello");

        assert_eq!(mock.calls(), vec!["health", "translate"]);
    }

    #[tokio::test]
    async fn test_unavailable_mode() {
        let mock = MockProcessorClient::new();
        mock.set_unavailable(true);

        assert!(!mock.health().await);
        let result = mock.rewrite("text", "book", "en").await;
        assert!(matches!(result, Err(ProcessorError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_scripted_endpoint_failure() {
        let mock = MockProcessorClient::new();
        mock.fail_endpoint("rewrite");

        let result = mock.rewrite("text", "book", "en").await;
        assert!(matches!(result, Err(ProcessorError::Api(_))));

        // Other endpoints keep working
        assert!(mock.translate("x", "de", false).await.is_ok());
    }

    #[tokio::test]
    async fn test_replace_redacts_entities() {
        let mock = MockProcessorClient::new();
        let response = mock
            .replace_entities(
                "mail me at a@b.com",
                vec![DetectedEntity {
                    kind: "email".to_string(),
                    text: "a@b.com".to_string(),
                }],
            )
            .await
            .unwrap();

        assert_eq!(response.text, "mail me at [redacted]");
        assert_eq!(response.replaced_count, 1);
    }
}
