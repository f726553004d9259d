//! HTTP client for the document processing service.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::ProcessorConfig;

use super::types::*;

/// Client interface to the document processing service.
///
/// One method per collaborator endpoint. Implementations map transport
/// failures to [`ProcessorError::Unavailable`] so stage handlers can fall
/// back to degraded behavior instead of failing the whole task.
#[async_trait]
pub trait ProcessorClient: Send + Sync {
    /// True when the service answers its health endpoint.
    async fn health(&self) -> bool;

    async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, ProcessorError>;

    async fn analyze(&self, ast: serde_json::Value) -> Result<serde_json::Value, ProcessorError>;

    async fn detect_entities(&self, text: &str) -> Result<Vec<DetectedEntity>, ProcessorError>;

    async fn replace_entities(
        &self,
        text: &str,
        entities: Vec<DetectedEntity>,
    ) -> Result<ReplaceResponse, ProcessorError>;

    async fn rewrite(
        &self,
        content: &str,
        style: &str,
        language: &str,
    ) -> Result<String, ProcessorError>;

    async fn translate(
        &self,
        content: &str,
        target_language: &str,
        preserve_formatting: bool,
    ) -> Result<String, ProcessorError>;

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProcessorError>;
}

/// reqwest-based implementation talking to the real service.
pub struct HttpProcessorClient {
    client: Client,
    base_url: String,
}

impl HttpProcessorClient {
    pub fn new(config: &ProcessorConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn post_json<Req: Serialize + Sync, Resp: DeserializeOwned>(
        &self,
        path: &str,
        request: &Req,
    ) -> Result<Resp, ProcessorError> {
        let url = self.url(path);
        debug!(url = %url, "Calling processing service");

        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProcessorError::Timeout
                } else if e.is_connect() {
                    ProcessorError::Unavailable(e.to_string())
                } else {
                    ProcessorError::Api(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProcessorError::Api(format!("HTTP {}: {}", status, body)));
        }

        response
            .json()
            .await
            .map_err(|e| ProcessorError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl ProcessorClient for HttpProcessorClient {
    async fn health(&self) -> bool {
        match self.client.get(self.url("/health")).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    async fn parse(&self, request: ParseRequest) -> Result<ParseResponse, ProcessorError> {
        let response: ParseResponse = self.post_json("/parse", &request).await?;
        if !response.success {
            let reason = response
                .error
                .clone()
                .unwrap_or_else(|| "parse failed".to_string());
            return Err(ProcessorError::Api(reason));
        }
        Ok(response)
    }

    async fn analyze(&self, ast: serde_json::Value) -> Result<serde_json::Value, ProcessorError> {
        let response: AnalyzeResponse = self.post_json("/analyze", &AnalyzeRequest { ast }).await?;
        Ok(response.analysis)
    }

    async fn detect_entities(&self, text: &str) -> Result<Vec<DetectedEntity>, ProcessorError> {
        let response: DetectResponse = self
            .post_json(
                "/sanitize/detect",
                &DetectRequest {
                    text: text.to_string(),
                },
            )
            .await?;
        Ok(response.entities)
    }

    async fn replace_entities(
        &self,
        text: &str,
        entities: Vec<DetectedEntity>,
    ) -> Result<ReplaceResponse, ProcessorError> {
        self.post_json(
            "/sanitize/replace",
            &ReplaceRequest {
                text: text.to_string(),
                entities,
            },
        )
        .await
    }

    async fn rewrite(
        &self,
        content: &str,
        style: &str,
        language: &str,
    ) -> Result<String, ProcessorError> {
        let response: RewriteResponse = self
            .post_json(
                "/rewrite",
                &RewriteRequest {
                    content: content.to_string(),
                    style: style.to_string(),
                    language: language.to_string(),
                },
            )
            .await?;
        Ok(response.rewritten)
    }

    async fn translate(
        &self,
        content: &str,
        target_language: &str,
        preserve_formatting: bool,
    ) -> Result<String, ProcessorError> {
        let response: TranslateResponse = self
            .post_json(
                "/translate",
                &TranslateRequest {
                    content: content.to_string(),
                    target_language: target_language.to_string(),
                    options: TranslateOptions {
                        preserve_formatting,
                    },
                },
            )
            .await?;
        Ok(response.translated_content)
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse, ProcessorError> {
        self.post_json("/generate", &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> HttpProcessorClient {
        HttpProcessorClient::new(&ProcessorConfig {
            base_url: "http://localhost:1".to_string(),
            timeout_secs: 1,
        })
    }

    #[test]
    fn test_url_building_strips_trailing_slash() {
        let client = HttpProcessorClient::new(&ProcessorConfig {
            base_url: "http://proc:9000/".to_string(),
            timeout_secs: 5,
        });
        assert_eq!(client.url("/parse"), "http://proc:9000/parse");
    }

    #[tokio::test]
    async fn test_unreachable_service_is_unavailable() {
        // Nothing listens on port 1; the connect error must map to
        // Unavailable, not Api.
        let client = test_client();
        let result = client.detect_entities("some text").await;
        assert!(matches!(result, Err(ProcessorError::Unavailable(_))));
    }

    #[tokio::test]
    async fn test_unreachable_service_health_is_false() {
        let client = test_client();
        assert!(!client.health().await);
    }
}
