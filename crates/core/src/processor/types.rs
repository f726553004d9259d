//! Wire types for the document processing service.
//!
//! The service speaks camelCase JSON; these structs are the only place
//! that convention leaks into the codebase.

use serde::{Deserialize, Serialize};

/// Error type for processing service calls.
#[derive(Debug, thiserror::Error)]
pub enum ProcessorError {
    /// The service could not be reached at all. Callers treat this as a
    /// degradable condition, not a task failure.
    #[error("Processing service unavailable: {0}")]
    Unavailable(String),

    #[error("Processing service request timed out")]
    Timeout,

    /// The service answered with an error status or a failure payload.
    #[error("Processing service error: {0}")]
    Api(String),

    #[error("Invalid response from processing service: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseRequest {
    pub file_path: String,
    pub format: String,
    pub filename: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParseResponse {
    pub success: bool,
    #[serde(default)]
    pub ast: serde_json::Value,
    #[serde(default)]
    pub metadata: serde_json::Value,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub ast: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub analysis: serde_json::Value,
}

/// An entity flagged by sensitive-content detection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectedEntity {
    /// Entity category ("email", "phone", "person", "url").
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectRequest {
    pub text: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectResponse {
    #[serde(default)]
    pub entities: Vec<DetectedEntity>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceRequest {
    pub text: String,
    pub entities: Vec<DetectedEntity>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceResponse {
    pub text: String,
    #[serde(default)]
    pub replaced_count: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteRequest {
    pub content: String,
    pub style: String,
    pub language: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewriteResponse {
    pub rewritten: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateOptions {
    pub preserve_formatting: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateRequest {
    pub content: String,
    pub target_language: String,
    pub options: TranslateOptions,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateResponse {
    pub translated_content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateChapter {
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub chapters: Vec<GenerateChapter>,
    pub metadata: serde_json::Value,
    pub format: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedFileInfo {
    pub filename: String,
    pub format: String,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateValidation {
    pub valid: bool,
    #[serde(default)]
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub files: Vec<GeneratedFileInfo>,
    pub validation: GenerateValidation,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_request_uses_camel_case() {
        let request = ParseRequest {
            file_path: "/uploads/a.pdf".to_string(),
            format: "pdf".to_string(),
            filename: "a.pdf".to_string(),
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"filePath\""));
        assert!(!json.contains("file_path"));
    }

    #[test]
    fn test_detected_entity_round_trip() {
        let json = r#"{"type":"email","text":"a@b.com"}"#;
        let entity: DetectedEntity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.kind, "email");
        assert_eq!(entity.text, "a@b.com");
        assert_eq!(serde_json::to_string(&entity).unwrap(), json);
    }

    #[test]
    fn test_translate_request_wire_shape() {
        let request = TranslateRequest {
            content: "hello".to_string(),
            target_language: "ja".to_string(),
            options: TranslateOptions {
                preserve_formatting: true,
            },
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("\"targetLanguage\":\"ja\""));
        assert!(json.contains("\"preserveFormatting\":true"));
    }

    #[test]
    fn test_generate_response_defaults() {
        let json = r#"{"validation":{"valid":false,"issues":["missing toc"]}}"#;
        let response: GenerateResponse = serde_json::from_str(json).unwrap();
        assert!(response.files.is_empty());
        assert!(!response.validation.valid);
        assert_eq!(response.validation.issues, vec!["missing toc"]);
    }
}
