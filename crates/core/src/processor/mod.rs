//! Client for the external document processing service.

mod client;
mod types;

pub use client::{HttpProcessorClient, ProcessorClient};
pub use types::{
    AnalyzeRequest, AnalyzeResponse, DetectRequest, DetectResponse, DetectedEntity,
    GenerateChapter, GenerateRequest, GenerateResponse, GenerateValidation, GeneratedFileInfo,
    ParseRequest, ParseResponse, ProcessorError, ReplaceRequest, ReplaceResponse, RewriteRequest,
    RewriteResponse, TranslateOptions, TranslateRequest, TranslateResponse,
};
