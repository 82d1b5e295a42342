//! Extraction gateway: turns an uploaded document into a schema-constrained
//! record through an external generation service.

pub mod gateway;
pub mod gemini;
pub mod mime;
pub mod mock;
pub mod parser;
pub mod types;

pub use gateway::{run_bounded, ExtractionGateway, TextGeneration};
pub use gemini::GeminiClient;
pub use mime::{DocumentMime, MimeError};
pub use mock::{MockExtractor, MockTextGenerator};
pub use types::{DocumentExtractor, SourceDocument, TextGenerator};

use std::time::Duration;

use thiserror::Error;

use crate::pipeline::schema::{SchemaId, SchemaViolation};

/// Instruction sent alongside every document.
pub const EXTRACTION_PROMPT: &str = "Extract Information From this document";

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("Extraction service is not reachable at {0}")]
    Connection(String),

    #[error("Extraction service returned error (status {status}): {body}")]
    Service { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Extraction timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("Extraction task failed: {0}")]
    Task(String),

    #[error("Extraction service is not configured: {0}")]
    NotConfigured(String),

    #[error("Extraction service returned no content")]
    EmptyResponse,

    #[error("Malformed extraction output: {0}")]
    Malformed(String),

    #[error("Extraction output violates schema {schema} ({} problems)", .violations.len())]
    SchemaViolations {
        schema: SchemaId,
        violations: Vec<SchemaViolation>,
    },
}

impl ExtractionError {
    /// The service answered, but not with a record matching the schema.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::EmptyResponse | Self::Malformed(_) | Self::SchemaViolations { .. }
        )
    }
}
