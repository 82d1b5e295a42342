use super::mime::DocumentMime;
use super::ExtractionError;
use crate::pipeline::schema::OutputSchema;

/// An uploaded document, fully read into memory for the duration of one request.
#[derive(Debug, Clone)]
pub struct SourceDocument {
    pub filename: String,
    pub mime: DocumentMime,
    pub bytes: Vec<u8>,
}

/// External capability that reads a document and answers with JSON shaped
/// by `schema`. Blocking; the gateway runs it off the async runtime.
pub trait DocumentExtractor: Send + Sync {
    fn extract(
        &self,
        document: &SourceDocument,
        schema: &OutputSchema,
    ) -> Result<String, ExtractionError>;
}

/// External free-text generation, used for settings explanations.
pub trait TextGenerator: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, ExtractionError>;
}
