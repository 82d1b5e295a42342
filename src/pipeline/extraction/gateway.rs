use std::sync::Arc;
use std::time::Duration;

use super::parser::parse_record;
use super::types::{DocumentExtractor, SourceDocument, TextGenerator};
use super::ExtractionError;
use crate::models::ProfileRecord;
use crate::pipeline::schema::OutputSchema;

/// Run a blocking service call on the blocking pool, bounded by `limit`.
///
/// The call is attempted once. Expiry and panics inside the call both come
/// back as errors; a call that outlives its limit finishes in the background
/// and its answer is discarded.
pub async fn run_bounded<T, F>(limit: Duration, call: F) -> Result<T, ExtractionError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ExtractionError> + Send + 'static,
{
    match tokio::time::timeout(limit, tokio::task::spawn_blocking(call)).await {
        Err(_) => Err(ExtractionError::Timeout(limit)),
        Ok(Err(join)) => Err(ExtractionError::Task(join.to_string())),
        Ok(Ok(result)) => result,
    }
}

/// Single-attempt, schema-constrained extraction.
#[derive(Clone)]
pub struct ExtractionGateway {
    extractor: Arc<dyn DocumentExtractor>,
    timeout: Duration,
}

impl ExtractionGateway {
    pub fn new(extractor: Arc<dyn DocumentExtractor>, timeout: Duration) -> Self {
        Self { extractor, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Extract `document` into a record of type `R` shaped by `schema`.
    pub async fn extract<R: ProfileRecord>(
        &self,
        document: SourceDocument,
        schema: &OutputSchema,
    ) -> Result<R, ExtractionError> {
        let extractor = Arc::clone(&self.extractor);
        let request_schema = schema.clone();
        let raw = run_bounded(self.timeout, move || {
            extractor.extract(&document, &request_schema)
        })
        .await?;

        parse_record(&raw, schema)
    }
}

/// Bounded free-text generation.
#[derive(Clone)]
pub struct TextGeneration {
    generator: Arc<dyn TextGenerator>,
    timeout: Duration,
}

impl TextGeneration {
    pub fn new(generator: Arc<dyn TextGenerator>, timeout: Duration) -> Self {
        Self { generator, timeout }
    }

    pub async fn generate(&self, prompt: String) -> Result<String, ExtractionError> {
        let generator = Arc::clone(&self.generator);
        run_bounded(self.timeout, move || generator.generate(&prompt)).await
    }
}
