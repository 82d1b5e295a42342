use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::types::{DocumentExtractor, SourceDocument, TextGenerator};
use super::ExtractionError;
use crate::pipeline::schema::OutputSchema;

enum Behavior {
    Respond(String),
    Fail(String),
    Delay(Duration, String),
}

/// Deterministic extractor for tests and offline runs.
pub struct MockExtractor {
    behavior: Behavior,
    calls: AtomicUsize,
}

impl MockExtractor {
    /// Always answers with `response`.
    pub fn new(response: &str) -> Self {
        Self::with_behavior(Behavior::Respond(response.to_string()))
    }

    /// Always fails as an unreachable service.
    pub fn failing(reason: &str) -> Self {
        Self::with_behavior(Behavior::Fail(reason.to_string()))
    }

    /// Sleeps before answering, to exercise timeouts.
    pub fn delayed(delay: Duration, response: &str) -> Self {
        Self::with_behavior(Behavior::Delay(delay, response.to_string()))
    }

    fn with_behavior(behavior: Behavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DocumentExtractor for MockExtractor {
    fn extract(
        &self,
        _document: &SourceDocument,
        _schema: &OutputSchema,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            Behavior::Respond(response) => Ok(response.clone()),
            Behavior::Fail(reason) => Err(ExtractionError::Connection(reason.clone())),
            Behavior::Delay(delay, response) => {
                std::thread::sleep(*delay);
                Ok(response.clone())
            }
        }
    }
}

/// Text generator returning a fixed answer, or failing.
pub struct MockTextGenerator {
    response: Result<String, String>,
}

impl MockTextGenerator {
    pub fn new(response: &str) -> Self {
        Self {
            response: Ok(response.to_string()),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            response: Err(reason.to_string()),
        }
    }
}

impl TextGenerator for MockTextGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, ExtractionError> {
        self.response
            .clone()
            .map_err(|reason| ExtractionError::Service { status: 503, body: reason })
    }
}
