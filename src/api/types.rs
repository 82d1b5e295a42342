//! Shared types for the API layer.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::db::PersistenceGateway;
use crate::pipeline::extraction::{DocumentExtractor, ExtractionGateway, TextGeneration, TextGenerator};
use crate::pipeline::ingest::Ingestor;
use crate::pipeline::schema::SchemaRegistry;

// ═══════════════════════════════════════════════════════════
// API context: shared state for the router
// ═══════════════════════════════════════════════════════════

/// Shared context for all API routes and middleware.
/// Everything inside is either immutable or internally synchronised.
#[derive(Clone)]
pub struct ApiContext {
    pub registry: Arc<SchemaRegistry>,
    pub store: Arc<dyn PersistenceGateway>,
    pub ingestor: Ingestor,
    pub text_generation: TextGeneration,
    pub max_upload_bytes: usize,
}

impl ApiContext {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        store: Arc<dyn PersistenceGateway>,
        extractor: Arc<dyn DocumentExtractor>,
        generator: Arc<dyn TextGenerator>,
        timeout: Duration,
    ) -> Self {
        let extraction = ExtractionGateway::new(extractor, timeout);
        Self {
            ingestor: Ingestor::new(Arc::clone(&registry), extraction, Arc::clone(&store)),
            text_generation: TextGeneration::new(generator, timeout),
            registry,
            store,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }
}

// ═══════════════════════════════════════════════════════════
// Response envelope
// ═══════════════════════════════════════════════════════════

/// Success body: `{"message": "...", "data": ...}`.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub message: &'static str,
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            message: "Success",
            data,
        }
    }

    pub fn with_message(message: &'static str, data: T) -> Self {
        Self { message, data }
    }
}
