//! Upload ingestion: validate, extract, resolve identity, reconcile, persist.
//!
//! A failed or timed-out extraction returns before the store is touched, so
//! no partial document is ever written. Two concurrent uploads of the same
//! report may interleave between read and upsert; the later write wins.

use std::sync::Arc;

use base64::Engine;
use chrono::Utc;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::db::{self, DatabaseError, PersistenceGateway};
use crate::models::{DiabetesRecord, ProfileRecord, StructuredRecord};
use crate::pipeline::extraction::{mime, ExtractionError, ExtractionGateway, MimeError, SourceDocument};
use crate::pipeline::identity::{self, IdentityError, RecordIdentity};
use crate::pipeline::reconcile::{reconcile, ReconcileError};
use crate::pipeline::schema::{SchemaDomain, SchemaError, SchemaId, SchemaRegistry};

#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(#[from] MimeError),

    #[error("Upload has no usable filename")]
    InvalidFilename,

    #[error("Invalid report identity: {0}")]
    Identity(#[from] IdentityError),

    #[error("Schema lookup failed: {0}")]
    Schema(#[from] SchemaError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Reconciliation failed: {0}")]
    Reconcile(#[from] ReconcileError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One upload, fully read into memory.
#[derive(Debug, Clone)]
pub struct IngestRequest {
    pub owner_id: String,
    pub original_filename: String,
    pub declared_mime: Option<String>,
    pub bytes: Vec<u8>,
    pub domain: SchemaDomain,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub schema: SchemaId,
    pub created: bool,
    pub changed_fields: Vec<&'static str>,
    /// The reconciled document as persisted.
    pub document: Value,
}

#[derive(Clone)]
pub struct Ingestor {
    registry: Arc<SchemaRegistry>,
    extraction: ExtractionGateway,
    store: Arc<dyn PersistenceGateway>,
}

/// SHA-256 of the upload, base64-encoded, for log correlation.
pub fn content_digest(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(Sha256::digest(bytes))
}

impl Ingestor {
    pub fn new(
        registry: Arc<SchemaRegistry>,
        extraction: ExtractionGateway,
        store: Arc<dyn PersistenceGateway>,
    ) -> Self {
        Self {
            registry,
            extraction,
            store,
        }
    }

    pub async fn ingest(&self, request: IngestRequest) -> Result<IngestOutcome, IngestError> {
        match request.domain {
            SchemaDomain::MedicalReport => self.ingest_as::<StructuredRecord>(request).await,
            SchemaDomain::Diabetes => self.ingest_as::<DiabetesRecord>(request).await,
        }
    }

    async fn ingest_as<R: ProfileRecord>(
        &self,
        request: IngestRequest,
    ) -> Result<IngestOutcome, IngestError> {
        let stored_name =
            identity::stored_filename(&request.original_filename).ok_or(IngestError::InvalidFilename)?;
        let identity = identity::resolve(&request.owner_id, &stored_name)?;
        let format = mime::detect(request.declared_mime.as_deref(), &stored_name, &request.bytes)?;
        let schema = self.registry.latest(R::DOMAIN)?;

        tracing::info!(
            owner_id = %identity.owner_id,
            report_identity = %identity.report_identity,
            schema = %schema.id,
            mime = %format,
            bytes = request.bytes.len(),
            sha256 = %content_digest(&request.bytes),
            "Ingesting report"
        );

        let document = SourceDocument {
            filename: stored_name,
            mime: format,
            bytes: request.bytes,
        };
        let record: R = self.extraction.extract(document, schema).await.map_err(|e| {
            tracing::warn!(
                owner_id = %identity.owner_id,
                report_identity = %identity.report_identity,
                error = %e,
                "Extraction failed, nothing persisted"
            );
            e
        })?;

        let existing = db::find_report::<R>(self.store.as_ref(), &identity)
            .map_err(|e| persist_failed(&identity, "load", e))?;
        let reconciled = reconcile(existing.as_ref(), record, &identity, schema.id, Utc::now())
            .map_err(|e| persist_failed(&identity, "reconcile", e))?;
        db::save_report(self.store.as_ref(), &reconciled.document)
            .map_err(|e| persist_failed(&identity, "save", e))?;

        tracing::info!(
            owner_id = %identity.owner_id,
            report_identity = %identity.report_identity,
            created = reconciled.created,
            changed = reconciled.changed_fields.len(),
            "Report reconciled"
        );

        Ok(IngestOutcome {
            schema: schema.id,
            created: reconciled.created,
            changed_fields: reconciled.changed_fields,
            document: serde_json::to_value(&reconciled.document)
                .map_err(|e| persist_failed(&identity, "encode", e))?,
        })
    }
}

/// Log a post-extraction failure with the report it concerns.
fn persist_failed<E: std::fmt::Display>(identity: &RecordIdentity, step: &str, error: E) -> E {
    tracing::error!(
        owner_id = %identity.owner_id,
        report_identity = %identity.report_identity,
        step,
        error = %error,
        "Report not persisted"
    );
    error
}
