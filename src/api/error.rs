//! API error types with structured JSON responses.

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::db::DatabaseError;
use crate::models::FieldViolation;
use crate::pipeline::extraction::ExtractionError;
use crate::pipeline::ingest::IngestError;
use crate::pipeline::profile_patch::PatchError;
use crate::pipeline::schema::SchemaError;

/// Structured error response body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<FieldViolation>,
}

/// Request-boundary errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Validation failed: {message}")]
    ValidationFailed {
        message: String,
        details: Vec<FieldViolation>,
    },
    #[error("Extraction failed: {0}")]
    ExtractionFailed(String),
    #[error("Malformed extraction: {0}")]
    MalformedExtraction(String),
    #[error("Text generation failed: {0}")]
    GenerationFailed(String),
    #[error("Identity conflict: {0}")]
    IdentityConflict(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("No valid fields to update")]
    NoValidFields,
    #[error("Payload too large: {0}")]
    PayloadTooLarge(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::ValidationFailed {
            message: message.into(),
            details: Vec::new(),
        }
    }

    pub fn invalid_data(details: Vec<FieldViolation>) -> Self {
        ApiError::ValidationFailed {
            message: "Invalid Data".into(),
            details,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self {
            ApiError::ValidationFailed { message, details } => {
                (StatusCode::BAD_REQUEST, "VALIDATION_FAILED", message, details)
            }
            ApiError::ExtractionFailed(detail) => {
                tracing::warn!(detail, "Extraction call failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "EXTRACTION_FAILED",
                    "Failed to extract information from the document.".to_string(),
                    Vec::new(),
                )
            }
            ApiError::MalformedExtraction(detail) => {
                tracing::warn!(detail, "Extraction output rejected");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "MALFORMED_EXTRACTION",
                    "The document could not be read into a structured record.".to_string(),
                    Vec::new(),
                )
            }
            ApiError::GenerationFailed(detail) => {
                tracing::warn!(detail, "Text generation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "GENERATION_FAILED",
                    "Failed to generate explanation from AI service.".to_string(),
                    Vec::new(),
                )
            }
            ApiError::IdentityConflict(message) => {
                (StatusCode::CONFLICT, "IDENTITY_CONFLICT", message, Vec::new())
            }
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "NOT_FOUND", detail, Vec::new()),
            ApiError::NoValidFields => (
                StatusCode::BAD_REQUEST,
                "NO_VALID_FIELDS",
                "No valid fields to update.".to_string(),
                Vec::new(),
            ),
            ApiError::PayloadTooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                "PAYLOAD_TOO_LARGE",
                message,
                Vec::new(),
            ),
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL",
                    "An internal error occurred".to_string(),
                    Vec::new(),
                )
            }
        };

        let body = ErrorBody {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::NotFound { entity_type, id } => {
                ApiError::NotFound(format!("{entity_type} not found: {id}"))
            }
            DatabaseError::Duplicate { entity_type, .. } if entity_type == "User" => {
                ApiError::IdentityConflict("An account with this email already exists.".into())
            }
            DatabaseError::Duplicate { entity_type, key } => {
                ApiError::IdentityConflict(format!("{entity_type} already exists: {key}"))
            }
            DatabaseError::Validation(details) => ApiError::invalid_data(details),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<ExtractionError> for ApiError {
    fn from(err: ExtractionError) -> Self {
        if err.is_malformed() {
            ApiError::MalformedExtraction(err.to_string())
        } else {
            ApiError::ExtractionFailed(err.to_string())
        }
    }
}

impl From<SchemaError> for ApiError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::UnknownDomain(_) | SchemaError::InvalidId(_) => {
                ApiError::bad_request(err.to_string())
            }
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<PatchError> for ApiError {
    fn from(err: PatchError) -> Self {
        match err {
            PatchError::NotAnObject => ApiError::bad_request(err.to_string()),
            PatchError::Invalid(details) => ApiError::invalid_data(details),
            PatchError::NoValidFields => ApiError::NoValidFields,
        }
    }
}

impl From<IngestError> for ApiError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::InvalidUpload(_)
            | IngestError::InvalidFilename
            | IngestError::Identity(_) => ApiError::bad_request(err.to_string()),
            IngestError::Schema(e) => e.into(),
            IngestError::Extraction(e) => e.into(),
            IngestError::Database(e) => e.into(),
            IngestError::Reconcile(_) | IngestError::Serialization(_) => {
                ApiError::Internal(err.to_string())
            }
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
            ApiError::PayloadTooLarge("Uploaded file exceeds the size limit.".into())
        } else {
            ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(err: MultipartRejection) -> Self {
        ApiError::bad_request(format!("Invalid multipart body: {}", err.body_text()))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(err: JsonRejection) -> Self {
        ApiError::bad_request(format!("Invalid JSON body: {}", err.body_text()))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}
