//! Report endpoints.
//!
//! - `POST /api/reports/upload`: multipart upload, extracted and reconciled
//! - `GET /api/reports/:owner_id`: the owner's reconciled documents

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::Value;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, ApiResponse};
use crate::db::collection_for;
use crate::pipeline::ingest::IngestRequest;
use crate::pipeline::schema::SchemaDomain;

/// Multipart field carrying the document.
pub const FILE_FIELD: &str = "user-file";
pub const OWNER_FIELD: &str = "ownerId";
pub const SCHEMA_FIELD: &str = "schema";

struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

fn parse_domain(raw: Option<&str>) -> Result<SchemaDomain, ApiError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        Some(name) => Ok(name.parse()?),
        None => Ok(SchemaDomain::MedicalReport),
    }
}

/// `POST /api/reports/upload`: one document for one owner. Responds with the
/// reconciled document.
///
/// Fields: `ownerId`, `user-file`, optional `schema` (`medical_report` or
/// `diabetes`). Unknown fields are ignored.
pub async fn upload(
    State(ctx): State<ApiContext>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<Value>>, ApiError> {
    let mut multipart = multipart?;
    let mut owner_id: Option<String> = None;
    let mut schema: Option<String> = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some(OWNER_FIELD) => {
                owner_id = Some(field.text().await?);
            }
            Some(SCHEMA_FIELD) => {
                schema = Some(field.text().await?);
            }
            Some(FILE_FIELD) => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                file = Some(UploadedFile {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            _ => {}
        }
    }

    let file = file.ok_or_else(|| ApiError::bad_request("No file uploaded."))?;
    let owner_id = owner_id
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::bad_request("Missing ownerId."))?;
    let domain = parse_domain(schema.as_deref())?;

    let outcome = ctx
        .ingestor
        .ingest(IngestRequest {
            owner_id,
            original_filename: file.filename,
            declared_mime: file.content_type,
            bytes: file.bytes,
            domain,
        })
        .await?;

    Ok(Json(ApiResponse::success(outcome.document)))
}

#[derive(Debug, Deserialize)]
pub struct ListReportsQuery {
    pub schema: Option<String>,
}

/// `GET /api/reports/:owner_id`: newest `lastUpdated` first.
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(owner_id): Path<String>,
    Query(query): Query<ListReportsQuery>,
) -> Result<Json<ApiResponse<Vec<Value>>>, ApiError> {
    let domain = parse_domain(query.schema.as_deref())?;
    let documents = ctx.store.list_documents(collection_for(domain), owner_id.trim())?;
    Ok(Json(ApiResponse::success(documents)))
}
